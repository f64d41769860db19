//! channelgen-runtime - Multiplexed message dispatch for generated clients
//!
//! This crate provides:
//! - [`DispatchRouter`] running one reader and one writer task per connection
//! - [`Pipe`] and [`PipeRegistry`] for bounded per-stream queues
//! - [`MessageSource`]/[`MessageSink`] seams for the physical transport
//! - Cooperative close signals that wake blocked consumers

mod close;
mod config;
mod connection;
mod pipe;
mod registry;
mod router;

pub use channelgen_core::{
    DispatchError, DispatchKey, DispatchResult, KeyLocation, PipeState, RoutingTable,
};
pub use channelgen_transport::MessageEnvelope;
pub use close::{CloseHandle, CloseSignal};
pub use config::{DEFAULT_CONSUME_TIMEOUT, DEFAULT_PIPE_CAPACITY, OverflowPolicy, RouterConfig};
pub use connection::{
    MemoryPeer, MemorySink, MemorySource, MessageSink, MessageSource, memory_connection,
};
pub use pipe::{Pipe, PushOutcome};
pub use registry::PipeRegistry;
pub use router::DispatchRouter;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        DispatchError, DispatchKey, DispatchResult, DispatchRouter, KeyLocation, MessageEnvelope,
        MessageSink, MessageSource, OverflowPolicy, RouterConfig, RoutingTable,
    };
}
