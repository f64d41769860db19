//! channelgen-logging - Tracing integration
//!
//! This crate provides:
//! - [`init_logging`] installing a `tracing` subscriber with a reloadable level
//! - [`SinkLayer`] forwarding events to a registered [`LogSink`]
//! - [`ReloadHandle`] for changing the level at runtime

mod layer;
mod reload;
mod sink;

pub use channelgen_core::LogLevel;
pub use layer::{SinkLayer, init_logging};
pub use reload::{LoggingError, ReloadHandle};
pub use sink::{LogRecord, LogSink, LogSinkManager, RecordBuffer};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{LogLevel, LogRecord, LogSinkManager, ReloadHandle, SinkLayer, init_logging};
}
