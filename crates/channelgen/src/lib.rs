//! # channelgen
//!
//! Translate AsyncAPI-style interface documents into Rust clients for
//! multiplexed message channels, and Rust sources back into documents.
//!
//! channelgen provides:
//! - Schema ↔ type translation with a deduplicating name registry
//! - Dispatch-key validation for channels carrying several messages
//! - Generated clients backed by a tokio dispatch router with per-key pipes
//! - Reverse introspection of Rust sources into an AsyncAPI 2.6 document
//!
//! ## Generating
//!
//! ```rust,no_run
//! use channelgen::prelude::*;
//!
//! let config = GeneratorConfig::default();
//! let output = generate_from_path("market.yaml", &config)?;
//! for file in render_output(&output, &config) {
//!     std::fs::write(&file.file_name, &file.source)?;
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Using a generated client
//!
//! ```ignore
//! use channelgen::prelude::*;
//!
//! let (source, sink, peer) = memory_connection(16);
//! let client = MarketClient::connect(source, sink, RouterConfig::default())?;
//! client.send_subscribe(&Subscribe { event: "subscribe".into(), symbols: vec![] }).await?;
//! let trade = client.on_trade(None).await?;
//! client.shutdown().await;
//! ```
//!
//! ## Crate Structure
//!
//! This is a facade crate that re-exports from:
//! - [`channelgen_core`] - Schema model, service descriptors, errors, configuration
//! - [`channelgen_transport`] - Message envelopes and the framing codec
//! - [`channelgen_runtime`] - The dispatch router generated clients embed
//! - [`channelgen_logging`] - `tracing` subscriber setup and log sinks
//! - [`channelgen_codegen`] - Document loading, generation, rendering, introspection

// Re-export core types
pub use channelgen_core::{
    Channel, Diagnostic, DiagnosticKind, Direction, DispatchError, DispatchKey, DispatchResult,
    GeneratorConfig, KeyLocation, LogLevel, Message, PipeState, RoutingTable, SchemaNode,
    ServiceDescriptor,
};

// Re-export transport
pub use channelgen_transport::{Codec, CodecError, JsonCodec, MessageEnvelope};

// Re-export runtime
pub use channelgen_runtime::{
    DispatchRouter, MessageSink, MessageSource, OverflowPolicy, Pipe, PipeRegistry, RouterConfig,
    memory_connection,
};

// Re-export logging
pub use channelgen_logging::{LogSink, LogSinkManager, ReloadHandle, init_logging};

// Re-export code generation
pub use channelgen_codegen::{
    FileRole, GenerationError, GenerationOutput, InterfaceDocument, IntrospectError,
    SemanticModel, document_from_sources, emit_document, emit_yaml, generate, generate_from_path,
    render_output,
};

// Re-export common dependencies that generated code needs
pub use serde;
pub use serde_json;
pub use tokio;
pub use tracing;

/// Prelude module for convenient imports.
///
/// Use `use channelgen::prelude::*;` to import commonly used types.
///
/// This includes:
/// - Generation: `generate`, `generate_from_path`, `render_output`, `GeneratorConfig`
/// - Runtime: `DispatchRouter`, `RouterConfig`, `memory_connection`
/// - Errors: `DispatchError`, `DispatchResult`, `GenerationError`
/// - Serde derives for message types
pub mod prelude {
    pub use crate::{
        DispatchError, DispatchKey, DispatchResult, DispatchRouter, GenerationError,
        GeneratorConfig, InterfaceDocument, KeyLocation, LogLevel, MessageSink, MessageSource,
        RouterConfig, RoutingTable, generate, generate_from_path, memory_connection,
        render_output,
    };

    pub use serde::{Deserialize, Serialize};
}
