//! channelgen-core - Schema model, service descriptors, and error types
//!
//! This crate provides the data model shared by the generator and the runtime:
//! - [`SchemaNode`] for the parsed type grammar of an interface document
//! - [`ServiceDescriptor`], [`Channel`], and [`Message`] for the channel graph
//! - [`DispatchKey`] and [`RoutingTable`] for multiplexed message routing
//! - [`PipeState`] for the per-stream pipe state machine
//! - [`Diagnostic`], [`DispatchError`] for error handling
//! - [`GeneratorConfig`] for generation settings

mod config;
mod descriptor;
mod error;
mod lifecycle;
mod routing;
mod schema;

pub use config::{ConfigError, GeneratorConfig};
pub use descriptor::{Channel, Direction, DispatchKey, KeyLocation, Message, ServiceDescriptor};
pub use error::{Diagnostic, DiagnosticKind, DispatchError, DispatchResult, Severity};
pub use lifecycle::PipeState;
pub use routing::{Route, RoutingTable};
pub use schema::{
    AdditionalProperties, COMPONENT_SCHEMA_PREFIX, Constraints, SchemaKind, SchemaNode,
    SchemaParseError, UnionMode,
};

/// Log levels used by the logging layer and configuration
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
    Off = 5,
}

impl LogLevel {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => LogLevel::Trace,
            1 => LogLevel::Debug,
            2 => LogLevel::Info,
            3 => LogLevel::Warn,
            4 => LogLevel::Error,
            _ => LogLevel::Off,
        }
    }

    /// Parse a level name as written in configuration files
    ///
    /// Unknown names map to `None` so callers can report them.
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "trace" => Some(LogLevel::Trace),
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            "off" => Some(LogLevel::Off),
            _ => None,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "TRACE"),
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warn => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
            LogLevel::Off => write!(f, "OFF"),
        }
    }
}

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        Channel, Diagnostic, DiagnosticKind, Direction, DispatchError, DispatchKey,
        DispatchResult, GeneratorConfig, KeyLocation, LogLevel, Message, PipeState, RoutingTable,
        SchemaKind, SchemaNode, ServiceDescriptor,
    };
}
