//! Error and diagnostic types

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Result type alias for dispatch operations
pub type DispatchResult<T> = Result<T, DispatchError>;

/// Runtime errors raised by the dispatch router and its pipes
///
/// Each variant is a distinct kind so callers can branch on it. None of them
/// are retried by the router.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DispatchError {
    /// No pipe is registered under the requested key
    #[error("no pipe registered for key '{0}'")]
    PipeNotFound(String),

    /// A pipe with the same key is already registered
    #[error("pipe already registered for key '{0}'")]
    DuplicatePipe(String),

    /// The consumer waited longer than its timeout
    #[error("timed out after {after:?} waiting on pipe '{key}'")]
    Timeout { key: String, after: Duration },

    /// A message arrived but did not decode to the expected type
    #[error("data binding failed for '{target}': {reason}")]
    DataBinding { target: String, reason: String },

    /// The pipe or the underlying connection is closed
    #[error("connection closed")]
    ConnectionClosed,

    /// The physical transport reported a failure
    #[error("transport error: {0}")]
    Transport(String),

    /// Encoding an outbound message failed
    #[error("codec error: {0}")]
    Codec(String),
}

impl DispatchError {
    /// Returns a stable numeric code for this error kind
    pub fn error_code(&self) -> u32 {
        match self {
            DispatchError::PipeNotFound(_) => 1,
            DispatchError::DuplicatePipe(_) => 2,
            DispatchError::Timeout { .. } => 3,
            DispatchError::DataBinding { .. } => 4,
            DispatchError::ConnectionClosed => 5,
            DispatchError::Transport(_) => 6,
            DispatchError::Codec(_) => 7,
        }
    }

    /// Check whether this error means the stream is gone for good
    pub fn is_closed(&self) -> bool {
        matches!(self, DispatchError::ConnectionClosed)
    }
}

impl From<serde_json::Error> for DispatchError {
    fn from(err: serde_json::Error) -> Self {
        DispatchError::Codec(err.to_string())
    }
}

/// How serious a diagnostic is
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Error,
}

/// Kinds of problems found in an interface document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// A schema could not be read from the document
    InvalidSchema,
    /// A primitive type or format has no target mapping
    UnsupportedType,
    /// A `$ref` does not resolve in the schema table
    UndefinedReference,
    /// `maxItems` exceeds the target array-length ceiling
    ArrayLengthExceeded,
    /// Two `allOf` members declare the same field
    AllOfFieldCollision,
    /// Constraints on `additionalProperties` were dropped
    ConstrainedAdditionalProperties,
    /// The dispatch-key field is missing from a payload schema
    NoDispatchKey,
    /// The dispatch-key field is not a string
    DispatchKeyWrongType,
    /// The dispatch-key field is optional or nullable
    DispatchKeyOptionalOrNullable,
    /// A fixed dispatch-key value is empty
    DispatchKeyEmpty,
    /// A message payload could not be resolved
    UnresolvedPayload,
}

impl DiagnosticKind {
    /// Severity this kind is reported with
    pub fn default_severity(&self) -> Severity {
        match self {
            DiagnosticKind::ConstrainedAdditionalProperties => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

/// A collected problem with enough context to locate it in the document
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[error("{location}: {message}")]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub severity: Severity,
    /// Originating identifier: schema name, channel, message, or field path
    pub location: String,
    pub message: String,
}

impl Diagnostic {
    /// Create a diagnostic with the kind's default severity
    pub fn new(
        kind: DiagnosticKind,
        location: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            severity: kind.default_severity(),
            location: location.into(),
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

#[cfg(test)]
#[path = "error/error_tests.rs"]
mod error_tests;
