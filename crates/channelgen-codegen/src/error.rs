//! Error types for translation and generation

use crate::document::DocumentError;
use crate::introspect::IntrospectError;
use crate::registry::RegistryError;
use channelgen_core::{Diagnostic, DiagnosticKind};
use thiserror::Error;

/// Result type alias for type translation
pub type TranslateResult<T> = Result<T, TranslateError>;

/// Result type alias for the generation pipeline
pub type GenerationResult<T> = Result<T, GenerationError>;

/// Failure translating one top-level schema
///
/// Each variant carries the schema path it was raised at.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TranslateError {
    #[error("{path}: unsupported type '{type_name}'")]
    UnsupportedType { path: String, type_name: String },

    #[error("{path}: undefined reference '{reference}'")]
    UndefinedReference { path: String, reference: String },

    #[error("{path}: maxItems {max_items} exceeds the array length limit {limit}")]
    ArrayLengthExceeded {
        path: String,
        max_items: u64,
        limit: u64,
    },

    #[error("{path}: field '{field}' is declared by more than one allOf member")]
    AllOfFieldCollision { path: String, field: String },

    /// The name registry could not place a declaration
    #[error("{path}: {source}")]
    Registry {
        path: String,
        #[source]
        source: RegistryError,
    },
}

impl TranslateError {
    /// Returns a stable numeric code for this error kind
    pub fn error_code(&self) -> u32 {
        match self {
            TranslateError::UnsupportedType { .. } => 1,
            TranslateError::UndefinedReference { .. } => 2,
            TranslateError::ArrayLengthExceeded { .. } => 3,
            TranslateError::AllOfFieldCollision { .. } => 4,
            TranslateError::Registry { .. } => 5,
        }
    }

    pub fn path(&self) -> &str {
        match self {
            TranslateError::UnsupportedType { path, .. }
            | TranslateError::UndefinedReference { path, .. }
            | TranslateError::ArrayLengthExceeded { path, .. }
            | TranslateError::AllOfFieldCollision { path, .. }
            | TranslateError::Registry { path, .. } => path,
        }
    }

    /// Diagnostic kind for input errors; `None` for registry failures
    pub fn diagnostic_kind(&self) -> Option<DiagnosticKind> {
        match self {
            TranslateError::UnsupportedType { .. } => Some(DiagnosticKind::UnsupportedType),
            TranslateError::UndefinedReference { .. } => Some(DiagnosticKind::UndefinedReference),
            TranslateError::ArrayLengthExceeded { .. } => {
                Some(DiagnosticKind::ArrayLengthExceeded)
            }
            TranslateError::AllOfFieldCollision { .. } => {
                Some(DiagnosticKind::AllOfFieldCollision)
            }
            TranslateError::Registry { .. } => None,
        }
    }

    /// Convert an input error into a collected diagnostic
    pub fn to_diagnostic(&self) -> Option<Diagnostic> {
        let kind = self.diagnostic_kind()?;
        let message = match self {
            TranslateError::UnsupportedType { type_name, .. } => {
                format!("unsupported type '{type_name}'")
            }
            TranslateError::UndefinedReference { reference, .. } => {
                format!("undefined reference '{reference}'")
            }
            TranslateError::ArrayLengthExceeded {
                max_items, limit, ..
            } => format!("maxItems {max_items} exceeds the array length limit {limit}"),
            TranslateError::AllOfFieldCollision { field, .. } => {
                format!("field '{field}' is declared by more than one allOf member")
            }
            TranslateError::Registry { source, .. } => source.to_string(),
        };
        Some(Diagnostic::new(kind, self.path(), message))
    }
}

/// Errors that stop a generation run
#[derive(Error, Debug)]
pub enum GenerationError {
    /// The input document is missing, unreadable, or not a document
    #[error("document error: {0}")]
    Document(#[from] DocumentError),

    /// Validation found errors; every collected diagnostic is attached
    #[error("invalid input: {} error(s), first: {}", errors(.0), first(.0))]
    InvalidInput(Vec<Diagnostic>),

    #[error("name registry error: {0}")]
    NameRegistry(String),

    /// Internal inconsistency between generation stages
    #[error("malformed generation state: {0}")]
    Malformed(String),

    #[error("introspection error: {0}")]
    Introspect(#[from] IntrospectError),
}

impl GenerationError {
    /// Returns a stable numeric code for this error kind
    pub fn error_code(&self) -> u32 {
        match self {
            GenerationError::Document(_) => 1,
            GenerationError::InvalidInput(_) => 2,
            GenerationError::NameRegistry(_) => 3,
            GenerationError::Malformed(_) => 4,
            GenerationError::Introspect(_) => 5,
        }
    }

    /// Diagnostics attached to an `InvalidInput` error
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            GenerationError::InvalidInput(diagnostics) => diagnostics,
            _ => &[],
        }
    }
}

fn errors(diagnostics: &[Diagnostic]) -> usize {
    diagnostics.iter().filter(|d| d.is_error()).count()
}

fn first(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .find(|d| d.is_error())
        .map(ToString::to_string)
        .unwrap_or_default()
}
