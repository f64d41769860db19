//! Interface document loading and normalization
//!
//! Reads the AsyncAPI 2.x subset the generator understands from JSON or
//! YAML. Component schemas are parsed into [`SchemaNode`]s up front; message
//! bodies stay as JSON until the extractor reads them.

use channelgen_core::{COMPONENT_SCHEMA_PREFIX, Diagnostic, DiagnosticKind, SchemaKind, SchemaNode};
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Prefix of `$ref` strings pointing into the named-message table
pub const COMPONENT_MESSAGE_PREFIX: &str = "#/components/messages/";

/// Errors that make a document unusable
#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid YAML document: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

#[derive(Debug, Deserialize)]
struct RawDocument {
    #[serde(default)]
    asyncapi: Option<String>,
    #[serde(default)]
    info: Info,
    #[serde(default)]
    channels: IndexMap<String, ChannelItem>,
    #[serde(default)]
    components: RawComponents,
}

#[derive(Debug, Default, Deserialize)]
struct RawComponents {
    #[serde(default)]
    schemas: IndexMap<String, Value>,
    #[serde(default)]
    messages: IndexMap<String, Value>,
}

/// Document metadata
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Info {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// One entry of the `channels` table
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ChannelItem {
    #[serde(default)]
    pub description: Option<String>,
    /// Messages the client sends
    #[serde(default)]
    pub publish: Option<Operation>,
    /// Messages the client receives
    #[serde(default)]
    pub subscribe: Option<Operation>,
    #[serde(default, rename = "x-dispatcherKey")]
    pub dispatch_key: Option<String>,
    #[serde(default, rename = "x-dispatcherKeyLocation")]
    pub dispatch_key_location: Option<String>,
    #[serde(default, rename = "x-dispatcherStreamId")]
    pub stream_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Operation {
    #[serde(default, rename = "operationId")]
    pub operation_id: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    /// A message, a `$ref` to one, or `{"oneOf": [...]}`
    #[serde(default)]
    pub message: Option<Value>,
}

impl Operation {
    /// The message entries of this operation, with `oneOf` unpacked
    pub fn messages(&self) -> Vec<&Value> {
        match &self.message {
            None => Vec::new(),
            Some(message) => match message.get("oneOf").and_then(Value::as_array) {
                Some(members) => members.iter().collect(),
                None => vec![message],
            },
        }
    }
}

/// A parsed interface document
#[derive(Debug, Clone, Default)]
pub struct InterfaceDocument {
    pub asyncapi: Option<String>,
    pub info: Info,
    pub channels: IndexMap<String, ChannelItem>,
    /// Named message table, kept as JSON
    pub messages: IndexMap<String, Value>,
    /// Named schema table
    pub schemas: IndexMap<String, SchemaNode>,
    /// Component schemas that failed to parse
    schema_errors: Vec<Diagnostic>,
}

impl InterfaceDocument {
    pub fn from_json_str(source: &str) -> Result<Self, DocumentError> {
        let raw: RawDocument = serde_json::from_str(source)?;
        Ok(Self::from_raw(raw))
    }

    pub fn from_yaml_str(source: &str) -> Result<Self, DocumentError> {
        let raw: RawDocument = serde_yaml::from_str(source)?;
        Ok(Self::from_raw(raw))
    }

    /// Load a document, choosing the format by extension
    ///
    /// `.json` is JSON and `.yaml`/`.yml` is YAML; anything else is sniffed
    /// by its first non-blank character.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DocumentError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| DocumentError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        tracing::info!(path = %path.display(), "loading interface document");

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("json") => Self::from_json_str(&source),
            Some("yaml" | "yml") => Self::from_yaml_str(&source),
            _ if source.trim_start().starts_with('{') => Self::from_json_str(&source),
            _ => Self::from_yaml_str(&source),
        }
    }

    fn from_raw(raw: RawDocument) -> Self {
        let mut schemas = IndexMap::with_capacity(raw.components.schemas.len());
        let mut schema_errors = Vec::new();

        for (name, value) in raw.components.schemas {
            let path = format!("{COMPONENT_SCHEMA_PREFIX}{name}");
            match SchemaNode::from_json_at(&value, &path) {
                Ok(node) => {
                    schemas.insert(name, node);
                }
                Err(e) => {
                    schema_errors.push(Diagnostic::new(
                        DiagnosticKind::InvalidSchema,
                        path,
                        e.to_string(),
                    ));
                }
            }
        }

        Self {
            asyncapi: raw.asyncapi,
            info: raw.info,
            channels: raw.channels,
            messages: raw.components.messages,
            schemas,
            schema_errors,
        }
    }

    /// Look up a component schema by `$ref` string
    pub fn resolve_schema(&self, reference: &str) -> Option<&SchemaNode> {
        reference
            .strip_prefix(COMPONENT_SCHEMA_PREFIX)
            .and_then(|name| self.schemas.get(name))
    }

    /// Follow references until a non-reference node
    ///
    /// Returns `None` for a dangling or cyclic chain.
    pub fn dereference<'a>(&'a self, node: &'a SchemaNode) -> Option<&'a SchemaNode> {
        let mut current = node;
        for _ in 0..=self.schemas.len() {
            match &current.kind {
                SchemaKind::Reference(reference) => current = self.resolve_schema(reference)?,
                _ => return Some(current),
            }
        }
        None
    }

    /// Resolve a message entry to its component name (if any) and body
    ///
    /// A `$ref` to the message table is followed; anything else is the
    /// message itself.
    pub fn resolve_message<'a>(&'a self, entry: &'a Value) -> Option<(Option<&'a str>, &'a Value)> {
        match entry.get("$ref").and_then(Value::as_str) {
            Some(reference) => {
                let name = reference.strip_prefix(COMPONENT_MESSAGE_PREFIX)?;
                let (key, body) = self.messages.get_key_value(name)?;
                Some((Some(key.as_str()), body))
            }
            None => Some((None, entry)),
        }
    }

    /// Check that every schema reference resolves
    ///
    /// Collects every problem before returning. A message payload that is a
    /// bare `$ref` is left to the extractor, which reports it as an
    /// unresolved payload.
    pub fn normalize(&self) -> Result<(), Vec<Diagnostic>> {
        let mut diagnostics = self.schema_errors.clone();

        for (name, node) in &self.schemas {
            let location = format!("{COMPONENT_SCHEMA_PREFIX}{name}");
            self.check_references(node, &location, &mut diagnostics);
        }

        for (channel, item) in &self.channels {
            let operations = [("publish", &item.publish), ("subscribe", &item.subscribe)];
            for (op_name, operation) in operations {
                let Some(operation) = operation else { continue };
                for entry in operation.messages() {
                    let Some((_, message)) = self.resolve_message(entry) else {
                        continue;
                    };
                    let location = format!("{channel}/{op_name}");
                    for part in ["payload", "headers"] {
                        let at = format!("{location}/{part}");
                        self.check_inline(message.get(part), &at, &mut diagnostics);
                    }
                }
            }
        }

        if diagnostics.is_empty() {
            Ok(())
        } else {
            Err(diagnostics)
        }
    }

    fn check_inline(
        &self,
        value: Option<&Value>,
        location: &str,
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        let Some(value) = value else { return };
        if value.get("$ref").is_some() {
            return;
        }
        // Unparsable payloads are the extractor's to report
        if let Ok(node) = SchemaNode::from_json_at(value, location) {
            self.check_references(&node, location, diagnostics);
        }
    }

    fn check_references(
        &self,
        node: &SchemaNode,
        location: &str,
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        for reference in node.references() {
            if self.resolve_schema(reference).is_none() {
                diagnostics.push(Diagnostic::new(
                    DiagnosticKind::UndefinedReference,
                    location,
                    format!("undefined reference '{reference}'"),
                ));
            }
        }
    }
}
