//! Message envelope carrying headers and body over one physical connection

use channelgen_core::{DispatchKey, KeyLocation};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};

/// One raw message as seen by the reader and writer tasks
///
/// `headers` holds transport-level metadata (empty for body-only channels);
/// `body` is the JSON payload. The dispatch key of a channel points into one
/// of the two, depending on its [`KeyLocation`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MessageEnvelope {
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub headers: Map<String, Value>,

    #[serde(default)]
    pub body: Value,
}

impl MessageEnvelope {
    /// Create an envelope with a body and no headers
    pub fn new(body: Value) -> Self {
        Self {
            headers: Map::new(),
            body,
        }
    }

    /// Add a header
    pub fn with_header(mut self, name: impl Into<String>, value: Value) -> Self {
        self.headers.insert(name.into(), value);
        self
    }

    /// Create from a serializable payload
    pub fn from_typed<T: Serialize>(payload: &T) -> Result<Self, serde_json::Error> {
        Ok(Self::new(serde_json::to_value(payload)?))
    }

    /// Deserialize the body to a typed value
    ///
    /// This method deserializes directly from the JSON value without cloning.
    pub fn body_as<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.body)
    }

    /// Find the value at a dispatch key's path
    pub fn lookup(&self, key: &DispatchKey) -> Option<&Value> {
        let mut segments = key.field_path.iter();
        let first = segments.next()?;
        let root = match key.location {
            KeyLocation::Header => self.headers.get(first)?,
            KeyLocation::Body => self.body.as_object()?.get(first)?,
        };
        segments.try_fold(root, |current, segment| current.as_object()?.get(segment))
    }

    /// The dispatch value at `key`, if it is a non-empty string
    pub fn dispatch_value(&self, key: &DispatchKey) -> Option<&str> {
        self.lookup(key)
            .and_then(Value::as_str)
            .filter(|value| !value.is_empty())
    }

    /// Write `value` at a dispatch key's path, creating intermediate objects
    ///
    /// Returns `false` when the path crosses a non-object value.
    pub fn set_field(&mut self, key: &DispatchKey, value: Value) -> bool {
        let Some((last, parents)) = key.field_path.split_last() else {
            return false;
        };

        let mut current = match key.location {
            KeyLocation::Header => &mut self.headers,
            KeyLocation::Body => {
                if self.body.is_null() {
                    self.body = Value::Object(Map::new());
                }
                match self.body.as_object_mut() {
                    Some(obj) => obj,
                    None => return false,
                }
            }
        };

        for segment in parents {
            let next = current
                .entry(segment.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            current = match next.as_object_mut() {
                Some(obj) => obj,
                None => return false,
            };
        }

        current.insert(last.clone(), value);
        true
    }

    /// Serialize to bytes for the physical connection
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Deserialize from bytes
    pub fn from_bytes(data: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(data)
    }
}

#[cfg(test)]
#[path = "envelope/envelope_tests.rs"]
mod envelope_tests;
