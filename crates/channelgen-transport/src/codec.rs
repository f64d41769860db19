//! Codec trait and JSON framing implementation

use crate::MessageEnvelope;
use channelgen_core::DispatchError;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors that can occur during encoding/decoding
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("deserialization error: {0}")]
    Deserialization(String),

    #[error("invalid frame: {0}")]
    InvalidFrame(String),
}

impl From<serde_json::Error> for CodecError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_data() || err.is_syntax() || err.is_eof() {
            CodecError::Deserialization(err.to_string())
        } else {
            CodecError::Serialization(err.to_string())
        }
    }
}

impl From<CodecError> for DispatchError {
    fn from(err: CodecError) -> Self {
        DispatchError::Codec(err.to_string())
    }
}

const HEADERS_FIELD: &str = "headers";
const BODY_FIELD: &str = "body";

/// Trait for message encoding and decoding
pub trait Codec: Send + Sync {
    /// Encode a value to bytes
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, CodecError>;

    /// Decode bytes to a value
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, CodecError>;

    /// Get the content type for this codec
    fn content_type(&self) -> &'static str;

    /// Encode an envelope as one wire frame
    ///
    /// Envelopes without headers are written as their bare body, so peers
    /// that know nothing about headers see plain payloads.
    fn encode_frame(&self, envelope: &MessageEnvelope) -> Result<Vec<u8>, CodecError> {
        if envelope.headers.is_empty() {
            self.encode(&envelope.body)
        } else {
            self.encode(envelope)
        }
    }

    /// Decode one wire frame into an envelope
    ///
    /// A frame that is an object with exactly `headers` (an object) and
    /// `body` is read as a full envelope; anything else is a bare body.
    fn decode_frame(&self, data: &[u8]) -> Result<MessageEnvelope, CodecError> {
        let value: Value = self.decode(data)?;
        Ok(split_frame(value))
    }
}

fn split_frame(value: Value) -> MessageEnvelope {
    match value {
        Value::Object(mut obj)
            if obj.len() == 2
                && obj.get(HEADERS_FIELD).is_some_and(Value::is_object)
                && obj.contains_key(BODY_FIELD) =>
        {
            let headers = match obj.remove(HEADERS_FIELD) {
                Some(Value::Object(headers)) => headers,
                _ => Map::new(),
            };
            let body = obj.remove(BODY_FIELD).unwrap_or(Value::Null);
            MessageEnvelope { headers, body }
        }
        other => MessageEnvelope::new(other),
    }
}

/// JSON codec implementation using serde_json
#[derive(Debug, Clone, Default)]
pub struct JsonCodec {
    /// Whether to pretty-print output (default: false for efficiency)
    pretty: bool,
}

impl JsonCodec {
    /// Create a new JSON codec
    pub fn new() -> Self {
        Self { pretty: false }
    }

    /// Create a JSON codec that pretty-prints output
    pub fn pretty() -> Self {
        Self { pretty: true }
    }

    /// Encode an envelope directly to a text frame
    pub fn encode_text(&self, envelope: &MessageEnvelope) -> Result<String, CodecError> {
        let bytes = self.encode_frame(envelope)?;
        String::from_utf8(bytes).map_err(|e| CodecError::InvalidFrame(e.to_string()))
    }

    /// Decode a text frame to an envelope
    pub fn decode_text(&self, frame: &str) -> Result<MessageEnvelope, CodecError> {
        self.decode_frame(frame.as_bytes())
    }
}

impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, CodecError> {
        if self.pretty {
            serde_json::to_vec_pretty(value).map_err(Into::into)
        } else {
            serde_json::to_vec(value).map_err(Into::into)
        }
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, CodecError> {
        serde_json::from_slice(data).map_err(Into::into)
    }

    fn content_type(&self) -> &'static str {
        "application/json"
    }
}

#[cfg(test)]
#[path = "codec/codec_tests.rs"]
mod codec_tests;
