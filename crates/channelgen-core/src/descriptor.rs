//! Channel and message descriptors extracted from an interface document

use crate::schema::SchemaNode;
use serde::{Deserialize, Serialize};

/// Where the dispatch-key field lives in an inbound message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyLocation {
    Header,
    #[default]
    Body,
}

impl KeyLocation {
    /// Parse the document spelling (`header` or `body`)
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "header" | "headers" => Some(KeyLocation::Header),
            "body" | "payload" => Some(KeyLocation::Body),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            KeyLocation::Header => "header",
            KeyLocation::Body => "body",
        }
    }
}

/// Coordinate of the field used to route a generic inbound message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchKey {
    /// Field path segments, outermost first
    pub field_path: Vec<String>,
    pub location: KeyLocation,
}

impl DispatchKey {
    /// Build a key from a dotted path such as `meta.type`
    pub fn new(dotted_path: &str, location: KeyLocation) -> Self {
        Self {
            field_path: dotted_path
                .split('.')
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            location,
        }
    }

    /// Build a body-located key from a dotted path
    pub fn body(dotted_path: &str) -> Self {
        Self::new(dotted_path, KeyLocation::Body)
    }

    /// The dotted form of the field path
    pub fn dotted(&self) -> String {
        self.field_path.join(".")
    }

    /// The last path segment, i.e. the field name on the innermost record
    pub fn field_name(&self) -> Option<&str> {
        self.field_path.last().map(String::as_str)
    }
}

impl std::fmt::Display for DispatchKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.location.as_str(), self.dotted())
    }
}

/// Which side sends a message, from the client's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Client publishes, service consumes
    Send,
    /// Service publishes, client consumes
    Receive,
    /// Both
    Both,
}

impl Direction {
    /// Combine two directions observed on the same channel
    pub fn merge(self, other: Direction) -> Direction {
        if self == other { self } else { Direction::Both }
    }
}

/// One payload shape plus routing metadata
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// Message name as declared (or the component key)
    pub name: String,
    pub description: Option<String>,
    pub payload: SchemaNode,
    pub headers: Option<SchemaNode>,
    pub direction: Direction,
    pub dispatch_key: Option<DispatchKey>,
    /// Literal dispatch value fixed for this message, if declared
    pub dispatch_value: Option<String>,
    /// Name of the reply message, for request/response operations
    pub response: Option<String>,
}

impl Message {
    /// Create a message with no routing metadata
    pub fn new(name: impl Into<String>, payload: SchemaNode, direction: Direction) -> Self {
        Self {
            name: name.into(),
            description: None,
            payload,
            headers: None,
            direction,
            dispatch_key: None,
            dispatch_value: None,
            response: None,
        }
    }

    pub fn with_dispatch(mut self, key: DispatchKey, value: Option<String>) -> Self {
        self.dispatch_key = Some(key);
        self.dispatch_value = value;
        self
    }

    pub fn with_response(mut self, response: impl Into<String>) -> Self {
        self.response = Some(response.into());
        self
    }

    /// The value the dispatch key holds for this message
    ///
    /// Falls back to the message name when no literal was declared.
    pub fn effective_dispatch_value(&self) -> &str {
        self.dispatch_value.as_deref().unwrap_or(&self.name)
    }
}

/// A named communication path carrying one or more message types
#[derive(Debug, Clone, PartialEq)]
pub struct Channel {
    pub name: String,
    pub description: Option<String>,
    pub messages: Vec<Message>,
    pub direction: Direction,
    pub dispatch_key: Option<DispatchKey>,
    /// Field carrying a per-call stream identifier on multiplexed channels
    pub stream_id: Option<DispatchKey>,
}

impl Channel {
    pub fn new(name: impl Into<String>, direction: Direction) -> Self {
        Self {
            name: name.into(),
            description: None,
            messages: Vec::new(),
            direction,
            dispatch_key: None,
            stream_id: None,
        }
    }

    /// Check whether inbound messages must be told apart by a dispatch key
    pub fn is_multiplexed(&self) -> bool {
        self.messages.len() > 1
    }

    /// Find a message by name
    pub fn message(&self, name: &str) -> Option<&Message> {
        self.messages.iter().find(|m| m.name == name)
    }

    /// Messages the client sends
    pub fn outbound(&self) -> impl Iterator<Item = &Message> {
        self.messages
            .iter()
            .filter(|m| m.direction != Direction::Receive)
    }

    /// Messages the client receives
    pub fn inbound(&self) -> impl Iterator<Item = &Message> {
        self.messages
            .iter()
            .filter(|m| m.direction != Direction::Send)
    }
}

/// Ordered channel collection plus document metadata
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceDescriptor {
    pub title: String,
    pub version: String,
    pub description: Option<String>,
    pub channels: Vec<Channel>,
}

impl ServiceDescriptor {
    pub fn new(title: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            version: version.into(),
            description: None,
            channels: Vec::new(),
        }
    }

    /// Find a channel by name
    pub fn channel(&self, name: &str) -> Option<&Channel> {
        self.channels.iter().find(|c| c.name == name)
    }

    /// Total number of messages across all channels
    pub fn message_count(&self) -> usize {
        self.channels.iter().map(|c| c.messages.len()).sum()
    }
}
