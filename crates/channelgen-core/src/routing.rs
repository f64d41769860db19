//! Per-channel routing tables shared by the generator and the runtime

use crate::descriptor::DispatchKey;
use serde::{Deserialize, Serialize};

/// Maps one dispatch value to the message type it identifies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub dispatch_value: String,
    /// Generated type name of the message
    pub message: String,
}

/// How the reader of one channel maps inbound messages to pipes
///
/// Pipe keys for regular routes are the dispatch values themselves. A channel
/// with a single inbound message and no dispatch key routes everything to
/// `default_pipe`. Channels with a `stream_id` first try the stream id value
/// as the pipe key, so replies reach the call that is waiting for them.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RoutingTable {
    pub channel: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dispatch_key: Option<DispatchKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_id: Option<DispatchKey>,
    #[serde(default)]
    pub routes: Vec<Route>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_pipe: Option<String>,
}

impl RoutingTable {
    /// Create an empty table for a channel
    pub fn new(channel: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            ..Default::default()
        }
    }

    pub fn with_dispatch_key(mut self, key: DispatchKey) -> Self {
        self.dispatch_key = Some(key);
        self
    }

    pub fn with_stream_id(mut self, key: DispatchKey) -> Self {
        self.stream_id = Some(key);
        self
    }

    pub fn with_default_pipe(mut self, pipe: impl Into<String>) -> Self {
        self.default_pipe = Some(pipe.into());
        self
    }

    /// Add a route from a dispatch value to a message type
    pub fn route(mut self, dispatch_value: impl Into<String>, message: impl Into<String>) -> Self {
        self.routes.push(Route {
            dispatch_value: dispatch_value.into(),
            message: message.into(),
        });
        self
    }

    /// The message type a dispatch value identifies
    pub fn message_for(&self, dispatch_value: &str) -> Option<&str> {
        self.routes
            .iter()
            .find(|r| r.dispatch_value == dispatch_value)
            .map(|r| r.message.as_str())
    }

    /// Check whether a dispatch value is known to this table
    pub fn knows(&self, dispatch_value: &str) -> bool {
        self.message_for(dispatch_value).is_some()
    }
}

#[cfg(test)]
#[path = "routing/routing_tests.rs"]
mod routing_tests;
