//! Interface document emission
//!
//! Writes a [`ServiceDescriptor`] and its component schemas back out as an
//! AsyncAPI 2.6 document that [`InterfaceDocument`](crate::document::InterfaceDocument)
//! reads again. Messages live in `components.messages` and channels refer
//! to them by `$ref`; a reply is reachable only through its request's
//! `x-response` unless the client also sends it.

use crate::document::COMPONENT_MESSAGE_PREFIX;
use channelgen_core::{Channel, Direction, Message, SchemaNode, ServiceDescriptor};
use indexmap::IndexMap;
use serde_json::{Map, Value, json};
use std::collections::{HashMap, HashSet};

/// AsyncAPI version written into emitted documents
pub const ASYNCAPI_VERSION: &str = "2.6.0";

/// Build the JSON form of an interface document
pub fn emit_document(service: &ServiceDescriptor, schemas: &IndexMap<String, SchemaNode>) -> Value {
    let mut info = Map::new();
    info.insert("title".into(), json!(service.title));
    info.insert("version".into(), json!(service.version));
    if let Some(description) = &service.description {
        info.insert("description".into(), json!(description));
    }

    let mut keys = MessageKeys::default();
    let mut channels = Map::new();
    let mut messages = Map::new();
    for channel in &service.channels {
        let channel_keys = keys.assign(channel);
        for message in &channel.messages {
            messages.insert(
                channel_keys[message.name.as_str()].clone(),
                message_body(message, &channel_keys),
            );
        }
        channels.insert(channel.name.clone(), channel_item(channel, &channel_keys));
    }

    let schemas: Map<String, Value> = schemas
        .iter()
        .map(|(name, node)| (name.clone(), node.to_json()))
        .collect();

    tracing::info!(
        channels = channels.len(),
        messages = messages.len(),
        schemas = schemas.len(),
        "emitted interface document"
    );

    json!({
        "asyncapi": ASYNCAPI_VERSION,
        "info": info,
        "channels": channels,
        "components": {
            "messages": messages,
            "schemas": schemas,
        },
    })
}

/// Emit the document as YAML
pub fn emit_yaml(
    service: &ServiceDescriptor,
    schemas: &IndexMap<String, SchemaNode>,
) -> Result<String, serde_yaml::Error> {
    serde_yaml::to_string(&emit_document(service, schemas))
}

/// Component keys handed out so far, unique across channels
#[derive(Default)]
struct MessageKeys {
    taken: HashSet<String>,
}

impl MessageKeys {
    /// Map every message of a channel to its component key
    fn assign<'c>(&mut self, channel: &'c Channel) -> HashMap<&'c str, String> {
        channel
            .messages
            .iter()
            .map(|message| {
                let mut key = message.name.clone();
                let mut n = 1;
                while self.taken.contains(&key) {
                    key = format!("{}{n}", message.name);
                    n += 1;
                }
                self.taken.insert(key.clone());
                (message.name.as_str(), key)
            })
            .collect()
    }
}

fn reference(key: &str) -> Value {
    json!({ "$ref": format!("{COMPONENT_MESSAGE_PREFIX}{key}") })
}

fn channel_item(channel: &Channel, keys: &HashMap<&str, String>) -> Value {
    let mut item = Map::new();
    if let Some(description) = &channel.description {
        item.insert("description".into(), json!(description));
    }
    if let Some(key) = &channel.dispatch_key {
        item.insert("x-dispatcherKey".into(), json!(key.dotted()));
    }
    if let Some(stream_id) = &channel.stream_id {
        item.insert("x-dispatcherStreamId".into(), json!(stream_id.dotted()));
    }
    if let Some(location) = channel
        .dispatch_key
        .as_ref()
        .or(channel.stream_id.as_ref())
        .map(|k| k.location)
    {
        item.insert("x-dispatcherKeyLocation".into(), json!(location.as_str()));
    }

    let replies: HashSet<&str> = channel
        .messages
        .iter()
        .filter_map(|m| m.response.as_deref())
        .collect();

    let sent: Vec<Value> = channel
        .messages
        .iter()
        .filter(|m| m.direction != Direction::Receive)
        .map(|m| reference(&keys[m.name.as_str()]))
        .collect();
    let received: Vec<Value> = channel
        .messages
        .iter()
        .filter(|m| m.direction == Direction::Both
            || (m.direction == Direction::Receive && !replies.contains(m.name.as_str())))
        .map(|m| reference(&keys[m.name.as_str()]))
        .collect();

    if let Some(operation) = operation(sent) {
        item.insert("publish".into(), operation);
    }
    if let Some(operation) = operation(received) {
        item.insert("subscribe".into(), operation);
    }
    Value::Object(item)
}

fn operation(mut entries: Vec<Value>) -> Option<Value> {
    match entries.len() {
        0 => None,
        1 => Some(json!({ "message": entries.remove(0) })),
        _ => Some(json!({ "message": { "oneOf": entries } })),
    }
}

fn message_body(message: &Message, keys: &HashMap<&str, String>) -> Value {
    let mut body = Map::new();
    body.insert("name".into(), json!(message.name));
    if let Some(description) = &message.description {
        body.insert("description".into(), json!(description));
    }
    body.insert("payload".into(), message.payload.to_json());
    if let Some(headers) = &message.headers {
        body.insert("headers".into(), headers.to_json());
    }
    if let Some(value) = &message.dispatch_value {
        body.insert("x-dispatcherValue".into(), json!(value));
    }
    if let Some(key) = message.response.as_deref().and_then(|reply| keys.get(reply)) {
        body.insert("x-response".into(), reference(key));
    }
    Value::Object(body)
}
