//! Client declarations, one per channel
//!
//! Each message operation on a channel becomes a [`MethodDecl`]: outbound
//! messages get a `send_` method (or a request method when they declare a
//! reply), inbound messages an `on_` method reading from the message's pipe.

use crate::error::{GenerationError, GenerationResult};
use crate::naming::{method_ident, snake_ident, type_ident};
use channelgen_core::{Channel, Direction, DispatchKey, GeneratorConfig, Message, ServiceDescriptor};
use std::collections::{HashMap, HashSet};

/// Method names every client already defines
const LIFECYCLE_METHODS: &[&str] = &["connect", "close", "shutdown", "router", "is_closed"];

/// Generated payload type name of each message, per channel
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageTypes {
    names: HashMap<(String, String), String>,
}

impl MessageTypes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        channel: impl Into<String>,
        message: impl Into<String>,
        type_name: impl Into<String>,
    ) {
        self.names
            .insert((channel.into(), message.into()), type_name.into());
    }

    pub fn get(&self, channel: &str, message: &str) -> Option<&str> {
        self.names
            .get(&(channel.to_string(), message.to_string()))
            .map(String::as_str)
    }

    /// Look a message up, failing when the pipeline never named it
    pub fn require(&self, channel: &str, message: &str) -> GenerationResult<&str> {
        self.get(channel, message).ok_or_else(|| {
            GenerationError::Malformed(format!(
                "no payload type for message '{message}' on channel '{channel}'"
            ))
        })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MethodKind {
    /// Fire and forget
    Send,
    /// Send and wait for the reply
    Request {
        reply_message: String,
        reply_type: String,
        /// Pipe the reply arrives on when the channel has no stream id
        reply_key: String,
    },
    /// Read the next message from a pipe
    Receive { pipe_key: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodDecl {
    pub name: String,
    /// Message name as declared in the document
    pub message: String,
    pub payload_type: String,
    pub kind: MethodKind,
    pub docs: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClientDeclaration {
    pub name: String,
    pub channel: String,
    pub dispatch_key: Option<DispatchKey>,
    pub stream_id: Option<DispatchKey>,
    pub methods: Vec<MethodDecl>,
    /// Pipes registered when the client connects
    pub pipe_keys: Vec<String>,
    /// `(message, value)` for every message with a literal dispatch value
    pub dispatch_values: Vec<(String, String)>,
    /// Function returning this client's routing table
    pub routing_fn: String,
    pub docs: Option<String>,
}

impl ClientDeclaration {
    pub fn method(&self, name: &str) -> Option<&MethodDecl> {
        self.methods.iter().find(|m| m.name == name)
    }

    /// First method reading from a pipe, if any
    pub fn first_receiver(&self) -> Option<&MethodDecl> {
        self.methods
            .iter()
            .find(|m| matches!(m.kind, MethodKind::Receive { .. }))
    }
}

/// Build one client per channel
///
/// `taken` holds names already used by type declarations; client names
/// avoid them with a numeric suffix.
pub fn generate_clients(
    service: &ServiceDescriptor,
    types: &MessageTypes,
    taken: &HashSet<String>,
    config: &GeneratorConfig,
) -> GenerationResult<Vec<ClientDeclaration>> {
    let mut used: HashSet<String> = taken.clone();
    let mut clients = Vec::with_capacity(service.channels.len());

    for channel in &service.channels {
        let base = format!("{}{}", type_ident(&channel.name), config.client_suffix);
        let name = unique(&base, &used);
        used.insert(name.clone());

        let client = client_for(channel, name, types)?;
        tracing::debug!(
            client = %client.name,
            methods = client.methods.len(),
            "generated client"
        );
        clients.push(client);
    }

    tracing::info!(clients = clients.len(), "generated clients");
    Ok(clients)
}

fn client_for(
    channel: &Channel,
    name: String,
    types: &MessageTypes,
) -> GenerationResult<ClientDeclaration> {
    let replies: HashSet<&str> = channel
        .messages
        .iter()
        .filter_map(|m| m.response.as_deref())
        .collect();

    let mut names: HashSet<String> = LIFECYCLE_METHODS.iter().map(|s| s.to_string()).collect();
    let mut methods = Vec::new();
    let mut pipe_keys = Vec::new();

    for message in &channel.messages {
        let payload_type = types.require(&channel.name, &message.name)?.to_string();

        if message.direction != Direction::Receive {
            let (base, kind) = match &message.response {
                Some(reply) => {
                    let reply_message = channel.message(reply).ok_or_else(|| {
                        GenerationError::Malformed(format!(
                            "reply '{reply}' of '{}' is not on channel '{}'",
                            message.name, channel.name
                        ))
                    })?;
                    let kind = MethodKind::Request {
                        reply_message: reply.clone(),
                        reply_type: types.require(&channel.name, reply)?.to_string(),
                        reply_key: reply_message.effective_dispatch_value().to_string(),
                    };
                    (method_ident("", &message.name), kind)
                }
                None => (method_ident("send", &message.name), MethodKind::Send),
            };
            methods.push(method(&mut names, base, message, &payload_type, kind));
        }

        let reply_only =
            message.direction == Direction::Receive && replies.contains(message.name.as_str());
        if message.direction != Direction::Send && !reply_only {
            let pipe_key = message.effective_dispatch_value().to_string();
            if !pipe_keys.contains(&pipe_key) {
                pipe_keys.push(pipe_key.clone());
            }
            let base = method_ident("on", &message.name);
            let kind = MethodKind::Receive { pipe_key };
            methods.push(method(&mut names, base, message, &payload_type, kind));
        }
    }

    let dispatch_values = channel
        .messages
        .iter()
        .filter_map(|m| Some((m.name.clone(), m.dispatch_value.clone()?)))
        .collect();

    let routing_fn = format!("{}_routing", snake_ident(&name));
    Ok(ClientDeclaration {
        name,
        channel: channel.name.clone(),
        dispatch_key: channel.dispatch_key.clone(),
        stream_id: channel.stream_id.clone(),
        methods,
        pipe_keys,
        dispatch_values,
        routing_fn,
        docs: channel.description.clone(),
    })
}

fn method(
    names: &mut HashSet<String>,
    base: String,
    message: &Message,
    payload_type: &str,
    kind: MethodKind,
) -> MethodDecl {
    let name = unique_method(&base, names);
    names.insert(name.clone());
    MethodDecl {
        name,
        message: message.name.clone(),
        payload_type: payload_type.to_string(),
        kind,
        docs: message.description.clone(),
    }
}

fn unique(base: &str, used: &HashSet<String>) -> String {
    if !used.contains(base) {
        return base.to_string();
    }
    (1..)
        .map(|i| format!("{base}{i}"))
        .find(|candidate| !used.contains(candidate))
        .unwrap_or_else(|| base.to_string())
}

fn unique_method(base: &str, used: &HashSet<String>) -> String {
    if !used.contains(base) {
        return base.to_string();
    }
    let stem = base.strip_prefix("r#").unwrap_or(base);
    (2..)
        .map(|i| format!("{stem}_{i}"))
        .find(|candidate| !used.contains(candidate))
        .unwrap_or_else(|| base.to_string())
}

#[cfg(test)]
#[path = "client/client_tests.rs"]
mod client_tests;
