//! Channel and message extraction
//!
//! Builds the [`ServiceDescriptor`] from a document's `channels` table and
//! validates every dispatch key against the payload (or header) schema of
//! each message it has to tell apart. Problems are collected, never thrown.

use crate::document::{ChannelItem, InterfaceDocument, Operation};
use crate::translator::TranslationContext;
use channelgen_core::{
    Channel, Diagnostic, DiagnosticKind, Direction, DispatchKey, GeneratorConfig, KeyLocation,
    Message, SchemaKind, SchemaNode, ServiceDescriptor, UnionMode,
};
use serde_json::Value;

/// Extract the channel graph of a document
///
/// Key nullability follows the same rule the translator applies, so a key
/// that would render as `Option<String>` is rejected here.
pub fn extract(
    doc: &InterfaceDocument,
    config: &GeneratorConfig,
) -> (ServiceDescriptor, Vec<Diagnostic>) {
    let ctx = TranslationContext::new(&doc.schemas, config);
    let mut service = ServiceDescriptor::new(doc.info.title.clone(), doc.info.version.clone());
    service.description = doc.info.description.clone();
    let mut diagnostics = Vec::new();

    for (name, item) in &doc.channels {
        let channel = extract_channel(doc, &ctx, name, item, &mut diagnostics);
        service.channels.push(channel);
    }

    tracing::info!(
        channels = service.channels.len(),
        messages = service.message_count(),
        problems = diagnostics.len(),
        "extracted channel graph"
    );
    (service, diagnostics)
}

fn extract_channel(
    doc: &InterfaceDocument,
    ctx: &TranslationContext<'_>,
    name: &str,
    item: &ChannelItem,
    diagnostics: &mut Vec<Diagnostic>,
) -> Channel {
    let location = match item.dispatch_key_location.as_deref() {
        None => KeyLocation::Body,
        Some(raw) => KeyLocation::parse(raw).unwrap_or_else(|| {
            diagnostics.push(Diagnostic::new(
                DiagnosticKind::InvalidSchema,
                name,
                format!("unknown x-dispatcherKeyLocation '{raw}'"),
            ));
            KeyLocation::Body
        }),
    };

    let mut messages: Vec<Message> = Vec::new();
    let operations = [
        ("publish", &item.publish, Direction::Send),
        ("subscribe", &item.subscribe, Direction::Receive),
    ];
    for (keyword, operation, direction) in operations {
        let Some(operation) = operation else { continue };
        let entries = operation.messages();
        for (i, entry) in entries.iter().enumerate() {
            let fallback = fallback_name(name, keyword, operation, i, entries.len());
            let context = MessageContext {
                doc,
                channel: name,
                fallback: &fallback,
            };
            let Some(mut message) = context.message(entry, direction, diagnostics) else {
                continue;
            };

            let mut reply = None;
            if let Some(reply_entry) = entry_body(doc, entry).and_then(|b| b.get("x-response")) {
                let reply_fallback = format!("{}Response", message.name);
                let reply_context = MessageContext {
                    fallback: &reply_fallback,
                    ..context
                };
                reply = reply_context.message(reply_entry, Direction::Receive, diagnostics);
                message.response = reply.as_ref().map(|r| r.name.clone());
            }
            add_message(&mut messages, message);
            if let Some(reply) = reply {
                add_message(&mut messages, reply);
            }
        }
    }

    let direction = messages
        .iter()
        .map(|m| m.direction)
        .reduce(Direction::merge)
        .unwrap_or(Direction::Both);

    let mut channel = Channel::new(name, direction);
    channel.description = item.description.clone();
    channel.messages = messages;
    channel.dispatch_key = item.dispatch_key.as_deref().map(|p| DispatchKey::new(p, location));
    channel.stream_id = item.stream_id.as_deref().map(|p| DispatchKey::new(p, location));

    validate_channel(doc, ctx, &mut channel, diagnostics);
    channel
}

/// Name for a message that declares none
fn fallback_name(
    channel: &str,
    keyword: &str,
    operation: &Operation,
    index: usize,
    count: usize,
) -> String {
    match (&operation.operation_id, count) {
        (Some(id), 1) => id.clone(),
        (_, 1) => format!("{}-{keyword}", channel.trim_matches('/')),
        _ => format!("{}-{keyword}-{index}", channel.trim_matches('/')),
    }
}

fn entry_body<'a>(doc: &'a InterfaceDocument, entry: &'a Value) -> Option<&'a Value> {
    doc.resolve_message(entry).map(|(_, body)| body)
}

/// Add a message, merging directions when the name is already present
fn add_message(messages: &mut Vec<Message>, message: Message) {
    match messages.iter_mut().find(|m| m.name == message.name) {
        Some(existing) => {
            existing.direction = existing.direction.merge(message.direction);
            if existing.response.is_none() {
                existing.response = message.response;
            }
        }
        None => messages.push(message),
    }
}

#[derive(Clone, Copy)]
struct MessageContext<'a> {
    doc: &'a InterfaceDocument,
    channel: &'a str,
    fallback: &'a str,
}

impl MessageContext<'_> {
    /// Read one message entry; `None` when it has no usable payload
    fn message(
        &self,
        entry: &Value,
        direction: Direction,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Option<Message> {
        let Some((component, body)) = self.doc.resolve_message(entry) else {
            let reference = entry.get("$ref").and_then(Value::as_str).unwrap_or_default();
            diagnostics.push(Diagnostic::new(
                DiagnosticKind::UnresolvedPayload,
                format!("{}/{}", self.channel, self.fallback),
                format!("message reference '{reference}' does not resolve"),
            ));
            return None;
        };

        let name = body
            .get("name")
            .and_then(Value::as_str)
            .or(component)
            .or_else(|| body.get("messageId").and_then(Value::as_str))
            .unwrap_or(self.fallback)
            .to_string();
        let location = format!("{}/{name}", self.channel);

        let Some(payload) = body.get("payload") else {
            diagnostics.push(Diagnostic::new(
                DiagnosticKind::UnresolvedPayload,
                location,
                "message declares no payload",
            ));
            return None;
        };

        let payload = match SchemaNode::from_json_at(payload, &format!("{location}/payload")) {
            Ok(payload) => payload,
            Err(e) => {
                diagnostics.push(Diagnostic::new(
                    DiagnosticKind::InvalidSchema,
                    location,
                    e.to_string(),
                ));
                return None;
            }
        };
        if let SchemaKind::Reference(reference) = &payload.kind
            && self.doc.resolve_schema(reference).is_none()
        {
            diagnostics.push(Diagnostic::new(
                DiagnosticKind::UnresolvedPayload,
                location,
                format!("payload reference '{reference}' does not resolve"),
            ));
            return None;
        }

        let headers = body.get("headers").and_then(|headers| {
            SchemaNode::from_json_at(headers, &format!("{location}/headers"))
                .map_err(|e| {
                    diagnostics.push(Diagnostic::new(
                        DiagnosticKind::InvalidSchema,
                        location.as_str(),
                        e.to_string(),
                    ));
                })
                .ok()
        });

        let dispatch_value = match body.get("x-dispatcherValue") {
            None => None,
            Some(Value::String(value)) => {
                if value.is_empty() {
                    diagnostics.push(Diagnostic::new(
                        DiagnosticKind::DispatchKeyEmpty,
                        location.as_str(),
                        "x-dispatcherValue is empty",
                    ));
                }
                Some(value.clone())
            }
            Some(other) => {
                diagnostics.push(Diagnostic::new(
                    DiagnosticKind::DispatchKeyWrongType,
                    location.as_str(),
                    format!("x-dispatcherValue must be a string, found {other}"),
                ));
                None
            }
        };

        let mut message = Message::new(name, payload, direction);
        message.description = body
            .get("description")
            .or_else(|| body.get("summary"))
            .and_then(Value::as_str)
            .map(str::to_string);
        message.headers = headers;
        message.dispatch_value = dispatch_value;
        Some(message)
    }
}

fn validate_channel(
    doc: &InterfaceDocument,
    ctx: &TranslationContext<'_>,
    channel: &mut Channel,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let Some(key) = channel.dispatch_key.clone() else {
        if channel.is_multiplexed() {
            diagnostics.push(Diagnostic::new(
                DiagnosticKind::NoDispatchKey,
                channel.name.as_str(),
                format!(
                    "channel carries {} messages but declares no x-dispatcherKey",
                    channel.messages.len()
                ),
            ));
        }
        return;
    };

    if key.field_path.is_empty() {
        diagnostics.push(Diagnostic::new(
            DiagnosticKind::NoDispatchKey,
            channel.name.as_str(),
            "x-dispatcherKey is empty",
        ));
        return;
    }

    for message in &mut channel.messages {
        validate_key(doc, ctx, &channel.name, message, &key, diagnostics);
        message.dispatch_key = Some(key.clone());
    }
}

/// Check that a message exposes a required, non-nullable string at the key
fn validate_key(
    doc: &InterfaceDocument,
    ctx: &TranslationContext<'_>,
    channel: &str,
    message: &Message,
    key: &DispatchKey,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let location = format!("{channel}/{}/{}", message.name, key.dotted());
    let part = match key.location {
        KeyLocation::Header => "headers",
        KeyLocation::Body => "payload",
    };
    let root = match key.location {
        KeyLocation::Header => message.headers.as_ref(),
        KeyLocation::Body => Some(&message.payload),
    };

    let Some(field) = root.and_then(|root| find_field(doc, root, &key.field_path)) else {
        diagnostics.push(Diagnostic::new(
            DiagnosticKind::NoDispatchKey,
            location,
            format!("dispatch key '{}' is not declared in the {part}", key.dotted()),
        ));
        return;
    };

    let resolved = doc.dereference(field.node);
    let is_string = resolved.is_some_and(|node| {
        matches!(&node.kind, SchemaKind::Primitive { type_name, .. } if type_name == "string")
    });
    if !is_string {
        let found = resolved.map(|node| node.kind.label()).unwrap_or("reference");
        diagnostics.push(Diagnostic::new(
            DiagnosticKind::DispatchKeyWrongType,
            location.as_str(),
            format!("dispatch key must be a string, found {found}"),
        ));
    }

    let nullable = ctx.effective_nullable(field.node)
        || resolved.is_some_and(|node| ctx.effective_nullable(node));
    if !field.required || nullable {
        diagnostics.push(Diagnostic::new(
            DiagnosticKind::DispatchKeyOptionalOrNullable,
            location,
            "dispatch key must be required and not nullable",
        ));
    }
}

struct FieldLookup<'a> {
    node: &'a SchemaNode,
    /// Required at every level of the path
    required: bool,
}

fn find_field<'a>(
    doc: &'a InterfaceDocument,
    root: &'a SchemaNode,
    path: &[String],
) -> Option<FieldLookup<'a>> {
    let (first, rest) = path.split_first()?;
    let record = doc.dereference(root)?;
    let (node, required) = lookup_property(doc, record, first, 0)?;

    if rest.is_empty() {
        return Some(FieldLookup { node, required });
    }
    let inner = find_field(doc, node, rest)?;
    Some(FieldLookup {
        node: inner.node,
        required: required && inner.required,
    })
}

/// Find a property on a record or across the members of an `allOf`
fn lookup_property<'a>(
    doc: &'a InterfaceDocument,
    node: &'a SchemaNode,
    name: &str,
    depth: usize,
) -> Option<(&'a SchemaNode, bool)> {
    match &node.kind {
        SchemaKind::Record {
            properties,
            required,
            ..
        } => properties
            .get(name)
            .map(|property| (property, required.contains(name))),
        SchemaKind::Union {
            members,
            mode: UnionMode::AllOf,
        } if depth <= doc.schemas.len() => {
            let mut found = None;
            let mut required = false;
            for member in members.iter().filter_map(|m| doc.dereference(m)) {
                match lookup_property(doc, member, name, depth + 1) {
                    Some((property, member_requires)) => {
                        found = found.or(Some(property));
                        required |= member_requires;
                    }
                    None => required |= member.is_required(name),
                }
            }
            found.map(|property| (property, required))
        }
        _ => None,
    }
}

#[cfg(test)]
#[path = "extractor/extractor_tests.rs"]
mod extractor_tests;
