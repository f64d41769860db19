//! Reverse introspection
//!
//! Maps a [`SemanticModel`] back to a [`ServiceDescriptor`] and a component
//! schema table, mirroring the translator's primitive table so that a
//! generated service re-emits an equivalent document.

use crate::naming::unraw;
use crate::semantic::{NativeBody, NativeOperation, NativeService, NativeType, SemanticModel};
use channelgen_core::{
    AdditionalProperties, Channel, Constraints, Direction, DispatchKey, KeyLocation, Message,
    SchemaNode, ServiceDescriptor, UnionMode,
};
use indexmap::IndexMap;
use serde_json::Value;
use std::collections::{BTreeSet, HashSet};
use thiserror::Error;

/// Result type alias for introspection
pub type IntrospectResult<T> = Result<T, IntrospectError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum IntrospectError {
    /// A native type has no schema counterpart
    #[error("{location}: unsupported type '{type_name}'")]
    UnsupportedType { location: String, type_name: String },

    /// A named type is not declared in the model
    #[error("{location}: unknown type '{type_name}'")]
    UnknownType { location: String, type_name: String },

    /// The source could not be read into a model
    #[error("{0}")]
    Source(String),
}

/// Rebuild the service graph and schema table of a model
pub fn introspect(
    model: &SemanticModel,
) -> IntrospectResult<(ServiceDescriptor, IndexMap<String, SchemaNode>)> {
    let known: HashSet<&str> = model.types.iter().map(|t| t.name.as_str()).collect();
    let mapper = SchemaMapper { known: &known };

    let mut schemas = IndexMap::new();
    for decl in &model.types {
        let location = decl.name.as_str();
        let mut node = match &decl.body {
            NativeBody::Record {
                fields,
                deny_unknown_fields,
            } => {
                let mut properties = IndexMap::new();
                let mut required = BTreeSet::new();
                let mut additional = if *deny_unknown_fields {
                    AdditionalProperties::Allowed(false)
                } else {
                    AdditionalProperties::Absent
                };

                for field in fields {
                    let location = format!("{}.{}", decl.name, field.ident);
                    if field.flatten {
                        additional = mapper.rest(&field.ty, &location)?;
                        continue;
                    }
                    let (schema, is_required) = match (&field.ty, field.has_default) {
                        (NativeType::Optional(inner), true) => {
                            (mapper.schema(inner, &location)?, false)
                        }
                        (other, has_default) => (mapper.schema(other, &location)?, !has_default),
                    };
                    if is_required {
                        required.insert(field.wire_name.clone());
                    }
                    properties.insert(field.wire_name.clone(), schema);
                }

                SchemaNode::record(properties, required).with_additional(additional)
            }
            NativeBody::Union(members) => {
                let members = members
                    .iter()
                    .map(|m| mapper.schema(m, location))
                    .collect::<IntrospectResult<Vec<_>>>()?;
                SchemaNode::union(members, UnionMode::OneOf)
            }
            NativeBody::Enumeration(values) => SchemaNode::string().with_constraints(Constraints {
                enum_values: values.iter().cloned().map(Value::String).collect(),
                ..Constraints::default()
            }),
            NativeBody::Alias(target) => mapper.schema(target, location)?,
        };
        if let Some(docs) = &decl.docs {
            node = node.with_description(docs.clone());
        }
        schemas.insert(decl.name.clone(), node);
    }

    let mut service = ServiceDescriptor::new(
        model.title.clone().unwrap_or_default(),
        model.version.clone().unwrap_or_default(),
    );
    for native in &model.services {
        service.channels.push(channel(native, &mapper)?);
    }

    tracing::info!(
        schemas = schemas.len(),
        channels = service.channels.len(),
        "introspected semantic model"
    );
    Ok((service, schemas))
}

fn channel(native: &NativeService, mapper: &SchemaMapper<'_>) -> IntrospectResult<Channel> {
    let dispatch_key = native.dispatch_key.as_deref().map(parse_key);
    let stream_id = native.stream_id.as_deref().map(parse_key);

    let mut messages: Vec<Message> = Vec::new();
    for operation in &native.operations {
        for message in operation_messages(native, operation, mapper)? {
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
    }

    for message in &mut messages {
        message.dispatch_key = dispatch_key.clone();
        message.dispatch_value = native.dispatch_value(&message.name).map(str::to_string);
    }

    let direction = messages
        .iter()
        .map(|m| m.direction)
        .reduce(Direction::merge)
        .unwrap_or(Direction::Both);
    let mut channel = Channel::new(native.channel.as_str(), direction);
    channel.description = native.docs.clone();
    channel.messages = messages;
    channel.dispatch_key = dispatch_key;
    channel.stream_id = stream_id;
    Ok(channel)
}

/// Messages one operation sends and receives
fn operation_messages(
    native: &NativeService,
    operation: &NativeOperation,
    mapper: &SchemaMapper<'_>,
) -> IntrospectResult<Vec<Message>> {
    let location = format!("{}::{}", native.name, operation.name);
    let payload = operation.params.iter().find(|p| p.name != "timeout");
    let binding = native.binding(unraw(&operation.name));

    let message_name = |prefix: &str| match binding {
        Some(binding) => binding.message.clone(),
        None => operation
            .name
            .strip_prefix(prefix)
            .unwrap_or(&operation.name)
            .to_string(),
    };

    let mut messages = Vec::new();
    match (payload, &operation.returns) {
        (Some(payload), Some(returns)) => {
            let name = message_name("");
            let reply = binding
                .map(|b| b.reply.clone())
                .filter(|r| !r.is_empty())
                .unwrap_or_else(|| format!("{name}Response"));
            let schema = mapper.schema(&payload.ty, &location)?;
            let request = Message::new(name, schema, Direction::Send).with_response(reply.clone());
            messages.push(request);
            messages.push(Message::new(
                reply,
                mapper.schema(returns, &location)?,
                Direction::Receive,
            ));
        }
        (Some(payload), None) => messages.push(Message::new(
            message_name("send_"),
            mapper.schema(&payload.ty, &location)?,
            Direction::Send,
        )),
        (None, Some(returns)) => messages.push(Message::new(
            message_name("on_"),
            mapper.schema(returns, &location)?,
            Direction::Receive,
        )),
        (None, None) => {
            tracing::debug!(operation = %location, "skipping operation without messages");
        }
    }

    if let Some(first) = messages.first_mut() {
        first.description = operation.docs.clone();
    }
    Ok(messages)
}

/// `location:path`, or a bare path located in the body
fn parse_key(spelling: &str) -> DispatchKey {
    match spelling.split_once(':') {
        Some((location, path)) => match KeyLocation::parse(location) {
            Some(location) => DispatchKey::new(path, location),
            None => DispatchKey::body(spelling),
        },
        None => DispatchKey::body(spelling),
    }
}

struct SchemaMapper<'a> {
    known: &'a HashSet<&'a str>,
}

impl SchemaMapper<'_> {
    fn schema(&self, ty: &NativeType, location: &str) -> IntrospectResult<SchemaNode> {
        Ok(match ty {
            NativeType::String => SchemaNode::string(),
            NativeType::Bool => SchemaNode::boolean(),
            NativeType::Integer { bits, .. } if *bits <= 32 => {
                SchemaNode::primitive_with_format("integer", "int32")
            }
            NativeType::Integer { .. } => SchemaNode::integer(),
            NativeType::Float { bits: 32 } => SchemaNode::primitive_with_format("number", "float"),
            NativeType::Float { .. } => SchemaNode::number(),
            NativeType::Bytes => SchemaNode::primitive_with_format("string", "byte"),
            NativeType::List(items) => SchemaNode::array(self.schema(items, location)?),
            NativeType::Optional(inner) => self.schema(inner, location)?.with_nullable(true),
            NativeType::Map(values) => SchemaNode::map(self.schema(values, location)?),
            NativeType::Json => SchemaNode::any(),
            NativeType::Named(name) if self.known.contains(name.as_str()) => {
                SchemaNode::reference(name)
            }
            NativeType::Named(name) => {
                return Err(IntrospectError::UnknownType {
                    location: location.to_string(),
                    type_name: name.clone(),
                });
            }
            NativeType::Unit => return Err(unsupported(location, "()")),
            NativeType::Unsupported(spelling) => return Err(unsupported(location, spelling)),
        })
    }

    /// `additionalProperties` of a flattened catch-all field
    fn rest(&self, ty: &NativeType, location: &str) -> IntrospectResult<AdditionalProperties> {
        match ty {
            NativeType::Map(values) if **values == NativeType::Json => {
                Ok(AdditionalProperties::Absent)
            }
            NativeType::Map(values) => Ok(AdditionalProperties::Typed(Box::new(
                self.schema(values, location)?,
            ))),
            other => Err(unsupported(location, &format!("flattened {other:?}"))),
        }
    }
}

fn unsupported(location: &str, type_name: &str) -> IntrospectError {
    IntrospectError::UnsupportedType {
        location: location.to_string(),
        type_name: type_name.to_string(),
    }
}
