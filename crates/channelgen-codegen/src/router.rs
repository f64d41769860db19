//! Routing tables for generated clients
//!
//! The runtime reader maps each inbound message to a pipe through the
//! channel's [`RoutingTable`]; this module builds those tables from the
//! extracted channels.

use crate::client::{ClientDeclaration, MessageTypes};
use crate::error::{GenerationError, GenerationResult};
use channelgen_core::{Channel, RoutingTable, ServiceDescriptor};

/// A routing table plus the function the rendered client calls to get it
#[derive(Debug, Clone, PartialEq)]
pub struct RoutingDeclaration {
    pub fn_name: String,
    pub client: String,
    pub table: RoutingTable,
}

/// Build the routing table for one channel
pub fn routing_table(channel: &Channel, types: &MessageTypes) -> GenerationResult<RoutingTable> {
    let mut table = RoutingTable::new(channel.name.as_str());
    if let Some(key) = &channel.dispatch_key {
        table = table.with_dispatch_key(key.clone());
    }
    if let Some(stream_id) = &channel.stream_id {
        table = table.with_stream_id(stream_id.clone());
    }

    let inbound: Vec<_> = channel.inbound().collect();
    if channel.dispatch_key.is_none()
        && let [only] = inbound.as_slice()
    {
        table = table.with_default_pipe(only.effective_dispatch_value());
    }

    for message in inbound {
        let value = message.effective_dispatch_value();
        let type_name = types.require(&channel.name, &message.name)?;
        if let Some(existing) = table.message_for(value) {
            tracing::warn!(
                channel = %channel.name,
                dispatch_value = value,
                kept = existing,
                dropped = type_name,
                "duplicate dispatch value"
            );
            continue;
        }
        tracing::debug!(
            channel = %channel.name,
            dispatch_value = value,
            message = type_name,
            "route"
        );
        table = table.route(value, type_name);
    }

    Ok(table)
}

/// Build one routing declaration per client
///
/// Clients and channels pair up by channel name.
pub fn generate_routing(
    service: &ServiceDescriptor,
    clients: &[ClientDeclaration],
    types: &MessageTypes,
) -> GenerationResult<Vec<RoutingDeclaration>> {
    clients
        .iter()
        .map(|client| {
            let channel = service.channel(&client.channel).ok_or_else(|| {
                GenerationError::Malformed(format!(
                    "client '{}' refers to unknown channel '{}'",
                    client.name, client.channel
                ))
            })?;
            Ok(RoutingDeclaration {
                fn_name: client.routing_fn.clone(),
                client: client.name.clone(),
                table: routing_table(channel, types)?,
            })
        })
        .collect()
}
