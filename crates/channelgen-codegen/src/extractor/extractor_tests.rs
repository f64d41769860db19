#![allow(non_snake_case)]

use super::*;
use serde_json::json;
use test_case::test_case;

fn doc(value: serde_json::Value) -> InterfaceDocument {
    InterfaceDocument::from_json_str(&value.to_string()).unwrap()
}

/// A two-message channel keyed on `event`, with `Trade.event` replaced
fn keyed_channel(event: serde_json::Value, required: bool) -> InterfaceDocument {
    let required = if required { json!(["event"]) } else { json!([]) };
    doc(json!({
        "info": {"title": "Market", "version": "1.0.0"},
        "channels": {"/market": {
            "x-dispatcherKey": "event",
            "subscribe": {"message": {"oneOf": [
                {"$ref": "#/components/messages/trade"},
                {"$ref": "#/components/messages/quote"}
            ]}}
        }},
        "components": {
            "messages": {
                "trade": {"payload": {"$ref": "#/components/schemas/Trade"}},
                "quote": {"payload": {"$ref": "#/components/schemas/Quote"}}
            },
            "schemas": {
                "Trade": {"type": "object", "required": required, "properties": {
                    "event": event, "price": {"type": "number"}
                }},
                "Quote": {"type": "object", "required": ["event"], "properties": {
                    "event": {"type": "string"}
                }}
            }
        }
    }))
}

fn kinds(diagnostics: &[Diagnostic]) -> Vec<DiagnosticKind> {
    diagnostics.iter().map(|d| d.kind).collect()
}

#[test]
fn extract___valid_dispatch_key___no_diagnostics() {
    let document = keyed_channel(json!({"type": "string"}), true);

    let (service, diagnostics) = extract(&document, &GeneratorConfig::default());

    assert!(diagnostics.is_empty(), "{diagnostics:?}");
    let channel = service.channel("/market").unwrap();
    assert_eq!(channel.messages.len(), 2);
    assert_eq!(channel.direction, Direction::Receive);
    assert!(
        channel
            .messages
            .iter()
            .all(|m| m.dispatch_key == Some(DispatchKey::body("event")))
    );
}

#[test_case(json!({"type": "integer"}), true, DiagnosticKind::DispatchKeyWrongType ; "integer key")]
#[test_case(json!({"type": "string"}), false, DiagnosticKind::DispatchKeyOptionalOrNullable ; "optional key")]
#[test_case(
    json!({"type": "string", "x-nullable": true}),
    true,
    DiagnosticKind::DispatchKeyOptionalOrNullable ;
    "nullable key"
)]
fn extract___invalid_dispatch_key___one_diagnostic(
    event: serde_json::Value,
    required: bool,
    expected: DiagnosticKind,
) {
    let (_, diagnostics) = extract(&keyed_channel(event, required), &GeneratorConfig::default());

    assert_eq!(kinds(&diagnostics), vec![expected]);
    assert_eq!(diagnostics[0].location, "/market/trade/event");
}

#[test]
fn extract___treat_as_nullable___only_explicitly_non_nullable_keys_pass() {
    let document = keyed_channel(json!({"type": "string", "nullable": false}), true);
    let config = GeneratorConfig::default().with_treat_as_nullable(true);

    let (_, diagnostics) = extract(&document, &config);

    assert_eq!(
        kinds(&diagnostics),
        vec![DiagnosticKind::DispatchKeyOptionalOrNullable]
    );
    assert_eq!(diagnostics[0].location, "/market/quote/event");
}

#[test]
fn extract___missing_dispatch_key_field___no_dispatch_key() {
    let document = doc(json!({
        "channels": {"/market": {
            "x-dispatcherKey": "kind",
            "subscribe": {"message": {"name": "trade", "payload": {
                "type": "object", "properties": {"event": {"type": "string"}}
            }}}
        }}
    }));

    let (_, diagnostics) = extract(&document, &GeneratorConfig::default());

    assert_eq!(kinds(&diagnostics), vec![DiagnosticKind::NoDispatchKey]);
    assert!(diagnostics[0].message.contains("kind"));
}

#[test]
fn extract___multiple_messages_without_key___no_dispatch_key() {
    let document = doc(json!({
        "channels": {"/chat": {
            "publish": {"message": {"name": "say", "payload": {"type": "object"}}},
            "subscribe": {"message": {"name": "heard", "payload": {"type": "object"}}}
        }}
    }));

    let (service, diagnostics) = extract(&document, &GeneratorConfig::default());

    assert_eq!(kinds(&diagnostics), vec![DiagnosticKind::NoDispatchKey]);
    assert_eq!(diagnostics[0].location, "/chat");
    assert_eq!(service.channels[0].direction, Direction::Both);
}

#[test]
fn extract___single_message_without_key___valid() {
    let document = doc(json!({
        "channels": {"readings": {
            "subscribe": {"message": {"name": "reading", "payload": {"type": "object"}}}
        }}
    }));

    let (service, diagnostics) = extract(&document, &GeneratorConfig::default());

    assert!(diagnostics.is_empty());
    assert_eq!(service.channels[0].dispatch_key, None);
    assert_eq!(service.channels[0].messages[0].dispatch_key, None);
}

#[test]
fn extract___empty_dispatch_value___dispatch_key_empty() {
    let document = doc(json!({
        "channels": {"readings": {
            "subscribe": {"message": {
                "name": "reading", "x-dispatcherValue": "", "payload": {"type": "object"}
            }}
        }}
    }));

    let (_, diagnostics) = extract(&document, &GeneratorConfig::default());

    assert_eq!(kinds(&diagnostics), vec![DiagnosticKind::DispatchKeyEmpty]);
}

#[test]
fn extract___literal_dispatch_value___kept_on_message() {
    let document = doc(json!({
        "channels": {"/market": {
            "x-dispatcherKey": "event",
            "subscribe": {"message": {"oneOf": [
                {"name": "trade", "x-dispatcherValue": "T", "payload": {
                    "type": "object", "required": ["event"],
                    "properties": {"event": {"type": "string"}}
                }},
                {"name": "quote", "payload": {
                    "type": "object", "required": ["event"],
                    "properties": {"event": {"type": "string"}}
                }}
            ]}}
        }}
    }));

    let (service, diagnostics) = extract(&document, &GeneratorConfig::default());

    assert!(diagnostics.is_empty());
    let channel = &service.channels[0];
    assert_eq!(channel.message("trade").unwrap().effective_dispatch_value(), "T");
    assert_eq!(channel.message("quote").unwrap().effective_dispatch_value(), "quote");
}

#[test]
fn extract___missing_payload___unresolved_and_dropped() {
    let document = doc(json!({
        "channels": {"readings": {
            "subscribe": {"message": {"name": "reading"}}
        }}
    }));

    let (service, diagnostics) = extract(&document, &GeneratorConfig::default());

    assert_eq!(kinds(&diagnostics), vec![DiagnosticKind::UnresolvedPayload]);
    assert!(service.channels[0].messages.is_empty());
}

#[test]
fn extract___dangling_payload_ref___unresolved_and_dropped() {
    let document = doc(json!({
        "channels": {"readings": {
            "subscribe": {"message": {
                "name": "reading", "payload": {"$ref": "#/components/schemas/Nope"}
            }}
        }}
    }));

    let (service, diagnostics) = extract(&document, &GeneratorConfig::default());

    assert_eq!(kinds(&diagnostics), vec![DiagnosticKind::UnresolvedPayload]);
    assert_eq!(diagnostics[0].location, "readings/reading");
    assert!(service.channels[0].messages.is_empty());
}

#[test]
fn extract___dangling_message_ref___unresolved() {
    let document = doc(json!({
        "channels": {"readings": {
            "subscribe": {"message": {"$ref": "#/components/messages/nope"}}
        }}
    }));

    let (_, diagnostics) = extract(&document, &GeneratorConfig::default());

    assert_eq!(kinds(&diagnostics), vec![DiagnosticKind::UnresolvedPayload]);
    assert!(diagnostics[0].message.contains("#/components/messages/nope"));
}

#[test]
fn extract___header_key___validated_against_headers() {
    let document = doc(json!({
        "channels": {"/events": {
            "x-dispatcherKey": "type",
            "x-dispatcherKeyLocation": "header",
            "subscribe": {"message": {"oneOf": [
                {"name": "created", "payload": {"type": "object"}, "headers": {
                    "type": "object", "required": ["type"],
                    "properties": {"type": {"type": "string"}}
                }},
                {"name": "deleted", "payload": {"type": "object"}}
            ]}}
        }}
    }));

    let (service, diagnostics) = extract(&document, &GeneratorConfig::default());

    assert_eq!(kinds(&diagnostics), vec![DiagnosticKind::NoDispatchKey]);
    assert_eq!(diagnostics[0].location, "/events/deleted/type");
    assert_eq!(
        service.channels[0].dispatch_key,
        Some(DispatchKey::new("type", KeyLocation::Header))
    );
}

#[test]
fn extract___nested_key_path___follows_references_and_all_of() {
    let document = doc(json!({
        "channels": {"/events": {
            "x-dispatcherKey": "meta.kind",
            "subscribe": {"message": {"oneOf": [
                {"name": "a", "payload": {"allOf": [
                    {"$ref": "#/components/schemas/Envelope"},
                    {"type": "object", "properties": {"x": {"type": "number"}}}
                ]}},
                {"name": "b", "payload": {"$ref": "#/components/schemas/Envelope"}}
            ]}}
        }},
        "components": {"schemas": {
            "Meta": {"type": "object", "required": ["kind"], "properties": {
                "kind": {"type": "string"}
            }},
            "Envelope": {"type": "object", "required": ["meta"], "properties": {
                "meta": {"$ref": "#/components/schemas/Meta"}
            }}
        }}
    }));

    let (_, diagnostics) = extract(&document, &GeneratorConfig::default());

    assert!(diagnostics.is_empty(), "{diagnostics:?}");
}

#[test]
fn extract___optional_parent_of_key___optional_or_nullable() {
    let document = doc(json!({
        "channels": {"/events": {
            "x-dispatcherKey": "meta.kind",
            "subscribe": {"message": {"name": "a", "payload": {
                "type": "object", "properties": {"meta": {
                    "type": "object", "required": ["kind"],
                    "properties": {"kind": {"type": "string"}}
                }}
            }}}
        }}
    }));

    let (_, diagnostics) = extract(&document, &GeneratorConfig::default());

    assert_eq!(kinds(&diagnostics), vec![DiagnosticKind::DispatchKeyOptionalOrNullable]);
}

#[test]
fn extract___x_response___adds_reply_message() {
    let document = doc(json!({
        "channels": {"/rpc": {
            "x-dispatcherKey": "op",
            "x-dispatcherStreamId": "id",
            "publish": {"message": {"$ref": "#/components/messages/ping"}}
        }},
        "components": {
            "messages": {
                "ping": {
                    "payload": {"$ref": "#/components/schemas/Frame"},
                    "x-response": {"$ref": "#/components/messages/pong"}
                },
                "pong": {"payload": {"$ref": "#/components/schemas/Frame"}}
            },
            "schemas": {"Frame": {"type": "object", "required": ["op", "id"], "properties": {
                "op": {"type": "string"}, "id": {"type": "string"}
            }}}
        }
    }));

    let (service, diagnostics) = extract(&document, &GeneratorConfig::default());

    assert!(diagnostics.is_empty(), "{diagnostics:?}");
    let channel = &service.channels[0];
    assert_eq!(channel.message("ping").unwrap().response.as_deref(), Some("pong"));
    assert_eq!(channel.message("pong").unwrap().direction, Direction::Receive);
    assert_eq!(channel.direction, Direction::Both);
    assert_eq!(channel.stream_id, Some(DispatchKey::body("id")));
}

#[test]
fn extract___same_message_both_ways___merged_direction() {
    let document = doc(json!({
        "channels": {"/echo": {
            "publish": {"message": {"$ref": "#/components/messages/echo"}},
            "subscribe": {"message": {"$ref": "#/components/messages/echo"}}
        }},
        "components": {"messages": {"echo": {"payload": {"type": "string"}}}}
    }));

    let (service, diagnostics) = extract(&document, &GeneratorConfig::default());

    assert!(diagnostics.is_empty());
    assert_eq!(service.channels[0].messages.len(), 1);
    assert_eq!(service.channels[0].messages[0].direction, Direction::Both);
}

#[test]
fn extract___unnamed_message___falls_back_to_operation_id() {
    let document = doc(json!({
        "info": {"title": "T", "version": "1", "description": "desc"},
        "channels": {"readings": {
            "subscribe": {"operationId": "onReading", "message": {"payload": {"type": "object"}}}
        }}
    }));

    let (service, _) = extract(&document, &GeneratorConfig::default());

    assert_eq!(service.channels[0].messages[0].name, "onReading");
    assert_eq!(service.description.as_deref(), Some("desc"));
}

#[test]
fn extract___unknown_key_location___reported() {
    let document = doc(json!({
        "channels": {"readings": {
            "x-dispatcherKeyLocation": "query",
            "subscribe": {"message": {"name": "r", "payload": {"type": "object"}}}
        }}
    }));

    let (_, diagnostics) = extract(&document, &GeneratorConfig::default());

    assert_eq!(kinds(&diagnostics), vec![DiagnosticKind::InvalidSchema]);
}
