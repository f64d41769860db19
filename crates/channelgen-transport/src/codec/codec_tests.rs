#![allow(non_snake_case)]

use super::*;
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct Heartbeat {
    event: String,
    seq: u64,
}

#[test]
fn JsonCodec___encode_decode___typed_payload_survives() {
    let codec = JsonCodec::new();
    let original = Heartbeat {
        event: "heartbeat".to_string(),
        seq: 7,
    };

    let encoded = codec.encode(&original).unwrap();
    let decoded: Heartbeat = codec.decode(&encoded).unwrap();

    assert_eq!(original, decoded);
}

#[test]
fn JsonCodec___pretty___output_contains_newlines() {
    let codec = JsonCodec::pretty();
    let envelope = MessageEnvelope::new(json!({"event": "ping"}));

    let encoded = codec.encode_text(&envelope).unwrap();

    assert!(encoded.contains('\n'));
}

#[test]
fn JsonCodec___decode___invalid_json_returns_deserialization_error() {
    let codec = JsonCodec::new();

    let result: Result<Heartbeat, _> = codec.decode(b"not json");

    assert!(matches!(result, Err(CodecError::Deserialization(_))));
}

#[test]
fn JsonCodec___content_type___is_application_json() {
    assert_eq!(JsonCodec::new().content_type(), "application/json");
}

#[test]
fn encode_frame___no_headers___writes_bare_body() {
    let codec = JsonCodec::new();
    let envelope = MessageEnvelope::new(json!({"event": "ping"}));

    let frame = codec.encode_text(&envelope).unwrap();

    assert_eq!(frame, r#"{"event":"ping"}"#);
}

#[test]
fn encode_frame___with_headers___writes_full_envelope() {
    let codec = JsonCodec::new();
    let envelope = MessageEnvelope::new(json!({"id": 1})).with_header("type", json!("trade"));

    let frame = codec.encode_text(&envelope).unwrap();
    let value: Value = serde_json::from_str(&frame).unwrap();

    assert_eq!(value["headers"]["type"], "trade");
    assert_eq!(value["body"]["id"], 1);
}

#[test]
fn decode_frame___full_envelope___splits_headers_and_body() {
    let codec = JsonCodec::new();

    let envelope = codec
        .decode_text(r#"{"headers":{"type":"trade"},"body":{"id":1}}"#)
        .unwrap();

    assert_eq!(envelope.headers.get("type"), Some(&json!("trade")));
    assert_eq!(envelope.body, json!({"id": 1}));
}

#[test]
fn decode_frame___object_with_extra_fields___treated_as_body() {
    let codec = JsonCodec::new();

    let envelope = codec
        .decode_text(r#"{"headers":{},"body":1,"event":"x"}"#)
        .unwrap();

    assert!(envelope.headers.is_empty());
    assert_eq!(envelope.body["event"], "x");
}

#[test]
fn decode_frame___non_object_headers___treated_as_body() {
    let codec = JsonCodec::new();

    let envelope = codec.decode_text(r#"{"headers":"h","body":1}"#).unwrap();

    assert!(envelope.headers.is_empty());
    assert_eq!(envelope.body["headers"], "h");
}

#[test]
fn decode_frame___scalar___becomes_body() {
    let codec = JsonCodec::new();

    let envelope = codec.decode_text("42").unwrap();

    assert_eq!(envelope.body, json!(42));
}

#[test]
fn CodecError___into_DispatchError___maps_to_codec_kind() {
    let err = CodecError::InvalidFrame("truncated".to_string());

    let dispatch: DispatchError = err.into();

    assert!(matches!(dispatch, DispatchError::Codec(ref msg) if msg.contains("truncated")));
    assert_eq!(dispatch.error_code(), 7);
}
