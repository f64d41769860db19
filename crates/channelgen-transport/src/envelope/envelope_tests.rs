#![allow(non_snake_case)]

use super::*;
use channelgen_core::KeyLocation;
use serde_json::json;
use test_case::test_case;

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct Trade {
    event: String,
    price: f64,
}

#[test]
fn MessageEnvelope___dispatch_value___reads_top_level_body_field() {
    let envelope = MessageEnvelope::new(json!({"event": "trade", "price": 1.5}));
    let key = DispatchKey::body("event");

    assert_eq!(envelope.dispatch_value(&key), Some("trade"));
}

#[test]
fn MessageEnvelope___dispatch_value___follows_nested_path() {
    let envelope = MessageEnvelope::new(json!({"meta": {"kind": "book"}}));
    let key = DispatchKey::body("meta.kind");

    assert_eq!(envelope.dispatch_value(&key), Some("book"));
}

#[test]
fn MessageEnvelope___dispatch_value___reads_header_location() {
    let envelope =
        MessageEnvelope::new(json!({"event": "wrong"})).with_header("type", json!("right"));
    let key = DispatchKey::new("type", KeyLocation::Header);

    assert_eq!(envelope.dispatch_value(&key), Some("right"));
}

#[test_case(json!({}) ; "missing field")]
#[test_case(json!({"event": 3}) ; "number value")]
#[test_case(json!({"event": null}) ; "null value")]
#[test_case(json!({"event": ""}) ; "empty string")]
#[test_case(json!([1, 2]) ; "array body")]
#[test_case(json!("event") ; "string body")]
fn MessageEnvelope___dispatch_value___absent_for_unusable_values(body: Value) {
    let envelope = MessageEnvelope::new(body);

    assert_eq!(envelope.dispatch_value(&DispatchKey::body("event")), None);
}

#[test]
fn MessageEnvelope___lookup___returns_non_string_values() {
    let envelope = MessageEnvelope::new(json!({"a": {"b": [1, 2]}}));

    assert_eq!(
        envelope.lookup(&DispatchKey::body("a.b")),
        Some(&json!([1, 2]))
    );
}

#[test]
fn MessageEnvelope___set_field___creates_nested_objects() {
    let mut envelope = MessageEnvelope::new(json!({"price": 2}));

    let written = envelope.set_field(&DispatchKey::body("meta.stream"), json!("s-1"));

    assert!(written);
    assert_eq!(envelope.body, json!({"price": 2, "meta": {"stream": "s-1"}}));
}

#[test]
fn MessageEnvelope___set_field___null_body_becomes_object() {
    let mut envelope = MessageEnvelope::default();

    assert!(envelope.set_field(&DispatchKey::body("event"), json!("ping")));
    assert_eq!(envelope.dispatch_value(&DispatchKey::body("event")), Some("ping"));
}

#[test]
fn MessageEnvelope___set_field___header_location_writes_header() {
    let mut envelope = MessageEnvelope::new(json!({}));
    let key = DispatchKey::new("stream", KeyLocation::Header);

    assert!(envelope.set_field(&key, json!("abc")));
    assert_eq!(envelope.headers.get("stream"), Some(&json!("abc")));
    assert_eq!(envelope.body, json!({}));
}

#[test]
fn MessageEnvelope___set_field___through_scalar_fails() {
    let mut envelope = MessageEnvelope::new(json!({"meta": 5}));

    assert!(!envelope.set_field(&DispatchKey::body("meta.kind"), json!("x")));
    assert_eq!(envelope.body, json!({"meta": 5}));
}

#[test]
fn MessageEnvelope___set_field___non_object_body_fails() {
    let mut envelope = MessageEnvelope::new(json!([1]));

    assert!(!envelope.set_field(&DispatchKey::body("event"), json!("x")));
}

#[test]
fn MessageEnvelope___from_typed_and_body_as___roundtrip() {
    let trade = Trade {
        event: "trade".to_string(),
        price: 10.25,
    };

    let envelope = MessageEnvelope::from_typed(&trade).unwrap();
    let back: Trade = envelope.body_as().unwrap();

    assert_eq!(back, trade);
}

#[test]
fn MessageEnvelope___body_as___wrong_shape_fails() {
    let envelope = MessageEnvelope::new(json!({"event": "trade"}));

    let result: Result<Trade, _> = envelope.body_as();

    assert!(result.is_err());
}

#[test]
fn MessageEnvelope___serialize___omits_empty_headers() {
    let envelope = MessageEnvelope::new(json!({"x": 1}));

    let json = String::from_utf8(envelope.to_bytes().unwrap()).unwrap();

    assert!(!json.contains("headers"));
}

#[test]
fn MessageEnvelope___from_bytes___missing_fields_default() {
    let envelope = MessageEnvelope::from_bytes(b"{}").unwrap();

    assert!(envelope.headers.is_empty());
    assert_eq!(envelope.body, Value::Null);
}
