#![allow(non_snake_case)]

use super::*;

#[test]
fn RoutingTable___message_for___finds_route() {
    let table = RoutingTable::new("/events")
        .with_dispatch_key(DispatchKey::body("event"))
        .route("ping", "Ping")
        .route("pong", "Pong");

    assert_eq!(table.message_for("pong"), Some("Pong"));
    assert_eq!(table.message_for("other"), None);
    assert!(table.knows("ping"));
}

#[test]
fn RoutingTable___serde___omits_empty_optionals() {
    let table = RoutingTable::new("/ticks").with_default_pipe("Tick");

    let json = serde_json::to_value(&table).unwrap();

    assert_eq!(
        json,
        serde_json::json!({"channel": "/ticks", "routes": [], "default_pipe": "Tick"})
    );
}

#[test]
fn RoutingTable___serde___roundtrips_keys() {
    let table = RoutingTable::new("/rpc")
        .with_dispatch_key(DispatchKey::body("type"))
        .with_stream_id(DispatchKey::body("id"))
        .route("add", "Add");

    let json = serde_json::to_string(&table).unwrap();
    let back: RoutingTable = serde_json::from_str(&json).unwrap();

    assert_eq!(back, table);
}
