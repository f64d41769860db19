#![allow(non_snake_case)]

use super::*;
use channelgen_core::SchemaNode;

fn market() -> (ServiceDescriptor, MessageTypes) {
    let key = DispatchKey::body("event");
    let mut channel = Channel::new("/market", Direction::Both);
    channel.dispatch_key = Some(key.clone());
    channel.messages = vec![
        Message::new("subscribe", SchemaNode::any(), Direction::Send)
            .with_dispatch(key.clone(), None),
        Message::new("trade", SchemaNode::any(), Direction::Receive)
            .with_dispatch(key.clone(), Some("T".to_string())),
        Message::new("ping", SchemaNode::any(), Direction::Send)
            .with_dispatch(key.clone(), None)
            .with_response("pong"),
        Message::new("pong", SchemaNode::any(), Direction::Receive).with_dispatch(key, None),
    ];

    let mut service = ServiceDescriptor::new("Market", "1.0.0");
    service.channels.push(channel);

    let mut types = MessageTypes::new();
    types.insert("/market", "subscribe", "Subscribe");
    types.insert("/market", "trade", "Trade");
    types.insert("/market", "ping", "Frame");
    types.insert("/market", "pong", "Frame");
    (service, types)
}

#[test]
fn generate_clients___one_client_per_channel___named_after_channel() {
    let (service, types) = market();

    let clients =
        generate_clients(&service, &types, &HashSet::new(), &GeneratorConfig::default()).unwrap();

    assert_eq!(clients.len(), 1);
    assert_eq!(clients[0].name, "MarketClient");
    assert_eq!(clients[0].channel, "/market");
    assert_eq!(clients[0].routing_fn, "market_client_routing");
    assert_eq!(clients[0].dispatch_key, Some(DispatchKey::body("event")));
}

#[test]
fn generate_clients___methods_follow_message_operations() {
    let (service, types) = market();

    let clients =
        generate_clients(&service, &types, &HashSet::new(), &GeneratorConfig::default()).unwrap();
    let client = &clients[0];

    let names: Vec<&str> = client.methods.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["send_subscribe", "on_trade", "ping"]);
    assert_eq!(client.method("send_subscribe").unwrap().kind, MethodKind::Send);
    assert_eq!(
        client.method("on_trade").unwrap().kind,
        MethodKind::Receive {
            pipe_key: "T".to_string()
        }
    );
    assert_eq!(
        client.method("ping").unwrap().kind,
        MethodKind::Request {
            reply_message: "pong".to_string(),
            reply_type: "Frame".to_string(),
            reply_key: "pong".to_string(),
        }
    );
}

#[test]
fn generate_clients___reply_only_message___no_receiver_or_pipe() {
    let (service, types) = market();

    let clients =
        generate_clients(&service, &types, &HashSet::new(), &GeneratorConfig::default()).unwrap();

    assert!(clients[0].method("on_pong").is_none());
    assert_eq!(clients[0].pipe_keys, vec!["T".to_string()]);
    assert_eq!(clients[0].first_receiver().unwrap().name, "on_trade");
}

#[test]
fn generate_clients___literal_dispatch_values___listed_for_every_message() {
    let (mut service, types) = market();
    service.channels[0].messages[3].dispatch_value = Some("pong".to_string());

    let clients =
        generate_clients(&service, &types, &HashSet::new(), &GeneratorConfig::default()).unwrap();

    assert_eq!(
        clients[0].dispatch_values,
        vec![
            ("trade".to_string(), "T".to_string()),
            ("pong".to_string(), "pong".to_string())
        ]
    );
}

#[test]
fn generate_clients___name_taken_by_type___suffixed() {
    let (service, types) = market();
    let taken: HashSet<String> = ["MarketClient".to_string()].into();

    let clients = generate_clients(&service, &types, &taken, &GeneratorConfig::default()).unwrap();

    assert_eq!(clients[0].name, "MarketClient1");
}

#[test]
fn generate_clients___custom_suffix___applied() {
    let (service, types) = market();
    let config = GeneratorConfig {
        client_suffix: "Service".to_string(),
        ..GeneratorConfig::default()
    };

    let clients = generate_clients(&service, &types, &HashSet::new(), &config).unwrap();

    assert_eq!(clients[0].name, "MarketService");
}

#[test]
fn generate_clients___method_named_like_lifecycle___suffixed() {
    let mut channel = Channel::new("ctl", Direction::Send);
    channel.messages = vec![
        Message::new("close", SchemaNode::any(), Direction::Send).with_response("closed"),
        Message::new("closed", SchemaNode::any(), Direction::Receive),
    ];
    let mut service = ServiceDescriptor::new("Ctl", "1");
    service.channels.push(channel);
    let mut types = MessageTypes::new();
    types.insert("ctl", "close", "Close");
    types.insert("ctl", "closed", "Closed");

    let clients =
        generate_clients(&service, &types, &HashSet::new(), &GeneratorConfig::default()).unwrap();

    assert_eq!(clients[0].methods[0].name, "close_2");
}

#[test]
fn generate_clients___missing_payload_type___malformed() {
    let (service, _) = market();

    let result = generate_clients(
        &service,
        &MessageTypes::new(),
        &HashSet::new(),
        &GeneratorConfig::default(),
    );

    assert!(matches!(result, Err(GenerationError::Malformed(_))));
}

#[test]
fn generate_clients___reply_not_on_channel___malformed() {
    let mut channel = Channel::new("rpc", Direction::Send);
    channel.messages =
        vec![Message::new("ask", SchemaNode::any(), Direction::Send).with_response("answer")];
    let mut service = ServiceDescriptor::new("Rpc", "1");
    service.channels.push(channel);
    let mut types = MessageTypes::new();
    types.insert("rpc", "ask", "Ask");

    let result = generate_clients(&service, &types, &HashSet::new(), &GeneratorConfig::default());

    assert!(matches!(result, Err(GenerationError::Malformed(_))));
}
