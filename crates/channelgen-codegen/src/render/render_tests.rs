#![allow(non_snake_case)]

use super::*;
use crate::client::MethodDecl;
use crate::types::PrimitiveType;
use serde_json::json;

fn ctx() -> RenderContext {
    RenderContext {
        title: "Market".to_string(),
        version: "1.0.0".to_string(),
        runtime_crate: "channelgen_runtime".to_string(),
    }
}

fn field(wire: &str, ident: &str, ty: TypeExpr, presence: Presence) -> FieldDecl {
    FieldDecl {
        wire_name: wire.to_string(),
        ident: ident.to_string(),
        ty,
        presence,
        constraints: None,
        docs: None,
    }
}

fn string() -> TypeExpr {
    TypeExpr::primitive(PrimitiveType::String)
}

fn render(decl: &TypeDeclaration) -> String {
    let mut code = String::new();
    render_declaration(&mut code, decl);
    code
}

#[test]
fn render_declaration___closed_record___serde_struct() {
    let decl = TypeDeclaration::new(
        "Trade",
        DeclBody::Record(RecordDecl {
            fields: vec![
                field("id", "id", string(), Presence::Required),
                field("type", "r#type", string(), Presence::Required),
                field(
                    "price",
                    "price",
                    TypeExpr::primitive(PrimitiveType::F64),
                    Presence::Optional,
                ),
                field("tradeId", "trade_id", string(), Presence::Required),
            ],
            rest: RestField::Closed,
        }),
    )
    .with_docs(Some("A fill".to_string()));

    let code = render(&decl);

    assert!(
        code.starts_with("/// A fill\n#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]\n")
    );
    assert!(code.contains("#[serde(deny_unknown_fields)]\npub struct Trade {\n"));
    assert!(code.contains("    pub id: String,\n"));
    assert!(code.contains("    pub r#type: String,\n"));
    assert!(code.contains(
        "    #[serde(default, skip_serializing_if = \"Option::is_none\")]\n    pub price: Option<f64>,\n"
    ));
    assert!(code.contains("    #[serde(rename = \"tradeId\")]\n    pub trade_id: String,\n"));
}

#[test]
fn render_declaration___open_record___flattened_catch_all() {
    let decl = TypeDeclaration::new(
        "Bag",
        DeclBody::Record(RecordDecl {
            fields: vec![field(
                "additional_properties",
                "additional_properties",
                string(),
                Presence::Required,
            )],
            rest: RestField::Open,
        }),
    );

    let code = render(&decl);

    assert!(!code.contains("deny_unknown_fields"));
    assert!(
        code.contains("    #[serde(flatten)]\n    pub additional_properties_: HashMap<String, Value>,\n")
    );
}

#[test]
fn render_declaration___required_nullable_and_defaulted_fields() {
    let decl = TypeDeclaration::new(
        "Node",
        DeclBody::Record(RecordDecl {
            fields: vec![
                field(
                    "next",
                    "next",
                    TypeExpr::named("Node").with_nullable(true),
                    Presence::Required,
                ),
                field(
                    "size",
                    "size",
                    TypeExpr::primitive(PrimitiveType::I64),
                    Presence::Defaulted(json!(3)),
                ),
            ],
            rest: RestField::Typed(TypeExpr::primitive(PrimitiveType::I32)),
        }),
    );

    let code = render(&decl);

    assert!(code.contains("    pub next: Option<Box<Node>>,\n"));
    assert!(code.contains("    /// Defaults to `3` when absent.\n"));
    assert!(code.contains("    pub size: Option<i64>,\n"));
    assert!(code.contains("    pub additional_properties: HashMap<String, i32>,\n"));
}

#[test]
fn render_declaration___union___untagged_enum() {
    let decl = TypeDeclaration::new(
        "Tag",
        DeclBody::Union(vec![
            string(),
            TypeExpr::primitive(PrimitiveType::I64),
            TypeExpr::array(TypeExpr::named("Trade")),
        ]),
    );

    let code = render(&decl);

    assert!(code.contains("#[serde(untagged)]\npub enum Tag {\n"));
    assert!(code.contains("    String(String),\n"));
    assert!(code.contains("    I64(i64),\n"));
    assert!(code.contains("    TradeList(Vec<Trade>),\n"));
}

#[test]
fn render_declaration___alias_with_constraints___documented() {
    let decl = TypeDeclaration::new("Symbol", DeclBody::Alias(string())).with_constraints(Some(
        Constraints {
            min_length: Some(1),
            pattern: Some("^[A-Z]+$".to_string()),
            ..Constraints::default()
        },
    ));

    let code = render(&decl);

    assert!(code.contains("/// Constraints: minLength 1; pattern `^[A-Z]+$`.\n"));
    assert!(code.ends_with("pub type Symbol = String;\n"));
}

#[test]
fn rust_type___containers_and_nullability() {
    let expr = TypeExpr::map(TypeExpr::array(TypeExpr::any()).with_nullable(true));

    assert_eq!(rust_type(&expr, "X"), "HashMap<String, Option<Vec<Value>>>");
    assert_eq!(
        rust_type(&TypeExpr::primitive(PrimitiveType::Bytes), "X"),
        "Vec<u8>"
    );
}

fn market_client() -> ClientDeclaration {
    ClientDeclaration {
        name: "MarketClient".to_string(),
        channel: "/market".to_string(),
        dispatch_key: Some(DispatchKey::body("event")),
        stream_id: None,
        methods: vec![
            MethodDecl {
                name: "send_order".to_string(),
                message: "order".to_string(),
                payload_type: "Order".to_string(),
                kind: MethodKind::Send,
                docs: None,
            },
            MethodDecl {
                name: "ping".to_string(),
                message: "ping".to_string(),
                payload_type: "Frame".to_string(),
                kind: MethodKind::Request {
                    reply_message: "pong".to_string(),
                    reply_type: "Frame".to_string(),
                    reply_key: "pong".to_string(),
                },
                docs: None,
            },
            MethodDecl {
                name: "on_trade".to_string(),
                message: "trade".to_string(),
                payload_type: "Trade".to_string(),
                kind: MethodKind::Receive {
                    pipe_key: "T".to_string(),
                },
                docs: Some("A fill".to_string()),
            },
        ],
        pipe_keys: vec!["T".to_string()],
        dispatch_values: vec![("trade".to_string(), "T".to_string())],
        routing_fn: "market_client_routing".to_string(),
        docs: None,
    }
}

#[test]
fn render_file___client___wraps_dispatch_router() {
    let file = GeneratedFile {
        role: FileRole::Client,
        declarations: vec![Declaration::Client(market_client())],
    };

    let code = render_file(&file, &ctx());

    assert!(code.contains("pub const SERVICE_TITLE: &str = \"Market\";\n"));
    assert!(code.contains("use std::time::Duration;\n"));
    assert!(code.contains("pub struct MarketClient {\n    router: DispatchRouter,\n}\n"));
    assert!(
        code.contains("    pub const DISPATCH_KEY: Option<&'static str> = Some(\"body:event\");\n")
    );
    assert!(code.contains("        (\"ping\", \"ping\", \"pong\"),\n"));
    assert!(code.contains("        (\"trade\", \"T\"),\n"));
    assert!(code.contains("DispatchRouter::connect(source, sink, routing::market_client_routing(), config, &[\"T\"])?;\n"));
    assert!(
        code.contains("    pub async fn send_order(&self, message: &Order) -> DispatchResult<()> {\n")
    );
    assert!(code.contains("self.router.request(message, \"pong\", timeout).await"));
    assert!(code.contains("    /// A fill\n    pub async fn on_trade(&self, timeout: Option<Duration>) -> DispatchResult<Trade> {\n"));
    assert!(code.contains("self.router.consume(\"T\", timeout).await"));
}

#[test]
fn render_file___routing___builder_chain() {
    let table = RoutingTable::new("/market")
        .with_dispatch_key(DispatchKey::body("meta.event"))
        .route("T", "Trade");
    let file = GeneratedFile {
        role: FileRole::Utils,
        declarations: vec![Declaration::Routing(RoutingDeclaration {
            fn_name: "market_client_routing".to_string(),
            client: "MarketClient".to_string(),
            table,
        })],
    };

    let code = render_file(&file, &ctx());

    assert!(code.contains("use channelgen_runtime::{DispatchKey, KeyLocation, RoutingTable};\n"));
    assert!(code.contains(
        "pub fn market_client_routing() -> RoutingTable {\n    RoutingTable::new(\"/market\")\n        .with_dispatch_key(DispatchKey::new(\"meta.event\", KeyLocation::Body))\n        .route(\"T\", \"Trade\")\n}\n"
    ));
}

#[test]
fn render_file___tests___probe_after_close() {
    let file = GeneratedFile {
        role: FileRole::Tests,
        declarations: vec![Declaration::Test(TestDeclaration {
            name: "market_client_connects_and_closes".to_string(),
            client: "MarketClient".to_string(),
            channel: "/market".to_string(),
            probe: Some("on_trade".to_string()),
        })],
    };

    let code = render_file(&file, &ctx());

    assert!(code.contains("#[tokio::test]\nasync fn market_client_connects_and_closes() {\n"));
    assert!(code.contains("client.on_trade(Some(Duration::from_millis(50))).await"));
    assert!(code.contains("Err(DispatchError::ConnectionClosed)"));
}

#[test]
fn render_file___custom_runtime_crate___used_in_imports() {
    let file = GeneratedFile {
        role: FileRole::Client,
        declarations: vec![Declaration::Client(market_client())],
    };
    let ctx = RenderContext {
        runtime_crate: "my_runtime".to_string(),
        ..ctx()
    };

    let code = render_file(&file, &ctx);

    assert!(code.contains("use my_runtime::{DispatchResult, DispatchRouter"));
}

#[test]
fn render_file___every_output_parses_as_rust() {
    let files = [
        GeneratedFile {
            role: FileRole::Client,
            declarations: vec![Declaration::Client(market_client())],
        },
        GeneratedFile {
            role: FileRole::Types,
            declarations: vec![Declaration::Type(TypeDeclaration::new(
                "Tag",
                DeclBody::Union(vec![string(), TypeExpr::named("Trade")]),
            ))],
        },
    ];

    for file in &files {
        let code = render_file(file, &ctx());
        assert!(syn::parse_file(&code).is_ok(), "{code}");
    }
}
