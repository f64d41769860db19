//! Rust source rendering
//!
//! Turns [`GeneratedFile`]s into source text. Records become serde structs,
//! unions become untagged enums and aliases become `pub type`. Clients wrap a
//! `DispatchRouter`; their routing tables live in the `routing` module and
//! their smoke tests in `tests`. Layout beyond one item per block is left to
//! a formatter.

use crate::client::{ClientDeclaration, MethodKind};
use crate::generate::{Declaration, FileRole, GeneratedFile, GenerationOutput, TestDeclaration};
use crate::naming::{type_ident, unraw};
use crate::router::RoutingDeclaration;
use crate::types::{
    DeclBody, FieldDecl, ImportRequirement, Presence, RecordDecl, RestField, TypeDeclaration,
    TypeExpr, TypeKind,
};
use channelgen_core::{Constraints, DispatchKey, GeneratorConfig, RoutingTable};
use std::collections::{BTreeSet, HashSet};

/// Field holding undeclared properties of open and typed records
const REST_FIELD: &str = "additional_properties";

const DERIVES: &str = "#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]";

/// Settings shared by every rendered file of one run
#[derive(Debug, Clone, PartialEq)]
pub struct RenderContext {
    pub title: String,
    pub version: String,
    pub runtime_crate: String,
}

impl RenderContext {
    pub fn new(output: &GenerationOutput, config: &GeneratorConfig) -> Self {
        Self {
            title: output.title.clone(),
            version: output.version.clone(),
            runtime_crate: config.runtime_crate.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedFile {
    pub role: FileRole,
    /// `<module>.rs`
    pub file_name: String,
    pub source: String,
}

/// Render every file of a generation run
pub fn render_output(output: &GenerationOutput, config: &GeneratorConfig) -> Vec<RenderedFile> {
    let ctx = RenderContext::new(output, config);
    let files: Vec<RenderedFile> = output
        .files
        .iter()
        .map(|file| RenderedFile {
            role: file.role,
            file_name: format!("{}.rs", file.role.module_name()),
            source: render_file(file, &ctx),
        })
        .collect();
    tracing::info!(files = files.len(), "rendered sources");
    files
}

/// Render one file
pub fn render_file(file: &GeneratedFile, ctx: &RenderContext) -> String {
    match file.role {
        FileRole::Types => render_types(file, ctx),
        FileRole::Client => render_clients(file, ctx),
        FileRole::Utils => render_routing(file, ctx),
        FileRole::Tests => render_tests(file, ctx),
    }
}

fn header(code: &mut String, role: &str, ctx: &RenderContext) {
    code.push_str(&format!(
        "//! {role} for {} {}\n//!\n//! Generated by channelgen. Do not edit.\n\n",
        ctx.title, ctx.version
    ));
}

// ============================================================================
// Types
// ============================================================================

fn render_types(file: &GeneratedFile, ctx: &RenderContext) -> String {
    let decls: Vec<&TypeDeclaration> = file
        .declarations
        .iter()
        .filter_map(|d| match d {
            Declaration::Type(decl) => Some(decl),
            _ => None,
        })
        .collect();

    let mut code = String::new();
    header(&mut code, "Message types", ctx);

    let imports: BTreeSet<ImportRequirement> = decls
        .iter()
        .flat_map(|d| d.imports.iter().copied())
        .chain(std::iter::once(ImportRequirement::Serde))
        .collect();
    for import in &imports {
        code.push_str(&format!("use {};\n", import.use_path()));
    }

    for decl in decls {
        code.push('\n');
        render_declaration(&mut code, decl);
    }
    code
}

/// Render one type declaration
pub fn render_declaration(code: &mut String, decl: &TypeDeclaration) {
    docs(code, "", decl.docs.as_deref());
    if let Some(constraints) = &decl.constraints {
        constraint_docs(code, "", constraints);
    }

    match &decl.body {
        DeclBody::Record(record) => render_record(code, &decl.name, record),
        DeclBody::Union(members) => render_union(code, &decl.name, members),
        DeclBody::Alias(target) => {
            code.push_str(&format!(
                "pub type {} = {};\n",
                decl.name,
                rust_type(target, &decl.name)
            ));
        }
    }
}

fn render_record(code: &mut String, name: &str, record: &RecordDecl) {
    code.push_str(DERIVES);
    code.push('\n');
    if record.rest == RestField::Closed {
        code.push_str("#[serde(deny_unknown_fields)]\n");
    }
    code.push_str(&format!("pub struct {name} {{\n"));

    for field in &record.fields {
        render_field(code, name, field);
    }

    let rest_value = match &record.rest {
        RestField::Open => Some("Value".to_string()),
        RestField::Typed(ty) => Some(rust_type(ty, name)),
        RestField::Closed => None,
    };
    if let Some(value) = rest_value {
        let taken: HashSet<&str> = record.fields.iter().map(|f| unraw(&f.ident)).collect();
        let mut ident = REST_FIELD.to_string();
        while taken.contains(ident.as_str()) {
            ident.push('_');
        }
        code.push_str("    #[serde(flatten)]\n");
        code.push_str(&format!("    pub {ident}: HashMap<String, {value}>,\n"));
    }

    code.push_str("}\n");
}

fn render_field(code: &mut String, owner: &str, field: &FieldDecl) {
    docs(code, "    ", field.docs.as_deref());
    if let Presence::Defaulted(value) = &field.presence {
        code.push_str(&format!("    /// Defaults to `{value}` when absent.\n"));
    }
    if let Some(constraints) = &field.constraints {
        constraint_docs(code, "    ", constraints);
    }

    let mut serde_args = Vec::new();
    if unraw(&field.ident) != field.wire_name {
        serde_args.push(format!("rename = {:?}", field.wire_name));
    }
    let ty = match field.presence {
        Presence::Required => rust_type(&field.ty, owner),
        Presence::Optional | Presence::Defaulted(_) => {
            serde_args.push("default".to_string());
            serde_args.push("skip_serializing_if = \"Option::is_none\"".to_string());
            format!("Option<{}>", rust_type(&field.ty.non_null(), owner))
        }
    };
    if !serde_args.is_empty() {
        code.push_str(&format!("    #[serde({})]\n", serde_args.join(", ")));
    }
    code.push_str(&format!("    pub {}: {ty},\n", field.ident));
}

fn render_union(code: &mut String, name: &str, members: &[TypeExpr]) {
    code.push_str(DERIVES);
    code.push_str("\n#[serde(untagged)]\n");
    code.push_str(&format!("pub enum {name} {{\n"));

    let mut used = HashSet::new();
    for member in members {
        let base = type_ident(&member.label());
        let mut variant = base.clone();
        let mut i = 2;
        while !used.insert(variant.clone()) {
            variant = format!("{base}{i}");
            i += 1;
        }
        code.push_str(&format!("    {variant}({}),\n", rust_type(member, name)));
    }
    code.push_str("}\n");
}

/// Rust spelling of a type at a use site inside `owner`
///
/// A direct reference to `owner` is boxed.
pub fn rust_type(expr: &TypeExpr, owner: &str) -> String {
    let inner = match &expr.kind {
        TypeKind::Primitive(primitive) => primitive.rust_type().to_string(),
        TypeKind::Array(items) => format!("Vec<{}>", rust_type(items, "")),
        TypeKind::Map(values) => format!("HashMap<String, {}>", rust_type(values, "")),
        TypeKind::Named(name) if name == owner => format!("Box<{name}>"),
        TypeKind::Named(name) => name.clone(),
        // Hoisted before rendering; an untyped value is the only safe spelling
        TypeKind::Union(_) | TypeKind::Any => "Value".to_string(),
    };
    if expr.nullable {
        format!("Option<{inner}>")
    } else {
        inner
    }
}

fn docs(code: &mut String, indent: &str, docs: Option<&str>) {
    let Some(docs) = docs else { return };
    for line in docs.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            code.push_str(&format!("{indent}///\n"));
        } else {
            code.push_str(&format!("{indent}/// {line}\n"));
        }
    }
}

fn constraint_docs(code: &mut String, indent: &str, constraints: &Constraints) {
    let mut parts = Vec::new();
    let mut bound = |label: &str, value: Option<String>| {
        if let Some(value) = value {
            parts.push(format!("{label} {value}"));
        }
    };
    bound("minimum", constraints.minimum.map(|v| v.to_string()));
    bound("maximum", constraints.maximum.map(|v| v.to_string()));
    bound("exclusiveMinimum", constraints.exclusive_minimum.map(|v| v.to_string()));
    bound("exclusiveMaximum", constraints.exclusive_maximum.map(|v| v.to_string()));
    bound("minLength", constraints.min_length.map(|v| v.to_string()));
    bound("maxLength", constraints.max_length.map(|v| v.to_string()));
    bound("pattern", constraints.pattern.as_ref().map(|p| format!("`{p}`")));
    bound("minItems", constraints.min_items.map(|v| v.to_string()));
    if !constraints.enum_values.is_empty() {
        let values: Vec<String> = constraints.enum_values.iter().map(|v| v.to_string()).collect();
        parts.push(format!("one of {}", values.join(", ")));
    }
    if !parts.is_empty() {
        code.push_str(&format!("{indent}///\n{indent}/// Constraints: {}.\n", parts.join("; ")));
    }
}

// ============================================================================
// Clients
// ============================================================================

fn render_clients(file: &GeneratedFile, ctx: &RenderContext) -> String {
    let clients: Vec<&ClientDeclaration> = file
        .declarations
        .iter()
        .filter_map(|d| match d {
            Declaration::Client(client) => Some(client),
            _ => None,
        })
        .collect();

    let mut code = String::new();
    header(&mut code, "Clients", ctx);

    let has_methods = clients.iter().any(|c| !c.methods.is_empty());
    let needs_timeout = clients
        .iter()
        .flat_map(|c| c.methods.iter())
        .any(|m| !matches!(m.kind, MethodKind::Send));

    code.push_str("use super::routing;\n");
    if has_methods {
        code.push_str("use super::types::*;\n");
    }
    code.push_str(&format!(
        "use {}::{{DispatchResult, DispatchRouter, MessageSink, MessageSource, RouterConfig}};\n",
        ctx.runtime_crate
    ));
    if needs_timeout {
        code.push_str("use std::time::Duration;\n");
    }

    code.push_str(&format!("\npub const SERVICE_TITLE: &str = {:?};\n", ctx.title));
    code.push_str(&format!("pub const SERVICE_VERSION: &str = {:?};\n", ctx.version));

    for client in clients {
        code.push('\n');
        render_client(&mut code, client);
    }
    code
}

fn render_client(code: &mut String, client: &ClientDeclaration) {
    let name = &client.name;
    docs(code, "", client.docs.as_deref());
    code.push_str(&format!("pub struct {name} {{\n    router: DispatchRouter,\n}}\n\n"));
    code.push_str(&format!("impl {name} {{\n"));

    code.push_str(&format!(
        "    pub const CHANNEL: &'static str = {:?};\n",
        client.channel
    ));
    code.push_str(&format!(
        "    pub const DISPATCH_KEY: Option<&'static str> = {};\n",
        optional_key(client.dispatch_key.as_ref())
    ));
    code.push_str(&format!(
        "    pub const STREAM_ID: Option<&'static str> = {};\n",
        optional_key(client.stream_id.as_ref())
    ));

    code.push_str(
        "    /// Method, message and reply message of every operation\n    pub const OPERATIONS: &'static [(&'static str, &'static str, &'static str)] = &[\n",
    );
    for method in &client.methods {
        let reply = match &method.kind {
            MethodKind::Request { reply_message, .. } => reply_message.as_str(),
            _ => "",
        };
        code.push_str(&format!(
            "        ({:?}, {:?}, {:?}),\n",
            unraw(&method.name),
            method.message,
            reply
        ));
    }
    code.push_str("    ];\n");

    code.push_str(
        "    /// Literal dispatch values, by message\n    pub const DISPATCH_VALUES: &'static [(&'static str, &'static str)] = &[\n",
    );
    for (message, value) in &client.dispatch_values {
        code.push_str(&format!("        ({message:?}, {value:?}),\n"));
    }
    code.push_str("    ];\n\n");

    code.push_str(
        "    /// Start the dispatch router and register this client's pipes\n    pub fn connect<S, K>(source: S, sink: K, config: RouterConfig) -> DispatchResult<Self>\n    where\n        S: MessageSource,\n        K: MessageSink,\n    {\n",
    );
    let pipes: Vec<String> = client.pipe_keys.iter().map(|key| format!("{key:?}")).collect();
    code.push_str(&format!(
        "        let router = DispatchRouter::connect(source, sink, routing::{}(), config, &[{}])?;\n",
        client.routing_fn,
        pipes.join(", ")
    ));
    code.push_str("        Ok(Self { router })\n    }\n\n");

    code.push_str("    pub fn router(&self) -> &DispatchRouter {\n        &self.router\n    }\n");

    for method in &client.methods {
        code.push('\n');
        docs(code, "    ", method.docs.as_deref());
        let payload = &method.payload_type;
        match &method.kind {
            MethodKind::Send => {
                code.push_str(&format!(
                    "    pub async fn {}(&self, message: &{payload}) -> DispatchResult<()> {{\n        self.router.send(message).await\n    }}\n",
                    method.name
                ));
            }
            MethodKind::Request {
                reply_type,
                reply_key,
                ..
            } => {
                code.push_str(&format!(
                    "    pub async fn {}(\n        &self,\n        message: &{payload},\n        timeout: Option<Duration>,\n    ) -> DispatchResult<{reply_type}> {{\n        self.router.request(message, {reply_key:?}, timeout).await\n    }}\n",
                    method.name
                ));
            }
            MethodKind::Receive { pipe_key } => {
                code.push_str(&format!(
                    "    pub async fn {}(&self, timeout: Option<Duration>) -> DispatchResult<{payload}> {{\n        self.router.consume({pipe_key:?}, timeout).await\n    }}\n",
                    method.name
                ));
            }
        }
    }

    code.push_str(
        "\n    pub fn is_closed(&self) -> bool {\n        self.router.is_closed()\n    }\n\n    /// Close the connection and every pipe\n    pub fn close(&self) {\n        self.router.close();\n    }\n\n    pub async fn shutdown(&self) {\n        self.router.shutdown().await;\n    }\n}\n",
    );
}

fn optional_key(key: Option<&DispatchKey>) -> String {
    match key {
        Some(key) => format!("Some({:?})", key.to_string()),
        None => "None".to_string(),
    }
}

// ============================================================================
// Routing
// ============================================================================

fn render_routing(file: &GeneratedFile, ctx: &RenderContext) -> String {
    let mut code = String::new();
    header(&mut code, "Routing tables", ctx);

    let routings: Vec<&RoutingDeclaration> = file
        .declarations
        .iter()
        .filter_map(|d| match d {
            Declaration::Routing(routing) => Some(routing),
            _ => None,
        })
        .collect();
    let keyed = routings
        .iter()
        .any(|r| r.table.dispatch_key.is_some() || r.table.stream_id.is_some());
    if keyed {
        code.push_str(&format!(
            "use {}::{{DispatchKey, KeyLocation, RoutingTable}};\n",
            ctx.runtime_crate
        ));
    } else {
        code.push_str(&format!("use {}::RoutingTable;\n", ctx.runtime_crate));
    }

    for routing in routings {
        code.push('\n');
        render_routing_fn(&mut code, routing);
    }
    code
}

fn render_routing_fn(code: &mut String, routing: &RoutingDeclaration) {
    let table: &RoutingTable = &routing.table;
    code.push_str(&format!(
        "/// Routing table for [`super::client::{}`]\npub fn {}() -> RoutingTable {{\n    RoutingTable::new({:?})\n",
        routing.client, routing.fn_name, table.channel
    ));
    if let Some(key) = &table.dispatch_key {
        code.push_str(&format!("        .with_dispatch_key({})\n", key_expr(key)));
    }
    if let Some(key) = &table.stream_id {
        code.push_str(&format!("        .with_stream_id({})\n", key_expr(key)));
    }
    if let Some(pipe) = &table.default_pipe {
        code.push_str(&format!("        .with_default_pipe({pipe:?})\n"));
    }
    for route in &table.routes {
        code.push_str(&format!(
            "        .route({:?}, {:?})\n",
            route.dispatch_value, route.message
        ));
    }
    code.push_str("}\n");
}

fn key_expr(key: &DispatchKey) -> String {
    let location = match key.location {
        channelgen_core::KeyLocation::Header => "KeyLocation::Header",
        channelgen_core::KeyLocation::Body => "KeyLocation::Body",
    };
    format!("DispatchKey::new({:?}, {location})", key.dotted())
}

// ============================================================================
// Tests
// ============================================================================

fn render_tests(file: &GeneratedFile, ctx: &RenderContext) -> String {
    let tests: Vec<&TestDeclaration> = file
        .declarations
        .iter()
        .filter_map(|d| match d {
            Declaration::Test(test) => Some(test),
            _ => None,
        })
        .collect();

    let mut code = String::new();
    header(&mut code, "Client smoke tests", ctx);
    let probes = tests.iter().any(|t| t.probe.is_some());
    code.push_str("use super::client::*;\n");
    if probes {
        code.push_str(&format!(
            "use {}::{{DispatchError, RouterConfig, memory_connection}};\n",
            ctx.runtime_crate
        ));
        code.push_str("use std::time::Duration;\n");
    } else {
        code.push_str(&format!(
            "use {}::{{RouterConfig, memory_connection}};\n",
            ctx.runtime_crate
        ));
    }

    for test in tests {
        code.push_str(&format!(
            "\n#[tokio::test]\nasync fn {}() {{\n    let (source, sink, _peer) = memory_connection(16);\n    let client = {}::connect(source, sink, RouterConfig::default()).unwrap();\n    assert_eq!({}::CHANNEL, {:?});\n\n    client.close();\n    assert!(client.is_closed());\n",
            test.name, test.client, test.client, test.channel
        ));
        if let Some(probe) = &test.probe {
            code.push_str(&format!(
                "    let result = client.{probe}(Some(Duration::from_millis(50))).await;\n    assert!(matches!(result, Err(DispatchError::ConnectionClosed)));\n"
            ));
        }
        code.push_str("    client.shutdown().await;\n}\n");
    }
    code
}

#[cfg(test)]
#[path = "render/render_tests.rs"]
mod render_tests;
