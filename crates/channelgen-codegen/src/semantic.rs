//! Semantic model of native Rust declarations
//!
//! The reverse direction does not read source text itself; it consumes a
//! [`SemanticModel`]. This module builds one from Rust source with [`syn`]:
//!
//! - structs deriving `Serialize`/`Deserialize` become records, with serde
//!   `rename`, `default`, `flatten` and `deny_unknown_fields` honoured
//! - `#[serde(untagged)]` enums with one-field variants become unions, enums
//!   of unit variants become string enumerations
//! - `pub type` items become aliases
//! - an `impl` block declaring a `CHANNEL` constant becomes a service; its
//!   `pub async fn`s taking `&self` are the operations
//!
//! # Service annotations
//!
//! ```rust,ignore
//! impl MarketClient {
//!     pub const CHANNEL: &'static str = "/market";
//!     pub const DISPATCH_KEY: Option<&'static str> = Some("body:event");
//!     pub const STREAM_ID: Option<&'static str> = None;
//!     pub const OPERATIONS: &'static [(&'static str, &'static str, &'static str)] =
//!         &[("on_trade", "trade", "")];
//!     pub const DISPATCH_VALUES: &'static [(&'static str, &'static str)] = &[("trade", "T")];
//! }
//! ```
//!
//! Every constant except `CHANNEL` is optional.

use anyhow::{Context, Result};
use std::path::Path;
use syn::meta::ParseNestedMeta;
use syn::{
    Attribute, Expr, Fields, FnArg, ImplItem, Item, Lit, Meta, Pat, ReturnType, Token, Type,
};

/// Native type of a field, parameter or return value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NativeType {
    String,
    Bool,
    Integer { bits: u8, signed: bool },
    Float { bits: u8 },
    /// `Vec<u8>`
    Bytes,
    List(Box<NativeType>),
    Optional(Box<NativeType>),
    /// Map keyed by `String`
    Map(Box<NativeType>),
    /// `serde_json::Value`
    Json,
    Named(String),
    Unit,
    /// Anything else, spelled as in the source
    Unsupported(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct NativeField {
    pub ident: String,
    /// Name on the wire after `rename`
    pub wire_name: String,
    pub ty: NativeType,
    /// `#[serde(default)]` is present
    pub has_default: bool,
    /// `#[serde(flatten)]` is present
    pub flatten: bool,
    pub docs: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NativeBody {
    Record {
        fields: Vec<NativeField>,
        deny_unknown_fields: bool,
    },
    Union(Vec<NativeType>),
    /// Unit-variant enum, by wire name
    Enumeration(Vec<String>),
    Alias(NativeType),
}

#[derive(Debug, Clone, PartialEq)]
pub struct NativeTypeDecl {
    pub name: String,
    pub docs: Option<String>,
    pub body: NativeBody,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NativeParam {
    pub name: String,
    pub ty: NativeType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NativeOperation {
    pub name: String,
    pub params: Vec<NativeParam>,
    /// `None` for `()`
    pub returns: Option<NativeType>,
    pub docs: Option<String>,
}

/// Entry of a service's operation table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationBinding {
    pub method: String,
    pub message: String,
    /// Reply message, empty when the operation has none
    pub reply: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NativeService {
    pub name: String,
    pub channel: String,
    /// `location:path` spelling of the dispatch key
    pub dispatch_key: Option<String>,
    pub stream_id: Option<String>,
    pub operations: Vec<NativeOperation>,
    pub bindings: Vec<OperationBinding>,
    /// Literal dispatch values by message name
    pub dispatch_values: Vec<(String, String)>,
    pub docs: Option<String>,
}

impl NativeService {
    pub fn binding(&self, method: &str) -> Option<&OperationBinding> {
        self.bindings.iter().find(|b| b.method == method)
    }

    pub fn dispatch_value(&self, message: &str) -> Option<&str> {
        self.dispatch_values
            .iter()
            .find(|(m, _)| m == message)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SemanticModel {
    pub title: Option<String>,
    pub version: Option<String>,
    pub types: Vec<NativeTypeDecl>,
    pub services: Vec<NativeService>,
}

impl SemanticModel {
    /// Parse a Rust source file
    pub fn parse_file(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).with_context(|| format!("Failed to read {path:?}"))?;
        Self::parse_source(&content)
    }

    /// Parse several sources into one model
    pub fn parse_sources<'a>(sources: impl IntoIterator<Item = &'a str>) -> Result<Self> {
        let mut model = Self::default();
        for source in sources {
            model.merge(Self::parse_source(source)?);
        }
        Ok(model)
    }

    /// Parse Rust source code
    pub fn parse_source(source: &str) -> Result<Self> {
        let file = syn::parse_file(source).context("Failed to parse Rust source")?;
        let mut model = Self::default();

        for item in &file.items {
            match item {
                Item::Struct(s) if derives_serde(&s.attrs) => {
                    model.types.push(record(s)?);
                }
                Item::Enum(e) if derives_serde(&e.attrs) => {
                    model.types.push(enumeration(e)?);
                }
                Item::Type(alias) => model.types.push(NativeTypeDecl {
                    name: alias.ident.to_string(),
                    docs: extract_docs(&alias.attrs),
                    body: NativeBody::Alias(native_type(&alias.ty)),
                }),
                Item::Const(c) if c.ident == "SERVICE_TITLE" => model.title = lit_str(&c.expr),
                Item::Const(c) if c.ident == "SERVICE_VERSION" => model.version = lit_str(&c.expr),
                Item::Impl(block) => {
                    if let Some(service) = service(block, &file.items)? {
                        model.services.push(service);
                    }
                }
                _ => {}
            }
        }

        tracing::debug!(
            types = model.types.len(),
            services = model.services.len(),
            "parsed semantic model"
        );
        Ok(model)
    }

    fn merge(&mut self, other: SemanticModel) {
        self.title = self.title.take().or(other.title);
        self.version = self.version.take().or(other.version);
        self.types.extend(other.types);
        self.services.extend(other.services);
    }

    pub fn type_decl(&self, name: &str) -> Option<&NativeTypeDecl> {
        self.types.iter().find(|t| t.name == name)
    }
}

fn derives_serde(attrs: &[Attribute]) -> bool {
    attrs.iter().any(|attr| match &attr.meta {
        Meta::List(list) if list.path.is_ident("derive") => {
            let tokens = list.tokens.to_string();
            tokens.contains("Serialize") || tokens.contains("Deserialize")
        }
        _ => false,
    })
}

fn record(s: &syn::ItemStruct) -> Result<NativeTypeDecl> {
    let name = s.ident.to_string();
    let container = serde_attrs(&s.attrs).with_context(|| format!("serde attributes of {name}"))?;

    let fields = match &s.fields {
        Fields::Named(fields) => fields
            .named
            .iter()
            .map(|f| {
                let ident = f.ident.as_ref().context("Field must have a name")?.to_string();
                let attrs = serde_attrs(&f.attrs)
                    .with_context(|| format!("serde attributes of {name}.{ident}"))?;
                let wire_name = attrs
                    .rename
                    .unwrap_or_else(|| ident.trim_start_matches("r#").to_string());
                Ok(NativeField {
                    wire_name,
                    ty: native_type(&f.ty),
                    has_default: attrs.default,
                    flatten: attrs.flatten,
                    docs: extract_docs(&f.attrs),
                    ident,
                })
            })
            .collect::<Result<Vec<_>>>()?,
        Fields::Unnamed(_) => anyhow::bail!("Tuple struct {name} is not supported"),
        Fields::Unit => Vec::new(),
    };

    Ok(NativeTypeDecl {
        docs: extract_docs(&s.attrs),
        body: NativeBody::Record {
            fields,
            deny_unknown_fields: container.deny_unknown_fields,
        },
        name,
    })
}

fn enumeration(e: &syn::ItemEnum) -> Result<NativeTypeDecl> {
    let name = e.ident.to_string();
    let container = serde_attrs(&e.attrs).with_context(|| format!("serde attributes of {name}"))?;

    let body = if container.untagged {
        let members = e
            .variants
            .iter()
            .map(|v| match &v.fields {
                Fields::Unnamed(fields) if fields.unnamed.len() == 1 => {
                    Ok(native_type(&fields.unnamed[0].ty))
                }
                _ => anyhow::bail!("Variant {name}::{} must wrap exactly one type", v.ident),
            })
            .collect::<Result<Vec<_>>>()?;
        NativeBody::Union(members)
    } else {
        let values = e
            .variants
            .iter()
            .map(|v| {
                if !matches!(v.fields, Fields::Unit) {
                    anyhow::bail!("Enum {name} mixes data variants without #[serde(untagged)]");
                }
                let attrs = serde_attrs(&v.attrs)?;
                Ok(attrs.rename.unwrap_or_else(|| v.ident.to_string()))
            })
            .collect::<Result<Vec<_>>>()?;
        NativeBody::Enumeration(values)
    };

    Ok(NativeTypeDecl {
        docs: extract_docs(&e.attrs),
        body,
        name,
    })
}

fn service(block: &syn::ItemImpl, items: &[Item]) -> Result<Option<NativeService>> {
    if block.trait_.is_some() {
        return Ok(None);
    }
    let Type::Path(self_ty) = &*block.self_ty else {
        return Ok(None);
    };
    let Some(name) = self_ty.path.segments.last().map(|s| s.ident.to_string()) else {
        return Ok(None);
    };

    let mut channel = None;
    let mut dispatch_key = None;
    let mut stream_id = None;
    let mut bindings = Vec::new();
    let mut dispatch_values = Vec::new();
    let mut operations = Vec::new();

    for item in &block.items {
        match item {
            ImplItem::Const(c) => {
                let ident = c.ident.to_string();
                match ident.as_str() {
                    "CHANNEL" => channel = lit_str(&c.expr),
                    "DISPATCH_KEY" => dispatch_key = option_str(&c.expr),
                    "STREAM_ID" => stream_id = option_str(&c.expr),
                    "OPERATIONS" => {
                        bindings = str_tuples(&c.expr, 3)
                            .with_context(|| format!("{name}::OPERATIONS"))?
                            .into_iter()
                            .map(|t| OperationBinding {
                                method: t[0].clone(),
                                message: t[1].clone(),
                                reply: t[2].clone(),
                            })
                            .collect();
                    }
                    "DISPATCH_VALUES" => {
                        dispatch_values = str_tuples(&c.expr, 2)
                            .with_context(|| format!("{name}::DISPATCH_VALUES"))?
                            .into_iter()
                            .map(|t| (t[0].clone(), t[1].clone()))
                            .collect();
                    }
                    _ => {}
                }
            }
            ImplItem::Fn(f) if f.sig.asyncness.is_some() && is_public(&f.vis) => {
                if let Some(operation) = operation(f) {
                    operations.push(operation);
                }
            }
            _ => {}
        }
    }

    let Some(channel) = channel else {
        return Ok(None);
    };

    let docs = items.iter().find_map(|item| match item {
        Item::Struct(s) if s.ident == name => extract_docs(&s.attrs),
        _ => None,
    });

    Ok(Some(NativeService {
        name,
        channel,
        dispatch_key: dispatch_key.flatten(),
        stream_id: stream_id.flatten(),
        operations,
        bindings,
        dispatch_values,
        docs,
    }))
}

fn is_public(vis: &syn::Visibility) -> bool {
    matches!(vis, syn::Visibility::Public(_))
}

fn operation(f: &syn::ImplItemFn) -> Option<NativeOperation> {
    let mut inputs = f.sig.inputs.iter();
    if !matches!(inputs.next(), Some(FnArg::Receiver(_))) {
        return None;
    }

    let params = inputs
        .filter_map(|arg| match arg {
            FnArg::Typed(typed) => {
                let name = match &*typed.pat {
                    Pat::Ident(ident) => ident.ident.to_string(),
                    _ => "_".to_string(),
                };
                Some(NativeParam {
                    name,
                    ty: native_type(&typed.ty),
                })
            }
            FnArg::Receiver(_) => None,
        })
        .collect();

    let returns = match &f.sig.output {
        ReturnType::Default => None,
        ReturnType::Type(_, ty) => match native_type(ty) {
            NativeType::Unit => None,
            other => Some(other),
        },
    };

    Some(NativeOperation {
        name: f.sig.ident.to_string(),
        params,
        returns,
        docs: extract_docs(&f.attrs),
    })
}

/// Map a syn type to its native shape
///
/// Smart pointers and references are transparent; `Result`-like wrappers
/// stand for their success type.
pub fn native_type(ty: &Type) -> NativeType {
    match ty {
        Type::Path(type_path) if type_path.qself.is_none() => {
            let Some(segment) = type_path.path.segments.last() else {
                return NativeType::Unsupported(quote::quote!(#ty).to_string());
            };
            let ident = segment.ident.to_string();
            let args: Vec<&Type> = match &segment.arguments {
                syn::PathArguments::AngleBracketed(args) => args
                    .args
                    .iter()
                    .filter_map(|arg| match arg {
                        syn::GenericArgument::Type(inner) => Some(inner),
                        _ => None,
                    })
                    .collect(),
                _ => Vec::new(),
            };

            match (ident.as_str(), args.as_slice()) {
                ("String" | "str", []) => NativeType::String,
                ("bool", []) => NativeType::Bool,
                ("i8", []) => NativeType::Integer { bits: 8, signed: true },
                ("i16", []) => NativeType::Integer { bits: 16, signed: true },
                ("i32", []) => NativeType::Integer { bits: 32, signed: true },
                ("i64", []) => NativeType::Integer { bits: 64, signed: true },
                ("u8", []) => NativeType::Integer { bits: 8, signed: false },
                ("u16", []) => NativeType::Integer { bits: 16, signed: false },
                ("u32", []) => NativeType::Integer { bits: 32, signed: false },
                ("u64", []) => NativeType::Integer { bits: 64, signed: false },
                ("f32", []) => NativeType::Float { bits: 32 },
                ("f64", []) => NativeType::Float { bits: 64 },
                ("Value", []) => NativeType::Json,
                ("Vec", [inner]) => match native_type(inner) {
                    NativeType::Integer { bits: 8, signed: false } => NativeType::Bytes,
                    other => NativeType::List(Box::new(other)),
                },
                ("Option", [inner]) => NativeType::Optional(Box::new(native_type(inner))),
                ("Box" | "Arc" | "Rc", [inner]) => native_type(inner),
                ("DispatchResult", [inner]) | ("Result", [inner, ..]) => native_type(inner),
                ("HashMap" | "BTreeMap" | "IndexMap", [key, value])
                    if native_type(key) == NativeType::String =>
                {
                    NativeType::Map(Box::new(native_type(value)))
                }
                (_, []) => NativeType::Named(ident),
                _ => NativeType::Unsupported(quote::quote!(#ty).to_string()),
            }
        }
        Type::Reference(reference) => native_type(&reference.elem),
        Type::Paren(paren) => native_type(&paren.elem),
        Type::Tuple(tuple) if tuple.elems.is_empty() => NativeType::Unit,
        _ => NativeType::Unsupported(quote::quote!(#ty).to_string()),
    }
}

#[derive(Debug, Default)]
struct SerdeAttrs {
    rename: Option<String>,
    default: bool,
    flatten: bool,
    untagged: bool,
    deny_unknown_fields: bool,
}

fn serde_attrs(attrs: &[Attribute]) -> syn::Result<SerdeAttrs> {
    let mut out = SerdeAttrs::default();
    for attr in attrs.iter().filter(|a| a.path().is_ident("serde")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                let value: syn::LitStr = meta.value()?.parse()?;
                out.rename = Some(value.value());
            } else if meta.path.is_ident("default") {
                out.default = true;
                skip_meta(meta)?;
            } else if meta.path.is_ident("flatten") {
                out.flatten = true;
            } else if meta.path.is_ident("untagged") {
                out.untagged = true;
            } else if meta.path.is_ident("deny_unknown_fields") {
                out.deny_unknown_fields = true;
            } else {
                skip_meta(meta)?;
            }
            Ok(())
        })?;
    }
    Ok(out)
}

/// Consume the value or nested list of an attribute we do not read
fn skip_meta(meta: ParseNestedMeta) -> syn::Result<()> {
    if meta.input.peek(Token![=]) {
        meta.value()?.parse::<Expr>()?;
    } else if meta.input.peek(syn::token::Paren) {
        meta.parse_nested_meta(skip_meta)?;
    }
    Ok(())
}

fn extract_docs(attrs: &[Attribute]) -> Option<String> {
    let lines: Vec<String> = attrs
        .iter()
        .filter(|attr| attr.path().is_ident("doc"))
        .filter_map(|attr| match &attr.meta {
            Meta::NameValue(meta) => lit_str(&meta.value),
            _ => None,
        })
        .map(|line| line.strip_prefix(' ').unwrap_or(&line).trim_end().to_string())
        .collect();

    let text = lines.join("\n");
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn lit_str(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Lit(lit) => match &lit.lit {
            Lit::Str(s) => Some(s.value()),
            _ => None,
        },
        Expr::Group(group) => lit_str(&group.expr),
        _ => None,
    }
}

/// `Some("..")` or `None`; the outer `Option` is `None` when neither
fn option_str(expr: &Expr) -> Option<Option<String>> {
    match expr {
        Expr::Path(path) if path.path.is_ident("None") => Some(None),
        Expr::Call(call) => match &*call.func {
            Expr::Path(path) if path.path.is_ident("Some") => {
                call.args.first().and_then(lit_str).map(Some)
            }
            _ => None,
        },
        _ => None,
    }
}

/// `&[("a", "b"), ...]` with tuples of `arity` string literals
fn str_tuples(expr: &Expr, arity: usize) -> Result<Vec<Vec<String>>> {
    let expr = match expr {
        Expr::Reference(reference) => &*reference.expr,
        other => other,
    };
    let Expr::Array(array) = expr else {
        anyhow::bail!("expected an array of tuples, found `{}`", quote::quote!(#expr));
    };

    array
        .elems
        .iter()
        .map(|elem| {
            let Expr::Tuple(tuple) = elem else {
                anyhow::bail!("expected a tuple, found `{}`", quote::quote!(#elem));
            };
            let values: Vec<String> = tuple.elems.iter().filter_map(lit_str).collect();
            if values.len() != arity || tuple.elems.len() != arity {
                anyhow::bail!(
                    "expected {arity} string literals, found `{}`",
                    quote::quote!(#tuple)
                );
            }
            Ok(values)
        })
        .collect()
}
