//! Schema model for the interface document type grammar
//!
//! [`SchemaNode`] is a closed tagged union over the JSON-Schema-like grammar
//! used by interface documents: primitives, arrays, records, unions,
//! references, maps, and the untyped "any". Every node may carry an explicit
//! nullable flag, a constraints record, a default value, and a description.
//!
//! Parsing accepts the common dialects found in AsyncAPI documents:
//!
//! ```text
//! {"type": ["string", "null"]}          → nullable string
//! {"type": "string", "x-nullable": true} → nullable string
//! {"type": "object"}                     → open record with no properties
//! {"type": "object",
//!  "additionalProperties": {...}}        → map
//! {}                                     → any
//! ```

use indexmap::IndexMap;
use serde_json::{Map, Value, json};
use std::collections::BTreeSet;
use thiserror::Error;

/// Prefix of `$ref` strings pointing into the named-schema table
pub const COMPONENT_SCHEMA_PREFIX: &str = "#/components/schemas/";

/// Errors raised while reading a schema from its JSON form
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaParseError {
    /// A schema position held something other than an object or boolean
    #[error("{path}: schema must be an object")]
    NotAnObject { path: String },

    /// A keyword held a value of the wrong shape
    #[error("{path}: invalid '{keyword}': {reason}")]
    InvalidKeyword {
        path: String,
        keyword: String,
        reason: String,
    },
}

/// Composition mode of a union node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnionMode {
    OneOf,
    AnyOf,
    AllOf,
}

impl UnionMode {
    /// The JSON-Schema keyword for this mode
    pub fn keyword(&self) -> &'static str {
        match self {
            UnionMode::OneOf => "oneOf",
            UnionMode::AnyOf => "anyOf",
            UnionMode::AllOf => "allOf",
        }
    }
}

/// The `additionalProperties` setting of a record
#[derive(Debug, Clone, PartialEq)]
pub enum AdditionalProperties {
    /// Keyword not present
    Absent,
    /// `true` or `false`
    Allowed(bool),
    /// A schema for every extra property
    Typed(Box<SchemaNode>),
}

/// Validation constraints attached to a schema node
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Constraints {
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub exclusive_minimum: Option<f64>,
    pub exclusive_maximum: Option<f64>,
    pub min_length: Option<u64>,
    pub max_length: Option<u64>,
    pub pattern: Option<String>,
    pub min_items: Option<u64>,
    pub enum_values: Vec<Value>,
}

impl Constraints {
    /// Check whether no constraint is set
    pub fn is_empty(&self) -> bool {
        self == &Constraints::default()
    }

    fn from_object(obj: &Map<String, Value>) -> Option<Self> {
        let number = |key: &str| obj.get(key).and_then(Value::as_f64);
        let count = |key: &str| obj.get(key).and_then(Value::as_u64);

        let constraints = Constraints {
            minimum: number("minimum"),
            maximum: number("maximum"),
            exclusive_minimum: number("exclusiveMinimum"),
            exclusive_maximum: number("exclusiveMaximum"),
            min_length: count("minLength"),
            max_length: count("maxLength"),
            pattern: obj.get("pattern").and_then(Value::as_str).map(str::to_string),
            min_items: count("minItems"),
            enum_values: obj
                .get("enum")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default(),
        };

        (!constraints.is_empty()).then_some(constraints)
    }

    fn write_into(&self, obj: &mut Map<String, Value>) {
        let mut put = |key: &str, value: Option<Value>| {
            if let Some(value) = value {
                obj.insert(key.to_string(), value);
            }
        };
        put("minimum", self.minimum.map(|v| json!(v)));
        put("maximum", self.maximum.map(|v| json!(v)));
        put("exclusiveMinimum", self.exclusive_minimum.map(|v| json!(v)));
        put("exclusiveMaximum", self.exclusive_maximum.map(|v| json!(v)));
        put("minLength", self.min_length.map(|v| json!(v)));
        put("maxLength", self.max_length.map(|v| json!(v)));
        put("pattern", self.pattern.clone().map(Value::String));
        put("minItems", self.min_items.map(|v| json!(v)));
        if !self.enum_values.is_empty() {
            put("enum", Some(Value::Array(self.enum_values.clone())));
        }
    }
}

/// The shape of a schema node
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaKind {
    /// A primitive named by its `type` string with an optional `format`
    Primitive {
        type_name: String,
        format: Option<String>,
    },
    /// A homogeneous array
    Array {
        items: Box<SchemaNode>,
        max_items: Option<u64>,
    },
    /// An object with declared properties
    Record {
        properties: IndexMap<String, SchemaNode>,
        required: BTreeSet<String>,
        additional: AdditionalProperties,
    },
    /// A `oneOf`/`anyOf`/`allOf` composition
    Union {
        members: Vec<SchemaNode>,
        mode: UnionMode,
    },
    /// A `$ref` string, kept verbatim
    Reference(String),
    /// An object whose properties all share one value schema
    Map(Box<SchemaNode>),
    /// No type information
    Any,
}

impl SchemaKind {
    /// Short name of the variant, used in diagnostics and synthesized names
    pub fn label(&self) -> &str {
        match self {
            SchemaKind::Primitive { type_name, .. } => type_name,
            SchemaKind::Array { .. } => "array",
            SchemaKind::Record { .. } => "object",
            SchemaKind::Union { mode, .. } => mode.keyword(),
            SchemaKind::Reference(_) => "reference",
            SchemaKind::Map(_) => "map",
            SchemaKind::Any => "any",
        }
    }
}

/// A node of the schema graph
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaNode {
    pub kind: SchemaKind,
    /// Explicit nullable flag; `None` means the document did not say
    pub nullable: Option<bool>,
    pub constraints: Option<Constraints>,
    pub default: Option<Value>,
    pub description: Option<String>,
}

impl SchemaNode {
    /// Create a node of the given kind with no annotations
    pub fn new(kind: SchemaKind) -> Self {
        Self {
            kind,
            nullable: None,
            constraints: None,
            default: None,
            description: None,
        }
    }

    pub fn primitive(type_name: impl Into<String>) -> Self {
        Self::new(SchemaKind::Primitive {
            type_name: type_name.into(),
            format: None,
        })
    }

    pub fn primitive_with_format(type_name: impl Into<String>, format: impl Into<String>) -> Self {
        Self::new(SchemaKind::Primitive {
            type_name: type_name.into(),
            format: Some(format.into()),
        })
    }

    pub fn string() -> Self {
        Self::primitive("string")
    }

    pub fn integer() -> Self {
        Self::primitive("integer")
    }

    pub fn boolean() -> Self {
        Self::primitive("boolean")
    }

    pub fn number() -> Self {
        Self::primitive("number")
    }

    pub fn any() -> Self {
        Self::new(SchemaKind::Any)
    }

    pub fn array(items: SchemaNode) -> Self {
        Self::new(SchemaKind::Array {
            items: Box::new(items),
            max_items: None,
        })
    }

    pub fn map(values: SchemaNode) -> Self {
        Self::new(SchemaKind::Map(Box::new(values)))
    }

    /// Create an open record from `(name, schema)` pairs and required names
    pub fn record<I, R>(properties: I, required: R) -> Self
    where
        I: IntoIterator<Item = (String, SchemaNode)>,
        R: IntoIterator<Item = String>,
    {
        Self::new(SchemaKind::Record {
            properties: properties.into_iter().collect(),
            required: required.into_iter().collect(),
            additional: AdditionalProperties::Absent,
        })
    }

    pub fn union(members: Vec<SchemaNode>, mode: UnionMode) -> Self {
        Self::new(SchemaKind::Union { members, mode })
    }

    /// Create a reference to a named component schema
    pub fn reference(name: &str) -> Self {
        Self::new(SchemaKind::Reference(format!(
            "{COMPONENT_SCHEMA_PREFIX}{name}"
        )))
    }

    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = Some(nullable);
        self
    }

    pub fn with_constraints(mut self, constraints: Constraints) -> Self {
        self.constraints = (!constraints.is_empty()).then_some(constraints);
        self
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_max_items(mut self, limit: u64) -> Self {
        if let SchemaKind::Array { max_items, .. } = &mut self.kind {
            *max_items = Some(limit);
        }
        self
    }

    pub fn with_additional(mut self, setting: AdditionalProperties) -> Self {
        if let SchemaKind::Record { additional, .. } = &mut self.kind {
            *additional = setting;
        }
        self
    }

    /// Check whether the node carries at least one constraint
    pub fn has_constraints(&self) -> bool {
        self.constraints.as_ref().is_some_and(|c| !c.is_empty())
    }

    /// The component name a `#/components/schemas/<name>` reference points at
    pub fn reference_name(&self) -> Option<&str> {
        match &self.kind {
            SchemaKind::Reference(reference) => reference.strip_prefix(COMPONENT_SCHEMA_PREFIX),
            _ => None,
        }
    }

    /// Look up a property of a record node
    pub fn property(&self, name: &str) -> Option<&SchemaNode> {
        match &self.kind {
            SchemaKind::Record { properties, .. } => properties.get(name),
            _ => None,
        }
    }

    /// Check whether a record node lists `name` as required
    pub fn is_required(&self, name: &str) -> bool {
        match &self.kind {
            SchemaKind::Record { required, .. } => required.contains(name),
            _ => false,
        }
    }

    /// Collect every `$ref` string reachable from this node
    pub fn references(&self) -> Vec<&str> {
        let mut found = Vec::new();
        self.collect_references(&mut found);
        found
    }

    fn collect_references<'a>(&'a self, found: &mut Vec<&'a str>) {
        match &self.kind {
            SchemaKind::Reference(reference) => found.push(reference),
            SchemaKind::Array { items, .. } => items.collect_references(found),
            SchemaKind::Map(values) => values.collect_references(found),
            SchemaKind::Record {
                properties,
                additional,
                ..
            } => {
                for property in properties.values() {
                    property.collect_references(found);
                }
                if let AdditionalProperties::Typed(extra) = additional {
                    extra.collect_references(found);
                }
            }
            SchemaKind::Union { members, .. } => {
                for member in members {
                    member.collect_references(found);
                }
            }
            SchemaKind::Primitive { .. } | SchemaKind::Any => {}
        }
    }

    /// Parse a schema from its JSON form
    pub fn from_json(value: &Value) -> Result<Self, SchemaParseError> {
        Self::from_json_at(value, "#")
    }

    /// Parse a schema, reporting errors relative to `path`
    pub fn from_json_at(value: &Value, path: &str) -> Result<Self, SchemaParseError> {
        let obj = match value {
            Value::Object(obj) => obj,
            Value::Bool(true) => return Ok(Self::any()),
            _ => {
                return Err(SchemaParseError::NotAnObject {
                    path: path.to_string(),
                });
            }
        };

        let mut nullable = obj
            .get("x-nullable")
            .or_else(|| obj.get("nullable"))
            .and_then(Value::as_bool);

        let kind = if let Some(reference) = obj.get("$ref") {
            let reference = reference
                .as_str()
                .ok_or_else(|| invalid(path, "$ref", "expected a string"))?;
            SchemaKind::Reference(reference.to_string())
        } else if let Some((mode, members)) = composition(obj) {
            let members = members
                .as_array()
                .ok_or_else(|| invalid(path, mode.keyword(), "expected an array"))?
                .iter()
                .enumerate()
                .map(|(i, m)| Self::from_json_at(m, &format!("{path}/{}/{i}", mode.keyword())))
                .collect::<Result<Vec<_>, _>>()?;
            SchemaKind::Union { members, mode }
        } else {
            let type_names = type_names(obj, path)?;
            let (non_null, had_null): (Vec<_>, Vec<_>) =
                type_names.into_iter().partition(|t| t != "null");
            if !had_null.is_empty() {
                nullable = Some(true);
            }
            match non_null.as_slice() {
                [] if obj.contains_key("properties") => parse_object(obj, path)?,
                [] => infer_untyped(obj),
                [single] => parse_typed(single, obj, path)?,
                several => SchemaKind::Union {
                    members: several
                        .iter()
                        .map(|t| parse_typed(t, obj, path).map(SchemaNode::new))
                        .collect::<Result<Vec<_>, _>>()?,
                    mode: UnionMode::AnyOf,
                },
            }
        };

        Ok(SchemaNode {
            kind,
            nullable,
            constraints: Constraints::from_object(obj),
            default: obj.get("default").cloned(),
            description: obj
                .get("description")
                .and_then(Value::as_str)
                .map(str::to_string),
        })
    }

    /// Serialize this node back to its JSON form
    pub fn to_json(&self) -> Value {
        let mut obj = Map::new();

        match &self.kind {
            SchemaKind::Primitive { type_name, format } => {
                obj.insert("type".into(), json!(type_name));
                if let Some(format) = format {
                    obj.insert("format".into(), json!(format));
                }
            }
            SchemaKind::Array { items, max_items } => {
                obj.insert("type".into(), json!("array"));
                obj.insert("items".into(), items.to_json());
                if let Some(max_items) = max_items {
                    obj.insert("maxItems".into(), json!(max_items));
                }
            }
            SchemaKind::Record {
                properties,
                required,
                additional,
            } => {
                obj.insert("type".into(), json!("object"));
                let props: Map<String, Value> = properties
                    .iter()
                    .map(|(name, schema)| (name.clone(), schema.to_json()))
                    .collect();
                obj.insert("properties".into(), Value::Object(props));
                if !required.is_empty() {
                    obj.insert("required".into(), json!(required));
                }
                match additional {
                    AdditionalProperties::Absent => {}
                    AdditionalProperties::Allowed(allowed) => {
                        obj.insert("additionalProperties".into(), json!(allowed));
                    }
                    AdditionalProperties::Typed(extra) => {
                        obj.insert("additionalProperties".into(), extra.to_json());
                    }
                }
            }
            SchemaKind::Union { members, mode } => {
                let members: Vec<Value> = members.iter().map(SchemaNode::to_json).collect();
                obj.insert(mode.keyword().into(), Value::Array(members));
            }
            SchemaKind::Reference(reference) => {
                obj.insert("$ref".into(), json!(reference));
            }
            SchemaKind::Map(values) => {
                obj.insert("type".into(), json!("object"));
                obj.insert("additionalProperties".into(), values.to_json());
            }
            SchemaKind::Any => {}
        }

        if let Some(nullable) = self.nullable {
            obj.insert("x-nullable".into(), json!(nullable));
        }
        if let Some(constraints) = &self.constraints {
            constraints.write_into(&mut obj);
        }
        if let Some(default) = &self.default {
            obj.insert("default".into(), default.clone());
        }
        if let Some(description) = &self.description {
            obj.insert("description".into(), json!(description));
        }

        Value::Object(obj)
    }
}

fn invalid(path: &str, keyword: &str, reason: &str) -> SchemaParseError {
    SchemaParseError::InvalidKeyword {
        path: path.to_string(),
        keyword: keyword.to_string(),
        reason: reason.to_string(),
    }
}

fn composition(obj: &Map<String, Value>) -> Option<(UnionMode, &Value)> {
    [UnionMode::OneOf, UnionMode::AnyOf, UnionMode::AllOf]
        .into_iter()
        .find_map(|mode| obj.get(mode.keyword()).map(|members| (mode, members)))
}

fn type_names(obj: &Map<String, Value>, path: &str) -> Result<Vec<String>, SchemaParseError> {
    match obj.get("type") {
        None => Ok(Vec::new()),
        Some(Value::String(name)) => Ok(vec![name.clone()]),
        Some(Value::Array(names)) => names
            .iter()
            .map(|n| {
                n.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| invalid(path, "type", "expected an array of strings"))
            })
            .collect(),
        Some(_) => Err(invalid(path, "type", "expected a string or array")),
    }
}

fn parse_typed(
    type_name: &str,
    obj: &Map<String, Value>,
    path: &str,
) -> Result<SchemaKind, SchemaParseError> {
    match type_name {
        "array" => {
            let items = match obj.get("items") {
                Some(items) => SchemaNode::from_json_at(items, &format!("{path}/items"))?,
                None => SchemaNode::any(),
            };
            Ok(SchemaKind::Array {
                items: Box::new(items),
                max_items: obj.get("maxItems").and_then(Value::as_u64),
            })
        }
        "object" => parse_object(obj, path),
        other => Ok(SchemaKind::Primitive {
            type_name: other.to_string(),
            format: obj.get("format").and_then(Value::as_str).map(str::to_string),
        }),
    }
}

fn parse_object(obj: &Map<String, Value>, path: &str) -> Result<SchemaKind, SchemaParseError> {
    let additional = match obj.get("additionalProperties") {
        None => AdditionalProperties::Absent,
        Some(Value::Bool(allowed)) => AdditionalProperties::Allowed(*allowed),
        Some(schema) => AdditionalProperties::Typed(Box::new(SchemaNode::from_json_at(
            schema,
            &format!("{path}/additionalProperties"),
        )?)),
    };

    let Some(props) = obj.get("properties") else {
        if let AdditionalProperties::Typed(values) = additional {
            return Ok(SchemaKind::Map(values));
        }
        return Ok(SchemaKind::Record {
            properties: IndexMap::new(),
            required: BTreeSet::new(),
            additional,
        });
    };

    let props = props
        .as_object()
        .ok_or_else(|| invalid(path, "properties", "expected an object"))?;
    let mut properties = IndexMap::with_capacity(props.len());
    for (name, schema) in props {
        let node = SchemaNode::from_json_at(schema, &format!("{path}/properties/{name}"))?;
        properties.insert(name.clone(), node);
    }

    let required = match obj.get("required") {
        None => BTreeSet::new(),
        Some(Value::Array(names)) => names
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        Some(_) => return Err(invalid(path, "required", "expected an array")),
    };

    Ok(SchemaKind::Record {
        properties,
        required,
        additional,
    })
}

/// Schemas with no `type` are untyped unless an `enum` of strings pins them down
fn infer_untyped(obj: &Map<String, Value>) -> SchemaKind {
    let all_strings = obj
        .get("enum")
        .and_then(Value::as_array)
        .is_some_and(|values| !values.is_empty() && values.iter().all(Value::is_string));

    if all_strings {
        SchemaKind::Primitive {
            type_name: "string".to_string(),
            format: None,
        }
    } else {
        SchemaKind::Any
    }
}
