//! Target-language type model
//!
//! [`TypeExpr`] is what a field or member position refers to;
//! [`TypeDeclaration`] is a named declaration held by the
//! [`NameRegistry`](crate::registry::NameRegistry).

use channelgen_core::Constraints;
use serde_json::Value;
use std::collections::BTreeSet;

/// Scalar types of the target language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    String,
    Bool,
    I32,
    I64,
    F32,
    F64,
    Bytes,
}

impl PrimitiveType {
    /// Look up the target type for a schema `type` and optional `format`
    ///
    /// Unknown string formats are informational and map to `String`; unknown
    /// integer and number formats have no mapping.
    pub fn from_schema(type_name: &str, format: Option<&str>) -> Option<Self> {
        match (type_name, format) {
            ("string", Some("byte" | "binary")) => Some(PrimitiveType::Bytes),
            ("string", _) => Some(PrimitiveType::String),
            ("boolean", _) => Some(PrimitiveType::Bool),
            ("integer", None | Some("int64")) => Some(PrimitiveType::I64),
            ("integer", Some("int32")) => Some(PrimitiveType::I32),
            ("number", None | Some("double" | "decimal")) => Some(PrimitiveType::F64),
            ("number", Some("float")) => Some(PrimitiveType::F32),
            _ => None,
        }
    }

    /// Rust spelling of the type
    pub fn rust_type(&self) -> &'static str {
        match self {
            PrimitiveType::String => "String",
            PrimitiveType::Bool => "bool",
            PrimitiveType::I32 => "i32",
            PrimitiveType::I64 => "i64",
            PrimitiveType::F32 => "f32",
            PrimitiveType::F64 => "f64",
            PrimitiveType::Bytes => "Vec<u8>",
        }
    }

    /// Name used when the type labels something, e.g. a union variant
    pub fn label(&self) -> &'static str {
        match self {
            PrimitiveType::String => "String",
            PrimitiveType::Bool => "Bool",
            PrimitiveType::I32 => "I32",
            PrimitiveType::I64 => "I64",
            PrimitiveType::F32 => "F32",
            PrimitiveType::F64 => "F64",
            PrimitiveType::Bytes => "Bytes",
        }
    }
}

/// Shape of a type reference
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Primitive(PrimitiveType),
    Array(Box<TypeExpr>),
    /// String-keyed map
    Map(Box<TypeExpr>),
    Union(Vec<TypeExpr>),
    /// A declaration in the registry
    Named(String),
    Any,
}

/// A type reference with its nullability
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeExpr {
    pub kind: TypeKind,
    pub nullable: bool,
}

impl TypeExpr {
    pub fn new(kind: TypeKind) -> Self {
        Self {
            kind,
            nullable: false,
        }
    }

    pub fn primitive(primitive: PrimitiveType) -> Self {
        Self::new(TypeKind::Primitive(primitive))
    }

    pub fn array(items: TypeExpr) -> Self {
        Self::new(TypeKind::Array(Box::new(items)))
    }

    pub fn map(values: TypeExpr) -> Self {
        Self::new(TypeKind::Map(Box::new(values)))
    }

    pub fn union(members: Vec<TypeExpr>) -> Self {
        Self::new(TypeKind::Union(members))
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self::new(TypeKind::Named(name.into()))
    }

    pub fn any() -> Self {
        Self::new(TypeKind::Any)
    }

    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// The same type without top-level nullability
    pub fn non_null(&self) -> Self {
        self.clone().with_nullable(false)
    }

    /// Name of the declaration this type points at, if any
    pub fn named_target(&self) -> Option<&str> {
        match &self.kind {
            TypeKind::Named(name) => Some(name),
            _ => None,
        }
    }

    /// Short identifier-safe label, used to name union variants
    pub fn label(&self) -> String {
        match &self.kind {
            TypeKind::Primitive(p) => p.label().to_string(),
            TypeKind::Array(items) => format!("{}List", items.label()),
            TypeKind::Map(values) => format!("{}Map", values.label()),
            TypeKind::Union(_) => "Union".to_string(),
            TypeKind::Named(name) => name.clone(),
            TypeKind::Any => "Any".to_string(),
        }
    }

    fn collect_imports(&self, imports: &mut BTreeSet<ImportRequirement>) {
        match &self.kind {
            TypeKind::Primitive(_) | TypeKind::Named(_) => {}
            TypeKind::Array(items) => items.collect_imports(imports),
            TypeKind::Map(values) => {
                imports.insert(ImportRequirement::HashMap);
                values.collect_imports(imports);
            }
            TypeKind::Union(members) => {
                for member in members {
                    member.collect_imports(imports);
                }
            }
            TypeKind::Any => {
                imports.insert(ImportRequirement::JsonValue);
            }
        }
    }
}

/// Whether a record field must, may, or may default to be present
#[derive(Debug, Clone, PartialEq)]
pub enum Presence {
    Required,
    Optional,
    /// Absent on the wire means this value
    Defaulted(Value),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    /// Property name as it appears on the wire
    pub wire_name: String,
    /// Sanitized Rust identifier
    pub ident: String,
    pub ty: TypeExpr,
    pub presence: Presence,
    pub constraints: Option<Constraints>,
    pub docs: Option<String>,
}

/// Treatment of properties a record does not declare
#[derive(Debug, Clone, PartialEq)]
pub enum RestField {
    /// Unknown properties are kept as JSON values
    Open,
    /// Unknown properties are rejected
    Closed,
    /// Unknown properties share one type
    Typed(TypeExpr),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordDecl {
    pub fields: Vec<FieldDecl>,
    pub rest: RestField,
}

impl RecordDecl {
    pub fn field(&self, wire_name: &str) -> Option<&FieldDecl> {
        self.fields.iter().find(|f| f.wire_name == wire_name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeclBody {
    Record(RecordDecl),
    Union(Vec<TypeExpr>),
    Alias(TypeExpr),
}

/// Items a rendered declaration needs in scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ImportRequirement {
    Serde,
    HashMap,
    JsonValue,
}

impl ImportRequirement {
    pub fn use_path(&self) -> &'static str {
        match self {
            ImportRequirement::Serde => "serde::{Deserialize, Serialize}",
            ImportRequirement::HashMap => "std::collections::HashMap",
            ImportRequirement::JsonValue => "serde_json::Value",
        }
    }
}

/// A named declaration
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDeclaration {
    pub name: String,
    pub docs: Option<String>,
    pub body: DeclBody,
    /// Whether references to this declaration are nullable by default
    pub nullable: bool,
    pub constraints: Option<Constraints>,
    pub imports: BTreeSet<ImportRequirement>,
}

impl TypeDeclaration {
    pub fn new(name: impl Into<String>, body: DeclBody) -> Self {
        let imports = imports_for(&body);
        Self {
            name: name.into(),
            docs: None,
            body,
            nullable: false,
            constraints: None,
            imports,
        }
    }

    pub fn with_docs(mut self, docs: Option<String>) -> Self {
        self.docs = docs;
        self
    }

    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn with_constraints(mut self, constraints: Option<Constraints>) -> Self {
        self.constraints = constraints.filter(|c| !c.is_empty());
        self
    }

    /// Compare everything except the name
    ///
    /// Two declarations that differ only by name can share one.
    pub fn same_structure(&self, other: &TypeDeclaration) -> bool {
        self.body == other.body
            && self.nullable == other.nullable
            && self.constraints == other.constraints
            && self.docs == other.docs
    }

    pub fn as_record(&self) -> Option<&RecordDecl> {
        match &self.body {
            DeclBody::Record(record) => Some(record),
            _ => None,
        }
    }
}

fn imports_for(body: &DeclBody) -> BTreeSet<ImportRequirement> {
    let mut imports = BTreeSet::new();
    match body {
        DeclBody::Record(record) => {
            imports.insert(ImportRequirement::Serde);
            for field in &record.fields {
                field.ty.collect_imports(&mut imports);
            }
            match &record.rest {
                RestField::Open => {
                    imports.insert(ImportRequirement::HashMap);
                    imports.insert(ImportRequirement::JsonValue);
                }
                RestField::Closed => {}
                RestField::Typed(ty) => {
                    imports.insert(ImportRequirement::HashMap);
                    ty.collect_imports(&mut imports);
                }
            }
        }
        DeclBody::Union(members) => {
            imports.insert(ImportRequirement::Serde);
            for member in members {
                member.collect_imports(&mut imports);
            }
        }
        DeclBody::Alias(target) => target.collect_imports(&mut imports),
    }
    imports
}
