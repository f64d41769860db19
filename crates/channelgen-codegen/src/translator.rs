//! Schema to type translation
//!
//! A [`Translator`] walks [`SchemaNode`]s and produces [`TypeExpr`]s for use
//! sites plus the named [`TypeDeclaration`]s they refer to. It owns the
//! [`NameRegistry`] for one generation run; the schema table and the
//! generator configuration come from an immutable [`TranslationContext`].
//!
//! Errors abort the schema being translated. [`Translator::translate_all`]
//! collects them per top-level schema and carries on with the next one.

use crate::error::{TranslateError, TranslateResult};
use crate::naming::{field_ident, type_ident, unraw};
use crate::registry::NameRegistry;
use crate::types::{
    DeclBody, FieldDecl, Presence, PrimitiveType, RecordDecl, RestField, TypeDeclaration,
    TypeExpr, TypeKind,
};
use channelgen_core::{
    AdditionalProperties, COMPONENT_SCHEMA_PREFIX, Diagnostic, DiagnosticKind, GeneratorConfig,
    SchemaKind, SchemaNode, UnionMode,
};
use indexmap::IndexMap;
use std::collections::{BTreeSet, HashMap, HashSet};

/// Hint used for anonymous positions
const INLINE: &str = "Inline";

/// Immutable inputs shared by one translation run
#[derive(Debug, Clone, Copy)]
pub struct TranslationContext<'a> {
    schemas: &'a IndexMap<String, SchemaNode>,
    config: &'a GeneratorConfig,
}

impl<'a> TranslationContext<'a> {
    pub fn new(schemas: &'a IndexMap<String, SchemaNode>, config: &'a GeneratorConfig) -> Self {
        Self { schemas, config }
    }

    pub fn schemas(&self) -> &'a IndexMap<String, SchemaNode> {
        self.schemas
    }

    pub fn config(&self) -> &'a GeneratorConfig {
        self.config
    }

    /// Resolve a `#/components/schemas/<name>` reference
    pub fn resolve(&self, reference: &str) -> Option<(&'a str, &'a SchemaNode)> {
        let name = reference.strip_prefix(COMPONENT_SCHEMA_PREFIX)?;
        self.schemas
            .get_key_value(name)
            .map(|(name, node)| (name.as_str(), node))
    }

    /// Nullability of a node on its own
    ///
    /// The node's explicit flag wins; otherwise the configured default.
    pub fn effective_nullable(&self, node: &SchemaNode) -> bool {
        node.nullable.unwrap_or(self.config.treat_as_nullable)
    }
}

pub struct Translator<'a> {
    ctx: &'a TranslationContext<'a>,
    registry: NameRegistry,
    /// Component schema name to its reserved identifier
    component_names: HashMap<String, String>,
    path: Vec<String>,
    warnings: Vec<Diagnostic>,
}

impl<'a> Translator<'a> {
    /// Create a translator and reserve identifiers for every component schema
    pub fn new(ctx: &'a TranslationContext<'a>) -> Self {
        let mut registry = NameRegistry::new();
        let component_names = ctx
            .schemas()
            .keys()
            .map(|name| {
                let base = type_ident(name);
                let ident = registry.reserve(&base).unwrap_or(base);
                (name.clone(), ident)
            })
            .collect();

        Self {
            ctx,
            registry,
            component_names,
            path: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn registry(&self) -> &NameRegistry {
        &self.registry
    }

    /// Identifier reserved for a component schema
    pub fn component_ident(&self, name: &str) -> Option<&str> {
        self.component_names.get(name).map(String::as_str)
    }

    /// Every declaration interned so far, in insertion order
    pub fn declarations(&self) -> Vec<TypeDeclaration> {
        self.registry.declarations().cloned().collect()
    }

    /// Warnings raised since the last call
    pub fn take_warnings(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.warnings)
    }

    /// Declare every component schema
    ///
    /// Input errors are collected as diagnostics, one schema at a time, and
    /// come back together with any warnings. Only a registry failure aborts.
    pub fn translate_all(&mut self) -> TranslateResult<(Vec<TypeDeclaration>, Vec<Diagnostic>)> {
        let schemas = self.ctx.schemas();
        tracing::info!(schemas = schemas.len(), "translating component schemas");

        let mut diagnostics = Vec::new();
        for (name, node) in schemas {
            if let Err(e) = self.declare(name, node) {
                match e.to_diagnostic() {
                    Some(diagnostic) => diagnostics.push(diagnostic),
                    None => return Err(e),
                }
            }
        }
        diagnostics.append(&mut self.warnings);

        Ok((self.declarations(), diagnostics))
    }

    /// Translate a named top-level schema and intern it
    ///
    /// Component schemas keep their reserved identifier; any other name is
    /// interned like a synthesized declaration.
    pub fn declare(&mut self, name: &str, node: &SchemaNode) -> TranslateResult<TypeDeclaration> {
        let component = self.component_names.get(name).cloned();
        self.declare_as(name, node, component)
    }

    /// Translate and intern a schema that is not a component
    ///
    /// Used for inline message payloads; the name is only a hint and never
    /// takes over a component's identifier.
    pub fn declare_inline(
        &mut self,
        name: &str,
        node: &SchemaNode,
    ) -> TranslateResult<TypeDeclaration> {
        self.declare_as(name, node, None)
    }

    fn declare_as(
        &mut self,
        name: &str,
        node: &SchemaNode,
        component: Option<String>,
    ) -> TranslateResult<TypeDeclaration> {
        let (ident, root) = match &component {
            Some(ident) => (ident.clone(), format!("{COMPONENT_SCHEMA_PREFIX}{name}")),
            None => (type_ident(name), name.to_string()),
        };

        let saved = std::mem::replace(&mut self.path, vec![root]);
        let body = self.declaration_body(&ident, node);
        let path = self.current_path();
        self.path = saved;

        let decl = TypeDeclaration::new(ident, body?)
            .with_docs(node.description.clone())
            .with_nullable(self.node_optional(node, 0))
            .with_constraints(node.constraints.clone());

        let placed = match component {
            Some(_) => self.registry.define(decl.clone()),
            None => self.registry.intern(decl.clone()),
        };
        let name = placed.map_err(|source| TranslateError::Registry { path, source })?;

        Ok(TypeDeclaration { name, ..decl })
    }

    /// Translate a node for use at a field or member position
    pub fn translate(
        &mut self,
        node: &SchemaNode,
        hint: Option<&str>,
    ) -> TranslateResult<TypeExpr> {
        let nullable = self.ctx.effective_nullable(node);

        let expr = match &node.kind {
            SchemaKind::Primitive { type_name, format } => {
                TypeExpr::primitive(self.primitive(type_name, format.as_deref())?)
            }
            SchemaKind::Array { items, max_items } => {
                self.translate_array(items, *max_items, hint)?
            }
            SchemaKind::Record {
                properties,
                required,
                additional,
            } => {
                let name = type_ident(hint.unwrap_or(INLINE));
                let record = self.record(&name, properties, required, additional)?;
                let decl = TypeDeclaration::new(name, DeclBody::Record(record))
                    .with_docs(node.description.clone());
                TypeExpr::named(self.intern(decl)?)
            }
            SchemaKind::Union {
                members,
                mode: UnionMode::AllOf,
            } => {
                let name = type_ident(hint.unwrap_or(INLINE));
                let record = self.merge_all_of(&name, members)?;
                let decl = TypeDeclaration::new(name, DeclBody::Record(record))
                    .with_docs(node.description.clone());
                TypeExpr::named(self.intern(decl)?)
            }
            SchemaKind::Union { members, mode } => self.translate_union(members, *mode, hint)?,
            SchemaKind::Reference(reference) => self.translate_reference(reference)?,
            SchemaKind::Map(values) => {
                let value_hint = format!("{}-Value", hint.unwrap_or(INLINE));
                TypeExpr::map(self.at("additionalProperties", |t| {
                    t.translate(values, Some(&value_hint))
                })?)
            }
            SchemaKind::Any => TypeExpr::any(),
        };

        let inherited = expr.nullable;
        Ok(expr.with_nullable(nullable || inherited))
    }

    fn declaration_body(&mut self, ident: &str, node: &SchemaNode) -> TranslateResult<DeclBody> {
        match &node.kind {
            SchemaKind::Record {
                properties,
                required,
                additional,
            } => Ok(DeclBody::Record(
                self.record(ident, properties, required, additional)?,
            )),
            SchemaKind::Union {
                members,
                mode: UnionMode::AllOf,
            } => Ok(DeclBody::Record(self.merge_all_of(ident, members)?)),
            SchemaKind::Union { members, mode } => {
                match self.translate_union(members, *mode, Some(ident))?.kind {
                    TypeKind::Union(members) => {
                        let members = members
                            .into_iter()
                            .enumerate()
                            .map(|(i, m)| self.hoist(m, &format!("{ident}-{i}")))
                            .collect::<TranslateResult<Vec<_>>>()?;
                        Ok(DeclBody::Union(members))
                    }
                    kind => Ok(DeclBody::Alias(self.hoist(TypeExpr::new(kind), ident)?)),
                }
            }
            _ => {
                let expr = self.translate(node, Some(ident))?;
                Ok(DeclBody::Alias(self.hoist(expr.non_null(), ident)?))
            }
        }
    }

    fn primitive(&self, type_name: &str, format: Option<&str>) -> TranslateResult<PrimitiveType> {
        PrimitiveType::from_schema(type_name, format).ok_or_else(|| {
            TranslateError::UnsupportedType {
                path: self.current_path(),
                type_name: match format {
                    Some(format) => format!("{type_name}:{format}"),
                    None => type_name.to_string(),
                },
            }
        })
    }

    fn translate_array(
        &mut self,
        items: &SchemaNode,
        max_items: Option<u64>,
        hint: Option<&str>,
    ) -> TranslateResult<TypeExpr> {
        let limit = self.ctx.config().max_array_length;
        if let Some(max_items) = max_items
            && max_items > limit
        {
            return Err(TranslateError::ArrayLengthExceeded {
                path: self.current_path(),
                max_items,
                limit,
            });
        }

        let item_hint = format!("{}-Items-{}", hint.unwrap_or(INLINE), items.kind.label());
        let item = self.at("items", |t| t.translate(items, Some(&item_hint)))?;

        // Inline records already carry a declaration of their own
        let declared = matches!(
            items.kind,
            SchemaKind::Record { .. }
                | SchemaKind::Union {
                    mode: UnionMode::AllOf,
                    ..
                }
        );
        if hint.is_none() || !items.has_constraints() || declared {
            return Ok(TypeExpr::array(item));
        }

        let body = DeclBody::Alias(self.hoist(item.non_null(), &item_hint)?);
        let decl = TypeDeclaration::new(type_ident(&item_hint), body)
            .with_docs(items.description.clone())
            .with_constraints(items.constraints.clone());
        let name = self.intern(decl)?;
        Ok(TypeExpr::array(TypeExpr::named(name).with_nullable(item.nullable)))
    }

    fn translate_union(
        &mut self,
        members: &[SchemaNode],
        mode: UnionMode,
        hint: Option<&str>,
    ) -> TranslateResult<TypeExpr> {
        let mut flat = Vec::with_capacity(members.len());
        let mut optional = false;

        for (i, member) in members.iter().enumerate() {
            let member_hint = format!("{}-{}{i}", hint.unwrap_or(INLINE), mode.keyword());
            let expr = self.at(format!("{}/{i}", mode.keyword()), |t| {
                t.translate(member, Some(&member_hint))
            })?;
            optional |= expr.nullable;
            match expr.kind {
                TypeKind::Union(inner) => flat.extend(inner),
                kind => flat.push(TypeExpr::new(kind)),
            }
        }

        let mut unique: Vec<TypeExpr> = Vec::with_capacity(flat.len());
        for member in flat {
            if !unique.contains(&member) {
                unique.push(member);
            }
        }

        let expr = if unique.len() > 1 {
            TypeExpr::union(unique)
        } else {
            unique.pop().unwrap_or_else(TypeExpr::any)
        };
        Ok(expr.with_nullable(optional))
    }

    fn translate_reference(&mut self, reference: &str) -> TranslateResult<TypeExpr> {
        let Some((name, target)) = self.ctx.resolve(reference) else {
            return Err(TranslateError::UndefinedReference {
                path: self.current_path(),
                reference: reference.to_string(),
            });
        };
        let ident = self
            .component_names
            .get(name)
            .cloned()
            .unwrap_or_else(|| type_ident(name));
        Ok(TypeExpr::named(ident).with_nullable(self.node_optional(target, 0)))
    }

    /// Whether references to a node are nullable
    ///
    /// Follows references and looks into `oneOf`/`anyOf` members, since an
    /// optional member makes the whole union optional.
    fn node_optional(&self, node: &SchemaNode, depth: usize) -> bool {
        if self.ctx.effective_nullable(node) {
            return true;
        }
        if depth > self.ctx.schemas().len() {
            return false;
        }
        match &node.kind {
            SchemaKind::Reference(reference) => self
                .ctx
                .resolve(reference)
                .is_some_and(|(_, target)| self.node_optional(target, depth + 1)),
            SchemaKind::Union { members, mode } if *mode != UnionMode::AllOf => members
                .iter()
                .any(|member| self.node_optional(member, depth + 1)),
            _ => false,
        }
    }

    fn record(
        &mut self,
        parent: &str,
        properties: &IndexMap<String, SchemaNode>,
        required: &BTreeSet<String>,
        additional: &AdditionalProperties,
    ) -> TranslateResult<RecordDecl> {
        let mut fields = Vec::with_capacity(properties.len());
        let mut idents = HashSet::new();

        for (wire_name, property) in properties {
            let hint = format!("{parent}-{wire_name}");
            let ty = self.at(format!("properties/{wire_name}"), |t| {
                let ty = t.translate(property, Some(&hint))?;
                t.hoist(ty, &hint)
            })?;

            let presence = if required.contains(wire_name) {
                Presence::Required
            } else if let Some(default) = &property.default {
                Presence::Defaulted(default.clone())
            } else {
                Presence::Optional
            };

            let base = field_ident(wire_name);
            let mut ident = base.clone();
            let mut n = 1;
            while !idents.insert(ident.clone()) {
                n += 1;
                ident = format!("{}_{n}", unraw(&base));
            }

            fields.push(FieldDecl {
                wire_name: wire_name.clone(),
                ident,
                ty,
                presence,
                constraints: property.constraints.clone().filter(|c| !c.is_empty()),
                docs: property.description.clone(),
            });
        }

        let rest = match additional {
            AdditionalProperties::Absent | AdditionalProperties::Allowed(true) => RestField::Open,
            AdditionalProperties::Allowed(false) => RestField::Closed,
            AdditionalProperties::Typed(extra) if extra.has_constraints() => {
                let location = self.current_path();
                tracing::warn!(%location, "constraints on additionalProperties dropped");
                self.warnings.push(Diagnostic::new(
                    DiagnosticKind::ConstrainedAdditionalProperties,
                    location,
                    "constraints on additionalProperties are not enforced, treating as open",
                ));
                RestField::Open
            }
            AdditionalProperties::Typed(extra) => {
                let hint = format!("{parent}-Extra");
                RestField::Typed(self.at("additionalProperties", |t| {
                    let ty = t.translate(extra, Some(&hint))?;
                    t.hoist(ty, &hint)
                })?)
            }
        };

        Ok(RecordDecl { fields, rest })
    }

    fn merge_all_of(
        &mut self,
        parent: &str,
        members: &[SchemaNode],
    ) -> TranslateResult<RecordDecl> {
        let mut merged = MergedRecord::default();
        self.collect_all_of(members, &mut merged, 0)?;
        self.record(parent, &merged.properties, &merged.required, &merged.additional)
    }

    fn collect_all_of(
        &self,
        members: &[SchemaNode],
        merged: &mut MergedRecord,
        depth: usize,
    ) -> TranslateResult<()> {
        for (i, member) in members.iter().enumerate() {
            let path = format!("{}/allOf/{i}", self.current_path());
            let resolved = self.resolve_member(member, &path)?;

            match &resolved.kind {
                SchemaKind::Record {
                    properties,
                    required,
                    additional,
                } => {
                    for (name, property) in properties {
                        if merged.properties.contains_key(name) {
                            return Err(TranslateError::AllOfFieldCollision {
                                path,
                                field: name.clone(),
                            });
                        }
                        merged.properties.insert(name.clone(), property.clone());
                    }
                    merged.required.extend(required.iter().cloned());
                    merged.additional = merge_additional(&merged.additional, additional);
                }
                SchemaKind::Union {
                    members: inner,
                    mode: UnionMode::AllOf,
                } if depth <= self.ctx.schemas().len() => {
                    self.collect_all_of(inner, merged, depth + 1)?;
                }
                other => {
                    return Err(TranslateError::UnsupportedType {
                        path,
                        type_name: format!("allOf member '{}'", other.label()),
                    });
                }
            }
        }
        Ok(())
    }

    fn resolve_member<'n>(
        &self,
        node: &'n SchemaNode,
        path: &str,
    ) -> TranslateResult<&'n SchemaNode>
    where
        'a: 'n,
    {
        let mut current = node;
        for _ in 0..=self.ctx.schemas().len() {
            let SchemaKind::Reference(reference) = &current.kind else {
                return Ok(current);
            };
            current = self
                .ctx
                .resolve(reference)
                .map(|(_, target)| target)
                .ok_or_else(|| TranslateError::UndefinedReference {
                    path: path.to_string(),
                    reference: reference.clone(),
                })?;
        }
        Err(TranslateError::UnsupportedType {
            path: path.to_string(),
            type_name: "cyclic reference".to_string(),
        })
    }

    /// Replace inline unions with named union declarations
    ///
    /// Unions are only expressible as declarations, so any union left at a
    /// field, item, or value position gets a name derived from `hint`.
    fn hoist(&mut self, expr: TypeExpr, hint: &str) -> TranslateResult<TypeExpr> {
        let nullable = expr.nullable;
        let kind = match expr.kind {
            TypeKind::Union(members) => {
                let members = members
                    .into_iter()
                    .enumerate()
                    .map(|(i, m)| self.hoist(m, &format!("{hint}-{i}")))
                    .collect::<TranslateResult<Vec<_>>>()?;
                let decl = TypeDeclaration::new(type_ident(hint), DeclBody::Union(members));
                TypeKind::Named(self.intern(decl)?)
            }
            TypeKind::Array(items) => {
                TypeKind::Array(Box::new(self.hoist(*items, &format!("{hint}-Item"))?))
            }
            TypeKind::Map(values) => {
                TypeKind::Map(Box::new(self.hoist(*values, &format!("{hint}-Value"))?))
            }
            other => other,
        };
        Ok(TypeExpr { kind, nullable })
    }

    fn intern(&mut self, decl: TypeDeclaration) -> TranslateResult<String> {
        self.registry
            .intern(decl)
            .map_err(|source| TranslateError::Registry {
                path: self.current_path(),
                source,
            })
    }

    /// Run `f` with `segment` pushed onto the schema path
    fn at<T>(&mut self, segment: impl Into<String>, f: impl FnOnce(&mut Self) -> T) -> T {
        self.path.push(segment.into());
        let result = f(self);
        self.path.pop();
        result
    }

    fn current_path(&self) -> String {
        if self.path.is_empty() {
            "#".to_string()
        } else {
            self.path.join("/")
        }
    }
}

#[derive(Debug)]
struct MergedRecord {
    properties: IndexMap<String, SchemaNode>,
    required: BTreeSet<String>,
    additional: AdditionalProperties,
}

impl Default for MergedRecord {
    fn default() -> Self {
        Self {
            properties: IndexMap::new(),
            required: BTreeSet::new(),
            additional: AdditionalProperties::Absent,
        }
    }
}

/// Most restrictive `additionalProperties` of two `allOf` members
fn merge_additional(
    current: &AdditionalProperties,
    next: &AdditionalProperties,
) -> AdditionalProperties {
    use AdditionalProperties::*;
    match (current, next) {
        (Allowed(false), _) | (_, Allowed(false)) => Allowed(false),
        (Typed(extra), _) | (_, Typed(extra)) => Typed(extra.clone()),
        (Allowed(true), _) | (_, Allowed(true)) => Allowed(true),
        (Absent, Absent) => Absent,
    }
}
