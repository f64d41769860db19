//! The generation pipeline
//!
//! ```text
//! InterfaceDocument
//!     ↓ normalize
//!     ↓ extract            → ServiceDescriptor + diagnostics
//!     ↓ translate          → TypeDeclarations + diagnostics
//!     ↓ clients, routing   → ClientDeclarations, RoutingDeclarations
//! GenerationOutput { files: [(FileRole, declarations)], warnings }
//! ```
//!
//! Input problems from every stage are collected first; the run fails with
//! [`GenerationError::InvalidInput`] carrying all of them if any is an error.
//! The reverse direction goes from Rust source through the semantic model
//! and the introspector back to a document.

use crate::client::{ClientDeclaration, MessageTypes, generate_clients};
use crate::document::InterfaceDocument;
use crate::emitter::emit_document;
use crate::error::{GenerationError, GenerationResult, TranslateError};
use crate::extractor::extract;
use crate::introspect::{IntrospectError, introspect};
use crate::router::{RoutingDeclaration, generate_routing};
use crate::semantic::SemanticModel;
use crate::translator::{TranslationContext, Translator};
use crate::types::TypeDeclaration;
use channelgen_core::{Diagnostic, GeneratorConfig, ServiceDescriptor};
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;

/// Logical role of a generated file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileRole {
    /// Client definitions
    Client,
    /// Named type declarations
    Types,
    /// Routing tables
    Utils,
    /// Test scaffolding
    Tests,
}

impl FileRole {
    /// Conventional module name for the role
    pub fn module_name(&self) -> &'static str {
        match self {
            FileRole::Client => "client",
            FileRole::Types => "types",
            FileRole::Utils => "routing",
            FileRole::Tests => "tests",
        }
    }
}

/// Smoke test for one client
#[derive(Debug, Clone, PartialEq)]
pub struct TestDeclaration {
    pub name: String,
    pub client: String,
    pub channel: String,
    /// Receiver method expected to fail once the client is closed
    pub probe: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Declaration {
    Type(TypeDeclaration),
    Client(ClientDeclaration),
    Routing(RoutingDeclaration),
    Test(TestDeclaration),
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedFile {
    pub role: FileRole,
    pub declarations: Vec<Declaration>,
}

/// Everything one run produces
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationOutput {
    pub title: String,
    pub version: String,
    pub files: Vec<GeneratedFile>,
    pub warnings: Vec<Diagnostic>,
}

impl GenerationOutput {
    pub fn file(&self, role: FileRole) -> Option<&GeneratedFile> {
        self.files.iter().find(|f| f.role == role)
    }

    pub fn types(&self) -> impl Iterator<Item = &TypeDeclaration> {
        self.declarations(FileRole::Types).filter_map(|d| match d {
            Declaration::Type(decl) => Some(decl),
            _ => None,
        })
    }

    pub fn clients(&self) -> impl Iterator<Item = &ClientDeclaration> {
        self.declarations(FileRole::Client).filter_map(|d| match d {
            Declaration::Client(client) => Some(client),
            _ => None,
        })
    }

    pub fn routing(&self) -> impl Iterator<Item = &RoutingDeclaration> {
        self.declarations(FileRole::Utils).filter_map(|d| match d {
            Declaration::Routing(routing) => Some(routing),
            _ => None,
        })
    }

    fn declarations(&self, role: FileRole) -> impl Iterator<Item = &Declaration> {
        self.file(role).into_iter().flat_map(|f| f.declarations.iter())
    }
}

/// Load a document from disk and generate from it
pub fn generate_from_path(
    path: impl AsRef<Path>,
    config: &GeneratorConfig,
) -> GenerationResult<GenerationOutput> {
    let doc = InterfaceDocument::from_path(path)?;
    generate(&doc, config)
}

/// Run the forward pipeline over a loaded document
pub fn generate(
    doc: &InterfaceDocument,
    config: &GeneratorConfig,
) -> GenerationResult<GenerationOutput> {
    tracing::info!(title = %doc.info.title, "generating");

    let references = doc.normalize().err().unwrap_or_default();
    let (service, mut diagnostics) = extract(doc, config);

    // Translation needs every reference to resolve
    if !references.is_empty() {
        let mut problems = references;
        problems.append(&mut diagnostics);
        tracing::info!(problems = problems.len(), "document rejected");
        return Err(GenerationError::InvalidInput(problems));
    }

    let ctx = TranslationContext::new(&doc.schemas, config);
    let mut translator = Translator::new(&ctx);
    let (_, translated) = translator.translate_all().map_err(registry_failure)?;
    diagnostics.extend(translated);

    let types = name_payloads(&service, &mut translator, &mut diagnostics)?;
    diagnostics.extend(translator.take_warnings());

    if diagnostics.iter().any(Diagnostic::is_error) {
        tracing::info!(problems = diagnostics.len(), "document rejected");
        return Err(GenerationError::InvalidInput(diagnostics));
    }

    let declarations = translator.declarations();
    let taken: HashSet<String> = declarations.iter().map(|d| d.name.clone()).collect();
    let clients = generate_clients(&service, &types, &taken, config)?;
    let routing = generate_routing(&service, &clients, &types)?;

    let mut files = vec![
        GeneratedFile {
            role: FileRole::Client,
            declarations: clients.iter().cloned().map(Declaration::Client).collect(),
        },
        GeneratedFile {
            role: FileRole::Types,
            declarations: declarations.into_iter().map(Declaration::Type).collect(),
        },
        GeneratedFile {
            role: FileRole::Utils,
            declarations: routing.into_iter().map(Declaration::Routing).collect(),
        },
    ];
    if config.generate_tests {
        files.push(GeneratedFile {
            role: FileRole::Tests,
            declarations: clients.iter().map(smoke_test).map(Declaration::Test).collect(),
        });
    }

    tracing::info!(
        files = files.len(),
        clients = clients.len(),
        warnings = diagnostics.len(),
        "generation finished"
    );
    Ok(GenerationOutput {
        title: service.title,
        version: service.version,
        files,
        warnings: diagnostics,
    })
}

/// Decide the payload type of every message
///
/// Referenced payloads use the component's identifier; inline payloads are
/// declared under the message name.
fn name_payloads(
    service: &ServiceDescriptor,
    translator: &mut Translator<'_>,
    diagnostics: &mut Vec<Diagnostic>,
) -> GenerationResult<MessageTypes> {
    let mut types = MessageTypes::new();
    for channel in &service.channels {
        for message in &channel.messages {
            let type_name = match message.payload.reference_name() {
                Some(component) => match translator.component_ident(component) {
                    Some(ident) => ident.to_string(),
                    None => {
                        return Err(GenerationError::Malformed(format!(
                            "payload of '{}' refers to unknown schema '{component}'",
                            message.name
                        )));
                    }
                },
                None => match translator.declare_inline(&message.name, &message.payload) {
                    Ok(decl) => decl.name,
                    Err(e) => {
                        diagnostics.push(e.to_diagnostic().ok_or_else(|| registry_failure(e))?);
                        continue;
                    }
                },
            };
            types.insert(channel.name.as_str(), message.name.as_str(), type_name);
        }
    }
    Ok(types)
}

fn registry_failure(e: TranslateError) -> GenerationError {
    GenerationError::NameRegistry(e.to_string())
}

fn smoke_test(client: &ClientDeclaration) -> TestDeclaration {
    TestDeclaration {
        name: format!("{}_connects_and_closes", crate::naming::snake_ident(&client.name)),
        client: client.name.clone(),
        channel: client.channel.clone(),
        probe: client.first_receiver().map(|m| m.name.clone()),
    }
}

/// Build a document from rendered or hand-written Rust sources
pub fn document_from_sources<'a>(
    sources: impl IntoIterator<Item = &'a str>,
) -> GenerationResult<Value> {
    let model = SemanticModel::parse_sources(sources)
        .map_err(|e| IntrospectError::Source(format!("{e:#}")))?;
    let (service, schemas) = introspect(&model)?;
    Ok(emit_document(&service, &schemas))
}
