//! channelgen-codegen - Interface document ↔ Rust code generation
//!
//! The forward direction reads an AsyncAPI-style document and produces
//! declarations grouped by [`FileRole`]:
//!
//! ```text
//! Interface document (JSON / YAML)
//!     ↓
//!  [normalize]  → undefined references
//!     ↓
//!  [extract]    → ServiceDescriptor, dispatch-key diagnostics
//!     ↓
//!  [translate]  → TypeDeclarations (name registry)
//!     ↓
//!  ├─→ [client]  → ClientDeclarations
//!  ├─→ [router]  → RoutingTables
//!  └─→ [render]  → client.rs, types.rs, routing.rs, tests.rs
//! ```
//!
//! The reverse direction reads Rust source with `syn` into a
//! [`SemanticModel`], introspects it back into a [`ServiceDescriptor`] plus
//! component schemas, and emits a document.
//!
//! # Usage
//!
//! ```rust,no_run
//! use channelgen_codegen::{GeneratorConfig, generate_from_path, render_output};
//!
//! let config = GeneratorConfig::default();
//! let output = generate_from_path("market.yaml", &config)?;
//! for file in render_output(&output, &config) {
//!     println!("// {}\n{}", file.file_name, file.source);
//! }
//! # Ok::<(), channelgen_codegen::GenerationError>(())
//! ```
//!
//! # See Also
//!
//! - [`translator`] for the schema to type mapping
//! - [`extractor`] for dispatch-key validation
//! - [`introspect`] and [`emitter`] for the reverse direction

pub mod client;
pub mod document;
pub mod emitter;
pub mod error;
pub mod extractor;
pub mod generate;
pub mod introspect;
pub mod naming;
pub mod registry;
pub mod render;
pub mod router;
pub mod semantic;
pub mod translator;
pub mod types;

pub use channelgen_core::{GeneratorConfig, ServiceDescriptor};
pub use client::{ClientDeclaration, MessageTypes, MethodDecl, MethodKind, generate_clients};
pub use document::{DocumentError, InterfaceDocument};
pub use emitter::{emit_document, emit_yaml};
pub use error::{GenerationError, GenerationResult, TranslateError, TranslateResult};
pub use extractor::extract;
pub use generate::{
    Declaration, FileRole, GeneratedFile, GenerationOutput, TestDeclaration,
    document_from_sources, generate, generate_from_path,
};
pub use introspect::{IntrospectError, IntrospectResult, introspect};
pub use registry::{NameRegistry, RegistryError};
pub use render::{RenderContext, RenderedFile, render_file, render_output};
pub use router::{RoutingDeclaration, generate_routing};
pub use semantic::SemanticModel;
pub use translator::{TranslationContext, Translator};
pub use types::{TypeDeclaration, TypeExpr};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        FileRole, GenerationError, GenerationOutput, GeneratorConfig, InterfaceDocument,
        SemanticModel, document_from_sources, emit_document, generate, generate_from_path,
        render_output,
    };
}
