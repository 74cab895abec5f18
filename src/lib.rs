//! Subgraph Schema Registry
//!
//! Ingests GraphQL SDL documents describing the entity model of
//! blockchain-indexing subgraphs, one document per protocol, and verifies
//! their cross-referential consistency before they are stored.
//!
//! ## Features
//!
//! - **Typed SDL Parsing**: `graphql-parser` output lowered into a typed document tree
//! - **Entity Graph**: Resolved types, reverse-relation index, interface implementers
//! - **Relationship Validation**: Unknown types, `@derivedFrom` integrity, interface conformance
//! - **Atomic Registry**: Only validated graphs are stored; failed registrations change nothing
//! - **Checksum Idempotency**: Re-registering identical SDL is a no-op
//!
//! ## Pipeline
//!
//! ```text
//! SDL text ──► sdl::parse ──► ParsedDocument
//!                                  │
//!                                  ▼
//!                       graph::build_with ──► EntityGraph
//!                                                 │
//!                                                 ▼
//!                                     Validator::validate ──► Diagnostics
//!                                                 │
//!                                                 ▼
//!                                  SchemaRegistry (protocol id ──► graph)
//! ```

pub mod checksum;
pub mod config;
pub mod error;
pub mod graph;
pub mod registry;
pub mod sdl;
pub mod sources;
pub mod validate;

pub use checksum::Checksum;
pub use config::{OutputFormat, SchemaConfig, SourceConfig, ValidationConfig};
pub use error::{Result, SchemaError, SyntaxError};
pub use graph::{
    build, build_with, BuildOptions, Diagnostic, DiagnosticKind, Diagnostics, EntityField,
    EntityGraph, EntityType, FieldKey, FieldTarget, RelationKind, Severity, Visibility,
};
pub use registry::{RegisterResult, RegisteredSchema, Registration, SchemaRegistry};
pub use sdl::{parse, ParsedDocument};
pub use sources::{bundled_source, bundled_sources, load_from_directory, SchemaSource};
pub use validate::{validate, ValidationOptions, Validator};
