//! GraphQL SDL front end
//!
//! Typed document tree, parser and canonical printer for the subset of SDL
//! used by subgraph entity schemas.

pub mod ast;
pub mod parser;
mod printer;

pub use ast::{
    Argument, BaseType, DeclarationKind, Directive, EnumValue, FieldDeclaration, ParsedDocument,
    ScalarKind, Span, TypeDeclaration, TypeRef, Value,
};
pub use parser::parse;
