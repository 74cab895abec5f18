//! Entity Relationship Graph
//!
//! Resolved view of one SDL document: type declarations keyed by name,
//! a reverse-relation index for `@derivedFrom` fields, interface
//! implementer sets, and a petgraph relation graph between types.
//!
//! Reverse relations are back-references, never ownership. The index is
//! rebuilt from scratch on every build and never mutated afterwards.

pub mod builder;
pub mod diagnostics;

pub use builder::{build, build_with, BuildOptions};
pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics, Severity, DOCUMENT_PATH};

use indexmap::IndexMap;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::sdl::{DeclarationKind, Directive, EnumValue, ScalarKind, Span, TypeRef};

// =============================================================================
// Keys and Targets
// =============================================================================

/// A `(type, field)` pair
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FieldKey {
    pub type_name: String,
    pub field: String,
}

impl FieldKey {
    pub fn new(type_name: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            field: field.into(),
        }
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.type_name, self.field)
    }
}

/// What a field's innermost type resolved to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum FieldTarget {
    Scalar(ScalarKind),
    Object(String),
    Interface(String),
    Enum(String),
    /// Named reference with no matching declaration in the document
    Unresolved(String),
}

impl FieldTarget {
    pub fn name(&self) -> &str {
        match self {
            Self::Scalar(s) => s.as_str(),
            Self::Object(n) | Self::Interface(n) | Self::Enum(n) | Self::Unresolved(n) => n,
        }
    }

    pub fn is_unresolved(&self) -> bool {
        matches!(self, Self::Unresolved(_))
    }

    /// Target name when it is an object or interface declaration
    pub fn entity(&self) -> Option<&str> {
        match self {
            Self::Object(n) | Self::Interface(n) => Some(n),
            _ => None,
        }
    }
}

/// Field visibility, set from the configured private-field pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Private,
}

// =============================================================================
// Nodes
// =============================================================================

/// Field with its resolved target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityField {
    pub name: String,
    pub ty: TypeRef,
    pub target: FieldTarget,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub derived_from: Option<String>,
    pub visibility: Visibility,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub directives: Vec<Directive>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub span: Span,
    /// Index within the owning type
    pub position: usize,
}

impl EntityField {
    /// Derived fields are computed reverse views and never stored
    pub fn is_derived(&self) -> bool {
        self.derived_from.is_some()
    }

    pub fn is_private(&self) -> bool {
        self.visibility == Visibility::Private
    }
}

/// Resolved type declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityType {
    pub name: String,
    pub kind: DeclarationKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub implements: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EntityField>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<EnumValue>,
    pub immutable: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub directives: Vec<Directive>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub span: Span,
    /// Index of the declaration in the source document
    pub position: usize,
}

impl EntityType {
    /// First field with this name
    pub fn field(&self, name: &str) -> Option<&EntityField> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn is_object(&self) -> bool {
        self.kind == DeclarationKind::Object
    }

    pub fn is_interface(&self) -> bool {
        self.kind == DeclarationKind::Interface
    }

    pub fn is_enum(&self) -> bool {
        self.kind == DeclarationKind::Enum
    }

    /// Fields not marked private
    pub fn public_fields(&self) -> impl Iterator<Item = &EntityField> {
        self.fields.iter().filter(|f| !f.is_private())
    }
}

// =============================================================================
// Relations
// =============================================================================

/// Edge label in the relation graph
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationKind {
    /// Stored field referencing another declaration
    Reference { field: String, list: bool },
    /// `@derivedFrom` reverse view through `via` on the target
    Derived { field: String, via: String },
    /// Object implements interface
    Implements,
}

// =============================================================================
// Entity Graph
// =============================================================================

/// The resolved entity graph for one protocol document
#[derive(Debug, Clone)]
pub struct EntityGraph {
    /// First declaration of each name, in document order
    pub(crate) types: IndexMap<String, EntityType>,

    /// Later declarations reusing an existing name
    pub(crate) shadowed: Vec<EntityType>,

    /// (target type, target field) -> fields deriving from it
    pub(crate) reverse_relations: IndexMap<FieldKey, Vec<FieldKey>>,

    /// Interface name -> implementing object names
    pub(crate) implementers: IndexMap<String, Vec<String>>,

    /// Type-to-type relations
    pub(crate) relations: DiGraph<String, RelationKind>,

    /// Node index lookup: type name -> NodeIndex
    pub(crate) node_indices: HashMap<String, NodeIndex>,
}

impl PartialEq for EntityGraph {
    fn eq(&self, other: &Self) -> bool {
        self.types == other.types
            && self.shadowed == other.shadowed
            && self.reverse_relations == other.reverse_relations
            && self.implementers == other.implementers
    }
}

impl EntityGraph {
    // ========== Types ==========

    pub fn get(&self, name: &str) -> Option<&EntityType> {
        self.types.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// All types in declaration order
    pub fn types(&self) -> impl Iterator<Item = &EntityType> {
        self.types.values()
    }

    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn objects(&self) -> impl Iterator<Item = &EntityType> {
        self.types().filter(|t| t.is_object())
    }

    pub fn interfaces(&self) -> impl Iterator<Item = &EntityType> {
        self.types().filter(|t| t.is_interface())
    }

    pub fn enums(&self) -> impl Iterator<Item = &EntityType> {
        self.types().filter(|t| t.is_enum())
    }

    /// Declarations dropped from the graph because their name was taken
    pub fn shadowed(&self) -> &[EntityType] {
        &self.shadowed
    }

    pub fn field(&self, type_name: &str, field: &str) -> Option<&EntityField> {
        self.get(type_name)?.field(field)
    }

    // ========== Reverse Relations ==========

    /// Fields elsewhere that declare `@derivedFrom` pointing at `type_name.field`
    pub fn derived_from(&self, type_name: &str, field: &str) -> &[FieldKey] {
        self.reverse_relations
            .get(&FieldKey::new(type_name, field))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn reverse_relations(&self) -> impl Iterator<Item = (&FieldKey, &[FieldKey])> {
        self.reverse_relations.iter().map(|(k, v)| (k, v.as_slice()))
    }

    // ========== Interfaces ==========

    /// Objects declaring `implements interface`
    pub fn implementers(&self, interface: &str) -> &[String] {
        self.implementers.get(interface).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn implementer_map(&self) -> &IndexMap<String, Vec<String>> {
        &self.implementers
    }

    /// Whether `object` declares `implements interface`
    pub fn implements(&self, object: &str, interface: &str) -> bool {
        self.implementers(interface).iter().any(|o| o == object)
    }

    // ========== Relation Graph ==========

    pub fn relation_count(&self) -> usize {
        self.relations.edge_count()
    }

    /// Types this type points at through fields or `implements`
    pub fn references(&self, name: &str) -> Vec<&str> {
        self.neighbors(name, Direction::Outgoing)
    }

    /// Types pointing at this type
    pub fn referenced_by(&self, name: &str) -> Vec<&str> {
        self.neighbors(name, Direction::Incoming)
    }

    fn neighbors(&self, name: &str, direction: Direction) -> Vec<&str> {
        let Some(&node_idx) = self.node_indices.get(name) else {
            return Vec::new();
        };

        let mut seen = HashSet::new();
        let mut result: Vec<&str> = self
            .relations
            .edges_directed(node_idx, direction)
            .map(|e| match direction {
                Direction::Outgoing => e.target(),
                Direction::Incoming => e.source(),
            })
            .filter(|idx| seen.insert(*idx))
            .filter_map(|idx| self.relations.node_weight(idx).map(String::as_str))
            .collect();
        result.sort_unstable();
        result
    }

    /// Export the relation graph in GraphViz DOT format
    pub fn to_dot(&self) -> String {
        let mut output = String::new();

        output.push_str("digraph EntityGraph {\n");
        output.push_str("  rankdir=LR;\n");
        output.push_str("  node [shape=box, style=\"filled,rounded\", fontname=\"Helvetica\", fontsize=10];\n");
        output.push_str("  edge [fontname=\"Helvetica\", fontsize=8, fontcolor=\"#808080\"];\n");
        output.push('\n');

        for ty in self.types() {
            let (color, shape) = match ty.kind {
                DeclarationKind::Object if ty.immutable => ("#B0BEC5", "box"),
                DeclarationKind::Object => ("#80DEEA", "box"),
                DeclarationKind::Interface => ("#CE93D8", "component"),
                DeclarationKind::Enum => ("#FFAB91", "note"),
            };
            output.push_str(&format!(
                "  \"{}\" [fillcolor=\"{}\", shape={}];\n",
                ty.name, color, shape
            ));
        }
        output.push('\n');

        for edge in self.relations.edge_references() {
            let (Some(from), Some(to)) = (
                self.relations.node_weight(edge.source()),
                self.relations.node_weight(edge.target()),
            ) else {
                continue;
            };
            let attrs = match edge.weight() {
                RelationKind::Reference { field, list: false } => format!("label=\"{}\"", field),
                RelationKind::Reference { field, list: true } => format!("label=\"{}[]\"", field),
                RelationKind::Derived { field, via } => {
                    format!("label=\"{} <- {}\", style=dashed", field, via)
                }
                RelationKind::Implements => "arrowhead=empty, style=dotted".to_string(),
            };
            output.push_str(&format!("  \"{}\" -> \"{}\" [{}];\n", from, to, attrs));
        }

        output.push_str("}\n");
        output
    }
}
