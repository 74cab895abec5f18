//! Graph Construction
//!
//! Resolves a parsed document into an [`EntityGraph`]. Every declaration is
//! visited exactly once and every field target is looked up by name, so
//! construction is linear in the size of the document. Unresolved names are
//! recorded as [`FieldTarget::Unresolved`] and reported, never fatal.

use indexmap::IndexMap;
use petgraph::graph::DiGraph;
use regex::Regex;
use std::collections::HashMap;

use super::{
    Diagnostic, DiagnosticKind, Diagnostics, EntityField, EntityGraph, EntityType, FieldKey,
    FieldTarget, RelationKind, Visibility,
};
use crate::sdl::{BaseType, DeclarationKind, FieldDeclaration, ParsedDocument, TypeDeclaration};

/// Options for graph construction
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Field names matching this pattern are marked private
    pub private_fields: Option<Regex>,
}

impl BuildOptions {
    pub fn with_private_fields(pattern: Regex) -> Self {
        Self {
            private_fields: Some(pattern),
        }
    }

    fn visibility(&self, field: &str) -> Visibility {
        match &self.private_fields {
            Some(pattern) if pattern.is_match(field) => Visibility::Private,
            _ => Visibility::Public,
        }
    }
}

/// Build with default options (no private fields)
pub fn build(doc: &ParsedDocument) -> (EntityGraph, Diagnostics) {
    build_with(doc, &BuildOptions::default())
}

/// Resolve a document into an entity graph.
///
/// The first declaration of a name wins; later ones land in
/// [`EntityGraph::shadowed`]. Diagnostics cover unresolved references only,
/// in shadowed declarations too.
/// Structural checks belong to the validator.
pub fn build_with(doc: &ParsedDocument, options: &BuildOptions) -> (EntityGraph, Diagnostics) {
    let count = doc.len();

    // First pass: name -> kind of the winning declaration
    let mut kinds: HashMap<&str, DeclarationKind> = HashMap::with_capacity(count);
    for decl in &doc.declarations {
        kinds.entry(decl.name.as_str()).or_insert(decl.kind);
    }

    let mut types: IndexMap<String, EntityType> = IndexMap::with_capacity(count);
    let mut shadowed = Vec::new();
    let mut diagnostics = Diagnostics::new();

    for (position, decl) in doc.declarations.iter().enumerate() {
        let entity = resolve_type(decl, position, &kinds, options);

        for name in &entity.implements {
            if kinds.get(name.as_str()) != Some(&DeclarationKind::Interface) {
                diagnostics.push(unresolved_interface(&entity, name, kinds.get(name.as_str()).copied()));
            }
        }
        for field in &entity.fields {
            if field.target.is_unresolved() {
                diagnostics.push(unresolved_field(&entity, field));
            }
        }

        if types.contains_key(&entity.name) {
            shadowed.push(entity);
        } else {
            types.insert(entity.name.clone(), entity);
        }
    }

    // Reverse index and implementer sets
    let mut reverse_relations: IndexMap<FieldKey, Vec<FieldKey>> = IndexMap::new();
    let mut implementers: IndexMap<String, Vec<String>> = IndexMap::new();

    for ty in types.values() {
        for field in &ty.fields {
            let (Some(via), Some(target)) = (&field.derived_from, field.ty.named_target()) else {
                continue;
            };
            reverse_relations
                .entry(FieldKey::new(target, via.as_str()))
                .or_default()
                .push(FieldKey::new(ty.name.as_str(), field.name.as_str()));
        }
        if ty.is_object() {
            for interface in &ty.implements {
                let objects = implementers.entry(interface.clone()).or_default();
                if !objects.contains(&ty.name) {
                    objects.push(ty.name.clone());
                }
            }
        }
    }

    // Relation graph over resolved declarations
    let mut relations = DiGraph::with_capacity(types.len(), types.len() * 3);
    let mut node_indices = HashMap::with_capacity(types.len());
    for name in types.keys() {
        let node_idx = relations.add_node(name.clone());
        node_indices.insert(name.clone(), node_idx);
    }

    for ty in types.values() {
        let Some(&from_idx) = node_indices.get(&ty.name) else {
            continue;
        };
        for field in &ty.fields {
            let target = match &field.target {
                FieldTarget::Object(n) | FieldTarget::Interface(n) | FieldTarget::Enum(n) => n,
                FieldTarget::Scalar(_) | FieldTarget::Unresolved(_) => continue,
            };
            let Some(&to_idx) = node_indices.get(target) else {
                continue;
            };
            let kind = match &field.derived_from {
                Some(via) => RelationKind::Derived {
                    field: field.name.clone(),
                    via: via.clone(),
                },
                None => RelationKind::Reference {
                    field: field.name.clone(),
                    list: field.ty.is_list(),
                },
            };
            relations.add_edge(from_idx, to_idx, kind);
        }
        for interface in &ty.implements {
            if let Some(&to_idx) = node_indices.get(interface) {
                relations.add_edge(from_idx, to_idx, RelationKind::Implements);
            }
        }
    }

    tracing::debug!(
        types = types.len(),
        shadowed = shadowed.len(),
        relations = relations.edge_count(),
        "built entity graph"
    );

    let graph = EntityGraph {
        types,
        shadowed,
        reverse_relations,
        implementers,
        relations,
        node_indices,
    };
    (graph, diagnostics)
}

fn resolve_type(
    decl: &TypeDeclaration,
    position: usize,
    kinds: &HashMap<&str, DeclarationKind>,
    options: &BuildOptions,
) -> EntityType {
    EntityType {
        name: decl.name.clone(),
        kind: decl.kind,
        implements: decl.implements.clone(),
        fields: decl
            .fields
            .iter()
            .enumerate()
            .map(|(i, field)| resolve_field(field, i, kinds, options))
            .collect(),
        values: decl.values.clone(),
        immutable: decl.immutable,
        directives: decl.directives.clone(),
        description: decl.description.clone(),
        span: decl.span,
        position,
    }
}

fn resolve_field(
    field: &FieldDeclaration,
    position: usize,
    kinds: &HashMap<&str, DeclarationKind>,
    options: &BuildOptions,
) -> EntityField {
    let target = match field.ty.base() {
        BaseType::Scalar(s) => FieldTarget::Scalar(*s),
        BaseType::Named(name) => match kinds.get(name.as_str()) {
            Some(DeclarationKind::Object) => FieldTarget::Object(name.clone()),
            Some(DeclarationKind::Interface) => FieldTarget::Interface(name.clone()),
            Some(DeclarationKind::Enum) => FieldTarget::Enum(name.clone()),
            None => FieldTarget::Unresolved(name.clone()),
        },
    };

    EntityField {
        name: field.name.clone(),
        ty: field.ty.clone(),
        target,
        derived_from: field.derived_from.clone(),
        visibility: options.visibility(&field.name),
        directives: field.directives.clone(),
        description: field.description.clone(),
        span: field.span,
        position,
    }
}

// =============================================================================
// Shared Diagnostic Constructors
// =============================================================================

pub(crate) fn unresolved_field(owner: &EntityType, field: &EntityField) -> Diagnostic {
    Diagnostic::new(
        DiagnosticKind::UnknownType,
        format!("{}.{}", owner.name, field.name),
        format!("field `{}` references unknown type `{}`", field.name, field.target.name()),
    )
    .with_span(field.span)
}

pub(crate) fn unresolved_interface(
    owner: &EntityType,
    interface: &str,
    found: Option<DeclarationKind>,
) -> Diagnostic {
    let message = match found {
        Some(kind) => format!(
            "`{}` implements `{}`, which is declared as `{}` rather than an interface",
            owner.name, interface, kind
        ),
        None => format!("`{}` implements unknown interface `{}`", owner.name, interface),
    };
    Diagnostic::new(DiagnosticKind::UnknownType, owner.name.as_str(), message).with_span(owner.span)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sdl::parse;
    use indoc::indoc;

    const POOLS: &str = indoc! {r#"
        interface Named {
          id: ID!
        }

        type Pool implements Named @entity {
          id: ID!
          tokens: [PoolToken!]! @derivedFrom(field: "pool")
          _cache: BigInt
        }

        type PoolToken implements Named @entity {
          id: ID!
          pool: Pool!
          kind: TokenKind!
        }

        enum TokenKind {
          WEIGHTED
          STABLE
        }
    "#};

    fn graph(source: &str) -> (EntityGraph, Diagnostics) {
        build(&parse(source).unwrap())
    }

    #[test]
    fn test_targets_resolved() {
        let (graph, diags) = graph(POOLS);
        assert!(diags.is_empty());
        assert_eq!(graph.len(), 4);
        assert_eq!(graph.field("PoolToken", "pool").unwrap().target, FieldTarget::Object("Pool".into()));
        assert_eq!(graph.field("PoolToken", "kind").unwrap().target, FieldTarget::Enum("TokenKind".into()));
        assert!(matches!(graph.field("Pool", "id").unwrap().target, FieldTarget::Scalar(_)));
    }

    #[test]
    fn test_reverse_index() {
        let (graph, _) = graph(POOLS);
        assert_eq!(graph.derived_from("PoolToken", "pool"), &[FieldKey::new("Pool", "tokens")]);
        assert!(graph.derived_from("Pool", "tokens").is_empty());
    }

    #[test]
    fn test_implementers() {
        let (graph, _) = graph(POOLS);
        assert_eq!(graph.implementers("Named"), &["Pool".to_string(), "PoolToken".to_string()]);
        assert!(graph.implements("Pool", "Named"));
        assert!(graph.implementers("Missing").is_empty());
    }

    #[test]
    fn test_unresolved_reference_reported() {
        let (graph, diags) = graph("type Swap { id: ID! pool: Pol! }");
        assert_eq!(graph.field("Swap", "pool").unwrap().target, FieldTarget::Unresolved("Pol".into()));
        assert_eq!(diags.len(), 1);
        assert_eq!(diags.all()[0].kind, DiagnosticKind::UnknownType);
        assert_eq!(diags.all()[0].path, "Swap.pool");
    }

    #[test]
    fn test_implements_non_interface_reported() {
        let (_, diags) = graph("type A { id: ID! } type B implements A { id: ID! }");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags.all()[0].path, "B");
    }

    #[test]
    fn test_first_declaration_wins() {
        let (graph, _) = graph("type A { id: ID! } enum A { X }");
        assert!(graph.get("A").unwrap().is_object());
        assert_eq!(graph.shadowed().len(), 1);
        assert!(graph.shadowed()[0].is_enum());
    }

    #[test]
    fn test_shadowed_unresolved_reported() {
        let (graph, diags) = graph("type A { id: ID! } type A { id: ID! x: Missing }");
        assert_eq!(graph.shadowed()[0].field("x").unwrap().target, FieldTarget::Unresolved("Missing".into()));
        assert_eq!(diags.len(), 1);
        assert_eq!(diags.all()[0].path, "A.x");
    }

    #[test]
    fn test_private_fields_marked() {
        let doc = parse(POOLS).unwrap();
        let options = BuildOptions::with_private_fields(Regex::new("^_").unwrap());
        let (graph, _) = build_with(&doc, &options);
        assert!(graph.field("Pool", "_cache").unwrap().is_private());
        assert!(!graph.field("Pool", "id").unwrap().is_private());
        assert_eq!(graph.get("Pool").unwrap().public_fields().count(), 2);
    }

    #[test]
    fn test_relation_graph() {
        let (graph, _) = graph(POOLS);
        assert_eq!(graph.references("PoolToken"), vec!["Named", "Pool", "TokenKind"]);
        assert_eq!(graph.referenced_by("Pool"), vec!["PoolToken"]);

        let dot = graph.to_dot();
        assert!(dot.starts_with("digraph EntityGraph {"));
        assert!(dot.contains("\"Pool\" -> \"PoolToken\" [label=\"tokens <- pool\", style=dashed];"));
    }
}
