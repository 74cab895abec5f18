//! Relationship Validator
//!
//! Runs the fixed battery of consistency checks over an [`EntityGraph`]:
//!
//! 1. unknown type references (fields and `implements` clauses)
//! 2. `derivedFrom` target existence
//! 3. `derivedFrom` reciprocity
//! 4. interface conformance
//! 5. enum closure
//! 6. duplicate types, fields and enum values
//! 7. immutability advisories (warning)
//!
//! All findings are collected. Output order is fixed: owning type's
//! declaration position, then check number, then position inside the type.

use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;

use crate::graph::builder::{unresolved_field, unresolved_interface};
use crate::graph::{
    Diagnostic, DiagnosticKind, Diagnostics, EntityField, EntityGraph, EntityType, FieldTarget,
};
use crate::sdl::{BaseType, TypeRef};

/// Validation switches, usually taken from `[validation]` config
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationOptions {
    /// When false, private fields are invisible to every check
    pub include_private_fields: bool,
    /// Emit check 7 warnings
    pub immutability_advisories: bool,
    /// Attach "did you mean" suggestions to misspelled names
    pub suggest_similar: bool,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            include_private_fields: true,
            immutability_advisories: true,
            suggest_similar: true,
        }
    }
}

/// Validate with default options
pub fn validate(graph: &EntityGraph) -> Diagnostics {
    Validator::default().validate(graph)
}

/// Ordering key: (type position, check, clause, sub-clause)
type OrderKey = (usize, u8, usize, usize);

#[derive(Debug, Clone, Default)]
pub struct Validator {
    options: ValidationOptions,
}

impl Validator {
    pub fn new(options: ValidationOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ValidationOptions {
        &self.options
    }

    /// Run every check over the graph
    pub fn validate(&self, graph: &EntityGraph) -> Diagnostics {
        let mut findings: Vec<(OrderKey, Diagnostic)> = Vec::new();

        for ty in graph.types() {
            self.check_unknown_types(graph, ty, &mut findings);
            self.check_derived_targets(graph, ty, &mut findings);
            self.check_derived_reciprocity(graph, ty, &mut findings);
            self.check_interface_conformance(graph, ty, &mut findings);
            self.check_enum_closure(graph, ty, &mut findings);
            self.check_duplicate_members(ty, &mut findings);
            if self.options.immutability_advisories {
                self.check_immutability(graph, ty, &mut findings);
            }
        }
        for duplicate in graph.shadowed() {
            self.check_unknown_types(graph, duplicate, &mut findings);
            self.check_duplicate_members(duplicate, &mut findings);
        }
        self.check_duplicate_types(graph, &mut findings);

        findings.sort_by_key(|(key, _)| *key);

        let diagnostics: Diagnostics = findings.into_iter().map(|(_, d)| d).collect();
        tracing::debug!(
            types = graph.len(),
            errors = diagnostics.error_count(),
            warnings = diagnostics.warning_count(),
            "validated entity graph"
        );
        diagnostics
    }

    fn visible<'a>(&self, ty: &'a EntityType) -> impl Iterator<Item = &'a EntityField> + 'a {
        let include_private = self.options.include_private_fields;
        ty.fields.iter().filter(move |f| include_private || !f.is_private())
    }

    // =========================================================================
    // Check 1: unknown type references
    // =========================================================================

    fn check_unknown_types(&self, graph: &EntityGraph, ty: &EntityType, out: &mut Vec<(OrderKey, Diagnostic)>) {
        for (i, name) in ty.implements.iter().enumerate() {
            let declared = graph.get(name);
            if declared.is_some_and(EntityType::is_interface) {
                continue;
            }
            let suggestion = self.suggest(name, graph.interfaces().map(|d| d.name.as_str()));
            let diagnostic = unresolved_interface(ty, name, declared.map(|d| d.kind));
            out.push(((ty.position, 1, 0, i), diagnostic.with_suggestion(suggestion)));
        }

        for field in self.visible(ty) {
            if let FieldTarget::Unresolved(name) = &field.target {
                let suggestion = self.suggest(name, graph.type_names());
                out.push((
                    (ty.position, 1, field.position + 1, 0),
                    unresolved_field(ty, field).with_suggestion(suggestion),
                ));
            }
        }
    }

    // =========================================================================
    // Check 2: derivedFrom target existence
    // =========================================================================

    fn check_derived_targets(&self, graph: &EntityGraph, ty: &EntityType, out: &mut Vec<(OrderKey, Diagnostic)>) {
        for field in self.visible(ty) {
            let (Some(via), Some(target)) = (&field.derived_from, field.target.entity()) else {
                continue;
            };
            let Some(target_ty) = graph.get(target) else {
                continue;
            };
            if target_ty.field(via).is_some() {
                continue;
            }

            let suggestion = self.suggest(via, target_ty.fields.iter().map(|f| f.name.as_str()));
            let diagnostic = Diagnostic::new(
                DiagnosticKind::DanglingDerivedFrom,
                format!("{}.{}", ty.name, field.name),
                format!(
                    "`{}.{}` is derived from `{}.{}`, but `{}` declares no field `{}`",
                    ty.name, field.name, target, via, target, via
                ),
            )
            .with_span(field.span)
            .with_suggestion(suggestion);
            out.push(((ty.position, 2, field.position + 1, 0), diagnostic));
        }
    }

    // =========================================================================
    // Check 3: derivedFrom reciprocity
    // =========================================================================

    fn check_derived_reciprocity(&self, graph: &EntityGraph, ty: &EntityType, out: &mut Vec<(OrderKey, Diagnostic)>) {
        for field in self.visible(ty) {
            let Some(via) = &field.derived_from else {
                continue;
            };
            let path = format!("{}.{}", ty.name, field.name);

            let message = match &field.target {
                FieldTarget::Unresolved(_) => continue,
                FieldTarget::Scalar(_) | FieldTarget::Enum(_) => format!(
                    "`{}` is derived but typed `{}`; derived fields must reference an entity",
                    path, field.ty
                ),
                FieldTarget::Object(target) | FieldTarget::Interface(target) => {
                    let Some(back) = graph.field(target, via) else {
                        continue;
                    };
                    if back.is_derived() {
                        format!(
                            "`{}` is derived from `{}.{}`, which is itself a derived field",
                            path, target, via
                        )
                    } else if !references_owner(&back.ty, &ty.name) {
                        format!(
                            "`{}` is derived from `{}.{}: {}`, which is neither `{}` nor a list of `{}`",
                            path, target, via, back.ty, ty.name, ty.name
                        )
                    } else {
                        continue;
                    }
                }
            };

            let diagnostic = Diagnostic::new(DiagnosticKind::DerivedFromMismatch, path, message).with_span(field.span);
            out.push(((ty.position, 3, field.position + 1, 0), diagnostic));
        }
    }

    // =========================================================================
    // Check 4: interface conformance
    // =========================================================================

    fn check_interface_conformance(&self, graph: &EntityGraph, ty: &EntityType, out: &mut Vec<(OrderKey, Diagnostic)>) {
        if !ty.is_object() {
            return;
        }

        for (i, name) in ty.implements.iter().enumerate() {
            let Some(interface) = graph.get(name).filter(|d| d.is_interface()) else {
                continue;
            };

            for required in self.visible(interface) {
                let path = format!("{}.{}", ty.name, required.name);
                let key = (ty.position, 4, i, required.position);

                match ty.field(&required.name) {
                    None => {
                        let diagnostic = Diagnostic::new(
                            DiagnosticKind::InterfaceFieldMissing,
                            path,
                            format!(
                                "`{}` implements `{}` but does not declare `{}: {}`",
                                ty.name, interface.name, required.name, required.ty
                            ),
                        )
                        .with_span(ty.span);
                        out.push((key, diagnostic));
                    }
                    Some(field) if !is_compatible(graph, &field.ty, &required.ty) => {
                        let diagnostic = Diagnostic::new(
                            DiagnosticKind::InterfaceFieldTypeMismatch,
                            path,
                            format!(
                                "`{}.{}: {}` is not compatible with `{}.{}: {}`",
                                ty.name, field.name, field.ty, interface.name, required.name, required.ty
                            ),
                        )
                        .with_span(field.span);
                        out.push((key, diagnostic));
                    }
                    Some(_) => {}
                }
            }
        }
    }

    // =========================================================================
    // Check 5: enum closure
    // =========================================================================

    fn check_enum_closure(&self, graph: &EntityGraph, ty: &EntityType, out: &mut Vec<(OrderKey, Diagnostic)>) {
        for field in self.visible(ty) {
            let FieldTarget::Enum(name) = &field.target else {
                continue;
            };
            if graph.get(name).is_some_and(|e| !e.values.is_empty()) {
                continue;
            }
            let diagnostic = Diagnostic::new(
                DiagnosticKind::UnknownType,
                format!("{}.{}", ty.name, field.name),
                format!("field `{}` references enum `{}`, which declares no values", field.name, name),
            )
            .with_span(field.span);
            out.push(((ty.position, 5, field.position + 1, 0), diagnostic));
        }
    }

    // =========================================================================
    // Check 6: duplicates
    // =========================================================================

    fn check_duplicate_members(&self, ty: &EntityType, out: &mut Vec<(OrderKey, Diagnostic)>) {
        let fields: Vec<&EntityField> = self.visible(ty).collect();
        for (i, field) in fields.iter().enumerate() {
            if fields[..i].iter().any(|f| f.name == field.name) {
                let diagnostic = Diagnostic::new(
                    DiagnosticKind::DuplicateField,
                    format!("{}.{}", ty.name, field.name),
                    format!("field `{}` is declared more than once on `{}`", field.name, ty.name),
                )
                .with_span(field.span);
                out.push(((ty.position, 6, field.position + 1, 0), diagnostic));
            }
        }

        for (i, value) in ty.values.iter().enumerate() {
            if ty.values[..i].iter().any(|v| v.name == value.name) {
                let diagnostic = Diagnostic::new(
                    DiagnosticKind::DuplicateField,
                    format!("{}.{}", ty.name, value.name),
                    format!("value `{}` is declared more than once on enum `{}`", value.name, ty.name),
                )
                .with_span(value.span);
                out.push(((ty.position, 6, i + 1, 0), diagnostic));
            }
        }
    }

    fn check_duplicate_types(&self, graph: &EntityGraph, out: &mut Vec<(OrderKey, Diagnostic)>) {
        for duplicate in graph.shadowed() {
            let first = graph
                .get(&duplicate.name)
                .map(|t| format!(" (first declared at {})", t.span))
                .unwrap_or_default();
            let diagnostic = Diagnostic::new(
                DiagnosticKind::DuplicateType,
                duplicate.name.as_str(),
                format!("type `{}` is declared more than once{}", duplicate.name, first),
            )
            .with_span(duplicate.span);
            out.push(((duplicate.position, 6, 0, 0), diagnostic));
        }
    }

    // =========================================================================
    // Check 7: immutability advisories
    // =========================================================================

    fn check_immutability(&self, graph: &EntityGraph, ty: &EntityType, out: &mut Vec<(OrderKey, Diagnostic)>) {
        if !(ty.is_object() && ty.immutable) {
            return;
        }
        for field in self.visible(ty) {
            let (Some(via), FieldTarget::Object(target)) = (&field.derived_from, &field.target) else {
                continue;
            };
            if graph.get(target).map_or(true, |t| t.immutable) {
                continue;
            }
            let diagnostic = Diagnostic::new(
                DiagnosticKind::ImmutabilityAdvisory,
                format!("{}.{}", ty.name, field.name),
                format!(
                    "immutable `{}` derives `{}` from mutable `{}.{}`; the view can change after creation",
                    ty.name, field.name, target, via
                ),
            )
            .with_span(field.span);
            out.push(((ty.position, 7, field.position + 1, 0), diagnostic));
        }
    }

    // =========================================================================
    // Suggestions
    // =========================================================================

    fn suggest<'a>(&self, query: &str, candidates: impl Iterator<Item = &'a str>) -> Option<String> {
        if !self.options.suggest_similar {
            return None;
        }
        let matcher = SkimMatcherV2::default();
        candidates
            .filter(|c| *c != query)
            .filter_map(|c| {
                let forward = matcher.fuzzy_match(c, query);
                let backward = matcher.fuzzy_match(query, c);
                forward.max(backward).map(|score| (score, c))
            })
            .max_by_key(|(score, _)| *score)
            .map(|(_, c)| c.to_string())
    }
}

/// Whether a back-reference type is `owner` or a single list of `owner`,
/// with or without non-null wrappers.
fn references_owner(back: &TypeRef, owner: &str) -> bool {
    let item = match back.nullable_inner() {
        TypeRef::List(inner) => inner.nullable_inner(),
        other => other,
    };
    matches!(item, TypeRef::Base(BaseType::Named(name)) if name == owner)
}

/// Whether an implementer's field type satisfies the interface's.
///
/// List shape must match level for level. Non-null may be added, never
/// dropped. Named types match by name, or covariantly when the interface
/// field is interface-typed and the implementer narrows to an implementer.
fn is_compatible(graph: &EntityGraph, found: &TypeRef, required: &TypeRef) -> bool {
    match (found, required) {
        (TypeRef::NonNull(f), TypeRef::NonNull(r)) => is_compatible(graph, f, r),
        (TypeRef::NonNull(f), r) => is_compatible(graph, f, r),
        (_, TypeRef::NonNull(_)) => false,
        (TypeRef::List(f), TypeRef::List(r)) => is_compatible(graph, f, r),
        (TypeRef::Base(f), TypeRef::Base(r)) => match (f, r) {
            (BaseType::Scalar(a), BaseType::Scalar(b)) => a == b,
            (BaseType::Named(a), BaseType::Named(b)) => {
                a == b || (graph.get(b).is_some_and(EntityType::is_interface) && graph.implements(a, b))
            }
            _ => false,
        },
        _ => false,
    }
}
