//! SDL Document Tree
//!
//! Structural output of the parser. Nothing here is resolved: named type
//! references are plain strings until the graph builder looks them up.

use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Source Positions
// =============================================================================

/// 1-based source position.
///
/// Spans are informational only and never take part in structural
/// equality, so reformatting a document leaves the parsed tree unchanged.
#[derive(Debug, Clone, Copy, Default, Eq, Serialize, Deserialize)]
pub struct Span {
    pub line: usize,
    pub column: usize,
}

impl Span {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl PartialEq for Span {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

// =============================================================================
// Type References
// =============================================================================

/// Built-in scalar kinds understood by the indexing engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarKind {
    Id,
    String,
    Int,
    Boolean,
    Bytes,
    BigInt,
    BigDecimal,
}

impl ScalarKind {
    pub const ALL: [ScalarKind; 7] = [
        Self::Id,
        Self::String,
        Self::Int,
        Self::Boolean,
        Self::Bytes,
        Self::BigInt,
        Self::BigDecimal,
    ];

    /// Look up a scalar by its SDL name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == name)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Id => "ID",
            Self::String => "String",
            Self::Int => "Int",
            Self::Boolean => "Boolean",
            Self::Bytes => "Bytes",
            Self::BigInt => "BigInt",
            Self::BigDecimal => "BigDecimal",
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Innermost type of a field: a built-in scalar or a named declaration
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BaseType {
    Scalar(ScalarKind),
    Named(String),
}

impl BaseType {
    pub fn from_name(name: &str) -> Self {
        match ScalarKind::from_name(name) {
            Some(scalar) => Self::Scalar(scalar),
            None => Self::Named(name.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Scalar(s) => s.as_str(),
            Self::Named(n) => n,
        }
    }
}

/// Declared field type. List-ness and non-null are independent wrappers
/// that nest arbitrarily, e.g. `[BigInt!]!`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeRef {
    Base(BaseType),
    List(Box<TypeRef>),
    NonNull(Box<TypeRef>),
}

impl TypeRef {
    pub fn named(name: &str) -> Self {
        Self::Base(BaseType::from_name(name))
    }

    pub fn list(inner: TypeRef) -> Self {
        Self::List(Box::new(inner))
    }

    pub fn non_null(inner: TypeRef) -> Self {
        Self::NonNull(Box::new(inner))
    }

    /// The innermost scalar or named type
    pub fn base(&self) -> &BaseType {
        match self {
            Self::Base(b) => b,
            Self::List(inner) | Self::NonNull(inner) => inner.base(),
        }
    }

    /// Name of the innermost type when it is not a built-in scalar
    pub fn named_target(&self) -> Option<&str> {
        match self.base() {
            BaseType::Named(n) => Some(n),
            BaseType::Scalar(_) => None,
        }
    }

    pub fn is_nullable(&self) -> bool {
        !matches!(self, Self::NonNull(_))
    }

    /// Whether the outermost shape (ignoring non-null) is a list
    pub fn is_list(&self) -> bool {
        match self {
            Self::List(_) => true,
            Self::NonNull(inner) => inner.is_list(),
            Self::Base(_) => false,
        }
    }

    /// Strip one non-null wrapper, if present
    pub fn nullable_inner(&self) -> &TypeRef {
        match self {
            Self::NonNull(inner) => inner,
            other => other,
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Base(b) => f.write_str(b.name()),
            Self::List(inner) => write!(f, "[{}]", inner),
            Self::NonNull(inner) => write!(f, "{}!", inner),
        }
    }
}

// =============================================================================
// Directives
// =============================================================================

/// Directive argument value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Value {
    String(String),
    Int(i64),
    Float(String),
    Boolean(bool),
    Null,
    Enum(String),
    List(Vec<Value>),
    Object(Vec<(String, Value)>),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Argument {
    pub name: String,
    pub value: Value,
}

/// A directive application such as `@entity(immutable: true)`.
/// Directives outside the fixed set are kept as-is and never interpreted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Directive {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub arguments: Vec<Argument>,
    pub span: Span,
}

impl Directive {
    pub fn argument(&self, name: &str) -> Option<&Value> {
        self.arguments.iter().find(|a| a.name == name).map(|a| &a.value)
    }
}

pub(crate) fn find_directive<'a>(directives: &'a [Directive], name: &str) -> Option<&'a Directive> {
    directives.iter().find(|d| d.name == name)
}

// =============================================================================
// Declarations
// =============================================================================

/// Kind of a top-level declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeclarationKind {
    Object,
    Interface,
    Enum,
}

impl DeclarationKind {
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Object => "type",
            Self::Interface => "interface",
            Self::Enum => "enum",
        }
    }
}

impl fmt::Display for DeclarationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Field of an object or interface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDeclaration {
    pub name: String,
    pub ty: TypeRef,
    /// Target field named by `@derivedFrom(field: "...")`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub derived_from: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub directives: Vec<Directive>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub span: Span,
}

impl FieldDeclaration {
    pub fn is_derived(&self) -> bool {
        self.derived_from.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumValue {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub directives: Vec<Directive>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub span: Span,
}

/// A `type`, `interface` or `enum` declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDeclaration {
    pub name: String,
    pub kind: DeclarationKind,
    /// Interfaces named in the `implements` clause (objects only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub implements: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldDeclaration>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<EnumValue>,
    /// Set by `@entity(immutable: true)` on objects
    pub immutable: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub directives: Vec<Directive>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub span: Span,
}

impl TypeDeclaration {
    pub fn field(&self, name: &str) -> Option<&FieldDeclaration> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn directive(&self, name: &str) -> Option<&Directive> {
        find_directive(&self.directives, name)
    }
}

/// Parsed SDL document: declarations in source order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedDocument {
    pub declarations: Vec<TypeDeclaration>,
}

impl ParsedDocument {
    pub fn get(&self, name: &str) -> Option<&TypeDeclaration> {
        self.declarations.iter().find(|d| d.name == name)
    }

    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_ref_display_and_shape() {
        let ty = TypeRef::non_null(TypeRef::list(TypeRef::non_null(TypeRef::named("BigInt"))));
        assert_eq!(ty.to_string(), "[BigInt!]!");
        assert!(ty.is_list());
        assert!(!ty.is_nullable());
        assert_eq!(ty.base(), &BaseType::Scalar(ScalarKind::BigInt));
        assert_eq!(ty.named_target(), None);
    }

    #[test]
    fn test_named_target() {
        let ty = TypeRef::list(TypeRef::named("Token"));
        assert_eq!(ty.named_target(), Some("Token"));
        assert!(ty.is_nullable());
    }

    #[test]
    fn test_spans_do_not_affect_equality() {
        assert_eq!(Span::new(1, 1), Span::new(40, 7));
    }
}
