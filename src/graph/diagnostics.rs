//! Diagnostics
//!
//! Collects errors and warnings from the builder and validator passes.
//! Nothing here fails fast: every finding is recorded so a schema author
//! can fix all issues in one iteration.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::SyntaxError;
use crate::sdl::Span;

// =============================================================================
// Diagnostic Kinds
// =============================================================================

/// Stable tag for the class of problem found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticKind {
    /// Malformed SDL; no graph was produced
    Parse,
    /// Named type reference that does not resolve in the document
    UnknownType,
    /// `derivedFrom` names a field the target type does not declare
    DanglingDerivedFrom,
    /// `derivedFrom` target field does not point back at the deriving type
    DerivedFromMismatch,
    /// Implementer omits a field declared on its interface
    InterfaceFieldMissing,
    /// Implementer declares an interface field with an incompatible type
    InterfaceFieldTypeMismatch,
    /// Two declarations share a type name
    DuplicateType,
    /// Two fields (or enum values) share a name within one type
    DuplicateField,
    /// Immutable entity exposes a reverse view over a mutable entity
    ImmutabilityAdvisory,
}

impl DiagnosticKind {
    /// Stable tag, suitable for machine consumption
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Parse => "Parse",
            Self::UnknownType => "UnknownType",
            Self::DanglingDerivedFrom => "DanglingDerivedFrom",
            Self::DerivedFromMismatch => "DerivedFromMismatch",
            Self::InterfaceFieldMissing => "InterfaceFieldMissing",
            Self::InterfaceFieldTypeMismatch => "InterfaceFieldTypeMismatch",
            Self::DuplicateType => "DuplicateType",
            Self::DuplicateField => "DuplicateField",
            Self::ImmutabilityAdvisory => "ImmutabilityAdvisory",
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Parse => "E000",
            Self::UnknownType => "E001",
            Self::DanglingDerivedFrom => "E002",
            Self::DerivedFromMismatch => "E003",
            Self::InterfaceFieldMissing => "E004",
            Self::InterfaceFieldTypeMismatch => "E005",
            Self::DuplicateType => "E006",
            Self::DuplicateField => "E007",
            Self::ImmutabilityAdvisory => "W001",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Self::Parse
            | Self::UnknownType
            | Self::DanglingDerivedFrom
            | Self::DerivedFromMismatch
            | Self::InterfaceFieldMissing
            | Self::InterfaceFieldTypeMismatch
            | Self::DuplicateType
            | Self::DuplicateField => Severity::Error,

            Self::ImmutabilityAdvisory => Severity::Warning,
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Severity
// =============================================================================

/// Diagnostic severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

// =============================================================================
// Diagnostic
// =============================================================================

/// Path used for findings that concern the whole document
pub const DOCUMENT_PATH: &str = "<document>";

/// A single finding: severity, kind tag, `Type` or `Type.field` path, message.
///
/// Equality ignores span positions (see [`Span`]), so the same finding in a
/// reformatted document compares equal. Only whether a span is present counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    pub path: String,
    pub message: String,
    /// Closest declared name when the problem is a misspelling
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: kind.severity(),
            kind,
            path: path.into(),
            message: message.into(),
            suggestion: None,
            span: None,
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    pub fn with_suggestion(mut self, suggestion: Option<String>) -> Self {
        self.suggestion = suggestion;
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl From<SyntaxError> for Diagnostic {
    fn from(err: SyntaxError) -> Self {
        Diagnostic::new(DiagnosticKind::Parse, DOCUMENT_PATH, err.message)
            .with_span(Span::new(err.line, err.column))
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} {}: {} ({}", self.kind.code(), self.severity, self.kind, self.message, self.path)?;
        if let Some(span) = self.span {
            write!(f, " at {}", span)?;
        }
        f.write_str(")")?;
        if let Some(suggestion) = &self.suggestion {
            write!(f, "\n  - did you mean `{}`?", suggestion)?;
        }
        Ok(())
    }
}

// =============================================================================
// Diagnostics Collection
// =============================================================================

/// Ordered collection of diagnostics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: Diagnostic) {
        self.items.push(item);
    }

    /// Check if there are any errors
    pub fn has_errors(&self) -> bool {
        self.items.iter().any(Diagnostic::is_error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter().filter(|i| i.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter().filter(|i| i.severity == Severity::Warning)
    }

    /// Only the warning-level findings
    pub fn into_warnings(self) -> Diagnostics {
        self.items.into_iter().filter(|i| !i.is_error()).collect()
    }

    /// Findings of one kind, in order
    pub fn of_kind(&self, kind: DiagnosticKind) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter().filter(move |i| i.kind == kind)
    }

    pub fn all(&self) -> &[Diagnostic] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    pub fn warning_count(&self) -> usize {
        self.warnings().count()
    }

    /// Format all diagnostics for display
    pub fn format_all(&self) -> String {
        let mut output = String::new();

        for item in &self.items {
            output.push_str(&format!("{}\n", item));
        }

        if self.has_errors() {
            output.push_str(&format!(
                "\n{} error(s), {} warning(s)\n",
                self.error_count(),
                self.warning_count()
            ));
        } else if !self.is_empty() {
            output.push_str(&format!("\n{} warning(s)\n", self.warning_count()));
        }

        output
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_all())
    }
}

impl From<SyntaxError> for Diagnostics {
    fn from(err: SyntaxError) -> Self {
        std::iter::once(Diagnostic::from(err)).collect()
    }
}

impl FromIterator<Diagnostic> for Diagnostics {
    fn from_iter<I: IntoIterator<Item = Diagnostic>>(iter: I) -> Self {
        Self { items: iter.into_iter().collect() }
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_severity() {
        assert_eq!(DiagnosticKind::UnknownType.severity(), Severity::Error);
        assert_eq!(DiagnosticKind::ImmutabilityAdvisory.severity(), Severity::Warning);
    }

    #[test]
    fn test_diagnostics_collection() {
        let mut diags = Diagnostics::new();
        diags.push(Diagnostic::new(DiagnosticKind::UnknownType, "Pool.fees", "unknown type"));
        diags.push(Diagnostic::new(DiagnosticKind::ImmutabilityAdvisory, "Swap", "advisory"));

        assert_eq!(diags.error_count(), 1);
        assert_eq!(diags.warning_count(), 1);
        assert!(diags.has_errors());
        assert!(!diags.clone().into_warnings().has_errors());
        assert!(diags.format_all().ends_with("1 error(s), 1 warning(s)\n"));
    }

    #[test]
    fn test_syntax_error_becomes_parse_diagnostic() {
        let diags = Diagnostics::from(SyntaxError::new(3, 7, "unterminated string"));
        let parse = &diags.all()[0];
        assert_eq!(parse.kind, DiagnosticKind::Parse);
        assert_eq!(parse.path, DOCUMENT_PATH);
        assert_eq!(parse.span.map(|s| (s.line, s.column)), Some((3, 7)));
    }

    #[test]
    fn test_equality_ignores_span_position() {
        let at = |line, column| {
            Diagnostic::new(DiagnosticKind::UnknownType, "Swap.pool", "unknown type `Pol`")
                .with_span(Span::new(line, column))
        };
        assert_eq!(at(3, 7), at(12, 1));
        assert_ne!(at(3, 7), Diagnostic::new(DiagnosticKind::UnknownType, "Swap.pool", "unknown type `Pol`"));
    }

    #[test]
    fn test_display_includes_suggestion() {
        let item = Diagnostic::new(DiagnosticKind::UnknownType, "Swap.pool", "unknown type `Pol`")
            .with_suggestion(Some("Pool".into()));
        assert!(item.to_string().contains("did you mean `Pool`?"));
    }
}
