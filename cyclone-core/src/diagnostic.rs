//! Diagnostics shared by every phase of the pipeline.
//!
//! Each phase records tagged entries instead of bumping a bare counter;
//! per-phase error counts are views over the recorded entries.

use std::fmt;

use crate::span::{LineIndex, Span};

/// Pipeline phase that produced a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Phase {
    Syntax,
    Semantic,
    Type,
}

impl Phase {
    pub const ALL: [Phase; 3] = [Phase::Syntax, Phase::Semantic, Phase::Type];

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Syntax => "syntax",
            Phase::Semantic => "semantic",
            Phase::Type => "type",
        }
    }
}

/// What went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    UnexpectedCharacter,
    UnterminatedLiteral,
    DuplicateDeclaration,
    UndefinedReference,
    InvalidScopeUse,
    TypeMismatch,
}

impl DiagnosticKind {
    /// Phase a kind belongs to. Every kind lives in exactly one phase.
    pub fn phase(self) -> Phase {
        match self {
            DiagnosticKind::UnexpectedCharacter | DiagnosticKind::UnterminatedLiteral => {
                Phase::Syntax
            }
            DiagnosticKind::DuplicateDeclaration
            | DiagnosticKind::UndefinedReference
            | DiagnosticKind::InvalidScopeUse => Phase::Semantic,
            DiagnosticKind::TypeMismatch => Phase::Type,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            DiagnosticKind::UnexpectedCharacter => "E0001",
            DiagnosticKind::UnterminatedLiteral => "E0002",
            DiagnosticKind::DuplicateDeclaration => "E0101",
            DiagnosticKind::UndefinedReference => "E0102",
            DiagnosticKind::InvalidScopeUse => "E0103",
            DiagnosticKind::TypeMismatch => "E0201",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub phase: Phase,
    pub kind: DiagnosticKind,
    pub span: Span,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>, span: Span) -> Self {
        Diagnostic {
            phase: kind.phase(),
            kind,
            span,
            message: message.into(),
        }
    }

    /// Render as `source:line:col: phase error[code]: message`.
    pub fn render(&self, source_name: &str, lines: &LineIndex) -> String {
        format!(
            "{}:{}: {} error[{}]: {}",
            source_name,
            lines.position(self.span.start),
            self.phase.as_str(),
            self.kind.code(),
            self.message
        )
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} error[{}] at {}..{}: {}",
            self.phase.as_str(),
            self.kind.code(),
            self.span.start,
            self.span.end,
            self.message
        )
    }
}

/// Ordered collection of diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Diagnostics::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        tracing::debug!(
            phase = diagnostic.phase.as_str(),
            code = diagnostic.kind.code(),
            message = %diagnostic.message,
            "recorded diagnostic"
        );
        self.entries.push(diagnostic);
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.entries.extend(other.entries);
    }

    pub fn count(&self, phase: Phase) -> usize {
        self.entries.iter().filter(|d| d.phase == phase).count()
    }

    pub fn count_kind(&self, kind: DiagnosticKind) -> usize {
        self.entries.iter().filter(|d| d.kind == kind).count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_are_derived_per_phase() {
        let mut diags = Diagnostics::new();
        diags.push(Diagnostic::new(
            DiagnosticKind::UndefinedReference,
            "unknown `flag`",
            Span::new(0, 4),
        ));
        diags.push(Diagnostic::new(
            DiagnosticKind::TypeMismatch,
            "expected bool",
            Span::new(5, 6),
        ));
        diags.push(Diagnostic::new(
            DiagnosticKind::DuplicateDeclaration,
            "`x` declared twice",
            Span::new(7, 8),
        ));
        assert_eq!(diags.count(Phase::Syntax), 0);
        assert_eq!(diags.count(Phase::Semantic), 2);
        assert_eq!(diags.count(Phase::Type), 1);
        assert_eq!(diags.count_kind(DiagnosticKind::TypeMismatch), 1);
    }

    #[test]
    fn renders_with_line_and_column() {
        let source = "machine M {\n  bogus\n}";
        let lines = LineIndex::new(source);
        let diag = Diagnostic::new(DiagnosticKind::UndefinedReference, "unknown `bogus`", Span::new(14, 19));
        assert_eq!(
            diag.render("m.cyc", &lines),
            "m.cyc:2:3: semantic error[E0102]: unknown `bogus`"
        );
    }
}
