//! Resolution context: scoped symbol table plus semantic diagnostics.
//!
//! One context exists per compilation. Generation threads it down by
//! `&mut` reference; nothing here is global, so separate compilations
//! never share state.

use std::collections::HashMap;

use crate::ast::Ident;
use crate::diagnostic::{Diagnostic, DiagnosticKind, Diagnostics, Phase};
use crate::error::GenerationError;
use crate::span::Span;
use crate::types::Type;

/// What a name is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolKind {
    Variable(Type),
    /// Enumeration variant; a value that cannot be assigned.
    Constant(Type),
    TypeName(Type),
    State,
}

impl SymbolKind {
    fn describe(&self) -> &'static str {
        match self {
            SymbolKind::Variable(_) => "variable",
            SymbolKind::Constant(_) => "enumeration variant",
            SymbolKind::TypeName(_) => "type",
            SymbolKind::State => "state",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub span: Span,
}

/// Non-fatal failure of [`ResolutionContext::declare`]. The earlier
/// binding stays in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DuplicateDeclaration {
    pub previous: Span,
}

#[derive(Debug, Default)]
struct Scope {
    symbols: HashMap<String, Symbol>,
}

#[derive(Debug)]
pub struct ResolutionContext {
    scopes: Vec<Scope>,
    diagnostics: Diagnostics,
}

impl Default for ResolutionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl ResolutionContext {
    /// A fresh context with the machine-level root scope open.
    pub fn new() -> Self {
        ResolutionContext {
            scopes: vec![Scope::default()],
            diagnostics: Diagnostics::new(),
        }
    }

    pub fn enter_scope(&mut self) {
        self.scopes.push(Scope::default());
        tracing::trace!(depth = self.scopes.len(), "entered scope");
    }

    /// Close the innermost scope. The root scope cannot be closed.
    pub fn exit_scope(&mut self) -> Result<(), GenerationError> {
        if self.scopes.len() <= 1 {
            return Err(GenerationError::ScopeUnderflow);
        }
        self.scopes.pop();
        tracing::trace!(depth = self.scopes.len(), "exited scope");
        Ok(())
    }

    /// Bind `name` in the innermost scope.
    ///
    /// Only the innermost scope is checked, so shadowing an outer name is
    /// allowed. A duplicate is recorded and counted, and the first
    /// binding is kept.
    pub fn declare(&mut self, name: &Ident, kind: SymbolKind) -> Result<(), DuplicateDeclaration> {
        let previous = self
            .scopes
            .last()
            .and_then(|scope| scope.symbols.get(&name.name))
            .map(|symbol| symbol.span);
        if let Some(previous) = previous {
            self.report(
                DiagnosticKind::DuplicateDeclaration,
                format!("`{}` is already declared in this scope", name.name),
                name.span,
            );
            return Err(DuplicateDeclaration { previous });
        }
        tracing::trace!(name = %name.name, kind = kind.describe(), "declared");
        if let Some(scope) = self.scopes.last_mut() {
            scope.symbols.insert(
                name.name.clone(),
                Symbol {
                    name: name.name.clone(),
                    kind,
                    span: name.span,
                },
            );
        }
        Ok(())
    }

    /// Innermost binding of `name`, without recording anything.
    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.symbols.get(name))
    }

    /// Resolve `name` used as a value.
    ///
    /// On failure an error is recorded and the sentinel [`Type::Error`] is
    /// returned so that downstream checks stay quiet.
    pub fn resolve(&mut self, name: &Ident) -> Type {
        match self.lookup_kind(name) {
            Some(SymbolKind::Variable(ty) | SymbolKind::Constant(ty)) => ty,
            Some(other) => self.invalid_use(name, &other, "a value"),
            None => Type::Error,
        }
    }

    /// Resolve `name` used as the target of an assignment.
    pub fn resolve_assignable(&mut self, name: &Ident) -> Type {
        match self.lookup_kind(name) {
            Some(SymbolKind::Variable(ty)) => ty,
            Some(other) => self.invalid_use(name, &other, "an assignment target"),
            None => Type::Error,
        }
    }

    /// Resolve a written type name: a built-in keyword or an enumeration.
    pub fn resolve_type(&mut self, name: &Ident) -> Type {
        if let Some(builtin) = Type::from_keyword(&name.name) {
            return builtin;
        }
        match self.lookup_kind(name) {
            Some(SymbolKind::TypeName(ty)) => ty,
            Some(other) => self.invalid_use(name, &other, "a type"),
            None => Type::Error,
        }
    }

    /// Resolve `name` used as a transition endpoint. Returns whether it
    /// names a state.
    pub fn resolve_state(&mut self, name: &Ident) -> bool {
        match self.lookup_kind(name) {
            Some(SymbolKind::State) => true,
            Some(other) => {
                self.invalid_use(name, &other, "a transition endpoint");
                false
            }
            None => false,
        }
    }

    /// Record a semantic diagnostic.
    pub fn report(&mut self, kind: DiagnosticKind, message: impl Into<String>, span: Span) {
        debug_assert_eq!(kind.phase(), Phase::Semantic);
        self.diagnostics.push(Diagnostic::new(kind, message, span));
    }

    /// Running total of semantic errors. Never decreases.
    pub fn error_count(&self) -> usize {
        self.diagnostics.count(Phase::Semantic)
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Diagnostics {
        self.diagnostics
    }

    fn lookup_kind(&mut self, name: &Ident) -> Option<SymbolKind> {
        let found = self.lookup(&name.name).map(|symbol| symbol.kind.clone());
        if found.is_none() {
            self.report(
                DiagnosticKind::UndefinedReference,
                format!("`{}` is not declared", name.name),
                name.span,
            );
        }
        found
    }

    fn invalid_use(&mut self, name: &Ident, found: &SymbolKind, expected: &str) -> Type {
        self.report(
            DiagnosticKind::InvalidScopeUse,
            format!(
                "`{}` is a {} and cannot be used as {}",
                name.name,
                found.describe(),
                expected
            ),
            name.span,
        );
        Type::Error
    }
}
