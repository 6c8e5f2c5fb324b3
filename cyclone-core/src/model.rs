//! Machine model: the typed output of generation.
//!
//! Every expression in the model carries the type it was checked
//! against. The model also owns the type diagnostics observed while it
//! was built; its type-error count is exactly the number of failed
//! compatibility checks.

use std::fmt;

use crate::ast::{BinaryOp, UnaryOp};
use crate::diagnostic::{Diagnostics, Phase};
use crate::span::Span;
use crate::types::Type;

/// Expression node with its resolved type.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedExpr {
    pub kind: TypedExprKind,
    pub ty: Type,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypedExprKind {
    Int(i64),
    Real(f64),
    Str(String),
    Char(char),
    Bool(bool),
    Var(String),
    Unary {
        op: UnaryOp,
        operand: Box<TypedExpr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<TypedExpr>,
        rhs: Box<TypedExpr>,
    },
}

/// Where a variable was declared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeclScope {
    Machine,
    State(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub name: String,
    pub ty: Type,
    pub init: Option<TypedExpr>,
    pub scope: DeclScope,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumType {
    pub name: String,
    pub variants: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct State {
    pub name: String,
    pub is_start: bool,
    pub is_final: bool,
    pub locals: Vec<Declaration>,
    pub span: Span,
}

/// Index into [`Machine::states`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StateId(pub usize);

/// A transition endpoint. `id` is `None` when the name did not resolve
/// to a state; the written name is kept so the model stays complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateRef {
    pub name: String,
    pub id: Option<StateId>,
}

/// `target = value`, with `ty` the declared type of `target`.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub target: String,
    pub ty: Type,
    pub value: TypedExpr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub source: StateRef,
    pub target: StateRef,
    pub guard: Option<TypedExpr>,
    pub actions: Vec<Assignment>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Machine {
    pub name: String,
    pub enums: Vec<EnumType>,
    pub declarations: Vec<Declaration>,
    pub states: Vec<State>,
    pub transitions: Vec<Transition>,
    type_errors: Diagnostics,
}

impl Machine {
    pub fn new(name: impl Into<String>) -> Self {
        Machine {
            name: name.into(),
            enums: Vec::new(),
            declarations: Vec::new(),
            states: Vec::new(),
            transitions: Vec::new(),
            type_errors: Diagnostics::new(),
        }
    }

    /// First state with the given name.
    pub fn state_id(&self, name: &str) -> Option<StateId> {
        self.states.iter().position(|s| s.name == name).map(StateId)
    }

    pub fn start_state(&self) -> Option<&State> {
        self.states.iter().find(|s| s.is_start)
    }

    /// Number of type errors observed while generating this machine.
    pub fn errors(&self) -> usize {
        self.type_errors.count(Phase::Type)
    }

    pub fn type_errors(&self) -> &Diagnostics {
        &self.type_errors
    }

    pub(crate) fn type_errors_mut(&mut self) -> &mut Diagnostics {
        &mut self.type_errors
    }
}

impl fmt::Display for TypedExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            TypedExprKind::Int(value) => write!(f, "{value}"),
            TypedExprKind::Real(value) => write!(f, "{value:?}"),
            TypedExprKind::Str(value) => write!(f, "{value:?}"),
            TypedExprKind::Char(value) => write!(f, "{value:?}"),
            TypedExprKind::Bool(value) => write!(f, "{value}"),
            TypedExprKind::Var(name) => f.write_str(name),
            TypedExprKind::Unary { op, operand } => write!(f, "{}{}", op.symbol(), operand),
            TypedExprKind::Binary { op, lhs, rhs } => {
                write!(f, "({} {} {})", lhs, op.symbol(), rhs)
            }
        }
    }
}

impl fmt::Display for Declaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "var {}: {}", self.name, self.ty)?;
        if let Some(init) = &self.init {
            write!(f, " = {init}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Machine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "machine {} {{", self.name)?;
        for e in &self.enums {
            writeln!(f, "  enum {} {{ {} }}", e.name, e.variants.join(", "))?;
        }
        for decl in &self.declarations {
            writeln!(f, "  {decl}")?;
        }
        for state in &self.states {
            f.write_str("  ")?;
            if state.is_start {
                f.write_str("start ")?;
            }
            if state.is_final {
                f.write_str("final ")?;
            }
            write!(f, "state {}", state.name)?;
            if state.locals.is_empty() {
                writeln!(f)?;
            } else {
                writeln!(f, " {{")?;
                for local in &state.locals {
                    writeln!(f, "    {local}")?;
                }
                writeln!(f, "  }}")?;
            }
        }
        for trans in &self.transitions {
            write!(f, "  trans {} -> {}", trans.source.name, trans.target.name)?;
            if let Some(guard) = &trans.guard {
                write!(f, " where {guard}")?;
            }
            for (idx, action) in trans.actions.iter().enumerate() {
                let lead = if idx == 0 { " do" } else { "," };
                write!(f, "{} {} = {}", lead, action.target, action.value)?;
            }
            writeln!(f)?;
        }
        write!(f, "}}")
    }
}
