//! Syntax tree produced by the parser and consumed by generation.
//!
//! The tree is untyped and unresolved: names are plain identifiers and
//! types are written names. Nothing here is validated beyond the grammar.

use crate::span::Span;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

impl Ident {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Ident {
            name: name.into(),
            span,
        }
    }
}

/// Root node: `machine Name { items }`.
#[derive(Debug, Clone, PartialEq)]
pub struct Machine {
    pub name: Ident,
    pub items: Vec<Item>,
    pub span: Span,
}

impl Machine {
    pub fn states(&self) -> impl Iterator<Item = &StateDecl> {
        self.items.iter().filter_map(|item| match item {
            Item::State(state) => Some(state),
            _ => None,
        })
    }

    pub fn transitions(&self) -> impl Iterator<Item = &TransitionDecl> {
        self.items.iter().filter_map(|item| match item {
            Item::Transition(trans) => Some(trans),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Enum(EnumDecl),
    Var(VarDecl),
    State(StateDecl),
    Transition(TransitionDecl),
}

/// `enum Mode { Auto, Manual }`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumDecl {
    pub name: Ident,
    pub variants: Vec<Ident>,
    pub span: Span,
}

/// `var name: type [= init];`
#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    pub name: Ident,
    pub ty: Ident,
    pub init: Option<Expr>,
    pub span: Span,
}

/// `[start] [final] state Name ( ; | { var-decls } )`
#[derive(Debug, Clone, PartialEq)]
pub struct StateDecl {
    pub name: Ident,
    pub is_start: bool,
    pub is_final: bool,
    pub body: Vec<VarDecl>,
    pub span: Span,
}

/// `trans Source -> Target [where guard] [do action, ...];`
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionDecl {
    pub source: Ident,
    pub target: Ident,
    pub guard: Option<Expr>,
    pub actions: Vec<Action>,
    pub span: Span,
}

/// `target = value`
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    pub target: Ident,
    pub value: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Literal(Literal),
    Ident(Ident),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Real(f64),
    Str(String),
    Char(char),
    Bool(bool),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Or => "||",
            BinaryOp::And => "&&",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
        }
    }
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Not => "!",
            UnaryOp::Neg => "-",
        }
    }
}
