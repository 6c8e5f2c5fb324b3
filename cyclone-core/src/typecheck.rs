//! Expression typing and slot checks.
//!
//! Identifiers are resolved through the [`ResolutionContext`]; type
//! mismatches are recorded on the machine model. Neither kind of problem
//! stops checking. An operand of type [`Type::Error`] never produces a
//! report, so an undefined name is diagnosed once, by the context.

use crate::ast::{self, BinaryOp, ExprKind, UnaryOp};
use crate::context::ResolutionContext;
use crate::diagnostic::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::error::GenerationError;
use crate::model::{TypedExpr, TypedExprKind};
use crate::span::Span;
use crate::types::{Type, accepts};

pub struct ExprChecker<'a> {
    ctx: &'a mut ResolutionContext,
    type_errors: &'a mut Diagnostics,
    widen_int_to_real: bool,
}

impl<'a> ExprChecker<'a> {
    pub fn new(
        ctx: &'a mut ResolutionContext,
        type_errors: &'a mut Diagnostics,
        widen_int_to_real: bool,
    ) -> Self {
        ExprChecker {
            ctx,
            type_errors,
            widen_int_to_real,
        }
    }

    /// Type `expr` and check it against the slot type `expected`.
    ///
    /// On mismatch one error is recorded and the result carries
    /// `expected`, so that whatever depends on the slot sees a usable type.
    pub fn check_slot(
        &mut self,
        expected: &Type,
        expr: &ast::Expr,
        slot: &str,
    ) -> Result<TypedExpr, GenerationError> {
        let mut typed = self.check_expr(expr)?;
        if !self.fits(expected, &typed.ty) {
            self.mismatch(
                format!("{slot} must be {expected}, found {}", typed.ty),
                typed.span,
            );
            typed.ty = expected.clone();
        }
        Ok(typed)
    }

    pub fn check_expr(&mut self, expr: &ast::Expr) -> Result<TypedExpr, GenerationError> {
        let (kind, ty) = match &expr.kind {
            ExprKind::Literal(lit) => literal(lit),
            ExprKind::Ident(ident) => {
                if ident.name.is_empty() {
                    return Err(GenerationError::EmptyIdentifier(ident.span.start));
                }
                let ty = self.ctx.resolve(ident);
                (TypedExprKind::Var(ident.name.clone()), ty)
            }
            ExprKind::Unary { op, operand } => {
                let operand = self.check_expr(operand)?;
                let ty = self.unary_type(*op, &operand);
                (
                    TypedExprKind::Unary {
                        op: *op,
                        operand: Box::new(operand),
                    },
                    ty,
                )
            }
            ExprKind::Binary { op, lhs, rhs } => {
                let lhs = self.check_expr(lhs)?;
                let rhs = self.check_expr(rhs)?;
                let ty = self.binary_type(*op, &lhs, &rhs);
                (
                    TypedExprKind::Binary {
                        op: *op,
                        lhs: Box::new(lhs),
                        rhs: Box::new(rhs),
                    },
                    ty,
                )
            }
        };
        Ok(TypedExpr {
            kind,
            ty,
            span: expr.span,
        })
    }

    fn unary_type(&mut self, op: UnaryOp, operand: &TypedExpr) -> Type {
        if operand.ty.is_error() {
            return match op {
                UnaryOp::Not => Type::Bool,
                UnaryOp::Neg => Type::Error,
            };
        }
        match op {
            UnaryOp::Not => {
                if !operand.ty.is_bool_type() {
                    self.operand_mismatch(op.symbol(), "bool", operand);
                }
                Type::Bool
            }
            UnaryOp::Neg => {
                if operand.ty.is_numeric() {
                    operand.ty.clone()
                } else {
                    self.operand_mismatch(op.symbol(), "int or real", operand);
                    Type::Error
                }
            }
        }
    }

    fn binary_type(&mut self, op: BinaryOp, lhs: &TypedExpr, rhs: &TypedExpr) -> Type {
        match op {
            BinaryOp::And | BinaryOp::Or => {
                for operand in [lhs, rhs] {
                    if !operand.ty.is_error() && !operand.ty.is_bool_type() {
                        self.operand_mismatch(op.symbol(), "bool", operand);
                    }
                }
                Type::Bool
            }
            BinaryOp::Eq | BinaryOp::Ne => {
                if !lhs.ty.is_error() && !rhs.ty.is_error() && self.unify(&lhs.ty, &rhs.ty).is_none() {
                    self.mismatch(
                        format!(
                            "cannot compare {} with {} using `{}`",
                            lhs.ty,
                            rhs.ty,
                            op.symbol()
                        ),
                        rhs.span,
                    );
                }
                Type::Bool
            }
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
                self.same_category(op, lhs, rhs, Type::is_ordered, "int, real or char");
                Type::Bool
            }
            BinaryOp::Add => {
                if lhs.ty.is_string_type() {
                    self.same_category(op, lhs, rhs, Type::is_string_type, "string")
                } else {
                    self.same_category(op, lhs, rhs, Type::is_numeric, "int, real or string")
                }
            }
            BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => {
                self.same_category(op, lhs, rhs, Type::is_numeric, "int or real")
            }
        }
    }

    /// Both operands must satisfy `allowed` and agree on a type. Returns
    /// the agreed type, the left type when only the right operand is
    /// wrong, or the error type.
    fn same_category(
        &mut self,
        op: BinaryOp,
        lhs: &TypedExpr,
        rhs: &TypedExpr,
        allowed: fn(&Type) -> bool,
        wanted: &str,
    ) -> Type {
        if lhs.ty.is_error() || rhs.ty.is_error() {
            return Type::Error;
        }
        if !allowed(&lhs.ty) {
            self.operand_mismatch(op.symbol(), wanted, lhs);
            return Type::Error;
        }
        match self.unify(&lhs.ty, &rhs.ty) {
            Some(ty) => ty,
            None => {
                self.mismatch(
                    format!(
                        "right operand of `{}` must be {}, found {}",
                        op.symbol(),
                        lhs.ty,
                        rhs.ty
                    ),
                    rhs.span,
                );
                lhs.ty.clone()
            }
        }
    }

    /// Common type of two operands, honoring int-to-real widening when
    /// enabled.
    fn unify(&self, left: &Type, right: &Type) -> Option<Type> {
        if accepts(left, right, self.widen_int_to_real) {
            Some(left.clone())
        } else if accepts(right, left, self.widen_int_to_real) {
            Some(right.clone())
        } else {
            None
        }
    }

    fn fits(&self, expected: &Type, actual: &Type) -> bool {
        expected.is_error() || actual.is_error() || accepts(expected, actual, self.widen_int_to_real)
    }

    fn operand_mismatch(&mut self, symbol: &str, wanted: &str, operand: &TypedExpr) {
        self.mismatch(
            format!("operand of `{symbol}` must be {wanted}, found {}", operand.ty),
            operand.span,
        );
    }

    fn mismatch(&mut self, message: String, span: Span) {
        self.type_errors
            .push(Diagnostic::new(DiagnosticKind::TypeMismatch, message, span));
    }
}

fn literal(lit: &ast::Literal) -> (TypedExprKind, Type) {
    use ast::Literal as L;

    match lit {
        L::Int(value) => (TypedExprKind::Int(*value), Type::Int),
        L::Real(value) => (TypedExprKind::Real(*value), Type::Real),
        L::Str(value) => (TypedExprKind::Str(value.clone()), Type::Str),
        L::Char(value) => (TypedExprKind::Char(*value), Type::Char),
        L::Bool(value) => (TypedExprKind::Bool(*value), Type::Bool),
    }
}
