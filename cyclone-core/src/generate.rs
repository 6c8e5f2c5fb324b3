//! Generation of the machine model from the syntax tree.
//!
//! Generation runs in three passes over the machine body:
//!
//!   1. enumeration types and states are declared in the machine scope
//!   2. machine-level variables, in textual order
//!   3. state bodies and transitions, in textual order
//!
//! so a transition may name any state of the machine wherever it is
//! written, while a variable initializer sees only earlier variables.
//!
//! Semantic problems go to the [`ResolutionContext`], type problems to the
//! model. Only a malformed tree aborts generation.

use crate::ast::{self, Ident, Item};
use crate::context::{ResolutionContext, SymbolKind};
use crate::diagnostic::DiagnosticKind;
use crate::error::GenerationError;
use crate::model::{
    Assignment, DeclScope, Declaration, EnumType, Machine, State, StateRef, Transition,
};
use crate::typecheck::ExprChecker;
use crate::types::Type;

/// Generate a machine model from `tree`, threading `ctx`.
///
/// The model is returned whenever the tree is well formed, however many
/// semantic or type errors were recorded.
pub fn generate(
    tree: &ast::Machine,
    ctx: &mut ResolutionContext,
    widen_int_to_real: bool,
) -> Result<Machine, GenerationError> {
    check_ident(&tree.name)?;
    let mut generator = Generator {
        ctx,
        machine: Machine::new(tree.name.name.clone()),
        widen_int_to_real,
    };
    generator.declare_types_and_states(tree)?;
    generator.declare_machine_vars(tree)?;
    generator.build_states_and_transitions(tree)?;

    let machine = generator.machine;
    tracing::debug!(
        machine = %machine.name,
        start = machine.start_state().map(|s| s.name.as_str()),
        states = machine.states.len(),
        transitions = machine.transitions.len(),
        semantic_errors = generator.ctx.error_count(),
        type_errors = machine.errors(),
        "generated machine model"
    );
    Ok(machine)
}

struct Generator<'a> {
    ctx: &'a mut ResolutionContext,
    machine: Machine,
    widen_int_to_real: bool,
}

impl Generator<'_> {
    fn declare_types_and_states(&mut self, tree: &ast::Machine) -> Result<(), GenerationError> {
        let mut start: Option<&Ident> = None;
        for item in &tree.items {
            match item {
                Item::Enum(decl) => self.gen_enum(decl)?,
                Item::State(decl) => {
                    check_ident(&decl.name)?;
                    let _ = self.ctx.declare(&decl.name, SymbolKind::State);
                    if decl.is_start {
                        match start {
                            Some(first) => self.ctx.report(
                                DiagnosticKind::DuplicateDeclaration,
                                format!(
                                    "machine already has start state `{}`; `{}` cannot also be one",
                                    first.name, decl.name.name
                                ),
                                decl.name.span,
                            ),
                            None => start = Some(&decl.name),
                        }
                    }
                    self.machine.states.push(State {
                        name: decl.name.name.clone(),
                        is_start: decl.is_start,
                        is_final: decl.is_final,
                        locals: Vec::new(),
                        span: decl.span,
                    });
                }
                Item::Var(_) | Item::Transition(_) => {}
            }
        }
        Ok(())
    }

    fn gen_enum(&mut self, decl: &ast::EnumDecl) -> Result<(), GenerationError> {
        check_ident(&decl.name)?;
        let builtin = Type::from_keyword(&decl.name.name).is_some();
        if builtin {
            self.ctx.report(
                DiagnosticKind::DuplicateDeclaration,
                format!(
                    "`{}` is a built-in type and cannot name an enumeration",
                    decl.name.name
                ),
                decl.name.span,
            );
        }
        // Variants of a rejected enum stay quiet wherever they are used.
        let ty = if builtin {
            Type::Error
        } else {
            Type::Enum(decl.name.name.clone())
        };
        let fresh = !builtin
            && self
                .ctx
                .declare(&decl.name, SymbolKind::TypeName(ty.clone()))
                .is_ok();
        let mut variants = Vec::with_capacity(decl.variants.len());
        for variant in &decl.variants {
            check_ident(variant)?;
            if self
                .ctx
                .declare(variant, SymbolKind::Constant(ty.clone()))
                .is_ok()
            {
                variants.push(variant.name.clone());
            }
        }
        if fresh {
            self.machine.enums.push(EnumType {
                name: decl.name.name.clone(),
                variants,
            });
        }
        Ok(())
    }

    fn declare_machine_vars(&mut self, tree: &ast::Machine) -> Result<(), GenerationError> {
        for item in &tree.items {
            if let Item::Var(decl) = item {
                let decl = self.gen_var(decl, DeclScope::Machine)?;
                self.machine.declarations.push(decl);
            }
        }
        Ok(())
    }

    fn build_states_and_transitions(&mut self, tree: &ast::Machine) -> Result<(), GenerationError> {
        let mut state_index = 0;
        for item in &tree.items {
            match item {
                Item::State(decl) => {
                    let locals = self.gen_state_body(decl)?;
                    if let Some(state) = self.machine.states.get_mut(state_index) {
                        state.locals = locals;
                    }
                    state_index += 1;
                }
                Item::Transition(decl) => {
                    let transition = self.gen_transition(decl)?;
                    self.machine.transitions.push(transition);
                }
                Item::Enum(_) | Item::Var(_) => {}
            }
        }
        Ok(())
    }

    fn gen_state_body(&mut self, decl: &ast::StateDecl) -> Result<Vec<Declaration>, GenerationError> {
        if decl.body.is_empty() {
            return Ok(Vec::new());
        }
        self.ctx.enter_scope();
        let mut locals = Vec::with_capacity(decl.body.len());
        for var in &decl.body {
            locals.push(self.gen_var(var, DeclScope::State(decl.name.name.clone()))?);
        }
        self.ctx.exit_scope()?;
        Ok(locals)
    }

    fn gen_var(&mut self, decl: &ast::VarDecl, scope: DeclScope) -> Result<Declaration, GenerationError> {
        check_ident(&decl.name)?;
        check_ident(&decl.ty)?;
        let ty = self.ctx.resolve_type(&decl.ty);
        let init = match &decl.init {
            Some(init) => Some(self.checker().check_slot(&ty, init, "initializer")?),
            None => None,
        };
        // Declared after the initializer so `var x: int = x` does not see itself.
        let _ = self.ctx.declare(&decl.name, SymbolKind::Variable(ty.clone()));
        Ok(Declaration {
            name: decl.name.name.clone(),
            ty,
            init,
            scope,
            span: decl.span,
        })
    }

    fn gen_transition(&mut self, decl: &ast::TransitionDecl) -> Result<Transition, GenerationError> {
        let source = self.state_ref(&decl.source)?;
        let target = self.state_ref(&decl.target)?;
        let guard = match &decl.guard {
            Some(guard) => Some(self.checker().check_slot(&Type::Bool, guard, "guard")?),
            None => None,
        };
        let mut actions = Vec::with_capacity(decl.actions.len());
        for action in &decl.actions {
            check_ident(&action.target)?;
            let ty = self.ctx.resolve_assignable(&action.target);
            let value = self.checker().check_slot(
                &ty,
                &action.value,
                &format!("value assigned to `{}`", action.target.name),
            )?;
            actions.push(Assignment {
                target: action.target.name.clone(),
                ty,
                value,
            });
        }
        Ok(Transition {
            source,
            target,
            guard,
            actions,
            span: decl.span,
        })
    }

    fn state_ref(&mut self, name: &Ident) -> Result<StateRef, GenerationError> {
        check_ident(name)?;
        let id = if self.ctx.resolve_state(name) {
            self.machine.state_id(&name.name)
        } else {
            None
        };
        Ok(StateRef {
            name: name.name.clone(),
            id,
        })
    }

    fn checker(&mut self) -> ExprChecker<'_> {
        ExprChecker::new(
            &mut *self.ctx,
            self.machine.type_errors_mut(),
            self.widen_int_to_real,
        )
    }
}

fn check_ident(ident: &Ident) -> Result<(), GenerationError> {
    if ident.name.is_empty() {
        return Err(GenerationError::EmptyIdentifier(ident.span.start));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::Phase;
    use crate::parser::parse;
    use crate::span::Span;

    fn run(source: &str) -> (Machine, ResolutionContext) {
        let tree = parse(source, "test.cyc").expect("parse").machine;
        let mut ctx = ResolutionContext::new();
        let machine = generate(&tree, &mut ctx, false).expect("generate");
        (machine, ctx)
    }

    #[test]
    fn transitions_may_reference_later_states() {
        let (machine, ctx) = run(
            "machine M {
                trans A -> B;
                start state A;
                state B;
            }",
        );
        assert_eq!(ctx.error_count(), 0);
        let trans = &machine.transitions[0];
        assert_eq!(trans.source.id, machine.state_id("A"));
        assert_eq!(trans.target.id, machine.state_id("B"));
        assert!(trans.target.id.is_some());
    }

    #[test]
    fn unknown_state_keeps_transition_in_model() {
        let (machine, ctx) = run("machine M { state A; trans A -> Nowhere; }");
        assert_eq!(ctx.error_count(), 1);
        assert_eq!(machine.transitions.len(), 1);
        assert_eq!(machine.transitions[0].target.id, None);
        assert_eq!(machine.transitions[0].target.name, "Nowhere");
    }

    #[test]
    fn state_locals_are_scoped_to_the_state() {
        let (machine, ctx) = run(
            "machine M {
                var level: int = 1;
                state A { var level: real = 2.5; var tick: int; }
                state B;
                trans A -> B where tick > 0;
            }",
        );
        // `tick` is only visible inside A.
        assert_eq!(ctx.error_count(), 1);
        assert_eq!(machine.errors(), 0);
        let a = &machine.states[0];
        assert_eq!(a.locals.len(), 2);
        assert_eq!(a.locals[0].ty, Type::Real);
        assert_eq!(a.locals[0].scope, DeclScope::State("A".into()));
    }

    #[test]
    fn enum_variants_type_check_against_their_enum() {
        let (machine, ctx) = run(
            "machine M {
                enum Mode { Auto, Manual }
                enum Light { Red, Green }
                var mode: Mode = Auto;
                state A;
                trans A -> A where mode == Manual do mode = Red;
            }",
        );
        assert_eq!(ctx.error_count(), 0);
        assert_eq!(machine.errors(), 1);
        assert_eq!(machine.enums.len(), 2);
        assert_eq!(machine.declarations[0].ty, Type::Enum("Mode".into()));
    }

    #[test]
    fn enum_named_after_builtin_type_is_rejected() {
        let (machine, ctx) = run(
            "machine M {
                enum bool { Yes, No }
                var flag: bool = Yes;
                state A;
                trans A -> A where flag do flag = No;
            }",
        );
        assert_eq!(
            ctx.diagnostics().count_kind(DiagnosticKind::DuplicateDeclaration),
            1
        );
        assert_eq!(ctx.error_count(), 1);
        assert_eq!(machine.errors(), 0);
        assert!(machine.enums.is_empty());
        assert_eq!(machine.declarations[0].ty, Type::Bool);
    }

    #[test]
    fn variables_cannot_be_transition_endpoints() {
        let (_, ctx) = run("machine M { var ready: bool; state A; trans ready -> A; }");
        assert_eq!(
            ctx.diagnostics().count_kind(DiagnosticKind::InvalidScopeUse),
            1
        );
    }

    #[test]
    fn constants_and_states_are_not_assignable() {
        let (_, ctx) = run(
            "machine M {
                enum Mode { Auto }
                state A;
                trans A -> A do Auto = Auto, A = 1;
            }",
        );
        assert_eq!(
            ctx.diagnostics().count_kind(DiagnosticKind::InvalidScopeUse),
            2
        );
    }

    #[test]
    fn second_start_state_is_a_semantic_error() {
        let (machine, ctx) = run("machine M { start state A; start state B; }");
        assert_eq!(ctx.error_count(), 1);
        assert_eq!(machine.states.len(), 2);
    }

    #[test]
    fn initializer_mismatch_uses_declared_type() {
        let (machine, ctx) = run("machine M { var speed: real = 3; }");
        assert_eq!(ctx.error_count(), 0);
        assert_eq!(machine.errors(), 1);
        let init = machine.declarations[0].init.as_ref().expect("init");
        assert_eq!(init.ty, Type::Real);
        assert_eq!(machine.type_errors().count(Phase::Type), 1);
    }

    #[test]
    fn unknown_type_name_is_reported_once() {
        let (machine, ctx) = run("machine M { var x: Color = 1; }");
        assert_eq!(ctx.error_count(), 1);
        assert_eq!(machine.errors(), 0);
        assert_eq!(machine.declarations[0].ty, Type::Error);
    }

    #[test]
    fn malformed_tree_is_a_generation_failure() {
        let tree = ast::Machine {
            name: Ident::new("M", Span::new(8, 9)),
            items: vec![Item::State(ast::StateDecl {
                name: Ident::new("", Span::new(20, 20)),
                is_start: false,
                is_final: false,
                body: Vec::new(),
                span: Span::new(14, 21),
            })],
            span: Span::new(0, 22),
        };
        let mut ctx = ResolutionContext::new();
        let err = generate(&tree, &mut ctx, false).unwrap_err();
        assert_eq!(err, GenerationError::EmptyIdentifier(20));
    }
}
