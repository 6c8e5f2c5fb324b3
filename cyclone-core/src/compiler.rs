//! Pipeline driver: parse, generate, tally, verdict.
//!
//! Only a recognition failure or a structural generation failure stops
//! the pipeline early. Everything else runs to completion so one pass
//! reports as many errors as possible.

use std::io::Read;

use crate::context::ResolutionContext;
use crate::diagnostic::{Diagnostics, Phase};
use crate::error::CoreError;
use crate::generate::generate;
use crate::model::Machine;
use crate::parser::parse;
use crate::span::LineIndex;

pub const COMPILE_SUCCESS: i32 = 0;
pub const COMPILE_ERROR: i32 = 1;
pub const UNEXPECTED_ERROR: i32 = 2;

/// Knobs for a single compilation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileOptions {
    /// Accept an `int` value wherever a `real` is expected.
    pub widen_int_to_real: bool,
}

/// Driver states, in the order they are visited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Init,
    Parsed,
    Generated,
    Verified,
    Succeeded,
    Failed,
}

/// Terminal result of a compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Outcome {
    Success,
    CompileError,
    UnexpectedError,
}

impl Outcome {
    pub fn exit_code(self) -> i32 {
        match self {
            Outcome::Success => COMPILE_SUCCESS,
            Outcome::CompileError => COMPILE_ERROR,
            Outcome::UnexpectedError => UNEXPECTED_ERROR,
        }
    }

    /// Outcome of a failed compilation.
    pub fn of_error(err: &CoreError) -> Outcome {
        if err.is_recognition() {
            Outcome::CompileError
        } else {
            Outcome::UnexpectedError
        }
    }
}

/// Everything a finished compilation produced.
#[derive(Debug)]
pub struct Compilation {
    pub source_name: String,
    pub machine: Machine,
    pub diagnostics: Diagnostics,
    pub stage: Stage,
    lines: LineIndex,
}

impl Compilation {
    pub fn syntax_errors(&self) -> usize {
        self.diagnostics.count(Phase::Syntax)
    }

    pub fn semantic_errors(&self) -> usize {
        self.diagnostics.count(Phase::Semantic)
    }

    pub fn type_errors(&self) -> usize {
        self.diagnostics.count(Phase::Type)
    }

    pub fn outcome(&self) -> Outcome {
        match self.stage {
            Stage::Succeeded => Outcome::Success,
            _ => Outcome::CompileError,
        }
    }

    /// Positioned diagnostic lines, syntax first, then semantic, then type.
    pub fn rendered_diagnostics(&self) -> Vec<String> {
        self.diagnostics
            .iter()
            .map(|diag| diag.render(&self.source_name, &self.lines))
            .collect()
    }

    /// One line per phase, zero counts included, then the verdict.
    pub fn summary(&self) -> Vec<String> {
        let mut lines: Vec<String> = Phase::ALL
            .iter()
            .map(|phase| phase_summary(*phase, self.diagnostics.count(*phase)))
            .collect();
        lines.push(verdict(self.outcome()).to_string());
        lines
    }
}

pub fn phase_summary(phase: Phase, count: usize) -> String {
    if count == 0 {
        let name = match phase {
            Phase::Syntax => "Syntax",
            Phase::Semantic => "Semantic",
            Phase::Type => "Type",
        };
        format!("{name} checking done.")
    } else {
        format!("{count} {} error(s).", phase.as_str())
    }
}

pub fn verdict(outcome: Outcome) -> &'static str {
    match outcome {
        Outcome::Success => "Compile is successful.",
        _ => "Compile is failed.",
    }
}

/// Compile one source text.
///
/// `Ok` means the pipeline ran to the verdict; inspect
/// [`Compilation::outcome`]. `Err` is a recognition failure or an
/// internal failure.
pub fn compile(
    source: &str,
    source_name: &str,
    options: &CompileOptions,
) -> Result<Compilation, CoreError> {
    let mut stage = Stage::Init;
    tracing::debug!(source = source_name, ?stage, "launching compiler");

    let parsed = match parse(source, source_name) {
        Ok(parsed) => parsed,
        Err(failure) => {
            tracing::debug!(source = source_name, stage = ?Stage::Failed, "recognition failed");
            return Err(failure.into());
        }
    };
    stage = advance(source_name, stage, Stage::Parsed);

    let mut ctx = ResolutionContext::new();
    let machine = generate(&parsed.machine, &mut ctx, options.widen_int_to_real)?;
    stage = advance(source_name, stage, Stage::Generated);

    let mut diagnostics = parsed.diagnostics;
    diagnostics.extend(ctx.into_diagnostics());
    diagnostics.extend(machine.type_errors().clone());
    stage = advance(source_name, stage, Stage::Verified);

    let clean = Phase::ALL
        .iter()
        .all(|phase| diagnostics.count(*phase) == 0);
    let next = if clean { Stage::Succeeded } else { Stage::Failed };
    stage = advance(source_name, stage, next);

    Ok(Compilation {
        source_name: source_name.to_string(),
        machine,
        diagnostics,
        stage,
        lines: LineIndex::new(source),
    })
}

/// Read `input` to the end and compile it.
pub fn compile_reader(
    mut input: impl Read,
    source_name: &str,
    options: &CompileOptions,
) -> Result<Compilation, CoreError> {
    let mut source = String::new();
    input.read_to_string(&mut source)?;
    compile(&source, source_name, options)
}

fn advance(source_name: &str, from: Stage, to: Stage) -> Stage {
    tracing::debug!(source = source_name, ?from, ?to, "stage transition");
    to
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GenerationError;
    use crate::types::Type;

    fn compile_ok(source: &str) -> Compilation {
        compile(source, "test.cyc", &CompileOptions::default()).expect("pipeline should finish")
    }

    fn counters(c: &Compilation) -> (usize, usize, usize) {
        (c.syntax_errors(), c.semantic_errors(), c.type_errors())
    }

    #[test]
    fn scenario_a_clean_machine_succeeds() {
        let c = compile_ok(
            "machine M {
                var ready: bool;
                state Idle;
                state Running;
                trans Idle -> Running where ready;
            }",
        );
        assert_eq!(counters(&c), (0, 0, 0));
        assert_eq!(c.outcome(), Outcome::Success);
        assert_eq!(c.outcome().exit_code(), COMPILE_SUCCESS);
        assert_eq!(c.stage, Stage::Succeeded);
    }

    #[test]
    fn scenario_b_undeclared_guard_variable() {
        let c = compile_ok(
            "machine M {
                var ready: bool;
                state Idle;
                state Running;
                trans Idle -> Running where flag;
            }",
        );
        assert_eq!(counters(&c), (0, 1, 0));
        assert_eq!(c.outcome(), Outcome::CompileError);
        assert_eq!(c.machine.transitions.len(), 1);
    }

    #[test]
    fn scenario_c_duplicate_keeps_first_type() {
        let c = compile_ok(
            "machine M {
                var count: int;
                var count: bool;
                state A;
                trans A -> A do count = count + 1;
            }",
        );
        assert_eq!(counters(&c), (0, 1, 0));
        let action = &c.machine.transitions[0].actions[0];
        assert_eq!(action.ty, Type::Int);
        assert_eq!(action.value.ty, Type::Int);
    }

    #[test]
    fn scenario_d_integer_guard() {
        let c = compile_ok(
            "machine M {
                state Idle;
                state Running;
                trans Idle -> Running where 1;
            }",
        );
        assert_eq!(counters(&c), (0, 0, 1));
        assert_eq!(c.outcome(), Outcome::CompileError);
        assert_eq!(c.machine.states.len(), 2);
        assert_eq!(c.machine.transitions.len(), 1);
    }

    #[test]
    fn lexical_errors_count_as_syntax_errors_without_short_circuit() {
        let c = compile_ok("machine M { state A; @ trans A -> A where 1; }");
        assert_eq!(counters(&c), (1, 0, 1));
        assert_eq!(c.outcome(), Outcome::CompileError);
    }

    #[test]
    fn recognition_failure_short_circuits() {
        let err = compile("machine { }", "bad.cyc", &CompileOptions::default()).unwrap_err();
        assert!(err.is_recognition());
        assert_eq!(Outcome::of_error(&err), Outcome::CompileError);
        assert!(err.to_string().starts_with("bad.cyc:1:9:"));
    }

    #[test]
    fn deeply_nested_guard_is_a_compile_error() {
        let source = format!(
            "machine M {{ var ready: bool; state A; trans A -> A where {}ready; }}",
            "!".repeat(200_000)
        );
        let err = compile(&source, "deep.cyc", &CompileOptions::default()).unwrap_err();
        assert!(err.is_recognition());
        assert_eq!(Outcome::of_error(&err), Outcome::CompileError);
        assert!(err.to_string().contains("nested too deeply"));
    }

    #[test]
    fn builtin_type_names_cannot_name_an_enum() {
        let c = compile_ok("machine M { enum int { A } var v: int = A; state S; }");
        assert_eq!(counters(&c), (0, 1, 0));
        assert!(c.rendered_diagnostics()[0].contains("`int` is a built-in type"));
        assert!(c.machine.enums.is_empty());
        assert_eq!(c.machine.declarations[0].ty, Type::Int);
    }

    #[test]
    fn internal_failures_are_unexpected() {
        let err = CoreError::from(GenerationError::ScopeUnderflow);
        assert_eq!(Outcome::of_error(&err), Outcome::UnexpectedError);
        assert_eq!(Outcome::of_error(&err).exit_code(), UNEXPECTED_ERROR);
    }

    #[test]
    fn summary_reports_every_phase() {
        let c = compile_ok("machine M { state A; trans A -> B where 2; }");
        assert_eq!(
            c.summary(),
            vec![
                "Syntax checking done.",
                "1 semantic error(s).",
                "1 type error(s).",
                "Compile is failed.",
            ]
        );
    }

    #[test]
    fn diagnostics_render_in_phase_order() {
        let c = compile_ok("machine M {\n  state A;\n  trans A -> A where 1 && ghost;\n}");
        assert_eq!(
            c.rendered_diagnostics(),
            vec![
                "test.cyc:3:27: semantic error[E0102]: `ghost` is not declared",
                "test.cyc:3:22: type error[E0201]: operand of `&&` must be bool, found int",
            ]
        );
    }

    #[test]
    fn widening_option_accepts_int_for_real() {
        let source = "machine M { var speed: real = 1; }";
        let strict = compile_ok(source);
        assert_eq!(strict.type_errors(), 1);
        let options = CompileOptions {
            widen_int_to_real: true,
        };
        let widened = compile(source, "test.cyc", &options).expect("pipeline should finish");
        assert_eq!(widened.type_errors(), 0);
        assert_eq!(widened.outcome(), Outcome::Success);
    }

    #[test]
    fn reader_io_failure_is_unexpected() {
        struct Broken;
        impl Read for Broken {
            fn read(&mut self, _: &mut [u8]) -> std::io::Result<usize> {
                Err(std::io::Error::other("device gone"))
            }
        }
        let err = compile_reader(Broken, "<stdin>", &CompileOptions::default()).unwrap_err();
        assert!(matches!(err, CoreError::SourceIo(_)));
        assert_eq!(Outcome::of_error(&err), Outcome::UnexpectedError);
    }

    #[test]
    fn outcomes_order_by_severity() {
        assert!(Outcome::Success < Outcome::CompileError);
        assert!(Outcome::CompileError < Outcome::UnexpectedError);
        assert_eq!(
            Outcome::Success.max(Outcome::UnexpectedError),
            Outcome::UnexpectedError
        );
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn machine_source(states: &[String], guards: &[u8]) -> String {
            let mut source = String::from("machine P {\n    var ready: bool;\n    var count: int;\n");
            for state in states {
                source.push_str(&format!("    state {state};\n"));
            }
            for (idx, guard) in guards.iter().enumerate() {
                let from = &states[idx % states.len()];
                let to = &states[(idx + 1) % states.len()];
                let guard = match guard % 4 {
                    0 => "ready",
                    1 => "count > 2",
                    2 => "flag",
                    _ => "count",
                };
                source.push_str(&format!("    trans {from} -> {to} where {guard};\n"));
            }
            source.push('}');
            source
        }

        proptest! {
            #[test]
            fn compiling_twice_gives_identical_results(
                states in prop::collection::vec("[A-Z][a-z]{0,6}", 1..6),
                guards in prop::collection::vec(any::<u8>(), 0..8),
            ) {
                let source = machine_source(&states, &guards);
                let first = compile(&source, "p.cyc", &CompileOptions::default()).expect("first run");
                let second = compile(&source, "p.cyc", &CompileOptions::default()).expect("second run");
                prop_assert_eq!(counters(&first), counters(&second));
                prop_assert_eq!(&first.machine, &second.machine);
                prop_assert_eq!(first.machine.to_string(), second.machine.to_string());
                prop_assert_eq!(first.outcome(), second.outcome());
            }

            #[test]
            fn every_state_and_transition_is_materialized(
                states in prop::collection::vec("[A-Z][a-z]{0,6}", 1..6),
                guards in prop::collection::vec(any::<u8>(), 0..8),
            ) {
                let source = machine_source(&states, &guards);
                let c = compile(&source, "p.cyc", &CompileOptions::default()).expect("pipeline");
                prop_assert_eq!(c.machine.states.len(), states.len());
                prop_assert_eq!(c.machine.transitions.len(), guards.len());
            }
        }
    }
}
