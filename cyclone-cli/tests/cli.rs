use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

const DOOR: &str = "machine Door {
    enum Mode { Auto, Manual }
    var ready: bool;
    var count: int = 0;
    var mode: Mode = Auto;
    start state Idle;
    state Running { var ticks: int = 0; }
    final state Done;
    trans Idle -> Running where ready && count < 3 do count = count + 1;
    trans Running -> Done where mode == Manual;
}
";

fn cyclone() -> Command {
    Command::cargo_bin("cyclone-cli").expect("binary exists")
}

#[test]
fn clean_machine_succeeds() {
    let dir = tempdir().expect("tempdir");
    let input_path = dir.path().join("door.cyc");
    fs::write(&input_path, DOOR).expect("write input");

    cyclone()
        .arg(&input_path)
        .assert()
        .code(0)
        .stdout(predicate::str::contains("Syntax checking done."))
        .stdout(predicate::str::contains("Semantic checking done."))
        .stdout(predicate::str::contains("Type checking done."))
        .stdout(predicate::str::contains("Compile is successful."));
}

#[test]
fn semantic_error_fails_with_compile_error_code() {
    let dir = tempdir().expect("tempdir");
    let input_path = dir.path().join("flag.cyc");
    fs::write(
        &input_path,
        "machine M { state Idle; state Running; trans Idle -> Running where flag; }",
    )
    .expect("write input");

    cyclone()
        .arg(&input_path)
        .assert()
        .code(1)
        .stdout(predicate::str::contains("1 semantic error(s)."))
        .stdout(predicate::str::contains("Type checking done."))
        .stdout(predicate::str::contains("Compile is failed."))
        .stderr(predicate::str::contains("`flag` is not declared"));
}

#[test]
fn recognition_failure_reports_position() {
    let dir = tempdir().expect("tempdir");
    let input_path = dir.path().join("bad.cyc");
    fs::write(&input_path, "machine M {\n  state ;\n}").expect("write input");

    cyclone()
        .arg(&input_path)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("bad.cyc:2:9: expected an identifier"))
        .stdout(predicate::str::contains("Compile is failed."));
}

#[test]
fn deeply_nested_guard_fails_cleanly() {
    let guard = format!("{}ready{}", "(".repeat(5000), ")".repeat(5000));
    cyclone()
        .write_stdin(format!(
            "machine M {{ var ready: bool; state A; trans A -> A where {guard}; }}"
        ))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("nested too deeply"))
        .stdout(predicate::str::contains("Compile is failed."));
}

#[test]
fn recognition_failure_also_prints_lexical_errors() {
    cyclone()
        .write_stdin("machine M {\n  var c: char = 'x;\n}")
        .assert()
        .code(1)
        .stderr(predicate::str::contains(
            "<stdin>:2:17: syntax error[E0002]: unterminated",
        ))
        .stderr(predicate::str::contains("<stdin>:3:1: expected an expression"));
}

#[test]
fn missing_input_is_unexpected_error() {
    let dir = tempdir().expect("tempdir");

    cyclone()
        .arg(dir.path().join("missing.cyc"))
        .assert()
        .code(2)
        .stderr(predicate::str::contains("failed to read input"));
}

#[test]
fn reads_standard_input() {
    cyclone()
        .write_stdin("machine M { var ready: bool; state A; state B; trans A -> B where ready; }")
        .assert()
        .code(0)
        .stdout(predicate::str::contains("<stdin>"))
        .stdout(predicate::str::contains("Compile is successful."));
}

#[test]
fn dumps_machine_model() {
    cyclone()
        .arg("--dump")
        .write_stdin(DOOR)
        .assert()
        .code(0)
        .stdout(predicate::str::contains("machine Door {"))
        .stdout(predicate::str::contains("start state Idle"))
        .stdout(predicate::str::contains(
            "trans Idle -> Running where (ready && (count < 3)) do count = (count + 1)",
        ));
}

#[test]
fn directory_inputs_report_worst_outcome() {
    let dir = tempdir().expect("tempdir");
    fs::write(dir.path().join("a_door.cyc"), DOOR).expect("write good");
    fs::write(
        dir.path().join("b_guard.cyc"),
        "machine M { state A; trans A -> A where 1; }",
    )
    .expect("write bad");
    fs::write(dir.path().join("readme.txt"), "not a machine").expect("write other");

    cyclone()
        .arg(dir.path())
        .assert()
        .code(1)
        .stdout(predicate::str::contains("a_door.cyc"))
        .stdout(predicate::str::contains("b_guard.cyc"))
        .stdout(predicate::str::contains("1 type error(s)."))
        .stdout(predicate::str::contains("readme.txt").not());
}

#[test]
fn widening_flag_accepts_int_for_real() {
    let source = "machine M { var speed: real = 1; }";

    cyclone()
        .write_stdin(source)
        .assert()
        .code(1)
        .stdout(predicate::str::contains("1 type error(s)."));

    cyclone()
        .arg("--widen-int-to-real")
        .write_stdin(source)
        .assert()
        .code(0);
}
