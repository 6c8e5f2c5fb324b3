use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use cyclone_core::compiler::{UNEXPECTED_ERROR, verdict};
use cyclone_core::sources::load_sources;
use cyclone_core::{Compilation, CompileOptions, CoreError, Outcome, compile, compile_reader};
use tracing_subscriber::EnvFilter;

/// Check Cyclone state-machine sources.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[arg(
        value_name = "INPUT",
        help = "Machine sources or directories of *.cyc files (reads stdin when omitted)"
    )]
    inputs: Vec<PathBuf>,

    #[arg(long, help = "Print the generated machine model")]
    dump: bool,

    #[arg(long, help = "Accept int values where real is expected")]
    widen_int_to_real: bool,

    #[arg(short, long, action = clap::ArgAction::Count, help = "Raise log verbosity (-v debug, -vv trace)")]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match execute(&cli) {
        Ok(outcome) => exit_code(outcome.exit_code()),
        Err(err) => {
            eprintln!("error: {err:#}");
            exit_code(UNEXPECTED_ERROR)
        }
    }
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn execute(cli: &Cli) -> Result<Outcome> {
    let options = CompileOptions {
        widen_int_to_real: cli.widen_int_to_real,
    };

    if cli.inputs.is_empty() {
        let name = "<stdin>";
        println!("Launching compiler on {name}...");
        let result = compile_reader(io::stdin().lock(), name, &options);
        return Ok(report(result, cli));
    }

    let mut worst = Outcome::Success;
    for input in &cli.inputs {
        let files = load_sources(input)
            .with_context(|| format!("failed to read input {}", input.display()))?;
        if files.is_empty() {
            tracing::warn!(input = %input.display(), "no .cyc sources found");
        }
        for file in files {
            let name = file.path.display().to_string();
            worst = worst.max(check_source(&file.contents, &name, cli, &options));
        }
    }
    Ok(worst)
}

/// Compile one source and print its report.
fn check_source(source: &str, name: &str, cli: &Cli, options: &CompileOptions) -> Outcome {
    println!("Launching compiler on {name}...");
    report(compile(source, name, options), cli)
}

/// Print a finished compilation. Diagnostics go to stderr, the optional
/// model dump and the per-phase summary to stdout.
fn report(result: Result<Compilation, CoreError>, cli: &Cli) -> Outcome {
    match result {
        Ok(compilation) => {
            for line in compilation.rendered_diagnostics() {
                eprintln!("{line}");
            }
            if cli.dump {
                println!("{}", compilation.machine);
            }
            for line in compilation.summary() {
                println!("{line}");
            }
            compilation.outcome()
        }
        Err(err) => {
            for note in err.notes() {
                eprintln!("{note}");
            }
            eprintln!("{err}");
            let outcome = Outcome::of_error(&err);
            println!("{}", verdict(outcome));
            outcome
        }
    }
}

fn exit_code(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}
