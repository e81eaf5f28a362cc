//! Flox interpreter command-line.
//!
//! When called without argument it drops into an interactive read-evaluate-print loop.
//!
//! When called with arguments, it interprets the corresponding files in a single interpreter
//! session (so code and data sharing is possible).

use std::fs;
use std::io;
use std::io::prelude::*;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;

use flox::interpreter::Interpreter;

/// Exit status when a script has lexical or syntax errors.
const EXIT_STATIC_ERROR: u8 = 65;
/// Exit status when a script fails at runtime.
const EXIT_RUNTIME_ERROR: u8 = 70;

#[derive(Parser, Debug)]
#[command(name = "flox", version, about = "Tree-walking interpreter for the Flox language")]
struct Args {
    /// Scripts to run in order.  Starts an interactive prompt when empty.
    scripts: Vec<PathBuf>,
}

fn main() -> anyhow::Result<ExitCode> {
    init_tracing();
    let args = Args::parse();
    if args.scripts.is_empty() {
        run_prompt()?;
        Ok(ExitCode::SUCCESS)
    } else {
        run_all_files(&args.scripts)
    }
}

/// Log to stderr, and only when `RUST_LOG` is set.
fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(io::stderr).with_target(true))
            .with(EnvFilter::from_default_env())
            .init();
    }
}

fn run_all_files(paths: &[PathBuf]) -> anyhow::Result<ExitCode> {
    let mut interp_stdout = io::stdout();
    let mut interp = Interpreter::new(&mut interp_stdout);
    let mut had_static_error = false;

    for p in paths {
        let source = fs::read_to_string(p)
            .with_context(|| format!("failed to read {}", p.display()))?;
        let result = interp.eval(&source);

        for diagnostic in interp.take_diagnostics() {
            eprintln!("{}", diagnostic);
            had_static_error = true;
        }
        if let Err(e) = result {
            eprintln!("{}", e);
            return Ok(ExitCode::from(EXIT_RUNTIME_ERROR));
        }
    }

    if had_static_error {
        Ok(ExitCode::from(EXIT_STATIC_ERROR))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn run_prompt() -> Result<(), io::Error> {
    let stdin = io::stdin();
    let mut repl_stdout = io::stdout();
    let mut interp_stdout = io::stdout();

    let mut interp = Interpreter::new(&mut interp_stdout);

    let mut input = String::new();
    loop {
        repl_stdout.write_all(b"> ")?;
        repl_stdout.flush()?;

        input.clear();
        let nbytes = stdin.read_line(&mut input)?;
        if nbytes == 0 || input.trim() == "exit" {
            break;
        }

        let result = interp.eval(&input);
        for diagnostic in interp.take_diagnostics() {
            eprintln!("{}", diagnostic);
        }
        match result {
            Ok(values) => {
                for v in values {
                    println!("{}", v);
                }
            }
            Err(e) => {
                println!("{}", e);
                interp.reset();
            }
        }
    }

    Ok(())
}
