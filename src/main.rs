use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser as ClapParser;
use replisp::interpreter::{Config, Interpreter, classify_arg};
use replisp::repl::{print_trace, run_repl};
use replisp::selftest::run_self_test;
use replisp::{DEFAULT_MAX_DEPTH, Value};
use tracing_subscriber::EnvFilter;

#[derive(ClapParser, Debug)]
#[command(author, version, about = "A small prefix-notation Lisp", long_about = None)]
struct Cli {
    /// Script to run (must end in .rep); starts the REPL when omitted
    file: Option<PathBuf>,

    /// Extra arguments, bound to the global `args` list
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,

    /// Run the built-in self-check suite
    #[arg(long)]
    test: bool,

    /// Print tokens and AST of each input, and log at debug level
    #[arg(long)]
    debug: bool,

    /// Maximum number of nested function calls; very large values can
    /// overflow the native stack before the limit is reached
    #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
    max_depth: usize,
}

fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run_script(interpreter: &mut Interpreter, path: &Path, debug: bool) -> ExitCode {
    if path.extension().and_then(|ext| ext.to_str()) != Some("rep") {
        eprintln!("{}: not a .rep file", path.display());
        return ExitCode::FAILURE;
    }
    let source = match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("{}: {}", path.display(), err);
            return ExitCode::FAILURE;
        }
    };
    tracing::debug!(path = %path.display(), bytes = source.len(), "running script");

    if debug {
        print_trace(interpreter, &source);
    }
    match interpreter.run(&source) {
        Ok(value) => {
            println!("{}", value);
            ExitCode::SUCCESS
        }
        Err(e) => {
            let name = path.display().to_string();
            if e.eprint_report(&name, &source).is_err() {
                eprintln!("{}", e);
            }
            ExitCode::FAILURE
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    if cli.test {
        let report = run_self_test();
        println!("{}", report);
        return if report.all_passed() {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        };
    }

    let mut interpreter = Interpreter::with_config(Config {
        max_depth: cli.max_depth,
    });
    interpreter.define(
        "args",
        Value::List(cli.args.iter().map(|arg| classify_arg(arg)).collect()),
    );

    match &cli.file {
        Some(path) => run_script(&mut interpreter, path, cli.debug),
        None => match run_repl(&mut interpreter, cli.debug) {
            Ok(()) => ExitCode::SUCCESS,
            Err(err) => {
                eprintln!("Readline Error: {}", err);
                ExitCode::FAILURE
            }
        },
    }
}
