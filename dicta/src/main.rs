//! Dicta CLI

use clap::{Parser, Subcommand};
use dicta::error::report_error;
use dicta::{AnalyzedProgram, EvalConfig, Interpreter, Value};
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Parser)]
#[command(name = "dicta", version, about = "Dicta - evaluate analyzed programs")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Evaluator configuration (TOML with an [eval] table)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the nested call limit
    #[arg(long, global = true)]
    max_depth: Option<usize>,
}

#[derive(Subcommand)]
enum Command {
    /// Load an analyzed program and call its entry function
    Run {
        /// Analyzed program (JSON)
        file: PathBuf,
        /// Function to call
        #[arg(long, default_value = "main")]
        entry: String,
    },
    /// Load an analyzed program and print it back (debug)
    Dump {
        /// Analyzed program (JSON)
        file: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let result = match &cli.command {
        Command::Run { file, entry } => run_file(&cli, file, entry),
        Command::Dump { file } => dump_file(file),
    };

    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

fn setup_logging(verbose: u8) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(match verbose {
            0 => "warn",
            1 => "debug",
            _ => "trace",
        })
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> dicta::Result<EvalConfig> {
    let mut config = match &cli.config {
        Some(path) => EvalConfig::load(path)?,
        None => EvalConfig::default(),
    };
    if let Some(depth) = cli.max_depth {
        config.max_call_depth = depth;
    }
    Ok(config)
}

/// `Ok(false)` when the program itself failed; the diagnostic is already
/// printed.
fn run_file(cli: &Cli, path: &Path, entry: &str) -> Result<bool, Box<dyn std::error::Error>> {
    let config = load_config(cli)?;
    debug!(?config, "configuration");
    let analyzed = AnalyzedProgram::load(path)?;
    let file = analyzed.program.file.clone();

    let mut interp = Interpreter::with_config(config);
    let outcome = interp
        .load(&analyzed)
        .and_then(|()| interp.call_function(entry, Vec::new()));
    match outcome {
        Ok(Value::Unit) => Ok(true),
        Ok(value) => {
            println!("{value}");
            Ok(true)
        }
        Err(e) => {
            report_error(&file, &e);
            Ok(false)
        }
    }
}

fn dump_file(path: &Path) -> Result<bool, Box<dyn std::error::Error>> {
    let analyzed = AnalyzedProgram::load(path)?;
    println!("{}", serde_json::to_string_pretty(&analyzed)?);
    Ok(true)
}
