//! Command-line entry point: `validate`, `run`, and `version` (spec §6
//! "External interfaces", SPEC_FULL §10.3).
//!
//! Input is a pre-parsed program tree serialized as JSON — this crate does
//! not own the surface DSL grammar or its parser (spec §1); a hosting tool
//! with its own parser emits this JSON and shells out to (or links) this
//! binary.

use clap::{Parser, Subcommand};
use kigali_sim::error::SimError;
use kigali_sim::program::Program;
use kigali_sim::report::ResultTable;
use kigali_sim::trial::{RunConfig, TrialOrchestrator};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "kigali_sim", version, about = "Refrigerant substance stock-flow simulation engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Parses and validates a program tree without running it.
    Validate {
        /// Path to the program tree, serialized as JSON.
        program: PathBuf,
    },
    /// Runs one scenario's trials and writes the results to a CSV file.
    Run {
        /// Path to the program tree, serialized as JSON.
        program: PathBuf,
        /// Name of the scenario to run, as listed in the program's
        /// `simulations` stanza.
        scenario: String,
        /// Destination CSV path for the result table.
        #[arg(short, long, default_value = "results.csv")]
        output: PathBuf,
        /// Overrides the scenario's configured trial count.
        #[arg(short, long)]
        trials: Option<u32>,
        /// Base RNG seed; each trial seeds from `seed + trial_index`.
        #[arg(short, long, default_value_t = 0)]
        seed: u64,
        /// Shows a progress bar over (trial) completion.
        #[arg(short, long)]
        progress: bool,
    },
    /// Prints the engine's version.
    Version,
}

fn load_program(path: &PathBuf) -> Result<Program, SimError> {
    let text = std::fs::read_to_string(path)?;
    let program: Program = serde_json::from_str(&text)?;
    program.validate()?;
    Ok(program)
}

fn run() -> Result<(), SimError> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Validate { program } => {
            load_program(&program)?;
            println!("OK");
        }
        Commands::Run {
            program,
            scenario,
            output,
            trials,
            seed,
            progress,
        } => {
            let program = load_program(&program)?;
            let config = RunConfig {
                trials_override: trials,
                seed,
                cancel: None,
            };
            let (orchestrator, seed) =
                TrialOrchestrator::new(&program, scenario.as_str()).with_progress(progress).with_config(&config);
            let records = orchestrator.run(seed)?;
            let mut table = ResultTable::from_records(&records)?;
            table.to_csv(&output)?;
            println!("wrote {} rows to {}", records.len(), output.display());
        }
        Commands::Version => {
            println!("kigali_sim {}", env!("CARGO_PKG_VERSION"));
        }
    }
    Ok(())
}

/// Maps the error taxonomy to spec §6's exit codes: user-facing
/// misconfiguration exits 1, engine-internal invariant violations exit 2.
fn exit_code_for(err: &SimError) -> u8 {
    match err {
        SimError::Internal(_) => 2,
        _ => 1,
    }
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(exit_code_for(&err))
        }
    }
}
