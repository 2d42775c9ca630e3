// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// This is the entry point for all user interaction.
// It uses the `clap` crate to parse command line arguments.
// All run logic is delegated to Layer 2 (application).
//
// Two commands are supported:
//   1. `train` — trains a network and keeps its best checkpoint
//   2. `test`  — Monte Carlo evaluation of a trained run
//
// Both refuse to start outside the project root directory
// unless --skip-root-check is given.
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::{Context, Result};
use clap::Parser;
use commands::{Commands, RootArgs, TestArgs, TrainArgs};

use crate::infra::run_dir::check_base_dir;

/// The main CLI struct: clap generates the argument parsing
/// code from the fields via the Parser derive macro.
#[derive(Parser, Debug)]
#[command(
    name = "bayes-cnn",
    version,
    about = "Train Bayesian CNNs (MC dropout or variational inference) and measure their uncertainty."
)]
pub struct Cli {
    /// The subcommand to run (train or test)
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Whether debug logging was requested
    pub fn verbose(&self) -> bool {
        match &self.command {
            Commands::Train(args) => args.verbose,
            Commands::Test(args)  => args.verbose,
        }
    }

    /// Match on the subcommand and dispatch to the correct use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args) => run_train(args),
            Commands::Test(args)  => run_test(args),
        }
    }
}

fn check_root(root: &RootArgs) -> Result<()> {
    if root.skip_root_check {
        return Ok(());
    }
    let cwd = std::env::current_dir().context("Cannot determine the current directory")?;
    check_base_dir(&cwd, &root.root_dir)?;
    Ok(())
}

/// Handles the `train` subcommand.
fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    check_root(&args.root)?;
    tracing::info!("Training {} on {}", args.run.model, args.run.dataset);

    let command_line = std::env::args().collect::<Vec<_>>().join(" ");
    let summary      = TrainUseCase::new(args.into(), command_line).execute()?;

    match summary.best {
        Some(best) => println!(
            "Training complete. Best checkpoint: epoch {} ({:.2}% validation accuracy).",
            best.epoch, best.accuracy
        ),
        None => println!("Training complete."),
    }
    Ok(())
}

/// Handles the `test` subcommand.
fn run_test(args: TestArgs) -> Result<()> {
    use crate::application::test_use_case::TestUseCase;

    check_root(&args.root)?;
    TestUseCase::new(args.into()).execute()?;
    Ok(())
}
