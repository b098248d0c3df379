//! Spindle CLI — cache maintenance and dirty-set inspection.
//!
//! Provides `spindle plan` to compute and print the dirty set the next build
//! would process (without running processors or touching the caches), and
//! `spindle clean` to drop the incremental caches. Build orchestration itself
//! belongs to the host build tool, which drives the engine directly.

#![warn(missing_docs)]

mod clean;
mod plan;

use std::process;

use clap::{Parser, Subcommand};

/// Spindle — incremental symbol processing.
#[derive(Parser, Debug)]
#[command(name = "spindle", version, about = "Spindle symbol-processing engine")]
pub struct Cli {
    /// Path to the directory containing `spindle.toml`.
    #[arg(long, global = true, default_value = ".")]
    pub project_dir: String,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compute and print the dirty set for the next build.
    Plan(PlanArgs),
    /// Remove the incremental caches.
    Clean,
}

/// Arguments for the `spindle plan` subcommand.
#[derive(Parser, Debug)]
pub struct PlanArgs {
    /// Files changed since the last build (project-relative). When omitted,
    /// changes are derived by content hashing.
    #[arg(long, num_args = 1..)]
    pub modified: Vec<String>,

    /// Files removed since the last build (project-relative).
    #[arg(long, num_args = 1..)]
    pub removed: Vec<String>,

    /// Fully qualified names of changed classpath classes.
    #[arg(long = "changed-class", num_args = 1..)]
    pub changed_classes: Vec<String>,
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Plan(ref args) => plan::run(args, &cli.project_dir),
        Command::Clean => clean::run(&cli.project_dir),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}
