//! CLI command definitions and dispatch for the `stepflow` binary.
//!
//! Uses clap derive macros for argument parsing. Commands: `run`,
//! `validate`, `capabilities`, `completions`.

pub mod capabilities;
pub mod prompt;
pub mod run;
pub mod validate;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

/// Repair, validate, and run workflow documents.
#[derive(Parser)]
#[command(name = "stepflow", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Export spans to OpenTelemetry (stdout exporter).
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sanitize, resolve, and execute a workflow file.
    Run(RunArgs),

    /// Sanitize and validate a workflow file without running it.
    Validate(ValidateArgs),

    /// List the capability catalog.
    #[command(alias = "ls")]
    Capabilities {
        /// Only show capabilities in this group (e.g. devtools).
        #[arg(long)]
        group: Option<String>,
    },

    /// Generate shell completions.
    Completions { shell: Shell },
}

#[derive(Args)]
pub struct RunArgs {
    /// Workflow file (JSON or YAML).
    pub file: PathBuf,

    /// Abort the run on the first failing step.
    #[arg(long)]
    pub fail_fast: bool,

    /// Per-step timeout in seconds.
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Never prompt; unresolved parameters become errors.
    #[arg(long)]
    pub non_interactive: bool,

    /// Supply a value for a missing parameter (repeatable).
    /// Keys are bare (`repo=...`) or qualified (`github.create_issue.repo=...`).
    #[arg(long = "set", value_name = "PARAM=VALUE")]
    pub set: Vec<String>,

    /// JSON object merged over the trigger params (simulated trigger data).
    #[arg(long)]
    pub payload: Option<String>,
}

#[derive(Args)]
pub struct ValidateArgs {
    /// Workflow file (JSON or YAML).
    pub file: PathBuf,

    /// Write the sanitized document to this path.
    #[arg(long)]
    pub write: Option<PathBuf>,
}
