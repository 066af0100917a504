//! Stepflow CLI entry point.
//!
//! Binary name: `stepflow`
//!
//! Parses CLI arguments, initializes tracing, and dispatches to the command
//! handlers. Exit code 0 on success, non-zero on validation or run failure.

mod cli;

use clap::Parser;
use clap_complete::generate;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Local development convenience; ignored when no .env exists.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Set up tracing based on verbosity
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info,stepflow=debug",
        _ => "trace",
    };
    stepflow_observe::tracing_setup::init_tracing(filter, cli.otel)
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    let result = match cli.command {
        Commands::Completions { shell } => {
            let mut cmd = <Cli as clap::CommandFactory>::command();
            generate(shell, &mut cmd, "stepflow", &mut std::io::stdout());
            Ok(())
        }
        Commands::Run(args) => cli::run::handle_run(args, cli.json, cli.quiet).await,
        Commands::Validate(args) => cli::validate::handle_validate(args, cli.json).await,
        Commands::Capabilities { group } => {
            cli::capabilities::handle_capabilities(group.as_deref(), cli.json)
        }
    };

    stepflow_observe::tracing_setup::shutdown_tracing();
    result
}
