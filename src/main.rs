//! tabflow - Main Entry Point
//!
//! Runs the full pipeline by default, or one stage through a subcommand.

use clap::Parser;
use tabflow::cli::{cmd_clean, cmd_info, cmd_plot, cmd_run, cmd_train, Cli, Commands};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tabflow=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Info { data }) => {
            cmd_info(&data)?;
        }
        Some(Commands::Clean { data, output }) => {
            cmd_clean(&data, &output)?;
        }
        Some(Commands::Train { data, target, seed, output_dir }) => {
            cmd_train(&data, &target, seed, &output_dir)?;
        }
        Some(Commands::Plot { data, column, kind, output_dir }) => {
            cmd_plot(&data, &column, kind, &output_dir)?;
        }
        None => {
            cmd_run(cli.run)?;
        }
    }

    Ok(())
}
