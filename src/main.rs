// ABOUTME: Entry point for the greenswap CLI application.
// ABOUTME: Parses arguments and dispatches to appropriate command handlers.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use commands::SimulateArgs;
use greenswap::config;
use greenswap::error::Result;
use greenswap::output::{Output, OutputMode};
use std::env;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing subscriber based on verbose flag
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let output = Output::new(OutputMode::from_flags(cli.quiet, cli.json));
    let failure = Output::new(output.mode());

    if let Err(e) = run(cli, output).await {
        failure.error(&e.to_string());
        std::process::exit(1);
    }
}

async fn run(cli: Cli, output: Output) -> Result<()> {
    match cli.command {
        Commands::Init { name, force } => {
            let cwd = env::current_dir()?;
            config::init_config(&cwd, name.as_deref(), force)?;
            output.success(&format!("Created {}", config::CONFIG_FILENAME));
            Ok(())
        }
        Commands::Validate { file } => commands::validate(file.as_deref(), &output),
        Commands::Simulate {
            file,
            environment,
            versions,
            fail_health,
            interval,
            health_timeout,
            keep,
        } => {
            let args = SimulateArgs {
                file,
                environment,
                versions,
                fail_health,
                interval,
                health_timeout,
                keep,
            };
            commands::simulate(args, output).await
        }
    }
}
