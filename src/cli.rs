// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "greenswap")]
#[command(about = "Blue-green deployments for managed application platforms")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print final results
    #[arg(short, long, global = true, conflicts_with = "json")]
    pub quiet: bool,

    /// Print JSON lines
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new greenswap.yml manifest
    Init {
        /// Application name
        #[arg(short, long)]
        name: Option<String>,

        /// Overwrite an existing manifest
        #[arg(short, long)]
        force: bool,
    },

    /// Check a manifest and show the requests it resolves to
    Validate {
        /// Manifest path (discovered in the current directory by default)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Run blue-green deploys of the manifest against a simulated platform
    Simulate {
        /// Manifest path (discovered in the current directory by default)
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Logical environment to deploy (defaults to the first declared)
        #[arg(short, long)]
        environment: Option<String>,

        /// Version labels to deploy in order
        #[arg(long, value_delimiter = ',', default_value = "1.0.0,2.0.0")]
        versions: Vec<String>,

        /// Make the last version's environment never turn healthy
        #[arg(long)]
        fail_health: bool,

        /// Interval between status queries
        #[arg(long, value_parser = parse_duration, default_value = "50ms")]
        interval: Duration,

        /// Bound on waiting for a new environment to turn healthy
        #[arg(long, value_parser = parse_duration, default_value = "5s")]
        health_timeout: Duration,

        /// Keep the application instead of removing it at the end
        #[arg(long)]
        keep: bool,
    },
}

fn parse_duration(value: &str) -> Result<Duration, String> {
    humantime_serde::re::humantime::parse_duration(value).map_err(|e| e.to_string())
}
