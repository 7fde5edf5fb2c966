//! drf CLI
//!
//! Command-line interface for inspecting Dominant Resource Fairness decisions
//! over a workload description.

mod commands;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use drf_core::{Resource, WorkloadConfig};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// drf - Dominant Resource Fairness inspector
#[derive(Parser, Debug)]
#[command(name = "drf")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log level (overrides the workload file)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Order every consumer in a workload file
    Rank {
        /// Workload TOML file
        file: PathBuf,
    },

    /// Show the consumer that receives the next allocation
    Next {
        /// Workload TOML file
        file: PathBuf,
    },

    /// Compute weighted fair shares for a workload file
    FairShares {
        /// Workload TOML file
        file: PathBuf,
    },

    /// Calculate shares for a single usage vector
    Shares {
        /// Capacity as memory,cpu,gpu
        #[arg(long, value_parser = commands::parse_resource)]
        capacity: Resource,

        /// Usage as memory,cpu,gpu
        #[arg(long, value_parser = commands::parse_resource)]
        usage: Resource,

        /// Weights as memory,cpu,gpu
        #[arg(long)]
        weights: Option<String>,
    },

    /// Parse an environment assignment list
    Env {
        /// Assignments, e.g. A=1,B="x,y"
        input: String,

        /// Pre-existing variables (KEY=VALUE), repeatable
        #[arg(long = "base")]
        base: Vec<String>,

        /// Expand %VAR% instead of $VAR
        #[arg(long)]
        windows: bool,

        /// Fall back to the process environment for unknown placeholders
        #[arg(long)]
        inherit: bool,
    },
}

fn init_logging(verbose: bool, level: Option<&str>) {
    let log_level = if verbose {
        Level::DEBUG
    } else {
        match level.unwrap_or("warn").to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "error" => Level::ERROR,
            _ => Level::WARN,
        }
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

/// Load a workload file and start logging at the level it asks for, unless
/// the command line overrides it
fn load_workload(cli_level: Option<&str>, verbose: bool, file: &Path) -> Result<WorkloadConfig> {
    let workload = WorkloadConfig::from_file(file)
        .with_context(|| format!("failed to load workload {}", file.display()))?;
    init_logging(verbose, cli_level.or(Some(workload.logging.level.as_str())));
    Ok(workload)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = cli.log_level.as_deref();

    match cli.command {
        Commands::Rank { file } => {
            let workload = load_workload(level, cli.verbose, &file)?;
            commands::rank(&workload, cli.json)?;
        }
        Commands::Next { file } => {
            let workload = load_workload(level, cli.verbose, &file)?;
            commands::next(&workload, cli.json)?;
        }
        Commands::FairShares { file } => {
            let workload = load_workload(level, cli.verbose, &file)?;
            commands::fair_shares(&workload, cli.json)?;
        }
        Commands::Shares {
            capacity,
            usage,
            weights,
        } => {
            init_logging(cli.verbose, level);
            commands::shares(capacity, usage, weights.as_deref(), cli.json)?;
        }
        Commands::Env {
            input,
            base,
            windows,
            inherit,
        } => {
            init_logging(cli.verbose, level);
            commands::env(&input, &base, windows, inherit, cli.json)?;
        }
    }

    Ok(())
}
