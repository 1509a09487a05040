//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Telemetry Hub - fan telemetry out to every configured backend
#[derive(Parser, Debug)]
#[command(
    name = "telemetry-hub",
    author,
    version,
    about = "Telemetry fan-out hub",
    long_about = "Registers telemetry clients from configuration and fans hits, metrics,\n\
                  events, exceptions and dependency counts out to all of them.\n\n\
                  Reads return the first non-default answer in registration order."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "TELEMETRY_HUB_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "TELEMETRY_HUB_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build the dispatcher and drive a synthetic workload through it
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display the configured clients
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "telemetry.toml",
        env = "TELEMETRY_HUB_CONFIG"
    )]
    pub config: PathBuf,

    /// Number of concurrent worker tasks
    #[arg(
        short,
        long,
        default_value = "4",
        value_parser = clap::value_parser!(u16).range(1..),
        env = "TELEMETRY_HUB_WORKERS"
    )]
    pub workers: u16,

    /// Iterations per worker (0 = unlimited)
    #[arg(long, default_value = "1000", env = "TELEMETRY_HUB_ITERATIONS")]
    pub iterations: u64,

    /// Stop after this many seconds (0 = no limit)
    #[arg(long, default_value = "0", env = "TELEMETRY_HUB_DURATION_SECS")]
    pub duration_secs: u64,

    /// TTL of the heartbeat events each worker tracks, in milliseconds
    #[arg(long, default_value = "5000", env = "TELEMETRY_HUB_EVENT_TTL_MS")]
    pub event_ttl_ms: u64,

    /// Override the Prometheus port from configuration (0 = disabled)
    #[arg(long, env = "TELEMETRY_HUB_METRICS_PORT")]
    pub metrics_port: Option<u16>,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(
        short,
        long,
        default_value = "telemetry.toml",
        env = "TELEMETRY_HUB_CONFIG"
    )]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(
        short,
        long,
        default_value = "telemetry.toml",
        env = "TELEMETRY_HUB_CONFIG"
    )]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Resolve every client and show its concrete type (file clients create their output file)
    #[arg(long)]
    pub resolve: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}
