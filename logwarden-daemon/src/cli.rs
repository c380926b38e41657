//! CLI argument definitions for logwarden-daemon.
//!
//! Uses `clap` v4 derive macros to parse command-line arguments.

use std::path::PathBuf;

use clap::Parser;

/// Logwarden log analysis daemon.
///
/// Runs the ingest workers and the analyzer loop over a shared
/// event store, and dispatches alerts to configured recipients.
#[derive(Parser, Debug)]
#[command(name = "logwarden-daemon")]
#[command(version, about, long_about = None)]
pub struct DaemonCli {
    /// Path to logwarden.toml configuration file.
    #[arg(short, long, default_value = "/etc/logwarden/logwarden.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override log format (json, pretty).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_format: Option<String>,

    /// Override the rules file path (takes precedence over config file).
    #[arg(long)]
    pub rules: Option<PathBuf>,

    /// Validate configuration and rules, then exit without starting.
    #[arg(long)]
    pub validate: bool,
}
