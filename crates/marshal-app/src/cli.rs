//! CLI argument definitions for the Marshal binary.
//!
//! Uses `clap` with derive macros for ergonomic argument parsing.
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Marshal: applies the actions suggested by record analysis and tracks the
/// notifications they send.
#[derive(Parser, Debug)]
#[command(name = "marshal", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Path to the SQLite database.
    #[arg(short = 'd', long = "database")]
    pub database: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Execute the actions of an analysis result (`-` reads stdin).
    Apply { file: PathBuf },

    /// Create or inspect data records.
    Record {
        #[command(subcommand)]
        command: RecordCommand,
    },

    /// List the tags attached to a record.
    Tags { record_id: i64 },

    /// List notification history.
    Notifications {
        /// Only notifications still awaiting an outcome.
        #[arg(long)]
        pending: bool,

        /// Only notifications for this record.
        #[arg(long)]
        record: Option<i64>,

        #[arg(long)]
        limit: Option<u64>,
    },
}

#[derive(Subcommand, Debug)]
pub enum RecordCommand {
    /// Insert a new record.
    Add {
        #[arg(long = "type")]
        record_type: String,
        #[arg(long)]
        content: String,
    },
    /// Print a record as JSON.
    Show { id: i64 },
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > MARSHAL_CONFIG env var > ~/.marshal/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        self.resolve_config_path_with(|key| std::env::var(key).ok())
    }

    fn resolve_config_path_with<F: Fn(&str) -> Option<String>>(&self, env: F) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Some(p) = env("MARSHAL_CONFIG") {
            return PathBuf::from(p);
        }
        match env("HOME") {
            Some(home) => PathBuf::from(home).join(".marshal").join("config.toml"),
            None => PathBuf::from("config.toml"),
        }
    }

    /// Resolve the database path.
    ///
    /// Priority: --database flag > config file value.
    pub fn resolve_database(&self, config_path: &str) -> PathBuf {
        match self.database {
            Some(ref p) => p.clone(),
            None => expand_home(config_path, std::env::var("HOME").ok()),
        }
    }

    /// Resolve the log filter used when RUST_LOG is unset.
    ///
    /// Priority: --log-level flag > config file value.
    pub fn resolve_log_level(&self, config_level: &str) -> String {
        self.log_level
            .clone()
            .unwrap_or_else(|| config_level.to_string())
    }
}

/// Expand a leading `~/` to the home directory.
fn expand_home(path: &str, home: Option<String>) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => PathBuf::from(home.unwrap_or_else(|| ".".to_string())).join(rest),
        None => PathBuf::from(path),
    }
}
