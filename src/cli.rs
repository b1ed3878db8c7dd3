// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::types::RenameCorrelation;

/// Command-line arguments for `watchtree`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "watchtree",
    version,
    about = "Watch directory trees with inotify and print events with their current paths.",
    long_about = None
)]
pub struct CliArgs {
    /// Paths to watch. Replaces `[watch].paths` from the config file.
    #[arg(value_name = "PATH")]
    pub paths: Vec<PathBuf>,

    /// Path to the config file (TOML).
    ///
    /// Default: `Watchtree.toml` in the current working directory, if present.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Watch whole subtrees and follow directories created or moved below them.
    #[arg(long, overrides_with = "no_recursive")]
    pub recursive: bool,

    /// Watch only the given paths themselves.
    #[arg(long)]
    pub no_recursive: bool,

    /// Comma-separated event kinds, e.g. `create,delete,move`.
    #[arg(long, value_name = "LIST")]
    pub events: Option<String>,

    /// How the two halves of a rename are matched.
    #[arg(long, value_name = "MODE")]
    pub rename_correlation: Option<RenameCorrelation>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `WATCHTREE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Validate the configuration and print it, without watching anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Exit after printing this many events.
    #[arg(long, value_name = "N")]
    pub count: Option<u64>,
}

impl CliArgs {
    /// `Some(true)` / `Some(false)` when a recursion flag was given.
    pub fn recursive_override(&self) -> Option<bool> {
        if self.recursive {
            Some(true)
        } else if self.no_recursive {
            Some(false)
        } else {
            None
        }
    }
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
