//! Command-line argument parsing for toolguard
//!
//! Provides clap-based CLI with subcommands and verbosity control.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// toolguard - Run tools behind caching, rate limiting and retries
#[derive(Parser, Debug)]
#[command(name = "toolguard")]
#[command(version)]
#[command(about = "Invoke tools through a guarded execution engine", long_about = None)]
pub struct Args {
    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable mock mode (skips rate limiting)
    #[arg(long)]
    pub mock: bool,

    /// Verbosity level: default (info), -v (debug), -vv (trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Subcommand
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Invoke a registered tool
    Run {
        /// Tool name
        tool: String,

        /// Parameters as a JSON object
        #[arg(short, long, default_value = "{}")]
        params: String,

        /// Caller identity used for per-user rate limiting
        #[arg(short, long)]
        user: Option<String>,

        /// Number of times to invoke the tool
        #[arg(long, default_value_t = 1)]
        repeat: u32,
    },

    /// List registered tools
    Tools,

    /// Display effective configuration
    Config,
}

/// Verbosity level enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Normal,
    Verbose,
    VeryVerbose,
}

impl Args {
    /// Get verbosity level based on flags
    pub fn verbosity(&self) -> Verbosity {
        match self.verbose {
            0 => Verbosity::Normal,
            1 => Verbosity::Verbose,
            _ => Verbosity::VeryVerbose,
        }
    }
}

impl Verbosity {
    /// Log level override, if the flags ask for more than the config
    pub fn log_level(&self) -> Option<&'static str> {
        match self {
            Verbosity::Normal => None,
            Verbosity::Verbose => Some("debug"),
            Verbosity::VeryVerbose => Some("trace"),
        }
    }
}
