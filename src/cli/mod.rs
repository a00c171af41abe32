//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for the doctor worker using clap.

pub mod commands;

use clap::{Parser, Subcommand};
use std::path::Path;

/// Doctor worker - treats patients from the Redis waiting room
#[derive(Parser, Debug)]
#[command(name = "doctor-worker")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file (defaults to ./doctor-worker.toml if present)
    #[arg(short, long, env = "DOCTOR_CONFIG")]
    pub config: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "DOCTOR_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute (defaults to `run`)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    pub fn config_path(&self) -> Option<&Path> {
        self.config.as_deref().map(Path::new)
    }
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Treat patients from the waiting room until interrupted
    Run(commands::run::RunArgs),

    /// Validate configuration
    ValidateConfig(commands::validate::ValidateArgs),

    /// Show waiting room length and stored treatment records
    Status(commands::status::StatusArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}
