//! CLI module for dvdrip
//!
//! This module handles command-line argument parsing and command execution.

use std::path::PathBuf;

use clap::builder::{OsStringValueParser, TypedValueParser};
use clap::{Parser, Subcommand};

use crate::utils::logging::LogFormat;

pub mod args;
pub mod commands;

/// dvdrip
///
/// Rips DVD titles into episode files with HandBrakeCLI.
#[derive(Parser, Debug)]
#[command(name = "dvdrip")]
#[command(about = "dvdrip - Rip DVD titles into well-named episode files")]
#[command(version)]
#[command(long_about = None)]
pub struct Cli {
    /// Logging level (RUST_LOG takes precedence)
    #[arg(long, default_value = "info", env = "DVDRIP_LOG_LEVEL", global = true)]
    pub log_level: String,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Compact, global = true)]
    pub log_format: LogFormat,

    /// Configuration file
    #[arg(long, env = "DVDRIP_CONFIG", global = true, value_parser = path_or_empty())]
    pub config: Option<PathBuf>,

    /// HandBrakeCLI binary to run
    #[arg(long, env = "DVDRIP_HANDBRAKE", global = true)]
    pub handbrake_bin: Option<String>,

    /// The command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Path parser accepting an empty value, which stands for unset
pub(crate) fn path_or_empty() -> impl TypedValueParser<Value = PathBuf> {
    OsStringValueParser::new().map(PathBuf::from)
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scan a DVD and transcode the selected titles
    Rip(args::RipArgs),
    /// List the titles of a DVD
    Scan(args::ScanArgs),
}
