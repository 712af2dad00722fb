//! dvdrip
//!
//! Rips the titles of a DVD into named episode files with HandBrakeCLI.
//!
//! # Usage
//!
//! ```bash
//! dvdrip rip -i /dev/dvd -o ~/Videos/Foo -n Foo -t 1=S01E01 2=S01E02
//! dvdrip scan -i /dev/dvd
//! ```

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::debug;

use dvdrip_cli::cli::{commands, Cli, Commands};
use dvdrip_cli::config_initialization::initialize_configuration;
use dvdrip_cli::error::RipError;
use dvdrip_cli::utils::{shutdown_signal, LoggingConfig};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = LoggingConfig::new(cli.log_level.clone(), cli.log_format).init() {
        eprintln!("Failed to initialize logging: {}", e);
    }

    // Dropping the command future kills any running HandBrakeCLI
    let result = tokio::select! {
        result = run(cli) => result,
        Ok(()) = shutdown_signal() => Err(anyhow::Error::from(RipError::Interrupted)),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if e.downcast_ref::<RipError>().is_some_and(RipError::is_interrupted) {
                eprintln!("ok, bye");
            } else {
                eprintln!("Error: {}", e);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = initialize_configuration(&cli)?;
    debug!(?config, "configuration loaded");

    match cli.command {
        Commands::Rip(args) => commands::rip(args, &config).await?,
        Commands::Scan(args) => commands::scan(args, &config).await?,
    }

    Ok(())
}
