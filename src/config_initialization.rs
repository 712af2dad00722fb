//! Configuration initialization and hierarchy management

use std::path::{Path, PathBuf};

use tracing::info;

use crate::adapters::toml_config::{load_config, RipConfig};
use crate::cli::Cli;
use crate::error::RipResult;

/// Build the configuration following precedence: CLI > Env > File > Defaults.
///
/// Environment variables reach here through clap, so only the file and the
/// global command-line overrides are handled. Empty values count as unset.
pub fn initialize_configuration(cli: &Cli) -> RipResult<RipConfig> {
    let explicit = cli.config.as_deref().filter(|p| !is_empty_path(p));
    let mut config = load_config(explicit)?;

    if apply_cli_configuration_overrides(&mut config, cli) > 0 {
        config.validate()?;
    }

    Ok(config)
}

/// Apply global CLI overrides, returning how many were applied
fn apply_cli_configuration_overrides(config: &mut RipConfig, cli: &Cli) -> usize {
    let mut cli_overrides = 0;

    if let Some(bin) = cli.handbrake_bin.as_ref().filter(|b| !b.is_empty()) {
        info!("CLI override: handbrake_bin = {}", bin);
        config.handbrake_bin = bin.clone();
        cli_overrides += 1;
    }

    cli_overrides
}

/// Device given on the command line, else the configured one
pub fn resolve_device(arg: Option<PathBuf>, config: &RipConfig) -> PathBuf {
    arg.filter(|p| !is_empty_path(p))
        .unwrap_or_else(|| config.device.clone())
}

/// Template given on the command line, else the configured one
pub fn resolve_episode_name_format(arg: Option<String>, config: &RipConfig) -> String {
    arg.filter(|f| !f.is_empty())
        .unwrap_or_else(|| config.episode_name_format.clone())
}

fn is_empty_path(path: &Path) -> bool {
    path.as_os_str().is_empty()
}
