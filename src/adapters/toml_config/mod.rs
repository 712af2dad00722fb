// TOML config adapter - Configuration management using TOML files

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::domain::rules::{render_episode_name, DEFAULT_EPISODE_NAME_FORMAT};
use crate::engine::session::DEFAULT_STDERR_TAIL_LINES;
use crate::error::{RipError, RipResult};

/// Name of the configuration file looked up in the default locations
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Settings of a rip, as read from the configuration file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RipConfig {
    /// HandBrakeCLI binary
    pub handbrake_bin: String,
    /// Program used to eject the disc
    pub eject_bin: String,
    /// DVD device read when none is given on the command line
    pub device: PathBuf,
    /// Template of episode file names
    pub episode_name_format: String,
    /// Lines of stderr kept to explain a failed run
    pub stderr_tail_lines: usize,
    /// Encoder settings
    pub encode: EncodeProfile,
}

impl Default for RipConfig {
    fn default() -> Self {
        Self {
            handbrake_bin: "HandBrakeCLI".to_string(),
            eject_bin: "eject".to_string(),
            device: PathBuf::from("/dev/dvd"),
            episode_name_format: DEFAULT_EPISODE_NAME_FORMAT.to_string(),
            stderr_tail_lines: DEFAULT_STDERR_TAIL_LINES,
            encode: EncodeProfile::default(),
        }
    }
}

/// Encoder settings passed to HandBrakeCLI
///
/// The defaults give a DVD rip of identical quality that current players
/// read without trouble: x264 at RF 18, two passes, original AC3 audio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EncodeProfile {
    pub format: String,
    pub optimize: bool,
    pub encoder: String,
    pub encoder_preset: String,
    pub encoder_tune: String,
    pub quality: f64,
    pub two_pass: bool,
    pub turbo: bool,
    pub audio_encoder: String,
}

impl Default for EncodeProfile {
    fn default() -> Self {
        Self {
            format: "av_mkv".to_string(),
            optimize: true,
            encoder: "x264".to_string(),
            encoder_preset: "medium".to_string(),
            encoder_tune: "film".to_string(),
            quality: 18.0,
            two_pass: true,
            turbo: true,
            audio_encoder: "copy:ac3".to_string(),
        }
    }
}

impl RipConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> RipResult<Self> {
        let config: RipConfig = toml::from_str(content)
            .map_err(|e| RipError::Config(format!("Failed to parse TOML config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to TOML
    pub fn to_toml_string(&self) -> RipResult<String> {
        toml::to_string_pretty(self)
            .map_err(|e| RipError::Config(format!("Failed to serialize config: {}", e)))
    }

    /// Validate configuration
    pub fn validate(&self) -> RipResult<()> {
        if self.handbrake_bin.trim().is_empty() {
            return Err(RipError::Config("handbrake_bin cannot be empty".to_string()));
        }
        if self.eject_bin.trim().is_empty() {
            return Err(RipError::Config("eject_bin cannot be empty".to_string()));
        }
        if self.stderr_tail_lines == 0 {
            return Err(RipError::Config(
                "stderr_tail_lines must be at least 1".to_string(),
            ));
        }
        if !(0.0..=51.0).contains(&self.encode.quality) {
            return Err(RipError::Config(format!(
                "quality must be between 0 and 51, got {}",
                self.encode.quality
            )));
        }
        render_episode_name(&self.episode_name_format, "name", "episode")
            .map_err(|e| RipError::Config(e.to_string()))?;

        Ok(())
    }
}

/// Default config file locations, most specific first
pub fn default_config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Some(dir) = std::env::var_os("XDG_CONFIG_HOME").filter(|d| !d.is_empty()) {
        paths.push(PathBuf::from(dir).join("dvdrip").join(CONFIG_FILE_NAME));
    }
    if let Some(home) = std::env::var_os("HOME").filter(|h| !h.is_empty()) {
        paths.push(
            PathBuf::from(home)
                .join(".config")
                .join("dvdrip")
                .join(CONFIG_FILE_NAME),
        );
    }
    paths.push(PathBuf::from("dvdrip.toml"));

    paths
}

/// Read and validate a config file
pub fn load_config_file(path: &Path) -> RipResult<RipConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        RipError::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;
    RipConfig::from_toml_str(&content)
}

/// Load the configuration.
///
/// An explicit path must exist. Without one, the first existing default
/// location is used, and built-in defaults apply when there is none.
pub fn load_config(explicit: Option<&Path>) -> RipResult<RipConfig> {
    if let Some(path) = explicit {
        info!("Loading configuration from: {}", path.display());
        return load_config_file(path);
    }

    for path in default_config_paths() {
        if path.is_file() {
            info!("Loading configuration from: {}", path.display());
            return load_config_file(&path);
        }
    }

    debug!("No configuration file found, using defaults");
    Ok(RipConfig::default())
}
