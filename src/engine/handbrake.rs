//! HandBrakeCLI wrapper
//!
//! Builds the command lines for the disc scan and for transcoding one
//! title, runs them through a [`ProcessLauncher`] and exposes the output as
//! [`ProcessSession`]s. Ejecting the disc also lives here since it happens
//! right after the last transcode.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::adapters::toml_config::{EncodeProfile, RipConfig};
use crate::domain::model::PROGRESS_MESSAGE;
use crate::engine::session::{ProcessSession, SessionState, DEFAULT_STDERR_TAIL_LINES};
use crate::error::RipResult;
use crate::ports::ProcessLauncher;

/// Default name of the HandBrake command-line binary
pub const DEFAULT_BIN_NAME: &str = "HandBrakeCLI";

/// Default eject program
pub const DEFAULT_EJECT_BIN: &str = "eject";

/// Utility wrapping the HandBrakeCLI program
pub struct HandBrake {
    launcher: Arc<dyn ProcessLauncher>,
    bin_name: String,
    eject_bin: String,
    profile: EncodeProfile,
    stderr_tail_lines: usize,
}

impl HandBrake {
    /// Create a wrapper with the default binary and encoder settings
    pub fn new(launcher: Arc<dyn ProcessLauncher>) -> Self {
        Self {
            launcher,
            bin_name: DEFAULT_BIN_NAME.to_string(),
            eject_bin: DEFAULT_EJECT_BIN.to_string(),
            profile: EncodeProfile::default(),
            stderr_tail_lines: DEFAULT_STDERR_TAIL_LINES,
        }
    }

    /// Create a wrapper using the programs and settings of `config`
    pub fn from_config(launcher: Arc<dyn ProcessLauncher>, config: &RipConfig) -> Self {
        Self {
            launcher,
            bin_name: config.handbrake_bin.clone(),
            eject_bin: config.eject_bin.clone(),
            profile: config.encode.clone(),
            stderr_tail_lines: config.stderr_tail_lines,
        }
    }

    /// Use another HandBrakeCLI binary
    pub fn with_bin_name(mut self, bin_name: impl Into<String>) -> Self {
        self.bin_name = bin_name.into();
        self
    }

    /// Use another eject program
    pub fn with_eject_bin(mut self, eject_bin: impl Into<String>) -> Self {
        self.eject_bin = eject_bin.into();
        self
    }

    /// Full argument list: JSON output is always switched on
    pub fn make_args(&self, args: Vec<String>) -> Vec<String> {
        let mut full = Vec::with_capacity(args.len() + 1);
        full.push("--json".to_string());
        full.extend(args);
        full
    }

    /// Arguments of a scan of every title
    pub fn scan_args(&self, device: &Path) -> Vec<String> {
        self.make_args(vec![
            "--scan".to_string(),
            "-t".to_string(),
            "0".to_string(),
            "-i".to_string(),
            device.display().to_string(),
        ])
    }

    /// Arguments transcoding one title into `output`.
    ///
    /// HandBrake only copies subtitles whose language is listed, so the
    /// languages found by the scan are passed along.
    pub fn transcode_args(
        &self,
        device: &Path,
        output: &Path,
        title_index: u32,
        subtitle_languages: &BTreeSet<String>,
    ) -> Vec<String> {
        let profile = &self.profile;
        let mut args = vec![
            "--title".to_string(),
            title_index.to_string(),
            "--format".to_string(),
            profile.format.clone(),
        ];

        if profile.optimize {
            args.push("--optimize".to_string());
        }

        args.extend([
            "--encoder".to_string(),
            profile.encoder.clone(),
            "--encoder-preset".to_string(),
            profile.encoder_preset.clone(),
            "--encoder-tune".to_string(),
            profile.encoder_tune.clone(),
            "--quality".to_string(),
            profile.quality.to_string(),
        ]);

        if profile.two_pass {
            args.push("--two-pass".to_string());
            if profile.turbo {
                args.push("--turbo".to_string());
            }
        }

        let languages: Vec<&str> = subtitle_languages.iter().map(String::as_str).collect();
        args.extend([
            "--all-audio".to_string(),
            "--aencoder".to_string(),
            profile.audio_encoder.clone(),
            "--subtitle-lang-list".to_string(),
            languages.join(","),
            "--all-subtitles".to_string(),
            "-i".to_string(),
            device.display().to_string(),
            "-o".to_string(),
            output.display().to_string(),
        ]);

        self.make_args(args)
    }

    async fn run(&self, args: Vec<String>) -> RipResult<ProcessSession> {
        debug!("Running: {} {}", self.bin_name, args.join(" "));
        let process = self.launcher.launch(&self.bin_name, &args).await?;
        Ok(ProcessSession::start(
            self.bin_name.clone(),
            process,
            self.stderr_tail_lines,
        ))
    }

    /// Scan every title of the disc.
    ///
    /// The session yields all messages. The scan result comes as
    /// `JSON Title Set` and progress as `Progress` with `Scanning.Progress`.
    pub async fn scan(&self, device: &Path) -> RipResult<ProcessSession> {
        self.run(self.scan_args(device)).await
    }

    /// Transcode one title into `output`, yielding its progress payloads
    pub async fn transcode(
        &self,
        device: &Path,
        output: &Path,
        title_index: u32,
        subtitle_languages: &BTreeSet<String>,
    ) -> RipResult<TranscodeSession> {
        let args = self.transcode_args(device, output, title_index, subtitle_languages);
        Ok(TranscodeSession {
            session: self.run(args).await?,
        })
    }

    /// Eject the disc.
    ///
    /// Best effort: the device may be an image, or the command may be
    /// missing. Failure is logged and reported as `false`, never raised.
    pub async fn eject(&self, device: &Path) -> bool {
        let args = vec![device.display().to_string()];

        match self.launcher.status(&self.eject_bin, &args).await {
            Ok(exit) if exit.success() => true,
            Ok(exit) => {
                warn!(%exit, "Could not eject DVD");
                false
            }
            Err(e) => {
                warn!(error = %e, "Could not eject DVD");
                false
            }
        }
    }
}

/// Transcode run that only yields `Progress` payloads
pub struct TranscodeSession {
    session: ProcessSession,
}

impl TranscodeSession {
    /// Next progress payload; other messages are dropped
    pub async fn next_progress(&mut self) -> RipResult<Option<Value>> {
        while let Some(message) = self.session.next_message().await? {
            if message.is(PROGRESS_MESSAGE) {
                return Ok(Some(message.payload));
            }
        }
        Ok(None)
    }

    /// State of the underlying process session
    pub fn state(&self) -> SessionState {
        self.session.state()
    }
}
