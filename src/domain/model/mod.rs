// Domain models - Core types and data structures

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{RipError, RipResult};


/// Name of the message carrying the scan result
pub const TITLE_SET_MESSAGE: &str = "JSON Title Set";

/// Name of the messages carrying progress updates
pub const PROGRESS_MESSAGE: &str = "Progress";

/// One decoded named block from the transcoder's JSON output
///
/// HandBrakeCLI prints blocks such as `Progress: { ... }` while it runs; the
/// name is the text before the colon and the payload is the decoded object.
#[derive(Debug, Clone, PartialEq)]
pub struct StructuredMessage {
    pub name: String,
    pub payload: Value,
}

impl StructuredMessage {
    /// Create a new message
    pub fn new(name: impl Into<String>, payload: Value) -> Self {
        Self {
            name: name.into(),
            payload,
        }
    }

    /// True when the message has the given name
    pub fn is(&self, name: &str) -> bool {
        self.name == name
    }
}

/// Result of a disc scan, as found in the `JSON Title Set` message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ScanResult {
    #[serde(rename = "TitleList")]
    pub titles: Vec<TitleInfo>,
}

impl ScanResult {
    /// Decode a scan result from a message payload
    pub fn from_payload(payload: Value) -> RipResult<Self> {
        serde_json::from_value(payload).map_err(RipError::InvalidScanResult)
    }

    /// Look a title up by index. The last record wins if the disc repeats an index.
    pub fn title(&self, index: u32) -> Option<&TitleInfo> {
        self.titles.iter().rev().find(|t| t.index == index)
    }

    /// All title indices present on the disc
    pub fn indices(&self) -> BTreeSet<u32> {
        self.titles.iter().map(|t| t.index).collect()
    }
}

/// A title record from the scan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TitleInfo {
    pub index: u32,
    #[serde(default)]
    pub subtitle_list: Vec<SubtitleTrack>,
    #[serde(default)]
    pub duration: Option<TitleDuration>,
}

impl TitleInfo {
    /// Distinct subtitle language codes of the title, sorted
    pub fn subtitle_languages(&self) -> BTreeSet<String> {
        self.subtitle_list
            .iter()
            .map(|s| s.language_code.clone())
            .collect()
    }
}

/// Subtitle track of a title
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SubtitleTrack {
    pub language_code: String,
}

/// Duration of a title as reported by the scan
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TitleDuration {
    #[serde(default)]
    pub hours: u32,
    #[serde(default)]
    pub minutes: u32,
    #[serde(default)]
    pub seconds: u32,
}

impl fmt::Display for TitleDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:02}:{:02}", self.hours, self.minutes, self.seconds)
    }
}

/// Mapping of one DVD title to an episode label, from the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleRequest {
    pub title_index: u32,
    pub episode_label: String,
}

impl TitleRequest {
    /// Create a new title request
    pub fn new(title_index: u32, episode_label: impl Into<String>) -> Self {
        Self {
            title_index,
            episode_label: episode_label.into(),
        }
    }

    /// Parse `"<title_id>=<episode>"`, e.g. `"1=S02E04"`
    pub fn parse(value: &str) -> RipResult<Self> {
        let (title, label) = value
            .split_once('=')
            .ok_or_else(|| RipError::InvalidTitleMap(value.to_string()))?;

        let title_index = title
            .trim()
            .parse::<u32>()
            .map_err(|_| RipError::InvalidTitleMap(value.to_string()))?;

        Ok(Self::new(title_index, label))
    }
}

impl FromStr for TitleRequest {
    type Err = RipError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Phase reported by a transcode progress message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressPhase {
    /// The tool is scanning the title before encoding
    Scanning,
    /// The tool is encoding
    Working,
}

impl ProgressPhase {
    /// Value of the `State` field for this phase
    pub fn state(&self) -> &'static str {
        match self {
            ProgressPhase::Scanning => "SCANNING",
            ProgressPhase::Working => "WORKING",
        }
    }

    /// Key of the nested object holding this phase's progress
    pub fn section(&self) -> &'static str {
        match self {
            ProgressPhase::Scanning => "Scanning",
            ProgressPhase::Working => "Working",
        }
    }
}

/// Progress of the current transcode phase
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressEvent {
    pub phase: ProgressPhase,
    /// Completion of the phase in [0, 1]
    pub fraction: f64,
}

impl ProgressEvent {
    /// Classify a `Progress` payload. States other than SCANNING and WORKING yield `None`.
    pub fn from_payload(payload: &Value) -> Option<Self> {
        let phase = match payload.get("State")?.as_str()? {
            "SCANNING" => ProgressPhase::Scanning,
            "WORKING" => ProgressPhase::Working,
            _ => return None,
        };

        Some(Self {
            phase,
            fraction: section_fraction(payload, phase.section()).unwrap_or(0.0),
        })
    }

    /// Fraction the scanning bar should show for this event.
    ///
    /// Once the tool reports WORKING the scanning phase is over, so the
    /// scanning bar is shown full.
    pub fn scanning_fraction(&self) -> f64 {
        match self.phase {
            ProgressPhase::Scanning => self.fraction,
            ProgressPhase::Working => 1.0,
        }
    }

    /// Fraction the transcoding bar should show for this event, if any
    pub fn working_fraction(&self) -> Option<f64> {
        match self.phase {
            ProgressPhase::Scanning => None,
            ProgressPhase::Working => Some(self.fraction),
        }
    }
}

/// Read `payload[section]["Progress"]` as a fraction clamped to [0, 1]
pub fn section_fraction(payload: &Value, section: &str) -> Option<f64> {
    payload
        .get(section)?
        .get("Progress")?
        .as_f64()
        .map(|p| p.clamp(0.0, 1.0))
}

/// Everything needed to produce one output file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedOutput {
    /// Directory the file is written to
    pub dir_path: PathBuf,
    /// Full path of the file
    pub file_path: PathBuf,
    /// File name without the directory
    pub file_name: String,
    /// DVD title used as input
    pub title_index: u32,
    /// Subtitle languages to keep
    pub subtitle_languages: BTreeSet<String>,
}

/// Outcome of a complete rip
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RipReport {
    pub outputs: Vec<PlannedOutput>,
    pub ejected: bool,
}
