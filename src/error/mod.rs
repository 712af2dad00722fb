//! Error handling module for dvdrip

use thiserror::Error;

/// Main error type for dvdrip operations
///
/// Every fatal condition of a rip surfaces as one of these variants. The
/// binary maps all of them to a one-line message and a non-zero exit code.
#[derive(Error, Debug)]
pub enum RipError {
    /// A framed message was found in the tool output but its body is not valid JSON
    #[error("Cannot decode JSON output of message '{name}': {source}")]
    Decode {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    /// The external tool exited with a non-zero status
    #[error("{program} exited with {status}\n{diagnostics}")]
    ProcessFailed {
        program: String,
        status: String,
        diagnostics: String,
    },

    /// The external tool could not be started
    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Some requested titles do not exist on the disc
    #[error("Titles not found: {}", format_indices(.missing))]
    TitlesNotFound { missing: Vec<u32> },

    /// The scan completed without ever emitting its result message
    #[error("Could not find scan output")]
    MissingScanResult,

    /// The scan result message does not have the expected shape
    #[error("Unexpected scan output: {0}")]
    InvalidScanResult(#[source] serde_json::Error),

    /// Bad title map entry on the command line
    #[error("Title map should be of format '{{title_id}}={{title_name}}', by example '1=S02E04' (got '{0}')")]
    InvalidTitleMap(String),

    /// Bad episode name template
    #[error("Invalid episode name format '{template}': {reason}")]
    InvalidTemplate { template: String, reason: String },

    /// Configuration file could not be read or validated
    #[error("Configuration error: {0}")]
    Config(String),

    /// The user interrupted the run
    #[error("Interrupted")]
    Interrupted,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RipError {
    /// True when the error comes from a user interruption rather than a failure
    pub fn is_interrupted(&self) -> bool {
        matches!(self, RipError::Interrupted)
    }
}

fn format_indices(indices: &[u32]) -> String {
    let parts: Vec<String> = indices.iter().map(|i| i.to_string()).collect();
    format!("{{{}}}", parts.join(", "))
}

/// Result type alias for dvdrip operations
pub type RipResult<T> = std::result::Result<T, RipError>;
