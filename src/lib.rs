//! dvdrip library
//!
//! Rips DVD titles into episode files by driving HandBrakeCLI: scan the
//! disc, check the requested titles exist, transcode each of them while
//! following the tool's JSON progress output, then eject.

pub mod adapters;
pub mod app;
pub mod cli;
pub mod config_initialization;
pub mod domain;
pub mod engine;
pub mod error;
pub mod ports;
pub mod streams;
pub mod utils;

// Re-export commonly used types
pub use domain::model::{PlannedOutput, RipReport, ScanResult, StructuredMessage, TitleRequest};
pub use error::{RipError, RipResult};
pub use streams::StreamMessageParser;
