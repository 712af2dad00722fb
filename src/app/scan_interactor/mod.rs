// Scan interactor - Orchestrates the disc scan use case

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, trace};

use crate::domain::model::*;
use crate::engine::handbrake::HandBrake;
use crate::engine::progress::{ProgressObserver, Stage};
use crate::error::{RipError, RipResult};

/// Disc scan request
#[derive(Debug, Clone)]
pub struct ScanRequest {
    pub device: PathBuf,
}

/// Interactor for the disc scan use case
pub struct ScanInteractor {
    handbrake: Arc<HandBrake>,
}

impl ScanInteractor {
    /// Create new scan interactor
    pub fn new(handbrake: Arc<HandBrake>) -> Self {
        Self { handbrake }
    }

    /// Scan the disc and return its titles
    pub async fn execute(
        &self,
        request: &ScanRequest,
        observer: &mut dyn ProgressObserver,
    ) -> RipResult<ScanResult> {
        info!("Analyzing DVD");
        observer.begin(&Stage::DiscScan);
        let result = self.collect(request, observer).await;
        observer.end(result.is_ok());

        let scan = result?;
        info!("Found {} titles", scan.titles.len());
        Ok(scan)
    }

    /// Drain the scan session, keeping the title set and forwarding progress
    async fn collect(
        &self,
        request: &ScanRequest,
        observer: &mut dyn ProgressObserver,
    ) -> RipResult<ScanResult> {
        let mut session = self.handbrake.scan(&request.device).await?;
        let mut title_set = None;

        while let Some(message) = session.next_message().await? {
            match message.name.as_str() {
                TITLE_SET_MESSAGE => title_set = Some(message.payload),
                PROGRESS_MESSAGE => {
                    if let Some(fraction) = section_fraction(&message.payload, "Scanning") {
                        observer.scan_progress(fraction);
                    }
                }
                other => trace!(name = other, "ignoring message"),
            }
        }

        let payload = title_set.ok_or(RipError::MissingScanResult)?;
        ScanResult::from_payload(payload)
    }

    /// Format the scan result as JSON
    pub fn format_as_json(scan: &ScanResult) -> RipResult<String> {
        serde_json::to_string_pretty(scan).map_err(RipError::InvalidScanResult)
    }

    /// Format the scan result as human-readable text
    pub fn format_as_text(scan: &ScanResult) -> String {
        let mut output = String::new();
        output.push_str(&format!("Titles ({}):\n", scan.titles.len()));

        for title in &scan.titles {
            let duration = title
                .duration
                .as_ref()
                .map(|d| d.to_string())
                .unwrap_or_else(|| "?:??:??".to_string());
            let languages: Vec<String> = title.subtitle_languages().into_iter().collect();
            let subtitles = if languages.is_empty() {
                "none".to_string()
            } else {
                languages.join(", ")
            };

            output.push_str(&format!(
                "  Title {:>2}: {}  subtitles: {}\n",
                title.index, duration, subtitles
            ));
        }

        output
    }
}
