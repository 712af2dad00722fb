//! Progress reporting for scans and transcodes

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use tracing::info;

use crate::domain::model::ProgressEvent;

/// Step between two progress log lines, in percent
const LOG_STEP_PERCENT: u64 = 10;

/// What is currently being reported on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    /// Scan of the whole disc
    DiscScan,
    /// Transcode of one title
    Transcode { title_index: u32, file_name: String },
}

impl Stage {
    /// Short description for logs
    pub fn describe(&self) -> String {
        match self {
            Stage::DiscScan => "Scanning disc".to_string(),
            Stage::Transcode {
                title_index,
                file_name,
            } => format!("Title {} -> {}", title_index, file_name),
        }
    }
}

/// Receiver of progress updates
pub trait ProgressObserver: Send {
    /// A stage starts
    fn begin(&mut self, stage: &Stage);

    /// Disc scan progress, fraction in [0, 1]
    fn scan_progress(&mut self, fraction: f64);

    /// Progress of the running transcode
    fn transcode_progress(&mut self, event: &ProgressEvent);

    /// The current stage is over
    fn end(&mut self, success: bool);
}

fn to_percent(fraction: f64) -> u64 {
    (fraction.clamp(0.0, 1.0) * 100.0).round() as u64
}

/// Console progress bars
///
/// The disc scan shows one "Scanning" bar. Each transcode shows a
/// "Scanning" bar for HandBrake's title scan and a "Transcoding" bar; the
/// first is shown full as soon as encoding starts.
pub struct BarProgress {
    multi: MultiProgress,
    scanning: Option<ProgressBar>,
    transcoding: Option<ProgressBar>,
}

impl BarProgress {
    /// Create bars drawing to stderr
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            scanning: None,
            transcoding: None,
        }
    }

    fn add_bar(&self, label: &'static str) -> ProgressBar {
        let style =
            ProgressStyle::with_template("{msg:>12} [{elapsed_precise}] {wide_bar} {pos:>3}%")
                .unwrap_or_else(|_| ProgressStyle::default_bar());
        let bar = self.multi.add(ProgressBar::new(100));
        bar.set_style(style);
        bar.set_message(label);
        bar
    }
}

impl Default for BarProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressObserver for BarProgress {
    fn begin(&mut self, stage: &Stage) {
        self.scanning = Some(self.add_bar("Scanning"));
        self.transcoding = match stage {
            Stage::DiscScan => None,
            Stage::Transcode { .. } => Some(self.add_bar("Transcoding")),
        };
    }

    fn scan_progress(&mut self, fraction: f64) {
        if let Some(bar) = &self.scanning {
            bar.set_position(to_percent(fraction));
        }
    }

    fn transcode_progress(&mut self, event: &ProgressEvent) {
        if let Some(bar) = &self.scanning {
            bar.set_position(to_percent(event.scanning_fraction()));
        }
        if let (Some(bar), Some(fraction)) = (&self.transcoding, event.working_fraction()) {
            bar.set_position(to_percent(fraction));
        }
    }

    fn end(&mut self, success: bool) {
        for bar in [self.scanning.take(), self.transcoding.take()].into_iter().flatten() {
            if success {
                bar.finish();
            } else {
                bar.abandon();
            }
        }
    }
}

/// Progress written to the log every ten percent
#[derive(Debug, Default)]
pub struct LogProgress {
    stage: Option<String>,
    last_scanning: Option<u64>,
    last_working: Option<u64>,
}

impl LogProgress {
    /// Create a log reporter
    pub fn new() -> Self {
        Self::default()
    }

    fn report(stage: &str, label: &str, last: &mut Option<u64>, fraction: f64) {
        let step = to_percent(fraction) / LOG_STEP_PERCENT * LOG_STEP_PERCENT;
        if last.map_or(true, |previous| step > previous) {
            *last = Some(step);
            info!("{}: {} {}%", stage, label, step);
        }
    }
}

impl ProgressObserver for LogProgress {
    fn begin(&mut self, stage: &Stage) {
        let description = stage.describe();
        info!("{}", description);
        self.stage = Some(description);
        self.last_scanning = None;
        self.last_working = None;
    }

    fn scan_progress(&mut self, fraction: f64) {
        let stage = self.stage.as_deref().unwrap_or("Scan");
        Self::report(stage, "scanning", &mut self.last_scanning, fraction);
    }

    fn transcode_progress(&mut self, event: &ProgressEvent) {
        let stage = self.stage.as_deref().unwrap_or("Transcode");
        Self::report(stage, "scanning", &mut self.last_scanning, event.scanning_fraction());
        if let Some(fraction) = event.working_fraction() {
            Self::report(stage, "transcoding", &mut self.last_working, fraction);
        }
    }

    fn end(&mut self, success: bool) {
        if let Some(stage) = self.stage.take() {
            info!("{} {}", stage, if success { "completed" } else { "failed" });
        }
    }
}
