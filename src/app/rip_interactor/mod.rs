// Rip interactor - Orchestrates the scan, validate, transcode and eject use case

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use crate::app::scan_interactor::{ScanInteractor, ScanRequest};
use crate::domain::model::*;
use crate::domain::rules;
use crate::engine::handbrake::HandBrake;
use crate::engine::progress::{ProgressObserver, Stage};
use crate::error::RipResult;

/// Rip request
#[derive(Debug, Clone)]
pub struct RipRequest {
    /// DVD device or image
    pub device: PathBuf,
    /// Directory receiving the episodes
    pub output_dir: PathBuf,
    /// Series name, used by `{name}`
    pub series_name: String,
    /// Episode file name template
    pub episode_name_format: String,
    /// Titles to rip, in order
    pub titles: Vec<TitleRequest>,
    /// Eject the disc once done
    pub eject: bool,
}

/// Interactor for the rip use case
pub struct RipInteractor {
    handbrake: Arc<HandBrake>,
    scanner: ScanInteractor,
}

impl RipInteractor {
    /// Create new rip interactor
    pub fn new(handbrake: Arc<HandBrake>) -> Self {
        Self {
            scanner: ScanInteractor::new(Arc::clone(&handbrake)),
            handbrake,
        }
    }

    /// Execute the rip.
    ///
    /// Stops at the first failing transcode. Outputs already written stay on
    /// disk; the disc is only ejected after every title succeeded.
    pub async fn execute(
        &self,
        request: &RipRequest,
        observer: &mut dyn ProgressObserver,
    ) -> RipResult<RipReport> {
        // Fail on a bad template before spending minutes on the scan
        rules::render_episode_name(&request.episode_name_format, &request.series_name, "")?;

        let scan = self
            .scanner
            .execute(
                &ScanRequest {
                    device: request.device.clone(),
                },
                observer,
            )
            .await?;

        rules::check_consistency(&scan, &request.titles)?;
        let outputs = rules::plan_outputs(
            &scan,
            &request.titles,
            &request.output_dir,
            &request.series_name,
            &request.episode_name_format,
        )?;

        for output in &outputs {
            self.transcode(request, output, observer).await?;
        }

        let ejected = if request.eject {
            info!("Ejecting DVD");
            self.handbrake.eject(&request.device).await
        } else {
            false
        };

        Ok(RipReport { outputs, ejected })
    }

    async fn transcode(
        &self,
        request: &RipRequest,
        output: &PlannedOutput,
        observer: &mut dyn ProgressObserver,
    ) -> RipResult<()> {
        tokio::fs::create_dir_all(&output.dir_path).await?;

        observer.begin(&Stage::Transcode {
            title_index: output.title_index,
            file_name: output.file_name.clone(),
        });
        let result = self.follow_transcode(request, output, observer).await;
        observer.end(result.is_ok());

        if let Err(e) = &result {
            warn!(title = output.title_index, error = %e, "Transcode failed");
        }
        result
    }

    async fn follow_transcode(
        &self,
        request: &RipRequest,
        output: &PlannedOutput,
        observer: &mut dyn ProgressObserver,
    ) -> RipResult<()> {
        let mut session = self
            .handbrake
            .transcode(
                &request.device,
                &output.file_path,
                output.title_index,
                &output.subtitle_languages,
            )
            .await?;

        while let Some(payload) = session.next_progress().await? {
            if let Some(event) = ProgressEvent::from_payload(&payload) {
                observer.transcode_progress(&event);
            }
        }

        info!("Wrote {}", output.file_path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mock_process::{MockProcess, MockProcessLauncher};
    use crate::error::RipError;
    use crate::ports::{ProcessExit, ProcessLauncher};
    use tempfile::TempDir;

    #[derive(Default)]
    struct RecordingObserver {
        stages: Vec<Stage>,
        events: Vec<ProgressEvent>,
        ended: Vec<bool>,
    }

    impl ProgressObserver for RecordingObserver {
        fn begin(&mut self, stage: &Stage) {
            self.stages.push(stage.clone());
        }
        fn scan_progress(&mut self, _fraction: f64) {}
        fn transcode_progress(&mut self, event: &ProgressEvent) {
            self.events.push(*event);
        }
        fn end(&mut self, success: bool) {
            self.ended.push(success);
        }
    }

    const SCAN_OUTPUT: &str = concat!(
        "JSON Title Set: {\n    \"TitleList\": [\n",
        "        {\"Index\": 1, \"SubtitleList\": [",
        "{\"LanguageCode\": \"en\"}, {\"LanguageCode\": \"en\"}, {\"LanguageCode\": \"fr\"}",
        "]},\n",
        "        {\"Index\": 2, \"SubtitleList\": []},\n",
        "        {\"Index\": 3, \"SubtitleList\": [{\"LanguageCode\": \"de\"}]}\n",
        "    ]\n}\n",
    );

    const TRANSCODE_OUTPUT: &str = concat!(
        "Progress: {\n    \"State\": \"SCANNING\",\n",
        "    \"Scanning\": {\n        \"Progress\": 0.5\n    }\n}\n",
        "Progress: {\n    \"State\": \"WORKING\",\n",
        "    \"Working\": {\n        \"Progress\": 0.75\n    }\n}\n",
        "Progress: {\n    \"State\": \"MUXING\",\n",
        "    \"Muxing\": {\n        \"Progress\": 0.0\n    }\n}\n",
    );

    fn interactor(launcher: &Arc<MockProcessLauncher>) -> RipInteractor {
        let launcher = Arc::clone(launcher) as Arc<dyn ProcessLauncher>;
        RipInteractor::new(Arc::new(HandBrake::new(launcher)))
    }

    fn request(output_dir: PathBuf, titles: &[(u32, &str)]) -> RipRequest {
        RipRequest {
            device: PathBuf::from("/dev/dvd"),
            output_dir,
            series_name: "Foo".to_string(),
            episode_name_format: rules::DEFAULT_EPISODE_NAME_FORMAT.to_string(),
            titles: titles
                .iter()
                .map(|(index, label)| TitleRequest::new(*index, *label))
                .collect(),
            eject: true,
        }
    }

    #[tokio::test]
    async fn test_rip_transcodes_each_title_and_ejects() {
        let temp_dir = TempDir::new().unwrap();
        let output_dir = temp_dir.path().join("season 1");
        let launcher = Arc::new(
            MockProcessLauncher::succeeding()
                .with_process(MockProcess::new().stdout_in_chunks(SCAN_OUTPUT, 9))
                .with_process(MockProcess::new().stdout_in_chunks(TRANSCODE_OUTPUT, 4))
                .with_process(MockProcess::new().stdout(TRANSCODE_OUTPUT)),
        );
        let mut observer = RecordingObserver::default();

        let report = interactor(&launcher)
            .execute(
                &request(output_dir.clone(), &[(1, "S01E01"), (3, "S01E02")]),
                &mut observer,
            )
            .await
            .unwrap();

        assert!(report.ejected);
        assert_eq!(report.outputs.len(), 2);
        assert_eq!(report.outputs[0].file_name, "Foo — DVDRip — S01E01.mkv");
        assert_eq!(
            report.outputs[0].subtitle_languages.iter().collect::<Vec<_>>(),
            vec!["en", "fr"]
        );
        assert!(output_dir.is_dir());

        let invocations = launcher.invocations();
        assert_eq!(invocations.len(), 4);
        assert!(invocations[0].args.contains(&"--scan".to_string()));
        let title_at = invocations[2].args.iter().position(|a| a == "--title").unwrap();
        assert_eq!(invocations[2].args[title_at + 1], "3");
        assert_eq!(invocations[3].program, "eject");

        assert_eq!(observer.stages.len(), 3);
        assert_eq!(observer.stages[0], Stage::DiscScan);
        assert_eq!(observer.ended, vec![true, true, true]);
        // MUXING is not reported
        assert_eq!(observer.events.len(), 4);
        assert_eq!(observer.events[1].phase, ProgressPhase::Working);
    }

    #[tokio::test]
    async fn test_missing_titles_stop_before_transcoding() {
        let temp_dir = TempDir::new().unwrap();
        let launcher = Arc::new(
            MockProcessLauncher::succeeding().with_process(MockProcess::new().stdout(SCAN_OUTPUT)),
        );

        let err = interactor(&launcher)
            .execute(
                &request(temp_dir.path().to_path_buf(), &[(5, "S01E05"), (1, "S01E01")]),
                &mut RecordingObserver::default(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, RipError::TitlesNotFound { ref missing } if missing == &vec![5]));
        assert_eq!(err.to_string(), "Titles not found: {5}");
        assert_eq!(launcher.invocations().len(), 1);
    }

    #[tokio::test]
    async fn test_bad_template_fails_before_scanning() {
        let temp_dir = TempDir::new().unwrap();
        let launcher = Arc::new(MockProcessLauncher::succeeding());
        let mut rip = request(temp_dir.path().to_path_buf(), &[(1, "S01E01")]);
        rip.episode_name_format = "{season}".to_string();

        let err = interactor(&launcher)
            .execute(&rip, &mut RecordingObserver::default())
            .await
            .unwrap_err();

        assert!(matches!(err, RipError::InvalidTemplate { .. }));
        assert!(launcher.invocations().is_empty());
    }

    #[tokio::test]
    async fn test_failed_transcode_stops_the_rip() {
        let temp_dir = TempDir::new().unwrap();
        let launcher = Arc::new(
            MockProcessLauncher::succeeding()
                .with_process(MockProcess::new().stdout(SCAN_OUTPUT))
                .with_process(
                    MockProcess::new()
                        .stdout(TRANSCODE_OUTPUT)
                        .stderr("x264 [error]: malloc failed\n")
                        .exit_code(1),
                ),
        );
        let mut observer = RecordingObserver::default();

        let err = interactor(&launcher)
            .execute(
                &request(temp_dir.path().to_path_buf(), &[(1, "S01E01"), (2, "S01E02")]),
                &mut observer,
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            RipError::ProcessFailed { ref diagnostics, .. }
                if diagnostics == "x264 [error]: malloc failed"
        ));
        assert_eq!(observer.ended, vec![true, false]);
        // Neither the second title nor the eject ran
        assert_eq!(launcher.invocations().len(), 2);
    }

    #[tokio::test]
    async fn test_eject_failure_is_not_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let launcher = Arc::new(
            MockProcessLauncher::new()
                .with_status(Some(ProcessExit::with_code(1)))
                .with_process(MockProcess::new().stdout(SCAN_OUTPUT))
                .with_process(MockProcess::new().stdout(TRANSCODE_OUTPUT)),
        );

        let report = interactor(&launcher)
            .execute(
                &request(temp_dir.path().to_path_buf(), &[(2, "S01E01")]),
                &mut RecordingObserver::default(),
            )
            .await
            .unwrap();

        assert!(!report.ejected);
        assert_eq!(report.outputs.len(), 1);
    }

    #[tokio::test]
    async fn test_no_eject() {
        let temp_dir = TempDir::new().unwrap();
        let launcher = Arc::new(
            MockProcessLauncher::succeeding()
                .with_process(MockProcess::new().stdout(SCAN_OUTPUT))
                .with_process(MockProcess::new().stdout(TRANSCODE_OUTPUT)),
        );
        let mut rip = request(temp_dir.path().to_path_buf(), &[(2, "S01E01")]);
        rip.eject = false;

        let report = interactor(&launcher)
            .execute(&rip, &mut RecordingObserver::default())
            .await
            .unwrap();

        assert!(!report.ejected);
        assert!(launcher.invocations().iter().all(|i| i.program != "eject"));
    }
}
