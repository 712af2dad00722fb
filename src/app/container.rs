use std::sync::Arc;

use crate::adapters::{RipConfig, TokioProcessLauncher};
use crate::app::{rip_interactor::RipInteractor, scan_interactor::ScanInteractor};
use crate::engine::handbrake::HandBrake;
use crate::ports::ProcessLauncher;

pub trait AppContainer: Send + Sync {
    fn rip_interactor(&self) -> Arc<RipInteractor>;
    fn scan_interactor(&self) -> Arc<ScanInteractor>;
}

pub struct DefaultAppContainer {
    rip_interactor: Arc<RipInteractor>,
    scan_interactor: Arc<ScanInteractor>,
}

impl DefaultAppContainer {
    /// Wire the interactors to real processes
    pub fn new(config: &RipConfig) -> Self {
        Self::with_launcher(Arc::new(TokioProcessLauncher::new()), config)
    }

    /// Wire the interactors to another process launcher
    pub fn with_launcher(launcher: Arc<dyn ProcessLauncher>, config: &RipConfig) -> Self {
        let handbrake = Arc::new(HandBrake::from_config(launcher, config));

        let rip_interactor = Arc::new(RipInteractor::new(Arc::clone(&handbrake)));
        let scan_interactor = Arc::new(ScanInteractor::new(Arc::clone(&handbrake)));

        Self {
            rip_interactor,
            scan_interactor,
        }
    }
}

impl AppContainer for DefaultAppContainer {
    fn rip_interactor(&self) -> Arc<RipInteractor> {
        Arc::clone(&self.rip_interactor)
    }

    fn scan_interactor(&self) -> Arc<ScanInteractor> {
        Arc::clone(&self.scan_interactor)
    }
}
