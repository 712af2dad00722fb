// Application layer - Use case interactors

pub mod container;
pub mod rip_interactor;
pub mod scan_interactor;

// Re-export interactors
pub use container::{AppContainer, DefaultAppContainer};
pub use rip_interactor::{RipInteractor, RipRequest};
pub use scan_interactor::{ScanInteractor, ScanRequest};
