//! Transcoder process engine

pub mod handbrake;
pub mod progress;
pub mod session;

pub use handbrake::{HandBrake, TranscodeSession};
pub use progress::{BarProgress, LogProgress, ProgressObserver, Stage};
pub use session::{ProcessSession, SessionState};
