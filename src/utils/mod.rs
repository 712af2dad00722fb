//! Common utilities and helpers

pub mod logging;
pub mod signals;

pub use logging::{LogFormat, LoggingConfig};
pub use signals::shutdown_signal;
