// Adapters - External system implementations

pub mod mock_process;
pub mod tokio_process;
pub mod toml_config;

// Re-export adapters
pub use mock_process::{MockProcess, MockProcessLauncher, MockProcessWatch};
pub use tokio_process::TokioProcessLauncher;
pub use toml_config::{load_config, EncodeProfile, RipConfig};
