// Ports - Interface definitions (contracts)

use std::fmt;
use std::io;
use std::process::ExitStatus;

use async_trait::async_trait;
use tokio::io::AsyncRead;

use crate::error::RipResult;

/// Readable output pipe of a launched process
pub type OutputStream = Box<dyn AsyncRead + Send + Unpin>;

/// How a process ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessExit {
    /// Exit code, `None` when the process was ended by a signal
    pub code: Option<i32>,
}

impl ProcessExit {
    /// Exit with the given code
    pub fn with_code(code: i32) -> Self {
        Self { code: Some(code) }
    }

    /// Ended by a signal
    pub fn signaled() -> Self {
        Self { code: None }
    }

    /// True for a zero exit code
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

impl From<ExitStatus> for ProcessExit {
    fn from(status: ExitStatus) -> Self {
        Self {
            code: status.code(),
        }
    }
}

impl fmt::Display for ProcessExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "exit status: {}", code),
            None => write!(f, "termination by signal"),
        }
    }
}

/// Control over a running process
#[async_trait]
pub trait ProcessHandle: Send {
    /// Wait for the process to exit
    async fn wait(&mut self) -> io::Result<ProcessExit>;

    /// Exit status if the process already exited, without blocking
    fn try_wait(&mut self) -> io::Result<Option<ProcessExit>>;

    /// Ask the OS to kill the process, without waiting for it
    fn start_kill(&mut self) -> io::Result<()>;

    /// OS process id, when known
    fn id(&self) -> Option<u32>;
}

/// A started process with its output pipes
pub struct LaunchedProcess {
    pub stdout: OutputStream,
    pub stderr: OutputStream,
    pub handle: Box<dyn ProcessHandle>,
}

/// Port for starting external programs
#[async_trait]
pub trait ProcessLauncher: Send + Sync {
    /// Start `program` with piped stdout and stderr
    async fn launch(&self, program: &str, args: &[String]) -> RipResult<LaunchedProcess>;

    /// Run `program` to completion with all output discarded
    async fn status(&self, program: &str, args: &[String]) -> RipResult<ProcessExit>;
}
