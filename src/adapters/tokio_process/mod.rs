// Tokio process adapter - Runs external programs as child processes

use std::io;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::{Child, Command};
use tracing::debug;

use crate::error::{RipError, RipResult};
use crate::ports::*;

/// Launcher backed by `tokio::process`
///
/// Children are spawned with `kill_on_drop`, so a handle that goes away
/// without being waited on takes its process down with it.
#[derive(Debug, Default, Clone)]
pub struct TokioProcessLauncher;

impl TokioProcessLauncher {
    /// Create new launcher
    pub fn new() -> Self {
        Self
    }
}

/// Handle over a tokio child process
pub struct TokioChildHandle {
    child: Child,
}

#[async_trait]
impl ProcessHandle for TokioChildHandle {
    async fn wait(&mut self) -> io::Result<ProcessExit> {
        self.child.wait().await.map(ProcessExit::from)
    }

    fn try_wait(&mut self) -> io::Result<Option<ProcessExit>> {
        Ok(self.child.try_wait()?.map(ProcessExit::from))
    }

    fn start_kill(&mut self) -> io::Result<()> {
        self.child.start_kill()
    }

    fn id(&self) -> Option<u32> {
        self.child.id()
    }
}

fn missing_pipe(name: &str) -> RipError {
    RipError::Io(io::Error::new(
        io::ErrorKind::BrokenPipe,
        format!("{} of child process was not captured", name),
    ))
}

#[async_trait]
impl ProcessLauncher for TokioProcessLauncher {
    async fn launch(&self, program: &str, args: &[String]) -> RipResult<LaunchedProcess> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| RipError::Spawn {
                program: program.to_string(),
                source,
            })?;

        debug!(program, pid = ?child.id(), "spawned child process");

        let stdout = child.stdout.take().ok_or_else(|| missing_pipe("stdout"))?;
        let stderr = child.stderr.take().ok_or_else(|| missing_pipe("stderr"))?;

        Ok(LaunchedProcess {
            stdout: Box::new(stdout),
            stderr: Box::new(stderr),
            handle: Box::new(TokioChildHandle { child }),
        })
    }

    async fn status(&self, program: &str, args: &[String]) -> RipResult<ProcessExit> {
        let status = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status()
            .await
            .map_err(|source| RipError::Spawn {
                program: program.to_string(),
                source,
            })?;

        Ok(status.into())
    }
}
