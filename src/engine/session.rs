//! Lifecycle of one external process invocation
//!
//! A [`ProcessSession`] feeds the process stdout through a
//! [`StreamMessageParser`] and hands out messages one at a time as they
//! become complete, while the process keeps running. Stderr is drained in
//! the background into a short ring of lines that only gets read when the
//! process fails.
//!
//! Whatever ends the session early (a decode error, an I/O error, or the
//! caller dropping it) the process is killed if it is still alive.

use std::collections::VecDeque;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::domain::model::StructuredMessage;
use crate::error::{RipError, RipResult};
use crate::ports::{LaunchedProcess, OutputStream, ProcessHandle};
use crate::streams::StreamMessageParser;

/// Lines of stderr kept by default
pub const DEFAULT_STDERR_TAIL_LINES: usize = 5;

const READ_CHUNK_SIZE: usize = 8 * 1024;

/// State of a process session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Reading output while the process runs
    Running,
    /// Stdout is closed, waiting for the exit status
    Draining,
    /// Exited with status 0
    ExitedOk,
    /// Exited with a non-zero status
    ExitedError,
    /// Killed after a fatal error
    Killed,
}

impl SessionState {
    /// True once the session will not produce anything else
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::ExitedOk | SessionState::ExitedError | SessionState::Killed
        )
    }
}

/// One running external process and the messages it prints
pub struct ProcessSession {
    program: String,
    state: SessionState,
    stdout: OutputStream,
    handle: Box<dyn ProcessHandle>,
    parser: StreamMessageParser,
    stderr_tail: Option<JoinHandle<VecDeque<String>>>,
    chunk: Vec<u8>,
}

impl ProcessSession {
    /// Take ownership of a launched process.
    ///
    /// Must be called from within a tokio runtime: stderr is drained by a
    /// background task keeping the last `tail_lines` lines.
    pub fn start(program: impl Into<String>, process: LaunchedProcess, tail_lines: usize) -> Self {
        let LaunchedProcess {
            stdout,
            stderr,
            handle,
        } = process;

        Self {
            program: program.into(),
            state: SessionState::Running,
            stdout,
            handle,
            parser: StreamMessageParser::new(),
            stderr_tail: Some(tokio::spawn(collect_stderr_tail(stderr, tail_lines))),
            chunk: vec![0; READ_CHUNK_SIZE],
        }
    }

    /// Current state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Next message printed by the process.
    ///
    /// Suspends until a message is complete or the process ends. `Ok(None)`
    /// means the process exited with status 0. A non-zero exit gives
    /// [`RipError::ProcessFailed`] with the last lines of stderr. After a
    /// terminal state every call returns `Ok(None)`.
    pub async fn next_message(&mut self) -> RipResult<Option<StructuredMessage>> {
        loop {
            match self.state {
                SessionState::Running => {
                    match self.parser.next_message() {
                        Ok(Some(message)) => return Ok(Some(message)),
                        Ok(None) => {}
                        Err(e) => {
                            self.kill();
                            return Err(e);
                        }
                    }

                    let read = match self.stdout.read(&mut self.chunk[..]).await {
                        Ok(read) => read,
                        Err(e) => {
                            self.kill();
                            return Err(e.into());
                        }
                    };

                    if read == 0 {
                        trace!(program = %self.program, "stdout closed");
                        self.state = SessionState::Draining;
                    } else {
                        self.parser.push(&self.chunk[..read]);
                    }
                }
                SessionState::Draining => return self.finish().await.map(|()| None),
                _ => return Ok(None),
            }
        }
    }

    /// Wait for the exit status once stdout is closed
    async fn finish(&mut self) -> RipResult<()> {
        if !self.parser.pending().is_empty() {
            debug!(
                program = %self.program,
                bytes = self.parser.pending().len(),
                "discarding incomplete output"
            );
        }

        let exit = match self.handle.wait().await {
            Ok(exit) => exit,
            Err(e) => {
                self.kill();
                return Err(e.into());
            }
        };

        if exit.success() {
            debug!(program = %self.program, "process exited successfully");
            self.state = SessionState::ExitedOk;
            return Ok(());
        }

        self.state = SessionState::ExitedError;
        let diagnostics = self.stderr_tail().await;
        Err(RipError::ProcessFailed {
            program: self.program.clone(),
            status: exit.to_string(),
            diagnostics,
        })
    }

    /// Last lines of stderr, joined
    async fn stderr_tail(&mut self) -> String {
        let Some(task) = self.stderr_tail.take() else {
            return String::new();
        };

        match task.await {
            Ok(lines) => Vec::from(lines).join("\n"),
            Err(e) => {
                debug!(error = %e, "stderr reader did not finish");
                String::new()
            }
        }
    }

    /// Kill after a fatal error
    fn kill(&mut self) {
        self.terminate();
        self.state = SessionState::Killed;
    }

    /// Kill the process if it is still alive. Failures mean it is already gone.
    fn terminate(&mut self) {
        if let Ok(Some(_)) = self.handle.try_wait() {
            return;
        }

        match self.handle.start_kill() {
            Ok(()) => debug!(program = %self.program, pid = ?self.handle.id(), "killed process"),
            Err(e) => trace!(program = %self.program, error = %e, "kill failed"),
        }
    }
}

impl Drop for ProcessSession {
    fn drop(&mut self) {
        if !self.state.is_terminal() {
            debug!(program = %self.program, state = ?self.state, "session abandoned");
        }
        self.terminate();

        if let Some(task) = self.stderr_tail.take() {
            task.abort();
        }
    }
}

/// Read stderr to the end, keeping only the last `limit` lines
async fn collect_stderr_tail(stderr: OutputStream, limit: usize) -> VecDeque<String> {
    let limit = limit.max(1);
    let mut tail = VecDeque::with_capacity(limit);
    let mut lines = BufReader::new(stderr).split(b'\n');

    loop {
        match lines.next_segment().await {
            Ok(Some(line)) => {
                if tail.len() == limit {
                    tail.pop_front();
                }
                let line = String::from_utf8_lossy(&line);
                tail.push_back(line.trim_end_matches('\r').to_string());
            }
            Ok(None) => break,
            Err(e) => {
                debug!(error = %e, "stopped reading stderr");
                break;
            }
        }
    }

    tail
}
