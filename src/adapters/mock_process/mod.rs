// Mock process adapter - Scripted processes for tests and dry runs
//
// Each launch pops the next scripted process. Scripts decide what the fake
// process prints on stdout (chunk by chunk), what it leaves on stderr and how
// it exits. A watch is kept per launch so tests can check whether the process
// was waited on or killed.

use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::task::{Context, Poll};

use async_trait::async_trait;
use tokio::io::{AsyncRead, ReadBuf};

use crate::error::{RipError, RipResult};
use crate::ports::*;

/// Script of one fake process
#[derive(Debug, Clone, Default)]
pub struct MockProcess {
    stdout: Vec<Vec<u8>>,
    stderr: Vec<u8>,
    exit_code: i32,
    hang: bool,
}

impl MockProcess {
    /// A process that prints nothing and exits with 0
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one stdout chunk
    pub fn stdout(mut self, chunk: impl AsRef<[u8]>) -> Self {
        let chunk = chunk.as_ref();
        if !chunk.is_empty() {
            self.stdout.push(chunk.to_vec());
        }
        self
    }

    /// Append `text` to stdout split into chunks of `size` bytes
    pub fn stdout_in_chunks(mut self, text: impl AsRef<[u8]>, size: usize) -> Self {
        for chunk in text.as_ref().chunks(size.max(1)) {
            self.stdout.push(chunk.to_vec());
        }
        self
    }

    /// Set the complete stderr output
    pub fn stderr(mut self, text: impl AsRef<[u8]>) -> Self {
        self.stderr = text.as_ref().to_vec();
        self
    }

    /// Set the exit code
    pub fn exit_code(mut self, code: i32) -> Self {
        self.exit_code = code;
        self
    }

    /// Keep stdout open after the scripted chunks, as a process that is still working
    pub fn hang(mut self) -> Self {
        self.hang = true;
        self
    }
}

#[derive(Debug, Default)]
struct MockState {
    killed: AtomicBool,
    exited: AtomicBool,
    kill_attempts: AtomicUsize,
}

/// Observation point on a launched fake process
#[derive(Debug, Clone)]
pub struct MockProcessWatch {
    state: Arc<MockState>,
}

impl MockProcessWatch {
    /// True if the process was killed while running
    pub fn was_killed(&self) -> bool {
        self.state.killed.load(Ordering::SeqCst)
    }

    /// True if the process exited on its own and was waited on
    pub fn has_exited(&self) -> bool {
        self.state.exited.load(Ordering::SeqCst)
    }

    /// Number of kill requests, including those on an already finished process
    pub fn kill_attempts(&self) -> usize {
        self.state.kill_attempts.load(Ordering::SeqCst)
    }

    /// True while neither exited nor killed
    pub fn is_alive(&self) -> bool {
        !self.was_killed() && !self.has_exited()
    }
}

/// One recorded launch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

/// Launcher replaying scripted processes
#[derive(Default)]
pub struct MockProcessLauncher {
    scripts: Mutex<VecDeque<MockProcess>>,
    invocations: Mutex<Vec<Invocation>>,
    watches: Mutex<Vec<MockProcessWatch>>,
    status_exit: Mutex<Option<ProcessExit>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockProcessLauncher {
    /// Create a launcher with no scripted processes
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a process for the next launch
    pub fn with_process(self, process: MockProcess) -> Self {
        lock(&self.scripts).push_back(process);
        self
    }

    /// Exit reported by `status`; `None` makes the program impossible to start
    pub fn with_status(self, exit: Option<ProcessExit>) -> Self {
        *lock(&self.status_exit) = exit;
        self
    }

    /// Every launch and status call so far
    pub fn invocations(&self) -> Vec<Invocation> {
        lock(&self.invocations).clone()
    }

    /// Watches of launched processes, in launch order
    pub fn watches(&self) -> Vec<MockProcessWatch> {
        lock(&self.watches).clone()
    }

    fn record(&self, program: &str, args: &[String]) {
        lock(&self.invocations).push(Invocation {
            program: program.to_string(),
            args: args.to_vec(),
        });
    }
}

#[async_trait]
impl ProcessLauncher for MockProcessLauncher {
    async fn launch(&self, program: &str, args: &[String]) -> RipResult<LaunchedProcess> {
        self.record(program, args);

        let script = lock(&self.scripts)
            .pop_front()
            .ok_or_else(|| RipError::Spawn {
                program: program.to_string(),
                source: io::Error::new(io::ErrorKind::NotFound, "no scripted process left"),
            })?;

        let state = Arc::new(MockState::default());
        lock(&self.watches).push(MockProcessWatch {
            state: Arc::clone(&state),
        });

        Ok(LaunchedProcess {
            stdout: Box::new(ScriptedOutput {
                chunks: script.stdout.into_iter().collect(),
                hang: script.hang,
            }),
            stderr: Box::new(io::Cursor::new(script.stderr)),
            handle: Box::new(MockHandle {
                state,
                exit_code: script.exit_code,
            }),
        })
    }

    async fn status(&self, program: &str, args: &[String]) -> RipResult<ProcessExit> {
        self.record(program, args);

        let exit = *lock(&self.status_exit);
        exit.ok_or_else(|| RipError::Spawn {
            program: program.to_string(),
            source: io::Error::new(io::ErrorKind::NotFound, "program not found"),
        })
    }
}

impl MockProcessLauncher {
    /// A launcher whose `status` calls succeed
    pub fn succeeding() -> Self {
        Self::new().with_status(Some(ProcessExit::with_code(0)))
    }
}

struct ScriptedOutput {
    chunks: VecDeque<Vec<u8>>,
    hang: bool,
}

impl AsyncRead for ScriptedOutput {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = &mut *self;

        if let Some(chunk) = this.chunks.front_mut() {
            let n = chunk.len().min(buf.remaining());
            buf.put_slice(&chunk[..n]);
            chunk.drain(..n);
            if chunk.is_empty() {
                this.chunks.pop_front();
            }
            return Poll::Ready(Ok(()));
        }

        if this.hang {
            // Still running; only dropping the reader ends this
            return Poll::Pending;
        }

        Poll::Ready(Ok(()))
    }
}

struct MockHandle {
    state: Arc<MockState>,
    exit_code: i32,
}

#[async_trait]
impl ProcessHandle for MockHandle {
    async fn wait(&mut self) -> io::Result<ProcessExit> {
        if self.state.killed.load(Ordering::SeqCst) {
            return Ok(ProcessExit::signaled());
        }
        self.state.exited.store(true, Ordering::SeqCst);
        Ok(ProcessExit::with_code(self.exit_code))
    }

    fn try_wait(&mut self) -> io::Result<Option<ProcessExit>> {
        if self.state.killed.load(Ordering::SeqCst) {
            Ok(Some(ProcessExit::signaled()))
        } else if self.state.exited.load(Ordering::SeqCst) {
            Ok(Some(ProcessExit::with_code(self.exit_code)))
        } else {
            Ok(None)
        }
    }

    fn start_kill(&mut self) -> io::Result<()> {
        self.state.kill_attempts.fetch_add(1, Ordering::SeqCst);
        if self.state.killed.load(Ordering::SeqCst) || self.state.exited.load(Ordering::SeqCst) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "process already exited",
            ));
        }
        self.state.killed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn id(&self) -> Option<u32> {
        None
    }
}
