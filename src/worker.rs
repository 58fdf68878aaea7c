//! Isolated execution of transform work
//!
//! In [`WorkerMode::Process`] the parent re-executes the current binary with
//! the same arguments, marks the child through [`CHILD_ENV`] and hands over
//! the validated installation through [`ROOT_ENV`]. The parent only waits
//! for the exit status; nothing else crosses the process boundary.
//!
//! [`WorkerMode::Thread`] runs the job on a scoped thread and reports a
//! panic as a failure. It is meant for embedding and tests.

use crate::error::{AlxError, Result};
use std::env;
use std::fmt;
use std::process::Command;
use std::str::FromStr;
use std::thread;
use tracing::{debug, error, info};

/// Marks a worker child process
pub const CHILD_ENV: &str = "ALX_WORKER";

/// Identity snapshot of the installation handed to the child
pub const ROOT_ENV: &str = "ALX_ROOT";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WorkerMode {
    #[default]
    Process,
    Thread,
}

impl FromStr for WorkerMode {
    type Err = AlxError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "process" => Ok(WorkerMode::Process),
            "thread" => Ok(WorkerMode::Thread),
            other => Err(AlxError::TypeMismatch(format!(
                "'{}' is not a worker mode (valid: process, thread)",
                other
            ))),
        }
    }
}

impl fmt::Display for WorkerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerMode::Process => f.write_str("process"),
            WorkerMode::Thread => f.write_str("thread"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Worker {
    mode: WorkerMode,
    snapshot: Option<String>,
}

impl Worker {
    pub fn new(mode: WorkerMode) -> Self {
        Worker {
            mode,
            snapshot: None,
        }
    }

    /// Installation snapshot passed to a child process
    pub fn with_snapshot(mut self, snapshot: String) -> Self {
        self.snapshot = Some(snapshot);
        self
    }

    pub fn mode(&self) -> WorkerMode {
        self.mode
    }

    /// True inside a worker child process
    pub fn is_child() -> bool {
        env::var_os(CHILD_ENV).is_some()
    }

    /// Snapshot handed over by the parent, only inside a child
    pub fn child_snapshot() -> Option<String> {
        if Self::is_child() {
            env::var(ROOT_ENV).ok()
        } else {
            None
        }
    }

    /// Run `job` in isolation and report whether it succeeded. Inside a
    /// child process the job runs directly.
    pub fn run<F>(&self, job: F) -> bool
    where
        F: FnOnce() -> Result<()> + Send,
    {
        if Self::is_child() {
            return report(job());
        }

        match self.mode {
            WorkerMode::Process => self.spawn(),
            WorkerMode::Thread => thread::scope(|scope| match scope.spawn(job).join() {
                Ok(result) => report(result),
                Err(_) => {
                    error!("Worker thread panicked");
                    false
                }
            }),
        }
    }

    fn spawn(&self) -> bool {
        let exe = match env::current_exe() {
            Ok(exe) => exe,
            Err(e) => {
                error!("Worker executable not found ({})", e);
                return false;
            }
        };

        let mut command = Command::new(&exe);
        command.args(env::args_os().skip(1)).env(CHILD_ENV, "1");
        if let Some(snapshot) = &self.snapshot {
            command.env(ROOT_ENV, snapshot);
        }

        debug!("Worker spawn {}", exe.display());
        match command.status() {
            Ok(status) if status.success() => {
                info!("Worker finished ({})", status);
                true
            }
            Ok(status) => {
                error!("Worker failed ({})", status);
                false
            }
            Err(e) => {
                error!("Worker could not be started ({})", e);
                false
            }
        }
    }
}

fn report(result: Result<()>) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            error!("Worker job failed ({})", e);
            false
        }
    }
}
