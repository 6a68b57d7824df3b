//! ProcessExecutor port
//! Interface for spawning, signalling and reaping unit processes

use crate::domain::{DomainError, KillMode, StopSignal};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::AsyncRead;

/// Configuration for spawning a shell command
#[derive(Debug, Clone)]
pub struct SpawnConfig {
    /// Command line handed to `sh -c`
    pub command: String,
    pub working_dir: PathBuf,
    /// Complete environment of the child; nothing else is inherited
    pub env: HashMap<String, String>,
}

impl SpawnConfig {
    pub fn new(command: impl Into<String>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
            working_dir: working_dir.into(),
            env: HashMap::new(),
        }
    }

    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env = env;
        self
    }
}

/// Readable end of a child's output pipe
pub type OutputStream = Box<dyn AsyncRead + Send + Unpin>;

/// Result of spawning a long-running process
pub struct SpawnResult {
    pub pid: u32,
    pub stdout: Option<OutputStream>,
    pub stderr: Option<OutputStream>,
}

impl std::fmt::Debug for SpawnResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpawnResult")
            .field("pid", &self.pid)
            .field("stdout", &self.stdout.is_some())
            .field("stderr", &self.stderr.is_some())
            .finish()
    }
}

/// Captured result of a run-to-completion command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// None when the command was killed on timeout
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
}

impl CommandOutput {
    pub fn timed_out(&self) -> bool {
        self.exit_code.is_none()
    }

    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Port for executing system processes
#[async_trait]
pub trait ProcessExecutor: Send + Sync {
    /// Spawn a process as leader of a new process group with piped output
    async fn spawn(&self, config: SpawnConfig) -> Result<SpawnResult, DomainError>;

    /// Run a command to completion, capturing its output
    ///
    /// On timeout the whole process group is killed and `exit_code` is None.
    async fn run(&self, config: SpawnConfig, timeout: Duration)
        -> Result<CommandOutput, DomainError>;

    /// Exit code if the process has exited, None while it is still running
    async fn exit_status(&self, pid: u32) -> Result<Option<i32>, DomainError>;

    /// Wait up to `timeout` for the process to exit
    async fn wait_for_exit(&self, pid: u32, timeout: Duration)
        -> Result<Option<i32>, DomainError>;

    /// Send a signal to the process or its whole group
    async fn kill_with_mode(
        &self,
        pid: u32,
        signal: StopSignal,
        mode: KillMode,
    ) -> Result<(), DomainError>;

    /// Forget a reaped process handle
    async fn release(&self, pid: u32);
}
