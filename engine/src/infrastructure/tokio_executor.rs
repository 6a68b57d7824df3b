//! Tokio-based process executor
//!
//! Units run as `sh -c <command>` in their own process group so a single
//! group signal reaches every child the shell started. Child handles stay in
//! an owned table until the lifecycle manager releases them.

use crate::domain::ports::{CommandOutput, ProcessExecutor, SpawnConfig, SpawnResult};
use crate::domain::{DomainError, KillMode, StopSignal};
use async_trait::async_trait;
use std::collections::HashMap;
use std::process::{ExitStatus, Stdio};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(50);
const OUTPUT_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

pub struct TokioProcessExecutor {
    children: Mutex<HashMap<u32, Child>>,
}

impl TokioProcessExecutor {
    pub fn new() -> Self {
        Self {
            children: Mutex::new(HashMap::new()),
        }
    }

    fn shell_command(config: &SpawnConfig) -> Command {
        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(&config.command)
            .current_dir(&config.working_dir)
            .env_clear()
            .envs(&config.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        #[cfg(unix)]
        cmd.process_group(0);

        cmd
    }

    fn with_children<R>(&self, f: impl FnOnce(&mut HashMap<u32, Child>) -> R) -> R {
        let mut children = match self.children.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut children)
    }

    #[cfg(unix)]
    fn send_signal(pid: u32, signal: StopSignal, mode: KillMode) -> Result<(), DomainError> {
        use nix::errno::Errno;
        use nix::sys::signal::{kill, killpg, Signal};
        use nix::unistd::Pid;

        let sig = match signal {
            StopSignal::Terminate => Signal::SIGTERM,
            StopSignal::Kill => Signal::SIGKILL,
        };
        let target = Pid::from_raw(pid as i32);
        let result = match mode {
            KillMode::ProcessGroup => killpg(target, sig),
            KillMode::Process => kill(target, sig),
        };

        match result {
            Ok(()) => Ok(()),
            // Already gone
            Err(Errno::ESRCH) => {
                debug!(pid = pid, signal = %signal, "Process already exited");
                Ok(())
            }
            Err(e) => Err(DomainError::SignalFailed {
                pid,
                reason: e.to_string(),
            }),
        }
    }

    #[cfg(not(unix))]
    fn send_signal(pid: u32, _signal: StopSignal, _mode: KillMode) -> Result<(), DomainError> {
        Err(DomainError::SignalFailed {
            pid,
            reason: "signals are only supported on unix".to_string(),
        })
    }
}

impl Default for TokioProcessExecutor {
    fn default() -> Self {
        Self::new()
    }
}

/// Exit code, or the negated signal number when the process was killed
pub fn exit_code_of(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return -signal;
        }
    }
    -1
}

async fn read_all<R: AsyncRead + Unpin>(reader: Option<R>) -> String {
    let mut buf = Vec::new();
    if let Some(mut reader) = reader {
        if let Err(e) = reader.read_to_end(&mut buf).await {
            debug!(error = %e, "Output pipe closed with error");
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

#[async_trait]
impl ProcessExecutor for TokioProcessExecutor {
    async fn spawn(&self, config: SpawnConfig) -> Result<SpawnResult, DomainError> {
        debug!(command = %config.command, dir = %config.working_dir.display(), "Spawning process");

        let mut child = Self::shell_command(&config).spawn().map_err(|e| {
            warn!(command = %config.command, error = %e, "Failed to spawn process");
            DomainError::SpawnFailed(e.to_string())
        })?;

        let pid = child
            .id()
            .ok_or_else(|| DomainError::SpawnFailed("process exited before reporting a pid".into()))?;

        let stdout = child
            .stdout
            .take()
            .map(|s| Box::new(s) as Box<dyn AsyncRead + Send + Unpin>);
        let stderr = child
            .stderr
            .take()
            .map(|s| Box::new(s) as Box<dyn AsyncRead + Send + Unpin>);

        self.with_children(|children| children.insert(pid, child));
        info!(pid = pid, "Process spawned successfully");

        Ok(SpawnResult { pid, stdout, stderr })
    }

    async fn run(
        &self,
        config: SpawnConfig,
        timeout: Duration,
    ) -> Result<CommandOutput, DomainError> {
        let started = Instant::now();
        let mut child = Self::shell_command(&config)
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| DomainError::SpawnFailed(e.to_string()))?;
        let pid = child.id();

        let stdout_task = tokio::spawn(read_all(child.stdout.take()));
        let stderr_task = tokio::spawn(read_all(child.stderr.take()));

        let exit_code = match tokio::time::timeout(timeout, child.wait()).await {
            Ok(Ok(status)) => Some(exit_code_of(status)),
            Ok(Err(e)) => return Err(DomainError::SpawnFailed(e.to_string())),
            Err(_) => {
                warn!(command = %config.command, timeout_secs = timeout.as_secs(), "Command timed out, killing");
                if let Some(pid) = pid {
                    let _ = Self::send_signal(pid, StopSignal::Kill, KillMode::ProcessGroup);
                }
                let _ = child.kill().await;
                None
            }
        };

        let stdout = tokio::time::timeout(OUTPUT_DRAIN_TIMEOUT, stdout_task)
            .await
            .ok()
            .and_then(|joined| joined.ok())
            .unwrap_or_default();
        let stderr = tokio::time::timeout(OUTPUT_DRAIN_TIMEOUT, stderr_task)
            .await
            .ok()
            .and_then(|joined| joined.ok())
            .unwrap_or_default();

        Ok(CommandOutput {
            exit_code,
            stdout,
            stderr,
            duration: started.elapsed(),
        })
    }

    async fn exit_status(&self, pid: u32) -> Result<Option<i32>, DomainError> {
        self.with_children(|children| {
            let child = children
                .get_mut(&pid)
                .ok_or(DomainError::ProcessNotFound(pid))?;
            match child.try_wait() {
                Ok(Some(status)) => Ok(Some(exit_code_of(status))),
                Ok(None) => Ok(None),
                Err(e) => Err(DomainError::Storage(format!("wait on {}: {}", pid, e))),
            }
        })
    }

    async fn wait_for_exit(
        &self,
        pid: u32,
        timeout: Duration,
    ) -> Result<Option<i32>, DomainError> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(code) = self.exit_status(pid).await? {
                return Ok(Some(code));
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            tokio::time::sleep(EXIT_POLL_INTERVAL).await;
        }
    }

    async fn kill_with_mode(
        &self,
        pid: u32,
        signal: StopSignal,
        mode: KillMode,
    ) -> Result<(), DomainError> {
        info!(pid = pid, signal = %signal, mode = %mode, "Signalling process");
        Self::send_signal(pid, signal, mode)
    }

    async fn release(&self, pid: u32) {
        self.with_children(|children| children.remove(&pid));
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tokio::io::AsyncBufReadExt;

    fn config(command: &str) -> SpawnConfig {
        let mut env = HashMap::new();
        env.insert("PATH".to_string(), std::env::var("PATH").unwrap_or_default());
        SpawnConfig::new(command, std::env::temp_dir()).with_env(env)
    }

    #[tokio::test]
    async fn test_spawn_pipes_output_and_reports_exit() {
        let executor = TokioProcessExecutor::new();
        let mut spawned = executor
            .spawn(config("echo out; echo err >&2; exit 3"))
            .await
            .unwrap();

        let mut lines = tokio::io::BufReader::new(spawned.stdout.take().unwrap()).lines();
        assert_eq!(lines.next_line().await.unwrap().as_deref(), Some("out"));
        let mut lines = tokio::io::BufReader::new(spawned.stderr.take().unwrap()).lines();
        assert_eq!(lines.next_line().await.unwrap().as_deref(), Some("err"));

        let code = executor
            .wait_for_exit(spawned.pid, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(code, Some(3));

        executor.release(spawned.pid).await;
        assert_eq!(
            executor.exit_status(spawned.pid).await,
            Err(DomainError::ProcessNotFound(spawned.pid))
        );
    }

    #[tokio::test]
    async fn test_environment_is_exactly_the_config() {
        let executor = TokioProcessExecutor::new();
        let mut cfg = config("printf '%s' \"$GREETING\"");
        cfg.env.insert("GREETING".to_string(), "hi".to_string());
        let output = executor.run(cfg, Duration::from_secs(5)).await.unwrap();
        assert!(output.success());
        assert_eq!(output.stdout, "hi");
    }

    #[tokio::test]
    async fn test_group_kill_terminates_children() {
        let executor = TokioProcessExecutor::new();
        let spawned = executor.spawn(config("sleep 30 & sleep 30; wait")).await.unwrap();

        assert_eq!(executor.exit_status(spawned.pid).await.unwrap(), None);
        executor
            .kill_with_mode(spawned.pid, StopSignal::Terminate, KillMode::ProcessGroup)
            .await
            .unwrap();

        let code = executor
            .wait_for_exit(spawned.pid, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(code, Some(-15));
    }

    #[tokio::test]
    async fn test_run_timeout_has_no_exit_code() {
        let executor = TokioProcessExecutor::new();
        let output = executor
            .run(config("echo started; sleep 30"), Duration::from_millis(300))
            .await
            .unwrap();
        assert!(output.timed_out());
        assert_eq!(output.stdout, "started\n");
    }

    #[tokio::test]
    async fn test_signalling_a_gone_process_is_ok() {
        let executor = TokioProcessExecutor::new();
        let spawned = executor.spawn(config("true")).await.unwrap();
        executor
            .wait_for_exit(spawned.pid, Duration::from_secs(5))
            .await
            .unwrap();
        // Reaped already, so the group no longer exists
        assert!(executor
            .kill_with_mode(spawned.pid, StopSignal::Kill, KillMode::ProcessGroup)
            .await
            .is_ok());
    }
}
