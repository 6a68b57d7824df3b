use crate::domain::ports::CommandOutput;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Result of an ecosystem tooling command (`lint`, `test`, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub duration_seconds: f64,
}

impl CommandResult {
    /// Timeouts surface as exit code -1 with an explanatory stderr
    pub fn from_output(output: CommandOutput, timeout: Duration) -> Self {
        let duration_seconds = output.duration.as_secs_f64();
        match output.exit_code {
            Some(exit_code) => Self {
                exit_code,
                stdout: output.stdout,
                stderr: output.stderr,
                duration_seconds,
            },
            None => Self {
                exit_code: -1,
                stdout: output.stdout,
                stderr: format!("Command timeout ({} minutes)", timeout.as_secs() / 60),
                duration_seconds,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReloadResult {
    pub unit_id: String,
    pub success: bool,
    pub message: String,
}

impl ReloadResult {
    pub fn new(unit_id: impl Into<String>, success: bool, message: impl Into<String>) -> Self {
        Self {
            unit_id: unit_id.into(),
            success,
            message: message.into(),
        }
    }
}
