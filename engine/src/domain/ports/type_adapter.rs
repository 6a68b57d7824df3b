//! TypeAdapter port
//! Ecosystem-specific knowledge: how to launch a unit, run its tooling, reload it

use crate::domain::ports::{ProcessExecutor, SpawnConfig};
use crate::domain::{CommandResult, DomainError, ReloadResult, Unit};
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

/// A concrete tooling invocation produced by an adapter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub command_line: String,
    pub timeout: Duration,
}

#[async_trait]
pub trait TypeAdapter: Send + Sync {
    /// Short variant name used in logs
    fn name(&self) -> &'static str;

    /// The literal command line that starts the unit
    fn prepare_command(&self, unit: &Unit, env: &HashMap<String, String>) -> String {
        let _ = env;
        unit.command().to_string()
    }

    /// Map a custom command (`lint`, `test`, ...) to an invocation
    fn custom_invocation(&self, command: &str, args: &[String]) -> Invocation;

    async fn run_custom_command(
        &self,
        unit: &Unit,
        command: &str,
        args: &[String],
        env: HashMap<String, String>,
        executor: &dyn ProcessExecutor,
    ) -> Result<CommandResult, DomainError> {
        let invocation = self.custom_invocation(command, args);
        let config = SpawnConfig::new(invocation.command_line, unit.working_dir()).with_env(env);
        let output = executor.run(config, invocation.timeout).await?;
        Ok(CommandResult::from_output(output, invocation.timeout))
    }

    fn supports_reload(&self, unit: &Unit) -> bool;

    async fn trigger_reload(&self, unit: &Unit) -> Result<ReloadResult, DomainError>;
}

/// Quote a single argument for `sh -c`
pub fn shell_quote(arg: &str) -> String {
    if !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:@%+,".contains(c))
    {
        return arg.to_string();
    }
    format!("'{}'", arg.replace('\'', r"'\''"))
}

/// `base` followed by the quoted `args`
pub fn join_command(base: &str, args: &[String]) -> String {
    let mut line = base.to_string();
    for arg in args {
        line.push(' ');
        line.push_str(&shell_quote(arg));
    }
    line
}
