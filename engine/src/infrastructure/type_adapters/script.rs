use super::{command_mentions, not_reloadable, touch_first};
use crate::domain::ports::{join_command, Invocation, TypeAdapter};
use crate::domain::{DomainError, ReloadResult, Unit};
use async_trait::async_trait;
use std::time::Duration;

const PYTHON_TOOLS: &[(&str, &str)] = &[
    ("lint", "ruff check ."),
    ("format", "ruff format ."),
    ("typecheck", "mypy ."),
    ("test", "pytest"),
];

const PYTHON_RELOAD_HINTS: &[&str] = &["--reload", "--debug", "runserver", "watchfiles"];

const PYTHON_ENTRY_POINTS: &[&str] = &[
    "main.py",
    "app.py",
    "server.py",
    "wsgi.py",
    "asgi.py",
    "manage.py",
];

/// Interpreted-script ecosystems
///
/// The python flavour knows the usual linters and dev-server reload flags;
/// the generic flavour runs everything verbatim and never reloads.
pub struct ScriptAdapter {
    name: &'static str,
    tools: &'static [(&'static str, &'static str)],
    reload_hints: &'static [&'static str],
    entry_points: &'static [&'static str],
    timeout: Duration,
}

impl ScriptAdapter {
    pub fn python() -> Self {
        Self {
            name: "python",
            tools: PYTHON_TOOLS,
            reload_hints: PYTHON_RELOAD_HINTS,
            entry_points: PYTHON_ENTRY_POINTS,
            timeout: Duration::from_secs(300),
        }
    }

    pub fn generic() -> Self {
        Self {
            name: "generic",
            tools: &[],
            reload_hints: &[],
            entry_points: &[],
            timeout: Duration::from_secs(300),
        }
    }
}

#[async_trait]
impl TypeAdapter for ScriptAdapter {
    fn name(&self) -> &'static str {
        self.name
    }

    fn custom_invocation(&self, command: &str, args: &[String]) -> Invocation {
        let base = self
            .tools
            .iter()
            .find(|(name, _)| *name == command)
            .map_or(command, |(_, tool)| *tool);
        Invocation {
            command_line: join_command(base, args),
            timeout: self.timeout,
        }
    }

    fn supports_reload(&self, unit: &Unit) -> bool {
        !self.reload_hints.is_empty() && command_mentions(unit, self.reload_hints)
    }

    async fn trigger_reload(&self, unit: &Unit) -> Result<ReloadResult, DomainError> {
        if !self.supports_reload(unit) {
            return Ok(not_reloadable(unit));
        }
        Ok(touch_first(unit, self.entry_points).unwrap_or_else(|| {
            ReloadResult::new(
                unit.id(),
                false,
                "Could not find entry point file to trigger reload",
            )
        }))
    }
}
