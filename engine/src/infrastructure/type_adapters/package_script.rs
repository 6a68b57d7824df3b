use super::{command_mentions, not_reloadable, touch_first};
use crate::domain::ports::{join_command, Invocation, TypeAdapter};
use crate::domain::{DomainError, ReloadResult, Unit};
use async_trait::async_trait;
use std::time::Duration;

const RELOAD_HINTS: &[&str] = &[
    "npm run dev",
    "npm start",
    "vite",
    "next dev",
    "react-scripts start",
    "parcel",
    "webpack-dev-server",
];

const ENTRY_POINTS: &[&str] = &[
    "src/main.tsx",
    "src/main.ts",
    "src/main.jsx",
    "src/main.js",
    "src/index.tsx",
    "src/index.ts",
    "src/index.jsx",
    "src/index.js",
    "src/App.tsx",
    "src/App.ts",
    "src/App.jsx",
    "src/App.js",
    "pages/index.tsx",
    "pages/index.jsx",
];

/// npm package scripts
pub struct PackageScriptAdapter {
    timeout: Duration,
}

impl PackageScriptAdapter {
    pub fn new() -> Self {
        Self {
            timeout: Duration::from_secs(600),
        }
    }
}

impl Default for PackageScriptAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TypeAdapter for PackageScriptAdapter {
    fn name(&self) -> &'static str {
        "npm"
    }

    fn custom_invocation(&self, command: &str, args: &[String]) -> Invocation {
        let base = match command {
            "test" => "npm test".to_string(),
            other => format!("npm run {}", other),
        };
        Invocation {
            command_line: join_command(&base, args),
            timeout: self.timeout,
        }
    }

    fn supports_reload(&self, unit: &Unit) -> bool {
        command_mentions(unit, RELOAD_HINTS)
    }

    async fn trigger_reload(&self, unit: &Unit) -> Result<ReloadResult, DomainError> {
        if !self.supports_reload(unit) {
            return Ok(not_reloadable(unit));
        }
        if let Some(result) = touch_first(unit, ENTRY_POINTS) {
            return Ok(result);
        }
        if unit.working_dir().join("package.json").is_file() {
            return Ok(ReloadResult::new(
                unit.id(),
                true,
                "HMR should be automatic for this dev server, no manual trigger needed",
            ));
        }
        Ok(ReloadResult::new(
            unit.id(),
            false,
            "Could not find entry point file to trigger reload",
        ))
    }
}
