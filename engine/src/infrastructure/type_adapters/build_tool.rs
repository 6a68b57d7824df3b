use super::{command_mentions, not_reloadable, touch};
use crate::domain::ports::{join_command, Invocation, TypeAdapter};
use crate::domain::{DomainError, ReloadResult, Unit};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};
use walkdir::WalkDir;

const RELOAD_HINTS: &[&str] = &["~run", "play"];
const PLAY_RELOAD_URL_VAR: &str = "PLAY_RELOAD_URL";
const PLAY_RELOAD_TIMEOUT: Duration = Duration::from_secs(10);

/// sbt-built projects, including Play applications
pub struct BuildToolAdapter {
    timeout: Duration,
}

impl BuildToolAdapter {
    pub fn new() -> Self {
        Self {
            timeout: Duration::from_secs(900),
        }
    }

    fn is_play_app(dir: &Path) -> bool {
        dir.join("conf/application.conf").exists() || dir.join("conf/routes").exists()
    }

    /// First `.scala` source under `app/`, then under `src/`
    fn first_scala_source(dir: &Path) -> Option<PathBuf> {
        ["app", "src"].iter().find_map(|sub| {
            let root = dir.join(sub);
            if !root.is_dir() {
                return None;
            }
            WalkDir::new(root)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|entry| entry.ok())
                .find(|entry| {
                    entry.file_type().is_file()
                        && entry.path().extension().and_then(|e| e.to_str()) == Some("scala")
                })
                .map(|entry| entry.into_path())
        })
    }

    async fn request_play_reload(url: String) -> bool {
        let result = tokio::task::spawn_blocking(move || {
            ureq::AgentBuilder::new()
                .timeout(PLAY_RELOAD_TIMEOUT)
                .build()
                .get(&url)
                .call()
        })
        .await;

        match result {
            Ok(Ok(resp)) if resp.status() == 200 => true,
            Ok(Ok(resp)) => {
                warn!(status = resp.status(), "Play reload endpoint returned unexpected status");
                false
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Play reload request failed");
                false
            }
            Err(e) => {
                warn!(error = %e, "Play reload task failed");
                false
            }
        }
    }
}

impl Default for BuildToolAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TypeAdapter for BuildToolAdapter {
    fn name(&self) -> &'static str {
        "sbt"
    }

    fn custom_invocation(&self, command: &str, args: &[String]) -> Invocation {
        let base = match command {
            "format" => "sbt scalafmt".to_string(),
            other => format!("sbt {}", other),
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
        let dir = unit.working_dir();

        if Self::is_play_app(dir) {
            if let Some(url) = unit.env().get(PLAY_RELOAD_URL_VAR) {
                if Self::request_play_reload(url.clone()).await {
                    info!(unit = %unit.id(), "Play reload triggered");
                    return Ok(ReloadResult::new(
                        unit.id(),
                        true,
                        "Play Framework reload triggered via HTTP",
                    ));
                }
            }
        }

        if let Some(source) = Self::first_scala_source(dir) {
            let name = source
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            return Ok(match touch(&source) {
                Ok(()) => ReloadResult::new(
                    unit.id(),
                    true,
                    format!("Reload triggered by touching {}", name),
                ),
                Err(e) => ReloadResult::new(
                    unit.id(),
                    false,
                    format!("Failed to touch Scala file: {}", e),
                ),
            });
        }

        if unit.command().contains("~run") {
            return Ok(ReloadResult::new(
                unit.id(),
                true,
                "SBT continuous compilation should reload automatically",
            ));
        }
        Ok(ReloadResult::new(unit.id(), false, "Could not trigger reload"))
    }
}
