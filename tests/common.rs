//! Shared helpers for the end-to-end tests
//!
//! Every test gets its own [`TestStack`]: a temporary data directory and an
//! orchestrator wired exactly like production (JSON group store, real `sh`
//! processes, real health checks) with faster startup polling and restart
//! backoff so scenarios finish in seconds.
//!
//! ```rust,ignore
//! #[tokio::test]
//! async fn my_test() {
//!     let stack = TestStack::new();
//!     let group = stack.create(vec![stack.unit("a", "sleep 30").build().unwrap()]).await;
//!     stack.orchestrator.start_group(group.id(), None).await.unwrap();
//!     stack.shutdown().await;
//! }
//! ```

use std::future::Future;
use std::net::TcpListener;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use sv_engine::domain::UnitBuilder;
use sv_engine::infrastructure::{JsonFileGroupRepository, LogStore};
use sv_engine::{Group, GroupDraft, LifecycleSettings, Orchestrator, ServerConfig, Unit, UnitState};
use tempfile::TempDir;

pub const POLL_INTERVAL: Duration = Duration::from_millis(200);
pub const MAX_BACKOFF: Duration = Duration::from_millis(100);

pub struct TestStack {
    pub dir: TempDir,
    pub config: ServerConfig,
    pub orchestrator: Orchestrator,
}

impl TestStack {
    pub fn new() -> Self {
        Self::with_settings(fast_settings())
    }

    pub fn with_settings(settings: LifecycleSettings) -> Self {
        let dir = tempfile::tempdir().expect("temp dir");
        let config = ServerConfig {
            data_dir: dir.path().join("data"),
            ..ServerConfig::default()
        };
        let orchestrator = build_orchestrator(&config, settings);
        Self {
            dir,
            config,
            orchestrator,
        }
    }

    /// A second orchestrator over the same data directory, as after a restart
    pub fn reopen(&self) -> Orchestrator {
        build_orchestrator(&self.config, fast_settings())
    }

    pub fn workdir(&self) -> &Path {
        self.dir.path()
    }

    pub fn unit(&self, id: &str, command: &str) -> UnitBuilder {
        Unit::builder(id, command).working_dir(self.workdir())
    }

    pub async fn create(&self, units: Vec<Unit>) -> Group {
        self.orchestrator
            .create_group(GroupDraft::new("e2e", units))
            .await
            .expect("create group")
    }

    pub async fn state_of(&self, group_id: &str, unit_id: &str) -> UnitState {
        let ids = vec![unit_id.to_string()];
        self.orchestrator
            .get_status(group_id, Some(ids.as_slice()))
            .await
            .expect("status")[0]
            .state
    }

    /// Poll status (which also drives exit detection) until `state` or timeout
    pub async fn wait_for_state(
        &self,
        group_id: &str,
        unit_id: &str,
        state: UnitState,
        timeout: Duration,
    ) -> bool {
        wait_until(timeout, move || async move {
            self.state_of(group_id, unit_id).await == state
        })
        .await
    }

    pub async fn shutdown(self) {
        self.orchestrator.shutdown_all().await;
    }
}

impl Default for TestStack {
    fn default() -> Self {
        Self::new()
    }
}

pub fn fast_settings() -> LifecycleSettings {
    LifecycleSettings {
        poll_interval: POLL_INTERVAL,
        restart_max_backoff: MAX_BACKOFF,
        ..LifecycleSettings::default()
    }
}

fn build_orchestrator(config: &ServerConfig, settings: LifecycleSettings) -> Orchestrator {
    config.ensure_directories().expect("data directories");
    let repository =
        Arc::new(JsonFileGroupRepository::new(config.groups_dir()).expect("group store"));
    let logs = Arc::new(LogStore::new(
        config.logs_dir(),
        config.log_retention_runs,
        config.log_max_size_bytes(),
    ));
    Orchestrator::builder(repository, logs)
        .settings(settings)
        .stop_timeout(Duration::from_secs(5))
        .build()
}

/// A port nothing is listening on right now
pub fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .and_then(|l| l.local_addr())
        .map(|a| a.port())
        .expect("ephemeral port")
}

pub async fn wait_until<F, Fut>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = Instant::now() + timeout;
    loop {
        if condition().await {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
}
