//! Orchestrator
//! Composition root and group-level use cases: CRUD, dependency-ordered
//! start/stop, status, logs and ecosystem tooling

use crate::application::lifecycle_manager::{
    dependency_port_var, LifecycleSettings, ProcessLifecycleManager,
};
use crate::domain::constants::CURRENT_RUN;
use crate::domain::ports::{GroupRepository, HealthCheckExecutor, ProcessExecutor};
use crate::domain::{
    CommandResult, DependencyResolutionService, DomainError, Group, GroupDraft, LogEntry,
    LogRunInfo, LogStream, ReloadResult, RestartGroupResult, SearchMatch, UnitKey,
    UnitStartResult, UnitStatusView, UnitStopResult,
};
use crate::infrastructure::{
    JsonFileGroupRepository, LogStore, PortAllocator, ServerConfig, StandardHealthCheckExecutor,
    TokioProcessExecutor, TypeAdapterRegistry,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

pub struct Orchestrator {
    repository: Arc<dyn GroupRepository>,
    executor: Arc<dyn ProcessExecutor>,
    adapters: Arc<TypeAdapterRegistry>,
    logs: Arc<LogStore>,
    lifecycle: Arc<ProcessLifecycleManager>,
    stop_timeout: Duration,
}

/// Builder for wiring an [`Orchestrator`] with custom adapters
pub struct OrchestratorBuilder {
    repository: Arc<dyn GroupRepository>,
    logs: Arc<LogStore>,
    executor: Arc<dyn ProcessExecutor>,
    health: Arc<dyn HealthCheckExecutor>,
    adapters: Arc<TypeAdapterRegistry>,
    ports: Arc<PortAllocator>,
    settings: LifecycleSettings,
    stop_timeout: Duration,
}

impl OrchestratorBuilder {
    pub fn new(repository: Arc<dyn GroupRepository>, logs: Arc<LogStore>) -> Self {
        Self {
            repository,
            logs,
            executor: Arc::new(TokioProcessExecutor::new()),
            health: Arc::new(StandardHealthCheckExecutor::new()),
            adapters: Arc::new(TypeAdapterRegistry::default()),
            ports: Arc::new(PortAllocator::new()),
            settings: LifecycleSettings::default(),
            stop_timeout: Duration::from_secs(crate::domain::constants::DEFAULT_STOP_TIMEOUT_SEC),
        }
    }

    pub fn executor(mut self, executor: Arc<dyn ProcessExecutor>) -> Self {
        self.executor = executor;
        self
    }

    pub fn health(mut self, health: Arc<dyn HealthCheckExecutor>) -> Self {
        self.health = health;
        self
    }

    pub fn adapters(mut self, adapters: TypeAdapterRegistry) -> Self {
        self.adapters = Arc::new(adapters);
        self
    }

    pub fn settings(mut self, settings: LifecycleSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }

    pub fn build(self) -> Orchestrator {
        let lifecycle = Arc::new(ProcessLifecycleManager::new(
            self.repository.clone(),
            self.executor.clone(),
            self.health,
            self.adapters.clone(),
            self.ports,
            self.logs.clone(),
            self.settings,
        ));
        Orchestrator {
            repository: self.repository,
            executor: self.executor,
            adapters: self.adapters,
            logs: self.logs,
            lifecycle,
            stop_timeout: self.stop_timeout,
        }
    }
}

impl Orchestrator {
    pub fn builder(repository: Arc<dyn GroupRepository>, logs: Arc<LogStore>) -> OrchestratorBuilder {
        OrchestratorBuilder::new(repository, logs)
    }

    /// Production wiring over the configured data directory
    pub fn from_config(config: &ServerConfig) -> Result<Self, DomainError> {
        config.validate()?;
        config.ensure_directories()?;

        let repository = Arc::new(JsonFileGroupRepository::new(config.groups_dir())?);
        let logs = Arc::new(LogStore::new(
            config.logs_dir(),
            config.log_retention_runs,
            config.log_max_size_bytes(),
        ));
        info!(data_dir = %config.data_dir.display(), "Orchestrator initialised");

        Ok(Self::builder(repository, logs)
            .stop_timeout(config.stop_timeout())
            .build())
    }

    pub fn lifecycle(&self) -> &Arc<ProcessLifecycleManager> {
        &self.lifecycle
    }

    // ===== Groups =====

    /// Validate and persist a new group under a fresh id
    pub async fn create_group(&self, draft: GroupDraft) -> Result<Group, DomainError> {
        let group = Group::new(Uuid::new_v4().to_string(), draft)?;
        self.repository.save(group.clone()).await?;
        info!(group = %group.id(), name = %group.name(), units = group.units().len(), "Group created");
        Ok(group)
    }

    /// Create under a caller-chosen id, or revise the group already stored there
    pub async fn upsert_group(&self, id: &str, draft: GroupDraft) -> Result<Group, DomainError> {
        let group = match self.repository.find_by_id(id).await? {
            Some(existing) => existing.revise(draft)?,
            None => Group::new(id, draft)?,
        };
        self.repository.save(group.clone()).await?;
        Ok(group)
    }

    pub async fn get_group(&self, id: &str) -> Result<Group, DomainError> {
        self.repository.require(id).await
    }

    pub async fn list_groups(&self) -> Result<Vec<Group>, DomainError> {
        self.repository.find_all().await
    }

    pub async fn update_group(&self, id: &str, draft: GroupDraft) -> Result<Group, DomainError> {
        let existing = self.repository.require(id).await?;
        let revised = existing.revise(draft)?;
        self.repository.save(revised.clone()).await?;
        info!(group = %id, "Group updated");
        Ok(revised)
    }

    /// Delete a group and its logs; live units block this unless `force`
    pub async fn delete_group(&self, id: &str, force: bool) -> Result<(), DomainError> {
        let group = self.repository.require(id).await?;
        let live = self.lifecycle.tracked_units(id);

        if !live.is_empty() {
            if !force {
                let names: Vec<&str> = live.iter().map(|k| k.unit_id.as_str()).collect();
                return Err(DomainError::InvalidGroup(format!(
                    "group '{}' has running units ({}); stop them or delete with force",
                    id,
                    names.join(", ")
                )));
            }
            self.stop_group(&group, None, true).await?;
        }

        self.repository.delete(id).await?;
        self.logs.remove_group(id)?;
        self.lifecycle.forget_group(id);
        info!(group = %id, "Group deleted");
        Ok(())
    }

    // ===== Lifecycle =====

    /// Start units in dependency order; a failed unit that others depend on ends the chain
    pub async fn start_group(
        &self,
        group_id: &str,
        unit_ids: Option<&[String]>,
    ) -> Result<Vec<UnitStartResult>, DomainError> {
        let group = self.repository.require(group_id).await?;
        let selected = group.select(unit_ids)?;
        let order = DependencyResolutionService::start_order(&selected)?;

        let depended_on: HashSet<&str> = selected
            .iter()
            .flat_map(|u| u.depends_on().iter().map(String::as_str))
            .collect();

        let mut results = Vec::with_capacity(order.len());
        for unit_id in &order {
            let result = match self.lifecycle.start_unit(&group, unit_id).await {
                Ok(result) => result,
                Err(e) => UnitStartResult::failed(unit_id, &e),
            };
            let abort = !result.success && depended_on.contains(unit_id.as_str());
            results.push(result);
            if abort {
                warn!(group = %group_id, unit = %unit_id, "Unit with dependents failed to start, aborting group start");
                break;
            }
        }
        Ok(results)
    }

    /// Stop units in reverse dependency order
    pub async fn stop_group_by_id(
        &self,
        group_id: &str,
        unit_ids: Option<&[String]>,
        graceful: bool,
    ) -> Result<Vec<UnitStopResult>, DomainError> {
        let group = self.repository.require(group_id).await?;
        self.stop_group(&group, unit_ids, graceful).await
    }

    async fn stop_group(
        &self,
        group: &Group,
        unit_ids: Option<&[String]>,
        graceful: bool,
    ) -> Result<Vec<UnitStopResult>, DomainError> {
        let selected = group.select(unit_ids)?;
        let order = DependencyResolutionService::stop_order(&selected)?;

        let mut results = Vec::with_capacity(order.len());
        for unit_id in order {
            let key = UnitKey::new(group.id(), unit_id);
            results.push(
                self.lifecycle
                    .stop_unit(&key, graceful, self.stop_timeout)
                    .await,
            );
        }
        Ok(results)
    }

    pub async fn restart_group(
        &self,
        group_id: &str,
        unit_ids: Option<&[String]>,
    ) -> Result<RestartGroupResult, DomainError> {
        let stop_results = self.stop_group_by_id(group_id, unit_ids, true).await?;
        let start_results = self.start_group(group_id, unit_ids).await?;
        Ok(RestartGroupResult {
            stop_results,
            start_results,
        })
    }

    /// Status per unit; polling is what discovers exits and triggers auto-restart
    pub async fn get_status(
        &self,
        group_id: &str,
        unit_ids: Option<&[String]>,
    ) -> Result<Vec<UnitStatusView>, DomainError> {
        let group = self.repository.require(group_id).await?;
        let selected = group.select(unit_ids)?;

        let mut views = Vec::with_capacity(selected.len());
        for unit in selected {
            views.push(self.lifecycle.get_status(&group, unit.id()).await);
        }
        Ok(views)
    }

    pub async fn shutdown_all(&self) -> Vec<UnitStopResult> {
        self.lifecycle.shutdown_all().await
    }

    // ===== Logs =====

    async fn unit_key(&self, group_id: &str, unit_id: &str) -> Result<UnitKey, DomainError> {
        let group = self.repository.require(group_id).await?;
        group.require_unit(unit_id)?;
        Ok(UnitKey::new(group_id, unit_id))
    }

    /// Last `lines` entries of a run ("current" when None)
    pub async fn get_logs(
        &self,
        group_id: &str,
        unit_id: &str,
        lines: usize,
        run: Option<&str>,
    ) -> Result<Vec<LogEntry>, DomainError> {
        let key = self.unit_key(group_id, unit_id).await?;
        self.logs.read(&key, run.unwrap_or(CURRENT_RUN), lines)
    }

    pub async fn search_logs(
        &self,
        group_id: &str,
        unit_id: &str,
        query: &str,
        max_results: usize,
        case_sensitive: bool,
        run: Option<&str>,
    ) -> Result<Vec<SearchMatch>, DomainError> {
        let key = self.unit_key(group_id, unit_id).await?;
        self.logs.search(
            &key,
            query,
            run.unwrap_or(CURRENT_RUN),
            max_results,
            case_sensitive,
        )
    }

    pub async fn list_log_runs(
        &self,
        group_id: &str,
        unit_id: &str,
    ) -> Result<Vec<LogRunInfo>, DomainError> {
        let key = self.unit_key(group_id, unit_id).await?;
        self.logs.list_runs(&key)
    }

    /// Append a line to a unit's current log
    pub fn write_log(
        &self,
        group_id: &str,
        unit_id: &str,
        content: &str,
        stream: LogStream,
    ) -> Result<(), DomainError> {
        self.logs.write(&UnitKey::new(group_id, unit_id), content, stream)
    }

    // ===== Tooling =====

    /// Run an ecosystem command (`lint`, `test`, ...) in the unit's directory
    pub async fn run_custom_command(
        &self,
        group_id: &str,
        unit_id: &str,
        command: &str,
        args: &[String],
    ) -> Result<CommandResult, DomainError> {
        let group = self.repository.require(group_id).await?;
        let unit = group.require_unit(unit_id)?;
        let adapter = self.adapters.get(unit.ecosystem())?;

        let mut env: HashMap<String, String> = std::env::vars().collect();
        env.extend(unit.env().iter().map(|(k, v)| (k.clone(), v.clone())));
        for dep in unit.depends_on() {
            let owner = UnitKey::new(group_id, dep.clone()).to_string();
            if let Some(port) = self.lifecycle.ports().allocated_port(&owner) {
                env.insert(dependency_port_var(dep), port.to_string());
            }
        }

        info!(group = %group_id, unit = %unit_id, command = %command, adapter = adapter.name(), "Running custom command");
        adapter
            .run_custom_command(unit, command, args, env, self.executor.as_ref())
            .await
    }

    pub async fn trigger_reload(
        &self,
        group_id: &str,
        unit_id: &str,
    ) -> Result<ReloadResult, DomainError> {
        let group = self.repository.require(group_id).await?;
        let unit = group.require_unit(unit_id)?;
        let adapter = self.adapters.get(unit.ecosystem())?;
        adapter.trigger_reload(unit).await
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::domain::{HealthCheck, Unit};
    use crate::infrastructure::InMemoryGroupRepository;
    use async_trait::async_trait;
    use tempfile::{tempdir, TempDir};

    struct NeverHealthy;

    #[async_trait]
    impl HealthCheckExecutor for NeverHealthy {
        async fn check(&self, _config: &HealthCheck) -> crate::domain::HealthStatus {
            crate::domain::HealthStatus::Unhealthy
        }
    }

    fn orchestrator(dir: &TempDir) -> Orchestrator {
        Orchestrator::builder(
            Arc::new(InMemoryGroupRepository::new()),
            Arc::new(LogStore::new(dir.path().join("logs"), 10, 1024 * 1024)),
        )
        .health(Arc::new(NeverHealthy))
        .settings(LifecycleSettings {
            poll_interval: Duration::from_millis(200),
            ..LifecycleSettings::default()
        })
        .stop_timeout(Duration::from_secs(5))
        .build()
    }

    fn unit(dir: &TempDir, id: &str, command: &str) -> crate::domain::UnitBuilder {
        Unit::builder(id, command).working_dir(dir.path())
    }

    #[tokio::test]
    async fn test_group_crud() {
        let dir = tempdir().unwrap();
        let orch = orchestrator(&dir);

        let group = orch
            .create_group(GroupDraft::new("stack", vec![unit(&dir, "a", "true").build().unwrap()]))
            .await
            .unwrap();
        assert_eq!(orch.get_group(group.id()).await.unwrap(), group);

        let updated = orch
            .update_group(
                group.id(),
                GroupDraft::new("renamed", vec![unit(&dir, "b", "true").build().unwrap()]),
            )
            .await
            .unwrap();
        assert_eq!(updated.id(), group.id());
        assert_eq!(updated.created_at(), group.created_at());
        assert!(updated.updated_at() > group.updated_at());
        assert_eq!(orch.list_groups().await.unwrap().len(), 1);

        orch.delete_group(group.id(), false).await.unwrap();
        assert!(matches!(
            orch.get_group(group.id()).await,
            Err(DomainError::GroupNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_cyclic_group_is_rejected() {
        let dir = tempdir().unwrap();
        let orch = orchestrator(&dir);
        let a = unit(&dir, "a", "true").depends_on("b").build().unwrap();
        let b = unit(&dir, "b", "true").depends_on("a").build().unwrap();

        let err = orch.create_group(GroupDraft::new("cycle", vec![a, b])).await.unwrap_err();
        assert!(err.is_validation());
        assert!(orch.list_groups().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_dependency_aborts_chain() {
        let dir = tempdir().unwrap();
        let orch = orchestrator(&dir);
        let db = unit(&dir, "db", "sleep 30")
            .health_check(HealthCheck::tcp(1).unwrap())
            .startup_timeout(1)
            .build()
            .unwrap();
        let api = unit(&dir, "api", "sleep 30").depends_on("db").build().unwrap();
        let group = orch.create_group(GroupDraft::new("stack", vec![api, db])).await.unwrap();

        let results = orch.start_group(group.id(), None).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].unit_id, "db");
        assert!(!results[0].success);
        assert_eq!(results[0].message, "Startup health check failed after 1s");

        orch.shutdown_all().await;
    }

    #[tokio::test]
    async fn test_delete_refuses_live_units_without_force() {
        let dir = tempdir().unwrap();
        let orch = orchestrator(&dir);
        let group = orch
            .create_group(GroupDraft::new("stack", vec![unit(&dir, "a", "sleep 30").build().unwrap()]))
            .await
            .unwrap();
        orch.start_group(group.id(), None).await.unwrap();
        orch.write_log(group.id(), "a", "extra", LogStream::Stdout).unwrap();

        let err = orch.delete_group(group.id(), false).await.unwrap_err();
        assert!(err.is_validation());

        orch.delete_group(group.id(), true).await.unwrap();
        assert!(orch.lifecycle().tracked_units(group.id()).is_empty());
        assert!(!dir.path().join("logs").join(group.id()).exists());
    }

    #[tokio::test]
    async fn test_unknown_subset_unit_is_not_found() {
        let dir = tempdir().unwrap();
        let orch = orchestrator(&dir);
        let group = orch
            .create_group(GroupDraft::new("stack", vec![unit(&dir, "a", "true").build().unwrap()]))
            .await
            .unwrap();

        let ids = vec!["nope".to_string()];
        let err = orch.start_group(group.id(), Some(ids.as_slice())).await.unwrap_err();
        assert_eq!(err, DomainError::UnitNotFound("nope".to_string()));
        assert!(orch.get_status(group.id(), Some(ids.as_slice())).await.is_err());
    }
}
