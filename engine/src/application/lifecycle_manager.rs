//! Process lifecycle manager
//!
//! Owns every runtime table of the engine: unit status, tracked OS processes,
//! restart windows and in-flight restarts. Start and stop drive the unit state
//! machine; status polling is where unobserved exits are folded in and
//! auto-restart is scheduled.

use crate::domain::constants::{
    BUILD_TIMEOUT_SEC, CAPTURE_JOIN_TIMEOUT_MS, FORCE_KILL_WAIT_SEC, RESTART_LIMIT_PER_WINDOW,
    RESTART_MAX_BACKOFF_SEC, RESTART_WINDOW_SEC, SHUTDOWN_STOP_TIMEOUT_SEC,
    STARTUP_POLL_INTERVAL_MS,
};
use crate::domain::ports::{
    GroupRepository, HealthCheckExecutor, OutputStream, ProcessExecutor, SpawnConfig,
};
use crate::domain::{
    DependencyResolutionService, DomainError, Group, HealthStatus, KillMode, LogStream,
    RestartDecision, RestartTracker, RuntimeStatus, StopSignal, Unit, UnitKey, UnitStartResult,
    UnitState, UnitStatusView, UnitStopResult,
};
use crate::infrastructure::{LogStore, PortAllocator, TypeAdapterRegistry};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Timing knobs of the lifecycle manager
#[derive(Debug, Clone)]
pub struct LifecycleSettings {
    /// Interval between startup liveness/health polls
    pub poll_interval: Duration,
    pub build_timeout: Duration,
    /// Wait after SIGKILL for the process to be reaped
    pub force_kill_wait: Duration,
    /// Bounded wait for each capture task when a unit goes away
    pub capture_join_timeout: Duration,
    pub restart_window: Duration,
    pub restart_limit: usize,
    pub restart_max_backoff: Duration,
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(STARTUP_POLL_INTERVAL_MS),
            build_timeout: Duration::from_secs(BUILD_TIMEOUT_SEC),
            force_kill_wait: Duration::from_secs(FORCE_KILL_WAIT_SEC),
            capture_join_timeout: Duration::from_millis(CAPTURE_JOIN_TIMEOUT_MS),
            restart_window: Duration::from_secs(RESTART_WINDOW_SEC),
            restart_limit: RESTART_LIMIT_PER_WINDOW,
            restart_max_backoff: Duration::from_secs(RESTART_MAX_BACKOFF_SEC),
        }
    }
}

/// A spawned unit process and its output capture tasks
struct TrackedProcess {
    pid: u32,
    cancel: CancellationToken,
    captures: Vec<JoinHandle<()>>,
}

pub struct ProcessLifecycleManager {
    repository: Arc<dyn GroupRepository>,
    executor: Arc<dyn ProcessExecutor>,
    health: Arc<dyn HealthCheckExecutor>,
    adapters: Arc<TypeAdapterRegistry>,
    ports: Arc<PortAllocator>,
    logs: Arc<LogStore>,
    settings: LifecycleSettings,

    statuses: Mutex<HashMap<UnitKey, RuntimeStatus>>,
    tracked: Mutex<HashMap<UnitKey, TrackedProcess>>,
    restarts: Mutex<HashMap<UnitKey, RestartTracker>>,
    restarts_in_flight: Mutex<HashSet<UnitKey>>,
}

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|p| p.into_inner())
}

/// `<DEPID>_PORT`, upper-cased with anything outside `[A-Z0-9_]` replaced
pub fn dependency_port_var(dependency_id: &str) -> String {
    let mut var: String = dependency_id
        .chars()
        .map(|c| {
            let c = c.to_ascii_uppercase();
            if c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    var.push_str("_PORT");
    var
}

fn port_owner(key: &UnitKey) -> String {
    key.to_string()
}

impl ProcessLifecycleManager {
    pub fn new(
        repository: Arc<dyn GroupRepository>,
        executor: Arc<dyn ProcessExecutor>,
        health: Arc<dyn HealthCheckExecutor>,
        adapters: Arc<TypeAdapterRegistry>,
        ports: Arc<PortAllocator>,
        logs: Arc<LogStore>,
        settings: LifecycleSettings,
    ) -> Self {
        Self {
            repository,
            executor,
            health,
            adapters,
            ports,
            logs,
            settings,
            statuses: Mutex::new(HashMap::new()),
            tracked: Mutex::new(HashMap::new()),
            restarts: Mutex::new(HashMap::new()),
            restarts_in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub fn ports(&self) -> &PortAllocator {
        &self.ports
    }

    pub fn logs(&self) -> &LogStore {
        &self.logs
    }

    // ===== Start =====

    /// Start one unit of `group` and block until it is running or has failed
    pub async fn start_unit(
        &self,
        group: &Group,
        unit_id: &str,
    ) -> Result<UnitStartResult, DomainError> {
        let unit = group.require_unit(unit_id)?;
        let key = UnitKey::new(group.id(), unit.id());

        self.reject_if_live(&key).await?;
        let previous = self.claim_start(&key)?;
        info!(unit = %key, "Starting unit");

        let (pid, port) = match self.launch(unit, &key).await {
            Ok(launched) => launched,
            Err(e) => {
                warn!(unit = %key, error = %e, "Unit failed to launch");
                let mut statuses = locked(&self.statuses);
                statuses.insert(
                    key,
                    RuntimeStatus {
                        error: Some(e.to_string()),
                        ..previous
                    },
                );
                return Err(e);
            }
        };

        self.await_startup(unit, &key, pid).await?;
        info!(unit = %key, pid = pid, port = ?port, "Unit started");
        Ok(UnitStartResult::started(unit.id(), "Unit started", pid, port))
    }

    /// A unit with a live OS process cannot be started again; a dead one is reaped
    async fn reject_if_live(&self, key: &UnitKey) -> Result<(), DomainError> {
        let pid = locked(&self.tracked).get(key).map(|t| t.pid);
        let Some(pid) = pid else {
            return Ok(());
        };
        match self.executor.exit_status(pid).await {
            Ok(None) => Err(DomainError::AlreadyRunning(key.unit_id.clone())),
            Ok(Some(code)) => {
                self.reap_exited(key, Some(code)).await;
                Ok(())
            }
            Err(_) => {
                self.reap_exited(key, None).await;
                Ok(())
            }
        }
    }

    /// Move the unit to STARTING under the status lock; returns the record it replaced
    fn claim_start(&self, key: &UnitKey) -> Result<RuntimeStatus, DomainError> {
        let mut statuses = locked(&self.statuses);
        let status = statuses.entry(key.clone()).or_default();
        if matches!(
            status.state,
            UnitState::Starting | UnitState::Running | UnitState::Stopping
        ) {
            return Err(DomainError::AlreadyRunning(key.unit_id.clone()));
        }
        let previous = status.clone();
        status.mark_starting()?;
        Ok(previous)
    }

    /// Dependency gate, environment, port, build, log rotation and spawn
    async fn launch(&self, unit: &Unit, key: &UnitKey) -> Result<(u32, Option<u16>), DomainError> {
        self.check_dependencies(unit, key)?;

        let adapter = self.adapters.get(unit.ecosystem())?;
        let mut env = self.environment_for(unit, key);

        let owner = port_owner(key);
        let port = if unit.wants_port() {
            let port = self.ports.allocate(&owner, unit.port())?;
            if let Some(var) = unit.port_env_var() {
                env.insert(var.to_string(), port.to_string());
            }
            Some(port)
        } else {
            None
        };
        let command = adapter.prepare_command(unit, &env);

        if let Some(build) = unit.build_command() {
            if let Err(e) = self.run_build(unit, key, build, &env).await {
                self.ports.release(&owner);
                return Err(e);
            }
        }

        if let Err(e) = self.logs.start_capture(key) {
            self.ports.release(&owner);
            return Err(e);
        }

        let config = SpawnConfig::new(command, unit.working_dir()).with_env(env);
        let spawned = match self.executor.spawn(config).await {
            Ok(spawned) => spawned,
            Err(e) => {
                self.ports.release(&owner);
                self.logs.stop_capture(key);
                return Err(e);
            }
        };
        let pid = spawned.pid;

        if let Some(status) = locked(&self.statuses).get_mut(key) {
            status.mark_spawned(pid, port);
        }

        let cancel = CancellationToken::new();
        let mut captures = Vec::with_capacity(2);
        if let Some(stdout) = spawned.stdout {
            captures.push(self.spawn_capture(key, stdout, LogStream::Stdout, cancel.clone()));
        }
        if let Some(stderr) = spawned.stderr {
            captures.push(self.spawn_capture(key, stderr, LogStream::Stderr, cancel.clone()));
        }
        locked(&self.tracked).insert(
            key.clone(),
            TrackedProcess {
                pid,
                cancel,
                captures,
            },
        );

        Ok((pid, port))
    }

    fn check_dependencies(&self, unit: &Unit, key: &UnitKey) -> Result<(), DomainError> {
        let statuses = locked(&self.statuses);
        for dep in unit.depends_on() {
            let dep_key = UnitKey::new(key.group_id.clone(), dep.clone());
            let status = statuses.get(&dep_key);
            match status {
                Some(s) if s.state == UnitState::Running => {
                    if s.health == HealthStatus::Unhealthy {
                        return Err(DomainError::DependencyUnhealthy(dep.clone()));
                    }
                }
                _ => return Err(DomainError::DependencyNotRunning(dep.clone())),
            }
        }
        Ok(())
    }

    /// OS environment, then the unit's own variables, then one port variable per dependency
    fn environment_for(&self, unit: &Unit, key: &UnitKey) -> HashMap<String, String> {
        let mut env: HashMap<String, String> = std::env::vars().collect();
        env.extend(unit.env().iter().map(|(k, v)| (k.clone(), v.clone())));

        for dep in unit.depends_on() {
            let dep_key = UnitKey::new(key.group_id.clone(), dep.clone());
            if let Some(port) = self.ports.allocated_port(&port_owner(&dep_key)) {
                env.insert(dependency_port_var(dep), port.to_string());
            }
        }
        env
    }

    async fn run_build(
        &self,
        unit: &Unit,
        key: &UnitKey,
        build: &str,
        env: &HashMap<String, String>,
    ) -> Result<(), DomainError> {
        info!(unit = %key, command = %build, "Running build command");
        let config = SpawnConfig::new(build, unit.working_dir()).with_env(env.clone());
        let output = self.executor.run(config, self.settings.build_timeout).await?;

        match output.exit_code {
            None => Err(DomainError::BuildTimeout(
                (self.settings.build_timeout.as_millis() as u64).div_ceil(60_000),
            )),
            Some(0) => {
                debug!(unit = %key, duration_ms = output.duration.as_millis() as u64, "Build succeeded");
                Ok(())
            }
            Some(code) => {
                let message = [output.stderr.trim(), output.stdout.trim()]
                    .into_iter()
                    .find(|s| !s.is_empty())
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("exit code {}", code));
                warn!(unit = %key, exit_code = code, "Build failed");
                Err(DomainError::BuildFailed(message))
            }
        }
    }

    fn spawn_capture(
        &self,
        key: &UnitKey,
        stream: OutputStream,
        kind: LogStream,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(capture_output(
            stream,
            Arc::clone(&self.logs),
            key.clone(),
            kind,
            cancel,
        ))
    }

    /// Poll until the process exits, reports healthy, or the startup window closes
    async fn await_startup(&self, unit: &Unit, key: &UnitKey, pid: u32) -> Result<(), DomainError> {
        let deadline = Instant::now() + unit.startup_timeout();
        let mut polls = 0u32;

        loop {
            if self.state_of(key) != UnitState::Starting {
                debug!(unit = %key, "Start superseded while waiting for startup");
                return Err(DomainError::NotRunning(key.unit_id.clone()));
            }

            match self.executor.exit_status(pid).await {
                Ok(Some(code)) => {
                    warn!(unit = %key, pid = pid, exit_code = code, "Process exited during startup");
                    self.reap_exited(key, Some(code)).await;
                    return Err(DomainError::ExitedDuringStartup(code));
                }
                Ok(None) => {}
                Err(DomainError::ProcessNotFound(_)) => {
                    return Err(DomainError::NotRunning(key.unit_id.clone()));
                }
                Err(e) => return Err(e),
            }

            let ready = match unit.health_check() {
                Some(check) => match self.health.check(check).await {
                    HealthStatus::Healthy => Some(HealthStatus::Healthy),
                    _ => None,
                },
                // Alive at the poll after spawn
                None if polls > 0 => Some(self.health.check_optional(None).await),
                None => None,
            };
            if let Some(health) = ready {
                let mut statuses = locked(&self.statuses);
                let status = statuses.entry(key.clone()).or_default();
                return status
                    .mark_running(health)
                    .map_err(|_| DomainError::NotRunning(key.unit_id.clone()));
            }

            if Instant::now() >= deadline {
                break;
            }
            tokio::time::sleep(self.settings.poll_interval).await;
            polls += 1;
        }

        let err = DomainError::HealthCheckTimeout(unit.startup_timeout().as_secs());
        warn!(unit = %key, pid = pid, "Unit never reported healthy");
        if let Some(status) = locked(&self.statuses).get_mut(key) {
            status.health = HealthStatus::Unhealthy;
            status.mark_failed(err.to_string());
        }
        Err(err)
    }

    // ===== Stop =====

    /// Stop a tracked unit; SIGTERM to its process group first unless `graceful` is false
    pub async fn stop_unit(&self, key: &UnitKey, graceful: bool, timeout: Duration) -> UnitStopResult {
        let tracked = locked(&self.tracked).remove(key);
        let Some(tracked) = tracked else {
            return UnitStopResult::failed(
                &key.unit_id,
                DomainError::NotRunning(key.unit_id.clone()).to_string(),
            );
        };
        let pid = tracked.pid;
        info!(unit = %key, pid = pid, graceful = graceful, "Stopping unit");

        if let Some(status) = locked(&self.statuses).get_mut(key) {
            status.mark_stopping();
        }
        tracked.cancel.cancel();

        let mut exit_code = None;
        if graceful {
            match self
                .executor
                .kill_with_mode(pid, StopSignal::Terminate, KillMode::ProcessGroup)
                .await
            {
                Ok(()) => {
                    exit_code = self.executor.wait_for_exit(pid, timeout).await.ok().flatten();
                }
                Err(e) => warn!(unit = %key, pid = pid, error = %e, "SIGTERM failed"),
            }
            if exit_code.is_none() {
                warn!(unit = %key, pid = pid, timeout_secs = timeout.as_secs(), "Graceful stop timed out, escalating");
            }
        }

        let mut failure = None;
        if exit_code.is_none() {
            exit_code = match self.force_kill(pid).await {
                Ok(code) => code,
                Err(e) => {
                    failure = Some(e);
                    None
                }
            };
        }

        self.join_captures(key, tracked.captures).await;
        self.executor.release(pid).await;
        self.ports.release(&port_owner(key));
        self.logs.stop_capture(key);

        if let Some(status) = locked(&self.statuses).get_mut(key) {
            *status = RuntimeStatus {
                exit_code,
                ..RuntimeStatus::default()
            };
        }

        match failure {
            Some(e) => {
                error!(unit = %key, pid = pid, error = %e, "Failed to kill unit");
                UnitStopResult::failed(&key.unit_id, e.to_string())
            }
            None => {
                info!(unit = %key, pid = pid, exit_code = ?exit_code, "Unit stopped");
                UnitStopResult::stopped(&key.unit_id)
            }
        }
    }

    async fn force_kill(&self, pid: u32) -> Result<Option<i32>, DomainError> {
        self.executor
            .kill_with_mode(pid, StopSignal::Kill, KillMode::ProcessGroup)
            .await?;
        self.executor
            .kill_with_mode(pid, StopSignal::Kill, KillMode::Process)
            .await?;
        self.executor
            .wait_for_exit(pid, self.settings.force_kill_wait)
            .await
    }

    /// Stop every tracked unit gracefully with a short timeout, dependents first
    pub async fn shutdown_all(&self) -> Vec<UnitStopResult> {
        let mut by_group: BTreeMap<String, Vec<UnitKey>> = BTreeMap::new();
        for key in locked(&self.tracked).keys() {
            by_group
                .entry(key.group_id.clone())
                .or_default()
                .push(key.clone());
        }
        info!(groups = by_group.len(), "Shutting down all units");

        let mut results = Vec::new();
        for (group_id, keys) in by_group {
            for key in self.shutdown_order(&group_id, keys).await {
                results.push(
                    self.stop_unit(&key, true, Duration::from_secs(SHUTDOWN_STOP_TIMEOUT_SEC))
                        .await,
                );
            }
        }
        results
    }

    /// Reverse dependency order of the tracked `keys`; units unknown to the stored group go last
    async fn shutdown_order(&self, group_id: &str, mut keys: Vec<UnitKey>) -> Vec<UnitKey> {
        keys.sort();
        let group = match self.repository.require(group_id).await {
            Ok(group) => group,
            Err(e) => {
                warn!(group = %group_id, error = %e, "Group unavailable, stopping in key order");
                return keys;
            }
        };
        let units: Vec<&Unit> = group.units().iter().collect();
        let order = match DependencyResolutionService::stop_order(&units) {
            Ok(order) => order,
            Err(e) => {
                warn!(group = %group_id, error = %e, "Cannot order units, stopping in key order");
                return keys;
            }
        };

        let mut ordered: Vec<UnitKey> = order
            .into_iter()
            .map(|unit_id| UnitKey::new(group_id, unit_id))
            .filter(|key| keys.contains(key))
            .collect();
        for key in keys {
            if !ordered.contains(&key) {
                ordered.push(key);
            }
        }
        ordered
    }

    // ===== Status =====

    /// Current status of a unit; folds in an exit nobody has observed yet
    pub async fn get_status(self: &Arc<Self>, group: &Group, unit_id: &str) -> UnitStatusView {
        let key = UnitKey::new(group.id(), unit_id);

        let pending = locked(&self.statuses)
            .get(&key)
            .filter(|s| s.state != UnitState::Starting && s.exit_unobserved())
            .and_then(|s| s.pid);

        if let Some(pid) = pending {
            match self.executor.exit_status(pid).await {
                Ok(Some(code)) => {
                    info!(unit = %key, pid = pid, exit_code = code, "Detected unit exit");
                    if self.reap_exited(&key, Some(code)).await {
                        let auto_restart = group.unit(unit_id).is_some_and(Unit::auto_restart);
                        if auto_restart {
                            self.schedule_restart(key.clone());
                        }
                    }
                }
                Ok(None) => {}
                // Released by a concurrent stop
                Err(e) => debug!(unit = %key, error = %e, "Exit status unavailable"),
            }
        }

        let status = locked(&self.statuses).get(&key).cloned().unwrap_or_default();
        UnitStatusView::from_status(unit_id, &status)
    }

    pub fn status_of(&self, key: &UnitKey) -> RuntimeStatus {
        locked(&self.statuses).get(key).cloned().unwrap_or_default()
    }

    fn state_of(&self, key: &UnitKey) -> UnitState {
        locked(&self.statuses)
            .get(key)
            .map(|s| s.state)
            .unwrap_or_default()
    }

    pub fn is_tracked(&self, key: &UnitKey) -> bool {
        locked(&self.tracked).contains_key(key)
    }

    /// Units of a group that still own an OS process
    pub fn tracked_units(&self, group_id: &str) -> Vec<UnitKey> {
        let mut keys: Vec<UnitKey> = locked(&self.tracked)
            .keys()
            .filter(|k| k.group_id == group_id)
            .cloned()
            .collect();
        keys.sort();
        keys
    }

    /// Drop every runtime record of a group that no longer exists
    pub fn forget_group(&self, group_id: &str) {
        locked(&self.statuses).retain(|k, _| k.group_id != group_id);
        locked(&self.restarts).retain(|k, _| k.group_id != group_id);
    }

    /// Tear down a process that exited on its own; returns whether this call folded the exit
    async fn reap_exited(&self, key: &UnitKey, exit_code: Option<i32>) -> bool {
        let tracked = locked(&self.tracked).remove(key);
        if let Some(tracked) = tracked {
            // Let the pipes drain before the capture tasks are cut off
            self.join_captures(key, tracked.captures).await;
            tracked.cancel.cancel();
            self.executor.release(tracked.pid).await;
        }
        self.ports.release(&port_owner(key));
        self.logs.stop_capture(key);

        let mut statuses = locked(&self.statuses);
        match statuses.get_mut(key) {
            Some(status) if status.exit_unobserved() => {
                match exit_code {
                    Some(code) => status.mark_exited(code),
                    None => {
                        status.health = HealthStatus::Unhealthy;
                        status.mark_failed("Process exited");
                    }
                }
                true
            }
            _ => false,
        }
    }

    async fn join_captures(&self, key: &UnitKey, captures: Vec<JoinHandle<()>>) {
        for mut handle in captures {
            if tokio::time::timeout(self.settings.capture_join_timeout, &mut handle)
                .await
                .is_err()
            {
                debug!(unit = %key, "Capture task did not finish in time, aborting");
                handle.abort();
            }
        }
    }

    // ===== Auto-restart =====

    fn schedule_restart(self: &Arc<Self>, key: UnitKey) {
        if !locked(&self.restarts_in_flight).insert(key.clone()) {
            debug!(unit = %key, "Restart already pending");
            return;
        }

        let decision = locked(&self.restarts)
            .entry(key.clone())
            .or_insert_with(|| {
                RestartTracker::new(
                    self.settings.restart_window,
                    self.settings.restart_limit,
                    self.settings.restart_max_backoff,
                )
            })
            .decide(Instant::now());

        match decision {
            RestartDecision::LimitReached { attempts } => {
                error!(unit = %key, attempts = attempts, "Restart limit reached, giving up");
                locked(&self.restarts_in_flight).remove(&key);
            }
            RestartDecision::Backoff(delay) => {
                info!(unit = %key, backoff_ms = delay.as_millis() as u64, "Scheduling auto-restart");
                let manager = Arc::clone(self);
                tokio::spawn(async move {
                    let retry = manager.restart_after(&key, delay).await;
                    locked(&manager.restarts_in_flight).remove(&key);
                    if retry {
                        manager.schedule_restart(key);
                    }
                });
            }
        }
    }

    /// One restart attempt; returns whether the unit is left crashed and wants another
    async fn restart_after(&self, key: &UnitKey, delay: Duration) -> bool {
        tokio::time::sleep(delay).await;

        if let Some(tracker) = locked(&self.restarts).get_mut(key) {
            tracker.record(Instant::now());
        }
        if self.state_of(key) != UnitState::Failed {
            info!(unit = %key, "Auto-restart superseded by a newer start or stop");
            return false;
        }

        let group = match self.repository.require(&key.group_id).await {
            Ok(group) => group,
            Err(e) => {
                warn!(unit = %key, error = %e, "Auto-restart skipped, group unavailable");
                return false;
            }
        };
        match self.start_unit(&group, &key.unit_id).await {
            Ok(result) => {
                info!(unit = %key, pid = ?result.pid, "Auto-restart succeeded");
                false
            }
            Err(e) => {
                warn!(unit = %key, error = %e, "Auto-restart failed");
                // A process still tracked after a health timeout is left for stop
                group.unit(&key.unit_id).is_some_and(Unit::auto_restart)
                    && self.state_of(key) == UnitState::Failed
                    && !self.is_tracked(key)
            }
        }
    }

    pub fn restart_attempts(&self, key: &UnitKey) -> usize {
        locked(&self.restarts)
            .get_mut(key)
            .map(|t| t.attempts_in_window(Instant::now()))
            .unwrap_or(0)
    }
}

/// Forward each line of `stream` to the log store until EOF or cancellation
async fn capture_output(
    stream: OutputStream,
    logs: Arc<LogStore>,
    key: UnitKey,
    kind: LogStream,
    cancel: CancellationToken,
) {
    let mut reader = BufReader::new(stream);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        let read = tokio::select! {
            _ = cancel.cancelled() => break,
            read = reader.read_until(b'\n', &mut buf) => read,
        };
        match read {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                if let Err(e) = logs.write(&key, line.trim_end(), kind) {
                    warn!(unit = %key, stream = %kind, error = %e, "Failed to write log line");
                }
            }
            Err(e) => {
                debug!(unit = %key, stream = %kind, error = %e, "Output stream closed");
                break;
            }
        }
    }
}
