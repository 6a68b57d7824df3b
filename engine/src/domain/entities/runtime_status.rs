//! RuntimeStatus entity
//! Mutable per-unit runtime record owned by the lifecycle manager

use crate::domain::{DomainError, HealthStatus, UnitState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RuntimeStatus {
    pub state: UnitState,
    pub pid: Option<u32>,
    pub exit_code: Option<i32>,
    pub started_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
    pub health: HealthStatus,
    pub allocated_port: Option<u16>,
}

impl RuntimeStatus {
    fn transition(&mut self, next: UnitState) -> Result<(), DomainError> {
        if !self.state.can_transition_to(next) {
            return Err(DomainError::InvalidStateTransition {
                from: self.state.to_string(),
                to: next.to_string(),
            });
        }
        self.state = next;
        Ok(())
    }

    /// Fresh start attempt: identity of any previous run is dropped
    pub fn mark_starting(&mut self) -> Result<(), DomainError> {
        self.transition(UnitState::Starting)?;
        self.pid = None;
        self.exit_code = None;
        self.started_at = None;
        self.error = None;
        self.health = HealthStatus::Unknown;
        self.allocated_port = None;
        Ok(())
    }

    pub fn mark_spawned(&mut self, pid: u32, port: Option<u16>) {
        self.pid = Some(pid);
        self.started_at = Some(Utc::now());
        self.allocated_port = port;
    }

    pub fn mark_running(&mut self, health: HealthStatus) -> Result<(), DomainError> {
        self.transition(UnitState::Running)?;
        self.health = health;
        Ok(())
    }

    pub fn mark_failed(&mut self, error: impl Into<String>) {
        // Failure is reachable from any live state; the lifecycle manager decides when
        self.state = UnitState::Failed;
        self.error = Some(error.into());
    }

    /// The OS process is gone and was not being stopped
    pub fn mark_exited(&mut self, exit_code: i32) {
        self.exit_code = Some(exit_code);
        self.health = HealthStatus::Unhealthy;
        self.mark_failed(format!("Process exited with code {}", exit_code));
    }

    pub fn mark_stopping(&mut self) {
        self.state = UnitState::Stopping;
    }

    /// An exit not yet folded into this record
    pub fn exit_unobserved(&self) -> bool {
        !matches!(self.state, UnitState::Stopped | UnitState::Stopping)
            && self.pid.is_some()
            && self.exit_code.is_none()
    }

    pub fn uptime_seconds(&self) -> Option<u64> {
        if !self.state.is_active() {
            return None;
        }
        self.started_at
            .map(|started| (Utc::now() - started).num_seconds().max(0) as u64)
    }
}
