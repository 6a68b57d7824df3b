use crate::domain::{HealthStatus, RuntimeStatus, UnitState};
use serde::{Deserialize, Serialize};

/// Snapshot of one unit's runtime status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitStatusView {
    pub unit_id: String,
    pub state: UnitState,
    pub pid: Option<u32>,
    pub exit_code: Option<i32>,
    pub health: HealthStatus,
    pub uptime_seconds: Option<u64>,
    pub error: Option<String>,
    pub port: Option<u16>,
}

impl UnitStatusView {
    pub fn from_status(unit_id: impl Into<String>, status: &RuntimeStatus) -> Self {
        Self {
            unit_id: unit_id.into(),
            state: status.state,
            pid: status.pid,
            exit_code: status.exit_code,
            health: status.health,
            uptime_seconds: status.uptime_seconds(),
            error: status.error.clone(),
            port: status.allocated_port,
        }
    }
}
