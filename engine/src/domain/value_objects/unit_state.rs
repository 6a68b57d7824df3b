//! UnitState Value Object
//!
//! Lifecycle state of a supervised unit

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UnitState {
    #[default]
    Stopped,
    Starting,
    Running,
    Stopping,
    Failed,
}

impl UnitState {
    /// Valid edges of the lifecycle state machine
    ///
    /// ```text
    /// Stopped -> Starting -> Running -> Stopping -> Stopped
    /// Starting|Running -> Failed -> Starting (restart)
    /// ```
    pub fn can_transition_to(&self, next: UnitState) -> bool {
        use UnitState::*;
        matches!(
            (self, next),
            (Stopped, Starting)
                | (Starting, Running)
                | (Starting, Failed)
                | (Starting, Stopping)
                | (Running, Stopping)
                | (Running, Failed)
                | (Stopping, Stopped)
                | (Failed, Starting)
                | (Failed, Stopping)
        )
    }

    /// States in which an OS process is expected to exist
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Starting | Self::Running)
    }
}

impl fmt::Display for UnitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Stopped => "stopped",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}
