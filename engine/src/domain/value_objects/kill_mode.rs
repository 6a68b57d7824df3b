//! KillMode Value Object
//!
//! Defines which processes a termination signal reaches

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum KillMode {
    /// Signal the whole process group led by the unit's shell - Default
    /// Units are spawned as group leaders so children die with them
    #[default]
    ProcessGroup,

    /// Signal only the main process
    Process,
}

impl fmt::Display for KillMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::ProcessGroup => "process-group",
            Self::Process => "process",
        };
        write!(f, "{}", s)
    }
}

/// Signals the engine sends to unit processes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StopSignal {
    /// Graceful termination request
    Terminate,
    /// Forceful kill
    Kill,
}

impl fmt::Display for StopSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Terminate => write!(f, "SIGTERM"),
            Self::Kill => write!(f, "SIGKILL"),
        }
    }
}
