use crate::domain::DomainError;
use serde::{Deserialize, Serialize};

/// Outcome of starting one unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitStartResult {
    pub unit_id: String,
    pub success: bool,
    pub message: String,
    pub pid: Option<u32>,
    pub port: Option<u16>,
}

impl UnitStartResult {
    pub fn started(unit_id: impl Into<String>, message: impl Into<String>, pid: u32, port: Option<u16>) -> Self {
        Self {
            unit_id: unit_id.into(),
            success: true,
            message: message.into(),
            pid: Some(pid),
            port,
        }
    }

    pub fn failed(unit_id: impl Into<String>, error: &DomainError) -> Self {
        Self {
            unit_id: unit_id.into(),
            success: false,
            message: error.to_string(),
            pid: None,
            port: None,
        }
    }
}
