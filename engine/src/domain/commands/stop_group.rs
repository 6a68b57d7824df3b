use crate::domain::UnitStartResult;
use serde::{Deserialize, Serialize};

/// Outcome of stopping one unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitStopResult {
    pub unit_id: String,
    pub success: bool,
    pub message: String,
}

impl UnitStopResult {
    pub fn stopped(unit_id: impl Into<String>) -> Self {
        Self {
            unit_id: unit_id.into(),
            success: true,
            message: "Unit stopped".to_string(),
        }
    }

    pub fn failed(unit_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            unit_id: unit_id.into(),
            success: false,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RestartGroupResult {
    pub stop_results: Vec<UnitStopResult>,
    pub start_results: Vec<UnitStartResult>,
}
