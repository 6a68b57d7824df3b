//! UnitKey Value Object
//!
//! Identifies one unit of one group in the runtime tables

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitKey {
    pub group_id: String,
    pub unit_id: String,
}

impl UnitKey {
    pub fn new(group_id: impl Into<String>, unit_id: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
            unit_id: unit_id.into(),
        }
    }
}

impl fmt::Display for UnitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group_id, self.unit_id)
    }
}
