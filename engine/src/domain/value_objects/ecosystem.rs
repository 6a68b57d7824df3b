//! Ecosystem Value Object
//!
//! Tag selecting the type adapter that knows how to run a unit

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Ecosystem {
    Python,
    Npm,
    Scala,
    /// Plain shell command, no tooling conventions
    #[default]
    Generic,
}

impl Ecosystem {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "python" => Some(Self::Python),
            "npm" | "node" => Some(Self::Npm),
            "scala" | "sbt" => Some(Self::Scala),
            "generic" | "shell" => Some(Self::Generic),
            _ => None,
        }
    }
}

impl fmt::Display for Ecosystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Python => "python",
            Self::Npm => "npm",
            Self::Scala => "scala",
            Self::Generic => "generic",
        };
        write!(f, "{}", s)
    }
}
