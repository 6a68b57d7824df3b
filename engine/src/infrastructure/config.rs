//! Configuration loading
//!
//! `ServerConfig` comes from `SV_*` environment variables or from a YAML file
//! named by `SV_CONFIG_FILE`. Group definitions are separate YAML documents
//! loaded with [`GroupFile::load`].

use crate::domain::constants::{
    BYTES_PER_MB, DEFAULT_LOG_MAX_SIZE_MB, DEFAULT_LOG_RETENTION_RUNS, DEFAULT_STOP_TIMEOUT_SEC,
};
use crate::domain::{DomainError, GroupDraft, Unit};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

const DEFAULT_LOG_LEVEL: &str = "info";
const DATA_DIR_NAME: &str = ".stackvisor";

pub const CONFIG_FILE_ENV: &str = "SV_CONFIG_FILE";

/// Engine-wide settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Root for `groups/`, `logs/` and `state/`
    pub data_dir: PathBuf,

    /// Archived log runs kept per unit
    pub log_retention_runs: usize,

    /// Size at which the current log is rotated
    pub log_max_size_mb: u64,

    /// Graceful stop timeout in seconds
    pub stop_timeout_secs: u64,

    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_retention_runs: DEFAULT_LOG_RETENTION_RUNS,
            log_max_size_mb: DEFAULT_LOG_MAX_SIZE_MB,
            stop_timeout_secs: DEFAULT_STOP_TIMEOUT_SEC,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(env::temp_dir)
        .join(DATA_DIR_NAME)
}

impl ServerConfig {
    /// Configuration from `SV_*` environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            data_dir: env::var_os("SV_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            log_retention_runs: parse_env("SV_LOG_RETENTION_RUNS", defaults.log_retention_runs),
            log_max_size_mb: parse_env("SV_LOG_MAX_SIZE_MB", defaults.log_max_size_mb),
            stop_timeout_secs: parse_env("SV_STOP_TIMEOUT", defaults.stop_timeout_secs),
            log_level: env::var("SV_LOG_LEVEL").unwrap_or(defaults.log_level),
        }
    }

    /// Configuration from a YAML file; missing keys take their defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DomainError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|e| {
            DomainError::InvalidConfig(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: Self = serde_yaml::from_str(&raw).map_err(|e| {
            DomainError::InvalidConfig(format!("cannot parse {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// `SV_CONFIG_FILE` when set, otherwise the environment
    pub fn resolve() -> Result<Self, DomainError> {
        match env::var_os(CONFIG_FILE_ENV) {
            Some(path) => Self::load(PathBuf::from(path)),
            None => {
                let config = Self::from_env();
                config.validate()?;
                Ok(config)
            }
        }
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.log_retention_runs == 0 {
            return Err(DomainError::InvalidConfig(
                "log_retention_runs must be at least 1".to_string(),
            ));
        }
        if self.log_max_size_mb == 0 {
            return Err(DomainError::InvalidConfig(
                "log_max_size_mb must be at least 1".to_string(),
            ));
        }
        if self.data_dir.as_os_str().is_empty() {
            return Err(DomainError::InvalidConfig("data_dir cannot be empty".to_string()));
        }
        Ok(())
    }

    pub fn groups_dir(&self) -> PathBuf {
        self.data_dir.join("groups")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }

    pub fn state_dir(&self) -> PathBuf {
        self.data_dir.join("state")
    }

    pub fn log_max_size_bytes(&self) -> u64 {
        self.log_max_size_mb.saturating_mul(BYTES_PER_MB)
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_secs(self.stop_timeout_secs)
    }

    pub fn ensure_directories(&self) -> Result<(), DomainError> {
        for dir in [self.groups_dir(), self.logs_dir(), self.state_dir()] {
            fs::create_dir_all(&dir).map_err(|e| {
                DomainError::Storage(format!("cannot create {}: {}", dir.display(), e))
            })?;
        }
        Ok(())
    }
}

fn parse_env<T: FromStr>(var: &str, default: T) -> T {
    match env::var(var) {
        Ok(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                warn!(var = var, value = %raw, "Ignoring unparseable setting, using default");
                default
            }
        },
        Err(_) => default,
    }
}

/// A group definition document
#[derive(Debug, Clone, Deserialize)]
pub struct GroupFile {
    /// Stable id to upsert under; a fresh id is assigned when absent
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub units: Vec<Unit>,
}

impl GroupFile {
    /// Parse a definition; relative working directories are taken from the file's directory
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DomainError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|e| {
            DomainError::InvalidConfig(format!("cannot read {}: {}", path.display(), e))
        })?;
        let mut file: Self = serde_yaml::from_str(&raw).map_err(|e| {
            DomainError::InvalidGroup(format!("cannot parse {}: {}", path.display(), e))
        })?;

        let base = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        for unit in &mut file.units {
            unit.anchor_working_dir(base);
        }
        Ok(file)
    }

    pub fn into_draft(self) -> (Option<String>, GroupDraft) {
        let draft = GroupDraft {
            name: self.name,
            description: self.description,
            units: self.units,
        };
        (self.id, draft)
    }
}
