//! Domain errors
//! Every failure the engine can surface to a caller maps onto one of these variants

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    // ===== Validation =====
    #[error("Invalid unit definition: {0}")]
    InvalidUnit(String),

    #[error("Invalid health check: {0}")]
    InvalidHealthCheck(String),

    #[error("Invalid group definition: {0}")]
    InvalidGroup(String),

    #[error("Duplicate unit id '{0}' in group")]
    DuplicateUnit(String),

    #[error("Unit '{unit}' depends on non-existent unit '{dependency}'")]
    UnknownDependency { unit: String, dependency: String },

    #[error("Circular dependency detected involving '{0}'")]
    CircularDependency(String),

    #[error("Dependency cycle among units: {}", .0.join(", "))]
    DependencyCycle(Vec<String>),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    // ===== Not found =====
    #[error("Group '{0}' not found")]
    GroupNotFound(String),

    #[error("Unit '{0}' not found")]
    UnitNotFound(String),

    #[error("Log run '{0}' not found")]
    RunNotFound(String),

    #[error("Process {0} is not tracked")]
    ProcessNotFound(u32),

    // ===== Dependencies =====
    #[error("Dependency '{0}' is not running")]
    DependencyNotRunning(String),

    #[error("Dependency '{0}' is unhealthy")]
    DependencyUnhealthy(String),

    // ===== Resources =====
    #[error("Port {port} is already allocated to another unit ({owner})")]
    PortAlreadyAllocated { port: u16, owner: String },

    #[error("Port {port} is already in use: {reason}")]
    PortUnavailable { port: u16, reason: String },

    // ===== Build =====
    #[error("Build failed: {0}")]
    BuildFailed(String),

    #[error("Build timeout ({0} minutes)")]
    BuildTimeout(u64),

    // ===== Process =====
    #[error("Failed to spawn process: {0}")]
    SpawnFailed(String),

    #[error("Process exited during startup with code {0}")]
    ExitedDuringStartup(i32),

    #[error("Failed to signal process {pid}: {reason}")]
    SignalFailed { pid: u32, reason: String },

    #[error("Startup health check failed after {0}s")]
    HealthCheckTimeout(u64),

    #[error("Unit '{0}' is already running")]
    AlreadyRunning(String),

    #[error("Unit '{0}' is not running")]
    NotRunning(String),

    #[error("No type adapter registered for '{0}'")]
    UnsupportedEcosystem(String),

    // ===== Storage =====
    #[error("Storage error: {0}")]
    Storage(String),
}

impl DomainError {
    /// True for definition problems that are rejected before any state change
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidUnit(_)
                | Self::InvalidHealthCheck(_)
                | Self::InvalidGroup(_)
                | Self::DuplicateUnit(_)
                | Self::UnknownDependency { .. }
                | Self::CircularDependency(_)
                | Self::DependencyCycle(_)
                | Self::InvalidConfig(_)
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::GroupNotFound(_)
                | Self::UnitNotFound(_)
                | Self::RunNotFound(_)
                | Self::ProcessNotFound(_)
        )
    }

    pub fn is_resource(&self) -> bool {
        matches!(
            self,
            Self::PortAlreadyAllocated { .. } | Self::PortUnavailable { .. }
        )
    }
}

impl From<std::io::Error> for DomainError {
    fn from(err: std::io::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        Self::Storage(format!("JSON: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, DomainError>;
