//! Health check value objects
//! Descriptor of how to check a unit and the tri-state verdict a check yields

use crate::domain::constants::{DEFAULT_HEALTH_INTERVAL_SEC, DEFAULT_HEALTH_TIMEOUT_SEC};
use crate::domain::DomainError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Type of health check to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HealthCheckKind {
    #[default]
    Http,
    Tcp,
    Process,
}

impl std::fmt::Display for HealthCheckKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http => write!(f, "http"),
            Self::Tcp => write!(f, "tcp"),
            Self::Process => write!(f, "process"),
        }
    }
}

/// Health check descriptor
///
/// Deserialization goes through [`HealthCheckSpec`] so a descriptor missing its
/// kind-specific field can never be observed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "HealthCheckSpec")]
pub struct HealthCheck {
    #[serde(rename = "type")]
    kind: HealthCheckKind,
    url: Option<String>,
    port: Option<u16>,
    interval: u64,
    timeout: u64,
}

/// Unvalidated wire form of a health check
#[derive(Debug, Clone, Deserialize)]
pub struct HealthCheckSpec {
    #[serde(rename = "type", alias = "kind")]
    pub kind: HealthCheckKind,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default = "default_interval")]
    pub interval: u64,
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

fn default_interval() -> u64 {
    DEFAULT_HEALTH_INTERVAL_SEC
}

fn default_timeout() -> u64 {
    DEFAULT_HEALTH_TIMEOUT_SEC
}

impl TryFrom<HealthCheckSpec> for HealthCheck {
    type Error = DomainError;

    fn try_from(spec: HealthCheckSpec) -> Result<Self, Self::Error> {
        let check = Self {
            kind: spec.kind,
            url: spec.url,
            port: spec.port,
            interval: spec.interval,
            timeout: spec.timeout,
        };
        check.validate()?;
        Ok(check)
    }
}

impl HealthCheck {
    /// HTTP GET check against `url`
    pub fn http(url: impl Into<String>) -> Result<Self, DomainError> {
        Self::try_from(HealthCheckSpec {
            kind: HealthCheckKind::Http,
            url: Some(url.into()),
            port: None,
            interval: DEFAULT_HEALTH_INTERVAL_SEC,
            timeout: DEFAULT_HEALTH_TIMEOUT_SEC,
        })
    }

    /// TCP connect check against 127.0.0.1:`port`
    pub fn tcp(port: u16) -> Result<Self, DomainError> {
        Self::try_from(HealthCheckSpec {
            kind: HealthCheckKind::Tcp,
            url: None,
            port: Some(port),
            interval: DEFAULT_HEALTH_INTERVAL_SEC,
            timeout: DEFAULT_HEALTH_TIMEOUT_SEC,
        })
    }

    /// Liveness only
    pub fn process() -> Self {
        Self {
            kind: HealthCheckKind::Process,
            url: None,
            port: None,
            interval: DEFAULT_HEALTH_INTERVAL_SEC,
            timeout: DEFAULT_HEALTH_TIMEOUT_SEC,
        }
    }

    pub fn with_interval(mut self, interval: u64) -> Result<Self, DomainError> {
        self.interval = interval;
        self.validate()?;
        Ok(self)
    }

    pub fn with_timeout(mut self, timeout: u64) -> Result<Self, DomainError> {
        self.timeout = timeout;
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.interval < 1 {
            return Err(DomainError::InvalidHealthCheck(
                "interval must be at least 1 second".to_string(),
            ));
        }
        if self.timeout < 1 {
            return Err(DomainError::InvalidHealthCheck(
                "timeout must be at least 1 second".to_string(),
            ));
        }

        match self.kind {
            HealthCheckKind::Http => match self.url.as_deref() {
                Some(url) if !url.trim().is_empty() => Ok(()),
                _ => Err(DomainError::InvalidHealthCheck(
                    "URL is required for HTTP health check".to_string(),
                )),
            },
            HealthCheckKind::Tcp => {
                if self.port.is_none() {
                    return Err(DomainError::InvalidHealthCheck(
                        "port is required for TCP health check".to_string(),
                    ));
                }
                Ok(())
            }
            HealthCheckKind::Process => Ok(()),
        }
    }

    pub fn kind(&self) -> HealthCheckKind {
        self.kind
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

/// Outcome of a health check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
    #[default]
    Unknown,
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Healthy => write!(f, "healthy"),
            Self::Unhealthy => write!(f, "unhealthy"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}
