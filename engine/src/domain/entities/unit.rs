//! Unit entity
//! One supervised process definition inside a group

use crate::domain::constants::DEFAULT_STARTUP_TIMEOUT_SEC;
use crate::domain::{DomainError, Ecosystem, HealthCheck};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Unit definition. Immutable once part of a group version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    id: String,
    name: String,
    #[serde(default, rename = "type", alias = "ecosystem")]
    ecosystem: Ecosystem,
    #[serde(default = "default_working_dir")]
    working_dir: PathBuf,
    command: String,
    #[serde(default)]
    env: HashMap<String, String>,
    #[serde(default)]
    build_command: Option<String>,
    #[serde(default)]
    health_check: Option<HealthCheck>,
    #[serde(default)]
    auto_restart: bool,
    #[serde(default = "default_startup_timeout")]
    startup_timeout: u64,
    #[serde(default)]
    depends_on: Vec<String>,
    #[serde(default)]
    port: Option<u16>,
    #[serde(default)]
    port_env_var: Option<String>,
}

fn default_startup_timeout() -> u64 {
    DEFAULT_STARTUP_TIMEOUT_SEC
}

fn default_working_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Unit {
    /// Create a new unit builder (the only way to construct a validated Unit in code)
    pub fn builder(id: impl Into<String>, command: impl Into<String>) -> UnitBuilder {
        UnitBuilder::new(id, command)
    }

    /// Checks that need no filesystem access
    pub fn validate(&self) -> Result<(), DomainError> {
        validate_unit_id(&self.id)?;

        if self.name.trim().is_empty() {
            return Err(DomainError::InvalidUnit(format!(
                "unit '{}' has an empty name",
                self.id
            )));
        }
        if self.command.trim().is_empty() {
            return Err(DomainError::InvalidUnit(format!(
                "unit '{}' has an empty command",
                self.id
            )));
        }
        if self.startup_timeout < 1 {
            return Err(DomainError::InvalidUnit(format!(
                "unit '{}' startup_timeout must be at least 1 second",
                self.id
            )));
        }
        if let Some(check) = &self.health_check {
            check.validate()?;
        }
        if let Some(var) = &self.port_env_var {
            if var.is_empty() || var.contains('=') || var.contains('\0') {
                return Err(DomainError::InvalidUnit(format!(
                    "unit '{}' has an invalid port_env_var '{}'",
                    self.id, var
                )));
            }
        }

        let mut seen = HashSet::new();
        for dep in &self.depends_on {
            if dep == &self.id {
                return Err(DomainError::CircularDependency(self.id.clone()));
            }
            if !seen.insert(dep.as_str()) {
                return Err(DomainError::InvalidUnit(format!(
                    "unit '{}' lists dependency '{}' twice",
                    self.id, dep
                )));
            }
        }

        Ok(())
    }

    /// Resolve the working directory to an absolute path and require that it exists
    pub fn resolve_working_dir(&mut self) -> Result<(), DomainError> {
        let absolute = std::path::absolute(&self.working_dir).map_err(|e| {
            DomainError::InvalidUnit(format!(
                "unit '{}' working_dir '{}': {}",
                self.id,
                self.working_dir.display(),
                e
            ))
        })?;

        if !absolute.is_dir() {
            return Err(DomainError::InvalidUnit(format!(
                "unit '{}' working_dir '{}' is not an existing directory",
                self.id,
                absolute.display()
            )));
        }

        self.working_dir = absolute;
        Ok(())
    }

    /// Interpret a relative working directory against `base` (e.g. a definition file's directory)
    pub fn anchor_working_dir(&mut self, base: &Path) {
        if self.working_dir.is_relative() {
            self.working_dir = base.join(&self.working_dir);
        }
    }

    // ===== Accessors =====

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ecosystem(&self) -> Ecosystem {
        self.ecosystem
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn env(&self) -> &HashMap<String, String> {
        &self.env
    }

    pub fn build_command(&self) -> Option<&str> {
        self.build_command.as_deref()
    }

    pub fn health_check(&self) -> Option<&HealthCheck> {
        self.health_check.as_ref()
    }

    pub fn auto_restart(&self) -> bool {
        self.auto_restart
    }

    pub fn startup_timeout(&self) -> Duration {
        Duration::from_secs(self.startup_timeout)
    }

    pub fn depends_on(&self) -> &[String] {
        &self.depends_on
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    pub fn port_env_var(&self) -> Option<&str> {
        self.port_env_var.as_deref()
    }

    /// Whether a port must be allocated before spawn
    pub fn wants_port(&self) -> bool {
        self.port.is_some() || self.port_env_var.is_some()
    }
}

/// Unit ids become directory names under the log root
fn validate_unit_id(id: &str) -> Result<(), DomainError> {
    if id.trim().is_empty() {
        return Err(DomainError::InvalidUnit("unit id cannot be empty".to_string()));
    }
    if id == "." || id == ".." || id.contains('/') || id.contains('\\') || id.contains('\0') {
        return Err(DomainError::InvalidUnit(format!(
            "unit id '{}' must not contain path separators",
            id
        )));
    }
    Ok(())
}

/// Builder for [`Unit`]
#[derive(Debug, Clone)]
pub struct UnitBuilder {
    id: String,
    command: String,
    name: Option<String>,
    ecosystem: Ecosystem,
    working_dir: Option<PathBuf>,
    env: HashMap<String, String>,
    build_command: Option<String>,
    health_check: Option<HealthCheck>,
    auto_restart: bool,
    startup_timeout: u64,
    depends_on: Vec<String>,
    port: Option<u16>,
    port_env_var: Option<String>,
}

impl UnitBuilder {
    pub fn new(id: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            command: command.into(),
            name: None,
            ecosystem: Ecosystem::default(),
            working_dir: None,
            env: HashMap::new(),
            build_command: None,
            health_check: None,
            auto_restart: false,
            startup_timeout: DEFAULT_STARTUP_TIMEOUT_SEC,
            depends_on: Vec::new(),
            port: None,
            port_env_var: None,
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn ecosystem(mut self, ecosystem: Ecosystem) -> Self {
        self.ecosystem = ecosystem;
        self
    }

    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn build_command(mut self, command: impl Into<String>) -> Self {
        self.build_command = Some(command.into());
        self
    }

    pub fn health_check(mut self, check: HealthCheck) -> Self {
        self.health_check = Some(check);
        self
    }

    pub fn auto_restart(mut self, enabled: bool) -> Self {
        self.auto_restart = enabled;
        self
    }

    pub fn startup_timeout(mut self, seconds: u64) -> Self {
        self.startup_timeout = seconds;
        self
    }

    pub fn depends_on(mut self, unit_id: impl Into<String>) -> Self {
        self.depends_on.push(unit_id.into());
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn port_env_var(mut self, var: impl Into<String>) -> Self {
        self.port_env_var = Some(var.into());
        self
    }

    pub fn build(self) -> Result<Unit, DomainError> {
        let working_dir = match self.working_dir {
            Some(dir) => dir,
            None => std::env::current_dir()?,
        };

        let mut unit = Unit {
            name: self.name.unwrap_or_else(|| self.id.clone()),
            id: self.id,
            ecosystem: self.ecosystem,
            working_dir,
            command: self.command,
            env: self.env,
            build_command: self.build_command,
            health_check: self.health_check,
            auto_restart: self.auto_restart,
            startup_timeout: self.startup_timeout,
            depends_on: self.depends_on,
            port: self.port,
            port_env_var: self.port_env_var,
        };
        unit.validate()?;
        unit.resolve_working_dir()?;
        Ok(unit)
    }
}
