//! Type adapters
//!
//! Ecosystem-specific command tables behind the [`TypeAdapter`] port, selected
//! by the unit's ecosystem tag.

mod build_tool;
mod package_script;
mod script;

pub use build_tool::BuildToolAdapter;
pub use package_script::PackageScriptAdapter;
pub use script::ScriptAdapter;

use crate::domain::ports::TypeAdapter;
use crate::domain::{DomainError, Ecosystem, ReloadResult, Unit};
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;
use tracing::info;

pub struct TypeAdapterRegistry {
    adapters: HashMap<Ecosystem, Arc<dyn TypeAdapter>>,
}

impl TypeAdapterRegistry {
    pub fn empty() -> Self {
        Self {
            adapters: HashMap::new(),
        }
    }

    pub fn register(&mut self, ecosystem: Ecosystem, adapter: Arc<dyn TypeAdapter>) {
        self.adapters.insert(ecosystem, adapter);
    }

    pub fn get(&self, ecosystem: Ecosystem) -> Result<Arc<dyn TypeAdapter>, DomainError> {
        self.adapters
            .get(&ecosystem)
            .cloned()
            .ok_or_else(|| DomainError::UnsupportedEcosystem(ecosystem.to_string()))
    }
}

impl Default for TypeAdapterRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(Ecosystem::Python, Arc::new(ScriptAdapter::python()));
        registry.register(Ecosystem::Generic, Arc::new(ScriptAdapter::generic()));
        registry.register(Ecosystem::Npm, Arc::new(PackageScriptAdapter::new()));
        registry.register(Ecosystem::Scala, Arc::new(BuildToolAdapter::new()));
        registry
    }
}

/// Bump a file's modification time so file watchers notice it
pub(crate) fn touch(path: &Path) -> std::io::Result<()> {
    File::options()
        .append(true)
        .open(path)?
        .set_modified(SystemTime::now())
}

/// Touch the first of `candidates` (relative to the unit's directory) that exists
pub(crate) fn touch_first(unit: &Unit, candidates: &[&str]) -> Option<ReloadResult> {
    for candidate in candidates {
        let path = unit.working_dir().join(candidate);
        if !path.is_file() {
            continue;
        }
        return Some(match touch(&path) {
            Ok(()) => {
                info!(unit = %unit.id(), file = %path.display(), "Triggered reload by touching file");
                ReloadResult::new(
                    unit.id(),
                    true,
                    format!("Reload triggered by touching {}", candidate),
                )
            }
            Err(e) => ReloadResult::new(
                unit.id(),
                false,
                format!("Failed to touch {}: {}", candidate, e),
            ),
        });
    }
    None
}

pub(crate) fn command_mentions(unit: &Unit, indicators: &[&str]) -> bool {
    let command = unit.command().to_lowercase();
    indicators.iter().any(|i| command.contains(i))
}

pub(crate) fn not_reloadable(unit: &Unit) -> ReloadResult {
    ReloadResult::new(unit.id(), false, "Application does not support hot reload")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry_covers_every_ecosystem() {
        let registry = TypeAdapterRegistry::default();
        assert_eq!(registry.get(Ecosystem::Python).unwrap().name(), "python");
        assert_eq!(registry.get(Ecosystem::Generic).unwrap().name(), "generic");
        assert_eq!(registry.get(Ecosystem::Npm).unwrap().name(), "npm");
        assert_eq!(registry.get(Ecosystem::Scala).unwrap().name(), "sbt");
    }

    #[test]
    fn test_empty_registry_reports_missing_adapter() {
        let registry = TypeAdapterRegistry::empty();
        let err = registry.get(Ecosystem::Npm).err().unwrap();
        assert_eq!(err, DomainError::UnsupportedEcosystem("npm".to_string()));
    }
}
