//! Group entity
//! A named, validated set of interdependent units

use crate::domain::services::DependencyResolutionService;
use crate::domain::{DomainError, Unit};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Group definition
///
/// Invariants (checked by [`Group::validate`] on every construction and update):
/// unit ids are unique, every dependency resolves inside the group, and the
/// dependency relation is acyclic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    id: String,
    name: String,
    #[serde(default)]
    description: Option<String>,
    units: Vec<Unit>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Caller-supplied content of a group, without identity or timestamps
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroupDraft {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub units: Vec<Unit>,
}

impl GroupDraft {
    pub fn new(name: impl Into<String>, units: Vec<Unit>) -> Self {
        Self {
            name: name.into(),
            description: None,
            units,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl Group {
    /// Build a group, resolving every unit's working directory and enforcing all invariants
    pub fn new(id: impl Into<String>, draft: GroupDraft) -> Result<Self, DomainError> {
        let now = Utc::now();
        let mut group = Self {
            id: id.into(),
            name: draft.name,
            description: draft.description,
            units: draft.units,
            created_at: now,
            updated_at: now,
        };
        for unit in &mut group.units {
            unit.resolve_working_dir()?;
        }
        group.validate()?;
        Ok(group)
    }

    /// New version of this group with the same identity and creation time
    pub fn revise(&self, draft: GroupDraft) -> Result<Self, DomainError> {
        let mut revised = Self::new(self.id.clone(), draft)?;
        revised.created_at = self.created_at;
        if revised.updated_at <= self.updated_at {
            revised.updated_at = self.updated_at + chrono::Duration::milliseconds(1);
        }
        Ok(revised)
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        validate_group_id(&self.id)?;
        if self.name.trim().is_empty() {
            return Err(DomainError::InvalidGroup("group name cannot be empty".to_string()));
        }

        let mut ids = HashSet::new();
        for unit in &self.units {
            unit.validate()?;
            if !ids.insert(unit.id()) {
                return Err(DomainError::DuplicateUnit(unit.id().to_string()));
            }
        }

        for unit in &self.units {
            for dep in unit.depends_on() {
                if !ids.contains(dep.as_str()) {
                    return Err(DomainError::UnknownDependency {
                        unit: unit.id().to_string(),
                        dependency: dep.clone(),
                    });
                }
            }
        }

        if let Some(root) = DependencyResolutionService::find_cycle(&self.units) {
            return Err(DomainError::CircularDependency(root));
        }

        Ok(())
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    pub fn unit(&self, unit_id: &str) -> Option<&Unit> {
        self.units.iter().find(|u| u.id() == unit_id)
    }

    pub fn require_unit(&self, unit_id: &str) -> Result<&Unit, DomainError> {
        self.unit(unit_id)
            .ok_or_else(|| DomainError::UnitNotFound(unit_id.to_string()))
    }

    /// Units selected by `unit_ids` in group order, or all units when None
    pub fn select(&self, unit_ids: Option<&[String]>) -> Result<Vec<&Unit>, DomainError> {
        match unit_ids {
            None => Ok(self.units.iter().collect()),
            Some(ids) => {
                for id in ids {
                    self.require_unit(id)?;
                }
                Ok(self
                    .units
                    .iter()
                    .filter(|u| ids.iter().any(|id| id == u.id()))
                    .collect())
            }
        }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

/// Group ids become file and directory names
fn validate_group_id(id: &str) -> Result<(), DomainError> {
    if id.trim().is_empty() {
        return Err(DomainError::InvalidGroup("group id cannot be empty".to_string()));
    }
    if id == "." || id == ".." || id.contains('/') || id.contains('\\') || id.contains('\0') {
        return Err(DomainError::InvalidGroup(format!(
            "group id '{}' must not contain path separators",
            id
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn unit(dir: &std::path::Path, id: &str, deps: &[&str]) -> Unit {
        let mut builder = Unit::builder(id, "true").working_dir(dir);
        for dep in deps {
            builder = builder.depends_on(*dep);
        }
        builder.build().unwrap()
    }

    #[test]
    fn test_valid_group() {
        let dir = tempdir().unwrap();
        let group = Group::new(
            "g",
            GroupDraft::new(
                "stack",
                vec![unit(dir.path(), "db", &[]), unit(dir.path(), "api", &["db"])],
            ),
        )
        .unwrap();

        assert_eq!(group.units().len(), 2);
        assert_eq!(group.require_unit("api").unwrap().depends_on(), ["db"]);
        assert!(group.require_unit("web").is_err());
    }

    #[test]
    fn test_duplicate_unit_ids() {
        let dir = tempdir().unwrap();
        let err = Group::new(
            "g",
            GroupDraft::new("stack", vec![unit(dir.path(), "db", &[]), unit(dir.path(), "db", &[])]),
        )
        .unwrap_err();
        assert_eq!(err, DomainError::DuplicateUnit("db".to_string()));
    }

    #[test]
    fn test_unknown_dependency() {
        let dir = tempdir().unwrap();
        let err = Group::new(
            "g",
            GroupDraft::new("stack", vec![unit(dir.path(), "api", &["db"])]),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Unit 'api' depends on non-existent unit 'db'");
    }

    #[test]
    fn test_cycle_names_dfs_root() {
        let dir = tempdir().unwrap();
        let err = Group::new(
            "g",
            GroupDraft::new(
                "stack",
                vec![
                    unit(dir.path(), "a", &["b"]),
                    unit(dir.path(), "b", &["c"]),
                    unit(dir.path(), "c", &["a"]),
                ],
            ),
        )
        .unwrap_err();
        assert_eq!(err, DomainError::CircularDependency("a".to_string()));
    }

    #[test]
    fn test_select_preserves_group_order() {
        let dir = tempdir().unwrap();
        let group = Group::new(
            "g",
            GroupDraft::new(
                "stack",
                vec![
                    unit(dir.path(), "db", &[]),
                    unit(dir.path(), "cache", &[]),
                    unit(dir.path(), "api", &["db"]),
                ],
            ),
        )
        .unwrap();

        let ids = vec!["api".to_string(), "db".to_string()];
        let picked: Vec<&str> = group.select(Some(ids.as_slice())).unwrap().iter().map(|u| u.id()).collect();
        assert_eq!(picked, ["db", "api"]);

        let missing = vec!["worker".to_string()];
        assert!(group.select(Some(missing.as_slice())).unwrap_err().is_not_found());
    }

    #[test]
    fn test_revise_keeps_identity() {
        let dir = tempdir().unwrap();
        let group = Group::new("g", GroupDraft::new("stack", vec![unit(dir.path(), "db", &[])])).unwrap();
        let revised = group
            .revise(GroupDraft::new("stack v2", vec![unit(dir.path(), "db", &[])]))
            .unwrap();

        assert_eq!(revised.id(), "g");
        assert_eq!(revised.name(), "stack v2");
        assert_eq!(revised.created_at(), group.created_at());
        assert!(revised.updated_at() > group.updated_at());
    }
}
