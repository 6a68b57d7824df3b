//! In-Memory Group Repository
//! Thread-safe implementation of GroupRepository port

use crate::domain::{ports::GroupRepository, DomainError, Group};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info};

/// Thread-safe in-memory group repository, used when no data directory is wanted
#[derive(Clone)]
pub struct InMemoryGroupRepository {
    groups: Arc<RwLock<HashMap<String, Group>>>,
}

impl InMemoryGroupRepository {
    pub fn new() -> Self {
        Self {
            groups: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Group>> {
        self.groups.read().unwrap_or_else(|p| p.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Group>> {
        self.groups.write().unwrap_or_else(|p| p.into_inner())
    }
}

impl Default for InMemoryGroupRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GroupRepository for InMemoryGroupRepository {
    async fn save(&self, group: Group) -> Result<(), DomainError> {
        group.validate()?;
        debug!(group = %group.id(), name = %group.name(), "Saving group to repository");

        let mut groups = self.write();
        groups.insert(group.id().to_string(), group);

        info!(total_groups = groups.len(), "Group saved successfully");
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Group>, DomainError> {
        Ok(self.read().get(id).cloned())
    }

    async fn find_all(&self) -> Result<Vec<Group>, DomainError> {
        let mut all: Vec<Group> = self.read().values().cloned().collect();
        all.sort_by(|a, b| b.updated_at().cmp(&a.updated_at()));
        Ok(all)
    }

    async fn delete(&self, id: &str) -> Result<bool, DomainError> {
        debug!(group = %id, "Deleting group from repository");
        Ok(self.write().remove(id).is_some())
    }
}
