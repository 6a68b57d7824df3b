//! Repository port for persisting groups
//! This is an interface - implementations are in infrastructure layer

use crate::domain::{DomainError, Group};
use async_trait::async_trait;

#[async_trait]
pub trait GroupRepository: Send + Sync {
    /// Save a group (create or replace)
    async fn save(&self, group: Group) -> Result<(), DomainError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Group>, DomainError>;

    /// All groups, most recently updated first
    async fn find_all(&self) -> Result<Vec<Group>, DomainError>;

    /// Delete a group; returns whether it existed
    async fn delete(&self, id: &str) -> Result<bool, DomainError>;

    async fn exists(&self, id: &str) -> Result<bool, DomainError> {
        Ok(self.find_by_id(id).await?.is_some())
    }

    async fn require(&self, id: &str) -> Result<Group, DomainError> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::GroupNotFound(id.to_string()))
    }
}
