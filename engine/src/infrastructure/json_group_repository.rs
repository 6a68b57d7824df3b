//! JSON file group repository
//!
//! One `<id>.json` document per group under the store directory. Writes go to
//! a temporary sibling first and are renamed into place, so readers only ever
//! see complete documents.

use crate::domain::{ports::GroupRepository, DomainError, Group};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockWriteGuard};
use tracing::{debug, info, warn};

pub struct JsonFileGroupRepository {
    dir: PathBuf,
    /// Loaded lazily on first access
    cache: RwLock<Option<HashMap<String, Group>>>,
}

impl JsonFileGroupRepository {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, DomainError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            cache: RwLock::new(None),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }

    fn load_all(&self) -> Result<HashMap<String, Group>, DomainError> {
        let mut groups = HashMap::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match Self::read_group(&path) {
                Ok(group) => {
                    groups.insert(group.id().to_string(), group);
                }
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable group file"),
            }
        }
        debug!(count = groups.len(), dir = %self.dir.display(), "Loaded groups from disk");
        Ok(groups)
    }

    fn read_group(path: &Path) -> Result<Group, DomainError> {
        let raw = fs::read_to_string(path)?;
        let group: Group = serde_json::from_str(&raw)?;
        group.validate()?;
        Ok(group)
    }

    fn write_atomic(&self, group: &Group) -> Result<(), DomainError> {
        let path = self.path_for(group.id());
        let tmp = path.with_extension("json.tmp");
        let body = serde_json::to_string_pretty(group)?;

        fs::write(&tmp, body)?;
        if let Err(e) = fs::rename(&tmp, &path) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }

    /// Cache guard, populated from disk on first use
    fn cache(&self) -> Result<RwLockWriteGuard<'_, Option<HashMap<String, Group>>>, DomainError> {
        let mut guard = self.cache.write().unwrap_or_else(|p| p.into_inner());
        if guard.is_none() {
            *guard = Some(self.load_all()?);
        }
        Ok(guard)
    }
}

#[async_trait]
impl GroupRepository for JsonFileGroupRepository {
    async fn save(&self, group: Group) -> Result<(), DomainError> {
        group.validate()?;
        let mut cache = self.cache()?;
        self.write_atomic(&group)?;

        info!(group = %group.id(), name = %group.name(), "Group saved");
        if let Some(groups) = cache.as_mut() {
            groups.insert(group.id().to_string(), group);
        }
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Group>, DomainError> {
        let cache = self.cache()?;
        Ok(cache.as_ref().and_then(|groups| groups.get(id).cloned()))
    }

    async fn find_all(&self) -> Result<Vec<Group>, DomainError> {
        let cache = self.cache()?;
        let mut all: Vec<Group> = cache
            .as_ref()
            .map(|groups| groups.values().cloned().collect())
            .unwrap_or_default();
        all.sort_by(|a, b| b.updated_at().cmp(&a.updated_at()));
        Ok(all)
    }

    async fn delete(&self, id: &str) -> Result<bool, DomainError> {
        let mut cache = self.cache()?;
        let existed = cache
            .as_mut()
            .map(|groups| groups.remove(id).is_some())
            .unwrap_or(false);

        let path = self.path_for(id);
        if path.exists() {
            fs::remove_file(&path)?;
        }
        if existed {
            info!(group = %id, "Group deleted");
        }
        Ok(existed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{GroupDraft, Unit};
    use tempfile::tempdir;

    fn sample(dir: &Path, id: &str) -> Group {
        let unit = Unit::builder("db", "true").working_dir(dir).build().unwrap();
        Group::new(id, GroupDraft::new("stack", vec![unit])).unwrap()
    }

    #[tokio::test]
    async fn test_persists_across_instances() {
        let dir = tempdir().unwrap();
        let store = dir.path().join("groups");

        let repo = JsonFileGroupRepository::new(&store).unwrap();
        let group = sample(dir.path(), "g1");
        repo.save(group.clone()).await.unwrap();
        assert!(store.join("g1.json").exists());
        assert!(!store.join("g1.json.tmp").exists());

        let reopened = JsonFileGroupRepository::new(&store).unwrap();
        assert_eq!(reopened.find_by_id("g1").await.unwrap(), Some(group));
    }

    #[tokio::test]
    async fn test_find_all_newest_first() {
        let dir = tempdir().unwrap();
        let repo = JsonFileGroupRepository::new(dir.path().join("groups")).unwrap();

        let older = sample(dir.path(), "old");
        std::thread::sleep(std::time::Duration::from_millis(5));
        let newer = sample(dir.path(), "new");
        repo.save(older).await.unwrap();
        repo.save(newer).await.unwrap();

        let ids: Vec<String> = repo
            .find_all()
            .await
            .unwrap()
            .iter()
            .map(|g| g.id().to_string())
            .collect();
        assert_eq!(ids, ["new", "old"]);
    }

    #[tokio::test]
    async fn test_delete_removes_file() {
        let dir = tempdir().unwrap();
        let store = dir.path().join("groups");
        let repo = JsonFileGroupRepository::new(&store).unwrap();
        repo.save(sample(dir.path(), "g1")).await.unwrap();

        assert!(repo.delete("g1").await.unwrap());
        assert!(!store.join("g1.json").exists());
        assert_eq!(repo.find_by_id("g1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_skipped() {
        let dir = tempdir().unwrap();
        let store = dir.path().join("groups");
        fs::create_dir_all(&store).unwrap();
        fs::write(store.join("broken.json"), "{not json").unwrap();

        let repo = JsonFileGroupRepository::new(&store).unwrap();
        assert!(repo.find_all().await.unwrap().is_empty());
    }
}
