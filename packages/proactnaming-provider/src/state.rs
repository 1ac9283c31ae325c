//! Persisted state of managed names, keyed by resource address

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::binding::ManagedName;
use crate::error::{ReconcileError, Result};

pub const STATE_VERSION: u32 = 1;

#[async_trait]
pub trait StateStore: Send + Sync {
    async fn get(&self, address: &str) -> Result<Option<ManagedName>>;

    async fn put(&self, address: &str, managed: ManagedName) -> Result<()>;

    async fn remove(&self, address: &str) -> Result<Option<ManagedName>>;

    /// Every stored resource, ordered by address.
    async fn list(&self) -> Result<BTreeMap<String, ManagedName>>;
}

/// State kept in process memory
#[derive(Clone, Default)]
pub struct MemoryStateStore {
    resources: Arc<Mutex<BTreeMap<String, ManagedName>>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn get(&self, address: &str) -> Result<Option<ManagedName>> {
        Ok(self.resources.lock().get(address).cloned())
    }

    async fn put(&self, address: &str, managed: ManagedName) -> Result<()> {
        self.resources.lock().insert(address.to_string(), managed);
        Ok(())
    }

    async fn remove(&self, address: &str) -> Result<Option<ManagedName>> {
        Ok(self.resources.lock().remove(address))
    }

    async fn list(&self) -> Result<BTreeMap<String, ManagedName>> {
        Ok(self.resources.lock().clone())
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct StateFile {
    version: u32,
    #[serde(default)]
    resources: BTreeMap<String, ManagedName>,
}

/// State kept in a JSON file, rewritten atomically on every change
pub struct FileStateStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, ManagedName>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = std::fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        let file: StateFile = serde_json::from_str(&content)?;
        if file.version != STATE_VERSION {
            return Err(ReconcileError::state(format!(
                "unsupported state version {} in {} (expected {})",
                file.version,
                self.path.display(),
                STATE_VERSION
            )));
        }
        Ok(file.resources)
    }

    fn save(&self, resources: BTreeMap<String, ManagedName>) -> Result<()> {
        let file = StateFile {
            version: STATE_VERSION,
            resources,
        };
        let json = serde_json::to_string_pretty(&file)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), count = file.resources.len(), "state saved");
        Ok(())
    }

    fn modify<T>(&self, f: impl FnOnce(&mut BTreeMap<String, ManagedName>) -> T) -> Result<T> {
        let _guard = self.lock.lock();
        let mut resources = self.load()?;
        let out = f(&mut resources);
        self.save(resources)?;
        Ok(out)
    }
}

#[async_trait]
impl StateStore for FileStateStore {
    async fn get(&self, address: &str) -> Result<Option<ManagedName>> {
        let _guard = self.lock.lock();
        Ok(self.load()?.remove(address))
    }

    async fn put(&self, address: &str, managed: ManagedName) -> Result<()> {
        self.modify(|resources| {
            resources.insert(address.to_string(), managed);
        })
    }

    async fn remove(&self, address: &str) -> Result<Option<ManagedName>> {
        self.modify(|resources| resources.remove(address))
    }

    async fn list(&self) -> Result<BTreeMap<String, ManagedName>> {
        let _guard = self.lock.lock();
        self.load()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proactnaming_client::{IdentityComponents, NameRecord, RecordId};
    use tempfile::TempDir;

    fn managed(id: i64) -> ManagedName {
        ManagedName::new(
            IdentityComponents::new("man", "st", "webapp", "test", "001", "euw", "dev"),
            NameRecord {
                record_id: RecordId(id),
                resolved_name: "man-st-webapp-test-001-euw-dev".to_string(),
                success: true,
                message: "Resource name generated successfully".to_string(),
                details: BTreeMap::new(),
            },
        )
    }

    #[tokio::test]
    async fn test_memory_store() {
        let store = MemoryStateStore::new();
        store.put("a", managed(1)).await.unwrap();
        assert_eq!(store.get("a").await.unwrap().map(|m| m.record_id()), Some(RecordId(1)));

        assert!(store.remove("a").await.unwrap().is_some());
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_file_store_persists_across_instances() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state").join("proactnaming.json");

        let store = FileStateStore::new(&path);
        assert!(store.list().await.unwrap().is_empty());
        store.put("proactnaming_generate_name.web", managed(7)).await.unwrap();

        let reopened = FileStateStore::new(&path);
        let got = reopened
            .get("proactnaming_generate_name.web")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(got, managed_with_times(7, &got));
        assert!(!path.with_extension("json.tmp").exists());

        reopened.remove("proactnaming_generate_name.web").await.unwrap();
        assert!(FileStateStore::new(&path).list().await.unwrap().is_empty());
    }

    fn managed_with_times(id: i64, like: &ManagedName) -> ManagedName {
        ManagedName {
            created_at: like.created_at,
            updated_at: like.updated_at,
            ..managed(id)
        }
    }

    #[tokio::test]
    async fn test_file_store_rejects_unknown_version() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, r#"{"version": 9, "resources": {}}"#).unwrap();

        let err = FileStateStore::new(&path).list().await.unwrap_err();
        assert!(err.to_string().contains("unsupported state version 9"));
    }
}
