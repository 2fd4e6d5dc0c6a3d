//! Backing store boundary
//!
//! The configuration store hydrates from and persists to a [`BackingStore`].
//! Every implementation serializes the same [`Snapshot`] shape, so a file
//! store can be swapped for a database without touching the engine.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::debug;

use super::types::Snapshot;
use crate::error::PersistenceError;

/// Durable home of the composite-key → record snapshot.
#[async_trait]
pub trait BackingStore: Send + Sync {
    /// Read every persisted record.
    async fn load_all(&self) -> Result<Snapshot, PersistenceError>;

    /// Replace the persisted state with `snapshot`.
    async fn persist(&self, snapshot: &Snapshot) -> Result<(), PersistenceError>;
}

/// Process-local backing store.
#[derive(Debug, Default)]
pub struct MemoryBackingStore {
    snapshot: Mutex<Snapshot>,
    reject_writes: AtomicBool,
    persist_calls: AtomicUsize,
}

impl MemoryBackingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing snapshot, as if it had been persisted earlier.
    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            snapshot: Mutex::new(snapshot),
            ..Self::default()
        }
    }

    /// Make subsequent `persist` calls fail until reset.
    pub fn reject_writes(&self, reject: bool) {
        self.reject_writes.store(reject, Ordering::SeqCst);
    }

    /// Number of successful `persist` calls.
    pub fn persist_calls(&self) -> usize {
        self.persist_calls.load(Ordering::SeqCst)
    }

    /// Copy of what has been persisted so far.
    pub fn persisted(&self) -> Snapshot {
        self.snapshot
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .clone()
    }
}

#[async_trait]
impl BackingStore for MemoryBackingStore {
    async fn load_all(&self) -> Result<Snapshot, PersistenceError> {
        Ok(self.persisted())
    }

    async fn persist(&self, snapshot: &Snapshot) -> Result<(), PersistenceError> {
        if self.reject_writes.load(Ordering::SeqCst) {
            return Err(PersistenceError::Rejected("storage quota exceeded".to_string()));
        }
        *self
            .snapshot
            .lock()
            .unwrap_or_else(|poison| poison.into_inner()) = snapshot.clone();
        self.persist_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Single JSON document on disk holding the whole snapshot.
///
/// Writes go to a sibling temp file that is renamed over the target, so a
/// failed write leaves the previous document intact.
#[derive(Debug, Clone)]
pub struct FileBackingStore {
    path: PathBuf,
}

impl FileBackingStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl BackingStore for FileBackingStore {
    async fn load_all(&self) -> Result<Snapshot, PersistenceError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(Snapshot::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No snapshot file yet, starting empty");
                Ok(Snapshot::new())
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn persist(&self, snapshot: &Snapshot) -> Result<(), PersistenceError> {
        let bytes = serde_json::to_vec_pretty(snapshot)?;
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        let temp_path = self.temp_path();
        tokio::fs::write(&temp_path, &bytes).await?;
        tokio::fs::rename(&temp_path, &self.path).await?;
        debug!(path = %self.path.display(), records = snapshot.len(), "Persisted snapshot");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_store_rejects_writes_on_demand() {
        let store = MemoryBackingStore::new();
        store.persist(&Snapshot::new()).await.unwrap();
        assert_eq!(store.persist_calls(), 1);

        store.reject_writes(true);
        let result = store.persist(&Snapshot::new()).await;
        assert!(matches!(result, Err(PersistenceError::Rejected(_))));
        assert_eq!(store.persist_calls(), 1);
    }

    #[test]
    fn temp_path_is_a_sibling() {
        let store = FileBackingStore::new("/var/lib/alerts/configs.json");
        assert_eq!(
            store.temp_path(),
            PathBuf::from("/var/lib/alerts/configs.json.tmp")
        );
    }
}
