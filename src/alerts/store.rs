//! # Configuration Store
//!
//! Keyed collection of [`ConfigurationRecord`]s with at most one record per
//! composite key. Reads are served from an in-memory index; writes persist the
//! full snapshot through the [`BackingStore`] first and only then swap the
//! index, so a failed write leaves memory exactly as it was.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard};

use chrono::Utc;
use metrics::counter;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::backing::BackingStore;
use super::types::{
    AlertType, CompositeKey, ConfigLevel, ConfigurationRecord, RECORD_VERSION, Snapshot,
};
use crate::error::{EngineError, PersistenceError};

type Index = BTreeMap<CompositeKey, ConfigurationRecord>;

pub struct ConfigurationStore {
    backing: Arc<dyn BackingStore>,
    index: RwLock<Index>,
    // Serializes put/delete so the snapshot written is the one swapped in.
    writes: Mutex<()>,
}

impl ConfigurationStore {
    /// Empty store over `backing`. Call [`load_all`](Self::load_all) to hydrate.
    pub fn new(backing: Arc<dyn BackingStore>) -> Self {
        Self {
            backing,
            index: RwLock::new(Index::new()),
            writes: Mutex::new(()),
        }
    }

    /// Build a store and hydrate it from `backing`.
    pub async fn hydrate(backing: Arc<dyn BackingStore>) -> Result<Self, PersistenceError> {
        let store = Self::new(backing);
        store.load_all().await?;
        Ok(store)
    }

    /// Replace the in-memory index with the backing store's contents.
    ///
    /// Returns the number of records loaded.
    pub async fn load_all(&self) -> Result<usize, PersistenceError> {
        let _guard = self.writes.lock().await;
        let snapshot = self.backing.load_all().await?;
        let index = index_from_snapshot(snapshot)?;
        let count = index.len();
        *self.write_index() = index;
        debug!(records = count, "Hydrated configuration store");
        Ok(count)
    }

    pub fn get(&self, key: &CompositeKey) -> Option<ConfigurationRecord> {
        self.read_index().get(key).cloned()
    }

    pub fn contains(&self, key: &CompositeKey) -> bool {
        self.read_index().contains_key(key)
    }

    /// Insert or replace the record at its composite key.
    ///
    /// `updated_at` is stamped here. On a persistence failure the store is
    /// unchanged and the error is returned to the caller.
    pub async fn put(
        &self,
        mut record: ConfigurationRecord,
    ) -> Result<ConfigurationRecord, EngineError> {
        if record.entity_id.trim().is_empty() {
            return Err(EngineError::invalid_operation("entity id must not be empty"));
        }
        record.version = RECORD_VERSION;
        record.updated_at = Utc::now();
        let key = record.key();

        let _guard = self.writes.lock().await;
        let mut next = self.read_index().clone();
        next.insert(key.clone(), record.clone());
        self.commit(next).await?;

        debug!(key = %key, "Stored configuration record");
        Ok(record)
    }

    /// Remove the record at `key`. Returns whether a record was removed.
    ///
    /// Removing a missing key is a no-op and does not touch the backing store.
    pub async fn delete(&self, key: &CompositeKey) -> Result<bool, EngineError> {
        if key.level.is_root() {
            return Err(EngineError::invalid_operation(
                "cannot remove the base configuration",
            ));
        }

        let _guard = self.writes.lock().await;
        let mut next = self.read_index().clone();
        if next.remove(key).is_none() {
            return Ok(false);
        }
        self.commit(next).await?;

        debug!(key = %key, "Removed configuration record");
        Ok(true)
    }

    /// Persisted view of every record, keyed by the composite key string.
    pub fn snapshot(&self) -> Snapshot {
        to_snapshot(&self.read_index())
    }

    /// Records saved at exactly `(level, entity_id)`, in alert type order.
    pub fn list_for_entity(&self, level: ConfigLevel, entity_id: &str) -> Vec<ConfigurationRecord> {
        self.read_index()
            .values()
            .filter(|record| record.level == level && record.entity_id == entity_id)
            .cloned()
            .collect()
    }

    /// Records for `alert_type` across all scopes, broadest level first.
    pub fn list_for_alert_type(&self, alert_type: AlertType) -> Vec<ConfigurationRecord> {
        self.read_index()
            .values()
            .filter(|record| record.alert_type == alert_type)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.read_index().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_index().is_empty()
    }

    async fn commit(&self, next: Index) -> Result<(), PersistenceError> {
        let snapshot = to_snapshot(&next);
        if let Err(err) = self.backing.persist(&snapshot).await {
            counter!("alert_config_persist_failures_total").increment(1);
            return Err(err);
        }
        *self.write_index() = next;
        Ok(())
    }

    fn read_index(&self) -> RwLockReadGuard<'_, Index> {
        self.index.read().unwrap_or_else(|poison| poison.into_inner())
    }

    fn write_index(&self) -> std::sync::RwLockWriteGuard<'_, Index> {
        self.index.write().unwrap_or_else(|poison| poison.into_inner())
    }
}

fn to_snapshot(index: &Index) -> Snapshot {
    index
        .iter()
        .map(|(key, record)| (key.to_string(), record.clone()))
        .collect()
}

fn index_from_snapshot(snapshot: Snapshot) -> Result<Index, PersistenceError> {
    let mut index = Index::new();
    for (persisted_key, mut record) in snapshot {
        if record.version > RECORD_VERSION {
            return Err(PersistenceError::UnsupportedVersion {
                key: persisted_key,
                version: record.version,
                supported: RECORD_VERSION,
            });
        }
        if record.entity_id.trim().is_empty() {
            return Err(PersistenceError::MalformedRecord {
                key: persisted_key,
                reason: "entity id is empty".to_string(),
            });
        }
        if record.version < RECORD_VERSION {
            debug!(key = %persisted_key, from = record.version, "Upgrading legacy record");
            record.version = RECORD_VERSION;
        }
        let expected_override = !record.level.is_root();
        if record.is_override != expected_override {
            warn!(key = %persisted_key, "Correcting override flag on hydrated record");
            record.is_override = expected_override;
        }

        let key = record.key();
        if key.to_string() != persisted_key {
            warn!(
                persisted = %persisted_key,
                actual = %key,
                "Record stored under a mismatched key; re-keying"
            );
        }
        match index.get(&key) {
            Some(existing) if existing.updated_at >= record.updated_at => {
                warn!(key = %key, "Dropping stale duplicate record");
            }
            _ => {
                index.insert(key, record);
            }
        }
    }
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::backing::MemoryBackingStore;
    use crate::alerts::schema::default_rule_config;
    use chrono::Duration;
    use uuid::Uuid;

    fn record(level: ConfigLevel, entity_id: &str, alert_type: AlertType) -> ConfigurationRecord {
        let now = Utc::now();
        ConfigurationRecord {
            id: Uuid::new_v4(),
            alert_type,
            level,
            entity_id: entity_id.to_string(),
            version: RECORD_VERSION,
            config: default_rule_config(alert_type),
            is_override: !level.is_root(),
            created_at: now,
            updated_at: now,
            created_by: Some("tester".to_string()),
            updated_by: None,
        }
    }

    #[tokio::test]
    async fn put_then_get_reads_own_write() {
        let backing = Arc::new(MemoryBackingStore::new());
        let store = ConfigurationStore::new(backing.clone());
        let saved = store
            .put(record(ConfigLevel::Site, "SITE-A", AlertType::Battery))
            .await
            .unwrap();

        let key = CompositeKey::new(ConfigLevel::Site, "SITE-A", AlertType::Battery);
        assert_eq!(store.get(&key), Some(saved));
        assert!(backing.persisted().contains_key("site-SITE-A-battery"));
    }

    #[tokio::test]
    async fn failed_persist_leaves_index_untouched() {
        let backing = Arc::new(MemoryBackingStore::new());
        let store = ConfigurationStore::new(backing.clone());
        backing.reject_writes(true);

        let result = store
            .put(record(ConfigLevel::Asset, "AST-1", AlertType::Offline))
            .await;

        assert!(matches!(result, Err(EngineError::Persistence(_))));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn delete_missing_key_is_a_no_op() {
        let backing = Arc::new(MemoryBackingStore::new());
        let store = ConfigurationStore::new(backing.clone());
        let key = CompositeKey::new(ConfigLevel::Job, "JOB-1", AlertType::Theft);

        assert!(!store.delete(&key).await.unwrap());
        assert_eq!(backing.persist_calls(), 0);
    }

    #[tokio::test]
    async fn delete_at_user_level_is_refused() {
        let store = ConfigurationStore::new(Arc::new(MemoryBackingStore::new()));
        let key = CompositeKey::new(ConfigLevel::User, "u-1", AlertType::Theft);
        assert!(matches!(
            store.delete(&key).await,
            Err(EngineError::InvalidOperation(_))
        ));
    }

    #[tokio::test]
    async fn hydration_rekeys_and_upgrades_legacy_records() {
        let mut legacy = record(ConfigLevel::Asset, "AST-9", AlertType::Battery);
        legacy.version = 0;
        legacy.is_override = false;
        let mut snapshot = Snapshot::new();
        snapshot.insert("wrong-key".to_string(), legacy);

        let store = ConfigurationStore::hydrate(Arc::new(MemoryBackingStore::with_snapshot(
            snapshot,
        )))
        .await
        .unwrap();

        let loaded = store
            .get(&CompositeKey::new(ConfigLevel::Asset, "AST-9", AlertType::Battery))
            .unwrap();
        assert_eq!(loaded.version, RECORD_VERSION);
        assert!(loaded.is_override);
        assert!(store.snapshot().contains_key("asset-AST-9-battery"));
    }

    #[tokio::test]
    async fn hydration_keeps_newest_duplicate() {
        let older = record(ConfigLevel::Site, "SITE-A", AlertType::Offline);
        let mut newer = older.clone();
        newer.updated_at = older.updated_at + Duration::minutes(5);
        newer.config.enabled = false;

        let mut snapshot = Snapshot::new();
        snapshot.insert("site-SITE-A-offline".to_string(), older);
        snapshot.insert("legacy-entry".to_string(), newer);

        let store = ConfigurationStore::hydrate(Arc::new(MemoryBackingStore::with_snapshot(
            snapshot,
        )))
        .await
        .unwrap();

        assert_eq!(store.len(), 1);
        let loaded = store
            .get(&CompositeKey::new(ConfigLevel::Site, "SITE-A", AlertType::Offline))
            .unwrap();
        assert!(!loaded.config.enabled);
    }

    #[tokio::test]
    async fn hydration_rejects_newer_versions() {
        let mut future = record(ConfigLevel::Site, "SITE-A", AlertType::Offline);
        future.version = RECORD_VERSION + 1;
        let mut snapshot = Snapshot::new();
        snapshot.insert("site-SITE-A-offline".to_string(), future);

        let result =
            ConfigurationStore::hydrate(Arc::new(MemoryBackingStore::with_snapshot(snapshot)))
                .await;
        assert!(matches!(
            result,
            Err(PersistenceError::UnsupportedVersion { .. })
        ));
    }

    #[tokio::test]
    async fn listings_filter_by_scope_and_type() {
        let store = ConfigurationStore::new(Arc::new(MemoryBackingStore::new()));
        for (level, entity, alert_type) in [
            (ConfigLevel::Site, "SITE-A", AlertType::Battery),
            (ConfigLevel::Site, "SITE-A", AlertType::Theft),
            (ConfigLevel::Asset, "AST-1", AlertType::Battery),
        ] {
            store.put(record(level, entity, alert_type)).await.unwrap();
        }

        assert_eq!(store.list_for_entity(ConfigLevel::Site, "SITE-A").len(), 2);
        assert_eq!(store.list_for_alert_type(AlertType::Battery).len(), 2);
        assert_eq!(store.len(), 3);
    }
}
