//! # Override Manager
//!
//! Caller-facing entry point: resolves effective configurations, validates and
//! saves overrides at the caller's scope, and removes them again.

use std::sync::Arc;

use chrono::Utc;
use metrics::counter;
use tracing::{info, warn};
use uuid::Uuid;

use super::resolver::{EntityGraph, HierarchyResolver};
use super::store::ConfigurationStore;
use super::types::{
    AlertType, CompositeKey, ConfigLevel, ConfigSource, ConfigurationRecord, EffectiveConfig,
    OverrideStatus, RECORD_VERSION, RuleConfig,
};
use super::validator::validate;
use crate::error::EngineError;

/// Override manager bound to one current user. Cloning is cheap and shares
/// the underlying store.
#[derive(Clone)]
pub struct OverrideManager {
    store: Arc<ConfigurationStore>,
    graph: Arc<dyn EntityGraph>,
    user_id: Arc<str>,
}

impl OverrideManager {
    pub fn new(
        store: Arc<ConfigurationStore>,
        graph: Arc<dyn EntityGraph>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            store,
            graph,
            user_id: Arc::from(user_id.into()),
        }
    }

    /// Same store and graph, acting on behalf of `user_id`.
    pub fn for_user(&self, user_id: impl Into<String>) -> Self {
        Self {
            store: Arc::clone(&self.store),
            graph: Arc::clone(&self.graph),
            user_id: Arc::from(user_id.into()),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn store(&self) -> &Arc<ConfigurationStore> {
        &self.store
    }

    fn resolver(&self) -> HierarchyResolver<'_> {
        HierarchyResolver::new(&self.store, self.graph.as_ref(), &self.user_id)
    }

    pub fn effective(
        &self,
        level: ConfigLevel,
        entity_id: &str,
        alert_type: AlertType,
    ) -> EffectiveConfig {
        self.resolver().resolve(level, entity_id, alert_type)
    }

    /// Scopes consulted when resolving `(level, entity_id)`, narrowest first.
    pub fn lookup_chain(&self, level: ConfigLevel, entity_id: &str) -> Vec<ConfigSource> {
        self.resolver().lookup_chain(level, entity_id)
    }

    /// Validate `config` and store it at exactly `(level, entity_id, alert_type)`.
    ///
    /// Re-saving an existing key keeps its id and creation metadata.
    pub async fn save(
        &self,
        level: ConfigLevel,
        entity_id: &str,
        alert_type: AlertType,
        config: RuleConfig,
    ) -> Result<ConfigurationRecord, EngineError> {
        let report = validate(alert_type, &config);
        if !report.valid {
            counter!("alert_config_validation_failures_total", "alert_type" => alert_type.as_str())
                .increment(1);
            warn!(
                %level,
                entity_id,
                %alert_type,
                fields = ?report.errors.keys().collect::<Vec<_>>(),
                "Rejected configuration that failed validation"
            );
            return Err(EngineError::Validation(report));
        }

        let key = CompositeKey::new(level, entity_id, alert_type);
        let now = Utc::now();
        let record = match self.store.get(&key) {
            Some(existing) => ConfigurationRecord {
                config,
                updated_by: Some(self.user_id.to_string()),
                ..existing
            },
            None => ConfigurationRecord {
                id: Uuid::new_v4(),
                alert_type,
                level,
                entity_id: entity_id.to_string(),
                version: RECORD_VERSION,
                config,
                is_override: !level.is_root(),
                created_at: now,
                updated_at: now,
                created_by: Some(self.user_id.to_string()),
                updated_by: Some(self.user_id.to_string()),
            },
        };

        let saved = self.store.put(record).await?;
        counter!("alert_config_saves_total", "level" => level.as_str()).increment(1);
        info!(key = %key, user_id = %self.user_id, "Saved alert configuration");
        Ok(saved)
    }

    /// Remove the override at `(level, entity_id, alert_type)`.
    ///
    /// Returns whether a record existed. The root level cannot be removed.
    pub async fn delete(
        &self,
        level: ConfigLevel,
        entity_id: &str,
        alert_type: AlertType,
    ) -> Result<bool, EngineError> {
        if level.is_root() {
            return Err(EngineError::invalid_operation(
                "cannot remove the base configuration",
            ));
        }
        let key = CompositeKey::new(level, entity_id, alert_type);
        let removed = self.store.delete(&key).await?;
        if removed {
            counter!("alert_config_deletes_total", "level" => level.as_str()).increment(1);
            info!(key = %key, user_id = %self.user_id, "Removed alert configuration override");
        }
        Ok(removed)
    }

    pub fn status(
        &self,
        level: ConfigLevel,
        entity_id: &str,
        alert_type: AlertType,
    ) -> OverrideStatus {
        if self
            .store
            .contains(&CompositeKey::new(level, entity_id, alert_type))
        {
            return OverrideStatus::Override;
        }
        match self.effective(level, entity_id, alert_type).source {
            Some(_) => OverrideStatus::Inherited,
            None => OverrideStatus::None,
        }
    }
}
