//! Alert configuration repository
//!
//! Database-backed [`BackingStore`]: the whole snapshot is replaced inside one
//! transaction so readers never observe a half-written state.

use std::sync::Arc;

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, DatabaseConnection, EntityTrait, QueryOrder, TransactionTrait,
};
use tracing::debug;

use crate::alerts::backing::BackingStore;
use crate::alerts::types::Snapshot;
use crate::error::PersistenceError;
use crate::models::alert_configuration::{self, Entity as AlertConfiguration};

/// Repository for alert configuration rows
#[derive(Debug, Clone)]
pub struct AlertConfigurationRepository {
    /// Database connection pool
    pub db: Arc<DatabaseConnection>,
}

impl AlertConfigurationRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Number of stored rows.
    pub async fn count(&self) -> Result<u64, PersistenceError> {
        use sea_orm::PaginatorTrait;
        Ok(AlertConfiguration::find().count(self.db.as_ref()).await?)
    }
}

#[async_trait]
impl BackingStore for AlertConfigurationRepository {
    async fn load_all(&self) -> Result<Snapshot, PersistenceError> {
        let rows = AlertConfiguration::find()
            .order_by_asc(alert_configuration::Column::ConfigKey)
            .all(self.db.as_ref())
            .await?;

        let mut snapshot = Snapshot::new();
        for row in rows {
            let (key, record) = row.into_record()?;
            snapshot.insert(key, record);
        }
        debug!(records = snapshot.len(), "Loaded alert configurations from database");
        Ok(snapshot)
    }

    /// Rewrites the whole table, so each save costs one insert per stored
    /// record. A diff against the previous snapshot would make single-key
    /// writes cheaper for large tables.
    async fn persist(&self, snapshot: &Snapshot) -> Result<(), PersistenceError> {
        let rows = snapshot
            .values()
            .map(alert_configuration::ActiveModel::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        let txn = self.db.begin().await?;
        AlertConfiguration::delete_many().exec(&txn).await?;
        for row in rows {
            row.insert(&txn).await?;
        }
        txn.commit().await?;
        Ok(())
    }
}
