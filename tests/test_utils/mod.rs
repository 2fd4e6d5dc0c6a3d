//! Test utilities for database and engine testing.
//!
//! This module provides utilities for setting up in-memory SQLite databases
//! with migrations, plus record fixtures for seeding backing stores.

use alert_config::alerts::{
    AlertType, ConfigLevel, ConfigurationRecord, RuleConfig, default_rule_config,
};
use alert_config::alerts::types::RECORD_VERSION;
use anyhow::Result;
use chrono::{DateTime, Utc};
use migration::{Migrator, MigratorTrait};
use sea_orm::{Database, DatabaseConnection};
use std::sync::Arc;
use uuid::Uuid;

/// Sets up an in-memory SQLite database with all migrations applied.
///
/// # Returns
///
/// Returns a Result containing the database connection
#[allow(dead_code)]
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = Database::connect("sqlite::memory:").await?;
    Migrator::up(&db, None).await?;
    Ok(db)
}

/// Sets up an in-memory SQLite database with all migrations applied and returns an Arc.
#[allow(dead_code)]
pub async fn setup_test_db_arc() -> Result<Arc<DatabaseConnection>> {
    let db = setup_test_db().await?;
    Ok(Arc::new(db))
}

/// Builds a saved record at `(level, entity_id, alert_type)` holding `config`.
#[allow(dead_code)]
pub fn record_fixture(
    level: ConfigLevel,
    entity_id: &str,
    alert_type: AlertType,
    config: RuleConfig,
    updated_at: DateTime<Utc>,
) -> ConfigurationRecord {
    ConfigurationRecord {
        id: Uuid::new_v4(),
        alert_type,
        level,
        entity_id: entity_id.to_string(),
        version: RECORD_VERSION,
        config,
        is_override: !level.is_root(),
        created_at: updated_at,
        updated_at,
        created_by: Some("fixture".to_string()),
        updated_by: Some("fixture".to_string()),
    }
}

/// Record holding the schema default for `alert_type`.
#[allow(dead_code)]
pub fn default_record(
    level: ConfigLevel,
    entity_id: &str,
    alert_type: AlertType,
) -> ConfigurationRecord {
    record_fixture(
        level,
        entity_id,
        alert_type,
        default_rule_config(alert_type),
        Utc::now(),
    )
}
