//! # Alert Configuration Model
//!
//! One row per composite key; the rule body is stored as JSON.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::Set;
use serde::{Deserialize, Serialize};

use crate::alerts::types::{ConfigurationRecord, RuleConfig};
use crate::error::PersistenceError;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "alert_configurations")]
pub struct Model {
    /// `{level}-{entity_id}-{alert_type}`
    #[sea_orm(primary_key, auto_increment = false)]
    pub config_key: String,

    pub id: Uuid,

    pub level: String,

    pub entity_id: String,

    pub alert_type: String,

    pub version: i32,

    #[sea_orm(column_type = "JsonBinary")]
    pub config: Json,

    pub is_override: bool,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub created_by: Option<String>,

    #[sea_orm(nullable)]
    pub updated_by: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Convert a row back into an engine record, keeping the stored key
    /// alongside so the caller can detect mismatches.
    pub fn into_record(self) -> Result<(String, ConfigurationRecord), PersistenceError> {
        let malformed = |reason: String| PersistenceError::MalformedRecord {
            key: self.config_key.clone(),
            reason,
        };

        let level = self.level.parse().map_err(|err| malformed(format!("{err}")))?;
        let alert_type = self
            .alert_type
            .parse()
            .map_err(|err| malformed(format!("{err}")))?;
        let version = u32::try_from(self.version)
            .map_err(|_| malformed(format!("negative version {}", self.version)))?;
        let config: RuleConfig = serde_json::from_value(self.config.clone())
            .map_err(|err| malformed(format!("rule body does not parse: {err}")))?;

        let record = ConfigurationRecord {
            id: self.id,
            alert_type,
            level,
            entity_id: self.entity_id.clone(),
            version,
            config,
            is_override: self.is_override,
            created_at: DateTime::<Utc>::from(self.created_at),
            updated_at: DateTime::<Utc>::from(self.updated_at),
            created_by: self.created_by.clone(),
            updated_by: self.updated_by.clone(),
        };
        Ok((self.config_key, record))
    }
}

impl TryFrom<&ConfigurationRecord> for ActiveModel {
    type Error = PersistenceError;

    fn try_from(record: &ConfigurationRecord) -> Result<Self, Self::Error> {
        Ok(ActiveModel {
            config_key: Set(record.key().to_string()),
            id: Set(record.id),
            level: Set(record.level.as_str().to_string()),
            entity_id: Set(record.entity_id.clone()),
            alert_type: Set(record.alert_type.as_str().to_string()),
            version: Set(record.version as i32),
            config: Set(serde_json::to_value(&record.config)?),
            is_override: Set(record.is_override),
            created_at: Set(record.created_at.into()),
            updated_at: Set(record.updated_at.into()),
            created_by: Set(record.created_by.clone()),
            updated_by: Set(record.updated_by.clone()),
        })
    }
}
