//! # Alert Configuration Types
//!
//! Levels, alert types, tagged field values and the persisted configuration
//! record shared by the registry, store, resolver and override manager.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

/// Version tag written into every persisted [`ConfigurationRecord`].
pub const RECORD_VERSION: u32 = 1;

/// Error returned when a path segment or persisted column does not name a known variant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} '{value}'")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

/// Scope at which a configuration can be saved.
///
/// Ordered from broadest (`User`, the root of inheritance) to narrowest (`Job`).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum ConfigLevel {
    User,
    Site,
    Asset,
    Job,
}

impl ConfigLevel {
    pub const ALL: [ConfigLevel; 4] = [
        ConfigLevel::User,
        ConfigLevel::Site,
        ConfigLevel::Asset,
        ConfigLevel::Job,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigLevel::User => "user",
            ConfigLevel::Site => "site",
            ConfigLevel::Asset => "asset",
            ConfigLevel::Job => "job",
        }
    }

    /// The root level has no parent to fall back to.
    pub fn is_root(&self) -> bool {
        matches!(self, ConfigLevel::User)
    }
}

impl fmt::Display for ConfigLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConfigLevel {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ConfigLevel::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseEnumError {
                kind: "configuration level",
                value: s.to_string(),
            })
    }
}

/// Closed set of alert types, each backed by exactly one schema.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "kebab-case")]
pub enum AlertType {
    Theft,
    Battery,
    Compliance,
    Underutilized,
    Offline,
    UnauthorizedZone,
    PredictiveMaintenance,
}

impl AlertType {
    pub const ALL: [AlertType; 7] = [
        AlertType::Theft,
        AlertType::Battery,
        AlertType::Compliance,
        AlertType::Underutilized,
        AlertType::Offline,
        AlertType::UnauthorizedZone,
        AlertType::PredictiveMaintenance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::Theft => "theft",
            AlertType::Battery => "battery",
            AlertType::Compliance => "compliance",
            AlertType::Underutilized => "underutilized",
            AlertType::Offline => "offline",
            AlertType::UnauthorizedZone => "unauthorized-zone",
            AlertType::PredictiveMaintenance => "predictive-maintenance",
        }
    }
}

impl fmt::Display for AlertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlertType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AlertType::ALL
            .into_iter()
            .find(|alert_type| alert_type.as_str() == s)
            .ok_or_else(|| ParseEnumError {
                kind: "alert type",
                value: s.to_string(),
            })
    }
}

/// Alert severity, lowest to highest.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// Semantic type of a configurable field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Number,
    Text,
    SingleSelect,
    MultiSelect,
    Toggle,
    Duration,
    Percentage,
}

impl FieldKind {
    /// Number, duration and percentage fields honour `min`/`max`.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            FieldKind::Number | FieldKind::Duration | FieldKind::Percentage
        )
    }

    pub fn describe(&self) -> &'static str {
        match self {
            FieldKind::Number => "a number",
            FieldKind::Text => "text",
            FieldKind::SingleSelect => "a single option",
            FieldKind::MultiSelect => "a list of options",
            FieldKind::Toggle => "on or off",
            FieldKind::Duration => "a whole duration",
            FieldKind::Percentage => "a percentage",
        }
    }
}

/// A field value tagged with its semantic type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Number(f64),
    Text(String),
    SingleSelect(String),
    MultiSelect(Vec<String>),
    Toggle(bool),
    /// Whole units of the field's declared `unit`.
    Duration(u32),
    Percentage(f64),
}

impl FieldValue {
    pub fn kind(&self) -> FieldKind {
        match self {
            FieldValue::Number(_) => FieldKind::Number,
            FieldValue::Text(_) => FieldKind::Text,
            FieldValue::SingleSelect(_) => FieldKind::SingleSelect,
            FieldValue::MultiSelect(_) => FieldKind::MultiSelect,
            FieldValue::Toggle(_) => FieldKind::Toggle,
            FieldValue::Duration(_) => FieldKind::Duration,
            FieldValue::Percentage(_) => FieldKind::Percentage,
        }
    }

    /// Numeric view of number, duration and percentage values.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(value) | FieldValue::Percentage(value) => Some(*value),
            FieldValue::Duration(value) => Some(f64::from(*value)),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Toggle(value) => Some(*value),
            _ => None,
        }
    }

    /// Blank text and empty selections count as "not provided".
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Text(value) | FieldValue::SingleSelect(value) => value.trim().is_empty(),
            FieldValue::MultiSelect(values) => values.is_empty(),
            FieldValue::Number(value) | FieldValue::Percentage(value) => value.is_nan(),
            _ => false,
        }
    }
}

/// Field values keyed by `FieldDefinition::key`.
pub type FieldValues = BTreeMap<String, FieldValue>;

/// Alert suppression settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SuppressionSettings {
    pub enabled: bool,
    pub cooldown_minutes: u32,
    pub max_alerts: u32,
}

/// The mutable rule body saved at a scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RuleConfig {
    pub enabled: bool,
    pub severity: Severity,
    #[serde(default)]
    pub auto_escalate: bool,
    #[serde(default)]
    pub escalation_delay_minutes: u32,
    #[serde(default)]
    pub fields: FieldValues,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suppression: Option<SuppressionSettings>,
}

/// Identity of one configuration slot: `(level, entity_id, alert_type)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CompositeKey {
    pub level: ConfigLevel,
    pub entity_id: String,
    pub alert_type: AlertType,
}

impl CompositeKey {
    pub fn new(level: ConfigLevel, entity_id: impl Into<String>, alert_type: AlertType) -> Self {
        Self {
            level,
            entity_id: entity_id.into(),
            alert_type,
        }
    }
}

/// Persisted key format: `{level}-{entity_id}-{alert_type}`.
impl fmt::Display for CompositeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.level, self.entity_id, self.alert_type)
    }
}

/// A saved configuration at one composite key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ConfigurationRecord {
    pub id: Uuid,
    pub alert_type: AlertType,
    pub level: ConfigLevel,
    pub entity_id: String,
    #[serde(default = "legacy_record_version")]
    pub version: u32,
    pub config: RuleConfig,
    pub is_override: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
}

fn legacy_record_version() -> u32 {
    0
}

impl ConfigurationRecord {
    pub fn key(&self) -> CompositeKey {
        CompositeKey::new(self.level, self.entity_id.clone(), self.alert_type)
    }
}

/// Bulk view of the store as persisted: composite key string to record.
pub type Snapshot = BTreeMap<String, ConfigurationRecord>;

/// The scope that supplied an effective configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub struct ConfigSource {
    pub level: ConfigLevel,
    pub entity_id: String,
}

impl ConfigSource {
    pub fn new(level: ConfigLevel, entity_id: impl Into<String>) -> Self {
        Self {
            level,
            entity_id: entity_id.into(),
        }
    }
}

/// Result of hierarchy resolution. `source` is `None` when the schema default applies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct EffectiveConfig {
    pub alert_type: AlertType,
    pub config: RuleConfig,
    pub source: Option<ConfigSource>,
}

impl EffectiveConfig {
    pub fn is_default(&self) -> bool {
        self.source.is_none()
    }

    pub fn source_level(&self) -> Option<ConfigLevel> {
        self.source.as_ref().map(|source| source.level)
    }
}

/// Override provenance of a composite key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OverrideStatus {
    /// No record anywhere in the chain; the schema default is in effect.
    None,
    /// Supplied by an ancestor scope.
    Inherited,
    /// A record exists at exactly this scope.
    Override,
}
