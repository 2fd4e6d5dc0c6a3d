//! Hierarchical alert configuration engine.
//!
//! Schemas describe each alert type, the store keeps one record per
//! `(level, entity, alert type)`, the resolver walks Job → Asset → Site → User,
//! and the override manager ties validation and persistence together.

pub mod backing;
pub mod manager;
pub mod resolver;
pub mod schema;
pub mod store;
pub mod types;
pub mod validator;

pub use backing::{BackingStore, FileBackingStore, MemoryBackingStore};
pub use manager::OverrideManager;
pub use resolver::{EntityGraph, HierarchyResolver, StaticEntityGraph, lookup_chain};
pub use schema::{
    AlertTypeSchema, FieldDefinition, all_alert_types, all_schemas, default_field_values,
    default_rule_config, schema_for,
};
pub use store::ConfigurationStore;
pub use types::{
    AlertType, CompositeKey, ConfigLevel, ConfigSource, ConfigurationRecord, EffectiveConfig,
    FieldValue, FieldValues, OverrideStatus, RuleConfig, Severity, Snapshot, SuppressionSettings,
};
pub use validator::{ValidationReport, validate};
