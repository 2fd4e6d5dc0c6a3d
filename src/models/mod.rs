//! # Data Models
//!
//! SeaORM entities and small response types shared by the HTTP layer.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod alert_configuration;

pub use alert_configuration::Entity as AlertConfiguration;

/// Basic service information response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfo {
    /// The name of the service
    pub service: String,
    /// The version of the service
    pub version: String,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            service: "alert-config".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
