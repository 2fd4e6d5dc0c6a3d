//! # API Handlers
//!
//! This module contains all the HTTP endpoint handlers for the alert configuration API.

use axum::{extract::State, response::Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{ApiError, ErrorType};
use crate::models::ServiceInfo;
use crate::server::AppState;

pub mod alert_configs;
pub mod alert_types;

/// Root handler that returns basic service information
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Service information", body = ServiceInfo)
    ),
    tag = "root"
)]
pub async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo::default())
}

/// Liveness and storage readiness
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    /// Configured storage backend (`memory`, `file` or `database`)
    pub storage: String,
    /// Records currently held by the configuration store
    pub records: usize,
}

/// Health check
#[utoipa::path(
    get,
    path = "/healthz",
    responses(
        (status = 200, description = "Service healthy", body = HealthResponse),
        (status = 503, description = "Database unreachable", body = ApiError)
    ),
    tag = "root"
)]
pub async fn healthz(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    if let Some(db) = state.db.as_ref()
        && let Err(err) = crate::db::health_check(db).await
    {
        tracing::warn!(error = %err, "Database health check failed");
        let mut error = ApiError::from(ErrorType::ServiceUnavailable);
        error.message = "Database is unreachable".into();
        return Err(error);
    }

    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        storage: state.config.storage_backend.to_string(),
        records: state.manager.store().len(),
    }))
}

/// Fallback for unknown routes
pub async fn not_found() -> ApiError {
    ErrorType::NotFound.into()
}

#[cfg(test)]
mod tests;
