//! # Alert Configuration Handlers
//!
//! Effective-config lookup, save and delete at a scope, plus a listing of the
//! records saved at exactly one scope.

use axum::{
    extract::{Path, State, rejection::JsonRejection, rejection::PathRejection},
    response::Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::alerts::types::{
    AlertType, ConfigLevel, ConfigSource, ConfigurationRecord, EffectiveConfig, OverrideStatus,
    RuleConfig,
};
use crate::auth::{CurrentUser, UserHeader};
use crate::error::ApiError;
use crate::server::AppState;

/// Effective configuration of a scope together with its provenance
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct EffectiveConfigResponse {
    pub level: ConfigLevel,
    pub entity_id: String,
    pub alert_type: AlertType,
    pub effective: EffectiveConfig,
    pub status: OverrideStatus,
    /// Scopes consulted, narrowest first
    pub lookup_chain: Vec<ConfigSource>,
}

/// Result of removing an override
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeleteConfigResponse {
    /// Whether a record existed at the scope
    pub removed: bool,
    /// What now applies at the scope
    pub effective: EffectiveConfig,
    pub status: OverrideStatus,
}

/// Records saved at exactly one scope
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ScopeConfigsResponse {
    pub level: ConfigLevel,
    pub entity_id: String,
    pub records: Vec<ConfigurationRecord>,
}

fn parse_scope(level: &str, alert_type: &str) -> Result<(ConfigLevel, AlertType), ApiError> {
    Ok((level.parse()?, alert_type.parse()?))
}

/// Get the effective configuration at a scope
#[utoipa::path(
    get,
    path = "/api/v1/alert-configs/{level}/{entity_id}/{alert_type}",
    params(
        ("level" = String, Path, description = "user | site | asset | job"),
        ("entity_id" = String, Path, description = "Identifier of the user, site, asset or job"),
        ("alert_type" = String, Path, description = "Alert type, e.g. `battery`"),
        UserHeader
    ),
    responses(
        (status = 200, description = "Effective configuration", body = EffectiveConfigResponse),
        (status = 400, description = "Unknown level or alert type", body = ApiError)
    ),
    tag = "alert-configs"
)]
pub async fn get_effective_config(
    State(state): State<AppState>,
    user: CurrentUser,
    path: Result<Path<(String, String, String)>, PathRejection>,
) -> Result<Json<EffectiveConfigResponse>, ApiError> {
    let Path((level, entity_id, alert_type)) = path?;
    let (level, alert_type) = parse_scope(&level, &alert_type)?;
    let manager = state.manager.for_user(user.0);

    Ok(Json(EffectiveConfigResponse {
        effective: manager.effective(level, &entity_id, alert_type),
        status: manager.status(level, &entity_id, alert_type),
        lookup_chain: manager.lookup_chain(level, &entity_id),
        level,
        entity_id,
        alert_type,
    }))
}

/// Save a configuration at a scope
#[utoipa::path(
    put,
    path = "/api/v1/alert-configs/{level}/{entity_id}/{alert_type}",
    params(
        ("level" = String, Path, description = "user | site | asset | job"),
        ("entity_id" = String, Path, description = "Identifier of the user, site, asset or job"),
        ("alert_type" = String, Path, description = "Alert type, e.g. `battery`"),
        UserHeader
    ),
    request_body = RuleConfig,
    responses(
        (status = 200, description = "Saved record", body = ConfigurationRecord),
        (status = 400, description = "Validation failed; details map field keys to messages", body = ApiError),
        (status = 409, description = "Operation not allowed at this scope", body = ApiError),
        (status = 503, description = "Configuration storage unavailable", body = ApiError)
    ),
    tag = "alert-configs"
)]
pub async fn save_config(
    State(state): State<AppState>,
    user: CurrentUser,
    path: Result<Path<(String, String, String)>, PathRejection>,
    body: Result<Json<RuleConfig>, JsonRejection>,
) -> Result<Json<ConfigurationRecord>, ApiError> {
    let Path((level, entity_id, alert_type)) = path?;
    let (level, alert_type) = parse_scope(&level, &alert_type)?;
    let Json(config) = body?;

    let record = state
        .manager
        .for_user(user.0)
        .save(level, &entity_id, alert_type, config)
        .await?;
    Ok(Json(record))
}

/// Remove the override at a scope
#[utoipa::path(
    delete,
    path = "/api/v1/alert-configs/{level}/{entity_id}/{alert_type}",
    params(
        ("level" = String, Path, description = "site | asset | job"),
        ("entity_id" = String, Path, description = "Identifier of the site, asset or job"),
        ("alert_type" = String, Path, description = "Alert type, e.g. `battery`"),
        UserHeader
    ),
    responses(
        (status = 200, description = "Override removed (or none existed)", body = DeleteConfigResponse),
        (status = 409, description = "Cannot remove the base configuration", body = ApiError),
        (status = 503, description = "Configuration storage unavailable", body = ApiError)
    ),
    tag = "alert-configs"
)]
pub async fn delete_config(
    State(state): State<AppState>,
    user: CurrentUser,
    path: Result<Path<(String, String, String)>, PathRejection>,
) -> Result<Json<DeleteConfigResponse>, ApiError> {
    let Path((level, entity_id, alert_type)) = path?;
    let (level, alert_type) = parse_scope(&level, &alert_type)?;
    let manager = state.manager.for_user(user.0);

    let removed = manager.delete(level, &entity_id, alert_type).await?;
    Ok(Json(DeleteConfigResponse {
        removed,
        effective: manager.effective(level, &entity_id, alert_type),
        status: manager.status(level, &entity_id, alert_type),
    }))
}

/// List records saved at exactly one scope
#[utoipa::path(
    get,
    path = "/api/v1/alert-configs/{level}/{entity_id}",
    params(
        ("level" = String, Path, description = "user | site | asset | job"),
        ("entity_id" = String, Path, description = "Identifier of the user, site, asset or job")
    ),
    responses(
        (status = 200, description = "Records saved at this scope, in alert type order", body = ScopeConfigsResponse),
        (status = 400, description = "Unknown level", body = ApiError)
    ),
    tag = "alert-configs"
)]
pub async fn list_scope_configs(
    State(state): State<AppState>,
    path: Result<Path<(String, String)>, PathRejection>,
) -> Result<Json<ScopeConfigsResponse>, ApiError> {
    let Path((level, entity_id)) = path?;
    let level: ConfigLevel = level.parse()?;
    let records = state.manager.store().list_for_entity(level, &entity_id);

    Ok(Json(ScopeConfigsResponse {
        level,
        entity_id,
        records,
    }))
}
