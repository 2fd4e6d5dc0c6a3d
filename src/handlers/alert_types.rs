//! # Alert Type Handlers
//!
//! Read-only view of the field schema registry, a dry-run validation
//! endpoint, and an overview of the records saved for one alert type.

use axum::{
    extract::{Path, State, rejection::JsonRejection, rejection::PathRejection},
    response::Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::alerts::schema::{AlertCategory, AlertTypeSchema, all_schemas, schema_for};
use crate::alerts::types::{AlertType, ConfigurationRecord, RuleConfig, Severity};
use crate::alerts::validator::{ValidationReport, validate};
use crate::error::ApiError;
use crate::server::AppState;

/// Summary of one alert type
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AlertTypeSummary {
    pub alert_type: AlertType,
    pub label: String,
    pub description: String,
    pub category: AlertCategory,
    pub default_severity: Severity,
    /// Number of configurable fields
    pub field_count: usize,
}

impl From<&AlertTypeSchema> for AlertTypeSummary {
    fn from(schema: &AlertTypeSchema) -> Self {
        Self {
            alert_type: schema.alert_type,
            label: schema.label.to_string(),
            description: schema.description.to_string(),
            category: schema.category,
            default_severity: schema.default_severity,
            field_count: schema.fields.len(),
        }
    }
}

/// Response listing every alert type in catalog order
#[derive(Debug, Serialize, ToSchema)]
pub struct AlertTypesResponse {
    pub alert_types: Vec<AlertTypeSummary>,
}

/// Records saved for one alert type across every scope
#[derive(Debug, Serialize, ToSchema)]
pub struct AlertTypeConfigsResponse {
    pub alert_type: AlertType,
    /// Broadest level first
    pub records: Vec<ConfigurationRecord>,
}

/// List configurable alert types
#[utoipa::path(
    get,
    path = "/api/v1/alert-types",
    responses(
        (status = 200, description = "Alert types in catalog order", body = AlertTypesResponse)
    ),
    tag = "alert-types"
)]
pub async fn list_alert_types() -> Json<AlertTypesResponse> {
    Json(AlertTypesResponse {
        alert_types: all_schemas().iter().map(AlertTypeSummary::from).collect(),
    })
}

/// Get the field schema of one alert type
#[utoipa::path(
    get,
    path = "/api/v1/alert-types/{alert_type}/schema",
    params(
        ("alert_type" = String, Path, description = "Alert type, e.g. `battery`")
    ),
    responses(
        (status = 200, description = "Field definitions, defaults and dependencies", body = Object),
        (status = 400, description = "Unknown alert type", body = ApiError)
    ),
    tag = "alert-types"
)]
pub async fn get_alert_type_schema(
    path: Result<Path<String>, PathRejection>,
) -> Result<Json<&'static AlertTypeSchema>, ApiError> {
    let Path(alert_type) = path?;
    let alert_type: AlertType = alert_type.parse()?;
    Ok(Json(schema_for(alert_type)))
}

/// Validate a rule body without saving it
#[utoipa::path(
    post,
    path = "/api/v1/alert-types/{alert_type}/validate",
    params(
        ("alert_type" = String, Path, description = "Alert type, e.g. `battery`")
    ),
    request_body = RuleConfig,
    responses(
        (status = 200, description = "Validation outcome with per-field messages", body = ValidationReport),
        (status = 400, description = "Unknown alert type or malformed body", body = ApiError)
    ),
    tag = "alert-types"
)]
pub async fn validate_alert_config(
    path: Result<Path<String>, PathRejection>,
    body: Result<Json<RuleConfig>, JsonRejection>,
) -> Result<Json<ValidationReport>, ApiError> {
    let Path(alert_type) = path?;
    let alert_type: AlertType = alert_type.parse()?;
    let Json(config) = body?;
    Ok(Json(validate(alert_type, &config)))
}

/// List every saved record of one alert type
#[utoipa::path(
    get,
    path = "/api/v1/alert-types/{alert_type}/configs",
    params(
        ("alert_type" = String, Path, description = "Alert type, e.g. `battery`")
    ),
    responses(
        (status = 200, description = "Saved records across all scopes", body = AlertTypeConfigsResponse),
        (status = 400, description = "Unknown alert type", body = ApiError)
    ),
    tag = "alert-types"
)]
pub async fn list_alert_type_configs(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> Result<Json<AlertTypeConfigsResponse>, ApiError> {
    let Path(alert_type) = path?;
    let alert_type: AlertType = alert_type.parse()?;
    let records = state.manager.store().list_for_alert_type(alert_type);

    Ok(Json(AlertTypeConfigsResponse {
        alert_type,
        records,
    }))
}
