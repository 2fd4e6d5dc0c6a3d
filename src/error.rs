//! # Error Handling
//!
//! Engine-level error taxonomy (validation, invalid operation, persistence)
//! and the problem+json [`ApiError`] used by the HTTP surface, with trace ID
//! propagation.

use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::alerts::types::ParseEnumError;
use crate::alerts::validator::ValidationReport;
use crate::telemetry;

/// Failures of the backing store behind the configuration store.
///
/// The in-memory index is never modified when one of these is returned, so
/// the caller may retry the same call.
#[derive(Debug, Clone, Error)]
pub enum PersistenceError {
    #[error("backing store I/O failed: {0}")]
    Io(String),
    #[error("backing store rejected the write: {0}")]
    Rejected(String),
    #[error("snapshot could not be (de)serialized: {0}")]
    Serialization(String),
    #[error("database error: {0}")]
    Database(String),
    #[error("record '{key}' has version {version}, newest supported is {supported}")]
    UnsupportedVersion {
        key: String,
        version: u32,
        supported: u32,
    },
    #[error("record '{key}' is malformed: {reason}")]
    MalformedRecord { key: String, reason: String },
}

impl From<std::io::Error> for PersistenceError {
    fn from(error: std::io::Error) -> Self {
        PersistenceError::Io(error.to_string())
    }
}

impl From<serde_json::Error> for PersistenceError {
    fn from(error: serde_json::Error) -> Self {
        PersistenceError::Serialization(error.to_string())
    }
}

impl From<sea_orm::DbErr> for PersistenceError {
    fn from(error: sea_orm::DbErr) -> Self {
        PersistenceError::Database(error.to_string())
    }
}

/// Errors returned by store and override manager operations.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    #[error("configuration failed validation ({} field errors)", .0.errors.len())]
    Validation(ValidationReport),
    #[error("invalid operation: {0}")]
    InvalidOperation(String),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

impl EngineError {
    pub fn invalid_operation<S: Into<String>>(message: S) -> Self {
        EngineError::InvalidOperation(message.into())
    }
}

/// Unified API error response structure
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ApiError {
    /// HTTP status code for the response
    #[serde(skip_serializing, skip_deserializing)]
    pub status: StatusCode,
    /// Error code for programmatic handling
    pub code: Box<str>,
    /// Human-readable error message
    pub message: Box<str>,
    /// Additional error details (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Box<serde_json::Value>>,
    /// Correlation trace ID for debugging (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<Box<str>>,
}

impl ApiError {
    /// Create a new API error with the given status code and message
    pub fn new<S: Into<String>>(status: StatusCode, code: S, message: S) -> Self {
        Self {
            status,
            code: code.into().into_boxed_str(),
            message: message.into().into_boxed_str(),
            details: None,
            trace_id: Self::current_trace_id(),
        }
    }

    /// Add details to the error
    pub fn with_details<V: Into<serde_json::Value>>(mut self, details: V) -> Self {
        self.details = Some(Box::new(details.into()));
        self
    }

    /// Extract current trace ID from the active request scope (falls back to generated correlation ID)
    fn current_trace_id() -> Option<Box<str>> {
        telemetry::current_trace_id()
            .map(|trace_id| trace_id.into_boxed_str())
            .or_else(|| {
                Some(format!("corr-{}", &uuid::Uuid::new_v4().to_string()[..8]).into_boxed_str())
            })
    }
}

/// Standard error types with predefined status codes
#[derive(Debug, Error)]
pub enum ErrorType {
    #[error("Bad Request")]
    BadRequest,
    #[error("Not Found")]
    NotFound,
    #[error("Conflict")]
    Conflict,
    #[error("Internal Server Error")]
    InternalServerError,
    #[error("Service Unavailable")]
    ServiceUnavailable,
}

impl ErrorType {
    /// Get the appropriate HTTP status code for this error type
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorType::BadRequest => StatusCode::BAD_REQUEST,
            ErrorType::NotFound => StatusCode::NOT_FOUND,
            ErrorType::Conflict => StatusCode::CONFLICT,
            ErrorType::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorType::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Get the error code string for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            ErrorType::BadRequest => "VALIDATION_FAILED",
            ErrorType::NotFound => "NOT_FOUND",
            ErrorType::Conflict => "INVALID_OPERATION",
            ErrorType::InternalServerError => "INTERNAL_SERVER_ERROR",
            ErrorType::ServiceUnavailable => "PERSISTENCE_UNAVAILABLE",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut headers = HeaderMap::new();
        headers.insert(
            "content-type",
            HeaderValue::from_static("application/problem+json"),
        );

        if let Some(trace_id) = self.trace_id.as_deref()
            && let Ok(header_value) = HeaderValue::from_str(trace_id)
        {
            headers.insert("x-trace-id", header_value);
        }

        (self.status, headers, axum::Json(self)).into_response()
    }
}

impl From<ErrorType> for ApiError {
    fn from(error_type: ErrorType) -> Self {
        Self::new(
            error_type.status_code(),
            error_type.error_code(),
            &error_type.to_string(),
        )
    }
}

impl From<EngineError> for ApiError {
    fn from(error: EngineError) -> Self {
        match error {
            EngineError::Validation(report) => {
                let details = serde_json::to_value(&report.errors).unwrap_or_default();
                validation_error("Configuration failed validation", details)
            }
            EngineError::InvalidOperation(message) => Self::new(
                ErrorType::Conflict.status_code(),
                ErrorType::Conflict.error_code(),
                &message,
            ),
            EngineError::Persistence(err) => {
                tracing::error!(error = %err, "Backing store operation failed");
                Self::new(
                    ErrorType::ServiceUnavailable.status_code(),
                    ErrorType::ServiceUnavailable.error_code(),
                    "Configuration storage is unavailable; retry the request",
                )
            }
        }
    }
}

impl From<ParseEnumError> for ApiError {
    fn from(error: ParseEnumError) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            "VALIDATION_FAILED",
            &error.to_string(),
        )
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let message = match rejection {
            JsonRejection::JsonDataError(err) => format!("Invalid JSON: {}", err),
            JsonRejection::JsonSyntaxError(err) => format!("JSON syntax error: {}", err),
            JsonRejection::MissingJsonContentType(_) => {
                "Missing 'Content-Type: application/json' header".to_string()
            }
            _ => "Invalid request body".to_string(),
        };

        Self::new(StatusCode::BAD_REQUEST, "VALIDATION_FAILED", &message)
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            "VALIDATION_FAILED",
            &format!("Invalid path: {}", rejection.body_text()),
        )
    }
}

/// Create a validation error with field details
pub fn validation_error(message: &str, field_errors: serde_json::Value) -> ApiError {
    ApiError::new(StatusCode::BAD_REQUEST, "VALIDATION_FAILED", message).with_details(field_errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;

    #[test]
    fn test_api_error_basic() {
        let error = ApiError::new(
            StatusCode::BAD_REQUEST,
            "VALIDATION_FAILED",
            "Test error message",
        );

        assert_eq!(error.code, Box::from("VALIDATION_FAILED"));
        assert_eq!(error.message, Box::from("Test error message"));
        assert_eq!(error.details, None);
    }

    #[test]
    fn test_error_type_mapping() {
        let not_found_error: ApiError = ErrorType::NotFound.into();
        assert_eq!(not_found_error.code, Box::from("NOT_FOUND"));
        assert_eq!(not_found_error.message, Box::from("Not Found"));
    }

    #[test]
    fn test_validation_engine_error_carries_field_map() {
        let mut errors = BTreeMap::new();
        errors.insert(
            "lowBatteryThreshold".to_string(),
            "Low Battery Threshold must be at most 50 %".to_string(),
        );
        let error: ApiError = EngineError::Validation(ValidationReport {
            valid: false,
            errors,
        })
        .into();

        assert_eq!(error.status, StatusCode::BAD_REQUEST);
        assert_eq!(error.code, Box::from("VALIDATION_FAILED"));
        assert_eq!(
            error.details,
            Some(Box::new(json!({
                "lowBatteryThreshold": "Low Battery Threshold must be at most 50 %"
            })))
        );
    }

    #[test]
    fn test_invalid_operation_maps_to_conflict() {
        let error: ApiError =
            EngineError::invalid_operation("cannot remove the base configuration").into();
        assert_eq!(error.status, StatusCode::CONFLICT);
        assert_eq!(error.code, Box::from("INVALID_OPERATION"));
        assert_eq!(
            error.message,
            Box::from("cannot remove the base configuration")
        );
    }

    #[test]
    fn test_persistence_maps_to_service_unavailable() {
        let error: ApiError =
            EngineError::from(PersistenceError::Rejected("quota exceeded".into())).into();
        assert_eq!(error.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(error.code, Box::from("PERSISTENCE_UNAVAILABLE"));
        // Backing store detail stays in the logs.
        assert!(!error.message.contains("quota"));
    }

    #[test]
    fn test_parse_error_maps_to_bad_request() {
        let error: ApiError = "fleet"
            .parse::<crate::alerts::types::ConfigLevel>()
            .unwrap_err()
            .into();
        assert_eq!(error.status, StatusCode::BAD_REQUEST);
        assert!(error.message.contains("fleet"));
    }

    #[test]
    fn test_content_type_header() {
        let error = ApiError::new(StatusCode::BAD_REQUEST, "VALIDATION_FAILED", "Test error");

        let response = error.into_response();

        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "application/problem+json"
        );
        assert!(response.headers().get("x-trace-id").is_some());
    }

    #[test]
    fn test_trace_id_generation() {
        let error = ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_SERVER_ERROR",
            "Test error",
        );

        let trace_id = error.trace_id.unwrap();
        assert!(trace_id.starts_with("corr-"));
        assert_eq!(trace_id.len(), 13); // "corr-" + 8 chars
    }
}
