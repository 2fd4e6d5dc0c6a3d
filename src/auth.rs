//! Caller identity for the HTTP surface.
//!
//! Requests name their acting user with `X-User-Id`; when the header is absent
//! the configured default user is used. The resolved id is the root of every
//! lookup chain and the author recorded on saves.

use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use serde::{Deserialize, Serialize};
use utoipa::IntoParams;

use crate::config::AppConfig;
use crate::error::{ApiError, validation_error};
use crate::server::AppState;

/// Header naming the acting user.
pub const USER_ID_HEADER: &str = "X-User-Id";

const MAX_USER_ID_LEN: usize = 128;

impl FromRef<AppState> for Arc<AppConfig> {
    fn from_ref(state: &AppState) -> Self {
        Arc::clone(&state.config)
    }
}

/// Acting user for the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser(pub String);

impl CurrentUser {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// OpenAPI header parameter for X-User-Id
#[derive(Debug, Serialize, Deserialize, IntoParams, utoipa::ToSchema)]
#[into_params(parameter_in = Header)]
pub struct UserHeader {
    /// User acting on the configuration; defaults to the service's configured user
    #[serde(rename = "X-User-Id")]
    #[param(rename = "X-User-Id", value_type = Option<String>)]
    pub user_id: Option<String>,
}

fn user_from_parts(parts: &Parts, config: &AppConfig) -> Result<CurrentUser, ApiError> {
    let Some(header_value) = parts.headers.get(USER_ID_HEADER) else {
        return Ok(CurrentUser(config.default_user_id.clone()));
    };

    let user_id = header_value.to_str().map_err(|_| {
        validation_error(
            "Invalid user header",
            serde_json::json!({ "X-User-Id": "Header must be valid UTF-8" }),
        )
    })?;
    let user_id = user_id.trim();

    if user_id.is_empty() {
        return Ok(CurrentUser(config.default_user_id.clone()));
    }
    if user_id.len() > MAX_USER_ID_LEN {
        return Err(validation_error(
            "Invalid user ID",
            serde_json::json!({ "X-User-Id": format!("Must be at most {MAX_USER_ID_LEN} characters") }),
        ));
    }

    Ok(CurrentUser(user_id.to_string()))
}

impl<S> FromRequestParts<S> for CurrentUser
where
    Arc<AppConfig>: FromRef<S>,
    S: Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let config = Arc::<AppConfig>::from_ref(state);
        user_from_parts(parts, &config)
    }
}
