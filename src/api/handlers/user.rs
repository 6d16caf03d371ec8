//! Profile of the signed-in user, fetched from the provider.

use axum::{
    extract::Extension,
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;
use serde_json::Value;
use std::{fs, path::Path, sync::Arc};
use tracing::{error, instrument};

use super::auth::AuthState;
use crate::{
    authz::{SessionTokens, LOGOUT_HEADER},
    error::{Error, ErrorBody},
};

/// Top-level fields a userinfo payload must carry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UserSchema {
    #[serde(default)]
    pub required: Vec<String>,
}

impl UserSchema {
    /// # Errors
    /// Returns [`Error::Configuration`] if the file is unreadable or malformed.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let raw = fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("Could not read user schema {}: {e}", path.display()))
        })?;
        serde_json::from_str(&raw).map_err(|e| {
            Error::Configuration(format!("Invalid user schema {}: {e}", path.display()))
        })
    }

    /// # Errors
    /// Returns [`Error::Provider`] naming the first missing field.
    pub fn validate(&self, info: &Value) -> Result<(), Error> {
        match self.required.iter().find(|field| info.get(field.as_str()).is_none()) {
            Some(field) => Err(Error::Provider(format!(
                "userinfo is missing required field {field}"
            ))),
            None => Ok(()),
        }
    }
}

fn logout_response(status: StatusCode, err: &Error) -> Response {
    error!("{err}");
    let mut response = (status, Json(ErrorBody::from(err))).into_response();
    response
        .headers_mut()
        .insert(LOGOUT_HEADER, HeaderValue::from_static("true"));
    response
}

#[utoipa::path(
    get,
    path = "/user-info",
    responses(
        (status = 200, description = "Userinfo claims from the provider", body = Object),
        (status = 302, description = "No valid session; redirect to logout"),
        (status = 400, description = "Provider rejected the userinfo request", body = ErrorBody),
        (status = 401, description = "No tokens bound to the request", body = ErrorBody)
    ),
    tag = "user"
)]
#[instrument(skip_all)]
pub async fn user_info(
    tokens: Option<Extension<SessionTokens>>,
    Extension(state): Extension<Arc<AuthState>>,
) -> Response {
    let Some(Extension(SessionTokens(tokens))) = tokens else {
        return logout_response(
            StatusCode::UNAUTHORIZED,
            &Error::Token("no tokens found".to_string()),
        );
    };

    let info = match state.provider().userinfo(&tokens.access_token).await {
        Ok(info) => info,
        Err(err) => {
            return logout_response(
                StatusCode::BAD_REQUEST,
                &Error::Provider(format!("Could not retrieve user info: {err}")),
            );
        }
    };

    if let Some(schema) = state.user_schema() {
        if let Err(err) = schema.validate(&info) {
            return logout_response(StatusCode::BAD_REQUEST, &err);
        }
    }

    Json(info).into_response()
}
