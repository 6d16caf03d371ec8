//! Error taxonomy shared by the auth flow and the authorization middleware.
//!
//! Every variant renders as `"<kind>: <message>"` and carries its own HTTP
//! status, so handlers can return `Result<_, Error>` and let the
//! [`IntoResponse`] impl build the `{name, message}` body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Claim error: {0}")]
    ClaimResolution(String),
    #[error("Token error: {0}")]
    Token(String),
    #[error("OIDC error: {0}")]
    Provider(String),
    #[error("Cookie error: {0}")]
    Cookie(String),
    #[error("Auth error: {0}")]
    Authorization(String),
    #[error("Request error: {0}")]
    Request(String),
    #[error("Logic error: {0}")]
    Logic(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    /// Short kind name, used as `name` in error bodies.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "Configuration error",
            Self::ClaimResolution(_) => "Claim error",
            Self::Token(_) => "Token error",
            Self::Provider(_) => "OIDC error",
            Self::Cookie(_) => "Cookie error",
            Self::Authorization(_) => "Auth error",
            Self::Request(_) => "Request error",
            Self::Logic(_) => "Logic error",
        }
    }

    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Cookie(_) | Self::Request(_) => StatusCode::BAD_REQUEST,
            Self::Configuration(_) | Self::Logic(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ClaimResolution(_)
            | Self::Token(_)
            | Self::Provider(_)
            | Self::Authorization(_) => StatusCode::UNAUTHORIZED,
        }
    }

    /// Wrap this error with extra context while keeping its kind.
    #[must_use]
    pub fn context(self, context: &str) -> Self {
        let message = format!("{context}: {self}");
        match self {
            Self::Configuration(_) => Self::Configuration(message),
            Self::ClaimResolution(_) => Self::ClaimResolution(message),
            Self::Token(_) => Self::Token(message),
            Self::Provider(_) => Self::Provider(message),
            Self::Cookie(_) => Self::Cookie(message),
            Self::Authorization(_) => Self::Authorization(message),
            Self::Request(_) => Self::Request(message),
            Self::Logic(_) => Self::Logic(message),
        }
    }
}

/// Body returned for every 4xx/5xx response produced by this crate.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ErrorBody {
    pub name: String,
    pub message: String,
}

impl From<&Error> for ErrorBody {
    fn from(error: &Error) -> Self {
        Self {
            name: error.name().to_string(),
            message: error.to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        (self.status(), Json(ErrorBody::from(&self))).into_response()
    }
}
