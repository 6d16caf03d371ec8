//! Query strings accepted by the auth endpoints.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::authz::{TokenCheck, TokenSource};

#[derive(IntoParams, Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct RedirectQuery {
    /// Base64 JSON string with the path to return to.
    pub redirect_path: Option<String>,
}

#[derive(IntoParams, Deserialize, Debug)]
#[into_params(parameter_in = Query)]
pub struct CallbackQuery {
    pub state: String,
    pub session_state: String,
    pub iss: String,
    pub code: String,
}

#[derive(IntoParams, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct CheckQuery {
    /// Must equal the `active_organization.name` claim.
    pub tenant: String,
    #[serde(default)]
    #[param(inline)]
    pub token_check: TokenCheck,
    #[serde(default)]
    pub no_redirect: bool,
    #[serde(default)]
    #[param(inline)]
    pub token_source: TokenSource,
    #[param(inline)]
    pub require_role: Option<Role>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Viewer,
    Editor,
    Admin,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Viewer => "viewer",
            Self::Editor => "editor",
            Self::Admin => "admin",
        }
    }
}
