use axum::{
    extract::{Extension, Query},
    http::HeaderMap,
    response::Response,
};
use std::sync::Arc;
use tracing::{instrument, warn};

use super::{state::AuthState, types::RedirectQuery};
use crate::{
    authz::found,
    callback_state,
    error::{Error, ErrorBody},
};

#[utoipa::path(
    get,
    path = "/auth/logout",
    params(RedirectQuery),
    responses(
        (status = 302, description = "Identity cookies cleared, redirect to the provider logout or to login"),
        (status = 400, description = "Invalid redirectPath", body = ErrorBody),
        (status = 500, description = "Invalid gateway domain", body = ErrorBody)
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn logout(
    headers: HeaderMap,
    Query(query): Query<RedirectQuery>,
    Extension(state): Extension<Arc<AuthState>>,
) -> Result<Response, Error> {
    let redirect_path = query.redirect_path.unwrap_or_default();
    if !redirect_path.is_empty() {
        callback_state::decode::<String>(&redirect_path)?;
    }

    let location = match end_session_url(&headers, &state).await {
        Ok(url) => url,
        Err(err) => {
            warn!("Failed to logout in authentication server: {err}");
            state.config().login_url(Some(&redirect_path))?
        }
    };

    let mut response = found(&location);
    state.cookies().clear_tokens(response.headers_mut())?;
    Ok(response)
}

/// Provider logout URL, only for a verifiable session that carries an ID token.
async fn end_session_url(headers: &HeaderMap, state: &AuthState) -> Result<String, Error> {
    let tokens = state
        .cookies()
        .read_tokens(headers)
        .ok_or_else(|| Error::Token("No access token found in request".to_string()))?;
    state
        .authorizer()
        .verifier()
        .verify_with_jwks(&tokens.access_token)
        .await?;
    let id_token = tokens
        .id_token
        .ok_or_else(|| Error::Token("ID token missing".to_string()))?;
    let post_logout = state.config().login_url(None)?;
    state.provider().end_session_url(&id_token, &post_logout)
}
