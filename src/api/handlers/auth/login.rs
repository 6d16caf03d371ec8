use axum::{
    extract::{Extension, Query},
    http::HeaderMap,
    response::Response,
};
use std::sync::Arc;
use tracing::{debug, instrument};

use super::{state::AuthState, types::RedirectQuery};
use crate::{
    authz::found,
    callback_state::{self, CallbackState},
    error::{Error, ErrorBody},
    oidc::{pkce, AuthorizationRequest},
};

#[utoipa::path(
    get,
    path = "/auth/login",
    params(RedirectQuery),
    responses(
        (status = 302, description = "Redirect to the identity provider"),
        (status = 400, description = "Invalid redirectPath", body = ErrorBody)
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn login(
    headers: HeaderMap,
    Query(query): Query<RedirectQuery>,
    Extension(state): Extension<Arc<AuthState>>,
) -> Result<Response, Error> {
    let redirect_path = match query.redirect_path.as_deref() {
        Some(encoded) if !encoded.is_empty() => callback_state::decode::<String>(encoded)?,
        _ => String::new(),
    };
    let encoded_state = callback_state::encode(&CallbackState { redirect_path })?;

    let code_verifier = pkce::code_verifier()?;
    let code_challenge = pkce::code_challenge(&code_verifier);
    let nonce = pkce::nonce()?;

    let cookies = state.cookies();
    let names = cookies.names();

    // Force the provider prompt unless a session already exists.
    let prompt = if cookies.read(&headers, &names.access_token).is_none() {
        Some("login")
    } else {
        None
    };

    let callback_url = state.config().callback_url();
    let url = state.provider().authorization_url(&AuthorizationRequest {
        redirect_uri: &callback_url,
        scope: state.config().scope(),
        state: &encoded_state,
        nonce: &nonce,
        code_challenge: &code_challenge,
        prompt,
    })?;
    debug!("redirecting to provider, prompt: {prompt:?}");

    let mut response = found(&url);
    let out = response.headers_mut();
    cookies.set_signed(out, &names.code_verifier, &code_verifier)?;
    cookies.set_signed(out, &names.nonce, &nonce)?;
    cookies.set_signed(out, &names.state, &encoded_state)?;

    Ok(response)
}
