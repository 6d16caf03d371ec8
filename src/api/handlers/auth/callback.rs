use axum::{
    extract::{rejection::QueryRejection, Extension, Query},
    http::HeaderMap,
    response::Response,
};
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

use super::{state::AuthState, types::CallbackQuery};
use crate::{
    authz::found,
    callback_state::{self, CallbackState},
    claims::ClaimError,
    error::{Error, ErrorBody},
    oidc::{decode_claims, CodeExchange},
};

#[utoipa::path(
    get,
    path = "/auth/callback",
    params(CallbackQuery),
    responses(
        (status = 302, description = "Session established, redirect to the original path"),
        (status = 400, description = "Missing flow cookie or invalid query", body = ErrorBody),
        (status = 401, description = "Code exchange failed or issuer mismatch", body = ErrorBody),
        (status = 500, description = "State without redirectPath", body = ErrorBody)
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn callback(
    headers: HeaderMap,
    query: Result<Query<CallbackQuery>, QueryRejection>,
    Extension(state): Extension<Arc<AuthState>>,
) -> Result<Response, Error> {
    let result = handle(&headers, query, &state).await;
    if let Err(err) = &result {
        error!("{err}");
    }
    result
}

async fn handle(
    headers: &HeaderMap,
    query: Result<Query<CallbackQuery>, QueryRejection>,
    state: &AuthState,
) -> Result<Response, Error> {
    let Query(query) = query.map_err(|e| Error::Request(e.body_text()))?;
    let payload: Value = callback_state::decode(&query.state)?;

    let cookies = state.cookies();
    let names = cookies.names();
    let code_verifier = cookies
        .read_signed(headers, &names.code_verifier)
        .ok_or_else(|| Error::Cookie("Missing cookie for code/pkce verifier".to_string()))?;
    let nonce = cookies
        .read_signed(headers, &names.nonce)
        .ok_or_else(|| Error::Cookie("Missing cookie for nonce".to_string()))?;
    let expected_state = cookies
        .read_signed(headers, &names.state)
        .ok_or_else(|| Error::Cookie("Missing cookie for state".to_string()))?;

    let callback_url = state.config().callback_url();
    let tokens = state
        .provider()
        .exchange_code(&CodeExchange {
            redirect_uri: &callback_url,
            code: &query.code,
            state: &query.state,
            iss: Some(&query.iss),
            expected_state: &expected_state,
            code_verifier: &code_verifier,
            nonce: &nonce,
        })
        .await?;

    let callback = CallbackState::from_payload(&payload)?;

    let claims = decode_claims(tokens.claims_token())?;
    if claims.get("iss").and_then(Value::as_str) != Some(state.provider().issuer()) {
        return Err(Error::Authorization(
            "Issuer in token does not match".to_string(),
        ));
    }

    let redirect_domain = match state.claims().redirect_domain(&claims) {
        Ok(Some(domain)) => domain,
        Ok(None) => state.config().domain().to_string(),
        Err(ClaimError::PathNotFound(path)) => {
            warn!("redirect claim {path} absent, using gateway domain");
            state.config().domain().to_string()
        }
        Err(err) => {
            return Err(Error::Authorization(format!(
                "Redirect domain not found in claim: {err}"
            )));
        }
    };

    let location = format!("https://{redirect_domain}{}", callback.location_path());
    info!("session established, redirecting to {location}");

    let mut response = found(&location);
    let out = response.headers_mut();
    cookies.clear(out, &names.code_verifier)?;
    cookies.clear(out, &names.nonce)?;
    cookies.clear(out, &names.state)?;
    cookies.set_tokens(out, &tokens)?;

    Ok(response)
}
