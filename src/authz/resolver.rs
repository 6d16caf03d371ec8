//! Pull a token set out of a request.

use axum::http::{header::AUTHORIZATION, HeaderMap};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{cookies::CookieSettings, error::Error, oidc::TokenSet};

/// Where to look for the access token.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TokenSource {
    /// `Authorization: Bearer <token>` only.
    Bearer,
    /// Identity cookies only.
    #[default]
    Cookie,
    /// Bearer header first, then cookies.
    Either,
}

/// Resolve tokens from the selected source.
///
/// # Errors
/// Returns [`Error::Token`] when the selected source yields no access token.
pub fn resolve(
    headers: &HeaderMap,
    source: TokenSource,
    cookies: &CookieSettings,
) -> Result<TokenSet, Error> {
    let bearer = || bearer_token(headers).map(TokenSet::bearer);
    let cookie = || cookies.read_tokens(headers);

    let tokens = match source {
        TokenSource::Bearer => bearer(),
        TokenSource::Cookie => cookie(),
        TokenSource::Either => bearer().or_else(cookie),
    };
    tokens.ok_or_else(|| Error::Token("No access token found in request".to_string()))
}

/// Token from a case-insensitive `Bearer ` authorization header.
fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let scheme = value.get(..7)?;
    if !scheme.eq_ignore_ascii_case("bearer ") {
        return None;
    }
    let token = value.get(7..)?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}
