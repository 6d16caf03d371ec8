//! Token sets and JWT helpers.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::{decode, decode_header, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Error;

/// Access, ID and refresh tokens issued together by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSet {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl TokenSet {
    /// Bearer-only set, as resolved from an `Authorization` header.
    #[must_use]
    pub fn bearer(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            id_token: None,
            refresh_token: None,
        }
    }

    /// Token whose payload is used as the claim set: the ID token, or the
    /// access token when no ID token was issued.
    #[must_use]
    pub fn claims_token(&self) -> &str {
        self.id_token.as_deref().unwrap_or(&self.access_token)
    }
}

/// Raw token endpoint response. `access_token` is mandatory once converted.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl TryFrom<TokenResponse> for TokenSet {
    type Error = Error;

    fn try_from(response: TokenResponse) -> Result<Self, Self::Error> {
        let access_token = response
            .access_token
            .ok_or_else(|| Error::Logic("Access token is missing from tokenSet".to_string()))?;
        Ok(Self {
            access_token,
            id_token: response.id_token,
            refresh_token: response.refresh_token,
        })
    }
}

/// Decode the payload of a compact JWT without checking its signature.
///
/// # Errors
/// Returns [`Error::Token`] if the token is not a three part JWT with a JSON
/// object payload.
pub fn decode_claims(token: &str) -> Result<Value, Error> {
    let mut parts = token.split('.');
    let payload = match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(_), Some(payload), Some(_), None) => payload,
        _ => return Err(Error::Token("Could not decode token".to_string())),
    };
    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|_| Error::Token("Could not decode token payload".to_string()))?;
    let claims: Value = serde_json::from_slice(&bytes)
        .map_err(|e| Error::Token(format!("Could not parse token payload: {e}")))?;
    if claims.is_object() {
        Ok(claims)
    } else {
        Err(Error::Token("Token payload is not an object".to_string()))
    }
}

/// Key id from the token header.
///
/// # Errors
/// Returns [`Error::Token`] if the header cannot be decoded or has no `kid`.
pub fn key_id(token: &str) -> Result<String, Error> {
    let header = decode_header(token)
        .map_err(|e| Error::Token(format!("Could not decode access token: {e}")))?;
    header
        .kid
        .ok_or_else(|| Error::Token("Token header has no kid".to_string()))
}

/// Check signature and expiry, plus the issuer and audience when given.
///
/// # Errors
/// Returns [`Error::Token`] for any decode or validation failure.
pub fn verify_signature(
    token: &str,
    key: &DecodingKey,
    issuer: Option<&str>,
    audience: Option<&str>,
) -> Result<Value, Error> {
    let header = decode_header(token)
        .map_err(|e| Error::Token(format!("Could not decode token header: {e}")))?;
    let mut validation = Validation::new(header.alg);
    match audience {
        Some(audience) => validation.set_audience(&[audience]),
        None => validation.validate_aud = false,
    }
    if let Some(issuer) = issuer {
        validation.set_issuer(&[issuer]);
    }
    decode::<Value>(token, key, &validation)
        .map(|data| data.claims)
        .map_err(|e| Error::Token(format!("verification failed: {e}")))
}
