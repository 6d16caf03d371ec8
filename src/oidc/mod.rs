//! Identity provider capability used by the auth flow and the authorizer.

pub mod client;
#[cfg(test)]
pub(crate) mod fake;
pub mod keys;
pub mod pkce;
pub mod token;

pub use client::{OidcClient, ProviderMetadata};
pub use keys::SigningKeyCache;
pub use token::{decode_claims, key_id, verify_signature, TokenSet};

use async_trait::async_trait;
use jsonwebtoken::DecodingKey;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use crate::error::Error;

/// Parameters for the authorization redirect.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest<'a> {
    pub redirect_uri: &'a str,
    pub scope: &'a str,
    pub state: &'a str,
    pub nonce: &'a str,
    pub code_challenge: &'a str,
    pub prompt: Option<&'a str>,
}

/// Callback parameters plus the values stored at login that they must match.
#[derive(Debug, Clone)]
pub struct CodeExchange<'a> {
    pub redirect_uri: &'a str,
    pub code: &'a str,
    pub state: &'a str,
    pub iss: Option<&'a str>,
    pub expected_state: &'a str,
    pub code_verifier: &'a str,
    pub nonce: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Introspection {
    #[serde(default)]
    pub active: bool,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// Every call may suspend on the network and fails with [`Error::Provider`]
/// or [`Error::Token`].
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Expected `iss` claim, e.g. `https://idp.example.com`.
    fn issuer(&self) -> &str;

    /// # Errors
    /// Fails if the authorization endpoint is not a valid URL.
    fn authorization_url(&self, request: &AuthorizationRequest<'_>) -> Result<String, Error>;

    /// Exchange an authorization code. The ID token signature and nonce are
    /// checked; the issuer is left to the caller.
    async fn exchange_code(&self, exchange: &CodeExchange<'_>) -> Result<TokenSet, Error>;

    async fn refresh(&self, refresh_token: &str) -> Result<TokenSet, Error>;

    async fn introspect(&self, token: &str) -> Result<Introspection, Error>;

    async fn signing_key(&self, kid: &str) -> Result<Arc<DecodingKey>, Error>;

    async fn userinfo(&self, access_token: &str) -> Result<Value, Error>;

    /// # Errors
    /// Fails if the provider has no end-session endpoint.
    fn end_session_url(
        &self,
        id_token_hint: &str,
        post_logout_redirect_uri: &str,
    ) -> Result<String, Error>;
}
