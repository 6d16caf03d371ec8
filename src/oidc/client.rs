//! `reqwest` backed identity provider client.

use async_trait::async_trait;
use jsonwebtoken::{jwk::JwkSet, DecodingKey};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::Value;
use std::{fmt, sync::Arc, time::Duration};
use tracing::{debug, instrument};
use url::Url;

use super::{
    keys::SigningKeyCache,
    token::{self, TokenResponse},
    AuthorizationRequest, CodeExchange, IdentityProvider, Introspection, TokenSet,
};
use crate::{error::Error, APP_USER_AGENT};

const DISCOVERY_PATH: &str = "/.well-known/openid-configuration";
const REQUEST_TIMEOUT_SECONDS: u64 = 10;

/// Subset of the discovery document the gateway uses.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderMetadata {
    pub issuer: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    #[serde(default)]
    pub jwks_uri: Option<String>,
    #[serde(default)]
    pub introspection_endpoint: Option<String>,
    #[serde(default)]
    pub userinfo_endpoint: Option<String>,
    #[serde(default)]
    pub end_session_endpoint: Option<String>,
}

pub struct OidcClient {
    http: Client,
    issuer: String,
    client_id: String,
    client_secret: SecretString,
    metadata: ProviderMetadata,
    jwks_uri: String,
    keys: SigningKeyCache,
}

impl fmt::Debug for OidcClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OidcClient")
            .field("issuer", &self.issuer)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

/// Issuer URL from a configured value. A bare host gets `https://`.
#[must_use]
pub fn normalize_issuer(value: &str) -> String {
    let trimmed = value.trim().trim_end_matches('/');
    if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    }
}

fn provider_error(context: &str, err: impl fmt::Display) -> Error {
    Error::Provider(format!("{context}: {err}"))
}

impl OidcClient {
    /// Fetch the discovery document and build a client.
    ///
    /// # Errors
    /// Returns [`Error::Provider`] if discovery fails or the provider
    /// publishes no JWKS URI.
    #[instrument(skip(client_secret))]
    pub async fn discover(
        issuer: &str,
        client_id: &str,
        client_secret: SecretString,
    ) -> Result<Self, Error> {
        let issuer = normalize_issuer(issuer);
        let http = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECONDS))
            .build()
            .map_err(|e| provider_error("failed to build HTTP client", e))?;

        let discovery_url = format!("{issuer}{DISCOVERY_PATH}");
        debug!("discovery URL: {discovery_url}");
        let response = http
            .get(&discovery_url)
            .send()
            .await
            .map_err(|e| provider_error("discovery request failed", e))?;
        if !response.status().is_success() {
            return Err(Error::Provider(format!(
                "{discovery_url} - {}",
                response.status()
            )));
        }
        let metadata: ProviderMetadata = response
            .json()
            .await
            .map_err(|e| provider_error("invalid discovery document", e))?;

        Self::from_metadata(http, issuer, client_id, client_secret, metadata)
    }

    /// # Errors
    /// Returns [`Error::Provider`] if the metadata has no JWKS URI.
    pub fn from_metadata(
        http: Client,
        issuer: String,
        client_id: &str,
        client_secret: SecretString,
        metadata: ProviderMetadata,
    ) -> Result<Self, Error> {
        let jwks_uri = metadata
            .jwks_uri
            .clone()
            .ok_or_else(|| Error::Provider("No jwks uri found at issuer".to_string()))?;
        Ok(Self {
            http,
            issuer,
            client_id: client_id.to_string(),
            client_secret,
            metadata,
            jwks_uri,
            keys: SigningKeyCache::new(),
        })
    }

    #[must_use]
    pub fn metadata(&self) -> &ProviderMetadata {
        &self.metadata
    }

    async fn token_request(&self, form: &[(&str, &str)]) -> Result<TokenSet, Error> {
        let mut params = form.to_vec();
        params.push(("client_id", self.client_id.as_str()));
        params.push(("client_secret", self.client_secret.expose_secret()));

        let response = self
            .http
            .post(&self.metadata.token_endpoint)
            .form(&params)
            .send()
            .await
            .map_err(|e| provider_error("token request failed", e))?;
        let status = response.status();
        if !status.is_success() {
            let body: Value = response.json().await.unwrap_or(Value::Null);
            let reason = body
                .get("error_description")
                .or_else(|| body.get("error"))
                .and_then(Value::as_str)
                .unwrap_or("");
            return Err(Error::Provider(format!(
                "token endpoint returned {status} {reason}"
            )));
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| provider_error("invalid token response", e))?;
        TokenSet::try_from(body)
    }

    async fn fetch_jwks(&self) -> Result<JwkSet, Error> {
        debug!("fetching JWKS from {}", self.jwks_uri);
        let response = self
            .http
            .get(&self.jwks_uri)
            .send()
            .await
            .map_err(|e| provider_error("JWKS request failed", e))?;
        if !response.status().is_success() {
            return Err(Error::Provider(format!(
                "{} - {}",
                self.jwks_uri,
                response.status()
            )));
        }
        response
            .json()
            .await
            .map_err(|e| provider_error("invalid JWKS document", e))
    }
}

#[async_trait]
impl IdentityProvider for OidcClient {
    fn issuer(&self) -> &str {
        &self.issuer
    }

    fn authorization_url(&self, request: &AuthorizationRequest<'_>) -> Result<String, Error> {
        let mut url = Url::parse(&self.metadata.authorization_endpoint)
            .map_err(|e| provider_error("invalid authorization endpoint", e))?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("client_id", &self.client_id)
                .append_pair("scope", request.scope)
                .append_pair("response_type", "code")
                .append_pair("redirect_uri", request.redirect_uri)
                .append_pair("code_challenge", request.code_challenge)
                .append_pair("code_challenge_method", super::pkce::CHALLENGE_METHOD)
                .append_pair("nonce", request.nonce)
                .append_pair("state", request.state);
            if let Some(prompt) = request.prompt {
                query.append_pair("prompt", prompt);
            }
        }
        Ok(url.to_string())
    }

    #[instrument(skip_all)]
    async fn exchange_code(&self, exchange: &CodeExchange<'_>) -> Result<TokenSet, Error> {
        if exchange.state != exchange.expected_state {
            return Err(Error::Provider(format!(
                "state mismatch, expected {}, got: {}",
                exchange.expected_state, exchange.state
            )));
        }
        if let Some(iss) = exchange.iss {
            if iss != self.metadata.issuer {
                return Err(Error::Provider(format!(
                    "iss mismatch, expected {}, got: {iss}",
                    self.metadata.issuer
                )));
            }
        }

        let tokens = self
            .token_request(&[
                ("grant_type", "authorization_code"),
                ("code", exchange.code),
                ("redirect_uri", exchange.redirect_uri),
                ("code_verifier", exchange.code_verifier),
            ])
            .await?;

        let id_token = tokens
            .id_token
            .as_deref()
            .ok_or_else(|| Error::Provider("id_token not present in TokenSet".to_string()))?;
        let kid = token::key_id(id_token)?;
        let key = self.signing_key(&kid).await?;
        let claims = token::verify_signature(id_token, &key, None, Some(self.client_id.as_str()))
            .map_err(|e| e.context("ID token verification failed"))?;
        if claims.get("nonce").and_then(Value::as_str) != Some(exchange.nonce) {
            return Err(Error::Provider("nonce mismatch".to_string()));
        }

        Ok(tokens)
    }

    #[instrument(skip_all)]
    async fn refresh(&self, refresh_token: &str) -> Result<TokenSet, Error> {
        self.token_request(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ])
        .await
    }

    #[instrument(skip_all)]
    async fn introspect(&self, token: &str) -> Result<Introspection, Error> {
        let endpoint = self
            .metadata
            .introspection_endpoint
            .as_deref()
            .ok_or_else(|| Error::Provider("No introspection endpoint at issuer".to_string()))?;
        let response = self
            .http
            .post(endpoint)
            .form(&[
                ("token", token),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.expose_secret()),
            ])
            .send()
            .await
            .map_err(|e| provider_error("introspection request failed", e))?;
        if !response.status().is_success() {
            return Err(Error::Provider(format!(
                "introspection endpoint returned {}",
                response.status()
            )));
        }
        response
            .json()
            .await
            .map_err(|e| provider_error("invalid introspection response", e))
    }

    async fn signing_key(&self, kid: &str) -> Result<Arc<DecodingKey>, Error> {
        self.keys.get_or_fetch(kid, || self.fetch_jwks()).await
    }

    #[instrument(skip_all)]
    async fn userinfo(&self, access_token: &str) -> Result<Value, Error> {
        let endpoint = self
            .metadata
            .userinfo_endpoint
            .as_deref()
            .ok_or_else(|| Error::Provider("No userinfo endpoint at issuer".to_string()))?;
        let response = self
            .http
            .get(endpoint)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| provider_error("userinfo request failed", e))?;
        if !response.status().is_success() {
            return Err(Error::Provider(format!(
                "userinfo endpoint returned {}",
                response.status()
            )));
        }
        response
            .json()
            .await
            .map_err(|e| provider_error("invalid userinfo response", e))
    }

    fn end_session_url(
        &self,
        id_token_hint: &str,
        post_logout_redirect_uri: &str,
    ) -> Result<String, Error> {
        let endpoint = self
            .metadata
            .end_session_endpoint
            .as_deref()
            .ok_or_else(|| Error::Provider("end_session_endpoint must be configured".to_string()))?;
        let mut url =
            Url::parse(endpoint).map_err(|e| provider_error("invalid end session endpoint", e))?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("id_token_hint", id_token_hint)
            .append_pair("post_logout_redirect_uri", post_logout_redirect_uri);
        Ok(url.to_string())
    }
}
