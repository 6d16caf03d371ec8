//! In-memory provider for tests; counts the calls that matter.

use async_trait::async_trait;
use jsonwebtoken::DecodingKey;
use serde_json::{json, Map, Value};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use super::{
    token::testing::{exp, sign, KID, SECRET},
    AuthorizationRequest, CodeExchange, IdentityProvider, Introspection, TokenSet,
};
use crate::error::Error;

pub const ISSUER: &str = "https://idp.example.com";

#[derive(Debug, Default)]
pub struct FakeProvider {
    pub issuer: String,
    pub active: bool,
    pub refreshed: Option<TokenSet>,
    pub exchanged: Option<TokenSet>,
    pub userinfo: Option<Value>,
    pub end_session: bool,
    pub refresh_calls: AtomicUsize,
    pub exchange_calls: AtomicUsize,
    pub introspect_calls: AtomicUsize,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self {
            issuer: ISSUER.to_string(),
            active: true,
            end_session: true,
            ..Self::default()
        }
    }

    pub fn refreshes(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }
}

/// HS256 token signed with the shared test key.
pub fn token(claims: &Value) -> String {
    let mut claims = claims.clone();
    if let Some(map) = claims.as_object_mut() {
        map.entry("exp").or_insert_with(|| json!(exp()));
    }
    sign(&claims, KID, SECRET)
}

/// Token signed with a key the fake provider does not publish.
pub fn forged_token(claims: &Value) -> String {
    let mut claims = claims.clone();
    if let Some(map) = claims.as_object_mut() {
        map.entry("exp").or_insert_with(|| json!(exp()));
    }
    sign(&claims, KID, b"not-the-published-signing-secret!")
}

/// Access token the fake provider accepts.
pub fn valid_access_token(extra: &Value) -> String {
    let mut claims = Map::new();
    claims.insert("iss".to_string(), json!(ISSUER));
    if let Some(map) = extra.as_object() {
        claims.extend(map.clone());
    }
    token(&Value::Object(claims))
}

#[async_trait]
impl IdentityProvider for FakeProvider {
    fn issuer(&self) -> &str {
        &self.issuer
    }

    fn authorization_url(&self, request: &AuthorizationRequest<'_>) -> Result<String, Error> {
        let mut url = url::Url::parse("https://idp.example.com/authorize")
            .map_err(|e| Error::Provider(e.to_string()))?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("redirect_uri", request.redirect_uri)
                .append_pair("scope", request.scope)
                .append_pair("state", request.state)
                .append_pair("nonce", request.nonce)
                .append_pair("code_challenge", request.code_challenge)
                .append_pair("code_challenge_method", "S256");
            if let Some(prompt) = request.prompt {
                query.append_pair("prompt", prompt);
            }
        }
        Ok(url.to_string())
    }

    async fn exchange_code(&self, exchange: &CodeExchange<'_>) -> Result<TokenSet, Error> {
        self.exchange_calls.fetch_add(1, Ordering::SeqCst);
        if exchange.state != exchange.expected_state {
            return Err(Error::Provider("state mismatch".to_string()));
        }
        self.exchanged
            .clone()
            .ok_or_else(|| Error::Provider("invalid_grant".to_string()))
    }

    async fn refresh(&self, _refresh_token: &str) -> Result<TokenSet, Error> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        self.refreshed
            .clone()
            .ok_or_else(|| Error::Provider("invalid_grant".to_string()))
    }

    async fn introspect(&self, _token: &str) -> Result<Introspection, Error> {
        self.introspect_calls.fetch_add(1, Ordering::SeqCst);
        Ok(Introspection {
            active: self.active,
            extra: Map::new(),
        })
    }

    async fn signing_key(&self, kid: &str) -> Result<Arc<DecodingKey>, Error> {
        if kid == KID {
            Ok(Arc::new(DecodingKey::from_secret(SECRET)))
        } else {
            Err(Error::Token(format!("Could not get public key from kid: {kid}")))
        }
    }

    async fn userinfo(&self, _access_token: &str) -> Result<Value, Error> {
        self.userinfo
            .clone()
            .ok_or_else(|| Error::Provider("userinfo endpoint returned 401".to_string()))
    }

    fn end_session_url(
        &self,
        id_token_hint: &str,
        post_logout_redirect_uri: &str,
    ) -> Result<String, Error> {
        if !self.end_session {
            return Err(Error::Provider(
                "end_session_endpoint must be configured".to_string(),
            ));
        }
        let mut url = url::Url::parse("https://idp.example.com/logout")
            .map_err(|e| Error::Provider(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("id_token_hint", id_token_hint)
            .append_pair("post_logout_redirect_uri", post_logout_redirect_uri);
        Ok(url.to_string())
    }
}
