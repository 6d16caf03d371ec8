//! Access token verification strategies.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;
use utoipa::ToSchema;

use crate::{
    error::Error,
    oidc::{key_id, verify_signature, IdentityProvider},
};

/// How a route verifies access tokens.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TokenCheck {
    /// Signature and issuer check against the provider's published keys.
    #[default]
    Jwks,
    /// Ask the provider whether the token is active.
    Introspect,
}

#[derive(Clone)]
pub struct TokenVerifier {
    provider: Arc<dyn IdentityProvider>,
}

impl TokenVerifier {
    #[must_use]
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        Self { provider }
    }

    /// # Errors
    /// Returns the strategy's error when the token is not accepted.
    pub async fn verify(&self, token: &str, check: TokenCheck) -> Result<(), Error> {
        match check {
            TokenCheck::Jwks => self.verify_with_jwks(token).await,
            TokenCheck::Introspect => self.verify_with_introspection(token).await,
        }
    }

    /// # Errors
    /// Returns [`Error::Token`] on decode failure, unknown key, bad
    /// signature, expiry or issuer mismatch.
    pub async fn verify_with_jwks(&self, token: &str) -> Result<(), Error> {
        let kid = key_id(token)?;
        let key = self.provider.signing_key(&kid).await?;
        verify_signature(token, &key, Some(self.provider.issuer()), None)
            .map_err(|e| e.context("Access token verification failed"))?;
        debug!("access token verified with key {kid}");
        Ok(())
    }

    /// # Errors
    /// Returns [`Error::Provider`] if the call fails and [`Error::Token`] if
    /// the provider reports the token inactive.
    pub async fn verify_with_introspection(&self, token: &str) -> Result<(), Error> {
        let introspection = self
            .provider
            .introspect(token)
            .await
            .map_err(|e| Error::Provider(format!("Failed to introspect token: {e}")))?;
        if introspection.active {
            Ok(())
        } else {
            Err(Error::Token("Introspect token not active".to_string()))
        }
    }
}
