//! Refresh-token grant.

use std::sync::Arc;
use tracing::warn;

use crate::{
    error::Error,
    oidc::{IdentityProvider, TokenSet},
};

/// Exchanges a refresh token for a new token set. One attempt, no retry.
#[derive(Clone)]
pub struct SessionRefresher {
    provider: Arc<dyn IdentityProvider>,
}

impl SessionRefresher {
    #[must_use]
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        Self { provider }
    }

    /// # Errors
    /// Returns [`Error::Provider`] wrapping the provider's failure.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenSet, Error> {
        warn!("Using refresh token to get new tokens");
        self.provider
            .refresh(refresh_token)
            .await
            .map_err(|e| Error::Provider(format!("Could not refresh tokens with refresh token: {e}")))
    }
}
