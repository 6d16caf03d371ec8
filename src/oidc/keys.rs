//! Process-wide cache of provider signing keys, keyed by `kid`.

use jsonwebtoken::{jwk::JwkSet, DecodingKey};
use std::{collections::HashMap, fmt, future::Future, sync::Arc};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::Error;

/// Append-only: keys are never evicted. Two requests missing the same `kid`
/// at once may both fetch the key set; the second insert is a no-op.
#[derive(Default)]
pub struct SigningKeyCache {
    keys: RwLock<HashMap<String, Arc<DecodingKey>>>,
}

impl fmt::Debug for SigningKeyCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = f.debug_struct("SigningKeyCache");
        match self.keys.try_read() {
            Ok(keys) => out.field("kids", &keys.keys().collect::<Vec<_>>()),
            Err(_) => out.field("kids", &"<locked>"),
        };
        out.finish_non_exhaustive()
    }
}

impl SigningKeyCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached key for `kid`, fetching the key set on a miss.
    ///
    /// # Errors
    /// Returns [`Error::Token`] if the fetch fails or the fetched set has no
    /// usable key for `kid`.
    pub async fn get_or_fetch<F, Fut>(&self, kid: &str, fetch: F) -> Result<Arc<DecodingKey>, Error>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<JwkSet, Error>>,
    {
        if let Some(key) = self.keys.read().await.get(kid) {
            return Ok(Arc::clone(key));
        }

        debug!("signing key {kid} not cached, fetching key set");
        let set = fetch()
            .await
            .map_err(|e| Error::Token(format!("Could not get public key from kid: {e}")))?;

        let mut keys = self.keys.write().await;
        for jwk in &set.keys {
            let Some(id) = jwk.common.key_id.as_deref() else {
                continue;
            };
            if keys.contains_key(id) {
                continue;
            }
            match DecodingKey::from_jwk(jwk) {
                Ok(key) => {
                    keys.insert(id.to_string(), Arc::new(key));
                }
                Err(err) => warn!("skipping unusable signing key {id}: {err}"),
            }
        }

        keys.get(kid).map(Arc::clone).ok_or_else(|| {
            Error::Token(format!("Could not get public key from kid: no key {kid}"))
        })
    }

    pub async fn len(&self) -> usize {
        self.keys.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.keys.read().await.is_empty()
    }
}
