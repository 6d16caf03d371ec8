//! PKCE verifier/challenge pairs and nonces.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};

use crate::error::Error;

pub const CHALLENGE_METHOD: &str = "S256";

fn random_token(what: &str) -> Result<String, Error> {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| Error::Logic(format!("failed to generate {what}: {e}")))?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

/// # Errors
/// Returns [`Error::Logic`] if the OS RNG fails.
pub fn code_verifier() -> Result<String, Error> {
    random_token("code verifier")
}

/// S256 challenge for a verifier.
#[must_use]
pub fn code_challenge(verifier: &str) -> String {
    let digest = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(digest)
}

/// # Errors
/// Returns [`Error::Logic`] if the OS RNG fails.
pub fn nonce() -> Result<String, Error> {
    random_token("nonce")
}
