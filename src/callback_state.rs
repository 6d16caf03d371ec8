//! Opaque values carried through query strings and the OIDC `state` parameter.
//!
//! Payloads are JSON encoded then base64'd. They are not encrypted; tamper
//! evidence comes only from the signed cookie that stores the login state.

use base64::{
    engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD},
    Engine,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::error::Error;

/// Post-login destination, created at login and consumed at callback.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackState {
    pub redirect_path: String,
}

impl CallbackState {
    /// Decode the `state` value and require a `redirectPath` field.
    ///
    /// # Errors
    /// Returns [`Error::Request`] for undecodable input and [`Error::Logic`]
    /// when the payload lacks `redirectPath`.
    pub fn from_state(state: &str) -> Result<Self, Error> {
        let value: serde_json::Value = decode(state)?;
        Self::from_payload(&value)
    }

    /// Same as [`CallbackState::from_state`] for an already decoded payload.
    ///
    /// # Errors
    /// Returns [`Error::Logic`] when the payload lacks `redirectPath`.
    pub fn from_payload(value: &serde_json::Value) -> Result<Self, Error> {
        let Some(path) = value.get("redirectPath") else {
            return Err(Error::Logic("redirectPath not found in state".to_string()));
        };
        let redirect_path = path
            .as_str()
            .ok_or_else(|| Error::Logic("redirectPath in state is not a string".to_string()))?;
        Ok(Self {
            redirect_path: redirect_path.to_string(),
        })
    }

    /// Path to append to the post-login origin. Anything that is not an
    /// absolute path, or that carries control characters, becomes `/`.
    #[must_use]
    pub fn location_path(&self) -> &str {
        let path = self.redirect_path.as_str();
        if path.starts_with('/') && !path.chars().any(char::is_control) {
            path
        } else {
            "/"
        }
    }
}

/// JSON encode then base64 (standard alphabet, padded).
///
/// # Errors
/// Returns [`Error::Logic`] if the value cannot be serialized.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<String, Error> {
    let json = serde_json::to_vec(value)
        .map_err(|e| Error::Logic(format!("failed to encode state: {e}")))?;
    Ok(STANDARD.encode(json))
}

/// Inverse of [`encode`]. Also accepts the URL-safe alphabet without padding.
///
/// # Errors
/// Returns [`Error::Request`] if the input is not base64 or not the expected JSON.
pub fn decode<T: DeserializeOwned>(encoded: &str) -> Result<T, Error> {
    let trimmed = encoded.trim();
    let bytes = STANDARD
        .decode(trimmed)
        .or_else(|_| URL_SAFE_NO_PAD.decode(trimmed.trim_end_matches('=')))
        .map_err(|_| Error::Request("Invalid base64 payload".to_string()))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| Error::Request(format!("Invalid encoded payload: {e}")))
}
