//! Cookie names, attributes and HMAC signing for the flow cookies.

use anyhow::Context;
use axum::http::{
    header::{COOKIE, SET_COOKIE},
    HeaderMap, HeaderValue,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use hmac::{Hmac, Mac};
use rand::{rngs::OsRng, RngCore};
use secrecy::{ExposeSecret, SecretSlice};
use sha2::Sha256;
use std::fmt;

use crate::{error::Error, oidc::TokenSet};

type HmacSha256 = Hmac<Sha256>;

pub const DEFAULT_CODE_VERIFIER: &str = "oidc_code-verifier";
pub const DEFAULT_NONCE: &str = "oidc_nonce";
pub const DEFAULT_STATE: &str = "oidc_state";
pub const DEFAULT_ID_TOKEN: &str = "identity_id";
pub const DEFAULT_ACCESS_TOKEN: &str = "identity_access";
pub const DEFAULT_REFRESH_TOKEN: &str = "identity_refresh";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieNames {
    pub code_verifier: String,
    pub nonce: String,
    pub state: String,
    pub id_token: String,
    pub access_token: String,
    pub refresh_token: String,
}

impl Default for CookieNames {
    fn default() -> Self {
        Self {
            code_verifier: DEFAULT_CODE_VERIFIER.to_string(),
            nonce: DEFAULT_NONCE.to_string(),
            state: DEFAULT_STATE.to_string(),
            id_token: DEFAULT_ID_TOKEN.to_string(),
            access_token: DEFAULT_ACCESS_TOKEN.to_string(),
            refresh_token: DEFAULT_REFRESH_TOKEN.to_string(),
        }
    }
}

/// Signs cookie values as `<value>.<base64url(hmac)>`.
pub struct CookieSigner {
    key: SecretSlice<u8>,
}

impl fmt::Debug for CookieSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CookieSigner")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

impl CookieSigner {
    #[must_use]
    pub fn new(key: Vec<u8>) -> Self {
        Self {
            key: SecretSlice::from(key),
        }
    }

    /// Signer with 32 random bytes, valid for the lifetime of the process.
    ///
    /// # Errors
    /// Returns an error if the OS RNG fails.
    pub fn random() -> anyhow::Result<Self> {
        let mut key = vec![0u8; 32];
        OsRng
            .try_fill_bytes(&mut key)
            .context("failed to generate cookie secret")?;
        Ok(Self::new(key))
    }

    fn mac(&self) -> Result<HmacSha256, Error> {
        HmacSha256::new_from_slice(self.key.expose_secret())
            .map_err(|e| Error::Cookie(format!("invalid cookie key: {e}")))
    }

    /// # Errors
    /// Returns [`Error::Cookie`] if the key is unusable.
    pub fn sign(&self, value: &str) -> Result<String, Error> {
        let mut mac = self.mac()?;
        mac.update(value.as_bytes());
        let tag = mac.finalize().into_bytes();
        Ok(format!("{value}.{}", URL_SAFE_NO_PAD.encode(tag)))
    }

    /// Verify and strip the signature. `None` for anything that does not verify.
    #[must_use]
    pub fn unsign(&self, signed: &str) -> Option<String> {
        let (value, tag) = signed.rsplit_once('.')?;
        let tag = URL_SAFE_NO_PAD.decode(tag).ok()?;
        let mut mac = self.mac().ok()?;
        mac.update(value.as_bytes());
        mac.verify_slice(&tag).ok()?;
        Some(value.to_string())
    }
}

/// Everything needed to read and write the six gateway cookies.
#[derive(Debug)]
pub struct CookieSettings {
    domain: String,
    names: CookieNames,
    signer: CookieSigner,
}

impl CookieSettings {
    #[must_use]
    pub fn new(domain: impl Into<String>, names: CookieNames, signer: CookieSigner) -> Self {
        Self {
            domain: domain.into(),
            names,
            signer,
        }
    }

    #[must_use]
    pub fn names(&self) -> &CookieNames {
        &self.names
    }

    #[must_use]
    pub fn signer(&self) -> &CookieSigner {
        &self.signer
    }

    /// Raw cookie value from the request `Cookie` headers.
    #[must_use]
    pub fn read(&self, headers: &HeaderMap, name: &str) -> Option<String> {
        headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|header| header.to_str().ok())
            .flat_map(|value| value.split(';'))
            .find_map(|pair| {
                let mut parts = pair.trim().splitn(2, '=');
                let key = parts.next()?.trim();
                let val = parts.next()?.trim();
                (key == name).then(|| val.to_string())
            })
    }

    /// Cookie value with its signature verified. A bad signature reads as absent.
    #[must_use]
    pub fn read_signed(&self, headers: &HeaderMap, name: &str) -> Option<String> {
        self.read(headers, name)
            .and_then(|value| self.signer.unsign(&value))
    }

    /// Identity tokens from cookies; requires the access token cookie.
    #[must_use]
    pub fn read_tokens(&self, headers: &HeaderMap) -> Option<TokenSet> {
        let access_token = self.read(headers, &self.names.access_token)?;
        Some(TokenSet {
            access_token,
            id_token: self.read(headers, &self.names.id_token),
            refresh_token: self.read(headers, &self.names.refresh_token),
        })
    }

    /// # Errors
    /// Returns [`Error::Cookie`] if the value is not a valid header value.
    pub fn set(&self, headers: &mut HeaderMap, name: &str, value: &str) -> Result<(), Error> {
        let cookie = format!("{name}={value}; {}", self.attributes());
        headers.append(SET_COOKIE, header_value(&cookie)?);
        Ok(())
    }

    /// # Errors
    /// Returns [`Error::Cookie`] if signing fails or the value is not a valid
    /// header value.
    pub fn set_signed(&self, headers: &mut HeaderMap, name: &str, value: &str) -> Result<(), Error> {
        let signed = self.signer.sign(value)?;
        self.set(headers, name, &signed)
    }

    /// # Errors
    /// Returns [`Error::Cookie`] if the cookie name is not a valid header value.
    pub fn clear(&self, headers: &mut HeaderMap, name: &str) -> Result<(), Error> {
        let cookie = format!(
            "{name}=; {}; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT",
            self.attributes()
        );
        headers.append(SET_COOKIE, header_value(&cookie)?);
        Ok(())
    }

    /// Write the identity cookies. Missing optional tokens are left untouched.
    ///
    /// # Errors
    /// Returns [`Error::Cookie`] if a token is not a valid header value.
    pub fn set_tokens(&self, headers: &mut HeaderMap, tokens: &TokenSet) -> Result<(), Error> {
        self.set(headers, &self.names.access_token, &tokens.access_token)?;
        if let Some(id_token) = &tokens.id_token {
            self.set(headers, &self.names.id_token, id_token)?;
        }
        if let Some(refresh_token) = &tokens.refresh_token {
            self.set(headers, &self.names.refresh_token, refresh_token)?;
        }
        Ok(())
    }

    /// # Errors
    /// Returns [`Error::Cookie`] if a configured name is not a valid header value.
    pub fn clear_tokens(&self, headers: &mut HeaderMap) -> Result<(), Error> {
        self.clear(headers, &self.names.id_token)?;
        self.clear(headers, &self.names.access_token)?;
        self.clear(headers, &self.names.refresh_token)
    }

    fn attributes(&self) -> String {
        format!(
            "Domain={}; Path=/; HttpOnly; Secure; SameSite=Strict",
            self.domain
        )
    }
}

fn header_value(cookie: &str) -> Result<HeaderValue, Error> {
    HeaderValue::from_str(cookie).map_err(|e| Error::Cookie(format!("invalid cookie: {e}")))
}
