//! # Gatehouse (OIDC Authentication Gateway)
//!
//! `gatehouse` sits between browsers and the services behind a reverse proxy.
//! It drives the OpenID Connect authorization-code flow with PKCE against a
//! single identity provider and keeps the resulting tokens in cookies.
//!
//! ## Login
//!
//! `/auth/login` stores the code verifier, nonce and state in signed cookies
//! and redirects to the provider. `/auth/callback` exchanges the code, checks
//! the issuer and redirects to a per-tenant subdomain taken from the claims.
//!
//! ## Authorization
//!
//! `/auth/check` is meant for `forward_auth` style proxies. Tokens are
//! verified against the provider JWKS (or introspected), refreshed when
//! expired, and checked against the configured claim predicates. On success
//! identity headers such as `X-PROXY-USER` are returned for the proxy to
//! forward upstream.
//!
//! Claim rules are loaded from a JSON document; without one a built-in set
//! modelled on organization/role claims is used (see [`claims::ClaimConfig`]).

pub mod api;
pub mod authz;
pub mod callback_state;
pub mod claims;
pub mod cli;
pub mod cookies;
pub mod error;
pub mod oidc;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));
