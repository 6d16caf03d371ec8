//! OIDC authorization code flow with PKCE, plus the forward-auth check.
//!
//! `login` starts the flow and stores the code verifier, nonce and state in
//! short-lived signed cookies. `callback` exchanges the code, validates the
//! issuer and swaps the flow cookies for the identity cookies. `logout`
//! always clears the identity cookies locally and ends the provider session
//! when it can. `check` is meant to sit behind a reverse proxy's forward-auth
//! hook and returns `200 OK` plus identity headers, or a denial.

pub(crate) mod callback;
pub(crate) mod check;
pub(crate) mod login;
pub(crate) mod logout;
mod state;
pub(crate) mod types;

pub use state::{AuthConfig, AuthState};

#[cfg(test)]
mod tests;
