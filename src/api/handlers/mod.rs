//! Route handlers. Shared services arrive through `Extension<Arc<AuthState>>`.

pub mod auth;
pub mod status;
pub mod user;
