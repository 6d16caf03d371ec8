//! Map parsed CLI arguments to the action to run.

use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::{claims, cookies, oidc, ARG_DOMAIN, ARG_PORT};
use anyhow::{Context, Result};

/// # Errors
/// Returns an error if a required argument is missing or empty.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);
    let domain = matches
        .get_one::<String>(ARG_DOMAIN)
        .map(|d| d.trim().trim_end_matches('/').to_string())
        .filter(|d| !d.is_empty())
        .context("missing required argument: --domain")?;

    let oidc_opts = oidc::Options::parse(matches)?;
    let cookie_opts = cookies::Options::parse(matches)?;
    let claims_opts = claims::Options::parse(matches);

    Ok(Action::Server(Args {
        port,
        domain,
        issuer: oidc_opts.issuer,
        client_id: oidc_opts.client_id,
        client_secret: oidc_opts.client_secret,
        cookie_secret: cookie_opts.secret,
        cookie_names: cookie_opts.names,
        claims_config_path: claims_opts.claims_config_path,
        user_schema_path: claims_opts.user_schema_path,
    }))
}
