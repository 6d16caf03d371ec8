use crate::{
    api::{
        self,
        handlers::{
            auth::{AuthConfig, AuthState},
            user::UserSchema,
        },
    },
    claims::{ClaimConfig, ClaimParser},
    cookies::{CookieNames, CookieSettings, CookieSigner},
    oidc::OidcClient,
};
use anyhow::{Context, Result};
use secrecy::{ExposeSecret, SecretString};
use std::{path::PathBuf, sync::Arc};
use tracing::{debug, info, warn};

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub domain: String,
    pub issuer: String,
    pub client_id: String,
    pub client_secret: SecretString,
    pub cookie_secret: Option<SecretString>,
    pub cookie_names: CookieNames,
    pub claims_config_path: Option<PathBuf>,
    pub user_schema_path: Option<PathBuf>,
}

fn claim_parser(args: &Args) -> Result<ClaimParser> {
    match &args.claims_config_path {
        Some(path) => ClaimParser::load(path)
            .with_context(|| format!("failed to load claims config: {}", path.display())),
        None => {
            debug!("no claims config given, using built-in rules");
            Ok(ClaimParser::new(ClaimConfig::builtin(&args.domain)))
        }
    }
}

fn cookie_signer(secret: Option<&SecretString>) -> Result<CookieSigner> {
    match secret {
        Some(secret) => Ok(CookieSigner::new(
            secret.expose_secret().as_bytes().to_vec(),
        )),
        None => {
            warn!("no cookie secret given, login flows will not survive a restart");
            CookieSigner::random()
        }
    }
}

/// Execute the server action.
/// # Errors
/// Returns an error if a config file cannot be loaded, provider discovery
/// fails or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let claims = claim_parser(&args)?;

    let user_schema = args
        .user_schema_path
        .as_deref()
        .map(UserSchema::load)
        .transpose()?;

    let signer = cookie_signer(args.cookie_secret.as_ref())?;
    let cookies = CookieSettings::new(args.domain.clone(), args.cookie_names.clone(), signer);

    let provider = OidcClient::discover(&args.issuer, &args.client_id, args.client_secret.clone())
        .await
        .context("OIDC discovery failed")?;
    info!("discovered OIDC provider {}", args.issuer);

    let state = AuthState::new(
        AuthConfig::new(args.domain.clone()),
        cookies,
        claims,
        Arc::new(provider),
    )
    .with_user_schema(user_schema);

    api::new(args.port, Arc::new(state)).await
}
