//! Auth configuration and the services shared by every handler.

use std::sync::Arc;
use url::Url;

use crate::{
    api::handlers::user::UserSchema,
    authz::Authorizer,
    claims::ClaimParser,
    cookies::CookieSettings,
    error::Error,
    oidc::IdentityProvider,
};

const DEFAULT_SCOPE: &str = "openid offline_access";
const AUTH_ROUTE_PREFIX: &str = "/auth";

#[derive(Clone, Debug)]
pub struct AuthConfig {
    domain: String,
}

impl AuthConfig {
    #[must_use]
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
        }
    }

    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    #[must_use]
    pub fn scope(&self) -> &str {
        DEFAULT_SCOPE
    }

    /// `https://<domain>/auth/callback`, registered with the provider.
    #[must_use]
    pub fn callback_url(&self) -> String {
        format!("https://{}{AUTH_ROUTE_PREFIX}/callback", self.domain)
    }

    /// Login entry point, optionally carrying an encoded `redirectPath`.
    ///
    /// # Errors
    /// Returns [`Error::Configuration`] if the domain does not form a valid URL.
    pub fn login_url(&self, redirect_path: Option<&str>) -> Result<String, Error> {
        let mut url = self.url("login")?;
        if let Some(path) = redirect_path {
            url.query_pairs_mut().append_pair("redirectPath", path);
        }
        Ok(url.to_string())
    }

    fn url(&self, route: &str) -> Result<Url, Error> {
        Url::parse(&format!("https://{}{AUTH_ROUTE_PREFIX}/{route}", self.domain))
            .map_err(|e| Error::Configuration(format!("invalid domain {}: {e}", self.domain)))
    }
}

/// Services built once at startup and shared through an `Extension`.
pub struct AuthState {
    config: AuthConfig,
    cookies: Arc<CookieSettings>,
    claims: Arc<ClaimParser>,
    provider: Arc<dyn IdentityProvider>,
    authorizer: Authorizer,
    user_schema: Option<UserSchema>,
}

impl AuthState {
    #[must_use]
    pub fn new(
        config: AuthConfig,
        cookies: CookieSettings,
        claims: ClaimParser,
        provider: Arc<dyn IdentityProvider>,
    ) -> Self {
        let cookies = Arc::new(cookies);
        let claims = Arc::new(claims);
        let authorizer = Authorizer::new(
            config.domain(),
            Arc::clone(&cookies),
            Arc::clone(&claims),
            Arc::clone(&provider),
        );
        Self {
            config,
            cookies,
            claims,
            provider,
            authorizer,
            user_schema: None,
        }
    }

    #[must_use]
    pub fn with_user_schema(mut self, schema: Option<UserSchema>) -> Self {
        self.user_schema = schema;
        self
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn cookies(&self) -> &CookieSettings {
        &self.cookies
    }

    #[must_use]
    pub fn claims(&self) -> &ClaimParser {
        &self.claims
    }

    #[must_use]
    pub fn provider(&self) -> &dyn IdentityProvider {
        self.provider.as_ref()
    }

    #[must_use]
    pub fn authorizer(&self) -> &Authorizer {
        &self.authorizer
    }

    #[must_use]
    pub fn user_schema(&self) -> Option<&UserSchema> {
        self.user_schema.as_ref()
    }
}
