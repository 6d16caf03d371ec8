//! Per-request authorization: resolve, verify (refreshing once), check
//! claims, then forward identity headers.

pub mod refresher;
pub mod resolver;
pub mod verifier;

pub use refresher::SessionRefresher;
pub use resolver::TokenSource;
pub use verifier::{TokenCheck, TokenVerifier};

use axum::{
    extract::Request,
    http::{header::LOCATION, HeaderMap, HeaderName, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
    Extension,
};
use serde_json::Value;
use std::{collections::BTreeMap, sync::Arc};
use tracing::{debug, error};
use url::Url;

use crate::{
    api::handlers::auth::AuthState,
    callback_state,
    claims::ClaimParser,
    cookies::CookieSettings,
    error::{Error, ErrorBody},
    oidc::{decode_claims, IdentityProvider, TokenSet},
};

/// Header telling a fronting proxy to purge client state.
pub const LOGOUT_HEADER: &str = "x-oidc-logout";
const FORWARDED_URI_HEADER: &str = "x-forwarded-uri";

/// Route level knobs for [`Authorizer::authorize`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AuthorizeOptions {
    pub check: TokenCheck,
    pub source: TokenSource,
    pub no_redirect: bool,
}

/// Route specific predicate run after the configured claim checks.
pub type ExtraCheck<'a> = &'a (dyn Fn(&Value) -> Result<(), Error> + Send + Sync);

/// Tokens bound to the request for downstream handlers.
#[derive(Debug, Clone)]
pub struct SessionTokens(pub TokenSet);

#[derive(Debug)]
pub struct Authorized {
    pub tokens: TokenSet,
    pub refreshed: bool,
    pub claims: Value,
    /// Forwarded identity headers plus rewritten cookies after a refresh.
    pub response_headers: HeaderMap,
}

impl Authorized {
    /// Merge the identity headers and cookies into an outgoing response.
    pub fn apply(self, response: &mut Response) {
        let headers = response.headers_mut();
        let mut last: Option<HeaderName> = None;
        for (name, value) in self.response_headers {
            if let Some(name) = name {
                last = Some(name);
            }
            if let Some(name) = &last {
                headers.append(name.clone(), value);
            }
        }
    }
}

pub struct Authorizer {
    domain: String,
    cookies: Arc<CookieSettings>,
    claims: Arc<ClaimParser>,
    verifier: TokenVerifier,
    refresher: SessionRefresher,
}

impl Authorizer {
    #[must_use]
    pub fn new(
        domain: impl Into<String>,
        cookies: Arc<CookieSettings>,
        claims: Arc<ClaimParser>,
        provider: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self {
            domain: domain.into(),
            cookies,
            claims,
            verifier: TokenVerifier::new(Arc::clone(&provider)),
            refresher: SessionRefresher::new(provider),
        }
    }

    #[must_use]
    pub fn verifier(&self) -> &TokenVerifier {
        &self.verifier
    }

    /// Run the full decision for one request.
    ///
    /// A failed verification is retried once through the refresh grant when
    /// a refresh token is present; the refreshed set is trusted without a
    /// second verification.
    ///
    /// # Errors
    /// Any error is a denial; see [`Authorizer::deny`].
    pub async fn authorize(
        &self,
        headers: &HeaderMap,
        options: AuthorizeOptions,
        extra: Option<ExtraCheck<'_>>,
    ) -> Result<Authorized, Error> {
        let mut tokens = resolver::resolve(headers, options.source, &self.cookies)?;

        let mut refreshed = false;
        if let Err(err) = self.verifier.verify(&tokens.access_token, options.check).await {
            let Some(refresh_token) = tokens.refresh_token.clone() else {
                return Err(err);
            };
            debug!("access token rejected, refreshing: {err}");
            tokens = self.refresher.refresh(&refresh_token).await?;
            refreshed = true;
        }

        let claims = decode_claims(tokens.claims_token())?;

        if self.claims.authorization_check(&claims)? == Some(false) {
            return Err(Error::Authorization(
                "One or more claims are not valid".to_string(),
            ));
        }

        let mut response_headers = match self.claims.forwarded_headers(&claims)? {
            Some(forwarded) => header_map(forwarded)?,
            None => HeaderMap::new(),
        };

        if let Some(extra) = extra {
            extra(&claims)?;
        }

        if refreshed {
            self.cookies.set_tokens(&mut response_headers, &tokens)?;
        }

        Ok(Authorized {
            tokens,
            refreshed,
            claims,
            response_headers,
        })
    }

    /// Denial response: logout signal header, then a plain 401 or a redirect
    /// to the logout entry point carrying the originally requested path.
    #[must_use]
    pub fn deny(&self, err: &Error, headers: &HeaderMap, no_redirect: bool) -> Response {
        error!("{err}");

        let mut response = if no_redirect {
            (StatusCode::UNAUTHORIZED, Json(ErrorBody::from(err))).into_response()
        } else {
            let forwarded_uri = headers
                .get(FORWARDED_URI_HEADER)
                .and_then(|value| value.to_str().ok())
                .unwrap_or("");
            match self.logout_url(forwarded_uri) {
                Ok(location) => found(&location),
                Err(err) => err.into_response(),
            }
        };
        response
            .headers_mut()
            .insert(LOGOUT_HEADER, HeaderValue::from_static("true"));
        response
    }

    fn logout_url(&self, redirect_path: &str) -> Result<String, Error> {
        let encoded = callback_state::encode(redirect_path)?;
        let mut url = Url::parse(&format!("https://{}/auth/logout", self.domain))
            .map_err(|e| Error::Configuration(format!("invalid domain: {e}")))?;
        url.query_pairs_mut().append_pair("redirectPath", &encoded);
        Ok(url.to_string())
    }
}

/// 302 with a `Location` header.
pub fn found(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => (StatusCode::FOUND, [(LOCATION, value)]).into_response(),
        Err(err) => Error::Logic(format!("invalid redirect location: {err}")).into_response(),
    }
}

fn header_map(forwarded: BTreeMap<String, String>) -> Result<HeaderMap, Error> {
    let mut headers = HeaderMap::new();
    for (name, value) in forwarded {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| Error::ClaimResolution(format!("invalid header {name}: {e}")))?;
        let value = HeaderValue::from_str(&value)
            .map_err(|e| Error::ClaimResolution(format!("invalid value for {name}: {e}")))?;
        headers.insert(name, value);
    }
    Ok(headers)
}

/// Middleware for session protected routes: JWKS check, cookie tokens,
/// redirect on denial.
pub async fn require_session(
    Extension(state): Extension<Arc<AuthState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let options = AuthorizeOptions::default();
    let result = state
        .authorizer()
        .authorize(request.headers(), options, None)
        .await;
    match result {
        Ok(authorized) => {
            request
                .extensions_mut()
                .insert(SessionTokens(authorized.tokens.clone()));
            let mut response = next.run(request).await;
            authorized.apply(&mut response);
            response
        }
        Err(err) => state
            .authorizer()
            .deny(&err, request.headers(), options.no_redirect),
    }
}
