//! Wire the gateway against a mocked identity provider and drive it through
//! the public router, the same way `gatehouse` does at startup.

use anyhow::Result;
use axum::{
    body::Body,
    http::{header::LOCATION, Request, StatusCode},
    Router,
};
use gatehouse::{
    api::{self, handlers::auth::AuthConfig, handlers::auth::AuthState},
    claims::{ClaimConfig, ClaimParser},
    cookies::{CookieNames, CookieSettings, CookieSigner},
    oidc::OidcClient,
};
use secrecy::SecretString;
use serde_json::json;
use std::{net::TcpListener, sync::Arc};
use tower::ServiceExt;
use url::Url;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

const DOMAIN: &str = "gatehouse.dev";

fn can_bind_localhost() -> bool {
    TcpListener::bind("127.0.0.1:0").is_ok()
}

async fn gateway() -> Result<(MockServer, Router)> {
    let server = MockServer::start().await;
    let base = server.uri();
    Mock::given(method("GET"))
        .and(path("/.well-known/openid-configuration"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "issuer": base,
            "authorization_endpoint": format!("{base}/authorize"),
            "token_endpoint": format!("{base}/token"),
            "jwks_uri": format!("{base}/jwks"),
            "end_session_endpoint": format!("{base}/logout")
        })))
        .mount(&server)
        .await;

    let provider = OidcClient::discover(
        &base,
        "gatehouse",
        SecretString::from("client-secret".to_string()),
    )
    .await?;

    let state = AuthState::new(
        AuthConfig::new(DOMAIN),
        CookieSettings::new(
            DOMAIN,
            CookieNames::default(),
            CookieSigner::new(b"integration".to_vec()),
        ),
        ClaimParser::new(ClaimConfig::builtin(DOMAIN)),
        Arc::new(provider),
    );

    Ok((server, api::app(Arc::new(state))))
}

async fn get(app: Router, uri: &str) -> Result<axum::response::Response> {
    Ok(app
        .oneshot(Request::builder().uri(uri).body(Body::empty())?)
        .await?)
}

#[tokio::test]
async fn status_is_served() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let (_server, app) = gateway().await?;
    let response = get(app, "/status").await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    Ok(())
}

#[tokio::test]
async fn login_redirects_to_discovered_endpoint() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let (server, app) = gateway().await?;
    let response = get(app, "/auth/login").await?;
    assert_eq!(response.status(), StatusCode::FOUND);

    let location = response
        .headers()
        .get(LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let url = Url::parse(location)?;
    assert!(location.starts_with(&format!("{}/authorize", server.uri())));
    let redirect_uri = url
        .query_pairs()
        .find(|(k, _)| k == "redirect_uri")
        .map(|(_, v)| v.into_owned());
    assert_eq!(
        redirect_uri.as_deref(),
        Some("https://gatehouse.dev/auth/callback")
    );
    assert_eq!(response.headers().get_all("set-cookie").iter().count(), 3);
    Ok(())
}

#[tokio::test]
async fn check_without_session_is_denied() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let (_server, app) = gateway().await?;
    let response = get(app, "/auth/check?tenant=demo&noRedirect=true").await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        response
            .headers()
            .get("x-oidc-logout")
            .and_then(|v| v.to_str().ok()),
        Some("true")
    );
    Ok(())
}
