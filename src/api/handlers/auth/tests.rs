//! Route tests driving the full router against an in-memory provider.

use anyhow::{anyhow, Result};
use axum::{
    body::{to_bytes, Body},
    http::{
        header::{AUTHORIZATION, COOKIE, LOCATION, SET_COOKIE},
        Request, Response, StatusCode,
    },
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use url::Url;

use super::{AuthConfig, AuthState};
use crate::{
    api::{self, handlers::user::UserSchema},
    authz::LOGOUT_HEADER,
    callback_state::{self, CallbackState},
    claims::{ClaimConfig, ClaimParser},
    cookies::{CookieNames, CookieSettings, CookieSigner},
    oidc::{
        fake::{token, valid_access_token, FakeProvider, ISSUER},
        TokenSet,
    },
};

const DOMAIN: &str = "gatehouse.dev";
const COOKIE_KEY: &[u8] = b"route-tests-cookie-signing-key!!";

fn auth_state(provider: FakeProvider, config: ClaimConfig) -> AuthState {
    let cookies = CookieSettings::new(
        DOMAIN,
        CookieNames::default(),
        CookieSigner::new(COOKIE_KEY.to_vec()),
    );
    AuthState::new(
        AuthConfig::new(DOMAIN),
        cookies,
        ClaimParser::new(config),
        Arc::new(provider),
    )
}

fn app(provider: FakeProvider) -> Router {
    api::app(Arc::new(auth_state(provider, ClaimConfig::builtin(DOMAIN))))
}

fn signed(value: &str) -> Result<String> {
    Ok(CookieSigner::new(COOKIE_KEY.to_vec()).sign(value)?)
}

async fn get(app: Router, uri: &str, cookie: Option<&str>) -> Result<Response<Body>> {
    let mut request = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        request = request.header(COOKIE, cookie);
    }
    Ok(app.oneshot(request.body(Body::empty())?).await?)
}

async fn body_text(response: Response<Body>) -> Result<String> {
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    Ok(String::from_utf8(bytes.to_vec())?)
}

fn location(response: &Response<Body>) -> Result<Url> {
    let raw = response
        .headers()
        .get(LOCATION)
        .ok_or_else(|| anyhow!("no Location header"))?
        .to_str()?;
    Ok(Url::parse(raw)?)
}

fn query_param(url: &Url, name: &str) -> Option<String> {
    url.query_pairs()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

fn set_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok().map(ToString::to_string))
        .collect()
}

fn org_claims() -> Value {
    json!({
        "sub": "user-1",
        "email": "tester@example.com",
        "name": "Tester",
        "active_organization": {
            "name": "demo",
            "role": ["viewer", "editor"],
            "attribute": {"prometheus_tenant": ["tenant-1"]}
        }
    })
}

#[tokio::test]
async fn login_forces_prompt_without_session() -> Result<()> {
    let redirect = callback_state::encode("/dashboards")?;
    let uri = format!("/auth/login?redirectPath={}", urlencode(&redirect));
    let response = get(app(FakeProvider::new()), &uri, None).await?;

    assert_eq!(response.status(), StatusCode::FOUND);
    let url = location(&response)?;
    assert_eq!(query_param(&url, "prompt").as_deref(), Some("login"));
    assert_eq!(
        query_param(&url, "redirect_uri").as_deref(),
        Some("https://gatehouse.dev/auth/callback")
    );
    assert_eq!(
        query_param(&url, "scope").as_deref(),
        Some("openid offline_access")
    );
    assert_eq!(query_param(&url, "code_challenge_method").as_deref(), Some("S256"));

    let state = query_param(&url, "state").ok_or_else(|| anyhow!("no state"))?;
    assert_eq!(CallbackState::from_state(&state)?.redirect_path, "/dashboards");

    let cookies = set_cookies(&response);
    assert_eq!(cookies.len(), 3);
    assert!(cookies.iter().any(|c| c.starts_with("oidc_code-verifier=")));
    assert!(cookies.iter().any(|c| c.starts_with("oidc_nonce=")));
    assert!(cookies
        .iter()
        .any(|c| c.starts_with(&format!("oidc_state={state}."))));
    assert!(cookies.iter().all(|c| c.contains("HttpOnly")));
    Ok(())
}

#[tokio::test]
async fn login_skips_prompt_with_session() -> Result<()> {
    let response = get(
        app(FakeProvider::new()),
        "/auth/login",
        Some("identity_access=anything"),
    )
    .await?;

    assert_eq!(response.status(), StatusCode::FOUND);
    let url = location(&response)?;
    assert_eq!(query_param(&url, "prompt"), None);
    let state = query_param(&url, "state").ok_or_else(|| anyhow!("no state"))?;
    assert_eq!(CallbackState::from_state(&state)?.redirect_path, "");
    Ok(())
}

fn callback_uri(state: &str) -> String {
    format!(
        "/auth/callback?state={}&session_state=s&iss={}&code=abc",
        urlencode(state),
        urlencode(ISSUER)
    )
}

fn flow_cookies(state: &str) -> Result<String> {
    Ok(format!(
        "oidc_code-verifier={}; oidc_nonce={}; oidc_state={}",
        signed("verifier")?,
        signed("nonce")?,
        signed(state)?
    ))
}

fn exchanged(id_claims: &Value) -> TokenSet {
    TokenSet {
        access_token: valid_access_token(&json!({})),
        id_token: Some(token(id_claims)),
        refresh_token: Some("refresh".to_string()),
    }
}

#[tokio::test]
async fn callback_establishes_session() -> Result<()> {
    let mut id_claims = org_claims();
    id_claims["iss"] = json!(ISSUER);
    let provider = FakeProvider {
        exchanged: Some(exchanged(&id_claims)),
        ..FakeProvider::new()
    };
    let state = callback_state::encode(&CallbackState {
        redirect_path: "/explore".to_string(),
    })?;

    let response = get(app(provider), &callback_uri(&state), Some(&flow_cookies(&state)?)).await?;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        location(&response)?.as_str(),
        "https://demo.gatehouse.dev/explore"
    );
    let cookies = set_cookies(&response);
    assert_eq!(cookies.len(), 6);
    for name in ["oidc_code-verifier", "oidc_nonce", "oidc_state"] {
        assert!(cookies
            .iter()
            .any(|c| c.starts_with(&format!("{name}=;")) && c.contains("Max-Age=0")));
    }
    for name in ["identity_access", "identity_id", "identity_refresh"] {
        assert!(cookies
            .iter()
            .any(|c| c.starts_with(&format!("{name}=")) && !c.contains("Max-Age=0")));
    }
    Ok(())
}

#[tokio::test]
async fn callback_falls_back_to_gateway_domain() -> Result<()> {
    let provider = FakeProvider {
        exchanged: Some(exchanged(&json!({"iss": ISSUER}))),
        ..FakeProvider::new()
    };
    let state = callback_state::encode(&CallbackState {
        redirect_path: "/".to_string(),
    })?;

    let response = get(app(provider), &callback_uri(&state), Some(&flow_cookies(&state)?)).await?;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response)?.as_str(), "https://gatehouse.dev/");
    Ok(())
}

#[tokio::test]
async fn callback_keeps_redirect_on_the_tenant_host() -> Result<()> {
    let mut id_claims = org_claims();
    id_claims["iss"] = json!(ISSUER);

    for path in ["@evil.com", "evil.com/x", "/a\r\nSet-Cookie: x=1"] {
        let provider = FakeProvider {
            exchanged: Some(exchanged(&id_claims)),
            ..FakeProvider::new()
        };
        let state = callback_state::encode(&CallbackState {
            redirect_path: path.to_string(),
        })?;

        let response =
            get(app(provider), &callback_uri(&state), Some(&flow_cookies(&state)?)).await?;
        assert_eq!(response.status(), StatusCode::FOUND);
        let url = location(&response)?;
        assert_eq!(url.host_str(), Some("demo.gatehouse.dev"));
        assert_eq!(url.path(), "/");
    }
    Ok(())
}

#[tokio::test]
async fn callback_without_flow_cookie_is_bad_request() -> Result<()> {
    let provider = FakeProvider::new();
    let state = callback_state::encode(&CallbackState::default())?;
    let cookie = format!("oidc_code-verifier={}", signed("verifier")?);

    let response = get(app(provider), &callback_uri(&state), Some(&cookie)).await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = serde_json::from_str(&body_text(response).await?)?;
    assert_eq!(body["name"], "Cookie error");
    assert_eq!(body["message"], "Cookie error: Missing cookie for nonce");
    Ok(())
}

#[tokio::test]
async fn callback_with_unsigned_cookie_is_bad_request() -> Result<()> {
    let state = callback_state::encode(&CallbackState::default())?;
    let cookie = format!(
        "oidc_code-verifier=verifier; oidc_nonce={}; oidc_state={}",
        signed("nonce")?,
        signed(&state)?
    );
    let response = get(app(FakeProvider::new()), &callback_uri(&state), Some(&cookie)).await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn callback_rejects_issuer_mismatch() -> Result<()> {
    let provider = FakeProvider {
        exchanged: Some(exchanged(&json!({"iss": "https://idp.example.com.evil"}))),
        ..FakeProvider::new()
    };
    let state = callback_state::encode(&CallbackState::default())?;

    let response = get(app(provider), &callback_uri(&state), Some(&flow_cookies(&state)?)).await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(body_text(response)
        .await?
        .contains("Issuer in token does not match"));
    Ok(())
}

#[tokio::test]
async fn callback_exchange_failure_is_unauthorized() -> Result<()> {
    let state = callback_state::encode(&CallbackState::default())?;
    let response = get(
        app(FakeProvider::new()),
        &callback_uri(&state),
        Some(&flow_cookies(&state)?),
    )
    .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn callback_state_without_redirect_path_is_server_error() -> Result<()> {
    let provider = FakeProvider {
        exchanged: Some(exchanged(&json!({"iss": ISSUER}))),
        ..FakeProvider::new()
    };
    let state = callback_state::encode(&json!({"somethingElse": 1}))?;

    let response = get(app(provider), &callback_uri(&state), Some(&flow_cookies(&state)?)).await?;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    Ok(())
}

#[tokio::test]
async fn callback_rejects_malformed_query() -> Result<()> {
    let response = get(app(FakeProvider::new()), "/auth/callback?state=x", None).await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let uri = "/auth/callback?state=!!notbase64!!&session_state=s&iss=i&code=c";
    let response = get(app(FakeProvider::new()), uri, None).await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn logout_ends_provider_session() -> Result<()> {
    let cookie = format!(
        "identity_access={}; identity_id=id-token; identity_refresh=r",
        valid_access_token(&org_claims())
    );
    let response = get(app(FakeProvider::new()), "/auth/logout", Some(&cookie)).await?;

    assert_eq!(response.status(), StatusCode::FOUND);
    let url = location(&response)?;
    assert_eq!(url.path(), "/logout");
    assert_eq!(query_param(&url, "id_token_hint").as_deref(), Some("id-token"));
    assert_eq!(
        query_param(&url, "post_logout_redirect_uri").as_deref(),
        Some("https://gatehouse.dev/auth/login")
    );

    let cookies = set_cookies(&response);
    assert_eq!(cookies.len(), 3);
    assert!(cookies.iter().all(|c| c.contains("Max-Age=0")));
    Ok(())
}

#[tokio::test]
async fn logout_without_session_redirects_to_login() -> Result<()> {
    let redirect = callback_state::encode("/explore")?;
    let uri = format!("/auth/logout?redirectPath={}", urlencode(&redirect));
    let response = get(app(FakeProvider::new()), &uri, None).await?;

    assert_eq!(response.status(), StatusCode::FOUND);
    let url = location(&response)?;
    assert_eq!(url.host_str(), Some(DOMAIN));
    assert_eq!(url.path(), "/auth/login");
    assert_eq!(query_param(&url, "redirectPath"), Some(redirect));
    assert_eq!(set_cookies(&response).len(), 3);
    Ok(())
}

#[tokio::test]
async fn logout_rejects_invalid_redirect_path() -> Result<()> {
    let response = get(
        app(FakeProvider::new()),
        "/auth/logout?redirectPath=!!notbase64!!",
        None,
    )
    .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = serde_json::from_str(&body_text(response).await?)?;
    assert_eq!(body["name"], "Request error");
    Ok(())
}

#[tokio::test]
async fn logout_without_id_token_still_clears_cookies() -> Result<()> {
    let cookie = format!("identity_access={}", valid_access_token(&org_claims()));
    let response = get(app(FakeProvider::new()), "/auth/logout", Some(&cookie)).await?;
    assert_eq!(location(&response)?.path(), "/auth/login");
    assert_eq!(set_cookies(&response).len(), 3);
    Ok(())
}

#[tokio::test]
async fn check_authorizes_and_forwards_headers() -> Result<()> {
    let cookie = format!("identity_access={}", valid_access_token(&org_claims()));
    let response = get(
        app(FakeProvider::new()),
        "/auth/check?tenant=demo&requireRole=viewer",
        Some(&cookie),
    )
    .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(
        headers.get("x-proxy-user").and_then(|v| v.to_str().ok()),
        Some("tester@example.com")
    );
    assert_eq!(headers.get("x-proxy-role").and_then(|v| v.to_str().ok()), Some("Editor"));
    assert_eq!(
        headers.get("x-scope-orgid").and_then(|v| v.to_str().ok()),
        Some("tenant-1")
    );
    assert!(headers.get(LOGOUT_HEADER).is_none());
    assert_eq!(body_text(response).await?, "OK");
    Ok(())
}

#[tokio::test]
async fn check_denies_other_tenant_with_logout_redirect() -> Result<()> {
    let cookie = format!("identity_access={}", valid_access_token(&org_claims()));
    let request = Request::builder()
        .uri("/auth/check?tenant=other")
        .header(COOKIE, cookie)
        .header("x-forwarded-uri", "/d/abc")
        .body(Body::empty())?;
    let response = app(FakeProvider::new()).oneshot(request).await?;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        response.headers().get(LOGOUT_HEADER).and_then(|v| v.to_str().ok()),
        Some("true")
    );
    let url = location(&response)?;
    assert_eq!(url.path(), "/auth/logout");
    let redirect = query_param(&url, "redirectPath").ok_or_else(|| anyhow!("no redirectPath"))?;
    assert_eq!(callback_state::decode::<String>(&redirect)?, "/d/abc");
    Ok(())
}

#[tokio::test]
async fn check_denies_insufficient_role_without_redirect() -> Result<()> {
    let cookie = format!("identity_access={}", valid_access_token(&org_claims()));
    let response = get(
        app(FakeProvider::new()),
        "/auth/check?tenant=demo&requireRole=admin&noRedirect=true",
        Some(&cookie),
    )
    .await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().get(LOGOUT_HEADER).is_some());
    assert!(body_text(response).await?.contains("Not allowed for this role"));
    Ok(())
}

#[tokio::test]
async fn check_with_introspection_and_bearer() -> Result<()> {
    let access = valid_access_token(&org_claims());
    let request = |app: Router| {
        let access = access.clone();
        async move {
            let request = Request::builder()
                .uri("/auth/check?tenant=demo&tokenCheck=introspect&tokenSource=bearer&noRedirect=true")
                .header(AUTHORIZATION, format!("Bearer {access}"))
                .body(Body::empty())?;
            Ok::<_, anyhow::Error>(app.oneshot(request).await?)
        }
    };

    let response = request(app(FakeProvider::new())).await?;
    assert_eq!(response.status(), StatusCode::OK);

    let inactive = FakeProvider {
        active: false,
        ..FakeProvider::new()
    };
    let response = request(app(inactive)).await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn check_requires_tenant() -> Result<()> {
    let response = get(app(FakeProvider::new()), "/auth/check", None).await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn status_reports_ok() -> Result<()> {
    let response = get(app(FakeProvider::new()), "/status", None).await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get("x-app").is_some());
    assert!(response.headers().get("x-request-id").is_some());
    let body: Value = serde_json::from_str(&body_text(response).await?)?;
    assert_eq!(body, json!({"status": "OK"}));
    Ok(())
}

#[tokio::test]
async fn user_info_returns_provider_profile() -> Result<()> {
    let provider = FakeProvider {
        userinfo: Some(json!({"sub": "user-1", "email": "tester@example.com"})),
        ..FakeProvider::new()
    };
    let cookie = format!("identity_access={}", valid_access_token(&org_claims()));
    let response = get(app(provider), "/user-info", Some(&cookie)).await?;

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = serde_json::from_str(&body_text(response).await?)?;
    assert_eq!(body["email"], "tester@example.com");
    Ok(())
}

#[tokio::test]
async fn user_info_without_session_redirects() -> Result<()> {
    let response = get(app(FakeProvider::new()), "/user-info", None).await?;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert!(response.headers().get(LOGOUT_HEADER).is_some());
    Ok(())
}

#[tokio::test]
async fn user_info_provider_failure_is_bad_request() -> Result<()> {
    let cookie = format!("identity_access={}", valid_access_token(&org_claims()));
    let response = get(app(FakeProvider::new()), "/user-info", Some(&cookie)).await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(response.headers().get(LOGOUT_HEADER).is_some());
    Ok(())
}

#[tokio::test]
async fn user_info_enforces_schema() -> Result<()> {
    let provider = FakeProvider {
        userinfo: Some(json!({"sub": "user-1"})),
        ..FakeProvider::new()
    };
    let state = auth_state(provider, ClaimConfig::default()).with_user_schema(Some(UserSchema {
        required: vec!["email".to_string()],
    }));
    let cookie = format!("identity_access={}", valid_access_token(&org_claims()));
    let response = get(api::app(Arc::new(state)), "/user-info", Some(&cookie)).await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_text(response).await?.contains("email"));
    Ok(())
}

#[tokio::test]
async fn openapi_document_is_served() -> Result<()> {
    let response = get(app(FakeProvider::new()), "/openapi.json", None).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = serde_json::from_str(&body_text(response).await?)?;
    assert!(body["paths"].get("/auth/check").is_some());
    Ok(())
}

fn urlencode(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}
