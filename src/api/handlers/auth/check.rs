use axum::{
    extract::{rejection::QueryRejection, Extension, Query},
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use serde_json::Value;
use std::sync::Arc;
use tracing::instrument;

use super::{
    state::AuthState,
    types::{CheckQuery, Role},
};
use crate::{
    authz::{AuthorizeOptions, ExtraCheck},
    claims::{
        config::CheckRule, ClaimConfig, ClaimParser, ClaimPath, Expected, Pipeline, Predicate,
        Stage, ROLE_RANKING,
    },
    error::{Error, ErrorBody},
};

const TENANT_CLAIM: &str = "active_organization.name";
const ROLE_CLAIM: &str = "active_organization.role";

fn single_check(rule: CheckRule) -> ClaimParser {
    ClaimParser::new(ClaimConfig {
        authorization_check: Some(vec![rule]),
        ..ClaimConfig::default()
    })
}

fn tenant_parser(tenant: &str) -> ClaimParser {
    single_check(CheckRule {
        value: Expected::Literal(tenant.to_string()),
        claim_path: ClaimPath::new(TENANT_CLAIM),
        pipe_parser: Pipeline::default(),
    })
}

/// Highest ranked role in the claim must rank at or above `required`.
fn role_parser(required: Role) -> ClaimParser {
    let ranking: Vec<String> = ROLE_RANKING.iter().map(ToString::to_string).collect();
    single_check(CheckRule {
        value: Expected::Predicate(Predicate::RankAtLeast {
            ranking: ranking.clone(),
            required: required.as_str().to_string(),
        }),
        claim_path: ClaimPath::new(ROLE_CLAIM),
        pipe_parser: Pipeline::new(vec![Stage::OneOfPrioritized { value: ranking }]),
    })
}

#[utoipa::path(
    get,
    path = "/auth/check",
    params(CheckQuery),
    responses(
        (status = 200, description = "Authorized; identity headers attached", body = String),
        (status = 302, description = "Denied; redirect to logout"),
        (status = 400, description = "Invalid query", body = ErrorBody),
        (status = 401, description = "Denied with noRedirect=true", body = ErrorBody)
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn check(
    headers: HeaderMap,
    query: Result<Query<CheckQuery>, QueryRejection>,
    Extension(state): Extension<Arc<AuthState>>,
) -> Response {
    let Query(query) = match query {
        Ok(query) => query,
        Err(rejection) => return Error::Request(rejection.body_text()).into_response(),
    };

    let options = AuthorizeOptions {
        check: query.token_check,
        source: query.token_source,
        no_redirect: query.no_redirect,
    };

    let tenant = tenant_parser(&query.tenant);
    let role = query.require_role.map(role_parser);
    let extra: ExtraCheck<'_> = &|claims: &Value| {
        if tenant.authorization_check(claims)? != Some(true) {
            return Err(Error::Authorization(format!(
                "No permission to access tenant {}",
                query.tenant
            )));
        }
        if let Some(role) = &role {
            if role.authorization_check(claims)? != Some(true) {
                return Err(Error::Authorization(
                    "Not allowed for this role".to_string(),
                ));
            }
        }
        Ok(())
    };

    let result = state
        .authorizer()
        .authorize(&headers, options, Some(extra))
        .await;
    match result {
        Ok(authorized) => {
            let mut response = "OK".into_response();
            authorized.apply(&mut response);
            response
        }
        Err(err) => state.authorizer().deny(&err, &headers, options.no_redirect),
    }
}
