use crate::GIT_COMMIT_HASH;
use axum::{
    http::{HeaderMap, HeaderValue},
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct Status {
    status: String,
}

#[utoipa::path(
    get,
    path = "/status",
    responses(
        (status = 200, description = "Gateway is up", body = Status)
    ),
    tag = "status"
)]
pub async fn status() -> impl IntoResponse {
    let short_hash = GIT_COMMIT_HASH.get(0..7).unwrap_or("");

    let headers = format!(
        "{}:{}:{}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        short_hash
    )
    .parse::<HeaderValue>()
    .map(|x_app| {
        debug!("X-App header: {:?}", x_app);
        let mut headers = HeaderMap::new();
        headers.insert("X-App", x_app);
        headers
    })
    .unwrap_or_else(|err| {
        error!("Failed to parse X-App header: {}", err);
        HeaderMap::new()
    });

    (
        headers,
        Json(Status {
            status: "OK".to_string(),
        }),
    )
}
