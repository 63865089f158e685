//! Optional API-key guard for token issuance.
//!
//! When `auth.api_key` is configured, requests must carry a matching
//! `X-API-Key` header. Without a configured key the guard is a no-op.

use axum::extract::State;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use sg_core::token::constant_time_eq;
use sg_core::Error;

use crate::context::AppContext;
use crate::error::AppError;
use crate::middleware::request_id::request_id_of;
use crate::telemetry;

pub const API_KEY_HEADER: &str = "x-api-key";

pub async fn require_api_key(
    State(ctx): State<AppContext>,
    request: Request<axum::body::Body>,
    next: Next,
) -> Response {
    let Some(expected) = ctx.config.auth.api_key.as_ref().filter(|k| !k.is_blank()) else {
        return next.run(request).await;
    };

    let presented = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if !presented.is_empty()
        && constant_time_eq(presented.as_bytes(), expected.expose().trim().as_bytes())
    {
        return next.run(request).await;
    }

    telemetry::record_auth_rejection("invalid_api_key");
    tracing::warn!(path = %request.uri().path(), "Token request without valid API key");

    let mut err = AppError::new(Error::Unauthorized("missing or invalid API key".into()));
    if let Some(id) = request_id_of(&request) {
        err = err.with_request_id(id);
    }
    err.into_response()
}
