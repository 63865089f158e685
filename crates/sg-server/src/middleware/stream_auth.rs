//! Stream token middleware.
//!
//! Runs as a route layer on `/stream/...` so the matched `stream_id` path
//! parameter is available. The token (`t`) and expiry (`e`) come from the
//! query string; a missing or unparseable `e` counts as expired. Rejected
//! requests never reach the gateway.

use std::collections::HashMap;

use axum::extract::{Path, State};
use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use sg_core::token::now_unix;
use sg_core::Error;

use crate::context::AppContext;
use crate::error::AppError;
use crate::middleware::request_id::request_id_of;
use crate::telemetry;

/// Query-string credentials of a stream URL.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct StreamCredentials {
    pub token: Option<String>,
    pub expires_at: Option<i64>,
}

impl StreamCredentials {
    /// Parse `t` and `e` from a raw query string. The first occurrence of
    /// each wins.
    pub fn from_query(query: Option<&str>) -> Self {
        let mut creds = Self::default();
        let mut saw_expiry = false;

        for (key, value) in url::form_urlencoded::parse(query.unwrap_or("").as_bytes()) {
            match key.as_ref() {
                "t" if creds.token.is_none() => creds.token = Some(value.into_owned()),
                "e" if !saw_expiry => {
                    saw_expiry = true;
                    creds.expires_at = value.trim().parse().ok();
                }
                _ => {}
            }
        }

        creds
    }
}

/// Reject requests whose token does not cover the path's `stream_id`.
pub async fn stream_auth_middleware(
    State(ctx): State<AppContext>,
    Path(params): Path<HashMap<String, String>>,
    request: Request<axum::body::Body>,
    next: Next,
) -> Response {
    let stream_id = params.get("stream_id").map(String::as_str).unwrap_or("");
    let creds = StreamCredentials::from_query(request.uri().query());

    let rejection = match creds.token.as_deref().filter(|t| !t.is_empty()) {
        None => Some("missing_token"),
        Some(token) => {
            let now = now_unix();
            let expires_at = creds.expires_at.unwrap_or(0);
            if ctx.signer.validate_at(stream_id, token, expires_at, now) {
                None
            } else if expires_at < now {
                Some("expired")
            } else {
                Some("invalid_signature")
            }
        }
    };

    let Some(reason) = rejection else {
        return next.run(request).await;
    };

    telemetry::record_auth_rejection(reason);
    tracing::warn!(stream_id, reason, "Stream request rejected");

    let mut err = AppError::new(Error::Unauthorized("invalid or expired token".into()));
    if let Some(id) = request_id_of(&request) {
        err = err.with_request_id(id);
    }
    err.into_response()
}
