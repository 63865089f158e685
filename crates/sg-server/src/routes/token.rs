//! Token issuance.

use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use sg_core::config::AuthConfig;
use sg_hls::{encode_path_segment, validate_stream_id};

use crate::context::AppContext;
use crate::error::AppError;
use crate::telemetry;

#[derive(Debug, Default, Deserialize)]
pub struct TokenQuery {
    /// Requested lifetime in minutes. Kept as text so junk falls back to the
    /// default instead of failing the request.
    pub ttl: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenResponse {
    pub file_id: String,
    /// Unix seconds.
    pub expires: i64,
    /// Stream URL carrying the token, relative to the gateway root.
    pub url: String,
}

/// GET /token/{stream_id}?ttl={minutes}
pub async fn issue_token(
    State(ctx): State<AppContext>,
    Path(stream_id): Path<String>,
    Query(query): Query<TokenQuery>,
) -> Result<Json<TokenResponse>, AppError> {
    validate_stream_id(&stream_id)?;

    let minutes = ttl_minutes(query.ttl.as_deref(), &ctx.config.auth);
    let ttl = Duration::from_secs(minutes.unsigned_abs().saturating_mul(60));
    let token = ctx.signer.generate(&stream_id, ttl);

    telemetry::record_token_issued();
    tracing::info!(stream_id = %stream_id, ttl_minutes = minutes, "Issued stream token");

    Ok(Json(TokenResponse {
        url: format!("/stream/{}?{}", encode_path_segment(&stream_id), token.query()),
        expires: token.expires_at,
        file_id: stream_id,
    }))
}

/// Effective lifetime: the request's positive integer value, else the
/// configured default, never above the configured maximum.
pub fn ttl_minutes(requested: Option<&str>, auth: &AuthConfig) -> i64 {
    let minutes = requested
        .and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|m| *m > 0)
        .unwrap_or(auth.default_ttl_minutes);
    minutes.min(auth.max_ttl_minutes).max(0)
}
