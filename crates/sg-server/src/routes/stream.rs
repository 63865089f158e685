//! Stream endpoints. Token auth has already run as a route layer.

use axum::extract::{Path, RawQuery, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Extension;
use sg_core::Error;

use crate::context::AppContext;
use crate::error::AppError;
use crate::gateway::{StreamRequest, StreamResponse};
use crate::middleware::request_id::RequestId;
use crate::telemetry;

pub const HLS_CONTENT_TYPE: &str = "application/vnd.apple.mpegurl";

/// GET /stream/{stream_id}
pub async fn stream_master(
    State(ctx): State<AppContext>,
    Path(stream_id): Path<String>,
    RawQuery(query): RawQuery,
    request_id: Option<Extension<RequestId>>,
) -> Response {
    serve(&ctx, &stream_id, "", query.as_deref(), true, request_id).await
}

/// GET /stream/{stream_id}/
pub async fn stream_root(
    State(ctx): State<AppContext>,
    Path(stream_id): Path<String>,
    RawQuery(query): RawQuery,
    request_id: Option<Extension<RequestId>>,
) -> Response {
    serve(&ctx, &stream_id, "", query.as_deref(), false, request_id).await
}

/// GET /stream/{stream_id}/{*quality}
pub async fn stream_file(
    State(ctx): State<AppContext>,
    Path((stream_id, quality)): Path<(String, String)>,
    RawQuery(query): RawQuery,
    request_id: Option<Extension<RequestId>>,
) -> Response {
    serve(&ctx, &stream_id, &quality, query.as_deref(), false, request_id).await
}

async fn serve(
    ctx: &AppContext,
    stream_id: &str,
    selector: &str,
    raw_query: Option<&str>,
    bare_master: bool,
    request_id: Option<Extension<RequestId>>,
) -> Response {
    let request = StreamRequest {
        stream_id,
        selector,
        raw_query: raw_query.unwrap_or(""),
        bare_master,
    };

    let result = match ctx.gateway.serve(request).await {
        Ok(StreamResponse::Manifest(body)) => {
            telemetry::record_stream_request("manifest");
            Ok((
                StatusCode::OK,
                [(header::CONTENT_TYPE, HLS_CONTENT_TYPE)],
                body,
            )
                .into_response())
        }
        Ok(StreamResponse::Redirect(url)) => redirect(&url),
        Err(e) => Err(e),
    };

    result.unwrap_or_else(|e| {
        telemetry::record_stream_request("error");
        tracing::debug!(stream_id, selector, error = %e, "Stream request failed");
        let mut err = AppError::new(e);
        if let Some(Extension(RequestId(id))) = request_id {
            err = err.with_request_id(id);
        }
        err.into_response()
    })
}

/// 307 so the client repeats the same method against storage. Signed URLs
/// are short-lived, so the redirect itself must not be cached.
fn redirect(url: &str) -> Result<Response, Error> {
    let location = HeaderValue::from_str(url)
        .map_err(|_| Error::Internal("signed URL is not a valid header value".into()))?;
    telemetry::record_stream_request("redirect");
    Ok((
        StatusCode::TEMPORARY_REDIRECT,
        [
            (header::LOCATION, location),
            (header::CACHE_CONTROL, HeaderValue::from_static("no-store")),
        ],
    )
        .into_response())
}
