//! Axum router construction.
//!
//! Builds the full application router with all route groups and middleware
//! layers.

use axum::http::{header, HeaderName, HeaderValue};
use axum::middleware;
use axum::routing::get;
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::context::AppContext;
use crate::middleware::api_key::require_api_key;
use crate::middleware::request_id::request_id_middleware;
use crate::middleware::stream_auth::stream_auth_middleware;
use crate::routes;

const FALLBACK_CACHE_CONTROL: &str = "private, max-age=600";

/// Build the complete Axum router.
pub fn build_router(ctx: AppContext) -> Router {
    // Route layers run after matching, so the auth middleware sees the
    // `stream_id` path parameter.
    let stream_routes = Router::new()
        .route("/stream/{stream_id}", get(routes::stream::stream_master))
        .route("/stream/{stream_id}/", get(routes::stream::stream_root))
        .route(
            "/stream/{stream_id}/{*quality}",
            get(routes::stream::stream_file),
        )
        .route_layer(middleware::from_fn_with_state(
            ctx.clone(),
            stream_auth_middleware,
        ));

    let token_routes = Router::new()
        .route("/token/{stream_id}", get(routes::token::issue_token))
        .route_layer(middleware::from_fn_with_state(ctx.clone(), require_api_key));

    let cache_control = HeaderValue::from_str(ctx.config.server.cache_control.trim())
        .unwrap_or_else(|_| {
            tracing::warn!("Invalid server.cache_control, using default");
            HeaderValue::from_static(FALLBACK_CACHE_CONTROL)
        });

    Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/metrics", get(routes::metrics::metrics_handler))
        .merge(token_routes)
        .merge(stream_routes)
        .layer(middleware::from_fn(request_id_middleware))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::CACHE_CONTROL,
            cache_control,
        ))
        .layer(cors_layer(&ctx.config.server.cors_allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

/// Any origin when none are configured, otherwise exactly the listed ones.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers([HeaderName::from_static("x-request-id")]);

    if origins.is_empty() {
        return base.allow_origin(Any);
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o.trim()) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    base.allow_origin(AllowOrigin::list(parsed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use sg_core::config::{Config, Secret};
    use sg_db::pool::init_memory_pool;
    use sg_db::SqliteCatalog;
    use sg_storage::MemoryStorage;
    use tower::ServiceExt;

    fn app(configure: impl FnOnce(&mut Config)) -> Router {
        let mut config = Config::default();
        config.auth.signing_secret = Some(Secret::new("router-secret"));
        configure(&mut config);
        let ctx = AppContext::new(
            config,
            Arc::new(SqliteCatalog::new(init_memory_pool().unwrap())),
            Arc::new(MemoryStorage::default()),
        )
        .unwrap();
        build_router(ctx)
    }

    async fn get(app: Router, uri: &str) -> axum::response::Response {
        app.oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn health_carries_security_headers() {
        let response = get(app(|_| {}), "/health").await;
        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers["x-content-type-options"], "nosniff");
        assert_eq!(headers["x-frame-options"], "DENY");
        assert_eq!(headers["cache-control"], "private, max-age=600");
        assert!(headers.contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn stream_without_token_is_unauthorized() {
        let response = get(app(|_| {}), "/stream/any-song").await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn token_requires_configured_api_key() {
        let router = app(|c| c.auth.api_key = Some(Secret::new("k3y")));

        let denied = get(router.clone(), "/token/song").await;
        assert_eq!(denied.status(), StatusCode::UNAUTHORIZED);

        let allowed = router
            .oneshot(
                Request::get("/token/song")
                    .header("x-api-key", "k3y")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(allowed.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn configured_cache_control_applies() {
        let router = app(|c| c.server.cache_control = "no-cache".into());
        let response = get(router, "/health").await;
        assert_eq!(response.headers()["cache-control"], "no-cache");
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let response = get(app(|_| {}), "/nope").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
