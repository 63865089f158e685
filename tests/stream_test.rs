//! Integration tests for the stream routes: auth, manifest rewriting,
//! traversal rejection, and redirects.

mod common;

use axum::http::StatusCode;
use common::{body_json, body_string, TestHarness, SIGNED_BASE};
use sg_core::token::now_unix;

fn harness() -> TestHarness {
    let h = TestHarness::new();
    h.seed_song("song-1", "my-song", "my-song");
    h
}

#[tokio::test]
async fn bare_route_serves_master_with_prefixed_variants() {
    let h = harness();
    let q = h.token_query("song-1");

    let response = h.get(&format!("/stream/song-1?{q}")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"],
        "application/vnd.apple.mpegurl"
    );
    assert_eq!(response.headers()["cache-control"], "private, max-age=600");

    let body = body_string(response).await;
    assert_eq!(
        body,
        format!("#EXTM3U\n#EXT-X-STREAM-INF:BANDWIDTH=128000\nsong-1/variant.m3u8?{q}\n")
    );
}

#[tokio::test]
async fn trailing_slash_serves_master_without_prefix() {
    let h = harness();
    let q = h.token_query("song-1");

    let response = h.get(&format!("/stream/song-1/?{q}")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains(&format!("\nvariant.m3u8?{q}\n")));
}

#[tokio::test]
async fn variant_selector_serves_rewritten_variant() {
    let h = harness();
    let q = h.token_query("song-1");

    let response = h.get(&format!("/stream/song-1/variant?{q}")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert_eq!(
        body,
        format!("#EXTM3U\n#EXTINF:6.0,\nsegment_000.ts?{q}\n#EXT-X-ENDLIST\n")
    );
}

#[tokio::test]
async fn segment_redirects_to_signed_url() {
    let h = harness();
    let q = h.token_query("song-1");

    let response = h.get(&format!("/stream/song-1/segment_000.ts?{q}")).await;
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        response.headers()["location"],
        format!("{SIGNED_BASE}/my-song/segment_000.ts?expires_in=60").as_str()
    );
    assert_eq!(response.headers()["cache-control"], "no-store");
}

#[tokio::test]
async fn traversal_is_forbidden() {
    let h = harness();
    let q = h.token_query("song-1");

    for selector in ["../../secret", "%2e%2e/secret", "a/%2E%2E/%2e%2e/x.ts"] {
        let response = h.get(&format!("/stream/song-1/{selector}?{q}")).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "{selector}");
        let body = body_json(response).await;
        assert_eq!(body["code"], "forbidden");
        assert!(!body["error"].as_str().unwrap().contains("my-song"));
    }
}

#[tokio::test]
async fn storage_url_folder_resolves() {
    let h = TestHarness::new();
    h.seed_song(
        "song-2",
        "https://x.supabase.co/storage/v1/object/public/songs/albums/first",
        "albums/first",
    );
    let q = h.token_query("song-2");

    let response = h.get(&format!("/stream/song-2/variant?{q}")).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn missing_token_is_unauthorized() {
    let h = harness();
    let exp = now_unix() + 120;

    let response = h.get(&format!("/stream/song-1?e={exp}")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["code"], "unauthorized");
    assert!(body["request_id"].is_string());
}

#[tokio::test]
async fn missing_expiry_is_unauthorized() {
    let h = harness();
    let token = h.ctx.signer.sign("song-1", now_unix() + 120);

    let response = h.get(&format!("/stream/song-1/master?t={token}")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn invalid_token_is_unauthorized() {
    let h = harness();
    let exp = now_unix() + 120;

    let response = h.get(&format!("/stream/song-1/master?t=invalid&e={exp}")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn expired_token_is_unauthorized() {
    let h = harness();
    let exp = now_unix() - 60;
    let token = h.ctx.signer.sign("song-1", exp);

    let response = h.get(&format!("/stream/song-1/master?t={token}&e={exp}")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn token_for_other_stream_is_unauthorized() {
    let h = harness();
    h.seed_song("song-b", "other", "other");
    let q = h.token_query("song-1");

    let response = h.get(&format!("/stream/song-b?{q}")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unknown_stream_is_not_found() {
    let h = harness();
    let q = h.token_query("ghost");

    let response = h.get(&format!("/stream/ghost?{q}")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn missing_object_is_not_found() {
    let h = harness();
    let q = h.token_query("song-1");

    let response = h.get(&format!("/stream/song-1/high?{q}")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn storage_outage_is_bad_gateway() {
    let h = harness();
    h.storage.set_unavailable(true);
    let q = h.token_query("song-1");

    let response = h.get(&format!("/stream/song-1?{q}")).await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = body_json(response).await;
    assert_eq!(body["code"], "upstream_error");
}

#[tokio::test]
async fn responses_carry_security_headers() {
    let h = harness();
    let response = h.get("/stream/song-1").await;
    let headers = response.headers();
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["x-frame-options"], "DENY");
    assert!(headers.contains_key("x-request-id"));
}

#[tokio::test]
async fn request_id_is_echoed() {
    let h = harness();
    let response = h
        .request(
            axum::http::Request::get("/stream/song-1")
                .header("x-request-id", "trace-123")
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.headers()["x-request-id"], "trace-123");
    let body = body_json(response).await;
    assert_eq!(body["request_id"], "trace-123");
}
