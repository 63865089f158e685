//! Supabase storage client against a mock HTTP server.

use std::time::Duration;

use sg_storage::{ObjectStorage, StorageError, SupabaseStorage};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> SupabaseStorage {
    SupabaseStorage::new(
        &server.uri(),
        "songs",
        Some("service-key".into()),
        Duration::from_secs(5),
    )
}

#[tokio::test]
async fn download_sends_credentials_and_returns_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/storage/v1/object/songs/my-song/master.m3u8"))
        .and(header("authorization", "Bearer service-key"))
        .and(header("apikey", "service-key"))
        .respond_with(ResponseTemplate::new(200).set_body_string("#EXTM3U\nlow.m3u8\n"))
        .expect(1)
        .mount(&server)
        .await;

    let body = client(&server)
        .download("my-song/master.m3u8")
        .await
        .unwrap();
    assert_eq!(&body[..], b"#EXTM3U\nlow.m3u8\n");
}

#[tokio::test]
async fn download_encodes_key_segments() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/storage/v1/object/songs/my%20song/master.m3u8"))
        .respond_with(ResponseTemplate::new(200).set_body_string("#EXTM3U\n"))
        .expect(1)
        .mount(&server)
        .await;

    client(&server).download("my song/master.m3u8").await.unwrap();
}

#[tokio::test]
async fn download_404_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = client(&server).download("x/master.m3u8").await.unwrap_err();
    assert!(matches!(err, StorageError::NotFound(_)));
}

#[tokio::test]
async fn download_400_not_found_body_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_string(r#"{"statusCode":"404","error":"not_found","message":"Object not found"}"#),
        )
        .mount(&server)
        .await;

    let err = client(&server).download("x/master.m3u8").await.unwrap_err();
    assert!(matches!(err, StorageError::NotFound(_)));
}

#[tokio::test]
async fn download_server_error_is_upstream() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let err = client(&server).download("x/master.m3u8").await.unwrap_err();
    assert!(matches!(err, StorageError::Upstream(_)));
}

#[tokio::test]
async fn oversized_download_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("x".repeat(64)))
        .mount(&server)
        .await;

    let storage = client(&server).with_max_object_bytes(16);
    let err = storage.download("big.m3u8").await.unwrap_err();
    assert!(matches!(err, StorageError::Upstream(_)));
}

#[tokio::test]
async fn signed_url_posts_ttl_and_absolutizes_path() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/storage/v1/object/sign/songs/my-song/seg_000.ts"))
        .and(header("authorization", "Bearer service-key"))
        .and(body_json(serde_json::json!({ "expiresIn": 60 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "signedURL": "/object/sign/songs/my-song/seg_000.ts?token=abc"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let url = client(&server)
        .signed_url("my-song/seg_000.ts", Duration::from_secs(60))
        .await
        .unwrap();
    assert_eq!(
        url,
        format!(
            "{}/storage/v1/object/sign/songs/my-song/seg_000.ts?token=abc",
            server.uri()
        )
    );
}

#[tokio::test]
async fn signed_url_missing_object_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_string("Object not found"))
        .mount(&server)
        .await;

    let err = client(&server)
        .signed_url("gone.ts", Duration::from_secs(60))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound(_)));
}

#[tokio::test]
async fn signed_url_malformed_response_is_upstream() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = client(&server)
        .signed_url("a.ts", Duration::from_secs(60))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Upstream(_)));
}

#[tokio::test]
async fn unreachable_server_is_upstream() {
    let storage = SupabaseStorage::new(
        "http://127.0.0.1:9",
        "songs",
        None,
        Duration::from_millis(500),
    );
    let err = storage.download("a.m3u8").await.unwrap_err();
    assert!(matches!(err, StorageError::Upstream(_)));
}
