//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`] which creates an in-memory catalog, in-memory
//! object storage, a test config, and the full router.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use sg_core::config::{Config, Secret};
use sg_db::pool::{init_memory_pool, DbPool};
use sg_db::SqliteCatalog;
use sg_server::context::AppContext;
use sg_server::router::build_router;
use sg_storage::MemoryStorage;
use tower::ServiceExt;

pub const SECRET: &str = "test-secret";
pub const SIGNED_BASE: &str = "https://signed.test";

/// Test harness wrapping a fully-constructed [`AppContext`] backed by an
/// in-memory catalog and storage.
pub struct TestHarness {
    pub ctx: AppContext,
    pub db: DbPool,
    pub storage: Arc<MemoryStorage>,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_config(Self::config())
    }

    /// Config the harness uses by default: known secret, `songs` bucket.
    pub fn config() -> Config {
        let mut config = Config::default();
        config.auth.signing_secret = Some(Secret::new(SECRET));
        config.storage.url = "https://storage.test".into();
        config.storage.bucket = "songs".into();
        config
    }

    pub fn with_config(config: Config) -> Self {
        let db = init_memory_pool().expect("failed to create in-memory pool");
        let storage = Arc::new(MemoryStorage::new(SIGNED_BASE));
        let ctx = AppContext::new(
            config,
            Arc::new(SqliteCatalog::new(db.clone())),
            storage.clone(),
        )
        .expect("failed to build context");

        Self { ctx, db, storage }
    }

    pub fn router(&self) -> Router {
        build_router(self.ctx.clone())
    }

    /// Register a song and store its master, one variant, and one segment.
    pub fn seed_song(&self, id: &str, bucket_folder: &str, object_dir: &str) {
        let conn = self.db.get().expect("connection");
        sg_db::queries::songs::upsert_song(&conn, id, "Test Song", 180, bucket_folder)
            .expect("seed song");

        self.storage.put(
            format!("{object_dir}/master.m3u8"),
            "#EXTM3U\n#EXT-X-STREAM-INF:BANDWIDTH=128000\nvariant.m3u8\n",
        );
        self.storage.put(
            format!("{object_dir}/variant.m3u8"),
            "#EXTM3U\n#EXTINF:6.0,\nsegment_000.ts\n#EXT-X-ENDLIST\n",
        );
        self.storage
            .put(format!("{object_dir}/segment_000.ts"), "audio-bytes");
    }

    /// `t=..&e=..` for `stream_id`, valid for ten minutes.
    pub fn token_query(&self, stream_id: &str) -> String {
        self.ctx
            .signer
            .generate(stream_id, Duration::from_secs(600))
            .query()
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        self.request(Request::get(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn request(&self, request: Request<Body>) -> Response<Body> {
        self.router().oneshot(request).await.unwrap()
    }

    /// Start an Axum server on a random port.
    pub async fn with_server(self) -> (Self, SocketAddr) {
        let app = self.router();
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind random port");
        let addr = listener.local_addr().expect("failed to get local addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        (self, addr)
    }
}

pub async fn body_string(response: Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
