//! Application context shared by all request handlers via Axum state.

use std::sync::Arc;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusHandle;
use sg_core::config::Config;
use sg_core::{Result, TokenSigner};
use sg_db::SongCatalog;
use sg_hls::ObjectKeyResolver;
use sg_storage::ObjectStorage;

use crate::gateway::StreamingGateway;

/// Application context shared by all request handlers (via Axum state).
///
/// This is cheaply cloneable because it only holds `Arc`s.
#[derive(Clone)]
pub struct AppContext {
    /// Immutable application configuration snapshot.
    pub config: Arc<Config>,
    /// Issues and verifies stream tokens.
    pub signer: Arc<TokenSigner>,
    /// Catalog lookup, key resolution, and storage access for streams.
    pub gateway: Arc<StreamingGateway>,
    /// Renders `/metrics`; `None` when no recorder is installed.
    pub metrics: Option<PrometheusHandle>,
}

impl AppContext {
    /// Wire the context from configuration and the two external
    /// collaborators. Fails when the signing secret is missing.
    pub fn new(
        config: Config,
        catalog: Arc<dyn SongCatalog>,
        storage: Arc<dyn ObjectStorage>,
    ) -> Result<Self> {
        let signer = TokenSigner::from_config(&config.auth)?;
        let resolver = ObjectKeyResolver::new(config.storage.bucket.trim())
            .with_master_filename(config.streaming.master_filename.trim());
        let gateway = StreamingGateway::new(
            resolver,
            catalog,
            storage,
            Duration::from_secs(config.storage.signed_url_ttl_secs),
        );

        Ok(Self {
            config: Arc::new(config),
            signer: Arc::new(signer),
            gateway: Arc::new(gateway),
            metrics: None,
        })
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}
