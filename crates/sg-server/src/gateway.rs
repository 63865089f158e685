//! Streaming gateway: turns an authorized stream request into either an
//! inline, rewritten manifest or a redirect to a short-lived storage URL.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use sg_core::{Error, Result};
use sg_db::SongCatalog;
use sg_hls::{
    encode_path_segment, is_manifest_key, validate_stream_id, ManifestRewriter,
    ObjectKeyResolver,
};
use sg_storage::{ObjectStorage, StorageError};

/// What the client asked for, after authorization.
#[derive(Debug, Clone, Copy)]
pub struct StreamRequest<'a> {
    pub stream_id: &'a str,
    /// Everything after `/stream/{id}/`, possibly empty.
    pub selector: &'a str,
    /// The request's raw query string, appended to manifest URIs.
    pub raw_query: &'a str,
    /// True for `/stream/{id}` without a trailing slash. Relative references
    /// in the served master then resolve against `/stream/`, so same-directory
    /// variant names get an `{id}/` prefix.
    pub bare_master: bool,
}

/// Gateway outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamResponse {
    /// Rewritten manifest body.
    Manifest(Bytes),
    /// Signed storage URL for a media object.
    Redirect(String),
}

/// Resolves stream requests against the catalog and object storage.
pub struct StreamingGateway {
    resolver: ObjectKeyResolver,
    catalog: Arc<dyn SongCatalog>,
    storage: Arc<dyn ObjectStorage>,
    signed_url_ttl: Duration,
}

impl StreamingGateway {
    pub fn new(
        resolver: ObjectKeyResolver,
        catalog: Arc<dyn SongCatalog>,
        storage: Arc<dyn ObjectStorage>,
        signed_url_ttl: Duration,
    ) -> Self {
        Self {
            resolver,
            catalog,
            storage,
            signed_url_ttl,
        }
    }

    pub fn resolver(&self) -> &ObjectKeyResolver {
        &self.resolver
    }

    /// Object key a request maps to.
    pub fn resolve_key(&self, stream_id: &str, selector: &str) -> Result<String> {
        validate_stream_id(stream_id)?;

        let song = self
            .catalog
            .get_song(stream_id)?
            .ok_or_else(|| Error::not_found("stream", stream_id))?;

        let master = self.resolver.master_key(&song.bucket_folder).map_err(|e| {
            tracing::warn!(stream_id, "Catalog folder for stream is unusable");
            e
        })?;
        self.resolver.resolve(&master, selector)
    }

    /// Serve one stream request.
    pub async fn serve(&self, request: StreamRequest<'_>) -> Result<StreamResponse> {
        let key = self.resolve_key(request.stream_id, request.selector)?;

        if is_manifest_key(&key) {
            let manifest = self
                .storage
                .download(&key)
                .await
                .map_err(|e| storage_error(e, request.stream_id))?;

            let mut rewriter = ManifestRewriter::new(request.raw_query);
            if request.bare_master {
                let prefix = format!("{}/", encode_path_segment(request.stream_id));
                rewriter = rewriter.with_prefix(prefix);
            }

            tracing::debug!(
                stream_id = request.stream_id,
                bytes = manifest.len(),
                "Serving manifest"
            );
            return Ok(StreamResponse::Manifest(rewriter.rewrite(&manifest)));
        }

        let url = self
            .storage
            .signed_url(&key, self.signed_url_ttl)
            .await
            .map_err(|e| storage_error(e, request.stream_id))?;

        tracing::debug!(stream_id = request.stream_id, "Redirecting to signed URL");
        Ok(StreamResponse::Redirect(url))
    }
}

/// Map storage failures without exposing object keys to the client.
fn storage_error(err: StorageError, stream_id: &str) -> Error {
    match err {
        StorageError::NotFound(_) => Error::not_found("stream file", stream_id),
        StorageError::Upstream(detail) => {
            tracing::warn!(stream_id, error = %detail, "Object storage request failed");
            Error::Upstream("object storage unavailable".into())
        }
    }
}
