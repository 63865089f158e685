//! Supabase Storage client.
//!
//! Uses the REST endpoints:
//!
//! - `GET  {url}/storage/v1/object/{bucket}/{key}` to download
//! - `POST {url}/storage/v1/object/sign/{bucket}/{key}` with
//!   `{"expiresIn": secs}` to sign
//!
//! Both authenticate with the service key as a bearer token and as `apikey`.

use std::time::Duration;

use bytes::{Bytes, BytesMut};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use sg_core::config::StorageConfig;
use sg_hls::encode_path_segment;

use crate::{ObjectStorage, StorageError};

/// Default cap on downloaded object size.
pub const DEFAULT_MAX_OBJECT_BYTES: usize = 1024 * 1024;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignRequest {
    expires_in: u64,
}

#[derive(Deserialize)]
struct SignResponse {
    #[serde(rename = "signedURL", alias = "signedUrl")]
    signed_url: String,
}

/// [`ObjectStorage`] backed by one Supabase Storage bucket.
pub struct SupabaseStorage {
    client: Client,
    base_url: String,
    bucket: String,
    service_key: Option<String>,
    max_object_bytes: usize,
}

impl std::fmt::Debug for SupabaseStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseStorage")
            .field("base_url", &self.base_url)
            .field("bucket", &self.bucket)
            .field("max_object_bytes", &self.max_object_bytes)
            .finish_non_exhaustive()
    }
}

impl SupabaseStorage {
    pub fn new(
        base_url: &str,
        bucket: impl Into<String>,
        service_key: Option<String>,
        timeout: Duration,
    ) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to build HTTP client with timeout: {e}");
                Client::new()
            });

        Self {
            client,
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            bucket: bucket.into(),
            service_key: service_key.filter(|k| !k.trim().is_empty()),
            max_object_bytes: DEFAULT_MAX_OBJECT_BYTES,
        }
    }

    /// Build from the `[storage]` config section.
    pub fn from_config(config: &StorageConfig) -> sg_core::Result<Self> {
        if config.url.trim().is_empty() {
            return Err(sg_core::Error::Config("storage.url is required".into()));
        }
        let storage = Self::new(
            &config.url,
            config.bucket.clone(),
            config.service_key.as_ref().map(|k| k.expose().trim().to_string()),
            Duration::from_secs(config.request_timeout_secs),
        )
        .with_max_object_bytes(config.max_manifest_bytes);
        Ok(storage)
    }

    /// Refuse downloads larger than `max` bytes.
    pub fn with_max_object_bytes(mut self, max: usize) -> Self {
        self.max_object_bytes = max;
        self
    }

    fn object_url(&self, key: &str) -> String {
        format!(
            "{}/storage/v1/object/{}/{}",
            self.base_url,
            encode_key(&self.bucket),
            encode_key(key)
        )
    }

    fn sign_url(&self, key: &str) -> String {
        format!(
            "{}/storage/v1/object/sign/{}/{}",
            self.base_url,
            encode_key(&self.bucket),
            encode_key(key)
        )
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.service_key {
            Some(key) => request.bearer_auth(key).header("apikey", key),
            None => request,
        }
    }

    /// Turn a signed path from the API into an absolute URL.
    fn absolute_signed_url(&self, signed: &str) -> String {
        let lower = signed.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            return signed.to_string();
        }
        let path = signed.trim_start_matches('/');
        let path = path.strip_prefix("storage/v1/").unwrap_or(path);
        format!("{}/storage/v1/{}", self.base_url, path)
    }

    async fn read_limited(&self, mut response: Response) -> Result<Bytes, StorageError> {
        if let Some(len) = response.content_length() {
            if len > self.max_object_bytes as u64 {
                return Err(StorageError::Upstream(format!(
                    "object is {len} bytes, limit is {}",
                    self.max_object_bytes
                )));
            }
        }

        let mut body = BytesMut::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| StorageError::Upstream(format!("reading body: {e}")))?
        {
            if body.len() + chunk.len() > self.max_object_bytes {
                return Err(StorageError::Upstream(format!(
                    "object exceeds {} bytes",
                    self.max_object_bytes
                )));
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body.freeze())
    }
}

#[async_trait::async_trait]
impl ObjectStorage for SupabaseStorage {
    async fn download(&self, key: &str) -> Result<Bytes, StorageError> {
        let response = self
            .authorize(self.client.get(self.object_url(key)))
            .send()
            .await
            .map_err(|e| StorageError::Upstream(format!("download failed: {e}")))?;

        let response = check_status(response, key).await?;
        let bytes = self.read_limited(response).await?;
        tracing::debug!(bytes = bytes.len(), "Downloaded object");
        Ok(bytes)
    }

    async fn signed_url(&self, key: &str, ttl: Duration) -> Result<String, StorageError> {
        let response = self
            .authorize(self.client.post(self.sign_url(key)))
            .json(&SignRequest {
                expires_in: ttl.as_secs().max(1),
            })
            .send()
            .await
            .map_err(|e| StorageError::Upstream(format!("sign request failed: {e}")))?;

        let response = check_status(response, key).await?;
        let signed: SignResponse = response
            .json()
            .await
            .map_err(|e| StorageError::Upstream(format!("invalid sign response: {e}")))?;

        if signed.signed_url.trim().is_empty() {
            return Err(StorageError::Upstream("empty signed URL".into()));
        }
        Ok(self.absolute_signed_url(signed.signed_url.trim()))
    }
}

/// Classify error statuses. Supabase reports missing objects either as 404
/// or as a 400 whose body mentions "not found".
async fn check_status(response: Response, key: &str) -> Result<Response, StorageError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status == StatusCode::NOT_FOUND {
        return Err(StorageError::NotFound(key.to_string()));
    }

    let body = response.text().await.unwrap_or_default();
    if status == StatusCode::BAD_REQUEST && body.to_ascii_lowercase().contains("not found") {
        return Err(StorageError::NotFound(key.to_string()));
    }

    let snippet: String = body.chars().take(200).collect();
    Err(StorageError::Upstream(format!("status {status}: {snippet}")))
}

/// Percent-encode each `/`-separated segment of an object key.
pub fn encode_key(key: &str) -> String {
    key.split('/')
        .map(encode_path_segment)
        .collect::<Vec<_>>()
        .join("/")
}
