//! sg-storage: object-storage backends for the streaming gateway.
//!
//! The gateway needs exactly two things from storage: the bytes of a manifest
//! and a short-lived signed URL for everything else. [`ObjectStorage`] is that
//! seam; [`SupabaseStorage`] talks to a Supabase Storage bucket and
//! [`MemoryStorage`] serves tests and local demos.

pub mod memory;
pub mod supabase;

use std::time::Duration;

use bytes::Bytes;

pub use memory::MemoryStorage;
pub use supabase::SupabaseStorage;

/// Failure modes the gateway distinguishes.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The object does not exist.
    #[error("object not found: {0}")]
    NotFound(String),

    /// Transport failure, unexpected status, or unusable response.
    #[error("storage request failed: {0}")]
    Upstream(String),
}

/// A bucket the gateway can read manifests from and sign URLs for.
#[async_trait::async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Fetch the full contents of `key`.
    async fn download(&self, key: &str) -> Result<Bytes, StorageError>;

    /// Issue a URL granting direct read access to `key` for `ttl`.
    async fn signed_url(&self, key: &str, ttl: Duration) -> Result<String, StorageError>;
}
