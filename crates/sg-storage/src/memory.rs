//! In-process object store for tests and local demos.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use bytes::Bytes;
use parking_lot::RwLock;

use crate::{ObjectStorage, StorageError};

/// [`ObjectStorage`] holding objects in a map.
///
/// Signed URLs point at `{base_url}/{key}` with the ttl in the query; they
/// are not verifiable and only exist so redirects can be asserted on.
#[derive(Debug)]
pub struct MemoryStorage {
    base_url: String,
    objects: RwLock<HashMap<String, Bytes>>,
    unavailable: AtomicBool,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new("https://storage.invalid/signed")
    }
}

impl MemoryStorage {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            objects: RwLock::new(HashMap::new()),
            unavailable: AtomicBool::new(false),
        }
    }

    pub fn put(&self, key: impl Into<String>, data: impl Into<Bytes>) {
        self.objects.write().insert(key.into(), data.into());
    }

    pub fn remove(&self, key: &str) -> Option<Bytes> {
        self.objects.write().remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects.read().contains_key(key)
    }

    /// Make every subsequent call fail with [`StorageError::Upstream`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::Relaxed);
    }

    fn check_available(&self) -> Result<(), StorageError> {
        if self.unavailable.load(Ordering::Relaxed) {
            return Err(StorageError::Upstream("storage marked unavailable".into()));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl ObjectStorage for MemoryStorage {
    async fn download(&self, key: &str) -> Result<Bytes, StorageError> {
        self.check_available()?;
        self.objects
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn signed_url(&self, key: &str, ttl: Duration) -> Result<String, StorageError> {
        self.check_available()?;
        if !self.contains(key) {
            return Err(StorageError::NotFound(key.to_string()));
        }
        Ok(format!("{}/{}?expires_in={}", self.base_url, key, ttl.as_secs()))
    }
}
