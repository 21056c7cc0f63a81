use crate::domain::model::{CacheEntry, RequestKey};
use crate::domain::traits::CacheBackend;
use serde_json::Value;
use std::sync::Arc;

/// Advisory result cache in front of a [`CacheBackend`].
///
/// Backend failures never reach the caller: a failed read is a miss and a
/// failed write is logged and dropped, since the payload it was meant to
/// store has already been fetched.
#[derive(Clone)]
pub struct ResultCache {
    backend: Arc<dyn CacheBackend>,
}

impl ResultCache {
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self { backend }
    }

    pub async fn get(&self, key: &RequestKey) -> Option<CacheEntry> {
        match self.backend.get(key).await {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "cache read failed, treating as miss");
                None
            }
        }
    }

    /// Stamp `payload` with the current time and store it.
    pub async fn put(&self, key: &RequestKey, payload: Value) -> CacheEntry {
        let entry = CacheEntry::new(payload);
        if let Err(e) = self.backend.put(key, &entry).await {
            tracing::warn!(key = %key, error = %e, "cache write failed");
        }
        entry
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }
}
