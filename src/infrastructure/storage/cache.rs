// In-memory cache backend using DashMap
use crate::domain::error::ScrapeError;
use crate::domain::model::{CacheEntry, RequestKey};
use crate::domain::traits::CacheBackend;
use async_trait::async_trait;
use dashmap::DashMap;

/// Process-local cache backend. Contents are lost on restart.
pub struct MemoryCacheStore {
    map: DashMap<RequestKey, CacheEntry>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self {
            map: DashMap::new(),
        }
    }

    pub fn clear(&self) {
        self.map.clear();
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl Default for MemoryCacheStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheBackend for MemoryCacheStore {
    async fn get(&self, key: &RequestKey) -> Result<Option<CacheEntry>, ScrapeError> {
        Ok(self.map.get(key).map(|entry| entry.value().clone()))
    }

    async fn put(&self, key: &RequestKey, entry: &CacheEntry) -> Result<(), ScrapeError> {
        self.map.insert(key.clone(), entry.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
