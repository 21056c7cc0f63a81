use crate::domain::error::ScrapeError;
use crate::domain::model::{CacheEntry, PlaceDetails, RequestKey, ScrapeTarget};
use async_trait::async_trait;
use serde_json::Value;

/// Key/value storage for fetched payloads.
///
/// Implementations only store and return entries; freshness is decided by
/// the reader. Errors are reported, but callers treat a failing backend as
/// a cache miss.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Get the stored entry for a key, if any
    async fn get(&self, key: &RequestKey) -> Result<Option<CacheEntry>, ScrapeError>;

    /// Store an entry, replacing whatever was stored for the key
    async fn put(&self, key: &RequestKey, entry: &CacheEntry) -> Result<(), ScrapeError>;

    /// Short name shown in status output
    fn name(&self) -> &'static str;
}

/// Platform-specific upstream fetch-and-transform.
///
/// Returns the normalized result as JSON: a `ScrapedProfile` for profile
/// platforms, a list of `PlaceReview` for Google reviews.
#[async_trait]
pub trait ReviewSource: Send + Sync {
    async fn fetch(&self, target: &ScrapeTarget) -> Result<Value, ScrapeError>;
}

/// Business details lookup for a Google place.
#[async_trait]
pub trait PlaceDirectory: Send + Sync {
    async fn details(&self, place_id: &str) -> Result<PlaceDetails, ScrapeError>;
}
