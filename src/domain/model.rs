use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fmt;

/// Identifies one logical unit of deduplicable and cacheable work.
///
/// The key is `<operation>_<sha256 hex>` where the digest covers the
/// operation name, the target resource and the optional page. Keeping the
/// operation as a readable prefix makes cache rows easy to tell apart.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestKey(String);

impl RequestKey {
    pub fn derive(operation: &str, resource: &str, page: Option<u32>) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(operation.as_bytes());
        hasher.update(b"\0");
        hasher.update(resource.as_bytes());
        if let Some(page) = page {
            hasher.update(b"\0");
            hasher.update(page.to_string().as_bytes());
        }
        RequestKey(format!("{}_{}", operation, hex::encode(hasher.finalize())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A stored upstream result together with the time it was fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub fetched_at: DateTime<Utc>,
    pub payload: Value,
}

impl CacheEntry {
    pub fn new(payload: Value) -> Self {
        Self {
            fetched_at: Utc::now(),
            payload,
        }
    }

    /// Entries stamped in the future (clock skew) count as fresh.
    pub fn is_fresh(&self, window: Duration, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.fetched_at) < window
    }
}

/// Where a payload handed back by the cached fetch came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchOrigin {
    Cache,
    Upstream,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Fetched {
    pub payload: Value,
    pub origin: FetchOrigin,
    pub fetched_at: DateTime<Utc>,
}

impl Fetched {
    pub fn from_cache(&self) -> bool {
        self.origin == FetchOrigin::Cache
    }
}

/// What an upstream scraper is asked to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeTarget {
    pub platform: crate::domain::platform::Platform,
    /// Normalized profile url, or the place id for Google reviews.
    pub resource: String,
    pub page: u32,
}

// Request / response shapes of the profile routes

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeRequest {
    pub url: String,
    #[serde(default = "default_page")]
    pub page: u32,
}

fn default_page() -> u32 {
    1
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Review {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

/// Normalized result of scraping one review profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScrapedProfile {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub average_score: Option<f64>,
    #[serde(default)]
    pub total_reviews: Option<u64>,
    #[serde(default)]
    pub reviews: Vec<Review>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaginationMeta {
    pub current_page: u32,
    pub has_next_page: bool,
    pub total_pages: Option<u32>,
    pub total_reviews: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeResponse {
    pub data: Vec<ScrapedProfile>,
    pub message: String,
    pub pagination: PaginationMeta,
}

// Google Places

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceReview {
    pub author_name: String,
    pub rating: u8,
    pub text: String,
    /// Unix timestamp, 0 when the scraper did not report a usable date.
    pub time: i64,
    pub profile_photo_url: Option<String>,
    pub relative_time_description: String,
}

/// Business details as reported by the Places API, reviews excluded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaceDetails {
    #[serde(default)]
    pub place_id: String,
    #[serde(default)]
    pub name: String,
    pub rating: Option<f64>,
    pub user_ratings_total: Option<u64>,
    pub formatted_address: Option<String>,
    pub formatted_phone_number: Option<String>,
    pub website: Option<String>,
    pub business_status: Option<String>,
    pub price_level: Option<u8>,
    #[serde(default)]
    pub types: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceDetailsResponse {
    pub place_id: String,
    pub name: String,
    pub rating: Option<f64>,
    pub user_ratings_total: Option<u64>,
    pub reviews: Vec<PlaceReview>,
    pub formatted_address: Option<String>,
    pub formatted_phone_number: Option<String>,
    pub website: Option<String>,
    pub business_status: Option<String>,
    pub price_level: Option<u8>,
    pub types: Vec<String>,
}

impl PlaceDetailsResponse {
    pub fn new(details: PlaceDetails, reviews: Vec<PlaceReview>) -> Self {
        Self {
            place_id: details.place_id,
            name: details.name,
            rating: details.rating,
            user_ratings_total: details.user_ratings_total,
            reviews,
            formatted_address: details.formatted_address,
            formatted_phone_number: details.formatted_phone_number,
            website: details.website,
            business_status: details.business_status,
            price_level: details.price_level,
            types: details.types,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStats {
    pub in_flight: usize,
    pub backend: String,
    pub freshness_hours: i64,
}
