use crate::application::cached_fetch::CachedFetcher;
use crate::domain::error::ScrapeError;
use crate::domain::model::{
    CacheStats, FetchOrigin, PaginationMeta, PlaceDetailsResponse, PlaceReview, RequestKey,
    ScrapeRequest, ScrapeResponse, ScrapeTarget, ScrapedProfile,
};
use crate::domain::platform::Platform;
use crate::domain::traits::{PlaceDirectory, ReviewSource};
use std::sync::Arc;
use url::Url;

pub const MESSAGE_FROM_CACHE: &str = "Data retrieved from cache.";
pub const MESSAGE_SCRAPED: &str = "Data scraped successfully.";
pub const MESSAGE_EMPTY: &str = "No data found, but request was cached.";

/// Entry point of the route handlers.
#[derive(Clone)]
pub struct ScrapeService {
    fetcher: CachedFetcher,
    source: Arc<dyn ReviewSource>,
    places: Arc<dyn PlaceDirectory>,
}

impl ScrapeService {
    pub fn new(
        fetcher: CachedFetcher,
        source: Arc<dyn ReviewSource>,
        places: Arc<dyn PlaceDirectory>,
    ) -> Self {
        Self {
            fetcher,
            source,
            places,
        }
    }

    pub fn request_key(platform: Platform, url: &Url, page: u32) -> RequestKey {
        RequestKey::derive(
            &platform.operation(),
            url.as_str(),
            platform.keys_by_page().then_some(page),
        )
    }

    pub async fn scrape_profile(
        &self,
        platform: Platform,
        request: &ScrapeRequest,
    ) -> Result<ScrapeResponse, ScrapeError> {
        if platform == Platform::GoogleReviews {
            return Err(ScrapeError::InvalidRequest(
                "Google reviews are served by the place details route".to_string(),
            ));
        }
        if request.page == 0 {
            return Err(ScrapeError::InvalidRequest(
                "page must be at least 1".to_string(),
            ));
        }

        let url = platform.normalize_url(&request.url, request.page)?;
        let key = Self::request_key(platform, &url, request.page);
        let target = ScrapeTarget {
            platform,
            resource: url.to_string(),
            page: request.page,
        };

        let source = Arc::clone(&self.source);
        let fetched = self
            .fetcher
            .fetch(&key, move || async move { source.fetch(&target).await })
            .await?;

        let profile: ScrapedProfile = serde_json::from_value(fetched.payload)?;
        tracing::debug!(
            platform = %platform,
            key = %key,
            origin = ?fetched.origin,
            reviews = profile.reviews.len(),
            "profile ready"
        );

        let current_page = if platform.reports_page() {
            request.page
        } else {
            1
        };
        Ok(shape_response(profile, current_page, fetched.origin))
    }

    /// All Google reviews of a place, through the same cached fetch.
    pub async fn google_reviews(&self, place_id: &str) -> Result<Vec<PlaceReview>, ScrapeError> {
        let platform = Platform::GoogleReviews;
        let key = RequestKey::derive(&platform.operation(), place_id, None);
        let target = ScrapeTarget {
            platform,
            resource: place_id.to_string(),
            page: 1,
        };

        let source = Arc::clone(&self.source);
        let fetched = self
            .fetcher
            .fetch(&key, move || async move { source.fetch(&target).await })
            .await?;

        Ok(serde_json::from_value(fetched.payload)?)
    }

    pub async fn place_details(&self, place_id: &str) -> Result<PlaceDetailsResponse, ScrapeError> {
        let place_id = place_id.trim();
        if place_id.is_empty() {
            return Err(ScrapeError::InvalidRequest(
                "place_id must not be empty".to_string(),
            ));
        }

        let details = self.places.details(place_id).await?;
        let reviews = self.google_reviews(place_id).await?;
        tracing::info!(place_id, reviews = reviews.len(), "place details ready");

        Ok(PlaceDetailsResponse::new(details, reviews))
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            in_flight: self.fetcher.in_flight(),
            backend: self.fetcher.cache().backend_name().to_string(),
            freshness_hours: self.fetcher.freshness().num_hours(),
        }
    }
}

/// Wrap a profile into the response of the profile routes.
///
/// Profiles are scraped in full, so there is never a next page.
pub fn shape_response(profile: ScrapedProfile, page: u32, origin: FetchOrigin) -> ScrapeResponse {
    let message = match origin {
        FetchOrigin::Cache => MESSAGE_FROM_CACHE,
        FetchOrigin::Upstream if profile.reviews.is_empty() => MESSAGE_EMPTY,
        FetchOrigin::Upstream => MESSAGE_SCRAPED,
    };
    let pagination = PaginationMeta {
        current_page: page,
        has_next_page: false,
        total_pages: Some(1),
        total_reviews: profile
            .total_reviews
            .or(Some(profile.reviews.len() as u64)),
    };

    ScrapeResponse {
        data: vec![profile],
        message: message.to_string(),
        pagination,
    }
}
