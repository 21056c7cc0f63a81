use crate::domain::error::ScrapeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Review platforms this service knows how to scrape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Anwalt,
    Booking,
    #[serde(rename = "immobilienscout24")]
    ImmobilienScout24,
    Jameda,
    #[serde(rename = "myhammer")]
    MyHammer,
    #[serde(rename = "provenexpert")]
    ProvenExpert,
    Trustpilot,
    #[serde(rename = "google_reviews")]
    GoogleReviews,
}

impl Platform {
    /// Platforms reachable through a `POST /profile_<slug>` route.
    pub const PROFILE_PLATFORMS: [Platform; 7] = [
        Platform::Anwalt,
        Platform::Booking,
        Platform::ImmobilienScout24,
        Platform::Jameda,
        Platform::MyHammer,
        Platform::ProvenExpert,
        Platform::Trustpilot,
    ];

    pub fn slug(self) -> &'static str {
        match self {
            Platform::Anwalt => "anwalt",
            Platform::Booking => "booking",
            Platform::ImmobilienScout24 => "immobilienscout24",
            Platform::Jameda => "jameda",
            Platform::MyHammer => "myhammer",
            Platform::ProvenExpert => "provenexpert",
            Platform::Trustpilot => "trustpilot",
            Platform::GoogleReviews => "google_reviews",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        Platform::PROFILE_PLATFORMS
            .iter()
            .chain(std::iter::once(&Platform::GoogleReviews))
            .copied()
            .find(|p| p.slug() == slug)
    }

    /// Operation name mixed into the request key.
    pub fn operation(self) -> String {
        match self {
            Platform::GoogleReviews => self.slug().to_string(),
            _ => format!("{}_scrape_all", self.slug()),
        }
    }

    /// Apify actor used when the configuration does not name one.
    pub fn default_actor_id(self) -> Option<&'static str> {
        match self {
            Platform::Anwalt => Some("K0KedxhxRkmldOHtd"),
            Platform::Booking => Some("s780flaJuoRMl9Gla"),
            Platform::ImmobilienScout24 => None,
            Platform::Jameda => Some("TdnVDjKfX5TypLXIm"),
            Platform::MyHammer => Some("pBEnk9UMhriLoEj7d"),
            Platform::ProvenExpert => Some("K0KedxhxRkmldOHtd"),
            Platform::Trustpilot => Some("Zq2h7ls7hDsqe2VgF"),
            Platform::GoogleReviews => Some("Xb8osYTtOjlsgI6k9"),
        }
    }

    /// Whether the page number is part of the request key on top of the
    /// normalized url.
    pub fn keys_by_page(self) -> bool {
        matches!(
            self,
            Platform::Anwalt | Platform::Booking | Platform::ImmobilienScout24 | Platform::Jameda
        )
    }

    /// Whether responses report the requested page. The other platforms
    /// scrape the whole profile in one go and always report page 1.
    pub fn reports_page(self) -> bool {
        matches!(self, Platform::Booking | Platform::Jameda | Platform::Trustpilot)
    }

    /// Bring a profile url into the canonical shape the platform's scraper
    /// expects. The result is what gets scraped and what keys the cache.
    pub fn normalize_url(self, raw: &str, page: u32) -> Result<Url, ScrapeError> {
        let mut url = Url::parse(raw.trim())?;
        if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
            return Err(ScrapeError::InvalidRequest(format!(
                "expected an absolute http(s) url, got '{}'",
                raw
            )));
        }

        match self {
            Platform::MyHammer => {
                let mut path = url.path().trim_end_matches('/').to_string();
                if !path.ends_with("/bewertungen") {
                    path.push_str("/bewertungen");
                }
                url.set_path(&path);
                set_page_param(&mut url, page);
            }
            Platform::Trustpilot => set_page_param(&mut url, page),
            Platform::Booking => url.set_fragment(Some("tab-reviews")),
            _ => {}
        }

        Ok(url)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

// Replaces any existing `page` parameter, keeping the others in order.
fn set_page_param(url: &mut Url, page: u32) {
    let others: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != "page")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let mut pairs = url.query_pairs_mut();
    pairs.clear();
    for (k, v) in &others {
        pairs.append_pair(k, v);
    }
    pairs.append_pair("page", &page.to_string());
}
