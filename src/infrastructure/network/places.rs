use crate::domain::error::ScrapeError;
use crate::domain::model::PlaceDetails;
use crate::domain::traits::PlaceDirectory;
use crate::infrastructure::config::GooglePlacesConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

// Reviews are deliberately not requested: the API caps them at five, the
// scraper returns all of them.
const DETAIL_FIELDS: &str = "place_id,name,rating,user_ratings_total,formatted_address,\
formatted_phone_number,website,business_status,price_level,types";

#[derive(Deserialize, Debug)]
struct DetailsResponse {
    status: String,
    error_message: Option<String>,
    result: Option<PlaceDetails>,
}

/// Google Places details client.
pub struct GooglePlacesClient {
    client: Client,
    config: GooglePlacesConfig,
}

impl GooglePlacesClient {
    pub fn new(client: Client, config: GooglePlacesConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl PlaceDirectory for GooglePlacesClient {
    async fn details(&self, place_id: &str) -> Result<PlaceDetails, ScrapeError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                ScrapeError::Config("Google Places API key not configured".to_string())
            })?;

        let url = format!("{}/details/json", self.config.base_url.trim_end_matches('/'));
        let response = self
            .client
            .get(&url)
            .query(&[
                ("place_id", place_id),
                ("fields", DETAIL_FIELDS),
                ("key", api_key),
            ])
            .timeout(Duration::from_secs(10))
            .send()
            .await?
            .error_for_status()?
            .json::<DetailsResponse>()
            .await?;

        if response.status != "OK" {
            return Err(ScrapeError::Places(
                response
                    .error_message
                    .unwrap_or_else(|| format!("Unknown error ({})", response.status)),
            ));
        }

        let mut details = response.result.unwrap_or_default();
        if details.place_id.is_empty() {
            details.place_id = place_id.to_string();
        }
        Ok(details)
    }
}
