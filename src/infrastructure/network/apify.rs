use crate::domain::error::ScrapeError;
use crate::domain::model::ScrapeTarget;
use crate::domain::normalize::{place_reviews_from_items, profile_from_items};
use crate::domain::platform::Platform;
use crate::domain::traits::ReviewSource;
use crate::infrastructure::config::ApifyConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

/// Upstream scraper backed by Apify actors.
///
/// Every platform maps to an actor; the actor is run synchronously and its
/// dataset items are normalized before they leave this type.
pub struct ApifyScraper {
    client: Client,
    config: ApifyConfig,
}

impl ApifyScraper {
    pub fn new(client: Client, config: ApifyConfig) -> Self {
        Self { client, config }
    }

    fn api_key(&self) -> Result<&str, ScrapeError> {
        self.config
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| ScrapeError::Config("Apify API key is not configured.".to_string()))
    }

    async fn run_input(&self, target: &ScrapeTarget) -> Result<Value, ScrapeError> {
        if target.platform == Platform::GoogleReviews {
            return Ok(json!({
                "placeIds": [target.resource],
                "language": self.config.google_language,
                "maxReviews": self.config.google_max_reviews,
                "personalData": true,
                "reviewsSort": "newest",
                "reviewsOrigin": "all",
            }));
        }

        let mut input = json!({
            "startUrls": [{ "url": target.resource }],
            "maxResultsPerCrawl": self.config.max_results_per_crawl,
        });
        if let Some(path) = self.config.page_function_path(target.platform) {
            let page_function = tokio::fs::read_to_string(path).await.map_err(|e| {
                ScrapeError::Config(format!("Cannot read page function '{}': {}", path, e))
            })?;
            input["pageFunction"] = Value::String(page_function);
        }
        Ok(input)
    }

    /// Run an actor and return its dataset items.
    async fn run_actor(&self, actor_id: &str, input: &Value) -> Result<Vec<Value>, ScrapeError> {
        let api_key = self.api_key()?;
        // "user/actor" ids are addressed as "user~actor" in the REST api
        let url = format!(
            "{}/acts/{}/run-sync-get-dataset-items",
            self.config.base_url.trim_end_matches('/'),
            actor_id.replace('/', "~")
        );

        let response = self
            .client
            .post(&url)
            .query(&[("token", api_key)])
            .json(input)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let snippet: String = body.chars().take(300).collect();
            return Err(ScrapeError::Upstream(format!(
                "Apify actor {} returned {}: {}",
                actor_id, status, snippet
            )));
        }

        match response.json::<Value>().await? {
            Value::Array(items) => Ok(items),
            other => Err(ScrapeError::Upstream(format!(
                "Apify actor {} returned a non-list dataset: {}",
                actor_id,
                other.to_string().chars().take(100).collect::<String>()
            ))),
        }
    }
}

#[async_trait]
impl ReviewSource for ApifyScraper {
    async fn fetch(&self, target: &ScrapeTarget) -> Result<Value, ScrapeError> {
        let actor_id = self.config.actor_id(target.platform)?;
        let input = self.run_input(target).await?;

        tracing::info!(
            platform = %target.platform,
            resource = %target.resource,
            actor = %actor_id,
            "starting actor run"
        );
        let items = self.run_actor(&actor_id, &input).await?;
        tracing::info!(platform = %target.platform, items = items.len(), "actor run finished");

        let normalized = if target.platform == Platform::GoogleReviews {
            serde_json::to_value(place_reviews_from_items(&items))?
        } else {
            serde_json::to_value(profile_from_items(&target.resource, &items))?
        };
        Ok(normalized)
    }
}
