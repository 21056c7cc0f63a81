// HTTP client utilities
use crate::domain::error::ScrapeError;
use reqwest::Client;
use std::time::Duration;

/// Create the shared HTTP client.
///
/// `timeout_secs` has to cover a whole synchronous actor run, which can take
/// minutes for large profiles.
pub fn create_client(timeout_secs: u64) -> Result<Client, ScrapeError> {
    Ok(Client::builder()
        .pool_max_idle_per_host(10)
        .pool_idle_timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent(concat!("scrapeflow/", env!("CARGO_PKG_VERSION")))
        .build()?)
}
