use crate::application::cache::ResultCache;
use crate::application::cached_fetch::CachedFetcher;
use crate::application::scrape::ScrapeService;
use crate::domain::error::ScrapeError;
use crate::domain::traits::CacheBackend;
use crate::infrastructure::config::{get_database_path, CacheBackendKind, Config};
use crate::infrastructure::network::apify::ApifyScraper;
use crate::infrastructure::network::http::create_client;
use crate::infrastructure::network::places::GooglePlacesClient;
use crate::infrastructure::storage::cache::MemoryCacheStore;
use crate::infrastructure::storage::db::SqliteCacheStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub service: ScrapeService,
}

impl AppState {
    pub fn new(config: Config, service: ScrapeService) -> Self {
        Self {
            config: Arc::new(config),
            service,
        }
    }

    /// Wire the production collaborators described by `config`.
    pub async fn from_config(config: Config) -> Result<Self, ScrapeError> {
        let freshness = config.cache.freshness()?;
        let backend = open_cache_backend(&config).await?;
        let fetcher = CachedFetcher::new(ResultCache::new(backend), freshness);

        let http_client = create_client(config.apify.timeout_secs)?;
        let scraper = ApifyScraper::new(http_client.clone(), config.apify.clone());
        let places = GooglePlacesClient::new(http_client, config.google_places.clone());

        let service = ScrapeService::new(fetcher, Arc::new(scraper), Arc::new(places));
        Ok(Self::new(config, service))
    }
}

pub async fn open_cache_backend(config: &Config) -> Result<Arc<dyn CacheBackend>, ScrapeError> {
    match config.cache.backend {
        CacheBackendKind::Memory => Ok(Arc::new(MemoryCacheStore::new())),
        CacheBackendKind::Sqlite => {
            let db_path = get_database_path(config);
            if let Some(parent) = db_path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tracing::info!(path = %db_path.display(), "opening sqlite cache");
            Ok(Arc::new(SqliteCacheStore::open(&db_path).await?))
        }
    }
}
