use crate::domain::error::ScrapeError;
use crate::domain::platform::Platform;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const APIFY_API_KEY_ENV: &str = "APIFY_API_KEY";
pub const GOOGLE_PLACES_API_KEY_ENV: &str = "GOOGLE_PLACES_API_KEY";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub apify: ApifyConfig,
    #[serde(default)]
    pub google_places: GooglePlacesConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackendKind {
    Sqlite,
    Memory,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CacheConfig {
    #[serde(default = "default_cache_backend")]
    pub backend: CacheBackendKind,
    /// SQLite file, defaults to the config directory
    pub path: Option<String>,
    /// Maximum age of a cached scrape before it is fetched again
    #[serde(default = "default_freshness_hours")]
    pub freshness_hours: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Logging {
    #[serde(default = "default_enable")]
    pub enable: bool,
    pub path: Option<String>,
    #[serde(default = "default_log_level")]
    pub level: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ApifyConfig {
    pub api_key: Option<String>,
    #[serde(default = "default_apify_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_results_per_crawl")]
    pub max_results_per_crawl: u32,
    #[serde(default = "default_google_language")]
    pub google_language: String,
    #[serde(default = "default_google_max_reviews")]
    pub google_max_reviews: u32,
    /// Per-platform overrides, keyed by platform slug
    #[serde(default)]
    pub actors: BTreeMap<String, ActorConfig>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ActorConfig {
    pub actor_id: Option<String>,
    /// File holding the page function handed to the web scraper actor
    pub page_function: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GooglePlacesConfig {
    pub api_key: Option<String>,
    #[serde(default = "default_places_base_url")]
    pub base_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            cache: CacheConfig::default(),
            logging: Logging::default(),
            apify: ApifyConfig::default(),
            google_places: GooglePlacesConfig::default(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: default_cache_backend(),
            path: None,
            freshness_hours: default_freshness_hours(),
        }
    }
}

impl Default for Logging {
    fn default() -> Self {
        Self {
            enable: true,
            path: None,
            level: "INFO".to_string(),
        }
    }
}

impl Default for ApifyConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_apify_base_url(),
            timeout_secs: default_timeout_secs(),
            max_results_per_crawl: default_max_results_per_crawl(),
            google_language: default_google_language(),
            google_max_reviews: default_google_max_reviews(),
            actors: BTreeMap::new(),
        }
    }
}

impl Default for GooglePlacesConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_places_base_url(),
        }
    }
}

impl CacheConfig {
    pub fn freshness(&self) -> Result<chrono::Duration, ScrapeError> {
        if self.freshness_hours <= 0 {
            return Err(ScrapeError::Config(format!(
                "cache.freshness_hours must be positive, got {}",
                self.freshness_hours
            )));
        }
        chrono::Duration::try_hours(self.freshness_hours).ok_or_else(|| {
            ScrapeError::Config(format!(
                "cache.freshness_hours is out of range: {}",
                self.freshness_hours
            ))
        })
    }
}

impl ApifyConfig {
    /// Actor to run for a platform: configured id first, built-in default next.
    pub fn actor_id(&self, platform: Platform) -> Result<String, ScrapeError> {
        self.actors
            .get(platform.slug())
            .and_then(|a| a.actor_id.clone())
            .or_else(|| platform.default_actor_id().map(str::to_string))
            .ok_or_else(|| {
                ScrapeError::Config(format!("No Apify actor configured for {}", platform))
            })
    }

    pub fn page_function_path(&self, platform: Platform) -> Option<&str> {
        self.actors
            .get(platform.slug())
            .and_then(|a| a.page_function.as_deref())
    }
}

impl Config {
    /// Secrets from the environment win over values in the file.
    pub fn apply_env(&mut self) {
        self.apply_env_with(|name| std::env::var(name).ok());
    }

    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(APIFY_API_KEY_ENV).filter(|k| !k.is_empty()) {
            self.apify.api_key = Some(key);
        }
        if let Some(key) = lookup(GOOGLE_PLACES_API_KEY_ENV).filter(|k| !k.is_empty()) {
            self.google_places.api_key = Some(key);
        }
    }
}

// Defaults
fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}
fn default_cache_backend() -> CacheBackendKind {
    CacheBackendKind::Sqlite
}
fn default_freshness_hours() -> i64 {
    24
}
fn default_enable() -> bool {
    true
}
fn default_log_level() -> String {
    "INFO".to_string()
}
fn default_apify_base_url() -> String {
    "https://api.apify.com/v2".to_string()
}
fn default_timeout_secs() -> u64 {
    300
}
fn default_max_results_per_crawl() -> u32 {
    10
}
fn default_google_language() -> String {
    "de".to_string()
}
fn default_google_max_reviews() -> u32 {
    99999
}
fn default_places_base_url() -> String {
    "https://maps.googleapis.com/maps/api/place".to_string()
}

pub fn get_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("scrapeflow").join("config.toml"))
}

/// The config file in use: the explicit path when given, the default one otherwise.
pub fn resolve_config_path(path: Option<&Path>) -> Option<PathBuf> {
    path.map(Path::to_path_buf).or_else(get_config_path)
}

/// Get database path (configured, or inside the config directory)
pub fn get_database_path(config: &Config) -> PathBuf {
    if let Some(path) = config.cache.path.as_deref().filter(|p| !p.is_empty()) {
        return PathBuf::from(path);
    }
    // ~/.config/scrapeflow/cache.db (Linux)
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("scrapeflow")
        .join("cache.db")
}

pub fn parse_config(content: &str) -> Result<Config, ScrapeError> {
    Ok(toml::from_str::<Config>(content)?)
}

pub fn load_config(path: Option<&Path>) -> Result<Config, ScrapeError> {
    let config_path = resolve_config_path(path);

    let mut config = Config::default();
    if let Some(path) = config_path {
        if path.exists() {
            let content = fs::read_to_string(&path)?;
            match parse_config(&content) {
                Ok(parsed) => config = parsed,
                Err(e) => {
                    eprintln!(
                        "Warning: Failed to parse config file: {}. Using defaults.",
                        e
                    );
                }
            }
        }
    }

    config.apply_env();
    Ok(config)
}

pub fn generate_config_sample(path: Option<&Path>) -> Result<(), ScrapeError> {
    let config_path = resolve_config_path(path);

    if let Some(path) = config_path {
        if path.exists() {
            eprintln!("Config file already exists at: {}", path.display());
            return Ok(());
        }

        // Create directory if needed
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut sample = Config::default();
        for platform in Platform::PROFILE_PLATFORMS {
            sample.apify.actors.insert(
                platform.slug().to_string(),
                ActorConfig {
                    actor_id: platform.default_actor_id().map(str::to_string),
                    page_function: None,
                },
            );
        }
        let toml_content = toml::to_string_pretty(&sample)
            .map_err(|e| ScrapeError::Config(format!("Failed to serialize config: {}", e)))?;
        fs::write(&path, toml_content)
            .map_err(|e| ScrapeError::Config(format!("Failed to write config file: {}", e)))?;
        println!("Generated config file at: {}", path.display());
    } else {
        return Err(ScrapeError::Config(
            "Cannot determine config directory".to_string(),
        ));
    }

    Ok(())
}
