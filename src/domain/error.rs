use std::sync::Arc;
use thiserror::Error;

/// Errors raised while serving a scrape.
///
/// The type is `Clone` because a single upstream failure is handed to every
/// caller that joined the same in-flight fetch. Foreign error types are kept
/// behind an `Arc` for that reason.
#[derive(Error, Debug, Clone)]
pub enum ScrapeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("An error occurred during scraping: {0}")]
    Upstream(String),

    #[error("Google Places API error: {0}")]
    Places(String),

    #[error("HTTP request error: {0}")]
    Http(Arc<reqwest::Error>),

    #[error("JSON serialization error: {0}")]
    Json(Arc<serde_json::Error>),

    #[error("Database error: {0}")]
    Database(Arc<tokio_rusqlite::Error>),

    #[error("SQLite error: {0}")]
    Sqlite(Arc<rusqlite::Error>),

    #[error("IO error: {0}")]
    Io(Arc<std::io::Error>),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Compression error: {0}")]
    Compression(String),

    #[error("Fetch interrupted: {0}")]
    Interrupted(String),
}

impl ScrapeError {
    /// Whether the error was caused by the caller rather than by this service
    /// or one of its upstreams.
    pub fn is_client_error(&self) -> bool {
        matches!(self, ScrapeError::InvalidRequest(_) | ScrapeError::Places(_))
    }
}

// Request urls carry api keys in their query, so they never make it into
// the message.
impl From<reqwest::Error> for ScrapeError {
    fn from(err: reqwest::Error) -> Self {
        ScrapeError::Http(Arc::new(err.without_url()))
    }
}

impl From<serde_json::Error> for ScrapeError {
    fn from(err: serde_json::Error) -> Self {
        ScrapeError::Json(Arc::new(err))
    }
}

impl From<tokio_rusqlite::Error> for ScrapeError {
    fn from(err: tokio_rusqlite::Error) -> Self {
        ScrapeError::Database(Arc::new(err))
    }
}

impl From<rusqlite::Error> for ScrapeError {
    fn from(err: rusqlite::Error) -> Self {
        ScrapeError::Sqlite(Arc::new(err))
    }
}

impl From<std::io::Error> for ScrapeError {
    fn from(err: std::io::Error) -> Self {
        ScrapeError::Io(Arc::new(err))
    }
}

impl From<url::ParseError> for ScrapeError {
    fn from(err: url::ParseError) -> Self {
        ScrapeError::InvalidRequest(format!("invalid url: {}", err))
    }
}
