// Main entry point
use clap::Parser;
use scrapeflow::domain::traits::CacheBackend;
use scrapeflow::infrastructure::config::{self, CacheBackendKind, Config, Logging};
use scrapeflow::infrastructure::storage::db::SqliteCacheStore;
use scrapeflow::interfaces::cli::Cli;
use scrapeflow::interfaces::http;
use scrapeflow::state::AppState;
use std::net::SocketAddr;
use std::path::Path;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.generate_config {
        config::generate_config_sample(cli.config.as_deref())?;
        return Ok(());
    }

    let mut config = config::load_config(cli.config.as_deref())?;
    if let Some(bind) = &cli.bind {
        config.bind = bind.clone();
    }
    if cli.memory_cache {
        config.cache.backend = CacheBackendKind::Memory;
    }

    // Initialize logging
    if config.logging.enable {
        init_logging(&config.logging)?;
    }

    if cli.status {
        print_status(&config, cli.config.as_deref()).await?;
        return Ok(());
    }

    let addr: SocketAddr = config.bind.parse()?;
    let state = AppState::from_config(config).await?;

    // Graceful shutdown on Ctrl-C; in-flight scrapes finish on their own tasks
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
        tracing::info!("Shutdown signal received, draining connections");
    };

    http::serve(state, addr, shutdown).await?;
    Ok(())
}

/// Initialize logging with path and level configuration
fn init_logging(logging: &Logging) -> anyhow::Result<()> {
    use tracing_subscriber::EnvFilter;

    let level = match logging.level.as_str() {
        "DEBUG" => "debug",
        "INFO" => "info",
        "WARN" => "warn",
        "ERROR" => "error",
        _ => "info",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if let Some(path) = &logging.path {
        if !path.is_empty() {
            // Log to file
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(file)
                .with_ansi(false)
                .init();
            return Ok(());
        }
    }

    // Log to stderr (default)
    tracing_subscriber::fmt().with_env_filter(filter).init();

    Ok(())
}

async fn print_status(config: &Config, config_path: Option<&Path>) -> anyhow::Result<()> {
    println!("scrapeflow status");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    println!(
        "Config: {}",
        config::resolve_config_path(config_path)
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "Not found".to_string())
    );
    println!("Bind: {}", config.bind);

    match config.cache.backend {
        CacheBackendKind::Memory => println!("Cache: memory"),
        CacheBackendKind::Sqlite => {
            let db_path = config::get_database_path(config);
            if db_path.exists() {
                let store = SqliteCacheStore::open(&db_path).await?;
                println!(
                    "Cache: {} {} ({} entries)",
                    store.name(),
                    db_path.display(),
                    store.count().await?
                );
            } else {
                println!("Cache: sqlite {} (not initialized)", db_path.display());
            }
        }
    }
    println!("Freshness window: {}h", config.cache.freshness_hours);

    let configured = |key: &Option<String>| {
        if key.as_deref().is_some_and(|k| !k.is_empty()) {
            "Configured"
        } else {
            "Not configured"
        }
    };
    println!("Apify API: {}", configured(&config.apify.api_key));
    println!("Google Places API: {}", configured(&config.google_places.api_key));

    Ok(())
}
