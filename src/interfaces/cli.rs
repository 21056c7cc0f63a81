use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "scrapeflow")]
#[command(about = "Review profile scraping service with a single-flight, time-boxed cache.")]
#[command(version)]
pub struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Address to listen on, overrides the configured one
    #[arg(short = 'b', long)]
    pub bind: Option<String>,

    /// Keep cached scrapes in memory instead of SQLite
    #[arg(long)]
    pub memory_cache: bool,

    /// Generate config sample
    #[arg(long)]
    pub generate_config: bool,

    /// Show status
    #[arg(long)]
    pub status: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags() {
        let cli = Cli::parse_from(["scrapeflow", "-c", "/tmp/sf.toml", "--bind", "0.0.0.0:80", "--memory-cache"]);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/sf.toml")));
        assert_eq!(cli.bind.as_deref(), Some("0.0.0.0:80"));
        assert!(cli.memory_cache);
        assert!(!cli.status);
    }
}
