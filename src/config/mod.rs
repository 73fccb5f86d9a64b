//! Configuration module for the quotes backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// SQL script inserting the canonical series
    pub seed_sql_path: PathBuf,
    /// JSON document mapping series slug to quotes
    pub quotes_json_path: PathBuf,
    /// Directory holding the single-page front-end
    pub public_dir: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Read-write deployment variant: public quote submission allowed
    pub writes_enabled: bool,
    /// Re-run the JSON import at startup, skipping quotes that already exist
    pub reimport: bool,
    /// Length of one rate limit window
    pub rate_limit_window: Duration,
    /// Requests allowed per client address within one window
    pub rate_limit_max: u32,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let db_path = env::var("DB_PATH")
            .unwrap_or_else(|_| "./data/mdquotes.db".to_string())
            .into();

        let seed_sql_path = env::var("QUOTES_SEED_SQL")
            .unwrap_or_else(|_| "./data/seed.sql".to_string())
            .into();

        let quotes_json_path = env::var("QUOTES_JSON")
            .unwrap_or_else(|_| "./data/quotes.json".to_string())
            .into();

        let public_dir = env::var("QUOTES_PUBLIC_DIR")
            .unwrap_or_else(|_| "./public".to_string())
            .into();

        let bind_addr = env::var("QUOTES_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:3000".to_string())
            .parse()
            .expect("Invalid QUOTES_BIND_ADDR format");

        let log_level = env::var("QUOTES_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let writes_enabled = env_flag("QUOTES_WRITES_ENABLED");
        let reimport = env_flag("QUOTES_REIMPORT");

        let rate_limit_window = env::var("QUOTES_RATE_LIMIT_WINDOW_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_RATE_LIMIT_WINDOW);

        let rate_limit_max = env::var("QUOTES_RATE_LIMIT_MAX")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(DEFAULT_RATE_LIMIT_MAX);

        Self {
            db_path,
            seed_sql_path,
            quotes_json_path,
            public_dir,
            bind_addr,
            log_level,
            writes_enabled,
            reimport,
            rate_limit_window,
            rate_limit_max,
        }
    }
}

pub const DEFAULT_RATE_LIMIT_WINDOW: Duration = Duration::from_secs(60);
pub const DEFAULT_RATE_LIMIT_MAX: u32 = 120;

fn env_flag(key: &str) -> bool {
    env::var(key).map(|v| parse_flag(&v)).unwrap_or(false)
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
