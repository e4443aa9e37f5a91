//! Application configuration constants and settings loading.
//!
//! Scheduling constants live here next to the runtime settings so every
//! tunable value has a single home.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::db::LogOnError;
use crate::paths;

// ==================== SRS Configuration ====================

/// Ease factor given to an item when it enters the review pool
pub const DEFAULT_EASE_FACTOR: f64 = 2.5;

/// Floor for the ease factor; keeps intervals from collapsing
pub const MIN_EASE_FACTOR: f64 = 1.3;

/// Score used for items with no review history when ranking weakest items
pub const NEUTRAL_AVERAGE_QUALITY: f64 = 2.5;

/// Interval (days) from which an item counts as mature
pub const MATURE_INTERVAL_DAYS: u32 = 21;

// ==================== Practice Configuration ====================

/// How many of the weakest items feed a practice session
pub const WEAKEST_LIMIT: usize = 15;

/// Items per practice session after shuffling
pub const PRACTICE_LIMIT: usize = 10;

/// Window (days) for the "recently reviewed" practice source
pub const RECENT_WINDOW_DAYS: i64 = 7;

// ==================== Server / Persistence Defaults ====================

pub const DEFAULT_SERVER_ADDR: &str = "0.0.0.0";

pub const DEFAULT_SERVER_PORT: u16 = 3000;

/// How long a storage write may block before it is abandoned as failed
pub const DEFAULT_PERSISTENCE_TIMEOUT_MS: u64 = 2000;

/// Learner sessions kept in memory before the least recently used is dropped
pub const MAX_OPEN_SESSIONS: usize = 1024;

// ==================== config.toml ====================

/// Configuration file structure for config.toml
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    database: Option<DatabaseConfig>,
    cache: Option<CacheConfig>,
    catalog: Option<CatalogConfig>,
    server: Option<ServerConfig>,
    persistence: Option<PersistenceConfig>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabaseConfig {
    path: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct CacheConfig {
    dir: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct CatalogConfig {
    path: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerConfig {
    addr: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
struct PersistenceConfig {
    timeout_ms: Option<u64>,
}

impl FileConfig {
    /// Read a config file, falling back to an empty config if missing or invalid
    pub fn read(path: &Path) -> Self {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(_) => return Self::default(),
        };
        toml::from_str(&contents)
            .log_warn_default(&format!("Ignoring invalid {}", path.display()))
    }
}

/// Resolved runtime settings
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub database_path: PathBuf,
    pub cache_dir: PathBuf,
    /// Vocabulary catalog JSON; built-in list when absent
    pub catalog_path: Option<PathBuf>,
    pub server_addr: String,
    pub server_port: u16,
    pub persistence_timeout: Duration,
}

impl Settings {
    /// Load settings with priority: config.toml > environment (.env) > default
    pub fn load() -> Self {
        // Load .env file if present
        let _ = dotenvy::dotenv();

        let file = FileConfig::read(Path::new("config.toml"));
        Self::resolve(file, |key| std::env::var(key).ok())
    }

    /// Merge a parsed config file with an environment lookup
    pub fn resolve(file: FileConfig, env: impl Fn(&str) -> Option<String>) -> Self {
        let database_path = file
            .database
            .and_then(|d| d.path)
            .or_else(|| env("DATABASE_PATH"))
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(paths::db_path()));

        let cache_dir = file
            .cache
            .and_then(|c| c.dir)
            .or_else(|| env("CACHE_DIR"))
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(paths::cache_dir()));

        let catalog_path = file
            .catalog
            .and_then(|c| c.path)
            .or_else(|| env("CATALOG_PATH"))
            .map(PathBuf::from);

        let server = file.server.unwrap_or_default();
        let server_addr = server
            .addr
            .unwrap_or_else(|| DEFAULT_SERVER_ADDR.to_string());
        let server_port = server
            .port
            .or_else(|| env("PORT").and_then(|p| p.parse().ok()))
            .unwrap_or(DEFAULT_SERVER_PORT);

        let timeout_ms = file
            .persistence
            .and_then(|p| p.timeout_ms)
            .or_else(|| env("PERSISTENCE_TIMEOUT_MS").and_then(|t| t.parse().ok()))
            .unwrap_or(DEFAULT_PERSISTENCE_TIMEOUT_MS);

        let settings = Self {
            database_path,
            cache_dir,
            catalog_path,
            server_addr,
            server_port,
            persistence_timeout: Duration::from_millis(timeout_ms),
        };
        tracing::info!(
            "Using database {} with cache {}",
            settings.database_path.display(),
            settings.cache_dir.display()
        );
        settings
    }

    /// Get the full server bind address
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server_addr, self.server_port)
    }
}
