//! Project path functions - single source of truth for default file paths.
//!
//! ## Environment Variables
//!
//! - `DATA_DIR`: Override the base data directory (default: "data")
//!
//! Explicit paths from config.toml or `DATABASE_PATH` / `CACHE_DIR` take
//! precedence over these defaults (see config.rs).

use std::env;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Lazily initialized data directory from DATA_DIR env var
static DATA_DIR_VALUE: OnceLock<String> = OnceLock::new();

/// Get the base data directory (from DATA_DIR env var or default "data")
pub fn data_dir() -> &'static str {
    DATA_DIR_VALUE.get_or_init(|| env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string()))
}

/// Primary schedule database
pub fn db_path() -> String {
    format!("{}/englishflow.db", data_dir())
}

/// Local cache directory holding one JSON snapshot per learner
pub fn cache_dir() -> String {
    format!("{}/cache", data_dir())
}

/// Cache file for a learner inside `dir`.
///
/// Learner ids are typically e-mail addresses; anything outside a
/// conservative character set is replaced so the id can never escape `dir`.
pub fn learner_cache_file(dir: &Path, learner_id: &str) -> PathBuf {
    let safe: String = learner_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '@' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    // Guard against "." and ".." after sanitizing
    let safe = if safe.chars().all(|c| c == '.') {
        format!("_{}", safe)
    } else {
        safe
    };
    dir.join(format!("{safe}.json"))
}
