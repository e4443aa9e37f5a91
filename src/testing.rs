//! Test utilities for storage setup.
//!
//! Provides helpers that reuse the authoritative schema initialization,
//! eliminating schema duplication in test code.

use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::db::{self, DbPool};
use crate::persistence::{FallbackChain, JsonFileCache, SqliteStore};

/// Test environment with a migrated database and a cache directory.
///
/// Both live in a single temporary directory, ensuring automatic cleanup
/// when dropped.
pub struct TestEnv {
    /// Temporary directory (kept alive for database file persistence)
    pub temp: TempDir,
    /// englishflow.db with the full schema (all migrations)
    pub pool: DbPool,
    /// Directory for per-learner JSON snapshots
    pub cache_dir: PathBuf,
}

impl TestEnv {
    /// Create a test environment using `db::init_db`, exactly as the binary does.
    pub fn new() -> rusqlite::Result<Self> {
        let temp =
            TempDir::new().map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;

        let pool = db::init_db(
            &temp.path().join("englishflow.db"),
            std::time::Duration::from_millis(200),
        )?;
        let cache_dir = temp.path().join("cache");

        Ok(Self {
            temp,
            pool,
            cache_dir,
        })
    }

    /// Fresh chain over this environment's database and cache, primary first.
    ///
    /// Chains built from the same env share storage, so a second chain sees
    /// what the first one wrote.
    pub fn chain(&self) -> FallbackChain {
        FallbackChain::new()
            .with_backend(SqliteStore::new(self.pool.clone()))
            .with_backend(JsonFileCache::new(&self.cache_dir))
    }

    /// Get the temporary directory path for creating test files.
    pub fn path(&self) -> &Path {
        self.temp.path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::LearnerSession;
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;

    #[test]
    fn test_chains_share_storage() {
        let env = TestEnv::new().unwrap();
        let now = Utc.with_ymd_and_hms(2025, 5, 5, 5, 5, 5).unwrap();

        let mut first = LearnerSession::open("ana", Arc::new(env.chain()));
        first.initialize("w1", now);
        first.record_review("w1", 4, 2, now).unwrap();

        let second = LearnerSession::open("ana", Arc::new(env.chain()));
        assert_eq!(second.state("w1"), first.state("w1"));
        assert!(env.path().join("cache").join("ana.json").exists());
    }

    #[test]
    fn test_cache_covers_lost_database() {
        let env = TestEnv::new().unwrap();
        let now = Utc.with_ymd_and_hms(2025, 5, 5, 5, 5, 5).unwrap();

        let mut first = LearnerSession::open("ana", Arc::new(env.chain()));
        first.initialize("w1", now);

        {
            let conn = db::try_lock(&env.pool).unwrap();
            db::clear_snapshot(&conn, "ana").unwrap();
        }

        let second = LearnerSession::open("ana", Arc::new(env.chain()));
        assert!(second.state("w1").is_some());
        assert_eq!(
            second.loaded_from(),
            &crate::persistence::LoadSource::Backend("cache".into())
        );
    }
}
