//! Error types for scheduling and storage.

/// Failures at the scheduler boundary.
///
/// `InvalidQuality` and `NotInitialized` are caller mistakes and are returned
/// before any state changes. `PersistenceUnavailable` is operational: it is only
/// ever reported as a warning, the in-memory schedule stays authoritative.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchedulerError {
    #[error("quality {quality} is outside 0..=5")]
    InvalidQuality { quality: i64 },

    #[error("no schedule state for item '{item_id}'")]
    NotInitialized { item_id: String },

    #[error("persistence backend '{backend}' unavailable: {reason}")]
    PersistenceUnavailable { backend: String, reason: String },
}

/// Failures inside a single storage backend
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("corrupt record for item '{item_id}': {reason}")]
    Corrupt { item_id: String, reason: String },

    #[error("database unavailable")]
    LockPoisoned,
}

impl StoreError {
    pub fn into_unavailable(self, backend: &str) -> SchedulerError {
        SchedulerError::PersistenceUnavailable {
            backend: backend.to_string(),
            reason: self.to_string(),
        }
    }
}
