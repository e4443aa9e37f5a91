//! Durable storage for schedule snapshots.
//!
//! Backends implement [`ScheduleStore`]. A [`FallbackChain`] orders them:
//! reads take the first backend that has a usable snapshot, writes go to every
//! backend and a failure in one never stops the others.

pub mod cache;
pub mod sqlite;

use chrono::{DateTime, Utc};

use crate::config::MIN_EASE_FACTOR;
use crate::domain::ScheduleState;
use crate::error::{SchedulerError, StoreError};

pub use cache::JsonFileCache;
pub use sqlite::SqliteStore;

pub trait ScheduleStore: Send + Sync {
    /// Short name used in logs and warnings
    fn name(&self) -> &str;

    /// `Ok(None)` means the backend has never stored anything for this learner
    fn load(&self, learner_id: &str) -> Result<Option<Vec<ScheduleState>>, StoreError>;

    fn save(
        &self,
        learner_id: &str,
        states: &[ScheduleState],
        saved_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    fn clear(&self, learner_id: &str) -> Result<(), StoreError>;
}

/// Reject records that break scheduling invariants.
///
/// Quality ranges are already enforced when history is decoded.
pub fn validate_states(states: &[ScheduleState]) -> Result<(), StoreError> {
    for state in states {
        if !state.ease_factor.is_finite() || state.ease_factor < MIN_EASE_FACTOR {
            return Err(StoreError::Corrupt {
                item_id: state.item_id.clone(),
                reason: format!("ease factor {} below floor", state.ease_factor),
            });
        }
        if state.history.windows(2).any(|w| w[0].timestamp > w[1].timestamp) {
            return Err(StoreError::Corrupt {
                item_id: state.item_id.clone(),
                reason: "history out of order".to_string(),
            });
        }
    }
    Ok(())
}

/// Where a loaded snapshot came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadSource {
    Backend(String),
    /// No backend had data; start empty and initialize lazily
    Empty,
}

#[derive(Debug)]
pub struct LoadOutcome {
    pub states: Vec<ScheduleState>,
    pub source: LoadSource,
    /// Backends that failed or held corrupt data along the way
    pub warnings: Vec<SchedulerError>,
}

/// Ordered list of storage backends, primary first
#[derive(Default)]
pub struct FallbackChain {
    backends: Vec<Box<dyn ScheduleStore>>,
}

impl FallbackChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_backend(mut self, backend: impl ScheduleStore + 'static) -> Self {
        self.backends.push(Box::new(backend));
        self
    }

    pub fn backend_names(&self) -> Vec<&str> {
        self.backends.iter().map(|b| b.name()).collect()
    }

    /// Try each backend in order until one yields a valid snapshot
    pub fn load(&self, learner_id: &str) -> LoadOutcome {
        let mut warnings = Vec::new();

        for backend in &self.backends {
            let result = backend
                .load(learner_id)
                .and_then(|loaded| match loaded {
                    Some(states) => validate_states(&states).map(|_| Some(states)),
                    None => Ok(None),
                });

            match result {
                Ok(Some(states)) => {
                    tracing::info!(
                        "Loaded {} schedule states for {} from {}",
                        states.len(),
                        learner_id,
                        backend.name()
                    );
                    return LoadOutcome {
                        states,
                        source: LoadSource::Backend(backend.name().to_string()),
                        warnings,
                    };
                }
                Ok(None) => {
                    tracing::debug!("No snapshot for {} in {}", learner_id, backend.name());
                }
                Err(e) => {
                    tracing::warn!("Failed to load from {}: {}", backend.name(), e);
                    warnings.push(e.into_unavailable(backend.name()));
                }
            }
        }

        LoadOutcome {
            states: Vec::new(),
            source: LoadSource::Empty,
            warnings,
        }
    }

    /// Write to every backend; returns one warning per failed backend
    pub fn save(
        &self,
        learner_id: &str,
        states: &[ScheduleState],
        saved_at: DateTime<Utc>,
    ) -> Vec<SchedulerError> {
        self.fan_out(|backend| backend.save(learner_id, states, saved_at))
    }

    /// Remove the learner from every backend
    pub fn clear(&self, learner_id: &str) -> Vec<SchedulerError> {
        self.fan_out(|backend| backend.clear(learner_id))
    }

    fn fan_out(
        &self,
        op: impl Fn(&dyn ScheduleStore) -> Result<(), StoreError>,
    ) -> Vec<SchedulerError> {
        let mut warnings = Vec::new();
        for backend in &self.backends {
            if let Err(e) = op(backend.as_ref()) {
                tracing::warn!("Persistence write to {} failed: {}", backend.name(), e);
                warnings.push(e.into_unavailable(backend.name()));
            }
        }
        warnings
    }
}
