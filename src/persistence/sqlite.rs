//! Primary backend: the shared SQLite database.

use chrono::{DateTime, Utc};

use crate::db::{self, DbPool};
use crate::domain::ScheduleState;
use crate::error::StoreError;

use super::ScheduleStore;

#[derive(Clone)]
pub struct SqliteStore {
    pool: DbPool,
}

impl SqliteStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl ScheduleStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn load(&self, learner_id: &str) -> Result<Option<Vec<ScheduleState>>, StoreError> {
        let conn = db::try_lock(&self.pool).map_err(|_| StoreError::LockPoisoned)?;
        Ok(db::load_snapshot(&conn, learner_id)?)
    }

    fn save(
        &self,
        learner_id: &str,
        states: &[ScheduleState],
        saved_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let conn = db::try_lock(&self.pool).map_err(|_| StoreError::LockPoisoned)?;
        Ok(db::save_snapshot(&conn, learner_id, states, saved_at)?)
    }

    fn clear(&self, learner_id: &str) -> Result<(), StoreError> {
        let conn = db::try_lock(&self.pool).map_err(|_| StoreError::LockPoisoned)?;
        Ok(db::clear_snapshot(&conn, learner_id)?)
    }
}
