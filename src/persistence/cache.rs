//! Secondary backend: one JSON file per learner on local disk.
//!
//! Files are written to a temporary sibling and renamed into place, so a crash
//! mid-write leaves the previous snapshot intact.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::domain::ScheduleState;
use crate::error::StoreError;
use crate::paths;

use super::ScheduleStore;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CacheFile {
    learner_id: String,
    saved_at: DateTime<Utc>,
    states: Vec<ScheduleState>,
}

#[derive(Debug, Clone)]
pub struct JsonFileCache {
    dir: PathBuf,
}

impl JsonFileCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file_for(&self, learner_id: &str) -> PathBuf {
        paths::learner_cache_file(&self.dir, learner_id)
    }
}

impl ScheduleStore for JsonFileCache {
    fn name(&self) -> &str {
        "cache"
    }

    fn load(&self, learner_id: &str) -> Result<Option<Vec<ScheduleState>>, StoreError> {
        let path = self.file_for(learner_id);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let file: CacheFile = serde_json::from_slice(&bytes)?;
        if file.learner_id != learner_id {
            // Two ids sanitized to the same file name
            tracing::warn!(
                "Cache file {} belongs to {}, not {}",
                path.display(),
                file.learner_id,
                learner_id
            );
            return Ok(None);
        }
        Ok(Some(file.states))
    }

    fn save(
        &self,
        learner_id: &str,
        states: &[ScheduleState],
        saved_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir)?;

        let file = CacheFile {
            learner_id: learner_id.to_string(),
            saved_at,
            states: states.to_vec(),
        };
        let json = serde_json::to_vec_pretty(&file)?;

        let path = self.file_for(learner_id);
        let tmp = path.with_extension("json.tmp");
        {
            let mut out = fs::File::create(&tmp)?;
            out.write_all(&json)?;
            out.sync_all()?;
        }
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn clear(&self, learner_id: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.file_for(learner_id)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
