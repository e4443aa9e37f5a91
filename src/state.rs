//! Application state shared by all handlers.
//!
//! Learner sessions are cached in memory, one mutex per learner. The cache is
//! bounded: when full, the least recently used idle session whose latest
//! change reached storage is dropped and reopened on its next request.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::catalog::Catalog;
use crate::config;
use crate::events::LogListener;
use crate::persistence::{FallbackChain, LoadSource};
use crate::session::LearnerSession;

pub type SharedSession = Arc<Mutex<LearnerSession>>;

/// Session entry with last access time for eviction
struct SessionEntry {
    session: SharedSession,
    last_access: DateTime<Utc>,
}

/// Application state passed to all handlers
#[derive(Clone)]
pub struct AppState {
    /// Read-only vocabulary content
    pub catalog: Arc<Catalog>,

    /// Storage backends, primary first
    pub chain: Arc<FallbackChain>,

    sessions: Arc<Mutex<HashMap<String, SessionEntry>>>,
    max_sessions: usize,
}

impl AppState {
    pub fn new(catalog: Catalog, chain: FallbackChain) -> Self {
        Self::with_session_limit(catalog, chain, config::MAX_OPEN_SESSIONS)
    }

    pub fn with_session_limit(catalog: Catalog, chain: FallbackChain, max_sessions: usize) -> Self {
        Self {
            catalog: Arc::new(catalog),
            chain: Arc::new(chain),
            sessions: Arc::new(Mutex::new(HashMap::new())),
            max_sessions: max_sessions.max(1),
        }
    }

    /// Run `f` against a learner's session, opening and caching it on first use.
    ///
    /// Blocks on storage; call from a blocking context.
    pub fn with_session<T>(&self, learner_id: &str, f: impl FnOnce(&mut LearnerSession) -> T) -> T {
        let session = self.session(learner_id);
        let mut guard = lock_session(&session);
        f(&mut *guard)
    }

    /// Read-only access. A learner with nothing stored is not cached; `f`
    /// sees an empty, throwaway session instead.
    pub fn read_session<T>(&self, learner_id: &str, f: impl FnOnce(&LearnerSession) -> T) -> T {
        if let Some(session) = self.cached(learner_id) {
            let guard = lock_session(&session);
            return f(&*guard);
        }

        let opened = self.open(learner_id);
        if *opened.loaded_from() == LoadSource::Empty {
            return f(&opened);
        }

        let session = self.insert(learner_id, opened);
        let guard = lock_session(&session);
        f(&*guard)
    }

    pub fn open_sessions(&self) -> usize {
        self.lock_sessions().len()
    }

    fn session(&self, learner_id: &str) -> SharedSession {
        match self.cached(learner_id) {
            Some(session) => session,
            None => {
                let opened = self.open(learner_id);
                self.insert(learner_id, opened)
            }
        }
    }

    fn cached(&self, learner_id: &str) -> Option<SharedSession> {
        let mut sessions = self.lock_sessions();
        sessions.get_mut(learner_id).map(|entry| {
            entry.last_access = Utc::now();
            Arc::clone(&entry.session)
        })
    }

    /// Load from storage without holding the map lock
    fn open(&self, learner_id: &str) -> LearnerSession {
        tracing::info!("Opening session for {}", learner_id);
        LearnerSession::open(learner_id, Arc::clone(&self.chain)).with_listener(LogListener)
    }

    /// Cache a freshly opened session. If a concurrent request cached one
    /// first, that one wins and `session` is dropped.
    fn insert(&self, learner_id: &str, session: LearnerSession) -> SharedSession {
        let mut sessions = self.lock_sessions();
        if !sessions.contains_key(learner_id) {
            evict_if_full(&mut sessions, self.max_sessions);
        }
        let entry = sessions
            .entry(learner_id.to_string())
            .or_insert_with(|| SessionEntry {
                session: Arc::new(Mutex::new(session)),
                last_access: Utc::now(),
            });
        entry.last_access = Utc::now();
        Arc::clone(&entry.session)
    }

    fn lock_sessions(&self) -> MutexGuard<'_, HashMap<String, SessionEntry>> {
        // Entries are inserted and removed whole, so a poisoned map is still consistent
        self.sessions.lock().unwrap_or_else(|e: PoisonError<_>| {
            tracing::error!("Session map mutex poisoned - recovering");
            e.into_inner()
        })
    }
}

fn lock_session(session: &SharedSession) -> MutexGuard<'_, LearnerSession> {
    // Mutations replace whole records, so a poisoned session is still consistent
    session.lock().unwrap_or_else(|e: PoisonError<_>| {
        tracing::error!("Learner session mutex poisoned - recovering");
        e.into_inner()
    })
}

/// Drop least recently used sessions until there is room for one more.
///
/// Sessions in use, and sessions whose last change reached no backend, are kept.
fn evict_if_full(sessions: &mut HashMap<String, SessionEntry>, max_sessions: usize) {
    while sessions.len() >= max_sessions {
        let victim = sessions
            .iter()
            .filter(|(_, entry)| Arc::strong_count(&entry.session) == 1)
            .filter(|(_, entry)| {
                entry
                    .session
                    .try_lock()
                    .map(|session| !session.has_unsaved_changes())
                    .unwrap_or(false)
            })
            .min_by_key(|(_, entry)| entry.last_access)
            .map(|(id, _)| id.clone());

        match victim {
            Some(id) => {
                tracing::debug!("Evicting session for {}", id);
                sessions.remove(&id);
            }
            None => {
                tracing::warn!(
                    "All {} open sessions are busy or unsaved; exceeding the limit",
                    sessions.len()
                );
                break;
            }
        }
    }
}
