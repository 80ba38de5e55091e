use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard};

use lru::LruCache;

use crate::models::{RideAnalysis, Route};
use crate::prediction::SessionHistory;

pub const DEFAULT_SESSION_CAPACITY: usize = 1024;

/// In-memory ride history per session id, least recently used evicted first.
///
/// Handlers take a snapshot before synthesis and record afterwards, so the
/// lock is never held across a directions call.
pub struct SessionStore {
    sessions: Mutex<LruCache<String, SessionHistory>>,
}

impl SessionStore {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            sessions: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Copy of the session's history; empty for unknown sessions.
    pub fn snapshot(&self, session_id: &str) -> SessionHistory {
        self.lock().get(session_id).cloned().unwrap_or_default()
    }

    pub fn record(&self, session_id: &str, target_distance_m: f64, route: &Route, analysis: &RideAnalysis) {
        let mut sessions = self.lock();
        if let Some(history) = sessions.get_mut(session_id) {
            history.record_ride(target_distance_m, route, analysis);
            return;
        }

        let mut history = SessionHistory::default();
        history.record_ride(target_distance_m, route, analysis);
        if let Some((evicted, _)) = sessions.push(session_id.to_string(), history) {
            if evicted != session_id {
                tracing::debug!("Evicted session {} from history store", evicted);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<String, SessionHistory>> {
        // A panic elsewhere cannot leave a history half-appended
        self.sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(NonZeroUsize::new(DEFAULT_SESSION_CAPACITY).unwrap_or(NonZeroUsize::MIN))
    }
}
