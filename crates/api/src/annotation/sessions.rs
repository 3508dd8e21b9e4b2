//! Undo/redo histories for inspections being annotated.
//!
//! A session is created by the first mutation, replaying the stored diagram
//! points above the inspection's base points, so a restarted server keeps
//! the points (though not the redo tail). Reads never create a session.
//!
//! Each session sits behind its own mutex. Callers hold the guard across
//! both the history change and the database write, so writes for one
//! inspection land in the order their changes were made.
//!
//! Sessions are dropped when the inspection is completed, after
//! [`DEFAULT_IDLE_TTL`] without use, or least-recently-used first once
//! [`DEFAULT_MAX_SESSIONS`] are open.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use cartcheck_core::diagram::DiagramData;
use cartcheck_core::history::{AnnotationHistory, HistoryState};
use cartcheck_core::types::InspectionId;
use tokio::sync::{Mutex, OwnedMutexGuard};

pub const DEFAULT_IDLE_TTL: Duration = Duration::from_secs(2 * 60 * 60);

pub const DEFAULT_MAX_SESSIONS: usize = 10_000;

/// Exclusive access to one inspection's history.
pub type SessionGuard = OwnedMutexGuard<AnnotationHistory>;

struct Entry {
    history: Arc<Mutex<AnnotationHistory>>,
    last_used: Instant,
}

impl Entry {
    fn in_use(&self) -> bool {
        Arc::strong_count(&self.history) > 1
    }
}

pub struct AnnotationSessions {
    sessions: Mutex<HashMap<InspectionId, Entry>>,
    idle_ttl: Duration,
    max_sessions: usize,
}

impl Default for AnnotationSessions {
    fn default() -> Self {
        Self::with_limits(DEFAULT_IDLE_TTL, DEFAULT_MAX_SESSIONS)
    }
}

impl AnnotationSessions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(idle_ttl: Duration, max_sessions: usize) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            idle_ttl,
            max_sessions: max_sessions.max(1),
        }
    }

    /// Current state. Without a session this is the replay of `stored`,
    /// and no session is created.
    pub async fn state(&self, id: InspectionId, stored: &DiagramData) -> HistoryState {
        let existing = {
            let mut sessions = self.sessions.lock().await;
            sessions.get_mut(&id).map(|entry| {
                entry.last_used = Instant::now();
                Arc::clone(&entry.history)
            })
        };
        match existing {
            Some(history) => history.lock().await.state(),
            None => seed(stored).state(),
        }
    }

    /// Lock the session of `id`, creating it from `stored` if needed.
    ///
    /// Other callers for the same inspection wait until the guard is
    /// dropped; other inspections are not blocked.
    pub async fn lock(&self, id: InspectionId, stored: &DiagramData) -> SessionGuard {
        let history = {
            let mut sessions = self.sessions.lock().await;
            let now = Instant::now();
            if !sessions.contains_key(&id) {
                self.evict(&mut sessions, now);
            }
            let entry = sessions.entry(id).or_insert_with(|| Entry {
                history: Arc::new(Mutex::new(seed(stored))),
                last_used: now,
            });
            entry.last_used = now;
            Arc::clone(&entry.history)
        };
        history.lock_owned().await
    }

    /// Forget a session.
    pub async fn remove(&self, id: InspectionId) {
        self.sessions.lock().await.remove(&id);
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }

    /// Drop idle sessions, then the least recently used ones until there is
    /// room for one more. Sessions whose guard is held are kept.
    fn evict(&self, sessions: &mut HashMap<InspectionId, Entry>, now: Instant) {
        let before = sessions.len();
        sessions.retain(|_, entry| {
            entry.in_use() || now.duration_since(entry.last_used) < self.idle_ttl
        });

        while sessions.len() >= self.max_sessions {
            let oldest = sessions
                .iter()
                .filter(|(_, entry)| !entry.in_use())
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(id, _)| *id);
            match oldest {
                Some(id) => {
                    sessions.remove(&id);
                }
                None => break,
            }
        }

        let evicted = before - sessions.len();
        if evicted > 0 {
            tracing::debug!(evicted, open = sessions.len(), "Evicted annotation sessions");
        }
    }
}

fn seed(stored: &DiagramData) -> AnnotationHistory {
    AnnotationHistory::replayed(&stored.points, stored.base_points)
}
