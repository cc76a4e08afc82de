//! Process-wide registry mapping `mcp-session-id` values to live engines.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::{Mutex, MutexGuard};

use crate::transport::streamable::StreamableHttpTransport;

/// One logical client conversation and the engine serving it.
pub struct Session {
    engine: Mutex<StreamableHttpTransport>,
    created_at: DateTime<Utc>,
    /// Unix millis of the last request routed to this session.
    last_active: AtomicI64,
}

pub type SessionHandle = Arc<Session>;

impl Session {
    pub fn new(engine: StreamableHttpTransport) -> Self {
        let created_at = Utc::now();
        Self {
            engine: Mutex::new(engine),
            created_at,
            last_active: AtomicI64::new(created_at.timestamp_millis()),
        }
    }

    /// Exclusive access to the engine. Requests on one session are serialized.
    pub async fn lock(&self) -> MutexGuard<'_, StreamableHttpTransport> {
        self.engine.lock().await
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Record activity on this session.
    pub fn touch(&self) {
        self.last_active
            .store(Utc::now().timestamp_millis(), Ordering::Relaxed);
    }

    pub fn idle_for(&self, now: DateTime<Utc>) -> Duration {
        let idle = now.timestamp_millis() - self.last_active.load(Ordering::Relaxed);
        Duration::from_millis(u64::try_from(idle).unwrap_or(0))
    }
}

/// Registry of active sessions.
///
/// Entries are added by the engine's initialization callback and removed by
/// its close callback, so lookups never observe a half-built session.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: DashMap<String, SessionHandle>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolve(&self, session_id: &str) -> Option<SessionHandle> {
        self.sessions
            .get(session_id)
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Insert a session under `session_id`. An id already in use is left
    /// untouched and `false` is returned.
    pub fn register(&self, session_id: &str, session: SessionHandle) -> bool {
        match self.sessions.entry(session_id.to_string()) {
            Entry::Occupied(_) => {
                tracing::warn!(session_id, "Session id already registered");
                false
            }
            Entry::Vacant(slot) => {
                slot.insert(session);
                tracing::debug!(session_id, active = self.sessions.len(), "Session registered");
                true
            }
        }
    }

    pub fn evict(&self, session_id: &str) -> Option<SessionHandle> {
        let removed = self.sessions.remove(session_id).map(|(_, session)| session);
        if removed.is_some() {
            tracing::debug!(session_id, "Session evicted");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn ids(&self) -> Vec<String> {
        self.sessions.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Close and remove sessions idle for at least `max_idle`. Sessions with a
    /// request in flight are skipped. Returns how many were removed.
    pub fn evict_idle(&self, max_idle: Duration) -> usize {
        let now = Utc::now();
        let stale: Vec<(String, SessionHandle)> = self
            .sessions
            .iter()
            .filter(|entry| entry.value().idle_for(now) >= max_idle)
            .map(|entry| (entry.key().clone(), Arc::clone(entry.value())))
            .collect();

        let mut evicted = 0;
        for (session_id, session) in stale {
            let Ok(mut engine) = session.engine.try_lock() else {
                continue;
            };
            // Closing fires the engine's own eviction callback when it has one.
            engine.close();
            drop(engine);
            self.evict(&session_id);
            evicted += 1;
        }
        if evicted > 0 {
            tracing::info!(evicted, remaining = self.sessions.len(), "Evicted idle sessions");
        }
        evicted
    }

    /// Drop every session, e.g. on shutdown.
    pub fn clear(&self) {
        let count = self.sessions.len();
        self.sessions.clear();
        if count > 0 {
            tracing::info!("Dropped {count} active session(s)");
        }
    }
}
