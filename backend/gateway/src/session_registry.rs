//! Scan session registry.
//!
//! Each session sits behind its own mutex so a long extraction in one
//! session never blocks another. Sessions nobody has touched for the idle
//! TTL are evicted by [`SessionRegistry::evict_idle`].

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tracing::info;
use uuid::Uuid;

use kkscan_core::ScanSession;

pub type SharedSession = Arc<Mutex<ScanSession>>;

struct Entry {
    session: SharedSession,
    /// Milliseconds since the registry epoch.
    last_access: AtomicU64,
}

#[derive(Clone)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<Uuid, Entry>>>,
    copied_window: Duration,
    epoch: Instant,
}

impl SessionRegistry {
    pub fn new(copied_window: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            copied_window,
            epoch: Instant::now(),
        }
    }

    fn millis_at(&self, now: Instant) -> u64 {
        now.saturating_duration_since(self.epoch).as_millis() as u64
    }

    /// Create an idle session and return its id.
    pub async fn create(&self) -> (Uuid, SharedSession) {
        let session = ScanSession::new(self.copied_window);
        let id = session.id();
        let shared = Arc::new(Mutex::new(session));
        let entry = Entry {
            session: shared.clone(),
            last_access: AtomicU64::new(self.millis_at(Instant::now())),
        };
        self.sessions.write().await.insert(id, entry);
        (id, shared)
    }

    /// Look up a session and mark it as used.
    pub async fn get(&self, id: &Uuid) -> Option<SharedSession> {
        let sessions = self.sessions.read().await;
        let entry = sessions.get(id)?;
        entry
            .last_access
            .fetch_max(self.millis_at(Instant::now()), Ordering::Relaxed);
        Some(entry.session.clone())
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Drop sessions idle for at least `ttl` as of `now`. A session whose
    /// extraction is still running, or whose lock is held, is kept.
    /// Returns the number evicted.
    pub async fn evict_idle(&self, ttl: Duration, now: Instant) -> usize {
        let Some(cutoff) = self.millis_at(now).checked_sub(ttl.as_millis() as u64) else {
            return 0;
        };
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|id, entry| {
            if entry.last_access.load(Ordering::Relaxed) > cutoff {
                return true;
            }
            let in_use = match entry.session.try_lock() {
                Ok(session) => session.is_busy(),
                Err(_) => true,
            };
            if !in_use {
                info!(session = %id, "Evicting idle session");
            }
            in_use
        });
        before - sessions.len()
    }

    /// Evict idle sessions every `ttl / 4` (at least once a second) until the
    /// task is aborted. A zero `ttl` disables eviction.
    pub fn spawn_sweeper(&self, ttl: Duration) -> Option<tokio::task::JoinHandle<()>> {
        if ttl.is_zero() {
            return None;
        }
        let registry = self.clone();
        let period = (ttl / 4).max(Duration::from_secs(1));
        Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                registry.evict_idle(ttl, Instant::now()).await;
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_lookup() {
        let registry = SessionRegistry::new(Duration::from_secs(2));
        let (id, session) = registry.create().await;
        assert_eq!(session.lock().await.id(), id);
        assert!(registry.get(&id).await.is_some());
        assert!(registry.get(&Uuid::new_v4()).await.is_none());
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_idle_sessions_are_evicted() {
        let registry = SessionRegistry::new(Duration::from_secs(2));
        let ttl = Duration::from_secs(60);
        let (stale, _) = registry.create().await;
        let (fresh, _) = registry.create().await;

        let later = Instant::now() + Duration::from_secs(120);
        registry.sessions.read().await[&fresh]
            .last_access
            .store(registry.millis_at(later), Ordering::Relaxed);

        assert_eq!(registry.evict_idle(ttl, Instant::now()).await, 0);
        assert_eq!(registry.evict_idle(ttl, later).await, 1);
        assert!(registry.get(&stale).await.is_none());
        assert!(registry.get(&fresh).await.is_some());
    }

    #[tokio::test]
    async fn test_busy_session_survives_eviction() {
        let registry = SessionRegistry::new(Duration::from_secs(2));
        let (id, session) = registry.create().await;
        session
            .lock()
            .await
            .begin_scan("data:image/png;base64,AA".into())
            .unwrap();

        let later = Instant::now() + Duration::from_secs(3600);
        assert_eq!(registry.evict_idle(Duration::from_secs(60), later).await, 0);
        assert!(registry.get(&id).await.is_some());
    }
}
