// Session registry - independent dashboard sessions keyed by id
use crate::application::session::DashboardSession;
use crate::application::snapshot_sink::SnapshotSink;
use crate::domain::lot::LotLayout;
use crate::domain::simulation::SimulationConfig;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

/// How often the reaper looks for idle sessions.
pub const REAP_PERIOD: Duration = Duration::from_secs(30);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("session {0} not found")]
    NotFound(String),
}

/// Settings every new session starts from.
#[derive(Debug, Clone)]
pub struct SessionDefaults {
    pub layout: LotLayout,
    pub simulation: SimulationConfig,
    /// Fixed seed for reproducible runs; each session offsets it by its creation index.
    pub seed: Option<u64>,
    /// Creating a session beyond this ends the least recently used one.
    pub max_sessions: usize,
    /// Sessions no client has touched for this long are ended by the reaper.
    pub idle_timeout: Duration,
}

#[derive(Clone)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<String, DashboardSession>>>,
    defaults: SessionDefaults,
    sink: Arc<dyn SnapshotSink>,
    created: Arc<AtomicU64>,
}

impl SessionRegistry {
    pub fn new(defaults: SessionDefaults, sink: Arc<dyn SnapshotSink>) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            defaults,
            sink,
            created: Arc::new(AtomicU64::new(0)),
        }
    }

    pub async fn create(&self) -> DashboardSession {
        let index = self.created.fetch_add(1, Ordering::Relaxed);
        let rng: Box<dyn RngCore + Send> = match self.defaults.seed {
            Some(seed) => Box::new(ChaCha8Rng::seed_from_u64(seed.wrapping_add(index))),
            None => Box::new(ChaCha8Rng::from_os_rng()),
        };
        let id = format!("{:016x}", rand::random::<u64>());

        let session = DashboardSession::start(
            id.clone(),
            self.defaults.layout.clone(),
            self.defaults.simulation,
            rng,
            self.sink.clone(),
        )
        .await;

        let evicted = {
            let mut sessions = self.sessions.write().await;
            let mut evicted = Vec::new();
            while sessions.len() >= self.defaults.max_sessions.max(1) {
                let Some(oldest) = sessions
                    .values()
                    .max_by_key(|s| s.idle_for())
                    .map(|s| s.id().to_string())
                else {
                    break;
                };
                evicted.extend(sessions.remove(&oldest));
            }
            sessions.insert(id, session.clone());
            evicted
        };

        for old in evicted {
            tracing::warn!(
                "Session limit of {} reached, ending least recently used session {}",
                self.defaults.max_sessions,
                old.id()
            );
            old.close().await;
        }

        session
    }

    /// Looks up a session and marks it as in use.
    pub async fn get(&self, id: &str) -> Result<DashboardSession, SessionError> {
        let session = self
            .sessions
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;
        session.touch();
        Ok(session)
    }

    /// Removes the session and stops its timer.
    pub async fn end(&self, id: &str) -> Result<(), SessionError> {
        let session = self
            .sessions
            .write()
            .await
            .remove(id)
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;
        session.close().await;
        Ok(())
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Ends every session idle for at least the configured timeout. Returns how many ended.
    pub async fn reap_idle(&self) -> usize {
        let idle_timeout = self.defaults.idle_timeout;
        let reaped: Vec<DashboardSession> = {
            let mut sessions = self.sessions.write().await;
            let idle: Vec<String> = sessions
                .values()
                .filter(|s| s.idle_for() >= idle_timeout)
                .map(|s| s.id().to_string())
                .collect();
            idle.iter().filter_map(|id| sessions.remove(id)).collect()
        };

        for session in &reaped {
            tracing::info!(
                "Session {} idle for {:?}, ending it",
                session.id(),
                session.idle_for()
            );
            session.close().await;
        }
        reaped.len()
    }

    /// Background task running [`reap_idle`](Self::reap_idle) every [`REAP_PERIOD`].
    pub fn spawn_reaper(&self) -> JoinHandle<()> {
        let registry = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(REAP_PERIOD);
            loop {
                interval.tick().await;
                let reaped = registry.reap_idle().await;
                if reaped > 0 {
                    tracing::debug!("Reaper ended {} idle sessions", reaped);
                }
            }
        })
    }

    /// Stops every session, used on shutdown.
    pub async fn end_all(&self) {
        let sessions: Vec<DashboardSession> =
            self.sessions.write().await.drain().map(|(_, s)| s).collect();
        for session in sessions {
            session.close().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::snapshot::DashboardSnapshot;
    use async_trait::async_trait;

    struct DiscardSink;

    #[async_trait]
    impl SnapshotSink for DiscardSink {
        async fn publish(&self, _snapshot: DashboardSnapshot) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn registry(seed: Option<u64>) -> SessionRegistry {
        limited_registry(seed, 16, Duration::from_secs(600))
    }

    fn limited_registry(
        seed: Option<u64>,
        max_sessions: usize,
        idle_timeout: Duration,
    ) -> SessionRegistry {
        SessionRegistry::new(
            SessionDefaults {
                layout: LotLayout::default(),
                simulation: SimulationConfig::new(2.0, 0.5).unwrap(),
                seed,
                max_sessions,
                idle_timeout,
            },
            Arc::new(DiscardSink),
        )
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let registry = registry(None);
        let session = registry.create().await;

        let found = registry.get(session.id()).await.unwrap();
        assert_eq!(found.id(), session.id());
        assert_eq!(registry.session_count().await, 1);

        let view = found.view().await;
        assert_eq!(view.simulation.tick_interval_seconds(), 2.0);
        assert_eq!(view.simulation.volatility(), 0.5);
    }

    #[tokio::test]
    async fn test_unknown_session() {
        let registry = registry(None);
        assert_eq!(
            registry.get("missing").await.err(),
            Some(SessionError::NotFound("missing".to_string()))
        );
        assert!(registry.end("missing").await.is_err());
    }

    #[tokio::test]
    async fn test_end_removes_session() {
        let registry = registry(None);
        let session = registry.create().await;
        registry.end(session.id()).await.unwrap();
        assert!(registry.get(session.id()).await.is_err());
        assert_eq!(registry.session_count().await, 0);
    }

    #[tokio::test]
    async fn test_seeded_sessions_are_reproducible() {
        let first = registry(Some(9)).create().await.view().await;
        let second = registry(Some(9)).create().await.view().await;
        assert_eq!(first.rows, second.rows);
    }

    #[tokio::test]
    async fn test_end_all() {
        let registry = registry(Some(1));
        registry.create().await;
        registry.create().await;
        assert_eq!(registry.session_count().await, 2);
        registry.end_all().await;
        assert_eq!(registry.session_count().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_limit_evicts_least_recently_used() {
        let registry = limited_registry(None, 2, Duration::from_secs(600));
        let first = registry.create().await;
        tokio::time::sleep(Duration::from_secs(1)).await;
        let second = registry.create().await;
        tokio::time::sleep(Duration::from_secs(1)).await;

        // Using the older session makes the newer one the eviction candidate.
        registry.get(first.id()).await.unwrap();
        let third = registry.create().await;

        assert_eq!(registry.session_count().await, 2);
        assert!(registry.get(first.id()).await.is_ok());
        assert!(registry.get(second.id()).await.is_err());
        assert!(registry.get(third.id()).await.is_ok());

        // The evicted session's timer is stopped.
        let ticks = second.view().await.tick;
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(second.view().await.tick, ticks);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reap_idle_sessions() {
        let registry = limited_registry(None, 16, Duration::from_secs(60));
        let idle = registry.create().await;
        let busy = registry.create().await;

        tokio::time::sleep(Duration::from_secs(45)).await;
        registry.get(busy.id()).await.unwrap();
        assert_eq!(registry.reap_idle().await, 0);

        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(registry.reap_idle().await, 1);
        assert!(registry.get(idle.id()).await.is_err());
        assert!(registry.get(busy.id()).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reaper_task_ends_abandoned_sessions() {
        let registry = limited_registry(None, 16, Duration::from_secs(60));
        let reaper = registry.spawn_reaper();
        registry.create().await;

        tokio::time::sleep(Duration::from_secs(60) + 2 * REAP_PERIOD).await;
        assert_eq!(registry.session_count().await, 0);
        reaper.abort();
    }
}
