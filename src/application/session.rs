// Dashboard session - owns one lot's state, its random source and its tick timer
use crate::application::snapshot_sink::SnapshotSink;
use crate::domain::dashboard::DashboardState;
use crate::domain::lot::LotLayout;
use crate::domain::simulation::{ConfigError, SimulationConfig};
use crate::domain::snapshot::DashboardSnapshot;
use crate::domain::view::DashboardView;
use futures::stream::Stream;
use rand::RngCore;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

const TICK_CHANNEL_CAPACITY: usize = 16;

/// Handle to a running session. Cloning shares the same session.
#[derive(Clone)]
pub struct DashboardSession {
    shared: Arc<SessionShared>,
}

struct SessionShared {
    id: String,
    inner: Mutex<SessionInner>,
    tick_tx: broadcast::Sender<u64>,
    sink: Arc<dyn SnapshotSink>,
    /// Last client access; timer ticks do not count.
    last_active: std::sync::Mutex<Instant>,
}

struct SessionInner {
    dashboard: DashboardState,
    rng: Box<dyn RngCore + Send>,
    /// Bumped every time the timer is re-armed or stopped; stale timers see a mismatch.
    timer_generation: u64,
    timer: Option<JoinHandle<()>>,
}

impl DashboardSession {
    /// Initializes the lot and arms the tick timer. Must run inside a tokio runtime.
    pub async fn start(
        id: String,
        layout: LotLayout,
        config: SimulationConfig,
        mut rng: Box<dyn RngCore + Send>,
        sink: Arc<dyn SnapshotSink>,
    ) -> Self {
        let mut dashboard = DashboardState::initialize(layout, rng.as_mut());
        dashboard.set_config(config);

        let (tick_tx, _) = broadcast::channel(TICK_CHANNEL_CAPACITY);
        let session = Self {
            shared: Arc::new(SessionShared {
                id,
                inner: Mutex::new(SessionInner {
                    dashboard,
                    rng,
                    timer_generation: 0,
                    timer: None,
                }),
                tick_tx,
                sink,
                last_active: std::sync::Mutex::new(Instant::now()),
            }),
        };

        {
            let mut inner = session.shared.inner.lock().await;
            session.arm_timer(&mut inner);
        }

        tracing::info!(
            "Session {} started: interval={}s volatility={}",
            session.id(),
            config.tick_interval_seconds(),
            config.volatility()
        );
        session
    }

    pub fn id(&self) -> &str {
        &self.shared.id
    }

    /// Fresh view of the current state.
    pub async fn view(&self) -> DashboardView {
        let inner = self.shared.inner.lock().await;
        DashboardView::derive(&inner.dashboard)
    }

    /// Validates the raw field text, applies it and restarts the timer at the new interval.
    pub async fn update_simulation(
        &self,
        interval: &str,
        volatility: &str,
    ) -> Result<SimulationConfig, ConfigError> {
        let mut inner = self.shared.inner.lock().await;
        let config = inner.dashboard.update_config(interval, volatility)?;
        // Swap timers while holding the lock so no old tick can slip in between.
        self.arm_timer(&mut inner);

        tracing::info!(
            "Session {} simulation updated: interval={}s volatility={}",
            self.id(),
            config.tick_interval_seconds(),
            config.volatility()
        );
        Ok(config)
    }

    pub async fn set_announcement(&self, text: &str) -> String {
        let mut inner = self.shared.inner.lock().await;
        inner.dashboard.set_announcement(text);
        tracing::info!(
            "Session {} announcement set to {:?}",
            self.id(),
            inner.dashboard.announcement()
        );
        inner.dashboard.announcement().to_string()
    }

    /// Captures a snapshot and hands it to the sink in the background.
    pub async fn push_snapshot(&self) -> DashboardSnapshot {
        let snapshot = {
            let inner = self.shared.inner.lock().await;
            DashboardSnapshot::capture(self.id(), &inner.dashboard, chrono::Utc::now())
        };

        let sink = self.shared.sink.clone();
        let outgoing = snapshot.clone();
        tokio::spawn(async move {
            let session_id = outgoing.session_id.clone();
            if let Err(e) = sink.publish(outgoing).await {
                tracing::error!("Failed to publish snapshot for session {}: {}", session_id, e);
            }
        });

        snapshot
    }

    /// Runs one tick immediately, outside the timer.
    #[cfg(test)]
    pub(crate) async fn tick_now(&self) -> u64 {
        let tick = {
            let mut inner = self.shared.inner.lock().await;
            let inner = &mut *inner;
            inner.dashboard.tick(inner.rng.as_mut());
            inner.dashboard.ticks()
        };
        let _ = self.shared.tick_tx.send(tick);
        tick
    }

    /// Stops the timer. The state stays readable until the last handle is dropped.
    pub async fn close(&self) {
        let mut inner = self.shared.inner.lock().await;
        inner.timer_generation += 1;
        if let Some(timer) = inner.timer.take() {
            timer.abort();
        }
        tracing::info!("Session {} closed after {} ticks", self.id(), inner.dashboard.ticks());
    }

    pub fn subscribe(&self) -> broadcast::Receiver<u64> {
        self.shared.tick_tx.subscribe()
    }

    /// Marks the session as in use by a client.
    pub fn touch(&self) {
        self.shared.touch();
    }

    /// Time since a client last used the session.
    pub fn idle_for(&self) -> Duration {
        self.shared.last_active().elapsed()
    }

    /// The current view, then a fresh view after every tick.
    ///
    /// The stream only holds a weak reference, so it ends once the session is dropped.
    pub fn view_stream(&self) -> impl Stream<Item = DashboardView> + Send + 'static + use<> {
        let weak = Arc::downgrade(&self.shared);
        let mut rx = self.subscribe();

        async_stream::stream! {
            if let Some(view) = derive_from(&weak).await {
                yield view;
            }

            loop {
                match rx.recv().await {
                    Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {
                        match derive_from(&weak).await {
                            Some(view) => {
                                yield view;
                            }
                            None => break,
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    /// Cancels any running timer and spawns a new one at the configured interval.
    fn arm_timer(&self, inner: &mut SessionInner) {
        inner.timer_generation += 1;
        if let Some(old) = inner.timer.take() {
            old.abort();
        }

        let generation = inner.timer_generation;
        let period = inner.dashboard.config().tick_period();
        let weak = Arc::downgrade(&self.shared);
        let first_tick = Instant::now() + period;

        inner.timer = Some(tokio::spawn(async move {
            let mut interval = interval_at(first_tick, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let Some(shared) = weak.upgrade() else {
                    break;
                };
                if !shared.apply_timer_tick(generation).await {
                    break;
                }
            }
        }));
    }
}

impl SessionShared {
    fn touch(&self) {
        match self.last_active.lock() {
            Ok(mut last) => *last = Instant::now(),
            Err(poisoned) => *poisoned.into_inner() = Instant::now(),
        }
    }

    fn last_active(&self) -> Instant {
        match self.last_active.lock() {
            Ok(last) => *last,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// Returns false when the timer that fired has been superseded.
    async fn apply_timer_tick(&self, generation: u64) -> bool {
        let tick = {
            let mut inner = self.inner.lock().await;
            if inner.timer_generation != generation {
                return false;
            }
            let inner = &mut *inner;
            inner.dashboard.tick(inner.rng.as_mut());
            inner.dashboard.ticks()
        };

        tracing::debug!("Session {} tick {}", self.id, tick);
        let _ = self.tick_tx.send(tick);
        true
    }
}

impl Drop for SessionShared {
    fn drop(&mut self) {
        if let Some(timer) = self.inner.get_mut().timer.take() {
            timer.abort();
        }
    }
}

async fn derive_from(weak: &Weak<SessionShared>) -> Option<DashboardView> {
    let shared = weak.upgrade()?;
    // An open stream keeps the session alive.
    shared.touch();
    let inner = shared.inner.lock().await;
    Some(DashboardView::derive(&inner.dashboard))
}
