use crate::client::backoff::ReconnectPolicy;
use crate::client::session::run_session;
use crate::client::stats::{ClientStats, StatsSnapshot};
use crate::client::transport::{StreamConnector, WsConnector};
use crate::config::TelemetryConfig;
use crate::frame::TelemetryFrame;
use crate::store::{StoreView, TelemetryStore};
use crate::telemetry::ConnectionState;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tracing::info;

/// Live telemetry client for one farm stream.
///
/// Owns at most one session (a spawned task that connects, pumps frames
/// into the store and reconnects with backoff). The store is shared with
/// consumers through [`StoreView`]; the client is its only writer of
/// readings, alerts and connection status.
///
/// `connect`, `disconnect` and `switch_farm` must be called from within a
/// tokio runtime. Dropping the client disconnects a live session.
pub struct TelemetryClient {
    pub(super) inner: Arc<Inner>,
}

pub(super) struct Inner {
    stream_url: String,
    pub(super) policy: ReconnectPolicy,
    pub(super) connector: Arc<dyn StreamConnector>,
    store: Arc<TelemetryStore>,
    pub(super) stats: ClientStats,
    farm_id: RwLock<String>,

    /// Scheduled reconnects since the last successful open. Survives across
    /// sessions so a manual connect after exhaustion does not start a fresh
    /// backoff cycle unless it actually gets through.
    pub(super) retry_count: AtomicU32,

    /// Set by `connect()` while a session is live; a session about to give
    /// up checks it under the slot lock and makes one more attempt instead.
    /// Cleared each time the session drops to `disconnected`.
    pub(super) retry_requested: AtomicBool,

    session: Mutex<SessionSlot>,
}

/// Outcome of a session trying to give up after its last attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Retire {
    /// Status set to `error` and the slot released
    Done,
    /// `connect()` asked for another attempt in the meantime
    Retry,
    /// Session was already disconnected or replaced
    Cancelled,
}

#[derive(Default)]
struct SessionSlot {
    next_generation: u64,
    active: Option<Session>,
}

struct Session {
    generation: u64,
    shutdown: watch::Sender<bool>,
    retry_now: Arc<Notify>,
    task: JoinHandle<()>,
}

impl Session {
    fn is_live(&self) -> bool {
        !self.task.is_finished()
    }
}

impl TelemetryClient {
    /// Client over WebSocket with a fresh store sized from `config`
    pub fn new(config: &TelemetryConfig) -> Self {
        let store = Arc::new(TelemetryStore::with_limits(
            config.store.max_historical_points,
            config.store.max_alerts,
        ));
        Self::with_connector(config, Arc::new(WsConnector), store)
    }

    pub fn with_connector(
        config: &TelemetryConfig,
        connector: Arc<dyn StreamConnector>,
        store: Arc<TelemetryStore>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                stream_url: config.stream.url.trim_end_matches('/').to_string(),
                policy: ReconnectPolicy::from(&config.reconnect),
                connector,
                store,
                stats: ClientStats::new(),
                farm_id: RwLock::new(config.stream.farm_id.clone()),
                retry_count: AtomicU32::new(0),
                retry_requested: AtomicBool::new(false),
                session: Mutex::new(SessionSlot::default()),
            }),
        }
    }

    /// Starts a session unless one is already live.
    ///
    /// A live session that is waiting out a reconnect delay is woken to
    /// retry immediately; a connecting or connected session is left alone.
    pub fn connect(&self) {
        let mut slot = self.inner.session.lock().unwrap();

        if let Some(session) = slot.active.as_ref().filter(|s| s.is_live()) {
            self.inner.retry_requested.store(true, Ordering::SeqCst);
            session.retry_now.notify_waiters();
            return;
        }

        slot.next_generation += 1;
        let generation = slot.next_generation;
        let (shutdown, shutdown_rx) = watch::channel(false);
        let retry_now = Arc::new(Notify::new());
        self.inner.retry_requested.store(false, Ordering::SeqCst);

        info!(farm_id = %self.farm_id(), generation = generation, "Connecting to telemetry stream");
        self.inner.store.set_connection_status(ConnectionState::Connecting);

        let task = tokio::spawn(run_session(
            Arc::clone(&self.inner),
            generation,
            shutdown_rx,
            Arc::clone(&retry_now),
        ));

        slot.active = Some(Session {
            generation,
            shutdown,
            retry_now,
            task,
        });
    }

    /// Cancels any pending reconnect, closes the open connection and marks
    /// the stream disconnected. Safe to call at any time.
    pub fn disconnect(&self) {
        let mut slot = self.inner.session.lock().unwrap();

        if let Some(session) = slot.active.take() {
            // The task closes its socket and exits; it can no longer write
            // to the store because its generation is gone from the slot.
            let _ = session.shutdown.send(true);
            info!(generation = session.generation, "Disconnected from telemetry stream");
        }

        self.inner.store.set_connection_status(ConnectionState::Disconnected);
    }

    /// Points the client at another farm and resets the store so the two
    /// farms' telemetry never mix. A live session is torn down and a new one
    /// started against the new farm; otherwise the next `connect()` uses it.
    pub fn switch_farm(&self, farm_id: impl Into<String>) {
        let farm_id = farm_id.into();
        {
            let mut current = self.inner.farm_id.write().unwrap();
            if *current == farm_id {
                return;
            }
            info!(from = %current, to = %farm_id, "Switching farm");
            *current = farm_id;
        }
        self.inner.retry_count.store(0, Ordering::SeqCst);

        if self.is_active() {
            self.disconnect();
            self.inner.store.reset();
            self.connect();
        } else {
            self.inner.store.reset();
        }
    }

    pub fn farm_id(&self) -> String {
        self.inner.farm_id()
    }

    /// Full stream URL for the current farm
    pub fn stream_url(&self) -> String {
        self.inner.stream_url()
    }

    /// True while a session is connecting, connected, or waiting to retry
    pub fn is_active(&self) -> bool {
        let slot = self.inner.session.lock().unwrap();
        slot.active.as_ref().is_some_and(Session::is_live)
    }

    pub fn connection_status(&self) -> ConnectionState {
        self.inner.store.connection_status()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.inner.stats.snapshot()
    }

    /// Read-only handle for display consumers
    pub fn store(&self) -> StoreView {
        self.inner.store.view()
    }
}

impl Drop for TelemetryClient {
    fn drop(&mut self) {
        let has_session = self.inner.session.lock().unwrap().active.is_some();
        if has_session {
            self.disconnect();
        }
    }
}

impl Inner {
    fn farm_id(&self) -> String {
        self.farm_id.read().unwrap().clone()
    }

    pub(super) fn stream_url(&self) -> String {
        let farm_id = self.farm_id();
        format!(
            "{}/ws/sensors/{}",
            self.stream_url,
            urlencoding::encode(&farm_id)
        )
    }

    /// Runs `f` against the store only if `generation` is still the live
    /// session. Returns false once the session has been disconnected or
    /// replaced; the caller must then stop.
    pub(super) fn publish<F>(&self, generation: u64, f: F) -> bool
    where
        F: FnOnce(&TelemetryStore),
    {
        let slot = self.session.lock().unwrap();
        if slot.active.as_ref().map(|s| s.generation) != Some(generation) {
            return false;
        }
        f(&self.store);
        true
    }

    /// Ends the session with `error` once attempts are exhausted, unless a
    /// `connect()` arrived since the last drop to `disconnected`. Both the
    /// check and the release happen under the slot lock, so a racing
    /// `connect()` either sees the slot free and spawns, or gets its retry.
    pub(super) fn retire(&self, generation: u64) -> Retire {
        let mut slot = self.session.lock().unwrap();
        if slot.active.as_ref().map(|s| s.generation) != Some(generation) {
            return Retire::Cancelled;
        }
        if self.retry_requested.swap(false, Ordering::SeqCst) {
            return Retire::Retry;
        }
        self.store.set_connection_status(ConnectionState::Error);
        slot.active = None;
        Retire::Done
    }

    pub(super) fn set_status(&self, generation: u64, status: ConnectionState) -> bool {
        self.publish(generation, |store| store.set_connection_status(status))
    }

    /// Applies one telemetry frame: reading, then each alert in order, then
    /// the simulation status.
    pub(super) fn apply_frame(&self, generation: u64, frame: TelemetryFrame) -> bool {
        self.publish(generation, |store| {
            store.update_readings(frame.reading);
            for alert in frame.alerts {
                store.add_alert(alert);
            }
            if let Some(status) = frame.simulation_status {
                store.set_simulation_status(status);
            }
        })
    }
}
