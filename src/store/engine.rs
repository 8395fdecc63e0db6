use crate::store::buffer::BoundedBuffer;
use crate::store::view::StoreView;
use crate::telemetry::{
    Alert, AlertData, ConnectionState, HistoryPoint, Reading, DEFAULT_SIMULATION_STATUS,
};
use serde::Serialize;
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;
use tracing::debug;

/// Default history capacity (points kept for charting)
pub const DEFAULT_MAX_HISTORICAL_POINTS: usize = 100;

/// Default alert queue capacity
pub const DEFAULT_MAX_ALERTS: usize = 10;

/// Immutable copy of the whole store, published after every mutation
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TelemetrySnapshot {
    pub connection_status: ConnectionState,
    pub is_connected: bool,
    pub current_reading: Option<Reading>,
    pub history: Vec<HistoryPoint>,
    pub alerts: Vec<Alert>,
    pub simulation_status: String,
}

struct StoreState {
    connection_status: ConnectionState,
    current_reading: Option<Reading>,
    history: BoundedBuffer<HistoryPoint>,
    alerts: BoundedBuffer<Alert>,
    simulation_status: String,
}

impl StoreState {
    fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            connection_status: self.connection_status,
            is_connected: self.connection_status.is_connected(),
            current_reading: self.current_reading.clone(),
            history: self.history.to_vec(),
            alerts: self.alerts.to_vec(),
            simulation_status: self.simulation_status.clone(),
        }
    }
}

/// Single source of truth for live telemetry.
///
/// Shared by `Arc` between the socket client (the only writer of readings,
/// alerts and status) and any number of readers. Every mutation runs under
/// the write lock and publishes its snapshot before the lock is released,
/// so subscribers observe mutations in order and never a partial update.
pub struct TelemetryStore {
    state: RwLock<StoreState>,

    /// Broadcast channel for post-mutation snapshots
    update_tx: broadcast::Sender<Arc<TelemetrySnapshot>>,
}

impl TelemetryStore {
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_MAX_HISTORICAL_POINTS, DEFAULT_MAX_ALERTS)
    }

    pub fn with_limits(max_historical_points: usize, max_alerts: usize) -> Self {
        let (update_tx, _) = broadcast::channel(256);

        Self {
            state: RwLock::new(StoreState {
                connection_status: ConnectionState::Disconnected,
                current_reading: None,
                history: BoundedBuffer::new(max_historical_points),
                alerts: BoundedBuffer::new(max_alerts),
                simulation_status: DEFAULT_SIMULATION_STATUS.to_string(),
            }),
            update_tx,
        }
    }

    /// Applies `f` under the write lock, then publishes the resulting state.
    fn mutate<R>(&self, f: impl FnOnce(&mut StoreState) -> R) -> R {
        let mut state = self.state.write().unwrap();
        let out = f(&mut state);

        // No subscribers is fine; skip building the snapshot
        if self.update_tx.receiver_count() > 0 {
            let _ = self.update_tx.send(Arc::new(state.snapshot()));
        }

        out
    }

    pub fn set_connection_status(&self, status: ConnectionState) {
        self.mutate(|state| state.connection_status = status);
    }

    /// Replaces the current reading and appends its history point, evicting
    /// the oldest point past capacity.
    pub fn update_readings(&self, reading: Reading) {
        self.mutate(|state| {
            let point = HistoryPoint::from(&reading);
            state.current_reading = Some(reading);
            if state.history.push(point).is_some() {
                debug!(capacity = state.history.capacity(), "History full, evicted oldest point");
            }
        });
    }

    /// Stamps `data` with a fresh id and creation time and queues it,
    /// evicting the oldest alert past capacity.
    pub fn add_alert(&self, data: AlertData) -> Alert {
        let alert = Alert::new(data);
        self.mutate(|state| {
            if let Some(evicted) = state.alerts.push(alert.clone()) {
                debug!(alert_id = %evicted.id, "Alert queue full, evicted oldest alert");
            }
        });
        alert
    }

    /// Removes the alert with `id`. Returns false (and publishes nothing)
    /// when no such alert is queued.
    pub fn dismiss_alert(&self, id: &str) -> bool {
        let mut state = self.state.write().unwrap();
        if state.alerts.remove_first(|a| a.id == id).is_none() {
            return false;
        }
        if self.update_tx.receiver_count() > 0 {
            let _ = self.update_tx.send(Arc::new(state.snapshot()));
        }
        true
    }

    pub fn clear_alerts(&self) {
        self.mutate(|state| state.alerts.clear());
    }

    pub fn set_simulation_status(&self, status: impl Into<String>) {
        let status = status.into();
        self.mutate(|state| state.simulation_status = status);
    }

    /// Restores every field to its default. Open sockets are left alone;
    /// closing them is the client's job.
    pub fn reset(&self) {
        self.mutate(|state| {
            state.connection_status = ConnectionState::Disconnected;
            state.current_reading = None;
            state.history.clear();
            state.alerts.clear();
            state.simulation_status = DEFAULT_SIMULATION_STATUS.to_string();
        });
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        self.state.read().unwrap().snapshot()
    }

    /// Subscribe to post-mutation snapshots
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<TelemetrySnapshot>> {
        self.update_tx.subscribe()
    }

    pub fn connection_status(&self) -> ConnectionState {
        self.state.read().unwrap().connection_status
    }

    pub fn is_connected(&self) -> bool {
        self.connection_status().is_connected()
    }

    pub fn current_reading(&self) -> Option<Reading> {
        self.state.read().unwrap().current_reading.clone()
    }

    pub fn history(&self) -> Vec<HistoryPoint> {
        self.state.read().unwrap().history.to_vec()
    }

    pub fn alerts(&self) -> Vec<Alert> {
        self.state.read().unwrap().alerts.to_vec()
    }

    pub fn simulation_status(&self) -> String {
        self.state.read().unwrap().simulation_status.clone()
    }

    /// Read-only handle for display consumers
    pub fn view(self: &Arc<Self>) -> StoreView {
        StoreView::new(Arc::clone(self))
    }
}

impl Default for TelemetryStore {
    fn default() -> Self {
        Self::new()
    }
}
