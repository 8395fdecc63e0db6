use crate::store::engine::{TelemetrySnapshot, TelemetryStore};
use crate::telemetry::{Alert, ConnectionState, HistoryPoint, Reading};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Consumer-facing handle on a [`TelemetryStore`].
///
/// Exposes reads, subscription and the user-driven alert actions; readings
/// and connection status stay writable only through the store itself, which
/// the socket client owns.
#[derive(Clone)]
pub struct StoreView {
    store: Arc<TelemetryStore>,
}

impl StoreView {
    pub(crate) fn new(store: Arc<TelemetryStore>) -> Self {
        Self { store }
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        self.store.snapshot()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<TelemetrySnapshot>> {
        self.store.subscribe()
    }

    pub fn connection_status(&self) -> ConnectionState {
        self.store.connection_status()
    }

    pub fn is_connected(&self) -> bool {
        self.store.is_connected()
    }

    pub fn current_reading(&self) -> Option<Reading> {
        self.store.current_reading()
    }

    pub fn history(&self) -> Vec<HistoryPoint> {
        self.store.history()
    }

    pub fn alerts(&self) -> Vec<Alert> {
        self.store.alerts()
    }

    pub fn simulation_status(&self) -> String {
        self.store.simulation_status()
    }

    pub fn dismiss_alert(&self, id: &str) -> bool {
        self.store.dismiss_alert(id)
    }

    pub fn clear_alerts(&self) {
        self.store.clear_alerts()
    }
}
