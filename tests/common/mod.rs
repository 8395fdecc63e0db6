// Scripted in-memory transport for driving TelemetryClient in tests
#![allow(dead_code)]

use agri_telemetry::client::{FrameStream, StreamConnector, TransportEvent};
use agri_telemetry::store::TelemetrySnapshot;
use agri_telemetry::telemetry::ConnectionState;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::time::Instant;

/// Connector whose `open` calls consume scripted outcomes in order.
/// With nothing scripted, connections are refused.
#[derive(Default)]
pub struct ScriptedConnector {
    accepts: Mutex<VecDeque<MockStream>>,
    attempts: Mutex<Vec<(String, Instant)>>,
}

impl ScriptedConnector {
    /// Accept the next connection attempt; the returned handle plays the server
    pub fn accept_next(&self) -> ServerHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let closed_by_client = Arc::new(AtomicBool::new(false));
        self.accepts.lock().unwrap().push_back(MockStream {
            rx,
            closed_by_client: Arc::clone(&closed_by_client),
        });
        ServerHandle {
            tx: Some(tx),
            closed_by_client,
        }
    }

    pub fn attempt_count(&self) -> usize {
        self.attempts.lock().unwrap().len()
    }

    pub fn urls(&self) -> Vec<String> {
        self.attempts
            .lock()
            .unwrap()
            .iter()
            .map(|(url, _)| url.clone())
            .collect()
    }

    /// Milliseconds between consecutive attempts
    pub fn gaps_ms(&self) -> Vec<u64> {
        let attempts = self.attempts.lock().unwrap();
        attempts
            .windows(2)
            .map(|w| (w[1].1 - w[0].1).as_millis() as u64)
            .collect()
    }
}

#[async_trait]
impl StreamConnector for ScriptedConnector {
    async fn open(&self, url: &str) -> anyhow::Result<Box<dyn FrameStream>> {
        self.attempts
            .lock()
            .unwrap()
            .push((url.to_string(), Instant::now()));

        match self.accepts.lock().unwrap().pop_front() {
            Some(stream) => Ok(Box::new(stream)),
            None => anyhow::bail!("connection refused"),
        }
    }
}

struct MockStream {
    rx: mpsc::UnboundedReceiver<TransportEvent>,
    closed_by_client: Arc<AtomicBool>,
}

#[async_trait]
impl FrameStream for MockStream {
    async fn next_event(&mut self) -> Option<TransportEvent> {
        self.rx.recv().await
    }

    async fn close(&mut self) {
        self.closed_by_client.store(true, Ordering::SeqCst);
    }
}

/// Server side of one accepted connection
pub struct ServerHandle {
    tx: Option<mpsc::UnboundedSender<TransportEvent>>,
    closed_by_client: Arc<AtomicBool>,
}

impl ServerHandle {
    pub fn send(&self, frame: impl Into<String>) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(TransportEvent::Frame(frame.into()));
        }
    }

    pub fn send_json(&self, frame: Value) {
        self.send(frame.to_string());
    }

    pub fn fail(&self, error: &str) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(TransportEvent::Error(error.to_string()));
        }
    }

    /// Server-side close: the client sees the stream end
    pub fn close(&mut self) {
        self.tx = None;
    }

    pub fn closed_by_client(&self) -> bool {
        self.closed_by_client.load(Ordering::SeqCst)
    }
}

/// Lets every spawned task run until it blocks. Relies on paused time:
/// the sleep only completes once the runtime is otherwise idle.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

/// Waits for a snapshot with `status`
pub async fn wait_for_status(
    rx: &mut broadcast::Receiver<Arc<TelemetrySnapshot>>,
    status: ConnectionState,
) -> Arc<TelemetrySnapshot> {
    loop {
        let snapshot = rx.recv().await.expect("store channel closed");
        if snapshot.connection_status == status {
            return snapshot;
        }
    }
}

/// Waits for the first snapshot matching `pred`
pub async fn wait_for_snapshot<F>(
    rx: &mut broadcast::Receiver<Arc<TelemetrySnapshot>>,
    pred: F,
) -> Arc<TelemetrySnapshot>
where
    F: Fn(&TelemetrySnapshot) -> bool,
{
    loop {
        let snapshot = rx.recv().await.expect("store channel closed");
        if pred(&snapshot) {
            return snapshot;
        }
    }
}

pub fn telemetry_frame(tick: u64, temperature: f64, alerts: Value) -> Value {
    json!({
        "farm_id": "farm-1",
        "sensors": {
            "temperature": temperature,
            "humidity": 58.0,
            "pressure": 1009.4,
            "soil_moisture": 41.0,
            "rainfall": 0.0,
            "wind_speed": 6.5,
            "is_raining": false,
            "simulation_tick": tick,
            "timestamp": format!("2024-06-01T10:00:{:02}.250", tick % 60)
        },
        "alerts": alerts,
        "simulation_status": "running",
        "timestamp": "2024-06-01T10:00:00.300"
    })
}

pub fn handshake_frame() -> Value {
    json!({
        "type": "connection",
        "status": "connected",
        "farm_id": "farm-1",
        "message": "Connected to Agri-Nexus sensor stream",
        "timestamp": "2024-06-01T10:00:00"
    })
}
