use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Lifetime counters for one telemetry client
#[derive(Debug, Default)]
pub struct ClientStats {
    frames_received: AtomicU64,
    frames_rejected: AtomicU64,
    handshakes: AtomicU64,
    connections_opened: AtomicU64,
    reconnects_scheduled: AtomicU64,
}

impl ClientStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_frame(&self) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rejected(&self) {
        self.frames_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_handshake(&self) {
        self.handshakes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_open(&self) {
        self.connections_opened.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_reconnect_scheduled(&self) {
        self.reconnects_scheduled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            frames_received: self.frames_received.load(Ordering::Relaxed),
            frames_rejected: self.frames_rejected.load(Ordering::Relaxed),
            handshakes: self.handshakes.load(Ordering::Relaxed),
            connections_opened: self.connections_opened.load(Ordering::Relaxed),
            reconnects_scheduled: self.reconnects_scheduled.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of client counters at a point in time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    /// Every text frame read off the wire, valid or not
    pub frames_received: u64,
    pub frames_rejected: u64,
    pub handshakes: u64,
    pub connections_opened: u64,
    pub reconnects_scheduled: u64,
}
