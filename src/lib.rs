// Telemetry domain types
pub mod telemetry;

// Inbound frame parsing and validation
pub mod frame;

// Telemetry store and bounded buffers
pub mod store;

// WebSocket client and reconnect lifecycle
pub mod client;

// Configuration (defaults, TOML, environment)
pub mod config;

pub use client::TelemetryClient;
pub use store::{StoreView, TelemetrySnapshot, TelemetryStore};
