// Telemetry domain types shared by the frame codec, the store and consumers

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;


/// Snapshot of environmental measurements at one instant.
///
/// Readings are never mutated; the next inbound reading supersedes the
/// previous one in the store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Air temperature in Celsius
    pub temperature: f64,

    /// Relative humidity (%)
    pub humidity: f64,

    /// Atmospheric pressure in hPa
    pub pressure: f64,

    /// Soil moisture (%)
    pub soil_moisture: f64,

    /// Rainfall in mm
    #[serde(default)]
    pub rainfall: f64,

    /// Wind speed in km/h
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wind_speed: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uv_index: Option<f64>,

    #[serde(default)]
    pub is_raining: bool,

    /// Backend simulation tick, increases by one per simulated step
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub simulation_tick: Option<u64>,

    /// ISO-8601 timestamp as sent by the backend (with or without offset)
    pub timestamp: String,
}

/// Reduced-precision projection of a [`Reading`] retained for charting.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HistoryPoint {
    /// `HH:MM:SS` label taken from the reading timestamp
    pub time: String,
    pub temperature: f64,
    pub humidity: f64,
    pub soil_moisture: f64,
    pub pressure: f64,
}

impl From<&Reading> for HistoryPoint {
    fn from(reading: &Reading) -> Self {
        Self {
            time: time_label(&reading.timestamp),
            temperature: round1(reading.temperature),
            humidity: round1(reading.humidity),
            soil_moisture: round1(reading.soil_moisture),
            pressure: round1(reading.pressure),
        }
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Formats the wall-clock part of an ISO-8601 timestamp.
///
/// The backend emits naive local timestamps (`2024-06-01T14:03:22.512`) as
/// well as offset ones; anything unparseable is passed through verbatim.
fn time_label(timestamp: &str) -> String {
    if let Ok(ts) = DateTime::parse_from_rfc3339(timestamp) {
        return ts.format("%H:%M:%S").to_string();
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(timestamp, "%Y-%m-%dT%H:%M:%S%.f") {
        return ts.format("%H:%M:%S").to_string();
    }
    timestamp.to_string()
}

/// Abnormal-condition category, as named on the wire
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertKind {
    CriticalDry,
    StormWarning,
    HeatWarning,
    FrostWarning,
    DiseaseRisk,
    Waterlogging,
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AlertKind::CriticalDry => "CRITICAL_DRY",
            AlertKind::StormWarning => "STORM_WARNING",
            AlertKind::HeatWarning => "HEAT_WARNING",
            AlertKind::FrostWarning => "FROST_WARNING",
            AlertKind::DiseaseRisk => "DISEASE_RISK",
            AlertKind::Waterlogging => "WATERLOGGING",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AlertSeverity::Low => "low",
            AlertSeverity::Medium => "medium",
            AlertSeverity::High => "high",
            AlertSeverity::Critical => "critical",
        };
        f.write_str(name)
    }
}

/// Alert body as carried by an inbound frame (no identity yet)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AlertData {
    #[serde(rename = "type")]
    pub kind: AlertKind,
    pub severity: AlertSeverity,
    pub title: String,
    /// Absent and `null` both arrive as an empty message
    #[serde(default, deserialize_with = "null_as_empty")]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_value: Option<f64>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Alert held by the store: the inbound body plus a process-unique id and
/// its creation time
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Alert {
    /// UUIDv7 identifier (time-ordered, unique within the process)
    pub id: String,
    #[serde(rename = "type")]
    pub kind: AlertKind,
    pub severity: AlertSeverity,
    pub title: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_value: Option<f64>,
    pub created_at: DateTime<Utc>,
}

impl Alert {
    pub fn new(data: AlertData) -> Self {
        Self {
            id: uuid::Uuid::now_v7().to_string(),
            kind: data.kind,
            severity: data.severity,
            title: data.title,
            message: data.message,
            threshold_value: data.threshold_value,
            actual_value: data.actual_value,
            created_at: Utc::now(),
        }
    }
}

/// Health of the telemetry stream. Only the socket client writes it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Error,
}

impl ConnectionState {
    pub fn is_connected(self) -> bool {
        self == ConnectionState::Connected
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Error => "error",
        };
        f.write_str(name)
    }
}

/// Simulation phase label before the backend reports one
pub const DEFAULT_SIMULATION_STATUS: &str = "standby";
