use crate::telemetry::{AlertData, Reading};
use serde::Deserialize;

mod validation;

pub use validation::{validate_reading, FrameError};

/// Tag carried by the handshake frame the backend sends right after accept
pub const HANDSHAKE_TYPE: &str = "connection";

/// Raw wire shape of one inbound message.
///
/// Telemetry frames look like:
/// {
///   "farm_id": "...",
///   "sensors": { "temperature": 28.5, ... },
///   "alerts": [ { "type": "HEAT_WARNING", "severity": "high", ... } ],
///   "simulation_status": "running"
/// }
///
/// Handshake frames carry `"type": "connection"` and no telemetry.
#[derive(Debug, Clone, Deserialize)]
struct WireFrame {
    #[serde(rename = "type", default)]
    frame_type: Option<String>,
    #[serde(default)]
    farm_id: Option<String>,
    #[serde(default)]
    sensors: Option<Reading>,
    #[serde(default)]
    alerts: Vec<AlertData>,
    #[serde(default)]
    simulation_status: Option<String>,
}

/// One parsed inbound frame
#[derive(Debug, Clone, PartialEq)]
pub enum InboundFrame {
    /// Connection acknowledgment; carries no telemetry
    Handshake { farm_id: Option<String> },
    Telemetry(TelemetryFrame),
}

/// Normalized telemetry payload, applied to the store in field order:
/// reading, then alerts, then simulation status
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryFrame {
    pub farm_id: Option<String>,
    pub reading: Reading,
    pub alerts: Vec<AlertData>,
    pub simulation_status: Option<String>,
}

/// Parses and validates one text frame.
///
/// Handshake frames are recognized before any telemetry validation so a
/// bare acknowledgment never counts as malformed.
pub fn parse_frame(text: &str) -> Result<InboundFrame, FrameError> {
    let wire: WireFrame =
        serde_json::from_str(text).map_err(|e| FrameError::Malformed(e.to_string()))?;

    if wire.frame_type.as_deref() == Some(HANDSHAKE_TYPE) {
        return Ok(InboundFrame::Handshake {
            farm_id: wire.farm_id,
        });
    }

    let reading = wire.sensors.ok_or(FrameError::MissingSensors)?;
    validate_reading(&reading)?;

    Ok(InboundFrame::Telemetry(TelemetryFrame {
        farm_id: wire.farm_id,
        reading,
        alerts: wire.alerts,
        simulation_status: wire.simulation_status,
    }))
}
