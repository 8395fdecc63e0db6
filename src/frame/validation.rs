use crate::telemetry::Reading;
use std::fmt;

/// Reasons an inbound frame is discarded
#[derive(Debug, Clone, PartialEq)]
pub enum FrameError {
    /// Not JSON, or JSON that does not match the frame schema
    Malformed(String),
    MissingSensors,
    NonFinite(&'static str),
    OutOfRange { field: &'static str, value: f64 },
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameError::Malformed(detail) => write!(f, "malformed frame: {}", detail),
            FrameError::MissingSensors => write!(f, "telemetry frame has no sensors object"),
            FrameError::NonFinite(field) => write!(f, "{} must be a finite number", field),
            FrameError::OutOfRange { field, value } => {
                write!(f, "{} out of range: {}", field, value)
            }
        }
    }
}

impl std::error::Error for FrameError {}

/// Validates sensor values against the backend's reading schema.
///
/// Rules:
/// - Every numeric field must be finite
/// - Humidity and soil moisture: 0..=100 (%)
/// - Rainfall and wind speed: non-negative
/// - UV index: 0..=11
pub fn validate_reading(reading: &Reading) -> Result<(), FrameError> {
    finite("temperature", reading.temperature)?;
    finite("pressure", reading.pressure)?;

    within("humidity", reading.humidity, 0.0, 100.0)?;
    within("soil_moisture", reading.soil_moisture, 0.0, 100.0)?;
    within("rainfall", reading.rainfall, 0.0, f64::MAX)?;

    if let Some(wind_speed) = reading.wind_speed {
        within("wind_speed", wind_speed, 0.0, f64::MAX)?;
    }
    if let Some(uv_index) = reading.uv_index {
        within("uv_index", uv_index, 0.0, 11.0)?;
    }

    Ok(())
}

fn finite(field: &'static str, value: f64) -> Result<(), FrameError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(FrameError::NonFinite(field))
    }
}

fn within(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), FrameError> {
    finite(field, value)?;
    if value < min || value > max {
        return Err(FrameError::OutOfRange { field, value });
    }
    Ok(())
}
