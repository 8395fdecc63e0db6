// Telemetry store: latest reading, bounded history and alerts, stream status

mod buffer;
mod engine;
mod view;

pub use buffer::BoundedBuffer;
pub use engine::{
    TelemetrySnapshot, TelemetryStore, DEFAULT_MAX_ALERTS, DEFAULT_MAX_HISTORICAL_POINTS,
};
pub use view::StoreView;
