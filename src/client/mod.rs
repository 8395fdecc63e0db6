// Telemetry socket client: connection lifecycle, backoff, frame ingestion

mod backoff;
mod session;
mod socket;
mod stats;
pub mod transport;

pub use backoff::ReconnectPolicy;
pub use socket::TelemetryClient;
pub use stats::{ClientStats, StatsSnapshot};
pub use transport::{FrameStream, StreamConnector, TransportEvent, WsConnector};
