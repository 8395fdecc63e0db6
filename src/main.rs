use agri_telemetry::config::TelemetryConfig;
use agri_telemetry::telemetry::ConnectionState;
use agri_telemetry::{TelemetryClient, TelemetrySnapshot};
use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{info, warn};

/// What the console has already reported
#[derive(Default)]
struct Reported {
    status: ConnectionState,
    last_timestamp: Option<String>,
    alert_ids: HashSet<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "agri_telemetry=info".into()),
        )
        .init();

    // Config file: AGRI_CONFIG, else ./agri-telemetry.toml when present
    let config_path = std::env::var("AGRI_CONFIG")
        .ok()
        .map(PathBuf::from)
        .or_else(|| {
            let default = PathBuf::from("agri-telemetry.toml");
            default.exists().then_some(default)
        });
    let config = TelemetryConfig::load(config_path.as_deref())
        .context("Failed to load configuration")?;

    info!(
        stream_url = %config.stream.url,
        farm_id = %config.stream.farm_id,
        reconnect_interval_ms = config.reconnect.interval_ms,
        max_reconnect_attempts = config.reconnect.max_attempts,
        "Configuration loaded"
    );

    let client = TelemetryClient::new(&config);
    let view = client.store();
    let mut updates = view.subscribe();
    let mut reported = Reported::default();
    let mut health = tokio::time::interval(Duration::from_secs(1));

    client.connect();

    let outcome = loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, shutting down");
                break Ok(());
            }
            update = updates.recv() => match update {
                Ok(snapshot) => report(&snapshot, &mut reported),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped = skipped, "Console lagged, skipped store updates");
                }
                Err(broadcast::error::RecvError::Closed) => break Ok(()),
            },
            _ = health.tick() => {
                if view.connection_status() == ConnectionState::Error && !client.is_active() {
                    break Err(anyhow::anyhow!(
                        "telemetry stream disconnected after {} reconnect attempts, please retry",
                        config.reconnect.max_attempts
                    ));
                }
            }
        }
    };

    client.disconnect();

    let stats = client.stats();
    info!(
        frames_received = stats.frames_received,
        frames_rejected = stats.frames_rejected,
        connections_opened = stats.connections_opened,
        reconnects_scheduled = stats.reconnects_scheduled,
        "Session finished"
    );

    outcome
}

fn report(snapshot: &TelemetrySnapshot, reported: &mut Reported) {
    if snapshot.connection_status != reported.status {
        reported.status = snapshot.connection_status;
        match snapshot.connection_status {
            ConnectionState::Error => warn!("Telemetry stream error"),
            status => info!(status = %status, "Connection status changed"),
        }
    }

    if let Some(reading) = &snapshot.current_reading {
        if reported.last_timestamp.as_deref() != Some(reading.timestamp.as_str()) {
            reported.last_timestamp = Some(reading.timestamp.clone());
            info!(
                tick = ?reading.simulation_tick,
                temperature = reading.temperature,
                humidity = reading.humidity,
                soil_moisture = reading.soil_moisture,
                pressure = reading.pressure,
                raining = reading.is_raining,
                simulation = %snapshot.simulation_status,
                "Reading"
            );
        }
    }

    for alert in &snapshot.alerts {
        if reported.alert_ids.insert(alert.id.clone()) {
            warn!(
                kind = %alert.kind,
                severity = %alert.severity,
                message = %alert.message,
                "{}",
                alert.title
            );
        }
    }
    // Forget alerts that have been evicted or dismissed
    reported
        .alert_ids
        .retain(|id| snapshot.alerts.iter().any(|a| &a.id == id));
}
