use crate::client::socket::{Inner, Retire};
use crate::client::transport::{FrameStream, TransportEvent};
use crate::frame::{parse_frame, InboundFrame};
use crate::telemetry::ConnectionState;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::sync::{watch, Notify};
use tracing::{debug, info, warn};

/// How a connection's frame loop ended
enum PumpEnd {
    /// Peer closed, or the transport failed and closed
    Closed,
    /// Client disconnected (or replaced) this session
    Cancelled,
}

/// One session: connect, pump frames, and reconnect with backoff until
/// cancelled or out of attempts.
pub(super) async fn run_session(
    inner: Arc<Inner>,
    generation: u64,
    mut shutdown: watch::Receiver<bool>,
    retry_now: Arc<Notify>,
) {
    // `connect()` already published `connecting` for the first attempt
    let mut first_attempt = true;

    loop {
        if !first_attempt && !inner.set_status(generation, ConnectionState::Connecting) {
            return;
        }
        first_attempt = false;

        let url = inner.stream_url();
        let opened = tokio::select! {
            _ = shutdown.changed() => return,
            result = inner.connector.open(&url) => result,
        };

        match opened {
            Ok(mut stream) => {
                let live = inner.publish(generation, |store| {
                    inner.retry_count.store(0, Ordering::SeqCst);
                    inner.stats.record_open();
                    store.set_connection_status(ConnectionState::Connected);
                });
                if !live {
                    stream.close().await;
                    return;
                }
                info!(url = %url, "Telemetry stream connected");

                match pump(&inner, generation, &mut *stream, &mut shutdown).await {
                    PumpEnd::Cancelled => {
                        stream.close().await;
                        return;
                    }
                    PumpEnd::Closed => info!(url = %url, "Telemetry stream closed"),
                }
            }
            Err(e) => {
                let detail = format!("{:#}", e);
                warn!(url = %url, error = %detail, "Telemetry stream failed to open");
                if !inner.set_status(generation, ConnectionState::Error) {
                    return;
                }
            }
        }

        // Registered before `disconnected` is published so a `connect()`
        // that observes it always wakes the delay below
        let retry = retry_now.notified();
        tokio::pin!(retry);
        retry.as_mut().enable();

        let live = inner.publish(generation, |store| {
            inner.retry_requested.store(false, Ordering::SeqCst);
            store.set_connection_status(ConnectionState::Disconnected);
        });
        if !live {
            return;
        }

        let attempt = inner.retry_count.load(Ordering::SeqCst);
        let Some(delay) = inner.policy.delay_for(attempt) else {
            match inner.retire(generation) {
                Retire::Retry => {
                    debug!(attempts = attempt, "Connect requested while giving up, retrying");
                    continue;
                }
                Retire::Done => warn!(
                    attempts = attempt,
                    max_attempts = inner.policy.max_attempts,
                    "Reconnect attempts exhausted, giving up"
                ),
                Retire::Cancelled => {}
            }
            return;
        };

        inner.retry_count.store(attempt + 1, Ordering::SeqCst);
        inner.stats.record_reconnect_scheduled();
        info!(
            attempt = attempt + 1,
            max_attempts = inner.policy.max_attempts,
            delay_ms = delay.as_millis() as u64,
            "Scheduling reconnect"
        );

        tokio::select! {
            _ = shutdown.changed() => return,
            _ = &mut retry => debug!("Reconnect requested before delay elapsed"),
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

/// Reads events until the connection closes or the session is cancelled.
async fn pump(
    inner: &Inner,
    generation: u64,
    stream: &mut dyn FrameStream,
    shutdown: &mut watch::Receiver<bool>,
) -> PumpEnd {
    loop {
        let event = tokio::select! {
            _ = shutdown.changed() => return PumpEnd::Cancelled,
            event = stream.next_event() => event,
        };

        match event {
            Some(TransportEvent::Frame(text)) => {
                if !handle_frame(inner, generation, &text) {
                    return PumpEnd::Cancelled;
                }
            }
            Some(TransportEvent::Error(e)) => {
                warn!(error = %e, "Telemetry stream transport error");
                if !inner.set_status(generation, ConnectionState::Error) {
                    return PumpEnd::Cancelled;
                }
            }
            None => return PumpEnd::Closed,
        }
    }
}

/// Parses one frame and applies it. Malformed frames are logged and
/// dropped without touching the store. Returns false if the session is no
/// longer live.
fn handle_frame(inner: &Inner, generation: u64, text: &str) -> bool {
    inner.stats.record_frame();

    match parse_frame(text) {
        Ok(InboundFrame::Handshake { farm_id }) => {
            inner.stats.record_handshake();
            debug!(farm_id = ?farm_id, "Stream handshake received");
            true
        }
        Ok(InboundFrame::Telemetry(frame)) => {
            debug!(
                tick = ?frame.reading.simulation_tick,
                alerts = frame.alerts.len(),
                "Telemetry frame received"
            );
            inner.apply_frame(generation, frame)
        }
        Err(e) => {
            inner.stats.record_rejected();
            warn!(error = %e, "Discarding malformed telemetry frame");
            true
        }
    }
}
