//! Transport seam between the socket client and the network.
//!
//! The client only needs "open a URL" and "give me the next event"; the
//! production implementation sits on `tokio-tungstenite`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::StreamExt;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::debug;

const CLOSE_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Something that happened on an open connection
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// One inbound text message
    Frame(String),
    /// Transport-level failure; the connection closes right after
    Error(String),
}

/// An open full-duplex connection, read from one event at a time
#[async_trait]
pub trait FrameStream: Send {
    /// Next event, or `None` once the connection is closed.
    /// Must be cancel-safe: the client races it against shutdown.
    async fn next_event(&mut self) -> Option<TransportEvent>;

    /// Closes the connection (best effort)
    async fn close(&mut self);
}

/// Opens connections to a stream endpoint
#[async_trait]
pub trait StreamConnector: Send + Sync {
    async fn open(&self, url: &str) -> Result<Box<dyn FrameStream>>;
}

/// WebSocket connector over `tokio-tungstenite` (ws and wss)
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

#[async_trait]
impl StreamConnector for WsConnector {
    async fn open(&self, url: &str) -> Result<Box<dyn FrameStream>> {
        let (socket, response) = tokio_tungstenite::connect_async(url)
            .await
            .with_context(|| format!("Failed to open WebSocket to {}", url))?;

        debug!(url = %url, status = %response.status(), "WebSocket handshake complete");

        Ok(Box::new(WsFrameStream {
            socket,
            failed: false,
        }))
    }
}

struct WsFrameStream {
    socket: WebSocketStream<MaybeTlsStream<TcpStream>>,
    /// Set after a read error; the stream reports closed from then on
    failed: bool,
}

#[async_trait]
impl FrameStream for WsFrameStream {
    async fn next_event(&mut self) -> Option<TransportEvent> {
        if self.failed {
            return None;
        }

        loop {
            match self.socket.next().await {
                Some(Ok(Message::Text(text))) => return Some(TransportEvent::Frame(text)),
                Some(Ok(Message::Binary(data))) => {
                    // Not part of the protocol; let the frame parser reject it
                    let text = String::from_utf8_lossy(&data).into_owned();
                    return Some(TransportEvent::Frame(text));
                }
                Some(Ok(Message::Close(frame))) => {
                    debug!(close_frame = ?frame, "Server closed WebSocket");
                    return None;
                }
                Some(Ok(_)) => {
                    // Ping/pong are answered by tungstenite itself
                    continue;
                }
                Some(Err(e)) => {
                    self.failed = true;
                    return Some(TransportEvent::Error(e.to_string()));
                }
                None => return None,
            }
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.socket.close(None).await {
            debug!(error = %e, "WebSocket close handshake failed");
        }
        // Drain until the peer acknowledges, the stream ends, or we give up
        let drain = async { while let Some(Ok(_)) = self.socket.next().await {} };
        let _ = tokio::time::timeout(CLOSE_DRAIN_TIMEOUT, drain).await;
    }
}
