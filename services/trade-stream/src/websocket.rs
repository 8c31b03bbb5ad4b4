//! Socket.IO feed adapter over a websocket
//!
//! Connects once per subscription, speaks `SocketIoProtocol`, and forwards
//! subscribed events into the session channel. There is no reconnect: when
//! the socket ends, the adapter sends `FeedEvent::Closed` and stops.
//! Releasing the subscription sends a Socket.IO disconnect and closes the
//! socket.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::oneshot;
use tokio::time::sleep;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::StreamConfig;
use crate::connection::{ConnectionAdapter, FeedSender, Subscription};
use crate::error::ConnectionError;
use crate::events::FeedEvent;
use crate::socketio::{SocketIoProtocol, Step, ENGINE_IO_VERSION};

/// Adapter for a Socket.IO server reached over `ws://` or `wss://`.
#[derive(Debug, Clone)]
pub struct SocketIoAdapter {
    endpoint: String,
    socket_path: String,
    event_name: String,
    ping_fallback: Duration,
}

impl SocketIoAdapter {
    pub fn new(config: &StreamConfig) -> Self {
        Self {
            endpoint: config.endpoint.clone(),
            socket_path: config.socket_path.clone(),
            event_name: config.event_name.clone(),
            ping_fallback: Duration::from_secs(config.ping_fallback_secs),
        }
    }

    /// Full websocket URL, e.g.
    /// `wss://host/socket.io/?EIO=4&transport=websocket`.
    pub fn socket_url(&self) -> Result<Url, ConnectionError> {
        let invalid = |reason: String| ConnectionError::InvalidEndpoint {
            endpoint: self.endpoint.clone(),
            reason,
        };

        let mut url = Url::parse(&self.endpoint).map_err(|e| invalid(e.to_string()))?;
        let scheme = match url.scheme() {
            "ws" | "http" => "ws",
            "wss" | "https" => "wss",
            other => return Err(invalid(format!("unsupported scheme {}", other))),
        };
        url.set_scheme(scheme)
            .map_err(|_| invalid(format!("cannot use scheme {}", scheme)))?;

        url.set_path(&format!("{}/", self.socket_path.trim_end_matches('/')));
        url.query_pairs_mut()
            .clear()
            .append_pair("EIO", ENGINE_IO_VERSION)
            .append_pair("transport", "websocket");
        Ok(url)
    }
}

impl ConnectionAdapter for SocketIoAdapter {
    /// Spawns the connection task on the current Tokio runtime.
    fn subscribe(&mut self, sink: FeedSender) -> Result<Subscription, ConnectionError> {
        let url = self.socket_url()?;
        let runtime = tokio::runtime::Handle::try_current().map_err(|e| ConnectionError::Connect {
            endpoint: url.to_string(),
            reason: e.to_string(),
        })?;

        let (stop_tx, stop_rx) = oneshot::channel();
        let protocol = SocketIoProtocol::new(self.event_name.clone(), self.ping_fallback);
        let label = url.to_string();

        info!(url = %url, event = %self.event_name, "Subscribing to feed");
        runtime.spawn(run_connection(url, protocol, sink, stop_rx));

        Ok(Subscription::new(label, move || {
            let _ = stop_tx.send(());
        }))
    }
}

async fn run_connection(
    url: Url,
    mut protocol: SocketIoProtocol,
    sink: FeedSender,
    stop: oneshot::Receiver<()>,
) {
    let reason = match drive(&url, &mut protocol, &sink, stop).await {
        Ok(reason) => reason,
        Err(err) => {
            warn!(url = %url, error = %err, "Feed connection failed");
            err.to_string()
        }
    };

    info!(url = %url, %reason, "Feed connection ended");
    // The session may already be gone; nothing to do then.
    let _ = sink.send(FeedEvent::Closed { reason }).await;
}

async fn drive(
    url: &Url,
    protocol: &mut SocketIoProtocol,
    sink: &FeedSender,
    mut stop: oneshot::Receiver<()>,
) -> Result<String, ConnectionError> {
    let (ws, _) = connect_async(url.as_str())
        .await
        .map_err(|e| ConnectionError::Connect {
            endpoint: url.to_string(),
            reason: e.to_string(),
        })?;
    let (mut write, mut read) = ws.split();
    debug!(url = %url, "Websocket open");

    loop {
        tokio::select! {
            _ = &mut stop => {
                for frame in protocol.shutdown() {
                    let _ = write.send(Message::Text(frame)).await;
                }
                let _ = write.send(Message::Close(None)).await;
                return Ok("subscription released".to_string());
            }
            _ = sleep(protocol.liveness_timeout()) => {
                return Err(ConnectionError::Protocol("server stopped pinging".to_string()));
            }
            msg = read.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    for step in frame_steps(protocol, &text) {
                        match step {
                            Step::Send(frame) => write
                                .send(Message::Text(frame))
                                .await
                                .map_err(|e| ConnectionError::Protocol(e.to_string()))?,
                            Step::Emit(event) => {
                                if sink.send(event).await.is_err() {
                                    return Ok("session closed".to_string());
                                }
                            }
                            Step::Close(reason) => return Ok(reason),
                        }
                    }
                }
                Some(Ok(Message::Ping(payload))) => {
                    let _ = write.send(Message::Pong(payload)).await;
                }
                Some(Ok(Message::Close(frame))) => {
                    return Ok(format!("server closed socket: {:?}", frame));
                }
                Some(Ok(_)) => {}
                Some(Err(err)) => return Err(ConnectionError::Protocol(err.to_string())),
                None => return Ok("socket ended".to_string()),
            }
        }
    }
}

/// Steps for one inbound frame. A frame that fails to decode is logged and
/// skipped; only transport failures end the connection.
fn frame_steps(protocol: &mut SocketIoProtocol, text: &str) -> Vec<Step> {
    match protocol.on_frame(text) {
        Ok(steps) => steps,
        Err(err) => {
            warn!(error = %err, frame_len = text.len(), "Skipping undecodable frame");
            Vec::new()
        }
    }
}
