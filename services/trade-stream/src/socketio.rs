//! Socket.IO over Engine.IO v4, websocket transport only
//!
//! Just enough of the protocol to subscribe to one server-emitted event:
//!
//! ```text
//! server  0{"sid":..,"pingInterval":..,"pingTimeout":..}   open
//! client  40                                                connect "/"
//! server  40{"sid":..}                                      connected
//! server  2            client  3                           ping / pong
//! server  42["tradeCreated",{..}]                           event
//! client  41                                                disconnect
//! ```
//!
//! `SocketIoProtocol` is a pure state machine: text frames in, `Step`s out.
//! The websocket adapter does the I/O.

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::error::ConnectionError;
use crate::events::FeedEvent;

/// Engine.IO protocol revision spoken by this client.
pub const ENGINE_IO_VERSION: &str = "4";

/// Engine.IO open handshake body.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    pub sid: String,
    #[serde(default)]
    pub upgrades: Vec<String>,
    /// Milliseconds between server pings.
    pub ping_interval: Option<u64>,
    /// Milliseconds the server waits for a pong.
    pub ping_timeout: Option<u64>,
    pub max_payload: Option<u64>,
}

/// Engine.IO transport packet.
#[derive(Debug, Clone, PartialEq)]
pub enum EnginePacket {
    Open(Handshake),
    Close,
    Ping(String),
    Pong(String),
    Message(String),
    Upgrade,
    Noop,
}

/// Socket.IO packet carried in an Engine.IO message.
#[derive(Debug, Clone, PartialEq)]
pub enum SocketPacket {
    Connect {
        namespace: String,
        data: Option<Value>,
    },
    Disconnect {
        namespace: String,
    },
    Event {
        namespace: String,
        ack_id: Option<u64>,
        name: String,
        args: Vec<Value>,
    },
    Ack {
        namespace: String,
        ack_id: Option<u64>,
    },
    ConnectError {
        namespace: String,
        data: Option<Value>,
    },
    /// Binary packet types; this client never subscribes to binary events.
    Binary,
}

/// Parse one Engine.IO text frame.
pub fn decode_engine(frame: &str) -> Result<EnginePacket, ConnectionError> {
    let mut chars = frame.chars();
    let kind = chars
        .next()
        .ok_or_else(|| ConnectionError::Protocol("empty engine.io frame".to_string()))?;
    let body = chars.as_str();

    match kind {
        '0' => {
            let handshake: Handshake = serde_json::from_str(body)
                .map_err(|e| ConnectionError::Protocol(format!("bad open handshake: {}", e)))?;
            Ok(EnginePacket::Open(handshake))
        }
        '1' => Ok(EnginePacket::Close),
        '2' => Ok(EnginePacket::Ping(body.to_string())),
        '3' => Ok(EnginePacket::Pong(body.to_string())),
        '4' => Ok(EnginePacket::Message(body.to_string())),
        '5' => Ok(EnginePacket::Upgrade),
        '6' => Ok(EnginePacket::Noop),
        other => Err(ConnectionError::Protocol(format!(
            "unknown engine.io packet type {:?}",
            other
        ))),
    }
}

/// Parse the Socket.IO packet inside an Engine.IO message.
pub fn decode_socket(payload: &str) -> Result<SocketPacket, ConnectionError> {
    let mut chars = payload.chars();
    let kind = chars
        .next()
        .ok_or_else(|| ConnectionError::Protocol("empty socket.io packet".to_string()))?;
    let rest = chars.as_str();

    if matches!(kind, '5' | '6') {
        return Ok(SocketPacket::Binary);
    }

    let (namespace, rest) = split_namespace(rest);
    let (ack_id, rest) = split_ack_id(rest);
    let data = if rest.is_empty() {
        None
    } else {
        Some(
            serde_json::from_str::<Value>(rest)
                .map_err(|e| ConnectionError::Protocol(format!("bad socket.io payload: {}", e)))?,
        )
    };

    match kind {
        '0' => Ok(SocketPacket::Connect { namespace, data }),
        '1' => Ok(SocketPacket::Disconnect { namespace }),
        '2' => {
            let mut items = match data {
                Some(Value::Array(items)) if !items.is_empty() => items,
                other => {
                    return Err(ConnectionError::Protocol(format!(
                        "event packet without [name, ..args]: {:?}",
                        other
                    )))
                }
            };
            let name = match items.remove(0) {
                Value::String(name) => name,
                other => {
                    return Err(ConnectionError::Protocol(format!(
                        "event name is not a string: {}",
                        other
                    )))
                }
            };
            Ok(SocketPacket::Event {
                namespace,
                ack_id,
                name,
                args: items,
            })
        }
        '3' => Ok(SocketPacket::Ack { namespace, ack_id }),
        '4' => Ok(SocketPacket::ConnectError { namespace, data }),
        other => Err(ConnectionError::Protocol(format!(
            "unknown socket.io packet type {:?}",
            other
        ))),
    }
}

fn split_namespace(rest: &str) -> (String, &str) {
    if rest.starts_with('/') {
        match rest.find(',') {
            Some(comma) => (rest[..comma].to_string(), &rest[comma + 1..]),
            None => (rest.to_string(), ""),
        }
    } else {
        ("/".to_string(), rest)
    }
}

fn split_ack_id(rest: &str) -> (Option<u64>, &str) {
    let digits = rest.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 {
        return (None, rest);
    }
    (rest[..digits].parse().ok(), &rest[digits..])
}

/// Client frame: Socket.IO connect to the default namespace.
pub fn encode_connect() -> String {
    "40".to_string()
}

/// Client frame: Socket.IO disconnect from the default namespace.
pub fn encode_disconnect() -> String {
    "41".to_string()
}

/// Client frame: Engine.IO pong echoing the ping probe.
pub fn encode_pong(probe: &str) -> String {
    format!("3{}", probe)
}

/// Work for the adapter after a frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Write this text frame to the socket.
    Send(String),
    /// Forward this event to the session.
    Emit(FeedEvent),
    /// Stop; the connection is over.
    Close(String),
}

/// Where the client is in the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolState {
    AwaitingOpen,
    Connecting,
    Connected,
    Closed,
}

/// Client-side protocol state machine for one subscription.
#[derive(Debug, Clone)]
pub struct SocketIoProtocol {
    event_name: String,
    state: ProtocolState,
    handshake: Option<Handshake>,
    ping_fallback: Duration,
}

impl SocketIoProtocol {
    pub fn new(event_name: impl Into<String>, ping_fallback: Duration) -> Self {
        Self {
            event_name: event_name.into(),
            state: ProtocolState::AwaitingOpen,
            handshake: None,
            ping_fallback,
        }
    }

    pub fn state(&self) -> ProtocolState {
        self.state
    }

    /// Silence after which the server is presumed gone.
    ///
    /// Engine.IO v4 servers ping every `pingInterval` and allow
    /// `pingTimeout` for the answer.
    pub fn liveness_timeout(&self) -> Duration {
        match &self.handshake {
            Some(Handshake {
                ping_interval: Some(interval),
                ping_timeout,
                ..
            }) => Duration::from_millis(interval + ping_timeout.unwrap_or(0)),
            _ => self.ping_fallback * 2,
        }
    }

    /// Feed one inbound text frame.
    pub fn on_frame(&mut self, frame: &str) -> Result<Vec<Step>, ConnectionError> {
        if self.state == ProtocolState::Closed {
            return Ok(Vec::new());
        }

        let steps = match decode_engine(frame)? {
            EnginePacket::Open(handshake) => {
                debug!(
                    sid = %handshake.sid,
                    ping_interval = ?handshake.ping_interval,
                    "Engine.IO handshake"
                );
                self.handshake = Some(handshake);
                self.state = ProtocolState::Connecting;
                vec![Step::Send(encode_connect())]
            }
            EnginePacket::Ping(probe) => vec![Step::Send(encode_pong(&probe))],
            EnginePacket::Close => {
                self.state = ProtocolState::Closed;
                vec![Step::Close("engine.io close".to_string())]
            }
            EnginePacket::Message(payload) => self.on_socket_packet(decode_socket(&payload)?),
            EnginePacket::Pong(_) | EnginePacket::Upgrade | EnginePacket::Noop => Vec::new(),
        };

        Ok(steps)
    }

    fn on_socket_packet(&mut self, packet: SocketPacket) -> Vec<Step> {
        match packet {
            SocketPacket::Connect { namespace, data } if namespace == "/" => {
                self.state = ProtocolState::Connected;
                let session = data
                    .as_ref()
                    .and_then(|d| d.get("sid"))
                    .and_then(Value::as_str)
                    .map(str::to_string);
                vec![Step::Emit(FeedEvent::Connected { session })]
            }
            SocketPacket::Event {
                namespace,
                name,
                mut args,
                ..
            } if namespace == "/" => {
                if name != self.event_name {
                    trace!(event = %name, "Ignoring unsubscribed event");
                    return Vec::new();
                }
                if args.is_empty() {
                    warn!(event = %name, "Event without payload");
                    return Vec::new();
                }
                vec![Step::Emit(FeedEvent::trade(args.remove(0)))]
            }
            SocketPacket::Disconnect { namespace } if namespace == "/" => {
                self.state = ProtocolState::Closed;
                vec![Step::Close("server disconnected namespace".to_string())]
            }
            SocketPacket::ConnectError { data, .. } => {
                self.state = ProtocolState::Closed;
                let reason = data
                    .as_ref()
                    .and_then(|d| d.get("message"))
                    .and_then(Value::as_str)
                    .unwrap_or("connect error")
                    .to_string();
                vec![Step::Close(reason)]
            }
            other => {
                trace!(packet = ?other, "Ignoring socket.io packet");
                Vec::new()
            }
        }
    }

    /// Frames to send when the client leaves.
    pub fn shutdown(&mut self) -> Vec<String> {
        let was_connected = self.state == ProtocolState::Connected;
        self.state = ProtocolState::Closed;
        if was_connected {
            vec![encode_disconnect()]
        } else {
            Vec::new()
        }
    }
}
