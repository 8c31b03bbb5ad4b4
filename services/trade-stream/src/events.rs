//! Events delivered by a connection adapter to the session
//!
//! Adapters stamp arrival time and forward the raw payload; decoding is the
//! session's job so that one malformed-input policy applies to every
//! adapter.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One delivery from the feed connection, in arrival order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeedEvent {
    /// Handshake completed; trades may follow.
    Connected { session: Option<String> },
    /// A subscribed trade event with its untouched payload.
    Trade {
        payload: Value,
        received_at: DateTime<Utc>,
    },
    /// The connection ended. Nothing follows.
    Closed { reason: String },
}

impl FeedEvent {
    /// Wrap a payload received now.
    pub fn trade(payload: Value) -> Self {
        FeedEvent::Trade {
            payload,
            received_at: Utc::now(),
        }
    }

    /// Get the event kind as a string label for logging.
    pub fn kind_label(&self) -> &'static str {
        match self {
            FeedEvent::Connected { .. } => "Connected",
            FeedEvent::Trade { .. } => "Trade",
            FeedEvent::Closed { .. } => "Closed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, FeedEvent::Closed { .. })
    }
}
