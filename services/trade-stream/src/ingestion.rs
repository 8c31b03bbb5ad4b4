//! Payload ingestion for the trade stream
//!
//! Turns raw `tradeCreated` payloads into validated `TradeEvent`s under the
//! configured `MalformedPolicy`. Rejected payloads are logged and counted
//! here and never reach the buffer.

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, info, warn};
use types::errors::PayloadError;
use types::trade::{MalformedPolicy, TradeCreatedPayload, TradeEvent};

/// Decodes feed payloads and keeps acceptance statistics.
#[derive(Debug)]
pub struct PayloadDecoder {
    policy: MalformedPolicy,
    /// Total payloads decoded into events.
    events_accepted: u64,
    /// Total payloads rejected.
    events_dropped: u64,
    /// Total accepted payloads that needed at least one zero-filled field.
    events_defaulted: u64,
}

impl PayloadDecoder {
    pub fn new(policy: MalformedPolicy) -> Self {
        info!(policy = ?policy, "PayloadDecoder initialized");

        Self {
            policy,
            events_accepted: 0,
            events_dropped: 0,
            events_defaulted: 0,
        }
    }

    /// Decode a single payload.
    ///
    /// On error the payload has already been logged and counted; callers
    /// only need to skip it.
    pub fn decode(
        &mut self,
        payload: Value,
        received_at: DateTime<Utc>,
    ) -> Result<TradeEvent, PayloadError> {
        let decoded = TradeCreatedPayload::from_value(payload)
            .and_then(|wire| TradeEvent::decode(wire, self.policy, received_at));

        match decoded {
            Ok(decoded) => {
                self.events_accepted += 1;
                if !decoded.defaulted.is_empty() {
                    self.events_defaulted += 1;
                    debug!(
                        event_id = %decoded.event.id(),
                        fields = ?decoded.defaulted,
                        "Missing numeric fields defaulted to zero"
                    );
                }
                Ok(decoded.event)
            }
            Err(err) => {
                self.events_dropped += 1;
                warn!(
                    error = %err,
                    field = err.field().unwrap_or("-"),
                    dropped_total = self.events_dropped,
                    "Dropping malformed trade payload"
                );
                Err(err)
            }
        }
    }

    pub fn policy(&self) -> MalformedPolicy {
        self.policy
    }

    pub fn events_accepted(&self) -> u64 {
        self.events_accepted
    }

    pub fn events_dropped(&self) -> u64 {
        self.events_dropped
    }

    pub fn events_defaulted(&self) -> u64 {
        self.events_defaulted
    }
}
