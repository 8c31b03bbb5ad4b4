//! Trade notification types
//!
//! `TradeCreatedPayload` is the loose wire shape of a `tradeCreated` feed
//! message; `TradeEvent` is the validated, immutable record the session
//! stores. Unknown feed fields ride along in `extra` untouched.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::PayloadError;
use crate::ids::EventId;
use crate::numeric::{decimal_from_json, NativeAmount};

/// What to do with a payload whose required numeric field is absent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MalformedPolicy {
    /// Reject the payload; the caller drops it with a warning.
    #[default]
    Drop,
    /// Substitute zero for the missing value.
    DefaultToZero,
}

/// Raw `tradeCreated` payload as it arrives on the wire.
///
/// Every known field is optional here so that a missing field is reported
/// by name instead of as an opaque JSON error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TradeCreatedPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_cap: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usd_market_cap: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sol_amount: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Value>,
    /// Fields this crate does not interpret.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl TradeCreatedPayload {
    /// Parse a payload from a JSON value; the value must be an object.
    pub fn from_value(value: Value) -> Result<Self, PayloadError> {
        if !value.is_object() {
            return Err(PayloadError::NotAnObject);
        }
        Ok(serde_json::from_value(value)?)
    }
}

/// One received trade notification.
///
/// Fields are private and there are no setters: once decoded, an event is
/// never changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeEvent {
    id: EventId,
    name: String,
    symbol: String,
    /// Smallest-unit amount; divide by 10^9 for display.
    sol_amount: NativeAmount,
    market_cap: Decimal,
    usd_market_cap: Decimal,
    creator: String,
    /// Feed-supplied timestamp, passed through as received.
    timestamp: i64,
    /// Local arrival time.
    received_at: DateTime<Utc>,
    extra: BTreeMap<String, Value>,
}

/// A decoded event plus the names of numeric fields that were zero-filled.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    pub event: TradeEvent,
    pub defaulted: Vec<&'static str>,
}

impl TradeEvent {
    /// Create an event directly from typed values.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: impl Into<String>,
        symbol: impl Into<String>,
        sol_amount: NativeAmount,
        market_cap: Decimal,
        usd_market_cap: Decimal,
        creator: impl Into<String>,
        timestamp: i64,
        received_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: EventId::new(),
            name: name.into(),
            symbol: symbol.into(),
            sol_amount,
            market_cap,
            usd_market_cap,
            creator: creator.into(),
            timestamp,
            received_at,
            extra: BTreeMap::new(),
        }
    }

    /// Attach a passthrough field while constructing an event.
    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Validate a wire payload into an event.
    ///
    /// Present-but-invalid numbers are always rejected. Missing numbers are
    /// rejected under `MalformedPolicy::Drop` and zero-filled under
    /// `MalformedPolicy::DefaultToZero`. Missing text becomes empty.
    pub fn decode(
        payload: TradeCreatedPayload,
        policy: MalformedPolicy,
        received_at: DateTime<Utc>,
    ) -> Result<Decoded, PayloadError> {
        let mut defaulted = Vec::new();

        let mut numeric = |field: &'static str, value: &Option<Value>| -> Result<Decimal, PayloadError> {
            match value {
                Some(v) => decimal_from_json(field, v),
                None => match policy {
                    MalformedPolicy::Drop => Err(PayloadError::MissingField { field }),
                    MalformedPolicy::DefaultToZero => {
                        defaulted.push(field);
                        Ok(Decimal::ZERO)
                    }
                },
            }
        };

        let sol_units = numeric("sol_amount", &payload.sol_amount)?;
        let market_cap = numeric("market_cap", &payload.market_cap)?;
        let usd_market_cap = numeric("usd_market_cap", &payload.usd_market_cap)?;
        let timestamp = numeric("timestamp", &payload.timestamp)?;

        let sol_amount = NativeAmount::try_new(sol_units).ok_or_else(|| PayloadError::InvalidNumber {
            field: "sol_amount",
            reason: format!("negative amount {}", sol_units),
        })?;
        let timestamp = timestamp.trunc().to_i64().ok_or_else(|| PayloadError::InvalidNumber {
            field: "timestamp",
            reason: format!("out of range {}", timestamp),
        })?;

        let event = Self {
            id: EventId::new(),
            name: text(payload.name),
            symbol: text(payload.symbol),
            sol_amount,
            market_cap,
            usd_market_cap,
            creator: text(payload.creator),
            timestamp,
            received_at,
            extra: payload.extra,
        };

        Ok(Decoded { event, defaulted })
    }

    pub fn id(&self) -> EventId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn sol_amount(&self) -> NativeAmount {
        self.sol_amount
    }

    pub fn market_cap(&self) -> Decimal {
        self.market_cap
    }

    pub fn usd_market_cap(&self) -> Decimal {
        self.usd_market_cap
    }

    pub fn creator(&self) -> &str {
        &self.creator
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }

    /// Feed fields not interpreted by this crate, exactly as received.
    pub fn extra(&self) -> &BTreeMap<String, Value> {
        &self.extra
    }

    /// Rebuild the wire object: known fields plus passthrough fields.
    pub fn to_wire_json(&self) -> Value {
        let mut map: Map<String, Value> = self
            .extra
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        map.insert("name".to_string(), Value::String(self.name.clone()));
        map.insert("symbol".to_string(), Value::String(self.symbol.clone()));
        map.insert("creator".to_string(), Value::String(self.creator.clone()));
        map.insert("sol_amount".to_string(), decimal_to_json(self.sol_amount.units()));
        map.insert("market_cap".to_string(), decimal_to_json(self.market_cap));
        map.insert("usd_market_cap".to_string(), decimal_to_json(self.usd_market_cap));
        map.insert("timestamp".to_string(), Value::from(self.timestamp));
        Value::Object(map)
    }
}

fn text(value: Option<Value>) -> String {
    match value {
        Some(Value::String(s)) => s,
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

fn decimal_to_json(value: Decimal) -> Value {
    if value.fract().is_zero() {
        if let Some(i) = value.to_i64() {
            return Value::from(i);
        }
    }
    value
        .to_f64()
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}
