//! Error types for decoding feed payloads
//!
//! Payload errors are local to the ingestion boundary: they are logged and
//! counted, never surfaced to the user.

use thiserror::Error;

/// Failure to turn a raw `tradeCreated` payload into a `TradeEvent`
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PayloadError {
    #[error("Payload is not valid JSON: {0}")]
    Json(String),

    #[error("Payload is not a JSON object")]
    NotAnObject,

    #[error("Missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("Invalid number in field {field}: {reason}")]
    InvalidNumber { field: &'static str, reason: String },
}

impl From<serde_json::Error> for PayloadError {
    fn from(err: serde_json::Error) -> Self {
        PayloadError::Json(err.to_string())
    }
}

impl PayloadError {
    /// Field name involved in the error, if any.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            PayloadError::MissingField { field } | PayloadError::InvalidNumber { field, .. } => {
                Some(*field)
            }
            PayloadError::Json(_) | PayloadError::NotAnObject => None,
        }
    }
}
