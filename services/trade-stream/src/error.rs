//! Error types for the trade stream service

use thiserror::Error;
use types::errors::PayloadError;

use crate::config::ConfigError;

/// Failures at the feed connection boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectionError {
    #[error("invalid endpoint {endpoint}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("failed to connect to {endpoint}: {reason}")]
    Connect { endpoint: String, reason: String },

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("connection already released")]
    Closed,
}

/// Top-level error for the service.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StreamError {
    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),

    #[error("Payload error: {0}")]
    Payload(#[from] PayloadError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_error_display() {
        let err = ConnectionError::Connect {
            endpoint: "wss://feed.example".to_string(),
            reason: "refused".to_string(),
        };
        assert_eq!(err.to_string(), "failed to connect to wss://feed.example: refused");
    }

    #[test]
    fn test_stream_error_from_payload_error() {
        let err: StreamError = PayloadError::MissingField { field: "sol_amount" }.into();
        assert!(matches!(err, StreamError::Payload(_)));
        assert_eq!(err.to_string(), "Payload error: Missing required field: sol_amount");
    }
}
