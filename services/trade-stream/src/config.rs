//! Session configuration
//!
//! One struct covers the feed endpoint, the pin tolerance, retention and
//! row layout. Every field has a default, so a JSON document only needs
//! the keys it overrides.

use serde::{Deserialize, Serialize};
use types::trade::MalformedPolicy;

/// Errors found while validating a configuration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid configuration document: {0}")]
    Parse(String),

    #[error("pin tolerance must be finite and non-negative, got {0}")]
    InvalidTolerance(f64),

    #[error("row height must be finite and positive, got {0}")]
    InvalidRowHeight(f64),

    #[error("header height must be finite and non-negative, got {0}")]
    InvalidHeaderHeight(f64),

    #[error("retention window must hold at least one event")]
    ZeroRetention,

    #[error("column {0} must be at least one character wide")]
    ZeroColumnWidth(&'static str),

    #[error("channel capacity must be non-zero")]
    ZeroChannelCapacity,
}

/// Configuration for one trade stream session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Feed origin, e.g. `wss://frontend-api-v3.pump.fun`.
    pub endpoint: String,
    /// Socket.IO mount path on the endpoint.
    pub socket_path: String,
    /// Socket.IO event carrying trade payloads.
    pub event_name: String,
    /// Scroll offset at or below which the user counts as pinned to the newest edge.
    pub pin_tolerance: f64,
    /// Keep at most this many events; `None` keeps the whole session history.
    pub max_retained: Option<usize>,
    /// Handling of payloads missing required numeric fields.
    pub malformed_policy: MalformedPolicy,
    /// Extent of one rendered row on the headless surface.
    pub row_height: f64,
    /// Extent of the sticky header on the headless surface.
    pub header_height: f64,
    /// Visible characters of the name column before truncation.
    pub name_width: usize,
    /// Visible characters of the symbol column before truncation.
    pub symbol_width: usize,
    /// Capacity of the adapter -> session channel.
    pub channel_capacity: usize,
    /// Client ping interval used when the server handshake omits one.
    pub ping_fallback_secs: u64,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            endpoint: "wss://frontend-api-v3.pump.fun".to_string(),
            socket_path: "/socket.io".to_string(),
            event_name: "tradeCreated".to_string(),
            pin_tolerance: 10.0,
            max_retained: None,
            malformed_policy: MalformedPolicy::Drop,
            row_height: 24.0,
            header_height: 0.0,
            name_width: 24,
            symbol_width: 10,
            channel_capacity: 1024,
            ping_fallback_secs: 25,
        }
    }
}

impl StreamConfig {
    /// Parse and validate a JSON configuration document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: StreamConfig =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.pin_tolerance.is_finite() || self.pin_tolerance < 0.0 {
            return Err(ConfigError::InvalidTolerance(self.pin_tolerance));
        }
        if !self.row_height.is_finite() || self.row_height <= 0.0 {
            return Err(ConfigError::InvalidRowHeight(self.row_height));
        }
        if !self.header_height.is_finite() || self.header_height < 0.0 {
            return Err(ConfigError::InvalidHeaderHeight(self.header_height));
        }
        if self.max_retained == Some(0) {
            return Err(ConfigError::ZeroRetention);
        }
        if self.name_width == 0 {
            return Err(ConfigError::ZeroColumnWidth("name"));
        }
        if self.symbol_width == 0 {
            return Err(ConfigError::ZeroColumnWidth("symbol"));
        }
        if self.channel_capacity == 0 {
            return Err(ConfigError::ZeroChannelCapacity);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = StreamConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.pin_tolerance, 10.0);
        assert_eq!(config.max_retained, None);
        assert_eq!(config.malformed_policy, MalformedPolicy::Drop);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = StreamConfig::from_json(
            r#"{"pin_tolerance": 4.0, "malformed_policy": "default_to_zero", "max_retained": 500}"#,
        )
        .unwrap();

        assert_eq!(config.pin_tolerance, 4.0);
        assert_eq!(config.malformed_policy, MalformedPolicy::DefaultToZero);
        assert_eq!(config.max_retained, Some(500));
        assert_eq!(config.event_name, "tradeCreated");
    }

    #[test]
    fn test_rejects_negative_tolerance() {
        let config = StreamConfig {
            pin_tolerance: -1.0,
            ..StreamConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidTolerance(-1.0)));
    }

    #[test]
    fn test_rejects_zero_retention() {
        let result = StreamConfig::from_json(r#"{"max_retained": 0}"#);
        assert_eq!(result, Err(ConfigError::ZeroRetention));
    }

    #[test]
    fn test_rejects_zero_row_height() {
        let config = StreamConfig {
            row_height: 0.0,
            ..StreamConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidRowHeight(_))));
    }

    #[test]
    fn test_rejects_bad_document() {
        let result = StreamConfig::from_json("{ nope");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }
}
