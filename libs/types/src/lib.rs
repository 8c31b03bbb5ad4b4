//! Types library for the real-time trade stream
//!
//! Shared definitions for everything that flows from the feed connection
//! into the session: identifiers, fixed-point amounts, the immutable trade
//! event and its wire shape, and the payload error taxonomy.
//!
//! # Modules
//! - `ids`: Unique identifiers (EventId, SessionId)
//! - `numeric`: Native-unit amounts and fixed two-decimal display
//! - `trade`: `TradeEvent` and the `tradeCreated` wire payload
//! - `errors`: Payload decoding errors

pub mod errors;
pub mod ids;
pub mod numeric;
pub mod trade;

// Library version constant
pub const LIB_VERSION: &str = "1.0.0";

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::errors::*;
    pub use crate::ids::*;
    pub use crate::numeric::*;
    pub use crate::trade::*;
}
