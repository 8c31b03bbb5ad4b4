//! Trade Stream Service
//!
//! Keeps a newest-first list of live `tradeCreated` events and preserves the
//! user's reading position while new rows are inserted above it:
//! - Socket.IO feed adapter with scoped subscriptions
//! - Payload decoding with a configurable malformed-payload policy
//! - Append-only newest-first buffer with optional retention cap
//! - Scroll intent tracking (pinned to top vs. reading older rows)
//! - Scroll anchoring from measured content growth
//! - Fixed-width row rendering with two-decimal display amounts
//!
//! # Architecture
//!
//! ```text
//!   Socket.IO feed            View
//!        │                     │ scroll
//!   ┌────▼─────┐          ┌────▼────┐
//!   │ Adapter  │          │ Intent  │
//!   └────┬─────┘          └────┬────┘
//!        │ FeedEvent           │ pinned?
//!   ┌────▼─────┐               │
//!   │ Decode   │               │
//!   └────┬─────┘               │
//!        │                     │
//! ┌──────▼─────────────────────▼──┐
//! │ Session: append → render →    │
//! │          measure → correct    │
//! └──────────────┬────────────────┘
//!                │
//!           ┌────▼────┐
//!           │ Surface │
//!           └─────────┘
//! ```

pub mod anchoring;
pub mod buffer;
pub mod config;
pub mod connection;
pub mod error;
pub mod events;
pub mod ingestion;
pub mod intent;
pub mod metrics;
pub mod render;
pub mod runner;
pub mod session;
pub mod socketio;
pub mod websocket;

// Library version
pub const SERVICE_VERSION: &str = "0.1.0";
