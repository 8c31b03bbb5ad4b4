//! Trade stream session
//!
//! Owns the buffer, the scroll state and the feed subscription for one
//! viewing session. Each trade is applied as one uninterrupted unit:
//!
//! ```text
//! append -> render -> measure -> correct offset
//! ```
//!
//! Everything happens inside a single `&mut self` call, so the correction
//! for one event always lands before the next event is appended.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};
use types::errors::PayloadError;
use types::ids::SessionId;
use types::trade::TradeEvent;

use crate::anchoring::{AnchorAction, AnchoringController, Correction};
use crate::buffer::EventBuffer;
use crate::config::StreamConfig;
use crate::connection::Subscription;
use crate::error::StreamError;
use crate::events::FeedEvent;
use crate::ingestion::PayloadDecoder;
use crate::intent::ScrollIntentTracker;
use crate::metrics::StreamMetrics;
use crate::render::{render_rows, ColumnWidths, Surface};

/// What happened to one delivery.
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    /// Trade appended and the viewport corrected.
    Applied(Correction),
    /// Payload rejected by ingestion; nothing changed.
    Dropped(PayloadError),
    /// Connection status event; nothing changed.
    Status,
    /// Arrived after teardown; nothing changed.
    Ignored,
}

/// One viewing session over the trade feed.
pub struct TradeStreamSession<S: Surface> {
    id: SessionId,
    widths: ColumnWidths,
    buffer: EventBuffer,
    decoder: PayloadDecoder,
    tracker: ScrollIntentTracker,
    controller: AnchoringController,
    surface: S,
    subscription: Option<Subscription>,
    torn_down: bool,
    metrics: Arc<StreamMetrics>,
}

impl<S: Surface> TradeStreamSession<S> {
    /// Create an empty session rendering onto `surface`.
    pub fn new(config: &StreamConfig, surface: S) -> Result<Self, StreamError> {
        config.validate()?;

        let buffer = match config.max_retained {
            Some(max) => EventBuffer::with_retention(max),
            None => EventBuffer::new(),
        };
        let id = SessionId::new();

        info!(
            session = %id,
            pin_tolerance = config.pin_tolerance,
            max_retained = ?config.max_retained,
            "Trade stream session started"
        );

        Ok(Self {
            id,
            widths: ColumnWidths {
                name: config.name_width,
                symbol: config.symbol_width,
            },
            buffer,
            decoder: PayloadDecoder::new(config.malformed_policy),
            tracker: ScrollIntentTracker::new(config.pin_tolerance),
            controller: AnchoringController::new(),
            surface,
            subscription: None,
            torn_down: false,
            metrics: Arc::new(StreamMetrics::new()),
        })
    }

    /// Take ownership of the feed subscription.
    ///
    /// A session that is already torn down releases it on the spot.
    pub fn attach(&mut self, mut subscription: Subscription) {
        if self.torn_down {
            warn!(session = %self.id, "Subscription attached after teardown, releasing");
            subscription.release();
            return;
        }
        if let Some(mut previous) = self.subscription.replace(subscription) {
            previous.release();
        }
    }

    /// Handle one delivery from the adapter.
    pub fn deliver(&mut self, event: FeedEvent) -> Delivery {
        if self.torn_down {
            self.metrics.record_ignored();
            debug!(session = %self.id, kind = event.kind_label(), "Delivery after teardown ignored");
            return Delivery::Ignored;
        }

        match event {
            FeedEvent::Trade {
                payload,
                received_at,
            } => {
                self.metrics.record_received();
                match self.decoder.decode(payload, received_at) {
                    Ok(trade) => match self.on_trade(trade) {
                        Some(correction) => Delivery::Applied(correction),
                        None => Delivery::Ignored,
                    },
                    Err(err) => {
                        self.metrics.record_dropped();
                        Delivery::Dropped(err)
                    }
                }
            }
            FeedEvent::Connected { session } => {
                info!(session = %self.id, remote = ?session, "Feed connected");
                Delivery::Status
            }
            FeedEvent::Closed { reason } => {
                warn!(session = %self.id, %reason, "Feed closed, no further events");
                Delivery::Status
            }
        }
    }

    /// Apply one decoded trade: append, render, measure, correct.
    ///
    /// With a retention window the oldest row is evicted only after the
    /// correction, so the offset shifts by the inserted extent rather than
    /// the net change. The eviction is then laid out and becomes the new
    /// baseline without moving the offset.
    ///
    /// Returns `None` after teardown.
    pub fn on_trade(&mut self, event: TradeEvent) -> Option<Correction> {
        if self.torn_down {
            self.metrics.record_ignored();
            return None;
        }

        let started = Instant::now();
        let appended = self.buffer.insert_front(event);
        self.render();

        let measured = self.surface.content_extent();
        let old_offset = self.surface.scroll_offset();
        let pinned = self.tracker.is_pinned_to_top();
        let correction = self.controller.correct(measured, pinned, old_offset);
        self.surface.set_scroll_offset(correction.offset);

        let evicted = self.buffer.evict_overflow();
        if evicted.is_some() {
            self.render();
            if correction.action != AnchorAction::MeasurementUnavailable {
                self.controller.rebase(self.surface.content_extent());
            }
        }

        let elapsed = started.elapsed().as_nanos() as u64;
        self.metrics.record_applied(correction.action, elapsed);

        debug!(
            session = %self.id,
            event_id = %appended,
            buffer_len = self.buffer.len(),
            evicted = evicted.is_some(),
            pinned,
            old_offset,
            new_offset = correction.offset,
            delta = correction.delta,
            "Trade applied"
        );

        Some(correction)
    }

    fn render(&mut self) {
        let rows = render_rows(self.buffer.iter(), self.widths);
        self.surface.render(&rows);
    }

    /// Record a user scroll to `offset` and return the pinned signal.
    pub fn on_scroll(&mut self, offset: f64) -> bool {
        self.surface.set_scroll_offset(offset);
        self.tracker.on_scroll(offset)
    }

    /// End the session: release the subscription and refuse further events.
    ///
    /// Returns `true` on the first call only.
    pub fn teardown(&mut self) -> bool {
        if self.torn_down {
            return false;
        }
        self.torn_down = true;
        if let Some(mut subscription) = self.subscription.take() {
            subscription.release();
        }
        info!(
            session = %self.id,
            events = self.buffer.len(),
            dropped = self.decoder.events_dropped(),
            "Trade stream session torn down"
        );
        true
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn buffer(&self) -> &EventBuffer {
        &self.buffer
    }

    pub fn scroll_offset(&self) -> f64 {
        self.surface.scroll_offset()
    }

    pub fn is_pinned_to_top(&self) -> bool {
        self.tracker.is_pinned_to_top()
    }

    pub fn previous_extent(&self) -> f64 {
        self.controller.previous_extent()
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    pub fn has_subscription(&self) -> bool {
        self.subscription.as_ref().is_some_and(Subscription::is_active)
    }

    pub fn metrics(&self) -> Arc<StreamMetrics> {
        Arc::clone(&self.metrics)
    }
}

impl<S: Surface> Drop for TradeStreamSession<S> {
    fn drop(&mut self) {
        self.teardown();
    }
}
