//! Scroll-intent tracking
//!
//! Reduces the raw scroll offset to one signal: is the user pinned to the
//! newest-item edge? Offset 0 is that edge. A small tolerance absorbs
//! sub-pixel jitter and rubber-band overscroll so a user who is visually
//! at the top still counts as pinned.

use tracing::trace;

/// Default pin tolerance, in scroll units.
pub const DEFAULT_PIN_TOLERANCE: f64 = 10.0;

/// `offset <= tolerance`.
pub fn is_pinned(offset: f64, tolerance: f64) -> bool {
    offset <= tolerance
}

/// Tracks whether the user wants to keep seeing new arrivals.
#[derive(Debug, Clone)]
pub struct ScrollIntentTracker {
    tolerance: f64,
    pinned: bool,
    last_offset: f64,
}

impl ScrollIntentTracker {
    /// A new tracker starts pinned: nothing has been read yet.
    pub fn new(tolerance: f64) -> Self {
        Self {
            tolerance,
            pinned: true,
            last_offset: 0.0,
        }
    }

    /// Record a raw scroll position and return the updated signal.
    ///
    /// Called on every user scroll, not only after mutations.
    pub fn on_scroll(&mut self, offset: f64) -> bool {
        let pinned = is_pinned(offset, self.tolerance);
        if pinned != self.pinned {
            trace!(offset, pinned, "Scroll intent changed");
        }
        self.pinned = pinned;
        self.last_offset = offset;
        pinned
    }

    pub fn is_pinned_to_top(&self) -> bool {
        self.pinned
    }

    pub fn last_offset(&self) -> f64 {
        self.last_offset
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }
}

impl Default for ScrollIntentTracker {
    fn default() -> Self {
        Self::new(DEFAULT_PIN_TOLERANCE)
    }
}
