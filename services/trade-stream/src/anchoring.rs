//! Viewport anchoring
//!
//! After every buffer mutation and re-render, picks the scroll offset that
//! keeps the picture still:
//!
//! - pinned user: offset 0, so new arrivals stay in view
//! - reading older rows: offset grows by exactly the extent added above
//! - no growth: offset untouched
//!
//! The decision is a pure function of
//! `(previous_extent, new_extent, pinned, old_offset)`. The controller only
//! remembers the extent between passes. Measurement must happen after the
//! new rows are laid out; correcting against stale geometry is what makes
//! lists jump.

use tracing::debug;

/// Compute the corrected scroll offset for one pass.
pub fn anchor_offset(previous_extent: f64, new_extent: f64, pinned: bool, old_offset: f64) -> f64 {
    let delta = new_extent - previous_extent;
    if pinned {
        0.0
    } else if delta > 0.0 {
        old_offset + delta
    } else {
        old_offset
    }
}

/// Which branch a correction took.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AnchorAction {
    /// Snapped to the newest-item edge.
    PinnedToTop,
    /// Shifted down by the inserted extent.
    Shifted(f64),
    /// Extent did not grow; offset kept.
    Unchanged,
    /// Extent could not be measured; pass skipped.
    MeasurementUnavailable,
}

/// Outcome of one anchoring pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Correction {
    pub offset: f64,
    pub delta: f64,
    pub action: AnchorAction,
}

/// Remembers the last measured extent and applies `anchor_offset`.
#[derive(Debug, Clone, Default)]
pub struct AnchoringController {
    previous_extent: f64,
    passes: u64,
}

impl AnchoringController {
    /// Starts with a previous extent of 0: nothing is laid out at mount.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run one pass against a fresh measurement.
    ///
    /// `measured` is `None` when no surface can be measured yet. Such a
    /// pass, or one with a non-finite or negative extent, leaves both the
    /// offset and the stored extent alone.
    pub fn correct(&mut self, measured: Option<f64>, pinned: bool, old_offset: f64) -> Correction {
        let new_extent = match measured {
            Some(extent) if extent.is_finite() && extent >= 0.0 => extent,
            _ => {
                debug!(?measured, "Extent unavailable, skipping anchoring pass");
                return Correction {
                    offset: old_offset,
                    delta: 0.0,
                    action: AnchorAction::MeasurementUnavailable,
                };
            }
        };

        let delta = new_extent - self.previous_extent;
        let offset = anchor_offset(self.previous_extent, new_extent, pinned, old_offset);
        let action = if pinned {
            AnchorAction::PinnedToTop
        } else if delta > 0.0 {
            AnchorAction::Shifted(delta)
        } else {
            AnchorAction::Unchanged
        };

        self.previous_extent = new_extent;
        self.passes += 1;

        Correction {
            offset,
            delta,
            action,
        }
    }

    /// Adopt a new extent without touching the offset.
    ///
    /// For content removed below the viewport (retention eviction): nothing
    /// above the reader moved, so only the baseline for the next pass
    /// changes. Unusable measurements are ignored.
    pub fn rebase(&mut self, measured: Option<f64>) -> bool {
        match measured {
            Some(extent) if extent.is_finite() && extent >= 0.0 => {
                self.previous_extent = extent;
                true
            }
            _ => false,
        }
    }

    pub fn previous_extent(&self) -> f64 {
        self.previous_extent
    }

    /// Completed passes, excluding skipped ones.
    pub fn passes(&self) -> u64 {
        self.passes
    }
}
