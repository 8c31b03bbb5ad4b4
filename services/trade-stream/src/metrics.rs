//! Observability for the trade stream
//!
//! Counters for received, applied, dropped and ignored events, a tally of
//! which anchoring branch each pass took, and a latency window over the
//! per-event apply path (append, render, measure, correct).

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use serde::Serialize;

use crate::anchoring::AnchorAction;

/// Core metrics for one session.
pub struct StreamMetrics {
    // Ingestion
    pub events_received: AtomicU64,
    pub events_applied: AtomicU64,
    pub events_dropped: AtomicU64,
    pub events_ignored: AtomicU64,

    // Anchoring
    pub corrections_pinned: AtomicU64,
    pub corrections_shifted: AtomicU64,
    pub corrections_unchanged: AtomicU64,
    pub corrections_skipped: AtomicU64,

    pub apply_latency_ns: Mutex<LatencyTracker>,
}

impl StreamMetrics {
    pub fn new() -> Self {
        Self {
            events_received: AtomicU64::new(0),
            events_applied: AtomicU64::new(0),
            events_dropped: AtomicU64::new(0),
            events_ignored: AtomicU64::new(0),
            corrections_pinned: AtomicU64::new(0),
            corrections_shifted: AtomicU64::new(0),
            corrections_unchanged: AtomicU64::new(0),
            corrections_skipped: AtomicU64::new(0),
            apply_latency_ns: Mutex::new(LatencyTracker::new(1000)),
        }
    }

    /// Record a payload arriving from the adapter.
    pub fn record_received(&self) {
        self.events_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a payload rejected by ingestion.
    pub fn record_dropped(&self) {
        self.events_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a delivery that arrived after teardown.
    pub fn record_ignored(&self) {
        self.events_ignored.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one completed apply pass.
    pub fn record_applied(&self, action: AnchorAction, latency_ns: u64) {
        self.events_applied.fetch_add(1, Ordering::Relaxed);
        let counter = match action {
            AnchorAction::PinnedToTop => &self.corrections_pinned,
            AnchorAction::Shifted(_) => &self.corrections_shifted,
            AnchorAction::Unchanged => &self.corrections_unchanged,
            AnchorAction::MeasurementUnavailable => &self.corrections_skipped,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut tracker) = self.apply_latency_ns.lock() {
            tracker.record(latency_ns);
        }
    }

    /// Point-in-time copy of every metric.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let (p50, p99, max) = match self.apply_latency_ns.lock() {
            Ok(tracker) => (tracker.percentile(50), tracker.percentile(99), tracker.max()),
            Err(_) => (None, None, None),
        };

        MetricsSnapshot {
            counters: self.export(),
            apply_p50_ns: p50,
            apply_p99_ns: p99,
            apply_max_ns: max,
        }
    }

    /// Export counters as a BTreeMap for Prometheus-style exposition.
    pub fn export(&self) -> BTreeMap<String, u64> {
        let mut m = BTreeMap::new();
        m.insert("events_received".to_string(), self.events_received.load(Ordering::Relaxed));
        m.insert("events_applied".to_string(), self.events_applied.load(Ordering::Relaxed));
        m.insert("events_dropped".to_string(), self.events_dropped.load(Ordering::Relaxed));
        m.insert("events_ignored".to_string(), self.events_ignored.load(Ordering::Relaxed));
        m.insert("corrections_pinned".to_string(), self.corrections_pinned.load(Ordering::Relaxed));
        m.insert("corrections_shifted".to_string(), self.corrections_shifted.load(Ordering::Relaxed));
        m.insert("corrections_unchanged".to_string(), self.corrections_unchanged.load(Ordering::Relaxed));
        m.insert("corrections_skipped".to_string(), self.corrections_skipped.load(Ordering::Relaxed));
        m
    }
}

impl Default for StreamMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Serializable copy of the metrics at one instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub counters: BTreeMap<String, u64>,
    pub apply_p50_ns: Option<u64>,
    pub apply_p99_ns: Option<u64>,
    pub apply_max_ns: Option<u64>,
}

/// Tracks latency samples for percentile calculation.
pub struct LatencyTracker {
    samples: Vec<u64>,
    max_samples: usize,
}

impl LatencyTracker {
    pub fn new(max_samples: usize) -> Self {
        Self {
            samples: Vec::with_capacity(max_samples),
            max_samples,
        }
    }

    /// Record a latency sample.
    pub fn record(&mut self, value: u64) {
        if self.samples.len() >= self.max_samples {
            self.samples.remove(0);
        }
        self.samples.push(value);
    }

    /// Get a percentile value (0-100).
    pub fn percentile(&self, p: usize) -> Option<u64> {
        if self.samples.is_empty() {
            return None;
        }

        let mut sorted = self.samples.clone();
        sorted.sort_unstable();

        let idx = (p as f64 / 100.0 * (sorted.len() - 1) as f64) as usize;
        Some(sorted[idx.min(sorted.len() - 1)])
    }

    pub fn max(&self) -> Option<u64> {
        self.samples.iter().copied().max()
    }

    /// Number of samples recorded.
    pub fn count(&self) -> usize {
        self.samples.len()
    }
}
