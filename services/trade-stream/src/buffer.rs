//! Event buffer for received trades
//!
//! Holds the session's trade history newest-first. The only mutation is
//! `append`, which puts an event at the front; nothing is edited or
//! reordered afterwards. By default the buffer grows for the whole session.
//! An optional retention window evicts from the oldest end.

use std::collections::VecDeque;

use types::ids::EventId;
use types::trade::TradeEvent;

/// Buffer state after an append.
#[derive(Debug, Clone, PartialEq)]
pub struct BufferState {
    /// Number of events now held.
    pub len: usize,
    /// Identifier of the event just placed at the front.
    pub appended: EventId,
    /// Oldest event pushed out by the retention window, if any.
    pub evicted: Option<TradeEvent>,
}

/// Newest-first, append-only sequence of trade events.
#[derive(Debug, Default)]
pub struct EventBuffer {
    events: VecDeque<TradeEvent>,
    /// `None` retains everything received this session.
    max_retained: Option<usize>,
    /// Events appended since creation, including evicted ones.
    total_appended: u64,
}

impl EventBuffer {
    /// Create an empty, unbounded buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty buffer keeping at most `max_retained` events.
    pub fn with_retention(max_retained: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(max_retained),
            max_retained: Some(max_retained),
            total_appended: 0,
        }
    }

    /// Insert `event` at the front and apply the retention window.
    pub fn append(&mut self, event: TradeEvent) -> BufferState {
        let appended = self.insert_front(event);
        let evicted = self.evict_overflow();

        BufferState {
            len: self.events.len(),
            appended,
            evicted,
        }
    }

    /// Insert `event` at the front without evicting.
    ///
    /// The buffer may hold one event over the window until
    /// `evict_overflow` runs. Callers that lay out between the two steps
    /// see the insertion and the eviction as separate changes.
    pub fn insert_front(&mut self, event: TradeEvent) -> EventId {
        let id = event.id();
        self.events.push_front(event);
        self.total_appended += 1;
        id
    }

    /// Drop the oldest event if the buffer is over its retention window.
    pub fn evict_overflow(&mut self) -> Option<TradeEvent> {
        match self.max_retained {
            Some(max) if self.events.len() > max => self.events.pop_back(),
            _ => None,
        }
    }

    /// Iterate newest-first.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &TradeEvent> + DoubleEndedIterator {
        self.events.iter()
    }

    /// Event at `index`, where 0 is the newest.
    pub fn get(&self, index: usize) -> Option<&TradeEvent> {
        self.events.get(index)
    }

    /// Most recently received event.
    pub fn newest(&self) -> Option<&TradeEvent> {
        self.events.front()
    }

    /// Up to `limit` events, newest first.
    pub fn recent(&self, limit: usize) -> Vec<TradeEvent> {
        self.events.iter().take(limit).cloned().collect()
    }

    /// Find an event by its arrival identifier.
    pub fn find(&self, id: EventId) -> Option<&TradeEvent> {
        self.events.iter().find(|e| e.id() == id)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn max_retained(&self) -> Option<usize> {
        self.max_retained
    }

    pub fn total_appended(&self) -> u64 {
        self.total_appended
    }
}
