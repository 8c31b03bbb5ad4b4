//! Connection adapter boundary
//!
//! An adapter owns the live feed connection. The session hands it a
//! channel sender and receives a `Subscription` guard back. Releasing the
//! guard (explicitly or by dropping it) ends delivery. The release hook
//! runs exactly once.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::error::ConnectionError;
use crate::events::FeedEvent;

/// Sending half handed to adapters.
pub type FeedSender = mpsc::Sender<FeedEvent>;
/// Receiving half owned by the session runner.
pub type FeedReceiver = mpsc::Receiver<FeedEvent>;

/// Create the adapter -> session channel.
pub fn feed_channel(capacity: usize) -> (FeedSender, FeedReceiver) {
    mpsc::channel(capacity)
}

/// Source of feed events.
pub trait ConnectionAdapter {
    /// Start delivering events into `sink`, in arrival order, one at a time.
    ///
    /// The returned guard stops delivery when released.
    fn subscribe(&mut self, sink: FeedSender) -> Result<Subscription, ConnectionError>;
}

type ReleaseHook = Box<dyn FnOnce() + Send>;

/// Scoped ownership of one adapter subscription.
pub struct Subscription {
    label: String,
    release: Option<ReleaseHook>,
}

impl Subscription {
    pub fn new(label: impl Into<String>, release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            label: label.into(),
            release: Some(Box::new(release)),
        }
    }

    /// Run the release hook. Returns `true` only on the call that ran it.
    pub fn release(&mut self) -> bool {
        match self.release.take() {
            Some(hook) => {
                hook();
                info!(subscription = %self.label, "Subscription released");
                true
            }
            None => {
                debug!(subscription = %self.label, "Subscription already released");
                false
            }
        }
    }

    pub fn is_active(&self) -> bool {
        self.release.is_some()
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("label", &self.label)
            .field("active", &self.is_active())
            .finish()
    }
}

/// In-process adapter fed by hand through a `ChannelFeed`.
///
/// Used for tests and for replaying captured payloads.
#[derive(Debug, Default)]
pub struct ChannelAdapter {
    sink: Arc<Mutex<Option<FeedSender>>>,
    releases: Arc<AtomicUsize>,
}

impl ChannelAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle for pushing events into whichever session subscribes.
    pub fn feed(&self) -> ChannelFeed {
        ChannelFeed {
            sink: Arc::clone(&self.sink),
            releases: Arc::clone(&self.releases),
        }
    }
}

impl ConnectionAdapter for ChannelAdapter {
    fn subscribe(&mut self, sink: FeedSender) -> Result<Subscription, ConnectionError> {
        let mut slot = self.sink.lock().map_err(|_| ConnectionError::Closed)?;
        *slot = Some(sink);
        drop(slot);

        let shared = Arc::clone(&self.sink);
        let releases = Arc::clone(&self.releases);
        Ok(Subscription::new("channel", move || {
            if let Ok(mut slot) = shared.lock() {
                slot.take();
            }
            releases.fetch_add(1, Ordering::SeqCst);
        }))
    }
}

/// Producer side of a `ChannelAdapter`.
#[derive(Debug, Clone)]
pub struct ChannelFeed {
    sink: Arc<Mutex<Option<FeedSender>>>,
    releases: Arc<AtomicUsize>,
}

impl ChannelFeed {
    /// Deliver a trade payload. Returns `false` when nobody is subscribed.
    pub async fn push(&self, payload: Value) -> bool {
        self.send(FeedEvent::trade(payload)).await
    }

    /// Deliver any feed event. Returns `false` when nobody is subscribed.
    pub async fn send(&self, event: FeedEvent) -> bool {
        let sink = match self.sink.lock() {
            Ok(slot) => slot.clone(),
            Err(_) => None,
        };
        match sink {
            Some(sink) => sink.send(event).await.is_ok(),
            None => false,
        }
    }

    /// Whether a subscription is currently live.
    pub fn is_subscribed(&self) -> bool {
        self.sink.lock().map(|slot| slot.is_some()).unwrap_or(false)
    }

    /// Times a subscription on this adapter has been released.
    pub fn release_count(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}
