//! Async driver for a session
//!
//! Runs a `TradeStreamSession` inside one task. Feed events and user
//! scrolls are both consumed from channels by that single task, so each
//! delivery is applied to completion before the next one is looked at.

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::config::StreamConfig;
use crate::connection::{feed_channel, ConnectionAdapter, FeedReceiver};
use crate::error::StreamError;
use crate::events::FeedEvent;
use crate::render::Surface;
use crate::session::{Delivery, TradeStreamSession};

/// Input from the user side of the display.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewCommand {
    /// The user scrolled to this offset.
    Scroll(f64),
    /// End the session.
    Shutdown,
}

/// Why the run loop returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// `ViewCommand::Shutdown` received or every `SessionHandle` dropped.
    Shutdown,
    /// The adapter reported the connection closed.
    FeedClosed(String),
    /// The adapter dropped its sender without a close event.
    FeedEnded,
}

/// Cloneable handle for the view to talk to a running session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<ViewCommand>,
}

impl SessionHandle {
    /// Report a user scroll. Returns `false` once the session has stopped.
    pub fn scroll(&self, offset: f64) -> bool {
        self.commands.send(ViewCommand::Scroll(offset)).is_ok()
    }

    /// Ask the session to stop.
    pub fn shutdown(&self) -> bool {
        self.commands.send(ViewCommand::Shutdown).is_ok()
    }
}

/// What a finished run hands back.
pub struct RunOutcome<S: Surface> {
    pub session: TradeStreamSession<S>,
    pub reason: StopReason,
}

/// Owns a session, its feed receiver and its command receiver.
pub struct SessionRunner<S: Surface> {
    session: TradeStreamSession<S>,
    feed: FeedReceiver,
    commands: mpsc::UnboundedReceiver<ViewCommand>,
}

impl<S: Surface> SessionRunner<S> {
    /// Build a session, subscribe it through `adapter` and return the
    /// runner plus the view's handle.
    pub fn start<A: ConnectionAdapter>(
        config: &StreamConfig,
        surface: S,
        adapter: &mut A,
    ) -> Result<(Self, SessionHandle), StreamError> {
        let mut session = TradeStreamSession::new(config, surface)?;
        let (sink, feed) = feed_channel(config.channel_capacity);
        let subscription = adapter.subscribe(sink)?;
        session.attach(subscription);

        let (tx, commands) = mpsc::unbounded_channel();
        Ok((
            Self {
                session,
                feed,
                commands,
            },
            SessionHandle { commands: tx },
        ))
    }

    /// Process deliveries until shutdown or the feed ends, then tear the
    /// session down.
    pub async fn run(self) -> RunOutcome<S> {
        let SessionRunner {
            mut session,
            mut feed,
            mut commands,
        } = self;

        let reason = loop {
            tokio::select! {
                // User input first, so the pinned signal is current before
                // the next trade is applied.
                biased;

                command = commands.recv() => match command {
                    Some(ViewCommand::Scroll(offset)) => {
                        session.on_scroll(offset);
                    }
                    Some(ViewCommand::Shutdown) | None => break StopReason::Shutdown,
                },
                event = feed.recv() => match event {
                    Some(event) => {
                        let closed = match &event {
                            FeedEvent::Closed { reason } => Some(reason.clone()),
                            _ => None,
                        };
                        let delivery = session.deliver(event);
                        if let Delivery::Dropped(err) = &delivery {
                            debug!(error = %err, "Delivery dropped");
                        }
                        if let Some(reason) = closed {
                            break StopReason::FeedClosed(reason);
                        }
                    }
                    None => break StopReason::FeedEnded,
                },
            }
        };

        session.teardown();
        // Anything the adapter managed to queue before release is discarded.
        feed.close();
        while feed.try_recv().is_ok() {
            session.metrics().record_ignored();
        }

        info!(session = %session.id(), reason = ?reason, "Session runner stopped");
        RunOutcome { session, reason }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::ChannelAdapter;
    use crate::render::FixedRowSurface;
    use serde_json::json;

    fn trade(symbol: &str) -> serde_json::Value {
        json!({
            "name": symbol,
            "symbol": symbol,
            "market_cap": 30.0,
            "usd_market_cap": 4500.0,
            "sol_amount": 100_000_000u64,
            "creator": "creator",
            "timestamp": 1_708_123_456
        })
    }

    #[tokio::test]
    async fn test_runner_applies_in_order_and_stops_on_close() {
        let mut adapter = ChannelAdapter::new();
        let feed = adapter.feed();
        let (runner, _handle) = SessionRunner::start(
            &StreamConfig::default(),
            FixedRowSurface::new(0.0, 24.0),
            &mut adapter,
        )
        .unwrap();
        let task = tokio::spawn(runner.run());

        for s in ["A", "B", "C"] {
            assert!(feed.push(trade(s)).await);
        }
        feed.send(FeedEvent::Closed {
            reason: "test".to_string(),
        })
        .await;

        let outcome = task.await.unwrap();
        assert_eq!(outcome.reason, StopReason::FeedClosed("test".to_string()));

        let symbols: Vec<&str> = outcome.session.buffer().iter().map(|e| e.symbol()).collect();
        assert_eq!(symbols, vec!["C", "B", "A"]);
        assert!(outcome.session.is_torn_down());
        assert_eq!(feed.release_count(), 1);
    }

    #[tokio::test]
    async fn test_shutdown_command_releases_subscription() {
        let mut adapter = ChannelAdapter::new();
        let feed = adapter.feed();
        let (runner, handle) = SessionRunner::start(
            &StreamConfig::default(),
            FixedRowSurface::new(0.0, 24.0),
            &mut adapter,
        )
        .unwrap();
        let task = tokio::spawn(runner.run());

        assert!(handle.shutdown());
        let outcome = task.await.unwrap();

        assert_eq!(outcome.reason, StopReason::Shutdown);
        assert!(!feed.is_subscribed());
        assert!(!feed.push(trade("late")).await);
        assert!(outcome.session.buffer().is_empty());
    }
}
