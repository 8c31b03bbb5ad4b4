//! End-to-end session tests
//!
//! Drives sessions through the in-process `ChannelAdapter` the same way a
//! live Socket.IO feed would, checking:
//! - newest-first ordering and reading position across arrivals
//! - pinned users staying on the newest row
//! - malformed payload handling under both policies
//! - subscription release on teardown
//! - unknown payload fields surviving ingestion

use serde_json::{json, Value};
use trade_stream::anchoring::AnchorAction;
use trade_stream::config::StreamConfig;
use trade_stream::connection::{feed_channel, ChannelAdapter, ConnectionAdapter, FeedReceiver};
use trade_stream::events::FeedEvent;
use trade_stream::render::{render_lines, ColumnWidths, FixedRowSurface};
use trade_stream::runner::{SessionRunner, StopReason};
use trade_stream::session::{Delivery, TradeStreamSession};
use types::trade::MalformedPolicy;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn trade(symbol: &str, lamports: u64) -> Value {
    json!({
        "name": format!("{} coin", symbol),
        "symbol": symbol,
        "market_cap": 31.25,
        "usd_market_cap": 4687.5,
        "sol_amount": lamports,
        "creator": "7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU",
        "timestamp": 1_708_123_456
    })
}

/// Header of 60 plus rows of 40: extents 100, 140, 180.
fn surface() -> FixedRowSurface {
    FixedRowSurface::new(60.0, 40.0)
}

fn subscribed_session(
    config: &StreamConfig,
) -> (TradeStreamSession<FixedRowSurface>, ChannelAdapter, FeedReceiver) {
    let mut adapter = ChannelAdapter::new();
    let (tx, rx) = feed_channel(config.channel_capacity);
    let mut session = TradeStreamSession::new(config, surface()).unwrap();
    session.attach(adapter.subscribe(tx).unwrap());
    (session, adapter, rx)
}

async fn pump(session: &mut TradeStreamSession<FixedRowSurface>, rx: &mut FeedReceiver) -> Delivery {
    let event = rx.recv().await.expect("feed ended");
    session.deliver(event)
}

fn symbols(session: &TradeStreamSession<FixedRowSurface>) -> Vec<String> {
    session
        .buffer()
        .iter()
        .map(|e| e.symbol().to_string())
        .collect()
}

#[tokio::test]
async fn test_reading_position_held_while_rows_arrive() {
    init_tracing();
    let (mut session, adapter, mut rx) = subscribed_session(&StreamConfig::default());
    let feed = adapter.feed();

    assert!(feed.push(trade("AAA", 1_000_000_000)).await);
    pump(&mut session, &mut rx).await;
    assert_eq!(session.scroll_offset(), 0.0);

    // Reading older rows now.
    assert!(!session.on_scroll(80.0));

    assert!(feed.push(trade("BBB", 2_000_000_000)).await);
    match pump(&mut session, &mut rx).await {
        Delivery::Applied(correction) => {
            assert_eq!(correction.action, AnchorAction::Shifted(40.0));
            assert_eq!(correction.offset, 120.0);
        }
        other => panic!("Expected Applied, got {:?}", other),
    }

    assert!(feed.push(trade("CCC", 3_000_000_000)).await);
    pump(&mut session, &mut rx).await;
    assert_eq!(session.scroll_offset(), 160.0);
    assert_eq!(symbols(&session), vec!["CCC", "BBB", "AAA"]);

    let sols: Vec<&str> = session.surface().rows().iter().map(|r| r.sol.as_str()).collect();
    assert_eq!(sols, vec!["3.00", "2.00", "1.00"]);
}

#[tokio::test]
async fn test_scroll_back_within_tolerance_repins() {
    let (mut session, adapter, mut rx) = subscribed_session(&StreamConfig::default());
    let feed = adapter.feed();

    feed.push(trade("AAA", 1)).await;
    pump(&mut session, &mut rx).await;

    session.on_scroll(300.0);
    assert!(!session.is_pinned_to_top());
    assert!(session.on_scroll(10.0));

    feed.push(trade("BBB", 1)).await;
    pump(&mut session, &mut rx).await;
    assert_eq!(session.scroll_offset(), 0.0);
}

#[tokio::test]
async fn test_malformed_payload_dropped_by_default() {
    let (mut session, adapter, mut rx) = subscribed_session(&StreamConfig::default());
    let feed = adapter.feed();

    feed.push(json!({"name": "broken", "symbol": "BRK"})).await;
    feed.push(json!("not an object")).await;
    feed.push(trade("OK", 500_000_000)).await;

    assert!(matches!(pump(&mut session, &mut rx).await, Delivery::Dropped(_)));
    assert!(matches!(pump(&mut session, &mut rx).await, Delivery::Dropped(_)));
    assert!(matches!(pump(&mut session, &mut rx).await, Delivery::Applied(_)));

    assert_eq!(symbols(&session), vec!["OK"]);
    let counters = session.metrics().export();
    assert_eq!(counters["events_received"], 3);
    assert_eq!(counters["events_dropped"], 2);
    assert_eq!(counters["events_applied"], 1);
}

#[tokio::test]
async fn test_default_to_zero_policy_keeps_event() {
    let config = StreamConfig {
        malformed_policy: MalformedPolicy::DefaultToZero,
        ..StreamConfig::default()
    };
    let (mut session, adapter, mut rx) = subscribed_session(&config);
    let feed = adapter.feed();

    feed.push(json!({"name": "partial", "symbol": "PRT"})).await;
    assert!(matches!(pump(&mut session, &mut rx).await, Delivery::Applied(_)));

    let row = &session.surface().rows()[0];
    assert_eq!(row.sol, "0.00");
    assert_eq!(row.market_cap, "0.00");
    assert_eq!(row.usd_market_cap, "0.00");
}

#[tokio::test]
async fn test_unknown_fields_pass_through() {
    let (mut session, adapter, mut rx) = subscribed_session(&StreamConfig::default());
    let feed = adapter.feed();

    let mut payload = trade("XTR", 42);
    payload["signature"] = json!("5h6x...");
    payload["is_buy"] = json!(true);
    feed.push(payload).await;
    pump(&mut session, &mut rx).await;

    let newest = session.buffer().newest().unwrap();
    assert_eq!(newest.extra()["signature"], json!("5h6x..."));
    assert_eq!(newest.extra()["is_buy"], json!(true));

    let wire = newest.to_wire_json();
    assert_eq!(wire["is_buy"], json!(true));
    assert_eq!(wire["symbol"], json!("XTR"));
}

#[tokio::test]
async fn test_teardown_stops_delivery_and_releases_once() {
    let (mut session, adapter, mut rx) = subscribed_session(&StreamConfig::default());
    let feed = adapter.feed();

    feed.push(trade("AAA", 1)).await;
    pump(&mut session, &mut rx).await;

    assert!(session.teardown());
    assert!(!session.teardown());
    assert!(!feed.is_subscribed());
    assert!(!feed.push(trade("LATE", 1)).await);
    assert_eq!(session.buffer().len(), 1);

    drop(session);
    assert_eq!(feed.release_count(), 1);
}

#[tokio::test]
async fn test_runner_applies_queued_scroll_before_trades() {
    init_tracing();
    let mut adapter = ChannelAdapter::new();
    let feed = adapter.feed();
    let (runner, handle) =
        SessionRunner::start(&StreamConfig::default(), surface(), &mut adapter).unwrap();

    // Queue everything before the runner starts so ordering is fixed.
    assert!(handle.scroll(80.0));
    feed.push(trade("AAA", 1)).await;
    feed.push(trade("BBB", 1)).await;
    feed.send(FeedEvent::Closed {
        reason: "server closed socket".to_string(),
    })
    .await;

    let outcome = runner.run().await;

    assert_eq!(
        outcome.reason,
        StopReason::FeedClosed("server closed socket".to_string())
    );
    // 80 + 100 (first layout) + 40.
    assert_eq!(outcome.session.scroll_offset(), 220.0);
    assert!(!outcome.session.is_pinned_to_top());
    assert_eq!(feed.release_count(), 1);
    assert!(!handle.scroll(0.0));
}

#[test]
fn test_rendered_table_truncates_long_names() {
    let config = StreamConfig {
        name_width: 8,
        symbol_width: 4,
        ..StreamConfig::default()
    };
    let mut session = TradeStreamSession::new(&config, surface()).unwrap();
    session.deliver(FeedEvent::trade(json!({
        "name": "An Extremely Long Token Name",
        "symbol": "LONGSYM",
        "market_cap": 1,
        "usd_market_cap": 2,
        "sol_amount": 1_005_000_000u64,
        "creator": "c",
        "timestamp": 0
    })));

    let rows = session.surface().rows();
    assert!(rows[0].is_truncated());
    assert_eq!(rows[0].name.chars().count(), 8);
    assert_eq!(session.surface().inspect(0), Some(("An Extremely Long Token Name", "LONGSYM")));

    let lines = render_lines(rows, ColumnWidths { name: 8, symbol: 4 });
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains("Market-Cap"));
    assert!(lines[1].contains("1.01"));
}
