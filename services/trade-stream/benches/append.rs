use chrono::Utc;
use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use rust_decimal::Decimal;
use serde_json::json;
use trade_stream::config::StreamConfig;
use trade_stream::events::FeedEvent;
use trade_stream::render::FixedRowSurface;
use trade_stream::session::TradeStreamSession;
use types::numeric::NativeAmount;
use types::trade::TradeEvent;

fn make_trade(i: u64) -> TradeEvent {
    TradeEvent::new(
        format!("Token {}", i),
        format!("T{}", i),
        NativeAmount::from_units(i * 1_000_000),
        Decimal::from(30),
        Decimal::from(4500),
        "creator",
        1_708_123_456 + i as i64,
        Utc::now(),
    )
}

fn session_with(rows: u64, max_retained: Option<usize>) -> TradeStreamSession<FixedRowSurface> {
    let config = StreamConfig {
        max_retained,
        ..StreamConfig::default()
    };
    let mut session = TradeStreamSession::new(&config, FixedRowSurface::new(0.0, 24.0))
        .expect("default config is valid");
    session.on_scroll(500.0);
    for i in 0..rows {
        session.on_trade(make_trade(i));
    }
    session
}

fn bench_on_trade(c: &mut Criterion) {
    let mut group = c.benchmark_group("on_trade");

    for rows in [10u64, 100, 1_000] {
        group.bench_function(format!("unpinned_{}_rows", rows), |b| {
            b.iter_batched(
                || (session_with(rows, None), make_trade(rows)),
                |(mut session, trade)| {
                    black_box(session.on_trade(trade));
                    session
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.bench_function("retained_window_200", |b| {
        let mut session = session_with(200, Some(200));
        let mut i = 200;
        b.iter(|| {
            i += 1;
            black_box(session.on_trade(make_trade(i)));
        })
    });

    group.finish();
}

fn bench_deliver_payload(c: &mut Criterion) {
    let payload = json!({
        "name": "Bench Token",
        "symbol": "BNCH",
        "market_cap": 31.25,
        "usd_market_cap": 4687.5,
        "sol_amount": 1_250_000_000u64,
        "creator": "creator",
        "timestamp": 1_708_123_456,
        "signature": "sig"
    });

    c.bench_function("deliver_payload_100_rows", |b| {
        b.iter_batched(
            || (session_with(100, None), FeedEvent::trade(payload.clone())),
            |(mut session, event)| {
                black_box(session.deliver(event));
                session
            },
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_on_trade, bench_deliver_payload);
criterion_main!(benches);
