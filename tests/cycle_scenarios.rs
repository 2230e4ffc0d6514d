// Multi-cycle scenarios against replayed price history and the paper venue.
use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Local};

use scalp_bot::analytics;
use scalp_bot::config::{ScalpParams, SignalThresholds};
use scalp_bot::domain::{Bar, Side};
use scalp_bot::engine::ScalpEngine;
use scalp_bot::feed::ReplayMarketData;
use scalp_bot::gateway::PaperBroker;
use scalp_bot::recorder::AnalyticsLog;
use scalp_bot::signal::SignalEvaluator;
use scalp_bot::watchlist::StaticWatchlist;

fn dip_to(price: f64) -> Vec<Bar> {
    let prev = price / 0.995;
    ReplayMarketData::bars(&[prev, prev, prev, prev, price], &[1_000.0; 5])
}

fn flat(price: f64) -> Vec<Bar> {
    ReplayMarketData::bars(&[price; 5], &[1_000.0; 5])
}

fn setup(tickers: &[&str], params: ScalpParams) -> (Arc<ReplayMarketData>, Arc<PaperBroker>, ScalpEngine) {
    let feed = Arc::new(ReplayMarketData::new());
    let broker = Arc::new(PaperBroker::new(100_000.0));
    let wl = Arc::new(StaticWatchlist(tickers.iter().map(|s| s.to_string()).collect()));
    let engine = ScalpEngine::new(
        ScalpParams { entry_pacing: Duration::ZERO, ..params },
        SignalEvaluator::new(feed.clone(), SignalThresholds::default()),
        wl,
        broker.clone(),
    );
    (feed, broker, engine)
}

#[tokio::test]
async fn buy_hold_then_take_profit() {
    let (feed, broker, mut engine) = setup(&["AAPL"], ScalpParams::default());
    let t0 = Local::now();

    feed.set("AAPL", dip_to(200.0));
    let r1 = engine.run_cycle_at(t0).await.unwrap();
    assert_eq!((r1.buy_trades, r1.sell_trades), (1, 0));
    assert_eq!(engine.tracker().get("AAPL").unwrap().shares, 50); // 10k / 200

    // flat and young: held, and not re-bought
    feed.set("AAPL", flat(200.2));
    let r2 = engine.run_cycle_at(t0 + ChronoDuration::seconds(30)).await.unwrap();
    assert_eq!(r2.trades_executed, 0);
    assert_eq!(r2.open_positions, 1);

    feed.set("AAPL", flat(201.0));
    let r3 = engine.run_cycle_at(t0 + ChronoDuration::seconds(60)).await.unwrap();
    assert_eq!(r3.sell_trades, 1);
    assert!((r3.total_pnl_pct - 0.5).abs() < 1e-9);
    assert_eq!(r3.trades[0].reason, "Profit target: +0.50%");

    let orders = broker.orders();
    assert_eq!(orders.len(), 2);
    assert_eq!(orders[1].side, Side::Sell);
    assert_eq!(orders[1].qty, 50);
    assert_eq!(engine.counter().trades_count, 2);
}

#[tokio::test]
async fn time_limit_closes_stale_positions() {
    let (feed, _broker, mut engine) = setup(&["MSFT"], ScalpParams::default());
    let t0 = Local::now();
    feed.set("MSFT", dip_to(400.0));
    engine.run_cycle_at(t0).await.unwrap();

    feed.set("MSFT", flat(400.0));
    let r = engine.run_cycle_at(t0 + ChronoDuration::seconds(150)).await.unwrap();
    assert_eq!(r.sell_trades, 1);
    assert_eq!(r.trades[0].reason, "Time limit: 2.5min");
    assert_eq!(r.trades[0].pnl_pct, Some(0.0));
}

#[tokio::test]
async fn missing_history_never_exits_or_enters() {
    let (feed, broker, mut engine) = setup(&["NVDA", "GHOST"], ScalpParams::default());
    let t0 = Local::now();
    feed.set("NVDA", dip_to(100.0));
    engine.run_cycle_at(t0).await.unwrap();

    // history vanishes: position held even past the time limit
    feed.set("NVDA", vec![]);
    let r = engine.run_cycle_at(t0 + ChronoDuration::minutes(10)).await.unwrap();
    assert_eq!(r.trades_executed, 0);
    assert!(engine.tracker().contains("NVDA"));
    assert_eq!(broker.orders().len(), 1);
}

#[tokio::test]
async fn daily_cap_is_shared_across_cycles_and_resets_next_day() {
    let names = ["A", "B", "C", "D"];
    let (feed, _broker, mut engine) = setup(&names, ScalpParams { max_daily_trades: 3, ..ScalpParams::default() });
    for n in names {
        feed.set(n, dip_to(10.0));
    }
    let t0 = Local::now();

    let r1 = engine.run_cycle_at(t0).await.unwrap();
    assert_eq!(r1.buy_trades, 3);
    let r2 = engine.run_cycle_at(t0 + ChronoDuration::seconds(10)).await.unwrap();
    assert_eq!(r2.buy_trades, 0);

    let tomorrow = t0 + ChronoDuration::days(1);
    let r3 = engine.run_cycle_at(tomorrow).await.unwrap();
    // positions cleared at rollover, fresh budget of 3
    assert_eq!(r3.sell_trades, 0);
    assert_eq!(r3.buy_trades, 3);
    assert_eq!(engine.counter().date, tomorrow.date_naive());
    assert_eq!(engine.counter().trades_count, 3);
}

#[tokio::test]
async fn analytics_log_feeds_the_report() {
    let dir = tempfile::tempdir().unwrap();
    let (feed, _broker, engine) = setup(&["AMD"], ScalpParams::default());
    let mut engine = engine.with_analytics_log(AnalyticsLog::new(dir.path()));
    let t0 = Local::now();

    feed.set("AMD", dip_to(100.0));
    engine.run_cycle_at(t0).await.unwrap();
    feed.set("AMD", flat(99.5));
    engine.run_cycle_at(t0 + ChronoDuration::seconds(20)).await.unwrap();

    let data = AnalyticsLog::new(dir.path()).load().await;
    assert_eq!(data.trades.len(), 2);
    assert_eq!(data.decisions.len(), 2);
    assert_eq!(data.decisions[1].action, "SELL");
    assert!(data.decisions[1].reason.starts_with("Stop loss"));

    let rep = analytics::report(&data);
    assert_eq!(rep.performance.total_trades, 2);
    assert_eq!(rep.by_ticker[0].ticker, "AMD");
    // bought 100 @ 100, sold 100 @ 99.5
    assert!((rep.performance.total_pnl + 50.0).abs() < 1e-6);
}
