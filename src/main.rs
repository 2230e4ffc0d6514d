// ===============================
// src/main.rs
// ===============================
/*
=============================================================================
Project : scalp_bot_rust: paper-trading scalper for US equities in Rust
Module  : main.rs
Version : 0.1.0
License : MIT

Summary : Builds a dynamic watchlist (momentum / volume / news), evaluates
          price-volume signals, exits on profit target / stop loss / time
          limit, sizes new entries under slot and daily-trade caps, and
          routes market orders to a paper venue (in-memory or Alpaca).
          Prometheus metrics + JSON analytics log.
=============================================================================
*/
/*
 # satu cycle, paper venue, data mock
 FEED_MODE=mock VENUE_MODE=mock cargo run -- cycle

 # loop tiap 60s + metrics
 FEED_MODE=yahoo VENUE_MODE=alpaca_paper METRICS_PORT=9898 cargo run -- run
 curl -s localhost:9898/metrics | egrep '^(cycles_total|trades_total|open_positions)'
*/
use std::collections::VecDeque;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio::{select, time::{interval, Duration, MissedTickBehavior}};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use scalp_bot::analytics;
use scalp_bot::config::{self, Args, FeedMode, ScalpParams, SignalThresholds, VenueMode};
use scalp_bot::domain::CycleResult;
use scalp_bot::engine::ScalpEngine;
use scalp_bot::feed::{MockMarketData, YahooMarketData};
use scalp_bot::gateway::PaperBroker;
use scalp_bot::gateway_alpaca::AlpacaBroker;
use scalp_bot::metrics;
use scalp_bot::news::{financial_news, GeminiSummarizer, NewsApiClient};
use scalp_bot::portfolio;
use scalp_bot::recorder::AnalyticsLog;
use scalp_bot::services::{Broker, MarketData, NewsProvider};
use scalp_bot::signal::SignalEvaluator;
use scalp_bot::watchlist::{Watchlist, WatchlistGenerator};

const HISTORY_CAP: usize = 100;

#[derive(Parser, Debug)]
#[command(name = "scalp_bot_rust", about = "HFT-style paper-trading scalper")]
struct Cli {
    #[command(subcommand)]
    cmd: Option<Cmd>,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Run cycles on a fixed interval until Ctrl-C (default)
    Run {
        /// Overrides CYCLE_INTERVAL_SECS
        #[arg(long)]
        interval_secs: Option<u64>,
        /// Stop after N cycles
        #[arg(long)]
        max_cycles: Option<u64>,
    },
    /// Run a single cycle and print the result as JSON
    Cycle,
    /// Print account + engine stats
    Stats,
    /// Broker account and positions, or holdings of one ticker
    Portfolio {
        #[arg(long)]
        ticker: Option<String>,
    },
    /// Build and print the dynamic watchlist
    Watchlist,
    /// Summarize recent news for a company
    News { company: String },
    /// Performance report from the analytics log
    Report,
}

struct Services {
    market: Arc<dyn MarketData>,
    news: Arc<dyn NewsProvider>,
    broker: Arc<dyn Broker>,
}

fn build_services(args: &Args) -> Services {
    let market: Arc<dyn MarketData> = match args.feed_mode {
        FeedMode::Mock => Arc::new(MockMarketData::default()),
        FeedMode::Yahoo => Arc::new(YahooMarketData::new()),
    };
    let broker: Arc<dyn Broker> = match args.venue_mode {
        VenueMode::Mock => Arc::new(PaperBroker::new(args.paper_starting_equity)),
        VenueMode::AlpacaPaper => Arc::new(AlpacaBroker::new(
            args.alpaca_key_id.clone(),
            args.alpaca_secret_key.clone(),
            &args.alpaca_rest_url,
        )),
    };
    Services { market, news: Arc::new(NewsApiClient::new(args.news_api_key.clone())), broker }
}

fn build_engine(args: &Args, params: ScalpParams, thresholds: SignalThresholds, svc: &Services) -> ScalpEngine {
    let evaluator = SignalEvaluator::new(svc.market.clone(), thresholds);
    let watchlist: Arc<dyn Watchlist> = Arc::new(WatchlistGenerator::new(svc.market.clone(), svc.news.clone()));
    let engine = ScalpEngine::new(params, evaluator, watchlist, svc.broker.clone());
    match &args.log_dir {
        Some(dir) => engine.with_analytics_log(AnalyticsLog::new(dir)),
        None => engine,
    }
}

fn print_json<T: Serialize>(v: &T) {
    match serde_json::to_string_pretty(v) {
        Ok(s) => println!("{s}"),
        Err(e) => error!(?e, "json encode failed"),
    }
}

async fn run_loop(engine: &mut ScalpEngine, every: Duration, max_cycles: Option<u64>) {
    let mut history: VecDeque<CycleResult> = VecDeque::with_capacity(HISTORY_CAP);
    let mut tick = interval(every);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let mut cycles: u64 = 0;
    let mut failed: u64 = 0;
    loop {
        select! {
            _ = &mut shutdown => {
                info!("ctrl-c received, stopping");
                break;
            }
            _ = tick.tick() => {
                match engine.run_cycle().await {
                    Ok(r) => {
                        history.push_front(r);
                        history.truncate(HISTORY_CAP);
                    }
                    Err(e) => {
                        failed += 1;
                        warn!(%e, "cycle failed");
                    }
                }
                cycles += 1;
                let last = history.front();
                info!(
                    cycles,
                    failed,
                    last_trades = last.map(|r| r.trades_executed).unwrap_or(0),
                    active = engine.tracker().count(),
                    daily_trades = engine.counter().trades_count,
                    "heartbeat"
                );
                if max_cycles.is_some_and(|m| cycles >= m) {
                    break;
                }
            }
        }
    }

    let trades: u32 = history.iter().map(|r| r.trades_executed).sum();
    info!(cycles, failed, kept = history.len(), trades, "scalper stopped");
}

#[tokio::main]
async fn main() {
    // ---- Logging ----
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    // ---- Load config ----
    let (args, params, thresholds) = config::load();

    // ---- Metrics ----
    metrics::init();
    if let Some(port) = args.metrics_port {
        metrics::serve_metrics(port);
    }

    info!(
        feed_mode = args.feed_mode.as_str(),
        venue_mode = args.venue_mode.as_str(),
        alpaca_rest = %args.alpaca_rest_url,
        log_dir = ?args.log_dir,
        max_positions = params.max_positions,
        profit_target_pct = params.profit_target_pct,
        stop_loss_pct = params.stop_loss_pct,
        max_hold_minutes = params.max_hold_minutes,
        "startup config"
    );
    metrics::CONFIG_FEED_MODE.with_label_values(&[args.feed_mode.as_str()]).set(1);
    metrics::CONFIG_VENUE_MODE.with_label_values(&[args.venue_mode.as_str()]).set(1);

    let svc = build_services(&args);

    match cli.cmd.unwrap_or(Cmd::Run { interval_secs: None, max_cycles: None }) {
        Cmd::Run { interval_secs, max_cycles } => {
            let every = Duration::from_secs(interval_secs.unwrap_or(args.cycle_interval_secs).max(1));
            let mut engine = build_engine(&args, params, thresholds, &svc);
            info!(every_secs = every.as_secs(), ?max_cycles, "scalper started");
            run_loop(&mut engine, every, max_cycles).await;
        }
        Cmd::Cycle => {
            let mut engine = build_engine(&args, params, thresholds, &svc);
            match engine.run_cycle().await {
                Ok(r) => print_json(&r),
                Err(e) => print_json(&serde_json::json!({ "error": e.to_string() })),
            }
        }
        Cmd::Stats => {
            let engine = build_engine(&args, params, thresholds, &svc);
            match engine.stats().await {
                Ok(s) => print_json(&s),
                Err(e) => print_json(&serde_json::json!({ "error": e.to_string() })),
            }
        }
        Cmd::Portfolio { ticker: Some(ticker) } => match portfolio::holding(svc.broker.as_ref(), &ticker).await {
            Ok(h) => println!("{}", portfolio::describe_holding(h.as_ref())),
            Err(e) => println!("Error checking holdings: {e}"),
        },
        Cmd::Portfolio { ticker: None } => match portfolio::portfolio_summary(svc.broker.as_ref()).await {
            Ok(s) => print_json(&s),
            Err(e) => print_json(&serde_json::json!({ "error": format!("Portfolio summary error: {e}") })),
        },
        Cmd::Watchlist => {
            let list = WatchlistGenerator::new(svc.market.clone(), svc.news.clone()).dynamic_watchlist().await;
            print_json(&list);
        }
        Cmd::News { company } => {
            let llm = GeminiSummarizer::new(args.gemini_api_key.clone(), &args.gemini_model);
            println!("{}", financial_news(&company, svc.news.as_ref(), &llm).await);
        }
        Cmd::Report => match &args.log_dir {
            Some(dir) => {
                let data = AnalyticsLog::new(dir).load().await;
                print_json(&analytics::report(&data));
            }
            None => warn!("TRADING_LOG_DIR=off, nothing to report"),
        },
    }
}
