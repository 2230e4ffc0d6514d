// ===============================
// src/metrics.rs
// ===============================
use once_cell::sync::Lazy;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry,
    TextEncoder,
};
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread;

// Registry khusus scalper (bukan default global)
pub static REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

// -------- Cycle metrics --------
pub static CYCLES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("cycles_total", "scalping cycles by outcome (ok / error)"),
        &["outcome"],
    )
    .unwrap()
});

pub static CYCLE_LATENCY: Lazy<Histogram> = Lazy::new(|| {
    Histogram::with_opts(
        HistogramOpts::new("cycle_duration_seconds", "Wall time of one exit+entry cycle")
            .buckets(vec![0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0, 120.0]),
    )
    .unwrap()
});

pub static WATCHLIST_SIZE: Lazy<IntGauge> =
    Lazy::new(|| IntGauge::new("watchlist_size", "tickers in the last dynamic watchlist").unwrap());

// -------- Signals / decisions --------
pub static HISTORY_FETCHES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("history_fetches_total", "market data history requests (label: source)"),
        &["source"],
    )
    .unwrap()
});

pub static SIGNALS_ABSENT: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("signals_absent_total", "evaluations skipped for missing data").unwrap()
});

pub static EXITS_BY_REASON: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("exit_decisions_total", "exit decisions (label: reason)"),
        &["reason"],
    )
    .unwrap()
});

// -------- Orders / trades --------
pub static TRADES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(Opts::new("trades_total", "executed trades (label: side)"), &["side"]).unwrap()
});

pub static ORDER_FAILURES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("order_failures_total", "order submissions the broker did not accept"),
        &["side"],
    )
    .unwrap()
});

// -------- State --------
pub static OPEN_POSITIONS: Lazy<IntGauge> =
    Lazy::new(|| IntGauge::new("open_positions", "positions held by the tracker").unwrap());

pub static DAILY_TRADES: Lazy<IntGauge> =
    Lazy::new(|| IntGauge::new("daily_trades", "trades executed today").unwrap());

// ---- Config visibility (feed / venue) ----
pub static CONFIG_FEED_MODE: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(Opts::new("config_feed_mode", "feed mode (label: mode)"), &["mode"]).unwrap()
});

pub static CONFIG_VENUE_MODE: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(Opts::new("config_venue_mode", "venue mode (label: mode)"), &["mode"]).unwrap()
});

/// Registers every collector once. Repeat calls (tests) are harmless.
pub fn init() {
    let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(CYCLES.clone()),
        Box::new(CYCLE_LATENCY.clone()),
        Box::new(WATCHLIST_SIZE.clone()),
        Box::new(HISTORY_FETCHES.clone()),
        Box::new(SIGNALS_ABSENT.clone()),
        Box::new(EXITS_BY_REASON.clone()),
        Box::new(TRADES.clone()),
        Box::new(ORDER_FAILURES.clone()),
        Box::new(OPEN_POSITIONS.clone()),
        Box::new(DAILY_TRADES.clone()),
        Box::new(CONFIG_FEED_MODE.clone()),
        Box::new(CONFIG_VENUE_MODE.clone()),
    ];
    for c in collectors {
        if let Err(e) = REGISTRY.register(c) {
            tracing::debug!(?e, "metric already registered");
        }
    }
}

/// Prometheus text exposition of the scalper registry.
pub fn encode_metrics() -> Vec<u8> {
    let mut out = Vec::new();
    match TextEncoder::new().encode(&REGISTRY.gather(), &mut out) {
        Ok(()) if !out.is_empty() => out,
        _ => b"# scalper: nothing recorded yet\n".to_vec(),
    }
}

fn respond(stream: &mut TcpStream, status: &str, body: &[u8]) {
    let head = format!(
        "HTTP/1.1 {status}\r\nContent-Type: text/plain; version=0.0.4\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    );
    if stream.write_all(head.as_bytes()).and_then(|_| stream.write_all(body)).is_err() {
        tracing::debug!("metrics client went away");
    }
}

// GET /healthz -> "ok"; GET / atau /metrics -> registry; sisanya 404
fn handle_client(mut stream: TcpStream) {
    let mut req = [0u8; 512];
    let n = stream.read(&mut req).unwrap_or(0);
    let line = String::from_utf8_lossy(&req[..n]);
    let path = line.split_whitespace().nth(1).unwrap_or("/");
    match path {
        "/" | "/metrics" => respond(&mut stream, "200 OK", &encode_metrics()),
        "/healthz" => respond(&mut stream, "200 OK", b"ok\n"),
        _ => respond(&mut stream, "404 Not Found", b"not found\n"),
    }
}

// Metrics server in a dedicated OS thread; the trading loop stays on the runtime
pub fn serve_metrics(port: u16) {
    thread::spawn(move || {
        let addr = format!("0.0.0.0:{port}");
        let listener = match TcpListener::bind(&addr) {
            Ok(l) => l,
            Err(e) => {
                tracing::error!(%addr, ?e, "metrics bind failed");
                return;
            }
        };
        tracing::info!("metrics listening on http://{addr}/ (and /metrics)");

        for conn in listener.incoming() {
            match conn {
                Ok(stream) => handle_client(stream),
                Err(e) => tracing::warn!(?e, "metrics accept error"),
            }
        }
    });
}
