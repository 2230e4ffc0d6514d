// ===============================
// src/feed.rs
// ===============================
//
// Market data adapters:
// - YahooMarketData  : Yahoo Finance v8 chart API (range/interval bars)
// - MockMarketData   : random-walk generator, no network
// - ReplayMarketData : preloaded bars per ticker (replay & tests)
//
// Notes:
// - Bars always come back oldest-first.
// - Rows with a null close (Yahoo does this for the forming candle) are dropped.
//

use std::sync::Mutex;

use ahash::AHashMap as HashMap;
use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::domain::Bar;
use crate::metrics::HISTORY_FETCHES;
use crate::services::{MarketData, ServiceError};

const YAHOO_CHART_BASE: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

// ---- Yahoo chart payload (subset) ----
#[derive(Debug, Deserialize)]
struct ChartEnvelope { chart: Chart }

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators { quote: Vec<Quote> }

#[derive(Debug, Default, Deserialize)]
struct Quote {
    #[serde(default)] open: Vec<Option<f64>>,
    #[serde(default)] high: Vec<Option<f64>>,
    #[serde(default)] low: Vec<Option<f64>>,
    #[serde(default)] close: Vec<Option<f64>>,
    #[serde(default)] volume: Vec<Option<f64>>,
}

fn bars_from_chart(env: ChartEnvelope) -> Result<Vec<Bar>, ServiceError> {
    if let Some(err) = env.chart.error.filter(|e| !e.is_null()) {
        return Err(ServiceError::Rejected(err.to_string()));
    }
    let result = env
        .chart
        .result
        .and_then(|mut r| if r.is_empty() { None } else { Some(r.swap_remove(0)) })
        .ok_or_else(|| ServiceError::Decode("chart has no result".to_string()))?;
    let quote = result.indicators.quote.into_iter().next().unwrap_or_default();

    let at = |v: &Vec<Option<f64>>, i: usize| v.get(i).copied().flatten();
    let bars = result
        .timestamp
        .iter()
        .enumerate()
        .filter_map(|(i, ts)| {
            let close = at(&quote.close, i)?;
            Some(Bar {
                timestamp: *ts,
                open: at(&quote.open, i).unwrap_or(close),
                high: at(&quote.high, i).unwrap_or(close),
                low: at(&quote.low, i).unwrap_or(close),
                close,
                volume: at(&quote.volume, i).unwrap_or(0.0),
            })
        })
        .collect();
    Ok(bars)
}

/// Yahoo Finance chart API. No key needed, but it wants a browser-ish User-Agent.
pub struct YahooMarketData {
    http: reqwest::Client,
    base: String,
}

impl YahooMarketData {
    pub fn new() -> Self {
        Self::with_base(YAHOO_CHART_BASE)
    }

    pub fn with_base(base: &str) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("Mozilla/5.0 (scalp_bot_rust)")
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { http, base: base.trim_end_matches('/').to_string() }
    }
}

impl Default for YahooMarketData {
    fn default() -> Self { Self::new() }
}

#[async_trait]
impl MarketData for YahooMarketData {
    async fn fetch_history(&self, ticker: &str, period: &str, interval: &str) -> Result<Vec<Bar>, ServiceError> {
        let raw = format!("{}/{}", self.base, urlencoding::encode(ticker));
        let url = Url::parse_with_params(&raw, &[("range", period), ("interval", interval)])
            .map_err(|e| ServiceError::Decode(format!("bad chart url {raw}: {e}")))?;

        HISTORY_FETCHES.with_label_values(&["yahoo"]).inc();
        let rsp = self.http.get(url).send().await?;
        if !rsp.status().is_success() {
            let code = rsp.status().as_u16();
            let body = rsp.text().await.unwrap_or_default();
            return Err(ServiceError::Status { code, body });
        }
        let env = rsp.json::<ChartEnvelope>().await?;
        let bars = bars_from_chart(env)?;
        debug!(%ticker, %period, %interval, rows = bars.len(), "yahoo history");
        Ok(bars)
    }
}

/// Random-walk market data (offline runs). Each ticker keeps walking from
/// where the previous call left it.
pub struct MockMarketData {
    bars_per_call: usize,
    last_px: Mutex<HashMap<String, f64>>,
}

impl MockMarketData {
    pub fn new(bars_per_call: usize) -> Self {
        Self { bars_per_call, last_px: Mutex::new(HashMap::new()) }
    }
}

impl Default for MockMarketData {
    fn default() -> Self { Self::new(30) }
}

#[async_trait]
impl MarketData for MockMarketData {
    async fn fetch_history(&self, ticker: &str, _period: &str, _interval: &str) -> Result<Vec<Bar>, ServiceError> {
        HISTORY_FETCHES.with_label_values(&["mock"]).inc();
        // jangan simpan ThreadRng melewati .await (di sini memang tidak ada await)
        let mut rng = rand::thread_rng();
        let mut last = self
            .last_px
            .lock()
            .map_err(|_| ServiceError::Decode("mock feed state poisoned".to_string()))?;
        let start = *last.entry(ticker.to_string()).or_insert_with(|| rng.gen_range(20.0..500.0));

        let now = Utc::now().timestamp();
        let n = self.bars_per_call;
        let mut px = start;
        let mut bars = Vec::with_capacity(n);
        for i in 0..n {
            let open = px;
            let step = rng.gen_range(-0.004..=0.004);
            px = (px * (1.0 + step)).max(1.0);
            bars.push(Bar {
                timestamp: now - ((n - i) as i64) * 120,
                open,
                high: open.max(px),
                low: open.min(px),
                close: px,
                volume: rng.gen_range(50_000.0..150_000.0),
            });
        }
        last.insert(ticker.to_string(), px);
        Ok(bars)
    }
}

/// Serves preloaded bars. Unknown tickers fail like a network error would.
#[derive(Default)]
pub struct ReplayMarketData {
    series: Mutex<HashMap<String, Vec<Bar>>>,
}

impl ReplayMarketData {
    pub fn new() -> Self { Self::default() }

    pub fn set(&self, ticker: &str, bars: Vec<Bar>) {
        if let Ok(mut s) = self.series.lock() {
            s.insert(ticker.to_string(), bars);
        }
    }

    /// Bars with the given closes and volumes, 2 minutes apart.
    pub fn bars(closes: &[f64], volumes: &[f64]) -> Vec<Bar> {
        closes
            .iter()
            .zip(volumes.iter())
            .enumerate()
            .map(|(i, (c, v))| Bar {
                timestamp: 1_700_000_000 + (i as i64) * 120,
                open: *c,
                high: *c,
                low: *c,
                close: *c,
                volume: *v,
            })
            .collect()
    }
}

#[async_trait]
impl MarketData for ReplayMarketData {
    async fn fetch_history(&self, ticker: &str, _period: &str, _interval: &str) -> Result<Vec<Bar>, ServiceError> {
        let s = self
            .series
            .lock()
            .map_err(|_| ServiceError::Decode("replay state poisoned".to_string()))?;
        s.get(ticker)
            .cloned()
            .ok_or_else(|| ServiceError::Rejected(format!("no data for {ticker}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chart_rows_with_null_close_are_dropped() {
        let raw = r#"{"chart":{"result":[{"timestamp":[1,2,3],
            "indicators":{"quote":[{"open":[10.0,11.0,null],"high":[10.5,11.5,null],
            "low":[9.5,10.5,null],"close":[10.2,11.1,null],"volume":[100,200,null]}]}}],"error":null}}"#;
        let env: ChartEnvelope = serde_json::from_str(raw).unwrap();
        let bars = bars_from_chart(env).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[1].close, 11.1);
        assert_eq!(bars[1].volume, 200.0);
    }

    #[test]
    fn chart_error_is_reported() {
        let raw = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found"}}}"#;
        let env: ChartEnvelope = serde_json::from_str(raw).unwrap();
        assert!(matches!(bars_from_chart(env), Err(ServiceError::Rejected(_))));
    }

    #[tokio::test]
    async fn mock_feed_continues_walk_between_calls() {
        let feed = MockMarketData::new(10);
        let a = feed.fetch_history("AAPL", "1d", "2m").await.unwrap();
        let b = feed.fetch_history("AAPL", "1d", "2m").await.unwrap();
        assert_eq!(a.len(), 10);
        assert_eq!(b[0].open, a[9].close);
    }

    #[tokio::test]
    async fn replay_unknown_ticker_fails() {
        let feed = ReplayMarketData::new();
        feed.set("MSFT", ReplayMarketData::bars(&[1.0, 2.0], &[10.0, 10.0]));
        assert_eq!(feed.fetch_history("MSFT", "1d", "2m").await.unwrap().len(), 2);
        assert!(feed.fetch_history("NOPE", "1d", "2m").await.is_err());
    }
}
