// ===============================
// src/recorder.rs
// ===============================
//
// Analytics log untuk dashboard / report:
// - trades.json    : JSON array, max 1000 record terakhir
// - decisions.json : JSON array, max 2000 record terakhir
// - Tiap append: load -> push -> trim -> tulis ulang (pretty).
// - Parent directory dibuat otomatis.
// - Gagal baca/tulis cuma di-log; trading logic tidak pernah membaca file ini.
//
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tokio::fs;
use tracing::{error, warn};

use crate::domain::Side;

pub const MAX_TRADE_RECORDS: usize = 1000;
pub const MAX_DECISION_RECORDS: usize = 2000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub timestamp: DateTime<Local>,
    pub ticker: String,
    pub action: String,
    pub shares: u64,
    pub price: f64,
    pub result: String,
    pub investment: f64,
    pub pnl: f64,
}

impl TradeRecord {
    /// Cash-flow style pnl: buys are negative (cost), sells positive (revenue).
    pub fn new(ticker: &str, side: Side, shares: u64, price: f64, result: String, at: DateTime<Local>) -> Self {
        let investment = shares as f64 * price;
        let pnl = match side { Side::Buy => -investment, Side::Sell => investment };
        Self {
            timestamp: at,
            ticker: ticker.to_string(),
            action: side.action().to_string(),
            shares,
            price,
            result,
            investment,
            pnl,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub timestamp: DateTime<Local>,
    pub ticker: String,
    pub action: String,
    pub reason: String,
    pub price: f64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub change_pct: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub volume_ratio: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub profit_pct: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalyticsData {
    pub trades: Vec<TradeRecord>,
    pub decisions: Vec<DecisionRecord>,
}

#[derive(Debug, Clone)]
pub struct AnalyticsLog {
    dir: PathBuf,
    max_trades: usize,
    max_decisions: usize,
}

impl AnalyticsLog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into(), max_trades: MAX_TRADE_RECORDS, max_decisions: MAX_DECISION_RECORDS }
    }

    pub fn with_caps(mut self, max_trades: usize, max_decisions: usize) -> Self {
        self.max_trades = max_trades;
        self.max_decisions = max_decisions;
        self
    }

    fn trades_path(&self) -> PathBuf { self.dir.join("trades.json") }
    fn decisions_path(&self) -> PathBuf { self.dir.join("decisions.json") }

    pub async fn log_trade(&self, rec: TradeRecord) {
        append_capped(&self.trades_path(), rec, self.max_trades).await;
    }

    pub async fn log_decision(&self, rec: DecisionRecord) {
        append_capped(&self.decisions_path(), rec, self.max_decisions).await;
    }

    pub async fn load(&self) -> AnalyticsData {
        AnalyticsData {
            trades: load_vec(&self.trades_path()).await,
            decisions: load_vec(&self.decisions_path()).await,
        }
    }
}

async fn load_vec<T: DeserializeOwned>(path: &Path) -> Vec<T> {
    match fs::read(path).await {
        Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
            warn!(?e, path = %path.display(), "analytics: unreadable log, starting fresh");
            Vec::new()
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
        Err(e) => {
            error!(?e, path = %path.display(), "analytics: read failed");
            Vec::new()
        }
    }
}

async fn append_capped<T: Serialize + DeserializeOwned>(path: &Path, rec: T, cap: usize) {
    // Pastikan parent directory ada
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            if let Err(e) = fs::create_dir_all(parent).await {
                error!(?e, path = %path.display(), "analytics: create_dir_all failed");
                return;
            }
        }
    }

    let mut rows: Vec<T> = load_vec(path).await;
    rows.push(rec);
    if rows.len() > cap {
        let excess = rows.len() - cap;
        rows.drain(..excess);
    }

    let body = match serde_json::to_vec_pretty(&rows) {
        Ok(b) => b,
        Err(e) => {
            error!(?e, "analytics: serialize error, skip record");
            return;
        }
    };
    if let Err(e) = fs::write(path, body).await {
        error!(?e, path = %path.display(), "analytics: write failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decision(i: usize) -> DecisionRecord {
        DecisionRecord {
            timestamp: Local::now(),
            ticker: format!("T{i}"),
            action: "BUY".into(),
            reason: "dip".into(),
            price: 1.0,
            change_pct: Some(-0.2),
            volume_ratio: None,
            profit_pct: None,
        }
    }

    #[tokio::test]
    async fn trades_are_capped_to_most_recent() {
        let dir = tempfile::tempdir().unwrap();
        let log = AnalyticsLog::new(dir.path().join("logs")).with_caps(3, 2);
        for i in 0..5u64 {
            let rec = TradeRecord::new(&format!("T{i}"), Side::Buy, i + 1, 10.0, "ok".into(), Local::now());
            log.log_trade(rec).await;
        }
        for i in 0..3 {
            log.log_decision(decision(i)).await;
        }
        let data = log.load().await;
        let tickers: Vec<&str> = data.trades.iter().map(|t| t.ticker.as_str()).collect();
        assert_eq!(tickers, vec!["T2", "T3", "T4"]);
        assert_eq!(data.decisions.len(), 2);
        assert_eq!(data.decisions[0].ticker, "T1");
    }

    #[test]
    fn trade_pnl_sign_follows_side() {
        let buy = TradeRecord::new("A", Side::Buy, 3, 10.0, String::new(), Local::now());
        let sell = TradeRecord::new("A", Side::Sell, 3, 10.0, String::new(), Local::now());
        assert_eq!(buy.pnl, -30.0);
        assert_eq!(sell.pnl, 30.0);
        assert_eq!(sell.action, "SELL");
    }

    #[tokio::test]
    async fn corrupt_file_starts_fresh() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("trades.json"), b"not json").unwrap();
        let log = AnalyticsLog::new(dir.path());
        assert!(log.load().await.trades.is_empty());
        log.log_trade(TradeRecord::new("A", Side::Sell, 1, 1.0, String::new(), Local::now())).await;
        assert_eq!(log.load().await.trades.len(), 1);
    }
}
