// ===============================
// src/analytics.rs
// ===============================
use ahash::AHashMap as HashMap;
use serde::Serialize;

use crate::recorder::{AnalyticsData, TradeRecord};

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct PerformanceMetrics {
    pub total_trades: usize,
    pub win_rate: f64,
    pub total_pnl: f64,
    pub avg_trade_pnl: f64,
    pub best_trade: f64,
    pub worst_trade: f64,
    /// mean / sample-std of pnl / investment per trade
    pub sharpe_ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickerActivity {
    pub ticker: String,
    pub trades: usize,
    pub pnl: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub performance: PerformanceMetrics,
    pub decisions: usize,
    pub by_ticker: Vec<TickerActivity>,
}

pub fn performance(trades: &[TradeRecord]) -> PerformanceMetrics {
    if trades.is_empty() {
        return PerformanceMetrics::default();
    }
    let n = trades.len() as f64;
    let pnls: Vec<f64> = trades.iter().map(|t| t.pnl).collect();
    let wins = pnls.iter().filter(|p| **p > 0.0).count() as f64;
    let total: f64 = pnls.iter().sum();

    let returns: Vec<f64> = trades
        .iter()
        .map(|t| if t.investment != 0.0 { t.pnl / t.investment } else { t.pnl })
        .collect();
    let mean_r = returns.iter().sum::<f64>() / n;
    let std_r = if returns.len() > 1 {
        (returns.iter().map(|r| (r - mean_r).powi(2)).sum::<f64>() / (n - 1.0)).sqrt()
    } else {
        0.0
    };

    PerformanceMetrics {
        total_trades: trades.len(),
        win_rate: wins / n * 100.0,
        total_pnl: total,
        avg_trade_pnl: total / n,
        best_trade: pnls.iter().cloned().fold(f64::MIN, f64::max),
        worst_trade: pnls.iter().cloned().fold(f64::MAX, f64::min),
        sharpe_ratio: if std_r > 0.0 { mean_r / std_r } else { 0.0 },
    }
}

pub fn report(data: &AnalyticsData) -> Report {
    let mut by: HashMap<&str, (usize, f64)> = HashMap::new();
    for t in &data.trades {
        let e = by.entry(t.ticker.as_str()).or_insert((0, 0.0));
        e.0 += 1;
        e.1 += t.pnl;
    }
    let mut by_ticker: Vec<TickerActivity> = by
        .into_iter()
        .map(|(k, (trades, pnl))| TickerActivity { ticker: k.to_string(), trades, pnl })
        .collect();
    by_ticker.sort_by(|a, b| b.trades.cmp(&a.trades).then_with(|| a.ticker.cmp(&b.ticker)));

    Report { performance: performance(&data.trades), decisions: data.decisions.len(), by_ticker }
}
