// ===============================
// src/domain.rs
// ===============================
use chrono::{DateTime, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side { Buy, Sell }
impl Side {
    pub fn as_str(&self) -> &'static str { match self { Side::Buy => "buy", Side::Sell => "sell" } }
    pub fn action(&self) -> &'static str { match self { Side::Buy => "BUY", Side::Sell => "SELL" } }
}

// ---- Market data ----
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar { pub timestamp: i64, pub open: f64, pub high: f64, pub low: f64, pub close: f64, pub volume: f64 }

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend { Up, Down }

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalSnapshot {
    pub ticker: String,
    pub price: f64,
    pub change_pct: f64,
    pub volume_ratio: f64,
    pub trend: Trend,
}

// ---- Positions ----
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub ticker: String,
    pub entry_price: f64,
    pub shares: u64,
    pub entry_time: DateTime<Local>,
    pub entry_reason: String,
}

// ---- Decisions ----
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason { ProfitTarget, StopLoss, TimeLimit }

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExitDecision {
    pub ticker: String,
    pub entry_price: f64,
    pub current_price: f64,
    pub profit_pct: f64,
    pub hold_minutes: f64,
    pub shares: u64,
    pub reason: ExitReason,
}

impl ExitDecision {
    /// Human-readable reason, e.g. "Profit target: +0.50%".
    pub fn describe(&self) -> String {
        match self.reason {
            ExitReason::ProfitTarget => format!("Profit target: +{:.2}%", self.profit_pct),
            ExitReason::StopLoss => format!("Stop loss: {:.2}%", self.profit_pct),
            ExitReason::TimeLimit => format!("Time limit: {:.1}min", self.hold_minutes),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryDecision {
    pub ticker: String,
    pub price: f64,
    pub shares: u64,
    pub change_pct: f64,
    pub volume_ratio: f64,
    pub reason: String,
}

// ---- Execution ----
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderAck { pub order_id: String }

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OrderOutcome {
    Accepted { order_id: String },
    Failed { error: String },
}

impl OrderOutcome {
    pub fn is_accepted(&self) -> bool { matches!(self, OrderOutcome::Accepted { .. }) }

    /// Short text used in the analytics log `result` column.
    pub fn summary(&self, side: Side, shares: u64, ticker: &str) -> String {
        match self {
            OrderOutcome::Accepted { order_id } => format!(
                "{} order executed: {} shares of {}. Order ID: {}",
                side.action(), shares, ticker, order_id
            ),
            OrderOutcome::Failed { error } => format!("Order failed: {error}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeDetail {
    pub ticker: String,
    pub side: Side,
    pub shares: u64,
    pub price: f64,
    /// Only set for sells (percentage move since entry).
    pub pnl_pct: Option<f64>,
    pub reason: String,
    pub order: OrderOutcome,
}

// ---- Cycle ----
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleResult {
    pub timestamp: DateTime<Local>,
    pub trades_executed: u32,
    pub buy_trades: u32,
    pub sell_trades: u32,
    pub total_pnl_pct: f64,
    pub trades: Vec<TradeDetail>,
    pub open_positions: usize,
    pub portfolio_value: Option<f64>,
    /// Why PHASE 2 did not run (no free slots / daily cap). None = entries were scanned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_skipped: Option<String>,
}

impl CycleResult {
    pub fn new(timestamp: DateTime<Local>) -> Self {
        Self {
            timestamp,
            trades_executed: 0,
            buy_trades: 0,
            sell_trades: 0,
            total_pnl_pct: 0.0,
            trades: Vec::new(),
            open_positions: 0,
            portfolio_value: None,
            entry_skipped: None,
        }
    }

    /// Counts a trade. `trades_executed` only moves here, together with the per-side counter.
    pub fn record(&mut self, trade: TradeDetail) {
        match trade.side {
            Side::Buy => self.buy_trades += 1,
            Side::Sell => {
                self.sell_trades += 1;
                self.total_pnl_pct += trade.pnl_pct.unwrap_or(0.0);
            }
        }
        self.trades_executed += 1;
        self.trades.push(trade);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
pub enum CycleError {
    #[error("No stocks available")]
    NoStocksAvailable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyTradeCounter {
    pub date: NaiveDate,
    pub trades_count: u32,
    pub last_trade_time: Option<DateTime<Local>>,
}

// ---- Broker / account ----
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Account { pub cash: f64, pub equity: f64, pub buying_power: f64, pub portfolio_value: f64 }

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrokerPosition { pub symbol: String, pub qty: f64, pub market_value: f64, pub current_price: f64 }

// ---- News ----
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    pub description: Option<String>,
    pub published_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineStats {
    pub portfolio_value: f64,
    pub cash: f64,
    pub buying_power: f64,
    pub active_positions: usize,
    pub max_positions: usize,
    pub daily_trades: u32,
    pub max_daily_trades: u32,
    pub last_trade_time: Option<DateTime<Local>>,
    pub position_size_pct: f64,
    pub strategy: String,
}
