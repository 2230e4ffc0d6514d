// ===============================
// src/positions.rs (open position tracker)
// ===============================
//
// What we *believe* we hold. Updated on order intent, not on confirmed
// fills, and never reconciled against the broker ledger.
//

use ahash::AHashMap as HashMap;
use chrono::{DateTime, Local};

use crate::domain::Position;
use crate::metrics::OPEN_POSITIONS;

#[derive(Debug, Default, Clone)]
pub struct PositionTracker {
    open: HashMap<String, Position>,
}

impl PositionTracker {
    pub fn new() -> Self { Self::default() }

    pub fn open(&mut self, ticker: &str, entry_price: f64, shares: u64, reason: &str) {
        self.open_at(ticker, entry_price, shares, reason, Local::now());
    }

    /// Last writer wins: an existing position for `ticker` is replaced.
    pub fn open_at(&mut self, ticker: &str, entry_price: f64, shares: u64, reason: &str, at: DateTime<Local>) {
        let pos = Position {
            ticker: ticker.to_string(),
            entry_price,
            shares,
            entry_time: at,
            entry_reason: reason.to_string(),
        };
        self.open.insert(ticker.to_string(), pos);
        OPEN_POSITIONS.set(self.open.len() as i64);
    }

    /// No-op (returns None) when nothing is open for `ticker`.
    pub fn close(&mut self, ticker: &str) -> Option<Position> {
        let closed = self.open.remove(ticker);
        OPEN_POSITIONS.set(self.open.len() as i64);
        closed
    }

    pub fn get(&self, ticker: &str) -> Option<&Position> { self.open.get(ticker) }

    pub fn contains(&self, ticker: &str) -> bool { self.open.contains_key(ticker) }

    /// Oldest entry first.
    pub fn list_open(&self) -> Vec<Position> {
        let mut out: Vec<Position> = self.open.values().cloned().collect();
        out.sort_by(|a, b| a.entry_time.cmp(&b.entry_time).then_with(|| a.ticker.cmp(&b.ticker)));
        out
    }

    pub fn count(&self) -> usize { self.open.len() }

    pub fn clear(&mut self) {
        self.open.clear();
        OPEN_POSITIONS.set(0);
    }
}
