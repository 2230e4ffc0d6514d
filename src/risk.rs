// ===============================
// src/risk.rs
// ===============================
use chrono::{DateTime, Local, NaiveDate};
use thiserror::Error;

use crate::config::ScalpParams;
use crate::domain::DailyTradeCounter;
use crate::metrics::DAILY_TRADES;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RiskError {
    #[error("Daily trade limit reached ({0})")]
    DailyLimit(u32),
    #[error("No free position slots")]
    NoSlots,
}

impl DailyTradeCounter {
    pub fn new(date: NaiveDate) -> Self {
        Self { date, trades_count: 0, last_trade_time: None }
    }

    /// Resets the counter when `today` differs from the stored date. Returns true on reset.
    pub fn roll(&mut self, today: NaiveDate) -> bool {
        if self.date == today {
            return false;
        }
        self.date = today;
        self.trades_count = 0;
        self.last_trade_time = None;
        DAILY_TRADES.set(0);
        true
    }

    pub fn record_trade(&mut self, at: DateTime<Local>) {
        self.trades_count += 1;
        self.last_trade_time = Some(at);
        DAILY_TRADES.set(self.trades_count as i64);
    }

    pub fn remaining(&self, max_daily_trades: u32) -> u32 {
        max_daily_trades.saturating_sub(self.trades_count)
    }
}

/// Slots for new entries this cycle: min(free position slots, trades left today).
pub fn entry_budget(open_positions: usize, counter: &DailyTradeCounter, params: &ScalpParams) -> Result<usize, RiskError> {
    let slots = params.max_positions.saturating_sub(open_positions);
    if slots == 0 {
        return Err(RiskError::NoSlots);
    }
    let left = counter.remaining(params.max_daily_trades) as usize;
    if left == 0 {
        return Err(RiskError::DailyLimit(params.max_daily_trades));
    }
    Ok(slots.min(left))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    #[test]
    fn rolls_only_on_new_date() {
        let mut c = DailyTradeCounter::new(day(2));
        c.record_trade(Local::now());
        assert!(!c.roll(day(2)));
        assert_eq!(c.trades_count, 1);
        assert!(c.roll(day(3)));
        assert_eq!(c.trades_count, 0);
        assert!(c.last_trade_time.is_none());
    }

    #[test]
    fn budget_is_min_of_slots_and_daily_left() {
        let p = ScalpParams { max_positions: 6, max_daily_trades: 30, ..ScalpParams::default() };
        let mut c = DailyTradeCounter::new(day(2));
        assert_eq!(entry_budget(2, &c, &p), Ok(4));
        for _ in 0..28 {
            c.record_trade(Local::now());
        }
        assert_eq!(entry_budget(2, &c, &p), Ok(2));
        c.record_trade(Local::now());
        c.record_trade(Local::now());
        assert_eq!(entry_budget(2, &c, &p), Err(RiskError::DailyLimit(30)));
        assert_eq!(entry_budget(6, &c, &p), Err(RiskError::NoSlots));
    }
}
