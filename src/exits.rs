// ===============================
// src/exits.rs
// ===============================
//
// Exit rules for open positions, first match wins:
//   1) profit_pct >= profit_target_pct   -> ProfitTarget
//   2) profit_pct <= -stop_loss_pct      -> StopLoss
//   3) hold_minutes >= max_hold_minutes  -> TimeLimit
// Snapshot absent -> posisi dibiarkan terbuka, tidak ada keputusan.
//

use chrono::{DateTime, Local};
use tracing::debug;

use crate::config::ScalpParams;
use crate::domain::{ExitDecision, ExitReason, Position};
use crate::metrics::EXITS_BY_REASON;
use crate::signal::SignalEvaluator;

pub fn profit_pct(entry_price: f64, current_price: f64) -> f64 {
    (current_price - entry_price) / entry_price * 100.0
}

pub fn hold_minutes(entry_time: DateTime<Local>, now: DateTime<Local>) -> f64 {
    (now - entry_time).num_milliseconds() as f64 / 60_000.0
}

pub fn exit_reason(profit_pct: f64, hold_minutes: f64, params: &ScalpParams) -> Option<ExitReason> {
    if profit_pct >= params.profit_target_pct {
        Some(ExitReason::ProfitTarget)
    } else if profit_pct <= -params.stop_loss_pct {
        Some(ExitReason::StopLoss)
    } else if hold_minutes >= params.max_hold_minutes {
        Some(ExitReason::TimeLimit)
    } else {
        None
    }
}

/// Pure decision for one position at `current_price`.
pub fn decide_exit(pos: &Position, current_price: f64, now: DateTime<Local>, params: &ScalpParams) -> Option<ExitDecision> {
    let pnl = profit_pct(pos.entry_price, current_price);
    let held = hold_minutes(pos.entry_time, now);
    exit_reason(pnl, held, params).map(|reason| ExitDecision {
        ticker: pos.ticker.clone(),
        entry_price: pos.entry_price,
        current_price,
        profit_pct: pnl,
        hold_minutes: held,
        shares: pos.shares,
        reason,
    })
}

fn reason_label(r: ExitReason) -> &'static str {
    match r {
        ExitReason::ProfitTarget => "profit_target",
        ExitReason::StopLoss => "stop_loss",
        ExitReason::TimeLimit => "time_limit",
    }
}

pub async fn evaluate_exits(
    positions: &[Position],
    evaluator: &SignalEvaluator,
    now: DateTime<Local>,
    params: &ScalpParams,
) -> Vec<ExitDecision> {
    let mut exits = Vec::new();
    for pos in positions {
        let Some(snap) = evaluator.evaluate(&pos.ticker).await else {
            debug!(ticker = %pos.ticker, "no fresh price, keep position open");
            continue;
        };
        if let Some(d) = decide_exit(pos, snap.price, now, params) {
            EXITS_BY_REASON.with_label_values(&[reason_label(d.reason)]).inc();
            exits.push(d);
        }
    }
    exits
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SignalThresholds;
    use crate::feed::ReplayMarketData;
    use std::sync::Arc;

    fn position(entry_price: f64, minutes_ago: i64, now: DateTime<Local>) -> Position {
        Position {
            ticker: "AAPL".into(),
            entry_price,
            shares: 10,
            entry_time: now - chrono::Duration::minutes(minutes_ago),
            entry_reason: "test".into(),
        }
    }

    #[test]
    fn profit_target_hit() {
        let now = Local::now();
        let p = ScalpParams { profit_target_pct: 0.4, ..ScalpParams::default() };
        let d = decide_exit(&position(100.0, 0, now), 100.5, now, &p).unwrap();
        assert_eq!(d.reason, ExitReason::ProfitTarget);
        assert!((d.profit_pct - 0.5).abs() < 1e-9);
        assert!(d.describe().starts_with("Profit target"));
    }

    #[test]
    fn stop_loss_beats_time_limit() {
        let now = Local::now();
        let p = ScalpParams { stop_loss_pct: 0.3, ..ScalpParams::default() };
        let d = decide_exit(&position(100.0, 30, now), 99.6, now, &p).unwrap();
        assert_eq!(d.reason, ExitReason::StopLoss);
        assert!(d.describe().starts_with("Stop loss"));
    }

    #[test]
    fn profit_target_beats_time_limit() {
        let p = ScalpParams::default();
        assert_eq!(exit_reason(1.0, 60.0, &p), Some(ExitReason::ProfitTarget));
    }

    #[test]
    fn time_limit_and_hold() {
        let now = Local::now();
        let p = ScalpParams::default();
        assert!(decide_exit(&position(100.0, 1, now), 100.1, now, &p).is_none());
        let d = decide_exit(&position(100.0, 3, now), 100.1, now, &p).unwrap();
        assert_eq!(d.reason, ExitReason::TimeLimit);
        assert!((d.hold_minutes - 3.0).abs() < 1e-6);
    }

    #[test]
    fn exactly_one_reason_per_position() {
        let p = ScalpParams::default();
        for pnl in [-1.0, -0.3, -0.1, 0.0, 0.39, 0.4, 2.0] {
            for held in [0.0, 1.9, 2.0, 10.0] {
                let r = exit_reason(pnl, held, &p);
                if pnl >= 0.4 {
                    assert_eq!(r, Some(ExitReason::ProfitTarget));
                } else if pnl <= -0.3 {
                    assert_eq!(r, Some(ExitReason::StopLoss));
                } else if held >= 2.0 {
                    assert_eq!(r, Some(ExitReason::TimeLimit));
                } else {
                    assert_eq!(r, None);
                }
            }
        }
    }

    #[tokio::test]
    async fn absent_snapshot_leaves_position_alone() {
        let now = Local::now();
        let feed = Arc::new(ReplayMarketData::new());
        feed.set("MSFT", ReplayMarketData::bars(&[300.0; 6], &[1.0; 6]));
        let ev = SignalEvaluator::new(feed, SignalThresholds::default());

        let mut stale = position(100.0, 30, now); // AAPL, no data
        stale.ticker = "AAPL".into();
        let mut msft = position(290.0, 0, now);
        msft.ticker = "MSFT".into();

        let exits = evaluate_exits(&[stale, msft], &ev, now, &ScalpParams::default()).await;
        assert_eq!(exits.len(), 1);
        assert_eq!(exits[0].ticker, "MSFT");
        assert_eq!(exits[0].reason, ExitReason::ProfitTarget);
    }
}
