// ===============================
// src/entries.rs
// ===============================
//
// Entry scan over the watchlist (in the order given):
// - slot habis -> berhenti total (bukan sekadar skip)
// - sudah pegang ticker -> skip
// - snapshot absent -> skip
// - buy policy lolos -> shares = max(1, floor(position_size / price))
//

use tracing::debug;

use crate::config::SignalThresholds;
use crate::domain::{EntryDecision, SignalSnapshot};
use crate::positions::PositionTracker;
use crate::signal::{is_buy_signal, SignalEvaluator};

pub fn shares_for(position_size: f64, price: f64) -> u64 {
    if price <= 0.0 || !price.is_finite() {
        return 1;
    }
    ((position_size / price).floor() as u64).max(1)
}

pub fn decide_entry(snap: &SignalSnapshot, position_size: f64, thresholds: &SignalThresholds) -> Option<EntryDecision> {
    if !is_buy_signal(snap, thresholds) {
        return None;
    }
    Some(EntryDecision {
        ticker: snap.ticker.clone(),
        price: snap.price,
        shares: shares_for(position_size, snap.price),
        change_pct: snap.change_pct,
        volume_ratio: snap.volume_ratio,
        reason: format!("HFT Entry: {:.2}% move", snap.change_pct),
    })
}

pub async fn evaluate_entries(
    watchlist: &[String],
    tracker: &PositionTracker,
    available_slots: usize,
    position_size: f64,
    evaluator: &SignalEvaluator,
) -> Vec<EntryDecision> {
    let mut slots = available_slots;
    let mut entries = Vec::new();
    for ticker in watchlist {
        if slots == 0 {
            break;
        }
        if tracker.contains(ticker) || entries.iter().any(|e: &EntryDecision| &e.ticker == ticker) {
            continue;
        }
        let Some(snap) = evaluator.evaluate(ticker).await else { continue };
        match decide_entry(&snap, position_size, evaluator.thresholds()) {
            Some(d) => {
                slots -= 1;
                entries.push(d);
            }
            None => debug!(%ticker, change_pct = snap.change_pct, volume_ratio = snap.volume_ratio, "no buy signal"),
        }
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::ReplayMarketData;
    use std::sync::Arc;

    // dip of -0.5% on the last bar -> buy
    fn dip_bars(price: f64) -> Vec<crate::domain::Bar> {
        let prev = price / 0.995;
        ReplayMarketData::bars(&[prev, prev, prev, prev, price], &[100.0; 5])
    }

    fn flat_bars(price: f64) -> Vec<crate::domain::Bar> {
        ReplayMarketData::bars(&[price; 5], &[100.0; 5])
    }

    #[test]
    fn share_sizing() {
        assert_eq!(shares_for(1000.0, 333.0), 3);
        assert_eq!(shares_for(100.0, 250.0), 1);
        assert_eq!(shares_for(1000.0, 0.0), 1);
    }

    #[tokio::test]
    async fn stops_when_slots_exhausted() {
        let feed = Arc::new(ReplayMarketData::new());
        for t in ["A", "B", "C"] {
            feed.set(t, dip_bars(50.0));
        }
        let ev = SignalEvaluator::new(feed, SignalThresholds::default());
        let wl: Vec<String> = ["A", "B", "C"].iter().map(|s| s.to_string()).collect();

        let got = evaluate_entries(&wl, &PositionTracker::new(), 2, 1000.0, &ev).await;
        let tickers: Vec<&str> = got.iter().map(|d| d.ticker.as_str()).collect();
        assert_eq!(tickers, vec!["A", "B"]);
        assert_eq!(got[0].shares, 20);

        assert!(evaluate_entries(&wl, &PositionTracker::new(), 0, 1000.0, &ev).await.is_empty());
    }

    #[tokio::test]
    async fn skips_held_flat_and_missing() {
        let feed = Arc::new(ReplayMarketData::new());
        feed.set("HELD", dip_bars(10.0));
        feed.set("FLAT", flat_bars(10.0));
        feed.set("GO", dip_bars(10.0));
        let ev = SignalEvaluator::new(feed, SignalThresholds::default());
        let mut tracker = PositionTracker::new();
        tracker.open("HELD", 10.0, 1, "x");
        let wl: Vec<String> = ["HELD", "MISSING", "FLAT", "GO"].iter().map(|s| s.to_string()).collect();

        let got = evaluate_entries(&wl, &tracker, 5, 100.0, &ev).await;
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].ticker, "GO");
        assert!(got[0].reason.starts_with("HFT Entry"));
    }
}
