// ===============================
// src/signal.rs
// ===============================
//
// Price/volume snapshot per ticker + the scalping buy policy.
//
// Snapshot:
//   change_pct   = (last close - prev close) / prev close * 100
//   volume_ratio = last volume / mean(last 5 volumes)   (1.0 kalau mean <= 0)
//
// Buy policy (any of):
//   - small dip       : change_pct < dip_pct
//   - volume spike    : volume_ratio > volume_spike
//   - momentum break  : change_pct > momentum_change_pct && volume_ratio > momentum_volume
//
// Kurang sample / fetch gagal -> None (ticker di-skip, bukan error).
//

use std::sync::Arc;

use tracing::debug;

use crate::config::SignalThresholds;
use crate::domain::{Bar, SignalSnapshot, Trend};
use crate::metrics::SIGNALS_ABSENT;
use crate::services::MarketData;

const VOLUME_WINDOW: usize = 5;

pub fn snapshot_from_bars(ticker: &str, bars: &[Bar], min_samples: usize) -> Option<SignalSnapshot> {
    if bars.len() < min_samples.max(2) {
        return None;
    }
    let last = &bars[bars.len() - 1];
    let prev = &bars[bars.len() - 2];
    if prev.close <= 0.0 {
        return None;
    }
    let change_pct = (last.close - prev.close) / prev.close * 100.0;

    let tail = &bars[bars.len().saturating_sub(VOLUME_WINDOW)..];
    let avg_volume = tail.iter().map(|b| b.volume).sum::<f64>() / tail.len() as f64;
    let volume_ratio = if avg_volume > 0.0 { last.volume / avg_volume } else { 1.0 };

    Some(SignalSnapshot {
        ticker: ticker.to_string(),
        price: last.close,
        change_pct,
        volume_ratio,
        trend: if change_pct > 0.0 { Trend::Up } else { Trend::Down },
    })
}

pub fn is_buy_signal(s: &SignalSnapshot, t: &SignalThresholds) -> bool {
    let dip = s.change_pct < t.dip_pct;
    let volume_spike = s.volume_ratio > t.volume_spike;
    let momentum = s.change_pct > t.momentum_change_pct && s.volume_ratio > t.momentum_volume;
    dip || volume_spike || momentum
}

pub struct SignalEvaluator {
    market: Arc<dyn MarketData>,
    thresholds: SignalThresholds,
}

impl SignalEvaluator {
    pub fn new(market: Arc<dyn MarketData>, thresholds: SignalThresholds) -> Self {
        Self { market, thresholds }
    }

    pub fn thresholds(&self) -> &SignalThresholds { &self.thresholds }

    pub async fn evaluate(&self, ticker: &str) -> Option<SignalSnapshot> {
        let t = &self.thresholds;
        let snap = match self.market.fetch_history(ticker, &t.period, &t.interval).await {
            Ok(bars) => snapshot_from_bars(ticker, &bars, t.min_samples),
            Err(e) => {
                debug!(%ticker, %e, "price history unavailable");
                None
            }
        };
        if snap.is_none() {
            SIGNALS_ABSENT.inc();
        }
        snap
    }
}
