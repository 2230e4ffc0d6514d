// ===============================
// src/engine.rs (scalping cycle orchestrator)
// ===============================
//
// One cycle = reset harian -> watchlist -> PHASE 1 exits (sell) ->
// PHASE 2 entries (buy) -> summary.
//
// The engine owns all mutable trading state (tracker + daily counter).
// `run_cycle` takes `&mut self`, so two cycles on one engine cannot overlap.
//
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Duration as ChronoDuration, Local};
use tokio::time::sleep;
use tracing::{info, warn};

use crate::config::ScalpParams;
use crate::domain::{
    CycleError, CycleResult, DailyTradeCounter, EngineStats, OrderOutcome, Side, TradeDetail,
};
use crate::entries::evaluate_entries;
use crate::exits::evaluate_exits;
use crate::metrics::{CYCLES, CYCLE_LATENCY, ORDER_FAILURES, TRADES};
use crate::positions::PositionTracker;
use crate::recorder::{AnalyticsLog, DecisionRecord, TradeRecord};
use crate::risk::entry_budget;
use crate::services::{Broker, ServiceError};
use crate::signal::SignalEvaluator;
use crate::watchlist::Watchlist;

pub const STRATEGY_NAME: &str = "HFT_SCALPING";

pub struct ScalpEngine {
    params: ScalpParams,
    evaluator: SignalEvaluator,
    watchlist: Arc<dyn Watchlist>,
    broker: Arc<dyn Broker>,
    tracker: PositionTracker,
    counter: DailyTradeCounter,
    log: Option<AnalyticsLog>,
}

impl ScalpEngine {
    pub fn new(
        params: ScalpParams,
        evaluator: SignalEvaluator,
        watchlist: Arc<dyn Watchlist>,
        broker: Arc<dyn Broker>,
    ) -> Self {
        Self {
            params,
            evaluator,
            watchlist,
            broker,
            tracker: PositionTracker::new(),
            counter: DailyTradeCounter::new(Local::now().date_naive()),
            log: None,
        }
    }

    pub fn with_analytics_log(mut self, log: AnalyticsLog) -> Self {
        self.log = Some(log);
        self
    }

    pub fn params(&self) -> &ScalpParams { &self.params }
    pub fn tracker(&self) -> &PositionTracker { &self.tracker }
    pub fn tracker_mut(&mut self) -> &mut PositionTracker { &mut self.tracker }
    pub fn counter(&self) -> &DailyTradeCounter { &self.counter }
    pub fn counter_mut(&mut self) -> &mut DailyTradeCounter { &mut self.counter }

    /// position_size_pct of portfolio value, floored at min_position_usd.
    /// Falls back to fallback_position_usd when the account can't be read.
    pub async fn position_size(&self) -> f64 {
        match self.broker.get_account().await {
            Ok(a) => (a.portfolio_value * self.params.position_size_pct / 100.0).max(self.params.min_position_usd),
            Err(e) => {
                warn!(%e, fallback = self.params.fallback_position_usd, "account unavailable, using fallback size");
                self.params.fallback_position_usd
            }
        }
    }

    pub async fn run_cycle(&mut self) -> Result<CycleResult, CycleError> {
        self.run_cycle_at(Local::now()).await
    }

    pub async fn run_cycle_at(&mut self, now: DateTime<Local>) -> Result<CycleResult, CycleError> {
        let started = Instant::now();
        info!(
            position_size_pct = self.params.position_size_pct,
            profit_target_pct = self.params.profit_target_pct,
            "starting scalping cycle"
        );

        // ---- Reset harian (posisi ikut dibuang) ----
        if self.counter.roll(now.date_naive()) {
            let dropped = self.tracker.count();
            self.tracker.clear();
            info!(date = %now.date_naive(), dropped, "new trading day: counter reset, positions cleared");
        }

        let watchlist = self.watchlist.dynamic_watchlist().await;
        if watchlist.is_empty() {
            warn!("no stocks found for trading");
            CYCLES.with_label_values(&["error"]).inc();
            return Err(CycleError::NoStocksAvailable);
        }

        let mut result = CycleResult::new(now);

        // ---- PHASE 1: exits ----
        let open = self.tracker.list_open();
        info!(active = open.len(), "phase 1: managing open positions");
        let exits = evaluate_exits(&open, &self.evaluator, now, &self.params).await;
        for d in exits {
            let reason = d.describe();
            info!(ticker = %d.ticker, %reason, "exit signal");
            let order = self.execute(&d.ticker, Side::Sell, d.shares, d.current_price, now).await;
            // tracker = intent: dihapus apa pun hasil order
            self.tracker.close(&d.ticker);
            self.log_decision(DecisionRecord {
                timestamp: now,
                ticker: d.ticker.clone(),
                action: Side::Sell.action().to_string(),
                reason: reason.clone(),
                price: d.current_price,
                change_pct: None,
                volume_ratio: None,
                profit_pct: Some(d.profit_pct),
            })
            .await;
            result.record(TradeDetail {
                ticker: d.ticker,
                side: Side::Sell,
                shares: d.shares,
                price: d.current_price,
                pnl_pct: Some(d.profit_pct),
                reason,
                order,
            });
        }

        // ---- PHASE 2: entries ----
        match entry_budget(self.tracker.count(), &self.counter, &self.params) {
            Ok(slots) => {
                info!(slots, "phase 2: scanning for new entries");
                let size = self.position_size().await;
                let entries = evaluate_entries(&watchlist, &self.tracker, slots, size, &self.evaluator).await;
                for (i, e) in entries.into_iter().enumerate() {
                    if i > 0 && !self.params.entry_pacing.is_zero() {
                        sleep(self.params.entry_pacing).await;
                    }
                    // waktu eksekusi nyata (setelah pacing), bukan awal cycle
                    let at = now + ChronoDuration::from_std(started.elapsed()).unwrap_or_else(|_| ChronoDuration::zero());
                    info!(ticker = %e.ticker, price = e.price, change_pct = e.change_pct, shares = e.shares, "buy signal");
                    let order = self.execute(&e.ticker, Side::Buy, e.shares, e.price, at).await;
                    self.tracker.open_at(&e.ticker, e.price, e.shares, &e.reason, at);
                    self.log_decision(DecisionRecord {
                        timestamp: at,
                        ticker: e.ticker.clone(),
                        action: Side::Buy.action().to_string(),
                        reason: e.reason.clone(),
                        price: e.price,
                        change_pct: Some(e.change_pct),
                        volume_ratio: Some(e.volume_ratio),
                        profit_pct: None,
                    })
                    .await;
                    result.record(TradeDetail {
                        ticker: e.ticker,
                        side: Side::Buy,
                        shares: e.shares,
                        price: e.price,
                        pnl_pct: None,
                        reason: e.reason,
                        order,
                    });
                }
            }
            Err(reason) => {
                info!(%reason, "phase 2 skipped");
                result.entry_skipped = Some(reason.to_string());
            }
        }

        // ---- Summary ----
        result.open_positions = self.tracker.count();
        result.portfolio_value = self.broker.get_account().await.ok().map(|a| a.portfolio_value);

        CYCLES.with_label_values(&["ok"]).inc();
        CYCLE_LATENCY.observe(started.elapsed().as_secs_f64());
        info!(
            trades = result.trades_executed,
            buys = result.buy_trades,
            sells = result.sell_trades,
            active = result.open_positions,
            portfolio = ?result.portfolio_value,
            pnl_pct = result.total_pnl_pct,
            "cycle complete"
        );
        Ok(result)
    }

    /// Submits the order and books the trade whatever the broker says.
    async fn execute(&mut self, ticker: &str, side: Side, shares: u64, price: f64, now: DateTime<Local>) -> OrderOutcome {
        let outcome = match self.broker.submit_market_order(ticker, shares, side).await {
            Ok(ack) => OrderOutcome::Accepted { order_id: ack.order_id },
            Err(e) => {
                warn!(%ticker, side = side.as_str(), %e, "order not accepted, tracking intent anyway");
                ORDER_FAILURES.with_label_values(&[side.as_str()]).inc();
                OrderOutcome::Failed { error: e.to_string() }
            }
        };
        TRADES.with_label_values(&[side.as_str()]).inc();
        self.counter.record_trade(now);

        if let Some(log) = &self.log {
            let rec = TradeRecord::new(ticker, side, shares, price, outcome.summary(side, shares, ticker), now);
            log.log_trade(rec).await;
        }
        outcome
    }

    async fn log_decision(&self, rec: DecisionRecord) {
        if let Some(log) = &self.log {
            log.log_decision(rec).await;
        }
    }

    pub async fn stats(&self) -> Result<EngineStats, ServiceError> {
        let a = self.broker.get_account().await?;
        Ok(EngineStats {
            portfolio_value: a.portfolio_value,
            cash: a.cash,
            buying_power: a.buying_power,
            active_positions: self.tracker.count(),
            max_positions: self.params.max_positions,
            daily_trades: self.counter.trades_count,
            max_daily_trades: self.params.max_daily_trades,
            last_trade_time: self.counter.last_trade_time,
            position_size_pct: self.params.position_size_pct,
            strategy: STRATEGY_NAME.to_string(),
        })
    }
}
