// ===============================
// src/gateway.rs (in-memory paper venue)
// ===============================
use std::sync::Mutex;

use ahash::AHashMap as HashMap;
use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;
use serde::Serialize;
use tracing::info;

use crate::domain::{Account, BrokerPosition, OrderAck, Side};
use crate::services::{Broker, ServiceError};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaperOrder {
    pub order_id: String,
    pub ticker: String,
    pub qty: u64,
    pub side: Side,
}

#[derive(Debug, Default)]
struct PaperState {
    orders: Vec<PaperOrder>,
    net_qty: HashMap<String, i64>,
}

/// Accepts every market order immediately. No prices are known here, so the
/// account always reports the starting equity.
pub struct PaperBroker {
    starting_equity: f64,
    state: Mutex<PaperState>,
}

impl PaperBroker {
    pub fn new(starting_equity: f64) -> Self {
        Self { starting_equity, state: Mutex::new(PaperState::default()) }
    }

    pub fn orders(&self) -> Vec<PaperOrder> {
        self.state.lock().map(|s| s.orders.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Broker for PaperBroker {
    async fn submit_market_order(&self, ticker: &str, qty: u64, side: Side) -> Result<OrderAck, ServiceError> {
        let order_id = format!(
            "PAPER-{}-{}",
            Utc::now().timestamp_nanos_opt().unwrap_or(0),
            rand::thread_rng().gen::<u32>()
        );
        let mut st = self
            .state
            .lock()
            .map_err(|_| ServiceError::Rejected("paper venue state poisoned".to_string()))?;
        let signed = match side { Side::Buy => qty as i64, Side::Sell => -(qty as i64) };
        *st.net_qty.entry(ticker.to_string()).or_insert(0) += signed;
        st.orders.push(PaperOrder { order_id: order_id.clone(), ticker: ticker.to_string(), qty, side });
        info!(%order_id, %ticker, qty, side = side.as_str(), "paper fill");
        Ok(OrderAck { order_id })
    }

    async fn get_account(&self) -> Result<Account, ServiceError> {
        Ok(Account {
            cash: self.starting_equity,
            equity: self.starting_equity,
            buying_power: self.starting_equity,
            portfolio_value: self.starting_equity,
        })
    }

    async fn get_positions(&self) -> Result<Vec<BrokerPosition>, ServiceError> {
        let st = self
            .state
            .lock()
            .map_err(|_| ServiceError::Rejected("paper venue state poisoned".to_string()))?;
        let mut out: Vec<BrokerPosition> = st
            .net_qty
            .iter()
            .filter(|(_, q)| **q != 0)
            .map(|(s, q)| BrokerPosition { symbol: s.clone(), qty: *q as f64, market_value: 0.0, current_price: 0.0 })
            .collect();
        out.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        Ok(out)
    }
}
