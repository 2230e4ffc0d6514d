// ===============================
// src/portfolio.rs
// ===============================
//
// Broker-side view: account + semua posisi, atau holdings satu ticker.
// Ini posisi menurut venue, bukan PositionTracker milik engine.
//
use serde::Serialize;
use tracing::debug;

use crate::domain::{Account, BrokerPosition};
use crate::services::{Broker, ServiceError};

pub const NO_HOLDINGS: &str = "No current holdings.";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioSummary {
    #[serde(flatten)]
    pub account: Account,
    pub positions: Vec<BrokerPosition>,
}

pub async fn portfolio_summary(broker: &dyn Broker) -> Result<PortfolioSummary, ServiceError> {
    let account = broker.get_account().await?;
    let positions = broker.get_positions().await?;
    debug!(positions = positions.len(), equity = account.equity, "portfolio summary");
    Ok(PortfolioSummary { account, positions })
}

pub async fn holding(broker: &dyn Broker, ticker: &str) -> Result<Option<BrokerPosition>, ServiceError> {
    Ok(broker.get_positions().await?.into_iter().find(|p| p.symbol == ticker))
}

pub fn describe_holding(pos: Option<&BrokerPosition>) -> String {
    match pos {
        Some(p) => format!("Holdings: {} shares (Market Value: ${:.2})", p.qty, p.market_value),
        None => NO_HOLDINGS.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Side;
    use crate::gateway::PaperBroker;
    use crate::gateway_alpaca::AlpacaBroker;

    #[tokio::test]
    async fn summary_lists_account_and_open_positions() {
        let b = PaperBroker::new(25_000.0);
        b.submit_market_order("AAPL", 5, Side::Buy).await.unwrap();
        b.submit_market_order("TSLA", 3, Side::Buy).await.unwrap();
        b.submit_market_order("TSLA", 3, Side::Sell).await.unwrap();

        let s = portfolio_summary(&b).await.unwrap();
        assert_eq!(s.account.portfolio_value, 25_000.0);
        assert_eq!(s.positions.len(), 1);
        assert_eq!(s.positions[0].symbol, "AAPL");

        let json = serde_json::to_value(&s).unwrap();
        assert_eq!(json["cash"], 25_000.0);
        assert_eq!(json["positions"][0]["qty"], 5.0);
    }

    #[tokio::test]
    async fn holdings_for_one_ticker() {
        let b = PaperBroker::new(10_000.0);
        b.submit_market_order("NVDA", 4, Side::Buy).await.unwrap();

        let h = holding(&b, "NVDA").await.unwrap();
        assert_eq!(describe_holding(h.as_ref()), "Holdings: 4 shares (Market Value: $0.00)");
        let none = holding(&b, "AMD").await.unwrap();
        assert_eq!(describe_holding(none.as_ref()), "No current holdings.");
    }

    #[tokio::test]
    async fn uninitialized_broker_is_an_error() {
        let b = AlpacaBroker::new(None, None, "http://localhost");
        assert!(matches!(portfolio_summary(&b).await, Err(ServiceError::NotInitialized(_))));
        assert!(holding(&b, "AAPL").await.is_err());
    }
}
