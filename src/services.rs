// ===============================
// src/services.rs
// ===============================
//
// Seams to the outside world. Every external collaborator (market data,
// news, LLM, broker) is a trait so the engine can run against the real
// HTTP adapters or the in-process mocks.
//
use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{Account, Article, Bar, BrokerPosition, OrderAck, Side};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0} client not initialized")]
    NotInitialized(&'static str),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status {code}: {body}")]
    Status { code: u16, body: String },
    #[error("decode error: {0}")]
    Decode(String),
    #[error("rejected: {0}")]
    Rejected(String),
}

#[async_trait]
pub trait MarketData: Send + Sync {
    /// Ordered oldest-first. May return fewer rows than asked for.
    async fn fetch_history(&self, ticker: &str, period: &str, interval: &str) -> Result<Vec<Bar>, ServiceError>;
}

#[async_trait]
pub trait NewsProvider: Send + Sync {
    async fn search_articles(
        &self,
        query: &str,
        language: &str,
        sort: &str,
        page_size: u32,
    ) -> Result<Vec<Article>, ServiceError>;
}

#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, prompt: &str) -> Result<String, ServiceError>;
}

#[async_trait]
pub trait Broker: Send + Sync {
    async fn submit_market_order(&self, ticker: &str, qty: u64, side: Side) -> Result<OrderAck, ServiceError>;
    async fn get_account(&self) -> Result<Account, ServiceError>;
    async fn get_positions(&self) -> Result<Vec<BrokerPosition>, ServiceError>;
}
