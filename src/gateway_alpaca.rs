// ===============================
// src/gateway_alpaca.rs
// ===============================
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::domain::{Account, BrokerPosition, OrderAck, Side};
use crate::services::{Broker, ServiceError};

// ---- Alpaca REST payloads (angka dikirim sebagai string) ----
#[derive(Debug, Deserialize)]
struct AlpacaOrder { id: String }

#[derive(Debug, Deserialize)]
struct AlpacaAccount {
    cash: String,
    equity: String,
    buying_power: String,
    portfolio_value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AlpacaPosition {
    symbol: String,
    qty: String,
    market_value: Option<String>,
    current_price: Option<String>,
}

fn num(field: &str, s: &str) -> Result<f64, ServiceError> {
    s.parse::<f64>().map_err(|e| ServiceError::Decode(format!("{field}={s:?}: {e}")))
}

fn opt_num(field: &str, s: &Option<String>) -> Result<f64, ServiceError> {
    s.as_deref().map(|v| num(field, v)).unwrap_or(Ok(0.0))
}

impl TryFrom<AlpacaAccount> for Account {
    type Error = ServiceError;
    fn try_from(a: AlpacaAccount) -> Result<Self, Self::Error> {
        let equity = num("equity", &a.equity)?;
        Ok(Account {
            cash: num("cash", &a.cash)?,
            equity,
            buying_power: num("buying_power", &a.buying_power)?,
            // portfolio_value is deprecated upstream; equity is the same number
            portfolio_value: match &a.portfolio_value {
                Some(v) => num("portfolio_value", v)?,
                None => equity,
            },
        })
    }
}

impl TryFrom<AlpacaPosition> for BrokerPosition {
    type Error = ServiceError;
    fn try_from(p: AlpacaPosition) -> Result<Self, Self::Error> {
        Ok(BrokerPosition {
            qty: num("qty", &p.qty)?,
            market_value: opt_num("market_value", &p.market_value)?,
            current_price: opt_num("current_price", &p.current_price)?,
            symbol: p.symbol,
        })
    }
}

struct AlpacaClient {
    http: reqwest::Client,
    rest_base: String,
    key_id: String,
    secret: String,
}

impl AlpacaClient {
    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.rest_base, path))
            .header("APCA-API-KEY-ID", &self.key_id)
            .header("APCA-API-SECRET-KEY", &self.secret)
    }

    async fn send<T: for<'de> Deserialize<'de>>(&self, req: reqwest::RequestBuilder) -> Result<T, ServiceError> {
        let rsp = req.send().await?;
        if !rsp.status().is_success() {
            let code = rsp.status().as_u16();
            let body = rsp.text().await.unwrap_or_default();
            return Err(ServiceError::Status { code, body });
        }
        Ok(rsp.json::<T>().await?)
    }
}

/// Alpaca paper trading (REST). Built without credentials it stays
/// uninitialized and every call answers `NotInitialized`.
pub struct AlpacaBroker {
    client: Option<AlpacaClient>,
}

impl AlpacaBroker {
    pub fn new(key_id: Option<String>, secret: Option<String>, rest_base: &str) -> Self {
        let client = match (key_id, secret) {
            (Some(key_id), Some(secret)) => {
                tracing::info!(%rest_base, "alpaca client initialized");
                Some(AlpacaClient {
                    http: reqwest::Client::new(),
                    rest_base: rest_base.trim_end_matches('/').to_string(),
                    key_id,
                    secret,
                })
            }
            _ => {
                tracing::warn!("alpaca keys missing, trading client left uninitialized");
                None
            }
        };
        Self { client }
    }

    pub fn is_initialized(&self) -> bool { self.client.is_some() }

    fn client(&self) -> Result<&AlpacaClient, ServiceError> {
        self.client.as_ref().ok_or(ServiceError::NotInitialized("Alpaca trading"))
    }
}

#[async_trait]
impl Broker for AlpacaBroker {
    async fn submit_market_order(&self, ticker: &str, qty: u64, side: Side) -> Result<OrderAck, ServiceError> {
        let c = self.client()?;
        let body = json!({
            "symbol": ticker,
            "qty": qty.to_string(),
            "side": side.as_str(),
            "type": "market",
            "time_in_force": "day",
        });
        let res: Result<AlpacaOrder, ServiceError> = c.send(c.request(reqwest::Method::POST, "/v2/orders").json(&body)).await;
        match res {
            Ok(o) => {
                tracing::info!(order_id = %o.id, %ticker, qty, side = side.as_str(), "order sent OK");
                Ok(OrderAck { order_id: o.id })
            }
            Err(e) => {
                tracing::error!(%e, %ticker, qty, side = side.as_str(), "order send failed");
                Err(e)
            }
        }
    }

    async fn get_account(&self) -> Result<Account, ServiceError> {
        let c = self.client()?;
        let a: AlpacaAccount = c.send(c.request(reqwest::Method::GET, "/v2/account")).await?;
        a.try_into()
    }

    async fn get_positions(&self) -> Result<Vec<BrokerPosition>, ServiceError> {
        let c = self.client()?;
        let ps: Vec<AlpacaPosition> = c.send(c.request(reqwest::Method::GET, "/v2/positions")).await?;
        ps.into_iter().map(BrokerPosition::try_from).collect()
    }
}
