// ===============================
// src/watchlist.rs
// ===============================
//
// Dynamic watchlist = momentum ∪ high-volume ∪ in-news, padded with liquid
// defaults when the union is small. Failures per symbol / keyword are
// swallowed here (logged at debug), the generator itself never fails.
//
// Urutan hasil TIDAK dijamin (union lewat hash set).
//

use std::sync::Arc;

use ahash::AHashSet as HashSet;
use async_trait::async_trait;
use tracing::{debug, info};

use crate::domain::Bar;
use crate::metrics::WATCHLIST_SIZE;
use crate::services::{MarketData, NewsProvider};

pub const STOCK_UNIVERSE: [&str; 47] = [
    "AAPL", "MSFT", "GOOGL", "AMZN", "META", "TSLA", "NVDA", "AMD",
    "NFLX", "ADBE", "CRM", "INTC", "QCOM", "AVGO", "TXN", "MU",
    "SPY", "QQQ", "IWM", "DIA", "V", "MA", "JPM", "BAC",
    "WMT", "TGT", "COST", "HD", "LOW", "NKE", "MCD", "SBUX",
    "XOM", "CVX", "COP", "SLB", "BA", "CAT", "DE", "UNH",
    "JNJ", "PFE", "MRK", "ABT", "LLY", "TMO", "DHR",
];

pub const HIGH_VOLUME_CANDIDATES: [&str; 12] = [
    "AAPL", "TSLA", "NVDA", "AMD", "META", "AMZN",
    "MSFT", "GOOGL", "SPY", "QQQ", "NFLX", "MRNA",
];

pub const NEWS_KEYWORDS: [(&str, &str); 12] = [
    ("Apple", "AAPL"), ("Tesla", "TSLA"), ("Nvidia", "NVDA"),
    ("Microsoft", "MSFT"), ("Amazon", "AMZN"), ("Google", "GOOGL"),
    ("Meta", "META"), ("Netflix", "NFLX"), ("AMD", "AMD"),
    ("Intel", "INTC"), ("Qualcomm", "QCOM"), ("Salesforce", "CRM"),
];

pub const DEFAULT_LIQUID: [&str; 8] = ["AAPL", "MSFT", "TSLA", "NVDA", "AMZN", "META", "GOOGL", "SPY"];

const MOMENTUM_SCAN_LIMIT: usize = 25;
const MOMENTUM_COUNT: usize = 8;
const VOLUME_COUNT: usize = 6;
const NEWS_COUNT: usize = 6;
const MIN_WATCHLIST: usize = 8;
const MAX_PADDED: usize = 12;

/// Any source of candidate tickers for a cycle.
#[async_trait]
pub trait Watchlist: Send + Sync {
    async fn dynamic_watchlist(&self) -> Vec<String>;
}

/// Fixed list, returned as-is.
pub struct StaticWatchlist(pub Vec<String>);

#[async_trait]
impl Watchlist for StaticWatchlist {
    async fn dynamic_watchlist(&self) -> Vec<String> { self.0.clone() }
}

fn mean(xs: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = xs.fold((0.0, 0usize), |(s, n), x| (s + x, n + 1));
    if n == 0 { None } else { Some(sum / n as f64) }
}

/// Momentum score = |change%| + volume ratio, or None if the bar set is not "active".
pub fn momentum_score(bars: &[Bar]) -> Option<f64> {
    if bars.len() < 2 {
        return None;
    }
    let last = &bars[bars.len() - 1];
    let prev = &bars[bars.len() - 2];
    if prev.close <= 0.0 {
        return None;
    }
    let change_pct = (last.close - prev.close) / prev.close * 100.0;
    let avg_volume = mean(bars.iter().map(|b| b.volume)).unwrap_or(0.0);
    let volume_ratio = if avg_volume > 0.0 { last.volume / avg_volume } else { 1.0 };
    let avg_close = mean(bars.iter().map(|b| b.close)).unwrap_or(last.close);

    let active = change_pct.abs() > 0.1 || volume_ratio > 1.2 || last.close > avg_close;
    active.then_some(change_pct.abs() + volume_ratio)
}

/// Volume ratio vs the last 10 bars, or None with fewer than 10 bars.
pub fn volume_surge(bars: &[Bar]) -> Option<f64> {
    if bars.len() < 10 {
        return None;
    }
    let last = bars[bars.len() - 1].volume;
    let avg = mean(bars[bars.len() - 10..].iter().map(|b| b.volume)).unwrap_or(0.0);
    Some(if avg > 0.0 { last / avg } else { 1.0 })
}

/// Union of the three lists, padded from [`DEFAULT_LIQUID`] when short.
pub fn merge_and_pad(momentum: Vec<String>, volume: Vec<String>, news: Vec<String>) -> Vec<String> {
    let set: HashSet<String> = momentum.into_iter().chain(volume).chain(news).collect();
    let mut all: Vec<String> = set.into_iter().collect();
    if all.len() < MIN_WATCHLIST {
        for s in DEFAULT_LIQUID {
            if all.len() >= MAX_PADDED {
                break;
            }
            if !all.iter().any(|t| t == s) {
                all.push(s.to_string());
            }
        }
    }
    all
}

fn top_n(mut scored: Vec<(String, f64)>, n: usize) -> Vec<String> {
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.into_iter().take(n).map(|(t, _)| t).collect()
}

pub struct WatchlistGenerator {
    market: Arc<dyn MarketData>,
    news: Arc<dyn NewsProvider>,
}

impl WatchlistGenerator {
    pub fn new(market: Arc<dyn MarketData>, news: Arc<dyn NewsProvider>) -> Self {
        Self { market, news }
    }

    async fn bars(&self, ticker: &str) -> Option<Vec<Bar>> {
        match self.market.fetch_history(ticker, "1d", "5m").await {
            Ok(b) => Some(b),
            Err(e) => {
                debug!(%ticker, %e, "watchlist scan: history unavailable");
                None
            }
        }
    }

    pub async fn active_stocks(&self, count: usize) -> Vec<String> {
        let mut scored = Vec::new();
        for ticker in STOCK_UNIVERSE.iter().take(MOMENTUM_SCAN_LIMIT) {
            let Some(bars) = self.bars(ticker).await else { continue };
            if let Some(score) = momentum_score(&bars) {
                scored.push((ticker.to_string(), score));
            }
        }
        let selected = top_n(scored, count);
        info!(?selected, "momentum scan");
        selected
    }

    pub async fn high_volume_stocks(&self, count: usize) -> Vec<String> {
        let mut scored = Vec::new();
        for ticker in HIGH_VOLUME_CANDIDATES {
            let Some(bars) = self.bars(ticker).await else { continue };
            match volume_surge(&bars) {
                Some(ratio) if ratio > 1.5 => scored.push((ticker.to_string(), ratio)),
                _ => {}
            }
        }
        let selected = top_n(scored, count);
        info!(?selected, "high-volume scan");
        selected
    }

    pub async fn stocks_in_news(&self, count: usize) -> Vec<String> {
        let mut selected: Vec<String> = Vec::new();
        for (keyword, ticker) in NEWS_KEYWORDS {
            match self.news.search_articles(keyword, "en", "publishedAt", 3).await {
                Ok(articles) if !articles.is_empty() => {
                    if !selected.iter().any(|t| t == ticker) {
                        selected.push(ticker.to_string());
                    }
                }
                Ok(_) => {}
                Err(e) => debug!(%keyword, %e, "news scan: search failed"),
            }
        }
        selected.truncate(count);
        info!(?selected, "news scan");
        selected
    }
}

#[async_trait]
impl Watchlist for WatchlistGenerator {
    async fn dynamic_watchlist(&self) -> Vec<String> {
        let momentum = self.active_stocks(MOMENTUM_COUNT).await;
        let volume = self.high_volume_stocks(VOLUME_COUNT).await;
        let news = self.stocks_in_news(NEWS_COUNT).await;
        let all = merge_and_pad(momentum, volume, news);
        WATCHLIST_SIZE.set(all.len() as i64);
        info!(size = all.len(), watchlist = ?all, "dynamic watchlist");
        all
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Article;
    use crate::feed::ReplayMarketData;
    use crate::services::ServiceError;

    fn s(v: &[&str]) -> Vec<String> { v.iter().map(|x| x.to_string()).collect() }

    struct OnlyNews(&'static [&'static str]);

    #[async_trait]
    impl NewsProvider for OnlyNews {
        async fn search_articles(&self, q: &str, _l: &str, _s: &str, _n: u32) -> Result<Vec<Article>, ServiceError> {
            if self.0.iter().any(|k| *k == q) {
                Ok(vec![Article { title: format!("{q} news"), description: None, published_at: None }])
            } else if q == "Intel" {
                Err(ServiceError::NotInitialized("news"))
            } else {
                Ok(vec![])
            }
        }
    }

    #[test]
    fn union_dedupes_and_pads() {
        let all = merge_and_pad(s(&["AAPL", "XOM"]), s(&["AAPL"]), s(&["XOM", "JPM"]));
        // 3 unique, padded up to 3 + 8 defaults minus AAPL = 10
        assert_eq!(all.len(), 10);
        let set: HashSet<&String> = all.iter().collect();
        assert_eq!(set.len(), all.len());
        for t in ["XOM", "JPM", "AAPL", "SPY"] {
            assert!(all.iter().any(|x| x == t));
        }
    }

    #[test]
    fn padding_stops_at_twelve() {
        let seven = s(&["A", "B", "C", "D", "E", "F", "G"]);
        assert_eq!(merge_and_pad(seven, vec![], vec![]).len(), 12);
        let nine = s(&["A", "B", "C", "D", "E", "F", "G", "H", "I"]);
        assert_eq!(merge_and_pad(nine, vec![], vec![]).len(), 9);
    }

    #[test]
    fn momentum_and_volume_scores() {
        let flat = ReplayMarketData::bars(&[10.0, 10.0], &[100.0, 100.0]);
        assert!(momentum_score(&flat).is_none());
        let jump = ReplayMarketData::bars(&[10.0, 10.5], &[100.0, 100.0]);
        let score = momentum_score(&jump).unwrap();
        assert!((score - 6.0).abs() < 1e-9); // 5% + ratio 1.0

        let mut vols = vec![100.0; 9];
        vols.push(300.0);
        let bars = ReplayMarketData::bars(&[10.0; 10], &vols);
        let ratio = volume_surge(&bars).unwrap();
        assert!((ratio - 300.0 / 120.0).abs() < 1e-9);
        assert!(volume_surge(&bars[..9]).is_none());
    }

    #[tokio::test]
    async fn generator_survives_failing_sources() {
        let feed = Arc::new(ReplayMarketData::new()); // every fetch fails
        let news = Arc::new(OnlyNews(&["Tesla", "Nvidia"]));
        let gen = WatchlistGenerator::new(feed, news);

        let in_news = gen.stocks_in_news(6).await;
        assert_eq!(in_news, s(&["TSLA", "NVDA"]));

        let all = gen.dynamic_watchlist().await;
        assert_eq!(all.len(), 8); // TSLA, NVDA + 6 remaining defaults
        assert!(all.iter().any(|t| t == "SPY"));
    }
}
