// ===============================
// src/config.rs
// ===============================
/*
=============================================================================
Project : scalp_bot_rust: paper-trading scalper for US equities in Rust
Module  : config.rs
Version : 0.1.0
License : MIT

Summary : Builds a dynamic watchlist (momentum / volume / news), evaluates
          price-volume signals, exits on profit target / stop loss / time
          limit, sizes new entries under slot and daily-trade caps, and
          routes market orders to a paper venue (in-memory or Alpaca).
          Prometheus metrics + JSON analytics log.
=============================================================================
*/
use std::env;
use std::str::FromStr;
use std::time::Duration;
use dotenvy::dotenv;

/// Sumber market data
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FeedMode {
    Mock,
    Yahoo,
}

impl FeedMode {
    pub fn from_env(key: &str, default_mode: FeedMode) -> FeedMode {
        match env::var(key).unwrap_or_default().to_ascii_lowercase().as_str() {
            "mock"  => FeedMode::Mock,
            "yahoo" => FeedMode::Yahoo,
            _ => default_mode,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FeedMode::Mock  => "mock",
            FeedMode::Yahoo => "yahoo",
        }
    }
}

/// Venue eksekusi order
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VenueMode {
    Mock,
    AlpacaPaper,
}

impl VenueMode {
    pub fn from_env(key: &str, default_mode: VenueMode) -> VenueMode {
        match env::var(key).unwrap_or_default().to_ascii_lowercase().as_str() {
            "mock"                   => VenueMode::Mock,
            "alpaca" | "alpaca_paper" => VenueMode::AlpacaPaper,
            _ => default_mode,
        }
    }

    pub fn default_rest_url(&self) -> &'static str {
        match self {
            VenueMode::Mock        => "https://paper-api.alpaca.markets", // tidak dipakai saat mock
            VenueMode::AlpacaPaper => "https://paper-api.alpaca.markets",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VenueMode::Mock        => "mock",
            VenueMode::AlpacaPaper => "alpaca_paper",
        }
    }
}

/// Scalping parameters, read by both rule engines. Immutable after load.
#[derive(Clone, Debug, PartialEq)]
pub struct ScalpParams {
    pub position_size_pct: f64,
    pub max_positions: usize,
    pub profit_target_pct: f64,
    pub stop_loss_pct: f64,
    pub max_hold_minutes: f64,
    pub max_daily_trades: u32,
    pub min_position_usd: f64,
    pub fallback_position_usd: f64,
    pub entry_pacing: Duration,
}

impl Default for ScalpParams {
    fn default() -> Self {
        Self {
            position_size_pct: 10.0,
            max_positions: 6,
            profit_target_pct: 0.4,
            stop_loss_pct: 0.3,
            max_hold_minutes: 2.0,
            max_daily_trades: 30,
            min_position_usd: 100.0,
            fallback_position_usd: 1000.0,
            entry_pacing: Duration::from_millis(500),
        }
    }
}

/// Buy-signal thresholds and the sampling window used by the signal evaluator.
#[derive(Clone, Debug, PartialEq)]
pub struct SignalThresholds {
    pub dip_pct: f64,
    pub volume_spike: f64,
    pub momentum_change_pct: f64,
    pub momentum_volume: f64,
    pub min_samples: usize,
    pub period: String,
    pub interval: String,
}

impl Default for SignalThresholds {
    fn default() -> Self {
        Self {
            dip_pct: -0.1,
            volume_spike: 1.3,
            momentum_change_pct: 0.05,
            momentum_volume: 1.2,
            min_samples: 5,
            period: "1d".to_string(),
            interval: "2m".to_string(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Args {
    // market / venue mode
    pub feed_mode: FeedMode,
    pub venue_mode: VenueMode,

    // credentials (None -> client dibiarkan uninitialized)
    pub alpaca_key_id: Option<String>,
    pub alpaca_secret_key: Option<String>,
    pub alpaca_rest_url: String,
    pub news_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,

    // loop / files / metrics
    pub cycle_interval_secs: u64,
    pub log_dir: Option<String>,
    pub metrics_port: Option<u16>,
    pub paper_starting_equity: f64,
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    env::var(key).ok().and_then(|s| s.trim().parse().ok()).unwrap_or(default)
}

pub fn load() -> (Args, ScalpParams, SignalThresholds) {
    // .env dibaca dulu (APCA_*, NEWS_API_KEY, dll)
    let _ = dotenv();

    // ===== Mode =====
    let feed_mode  = FeedMode::from_env("FEED_MODE", FeedMode::Mock);
    let venue_mode = VenueMode::from_env("VENUE_MODE", VenueMode::Mock);

    let alpaca_rest_url = env_opt("APCA_API_BASE_URL")
        .unwrap_or_else(|| venue_mode.default_rest_url().to_string());

    let args = Args {
        feed_mode,
        venue_mode,
        alpaca_key_id: env_opt("APCA_API_KEY_ID"),
        alpaca_secret_key: env_opt("APCA_API_SECRET_KEY"),
        alpaca_rest_url,
        news_api_key: env_opt("NEWS_API_KEY"),
        gemini_api_key: env_opt("GEMINI_API_KEY").or_else(|| env_opt("GOOGLE_API_KEY")),
        gemini_model: env_opt("GEMINI_MODEL").unwrap_or_else(|| "gemini-2.5-flash".to_string()),
        cycle_interval_secs: env_parse("CYCLE_INTERVAL_SECS", 60),
        log_dir: Some(env_opt("TRADING_LOG_DIR").unwrap_or_else(|| "trading_logs".to_string()))
            .filter(|d| d != "off"),
        metrics_port: env_opt("METRICS_PORT").and_then(|s| s.parse().ok()),
        paper_starting_equity: env_parse("PAPER_STARTING_EQUITY", 100_000.0),
    };

    // ===== Scalping params =====
    let d = ScalpParams::default();
    let params = ScalpParams {
        position_size_pct: env_parse("POSITION_SIZE_PCT", d.position_size_pct),
        max_positions: env_parse("MAX_POSITIONS", d.max_positions),
        profit_target_pct: env_parse("PROFIT_TARGET_PCT", d.profit_target_pct),
        stop_loss_pct: env_parse("STOP_LOSS_PCT", d.stop_loss_pct),
        max_hold_minutes: env_parse("MAX_HOLD_MINUTES", d.max_hold_minutes),
        max_daily_trades: env_parse("MAX_DAILY_TRADES", d.max_daily_trades),
        min_position_usd: env_parse("MIN_POSITION_USD", d.min_position_usd),
        fallback_position_usd: env_parse("FALLBACK_POSITION_USD", d.fallback_position_usd),
        entry_pacing: Duration::from_millis(env_parse("ENTRY_PACING_MS", 500)),
    };

    // ===== Signal thresholds =====
    let t = SignalThresholds::default();
    let thresholds = SignalThresholds {
        dip_pct: env_parse("SIGNAL_DIP_PCT", t.dip_pct),
        volume_spike: env_parse("SIGNAL_VOLUME_SPIKE", t.volume_spike),
        momentum_change_pct: env_parse("SIGNAL_MOMENTUM_CHANGE_PCT", t.momentum_change_pct),
        momentum_volume: env_parse("SIGNAL_MOMENTUM_VOLUME", t.momentum_volume),
        min_samples: env_parse("SIGNAL_MIN_SAMPLES", t.min_samples).max(2),
        period: env_opt("SIGNAL_PERIOD").unwrap_or(t.period),
        interval: env_opt("SIGNAL_INTERVAL").unwrap_or(t.interval),
    };

    (args, params, thresholds)
}
