// ===============================
// src/lib.rs
// ===============================
//
// scalp_bot: paper-trading scalper for US equities.
// Tiap cycle: watchlist -> exits -> entries -> summary (lihat engine.rs).
//
pub mod domain;
pub mod config;
pub mod metrics;
pub mod services;
pub mod feed;
pub mod signal;
pub mod positions;
pub mod exits;
pub mod entries;
pub mod risk;
pub mod watchlist;
pub mod gateway;          // in-memory paper venue
pub mod gateway_alpaca;   // Alpaca paper trading REST
pub mod news;
pub mod portfolio;
pub mod recorder;
pub mod analytics;
pub mod engine;
