//! # Coin Dashboard Data
//!
//! Data-access layer for a cryptocurrency market dashboard. Dashboard
//! components ask for market listings, coin details, exchanges, trading
//! pairs, price history and OHLC candles; this crate answers from an
//! in-memory TTL cache, falls through to a CoinGecko-compatible REST API with
//! exponential-backoff retries, and degrades to synthetic data when the
//! upstream cannot answer.
//!
//! ## Usage
//!
//! ```no_run
//! use coin_dashboard_data::{MarketDataService, ServiceConfig, Timeframe};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let service = MarketDataService::new(ServiceConfig::default())?;
//!
//! // Lookups never fail; at worst they return synthetic data
//! let detail = service.get_coin_detail("bitcoin").await;
//! println!("{}: ${:.2}", detail.snapshot.name, detail.snapshot.current_price);
//!
//! let candles = service.get_ohlc("bitcoin", Timeframe::SevenDays).await;
//! println!("{} candles", candles.len());
//!
//! let forecast = service.predict("bitcoin").await;
//! println!("{:?} at {:.0}% confidence", forecast.trend, forecast.confidence * 100.0);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! MarketDataService
//!     ↓
//! TtlCache (per-resource TTL, lazy eviction)
//!     ↓ miss
//! FetchClient (RetryPolicy backoff, Accept: application/json)
//!     ↓
//! HttpTransport (reqwest, per-attempt timeout)
//!     ↓ failure
//! synthetic (never cached)
//! ```
//!
//! ## Telling synthetic data apart
//!
//! Snapshot-shaped records carry a [`DataSource`]. Every fallback is logged
//! through `tracing` with `synthetic = true` and counted in
//! [`LookupMetrics::synthetic_fallbacks`].

pub mod backoff;
pub mod cache;
pub mod config;
pub mod constants;
pub mod error;
pub mod fetch;
pub mod metrics;
pub mod prediction;
pub mod providers;
pub mod service;
pub mod synthetic;
pub mod transport;
pub mod types;

// Re-export commonly used types
pub use backoff::RetryPolicy;
pub use cache::{ResourceKind, TtlCache, TtlPolicy};
pub use config::ServiceConfig;
pub use error::{ConfigError, FetchError};
pub use metrics::LookupMetrics;
pub use service::MarketDataService;
pub use types::{
    Candle, CoinDetail, ComponentHealth, DataSource, Exchange, HealthStatus, MarketSnapshot,
    NewsItem, OnChainMetrics, PredictionResult, PricePoint, Timeframe, TradingPair, Trend,
};
