//! Constants for the dashboard data layer
//!
//! Compile-time defaults. Everything here can be overridden at runtime through
//! [`ServiceConfig`](crate::config::ServiceConfig).

/// CoinGecko-compatible API base URL used when no override is configured
pub const DEFAULT_API_URL: &str = "https://api.coingecko.com/api/v3";

/// Quote currency for all price lookups
pub const DEFAULT_VS_CURRENCY: &str = "usd";

/// HTTP timeout applied to every individual attempt (in seconds)
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Maximum number of retries after the first attempt
pub const MAX_RETRIES: u32 = 3;

/// Initial backoff delay for retries (in milliseconds)
pub const INITIAL_BACKOFF_MS: u64 = 1000;

/// Maximum backoff delay for retries (in milliseconds)
pub const MAX_BACKOFF_MS: u64 = 10000;

/// Market listings refresh interval (in seconds)
pub const MARKETS_TTL_SECS: u64 = 30;

/// Price history and OHLC refresh interval (in seconds)
pub const HISTORY_TTL_SECS: u64 = 30;

/// Coin detail refresh interval (in seconds)
pub const COIN_DETAIL_TTL_SECS: u64 = 60;

/// Trading pair refresh interval (in seconds)
pub const TRADING_PAIRS_TTL_SECS: u64 = 60;

/// Exchange listing refresh interval (in seconds)
pub const EXCHANGES_TTL_SECS: u64 = 300;

/// Page size requested from the exchange listing endpoint
pub const EXCHANGES_PER_PAGE: u32 = 50;

/// Horizon label attached to every prediction
pub const PREDICTION_TIMEFRAME: &str = "24h";

/// Market cap above which an asset counts as large for the prediction heuristic
pub const LARGE_CAP_THRESHOLD_USD: f64 = 1_000_000_000.0;

/// User agent for HTTP requests
pub const USER_AGENT: &str = "coin-dashboard-data/0.1.0";
