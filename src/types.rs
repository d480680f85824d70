//! Canonical entities handed to dashboard callers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Where a record came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    /// Parsed from an upstream response
    Live,
    /// Fabricated because the upstream was unavailable
    Synthetic,
}

impl DataSource {
    /// Whether the record was fabricated locally
    pub fn is_synthetic(&self) -> bool {
        matches!(self, DataSource::Synthetic)
    }
}

/// Point-in-time market record for one asset
///
/// Immutable once returned; a later lookup yields a new snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    /// Upstream identifier, e.g. `bitcoin`
    pub id: String,
    pub symbol: String,
    pub name: String,
    pub image: Option<String>,
    pub current_price: f64,
    pub market_cap: f64,
    /// `None` when the upstream does not rank the asset
    pub market_cap_rank: Option<u32>,
    pub total_volume: f64,
    pub high_24h: Option<f64>,
    pub low_24h: Option<f64>,
    pub price_change_percentage_24h: Option<f64>,
    pub price_change_percentage_7d: Option<f64>,
    pub price_change_percentage_30d: Option<f64>,
    pub circulating_supply: Option<f64>,
    pub total_supply: Option<f64>,
    /// `None` means the supply is uncapped, not unknown
    pub max_supply: Option<f64>,
    pub ath: Option<f64>,
    pub ath_date: Option<DateTime<Utc>>,
    pub atl: Option<f64>,
    pub atl_date: Option<DateTime<Utc>>,
    pub last_updated: DateTime<Utc>,
    pub source: DataSource,
}

impl MarketSnapshot {
    /// Whether the snapshot came from the upstream
    pub fn is_live(&self) -> bool {
        self.source == DataSource::Live
    }
}

/// Detailed record for a single asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoinDetail {
    pub id: String,
    pub snapshot: MarketSnapshot,
    pub description: String,
    pub homepage: Option<String>,
    pub categories: Vec<String>,
    pub genesis_date: Option<String>,
    pub hashing_algorithm: Option<String>,
    pub source: DataSource,
}

/// One exchange from the exchange listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exchange {
    pub id: String,
    pub name: String,
    pub country: Option<String>,
    pub year_established: Option<u32>,
    pub url: Option<String>,
    pub trust_score: Option<u32>,
    pub trust_score_rank: Option<u32>,
    pub trade_volume_24h_btc: f64,
}

/// A market where an asset trades against another
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradingPair {
    pub base: String,
    pub target: String,
    pub market_name: String,
    pub last: f64,
    pub volume: f64,
    /// Upstream trust colour (`green`, `yellow`, `red`)
    pub trust_score: Option<String>,
    pub bid_ask_spread_percentage: Option<f64>,
}

/// One sample of a price history series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
    pub volume: Option<f64>,
    pub market_cap: Option<f64>,
}

/// OHLCV aggregate for one time bucket
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    /// Builds a candle, rejecting bars where `low <= open, close <= high` fails
    pub fn try_new(
        timestamp: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Option<Self> {
        let candle = Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        };
        candle.is_consistent().then_some(candle)
    }

    /// Checks `low <= min(open, close) <= max(open, close) <= high` and a non-negative volume
    pub fn is_consistent(&self) -> bool {
        self.low <= self.open
            && self.open <= self.high
            && self.low <= self.close
            && self.close <= self.high
            && self.volume >= 0.0
    }
}

/// Lookback windows offered by the dashboard charts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1h")]
    OneHour,
    #[serde(rename = "24h")]
    OneDay,
    #[serde(rename = "7d")]
    SevenDays,
    #[serde(rename = "30d")]
    ThirtyDays,
    #[serde(rename = "90d")]
    NinetyDays,
    #[serde(rename = "1y")]
    OneYear,
    #[serde(rename = "all")]
    All,
}

/// How many days of history a timeframe requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookback {
    Days(u32),
    /// Everything the upstream has
    Max,
}

impl Lookback {
    /// Query parameter value for `days=`
    pub fn as_param(&self) -> String {
        match self {
            Lookback::Days(days) => days.to_string(),
            Lookback::Max => "max".to_string(),
        }
    }
}

/// Sampling interval of a price history series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Granularity {
    Hourly,
    Daily,
}

impl Granularity {
    /// Distance between consecutive samples
    pub fn step(&self) -> chrono::Duration {
        match self {
            Granularity::Hourly => chrono::Duration::hours(1),
            Granularity::Daily => chrono::Duration::days(1),
        }
    }
}

impl Timeframe {
    /// Short display label, also used in cache keys
    pub fn label(&self) -> &'static str {
        match self {
            Timeframe::OneHour => "1h",
            Timeframe::OneDay => "24h",
            Timeframe::SevenDays => "7d",
            Timeframe::ThirtyDays => "30d",
            Timeframe::NinetyDays => "90d",
            Timeframe::OneYear => "1y",
            Timeframe::All => "all",
        }
    }

    /// How far back the window reaches
    pub fn lookback(&self) -> Lookback {
        match self {
            Timeframe::OneHour | Timeframe::OneDay => Lookback::Days(1),
            Timeframe::SevenDays => Lookback::Days(7),
            Timeframe::ThirtyDays => Lookback::Days(30),
            Timeframe::NinetyDays => Lookback::Days(90),
            Timeframe::OneYear => Lookback::Days(365),
            Timeframe::All => Lookback::Max,
        }
    }

    /// Sub-daily windows sample hourly, multi-day windows daily
    pub fn granularity(&self) -> Granularity {
        match self.lookback() {
            Lookback::Days(days) if days <= 1 => Granularity::Hourly,
            _ => Granularity::Daily,
        }
    }

    /// Every timeframe, shortest first
    pub fn all() -> &'static [Timeframe] {
        &[
            Timeframe::OneHour,
            Timeframe::OneDay,
            Timeframe::SevenDays,
            Timeframe::ThirtyDays,
            Timeframe::NinetyDays,
            Timeframe::OneYear,
            Timeframe::All,
        ]
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Timeframe {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Timeframe::all()
            .iter()
            .find(|tf| tf.label().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| format!("unknown timeframe: {}", s))
    }
}

/// Direction label attached to a prediction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Bullish,
    Bearish,
    Neutral,
}

/// Output of the prediction heuristic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub currency_symbol: String,
    pub predicted_price: f64,
    /// Always within `[0.5, 0.95]`
    pub confidence: f64,
    pub trend: Trend,
    pub timeframe_label: String,
}

/// On-chain activity figures; always synthetic for now
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnChainMetrics {
    pub coin_id: String,
    pub active_addresses: u64,
    pub transaction_count_24h: u64,
    pub average_fee_usd: f64,
    /// Only meaningful for proof-of-work chains
    pub hash_rate: Option<f64>,
    pub large_transactions_24h: u64,
    /// Positive means coins flowed onto exchanges
    pub exchange_netflow_24h: f64,
    pub source: DataSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

/// Headline shown in the news panel; always synthetic for now
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    pub id: Uuid,
    pub title: String,
    pub summary: String,
    pub publisher: String,
    pub published_at: DateTime<Utc>,
    pub sentiment: Sentiment,
    pub source: DataSource,
}

/// Overall system health status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthStatus {
    /// Upstream is answering
    Healthy,
    /// Some lookups are being served synthetic data
    Degraded,
    /// Every recent lookup fell back to synthetic data
    Unhealthy,
}

/// Component health information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub name: String,
    pub status: HealthStatus,
    pub message: Option<String>,
    pub details: std::collections::HashMap<String, serde_json::Value>,
    pub last_checked: DateTime<Utc>,
}
