//! CoinGecko endpoint layout and payload mapping
//!
//! Builds request URLs for each resource kind and turns raw response bodies
//! into canonical entities. Any missing or inconsistent field is reported as
//! [`FetchError`] so the service can fall back to synthetic data.

use crate::{
    error::{FetchError, FetchResult},
    types::{
        Candle, CoinDetail, DataSource, Exchange, Granularity, MarketSnapshot, PricePoint,
        Timeframe, TradingPair,
    },
};
use chrono::{DateTime, Utc};
use rand::Rng;
use reqwest::Url;
use serde::Deserialize;
use std::collections::HashMap;

/// Upper bound of the placeholder volume attached to OHLC candles
const OHLC_PLACEHOLDER_VOLUME: f64 = 1_000_000.0;

/// `/coins/markets` row
#[derive(Debug, Deserialize)]
struct MarketRow {
    id: String,
    symbol: String,
    name: String,
    image: Option<String>,
    current_price: f64,
    market_cap: Option<f64>,
    market_cap_rank: Option<u32>,
    total_volume: Option<f64>,
    high_24h: Option<f64>,
    low_24h: Option<f64>,
    price_change_percentage_24h: Option<f64>,
    price_change_percentage_7d_in_currency: Option<f64>,
    price_change_percentage_30d_in_currency: Option<f64>,
    circulating_supply: Option<f64>,
    total_supply: Option<f64>,
    max_supply: Option<f64>,
    ath: Option<f64>,
    ath_date: Option<DateTime<Utc>>,
    atl: Option<f64>,
    atl_date: Option<DateTime<Utc>>,
    last_updated: Option<DateTime<Utc>>,
}

/// `/coins/{id}` response
#[derive(Debug, Deserialize)]
struct CoinResponse {
    id: String,
    symbol: String,
    name: String,
    #[serde(default)]
    description: HashMap<String, String>,
    #[serde(default)]
    links: CoinLinks,
    #[serde(default)]
    categories: Vec<Option<String>>,
    genesis_date: Option<String>,
    hashing_algorithm: Option<String>,
    image: Option<CoinImage>,
    market_cap_rank: Option<u32>,
    market_data: CoinMarketData,
    last_updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize)]
struct CoinLinks {
    #[serde(default)]
    homepage: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct CoinImage {
    large: Option<String>,
}

/// Per-currency maps inside `market_data`
#[derive(Debug, Deserialize)]
struct CoinMarketData {
    current_price: HashMap<String, f64>,
    #[serde(default)]
    market_cap: HashMap<String, f64>,
    #[serde(default)]
    total_volume: HashMap<String, f64>,
    #[serde(default)]
    high_24h: HashMap<String, f64>,
    #[serde(default)]
    low_24h: HashMap<String, f64>,
    price_change_percentage_24h: Option<f64>,
    price_change_percentage_7d: Option<f64>,
    price_change_percentage_30d: Option<f64>,
    #[serde(default)]
    ath: HashMap<String, f64>,
    #[serde(default)]
    ath_date: HashMap<String, DateTime<Utc>>,
    #[serde(default)]
    atl: HashMap<String, f64>,
    #[serde(default)]
    atl_date: HashMap<String, DateTime<Utc>>,
    circulating_supply: Option<f64>,
    total_supply: Option<f64>,
    max_supply: Option<f64>,
}

/// `/exchanges` row
#[derive(Debug, Deserialize)]
struct ExchangeRow {
    id: String,
    name: String,
    country: Option<String>,
    year_established: Option<u32>,
    url: Option<String>,
    trust_score: Option<u32>,
    trust_score_rank: Option<u32>,
    trade_volume_24h_btc: Option<f64>,
}

/// `/coins/{id}/tickers` response
#[derive(Debug, Deserialize)]
struct TickersResponse {
    tickers: Vec<TickerRow>,
}

#[derive(Debug, Deserialize)]
struct TickerRow {
    base: String,
    target: String,
    market: TickerMarket,
    last: Option<f64>,
    volume: Option<f64>,
    trust_score: Option<String>,
    bid_ask_spread_percentage: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct TickerMarket {
    name: String,
}

/// `/coins/{id}/market_chart` response: parallel `[ms, value]` arrays
#[derive(Debug, Deserialize)]
struct MarketChartResponse {
    prices: Vec<(f64, f64)>,
    #[serde(default)]
    market_caps: Vec<(f64, Option<f64>)>,
    #[serde(default)]
    total_volumes: Vec<(f64, Option<f64>)>,
}

/// CoinGecko-compatible API layout
#[derive(Debug, Clone)]
pub struct CoinGeckoApi {
    base_url: String,
    vs_currency: String,
}

impl CoinGeckoApi {
    /// Creates the layout for `base_url`, quoting prices in `vs_currency`
    pub fn new(base_url: impl Into<String>, vs_currency: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            vs_currency: vs_currency.into().to_lowercase(),
        }
    }

    /// Base URL without a trailing slash
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Lowercase quote currency
    pub fn vs_currency(&self) -> &str {
        &self.vs_currency
    }

    /// Appends `segments` to the base path and `query` to the query string
    ///
    /// Segments and query values are percent-encoded, so ids carrying `/`,
    /// `?`, `#` or `&` stay inside the component they were placed in.
    fn endpoint(&self, segments: &[&str], query: &[(&str, &str)]) -> FetchResult<String> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| FetchError::invalid_request(format!("{}: {}", self.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| {
                FetchError::invalid_request(format!("{} cannot take a path", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url.into())
    }

    /// Market listing for a batch of ids, with 24h/7d/30d changes
    pub fn markets_url(&self, ids: &[String]) -> FetchResult<String> {
        let ids = ids.join(",");
        self.endpoint(
            &["coins", "markets"],
            &[
                ("vs_currency", self.vs_currency.as_str()),
                ("ids", ids.as_str()),
                ("order", "market_cap_desc"),
                ("sparkline", "false"),
                ("price_change_percentage", "24h,7d,30d"),
            ],
        )
    }

    /// Detail record with market data, without tickers or community stats
    pub fn coin_url(&self, id: &str) -> FetchResult<String> {
        self.endpoint(
            &["coins", id],
            &[
                ("localization", "false"),
                ("tickers", "false"),
                ("market_data", "true"),
                ("community_data", "false"),
                ("developer_data", "false"),
            ],
        )
    }

    /// First page of the exchange listing
    pub fn exchanges_url(&self, per_page: u32) -> FetchResult<String> {
        let per_page = per_page.to_string();
        self.endpoint(&["exchanges"], &[("per_page", per_page.as_str())])
    }

    /// Tickers of every market where `id` trades
    pub fn tickers_url(&self, id: &str) -> FetchResult<String> {
        self.endpoint(&["coins", id, "tickers"], &[])
    }

    /// Price history for a timeframe
    ///
    /// Daily windows request `interval=daily`; for one-day windows the
    /// upstream picks sub-daily sampling on its own.
    pub fn market_chart_url(&self, id: &str, timeframe: Timeframe) -> FetchResult<String> {
        let days = timeframe.lookback().as_param();
        let mut query = vec![
            ("vs_currency", self.vs_currency.as_str()),
            ("days", days.as_str()),
        ];
        if timeframe.granularity() == Granularity::Daily {
            query.push(("interval", "daily"));
        }
        self.endpoint(&["coins", id, "market_chart"], &query)
    }

    /// OHLC candles for a timeframe
    pub fn ohlc_url(&self, id: &str, timeframe: Timeframe) -> FetchResult<String> {
        let days = timeframe.lookback().as_param();
        self.endpoint(
            &["coins", id, "ohlc"],
            &[("vs_currency", self.vs_currency.as_str()), ("days", days.as_str())],
        )
    }

    /// Parses a market listing
    pub fn parse_markets(&self, body: &str) -> FetchResult<Vec<MarketSnapshot>> {
        let rows: Vec<MarketRow> = serde_json::from_str(body)?;
        Ok(rows.into_iter().map(MarketRow::into_snapshot).collect())
    }

    /// Parses a coin detail record, checking it is the coin that was asked for
    pub fn parse_coin_detail(&self, id: &str, body: &str) -> FetchResult<CoinDetail> {
        let coin: CoinResponse = serde_json::from_str(body)?;
        if coin.id != id {
            return Err(FetchError::invalid(format!(
                "Requested coin {} but received {}",
                id, coin.id
            )));
        }

        let vs = self.vs_currency.as_str();
        let data = &coin.market_data;
        let current_price = data.current_price.get(vs).copied().ok_or_else(|| {
            FetchError::invalid(format!("No {} price for {}", vs, coin.id))
        })?;

        let snapshot = MarketSnapshot {
            id: coin.id.clone(),
            symbol: coin.symbol.clone(),
            name: coin.name.clone(),
            image: coin.image.as_ref().and_then(|i| i.large.clone()),
            current_price,
            market_cap: data.market_cap.get(vs).copied().unwrap_or(0.0),
            market_cap_rank: coin.market_cap_rank,
            total_volume: data.total_volume.get(vs).copied().unwrap_or(0.0),
            high_24h: data.high_24h.get(vs).copied(),
            low_24h: data.low_24h.get(vs).copied(),
            price_change_percentage_24h: data.price_change_percentage_24h,
            price_change_percentage_7d: data.price_change_percentage_7d,
            price_change_percentage_30d: data.price_change_percentage_30d,
            circulating_supply: data.circulating_supply,
            total_supply: data.total_supply,
            max_supply: data.max_supply,
            ath: data.ath.get(vs).copied(),
            ath_date: data.ath_date.get(vs).copied(),
            atl: data.atl.get(vs).copied(),
            atl_date: data.atl_date.get(vs).copied(),
            last_updated: coin.last_updated.unwrap_or_else(Utc::now),
            source: DataSource::Live,
        };

        Ok(CoinDetail {
            id: coin.id,
            snapshot,
            description: coin.description.get("en").cloned().unwrap_or_default(),
            homepage: coin.links.homepage.into_iter().find(|h| !h.is_empty()),
            categories: coin.categories.into_iter().flatten().collect(),
            genesis_date: coin.genesis_date,
            hashing_algorithm: coin.hashing_algorithm,
            source: DataSource::Live,
        })
    }

    /// Parses an exchange listing
    pub fn parse_exchanges(&self, body: &str) -> FetchResult<Vec<Exchange>> {
        let rows: Vec<ExchangeRow> = serde_json::from_str(body)?;
        Ok(rows
            .into_iter()
            .map(|row| Exchange {
                id: row.id,
                name: row.name,
                country: row.country,
                year_established: row.year_established,
                url: row.url,
                trust_score: row.trust_score,
                trust_score_rank: row.trust_score_rank,
                trade_volume_24h_btc: row.trade_volume_24h_btc.unwrap_or(0.0),
            })
            .collect())
    }

    /// Parses the tickers of one coin
    pub fn parse_trading_pairs(&self, body: &str) -> FetchResult<Vec<TradingPair>> {
        let response: TickersResponse = serde_json::from_str(body)?;
        Ok(response
            .tickers
            .into_iter()
            .map(|t| TradingPair {
                base: t.base,
                target: t.target,
                market_name: t.market.name,
                last: t.last.unwrap_or(0.0),
                volume: t.volume.unwrap_or(0.0),
                trust_score: t.trust_score,
                bid_ask_spread_percentage: t.bid_ask_spread_percentage,
            })
            .collect())
    }

    /// Pairs the parallel price, volume and market cap arrays into one series
    ///
    /// Volume and market cap are matched by timestamp. The result is sorted
    /// ascending by time.
    pub fn parse_price_history(&self, body: &str) -> FetchResult<Vec<PricePoint>> {
        let chart: MarketChartResponse = serde_json::from_str(body)?;

        let volumes: HashMap<i64, f64> = chart
            .total_volumes
            .iter()
            .filter_map(|(ms, v)| v.map(|v| (*ms as i64, v)))
            .collect();
        let caps: HashMap<i64, f64> = chart
            .market_caps
            .iter()
            .filter_map(|(ms, v)| v.map(|v| (*ms as i64, v)))
            .collect();

        let mut points = chart
            .prices
            .iter()
            .map(|(ms, price)| {
                let ms = *ms as i64;
                Ok(PricePoint {
                    timestamp: timestamp_from_millis(ms)?,
                    price: *price,
                    volume: volumes.get(&ms).copied(),
                    market_cap: caps.get(&ms).copied(),
                })
            })
            .collect::<FetchResult<Vec<_>>>()?;

        points.sort_by_key(|p| p.timestamp);
        Ok(points)
    }

    /// Parses `[ms, open, high, low, close]` rows
    ///
    /// The upstream does not report volume here, so each candle gets a
    /// non-negative placeholder volume drawn from `rng`.
    pub fn parse_ohlc<R: Rng>(&self, body: &str, rng: &mut R) -> FetchResult<Vec<Candle>> {
        let rows: Vec<[f64; 5]> = serde_json::from_str(body)?;

        let mut candles = rows
            .iter()
            .map(|[ms, open, high, low, close]| {
                let timestamp = timestamp_from_millis(*ms as i64)?;
                let volume = rng.random_range(0.0..OHLC_PLACEHOLDER_VOLUME);
                Candle::try_new(timestamp, *open, *high, *low, *close, volume).ok_or_else(|| {
                    FetchError::invalid(format!(
                        "Inconsistent candle at {}: o={} h={} l={} c={}",
                        timestamp, open, high, low, close
                    ))
                })
            })
            .collect::<FetchResult<Vec<_>>>()?;

        candles.sort_by_key(|c| c.timestamp);
        Ok(candles)
    }
}

impl MarketRow {
    fn into_snapshot(self) -> MarketSnapshot {
        MarketSnapshot {
            id: self.id,
            symbol: self.symbol,
            name: self.name,
            image: self.image,
            current_price: self.current_price,
            market_cap: self.market_cap.unwrap_or(0.0),
            market_cap_rank: self.market_cap_rank,
            total_volume: self.total_volume.unwrap_or(0.0),
            high_24h: self.high_24h,
            low_24h: self.low_24h,
            price_change_percentage_24h: self.price_change_percentage_24h,
            price_change_percentage_7d: self.price_change_percentage_7d_in_currency,
            price_change_percentage_30d: self.price_change_percentage_30d_in_currency,
            circulating_supply: self.circulating_supply,
            total_supply: self.total_supply,
            max_supply: self.max_supply,
            ath: self.ath,
            ath_date: self.ath_date,
            atl: self.atl,
            atl_date: self.atl_date,
            last_updated: self.last_updated.unwrap_or_else(Utc::now),
            source: DataSource::Live,
        }
    }
}

fn timestamp_from_millis(ms: i64) -> FetchResult<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| FetchError::invalid(format!("Timestamp out of range: {}", ms)))
}
