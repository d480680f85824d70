//! Market data service
//!
//! The single entry point dashboard components call for market data. Every
//! lookup follows the same path:
//!
//! ```text
//! lookup(params)
//!     ↓
//! TtlCache (hit → return)
//!     ↓
//! FetchClient (retry with backoff)
//!     ↓ ok                      ↓ error / non-2xx / malformed
//! parse → cache → return        synthetic → return (never cached)
//! ```
//!
//! Lookups never fail. When the upstream cannot answer, callers receive a
//! structurally valid synthetic record tagged
//! [`DataSource::Synthetic`](crate::types::DataSource::Synthetic), and
//! the fallback is logged with `synthetic = true`.

use crate::{
    cache::{ResourceKind, TtlCache},
    config::ServiceConfig,
    error::{ConfigError, FetchError, FetchResult},
    fetch::FetchClient,
    metrics::{LookupMetrics, LookupOutcome, MetricsCollector},
    prediction,
    providers::CoinGeckoApi,
    synthetic,
    transport::{HttpTransport, ReqwestTransport},
    types::{
        Candle, CoinDetail, ComponentHealth, Exchange, HealthStatus, MarketSnapshot,
        NewsItem, OnChainMetrics, PredictionResult, PricePoint, Timeframe, TradingPair,
    },
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// A cached value of any resource kind
#[derive(Debug, Clone)]
pub enum CachedPayload {
    Markets(Vec<MarketSnapshot>),
    CoinDetail(Box<CoinDetail>),
    Exchanges(Vec<Exchange>),
    TradingPairs(Vec<TradingPair>),
    PriceHistory(Vec<PricePoint>),
    Ohlc(Vec<Candle>),
}

/// Conversion between a lookup result and its cached form
trait Cacheable: Clone + Sized {
    fn into_payload(self) -> CachedPayload;
    fn from_payload(payload: CachedPayload) -> Option<Self>;
}

macro_rules! cacheable {
    ($ty:ty, $variant:ident) => {
        impl Cacheable for $ty {
            fn into_payload(self) -> CachedPayload {
                CachedPayload::$variant(self)
            }

            fn from_payload(payload: CachedPayload) -> Option<Self> {
                match payload {
                    CachedPayload::$variant(value) => Some(value),
                    _ => None,
                }
            }
        }
    };
}

cacheable!(Vec<MarketSnapshot>, Markets);
cacheable!(Vec<Exchange>, Exchanges);
cacheable!(Vec<TradingPair>, TradingPairs);
cacheable!(Vec<PricePoint>, PriceHistory);
cacheable!(Vec<Candle>, Ohlc);

impl Cacheable for CoinDetail {
    fn into_payload(self) -> CachedPayload {
        CachedPayload::CoinDetail(Box::new(self))
    }

    fn from_payload(payload: CachedPayload) -> Option<Self> {
        match payload {
            CachedPayload::CoinDetail(detail) => Some(*detail),
            _ => None,
        }
    }
}

/// Cached, retrying, never-failing access to market data
///
/// Owns its cache, so independent instances never share state.
///
/// # Example
/// ```no_run
/// use coin_dashboard_data::{MarketDataService, ServiceConfig, Timeframe};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let service = MarketDataService::new(ServiceConfig::from_env()?)?;
///
/// let markets = service.get_markets(&["bitcoin", "ethereum"]).await;
/// for coin in &markets {
///     println!("{}: ${:.2} ({:?})", coin.symbol, coin.current_price, coin.source);
/// }
///
/// let history = service.get_price_history("bitcoin", Timeframe::SevenDays).await;
/// println!("{} points", history.len());
/// # Ok(())
/// # }
/// ```
pub struct MarketDataService {
    config: ServiceConfig,
    api: CoinGeckoApi,
    fetch: FetchClient,
    cache: RwLock<TtlCache<CachedPayload>>,
    rng: Mutex<StdRng>,
    metrics: Arc<MetricsCollector>,
}

impl MarketDataService {
    /// Creates a service talking to the configured upstream over HTTP
    pub fn new(config: ServiceConfig) -> Result<Self, ConfigError> {
        let transport = ReqwestTransport::new(config.request_timeout)?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Creates a service configured from the environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::new(ServiceConfig::from_env()?)
    }

    /// Creates a service on top of a custom transport
    ///
    /// This is primarily for testing with mock transports.
    pub fn with_transport(config: ServiceConfig, transport: Arc<dyn HttpTransport>) -> Self {
        let api = CoinGeckoApi::new(config.api_url.clone(), config.vs_currency.clone());
        let fetch = FetchClient::new(transport);

        tracing::info!(
            api_url = api.base_url(),
            vs_currency = api.vs_currency(),
            transport = fetch.transport_name(),
            max_retries = config.retry.max_retries,
            "Market data service initialised"
        );

        Self {
            config,
            api,
            fetch,
            cache: RwLock::new(TtlCache::new()),
            rng: Mutex::new(StdRng::from_os_rng()),
            metrics: Arc::new(MetricsCollector::new()),
        }
    }

    /// Replaces the random source with a seeded one
    ///
    /// Synthetic data, placeholder candle volumes and predictions then become
    /// reproducible.
    pub fn with_seed(self, seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            ..self
        }
    }

    /// Adds a header sent with every upstream request
    pub fn with_header(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            fetch: self.fetch.with_header(name, value),
            ..self
        }
    }

    /// Configuration the service was built with
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    fn with_rng<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut *rng)
    }

    /// Cache → fetch → parse → cache, or synthesize on any failure
    async fn lookup<T, P, S>(
        &self,
        kind: ResourceKind,
        key: String,
        url: FetchResult<String>,
        parse: P,
        synthesize: S,
    ) -> T
    where
        T: Cacheable,
        P: FnOnce(&CoinGeckoApi, &str, &mut StdRng) -> FetchResult<T>,
        S: FnOnce(&mut StdRng) -> T,
    {
        let cached = self.cache.write().await.get(&key);
        if let Some(value) = cached.and_then(T::from_payload) {
            tracing::debug!(resource = %kind, key = %key, "Cache hit");
            self.metrics
                .record(kind, LookupOutcome::CacheHit, Duration::ZERO)
                .await;
            return value;
        }

        let start = Instant::now();
        let result = match url {
            Ok(url) => {
                tracing::debug!(resource = %kind, url = %url, "Cache miss, fetching");
                match self.fetch.get_ok(&url, &self.config.retry).await {
                    Ok(body) => self.with_rng(|rng| parse(&self.api, &body, rng)),
                    Err(e) => Err(e),
                }
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(value) => {
                let ttl = self.config.ttls.ttl(kind);
                self.cache
                    .write()
                    .await
                    .insert(key, value.clone().into_payload(), ttl);
                self.metrics
                    .record(kind, LookupOutcome::Live, start.elapsed())
                    .await;
                tracing::debug!(
                    resource = %kind,
                    latency_ms = start.elapsed().as_millis() as u64,
                    "Fetched and cached"
                );
                value
            }
            Err(e) => {
                tracing::warn!(
                    resource = %kind,
                    key = %key,
                    error = %e,
                    synthetic = true,
                    "Upstream lookup failed, serving synthetic data"
                );
                self.metrics
                    .record(kind, LookupOutcome::Synthetic, start.elapsed())
                    .await;
                self.with_rng(synthesize)
            }
        }
    }

    /// Market snapshots for a batch of ids in one request
    ///
    /// Ids are trimmed, sorted and deduplicated, so the same set in any order
    /// is one cache entry. An empty id list returns an empty listing without
    /// touching the network.
    pub async fn get_markets<S: AsRef<str>>(&self, ids: &[S]) -> Vec<MarketSnapshot> {
        let mut ids: Vec<String> = ids
            .iter()
            .map(|id| id.as_ref().trim().to_string())
            .filter(|id| !id.is_empty())
            .collect();
        ids.sort_unstable();
        ids.dedup();

        if ids.is_empty() {
            return Vec::new();
        }

        let key = ResourceKind::markets_key(self.api.vs_currency(), &ids);
        let url = self.api.markets_url(&ids);

        self.lookup(
            ResourceKind::Markets,
            key,
            url,
            |api, body, _| {
                let markets = api.parse_markets(body)?;
                if markets.is_empty() {
                    return Err(FetchError::invalid("No markets returned"));
                }
                Ok(markets)
            },
            |rng| synthetic::markets(&ids, rng),
        )
        .await
    }

    /// Detail record for one asset
    pub async fn get_coin_detail(&self, id: &str) -> CoinDetail {
        let key = ResourceKind::CoinDetail.key(&[id, self.api.vs_currency()]);
        let url = self.api.coin_url(id);

        self.lookup(
            ResourceKind::CoinDetail,
            key,
            url,
            |api, body, _| api.parse_coin_detail(id, body),
            |rng| synthetic::coin_detail(id, rng),
        )
        .await
    }

    /// Exchange listing
    pub async fn get_exchanges(&self) -> Vec<Exchange> {
        let per_page = self.config.exchanges_per_page;
        let key = ResourceKind::Exchanges.key(&[per_page.to_string().as_str()]);
        let url = self.api.exchanges_url(per_page);

        self.lookup(
            ResourceKind::Exchanges,
            key,
            url,
            |api, body, _| api.parse_exchanges(body),
            synthetic::exchanges,
        )
        .await
    }

    /// Tickers where `id` trades
    pub async fn get_trading_pairs(&self, id: &str) -> Vec<TradingPair> {
        let key = ResourceKind::TradingPairs.key(&[id]);
        let url = self.api.tickers_url(id);

        self.lookup(
            ResourceKind::TradingPairs,
            key,
            url,
            |api, body, _| api.parse_trading_pairs(body),
            |rng| synthetic::trading_pairs(id, rng),
        )
        .await
    }

    /// Time-ascending price history for `timeframe`
    pub async fn get_price_history(&self, id: &str, timeframe: Timeframe) -> Vec<PricePoint> {
        let key = ResourceKind::PriceHistory.key(&[id, self.api.vs_currency(), timeframe.label()]);
        let url = self.api.market_chart_url(id, timeframe);

        self.lookup(
            ResourceKind::PriceHistory,
            key,
            url,
            |api, body, _| {
                let points = api.parse_price_history(body)?;
                if points.is_empty() {
                    return Err(FetchError::invalid("Empty price history"));
                }
                Ok(points)
            },
            |rng| synthetic::price_history(id, timeframe, rng),
        )
        .await
    }

    /// OHLC candles for `timeframe`
    ///
    /// The upstream reports no volume for candles, so volumes are placeholders
    /// even when the prices are live.
    pub async fn get_ohlc(&self, id: &str, timeframe: Timeframe) -> Vec<Candle> {
        let key = ResourceKind::Ohlc.key(&[id, self.api.vs_currency(), timeframe.label()]);
        let url = self.api.ohlc_url(id, timeframe);

        self.lookup(
            ResourceKind::Ohlc,
            key,
            url,
            |api, body, rng| {
                let candles = api.parse_ohlc(body, rng)?;
                if candles.is_empty() {
                    return Err(FetchError::invalid("Empty OHLC series"));
                }
                Ok(candles)
            },
            |rng| synthetic::ohlc(id, timeframe, rng),
        )
        .await
    }

    /// On-chain activity; no upstream is integrated, so always synthetic
    pub fn get_onchain_metrics(&self, id: &str) -> OnChainMetrics {
        tracing::debug!(coin = id, synthetic = true, "Generating on-chain metrics");
        self.with_rng(|rng| synthetic::onchain_metrics(id, rng))
    }

    /// Latest headlines; no upstream is integrated, so always synthetic
    pub fn get_news(&self, limit: usize) -> Vec<NewsItem> {
        tracing::debug!(limit, synthetic = true, "Generating news");
        self.with_rng(|rng| synthetic::news(limit, rng))
    }

    /// Runs the prediction heuristic on the current detail snapshot for `id`
    pub async fn predict(&self, id: &str) -> PredictionResult {
        let detail = self.get_coin_detail(id).await;
        self.predict_snapshot(&detail.snapshot)
    }

    /// Runs the prediction heuristic on a snapshot the caller already holds
    pub fn predict_snapshot(&self, snapshot: &MarketSnapshot) -> PredictionResult {
        self.with_rng(|rng| prediction::predict(snapshot, rng))
    }

    /// Drops every cached entry
    pub async fn invalidate_all(&self) {
        self.cache.write().await.clear();
    }

    /// Number of entries currently held in the cache
    pub async fn cached_entries(&self) -> usize {
        self.cache.read().await.len()
    }

    /// Gets lookup metrics including latency percentiles and fallback counts
    pub async fn metrics(&self) -> LookupMetrics {
        self.metrics.get_metrics().await
    }

    /// Perform a health check on the data layer
    ///
    /// # Returns
    /// Healthy while recent upstream lookups return live data, Degraded when
    /// some fall back to synthetic data, Unhealthy when all of them do.
    pub async fn health_check(&self) -> ComponentHealth {
        let mut details = std::collections::HashMap::new();
        let metrics = self.metrics().await;

        details.insert("api_url".to_string(), serde_json::json!(self.api.base_url()));
        details.insert(
            "cached_entries".to_string(),
            serde_json::json!(self.cached_entries().await),
        );
        details.insert(
            "upstream_requests".to_string(),
            serde_json::json!(metrics.upstream_requests),
        );
        details.insert(
            "synthetic_fallbacks".to_string(),
            serde_json::json!(metrics.synthetic_fallbacks),
        );
        details.insert(
            "cache_hit_ratio".to_string(),
            serde_json::json!(metrics.hit_ratio()),
        );

        let (status, message) = match self.metrics.recent_fallback_ratio().await {
            None => (
                HealthStatus::Healthy,
                "No upstream lookups yet".to_string(),
            ),
            Some(ratio) if ratio == 0.0 => (
                HealthStatus::Healthy,
                "Upstream is serving live data".to_string(),
            ),
            Some(ratio) if ratio >= 1.0 => (
                HealthStatus::Unhealthy,
                "Every recent lookup fell back to synthetic data".to_string(),
            ),
            Some(ratio) => (
                HealthStatus::Degraded,
                format!(
                    "{:.0}% of recent lookups fell back to synthetic data",
                    ratio * 100.0
                ),
            ),
        };

        ComponentHealth {
            name: "market_data_service".to_string(),
            status,
            message: Some(message),
            details,
            last_checked: chrono::Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backoff::RetryPolicy;
    use crate::transport::mock::{MockOutcome, MockTransport};
    use crate::types::{DataSource, Trend};

    const MARKETS_BODY: &str = r#"[
        {"id": "bitcoin", "symbol": "btc", "name": "Bitcoin", "current_price": 67000.0,
         "market_cap": 1320000000000, "market_cap_rank": 1, "total_volume": 25000000000,
         "price_change_percentage_24h": 1.5, "last_updated": "2024-06-01T12:00:00.000Z"},
        {"id": "ethereum", "symbol": "eth", "name": "Ethereum", "current_price": 3500.0,
         "market_cap": 420000000000, "market_cap_rank": 2, "total_volume": 15000000000,
         "price_change_percentage_24h": -0.8, "last_updated": "2024-06-01T12:00:00.000Z"}
    ]"#;

    const DETAIL_BODY: &str = r#"{
        "id": "bitcoin", "symbol": "btc", "name": "Bitcoin",
        "description": {"en": "Peer-to-peer electronic cash"},
        "market_cap_rank": 1,
        "market_data": {
            "current_price": {"usd": 67000.0},
            "market_cap": {"usd": 1320000000000},
            "price_change_percentage_24h": 2.0,
            "max_supply": 21000000
        }
    }"#;

    const CHART_BODY: &str = r#"{
        "prices": [[1700000000000, 100.0], [1700003600000, 101.0]],
        "market_caps": [[1700000000000, 5000.0], [1700003600000, 5050.0]],
        "total_volumes": [[1700000000000, 10.0], [1700003600000, 11.0]]
    }"#;

    const OHLC_BODY: &str =
        "[[1700000000000, 100.0, 110.0, 95.0, 105.0], [1700001800000, 105.0, 108.0, 100.0, 101.0]]";

    fn config() -> ServiceConfig {
        ServiceConfig::default()
            .with_api_url("http://mock/api/v3")
            .with_retry(RetryPolicy::new(
                2,
                Duration::from_millis(1),
                Duration::from_millis(2),
            ))
    }

    fn service(transport: &Arc<MockTransport>) -> MarketDataService {
        MarketDataService::with_transport(config(), transport.clone()).with_seed(7)
    }

    #[tokio::test]
    async fn test_markets_second_call_hits_cache() {
        let transport = Arc::new(MockTransport::new());
        transport.respond("/coins/markets", 200, MARKETS_BODY);
        let service = service(&transport);

        let first = service.get_markets(&["bitcoin", "ethereum"]).await;
        let second = service.get_markets(&["bitcoin", "ethereum"]).await;

        assert_eq!(transport.call_count(), 1);
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
        assert!(first.iter().all(MarketSnapshot::is_live));

        // same set, different order and duplicates
        service.get_markets(&["ethereum", "bitcoin", "bitcoin"]).await;
        assert_eq!(transport.call_count(), 1);

        let metrics = service.metrics().await;
        assert_eq!(metrics.cache_hits, 2);
        assert_eq!(metrics.upstream_requests, 1);
    }

    #[tokio::test]
    async fn test_markets_batches_sorted_ids() {
        let transport = Arc::new(MockTransport::new());
        transport.respond("/coins/markets", 200, MARKETS_BODY);
        let service = service(&transport);

        service.get_markets(&[" ethereum", "bitcoin"]).await;

        let urls = transport.urls();
        assert_eq!(urls.len(), 1);
        assert!(urls[0].contains("ids=bitcoin%2Cethereum"));
        assert!(urls[0].contains("price_change_percentage=24h%2C7d%2C30d"));
    }

    #[tokio::test]
    async fn test_empty_id_list_skips_network() {
        let transport = Arc::new(MockTransport::new());
        let service = service(&transport);

        let empty: [&str; 0] = [];
        assert!(service.get_markets(&empty).await.is_empty());
        assert!(service.get_markets(&["", "  "]).await.is_empty());
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_one_hour_history_uses_one_day_hourly_window() {
        let transport = Arc::new(MockTransport::new());
        transport.respond("/market_chart", 200, CHART_BODY);
        let service = service(&transport);

        let points = service.get_price_history("bitcoin", Timeframe::OneHour).await;

        let urls = transport.urls();
        assert!(urls[0].contains("/coins/bitcoin/market_chart?vs_currency=usd&days=1"));
        assert!(!urls[0].contains("interval=daily"));
        assert_eq!(Timeframe::OneHour.granularity(), crate::types::Granularity::Hourly);

        assert_eq!(points.len(), 2);
        assert_eq!(points[0].volume, Some(10.0));
        assert_eq!(points[1].market_cap, Some(5050.0));

        service.get_price_history("bitcoin", Timeframe::ThirtyDays).await;
        let urls = transport.urls();
        assert!(urls[1].contains("days=30&interval=daily"));
    }

    #[tokio::test]
    async fn test_detail_server_error_falls_back_to_synthetic() {
        let transport = Arc::new(MockTransport::new());
        transport.respond("/coins/some-coin?", 500, "internal error");
        let service = service(&transport);

        let detail = service.get_coin_detail("some-coin").await;

        assert_eq!(detail.id, "some-coin");
        assert_eq!(detail.snapshot.id, "some-coin");
        assert_eq!(detail.source, DataSource::Synthetic);
        // max_retries + 1 attempts
        assert_eq!(transport.call_count(), 3);

        // not cached: the next lookup goes back to the network
        service.get_coin_detail("some-coin").await;
        assert_eq!(transport.call_count(), 6);
        assert_eq!(service.cached_entries().await, 0);

        let metrics = service.metrics().await;
        assert_eq!(metrics.synthetic_fallbacks, 2);
        assert_eq!(
            metrics.fallbacks_by_resource.get(&ResourceKind::CoinDetail),
            Some(&2)
        );
    }

    #[tokio::test]
    async fn test_client_error_falls_back_after_one_attempt() {
        let transport = Arc::new(MockTransport::new());
        transport.respond("/tickers", 404, "coin not found");
        let service = service(&transport);

        let pairs = service.get_trading_pairs("nonexistent").await;

        assert!(!pairs.is_empty());
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failure() {
        let transport = Arc::new(MockTransport::new());
        transport.script(
            "/coins/bitcoin?",
            vec![
                MockOutcome::Respond(503, String::new()),
                MockOutcome::NetworkDown,
                MockOutcome::Respond(200, DETAIL_BODY.to_string()),
            ],
        );
        let service = service(&transport);

        let detail = service.get_coin_detail("bitcoin").await;

        assert_eq!(detail.source, DataSource::Live);
        assert_eq!(detail.snapshot.current_price, 67000.0);
        assert_eq!(detail.snapshot.max_supply, Some(21_000_000.0));
        assert_eq!(transport.call_count(), 3);
        assert_eq!(service.cached_entries().await, 1);
    }

    #[tokio::test]
    async fn test_malformed_payload_falls_back_and_is_not_cached() {
        let transport = Arc::new(MockTransport::new());
        transport.respond("/coins/markets", 200, r#"{"status": {"error_code": 429}}"#);
        let service = service(&transport);

        let markets = service.get_markets(&["bitcoin"]).await;
        assert_eq!(markets.len(), 1);
        assert_eq!(markets[0].id, "bitcoin");
        assert_eq!(markets[0].source, DataSource::Synthetic);
        // payload errors are not retried
        assert_eq!(transport.call_count(), 1);

        transport.respond("/coins/markets", 200, MARKETS_BODY);
        let markets = service.get_markets(&["bitcoin"]).await;
        assert!(markets.iter().all(MarketSnapshot::is_live));
        assert_eq!(transport.call_count(), 2);
    }

    #[tokio::test]
    async fn test_empty_listing_is_treated_as_failure() {
        let transport = Arc::new(MockTransport::new());
        transport.respond("/coins/markets", 200, "[]");
        let service = service(&transport);

        let markets = service.get_markets(&["bitcoin", "solana"]).await;
        let ids: Vec<_> = markets.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["bitcoin", "solana"]);
        assert!(markets.iter().all(|m| m.source.is_synthetic()));
    }

    #[tokio::test]
    async fn test_ohlc_live_candles_get_placeholder_volume() {
        let transport = Arc::new(MockTransport::new());
        transport.respond("/ohlc", 200, OHLC_BODY);
        let service = service(&transport);

        let candles = service.get_ohlc("bitcoin", Timeframe::OneDay).await;

        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].open, 100.0);
        assert_eq!(candles[1].close, 101.0);
        assert!(candles.iter().all(|c| c.is_consistent() && c.volume >= 0.0));
        assert!(transport.urls()[0].ends_with("/coins/bitcoin/ohlc?vs_currency=usd&days=1"));

        // cached as-is, volumes included
        let again = service.get_ohlc("bitcoin", Timeframe::OneDay).await;
        assert_eq!(candles, again);
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn test_ohlc_network_down_yields_consistent_synthetic_candles() {
        let transport = Arc::new(MockTransport::new());
        transport.fail_network("/ohlc");
        let service = service(&transport);

        let candles = service.get_ohlc("ethereum", Timeframe::SevenDays).await;

        assert!(!candles.is_empty());
        assert!(candles.iter().all(Candle::is_consistent));
        assert_eq!(transport.call_count(), 3);
    }

    #[tokio::test]
    async fn test_zero_ttl_never_serves_from_cache() {
        let transport = Arc::new(MockTransport::new());
        transport.respond("/exchanges", 200, r#"[{"id": "kraken", "name": "Kraken"}]"#);
        let config = config().with_ttl(ResourceKind::Exchanges, Duration::ZERO);
        let service = MarketDataService::with_transport(config, transport.clone());

        let first = service.get_exchanges().await;
        service.get_exchanges().await;

        assert_eq!(first[0].id, "kraken");
        assert_eq!(transport.call_count(), 2);
    }

    #[tokio::test]
    async fn test_invalidate_all_forces_refetch() {
        let transport = Arc::new(MockTransport::new());
        transport.respond("/exchanges", 200, r#"[{"id": "kraken", "name": "Kraken"}]"#);
        let service = service(&transport);

        service.get_exchanges().await;
        service.invalidate_all().await;
        service.get_exchanges().await;

        assert_eq!(transport.call_count(), 2);
    }

    #[tokio::test]
    async fn test_distinct_resources_do_not_collide() {
        let transport = Arc::new(MockTransport::new());
        transport.respond("/market_chart", 200, CHART_BODY);
        transport.respond("/ohlc", 200, OHLC_BODY);
        let service = service(&transport);

        service.get_price_history("bitcoin", Timeframe::SevenDays).await;
        service.get_price_history("bitcoin", Timeframe::ThirtyDays).await;
        service.get_price_history("ethereum", Timeframe::SevenDays).await;
        service.get_ohlc("bitcoin", Timeframe::SevenDays).await;

        assert_eq!(transport.call_count(), 4);
        assert_eq!(service.cached_entries().await, 4);
    }

    #[tokio::test]
    async fn test_onchain_and_news_never_touch_network() {
        let transport = Arc::new(MockTransport::new());
        let service = service(&transport);

        let onchain = service.get_onchain_metrics("bitcoin");
        let news = service.get_news(3);

        assert_eq!(onchain.coin_id, "bitcoin");
        assert!(onchain.source.is_synthetic());
        assert_eq!(news.len(), 3);
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_predict_uses_detail_snapshot() {
        let transport = Arc::new(MockTransport::new());
        transport.respond("/coins/bitcoin?", 200, DETAIL_BODY);
        let service = service(&transport);

        for _ in 0..20 {
            let p = service.predict("bitcoin").await;
            assert_eq!(p.currency_symbol, "BTC");
            assert!((0.5..=0.95).contains(&p.confidence));
            let price = 67000.0;
            let expected = if p.predicted_price > price * 1.03 {
                Trend::Bullish
            } else if p.predicted_price < price * 0.97 {
                Trend::Bearish
            } else {
                Trend::Neutral
            };
            assert_eq!(p.trend, expected);
        }
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn test_accept_header_sent() {
        let transport = Arc::new(MockTransport::new());
        transport.respond("/exchanges", 200, "[]");
        let service = service(&transport).with_header("X-Dashboard", "1");

        service.get_exchanges().await;

        let headers = transport.last_headers();
        assert!(headers.contains(&("Accept".to_string(), "application/json".to_string())));
        assert!(headers.contains(&("X-Dashboard".to_string(), "1".to_string())));
    }

    #[tokio::test]
    async fn test_health_reflects_fallbacks() {
        let transport = Arc::new(MockTransport::new());
        transport.respond("/coins/markets", 200, MARKETS_BODY);
        transport.respond("/tickers", 500, "");
        let service = service(&transport);

        assert_eq!(service.health_check().await.status, HealthStatus::Healthy);

        service.get_markets(&["bitcoin"]).await;
        assert_eq!(service.health_check().await.status, HealthStatus::Healthy);

        service.get_trading_pairs("bitcoin").await;
        let health = service.health_check().await;
        assert_eq!(health.status, HealthStatus::Degraded);
        assert_eq!(health.details["synthetic_fallbacks"], serde_json::json!(1));

        let unreachable = Arc::new(MockTransport::new());
        unreachable.fail_network("/");
        let down = MarketDataService::with_transport(config(), unreachable);
        down.get_exchanges().await;
        assert_eq!(down.health_check().await.status, HealthStatus::Unhealthy);
    }

    #[tokio::test]
    async fn test_exchanges_and_pairs_live_then_cached() {
        let transport = Arc::new(MockTransport::new());
        transport.respond(
            "/exchanges?per_page=",
            200,
            r#"[{"id": "binance", "name": "Binance", "country": "Cayman Islands",
                 "year_established": 2017, "url": "https://www.binance.com",
                 "trust_score": 10, "trust_score_rank": 1, "trade_volume_24h_btc": 250000.5}]"#,
        );
        transport.respond(
            "/tickers",
            200,
            r#"{"tickers": [{"base": "BTC", "target": "USDT", "market": {"name": "Binance"},
                 "last": 67000.0, "volume": 1200.0, "trust_score": "green",
                 "bid_ask_spread_percentage": 0.01}]}"#,
        );
        let service = service(&transport);

        let exchanges = service.get_exchanges().await;
        let pairs = service.get_trading_pairs("bitcoin").await;
        service.get_exchanges().await;
        service.get_trading_pairs("bitcoin").await;

        assert_eq!(exchanges.len(), 1);
        assert_eq!(exchanges[0].id, "binance");
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].market_name, "Binance");
        assert_eq!(transport.call_count(), 2);
    }

    #[tokio::test]
    async fn test_history_server_error_falls_back_and_is_not_cached() {
        let transport = Arc::new(MockTransport::new());
        transport.respond("/market_chart", 503, "unavailable");
        let service = service(&transport);

        let points = service.get_price_history("bitcoin", Timeframe::SevenDays).await;
        assert_eq!(points.len(), 8);
        assert!(points.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
        assert_eq!(transport.calls_matching("/market_chart"), 3);
        assert_eq!(service.cached_entries().await, 0);

        service.get_price_history("bitcoin", Timeframe::SevenDays).await;
        assert_eq!(transport.calls_matching("/market_chart"), 6);
        assert_eq!(service.metrics().await.synthetic_fallbacks, 2);
    }

    #[tokio::test]
    async fn test_ids_cannot_inject_url_components() {
        let transport = Arc::new(MockTransport::new());
        let service = service(&transport);

        service.get_markets(&["bitcoin&vs_currency=eur"]).await;
        service.get_trading_pairs("bitcoin?x=1#").await;

        let urls = transport.urls();
        assert!(urls[0].contains("ids=bitcoin%26vs_currency%3Deur"));
        assert_eq!(urls[0].matches("vs_currency=").count(), 1);
        assert!(urls
            .iter()
            .any(|url| url.ends_with("/coins/bitcoin%3Fx=1%23/tickers")));
    }

    #[tokio::test]
    async fn test_unusable_base_url_falls_back_without_requests() {
        let transport = Arc::new(MockTransport::new());
        let config = config().with_api_url("not a url");
        let service = MarketDataService::with_transport(config, transport.clone()).with_seed(7);

        let detail = service.get_coin_detail("bitcoin").await;

        assert_eq!(detail.source, DataSource::Synthetic);
        assert_eq!(transport.call_count(), 0);
        assert_eq!(service.metrics().await.synthetic_fallbacks, 1);
    }

    #[tokio::test]
    async fn test_seeded_services_agree_on_synthetic_data() {
        let a = Arc::new(MockTransport::new());
        let b = Arc::new(MockTransport::new());
        a.fail_network("/");
        b.fail_network("/");

        let first = service(&a).get_coin_detail("cardano").await;
        let second = service(&b).get_coin_detail("cardano").await;

        assert_eq!(first.snapshot.current_price, second.snapshot.current_price);
    }
}
