//! In-memory TTL cache with lazy eviction
//!
//! Entries expire `ttl` after they were stored. Expired entries are dropped
//! on the next lookup; there is no background sweeper and no size bound.

use crate::constants::{
    COIN_DETAIL_TTL_SECS, EXCHANGES_TTL_SECS, HISTORY_TTL_SECS, MARKETS_TTL_SECS,
    TRADING_PAIRS_TTL_SECS,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};

/// Upstream resource kinds served by the data layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Markets,
    CoinDetail,
    Exchanges,
    TradingPairs,
    PriceHistory,
    Ohlc,
}

impl ResourceKind {
    /// Stable name, used as the cache key prefix and in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Markets => "markets",
            ResourceKind::CoinDetail => "coin_detail",
            ResourceKind::Exchanges => "exchanges",
            ResourceKind::TradingPairs => "trading_pairs",
            ResourceKind::PriceHistory => "price_history",
            ResourceKind::Ohlc => "ohlc",
        }
    }

    /// Builds the cache key for this resource and its parameters
    ///
    /// Parameters are joined in the order given, so callers must pass them in
    /// a canonical order (see [`ResourceKind::markets_key`] for id lists).
    pub fn key(&self, params: &[&str]) -> String {
        let mut key = String::from(self.as_str());
        for param in params {
            key.push(':');
            key.push_str(param);
        }
        key
    }

    /// Cache key for a batched market listing
    ///
    /// Ids are sorted and deduplicated so `["eth", "btc"]` and
    /// `["btc", "eth", "btc"]` share an entry.
    pub fn markets_key(vs_currency: &str, ids: &[String]) -> String {
        let mut ids: Vec<&str> = ids.iter().map(String::as_str).collect();
        ids.sort_unstable();
        ids.dedup();
        ResourceKind::Markets.key(&[vs_currency, ids.join(",").as_str()])
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Time-to-live per resource kind
///
/// Reflects how volatile each resource is. Values are policy and can be
/// overridden with [`TtlPolicy::with_ttl`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TtlPolicy {
    ttls: HashMap<ResourceKind, Duration>,
}

impl TtlPolicy {
    /// Returns the TTL for a resource kind
    pub fn ttl(&self, kind: ResourceKind) -> Duration {
        self.ttls
            .get(&kind)
            .copied()
            .unwrap_or(Duration::from_secs(MARKETS_TTL_SECS))
    }

    /// Overrides the TTL for one resource kind
    pub fn with_ttl(mut self, kind: ResourceKind, ttl: Duration) -> Self {
        self.ttls.insert(kind, ttl);
        self
    }
}

impl Default for TtlPolicy {
    fn default() -> Self {
        let ttls = HashMap::from([
            (ResourceKind::Markets, Duration::from_secs(MARKETS_TTL_SECS)),
            (ResourceKind::PriceHistory, Duration::from_secs(HISTORY_TTL_SECS)),
            (ResourceKind::Ohlc, Duration::from_secs(HISTORY_TTL_SECS)),
            (ResourceKind::CoinDetail, Duration::from_secs(COIN_DETAIL_TTL_SECS)),
            (ResourceKind::TradingPairs, Duration::from_secs(TRADING_PAIRS_TTL_SECS)),
            (ResourceKind::Exchanges, Duration::from_secs(EXCHANGES_TTL_SECS)),
        ]);
        Self { ttls }
    }
}

/// A stored value with its expiry bookkeeping
#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    stored_at: Instant,
    ttl: Duration,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.stored_at) >= self.ttl
    }
}

/// Key-value cache where every entry carries its own TTL
///
/// Values are never mutated in place: `insert` replaces an entry wholesale
/// and `get` hands out clones.
#[derive(Debug)]
pub struct TtlCache<V> {
    entries: HashMap<String, CacheEntry<V>>,
}

impl<V: Clone> TtlCache<V> {
    /// Creates an empty cache
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Returns the value for `key` if it has not expired
    pub fn get(&mut self, key: &str) -> Option<V> {
        self.get_at(key, Instant::now())
    }

    /// Looks up `key` as of `now`, evicting it if expired
    pub fn get_at(&mut self, key: &str, now: Instant) -> Option<V> {
        let expired = self.entries.get(key)?.is_expired(now);
        if expired {
            self.entries.remove(key);
            tracing::trace!(key, "Evicted expired cache entry");
            return None;
        }
        self.entries.get(key).map(|entry| entry.value.clone())
    }

    /// Stores `value` under `key` for `ttl`
    pub fn insert(&mut self, key: impl Into<String>, value: V, ttl: Duration) {
        self.insert_at(key, value, ttl, Instant::now());
    }

    /// Stores `value` as if it were written at `now`
    pub fn insert_at(&mut self, key: impl Into<String>, value: V, ttl: Duration, now: Instant) {
        self.entries.insert(
            key.into(),
            CacheEntry {
                value,
                stored_at: now,
                ttl,
            },
        );
    }

    /// Drops a single entry, returning whether one existed
    pub fn invalidate(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Drops every entry
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of stored entries, including ones that expired but were not looked up yet
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no entries are stored
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V: Clone> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_before_expiry_returns_value() {
        let mut cache = TtlCache::new();
        let t0 = Instant::now();
        cache.insert_at("markets:usd:bitcoin", 42u32, Duration::from_secs(30), t0);

        assert_eq!(cache.get_at("markets:usd:bitcoin", t0), Some(42));
        assert_eq!(
            cache.get_at("markets:usd:bitcoin", t0 + Duration::from_millis(29_999)),
            Some(42)
        );
    }

    #[test]
    fn test_get_at_expiry_evicts() {
        let mut cache = TtlCache::new();
        let t0 = Instant::now();
        cache.insert_at("k", "v".to_string(), Duration::from_secs(30), t0);

        assert_eq!(cache.get_at("k", t0 + Duration::from_secs(30)), None);
        assert!(cache.is_empty());
        // still absent until repopulated
        assert_eq!(cache.get_at("k", t0), None);

        cache.insert_at("k", "w".to_string(), Duration::from_secs(30), t0);
        assert_eq!(cache.get_at("k", t0), Some("w".to_string()));
    }

    #[test]
    fn test_insert_replaces_wholesale() {
        let mut cache = TtlCache::new();
        let t0 = Instant::now();
        cache.insert_at("k", vec![1, 2], Duration::from_secs(1), t0);
        cache.insert_at("k", vec![3], Duration::from_secs(60), t0 + Duration::from_secs(2));

        assert_eq!(cache.get_at("k", t0 + Duration::from_secs(10)), Some(vec![3]));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_missing_key() {
        let mut cache: TtlCache<u8> = TtlCache::new();
        assert_eq!(cache.get("absent"), None);
        assert!(!cache.invalidate("absent"));
    }

    #[test]
    fn test_markets_key_is_order_invariant() {
        let a = ResourceKind::markets_key("usd", &["ethereum".into(), "bitcoin".into()]);
        let b = ResourceKind::markets_key(
            "usd",
            &["bitcoin".into(), "ethereum".into(), "bitcoin".into()],
        );
        let c = ResourceKind::markets_key("usd", &["bitcoin".into()]);
        let d = ResourceKind::markets_key("eur", &["bitcoin".into(), "ethereum".into()]);

        assert_eq!(a, b);
        assert_eq!(a, "markets:usd:bitcoin,ethereum");
        assert_ne!(a, c);
        assert_ne!(a, d);
    }

    #[test]
    fn test_keys_differ_by_kind() {
        let detail = ResourceKind::CoinDetail.key(&["bitcoin"]);
        let pairs = ResourceKind::TradingPairs.key(&["bitcoin"]);
        assert_ne!(detail, pairs);
        assert_eq!(
            ResourceKind::PriceHistory.key(&["bitcoin", "usd", "7d"]),
            "price_history:bitcoin:usd:7d"
        );
    }

    #[test]
    fn test_default_ttls() {
        let policy = TtlPolicy::default();
        assert_eq!(policy.ttl(ResourceKind::Markets), Duration::from_secs(30));
        assert_eq!(policy.ttl(ResourceKind::PriceHistory), Duration::from_secs(30));
        assert_eq!(policy.ttl(ResourceKind::CoinDetail), Duration::from_secs(60));
        assert_eq!(policy.ttl(ResourceKind::TradingPairs), Duration::from_secs(60));
        assert_eq!(policy.ttl(ResourceKind::Exchanges), Duration::from_secs(300));

        let custom = policy.with_ttl(ResourceKind::Exchanges, Duration::from_secs(5));
        assert_eq!(custom.ttl(ResourceKind::Exchanges), Duration::from_secs(5));
    }
}
