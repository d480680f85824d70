//! Lookup metrics collection and reporting
//!
//! Tracks upstream latency, success rate, cache hits and how often lookups
//! were answered with synthetic data.

use crate::cache::ResourceKind;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Maximum number of samples to keep for metrics calculation
const MAX_SAMPLES: usize = 100;

/// How a lookup was answered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupOutcome {
    CacheHit,
    Live,
    Synthetic,
}

/// Snapshot of the data layer's behaviour
#[derive(Debug, Clone)]
pub struct LookupMetrics {
    /// 50th percentile upstream latency in milliseconds
    pub latency_p50_ms: f64,
    /// 99th percentile upstream latency in milliseconds
    pub latency_p99_ms: f64,
    /// Share of upstream lookups that returned live data (0.0 to 1.0)
    pub success_rate: f64,
    /// Lookups that reached the upstream
    pub upstream_requests: u64,
    /// Lookups answered from cache
    pub cache_hits: u64,
    /// Lookups answered with synthetic data
    pub synthetic_fallbacks: u64,
    /// Synthetic fallbacks per resource kind
    pub fallbacks_by_resource: HashMap<ResourceKind, u64>,
}

impl LookupMetrics {
    /// Creates metrics with no data
    pub fn empty() -> Self {
        Self {
            latency_p50_ms: 0.0,
            latency_p99_ms: 0.0,
            success_rate: 1.0,
            upstream_requests: 0,
            cache_hits: 0,
            synthetic_fallbacks: 0,
            fallbacks_by_resource: HashMap::new(),
        }
    }

    /// Fraction of all lookups served from cache
    pub fn hit_ratio(&self) -> f64 {
        let total = self.cache_hits + self.upstream_requests;
        if total == 0 {
            0.0
        } else {
            self.cache_hits as f64 / total as f64
        }
    }
}

/// Internal sample for latency tracking
#[derive(Debug, Clone)]
struct LatencySample {
    duration_ms: f64,
    live: bool,
}

/// Collects and computes lookup metrics
pub struct MetricsCollector {
    /// Rolling window of upstream latency samples
    samples: Arc<RwLock<VecDeque<LatencySample>>>,
    /// Lifetime counters
    counters: Arc<RwLock<Counters>>,
}

#[derive(Debug, Default)]
struct Counters {
    upstream: u64,
    cache_hits: u64,
    synthetic: u64,
    synthetic_by_resource: HashMap<ResourceKind, u64>,
}

impl MetricsCollector {
    /// Creates a collector with no samples
    pub fn new() -> Self {
        Self {
            samples: Arc::new(RwLock::new(VecDeque::with_capacity(MAX_SAMPLES))),
            counters: Arc::new(RwLock::new(Counters::default())),
        }
    }

    /// Records how one lookup was answered
    ///
    /// `elapsed` is ignored for cache hits.
    pub async fn record(&self, kind: ResourceKind, outcome: LookupOutcome, elapsed: Duration) {
        {
            let mut counters = self.counters.write().await;
            match outcome {
                LookupOutcome::CacheHit => counters.cache_hits += 1,
                LookupOutcome::Live => counters.upstream += 1,
                LookupOutcome::Synthetic => {
                    counters.upstream += 1;
                    counters.synthetic += 1;
                    *counters.synthetic_by_resource.entry(kind).or_insert(0) += 1;
                }
            }
        }

        if outcome == LookupOutcome::CacheHit {
            return;
        }

        let mut samples = self.samples.write().await;
        if samples.len() >= MAX_SAMPLES {
            samples.pop_front();
        }
        samples.push_back(LatencySample {
            duration_ms: elapsed.as_secs_f64() * 1000.0,
            live: outcome == LookupOutcome::Live,
        });
    }

    /// Share of the most recent upstream lookups that fell back to synthetic data
    pub async fn recent_fallback_ratio(&self) -> Option<f64> {
        let samples = self.samples.read().await;
        if samples.is_empty() {
            return None;
        }
        let failed = samples.iter().filter(|s| !s.live).count();
        Some(failed as f64 / samples.len() as f64)
    }

    /// Computes current metrics from collected samples
    pub async fn get_metrics(&self) -> LookupMetrics {
        let samples = self.samples.read().await;
        let counters = self.counters.read().await;

        let mut metrics = LookupMetrics::empty();
        metrics.upstream_requests = counters.upstream;
        metrics.cache_hits = counters.cache_hits;
        metrics.synthetic_fallbacks = counters.synthetic;
        metrics.fallbacks_by_resource = counters.synthetic_by_resource.clone();

        if samples.is_empty() {
            return metrics;
        }

        // Only live responses count towards latency percentiles
        let mut latencies: Vec<f64> = samples
            .iter()
            .filter(|s| s.live)
            .map(|s| s.duration_ms)
            .collect();

        latencies.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        metrics.latency_p50_ms = percentile(&latencies, 50.0);
        metrics.latency_p99_ms = percentile(&latencies, 99.0);
        if counters.upstream > 0 {
            metrics.success_rate =
                (counters.upstream - counters.synthetic) as f64 / counters.upstream as f64;
        }
        metrics
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Calculate percentile from sorted values
fn percentile(sorted_values: &[f64], p: f64) -> f64 {
    if sorted_values.is_empty() {
        return 0.0;
    }

    let idx = (p / 100.0 * (sorted_values.len() - 1) as f64).round() as usize;
    sorted_values[idx.min(sorted_values.len() - 1)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_metrics_collector() {
        let collector = MetricsCollector::new();

        collector
            .record(ResourceKind::Markets, LookupOutcome::Live, Duration::from_millis(100))
            .await;
        collector
            .record(ResourceKind::Markets, LookupOutcome::Live, Duration::from_millis(200))
            .await;
        collector
            .record(ResourceKind::Ohlc, LookupOutcome::Synthetic, Duration::from_millis(150))
            .await;
        collector
            .record(ResourceKind::Markets, LookupOutcome::CacheHit, Duration::ZERO)
            .await;

        let metrics = collector.get_metrics().await;

        assert_eq!(metrics.upstream_requests, 3);
        assert_eq!(metrics.cache_hits, 1);
        assert_eq!(metrics.synthetic_fallbacks, 1);
        assert_eq!(metrics.fallbacks_by_resource.get(&ResourceKind::Ohlc), Some(&1));
        assert!(metrics.success_rate > 0.6 && metrics.success_rate < 0.7);
        assert_eq!(metrics.hit_ratio(), 0.25);
        assert_eq!(metrics.latency_p99_ms, 200.0);

        let ratio = collector.recent_fallback_ratio().await.unwrap();
        assert!((ratio - 1.0 / 3.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_empty_metrics() {
        let collector = MetricsCollector::new();
        let metrics = collector.get_metrics().await;
        assert_eq!(metrics.success_rate, 1.0);
        assert_eq!(metrics.hit_ratio(), 0.0);
        assert!(collector.recent_fallback_ratio().await.is_none());
    }

    #[test]
    fn test_percentile() {
        let values = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0];
        assert_eq!(percentile(&values, 50.0), 6.0);
        assert_eq!(percentile(&values, 0.0), 1.0);
        assert_eq!(percentile(&values, 99.0), 10.0);
    }
}
