//! Service configuration
//!
//! Defaults come from [`constants`](crate::constants). A deployment can
//! override them through environment variables:
//!
//! - `COIN_DASHBOARD_API_URL`: upstream base URL
//! - `COIN_DASHBOARD_VS_CURRENCY`: quote currency, e.g. `usd`
//! - `COIN_DASHBOARD_REQUEST_TIMEOUT_SECS`: per-attempt timeout
//! - `COIN_DASHBOARD_MAX_RETRIES`: retries after the first attempt
//!
//! TTLs and backoff timings are set in code with the `with_*` builders.

use crate::{
    backoff::RetryPolicy,
    cache::{ResourceKind, TtlPolicy},
    constants::{DEFAULT_API_URL, DEFAULT_VS_CURRENCY, EXCHANGES_PER_PAGE, REQUEST_TIMEOUT_SECS},
    error::ConfigError,
};
use std::str::FromStr;
use std::time::Duration;

pub const ENV_API_URL: &str = "COIN_DASHBOARD_API_URL";
pub const ENV_VS_CURRENCY: &str = "COIN_DASHBOARD_VS_CURRENCY";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "COIN_DASHBOARD_REQUEST_TIMEOUT_SECS";
pub const ENV_MAX_RETRIES: &str = "COIN_DASHBOARD_MAX_RETRIES";

/// Settings for a [`MarketDataService`](crate::service::MarketDataService)
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub api_url: String,
    pub vs_currency: String,
    /// Timeout for each individual HTTP attempt
    pub request_timeout: Duration,
    pub retry: RetryPolicy,
    pub ttls: TtlPolicy,
    pub exchanges_per_page: u32,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            vs_currency: DEFAULT_VS_CURRENCY.to_string(),
            request_timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
            retry: RetryPolicy::default(),
            ttls: TtlPolicy::default(),
            exchanges_per_page: EXCHANGES_PER_PAGE,
        }
    }
}

impl ServiceConfig {
    /// Loads configuration from the process environment
    ///
    /// Unset or empty variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if a numeric variable does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(non_empty_var)
    }

    /// Builds configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup(ENV_API_URL) {
            config.api_url = url;
        }
        if let Some(currency) = lookup(ENV_VS_CURRENCY) {
            config.vs_currency = currency.to_lowercase();
        }
        if let Some(secs) = parse_var::<u64, _>(&lookup, ENV_REQUEST_TIMEOUT_SECS)? {
            if secs == 0 {
                return Err(ConfigError::invalid_value(ENV_REQUEST_TIMEOUT_SECS, "0"));
            }
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(retries) = parse_var::<u32, _>(&lookup, ENV_MAX_RETRIES)? {
            config.retry.max_retries = retries;
        }

        Ok(config)
    }

    /// Points the service at another upstream
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    /// Replaces the retry policy
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Overrides the TTL for one resource kind
    pub fn with_ttl(mut self, kind: ResourceKind, ttl: Duration) -> Self {
        self.ttls = self.ttls.with_ttl(kind, ttl);
        self
    }

    /// Sets the timeout applied to each HTTP attempt
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

fn parse_var<T, F>(lookup: &F, name: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::invalid_value(name, raw)),
        None => Ok(None),
    }
}

/// Returns the value of an environment variable if it exists and is non-empty.
fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}
