//! Upstream API layouts

pub mod coingecko;

pub use coingecko::CoinGeckoApi;
