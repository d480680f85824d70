//! Synthetic data generator
//!
//! Produces structurally valid stand-ins for every resource kind when the
//! upstream is unavailable. Shapes are deterministic, values are drawn from
//! the supplied random source around a small set of curated profiles. Unknown
//! ids get a generic profile derived from the id string, so the same id always
//! lands in the same price range.
//!
//! Every record produced here is tagged [`DataSource::Synthetic`].

use crate::types::{
    Candle, CoinDetail, DataSource, Exchange, Granularity, Lookback, MarketSnapshot, NewsItem,
    OnChainMetrics, PricePoint, Sentiment, Timeframe, TradingPair,
};
use chrono::{Duration, Utc};
use rand::Rng;

/// Days generated for `Timeframe::All`
const ALL_TIME_DAYS: i64 = 730;

/// Seed values for a well-known asset
#[derive(Debug, Clone)]
struct CoinProfile {
    id: String,
    symbol: String,
    name: String,
    base_price: f64,
    rank: u32,
    circulating_supply: f64,
    max_supply: Option<f64>,
    hashing_algorithm: Option<&'static str>,
    genesis_date: Option<&'static str>,
    category: &'static str,
}

/// (id, symbol, name, price, rank, circulating, max supply, algorithm, genesis, category)
type ProfileRow = (
    &'static str,
    &'static str,
    &'static str,
    f64,
    u32,
    f64,
    Option<f64>,
    Option<&'static str>,
    Option<&'static str>,
    &'static str,
);

const PROFILES: &[ProfileRow] = &[
    ("bitcoin", "btc", "Bitcoin", 67_000.0, 1, 19_700_000.0, Some(21_000_000.0), Some("SHA-256"), Some("2009-01-03"), "Layer 1 (L1)"),
    ("ethereum", "eth", "Ethereum", 3_500.0, 2, 120_000_000.0, None, None, Some("2015-07-30"), "Smart Contract Platform"),
    ("tether", "usdt", "Tether", 1.0, 3, 110_000_000_000.0, None, None, None, "Stablecoins"),
    ("binancecoin", "bnb", "BNB", 580.0, 4, 147_000_000.0, Some(200_000_000.0), None, Some("2017-07-08"), "Exchange-based Tokens"),
    ("solana", "sol", "Solana", 150.0, 5, 460_000_000.0, None, None, Some("2020-03-16"), "Smart Contract Platform"),
    ("ripple", "xrp", "XRP", 0.52, 7, 55_000_000_000.0, Some(100_000_000_000.0), None, None, "Payment Solutions"),
    ("dogecoin", "doge", "Dogecoin", 0.15, 8, 145_000_000_000.0, None, Some("Scrypt"), Some("2013-12-08"), "Meme"),
    ("cardano", "ada", "Cardano", 0.45, 9, 35_000_000_000.0, Some(45_000_000_000.0), None, Some("2017-09-23"), "Smart Contract Platform"),
    ("polkadot", "dot", "Polkadot", 7.0, 14, 1_400_000_000.0, None, None, Some("2020-05-26"), "Layer 0 (L0)"),
    ("litecoin", "ltc", "Litecoin", 80.0, 20, 75_000_000.0, Some(84_000_000.0), Some("Scrypt"), Some("2011-10-13"), "Layer 1 (L1)"),
];

const EXCHANGES: &[(&str, &str, Option<&str>, Option<u32>, &str)] = &[
    ("binance", "Binance", Some("Cayman Islands"), Some(2017), "https://www.binance.com/"),
    ("gdax", "Coinbase Exchange", Some("United States"), Some(2012), "https://www.coinbase.com/"),
    ("kraken", "Kraken", Some("United States"), Some(2011), "https://www.kraken.com/"),
    ("okex", "OKX", Some("Seychelles"), Some(2017), "https://www.okx.com/"),
    ("bybit_spot", "Bybit", Some("British Virgin Islands"), Some(2018), "https://www.bybit.com/"),
    ("kucoin", "KuCoin", Some("Seychelles"), Some(2014), "https://www.kucoin.com/"),
    ("bitstamp", "Bitstamp", Some("Luxembourg"), Some(2011), "https://www.bitstamp.net/"),
    ("gemini", "Gemini", Some("United States"), Some(2014), "https://gemini.com/"),
];

const QUOTE_CURRENCIES: &[&str] = &["USDT", "USD", "USDC", "EUR", "BTC"];

const HEADLINES: &[(&str, Sentiment)] = &[
    ("{name} rallies as institutional inflows accelerate", Sentiment::Positive),
    ("Analysts see {name} consolidating ahead of key resistance", Sentiment::Neutral),
    ("{name} slides after large holders move coins to exchanges", Sentiment::Negative),
    ("Developers ship upgrade to the {name} network", Sentiment::Positive),
    ("Regulators weigh new rules affecting {name} trading", Sentiment::Negative),
    ("{name} trading volume climbs on derivatives activity", Sentiment::Neutral),
];

const PUBLISHERS: &[&str] = &["CoinDesk", "The Block", "Decrypt", "Cointelegraph", "Blockworks"];

impl CoinProfile {
    fn from_row(row: &ProfileRow) -> Self {
        let (id, symbol, name, base_price, rank, circulating, max_supply, algo, genesis, category) =
            *row;
        Self {
            id: id.to_string(),
            symbol: symbol.to_string(),
            name: name.to_string(),
            base_price,
            rank,
            circulating_supply: circulating,
            max_supply,
            hashing_algorithm: algo,
            genesis_date: genesis,
            category,
        }
    }

    /// Curated profile for `id`, or a generic one derived from the id string
    fn for_id(id: &str) -> Self {
        PROFILES
            .iter()
            .find(|row| row.0 == id)
            .map(Self::from_row)
            .unwrap_or_else(|| Self::generic(id))
    }

    fn generic(id: &str) -> Self {
        let hash = fnv1a(id);
        let symbol: String = id
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .take(4)
            .collect::<String>()
            .to_lowercase();
        let name = id
            .split(['-', '_'])
            .filter(|part| !part.is_empty())
            .map(capitalize)
            .collect::<Vec<_>>()
            .join(" ");

        Self {
            id: id.to_string(),
            symbol: if symbol.is_empty() { "unk".to_string() } else { symbol },
            name: if name.is_empty() { "Unknown".to_string() } else { name },
            base_price: 0.01 + (hash % 100_000) as f64 / 100.0,
            rank: 50 + (hash % 450) as u32,
            circulating_supply: 10_000_000.0 + (hash % 990_000_000) as f64,
            max_supply: None,
            hashing_algorithm: None,
            genesis_date: None,
            category: "Cryptocurrency",
        }
    }
}

fn fnv1a(s: &str) -> u64 {
    s.bytes().fold(0xcbf2_9ce4_8422_2325, |hash, b| {
        (hash ^ b as u64).wrapping_mul(0x0100_0000_01b3)
    })
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Multiplies `value` by a factor drawn from `[1 - spread, 1 + spread]`
fn jitter<R: Rng>(rng: &mut R, value: f64, spread: f64) -> f64 {
    value * (1.0 + rng.random_range(-spread..=spread))
}

/// Market snapshot for one id
pub fn market_snapshot<R: Rng>(id: &str, rng: &mut R) -> MarketSnapshot {
    let profile = CoinProfile::for_id(id);
    snapshot_from_profile(&profile, rng)
}

fn snapshot_from_profile<R: Rng>(profile: &CoinProfile, rng: &mut R) -> MarketSnapshot {
    let price = jitter(rng, profile.base_price, 0.05);
    let market_cap = price * profile.circulating_supply;
    let change_24h = rng.random_range(-8.0..=8.0);
    let high_24h = price * (1.0 + rng.random_range(0.0..=0.04));
    let low_24h = price * (1.0 - rng.random_range(0.0..=0.04));
    let now = Utc::now();

    MarketSnapshot {
        id: profile.id.clone(),
        symbol: profile.symbol.clone(),
        name: profile.name.clone(),
        image: None,
        current_price: price,
        market_cap,
        market_cap_rank: Some(profile.rank),
        total_volume: market_cap * rng.random_range(0.02..=0.10),
        high_24h: Some(high_24h),
        low_24h: Some(low_24h),
        price_change_percentage_24h: Some(change_24h),
        price_change_percentage_7d: Some(rng.random_range(-15.0..=15.0)),
        price_change_percentage_30d: Some(rng.random_range(-30.0..=30.0)),
        circulating_supply: Some(profile.circulating_supply),
        total_supply: Some(profile.max_supply.unwrap_or(profile.circulating_supply)),
        max_supply: profile.max_supply,
        ath: Some(profile.base_price * rng.random_range(1.1..=2.5)),
        ath_date: Some(now - Duration::days(rng.random_range(30..=900))),
        atl: Some(profile.base_price * rng.random_range(0.001..=0.3)),
        atl_date: Some(now - Duration::days(rng.random_range(1000..=4000))),
        last_updated: now,
        source: DataSource::Synthetic,
    }
}

/// Market listing for a batch of ids, in the order requested
pub fn markets<R: Rng>(ids: &[String], rng: &mut R) -> Vec<MarketSnapshot> {
    ids.iter().map(|id| market_snapshot(id, rng)).collect()
}

/// Detail record whose id always equals `id`
pub fn coin_detail<R: Rng>(id: &str, rng: &mut R) -> CoinDetail {
    let profile = CoinProfile::for_id(id);
    let snapshot = snapshot_from_profile(&profile, rng);

    CoinDetail {
        id: profile.id.clone(),
        description: format!(
            "{} ({}) is a digital asset tracked by this dashboard.",
            profile.name,
            profile.symbol.to_uppercase()
        ),
        homepage: None,
        categories: vec![profile.category.to_string()],
        genesis_date: profile.genesis_date.map(str::to_string),
        hashing_algorithm: profile.hashing_algorithm.map(str::to_string),
        snapshot,
        source: DataSource::Synthetic,
    }
}

/// Exchange listing built from the fixed exchange table
pub fn exchanges<R: Rng>(rng: &mut R) -> Vec<Exchange> {
    EXCHANGES
        .iter()
        .enumerate()
        .map(|(i, (id, name, country, year, url))| Exchange {
            id: id.to_string(),
            name: name.to_string(),
            country: country.map(str::to_string),
            year_established: *year,
            url: Some(url.to_string()),
            trust_score: Some(10u32.saturating_sub(i as u32 / 3)),
            trust_score_rank: Some(i as u32 + 1),
            trade_volume_24h_btc: rng.random_range(5_000.0..=250_000.0) / (i as f64 + 1.0),
        })
        .collect()
}

/// Tickers for `id` across the synthetic exchange list
pub fn trading_pairs<R: Rng>(id: &str, rng: &mut R) -> Vec<TradingPair> {
    let profile = CoinProfile::for_id(id);
    let base = profile.symbol.to_uppercase();
    let btc_price = CoinProfile::for_id("bitcoin").base_price;

    let mut pairs = Vec::new();
    for (market_id, market_name, ..) in EXCHANGES.iter().take(5) {
        for target in QUOTE_CURRENCIES {
            if *target == base {
                continue;
            }
            let quote_price = if *target == "BTC" {
                profile.base_price / btc_price
            } else {
                profile.base_price
            };
            pairs.push(TradingPair {
                base: base.clone(),
                target: target.to_string(),
                market_name: market_name.to_string(),
                last: jitter(rng, quote_price, 0.005),
                volume: rng.random_range(1_000.0..=5_000_000.0),
                trust_score: Some(if market_id.len() % 2 == 0 { "green" } else { "yellow" }.to_string()),
                bid_ask_spread_percentage: Some(rng.random_range(0.01..=0.5)),
            });
        }
    }
    pairs
}

fn history_days(timeframe: Timeframe) -> i64 {
    match timeframe.lookback() {
        Lookback::Days(days) => days as i64,
        Lookback::Max => ALL_TIME_DAYS,
    }
}

/// Time-ascending random walk ending now
pub fn price_history<R: Rng>(id: &str, timeframe: Timeframe, rng: &mut R) -> Vec<PricePoint> {
    let profile = CoinProfile::for_id(id);
    let granularity = timeframe.granularity();
    let step = granularity.step();
    let (count, spread) = match granularity {
        Granularity::Hourly => (24 * history_days(timeframe), 0.005),
        Granularity::Daily => (history_days(timeframe), 0.03),
    };

    let end = Utc::now();
    let start = end - step * count as i32;
    let mut price = profile.base_price;

    (0..=count)
        .map(|i| {
            price = jitter(rng, price, spread);
            PricePoint {
                timestamp: start + step * i as i32,
                price,
                volume: Some(price * profile.circulating_supply * rng.random_range(0.02..=0.10)),
                market_cap: Some(price * profile.circulating_supply),
            }
        })
        .collect()
}

/// Candle width matching what the upstream returns for each window
fn candle_width(timeframe: Timeframe) -> Duration {
    match history_days(timeframe) {
        0..=2 => Duration::minutes(30),
        3..=30 => Duration::hours(4),
        _ => Duration::days(4),
    }
}

/// Candles that always satisfy `low <= open, close <= high`
pub fn ohlc<R: Rng>(id: &str, timeframe: Timeframe, rng: &mut R) -> Vec<Candle> {
    let profile = CoinProfile::for_id(id);
    let width = candle_width(timeframe);
    let span = Duration::days(history_days(timeframe));
    let count = (span.num_minutes() / width.num_minutes()).max(1);

    let start = Utc::now() - span;
    let mut close = profile.base_price;

    (0..count)
        .map(|i| {
            let open = close;
            close = jitter(rng, open, 0.02);
            let high = open.max(close) * (1.0 + rng.random_range(0.0..=0.01));
            let low = open.min(close) * (1.0 - rng.random_range(0.0..=0.01));
            Candle {
                timestamp: start + width * i as i32,
                open,
                high,
                low,
                close,
                volume: rng.random_range(0.0..1_000_000.0),
            }
        })
        .collect()
}

/// On-chain activity; there is no live source for these yet
pub fn onchain_metrics<R: Rng>(id: &str, rng: &mut R) -> OnChainMetrics {
    let profile = CoinProfile::for_id(id);
    // bigger networks see more activity
    let scale = 1.0 / (profile.rank as f64).sqrt();

    OnChainMetrics {
        coin_id: profile.id.clone(),
        active_addresses: (rng.random_range(200_000.0..=1_000_000.0) * scale) as u64,
        transaction_count_24h: (rng.random_range(250_000.0..=1_500_000.0) * scale) as u64,
        average_fee_usd: rng.random_range(0.01..=15.0),
        hash_rate: profile
            .hashing_algorithm
            .map(|_| rng.random_range(100.0..=700.0) * 1e18 * scale),
        large_transactions_24h: (rng.random_range(1_000.0..=20_000.0) * scale) as u64,
        exchange_netflow_24h: rng.random_range(-5_000.0..=5_000.0) * scale,
        source: DataSource::Synthetic,
    }
}

/// Newest-first headlines about the curated coins
pub fn news<R: Rng>(limit: usize, rng: &mut R) -> Vec<NewsItem> {
    let now = Utc::now();
    let mut published_at = now;

    (0..limit)
        .map(|_| {
            let profile = CoinProfile::from_row(&PROFILES[rng.random_range(0..PROFILES.len())]);
            let (template, sentiment) = HEADLINES[rng.random_range(0..HEADLINES.len())];
            let publisher = PUBLISHERS[rng.random_range(0..PUBLISHERS.len())];
            published_at -= Duration::minutes(rng.random_range(5..=180));

            NewsItem {
                id: uuid::Builder::from_random_bytes(rng.random()).into_uuid(),
                title: template.replace("{name}", &profile.name),
                summary: format!(
                    "{} trades near ${:.2} as markets digest the latest developments.",
                    profile.name,
                    jitter(rng, profile.base_price, 0.05)
                ),
                publisher: publisher.to_string(),
                published_at,
                sentiment,
                source: DataSource::Synthetic,
            }
        })
        .collect()
}
