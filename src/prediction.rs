//! Toy price prediction heuristic
//!
//! Not a model. Combines a random volatility term with a few fixed nudges
//! taken from the snapshot, so output varies between calls and tests can only
//! check bounds and label consistency.

use crate::{
    constants::{LARGE_CAP_THRESHOLD_USD, PREDICTION_TIMEFRAME},
    types::{MarketSnapshot, PredictionResult, Trend},
};
use rand::Rng;

const VOLATILITY_RANGE: f64 = 0.1;
const TREND_WEIGHT: f64 = 0.05;
const RANK_WEIGHT: f64 = 0.02;
const TOP_RANK: u32 = 10;

const BASE_CONFIDENCE: f64 = 0.7;
const CALM_THRESHOLD_PCT: f64 = 5.0;
const CONFIDENCE_JITTER: f64 = 0.2;
const MIN_CONFIDENCE: f64 = 0.5;
const MAX_CONFIDENCE: f64 = 0.95;

const BULLISH_RATIO: f64 = 1.03;
const BEARISH_RATIO: f64 = 0.97;

/// Forecasts the next price for `snapshot`
///
/// `predicted = price * (1 + volatility + trend + rank)` where volatility is
/// drawn from `[-0.1, 0.1]`, trend is `±0.05` by the sign of the 24h change
/// and rank is `+0.02` inside the top ten, `-0.02` otherwise. A missing 24h
/// change contributes no trend; a missing rank counts as outside the top ten.
pub fn predict<R: Rng>(snapshot: &MarketSnapshot, rng: &mut R) -> PredictionResult {
    let price = snapshot.current_price;
    let change_24h = snapshot.price_change_percentage_24h;

    let volatility = rng.random_range(-VOLATILITY_RANGE..=VOLATILITY_RANGE);
    let trend = match change_24h {
        Some(change) if change > 0.0 => TREND_WEIGHT,
        Some(change) if change < 0.0 => -TREND_WEIGHT,
        _ => 0.0,
    };
    let rank = match snapshot.market_cap_rank {
        Some(rank) if rank <= TOP_RANK => RANK_WEIGHT,
        _ => -RANK_WEIGHT,
    };

    let predicted_price = price * (1.0 + volatility + trend + rank);

    let mut confidence = BASE_CONFIDENCE;
    confidence += match change_24h {
        Some(change) if change.abs() < CALM_THRESHOLD_PCT => 0.1,
        _ => -0.1,
    };
    confidence += if snapshot.market_cap > LARGE_CAP_THRESHOLD_USD {
        0.1
    } else {
        -0.05
    };
    confidence += rng.random_range(0.0..=CONFIDENCE_JITTER);
    let confidence = confidence.clamp(MIN_CONFIDENCE, MAX_CONFIDENCE);

    PredictionResult {
        currency_symbol: snapshot.symbol.to_uppercase(),
        predicted_price,
        confidence,
        trend: classify(price, predicted_price),
        timeframe_label: PREDICTION_TIMEFRAME.to_string(),
    }
}

/// Labels a forecast relative to the current price
pub fn classify(price: f64, predicted: f64) -> Trend {
    if predicted > price * BULLISH_RATIO {
        Trend::Bullish
    } else if predicted < price * BEARISH_RATIO {
        Trend::Bearish
    } else {
        Trend::Neutral
    }
}
