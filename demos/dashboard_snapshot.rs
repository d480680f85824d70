use coin_dashboard_data::{MarketDataService, ServiceConfig, Timeframe};
use std::time::Instant;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let service = MarketDataService::new(ServiceConfig::from_env()?)?;
    let ids = ["bitcoin", "ethereum", "solana"];

    println!("Dashboard snapshot ({})", service.config().api_url);
    println!("-------------------------------------------");

    // 1. First lookup goes to the upstream (or falls back to synthetic data)
    let start = Instant::now();
    let markets = service.get_markets(&ids).await;
    let upstream_latency = start.elapsed();

    for coin in &markets {
        println!(
            "   {:<6} ${:<12.2} 24h {:>6.2}%  [{:?}]",
            coin.symbol.to_uppercase(),
            coin.current_price,
            coin.price_change_percentage_24h.unwrap_or_default(),
            coin.source
        );
    }
    println!("   First lookup:  {:?}", upstream_latency);

    // 2. Same ids in another order are served from cache
    let start = Instant::now();
    let _ = service.get_markets(&["solana", "bitcoin", "ethereum"]).await;
    let cached_latency = start.elapsed();
    println!("   Cached lookup: {:?}", cached_latency);
    println!();

    let candles = service.get_ohlc("bitcoin", Timeframe::SevenDays).await;
    if let (Some(first), Some(last)) = (candles.first(), candles.last()) {
        println!(
            "BTC 7d: {} candles, open ${:.2} -> close ${:.2}",
            candles.len(),
            first.open,
            last.close
        );
    }

    let forecast = service.predict("bitcoin").await;
    println!(
        "BTC forecast ({}): ${:.2} {:?} at {:.0}% confidence",
        forecast.timeframe_label,
        forecast.predicted_price,
        forecast.trend,
        forecast.confidence * 100.0
    );
    println!();

    let metrics = service.metrics().await;
    let health = service.health_check().await;
    println!("-------------------------------------------");
    println!("- Upstream requests:   {}", metrics.upstream_requests);
    println!("- Cache hits:          {}", metrics.cache_hits);
    println!("- Synthetic fallbacks: {}", metrics.synthetic_fallbacks);
    println!("- Health:              {:?}", health.status);

    Ok(())
}
