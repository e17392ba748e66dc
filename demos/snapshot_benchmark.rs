use market_analytics_sdk::{views, MarketDataTracker, RefreshOutcome, TrackerConfig};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // 1. Build a tracker without the background task so the first fetch can be timed
    let tracker = MarketDataTracker::new(TrackerConfig::from_env()?)?;

    println!("Benchmarking Market Analytics SDK (provider: {})...", tracker.provider_name());
    println!("-------------------------------------------");

    // 2. One full refresh cycle against the upstream APIs
    println!("1. Refresh cycle latency (all categories, concurrently)...");
    let start_api = Instant::now();
    let api_latency = match tracker.refresh_now().await {
        RefreshOutcome::Completed(report) => {
            println!("   Committed: {:?}", report.committed);
            for (category, error) in &report.failed {
                println!("   Failed:    {} ({})", category, error);
            }
            report.elapsed
        }
        RefreshOutcome::AlreadyInProgress => start_api.elapsed(),
    };
    println!("   Cycle latency: {:?}", api_latency);
    println!();

    println!("   Overview: {}", serde_json::to_string(&tracker.overview())?);
    println!("   Movers:   {}", views::respond(tracker.gainers_losers()));
    println!("   Forecast: {}", views::respond(tracker.trend_forecast()));
    println!();

    // 3. View latency from the in-memory snapshot
    println!("2. View latency (served from memory)...");
    let iterations: u32 = 10_000;
    let start_bench = Instant::now();
    for _ in 0..iterations {
        let _ = tracker.gainers_losers();
        let _ = tracker.heatmap(None);
    }
    let avg_view_latency = start_bench.elapsed() / iterations;
    println!("   Iterations: {}", iterations);
    println!("   Average latency (movers + heatmap): {:?}", avg_view_latency);
    println!();

    println!("-------------------------------------------");
    println!("- Network refresh: {:?}", api_latency);
    println!("- Cached views:    {:?}", avg_view_latency);
    if avg_view_latency.as_nanos() > 0 {
        let speedup = api_latency.as_secs_f64() / avg_view_latency.as_secs_f64();
        println!("- Cached views are approx. {:.0}x faster than a refresh.", speedup);
    }

    let health = tracker.health_check().await;
    println!("- Health: {:?} ({})", health.status, health.message.unwrap_or_default());

    Ok(())
}
