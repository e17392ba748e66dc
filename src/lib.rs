//! # Market Analytics SDK
//!
//! Aggregates crypto market data from public APIs (CoinGecko for market data,
//! Alternative.me for the Fear & Greed index), caches it in memory and serves
//! derived analytics views without ever waiting on the network.
//!
//! ## Usage
//!
//! ```no_run
//! use market_analytics_sdk::{views, MarketDataTracker};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let tracker = MarketDataTracker::global().await?;
//!
//! let overview = tracker.overview();
//! println!("Market cap: {:?}", overview.market_cap);
//!
//! // Endpoint-ready JSON, `{ "error": true, ... }` while data is missing
//! let body = views::respond(tracker.gainers_losers());
//! println!("{}", body);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! MarketDataTracker::global()
//!     ↓
//! Periodic task + stale-read trigger
//!     ↓
//! RefreshCoordinator (single flight, per-call timeout)
//!     ↓
//! MarketDataProvider (one call per category, concurrently)
//!     ↓
//! MarketSnapshotStore (per-category commit of successes only)
//!     ↓
//! views (pure functions over a StoreSnapshot)
//! ```
//!
//! ## Configuration
//!
//! Defaults live in [`constants`]; [`TrackerConfig::from_env`] overrides them,
//! e.g. `MARKET_CACHE_TTL_SECS=15`.

pub mod config;
pub mod constants;
pub mod coordinator;
pub mod error;
pub mod metrics;
pub mod provider;
pub mod providers;
pub mod store;
pub mod tracker;
pub mod types;
pub mod upstream;
pub mod views;

// Re-export commonly used types
pub use config::{ForecastMethod, TrackerConfig};
pub use coordinator::{RefreshCoordinator, RefreshOutcome, RefreshReport, RefreshState};
pub use error::{ConfigError, FetchError, ViewError};
pub use metrics::CategoryMetrics;
pub use provider::MarketDataProvider;
pub use store::{MarketSnapshotStore, StoreSnapshot};
pub use tracker::MarketDataTracker;
pub use types::{
    Category, CategoryPayload, ComponentHealth, GlobalStats, HealthStatus, MarketAsset,
    MarketDataEvent, PricePoint, SentimentSample, Snapshot,
};
pub use upstream::UpstreamClient;
