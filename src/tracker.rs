//! Market data tracker service
//!
//! Ties the snapshot store, the refresh coordinator and the view builder
//! together, and provides a singleton instance for application-wide access.

use crate::{
    config::TrackerConfig,
    coordinator::{RefreshCoordinator, RefreshOutcome},
    error::{FetchError, ViewError},
    metrics::CategoryMetrics,
    provider::MarketDataProvider,
    providers::PublicApiProvider,
    store::{MarketSnapshotStore, StoreSnapshot},
    types::{Category, ComponentHealth, HealthStatus, MarketDataEvent},
    views::{self, ForecastView, HeatmapTile, MoversView, OverviewView, SentimentView},
};
use std::sync::Arc;
use tokio::sync::{broadcast, OnceCell};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

static GLOBAL_TRACKER: OnceCell<Arc<MarketDataTracker>> = OnceCell::const_new();

/// Market data tracker
///
/// Refreshes every category in the background and serves analytics views
/// from memory. Reads never wait on the network; a read that finds the data
/// older than the TTL only schedules a refresh.
///
/// # Example
/// ```no_run
/// use market_analytics_sdk::MarketDataTracker;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let tracker = MarketDataTracker::global().await?;
/// let overview = tracker.overview();
/// println!("Market cap: {:?}", overview.market_cap);
/// # Ok(())
/// # }
/// ```
pub struct MarketDataTracker {
    store: Arc<MarketSnapshotStore>,
    coordinator: Arc<RefreshCoordinator>,
    config: TrackerConfig,
}

impl MarketDataTracker {
    /// Returns the global singleton instance
    ///
    /// On first call, this reads the configuration from the environment,
    /// builds the tracker and starts the background refresh task. Subsequent
    /// calls return the same instance.
    pub async fn global() -> Result<Arc<Self>, FetchError> {
        GLOBAL_TRACKER
            .get_or_try_init(|| async {
                let config = TrackerConfig::from_env().unwrap_or_else(|e| {
                    tracing::warn!(error = %e, "Invalid tracker configuration, using defaults");
                    TrackerConfig::default()
                });
                let tracker = Arc::new(Self::new(config)?);
                tracker.start_background_task();
                Ok::<_, FetchError>(tracker)
            })
            .await
            .cloned()
    }

    /// Creates a tracker backed by the public upstream APIs
    ///
    /// The background task is not started; use `global()` in production code
    /// or call `start_background_task` explicitly.
    pub fn new(config: TrackerConfig) -> Result<Self, FetchError> {
        let provider = Arc::new(PublicApiProvider::new(&config)?);
        Ok(Self::with_provider(provider, config))
    }

    /// Creates a tracker with a custom provider
    ///
    /// This is primarily for testing with mock providers.
    pub fn with_provider(provider: Arc<dyn MarketDataProvider>, config: TrackerConfig) -> Self {
        let store = Arc::new(MarketSnapshotStore::new());
        let coordinator = Arc::new(RefreshCoordinator::new(provider, store.clone(), &config));

        Self {
            store,
            coordinator,
            config,
        }
    }

    /// Starts the periodic refresh task
    ///
    /// The first cycle runs immediately.
    pub fn start_background_task(&self) -> JoinHandle<()> {
        let coordinator = self.coordinator.clone();
        let period = self.config.refresh_interval;

        tokio::spawn(async move {
            tracing::info!(
                refresh_interval_secs = period.as_secs(),
                ttl_secs = coordinator.ttl().as_secs(),
                provider = coordinator.provider_name(),
                "Starting market data tracker background task"
            );

            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                if let RefreshOutcome::AlreadyInProgress = coordinator.refresh().await {
                    tracing::debug!("Periodic refresh skipped, cycle already in flight");
                }
            }
        })
    }

    /// Returns the current snapshot set, scheduling a refresh if it is due
    pub fn snapshot(&self) -> Arc<StoreSnapshot> {
        self.coordinator.trigger_if_due();
        self.store.snapshot()
    }

    /// Market overview
    pub fn overview(&self) -> OverviewView {
        views::overview(&self.snapshot())
    }

    /// Top gainers and losers by 24h change
    pub fn gainers_losers(&self) -> Result<MoversView, ViewError> {
        views::gainers_losers(&self.snapshot())
    }

    /// Heatmap of the first `limit` assets (default 50, at most 100)
    pub fn heatmap(&self, limit: Option<usize>) -> Vec<HeatmapTile> {
        views::heatmap(&self.snapshot(), limit)
    }

    /// Latest Fear & Greed reading and its series
    pub fn sentiment(&self) -> SentimentView {
        views::sentiment(&self.snapshot())
    }

    /// Short-term trend of the reference asset
    pub fn trend_forecast(&self) -> Result<ForecastView, ViewError> {
        views::trend_forecast(&self.snapshot(), self.config.forecast_method)
    }

    /// Forces an immediate refresh cycle
    ///
    /// Goes through the same single-flight gate as the periodic task, so it
    /// returns `AlreadyInProgress` if a cycle is running.
    pub async fn refresh_now(&self) -> RefreshOutcome {
        self.coordinator.refresh().await
    }

    /// Subscribes to market data events
    pub fn subscribe(&self) -> broadcast::Receiver<MarketDataEvent> {
        self.coordinator.subscribe()
    }

    /// Fetch latency and success rate for a category
    pub async fn category_metrics(&self, category: Category) -> CategoryMetrics {
        self.coordinator.metrics().get_metrics(category).await
    }

    /// Returns the name of the current provider
    pub fn provider_name(&self) -> &str {
        self.coordinator.provider_name()
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Perform a health check on the market data tracker
    ///
    /// A category counts as stale once it is older than twice the TTL, which
    /// means at least one refresh of it has failed.
    pub async fn health_check(&self) -> ComponentHealth {
        let snapshot = self.store.snapshot();
        let stale_after = self.config.cache_ttl * 2;
        let mut details = std::collections::HashMap::new();

        let mut missing = Vec::new();
        let mut stale = Vec::new();
        for category in Category::all() {
            let age = snapshot.fetched_at(*category).map(|fetched_at| {
                chrono::Utc::now()
                    .signed_duration_since(fetched_at)
                    .num_seconds()
                    .max(0)
            });

            match age {
                None => missing.push(category.name()),
                Some(secs) if secs as u64 >= stale_after.as_secs() => stale.push(category.name()),
                Some(_) => {}
            }

            details.insert(format!("{}_age_secs", category), serde_json::json!(age));
        }

        details.insert(
            "provider_name".to_string(),
            serde_json::json!(self.provider_name()),
        );
        details.insert("missing_categories".to_string(), serde_json::json!(missing));
        details.insert("stale_categories".to_string(), serde_json::json!(stale));

        let status = if snapshot.is_empty() {
            HealthStatus::Unhealthy
        } else if !missing.is_empty() || !stale.is_empty() {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        };

        let message = match status {
            HealthStatus::Healthy => "Market data tracker is operational with fresh data".to_string(),
            HealthStatus::Degraded => format!(
                "Market data tracker has {} missing and {} stale categories",
                missing.len(),
                stale.len()
            ),
            HealthStatus::Unhealthy => "Market data tracker has no data yet".to_string(),
        };

        ComponentHealth {
            name: "market_data_tracker".to_string(),
            status,
            message: Some(message),
            details,
            last_checked: chrono::Utc::now(),
        }
    }
}
