//! Types for the market analytics tracker

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Independently fetched classes of upstream data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Total market cap, volume and dominance
    GlobalStats,
    /// Top assets by market cap
    MarketList,
    /// Price history of the reference asset
    ReferencePriceHistory,
    /// Fear & Greed index
    SentimentIndex,
}

impl Category {
    /// Get the category name used in logs and responses
    pub fn name(&self) -> &'static str {
        match self {
            Category::GlobalStats => "global_stats",
            Category::MarketList => "market_list",
            Category::ReferencePriceHistory => "reference_price_history",
            Category::SentimentIndex => "sentiment_index",
        }
    }

    /// Get all categories, in refresh order
    pub fn all() -> &'static [Category] {
        &[
            Category::GlobalStats,
            Category::MarketList,
            Category::ReferencePriceHistory,
            Category::SentimentIndex,
        ]
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Aggregate market statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalStats {
    /// Total market capitalization in USD
    pub total_market_cap_usd: f64,
    /// Total 24h trading volume in USD
    pub total_volume_usd: f64,
    /// Market cap share per asset symbol (lowercase), in percent
    pub dominance: BTreeMap<String, f64>,
    /// 24h market cap change in percent
    pub market_cap_change_24h_pct: f64,
}

impl GlobalStats {
    /// Dominance of an asset by lowercase symbol
    pub fn dominance_of(&self, symbol: &str) -> Option<f64> {
        self.dominance.get(symbol).copied()
    }
}

/// One asset record of the market list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketAsset {
    pub id: String,
    pub symbol: String,
    pub name: String,
    #[serde(alias = "market_cap_rank")]
    pub rank: Option<u32>,
    pub current_price: Option<f64>,
    pub market_cap: Option<f64>,
    #[serde(alias = "price_change_percentage_24h")]
    pub price_change_24h_pct: Option<f64>,
}

/// A single (timestamp, price) sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
}

/// A single sentiment index reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentSample {
    /// Index value, 0 (extreme fear) to 100 (extreme greed)
    pub value: u32,
    /// Upstream label, e.g. "Fear" or "Greed"
    pub classification: String,
    pub timestamp: Option<DateTime<Utc>>,
}

/// A typed payload for one category, as returned by a provider
#[derive(Debug, Clone, PartialEq)]
pub enum CategoryPayload {
    GlobalStats(GlobalStats),
    /// Ordered as returned by upstream; consumers must not rely on it
    MarketList(Vec<MarketAsset>),
    /// Oldest sample first
    ReferencePriceHistory(Vec<PricePoint>),
    /// Most recent sample first
    SentimentIndex(Vec<SentimentSample>),
}

impl CategoryPayload {
    /// The category this payload belongs to
    pub fn category(&self) -> Category {
        match self {
            CategoryPayload::GlobalStats(_) => Category::GlobalStats,
            CategoryPayload::MarketList(_) => Category::MarketList,
            CategoryPayload::ReferencePriceHistory(_) => Category::ReferencePriceHistory,
            CategoryPayload::SentimentIndex(_) => Category::SentimentIndex,
        }
    }
}

/// Last known-good payload of a category plus the time it was fetched
#[derive(Debug)]
pub struct Snapshot<T> {
    pub payload: Arc<T>,
    pub fetched_at: DateTime<Utc>,
}

// Manual impl: cloning only bumps the payload refcount, and T need not be Clone.
impl<T> Clone for Snapshot<T> {
    fn clone(&self) -> Self {
        Self {
            payload: Arc::clone(&self.payload),
            fetched_at: self.fetched_at,
        }
    }
}

impl<T> Snapshot<T> {
    pub fn new(payload: T, fetched_at: DateTime<Utc>) -> Self {
        Self {
            payload: Arc::new(payload),
            fetched_at,
        }
    }

    /// Get the age of the snapshot
    pub fn age(&self) -> Duration {
        let age = Utc::now().signed_duration_since(self.fetched_at);
        age.to_std().unwrap_or(Duration::ZERO)
    }

    /// Check if the snapshot is older than `ttl`
    pub fn is_stale(&self, ttl: Duration) -> bool {
        self.age() >= ttl
    }
}

/// Market data events published by the tracker
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MarketDataEvent {
    /// A category was replaced in the snapshot store
    SnapshotCommitted {
        id: Uuid,
        category: Category,
        fetched_at: DateTime<Utc>,
    },

    /// A category failed to refresh; its previous snapshot was kept
    CategoryFetchFailed {
        id: Uuid,
        category: Category,
        error_message: String,
        timestamp: DateTime<Utc>,
    },

    /// A refresh cycle finished
    RefreshCompleted {
        id: Uuid,
        committed: Vec<Category>,
        failed: Vec<Category>,
        timestamp: DateTime<Utc>,
    },
}

impl MarketDataEvent {
    pub fn snapshot_committed(category: Category, fetched_at: DateTime<Utc>) -> Self {
        Self::SnapshotCommitted {
            id: Uuid::new_v4(),
            category,
            fetched_at,
        }
    }

    pub fn category_fetch_failed(category: Category, error_message: String) -> Self {
        Self::CategoryFetchFailed {
            id: Uuid::new_v4(),
            category,
            error_message,
            timestamp: Utc::now(),
        }
    }

    pub fn refresh_completed(committed: Vec<Category>, failed: Vec<Category>) -> Self {
        Self::RefreshCompleted {
            id: Uuid::new_v4(),
            committed,
            failed,
            timestamp: Utc::now(),
        }
    }

    /// Get the event ID
    pub fn id(&self) -> Uuid {
        match self {
            MarketDataEvent::SnapshotCommitted { id, .. } => *id,
            MarketDataEvent::CategoryFetchFailed { id, .. } => *id,
            MarketDataEvent::RefreshCompleted { id, .. } => *id,
        }
    }

    /// Get the event type as string
    pub fn event_type(&self) -> &'static str {
        match self {
            MarketDataEvent::SnapshotCommitted { .. } => "SNAPSHOT_COMMITTED",
            MarketDataEvent::CategoryFetchFailed { .. } => "CATEGORY_FETCH_FAILED",
            MarketDataEvent::RefreshCompleted { .. } => "REFRESH_COMPLETED",
        }
    }
}

impl std::fmt::Display for MarketDataEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MarketDataEvent::SnapshotCommitted { category, .. } => {
                write!(f, "Snapshot committed: {}", category)
            }
            MarketDataEvent::CategoryFetchFailed {
                category,
                error_message,
                ..
            } => write!(f, "Fetch failed for {}: {}", category, error_message),
            MarketDataEvent::RefreshCompleted {
                committed, failed, ..
            } => write!(
                f,
                "Refresh completed: {} committed, {} failed",
                committed.len(),
                failed.len()
            ),
        }
    }
}

/// Overall system health status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthStatus {
    /// Every category is present and fresh
    Healthy,
    /// Some categories are absent or stale
    Degraded,
    /// No category has ever been fetched
    Unhealthy,
}

/// Component health information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    /// Component name
    pub name: String,
    /// Component status
    pub status: HealthStatus,
    /// Optional status message
    pub message: Option<String>,
    /// Component-specific details
    pub details: std::collections::HashMap<String, serde_json::Value>,
    /// Last checked timestamp
    pub last_checked: DateTime<Utc>,
}
