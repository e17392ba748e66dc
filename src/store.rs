//! In-memory snapshot store
//!
//! Holds the last successfully fetched payload of every category. Readers take
//! a cheap `Arc` of the whole snapshot set and work on it without holding any
//! lock, so a commit never blocks a reader and a reader never observes a
//! half-written category.

use crate::types::{
    Category, CategoryPayload, GlobalStats, MarketAsset, PricePoint, SentimentSample, Snapshot,
};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::sync::Arc;

/// A consistent, immutable view of every category at one point in time
///
/// `None` means the category has never been fetched successfully since start-up.
#[derive(Debug, Clone, Default)]
pub struct StoreSnapshot {
    pub global_stats: Option<Snapshot<GlobalStats>>,
    pub market_list: Option<Snapshot<Vec<MarketAsset>>>,
    pub price_history: Option<Snapshot<Vec<PricePoint>>>,
    pub sentiment: Option<Snapshot<Vec<SentimentSample>>>,
}

impl StoreSnapshot {
    /// Replaces the slot matching the payload's category
    fn apply(&mut self, payload: CategoryPayload, fetched_at: DateTime<Utc>) {
        match payload {
            CategoryPayload::GlobalStats(stats) => {
                self.global_stats = Some(Snapshot::new(stats, fetched_at));
            }
            CategoryPayload::MarketList(assets) => {
                self.market_list = Some(Snapshot::new(assets, fetched_at));
            }
            CategoryPayload::ReferencePriceHistory(points) => {
                self.price_history = Some(Snapshot::new(points, fetched_at));
            }
            CategoryPayload::SentimentIndex(samples) => {
                self.sentiment = Some(Snapshot::new(samples, fetched_at));
            }
        }
    }

    /// When the category was last fetched successfully
    pub fn fetched_at(&self, category: Category) -> Option<DateTime<Utc>> {
        match category {
            Category::GlobalStats => self.global_stats.as_ref().map(|s| s.fetched_at),
            Category::MarketList => self.market_list.as_ref().map(|s| s.fetched_at),
            Category::ReferencePriceHistory => self.price_history.as_ref().map(|s| s.fetched_at),
            Category::SentimentIndex => self.sentiment.as_ref().map(|s| s.fetched_at),
        }
    }

    /// True if the category has been fetched at least once
    pub fn has(&self, category: Category) -> bool {
        self.fetched_at(category).is_some()
    }

    /// True if no category has ever been fetched
    pub fn is_empty(&self) -> bool {
        Category::all().iter().all(|c| !self.has(*c))
    }
}

/// In-memory store for category snapshots
pub struct MarketSnapshotStore {
    current: RwLock<Arc<StoreSnapshot>>,
}

impl MarketSnapshotStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Arc::new(StoreSnapshot::default())),
        }
    }

    /// Returns the current snapshot set
    ///
    /// The returned value is immutable; later commits produce a new set and
    /// leave this one untouched.
    pub fn snapshot(&self) -> Arc<StoreSnapshot> {
        Arc::clone(&self.current.read())
    }

    /// Atomically replaces one category's snapshot
    ///
    /// Other categories are carried over unchanged.
    pub fn commit(&self, payload: CategoryPayload, fetched_at: DateTime<Utc>) {
        let category = payload.category();
        let mut current = self.current.write();
        Arc::make_mut(&mut current).apply(payload, fetched_at);
        tracing::debug!(category = %category, fetched_at = %fetched_at, "Committed snapshot");
    }

    /// When the category was last fetched successfully
    pub fn fetched_at(&self, category: Category) -> Option<DateTime<Utc>> {
        self.current.read().fetched_at(category)
    }
}

impl Default for MarketSnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}
