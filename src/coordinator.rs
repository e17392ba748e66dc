//! Refresh coordinator
//!
//! Decides when a refresh is due, lets at most one refresh cycle run at a
//! time, fans out one provider call per category and commits each category
//! that succeeded. A failed category keeps its previous snapshot.

use crate::{
    config::TrackerConfig,
    constants::EVENT_CHANNEL_CAPACITY,
    error::FetchError,
    metrics::MetricsCollector,
    provider::MarketDataProvider,
    store::MarketSnapshotStore,
    types::{Category, CategoryPayload, MarketDataEvent},
};
use chrono::{DateTime, Utc};
use futures::stream::{FuturesUnordered, StreamExt};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio::time::{timeout, Instant};

/// Coordinator state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshState {
    Idle,
    Refreshing,
}

/// Summary of one completed refresh cycle
#[derive(Debug, Clone)]
pub struct RefreshReport {
    /// Cycle start; also the `fetched_at` of every committed category
    pub started_at: DateTime<Utc>,
    pub committed: Vec<Category>,
    /// Failed categories with the error message
    pub failed: Vec<(Category, String)>,
    pub elapsed: Duration,
}

impl RefreshReport {
    pub fn is_complete_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Result of asking the coordinator to refresh
#[derive(Debug, Clone)]
pub enum RefreshOutcome {
    /// This call ran the cycle
    Completed(RefreshReport),
    /// Another cycle was already in flight; nothing was fetched
    AlreadyInProgress,
}

/// Clears the in-flight flag when the cycle ends, even on panic or cancellation
struct RefreshGuard {
    flag: Arc<AtomicBool>,
}

impl Drop for RefreshGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Single-flight refresh coordinator
pub struct RefreshCoordinator {
    provider: Arc<dyn MarketDataProvider>,
    store: Arc<MarketSnapshotStore>,
    metrics: Arc<MetricsCollector>,
    events: broadcast::Sender<MarketDataEvent>,
    ttl: Duration,
    request_timeout: Duration,
    refreshing: Arc<AtomicBool>,
    last_attempt: Mutex<Option<Instant>>,
}

impl RefreshCoordinator {
    pub fn new(
        provider: Arc<dyn MarketDataProvider>,
        store: Arc<MarketSnapshotStore>,
        config: &TrackerConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            provider,
            store,
            metrics: Arc::new(MetricsCollector::new()),
            events,
            ttl: config.cache_ttl,
            request_timeout: config.request_timeout,
            refreshing: Arc::new(AtomicBool::new(false)),
            last_attempt: Mutex::new(None),
        }
    }

    pub fn state(&self) -> RefreshState {
        if self.refreshing.load(Ordering::Acquire) {
            RefreshState::Refreshing
        } else {
            RefreshState::Idle
        }
    }

    /// Start of the last refresh attempt, successful or not
    pub fn last_attempt(&self) -> Option<Instant> {
        *self.last_attempt.lock()
    }

    /// True if no refresh was ever attempted, or the last one is older than the TTL
    pub fn is_due(&self) -> bool {
        match self.last_attempt() {
            None => true,
            Some(at) => at.elapsed() >= self.ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn metrics(&self) -> &Arc<MetricsCollector> {
        &self.metrics
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.provider_name()
    }

    /// Subscribes to commit, failure and cycle events
    pub fn subscribe(&self) -> broadcast::Receiver<MarketDataEvent> {
        self.events.subscribe()
    }

    /// Moves Idle → Refreshing; only one caller can win
    fn try_begin(&self) -> Option<RefreshGuard> {
        self.refreshing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RefreshGuard {
                flag: Arc::clone(&self.refreshing),
            })
    }

    /// Runs a refresh cycle now, unless one is already in flight
    pub async fn refresh(&self) -> RefreshOutcome {
        let Some(_guard) = self.try_begin() else {
            tracing::debug!("Refresh already in progress, skipping");
            return RefreshOutcome::AlreadyInProgress;
        };

        RefreshOutcome::Completed(self.run_cycle().await)
    }

    /// Spawns a background refresh if one is due and none is in flight
    ///
    /// Never waits on the network. Returns true if this call started a cycle.
    /// Outside a tokio runtime nothing is spawned.
    pub fn trigger_if_due(self: &Arc<Self>) -> bool {
        if !self.is_due() {
            return false;
        }

        let Ok(runtime) = Handle::try_current() else {
            return false;
        };

        let Some(guard) = self.try_begin() else {
            return false;
        };

        // A cycle may have finished between the check and the flag swap
        if !self.is_due() {
            return false;
        }

        let coordinator = Arc::clone(self);
        runtime.spawn(async move {
            let _guard = guard;
            coordinator.run_cycle().await;
        });

        true
    }

    async fn run_cycle(&self) -> RefreshReport {
        let started = Instant::now();
        let started_at = Utc::now();
        let mut committed = Vec::new();
        let mut failed = Vec::new();

        let mut pending: FuturesUnordered<_> = Category::all()
            .iter()
            .map(|category| self.fetch_one(*category))
            .collect();

        while let Some((category, result, latency)) = pending.next().await {
            self.metrics
                .record_fetch(category, latency, result.is_ok())
                .await;

            match result {
                Ok(payload) => {
                    self.store.commit(payload, started_at);
                    committed.push(category);
                    let _ = self
                        .events
                        .send(MarketDataEvent::snapshot_committed(category, started_at));
                }
                Err(e) => {
                    tracing::warn!(
                        category = %category,
                        class = e.class(),
                        error = %e,
                        latency_ms = latency.as_millis() as u64,
                        "Category refresh failed, keeping previous snapshot"
                    );
                    let _ = self
                        .events
                        .send(MarketDataEvent::category_fetch_failed(category, e.to_string()));
                    failed.push((category, e.to_string()));
                }
            }
        }

        *self.last_attempt.lock() = Some(started);

        let failed_categories: Vec<Category> = failed.iter().map(|(c, _)| *c).collect();
        let _ = self.events.send(MarketDataEvent::refresh_completed(
            committed.clone(),
            failed_categories,
        ));

        let elapsed = started.elapsed();
        tracing::info!(
            committed = committed.len(),
            failed = failed.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            provider = self.provider.provider_name(),
            "Refresh cycle completed"
        );

        RefreshReport {
            started_at,
            committed,
            failed,
            elapsed,
        }
    }

    async fn fetch_one(
        &self,
        category: Category,
    ) -> (Category, Result<CategoryPayload, FetchError>, Duration) {
        let start = Instant::now();

        let result = match timeout(self.request_timeout, self.provider.fetch_category(category)).await
        {
            Ok(Ok(payload)) if payload.category() != category => Err(FetchError::malformed(
                format!("expected {} payload, got {}", category, payload.category()),
            )),
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout),
        };

        (category, result, start.elapsed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::mock::{asset, sample_markets, MockProvider, MockResponse};
    use tokio::sync::Barrier;

    fn config(ttl: Duration, request_timeout: Duration) -> TrackerConfig {
        TrackerConfig {
            cache_ttl: ttl,
            request_timeout,
            ..TrackerConfig::default()
        }
    }

    fn coordinator_with(
        provider: Arc<MockProvider>,
        config: &TrackerConfig,
    ) -> (Arc<RefreshCoordinator>, Arc<MarketSnapshotStore>) {
        let store = Arc::new(MarketSnapshotStore::new());
        let coordinator = Arc::new(RefreshCoordinator::new(provider, store.clone(), config));
        (coordinator, store)
    }

    fn completed(outcome: RefreshOutcome) -> RefreshReport {
        match outcome {
            RefreshOutcome::Completed(report) => report,
            RefreshOutcome::AlreadyInProgress => panic!("expected a completed cycle"),
        }
    }

    #[tokio::test]
    async fn test_full_refresh_commits_every_category() {
        let provider = Arc::new(MockProvider::healthy());
        let (coordinator, store) = coordinator_with(
            provider.clone(),
            &config(Duration::from_secs(30), Duration::from_secs(1)),
        );

        assert!(coordinator.is_due());
        let report = completed(coordinator.refresh().await);

        assert!(report.is_complete_success());
        assert_eq!(report.committed.len(), 4);
        assert_eq!(provider.call_count(), 4);
        for category in Category::all() {
            assert_eq!(store.fetched_at(*category), Some(report.started_at));
        }
        assert!(!coordinator.is_due());
        assert_eq!(coordinator.state(), RefreshState::Idle);
    }

    #[tokio::test]
    async fn test_timed_out_category_keeps_previous_snapshot() {
        let provider = Arc::new(MockProvider::healthy());
        let (coordinator, store) = coordinator_with(
            provider.clone(),
            &config(Duration::from_secs(30), Duration::from_millis(50)),
        );

        let first = completed(coordinator.refresh().await);
        let global_before = store.snapshot().global_stats.clone().unwrap();
        let first_attempt = coordinator.last_attempt().unwrap();

        tokio::time::sleep(Duration::from_millis(5)).await;
        provider.set_response(Category::GlobalStats, MockResponse::Timeout);
        provider.set_payload(CategoryPayload::MarketList(vec![asset("z", 1, Some(9.0))]));

        let second = completed(coordinator.refresh().await);
        assert_eq!(second.failed.len(), 1);
        assert_eq!(second.failed[0].0, Category::GlobalStats);
        assert!(second.failed[0].1.contains("timeout"));

        let snapshot = store.snapshot();
        let global_after = snapshot.global_stats.as_ref().unwrap();
        assert_eq!(global_after.fetched_at, first.started_at);
        assert!(Arc::ptr_eq(&global_after.payload, &global_before.payload));

        let markets = snapshot.market_list.as_ref().unwrap();
        assert_eq!(markets.fetched_at, second.started_at);
        assert_eq!(markets.payload[0].id, "z");

        assert!(coordinator.last_attempt().unwrap() > first_attempt);
    }

    #[tokio::test]
    async fn test_every_failure_mode_is_absorbed() {
        let provider = Arc::new(MockProvider::new());
        provider.set_response(Category::GlobalStats, MockResponse::Status(429));
        provider.set_response(Category::MarketList, MockResponse::Malformed);
        provider.set_response(Category::ReferencePriceHistory, MockResponse::Timeout);
        // SentimentIndex left unset: 404

        let (coordinator, store) = coordinator_with(
            provider,
            &config(Duration::from_secs(30), Duration::from_millis(20)),
        );

        let report = completed(coordinator.refresh().await);
        assert!(report.committed.is_empty());
        assert_eq!(report.failed.len(), 4);
        assert!(store.snapshot().is_empty());

        // The attempt still counts, so a failing upstream is not hammered
        assert!(coordinator.last_attempt().is_some());
        assert!(!coordinator.is_due());
    }

    #[tokio::test]
    async fn test_mismatched_payload_is_rejected() {
        let provider = Arc::new(MockProvider::healthy());
        provider.set_response(
            Category::GlobalStats,
            MockResponse::Ok(CategoryPayload::MarketList(sample_markets())),
        );
        let (coordinator, store) = coordinator_with(
            provider,
            &config(Duration::from_secs(30), Duration::from_secs(1)),
        );

        let report = completed(coordinator.refresh().await);
        assert_eq!(report.failed.len(), 1);
        assert!(!store.snapshot().has(Category::GlobalStats));
    }

    #[tokio::test]
    async fn test_concurrent_refreshes_collapse_into_one() {
        let provider = Arc::new(MockProvider::healthy());
        provider.set_delay(Duration::from_millis(100));
        let (coordinator, _store) = coordinator_with(
            provider.clone(),
            &config(Duration::from_secs(30), Duration::from_secs(1)),
        );

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let coordinator = coordinator.clone();
                tokio::spawn(async move { coordinator.refresh().await })
            })
            .collect();

        let mut completed_count = 0;
        for handle in handles {
            if let RefreshOutcome::Completed(_) = handle.await.unwrap() {
                completed_count += 1;
            }
        }

        assert_eq!(completed_count, 1);
        assert_eq!(provider.call_count(), Category::all().len());
    }

    #[tokio::test]
    async fn test_trigger_if_due_is_single_flight() {
        let provider = Arc::new(MockProvider::healthy());
        provider.set_delay(Duration::from_millis(50));
        let (coordinator, store) = coordinator_with(
            provider.clone(),
            &config(Duration::from_secs(30), Duration::from_secs(1)),
        );

        let started: usize = (0..32)
            .map(|_| coordinator.trigger_if_due() as usize)
            .sum();
        assert_eq!(started, 1);
        assert_eq!(coordinator.state(), RefreshState::Refreshing);

        // Reads are not blocked while the cycle is in flight
        assert!(store.snapshot().is_empty());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(coordinator.state(), RefreshState::Idle);
        assert_eq!(provider.call_count(), Category::all().len());
        assert!(!store.snapshot().is_empty());

        // Fresh data: no new cycle
        assert!(!coordinator.trigger_if_due());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_parallel_refreshes_collapse_into_one() {
        const RACERS: usize = 32;
        const ROUNDS: usize = 10;

        let provider = Arc::new(MockProvider::healthy());
        provider.set_delay(Duration::from_millis(50));
        let (coordinator, _store) = coordinator_with(
            provider.clone(),
            &config(Duration::from_secs(30), Duration::from_secs(1)),
        );

        for round in 1..=ROUNDS {
            let barrier = Arc::new(Barrier::new(RACERS));
            let handles: Vec<_> = (0..RACERS)
                .map(|_| {
                    let coordinator = coordinator.clone();
                    let barrier = barrier.clone();
                    tokio::spawn(async move {
                        barrier.wait().await;
                        coordinator.refresh().await
                    })
                })
                .collect();

            let mut completed_count = 0;
            for handle in handles {
                if let RefreshOutcome::Completed(_) = handle.await.unwrap() {
                    completed_count += 1;
                }
            }

            assert_eq!(completed_count, 1, "round {}", round);
            assert_eq!(provider.call_count(), round * Category::all().len());
            assert_eq!(coordinator.state(), RefreshState::Idle);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_parallel_triggers_start_one_cycle() {
        const RACERS: usize = 32;

        let provider = Arc::new(MockProvider::healthy());
        provider.set_delay(Duration::from_millis(50));
        let (coordinator, store) = coordinator_with(
            provider.clone(),
            &config(Duration::from_secs(30), Duration::from_secs(1)),
        );

        let barrier = Arc::new(Barrier::new(RACERS));
        let handles: Vec<_> = (0..RACERS)
            .map(|_| {
                let coordinator = coordinator.clone();
                let barrier = barrier.clone();
                tokio::spawn(async move {
                    barrier.wait().await;
                    coordinator.trigger_if_due()
                })
            })
            .collect();

        let mut started = 0;
        for handle in handles {
            if handle.await.unwrap() {
                started += 1;
            }
        }
        assert_eq!(started, 1);

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(coordinator.state(), RefreshState::Idle);
        assert_eq!(provider.call_count(), Category::all().len());
        assert!(!store.snapshot().is_empty());
    }

    #[test]
    fn test_trigger_outside_runtime_is_a_no_op() {
        let provider = Arc::new(MockProvider::healthy());
        let (coordinator, _store) = coordinator_with(
            provider.clone(),
            &config(Duration::from_secs(30), Duration::from_secs(1)),
        );

        assert!(!coordinator.trigger_if_due());
        assert_eq!(coordinator.state(), RefreshState::Idle);
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_ttl_expiry_makes_refresh_due_again() {
        let provider = Arc::new(MockProvider::healthy());
        let (coordinator, _store) = coordinator_with(
            provider,
            &config(Duration::from_millis(40), Duration::from_secs(1)),
        );

        completed(coordinator.refresh().await);
        assert!(!coordinator.is_due());

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(coordinator.is_due());
    }

    #[tokio::test]
    async fn test_events_are_published() {
        let provider = Arc::new(MockProvider::healthy());
        provider.set_response(Category::SentimentIndex, MockResponse::Status(503));
        let (coordinator, _store) = coordinator_with(
            provider,
            &config(Duration::from_secs(30), Duration::from_secs(1)),
        );
        let mut events = coordinator.subscribe();

        completed(coordinator.refresh().await);

        let mut committed = 0;
        let mut failed = 0;
        let mut cycles = 0;
        let mut ids = std::collections::HashSet::new();
        while let Ok(event) = events.try_recv() {
            assert!(ids.insert(event.id()), "event ids must be unique");
            match event {
                MarketDataEvent::SnapshotCommitted { .. } => committed += 1,
                MarketDataEvent::CategoryFetchFailed { category, .. } => {
                    assert_eq!(category, Category::SentimentIndex);
                    failed += 1;
                }
                MarketDataEvent::RefreshCompleted { .. } => cycles += 1,
            }
        }
        assert_eq!((committed, failed, cycles), (3, 1, 1));
    }

    #[tokio::test]
    async fn test_metrics_record_each_fetch() {
        let provider = Arc::new(MockProvider::healthy());
        provider.set_response(Category::GlobalStats, MockResponse::Status(500));
        let (coordinator, _store) = coordinator_with(
            provider,
            &config(Duration::from_secs(30), Duration::from_secs(1)),
        );

        completed(coordinator.refresh().await);

        let global = coordinator.metrics().get_metrics(Category::GlobalStats).await;
        assert_eq!(global.failed_requests, 1);
        let markets = coordinator.metrics().get_metrics(Category::MarketList).await;
        assert_eq!(markets.total_requests, 1);
        assert_eq!(markets.success_rate, 1.0);
    }
}
