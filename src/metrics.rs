//! Upstream fetch metrics
//!
//! Tracks latency percentiles and success rates per category.

use crate::types::Category;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::sync::RwLock;

/// Maximum number of samples to keep per category
const MAX_SAMPLES: usize = 100;

/// Fetch metrics for a single category
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryMetrics {
    pub category: Category,
    /// 50th percentile latency of successful fetches, in milliseconds
    pub latency_p50_ms: f64,
    /// 99th percentile latency of successful fetches, in milliseconds
    pub latency_p99_ms: f64,
    /// Success rate (0.0 to 1.0)
    pub success_rate: f64,
    /// Total number of fetches tracked
    pub total_requests: u64,
    /// Number of failed fetches
    pub failed_requests: u64,
}

impl CategoryMetrics {
    /// Creates metrics with no data
    pub fn empty(category: Category) -> Self {
        Self {
            category,
            latency_p50_ms: 0.0,
            latency_p99_ms: 0.0,
            success_rate: 1.0,
            total_requests: 0,
            failed_requests: 0,
        }
    }
}

#[derive(Debug, Clone)]
struct LatencySample {
    duration_ms: f64,
    success: bool,
}

#[derive(Debug, Default)]
struct CategorySamples {
    samples: VecDeque<LatencySample>,
    total: u64,
    failed: u64,
}

/// Collects fetch samples and computes metrics per category
#[derive(Debug, Default)]
pub struct MetricsCollector {
    categories: RwLock<HashMap<Category, CategorySamples>>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one fetch with its duration and outcome
    pub async fn record_fetch(&self, category: Category, duration: Duration, success: bool) {
        let mut categories = self.categories.write().await;
        let entry = categories.entry(category).or_default();

        entry.total += 1;
        if !success {
            entry.failed += 1;
        }

        if entry.samples.len() >= MAX_SAMPLES {
            entry.samples.pop_front();
        }
        entry.samples.push_back(LatencySample {
            duration_ms: duration.as_secs_f64() * 1000.0,
            success,
        });
    }

    /// Computes current metrics for a category
    pub async fn get_metrics(&self, category: Category) -> CategoryMetrics {
        let categories = self.categories.read().await;
        let Some(entry) = categories.get(&category) else {
            return CategoryMetrics::empty(category);
        };

        let mut latencies: Vec<f64> = entry
            .samples
            .iter()
            .filter(|s| s.success)
            .map(|s| s.duration_ms)
            .collect();
        latencies.sort_by(|a, b| a.total_cmp(b));

        let success_rate = if entry.total > 0 {
            (entry.total - entry.failed) as f64 / entry.total as f64
        } else {
            1.0
        };

        CategoryMetrics {
            category,
            latency_p50_ms: percentile(&latencies, 50.0),
            latency_p99_ms: percentile(&latencies, 99.0),
            success_rate,
            total_requests: entry.total,
            failed_requests: entry.failed,
        }
    }
}

/// Calculate percentile from sorted values
fn percentile(sorted_values: &[f64], p: f64) -> f64 {
    if sorted_values.is_empty() {
        return 0.0;
    }

    let idx = (p / 100.0 * (sorted_values.len() - 1) as f64).round() as usize;
    sorted_values[idx.min(sorted_values.len() - 1)]
}
