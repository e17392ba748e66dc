//! Provider abstraction for fetching market data categories from external APIs

use crate::{
    error::FetchError,
    types::{Category, CategoryPayload},
};
use async_trait::async_trait;

/// Trait for market data providers
///
/// A provider knows where each [`Category`] lives upstream and how to decode
/// it. Every call maps to a single upstream request; the refresh coordinator
/// owns timeouts, concurrency and commit policy.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Fetches and decodes one category
    ///
    /// # Returns
    /// The typed payload, or a classified error. Never panics on bad input.
    async fn fetch_category(&self, category: Category) -> Result<CategoryPayload, FetchError>;

    /// Returns the name of this provider
    fn provider_name(&self) -> &'static str;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use crate::types::{GlobalStats, MarketAsset, PricePoint, SentimentSample};
    use chrono::{TimeZone, Utc};
    use std::collections::{BTreeMap, HashMap};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Canned response for a category
    #[derive(Clone)]
    pub enum MockResponse {
        Ok(CategoryPayload),
        Status(u16),
        Malformed,
        Timeout,
    }

    /// Mock provider for testing
    pub struct MockProvider {
        responses: Mutex<HashMap<Category, MockResponse>>,
        delay: Mutex<Duration>,
        call_count: AtomicUsize,
    }

    impl Default for MockProvider {
        fn default() -> Self {
            Self::new()
        }
    }

    impl MockProvider {
        pub fn new() -> Self {
            Self {
                responses: Mutex::new(HashMap::new()),
                delay: Mutex::new(Duration::ZERO),
                call_count: AtomicUsize::new(0),
            }
        }

        /// A provider that answers every category successfully
        pub fn healthy() -> Self {
            let provider = Self::new();
            provider.set_payload(CategoryPayload::GlobalStats(sample_global_stats()));
            provider.set_payload(CategoryPayload::MarketList(sample_markets()));
            provider.set_payload(CategoryPayload::ReferencePriceHistory(sample_history(
                &[100.0, 101.0, 102.0, 103.0],
            )));
            provider.set_payload(CategoryPayload::SentimentIndex(sample_sentiment()));
            provider
        }

        pub fn set_payload(&self, payload: CategoryPayload) {
            let category = payload.category();
            self.responses
                .lock()
                .unwrap()
                .insert(category, MockResponse::Ok(payload));
        }

        pub fn set_response(&self, category: Category, response: MockResponse) {
            self.responses.lock().unwrap().insert(category, response);
        }

        /// Delays every call, to keep refresh cycles in flight
        pub fn set_delay(&self, delay: Duration) {
            *self.delay.lock().unwrap() = delay;
        }

        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl MarketDataProvider for MockProvider {
        async fn fetch_category(
            &self,
            category: Category,
        ) -> Result<CategoryPayload, FetchError> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            let delay = *self.delay.lock().unwrap();
            let response = self.responses.lock().unwrap().get(&category).cloned();

            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            match response {
                Some(MockResponse::Ok(payload)) => Ok(payload),
                Some(MockResponse::Status(code)) => Err(FetchError::HttpStatus(code)),
                Some(MockResponse::Malformed) => Err(FetchError::malformed("mock")),
                Some(MockResponse::Timeout) => {
                    // Longer than any timeout used in tests
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Err(FetchError::Timeout)
                }
                None => Err(FetchError::HttpStatus(404)),
            }
        }

        fn provider_name(&self) -> &'static str {
            "mock"
        }
    }

    pub fn sample_global_stats() -> GlobalStats {
        let mut dominance = BTreeMap::new();
        dominance.insert("btc".to_string(), 52.5);
        dominance.insert("eth".to_string(), 17.25);
        GlobalStats {
            total_market_cap_usd: 2.4e12,
            total_volume_usd: 9.1e10,
            dominance,
            market_cap_change_24h_pct: 1.8,
        }
    }

    pub fn asset(id: &str, rank: u32, change: Option<f64>) -> MarketAsset {
        MarketAsset {
            id: id.to_string(),
            symbol: id.to_uppercase(),
            name: id.to_string(),
            rank: Some(rank),
            current_price: Some(rank as f64 * 10.0),
            market_cap: Some(1e9 / rank as f64),
            price_change_24h_pct: change,
        }
    }

    pub fn sample_markets() -> Vec<MarketAsset> {
        vec![
            asset("a", 1, Some(5.0)),
            asset("b", 2, Some(-3.0)),
            asset("c", 3, None),
        ]
    }

    pub fn sample_history(prices: &[f64]) -> Vec<PricePoint> {
        prices
            .iter()
            .enumerate()
            .map(|(i, price)| PricePoint {
                timestamp: Utc.timestamp_opt(1_700_000_000 + i as i64 * 3600, 0).unwrap(),
                price: *price,
            })
            .collect()
    }

    pub fn sample_sentiment() -> Vec<SentimentSample> {
        vec![
            SentimentSample {
                value: 72,
                classification: "Greed".to_string(),
                timestamp: Utc.timestamp_opt(1_700_086_400, 0).single(),
            },
            SentimentSample {
                value: 40,
                classification: "Fear".to_string(),
                timestamp: Utc.timestamp_opt(1_700_000_000, 0).single(),
            },
        ]
    }
}
