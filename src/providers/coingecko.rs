//! CoinGecko market-data endpoints
//!
//! Builds request URLs for global stats, the market list and the reference
//! asset's price chart, and decodes their bodies into typed payloads.

use crate::{
    config::TrackerConfig,
    constants::{
        COINGECKO_API_KEY_PARAM, COINGECKO_GLOBAL_ENDPOINT, COINGECKO_MARKETS_ENDPOINT,
        MAX_MARKET_LIST_SIZE,
    },
    error::FetchError,
    types::{GlobalStats, MarketAsset, PricePoint},
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

/// CoinGecko `/global` response envelope
#[derive(Debug, Deserialize)]
struct GlobalResponse {
    data: GlobalData,
}

#[derive(Debug, Deserialize)]
struct GlobalData {
    total_market_cap: HashMap<String, f64>,
    total_volume: HashMap<String, f64>,
    #[serde(default)]
    market_cap_percentage: BTreeMap<String, f64>,
    #[serde(default)]
    market_cap_change_percentage_24h_usd: f64,
}

/// CoinGecko `/coins/{id}/market_chart` response
#[derive(Debug, Deserialize)]
struct MarketChartResponse {
    prices: Vec<(f64, f64)>,
}

/// URL builder for the CoinGecko API
#[derive(Debug, Clone)]
pub struct CoinGeckoEndpoints {
    base_url: String,
    api_key: Option<String>,
    per_page: usize,
    reference_asset: String,
    history_days: u32,
    history_interval: String,
}

impl CoinGeckoEndpoints {
    pub fn new(config: &TrackerConfig) -> Self {
        Self {
            base_url: config.coingecko_base_url.trim_end_matches('/').to_string(),
            api_key: config.coingecko_api_key.clone(),
            per_page: config.market_list_size.clamp(1, MAX_MARKET_LIST_SIZE),
            reference_asset: config.reference_asset.clone(),
            history_days: config.history_days,
            history_interval: config.history_interval.clone(),
        }
    }

    pub fn global_url(&self) -> String {
        self.with_key(format!("{}{}", self.base_url, COINGECKO_GLOBAL_ENDPOINT))
    }

    pub fn markets_url(&self) -> String {
        self.with_key(format!(
            "{}{}?vs_currency=usd&order=market_cap_desc&per_page={}&page=1",
            self.base_url, COINGECKO_MARKETS_ENDPOINT, self.per_page
        ))
    }

    pub fn market_chart_url(&self) -> String {
        self.with_key(format!(
            "{}/coins/{}/market_chart?vs_currency=usd&days={}&interval={}",
            self.base_url, self.reference_asset, self.history_days, self.history_interval
        ))
    }

    fn with_key(&self, url: String) -> String {
        match &self.api_key {
            None => url,
            Some(key) => {
                let sep = if url.contains('?') { '&' } else { '?' };
                format!("{}{}{}={}", url, sep, COINGECKO_API_KEY_PARAM, key)
            }
        }
    }
}

/// Decodes a `/global` body
pub fn decode_global(body: Value) -> Result<GlobalStats, FetchError> {
    let response: GlobalResponse = serde_json::from_value(body)
        .map_err(|e| FetchError::malformed(format!("global stats: {}", e)))?;
    let data = response.data;

    let total_market_cap_usd = data
        .total_market_cap
        .get("usd")
        .copied()
        .ok_or_else(|| FetchError::malformed("global stats: missing total_market_cap.usd"))?;
    let total_volume_usd = data
        .total_volume
        .get("usd")
        .copied()
        .ok_or_else(|| FetchError::malformed("global stats: missing total_volume.usd"))?;

    Ok(GlobalStats {
        total_market_cap_usd,
        total_volume_usd,
        dominance: data.market_cap_percentage,
        market_cap_change_24h_pct: data.market_cap_change_percentage_24h_usd,
    })
}

/// Decodes a `/coins/markets` body
pub fn decode_markets(body: Value) -> Result<Vec<MarketAsset>, FetchError> {
    let assets: Vec<MarketAsset> = serde_json::from_value(body)
        .map_err(|e| FetchError::malformed(format!("market list: {}", e)))?;

    if assets.is_empty() {
        return Err(FetchError::malformed("market list: no assets returned"));
    }

    Ok(assets)
}

/// Decodes a `/coins/{id}/market_chart` body, oldest sample first
pub fn decode_market_chart(body: Value) -> Result<Vec<PricePoint>, FetchError> {
    let response: MarketChartResponse = serde_json::from_value(body)
        .map_err(|e| FetchError::malformed(format!("market chart: {}", e)))?;

    let mut points: Vec<PricePoint> = response
        .prices
        .into_iter()
        .filter(|(_, price)| price.is_finite())
        .filter_map(|(millis, price)| {
            DateTime::<Utc>::from_timestamp_millis(millis as i64)
                .map(|timestamp| PricePoint { timestamp, price })
        })
        .collect();

    if points.is_empty() {
        return Err(FetchError::malformed("market chart: no price samples"));
    }

    points.sort_by_key(|p| p.timestamp);
    Ok(points)
}
