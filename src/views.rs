//! Analytics views
//!
//! Pure, synchronous functions over a [`StoreSnapshot`]. They never touch the
//! network and never fail on missing data: every view has a defined shape for
//! an absent category, either as explicit `null`/empty fields or as a
//! [`ViewError`] that [`respond`] renders as `{ "error": true, ... }`.

use crate::{
    config::ForecastMethod,
    constants::{
        DEFAULT_HEATMAP_LIMIT, FORECAST_CONFIDENCE_PER_PCT, FORECAST_MAX_CONFIDENCE,
        FORECAST_TREND_THRESHOLD_PCT, FORECAST_WINDOW, MAX_HEATMAP_LIMIT, MOVERS_COUNT,
        OVERVIEW_TOP_COUNT,
    },
    error::ViewError,
    store::StoreSnapshot,
    types::{Category, MarketAsset, SentimentSample},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};

/// Market overview
///
/// Stats fields are `null` and `error` is true while global stats have never
/// been fetched; `top5` is filled independently from the market list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverviewView {
    pub error: bool,
    pub market_cap: Option<f64>,
    pub volume_24h: Option<f64>,
    pub btc_dominance: Option<f64>,
    pub eth_dominance: Option<f64>,
    pub market_change_24h: Option<f64>,
    pub top5: Vec<MarketAsset>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// An asset ranked by its 24h change
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mover {
    pub id: String,
    pub symbol: String,
    pub name: String,
    pub price: Option<f64>,
    #[serde(rename = "change24")]
    pub change_24h: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MoversView {
    /// Highest 24h change first
    pub gainers: Vec<Mover>,
    /// Lowest 24h change first
    pub losers: Vec<Mover>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatmapTile {
    pub id: String,
    pub symbol: String,
    pub price: Option<f64>,
    #[serde(rename = "change24")]
    pub change_24h: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SentimentView {
    /// False when the sentinel is returned
    pub available: bool,
    pub latest: SentimentSample,
    /// Most recent first
    pub series: Vec<SentimentSample>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Trend {
    Bullish,
    Bearish,
    Neutral,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastView {
    /// Most recent price of the window
    pub last: f64,
    /// Mean price over the window
    pub avg: f64,
    /// Prices of the window, oldest first
    pub last24: Vec<f64>,
    pub trend: Trend,
    /// Percentage change, rounded to 2 decimals
    pub change: f64,
    /// 0..=95
    pub confidence: f64,
}

/// Builds the market overview
pub fn overview(snapshot: &StoreSnapshot) -> OverviewView {
    let top5 = snapshot
        .market_list
        .as_ref()
        .map(|list| top_by_rank(&list.payload, OVERVIEW_TOP_COUNT))
        .unwrap_or_default();

    match &snapshot.global_stats {
        Some(stats) => OverviewView {
            error: false,
            market_cap: Some(stats.payload.total_market_cap_usd),
            volume_24h: Some(stats.payload.total_volume_usd),
            btc_dominance: stats.payload.dominance_of("btc"),
            eth_dominance: stats.payload.dominance_of("eth"),
            market_change_24h: Some(stats.payload.market_cap_change_24h_pct),
            top5,
            updated_at: Some(stats.fetched_at),
        },
        None => OverviewView {
            error: true,
            market_cap: None,
            volume_24h: None,
            btc_dominance: None,
            eth_dominance: None,
            market_change_24h: None,
            top5,
            updated_at: None,
        },
    }
}

fn top_by_rank(assets: &[MarketAsset], count: usize) -> Vec<MarketAsset> {
    let mut ranked: Vec<&MarketAsset> = assets.iter().collect();
    ranked.sort_by_key(|a| a.rank.unwrap_or(u32::MAX));
    ranked.into_iter().take(count).cloned().collect()
}

/// Builds the gainers and losers lists
///
/// Assets without a finite 24h change are skipped. Ties keep market list order.
pub fn gainers_losers(snapshot: &StoreSnapshot) -> Result<MoversView, ViewError> {
    let list = snapshot
        .market_list
        .as_ref()
        .ok_or_else(|| ViewError::unavailable(Category::MarketList))?;

    let rankable: Vec<Mover> = list
        .payload
        .iter()
        .filter_map(|asset| {
            let change = asset.price_change_24h_pct.filter(|c| c.is_finite())?;
            Some(Mover {
                id: asset.id.clone(),
                symbol: asset.symbol.clone(),
                name: asset.name.clone(),
                price: asset.current_price,
                change_24h: change,
            })
        })
        .collect();

    let mut gainers = rankable.clone();
    gainers.sort_by(|a, b| b.change_24h.total_cmp(&a.change_24h));
    gainers.truncate(MOVERS_COUNT);

    let mut losers = rankable;
    losers.sort_by(|a, b| a.change_24h.total_cmp(&b.change_24h));
    losers.truncate(MOVERS_COUNT);

    Ok(MoversView { gainers, losers })
}

/// Builds the heatmap
///
/// Returns `min(limit, available, 100)` tiles in market list order; `limit`
/// defaults to 50. An absent market list yields an empty heatmap.
pub fn heatmap(snapshot: &StoreSnapshot, limit: Option<usize>) -> Vec<HeatmapTile> {
    let limit = limit.unwrap_or(DEFAULT_HEATMAP_LIMIT).min(MAX_HEATMAP_LIMIT);

    snapshot
        .market_list
        .as_ref()
        .map(|list| {
            list.payload
                .iter()
                .take(limit)
                .map(|asset| HeatmapTile {
                    id: asset.id.clone(),
                    symbol: asset.symbol.clone(),
                    price: asset.current_price,
                    change_24h: asset.price_change_24h_pct,
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Builds the sentiment snapshot, or the "No data" sentinel
pub fn sentiment(snapshot: &StoreSnapshot) -> SentimentView {
    let latest = snapshot
        .sentiment
        .as_ref()
        .and_then(|s| s.payload.first().cloned().map(|latest| (latest, s)));

    match latest {
        Some((latest, series)) => SentimentView {
            available: true,
            latest,
            series: series.payload.to_vec(),
        },
        None => SentimentView {
            available: false,
            latest: SentimentSample {
                value: 0,
                classification: "No data".to_string(),
                timestamp: None,
            },
            series: Vec::new(),
        },
    }
}

/// Builds the trend forecast from the reference price history
pub fn trend_forecast(
    snapshot: &StoreSnapshot,
    method: ForecastMethod,
) -> Result<ForecastView, ViewError> {
    let history = snapshot
        .price_history
        .as_ref()
        .filter(|h| !h.payload.is_empty())
        .ok_or_else(|| ViewError::unavailable(Category::ReferencePriceHistory))?;

    let prices: Vec<f64> = history.payload.iter().map(|p| p.price).collect();
    Ok(forecast_from_prices(&prices, method))
}

/// Computes a forecast over the last 24 prices (oldest first)
///
/// Not a model: a linear heuristic comparing two parts of the window. Fewer
/// than two samples, or a zero baseline, give a change of 0.
pub fn forecast_from_prices(prices: &[f64], method: ForecastMethod) -> ForecastView {
    let window = &prices[prices.len().saturating_sub(FORECAST_WINDOW)..];

    let raw_change = if window.len() < 2 {
        0.0
    } else {
        match method {
            ForecastMethod::HalfWindowMean => {
                let (first, second) = window.split_at(window.len() / 2);
                pct_change(mean(first), mean(second))
            }
            ForecastMethod::Endpoints => pct_change(window[0], window[window.len() - 1]),
        }
    };

    let change = round_to(raw_change, 2);
    let trend = if change > FORECAST_TREND_THRESHOLD_PCT {
        Trend::Bullish
    } else if change < -FORECAST_TREND_THRESHOLD_PCT {
        Trend::Bearish
    } else {
        Trend::Neutral
    };
    let confidence = round_to(
        (change.abs() * FORECAST_CONFIDENCE_PER_PCT).min(FORECAST_MAX_CONFIDENCE),
        1,
    );

    ForecastView {
        last: window.last().copied().unwrap_or(0.0),
        avg: mean(window),
        last24: window.to_vec(),
        trend,
        change,
        confidence,
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn pct_change(from: f64, to: f64) -> f64 {
    if from == 0.0 {
        return 0.0;
    }
    let change = (to - from) / from * 100.0;
    if change.is_finite() {
        change
    } else {
        0.0
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Renders a view result as an endpoint response body
///
/// `Err` becomes `{ "error": true, "message": ..., "category": ... }`.
pub fn respond<T: Serialize>(result: Result<T, ViewError>) -> Value {
    match result {
        Ok(view) => serde_json::to_value(view)
            .unwrap_or_else(|e| json!({ "error": true, "message": e.to_string() })),
        Err(e) => {
            let ViewError::CategoryUnavailable { category } = &e;
            json!({ "error": true, "message": e.to_string(), "category": category })
        }
    }
}
