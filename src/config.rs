//! Runtime configuration for the market analytics tracker
//!
//! Defaults come from [`constants`](crate::constants). Every field can be
//! overridden through environment variables with [`TrackerConfig::from_env`],
//! so the TTL and upstream endpoints are tunable without a rebuild.

use crate::{
    constants::{
        CACHE_TTL_SECS, COINGECKO_API_URL, DEFAULT_HISTORY_DAYS, DEFAULT_HISTORY_INTERVAL,
        DEFAULT_MARKET_LIST_SIZE, DEFAULT_REFERENCE_ASSET, DEFAULT_SENTIMENT_LIMIT,
        FEAR_GREED_API_URL, MAX_MARKET_LIST_SIZE, REFRESH_INTERVAL_SECS, REQUEST_TIMEOUT_SECS,
    },
    error::ConfigError,
};
use reqwest::Url;
use std::str::FromStr;
use std::time::Duration;

/// How the trend forecast measures change over its window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ForecastMethod {
    /// Mean of the second half of the window against the mean of the first half
    #[default]
    HalfWindowMean,
    /// Last sample of the window against its first sample
    Endpoints,
}

impl FromStr for ForecastMethod {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "half_window_mean" | "mean" => Ok(Self::HalfWindowMean),
            "endpoints" | "simple" => Ok(Self::Endpoints),
            other => Err(ConfigError::invalid_value("MARKET_FORECAST_METHOD", other)),
        }
    }
}

/// Configuration for MarketDataTracker
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Age after which a read triggers an opportunistic refresh
    pub cache_ttl: Duration,
    /// Period of the background refresh task
    pub refresh_interval: Duration,
    /// Timeout applied to each upstream call independently
    pub request_timeout: Duration,
    pub coingecko_base_url: String,
    pub fear_greed_base_url: String,
    /// Optional CoinGecko key, appended to every market-data request
    pub coingecko_api_key: Option<String>,
    /// Assets requested from the market list endpoint (1..=250)
    pub market_list_size: usize,
    /// CoinGecko id of the asset whose history feeds the forecast
    pub reference_asset: String,
    pub history_days: u32,
    pub history_interval: String,
    /// Fear & Greed samples to request
    pub sentiment_limit: usize,
    pub forecast_method: ForecastMethod,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(CACHE_TTL_SECS),
            refresh_interval: Duration::from_secs(REFRESH_INTERVAL_SECS),
            request_timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
            coingecko_base_url: COINGECKO_API_URL.to_string(),
            fear_greed_base_url: FEAR_GREED_API_URL.to_string(),
            coingecko_api_key: None,
            market_list_size: DEFAULT_MARKET_LIST_SIZE,
            reference_asset: DEFAULT_REFERENCE_ASSET.to_string(),
            history_days: DEFAULT_HISTORY_DAYS,
            history_interval: DEFAULT_HISTORY_INTERVAL.to_string(),
            sentiment_limit: DEFAULT_SENTIMENT_LIMIT,
            forecast_method: ForecastMethod::default(),
        }
    }
}

impl TrackerConfig {
    /// Builds the configuration from process environment variables
    ///
    /// Unset variables keep their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(secs) = parse_var::<u64, _>(&lookup, "MARKET_CACHE_TTL_SECS")? {
            config.cache_ttl = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var::<u64, _>(&lookup, "MARKET_REFRESH_INTERVAL_SECS")? {
            config.refresh_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var::<u64, _>(&lookup, "MARKET_REQUEST_TIMEOUT_SECS")? {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(url) = lookup("COINGECKO_API_URL") {
            config.coingecko_base_url = url;
        }
        if let Some(url) = lookup("FEAR_GREED_API_URL") {
            config.fear_greed_base_url = url;
        }
        config.coingecko_api_key = lookup("COINGECKO_API_KEY").filter(|key| !key.is_empty());
        if let Some(size) = parse_var::<usize, _>(&lookup, "MARKET_LIST_SIZE")? {
            config.market_list_size = size.clamp(1, MAX_MARKET_LIST_SIZE);
        }
        if let Some(asset) = lookup("MARKET_REFERENCE_ASSET") {
            config.reference_asset = asset;
        }
        if let Some(limit) = parse_var::<usize, _>(&lookup, "FEAR_GREED_LIMIT")? {
            config.sentiment_limit = limit;
        }
        if let Some(method) = parse_var::<ForecastMethod, _>(&lookup, "MARKET_FORECAST_METHOD")? {
            config.forecast_method = method;
        }

        config.validate()?;
        Ok(config)
    }

    /// Checks that base URLs parse and durations are usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("COINGECKO_API_URL", &self.coingecko_base_url),
            ("FEAR_GREED_API_URL", &self.fear_greed_base_url),
        ] {
            let url =
                Url::parse(value).map_err(|_| ConfigError::invalid_url(name, value.as_str()))?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(ConfigError::invalid_url(name, value.as_str()));
            }
        }

        for (name, value) in [
            ("MARKET_CACHE_TTL_SECS", self.cache_ttl),
            ("MARKET_REFRESH_INTERVAL_SECS", self.refresh_interval),
            ("MARKET_REQUEST_TIMEOUT_SECS", self.request_timeout),
        ] {
            if value.is_zero() {
                return Err(ConfigError::invalid_value(name, "0"));
            }
        }

        // A cycle may last up to one request timeout; the TTL must outlive it
        // or the next read would start another cycle straight away.
        if self.cache_ttl <= self.request_timeout {
            return Err(ConfigError::invalid_value(
                "MARKET_CACHE_TTL_SECS",
                format!(
                    "{} (must exceed request timeout of {}s)",
                    self.cache_ttl.as_secs(),
                    self.request_timeout.as_secs()
                ),
            ));
        }

        if self.reference_asset.trim().is_empty() {
            return Err(ConfigError::invalid_value("MARKET_REFERENCE_ASSET", ""));
        }

        Ok(())
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::invalid_value(key, raw)),
    }
}
