//! Constants for the market analytics tracker
//!
//! Compile-time defaults for every tunable. Values that operators may need to
//! change without a rebuild (TTL, intervals, upstream URLs) can be overridden
//! at runtime through [`TrackerConfig::from_env`](crate::config::TrackerConfig::from_env).

/// How long a snapshot is considered fresh before a read triggers a refresh (in seconds)
pub const CACHE_TTL_SECS: u64 = 30;

/// How often the background task refreshes every category (in seconds)
pub const REFRESH_INTERVAL_SECS: u64 = 30;

/// Per-call timeout for a single upstream request (in seconds)
pub const REQUEST_TIMEOUT_SECS: u64 = 8;

/// CoinGecko API base URL
pub const COINGECKO_API_URL: &str = "https://api.coingecko.com/api/v3";

/// CoinGecko global statistics endpoint
pub const COINGECKO_GLOBAL_ENDPOINT: &str = "/global";

/// CoinGecko market list endpoint
pub const COINGECKO_MARKETS_ENDPOINT: &str = "/coins/markets";

/// Query parameter used to pass a CoinGecko demo API key
pub const COINGECKO_API_KEY_PARAM: &str = "x_cg_demo_api_key";

/// Alternative.me API base URL (Fear & Greed index)
pub const FEAR_GREED_API_URL: &str = "https://api.alternative.me";

/// Fear & Greed index endpoint
pub const FEAR_GREED_ENDPOINT: &str = "/fng/";

/// Number of assets requested from the market list endpoint
pub const DEFAULT_MARKET_LIST_SIZE: usize = 100;

/// Upstream hard limit on `per_page`
pub const MAX_MARKET_LIST_SIZE: usize = 250;

/// Asset whose price history drives the trend forecast
pub const DEFAULT_REFERENCE_ASSET: &str = "bitcoin";

/// Days of reference price history to request
pub const DEFAULT_HISTORY_DAYS: u32 = 2;

/// Sampling interval of the reference price history
pub const DEFAULT_HISTORY_INTERVAL: &str = "hourly";

/// Number of Fear & Greed samples to retain
pub const DEFAULT_SENTIMENT_LIMIT: usize = 30;

/// Entries in each of the gainers and losers lists
pub const MOVERS_COUNT: usize = 10;

/// Entries surfaced by the overview's top list
pub const OVERVIEW_TOP_COUNT: usize = 5;

/// Heatmap size when the caller does not supply one
pub const DEFAULT_HEATMAP_LIMIT: usize = 50;

/// Heatmap size ceiling, regardless of the requested limit
pub const MAX_HEATMAP_LIMIT: usize = 100;

/// Trailing samples considered by the trend forecast
pub const FORECAST_WINDOW: usize = 24;

/// Percentage change above which the trend is bullish (and below its negation, bearish)
pub const FORECAST_TREND_THRESHOLD_PCT: f64 = 0.5;

/// Confidence points gained per percent of absolute change
pub const FORECAST_CONFIDENCE_PER_PCT: f64 = 20.0;

/// Confidence ceiling
pub const FORECAST_MAX_CONFIDENCE: f64 = 95.0;

/// Capacity of the event broadcast channel
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

/// User agent for HTTP requests
pub const USER_AGENT: &str = "market-analytics-sdk/0.1.0";
