//! Market data provider implementations

pub mod coingecko;
pub mod fear_greed;
pub mod public;

pub use coingecko::CoinGeckoEndpoints;
pub use fear_greed::FearGreedEndpoint;
pub use public::PublicApiProvider;
