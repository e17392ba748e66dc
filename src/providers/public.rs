//! Provider backed by the public CoinGecko and Alternative.me APIs

use crate::{
    config::TrackerConfig,
    error::FetchError,
    provider::MarketDataProvider,
    providers::{
        coingecko::{self, CoinGeckoEndpoints},
        fear_greed::{self, FearGreedEndpoint},
    },
    types::{Category, CategoryPayload},
    upstream::UpstreamClient,
};
use async_trait::async_trait;

/// Routes each category to its upstream endpoint and decoder
pub struct PublicApiProvider {
    client: UpstreamClient,
    coingecko: CoinGeckoEndpoints,
    fear_greed: FearGreedEndpoint,
}

impl PublicApiProvider {
    /// Creates a new provider from the tracker configuration
    pub fn new(config: &TrackerConfig) -> Result<Self, FetchError> {
        Ok(Self {
            client: UpstreamClient::new(config.request_timeout)?,
            coingecko: CoinGeckoEndpoints::new(config),
            fear_greed: FearGreedEndpoint::new(config),
        })
    }

    /// The request URL for a category
    pub fn url_for(&self, category: Category) -> String {
        match category {
            Category::GlobalStats => self.coingecko.global_url(),
            Category::MarketList => self.coingecko.markets_url(),
            Category::ReferencePriceHistory => self.coingecko.market_chart_url(),
            Category::SentimentIndex => self.fear_greed.url(),
        }
    }
}

#[async_trait]
impl MarketDataProvider for PublicApiProvider {
    async fn fetch_category(&self, category: Category) -> Result<CategoryPayload, FetchError> {
        let body = self.client.fetch_json(&self.url_for(category)).await?;

        let payload = match category {
            Category::GlobalStats => CategoryPayload::GlobalStats(coingecko::decode_global(body)?),
            Category::MarketList => CategoryPayload::MarketList(coingecko::decode_markets(body)?),
            Category::ReferencePriceHistory => {
                CategoryPayload::ReferencePriceHistory(coingecko::decode_market_chart(body)?)
            }
            Category::SentimentIndex => {
                CategoryPayload::SentimentIndex(fear_greed::decode_fear_greed(body)?)
            }
        };

        Ok(payload)
    }

    fn provider_name(&self) -> &'static str {
        "coingecko+alternative.me"
    }
}
