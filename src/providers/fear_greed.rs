//! Alternative.me Fear & Greed index endpoint

use crate::{
    config::TrackerConfig, constants::FEAR_GREED_ENDPOINT, error::FetchError,
    types::SentimentSample,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
struct FearGreedResponse {
    data: Vec<FearGreedEntry>,
}

/// Upstream sends numbers as strings; accept either
#[derive(Debug, Deserialize)]
struct FearGreedEntry {
    value: Value,
    value_classification: String,
    #[serde(default)]
    timestamp: Value,
}

/// URL builder for the Fear & Greed API
#[derive(Debug, Clone)]
pub struct FearGreedEndpoint {
    base_url: String,
    limit: usize,
}

impl FearGreedEndpoint {
    pub fn new(config: &TrackerConfig) -> Self {
        Self {
            base_url: config.fear_greed_base_url.trim_end_matches('/').to_string(),
            limit: config.sentiment_limit.max(1),
        }
    }

    pub fn url(&self) -> String {
        format!("{}{}?limit={}", self.base_url, FEAR_GREED_ENDPOINT, self.limit)
    }
}

/// Decodes a `/fng/` body, most recent sample first
pub fn decode_fear_greed(body: Value) -> Result<Vec<SentimentSample>, FetchError> {
    let response: FearGreedResponse = serde_json::from_value(body)
        .map_err(|e| FetchError::malformed(format!("fear & greed: {}", e)))?;

    let mut samples = response
        .data
        .into_iter()
        .map(|entry| -> Result<SentimentSample, FetchError> {
            let value = as_u64(&entry.value)
                .and_then(|v| u32::try_from(v).ok())
                .ok_or_else(|| {
                    FetchError::malformed(format!("fear & greed: bad value {}", entry.value))
                })?;
            let timestamp = as_u64(&entry.timestamp)
                .and_then(|secs| DateTime::<Utc>::from_timestamp(secs as i64, 0));

            Ok(SentimentSample {
                value,
                classification: entry.value_classification,
                timestamp,
            })
        })
        .collect::<Result<Vec<_>, FetchError>>()?;

    if samples.is_empty() {
        return Err(FetchError::malformed("fear & greed: no samples"));
    }

    // Upstream sends most recent first; only re-sort when every entry is dated
    if samples.iter().all(|s| s.timestamp.is_some()) {
        samples.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    }
    Ok(samples)
}

fn as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_url() {
        let endpoint = FearGreedEndpoint::new(&TrackerConfig::default());
        assert_eq!(endpoint.url(), "https://api.alternative.me/fng/?limit=30");
    }

    #[test]
    fn test_decode_string_fields() {
        let body = json!({
            "name": "Fear and Greed Index",
            "data": [
                { "value": "40", "value_classification": "Fear", "timestamp": "1700000000" },
                { "value": "72", "value_classification": "Greed", "timestamp": "1700086400",
                  "time_until_update": "3600" }
            ],
            "metadata": { "error": null }
        });

        let samples = decode_fear_greed(body).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].value, 72);
        assert_eq!(samples[0].classification, "Greed");
        assert_eq!(samples[1].timestamp.unwrap().timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_undated_entry_keeps_upstream_order() {
        let body = json!({
            "data": [
                { "value": "80", "value_classification": "Extreme Greed", "timestamp": "" },
                { "value": "40", "value_classification": "Fear", "timestamp": "1700000000" }
            ]
        });

        let samples = decode_fear_greed(body).unwrap();
        assert_eq!(samples[0].value, 80);
        assert_eq!(samples[0].timestamp, None);
        assert_eq!(samples[1].value, 40);
    }

    #[test]
    fn test_decode_numeric_fields() {
        let body = json!({
            "data": [{ "value": 55, "value_classification": "Neutral", "timestamp": 1700000000 }]
        });
        let samples = decode_fear_greed(body).unwrap();
        assert_eq!(samples[0].value, 55);
    }

    #[test]
    fn test_decode_rejects_bad_shapes() {
        assert!(matches!(
            decode_fear_greed(json!({ "data": [] })),
            Err(FetchError::Malformed(_))
        ));
        assert!(matches!(
            decode_fear_greed(json!({ "data": [{ "value": "high", "value_classification": "?" }] })),
            Err(FetchError::Malformed(_))
        ));
        assert!(matches!(
            decode_fear_greed(json!({ "metadata": { "error": "down" } })),
            Err(FetchError::Malformed(_))
        ));
    }
}
