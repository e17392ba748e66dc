//! Error types for the market analytics tracker

use crate::types::Category;
use thiserror::Error;

/// Errors that can occur when fetching a category from an upstream API
#[derive(Debug, Error)]
pub enum FetchError {
    /// Connection-level failure
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The per-call timeout elapsed before a response arrived
    #[error("Request timeout")]
    Timeout,

    /// Upstream answered with a non-2xx status
    #[error("Upstream returned HTTP {0}")]
    HttpStatus(u16),

    /// Body is not JSON, or lacks the minimally expected shape
    #[error("Malformed response: {0}")]
    Malformed(String),
}

impl FetchError {
    /// Creates a Malformed error
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::Malformed(msg.into())
    }

    /// Short label for logs and events
    pub fn class(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport",
            Self::Timeout => "timeout",
            Self::HttpStatus(_) => "http_status",
            Self::Malformed(_) => "malformed",
        }
    }

    /// True if upstream rejected the call for rate limiting
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::HttpStatus(429))
    }
}

/// Errors surfaced by the view builder
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ViewError {
    /// The category has never been fetched successfully since start-up
    #[error("{category} data not yet available")]
    CategoryUnavailable { category: Category },
}

impl ViewError {
    /// Creates a CategoryUnavailable error
    pub fn unavailable(category: Category) -> Self {
        Self::CategoryUnavailable { category }
    }
}

/// Errors raised while building the tracker configuration
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// An upstream base URL could not be parsed
    #[error("Invalid URL for {name}: {value}")]
    InvalidUrl { name: String, value: String },

    /// A tunable could not be parsed or is out of range
    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: String, value: String },
}

impl ConfigError {
    pub fn invalid_url(name: &str, value: impl Into<String>) -> Self {
        Self::InvalidUrl {
            name: name.to_string(),
            value: value.into(),
        }
    }

    pub fn invalid_value(name: &str, value: impl Into<String>) -> Self {
        Self::InvalidValue {
            name: name.to_string(),
            value: value.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_class() {
        assert_eq!(FetchError::Timeout.class(), "timeout");
        assert_eq!(FetchError::HttpStatus(503).class(), "http_status");
        assert_eq!(FetchError::malformed("x").class(), "malformed");
        assert!(FetchError::HttpStatus(429).is_rate_limited());
        assert!(!FetchError::HttpStatus(500).is_rate_limited());
    }

    #[test]
    fn test_view_error_message() {
        let err = ViewError::unavailable(Category::GlobalStats);
        assert_eq!(err.to_string(), "global_stats data not yet available");
    }
}
