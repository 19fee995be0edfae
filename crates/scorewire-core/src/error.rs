use thiserror::Error;

/// Validation and contract errors exposed by `scorewire-core`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("timestamp must be RFC3339 UTC (suffix Z): '{value}'")]
    TimestampNotUtc { value: String },

    #[error("dataset key cannot be empty")]
    EmptyDatasetKey,
    #[error("dataset '{key}' is registered more than once")]
    DuplicateDataset { key: String },
    #[error("dataset '{key}' has no sources")]
    NoSources { key: String },
    #[error("source name cannot be empty")]
    EmptySourceName,

    #[error(
        "invalid selection strategy '{value}', expected one of first, freshest, fastest, most_complete"
    )]
    InvalidStrategy { value: String },
}

/// Errors raised while reading process configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be a non-negative integer, got '{value}'")]
    InvalidNumber { var: &'static str, value: String },

    #[error("{var} must be at least 1")]
    ZeroNotAllowed { var: &'static str },

    #[error("jitter range is inverted: min {min_ms}ms > max {max_ms}ms")]
    InvertedJitter { min_ms: u64, max_ms: u64 },
}
