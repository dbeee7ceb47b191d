// Error types shared by configuration loading, the rule-engine seam and the search

use thiserror::Error;

/// Errors raised while loading configuration or evaluator coefficients
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Missing evaluator coefficient '{0}'")]
    MissingCoefficient(&'static str),

    #[error("Invalid value for evaluator coefficient '{key}': {value}")]
    InvalidCoefficient { key: &'static str, value: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Raised by the rule engine when an action cannot be applied to a position
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Invalid action: {0}")]
pub struct InvalidActionError(pub String);

/// Errors that fail a whole decision
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Search task panicked: {0}")]
    TaskPanicked(String),

    #[error("Failed to build search thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
