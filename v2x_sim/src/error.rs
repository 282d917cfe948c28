//! Error types for synthetic datasets and the CLI.

use thiserror::Error;
use v2x_core::CoreError;
use v2x_env::ProviderError;

#[derive(Debug, Error)]
pub enum SimError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Invalid noise standard deviation: {0}")]
    InvalidNoise(f64),

    #[error("Unknown scenario: {0}")]
    UnknownScenario(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Config parse error in {path}: {source}")]
    Toml {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SimError>;
