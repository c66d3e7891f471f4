//! Queueing engine error types.

use std::path::PathBuf;

use thiserror::Error;

/// Invalid engine configuration. Raised only while building a config or
/// service, never in the middle of an update.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("smoothing factor alpha must be in (0, 1], got {0}")]
    Alpha(f64),

    #[error("capacity floor epsilon must be finite and > 0, got {0}")]
    Epsilon(f64),

    #[error(
        "thresholds must satisfy 0 <= relax ({relax}) < low ({low}) < high ({high}) <= 1"
    )]
    Thresholds { relax: f64, low: f64, high: f64 },

    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Errors surfaced by the protection service.
#[derive(Debug, Error)]
pub enum QueueingError {
    #[error("invalid observation: {0}")]
    Validation(String),

    #[error("unit not tracked: {0}")]
    NotFound(String),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("feature store error: {0}")]
    Store(#[from] utc_state::StateError),
}

pub type QueueingResult<T> = Result<T, QueueingError>;
