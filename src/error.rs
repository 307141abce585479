use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("local model is not ready")]
    ModelUnavailable,

    #[error("local model error: {0}")]
    Model(String),

    #[error("fallback detector error: {0}")]
    Fallback(String),

    #[error("fallback detector timed out after {0:?}")]
    FallbackTimeout(Duration),

    #[error("confidence {0} is outside [0, 1]")]
    InvalidConfidence(f32),

    #[error("unknown behavior label: {0:?}")]
    UnknownBehavior(String),

    #[error("out of order history entry: {got} ms is before {last} ms")]
    OutOfOrder { last: i64, got: i64 },

    #[error("session for subject {0:?} is closed")]
    SessionClosed(String),

    #[error("Io Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid setting {key}: {reason}")]
    InvalidSetting { key: &'static str, reason: String },

    #[error("Config Error: {0}")]
    Config(#[from] toml::de::Error),
}
