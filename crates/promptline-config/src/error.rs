//! Errors raised while loading and validating a Promptline config.

use thiserror::Error;

/// Failure to produce a usable [`crate::PromptlineConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A config file exists but could not be read.
    #[error("failed to read config: {0}")]
    ReadFailed(#[from] std::io::Error),
    /// A config file is not valid JSON5.
    #[error("failed to parse config: {0}")]
    ParseFailed(#[from] json5::Error),
    /// The merged value did not decode into the config types.
    #[error("failed to decode config: {0}")]
    DecodeFailed(#[from] serde_json::Error),
    /// A layer has an unknown key or a value of the wrong type. `path` is
    /// prefixed with the layer name.
    #[error("invalid config at {path}: {message}")]
    InvalidField { path: String, message: String },
    /// `backend.base_url` is not an http(s) URL.
    #[error("invalid config at backend.base_url: expected an http or https URL, got {0:?}")]
    InvalidBaseUrl(String),
    /// A `selection` key used to read entity lists is empty.
    #[error("invalid config at selection.{0}: must not be empty")]
    EmptySelectionKey(&'static str),
}
