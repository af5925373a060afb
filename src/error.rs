//! Error types
//!
//! Nothing in the preloader is fatal. These types exist so backends and
//! stores can use `?` internally; the mixer, synth and gate log them and
//! carry on.

use thiserror::Error;

/// Failures from the audio graph
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AudioError {
    /// The runtime refused to create an audio context
    #[error("audio context unavailable: {0}")]
    ContextUnavailable(String),

    /// A node (oscillator, gain, filter, buffer) could not be created or connected
    #[error("failed to create audio node: {0}")]
    NodeCreation(String),

    /// Parameter automation or source start/stop was rejected
    #[error("failed to schedule audio event: {0}")]
    Scheduling(String),

    /// Operation needs an initialized graph
    #[error("audio graph not initialized")]
    NotInitialized,
}

/// Failures from the persisted key-value store
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// No storage available in this environment
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("failed to read '{key}': {reason}")]
    Read { key: String, reason: String },

    #[error("failed to write '{key}': {reason}")]
    Write { key: String, reason: String },
}

/// Crate-level error
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Audio(#[from] AudioError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// A cue name that isn't in the catalog
    #[error("unknown cue '{0}'")]
    UnknownCue(String),

    /// Settings JSON could not be parsed
    #[error("invalid settings: {0}")]
    InvalidSettings(#[from] serde_json::Error),

    /// Settings parsed but failed validation
    #[error("invalid settings: {0}")]
    InvalidValue(String),
}

impl Error {
    pub fn invalid_value(reason: impl Into<String>) -> Self {
        Error::InvalidValue(reason.into())
    }
}

/// Result alias using the crate error
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(target_arch = "wasm32")]
pub(crate) fn js_reason(value: &wasm_bindgen::JsValue) -> String {
    value
        .as_string()
        .unwrap_or_else(|| format!("{:?}", value))
}
