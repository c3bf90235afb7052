//! Error types for reward signals

use thiserror::Error;

use crate::buffer::BufferKey;

/// Core error type for reward signal operations
#[derive(Error, Debug)]
pub enum SignalError {
    /// A required hyperparameter is missing from a signal's configuration
    #[error("The hyper-parameter {key} could not be found for {signal}.")]
    Config {
        /// The first missing key
        key: String,
        /// Type name of the signal being configured
        signal: String,
    },

    /// A hyperparameter is present but outside its valid range
    #[error("Invalid parameter {name} = {value}: {reason}")]
    InvalidParameter {
        /// Parameter name
        name: &'static str,
        /// Offending value
        value: f64,
        /// Accepted range
        reason: &'static str,
    },

    /// No signal is registered under the requested name
    #[error("Unknown reward signal type {0}")]
    UnknownSignal(String),

    /// Dimension mismatch
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// A buffer field needed by the signal has not been collected
    #[error("Buffer field {0} is missing")]
    MissingField(BufferKey),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Other errors
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl SignalError {
    /// Build a configuration error for a missing key
    pub fn missing_key(key: impl Into<String>, signal: impl Into<String>) -> Self {
        Self::Config {
            key: key.into(),
            signal: signal.into(),
        }
    }
}

/// Result type alias for reward signal operations
pub type Result<T> = std::result::Result<T, SignalError>;
