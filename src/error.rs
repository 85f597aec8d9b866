//! Error types for the gateway probe.
//!
//! Every failure on the wire collapses into [`ProbeError::Transport`]; the
//! remaining variants only come from loading configuration.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while probing the gateway.
#[derive(Error, Debug)]
pub enum ProbeError {
    /// The request could not be completed.
    ///
    /// Covers connection and DNS failures, timeouts, non-2xx statuses and
    /// response bodies that are not JSON. Callers treat these identically.
    #[error("error making request: {0}")]
    Transport(#[from] reqwest::Error),

    /// Failed to read the configuration file.
    #[error("failed to read config file '{path}': {source}")]
    ConfigFile {
        /// Path to the file that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid JSON for [`crate::ProbeConfig`].
    #[error("failed to parse config file '{path}': {source}")]
    ConfigParse {
        /// Path to the offending file.
        path: PathBuf,
        /// The underlying JSON parsing error.
        #[source]
        source: serde_json::Error,
    },

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ProbeError {
    /// Whether this error is the collapsed transport failure.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

/// Result type alias for probe operations.
pub type Result<T> = std::result::Result<T, ProbeError>;
