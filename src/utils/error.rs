//! Unified Error Handling System
//!
//! This module defines the crate-wide error type shared by the dispatch core,
//! the lighting backends and the binaries. Protocol-level failures that are
//! answered on the wire (malformed input, unknown commands) never surface as
//! errors from `run()`; they end up here only when setup or an SDK call fails.

use thiserror::Error;

/// Enumeration of all error types in the application
#[derive(Error, Debug)]
pub enum PluginError {
    /// Error reported by a vendor lighting SDK
    #[error("{vendor} SDK error: {message}")]
    Backend { vendor: String, message: String },

    /// The vendor SDK could not be reached (not installed, not running, no permission)
    #[error("{0} SDK is unavailable")]
    Unavailable(String),

    /// Invalid arguments error
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// System I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be parsed
    #[error("Configuration error: {0}")]
    Config(String),

    /// Logging could not be set up
    #[error("Logging error: {0}")]
    Logging(String),

    /// Resource not found error
    #[error("Resource not found: {0}")]
    NotFound(String),
}

impl From<toml::de::Error> for PluginError {
    fn from(error: toml::de::Error) -> Self {
        PluginError::Config(error.to_string())
    }
}

impl PluginError {
    /// Shorthand for a [`PluginError::Backend`] error.
    pub fn backend(vendor: &str, message: impl Into<String>) -> Self {
        PluginError::Backend {
            vendor: vendor.to_string(),
            message: message.into(),
        }
    }
}

/// Standardized result type for the entire application
pub type Result<T> = std::result::Result<T, PluginError>;
