// src/error.rs

//! Unified error handling for the inventory sync application.

use thiserror::Error;

/// Result type alias for sync operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing failed
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// HTTP request failed
    #[cfg(feature = "lambda")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization failed
    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Feed parsed to zero usable rows
    #[error("Feed contained no valid vehicle rows (columns: {})", columns.join(", "))]
    EmptyFeed { columns: Vec<String> },

    /// Storage backend error
    #[error("Store error: {0}")]
    Store(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Record lookup miss
    #[error("No vehicle found for VIN {vin}")]
    NotFound { vin: String },
}

impl AppError {
    /// Create a storage backend error.
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store(message.into())
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a lookup-miss error for a VIN.
    pub fn not_found(vin: impl Into<String>) -> Self {
        Self::NotFound { vin: vin.into() }
    }

    /// Create an empty-feed error carrying the headers that were seen.
    pub fn empty_feed(columns: Vec<String>) -> Self {
        Self::EmptyFeed { columns }
    }
}
