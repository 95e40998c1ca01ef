// src/error.rs

//! Unified error handling for the watcher.

use std::fmt;

use thiserror::Error;

/// Result type alias for watcher operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// AWS S3 error
    #[error("S3 error: {0}")]
    S3(String),

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// A listing page could not be fetched
    #[error("Listing failed for {bucket}: {message}")]
    Listing { bucket: String, message: String },

    /// A persisted snapshot exists but cannot be decoded
    #[error("Corrupt snapshot {key}: {message}")]
    CorruptSnapshot { key: String, message: String },

    /// The webhook answered with a non-success status
    #[error("Webhook {url} responded with status {status}")]
    Webhook { status: u16, url: String },
}

impl AppError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a listing error for a bucket.
    pub fn listing(bucket: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Listing {
            bucket: bucket.into(),
            message: message.to_string(),
        }
    }

    /// Create a corrupt snapshot error for a persistence key.
    pub fn corrupt_snapshot(key: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::CorruptSnapshot {
            key: key.into(),
            message: message.to_string(),
        }
    }
}
