//! Error types for kindlekeep operations.
//!
//! This module defines the main error type [`KindleKeepError`] which represents
//! everything that can go wrong while talking to the bookmarking API, embedding
//! images, deriving documents and delivering them.
//!
//! # Example
//!
//! ```rust
//! use kindlekeep_core::{KindleKeepError, Result};
//!
//! fn require_key(key: &str) -> Result<&str> {
//!     if key.is_empty() {
//!         return Err(KindleKeepError::ConfigError("api_key is empty".to_string()));
//!     }
//!     Ok(key)
//! }
//! # assert!(require_key("").is_err());
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for kindlekeep operations.
#[derive(Error, Debug)]
pub enum KindleKeepError {
    /// HTTP request errors from reqwest.
    ///
    /// Wraps network errors, DNS failures, connection issues and body decode
    /// problems.
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Request timeout.
    #[error("Request timed out after {timeout} seconds")]
    Timeout { timeout: u64 },

    /// Invalid URL provided.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The bookmarking API answered with a non-success status.
    #[error("API request to {endpoint} failed with status {status}")]
    ApiStatus { endpoint: String, status: u16 },

    /// JSON encoding or decoding failed.
    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    /// HTML rewriting failed.
    #[error("Failed to rewrite HTML: {0}")]
    HtmlRewriteError(String),

    /// A fetched image exceeded the configured byte ceiling.
    #[error("Image too large ({size} bytes, limit {limit})")]
    ImageTooLarge { size: usize, limit: usize },

    /// File not found.
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// File read/write errors.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Configuration errors.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// No configuration existed, so a default one was written.
    ///
    /// The caller should ask the user to edit it and run again.
    #[error("Created default config file {0}; edit it with your settings and run again")]
    ConfigCreated(PathBuf),

    /// PDF derivation failed.
    #[error("PDF conversion failed: {0}")]
    PdfError(String),

    /// EPUB derivation failed.
    #[error("EPUB conversion failed: {0}")]
    EpubError(String),

    /// MOBI derivation failed (all external tools).
    #[error("MOBI conversion failed: {0}")]
    MobiError(String),

    /// The requested format was compiled out.
    #[error("Output format {0} is not available in this build")]
    FormatUnavailable(&'static str),

    /// Building or sending the email failed.
    #[error("Mail delivery failed: {0}")]
    MailError(String),
}

/// Result type alias for KindleKeepError.
pub type Result<T> = std::result::Result<T, KindleKeepError>;
