//! Error types for excerpta operations.
//!
//! This module defines the main error type [`ExcerptaError`]. Absence of a
//! match is never an error in this crate: the resolver and the document
//! parser represent "nothing found" as `None`. Errors are reserved for
//! invalid inputs such as malformed selectors, unreadable configs, or a
//! config without the mandatory `content` field.
//!
//! # Example
//!
//! ```rust
//! use excerpta_core::{ExcerptaError, Result};
//!
//! fn require_content(content: Option<String>) -> Result<String> {
//!     content.ok_or(ExcerptaError::NoContent)
//! }
//! # assert!(require_content(None).is_err());
//! ```

use std::path::PathBuf;
use thiserror::Error;

#[cfg(feature = "xpath")]
use sxd_xpath::ExecutionError;

/// Main error type for extraction operations.
#[derive(Error, Debug)]
pub enum ExcerptaError {
    /// A CSS selector or XPath expression could not be compiled.
    ///
    /// The resolver catches this per query, logs it, and treats the query
    /// as a non-match so the fallback chain can continue.
    #[error("Invalid selector '{query}': {reason}")]
    InvalidSelector { query: String, reason: String },

    /// XPath evaluation errors.
    ///
    /// Returned when a compiled XPath expression fails at evaluation time
    /// (unknown function, bad argument types, ...).
    #[error("XPath error: {0}")]
    XPathError(String),

    /// HTML parsing or serialization errors.
    #[error("Failed to parse HTML: {0}")]
    HtmlParseError(String),

    /// Invalid URL provided.
    ///
    /// Returned when a base URL or page URL cannot be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Domain configuration errors.
    ///
    /// Returned when a config document is malformed or fails validation.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A domain configuration without the mandatory `content` field.
    #[error("Configuration for '{domain}' has no content selector")]
    MissingContent { domain: String },

    /// No content could be extracted from the document.
    ///
    /// Raised by article assembly when the `content` field resolved to nothing.
    #[error("No content could be extracted from the document")]
    NoContent,

    /// File not found.
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// I/O errors while reading configs or writing output.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization errors.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(feature = "xpath")]
impl From<ExecutionError> for ExcerptaError {
    fn from(err: ExecutionError) -> Self {
        ExcerptaError::XPathError(err.to_string())
    }
}

/// Result type alias for ExcerptaError.
pub type Result<T> = std::result::Result<T, ExcerptaError>;
