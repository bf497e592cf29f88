// src/error.rs

//! Unified error handling for the watcher.

use std::fmt;
use std::path::Path;

use thiserror::Error;

/// Result type alias for watcher operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// CSS selector parsing failed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Scheduler setup or shutdown failed
    #[error("Scheduler error: {0}")]
    Schedule(String),

    /// One source page could not be fetched or parsed
    #[error("Fetch error for {url}: {message}")]
    Fetch { url: String, message: String },

    /// A link or image reference could not be resolved to an absolute URL
    #[error("Malformed reference '{reference}': {message}")]
    MalformedReference { reference: String, message: String },

    /// History file exists but could not be read or parsed
    #[error("Failed to load history from {path}: {message}")]
    HistoryLoad { path: String, message: String },

    /// History file could not be written
    #[error("Failed to save history to {path}: {message}")]
    HistorySave { path: String, message: String },

    /// A notification channel failed to deliver
    #[error("Notifier {channel} failed: {message}")]
    Notify { channel: String, message: String },
}

impl AppError {
    /// Create a selector parsing error.
    pub fn selector(selector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a scheduler error.
    pub fn schedule(message: impl fmt::Display) -> Self {
        Self::Schedule(message.to_string())
    }

    /// Create a fetch error for a source URL.
    pub fn fetch(url: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Fetch {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// Create a malformed reference error.
    pub fn malformed_reference(reference: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::MalformedReference {
            reference: reference.into(),
            message: message.to_string(),
        }
    }

    /// Create a history load error.
    pub fn history_load(path: &Path, message: impl fmt::Display) -> Self {
        Self::HistoryLoad {
            path: path.display().to_string(),
            message: message.to_string(),
        }
    }

    /// Create a history save error.
    pub fn history_save(path: &Path, message: impl fmt::Display) -> Self {
        Self::HistorySave {
            path: path.display().to_string(),
            message: message.to_string(),
        }
    }

    /// Create a notifier error.
    pub fn notify(channel: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Notify {
            channel: channel.into(),
            message: message.to_string(),
        }
    }

    /// Whether this error means the history was not persisted.
    ///
    /// These are the only failures that change a run's success signal; the
    /// next run may notify the same titles again.
    pub fn is_persistence_failure(&self) -> bool {
        matches!(self, Self::HistorySave { .. })
    }
}
