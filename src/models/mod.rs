// src/models/mod.rs

//! Domain models for the watcher.

mod config;
mod movie;
mod selectors;

// Re-export all public types
pub use config::{Config, HttpConfig, LoggingConfig, NotifierConfig, StorageConfig, WebhookConfig};
pub use movie::{Movie, Movies};
pub use selectors::ListingSelectors;
