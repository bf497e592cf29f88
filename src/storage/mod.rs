//! Storage abstractions for the movie history.
//!
//! The history is the set of every movie ever notified, keyed by title. It is
//! the only state that survives between runs.
//!
//! ## File Layout
//!
//! ```text
//! {data_dir}/
//! ├── history.json          # { "<title>": { title, year, link, coverImage, timestamp } }
//! └── history.json.tmp      # Write-in-progress, renamed over history.json
//! ```

pub mod local;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::Movies;

// Re-export for convenience
pub use local::LocalHistoryStore;

/// Trait for history storage backends.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Read the stored history.
    ///
    /// A missing history is `Ok` and empty. An unreadable or unparseable one
    /// is an `AppError::HistoryLoad`.
    async fn read(&self) -> Result<Movies>;

    /// Replace the stored history with `history`.
    ///
    /// Failures are `AppError::HistorySave`.
    async fn save(&self, history: &Movies) -> Result<()>;

    /// Human-readable location of the history, for logs.
    fn location(&self) -> String;

    /// Load the history, degrading to empty when it cannot be read.
    ///
    /// A corrupt file must not wedge every future run, so the error is logged
    /// and all scraped titles are treated as new.
    async fn load(&self) -> Movies {
        match self.read().await {
            Ok(history) => history,
            Err(error) => {
                log::warn!("{}; continuing with empty history", error);
                Movies::new()
            }
        }
    }
}

/// Merge a diff into the history.
///
/// Every entry of both is kept; `diff` wins when a title is in both.
pub fn merge_history(diff: &Movies, history: &Movies) -> Movies {
    let mut merged = history.clone();
    merged.extend(diff.iter().map(|(title, movie)| (title.clone(), movie.clone())));
    merged
}
