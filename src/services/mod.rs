//! Service layer for the watcher.
//!
//! - Listing scraping (`MovieScraper`)
//! - Listing parsing (`ListingParser`)

mod movies;

use std::time::Duration;

use async_trait::async_trait;

use crate::models::Movies;

pub use movies::{ListingParser, MovieScraper, RawListing, collect_batch};

/// Turns a list of source URLs into one batch of movies.
///
/// Implementations tolerate partial failure: an unreachable source is logged
/// and skipped, never surfaced as an error.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, urls: &[String], timeout: Duration) -> Movies;
}
