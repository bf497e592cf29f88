//! Movie data structure.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Movies keyed by title.
///
/// Used for a scrape batch, the persisted history and the diff between them.
/// A title appears at most once; inserting an existing title replaces it.
pub type Movies = BTreeMap<String, Movie>;

/// A movie observed on a listing page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Movie {
    /// Movie title, the identity of the record
    #[serde(default)]
    pub title: String,

    /// Release year as shown on the listing
    #[serde(default)]
    pub year: String,

    /// Absolute URL of the movie page (empty if unresolvable)
    #[serde(default)]
    pub link: String,

    /// Absolute URL of the cover image (empty if unresolvable)
    #[serde(default)]
    pub cover_image: String,

    /// When the movie was observed
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl Movie {
    pub fn new(
        title: impl Into<String>,
        year: impl Into<String>,
        link: impl Into<String>,
        cover_image: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            title: title.into(),
            year: year.into(),
            link: link.into(),
            cover_image: cover_image.into(),
            timestamp,
        }
    }

    /// Format movie for display using a template.
    ///
    /// Supported placeholders:
    /// - `{title}`, `{year}`, `{link}`, `{cover_image}`, `{timestamp}`
    pub fn format(&self, template: &str) -> String {
        template
            .replace("{title}", &self.title)
            .replace("{year}", &self.year)
            .replace("{link}", &self.link)
            .replace("{cover_image}", &self.cover_image)
            .replace("{timestamp}", &self.timestamp.to_rfc3339())
    }
}
