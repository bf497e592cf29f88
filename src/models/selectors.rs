// src/models/selectors.rs

//! CSS selectors for scraping a movie listing page.

use serde::{Deserialize, Serialize};

/// CSS selectors for scraping a movie listing page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingSelectors {
    /// Selector for the section holding the listing
    #[serde(default = "defaults::container")]
    pub container_selector: String,

    /// Selector for each movie card within the container
    #[serde(default = "defaults::item")]
    pub item_selector: String,

    /// Selector for the title element within a card
    #[serde(default = "defaults::title")]
    pub title_selector: String,

    /// Selector for the year element within a card
    #[serde(default = "defaults::year")]
    pub year_selector: String,

    /// Selector for the link element within a card
    #[serde(default = "defaults::link")]
    pub link_selector: String,

    /// HTML attribute holding the movie page href
    #[serde(default = "defaults::link_attr")]
    pub link_attr: String,

    /// Selector for the cover image within a card
    #[serde(default = "defaults::cover")]
    pub cover_selector: String,

    /// HTML attribute holding the cover image URL
    #[serde(default = "defaults::cover_attr")]
    pub cover_attr: String,
}

impl Default for ListingSelectors {
    fn default() -> Self {
        Self {
            container_selector: defaults::container(),
            item_selector: defaults::item(),
            title_selector: defaults::title(),
            year_selector: defaults::year(),
            link_selector: defaults::link(),
            link_attr: defaults::link_attr(),
            cover_selector: defaults::cover(),
            cover_attr: defaults::cover_attr(),
        }
    }
}

impl ListingSelectors {
    /// All selector strings with their field names, for validation.
    pub fn all(&self) -> [(&'static str, &str); 6] {
        [
            ("container_selector", &self.container_selector),
            ("item_selector", &self.item_selector),
            ("title_selector", &self.title_selector),
            ("year_selector", &self.year_selector),
            ("link_selector", &self.link_selector),
            ("cover_selector", &self.cover_selector),
        ]
    }
}

mod defaults {
    pub fn container() -> String {
        "#popular-downloads".into()
    }
    pub fn item() -> String {
        "div .browse-movie-wrap".into()
    }
    pub fn title() -> String {
        ".browse-movie-title".into()
    }
    pub fn year() -> String {
        ".browse-movie-year".into()
    }
    pub fn link() -> String {
        ".browse-movie-link".into()
    }
    pub fn link_attr() -> String {
        "href".into()
    }
    pub fn cover() -> String {
        "img".into()
    }
    pub fn cover_attr() -> String {
        "src".into()
    }
}
