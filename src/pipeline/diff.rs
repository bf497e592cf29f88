//! Diff calculation for new-movie notifications.
//!
//! A movie is new when its title has never been stored in the history. Other
//! fields are ignored: a known title with a changed year, link or cover is
//! still not new.

use crate::models::Movies;

/// Movies in `batch` whose titles are absent from `history`.
pub fn diff_history(batch: &Movies, history: &Movies) -> Movies {
    batch
        .iter()
        .filter(|(title, _)| !history.contains_key(*title))
        .map(|(title, movie)| (title.clone(), movie.clone()))
        .collect()
}
