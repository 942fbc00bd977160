use animelog_core::types::{Show, WatchStatus};
use serde::Serialize;

/// Size of a collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CollectionTotals {
    pub series: usize,
    pub episodes: usize,
}

impl CollectionTotals {
    pub fn of(shows: &[Show]) -> Self {
        Self {
            series: shows.len(),
            episodes: shows.iter().map(Show::episode_count).sum(),
        }
    }
}

/// A collection split by how it was watched.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Categorized<'a> {
    pub normal: Vec<&'a Show>,
    /// Shows where every recorded episode was only sampled.
    pub short_watched: Vec<&'a Show>,
}

/// Split `shows` into normally watched series and short-watched-only ones.
///
/// A show with no recorded episodes is never short-watched-only; it is
/// filed under `normal`.
pub fn categorize(shows: &[Show]) -> Categorized<'_> {
    let mut out = Categorized::default();
    for show in shows {
        if is_short_watched_only(show) {
            out.short_watched.push(show);
        } else {
            out.normal.push(show);
        }
    }
    out
}

fn is_short_watched_only(show: &Show) -> bool {
    let mut episodes = show.episodes().peekable();
    episodes.peek().is_some() && episodes.all(|e| e.status == WatchStatus::ShortWatched)
}
