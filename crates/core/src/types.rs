use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Watch state of a single episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WatchStatus {
    Watched,
    Started,
    ShortWatched,
    Unwatched,
}

impl WatchStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Watched => "watched",
            Self::Started => "started",
            Self::ShortWatched => "short-watched",
            Self::Unwatched => "unwatched",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "watched" => Some(Self::Watched),
            "started" => Some(Self::Started),
            "short-watched" => Some(Self::ShortWatched),
            "unwatched" => Some(Self::Unwatched),
            _ => None,
        }
    }
}

impl std::fmt::Display for WatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Episode number. Fractional values mark half-episodes and specials;
/// [`EpisodeNumber::MOVIE`] marks an entry without an episode number.
///
/// Ordering and equality use the IEEE total order so the number can key
/// ordered maps.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EpisodeNumber(pub f64);

impl EpisodeNumber {
    pub const MOVIE: EpisodeNumber = EpisodeNumber(-1.0);

    pub fn value(self) -> f64 {
        self.0
    }

    pub fn is_movie(self) -> bool {
        self == Self::MOVIE
    }
}

impl PartialEq for EpisodeNumber {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for EpisodeNumber {}

impl PartialOrd for EpisodeNumber {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EpisodeNumber {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl From<f64> for EpisodeNumber {
    fn from(v: f64) -> Self {
        Self(v)
    }
}

impl std::fmt::Display for EpisodeNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One normalized feed entry. Lives only for the duration of a scan pass.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub series_title: String,
    pub episode_title: String,
    pub episode_number: EpisodeNumber,
    /// `None` (or an explicit season 0) files the record under season 1.
    pub season: Option<u32>,
    pub is_watched: bool,
    pub time_left: Option<String>,
    pub observed_at: DateTime<Utc>,
    pub series_href: Option<String>,
    pub episode_href: Option<String>,
}

impl RawRecord {
    pub fn is_movie(&self) -> bool {
        self.episode_number.is_movie()
    }

    pub fn season_number(&self) -> u32 {
        match self.season {
            Some(0) | None => 1,
            Some(n) => n,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Episode {
    pub number: EpisodeNumber,
    pub status: WatchStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_watched: Option<DateTime<Utc>>,
    /// Minutes remaining when the entry was observed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Season {
    pub number: u32,
    pub episodes: Vec<Episode>,
}

impl Season {
    pub fn episode(&self, number: EpisodeNumber) -> Option<&Episode> {
        self.episodes.iter().find(|e| e.number == number)
    }

    pub fn episode_mut(&mut self, number: EpisodeNumber) -> Option<&mut Episode> {
        self.episodes.iter_mut().find(|e| e.number == number)
    }

    pub fn sort_episodes(&mut self) {
        self.episodes.sort_by_key(|e| e.number);
    }
}

/// A series (or movie) in the persisted collection, keyed by title.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Show {
    pub title: String,
    pub seasons: Vec<Season>,
    pub last_updated: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
}

impl Show {
    pub fn season(&self, number: u32) -> Option<&Season> {
        self.seasons.iter().find(|s| s.number == number)
    }

    pub fn season_mut(&mut self, number: u32) -> Option<&mut Season> {
        self.seasons.iter_mut().find(|s| s.number == number)
    }

    pub fn episode_count(&self) -> usize {
        self.seasons.iter().map(|s| s.episodes.len()).sum()
    }

    pub fn episodes(&self) -> impl Iterator<Item = &Episode> {
        self.seasons.iter().flat_map(|s| s.episodes.iter())
    }
}
