use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use std::sync::LazyLock;

use animelog_core::types::{EpisodeNumber, RawRecord};

use crate::ParseError;
use crate::feed::FeedEntry;

/// Season/episode pair extracted from an episode title.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpisodeInfo {
    pub episode: EpisodeNumber,
    pub season: Option<u32>,
}

/// Status text shown on fully watched cards.
const WATCHED_LABEL: &str = "Watched";

// "S2 E05", "s1e3", "S1 E15.5"
static RE_SEASON_EPISODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)S(\d+)\s*E(\d+(?:\.\d+)?)").unwrap());

// "E15.5"
static RE_EPISODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)E(\d+(?:\.\d+)?)").unwrap());

// "Episode 15.5"
static RE_EPISODE_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Episode\s+(\d+(?:\.\d+)?)").unwrap());

static DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%b %d, %Y", "%B %d, %Y"];

/// Extract season and episode numbers from a free-text episode title.
///
/// Titles without any recognizable pattern are treated as movies.
pub fn parse_episode_info(title: &str) -> EpisodeInfo {
    if let Some(caps) = RE_SEASON_EPISODE.captures(title) {
        if let (Ok(season), Ok(episode)) = (caps[1].parse::<u32>(), caps[2].parse::<f64>()) {
            return EpisodeInfo {
                episode: EpisodeNumber(episode),
                season: Some(season),
            };
        }
    }

    for re in [&RE_EPISODE, &RE_EPISODE_WORD] {
        if let Some(caps) = re.captures(title) {
            if let Ok(episode) = caps[1].parse::<f64>() {
                return EpisodeInfo {
                    episode: EpisodeNumber(episode),
                    season: None,
                };
            }
        }
    }

    EpisodeInfo {
        episode: EpisodeNumber::MOVIE,
        season: None,
    }
}

/// Parse the footer date of a card. Returns `None` for unrecognized text.
pub fn parse_observed_at(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

/// Turn one feed card into a raw record.
///
/// `now` stands in for the observation time when the card carries no
/// readable date.
pub fn parse_entry(entry: &FeedEntry, now: DateTime<Utc>) -> Result<RawRecord, ParseError> {
    let episode_text = non_empty(entry.episode_title.as_deref()).unwrap_or("");

    // Single-episode shows are collapsed into a card with only the episode line.
    let series_title = non_empty(entry.series_title.as_deref())
        .unwrap_or(episode_text)
        .to_string();
    if series_title.is_empty() {
        return Err(ParseError::MissingSeriesTitle);
    }

    let info = parse_episode_info(episode_text);
    let is_movie = info.episode.is_movie();

    let status_text = non_empty(entry.status_text.as_deref());
    let is_watched = status_text == Some(WATCHED_LABEL);
    let time_left = if is_watched {
        None
    } else {
        status_text.map(str::to_string)
    };

    let observed_at = non_empty(entry.footer_date.as_deref())
        .and_then(parse_observed_at)
        .unwrap_or(now);

    let episode_title = if is_movie {
        series_title.clone()
    } else {
        episode_text.to_string()
    };

    Ok(RawRecord {
        series_title,
        episode_title,
        episode_number: info.episode,
        season: info.season,
        is_watched,
        time_left,
        observed_at,
        series_href: non_empty(entry.series_href.as_deref()).map(str::to_string),
        episode_href: non_empty(entry.episode_href.as_deref()).map(str::to_string),
    })
}
