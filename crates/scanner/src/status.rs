use regex::Regex;
use std::sync::LazyLock;

use animelog_core::types::WatchStatus;

/// Remaining minutes above which an unfinished movie counts as dropped.
pub const MOVIE_THRESHOLD_MINUTES: u32 = 70;

/// Remaining minutes above which an unfinished episode counts as dropped.
pub const EPISODE_THRESHOLD_MINUTES: u32 = 20;

static RE_HOURS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+)h").unwrap());

static RE_MINUTES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+)m").unwrap());

/// Parse remaining-time text such as `1h5m`, `25m` or `2h` into minutes.
///
/// Text with neither an hour nor a minute token yields zero.
pub fn parse_duration_minutes(text: &str) -> u32 {
    let component = |re: &Regex| -> u32 {
        re.captures(text)
            .and_then(|c| c[1].parse::<u32>().ok())
            .unwrap_or(0)
    };
    component(&RE_HOURS)
        .saturating_mul(60)
        .saturating_add(component(&RE_MINUTES))
}

/// Map the watched flag and remaining-time text of one observation to a status.
pub fn resolve_status(is_watched: bool, time_left: Option<&str>, is_movie: bool) -> WatchStatus {
    if is_watched {
        return WatchStatus::Watched;
    }

    // No "remaining" marker on the card means it played to the end.
    let Some(time_left) = time_left else {
        return WatchStatus::Watched;
    };

    let minutes_left = parse_duration_minutes(time_left);
    let threshold = if is_movie {
        MOVIE_THRESHOLD_MINUTES
    } else {
        EPISODE_THRESHOLD_MINUTES
    };

    if minutes_left > threshold {
        WatchStatus::ShortWatched
    } else {
        WatchStatus::Started
    }
}
