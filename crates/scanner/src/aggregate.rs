//! Groups the records of one pass into the show → season → episode tree.
//!
//! The same episode often shows up more than once in a pass (rewatches,
//! re-rendered cards). Those observations are collapsed into one episode by
//! [`resolve_final_state`].

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use tracing::debug;

use animelog_core::types::{Episode, EpisodeNumber, RawRecord, Season, Show, WatchStatus};

use crate::status::{parse_duration_minutes, resolve_status};

type EpisodeBuckets = BTreeMap<EpisodeNumber, Vec<Episode>>;

/// Build the episode observation a single record contributes.
pub fn observation(record: &RawRecord) -> Episode {
    Episode {
        number: record.episode_number,
        status: resolve_status(
            record.is_watched,
            record.time_left.as_deref(),
            record.is_movie(),
        ),
        last_watched: Some(record.observed_at),
        duration: record.time_left.as_deref().map(parse_duration_minutes),
        href: record.episode_href.clone(),
    }
}

/// Pick the canonical state out of several observations of one episode.
///
/// Observations are ordered newest first. A `watched` observation wins, then
/// `started` over `short-watched`; otherwise the most recent one is kept.
/// Progress never regresses to a less complete status within a pass.
pub fn resolve_final_state(mut states: Vec<Episode>) -> Option<Episode> {
    states.sort_by(|a, b| b.last_watched.cmp(&a.last_watched));

    let pick = [WatchStatus::Watched, WatchStatus::Started]
        .into_iter()
        .find_map(|wanted| states.iter().position(|s| s.status == wanted))
        .unwrap_or(0);

    if pick < states.len() {
        Some(states.swap_remove(pick))
    } else {
        None
    }
}

/// Group raw records into shows, resolving duplicate episode observations.
///
/// Shows keep the order in which their first record appeared; seasons and
/// episodes are ordered by number.
pub fn aggregate(records: &[RawRecord], now: DateTime<Utc>) -> Vec<Show> {
    let mut order: Vec<&str> = Vec::new();
    let mut series: HashMap<&str, BTreeMap<u32, EpisodeBuckets>> = HashMap::new();

    for record in records {
        let seasons = series
            .entry(record.series_title.as_str())
            .or_insert_with(|| {
                order.push(record.series_title.as_str());
                BTreeMap::new()
            });
        seasons
            .entry(record.season_number())
            .or_default()
            .entry(record.episode_number)
            .or_default()
            .push(observation(record));
    }

    order
        .into_iter()
        .filter_map(|title| {
            let seasons = series.remove(title)?;
            let href = records
                .iter()
                .find(|r| r.series_title == title)
                .and_then(|r| r.series_href.clone());

            let seasons = seasons
                .into_iter()
                .map(|(number, buckets)| Season {
                    number,
                    episodes: buckets
                        .into_iter()
                        .filter_map(|(number, states)| {
                            if states.len() > 1 {
                                debug!(
                                    series = title,
                                    episode = %number,
                                    observations = states.len(),
                                    "resolving duplicate episode observations"
                                );
                            }
                            let mut episode = resolve_final_state(states)?;
                            episode.number = number;
                            Some(episode)
                        })
                        .collect(),
                })
                .collect();

            Some(Show {
                title: title.to_string(),
                seasons,
                last_updated: now,
                href,
            })
        })
        .collect()
}
