//! Collection merge engine.
//!
//! Merge rules:
//! 1. Shows match by title; an unknown show is inserted whole.
//! 2. An unknown season of a known show is appended whole.
//! 3. Episodes already recorded in a season are never replaced, whatever
//!    status the incoming batch carries.
//!
//! Every show the merge inserts or touches is stamped with the merge time,
//! so merging the same batch twice at the same instant leaves the
//! collection exactly as the first merge did.

use animelog_core::types::Show;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

/// What a merge added to the collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MergeSummary {
    pub new_series: usize,
    pub new_episodes: usize,
}

impl MergeSummary {
    pub fn is_empty(&self) -> bool {
        self.new_series == 0 && self.new_episodes == 0
    }
}

impl std::ops::AddAssign for MergeSummary {
    fn add_assign(&mut self, other: Self) {
        self.new_series += other.new_series;
        self.new_episodes += other.new_episodes;
    }
}

/// Fold `incoming` into `existing`.
///
/// Existing shows keep their position; new shows are appended in batch
/// order. New shows and every known show the batch touches get
/// `last_updated = now`.
pub fn merge_shows(
    mut existing: Vec<Show>,
    incoming: Vec<Show>,
    now: DateTime<Utc>,
) -> (Vec<Show>, MergeSummary) {
    let mut summary = MergeSummary::default();

    for mut show in incoming {
        let Some(current) = existing.iter_mut().find(|s| s.title == show.title) else {
            debug!(title = %show.title, episodes = show.episode_count(), "adding new show");
            summary.new_series += 1;
            summary.new_episodes += show.episode_count();
            show.last_updated = now;
            existing.push(show);
            continue;
        };

        let touched = !show.seasons.is_empty();
        for mut season in show.seasons {
            match current.season_mut(season.number) {
                Some(target) => {
                    for episode in season.episodes {
                        if target.episode(episode.number).is_none() {
                            target.episodes.push(episode);
                            summary.new_episodes += 1;
                        }
                    }
                    target.sort_episodes();
                }
                None => {
                    debug!(title = %current.title, season = season.number, "adding new season");
                    summary.new_episodes += season.episodes.len();
                    season.sort_episodes();
                    current.seasons.push(season);
                }
            }
        }

        if touched {
            current.seasons.sort_by_key(|s| s.number);
            current.last_updated = now;
        }
    }

    (existing, summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use animelog_core::types::{Episode, EpisodeNumber, Season, WatchStatus};

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    fn ep(number: f64, status: WatchStatus) -> Episode {
        Episode {
            number: EpisodeNumber(number),
            status,
            last_watched: Some(at(100)),
            duration: None,
            href: None,
        }
    }

    fn show(title: &str, seasons: Vec<(u32, Vec<Episode>)>) -> Show {
        Show {
            title: title.into(),
            seasons: seasons
                .into_iter()
                .map(|(number, episodes)| Season { number, episodes })
                .collect(),
            last_updated: at(0),
            href: None,
        }
    }

    #[test]
    fn new_show_is_inserted_whole() {
        let incoming = vec![show("Frieren", vec![(1, vec![ep(1.0, WatchStatus::Watched)])])];
        let (merged, summary) = merge_shows(Vec::new(), incoming.clone(), at(500));
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].seasons, incoming[0].seasons);
        assert_eq!(merged[0].last_updated, at(500));
        assert_eq!(
            summary,
            MergeSummary {
                new_series: 1,
                new_episodes: 1
            }
        );
    }

    #[test]
    fn new_episodes_are_appended_in_order() {
        let existing = vec![show(
            "Frieren",
            vec![(1, vec![ep(1.0, WatchStatus::Watched), ep(3.0, WatchStatus::Watched)])],
        )];
        let incoming = vec![show("Frieren", vec![(1, vec![ep(2.0, WatchStatus::Started)])])];

        let (merged, summary) = merge_shows(existing, incoming, at(500));

        let numbers: Vec<f64> = merged[0].episodes().map(|e| e.number.value()).collect();
        assert_eq!(numbers, vec![1.0, 2.0, 3.0]);
        assert_eq!(summary.new_episodes, 1);
        assert_eq!(summary.new_series, 0);
        assert_eq!(merged[0].last_updated, at(500));
    }

    #[test]
    fn new_season_is_appended_and_seasons_stay_ordered() {
        let existing = vec![show("Oshi no Ko", vec![(2, vec![ep(1.0, WatchStatus::Watched)])])];
        let incoming = vec![show(
            "Oshi no Ko",
            vec![(1, vec![ep(2.0, WatchStatus::Watched), ep(1.0, WatchStatus::Watched)])],
        )];

        let (merged, summary) = merge_shows(existing, incoming, at(500));

        let seasons: Vec<u32> = merged[0].seasons.iter().map(|s| s.number).collect();
        assert_eq!(seasons, vec![1, 2]);
        assert_eq!(merged[0].seasons[0].episodes[0].number, EpisodeNumber(1.0));
        assert_eq!(summary.new_episodes, 2);
    }

    #[test]
    fn recorded_status_is_never_overwritten() {
        let existing = vec![show("Mushishi", vec![(1, vec![ep(4.0, WatchStatus::Started)])])];
        let incoming = vec![show("Mushishi", vec![(1, vec![ep(4.0, WatchStatus::Watched)])])];

        let (merged, summary) = merge_shows(existing, incoming, at(500));

        let episode = merged[0].seasons[0].episode(EpisodeNumber(4.0)).unwrap();
        assert_eq!(episode.status, WatchStatus::Started);
        assert!(summary.is_empty());
    }

    #[test]
    fn merging_the_same_batch_twice_changes_nothing_more() {
        let existing = vec![show("Pluto", vec![(1, vec![ep(1.0, WatchStatus::Watched)])])];
        let batch = vec![
            show("Pluto", vec![(1, vec![ep(1.0, WatchStatus::Started), ep(2.0, WatchStatus::Watched)])]),
            show("Suzume", vec![(1, vec![ep(-1.0, WatchStatus::Watched)])]),
        ];

        let (once, first) = merge_shows(existing, batch.clone(), at(500));
        let (twice, second) = merge_shows(once.clone(), batch, at(500));

        assert_eq!(once, twice);
        assert_eq!(
            first,
            MergeSummary {
                new_series: 1,
                new_episodes: 2
            }
        );
        assert!(second.is_empty());
    }

    #[test]
    fn batch_of_only_new_shows_merges_idempotently() {
        let batch = vec![
            show("Dandadan", vec![(1, vec![ep(3.0, WatchStatus::Watched)])]),
            show("Kaiju No. 8", vec![(1, vec![ep(1.0, WatchStatus::Started)])]),
        ];

        let (once, first) = merge_shows(Vec::new(), batch.clone(), at(500));
        let (twice, second) = merge_shows(once.clone(), batch, at(500));

        assert_eq!(once, twice);
        assert!(once.iter().all(|s| s.last_updated == at(500)));
        assert_eq!(
            first,
            MergeSummary {
                new_series: 2,
                new_episodes: 2
            }
        );
        assert!(second.is_empty());
    }

    #[test]
    fn summaries_accumulate_across_batches() {
        let mut total = MergeSummary::default();
        total += MergeSummary {
            new_series: 1,
            new_episodes: 3,
        };
        total += MergeSummary {
            new_series: 0,
            new_episodes: 2,
        };
        assert_eq!(
            total,
            MergeSummary {
                new_series: 1,
                new_episodes: 5
            }
        );
    }

    #[test]
    fn untouched_shows_keep_their_timestamp_and_position() {
        let existing = vec![
            show("A", vec![(1, vec![ep(1.0, WatchStatus::Watched)])]),
            show("B", vec![(1, vec![ep(1.0, WatchStatus::Watched)])]),
        ];
        let incoming = vec![
            show("C", vec![(1, vec![ep(1.0, WatchStatus::Watched)])]),
            show("A", vec![(1, vec![ep(2.0, WatchStatus::Watched)])]),
        ];

        let (merged, _) = merge_shows(existing, incoming, at(500));

        let titles: Vec<&str> = merged.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["A", "B", "C"]);
        assert_eq!(merged[0].last_updated, at(500));
        assert_eq!(merged[1].last_updated, at(0));
    }
}
