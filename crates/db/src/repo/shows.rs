//! The show collection, stored as one JSON array under [`COLLECTION_KEY`].
//!
//! Writes that depend on the current collection run inside a transaction so
//! a merge and a manual status edit cannot interleave.

use animelog_core::types::{EpisodeNumber, Show, WatchStatus};
use animelog_library::{MergeSummary, merge_shows};
use chrono::{DateTime, Utc};
use sqlx::{SqliteExecutor, SqlitePool};
use tracing::{debug, info};

use super::kv;
use crate::DbError;

pub const COLLECTION_KEY: &str = "anime_log";

async fn read<'e>(db: impl SqliteExecutor<'e>) -> Result<Vec<Show>, DbError> {
    match kv::get(db, COLLECTION_KEY).await? {
        Some(json) => Ok(serde_json::from_str(&json)?),
        None => Ok(Vec::new()),
    }
}

async fn write<'e>(db: impl SqliteExecutor<'e>, shows: &[Show]) -> Result<(), DbError> {
    let json = serde_json::to_string(shows)?;
    kv::set(db, COLLECTION_KEY, &json).await?;
    Ok(())
}

/// Load the whole collection. An empty store yields an empty collection.
pub async fn load(pool: &SqlitePool) -> Result<Vec<Show>, DbError> {
    read(pool).await
}

/// Replace the whole collection.
pub async fn save(pool: &SqlitePool, shows: &[Show]) -> Result<(), DbError> {
    write(pool, shows).await?;
    debug!(shows = shows.len(), "collection saved");
    Ok(())
}

/// Set the status of one recorded episode.
///
/// Returns `false` (and writes nothing) when the show, season or episode is
/// not in the collection.
pub async fn update_episode_status(
    pool: &SqlitePool,
    title: &str,
    season: u32,
    episode: EpisodeNumber,
    status: WatchStatus,
) -> Result<bool, DbError> {
    let mut tx = pool.begin().await?;
    let mut shows = read(&mut *tx).await?;

    let target = shows
        .iter_mut()
        .find(|s| s.title == title)
        .and_then(|s| s.season_mut(season))
        .and_then(|s| s.episode_mut(episode));
    let Some(target) = target else {
        debug!(title, season, %episode, "episode not in collection");
        return Ok(false);
    };

    target.status = status;
    write(&mut *tx, &shows).await?;
    tx.commit().await?;

    info!(title, season, %episode, %status, "episode status updated");
    Ok(true)
}

/// Clear the collection.
pub async fn reset(pool: &SqlitePool) -> Result<(), DbError> {
    write(pool, &[]).await?;
    info!("collection reset");
    Ok(())
}

/// Merge a scan batch into the stored collection and save the result.
pub async fn merge_and_save(
    pool: &SqlitePool,
    batch: Vec<Show>,
    now: DateTime<Utc>,
) -> Result<MergeSummary, DbError> {
    let mut tx = pool.begin().await?;
    let existing = read(&mut *tx).await?;

    let (merged, summary) = merge_shows(existing, batch, now);
    write(&mut *tx, &merged).await?;
    tx.commit().await?;

    info!(
        new_series = summary.new_series,
        new_episodes = summary.new_episodes,
        total_series = merged.len(),
        "batch merged into collection"
    );
    Ok(summary)
}
