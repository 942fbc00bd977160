use std::sync::Arc;
use std::time::Duration;

use animelog_core::types::Show;
use animelog_db::DbError;
use animelog_db::repo::shows;
use animelog_library::MergeSummary;
use animelog_scanner::scan::ScanEvent;
use sqlx::SqlitePool;
use tokio::sync::{Mutex, broadcast, mpsc};
use tokio::task::JoinHandle;

use crate::state::ServerEvent;

/// Consume scanner events: merge every result batch into the stored
/// collection, then rebroadcast the event to SSE subscribers.
///
/// `session_added` is cleared when a scan starts and accumulates every
/// successful merge until the next start.
///
/// The task ends when the scanner's event channel closes.
pub fn spawn_scan_pump(
    pool: SqlitePool,
    mut scan_events: mpsc::UnboundedReceiver<ScanEvent>,
    events_tx: broadcast::Sender<ServerEvent>,
    session_added: Arc<Mutex<MergeSummary>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = scan_events.recv().await {
            let out = match event {
                ScanEvent::ScanStarted { mode } => {
                    *session_added.lock().await = MergeSummary::default();
                    ServerEvent::ScanStarted { mode }
                }
                ScanEvent::ScanStopped { reason } => ServerEvent::ScanStopped { reason },
                ScanEvent::ScanResults { shows } => {
                    let merged = match merge_with_retry(&pool, &shows).await {
                        Ok(summary) => {
                            *session_added.lock().await += summary;
                            Some(summary)
                        }
                        Err(e) => {
                            tracing::error!(
                                shows = shows.len(),
                                error = %e,
                                "failed to merge scan batch into collection"
                            );
                            None
                        }
                    };
                    ServerEvent::ScanResults { shows, merged }
                }
            };
            // No subscribers is fine.
            let _ = events_tx.send(out);
        }
        tracing::info!("scan event stream closed");
    })
}

const MERGE_ATTEMPTS: u32 = 5;

async fn merge_with_retry(pool: &SqlitePool, batch: &[Show]) -> Result<MergeSummary, DbError> {
    let mut attempt = 1;
    loop {
        match shows::merge_and_save(pool, batch.to_vec(), chrono::Utc::now()).await {
            Ok(summary) => return Ok(summary),
            Err(e) if attempt < MERGE_ATTEMPTS => {
                tracing::warn!(attempt, error = %e, "merge attempt failed, retrying");
                attempt += 1;
                tokio::time::sleep(Duration::from_millis(120)).await;
            }
            Err(e) => return Err(e),
        }
    }
}
