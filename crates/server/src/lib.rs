pub mod error;
pub mod routes;
pub mod scan_pump;
pub mod state;

use std::sync::Arc;

use animelog_library::MergeSummary;
use animelog_scanner::controller::spawn_controller;
use animelog_scanner::feed::{Clock, Feed};
use animelog_scanner::scan::{ScanEvent, ScanSession};
use sqlx::SqlitePool;
use tokio::sync::{Mutex, broadcast, mpsc};

use crate::state::{AppState, ServerEvent};

/// Hand `session` to its controller task, start the pump that persists its
/// results, and return the state the HTTP handlers share.
pub fn start_services<F, C>(
    db: SqlitePool,
    session: ScanSession<F, C>,
    scan_events: mpsc::UnboundedReceiver<ScanEvent>,
) -> AppState
where
    F: Feed + 'static,
    C: Clock + 'static,
{
    let (events_tx, _) = broadcast::channel::<ServerEvent>(256);
    let (scanner, _controller) = spawn_controller(session);
    let session_added = Arc::new(Mutex::new(MergeSummary::default()));
    scan_pump::spawn_scan_pump(
        db.clone(),
        scan_events,
        events_tx.clone(),
        session_added.clone(),
    );

    AppState {
        db,
        scanner,
        events: events_tx,
        session_added,
    }
}
