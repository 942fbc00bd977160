use std::sync::Arc;

use animelog_core::types::Show;
use animelog_library::MergeSummary;
use animelog_scanner::controller::ScanHandle;
use animelog_scanner::scan::{ScanMode, StopReason};
use sqlx::SqlitePool;
use tokio::sync::Mutex;

/// Server-sent event types.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(tag = "type", content = "data")]
pub enum ServerEvent {
    #[serde(rename = "scan_started")]
    ScanStarted { mode: ScanMode },
    /// One scan batch, with what merging it into the collection added.
    /// `merged` is absent when the merge failed.
    #[serde(rename = "scan_results")]
    ScanResults {
        shows: Vec<Show>,
        merged: Option<MergeSummary>,
    },
    #[serde(rename = "scan_stopped")]
    ScanStopped { reason: StopReason },
    #[serde(rename = "heartbeat")]
    Heartbeat { seq: u64 },
}

impl ServerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::ScanStarted { .. } => "scan_started",
            Self::ScanResults { .. } => "scan_results",
            Self::ScanStopped { .. } => "scan_stopped",
            Self::Heartbeat { .. } => "heartbeat",
        }
    }
}

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub scanner: ScanHandle,
    pub events: tokio::sync::broadcast::Sender<ServerEvent>,
    /// What the current or latest scan added, reset on every scan start.
    pub session_added: Arc<Mutex<MergeSummary>>,
}
