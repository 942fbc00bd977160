#![allow(clippy::collapsible_if, clippy::manual_range_contains)]
pub mod aggregate;
pub mod controller;
pub mod feed;
pub mod parser;
pub mod replay;
pub mod scan;
pub mod status;

use std::time::Duration;

use thiserror::Error;

/// Height of one history card in the feed, in pixels.
pub const ROW_HEIGHT: f64 = 279.0;

/// A single feed entry could not be turned into a record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("entry has neither a series title nor an episode title")]
    MissingSeriesTitle,
}

/// The entry source could not be read or driven.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeedError {
    #[error("feed unavailable: {0}")]
    Unavailable(String),
    #[error("malformed feed data: {0}")]
    Malformed(String),
}

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("scan controller is no longer running")]
    ControllerClosed,
}

/// Timing and paging knobs for a scan session.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Pixels the virtual scroll position advances after each full-scan pass.
    pub scroll_increment: f64,
    pub scroll_delay: Duration,
    /// Consecutive passes without new entries before a full scan gives up.
    pub max_empty_passes: u32,
    pub load_wait_max: Duration,
    pub load_wait_interval: Duration,
    pub quick_scan_interval: Duration,
    /// Distance from the end of the feed that still counts as "at the bottom".
    pub bottom_margin: f64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            scroll_increment: 1500.0,
            scroll_delay: Duration::from_millis(1250),
            max_empty_passes: 3,
            load_wait_max: Duration::from_millis(5000),
            load_wait_interval: Duration::from_millis(500),
            quick_scan_interval: Duration::from_millis(2000),
            bottom_margin: 100.0,
        }
    }
}

impl ScanConfig {
    /// Number of polls the load-wait makes before giving up.
    pub fn load_wait_polls(&self) -> u32 {
        let interval = self.load_wait_interval.as_millis().max(1);
        let polls = self.load_wait_max.as_millis().div_ceil(interval);
        u32::try_from(polls).unwrap_or(u32::MAX).max(1)
    }
}
