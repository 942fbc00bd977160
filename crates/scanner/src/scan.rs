use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use animelog_core::types::{RawRecord, Show};

use crate::feed::{Clock, Feed, Fingerprint};
use crate::{ROW_HEIGHT, ScanConfig, aggregate, parser};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanMode {
    /// Scroll through the feed until it stops yielding new entries.
    Full,
    /// Re-read the visible entries on an interval until stopped.
    Quick,
}

impl ScanMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Quick => "quick",
        }
    }
}

impl std::fmt::Display for ScanMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanState {
    Idle,
    Scanning,
    /// A full scan gave up after repeated passes without new entries.
    Exhausted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    Requested,
    Exhausted,
}

/// Events a scan session emits, in order: one start, any number of result
/// batches (one per pass that found something), one stop.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ScanEvent {
    ScanStarted { mode: ScanMode },
    ScanResults { shows: Vec<Show> },
    ScanStopped { reason: StopReason },
}

/// Shared "scanning" flag. Clearing it asks the running loop to stop at the
/// top of its next pass.
#[derive(Debug, Clone, Default)]
pub struct ScanFlag(Arc<AtomicBool>);

impl ScanFlag {
    pub fn is_scanning(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn request_stop(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    fn begin(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Counters for one run of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOutcome {
    pub state: ScanState,
    pub passes: u32,
    pub batches: u32,
    pub records: usize,
    pub failures: usize,
}

impl ScanOutcome {
    fn new() -> Self {
        Self {
            state: ScanState::Scanning,
            passes: 0,
            batches: 0,
            records: 0,
            failures: 0,
        }
    }
}

/// One scanner bound to a feed and a clock.
///
/// Per-session state (processed fingerprints, scroll position, entry count,
/// empty-pass counter) is reset whenever a run starts and when it ends.
pub struct ScanSession<F, C> {
    feed: F,
    clock: C,
    config: ScanConfig,
    events: mpsc::UnboundedSender<ScanEvent>,
    flag: ScanFlag,
    state: ScanState,
    processed: HashSet<Fingerprint>,
    failed: HashSet<Fingerprint>,
    position: f64,
    last_entry_count: usize,
    empty_passes: u32,
}

impl<F: Feed, C: Clock> ScanSession<F, C> {
    /// Create a session and the receiving end of its event channel.
    pub fn new(
        feed: F,
        clock: C,
        config: ScanConfig,
    ) -> (Self, mpsc::UnboundedReceiver<ScanEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let session = Self {
            feed,
            clock,
            config,
            events,
            flag: ScanFlag::default(),
            state: ScanState::Idle,
            processed: HashSet::new(),
            failed: HashSet::new(),
            position: 0.0,
            last_entry_count: 0,
            empty_passes: 0,
        };
        (session, rx)
    }

    /// Use an externally created flag instead of the session's own.
    pub fn with_stop_handle(mut self, flag: ScanFlag) -> Self {
        self.flag = flag;
        self
    }

    pub fn stop_handle(&self) -> ScanFlag {
        self.flag.clone()
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    pub fn feed(&self) -> &F {
        &self.feed
    }

    /// Run one scan to completion and report what happened.
    ///
    /// A full scan ends on its own once the feed is exhausted; both modes
    /// end when the stop flag is cleared. A stop request is observed at the
    /// top of the next pass, after any wait in progress has finished.
    pub async fn run(&mut self, mode: ScanMode) -> ScanOutcome {
        self.reset();
        self.flag.begin();
        self.state = ScanState::Scanning;
        info!(%mode, "scan started");
        self.emit(ScanEvent::ScanStarted { mode });

        let mut outcome = ScanOutcome::new();
        let reason = match mode {
            ScanMode::Full => self.scan_progressively(&mut outcome).await,
            ScanMode::Quick => self.scan_repeatedly(&mut outcome).await,
        };

        self.flag.request_stop();
        self.reset();
        self.state = match reason {
            StopReason::Exhausted => ScanState::Exhausted,
            StopReason::Requested => ScanState::Idle,
        };
        outcome.state = self.state;

        info!(
            %mode,
            ?reason,
            passes = outcome.passes,
            batches = outcome.batches,
            records = outcome.records,
            failures = outcome.failures,
            "scan stopped"
        );
        self.emit(ScanEvent::ScanStopped { reason });
        outcome
    }

    async fn scan_progressively(&mut self, outcome: &mut ScanOutcome) -> StopReason {
        while self.flag.is_scanning() {
            let records = self.scan_current_view(outcome).await;

            if records.is_empty() {
                self.empty_passes += 1;
                if self.empty_passes >= self.config.max_empty_passes {
                    info!(
                        empty_passes = self.empty_passes,
                        "no new entries after repeated passes, feed exhausted"
                    );
                    return StopReason::Exhausted;
                }
            } else {
                self.empty_passes = 0;
                self.emit_batch(&records, outcome);
            }

            self.scroll_and_wait().await;
        }
        StopReason::Requested
    }

    async fn scan_repeatedly(&mut self, outcome: &mut ScanOutcome) -> StopReason {
        while self.flag.is_scanning() {
            let records = self.scan_current_view(outcome).await;
            if !records.is_empty() {
                self.emit_batch(&records, outcome);
            }
            self.clock.sleep(self.config.quick_scan_interval).await;
        }
        StopReason::Requested
    }

    /// One read pass: returns the records of entries not seen before.
    async fn scan_current_view(&mut self, outcome: &mut ScanOutcome) -> Vec<RawRecord> {
        outcome.passes += 1;

        let metrics = match self.feed.metrics().await {
            Ok(m) => m,
            Err(e) => {
                warn!(error = %e, "failed to read feed metrics");
                return Vec::new();
            }
        };

        // Stuck at the bottom with nothing new rendered: give lazy loading a chance.
        if metrics.entry_count == self.last_entry_count
            && metrics.is_near_bottom(self.config.bottom_margin)
        {
            if !self.wait_for_more_entries(metrics.entry_count).await {
                debug!(entry_count = metrics.entry_count, "no new entries loaded after waiting");
                return Vec::new();
            }
        }

        let entries = match self.feed.entries().await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, "failed to read feed entries");
                return Vec::new();
            }
        };
        self.last_entry_count = entries.len();

        let now = self.clock.now();
        let mut records = Vec::new();
        for entry in &entries {
            let key = Fingerprint::of(entry);
            if self.processed.contains(&key) || self.failed.contains(&key) {
                debug!(fingerprint = %key, top = entry.top, "skipping already seen entry");
                continue;
            }

            match parser::parse_entry(entry, now) {
                Ok(record) => {
                    debug!(
                        series = %record.series_title,
                        episode = %record.episode_number,
                        season = ?record.season,
                        "parsed entry"
                    );
                    records.push(record);
                    self.processed.insert(key);
                }
                Err(e) => {
                    warn!(fingerprint = %key, error = %e, "failed to parse feed entry");
                    outcome.failures += 1;
                    self.failed.insert(key);
                }
            }
        }

        info!(
            new_entries = records.len(),
            total_entries = entries.len(),
            total_processed = self.processed.len(),
            position = self.position,
            "pass complete"
        );
        records
    }

    /// Poll until the feed renders more than `current` entries or the wait
    /// budget runs out.
    async fn wait_for_more_entries(&mut self, current: usize) -> bool {
        for _ in 0..self.config.load_wait_polls() {
            self.clock.sleep(self.config.load_wait_interval).await;
            match self.feed.metrics().await {
                Ok(m) if m.entry_count > current => {
                    debug!(loaded = m.entry_count - current, "new entries loaded");
                    return true;
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "failed to read feed metrics while waiting"),
            }
        }
        false
    }

    async fn scroll_and_wait(&mut self) {
        let previous = self.position;
        self.position += self.config.scroll_increment;
        debug!(
            from = previous,
            to = self.position,
            rows_scanned = (self.position / ROW_HEIGHT).floor() as u64,
            "scrolling feed"
        );
        if let Err(e) = self.feed.scroll_to(self.position).await {
            warn!(error = %e, position = self.position, "failed to scroll feed");
        }
        self.clock.sleep(self.config.scroll_delay).await;
    }

    fn emit_batch(&self, records: &[RawRecord], outcome: &mut ScanOutcome) {
        let shows = aggregate::aggregate(records, self.clock.now());
        outcome.batches += 1;
        outcome.records += records.len();
        info!(shows = shows.len(), records = records.len(), "emitting scan results");
        self.emit(ScanEvent::ScanResults { shows });
    }

    fn emit(&self, event: ScanEvent) {
        if self.events.send(event).is_err() {
            debug!("scan event receiver dropped");
        }
    }

    fn reset(&mut self) {
        self.processed.clear();
        self.failed.clear();
        self.position = 0.0;
        self.last_entry_count = 0;
        self.empty_passes = 0;
    }
}
