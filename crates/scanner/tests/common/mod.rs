#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use animelog_scanner::FeedError;
use animelog_scanner::feed::{Clock, Feed, FeedEntry, FeedMetrics};
use animelog_scanner::scan::{ScanEvent, ScanFlag};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

pub const ROW: f64 = 100.0;

/// Clock whose sleeps return at once after advancing virtual time.
#[derive(Clone)]
pub struct StepClock {
    inner: Arc<Mutex<ClockState>>,
}

struct ClockState {
    now: DateTime<Utc>,
    sleeps: Vec<Duration>,
}

impl StepClock {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(ClockState {
                now: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
                sleeps: Vec::new(),
            })),
        }
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.inner.lock().unwrap().sleeps.clone()
    }

    pub fn sleep_count(&self) -> usize {
        self.inner.lock().unwrap().sleeps.len()
    }
}

#[async_trait]
impl Clock for StepClock {
    fn now(&self) -> DateTime<Utc> {
        self.inner.lock().unwrap().now
    }

    async fn sleep(&self, duration: Duration) {
        {
            let mut state = self.inner.lock().unwrap();
            state.now += chrono::Duration::from_std(duration).unwrap();
            state.sleeps.push(duration);
        }
        tokio::task::yield_now().await;
    }
}

/// Feed that never moves; cards appear according to a per-scroll schedule.
#[derive(Clone)]
pub struct ScriptedFeed {
    inner: Arc<Mutex<FeedState>>,
}

struct FeedState {
    cards: Vec<FeedEntry>,
    /// Visible card count after N scrolls; the last value sticks.
    schedule: Vec<usize>,
    scrolls: usize,
    viewport_height: f64,
    entry_reads: usize,
    stop_after_reads: Option<(usize, ScanFlag)>,
}

impl FeedState {
    fn visible(&self) -> usize {
        self.schedule
            .get(self.scrolls)
            .or(self.schedule.last())
            .copied()
            .unwrap_or(self.cards.len())
            .min(self.cards.len())
    }
}

impl ScriptedFeed {
    /// All cards visible, viewport tall enough that the feed is always at its bottom.
    pub fn new(cards: Vec<FeedEntry>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(FeedState {
                cards,
                schedule: Vec::new(),
                scrolls: 0,
                viewport_height: 10_000.0,
                entry_reads: 0,
                stop_after_reads: None,
            })),
        }
    }

    pub fn with_schedule(self, schedule: Vec<usize>) -> Self {
        self.inner.lock().unwrap().schedule = schedule;
        self
    }

    pub fn with_viewport_height(self, height: f64) -> Self {
        self.inner.lock().unwrap().viewport_height = height;
        self
    }

    /// Clear `flag` during the `reads`-th entry read.
    pub fn stop_after_reads(self, reads: usize, flag: ScanFlag) -> Self {
        self.inner.lock().unwrap().stop_after_reads = Some((reads, flag));
        self
    }

    pub fn entry_reads(&self) -> usize {
        self.inner.lock().unwrap().entry_reads
    }

    pub fn scrolls(&self) -> usize {
        self.inner.lock().unwrap().scrolls
    }
}

#[async_trait]
impl Feed for ScriptedFeed {
    async fn entries(&mut self) -> Result<Vec<FeedEntry>, FeedError> {
        let mut state = self.inner.lock().unwrap();
        state.entry_reads += 1;
        if let Some((reads, flag)) = &state.stop_after_reads {
            if state.entry_reads >= *reads {
                flag.request_stop();
            }
        }
        let visible = state.visible();
        Ok(state.cards[..visible]
            .iter()
            .enumerate()
            .map(|(i, card)| FeedEntry {
                top: i as f64 * ROW,
                ..card.clone()
            })
            .collect())
    }

    async fn metrics(&mut self) -> Result<FeedMetrics, FeedError> {
        let state = self.inner.lock().unwrap();
        let visible = state.visible();
        Ok(FeedMetrics {
            entry_count: visible,
            scroll_top: 0.0,
            viewport_height: state.viewport_height,
            scroll_height: visible as f64 * ROW,
        })
    }

    async fn scroll_to(&mut self, _top: f64) -> Result<(), FeedError> {
        self.inner.lock().unwrap().scrolls += 1;
        Ok(())
    }
}

pub fn card(series: Option<&str>, episode: Option<&str>, status: Option<&str>) -> FeedEntry {
    FeedEntry {
        series_title: series.map(Into::into),
        episode_title: episode.map(Into::into),
        status_text: status.map(Into::into),
        ..Default::default()
    }
}

pub fn episode_cards(series: &str, count: usize) -> Vec<FeedEntry> {
    (1..=count)
        .map(|i| card(Some(series), Some(&format!("S1 E{i}")), Some("Watched")))
        .collect()
}

pub fn drain(rx: &mut mpsc::UnboundedReceiver<ScanEvent>) -> Vec<ScanEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
