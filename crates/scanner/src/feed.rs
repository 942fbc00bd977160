use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::FeedError;

/// One history card as read from the feed.
///
/// All text fields are raw page text; `top` is the card's top edge relative
/// to the viewport at the moment it was read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedEntry {
    pub series_title: Option<String>,
    pub episode_title: Option<String>,
    /// Either the literal `Watched` or remaining-time text like `12m`.
    pub status_text: Option<String>,
    pub footer_date: Option<String>,
    pub episode_href: Option<String>,
    pub series_href: Option<String>,
    #[serde(default)]
    pub top: f64,
}

/// Scroll geometry and entry count of the feed at one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeedMetrics {
    pub entry_count: usize,
    pub scroll_top: f64,
    pub viewport_height: f64,
    pub scroll_height: f64,
}

impl FeedMetrics {
    pub fn is_near_bottom(&self, margin: f64) -> bool {
        self.viewport_height + self.scroll_top >= self.scroll_height - margin
    }
}

/// Composite dedup key for a feed entry.
///
/// The feed exposes no stable identifier, so a card is identified by its
/// series text, episode text and floored viewport position. Re-rendered
/// cards at the same position collapse to the same key while the same
/// episode shown at another position stays distinct.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn of(entry: &FeedEntry) -> Self {
        let raw = format!(
            "{}-{}-{}",
            entry.series_title.as_deref().unwrap_or(""),
            entry.episode_title.as_deref().unwrap_or(""),
            entry.top.floor() as i64
        );
        Self(raw.chars().filter(|c| !c.is_whitespace()).collect())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A live, lazily loading list of history cards.
#[async_trait]
pub trait Feed: Send {
    /// Cards currently present in the feed, in display order.
    async fn entries(&mut self) -> Result<Vec<FeedEntry>, FeedError>;

    async fn metrics(&mut self) -> Result<FeedMetrics, FeedError>;

    async fn scroll_to(&mut self, top: f64) -> Result<(), FeedError>;
}

/// Time source and timer for the scan loop.
#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    async fn sleep(&self, duration: Duration);
}

/// Wall clock backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
