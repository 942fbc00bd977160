use async_trait::async_trait;

use crate::feed::{Feed, FeedEntry, FeedMetrics};
use crate::{FeedError, ROW_HEIGHT};

/// Replays a captured history feed as a lazily loading list.
///
/// Cards become available a page at a time once the scroll position nears
/// the end of what is loaded. Reported positions are relative to the current
/// scroll offset, the way a page reports them.
#[derive(Debug, Clone)]
pub struct ReplayFeed {
    cards: Vec<FeedEntry>,
    loaded: usize,
    page_size: usize,
    row_height: f64,
    viewport_height: f64,
    scroll_top: f64,
}

impl ReplayFeed {
    pub const DEFAULT_PAGE_SIZE: usize = 20;
    pub const DEFAULT_VIEWPORT_HEIGHT: f64 = 900.0;

    pub fn new(cards: Vec<FeedEntry>) -> Self {
        let loaded = cards.len().min(Self::DEFAULT_PAGE_SIZE);
        Self {
            cards,
            loaded,
            page_size: Self::DEFAULT_PAGE_SIZE,
            row_height: ROW_HEIGHT,
            viewport_height: Self::DEFAULT_VIEWPORT_HEIGHT,
            scroll_top: 0.0,
        }
    }

    /// Load a captured feed: a JSON array of cards.
    pub fn from_json(json: &str) -> Result<Self, FeedError> {
        serde_json::from_str::<Vec<FeedEntry>>(json)
            .map(Self::new)
            .map_err(|e| FeedError::Malformed(e.to_string()))
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self.loaded = self.cards.len().min(self.page_size);
        self
    }

    pub fn with_viewport_height(mut self, height: f64) -> Self {
        self.viewport_height = height;
        self
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn loaded(&self) -> usize {
        self.loaded
    }

    fn scroll_height(&self) -> f64 {
        self.loaded as f64 * self.row_height
    }

    fn max_scroll(&self) -> f64 {
        (self.scroll_height() - self.viewport_height).max(0.0)
    }

    fn load_more_if_near_bottom(&mut self) {
        if self.loaded >= self.cards.len() {
            return;
        }
        if self.scroll_top + self.viewport_height >= self.scroll_height() - self.row_height {
            self.loaded = (self.loaded + self.page_size).min(self.cards.len());
        }
    }
}

#[async_trait]
impl Feed for ReplayFeed {
    async fn entries(&mut self) -> Result<Vec<FeedEntry>, FeedError> {
        Ok(self.cards[..self.loaded]
            .iter()
            .enumerate()
            .map(|(i, card)| FeedEntry {
                top: i as f64 * self.row_height - self.scroll_top,
                ..card.clone()
            })
            .collect())
    }

    async fn metrics(&mut self) -> Result<FeedMetrics, FeedError> {
        self.load_more_if_near_bottom();
        Ok(FeedMetrics {
            entry_count: self.loaded,
            scroll_top: self.scroll_top,
            viewport_height: self.viewport_height,
            scroll_height: self.scroll_height(),
        })
    }

    async fn scroll_to(&mut self, top: f64) -> Result<(), FeedError> {
        self.scroll_top = top.clamp(0.0, self.max_scroll());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cards(n: usize) -> Vec<FeedEntry> {
        (1..=n)
            .map(|i| FeedEntry {
                series_title: Some("Dungeon Meshi".into()),
                episode_title: Some(format!("S1 E{i}")),
                status_text: Some("Watched".into()),
                ..Default::default()
            })
            .collect()
    }

    #[tokio::test]
    async fn positions_follow_scroll_offset() {
        let mut feed = ReplayFeed::new(cards(10)).with_viewport_height(500.0);
        feed.scroll_to(300.0).await.unwrap();
        let entries = feed.entries().await.unwrap();
        assert_eq!(entries[0].top, -300.0);
        assert_eq!(entries[2].top, 2.0 * ROW_HEIGHT - 300.0);
    }

    #[tokio::test]
    async fn scroll_is_clamped_to_loaded_height() {
        let mut feed = ReplayFeed::new(cards(4)).with_viewport_height(500.0);
        feed.scroll_to(10_000.0).await.unwrap();
        let m = feed.metrics().await.unwrap();
        assert_eq!(m.scroll_top, 4.0 * ROW_HEIGHT - 500.0);
        assert!(m.is_near_bottom(100.0));
    }

    #[tokio::test]
    async fn pages_load_near_the_bottom() {
        let mut feed = ReplayFeed::new(cards(25))
            .with_page_size(10)
            .with_viewport_height(600.0);
        assert_eq!(feed.metrics().await.unwrap().entry_count, 10);

        feed.scroll_to(10_000.0).await.unwrap();
        assert_eq!(feed.metrics().await.unwrap().entry_count, 20);
        feed.scroll_to(10_000.0).await.unwrap();
        assert_eq!(feed.metrics().await.unwrap().entry_count, 25);
        assert_eq!(feed.entries().await.unwrap().len(), 25);
    }

    #[test]
    fn from_json_rejects_garbage() {
        assert!(matches!(
            ReplayFeed::from_json("{not json"),
            Err(FeedError::Malformed(_))
        ));
        let feed = ReplayFeed::from_json(r#"[{"episode_title":"Suzume"}]"#).unwrap();
        assert_eq!(feed.len(), 1);
    }
}
