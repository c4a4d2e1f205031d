// tests/common/mod.rs
//
// Scriptable in-memory upstream shared by the integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use history_timeline::error::ResolveError;
use history_timeline::store::CustomEventStore;
use history_timeline::strategy::Picker;
use history_timeline::wiki::{
    FeedItem, FeedPage, ImageRef, MediaItem, OnThisDayFeed, PageSummary, SearchHit, SrcSet,
    WikiApi,
};
use history_timeline::{AppState, TimelineConfig};

#[derive(Default)]
pub struct MockWiki {
    /// Every endpoint fails with a network error.
    pub down: bool,
    /// Only the on-this-day feed fails.
    pub feed_down: bool,
    /// Served for every date.
    pub feed: OnThisDayFeed,
    pub search_hits: Vec<SearchHit>,
    pub categories: HashMap<String, Vec<String>>,
    pub summaries: HashMap<String, PageSummary>,
    pub media: HashMap<String, Vec<MediaItem>>,
    /// Served for every Commons search term.
    pub commons: Vec<String>,
    /// Commons category name -> file titles.
    pub commons_categories: HashMap<String, Vec<String>>,
    /// Content type answered by HEAD probes; `None` means 404.
    pub probe_type: Option<String>,
    pub calls: AtomicUsize,
    pub summary_calls: AtomicUsize,
}

impl MockWiki {
    pub fn down() -> Self {
        Self {
            down: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn summary_calls(&self) -> usize {
        self.summary_calls.load(Ordering::SeqCst)
    }

    fn enter(&self) -> Result<(), ResolveError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.down {
            Err(ResolveError::Network("connection refused".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl WikiApi for MockWiki {
    async fn on_this_day(&self, _month: u32, _day: u32) -> Result<OnThisDayFeed, ResolveError> {
        self.enter()?;
        if self.feed_down {
            return Err(ResolveError::UpstreamStatus {
                status: 503,
                url: "mock://feed".into(),
            });
        }
        Ok(self.feed.clone())
    }

    async fn search(&self, _query: &str, _limit: u32) -> Result<Vec<SearchHit>, ResolveError> {
        self.enter()?;
        Ok(self.search_hits.clone())
    }

    async fn category_members(
        &self,
        category: &str,
        _limit: u32,
    ) -> Result<Vec<String>, ResolveError> {
        self.enter()?;
        Ok(self.categories.get(category).cloned().unwrap_or_default())
    }

    async fn page_summary(&self, title: &str) -> Result<PageSummary, ResolveError> {
        self.enter()?;
        self.summary_calls.fetch_add(1, Ordering::SeqCst);
        self.summaries
            .get(title)
            .cloned()
            .ok_or_else(|| ResolveError::UpstreamStatus {
                status: 404,
                url: format!("mock://summary/{title}"),
            })
    }

    async fn page_media(&self, title: &str) -> Result<Vec<MediaItem>, ResolveError> {
        self.enter()?;
        Ok(self.media.get(title).cloned().unwrap_or_default())
    }

    async fn commons_search(&self, _term: &str, _limit: u32) -> Result<Vec<String>, ResolveError> {
        self.enter()?;
        Ok(self.commons.clone())
    }

    async fn commons_category_files(
        &self,
        category: &str,
        _limit: u32,
    ) -> Result<Vec<String>, ResolveError> {
        self.enter()?;
        Ok(self
            .commons_categories
            .get(category)
            .cloned()
            .unwrap_or_default())
    }

    async fn probe(&self, url: &str) -> Result<String, ResolveError> {
        self.enter()?;
        self.probe_type
            .clone()
            .ok_or_else(|| ResolveError::UpstreamStatus {
                status: 404,
                url: url.to_string(),
            })
    }
}

/// No sleeps, upstream first.
pub fn test_config() -> TimelineConfig {
    TimelineConfig {
        rate_limit_ms: 0,
        media_rate_limit_ms: 0,
        prefer_curated: false,
        ..TimelineConfig::default()
    }
}

pub fn state_with(cfg: TimelineConfig, wiki: Arc<MockWiki>) -> AppState {
    AppState::build(
        cfg,
        wiki,
        Arc::new(Picker::seeded(42)),
        Arc::new(CustomEventStore::in_memory()),
    )
}

pub fn feed_item(year: i32, text: &str, page: &str) -> FeedItem {
    FeedItem {
        year: Some(year),
        text: text.to_string(),
        pages: vec![FeedPage {
            title: page.to_string(),
            extract: None,
            thumbnail: None,
        }],
    }
}

pub fn feed_item_with_thumb(year: i32, text: &str, page: &str, thumb: &str) -> FeedItem {
    let mut item = feed_item(year, text, page);
    item.pages[0].thumbnail = Some(ImageRef {
        source: thumb.to_string(),
        width: Some(320),
        height: Some(213),
    });
    item
}

pub fn image_item(title: &str, src: &str) -> MediaItem {
    MediaItem {
        title: title.to_string(),
        kind: "image".to_string(),
        srcset: vec![SrcSet {
            src: src.to_string(),
            scale: Some("1x".to_string()),
        }],
    }
}

pub fn summary(title: &str, extract: &str, thumb: Option<&str>) -> PageSummary {
    PageSummary {
        title: title.to_string(),
        extract: Some(extract.to_string()),
        description: None,
        thumbnail: thumb.map(|s| ImageRef {
            source: s.to_string(),
            width: Some(320),
            height: Some(240),
        }),
        originalimage: None,
        content_urls: None,
    }
}
