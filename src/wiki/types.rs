// src/wiki/types.rs
use serde::{Deserialize, Serialize};

use crate::classify::FeedSection;

/// `/feed/onthisday/all/{MM}/{DD}`; sections missing upstream decode empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OnThisDayFeed {
    #[serde(default)]
    pub events: Vec<FeedItem>,
    #[serde(default)]
    pub births: Vec<FeedItem>,
    #[serde(default)]
    pub deaths: Vec<FeedItem>,
    #[serde(default)]
    pub selected: Vec<FeedItem>,
}

impl OnThisDayFeed {
    /// All items tagged with their section. `selected` counts as events.
    pub fn tagged(&self) -> impl Iterator<Item = (FeedSection, &FeedItem)> {
        self.events
            .iter()
            .chain(self.selected.iter())
            .map(|i| (FeedSection::Events, i))
            .chain(self.births.iter().map(|i| (FeedSection::Births, i)))
            .chain(self.deaths.iter().map(|i| (FeedSection::Deaths, i)))
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
            && self.births.is_empty()
            && self.deaths.is_empty()
            && self.selected.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedItem {
    pub year: Option<i32>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub pages: Vec<FeedPage>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedPage {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub extract: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<ImageRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchHit {
    pub title: String,
    #[serde(default)]
    pub snippet: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImageRef {
    pub source: String,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

/// `/page/summary/{title}`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PageSummary {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub extract: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<ImageRef>,
    #[serde(default)]
    pub originalimage: Option<ImageRef>,
    #[serde(default)]
    pub content_urls: Option<ContentUrls>,
}

impl PageSummary {
    pub fn page_url(&self) -> Option<&str> {
        self.content_urls
            .as_ref()?
            .desktop
            .as_ref()
            .map(|d| d.page.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContentUrls {
    pub desktop: Option<PageUrl>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PageUrl {
    pub page: String,
}

/// One entry of `/page/media-list/{title}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MediaItem {
    #[serde(default)]
    pub title: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub srcset: Vec<SrcSet>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SrcSet {
    pub src: String,
    #[serde(default)]
    pub scale: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MediaList {
    #[serde(default)]
    pub items: Vec<MediaItem>,
}

// Action API envelopes.

#[derive(Debug, Deserialize)]
pub(crate) struct QueryEnvelope {
    #[serde(default)]
    pub query: Option<QueryBody>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct QueryBody {
    #[serde(default)]
    pub search: Vec<SearchHit>,
    #[serde(default)]
    pub categorymembers: Vec<CategoryMember>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CategoryMember {
    pub title: String,
    #[serde(default)]
    pub ns: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feed_tolerates_missing_sections() {
        let json = r#"{"events":[{"year":1969,"text":"Apollo 11 lands.","pages":[{"title":"Apollo_11"}]}]}"#;
        let feed: OnThisDayFeed = serde_json::from_str(json).unwrap();
        assert_eq!(feed.events.len(), 1);
        assert!(feed.births.is_empty());
        let tagged: Vec<_> = feed.tagged().collect();
        assert_eq!(tagged[0].0, FeedSection::Events);
        assert_eq!(tagged[0].1.pages[0].title, "Apollo_11");
    }

    #[test]
    fn summary_page_url() {
        let json = r#"{"title":"1912","extract":"x","content_urls":{"desktop":{"page":"https://en.wikipedia.org/wiki/1912"}}}"#;
        let s: PageSummary = serde_json::from_str(json).unwrap();
        assert_eq!(s.page_url(), Some("https://en.wikipedia.org/wiki/1912"));
    }

    #[test]
    fn media_list_item_type_field() {
        let json = r#"{"items":[{"title":"File:A.jpg","type":"image","srcset":[{"src":"//upload.wikimedia.org/a.jpg","scale":"1x"}]}]}"#;
        let list: MediaList = serde_json::from_str(json).unwrap();
        assert_eq!(list.items[0].kind, "image");
        assert_eq!(list.items[0].srcset[0].src, "//upload.wikimedia.org/a.jpg");
    }
}
