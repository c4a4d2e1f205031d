//! Records produced by the resolution pipeline.

use serde::{Deserialize, Serialize};

pub const SOURCE_WIKIPEDIA_API: &str = "Wikipedia API";
pub const SOURCE_SEARCH_API: &str = "Wikipedia Search API";
pub const SOURCE_SUMMARY: &str = "Wikipedia Summary";
pub const SOURCE_CURATED: &str = "Curated local event";
pub const SOURCE_GENERATED: &str = "Generated contextual event";
pub const SOURCE_CUSTOM: &str = "Custom user event";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Birth,
    Death,
    #[default]
    Event,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventRecord {
    pub year: i32,
    pub date: Option<String>,
    pub name: String,
    pub text: String,
    pub source: String,
    #[serde(default)]
    pub kind: EventKind,
    pub media: Option<MediaRecord>,
    /// Unprocessed upstream payload, kept for re-derivation.
    #[serde(default)]
    pub raw_event: Option<serde_json::Value>,
    /// Creation time, epoch ms.
    pub timestamp: i64,
}

impl EventRecord {
    pub fn new(year: i32, name: impl Into<String>, text: impl Into<String>, source: &str) -> Self {
        Self {
            year,
            date: None,
            name: name.into(),
            text: text.into(),
            source: source.to_string(),
            kind: EventKind::Event,
            media: None,
            raw_event: None,
            timestamp: now_ms(),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.source == SOURCE_GENERATED || self.source == SOURCE_CURATED
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Audio,
    Video,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MediaRecord {
    #[serde(rename = "type")]
    pub kind: MediaKind,
    pub url: String,
    pub alt: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub source: String,
    /// Alternate URL tried when the primary one fails to load.
    pub fallback: Option<String>,
}

const AUDIO_EXT: &[&str] = &[".mp3", ".ogg", ".oga", ".wav", ".m4a", ".flac"];
const VIDEO_EXT: &[&str] = &[".mp4", ".webm", ".ogv", ".avi", ".mov"];
const IMAGE_EXT: &[&str] = &[".jpg", ".jpeg", ".png", ".gif", ".webp", ".svg", ".tif", ".tiff"];
const IMAGE_HOSTS: &[&str] = &["upload.wikimedia.org", "commons.wikimedia.org"];

impl MediaRecord {
    pub fn image(url: impl Into<String>, alt: impl Into<String>, source: &str) -> Self {
        Self {
            kind: MediaKind::Image,
            url: url.into(),
            alt: Some(alt.into()),
            title: None,
            description: None,
            source: source.to_string(),
            fallback: None,
        }
    }

    /// Media kind implied by the URL, if any.
    ///
    /// Extensions win over hosts: an `.ogg` on upload.wikimedia.org is audio.
    pub fn kind_from_url(url: &str) -> Option<MediaKind> {
        let path = url
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        if AUDIO_EXT.iter().any(|e| path.ends_with(e)) {
            return Some(MediaKind::Audio);
        }
        if VIDEO_EXT.iter().any(|e| path.ends_with(e)) {
            return Some(MediaKind::Video);
        }
        if IMAGE_EXT.iter().any(|e| path.contains(e)) {
            return Some(MediaKind::Image);
        }
        if url_host(url).is_some_and(|h| IMAGE_HOSTS.contains(&h.as_str())) {
            return Some(MediaKind::Image);
        }
        None
    }

    /// Re-derive `kind` from the URL before display.
    pub fn corrected(mut self) -> Self {
        if let Some(k) = Self::kind_from_url(&self.url) {
            if k != self.kind {
                tracing::debug!(
                    target: "media",
                    from = ?self.kind,
                    to = ?k,
                    url = %self.url,
                    "correcting media type"
                );
                self.kind = k;
            }
        }
        self
    }
}

/// Host of an absolute or protocol-relative URL, lower-cased.
pub fn url_host(url: &str) -> Option<String> {
    let url = url.trim();
    let parsed = match url.strip_prefix("//") {
        Some(rest) => reqwest::Url::parse(&format!("https://{rest}")),
        None => reqwest::Url::parse(url),
    }
    .ok()?;
    parsed.host_str().map(str::to_ascii_lowercase)
}

pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
