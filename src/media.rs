//! Media resolution: attach an image or audio clip to a resolved event.
//!
//! Stages run in order and the first validated URL wins: curated media,
//! page thumbnail (taken from the record's own payload when present, else
//! refetched), page media list, Commons file search, Commons categories.
//! Every failure degrades to `None`; results (including `None`) are cached
//! by `<year>-<name>`.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::cache::{media_key, TtlCache};
use crate::config::TimelineConfig;
use crate::fallback;
use crate::model::{url_host, EventRecord, MediaRecord};
use crate::rate_limit::RateLimiter;
use crate::text;
use crate::wiki::{commons_file_url, WikiApi};

pub const SOURCE_PAGE_IMAGE: &str = "Wikipedia page image";
pub const SOURCE_PAGE_MEDIA: &str = "Wikipedia page media";
pub const SOURCE_COMMONS: &str = "Wikimedia Commons";

const TRUSTED_HOSTS: &[&str] = &[
    "upload.wikimedia.org",
    "commons.wikimedia.org",
    "en.wikipedia.org",
];
const IMAGE_URL_EXT: &[&str] = &[".jpg", ".jpeg", ".png", ".gif", ".webp"];

const MAX_SEARCH_TERMS: usize = 3;
const FILES_PER_SEARCH: u32 = 3;
const FILES_PER_CATEGORY: u32 = 5;

static RE_CAPITALIZED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([A-Z][a-z]+(?:\s+(?:of\s+)?[A-Z][a-z]+)*)\b").unwrap());
static RE_NAMED_EVENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:Battle|Treaty|War|Siege|Revolution|Declaration|Invasion|Assassination) of (?:the )?[A-Z][A-Za-z]+(?:\s+[A-Z][A-Za-z]+)*").unwrap()
});
static RE_THUMB_SIZE: Lazy<Regex> = Lazy::new(|| Regex::new(r"/(?:320|240)px-").unwrap());

const STOP_WORDS: &[&str] = &[
    "The", "This", "That", "During", "After", "Before", "When", "While", "In", "On", "At",
    "Historical", "Event", "Events",
];

/// Search terms for Commons: named events first, then capitalized phrases,
/// then a generic `<year> historical events`.
pub fn extract_media_search_terms(event: &EventRecord) -> Vec<String> {
    let haystack = format!("{}. {}", event.name, event.text);
    let mut terms: Vec<String> = Vec::new();
    let mut push = |t: String| {
        if !terms.iter().any(|x| x.eq_ignore_ascii_case(&t)) {
            terms.push(t);
        }
    };

    for m in RE_NAMED_EVENT.find_iter(&haystack) {
        push(m.as_str().trim().to_string());
    }
    for c in RE_CAPITALIZED.captures_iter(&haystack) {
        let Some(phrase) = c.get(1).map(|m| m.as_str().trim()) else {
            continue;
        };
        // "The Allied Powers" -> "Allied Powers"
        let phrase = phrase
            .split_once(' ')
            .filter(|(first, _)| STOP_WORDS.contains(first))
            .map(|(_, rest)| rest.trim())
            .unwrap_or(phrase);
        if STOP_WORDS.contains(&phrase) || phrase.len() <= 3 {
            continue;
        }
        push(phrase.to_string());
    }
    push(format!("{} historical events", event.year));

    terms
        .into_iter()
        .filter(|t| !text::is_low_quality_term(t))
        .collect()
}

/// `/320px-` and `/240px-` thumbnails rewritten to `/800px-`.
pub fn upgrade_thumbnail(url: &str) -> String {
    RE_THUMB_SIZE.replace(url, "/800px-").into_owned()
}

fn absolutize(url: &str) -> String {
    if let Some(rest) = url.strip_prefix("//") {
        format!("https://{rest}")
    } else {
        url.to_string()
    }
}

/// Exact host match; a trusted name in the path or query does not count.
pub fn is_trusted_host(url: &str) -> bool {
    url_host(url).is_some_and(|h| TRUSTED_HOSTS.contains(&h.as_str()))
}

/// Trusted-host URLs pass on an image extension or a server-side `width=`.
pub fn passes_static_check(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    is_trusted_host(url)
        && (IMAGE_URL_EXT.iter().any(|e| lower.contains(e)) || lower.contains("width="))
}

fn ordinal_suffix(n: i32) -> &'static str {
    match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    }
}

/// Commons categories by year, decade and century.
pub fn commons_categories_for(year: i32) -> Vec<String> {
    let decade = year - year.rem_euclid(10);
    let century = (year - 1).div_euclid(100) + 1;
    vec![
        year.to_string(),
        format!("{decade}s"),
        format!("{century}{} century", ordinal_suffix(century)),
    ]
}

/// Page titles worth asking about: the upstream page behind the record,
/// then the cleaned record name.
pub fn page_titles_for(event: &EventRecord) -> Vec<String> {
    let mut titles = Vec::new();
    if let Some(raw) = event.raw_event.as_ref() {
        for ptr in ["/title", "/pages/0/title"] {
            if let Some(t) = raw.pointer(ptr).and_then(|v| v.as_str()) {
                titles.push(t.replace('_', " "));
            }
        }
    }
    let name = event
        .name
        .trim_end_matches("...")
        .trim_end_matches(" is born")
        .trim_end_matches(" dies");
    if let Some(t) = text::clean_page_title(name) {
        titles.push(t);
    }
    titles.dedup();
    titles
        .into_iter()
        .filter(|t| !text::is_low_quality_term(t))
        .collect()
}

/// Image already carried by the payload behind the record: the summary's
/// own thumbnail or original image, else the first feed page's thumbnail.
/// Returns the URL together with the JSON object it came from.
pub fn embedded_image(event: &EventRecord) -> Option<(String, &serde_json::Value)> {
    let raw = event.raw_event.as_ref()?;
    std::iter::once(raw)
        .chain(raw.pointer("/pages/0"))
        .find_map(|page| {
            let thumb = page
                .pointer("/thumbnail/source")
                .and_then(|v| v.as_str())
                .map(upgrade_thumbnail);
            let url = thumb.or_else(|| {
                page.pointer("/originalimage/source")
                    .and_then(|v| v.as_str())
                    .map(str::to_string)
            })?;
            Some((absolutize(&url), page))
        })
}

pub struct MediaResolver {
    wiki: Arc<dyn WikiApi>,
    limiter: RateLimiter,
    cache: TtlCache<Option<MediaRecord>>,
}

impl MediaResolver {
    pub fn new(wiki: Arc<dyn WikiApi>, cfg: &TimelineConfig) -> Self {
        Self {
            wiki,
            limiter: RateLimiter::from_millis(cfg.media_rate_limit_ms),
            cache: TtlCache::new(
                cfg.media_cache_capacity,
                Duration::from_secs(cfg.cache_ttl_secs),
            ),
        }
    }

    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Never errors; `None` means no acceptable media was found.
    pub async fn resolve(&self, event: &EventRecord) -> Option<MediaRecord> {
        let key = media_key(event.year, &event.name);
        if let Some(hit) = self.cache.get(&key) {
            tracing::trace!(target: "media", key = %key, found = hit.is_some(), "media cache hit");
            return hit;
        }

        self.limiter.await_slot().await;
        let found = self.lookup(event).await.map(MediaRecord::corrected);

        let stage = match &found {
            Some(m) => m.source.clone(),
            None => "none".to_string(),
        };
        counter!("media_resolved_total", "stage" => stage.clone()).increment(1);
        tracing::debug!(target: "media", key = %key, stage = %stage, "media resolved");

        self.cache.set(key, found.clone());
        found
    }

    async fn lookup(&self, event: &EventRecord) -> Option<MediaRecord> {
        if let Some(m) = fallback::curated_media(event.year) {
            return Some(m);
        }

        // The summary is only refetched for pages whose payload had no image.
        let embedded_page = match embedded_image(event) {
            Some((url, page)) => {
                let title = page
                    .get("title")
                    .and_then(|v| v.as_str())
                    .map(|t| t.replace('_', " "))
                    .filter(|t| !t.trim().is_empty())
                    .unwrap_or_else(|| event.name.clone());
                let description = page.get("description").and_then(|v| v.as_str());
                if let Some(m) = self.page_image(url, &title, description).await {
                    return Some(m);
                }
                Some(title)
            }
            None => None,
        };

        for title in page_titles_for(event) {
            if embedded_page.as_deref() != Some(title.as_str()) {
                if let Some(m) = self.from_page_summary(&title).await {
                    return Some(m);
                }
            }
            if let Some(m) = self.from_page_media(&title).await {
                return Some(m);
            }
        }

        for term in extract_media_search_terms(event)
            .into_iter()
            .take(MAX_SEARCH_TERMS)
        {
            match self.wiki.commons_search(&term, FILES_PER_SEARCH).await {
                Ok(files) => {
                    if let Some(m) = self.first_valid_file(&files, &term).await {
                        return Some(m);
                    }
                }
                Err(e) => {
                    tracing::debug!(target: "media", term = %term, error = %e, "commons search failed")
                }
            }
        }

        for category in commons_categories_for(event.year) {
            match self
                .wiki
                .commons_category_files(&category, FILES_PER_CATEGORY)
                .await
            {
                Ok(files) => {
                    if let Some(m) = self.first_valid_file(&files, &category).await {
                        return Some(m);
                    }
                }
                Err(e) => {
                    tracing::debug!(target: "media", category = %category, error = %e, "commons category failed")
                }
            }
        }

        None
    }

    async fn from_page_summary(&self, title: &str) -> Option<MediaRecord> {
        let summary = match self.wiki.page_summary(title).await {
            Ok(s) => s,
            Err(e) => {
                tracing::debug!(target: "media", title, error = %e, "summary lookup failed");
                return None;
            }
        };
        let url = summary
            .thumbnail
            .as_ref()
            .map(|t| upgrade_thumbnail(&t.source))
            .or_else(|| summary.originalimage.as_ref().map(|i| i.source.clone()))?;
        self.page_image(absolutize(&url), title, summary.description.as_deref())
            .await
    }

    async fn page_image(
        &self,
        url: String,
        title: &str,
        description: Option<&str>,
    ) -> Option<MediaRecord> {
        if !self.validate_image_url(&url).await {
            return None;
        }
        let alt = description
            .map(str::to_string)
            .unwrap_or_else(|| format!("Image related to {title}"));
        let mut m = MediaRecord::image(url, alt, SOURCE_PAGE_IMAGE);
        m.title = Some(title.to_string());
        Some(m)
    }

    async fn from_page_media(&self, title: &str) -> Option<MediaRecord> {
        let items = self.wiki.page_media(title).await.ok()?;
        for item in items.iter().filter(|i| i.kind == "image") {
            let lower_title = item.title.to_ascii_lowercase();
            if lower_title.contains("commons-logo") || lower_title.ends_with(".svg") {
                continue;
            }
            let Some(src) = item
                .srcset
                .iter()
                .map(|s| absolutize(&s.src))
                .find(|s| {
                    url_host(s).as_deref() == Some("upload.wikimedia.org")
                        && !s.to_ascii_lowercase().contains(".svg")
                })
            else {
                continue;
            };
            if self.validate_image_url(&src).await {
                let alt = item.title.trim_start_matches("File:").to_string();
                let mut m = MediaRecord::image(src, alt, SOURCE_PAGE_MEDIA);
                m.title = Some(title.to_string());
                return Some(m);
            }
        }
        None
    }

    async fn first_valid_file(&self, files: &[String], context: &str) -> Option<MediaRecord> {
        for file in files {
            if file.to_ascii_lowercase().ends_with(".svg") {
                continue;
            }
            let url = commons_file_url(file);
            if self.validate_image_url(&url).await {
                let alt = file.trim_start_matches("File:").to_string();
                let mut m = MediaRecord::image(url, alt, SOURCE_COMMONS);
                m.description = Some(context.to_string());
                return Some(m);
            }
        }
        None
    }

    /// Static check for trusted hosts, otherwise a HEAD probe that must
    /// report an `image/*` content type. A failed probe rejects.
    pub async fn validate_image_url(&self, url: &str) -> bool {
        if passes_static_check(url) {
            return true;
        }
        match self.wiki.probe(url).await {
            Ok(ct) => ct.to_ascii_lowercase().starts_with("image/"),
            Err(e) => {
                tracing::debug!(target: "media", url, error = %e, "probe failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SOURCE_WIKIPEDIA_API;

    #[test]
    fn thumbnails_upgraded() {
        assert_eq!(
            upgrade_thumbnail("https://upload.wikimedia.org/a/b/320px-X.jpg"),
            "https://upload.wikimedia.org/a/b/800px-X.jpg"
        );
        assert_eq!(
            upgrade_thumbnail("https://upload.wikimedia.org/a/b/240px-X.jpg"),
            "https://upload.wikimedia.org/a/b/800px-X.jpg"
        );
        assert_eq!(upgrade_thumbnail("https://x.org/640px-X.jpg"), "https://x.org/640px-X.jpg");
    }

    #[test]
    fn static_check_requires_trusted_host() {
        assert!(passes_static_check("https://upload.wikimedia.org/a.jpg"));
        assert!(passes_static_check(
            "https://commons.wikimedia.org/wiki/Special:FilePath/A?width=600"
        ));
        assert!(!passes_static_check("https://example.org/a.jpg"));
        assert!(!passes_static_check("https://upload.wikimedia.org/a.ogg"));
    }

    #[test]
    fn trusted_name_outside_the_host_is_not_trusted() {
        let spoofed = "https://evil.example.com/upload.wikimedia.org/payload.jpg";
        assert!(!is_trusted_host(spoofed));
        assert!(!passes_static_check(spoofed));
        assert!(!passes_static_check("https://example.org/a.jpg?via=upload.wikimedia.org"));
        assert!(!is_trusted_host("https://en.wikipedia.org.example.net/a.jpg"));
        assert!(is_trusted_host("//upload.wikimedia.org/wikipedia/commons/a/a1/Moon.jpg"));
    }

    #[test]
    fn century_names() {
        assert_eq!(commons_categories_for(1969), vec!["1969", "1960s", "20th century"]);
        assert_eq!(commons_categories_for(2001), vec!["2001", "2000s", "21st century"]);
        assert_eq!(commons_categories_for(1200), vec!["1200", "1200s", "12th century"]);
    }

    #[test]
    fn search_terms_prefer_named_events() {
        let rec = EventRecord::new(
            1919,
            "Treaty of Versailles signed",
            "The Allied Powers sign the Treaty of Versailles with Germany in Paris.",
            SOURCE_WIKIPEDIA_API,
        );
        let terms = extract_media_search_terms(&rec);
        assert_eq!(terms[0], "Treaty of Versailles");
        assert!(terms.contains(&"Allied Powers".to_string()));
        assert!(terms.contains(&"1919 historical events".to_string()));
        assert!(!terms.contains(&"The".to_string()));
    }

    #[test]
    fn embedded_image_from_summary_or_feed_page() {
        let mut rec = EventRecord::new(1957, "Sputnik 1", "x", SOURCE_WIKIPEDIA_API);
        assert!(embedded_image(&rec).is_none());

        rec.raw_event = Some(serde_json::json!({
            "title": "Sputnik 1",
            "thumbnail": null,
            "originalimage": {"source": "//upload.wikimedia.org/a/Sputnik.jpg"}
        }));
        let (url, page) = embedded_image(&rec).unwrap();
        assert_eq!(url, "https://upload.wikimedia.org/a/Sputnik.jpg");
        assert_eq!(page["title"], "Sputnik 1");

        rec.raw_event = Some(serde_json::json!({
            "text": "Sputnik 1 is launched.",
            "pages": [{"title": "Sputnik_1", "thumbnail": {"source": "https://upload.wikimedia.org/t/320px-S.jpg"}}]
        }));
        let (url, page) = embedded_image(&rec).unwrap();
        assert_eq!(url, "https://upload.wikimedia.org/t/800px-S.jpg");
        assert_eq!(page["title"], "Sputnik_1");
    }

    #[test]
    fn page_titles_from_raw_and_name() {
        let mut rec = EventRecord::new(1969, "Neil Armstrong is born", "x", SOURCE_WIKIPEDIA_API);
        rec.raw_event = Some(serde_json::json!({"pages": [{"title": "Apollo_11"}]}));
        assert_eq!(page_titles_for(&rec), vec!["Apollo 11", "Neil Armstrong"]);
    }
}
