// src/strategy/search.rs
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ResolveError;
use crate::model::{EventRecord, SOURCE_SEARCH_API};
use crate::text;
use crate::wiki::{SearchHit, WikiApi};

use super::summary::summarize_title;
use super::{Picker, Strategy};

pub const QUERY_SUFFIXES: &[&str] = &[
    "events",
    "history",
    "war",
    "politics",
    "invention",
    "discovery",
];

const HITS_PER_QUERY: u32 = 10;

/// Hits worth summarizing: title/snippet mention the year (±1) and the title
/// survives cleanup and the quality filters.
pub fn usable_hits(hits: &[SearchHit], year: i32) -> Vec<String> {
    hits.iter()
        .filter(|h| {
            let haystack = format!("{} {}", h.title, text::normalize_text(&h.snippet));
            text::mentions_year_near(&haystack, year, 1)
        })
        .filter_map(|h| text::clean_page_title(&h.title))
        .filter(|t| !text::is_low_quality_term(t))
        .filter(|t| text::check_historical_plausibility(t, year).is_ok())
        .collect()
}

pub struct SearchStrategy {
    wiki: Arc<dyn WikiApi>,
    picker: Arc<Picker>,
}

impl SearchStrategy {
    pub fn new(wiki: Arc<dyn WikiApi>, picker: Arc<Picker>) -> Self {
        Self { wiki, picker }
    }
}

#[async_trait]
impl Strategy for SearchStrategy {
    fn name(&self) -> &'static str {
        "search"
    }

    async fn attempt(&self, year: i32) -> Result<EventRecord, ResolveError> {
        let mut last_err = None;

        for suffix in QUERY_SUFFIXES {
            let query = format!("{year} {suffix}");
            let hits = match self.wiki.search(&query, HITS_PER_QUERY).await {
                Ok(h) => h,
                Err(e) => {
                    tracing::debug!(target: "strategy", query = %query, error = %e, "search failed");
                    last_err = Some(e);
                    continue;
                }
            };

            let titles = usable_hits(&hits, year);
            let Some(title) = self.picker.pick(&titles) else {
                continue;
            };

            match summarize_title(self.wiki.as_ref(), title, year, SOURCE_SEARCH_API).await {
                Ok(rec) => return Ok(rec),
                Err(e) => {
                    tracing::debug!(target: "strategy", title = %title, error = %e, "search hit unusable");
                    last_err = Some(e);
                }
            }
        }

        Err(last_err.unwrap_or_else(|| {
            ResolveError::NotFound(format!("no search hit mentions {year}"))
        }))
    }
}
