// src/strategy/summary.rs
use std::sync::Arc;

use async_trait::async_trait;

use crate::classify::{classify_kind, RuleInput};
use crate::error::ResolveError;
use crate::model::{EventRecord, SOURCE_SUMMARY};
use crate::text::{self, MAX_NAME_CHARS, MAX_TEXT_CHARS};
use crate::wiki::WikiApi;

use super::Strategy;

/// Extracts at or below this length are stubs.
pub const MIN_EXTRACT_CHARS: usize = 50;

/// Fetch a page summary and turn it into a record dated `year`.
///
/// Shared by the search and category strategies. Implausible titles are
/// rejected before any request is made.
pub async fn summarize_title(
    wiki: &dyn WikiApi,
    title: &str,
    year: i32,
    source: &str,
) -> Result<EventRecord, ResolveError> {
    text::check_historical_plausibility(title, year).map_err(ResolveError::Validation)?;

    let summary = wiki.page_summary(title).await?;
    let extract = text::normalize_text(summary.extract.as_deref().unwrap_or_default());
    if extract.chars().count() <= MIN_EXTRACT_CHARS {
        return Err(ResolveError::NotFound(format!(
            "summary for '{title}' too short"
        )));
    }
    if let Some(desc) = summary.description.as_deref() {
        text::check_historical_plausibility(desc, year).map_err(ResolveError::Validation)?;
    }

    let display_title = if summary.title.trim().is_empty() {
        title.to_string()
    } else {
        text::normalize_text(&summary.title)
    };
    let name = text::clean_page_title(&display_title).unwrap_or(display_title);

    let mut rec = EventRecord::new(
        year,
        text::truncate_chars(&name, MAX_NAME_CHARS),
        text::truncate_at_sentence(&text::strip_wiki_markup(&extract), MAX_TEXT_CHARS),
        source,
    );
    rec.kind = classify_kind(&RuleInput::new(text::first_sentence(&extract), None)).0;
    rec.date = text::extract_month_day(&extract);
    rec.raw_event = serde_json::to_value(&summary).ok();
    Ok(rec)
}

/// Summary of the year's own page (`/page/summary/<year>`). The page covers
/// a whole year, so the record stays a generic event.
pub struct PageSummaryStrategy {
    wiki: Arc<dyn WikiApi>,
}

impl PageSummaryStrategy {
    pub fn new(wiki: Arc<dyn WikiApi>) -> Self {
        Self { wiki }
    }
}

#[async_trait]
impl Strategy for PageSummaryStrategy {
    fn name(&self) -> &'static str {
        "page_summary"
    }

    async fn attempt(&self, year: i32) -> Result<EventRecord, ResolveError> {
        let summary = self.wiki.page_summary(&year.to_string()).await?;
        let extract = text::normalize_text(summary.extract.as_deref().unwrap_or_default());
        if extract.chars().count() <= MIN_EXTRACT_CHARS {
            return Err(ResolveError::NotFound(format!("year page {year} has no usable extract")));
        }

        let mut rec = EventRecord::new(
            year,
            text::truncate_chars(&text::extract_event_name(&extract), MAX_NAME_CHARS),
            text::truncate_at_sentence(&text::strip_wiki_markup(&extract), MAX_TEXT_CHARS),
            SOURCE_SUMMARY,
        );
        rec.date = text::extract_month_day(&extract);
        rec.raw_event = serde_json::to_value(&summary).ok();
        tracing::debug!(target: "strategy", year, "year page summary");
        Ok(rec)
    }
}
