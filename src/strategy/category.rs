// src/strategy/category.rs
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ResolveError;
use crate::model::{EventRecord, SOURCE_SUMMARY};
use crate::text;
use crate::wiki::WikiApi;

use super::summary::summarize_title;
use super::{Picker, Strategy};

const MEMBERS_PER_CATEGORY: u32 = 20;

/// `Category:<year>`, `Category:<year>_events`, `Category:<decade>s`.
pub fn categories_for(year: i32) -> Vec<String> {
    let decade = year - year.rem_euclid(10);
    vec![
        year.to_string(),
        format!("{year}_events"),
        format!("{decade}s"),
    ]
}

pub struct CategoryStrategy {
    wiki: Arc<dyn WikiApi>,
    picker: Arc<Picker>,
}

impl CategoryStrategy {
    pub fn new(wiki: Arc<dyn WikiApi>, picker: Arc<Picker>) -> Self {
        Self { wiki, picker }
    }
}

#[async_trait]
impl Strategy for CategoryStrategy {
    fn name(&self) -> &'static str {
        "category"
    }

    async fn attempt(&self, year: i32) -> Result<EventRecord, ResolveError> {
        let mut last_err = None;

        for category in categories_for(year) {
            let members = match self
                .wiki
                .category_members(&category, MEMBERS_PER_CATEGORY)
                .await
            {
                Ok(m) => m,
                Err(e) => {
                    last_err = Some(e);
                    continue;
                }
            };

            let titles: Vec<String> = members
                .iter()
                .filter_map(|t| text::clean_page_title(t))
                .filter(|t| !text::is_low_quality_term(t))
                .filter(|t| text::check_historical_plausibility(t, year).is_ok())
                .collect();
            let Some(title) = self.picker.pick(&titles) else {
                continue;
            };

            match summarize_title(self.wiki.as_ref(), title, year, SOURCE_SUMMARY).await {
                Ok(mut rec) => {
                    let page_url = rec
                        .raw_event
                        .as_ref()
                        .and_then(|v| v.pointer("/content_urls/desktop/page"))
                        .and_then(|v| v.as_str())
                        .map(str::to_string);
                    if let Some(url) = page_url {
                        rec.source = url;
                    }
                    tracing::debug!(target: "strategy", category = %category, title = %title, "category member chosen");
                    return Ok(rec);
                }
                Err(e) => last_err = Some(e),
            }
        }

        Err(last_err.unwrap_or_else(|| {
            ResolveError::NotFound(format!("no usable category member for {year}"))
        }))
    }
}
