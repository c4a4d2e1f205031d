// src/strategy/on_this_day.rs
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::cache::{date_key, TtlCache};
use crate::classify::{self, FeedSection};
use crate::config::TimelineConfig;
use crate::error::ResolveError;
use crate::model::{EventRecord, SOURCE_WIKIPEDIA_API};
use crate::text;
use crate::wiki::{FeedItem, OnThisDayFeed, WikiApi};

use super::{Picker, Strategy};

/// Dates whose feeds are reliably populated upstream.
pub const KNOWN_DATES: &[(u32, u32)] = &[
    (1, 1),
    (7, 4),
    (12, 25),
    (3, 15),
    (6, 21),
    (9, 11),
    (11, 11),
    (4, 14),
    (10, 31),
    (5, 8),
    (8, 15),
    (2, 14),
];

#[derive(Debug, Clone)]
pub struct FeedCandidate {
    pub item: FeedItem,
    pub section: FeedSection,
    pub year: i32,
    pub distance: i32,
}

fn kind_rank(section: FeedSection) -> u8 {
    match section {
        FeedSection::Events => 0,
        FeedSection::Deaths => 1,
        FeedSection::Births => 2,
    }
}

/// Items with a year and text; births/deaths only for notable people.
pub fn feed_candidates(feed: &OnThisDayFeed, year: i32) -> Vec<FeedCandidate> {
    feed.tagged()
        .filter_map(|(section, item)| {
            let item_year = item.year?;
            if item.text.trim().is_empty() {
                return None;
            }
            if section != FeedSection::Events
                && !classify::is_notable_person(&item.text, !item.pages.is_empty())
            {
                return None;
            }
            Some(FeedCandidate {
                item: item.clone(),
                section,
                year: item_year,
                distance: (item_year - year).abs(),
            })
        })
        .collect()
}

/// Best tier for the first widening step that has any candidate:
/// closest year first, then events over deaths over births.
pub fn best_tier(candidates: &[FeedCandidate], steps: &[i32]) -> Vec<FeedCandidate> {
    for step in steps {
        let within: Vec<&FeedCandidate> = candidates
            .iter()
            .filter(|c| c.distance <= *step)
            .collect();
        let Some(closest) = within.iter().map(|c| c.distance).min() else {
            continue;
        };
        let Some(rank) = within
            .iter()
            .filter(|c| c.distance == closest)
            .map(|c| kind_rank(c.section))
            .min()
        else {
            continue;
        };
        return within
            .into_iter()
            .filter(|c| c.distance == closest && kind_rank(c.section) == rank)
            .cloned()
            .collect();
    }
    Vec::new()
}

pub fn record_from_candidate(
    c: &FeedCandidate,
    requested: i32,
    month: u32,
    day: u32,
) -> EventRecord {
    let cls = classify::classify(&c.item.text, Some(c.section));
    let source = if c.year == requested {
        SOURCE_WIKIPEDIA_API.to_string()
    } else {
        format!("{SOURCE_WIKIPEDIA_API} ({})", c.year)
    };
    let mut rec = EventRecord::new(c.year, cls.name, cls.description, &source);
    rec.kind = cls.kind;
    rec.date = text::format_month_day(month, day).or(cls.date);
    rec.raw_event = serde_json::to_value(&c.item).ok();
    rec
}

pub struct OnThisDayStrategy {
    wiki: Arc<dyn WikiApi>,
    picker: Arc<Picker>,
    feeds: TtlCache<OnThisDayFeed>,
    steps: Vec<i32>,
}

impl OnThisDayStrategy {
    pub fn new(wiki: Arc<dyn WikiApi>, picker: Arc<Picker>, cfg: &TimelineConfig) -> Self {
        Self {
            wiki,
            picker,
            feeds: TtlCache::new(
                cfg.feed_cache_capacity,
                Duration::from_secs(cfg.cache_ttl_secs),
            ),
            steps: cfg.effective_widening_steps(),
        }
    }

    async fn feed(&self, month: u32, day: u32) -> Result<OnThisDayFeed, ResolveError> {
        let key = date_key(month, day);
        if let Some(feed) = self.feeds.get(&key) {
            tracing::trace!(target: "strategy", key = %key, "feed cache hit");
            return Ok(feed);
        }
        let feed = self.wiki.on_this_day(month, day).await?;
        self.feeds.set(key, feed.clone());
        Ok(feed)
    }
}

#[async_trait]
impl Strategy for OnThisDayStrategy {
    fn name(&self) -> &'static str {
        "on_this_day"
    }

    async fn attempt(&self, year: i32) -> Result<EventRecord, ResolveError> {
        let &(month, day) = self
            .picker
            .pick(KNOWN_DATES)
            .ok_or_else(|| ResolveError::NotFound("no feed dates".into()))?;

        let feed = self.feed(month, day).await?;
        if feed.is_empty() {
            return Err(ResolveError::NotFound(format!("empty feed for {month}/{day}")));
        }

        let candidates = feed_candidates(&feed, year);
        let tier = best_tier(&candidates, &self.steps);
        let chosen = self.picker.pick(&tier).ok_or_else(|| {
            ResolveError::NotFound(format!(
                "no feed item near {year} on {month}/{day} ({} items)",
                candidates.len()
            ))
        })?;

        let rec = record_from_candidate(chosen, year, month, day);
        tracing::debug!(
            target: "strategy",
            year,
            item_year = chosen.year,
            section = ?chosen.section,
            kind = ?rec.kind,
            "feed candidate chosen"
        );
        Ok(rec)
    }
}
