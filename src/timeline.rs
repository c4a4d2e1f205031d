// src/timeline.rs
//! Year range, paging and search over the texts a user would see
//! (custom note, else curated text).

use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use serde::Serialize;

use crate::config::TimelineConfig;
use crate::fallback;
use crate::store::CustomEventStore;

pub const NO_EVENT_TEXT: &str = "No event recorded for this year. You can add one using the editor.";

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EntrySource {
    Custom,
    Curated,
    None,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct YearEntry {
    pub year: i32,
    pub text: String,
    pub source: EntrySource,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TimelinePage {
    pub page: usize,
    pub total_pages: usize,
    pub years: Vec<YearEntry>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SearchMatch {
    pub year: i32,
    pub page: usize,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct Timeline {
    start_year: i32,
    end_year: i32,
    per_page: usize,
}

impl Timeline {
    pub fn new(start_year: i32, end_year: i32, per_page: usize) -> Self {
        Self {
            start_year,
            end_year: end_year.max(start_year),
            per_page: per_page.max(1),
        }
    }

    pub fn from_config(cfg: &TimelineConfig) -> Self {
        Self::new(cfg.start_year, TimelineConfig::current_year(), cfg.years_per_page)
    }

    pub fn years(&self) -> impl Iterator<Item = i32> {
        self.range()
    }

    /// Years a custom note may be saved or imported for.
    pub fn range(&self) -> RangeInclusive<i32> {
        self.start_year..=self.end_year
    }

    pub fn len(&self) -> usize {
        (self.end_year - self.start_year + 1) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, year: i32) -> bool {
        self.range().contains(&year)
    }

    pub fn total_pages(&self) -> usize {
        self.len().div_ceil(self.per_page)
    }

    pub fn page_of(&self, year: i32) -> Option<usize> {
        self.contains(year)
            .then(|| (year - self.start_year) as usize / self.per_page)
    }

    /// Pages past the end clamp to the last page.
    pub fn page(&self, page: usize, store: &CustomEventStore) -> TimelinePage {
        let total = self.total_pages();
        let page = page.min(total.saturating_sub(1));
        let years = self
            .years()
            .skip(page * self.per_page)
            .take(self.per_page)
            .map(|y| entry_for(y, store))
            .collect();
        TimelinePage {
            page,
            total_pages: total,
            years,
        }
    }

    /// A four-digit query jumps to that year; anything else is a
    /// case-insensitive substring match, earliest year first.
    pub fn search(&self, query: &str, store: &CustomEventStore) -> Option<SearchMatch> {
        let q = query.trim().to_lowercase();
        if q.is_empty() {
            return None;
        }
        if q.len() == 4 && q.chars().all(|c| c.is_ascii_digit()) {
            if let Ok(year) = q.parse::<i32>() {
                if let Some(page) = self.page_of(year) {
                    return Some(SearchMatch {
                        year,
                        page,
                        text: entry_for(year, store).text,
                    });
                }
            }
        }
        self.years().find_map(|y| {
            let e = entry_for(y, store);
            e.text.to_lowercase().contains(&q).then(|| SearchMatch {
                year: y,
                page: (y - self.start_year) as usize / self.per_page,
                text: e.text,
            })
        })
    }

    /// Every known text within the range, custom over curated.
    pub fn export(&self, store: &CustomEventStore) -> BTreeMap<i32, String> {
        let mut out: BTreeMap<i32, String> = fallback::curated_entries()
            .filter(|(y, _)| self.contains(*y))
            .map(|(y, t)| (y, t.to_string()))
            .collect();
        for (y, t) in store.all() {
            if self.contains(y) && t != NO_EVENT_TEXT {
                out.insert(y, t);
            }
        }
        out
    }
}

pub fn entry_for(year: i32, store: &CustomEventStore) -> YearEntry {
    if let Some(text) = store.get(year) {
        return YearEntry {
            year,
            text,
            source: EntrySource::Custom,
        };
    }
    match fallback::curated_text(year) {
        Some(t) => YearEntry {
            year,
            text: t.to_string(),
            source: EntrySource::Curated,
        },
        None => YearEntry {
            year,
            text: NO_EVENT_TEXT.to_string(),
            source: EntrySource::None,
        },
    }
}
