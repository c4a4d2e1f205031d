// src/strategy/mod.rs
//! Independent upstream strategies, tried by the resolver in priority order.

pub mod category;
pub mod on_this_day;
pub mod search;
pub mod summary;

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::TimelineConfig;
use crate::error::ResolveError;
use crate::model::EventRecord;
use crate::text;
use crate::wiki::WikiApi;

pub use category::CategoryStrategy;
pub use on_this_day::OnThisDayStrategy;
pub use search::SearchStrategy;
pub use summary::PageSummaryStrategy;

#[async_trait]
pub trait Strategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// One attempt at producing a candidate for `year`. The resolver applies
    /// year validation afterwards; strategies never retry themselves.
    async fn attempt(&self, year: i32) -> Result<EventRecord, ResolveError>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum StrategyOutcome {
    Accepted(EventRecord),
    Rejected(String),
    Failed(ResolveError),
}

impl StrategyOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            StrategyOutcome::Accepted(_) => "accepted",
            StrategyOutcome::Rejected(_) => "rejected",
            StrategyOutcome::Failed(_) => "failed",
        }
    }
}

/// Candidate check applied to every strategy result.
/// `Err` carries the rejection reason.
pub fn validate_candidate(rec: &EventRecord, requested: i32, tolerance: i32) -> Result<(), String> {
    let diff = (rec.year - requested).abs();
    if diff > tolerance {
        return Err(format!(
            "candidate year {} is {diff} away from {requested} (tolerance {tolerance})",
            rec.year
        ));
    }
    if rec.text.trim().is_empty() {
        return Err("candidate has empty text".to_string());
    }
    text::check_historical_plausibility(&rec.name, requested)
}

/// Shared randomness for "pick one of the good candidates".
/// Seedable so tests are deterministic.
#[derive(Debug)]
pub struct Picker {
    rng: Mutex<StdRng>,
}

impl Picker {
    pub fn from_entropy() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn index(&self, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }
        let mut rng = self.rng.lock().ok()?;
        Some(rng.random_range(0..len))
    }

    pub fn pick<'a, T>(&self, items: &'a [T]) -> Option<&'a T> {
        self.index(items.len()).and_then(|i| items.get(i))
    }
}

/// Default priority order: feed, search, category, year page.
pub fn default_strategies(
    wiki: Arc<dyn WikiApi>,
    picker: Arc<Picker>,
    cfg: &TimelineConfig,
) -> Vec<Box<dyn Strategy>> {
    vec![
        Box::new(OnThisDayStrategy::new(wiki.clone(), picker.clone(), cfg)),
        Box::new(SearchStrategy::new(wiki.clone(), picker.clone())),
        Box::new(CategoryStrategy::new(wiki.clone(), picker)),
        Box::new(PageSummaryStrategy::new(wiki)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SOURCE_WIKIPEDIA_API;

    #[test]
    fn validation_rejects_far_years() {
        let rec = EventRecord::new(1979, "Something", "Text", SOURCE_WIKIPEDIA_API);
        let err = validate_candidate(&rec, 1969, 2).unwrap_err();
        assert!(err.contains("10 away"), "{err}");

        let rec = EventRecord::new(1971, "Something", "Text", SOURCE_WIKIPEDIA_API);
        assert!(validate_candidate(&rec, 1969, 2).is_ok());
    }

    #[test]
    fn validation_rejects_empty_and_anachronistic() {
        let rec = EventRecord::new(1850, "Name", "  ", SOURCE_WIKIPEDIA_API);
        assert!(validate_candidate(&rec, 1850, 2).is_err());
        let rec = EventRecord::new(1850, "Television premiere", "Text", SOURCE_WIKIPEDIA_API);
        assert!(validate_candidate(&rec, 1850, 2).is_err());
    }

    #[test]
    fn seeded_picker_is_deterministic() {
        let a = Picker::seeded(7);
        let b = Picker::seeded(7);
        let items = [1, 2, 3, 4, 5, 6, 7, 8];
        for _ in 0..10 {
            assert_eq!(a.pick(&items), b.pick(&items));
        }
        assert_eq!(a.pick::<i32>(&[]), None);
    }
}
