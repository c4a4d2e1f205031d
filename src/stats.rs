//! stats.rs — bounded in-memory log of resolutions for `/debug/calls`.

use std::sync::Mutex;

use serde::Serialize;

use crate::model::now_ms;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CallOutcome {
    /// A strategy produced an accepted record.
    Resolved,
    CacheHit,
    Custom,
    Curated,
    /// Every strategy failed or was skipped.
    Fallback,
}

#[derive(Debug, Clone, Serialize)]
pub struct CallRecord {
    pub ts_ms: i64,
    pub year: i32,
    pub outcome: CallOutcome,
    pub source: String,
    pub strategy: Option<String>,
    pub error: Option<String>,
    pub duration_ms: u64,
}

impl CallRecord {
    pub fn success(&self) -> bool {
        self.outcome != CallOutcome::Fallback
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PerformanceSummary {
    pub total_calls: usize,
    /// Percentages, one decimal.
    pub success_rate: f64,
    pub cache_hit_rate: f64,
    pub error_rate: f64,
    pub avg_duration_ms: f64,
    pub last_hour: usize,
}

#[derive(Debug)]
pub struct CallLog {
    inner: Mutex<Vec<CallRecord>>,
    cap: usize,
}

impl CallLog {
    pub fn with_capacity(cap: usize) -> Self {
        let cap = cap.clamp(1, 10_000);
        Self {
            inner: Mutex::new(Vec::with_capacity(cap)),
            cap,
        }
    }

    pub fn push(&self, rec: CallRecord) {
        let Ok(mut v) = self.inner.lock() else {
            return;
        };
        v.push(rec);
        if v.len() > self.cap {
            let excess = v.len() - self.cap;
            v.drain(0..excess);
        }
    }

    pub fn snapshot_last_n(&self, n: usize) -> Vec<CallRecord> {
        let Ok(v) = self.inner.lock() else {
            return Vec::new();
        };
        let start = v.len().saturating_sub(n);
        v[start..].to_vec()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map(|v| v.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn summary(&self) -> PerformanceSummary {
        let calls = self.snapshot_last_n(self.cap);
        if calls.is_empty() {
            return PerformanceSummary {
                total_calls: 0,
                success_rate: 0.0,
                cache_hit_rate: 0.0,
                error_rate: 0.0,
                avg_duration_ms: 0.0,
                last_hour: 0,
            };
        }
        let total = calls.len() as f64;
        let ok = calls.iter().filter(|c| c.success()).count() as f64;
        let cached = calls
            .iter()
            .filter(|c| c.outcome == CallOutcome::CacheHit)
            .count() as f64;
        let dur: u64 = calls.iter().map(|c| c.duration_ms).sum();
        let hour_ago = now_ms() - 3_600_000;

        PerformanceSummary {
            total_calls: calls.len(),
            success_rate: pct(ok, total),
            cache_hit_rate: pct(cached, total),
            error_rate: pct(total - ok, total),
            avg_duration_ms: dur as f64 / total,
            last_hour: calls.iter().filter(|c| c.ts_ms >= hour_ago).count(),
        }
    }
}

fn pct(part: f64, total: f64) -> f64 {
    (part / total * 1000.0).round() / 10.0
}
