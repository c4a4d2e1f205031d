//! cache.rs — bounded in-memory cache with TTL.
//!
//! Eviction is a simple trim of the oldest inserted entries once capacity is
//! exceeded (not LRU: reads do not refresh position). Entries are never
//! mutated in place; `set` on an existing key replaces the value and moves
//! the key to the newest position.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::model::now_ms;

#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub data: V,
    /// Epoch ms at insertion (informational).
    pub timestamp: i64,
    inserted_at: Instant,
    seq: u64,
}

#[derive(Debug)]
struct Inner<V> {
    map: HashMap<String, CacheEntry<V>>,
    order: VecDeque<(u64, String)>,
    next_seq: u64,
}

#[derive(Debug)]
pub struct TtlCache<V> {
    inner: Mutex<Inner<V>>,
    cap: usize,
    ttl: Duration,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(cap: usize, ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner {
                map: HashMap::new(),
                order: VecDeque::new(),
                next_seq: 0,
            }),
            cap: cap.max(1),
            ttl,
        }
    }

    /// Returns a clone of the value unless missing or stale.
    /// Stale entries are dropped on access.
    pub fn get(&self, key: &str) -> Option<V> {
        let mut g = self.inner.lock().expect("cache mutex poisoned");
        let stale = match g.map.get(key) {
            None => return None,
            Some(e) => e.inserted_at.elapsed() > self.ttl,
        };
        if stale {
            g.map.remove(key);
            return None;
        }
        g.map.get(key).map(|e| e.data.clone())
    }

    pub fn set(&self, key: impl Into<String>, value: V) {
        let key = key.into();
        let mut g = self.inner.lock().expect("cache mutex poisoned");
        let seq = g.next_seq;
        g.next_seq = g.next_seq.wrapping_add(1);
        g.map.insert(
            key.clone(),
            CacheEntry {
                data: value,
                timestamp: now_ms(),
                inserted_at: Instant::now(),
                seq,
            },
        );
        g.order.push_back((seq, key));

        // Drop order slots whose key was overwritten or removed, then trim.
        while g.map.len() > self.cap || order_head_is_dead(&g) {
            let Some((s, k)) = g.order.pop_front() else {
                break;
            };
            if g.map.get(&k).map(|e| e.seq) == Some(s) {
                g.map.remove(&k);
            }
        }

        // A long-lived head entry pins dead slots behind it; sweep them.
        if g.order.len() > 2 * g.map.len() {
            let Inner { map, order, .. } = &mut *g;
            order.retain(|(s, k)| map.get(k).map(|e| e.seq) == Some(*s));
        }
    }

    pub fn entry(&self, key: &str) -> Option<CacheEntry<V>> {
        let g = self.inner.lock().expect("cache mutex poisoned");
        g.map.get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("cache mutex poisoned").map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut g = self.inner.lock().expect("cache mutex poisoned");
        g.map.clear();
        g.order.clear();
    }

    pub fn capacity(&self) -> usize {
        self.cap
    }

    #[cfg(test)]
    fn slots(&self) -> usize {
        self.inner.lock().expect("cache mutex poisoned").order.len()
    }
}

fn order_head_is_dead<V>(g: &Inner<V>) -> bool {
    match g.order.front() {
        Some((s, k)) => g.map.get(k).map(|e| e.seq) != Some(*s),
        None => false,
    }
}

// Fingerprints used across the pipeline.

pub fn year_key(year: i32) -> String {
    year.to_string()
}

pub fn random_key(year: i32) -> String {
    format!("random_{year}")
}

pub fn date_key(month: u32, day: u32) -> String {
    format!("{month}-{day}")
}

pub fn media_key(year: i32, name: &str) -> String {
    let name = if name.trim().is_empty() {
        "unknown"
    } else {
        name.trim()
    };
    format!("{year}-{name}")
}
