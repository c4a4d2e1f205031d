//! Custom event overlay: user-authored year → text notes, persisted as one
//! JSON object. Loading is fail-open; every edit rewrites the file through a
//! uniquely named temp file + rename.
//!
//! Edits are serialized: the next map is written to disk first and only
//! committed to memory once the rename succeeded, so a failed save leaves
//! memory and file in agreement.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

use anyhow::{Context, Result};
use tempfile::NamedTempFile;

#[derive(Debug)]
pub struct CustomEventStore {
    path: Option<PathBuf>,
    events: RwLock<BTreeMap<i32, String>>,
    // Held across snapshot, write and rename.
    writer: Mutex<()>,
}

impl CustomEventStore {
    /// Missing or corrupt files load as empty.
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let events = match fs::read_to_string(&path) {
            Ok(s) => match serde_json::from_str::<BTreeMap<i32, String>>(&s) {
                Ok(map) => map,
                Err(e) => {
                    tracing::warn!(target: "store", path = %path.display(), error = %e, "custom events file unreadable; starting empty");
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                tracing::warn!(target: "store", path = %path.display(), error = %e, "custom events file not readable; starting empty");
                BTreeMap::new()
            }
        };
        tracing::info!(target: "store", path = %path.display(), count = events.len(), "custom events loaded");
        Self {
            path: Some(path),
            events: RwLock::new(events),
            writer: Mutex::new(()),
        }
    }

    /// Store without a backing file.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            events: RwLock::new(BTreeMap::new()),
            writer: Mutex::new(()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn get(&self, year: i32) -> Option<String> {
        self.events
            .read()
            .ok()
            .and_then(|g| g.get(&year).cloned())
    }

    pub fn all(&self) -> BTreeMap<i32, String> {
        self.events
            .read()
            .map(|g| g.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.events.read().map(|g| g.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Save a note; blank text deletes it.
    pub fn set(&self, year: i32, text: &str) -> Result<()> {
        let text = text.trim();
        self.update(|map| {
            if text.is_empty() {
                map.remove(&year).is_some()
            } else {
                map.insert(year, text.to_string()).as_deref() != Some(text)
            }
        })?;
        tracing::debug!(target: "store", year, deleted = text.is_empty(), "custom event saved");
        Ok(())
    }

    /// Returns whether a note existed.
    pub fn clear(&self, year: i32) -> Result<bool> {
        self.update(|map| map.remove(&year).is_some())
    }

    /// Merge a `{ "<year>": "<text>" }` document into the overlay.
    /// Keys that are not years, or fall outside `years`, are skipped;
    /// returns the number merged.
    pub fn import(
        &self,
        doc: &BTreeMap<String, String>,
        years: &RangeInclusive<i32>,
    ) -> Result<usize> {
        let mut merged = 0usize;
        self.update(|map| {
            for (k, v) in doc {
                let Ok(year) = k.trim().parse::<i32>() else {
                    tracing::debug!(target: "store", key = %k, "skipping non-year key");
                    continue;
                };
                if !years.contains(&year) {
                    tracing::debug!(target: "store", year, "skipping year outside the timeline");
                    continue;
                }
                let v = v.trim();
                if v.is_empty() {
                    continue;
                }
                map.insert(year, v.to_string());
                merged += 1;
            }
            merged > 0
        })?;
        tracing::info!(target: "store", merged, "custom events imported");
        Ok(merged)
    }

    /// Apply `edit` to a copy of the current map; when it reports a change,
    /// write the copy to disk and then swap it in. Returns the edit's result.
    fn update<F>(&self, edit: F) -> Result<bool>
    where
        F: FnOnce(&mut BTreeMap<i32, String>) -> bool,
    {
        let _writer = self
            .writer
            .lock()
            .map_err(|_| anyhow::anyhow!("custom events writer lock poisoned"))?;
        let mut next = self.all();
        if !edit(&mut next) {
            return Ok(false);
        }
        if let Some(path) = self.path.as_ref() {
            write_json_atomic(path, &next)
                .with_context(|| format!("writing custom events to {}", path.display()))?;
        }
        let mut g = self
            .events
            .write()
            .map_err(|_| anyhow::anyhow!("custom events lock poisoned"))?;
        *g = next;
        Ok(true)
    }
}

fn write_json_atomic(path: &Path, map: &BTreeMap<i32, String>) -> Result<()> {
    let dir = match path.parent().filter(|d| !d.as_os_str().is_empty()) {
        Some(dir) => {
            fs::create_dir_all(dir)?;
            dir
        }
        None => Path::new("."),
    };
    let json = serde_json::to_string_pretty(map)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(json.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
