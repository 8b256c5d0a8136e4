//! Durable interest sets and delivery counters.
//!
//! One JSON document on disk, rewritten wholesale on every flush. Two
//! top-level maps keyed by destination chat id: the phone numbers a
//! destination registered interest in, and the per-number delivery counters
//! accumulated since the last report.

use std::{
    collections::{BTreeMap, BTreeSet},
    fs, io,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{errors::Error, Result};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
struct PersistedState {
    #[serde(default)]
    interests: BTreeMap<i64, BTreeSet<String>>,
    #[serde(default)]
    counters: BTreeMap<i64, BTreeMap<String, u64>>,
}

/// In-memory state with explicit persistence.
///
/// Mutations that the operator triggers (`add`/`remove`/`remove_all`) flush
/// immediately; `record_delivery` does not, so the router can batch one flush
/// per processed notification.
#[derive(Debug)]
pub struct InterestStore {
    path: PathBuf,
    state: PersistedState,
}

impl InterestStore {
    /// Read durable storage, or start empty when the file does not exist.
    ///
    /// A file that exists but does not parse is a fatal condition: silently
    /// resetting would lose every registered number.
    pub fn load(path: &Path) -> Result<Self> {
        let state = match fs::read_to_string(path) {
            Ok(contents) => {
                serde_json::from_str(&contents).map_err(|source| Error::CorruptState {
                    path: path.to_path_buf(),
                    source,
                })?
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => PersistedState::default(),
            Err(e) => return Err(Error::Io(e)),
        };

        Ok(Self {
            path: path.to_path_buf(),
            state,
        })
    }

    /// Write the full in-memory state to disk, overwriting prior content.
    /// Human-readable on purpose: operators inspect this file.
    ///
    /// Goes through a sibling temp file and a rename, so a crash mid-write
    /// cannot leave a torn file behind (which `load` would refuse to read).
    pub fn flush(&self) -> Result<()> {
        let doc = serde_json::to_string_pretty(&self.state)?;

        let mut tmp_name = self.path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp = PathBuf::from(tmp_name);

        fs::write(&tmp, doc)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// Union `numbers` into the destination's set. Idempotent. Returns
    /// (newly added, resulting set size).
    pub fn add(&mut self, destination: i64, numbers: &BTreeSet<String>) -> Result<(usize, usize)> {
        let set = self.state.interests.entry(destination).or_default();
        let before = set.len();
        set.extend(numbers.iter().cloned());
        let total = set.len();
        let added = total - before;

        if added > 0 {
            self.flush()?;
        }
        Ok((added, total))
    }

    /// Remove the subset of `numbers` actually present. Returns how many were
    /// removed; a destination without an entry removes nothing.
    pub fn remove(&mut self, destination: i64, numbers: &BTreeSet<String>) -> Result<usize> {
        let Some(set) = self.state.interests.get_mut(&destination) else {
            return Ok(0);
        };

        let before = set.len();
        for n in numbers {
            set.remove(n);
        }
        let removed = before - set.len();

        if set.is_empty() {
            self.state.interests.remove(&destination);
        }
        if removed > 0 {
            self.flush()?;
        }
        Ok(removed)
    }

    /// Clear the destination's entire set. Returns the prior size.
    pub fn remove_all(&mut self, destination: i64) -> Result<usize> {
        let removed = self
            .state
            .interests
            .remove(&destination)
            .map(|s| s.len())
            .unwrap_or(0);

        if removed > 0 {
            self.flush()?;
        }
        Ok(removed)
    }

    /// The destination's numbers, sorted ascending (display order).
    pub fn list(&self, destination: i64) -> Vec<String> {
        self.state
            .interests
            .get(&destination)
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn contains(&self, destination: i64, phone_number: &str) -> bool {
        self.state
            .interests
            .get(&destination)
            .map(|s| s.contains(phone_number))
            .unwrap_or(false)
    }

    /// Every destination with a registered interest set.
    pub fn destinations(&self) -> Vec<i64> {
        self.state.interests.keys().copied().collect()
    }

    /// Increment a delivery counter. Deliberately does not flush; the caller
    /// persists once per processed notification.
    pub fn record_delivery(&mut self, destination: i64, phone_number: &str) {
        *self
            .state
            .counters
            .entry(destination)
            .or_default()
            .entry(phone_number.to_string())
            .or_insert(0) += 1;
    }

    /// Live (unflushed) counters for one destination.
    pub fn counters(&self, destination: i64) -> Option<&BTreeMap<String, u64>> {
        self.state.counters.get(&destination)
    }

    /// Snapshot of all counters.
    pub fn all_counters(&self) -> BTreeMap<i64, BTreeMap<String, u64>> {
        self.state.counters.clone()
    }

    /// Move every counter out of the store, leaving it empty. The daily
    /// report drains with this so deliveries counted while report sends are
    /// in flight land in the next period instead of being wiped unreported.
    /// The caller flushes.
    pub fn take_all_counters(&mut self) -> BTreeMap<i64, BTreeMap<String, u64>> {
        std::mem::take(&mut self.state.counters)
    }
}
