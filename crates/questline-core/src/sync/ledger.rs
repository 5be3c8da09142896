//! Persisted sync bookkeeping shared by every tab on one local store.
//!
//! Each collection carries a write generation that is bumped on every
//! local change. A remote save remembers the generation it read and only
//! clears the pending mark if no newer write landed in the meantime, no
//! matter which tab made it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::types::Collection;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SyncLedger {
    generations: BTreeMap<Collection, u64>,
    pending: BTreeSet<Collection>,
    last_sync_at: Option<DateTime<Utc>>,
}

impl SyncLedger {
    pub fn generation(&self, collection: Collection) -> u64 {
        self.generations.get(&collection).copied().unwrap_or(0)
    }

    /// Note a local write and return the new generation.
    pub fn record_write(&mut self, collection: Collection) -> u64 {
        let generation = self.generation(collection) + 1;
        self.generations.insert(collection, generation);
        self.pending.insert(collection);
        generation
    }

    /// Clear the pending mark if nothing was written since `generation`.
    pub fn mark_saved(&mut self, collection: Collection, generation: u64) -> bool {
        self.generation(collection) == generation && self.pending.remove(&collection)
    }

    /// Whether a remote copy read at `generation` may no longer overwrite
    /// the local one.
    pub fn changed_since(&self, collection: Collection, generation: u64) -> bool {
        self.pending.contains(&collection) || self.generation(collection) != generation
    }

    pub fn is_pending(&self, collection: Collection) -> bool {
        self.pending.contains(&collection)
    }

    pub fn pending(&self) -> impl Iterator<Item = Collection> + '_ {
        self.pending.iter().copied()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn last_sync_at(&self) -> Option<DateTime<Utc>> {
        self.last_sync_at
    }

    pub fn record_sync(&mut self, at: DateTime<Utc>) {
        self.last_sync_at = Some(at);
    }
}
