//! Generic optimistic-concurrency store.
//!
//! Records live in a sharded [`DashMap`]; there is no store-wide lock, so
//! writes to unrelated ids run in parallel. Every write is a single entry
//! operation, which makes the version check and the increment one atomic
//! step. Reads clone the record out and release the shard immediately.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use notehub_core::{ids, Error, Result, Versioned};

/// Concurrency-safe id → record map with compare-and-swap saves.
#[derive(Debug)]
pub struct VersionedStore<T> {
    records: DashMap<String, T>,
    /// Entity name used in errors and logs ("note", "content").
    kind: &'static str,
}

impl<T: Versioned> VersionedStore<T> {
    pub fn new(kind: &'static str) -> Self {
        Self {
            records: DashMap::new(),
            kind,
        }
    }

    /// Insert unknown ids at version 0. For known ids, succeed only when
    /// `record.version()` equals the stored version, then store it + 1.
    pub fn save(&self, record: &T) -> Result<u64> {
        ids::require(record.id(), self.kind)?;
        let mut next = record.clone();

        match self.records.entry(record.id().to_string()) {
            Entry::Vacant(slot) => {
                next.set_version(0);
                slot.insert(next);
                tracing::debug!(kind = self.kind, id = record.id(), version = 0, "Inserted");
                Ok(0)
            }
            Entry::Occupied(mut slot) => {
                let stored = slot.get().version();
                if record.version() != stored {
                    tracing::debug!(
                        kind = self.kind,
                        id = record.id(),
                        expected_version = record.version(),
                        version = stored,
                        "Save rejected"
                    );
                    return Err(Error::conflict(record.id(), record.version(), stored));
                }
                let version = stored + 1;
                next.set_version(version);
                slot.insert(next);
                tracing::debug!(kind = self.kind, id = record.id(), version, "Saved");
                Ok(version)
            }
        }
    }

    /// Create-only insert at version 0.
    pub fn insert(&self, record: &T) -> Result<()> {
        ids::require(record.id(), self.kind)?;
        let mut next = record.clone();
        next.set_version(0);

        match self.records.entry(record.id().to_string()) {
            Entry::Vacant(slot) => {
                slot.insert(next);
                tracing::debug!(kind = self.kind, id = record.id(), "Created");
                Ok(())
            }
            Entry::Occupied(slot) => Err(Error::conflict(record.id(), 0, slot.get().version())),
        }
    }

    /// Independent copy of the stored record.
    pub fn find_by_id(&self, id: &str) -> Result<T> {
        self.records
            .get(id)
            .map(|r| r.value().clone())
            .ok_or_else(|| self.not_found(id))
    }

    pub fn delete(&self, id: &str) -> Result<()> {
        self.records
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| self.not_found(id))
    }

    /// Remove only if the stored version still equals `version`.
    pub fn delete_at_version(&self, id: &str, version: u64) -> Result<()> {
        match self.records.entry(id.to_string()) {
            Entry::Vacant(_) => Err(self.not_found(id)),
            Entry::Occupied(slot) => {
                let stored = slot.get().version();
                if stored != version {
                    return Err(Error::conflict(id, version, stored));
                }
                slot.remove();
                Ok(())
            }
        }
    }

    /// Copies of every record matching `pred`, ordered by id.
    pub fn scan(&self, pred: impl Fn(&T) -> bool) -> Vec<T> {
        let mut found: Vec<T> = self
            .records
            .iter()
            .filter(|r| pred(r.value()))
            .map(|r| r.value().clone())
            .collect();
        found.sort_by(|a, b| a.id().cmp(b.id()));
        found
    }

    /// Remove every record matching `pred`. Returns how many were removed.
    pub fn remove_where(&self, pred: impl Fn(&T) -> bool) -> usize {
        let mut removed = 0;
        self.records.retain(|_, record| {
            if pred(record) {
                removed += 1;
                false
            } else {
                true
            }
        });
        removed
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn not_found(&self, id: &str) -> Error {
        Error::NotFound(format!("{} {id}", self.kind))
    }
}
