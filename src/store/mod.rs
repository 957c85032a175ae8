// src/store/mod.rs

use async_trait::async_trait;
use std::sync::Mutex;
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::model::{CanonicalRecord, Kind};

/// What an upsert did to the store.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UpsertOutcome {
    Inserted,
    /// An existing record with the same natural key was overwritten.
    Replaced { previous: f64 },
    /// Same key and same published fields; only `observed_at` moved.
    Unchanged,
}

/// Persistence contract. At most one record per natural key; a record with
/// an existing key replaces the stored one.
#[async_trait]
pub trait Store: Send + Sync {
    async fn upsert(&self, record: CanonicalRecord) -> Result<UpsertOutcome, StoreError>;
    async fn get_all(&self) -> Result<Vec<CanonicalRecord>, StoreError>;
}

/// In-memory store. Every upsert runs its scan-and-replace under one lock, so
/// concurrent writers never lose updates.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<Vec<CanonicalRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> Result<usize, StoreError> {
        Ok(self.records.lock().map_err(|_| StoreError::Poisoned)?.len())
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }
}

fn same_publication(a: &CanonicalRecord, b: &CanonicalRecord) -> bool {
    a.value() == b.value()
        && a.changed_on() == b.changed_on()
        && a.ratio_bounds() == b.ratio_bounds()
        && a.has_group_discount() == b.has_group_discount()
}

#[async_trait]
impl Store for MemoryStore {
    async fn upsert(&self, record: CanonicalRecord) -> Result<UpsertOutcome, StoreError> {
        let mut records = self.records.lock().map_err(|_| StoreError::Poisoned)?;

        let Some(idx) = records.iter().position(|r| r.same_key(&record)) else {
            debug!(source = record.source(), term = %record.term(), "insert");
            records.push(record);
            return Ok(UpsertOutcome::Inserted);
        };
        let slot = &mut records[idx];

        if same_publication(slot, &record) {
            *slot = record;
            return Ok(UpsertOutcome::Unchanged);
        }

        let previous = slot.value();
        if record.kind() == Kind::AverageRate {
            // a published monthly average should never change after the fact
            warn!(
                source = record.source(),
                term = %record.term(),
                month = ?record.reference_month(),
                previous,
                value = record.value(),
                "historical average rewritten by source"
            );
        } else {
            debug!(source = record.source(), term = %record.term(), previous, value = record.value(), "replace");
        }
        *slot = record;
        Ok(UpsertOutcome::Replaced { previous })
    }

    async fn get_all(&self) -> Result<Vec<CanonicalRecord>, StoreError> {
        Ok(self.records.lock().map_err(|_| StoreError::Poisoned)?.clone())
    }
}
