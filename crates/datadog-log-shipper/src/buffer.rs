// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! In-memory buffer of serialized log records waiting to be shipped.
//!
//! Records are addressed by position. Deleting a record leaves a tombstone in its
//! slot so the positions of every other record stay put; tombstones are only
//! dropped by [`EventBuffer::compact`], which the flush scheduler calls once a
//! transmission pass is over. Between two compactions positions are stable, and
//! since producers only ever append at the tail, a pass that snapshots
//! [`EventBuffer::size`] up front can walk and delete by index while new records
//! keep arriving behind it.

use bytes::Bytes;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// One fully serialized log line. The shipper never looks inside it.
pub type LogRecord = Bytes;

#[derive(Debug, Default)]
pub struct EventBuffer {
    slots: Mutex<Vec<Option<LogRecord>>>,
}

impl EventBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // The lock is never held across a panic-prone section, recover instead of
    // propagating poisoning to producers.
    fn slots(&self) -> MutexGuard<'_, Vec<Option<LogRecord>>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends a record at the tail and returns the new size.
    pub fn append(&self, record: LogRecord) -> usize {
        let mut slots = self.slots();
        slots.push(Some(record));
        slots.len()
    }

    /// Number of slots, tombstones included.
    pub fn size(&self) -> usize {
        self.slots().len()
    }

    /// Number of records still waiting to be shipped.
    pub fn pending(&self) -> usize {
        self.slots().iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.pending() == 0
    }

    /// Record at `index`, or `None` if it was deleted or never existed.
    pub fn get(&self, index: usize) -> Option<LogRecord> {
        self.slots().get(index).and_then(Clone::clone)
    }

    /// Removes the record at `index`. Returns whether a record was removed;
    /// deleting a tombstone or an out of range index is a no-op.
    pub fn delete(&self, index: usize) -> bool {
        self.slots()
            .get_mut(index)
            .and_then(Option::take)
            .is_some()
    }

    /// Drops every tombstone, shifting live records towards the head.
    /// Returns how many slots were reclaimed.
    pub fn compact(&self) -> usize {
        let mut slots = self.slots();
        let before = slots.len();
        slots.retain(Option::is_some);
        before - slots.len()
    }

    /// Live records in append order.
    pub fn records(&self) -> Vec<LogRecord> {
        self.slots().iter().flatten().cloned().collect()
    }
}
