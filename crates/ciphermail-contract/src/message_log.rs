//! Fixed-capacity ring buffer of delivery-proof records.
//!
//! A monotonically increasing write cursor picks the physical slot
//! (`cursor % capacity`). Only the newest `capacity` appends are
//! readable; older ones have been overwritten.
//!
//! Validity is a pure function of `(index, cursor, capacity)` and is
//! never inferred from slot contents:
//!
//! - by sequence: `seq` is readable iff `cursor - capacity <= seq < cursor`;
//! - by physical index: `idx` is readable iff `idx < capacity` and the
//!   slot has been written (`idx < cursor`). A written slot always
//!   holds the newest entry that maps onto it, which is inside the
//!   window by construction.

use ciphermail_types::{ContractError, MessageMetaEntry};
use serde::{Deserialize, Serialize};

/// Where an appended entry landed.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct AppendPosition {
    /// Physical slot written (`sequence % capacity`).
    pub log_index: u32,
    /// Write-cursor value at append time.
    pub sequence: u64,
}

/// Returns `true` if `sequence` lies in `[cursor - capacity, cursor)`.
pub fn sequence_in_window(sequence: u64, cursor: u64, capacity: u32) -> bool {
    sequence < cursor && cursor - sequence <= u64::from(capacity)
}

/// Returns `true` if physical slot `log_index` currently holds a
/// readable entry.
pub fn index_in_window(log_index: u32, cursor: u64, capacity: u32) -> bool {
    log_index < capacity && u64::from(log_index) < cursor
}

/// Ring buffer of [`MessageMetaEntry`] with a fixed capacity.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MessageMetadataLog {
    /// Grows to `capacity`, then is overwritten in place.
    entries: Vec<MessageMetaEntry>,
    capacity: u32,
    cursor: u64,
}

impl MessageMetadataLog {
    /// Creates an empty log. `capacity` must be non-zero; the contract
    /// configuration guarantees it.
    pub fn new(capacity: u32) -> Self {
        Self {
            entries: Vec::new(),
            capacity: capacity.max(1),
            cursor: 0,
        }
    }

    /// Maximum number of readable entries.
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Total number of appends so far.
    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    /// Number of currently readable entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` before the first append.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Oldest readable sequence, or `None` while empty.
    pub fn oldest_sequence(&self) -> Option<u64> {
        (self.cursor > 0).then(|| self.cursor.saturating_sub(u64::from(self.capacity)))
    }

    /// Writes `entry` at `cursor % capacity` and advances the cursor.
    pub fn append(&mut self, entry: MessageMetaEntry) -> AppendPosition {
        let sequence = self.cursor;
        let log_index = (sequence % u64::from(self.capacity)) as u32;

        match self.entries.get_mut(log_index as usize) {
            Some(slot) => *slot = entry,
            None => self.entries.push(entry),
        }
        self.cursor += 1;

        AppendPosition { log_index, sequence }
    }

    /// Reads the entry in physical slot `log_index`.
    ///
    /// # Errors
    ///
    /// [`ContractError::IndexOutOfWindow`] if the index is beyond the
    /// capacity or the slot was never written.
    pub fn get(&self, log_index: u32) -> Result<&MessageMetaEntry, ContractError> {
        if !index_in_window(log_index, self.cursor, self.capacity) {
            return Err(ContractError::IndexOutOfWindow);
        }
        self.entries
            .get(log_index as usize)
            .ok_or(ContractError::IndexOutOfWindow)
    }

    /// Reads the entry appended as number `sequence`.
    ///
    /// # Errors
    ///
    /// [`ContractError::IndexOutOfWindow`] if the entry has been
    /// overwritten or not yet written.
    pub fn get_by_sequence(&self, sequence: u64) -> Result<&MessageMetaEntry, ContractError> {
        if !sequence_in_window(sequence, self.cursor, self.capacity) {
            return Err(ContractError::IndexOutOfWindow);
        }
        let log_index = (sequence % u64::from(self.capacity)) as usize;
        self.entries
            .get(log_index)
            .ok_or(ContractError::IndexOutOfWindow)
    }
}
