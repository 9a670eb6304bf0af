//! Local edits awaiting remote confirmation.

use indexmap::IndexMap;

use crate::github::types::PendingUpdate;

#[derive(Debug, Clone)]
struct PendingEntry {
  update: PendingUpdate,
  seq: u64,
  failures: u32,
}

/// What happened to an entry after a failed push
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureOutcome {
  /// Still queued, with this many consecutive failures
  Retrying(u32),
  /// Crossed the unsynced threshold on this failure
  Unsynced(u32),
  /// The entry was replaced or discarded while the push was in flight
  Superseded,
}

/// Pending updates keyed by item id, one per item.
///
/// Each insert gets a fresh sequence number, so the completion of an older
/// push can never remove or penalize a newer edit of the same item.
#[derive(Debug, Default)]
pub struct PendingQueue {
  entries: IndexMap<String, PendingEntry>,
  next_seq: u64,
}

impl PendingQueue {
  pub fn new() -> Self {
    Self::default()
  }

  /// Store `update`, replacing any earlier edit of the same item.
  pub fn insert(&mut self, update: PendingUpdate) -> u64 {
    let seq = self.next_seq;
    self.next_seq += 1;
    self.entries.insert(
      update.item_id.clone(),
      PendingEntry {
        update,
        seq,
        failures: 0,
      },
    );
    seq
  }

  /// Current entries with their sequence numbers.
  pub fn snapshot(&self) -> Vec<(u64, PendingUpdate)> {
    self
      .entries
      .values()
      .map(|e| (e.seq, e.update.clone()))
      .collect()
  }

  /// Remove the entry for `item_id` if it is still the one that was pushed.
  pub fn confirm(&mut self, item_id: &str, seq: u64) -> bool {
    match self.entries.get(item_id) {
      Some(entry) if entry.seq == seq => {
        self.entries.shift_remove(item_id);
        true
      }
      _ => false,
    }
  }

  pub fn record_failure(&mut self, item_id: &str, seq: u64, unsynced_after: u32) -> FailureOutcome {
    match self.entries.get_mut(item_id) {
      Some(entry) if entry.seq == seq => {
        entry.failures += 1;
        if entry.failures == unsynced_after {
          FailureOutcome::Unsynced(entry.failures)
        } else {
          FailureOutcome::Retrying(entry.failures)
        }
      }
      _ => FailureOutcome::Superseded,
    }
  }

  /// Updates that failed at least `unsynced_after` times in a row.
  pub fn unsynced(&self, unsynced_after: u32) -> Vec<PendingUpdate> {
    self
      .entries
      .values()
      .filter(|e| unsynced_after > 0 && e.failures >= unsynced_after)
      .map(|e| e.update.clone())
      .collect()
  }

  pub fn updates(&self) -> impl Iterator<Item = &PendingUpdate> {
    self.entries.values().map(|e| &e.update)
  }

  pub fn clear(&mut self) {
    self.entries.clear();
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}
