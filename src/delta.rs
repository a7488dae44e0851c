//! Byte-level change tracking.
//!
//! Every mutating operation in hexmap takes a `&mut Delta`. The delta remembers
//! what each touched byte held before the first write to it, which is exactly
//! what an undo history needs to roll a logical edit back.

use std::collections::BTreeMap;

use crate::space::Model;

/// The before/after pair for a single byte.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct Change {
  /// The value the byte had before the first write recorded by the delta.
  pub old: u8,
  /// The value most recently written.
  pub new: u8,
}

/// An accumulator of byte changes belonging to one logical edit.
///
/// The old value of an address is recorded exactly once; later writes to the
/// same address only update the new value. Entries are never removed.
#[derive(Clone, Debug, Default)]
pub struct Delta {
  changes: BTreeMap<u32, Change>,
  original_len: Option<usize>,
}

impl Delta {
  /// Creates a new, empty `Delta`.
  pub fn new() -> Self {
    Self::default()
  }

  /// Records that `addr` went from `old` to `new`.
  pub(crate) fn record(&mut self, addr: u32, old: u8, new: u8) {
    self
      .changes
      .entry(addr)
      .and_modify(|change| change.new = new)
      .or_insert(Change { old, new });
  }

  /// Records that the buffer was `len` bytes long before growing.
  ///
  /// Only the first call has an effect.
  pub(crate) fn record_growth(&mut self, len: usize) {
    self.original_len.get_or_insert(len);
  }

  /// Folds the changes recorded by `later` into this delta, as if they had
  /// been recorded here directly.
  pub(crate) fn absorb(&mut self, later: &Delta) {
    for (addr, change) in later.changes() {
      self.record(addr, change.old, change.new);
    }
    if let Some(len) = later.original_len {
      self.record_growth(len);
    }
  }

  /// Returns the number of distinct addresses changed.
  pub fn len(&self) -> usize {
    self.changes.len()
  }

  /// Returns true if nothing has been recorded yet.
  pub fn is_empty(&self) -> bool {
    self.changes.is_empty() && self.original_len.is_none()
  }

  /// Returns the recorded changes, ordered by address.
  pub fn changes(&self) -> impl Iterator<Item = (u32, Change)> + '_ {
    self.changes.iter().map(|(k, v)| (*k, *v))
  }

  /// Returns the value `addr` had before this delta touched it, if it did.
  pub fn old_value(&self, addr: u32) -> Option<u8> {
    self.changes.get(&addr).map(|change| change.old)
  }

  /// Returns the buffer length before the first growth, if the buffer grew.
  pub fn original_len(&self) -> Option<usize> {
    self.original_len
  }

  /// Restores every byte this delta recorded and undoes any buffer growth.
  ///
  /// Only bytes are restored; the caller is responsible for rebuilding any run
  /// metadata that depended on them.
  pub fn revert(&self, model: &mut Model) {
    for (&addr, change) in &self.changes {
      model.restore(addr, change.old);
    }
    if let Some(len) = self.original_len {
      model.truncate(len);
    }
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn old_value_is_write_once() {
    let mut delta = Delta::new();
    delta.record(0x10, 0xff, 0x01);
    delta.record(0x10, 0x01, 0x02);
    assert_eq!(delta.old_value(0x10), Some(0xff));
    assert_eq!(
      delta.changes().collect::<Vec<_>>(),
      vec![(0x10, Change { old: 0xff, new: 0x02 })]
    );
  }

  #[test]
  fn absorbing_keeps_the_first_old_value() {
    let mut delta = Delta::new();
    delta.record(0x10, 0xff, 0x01);
    let mut later = Delta::new();
    later.record(0x10, 0x01, 0x02);
    later.record(0x11, 0x03, 0x04);
    later.record_growth(0x80);
    delta.absorb(&later);

    assert_eq!(delta.old_value(0x10), Some(0xff));
    assert_eq!(delta.old_value(0x11), Some(0x03));
    assert_eq!(delta.original_len(), Some(0x80));
    assert_eq!(delta.len(), 2);
  }

  #[test]
  fn growth_is_recorded_once() {
    let mut delta = Delta::new();
    assert!(delta.is_empty());
    delta.record_growth(0x100);
    delta.record_growth(0x200);
    assert_eq!(delta.original_len(), Some(0x100));
    assert!(!delta.is_empty());
    assert_eq!(delta.len(), 0);
  }
}
