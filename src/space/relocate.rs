//! Free space and relocation.
//!
//! Free space is any byte holding `FREE_BYTE` that no run claims. Space past
//! the end of the image counts as free too, since writing there grows the
//! image.

use crate::delta::Delta;
use crate::rom::Gba;
use crate::run::Destination;
use crate::run::Run;
use crate::run::RunKind;
use crate::space::Model;
use crate::space::SpaceError;
use crate::space::FREE_BYTE;

/// Searches for free space start here, past the cartridge header.
pub const FREE_SPACE_START: u32 = 0x100;

/// Relocated data is placed on word boundaries.
const ALIGN: u32 = 4;

fn align_up(addr: u32) -> u32 {
  (addr + ALIGN - 1) & !(ALIGN - 1)
}

impl Model {
  /// Returns the last address in `addr..addr + len` that is in use, if any.
  fn last_used(&self, addr: u32, len: u32) -> Option<u32> {
    let end = addr.saturating_add(len);
    if let Some((_, run)) = self.runs.range(..end).next_back() {
      if run.end() > addr {
        return Some(run.end().min(end).max(addr + 1) - 1);
      }
    }

    let from = (addr as usize).min(self.bytes.len());
    let to = (end as usize).min(self.bytes.len());
    self.bytes[from..to]
      .iter()
      .rposition(|&b| b != FREE_BYTE)
      .map(|i| addr + i as u32)
  }

  /// Returns true if `len` bytes starting at `addr` are free.
  pub fn is_free(&self, addr: u32, len: u32) -> bool {
    let fits = (addr as usize).saturating_add(len as usize) <= Gba::MAX_LEN;
    fits && self.last_used(addr, len).is_none()
  }

  /// Finds the first word-aligned free extent of `len` bytes.
  ///
  /// If no extent inside the image is large enough, the answer lies at or
  /// past the end of the image, and writing to it will grow the image.
  pub fn find_free_space(&self, len: u32) -> Result<u32, SpaceError> {
    let mut addr = FREE_SPACE_START;
    while (addr as usize) < self.len() {
      match self.last_used(addr, len) {
        None => break,
        Some(used) => addr = align_up(used + 1),
      }
    }

    let end = (addr as usize).saturating_add(len as usize);
    if end > Gba::MAX_LEN {
      return Err(SpaceError::Exhausted { requested: end });
    }
    Ok(addr)
  }

  /// Makes room for `run` to be `new_len` bytes long.
  ///
  /// A run that shrinks, or whose following bytes are free, stays where it
  /// is; a shrinking run's tail is freed. Otherwise the run's bytes move to
  /// fresh space, its old extent is freed, and every pointer to it is
  /// rewritten to the new start.
  ///
  /// The returned run has its new start and all of its sources, but keeps the
  /// variant of `run`; the caller registers the final shape with
  /// `observe_run_written()` once it has written the new contents.
  ///
  /// On error, nothing has been written.
  pub fn relocate(
    &mut self,
    delta: &mut Delta,
    run: &Run,
    new_len: u32,
  ) -> Result<Run, SpaceError> {
    let start = run.start();
    let old_len = run.len();
    let run = match self.runs.get(&start) {
      Some(known) => run.with_new_sources(
        known.sources().iter().chain(run.sources()).copied(),
      ),
      None => run.clone(),
    };

    if new_len <= old_len {
      let tail_end = run.end().min(self.len() as u32);
      for addr in start.saturating_add(new_len)..tail_end {
        self.write(delta, addr, FREE_BYTE)?;
      }
      return Ok(run);
    }

    if self.is_free(run.end(), new_len - old_len) {
      self.expand(delta, start as usize + new_len as usize)?;
      return Ok(run);
    }

    let dest = self.find_free_space(new_len)?;
    self.expand(delta, dest as usize + new_len as usize)?;
    tracing::debug!(
      from = start,
      to = dest,
      old_len = old_len,
      new_len = new_len,
      "relocating {}",
      run.format_name()
    );

    let live_end = run.end().min(self.len() as u32) as usize;
    let live = self.bytes[start as usize..live_end].to_vec();
    self.write_bytes(delta, dest, &live)?;
    for addr in start..live_end as u32 {
      self.write(delta, addr, FREE_BYTE)?;
    }

    self.runs.remove(&start);
    for &source in run.sources() {
      let destination = Destination::Address(dest);
      self.write_pointer(delta, source, destination)?;
      if let Some(pointer) = self.runs.get_mut(&source) {
        if pointer.destination().is_some() {
          *pointer = pointer.with_kind(RunKind::Pointer { destination });
        }
      }
    }

    let moved = run.relocated(dest);
    self.runs.insert(dest, moved.clone());
    Ok(moved)
  }
}
