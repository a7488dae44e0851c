//! The address space: a cartridge image overlaid with an index of runs.
//!
//! A [`Model`] owns both the bytes and the runs describing them. Runs are kept
//! in a map keyed by start address; they are ordered and never overlap, and an
//! address covered by no run is a plain byte with no known format.
//!
//! All mutation goes through a [`Delta`], which records the previous value of
//! every byte touched.
//!
//! [`Model`]: struct.Model.html
//! [`Delta`]: ../delta/struct.Delta.html

use std::collections::BTreeMap;

use thiserror::Error;

use crate::anchor::Anchors;
use crate::delta::Delta;
use crate::int::Int;
use crate::int::Width;
use crate::rom;
use crate::rom::Gba;
use crate::rom::Version;
use crate::run::Cell;
use crate::run::Destination;
use crate::run::Run;
use crate::run::RunKind;

mod relocate;

/// The byte unused cartridge space is filled with.
pub const FREE_BYTE: u8 = 0xff;

/// An error raised when the address space cannot make room.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Error)]
pub enum SpaceError {
  /// Growing the image would take it past the largest cartridge the bus can
  /// address. Nothing was written.
  #[error("cartridge image cannot grow to {requested:#x} bytes")]
  Exhausted {
    /// The length the image would have needed.
    requested: usize,
  },
}

/// A cartridge image and its run index.
#[derive(Clone, Debug, Default)]
pub struct Model {
  bytes: Vec<u8>,
  runs: BTreeMap<u32, Run>,
}

impl Model {
  /// Creates a new `Model` with no known runs.
  pub fn new(bytes: Vec<u8>) -> Self {
    Self {
      bytes,
      runs: BTreeMap::new(),
    }
  }

  /// Returns the number of bytes in the image.
  pub fn len(&self) -> usize {
    self.bytes.len()
  }

  /// Returns true if the image is empty.
  pub fn is_empty(&self) -> bool {
    self.bytes.is_empty()
  }

  /// Returns the raw image.
  pub fn bytes(&self) -> &[u8] {
    &self.bytes
  }

  /// Consumes this `Model`, returning the raw image.
  pub fn into_bytes(self) -> Vec<u8> {
    self.bytes
  }

  /// Gets the byte at `addr`, if it is inside the image.
  pub fn byte(&self, addr: u32) -> Option<u8> {
    self.bytes.get(addr as usize).copied()
  }

  /// Reads a little-endian integer at `addr`.
  pub fn read_int(&self, addr: u32, width: Width) -> Option<Int> {
    Int::read_le(self.bytes.get(addr as usize..)?, width)
  }

  /// Reads the pointer stored at `addr`.
  pub fn read_pointer(&self, addr: u32) -> Option<Destination> {
    self
      .read_int(addr, Width::I32)
      .map(|raw| Destination::from_raw(raw.to_u32()))
  }

  /// Reads the pointer at `addr`, returning its destination if it leads into
  /// the image.
  pub fn pointer_target(&self, addr: u32) -> Option<u32> {
    self
      .read_pointer(addr)?
      .address()
      .filter(|&dest| (dest as usize) < self.len())
  }

  /// Returns the four-character game code from the cartridge header.
  pub fn game_code(&self) -> String {
    rom::game_code(&self.bytes)
  }

  /// Returns the cartridge family, as detected from the game code.
  pub fn version(&self) -> Version {
    Version::detect(&self.game_code())
  }

  /// Returns an iterator over all known runs, in address order.
  pub fn runs(&self) -> impl Iterator<Item = &Run> {
    self.runs.values()
  }

  /// Returns the run starting exactly at `start`, if any.
  pub fn run_at(&self, start: u32) -> Option<&Run> {
    self.runs.get(&start)
  }

  /// Returns the run whose extent contains `addr`, if any.
  pub fn run_covering(&self, addr: u32) -> Option<&Run> {
    self
      .runs
      .range(..=addr)
      .next_back()
      .map(|(_, run)| run)
      .filter(|run| run.contains(addr))
  }

  /// Returns the first run starting at or after `addr`.
  ///
  /// If there is none, returns an anchor sitting just past the end of the
  /// image; see [`is_end`](#method.is_end).
  pub fn next_run(&self, addr: u32) -> Run {
    match self.runs.range(addr..).next() {
      Some((_, run)) => run.clone(),
      None => Run::new(self.len() as u32, RunKind::NoInfo),
    }
  }

  /// Returns true if `run` starts at or past the end of the image, as the
  /// synthetic run returned by `next_run()` does.
  pub fn is_end(&self, run: &Run) -> bool {
    run.start() as usize >= self.len()
  }

  /// Writes `byte` to `addr`, growing the image first if needed.
  pub fn write(
    &mut self,
    delta: &mut Delta,
    addr: u32,
    byte: u8,
  ) -> Result<(), SpaceError> {
    self.expand(delta, addr as usize + 1)?;
    let slot = &mut self.bytes[addr as usize];
    delta.record(addr, *slot, byte);
    *slot = byte;
    Ok(())
  }

  /// Writes `bytes` starting at `addr`.
  pub fn write_bytes(
    &mut self,
    delta: &mut Delta,
    addr: u32,
    bytes: &[u8],
  ) -> Result<(), SpaceError> {
    self.expand(delta, addr as usize + bytes.len())?;
    for (i, &byte) in bytes.iter().enumerate() {
      self.write(delta, addr + i as u32, byte)?;
    }
    Ok(())
  }

  /// Writes a little-endian integer at `addr`.
  pub fn write_int(
    &mut self,
    delta: &mut Delta,
    addr: u32,
    value: Int,
  ) -> Result<(), SpaceError> {
    self.expand(delta, addr as usize + value.width().bytes())?;
    for (i, byte) in value.le_bytes().enumerate() {
      self.write(delta, addr + i as u32, byte)?;
    }
    Ok(())
  }

  /// Writes the four bytes of a pointer to `destination` at `addr`.
  ///
  /// This only changes bytes; use `observe_run_written()` to keep the run
  /// index in sync.
  pub fn write_pointer(
    &mut self,
    delta: &mut Delta,
    addr: u32,
    destination: Destination,
  ) -> Result<(), SpaceError> {
    self.write_int(delta, addr, Int::I32(destination.to_raw()))
  }

  /// Runs `edit` as a single unit.
  ///
  /// If `edit` fails, every byte it wrote is restored, the run index goes back
  /// to how it stood, and `delta` is left untouched. Otherwise its changes are
  /// folded into `delta`.
  pub fn atomically<T, E>(
    &mut self,
    delta: &mut Delta,
    edit: impl FnOnce(&mut Model, &mut Delta) -> Result<T, E>,
  ) -> Result<T, E> {
    let runs = self.runs.clone();
    let mut scratch = Delta::new();
    match edit(self, &mut scratch) {
      Ok(value) => {
        delta.absorb(&scratch);
        Ok(value)
      }
      Err(error) => {
        tracing::debug!(bytes = scratch.len(), "rolling back failed edit");
        scratch.revert(self);
        self.runs = runs;
        Err(error)
      }
    }
  }

  /// Grows the image to at least `len` bytes, filling new space with
  /// `FREE_BYTE`.
  fn expand(&mut self, delta: &mut Delta, len: usize) -> Result<(), SpaceError> {
    if len <= self.bytes.len() {
      return Ok(());
    }
    if len > Gba::MAX_LEN {
      return Err(SpaceError::Exhausted { requested: len });
    }
    tracing::debug!(from = self.bytes.len(), to = len, "expanding image");
    delta.record_growth(self.bytes.len());
    self.bytes.resize(len, FREE_BYTE);
    Ok(())
  }

  pub(crate) fn restore(&mut self, addr: u32, byte: u8) {
    if let Some(slot) = self.bytes.get_mut(addr as usize) {
      *slot = byte;
    }
  }

  pub(crate) fn truncate(&mut self, len: usize) {
    self.bytes.truncate(len);
  }

  /// Registers `run`, replacing every run it overlaps.
  ///
  /// If a run already started at the same address, its sources carry over to
  /// the new run. Pointer runs are linked to their destination, which gains
  /// an anchor if nothing is known about it yet.
  ///
  /// Returns the run as it was registered.
  pub fn observe_run_written(&mut self, mut run: Run) -> Run {
    if let Some(existing) = self.runs.get(&run.start()) {
      for &source in existing.sources() {
        run.add_source(source);
      }
    }
    let start = run.start();
    self.clear_format(start, run.len().max(1));
    tracing::debug!(
      start = start,
      len = run.len(),
      format = run.format_name(),
      "observed run"
    );
    let is_pointer = run.destination().is_some();
    self.runs.insert(start, run);
    if is_pointer {
      self.link(start);
    }
    self.runs[&start].clone()
  }

  /// Registers an anchor at `addr`, unless a run already starts there.
  pub fn observe_anchor(&mut self, addr: u32) -> Run {
    match self.runs.get(&addr) {
      Some(run) => run.clone(),
      None => self.observe_run_written(Run::new(addr, RunKind::NoInfo)),
    }
  }

  /// Removes every run overlapping `start..start + len`.
  ///
  /// Removed pointers are unlinked from their destinations. A removed run
  /// that starts before `start` and is still referred to is replaced with an
  /// anchor, so its sources are not lost.
  pub fn clear_format(&mut self, start: u32, len: u32) {
    let end = start.saturating_add(len);
    let doomed = self
      .runs
      .range(..end)
      .rev()
      .take_while(|(&addr, run)| addr >= start || run.end() > start)
      .map(|(&addr, _)| addr)
      .collect::<Vec<_>>();

    for addr in doomed {
      let run = match self.runs.remove(&addr) {
        Some(run) => run,
        None => continue,
      };
      if let Some(destination) = run.destination() {
        self.unlink(addr, destination);
      }
      if run.start() < start && !run.sources().is_empty() {
        let anchor = Run::with_sources(
          run.start(),
          run.sources().iter().copied(),
          RunKind::NoInfo,
        );
        self.runs.insert(anchor.start(), anchor);
      }
    }
  }

  /// Adds the pointer at `source` to the sources of its destination.
  fn link(&mut self, source: u32) {
    let dest = match self.runs.get(&source).and_then(Run::destination) {
      Some(Destination::Address(dest)) => dest,
      _ => return,
    };
    if let Some(run) = self.runs.get_mut(&dest) {
      run.add_source(source);
      return;
    }
    if (dest as usize) < self.len() && self.run_covering(dest).is_none() {
      let anchor = Run::with_sources(dest, Some(source), RunKind::NoInfo);
      self.runs.insert(dest, anchor);
    }
  }

  /// Removes the pointer at `source` from the sources of `destination`.
  ///
  /// An anchor left with no sources is forgotten.
  fn unlink(&mut self, source: u32, destination: Destination) {
    let dest = match destination {
      Destination::Address(dest) => dest,
      _ => return,
    };
    let now_unreferenced = match self.runs.get_mut(&dest) {
      Some(run) => {
        run.remove_source(source);
        run.is_no_info() && run.sources().is_empty()
      }
      None => false,
    };
    if now_unreferenced {
      self.runs.remove(&dest);
    }
  }

  /// Decodes the cell at `addr` into a displayable value.
  pub fn decode_cell(&self, addr: u32, anchors: &dyn Anchors) -> Cell {
    let byte = match self.byte(addr) {
      Some(byte) => byte,
      None => return Cell::Undefined,
    };
    match self.run_covering(addr) {
      Some(run) => run.decode_cell(self, addr, anchors),
      None => Cell::Byte(byte),
    }
  }
}
