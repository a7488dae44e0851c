//! Runs: typed interpretations of byte ranges.
//!
//! A `Run` overlays a region of the cartridge with a meaning: a pointer, a
//! compressed tileset, a blockmap, and so on. Runs never hold references to
//! each other; a run only records the *addresses* of the pointers that refer to
//! it, and everything else is looked up through the [`Model`].
//!
//! [`Model`]: ../space/struct.Model.html

use crate::gfx;
use crate::int::Int;
use crate::int::Width;
use crate::space::Model;

mod cell;
mod edit;
mod pointer;

pub use cell::*;
pub use edit::*;
pub use pointer::*;

/// How a tile table stores its tiles.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum TileStorage {
  /// Packed 4bpp tiles, 32 bytes each.
  Raw {
    /// The number of tiles in the table.
    count: u32,
  },
  /// A single LZ77-compressed stream of packed tiles.
  Lz {
    /// The length of the compressed stream, including its header.
    compressed_len: u32,
    /// The number of tiles the stream decompresses to.
    tiles: u32,
  },
}

/// The closed set of run variants.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum RunKind {
  /// An anchor: a location something refers to, with no known format.
  NoInfo,
  /// A four-byte pointer.
  Pointer {
    /// The destination this pointer was linked to when it was observed.
    destination: Destination,
  },
  /// A grid of 16-bit block indices.
  Blockmap {
    /// Width of the grid, in blocks.
    width: u32,
    /// Height of the grid, in blocks.
    height: u32,
  },
  /// A table of tiles.
  Tiles(TileStorage),
  /// A table of sixteen 16-color palettes.
  Palettes,
  /// A table of 16-byte blocks.
  Blocks {
    /// The number of blocks in the table.
    count: u32,
  },
  /// A table of per-block attribute records.
  Attributes {
    /// The number of records in the table.
    count: u32,
    /// The size of one record, in bytes.
    width: u32,
  },
}

/// A typed, addressed, length-bounded interpretation of a byte range.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Run {
  start: u32,
  sources: Vec<u32>,
  kind: RunKind,
}

impl Run {
  /// Creates a new run with no known sources.
  pub fn new(start: u32, kind: RunKind) -> Self {
    Self {
      start,
      sources: Vec::new(),
      kind,
    }
  }

  /// Creates a new run referred to by the pointers at `sources`.
  pub fn with_sources(
    start: u32,
    sources: impl IntoIterator<Item = u32>,
    kind: RunKind,
  ) -> Self {
    let mut sources = sources.into_iter().collect::<Vec<_>>();
    sources.sort();
    sources.dedup();
    Self {
      start,
      sources,
      kind,
    }
  }

  /// Creates a pointer run for the four bytes at `start`, linked to whatever
  /// they currently point at.
  pub fn pointer(model: &Model, start: u32) -> Self {
    let destination = model.read_pointer(start).unwrap_or(Destination::Null);
    Self::new(start, RunKind::Pointer { destination })
  }

  /// Creates a blockmap run, taking its dimensions from the layout header
  /// that owns the first of `sources`.
  ///
  /// The header sits twelve bytes before the layout's blockmap pointer. A
  /// blockmap with no sources, or an unreadable header, gets no cells.
  pub fn blockmap(
    model: &Model,
    start: u32,
    sources: impl IntoIterator<Item = u32>,
  ) -> Self {
    let mut run = Self::with_sources(start, sources, RunKind::NoInfo);
    let header = run
      .sources
      .first()
      .and_then(|&source| source.checked_sub(crate::map::Layout::MAP));
    let read = |offset| {
      header
        .and_then(|header| model.read_int(header + offset, Width::I32))
        .map(Int::to_u32)
        .unwrap_or(0)
    };
    run.kind = RunKind::Blockmap {
      width: read(crate::map::Layout::WIDTH),
      height: read(crate::map::Layout::HEIGHT),
    };
    run
  }

  /// Returns the first address of this run.
  pub fn start(&self) -> u32 {
    self.start
  }

  /// Returns the length of this run, in bytes.
  ///
  /// This depends only on the run's own fields.
  pub fn len(&self) -> u32 {
    match self.kind {
      RunKind::NoInfo => 1,
      RunKind::Pointer { .. } => 4,
      RunKind::Blockmap { width, height } => {
        width.saturating_mul(height).saturating_mul(2)
      }
      RunKind::Tiles(TileStorage::Raw { count }) => {
        count.saturating_mul(gfx::Tile::LEN as u32)
      }
      RunKind::Tiles(TileStorage::Lz { compressed_len, .. }) => compressed_len,
      RunKind::Palettes => {
        (gfx::PALETTES_PER_TABLE * gfx::Palette::LEN) as u32
      }
      RunKind::Blocks { count } => {
        count.saturating_mul(gfx::Block::LEN as u32)
      }
      RunKind::Attributes { count, width } => count.saturating_mul(width),
    }
  }

  /// Returns true if this run covers no bytes.
  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Returns the first address past the end of this run.
  pub fn end(&self) -> u32 {
    self.start.saturating_add(self.len())
  }

  /// Returns true if `addr` is inside this run.
  pub fn contains(&self, addr: u32) -> bool {
    self.start <= addr && addr < self.end()
  }

  /// Returns the addresses of the pointers that refer to this run, sorted.
  pub fn sources(&self) -> &[u32] {
    &self.sources
  }

  /// Returns this run's variant.
  pub fn kind(&self) -> RunKind {
    self.kind
  }

  /// Returns true if this is an anchor with no format.
  pub fn is_no_info(&self) -> bool {
    self.kind == RunKind::NoInfo
  }

  /// Returns the destination of this run, if it is a pointer.
  pub fn destination(&self) -> Option<Destination> {
    match self.kind {
      RunKind::Pointer { destination } => Some(destination),
      _ => None,
    }
  }

  /// Returns a short name for this run's format.
  pub fn format_name(&self) -> &'static str {
    match self.kind {
      RunKind::NoInfo => "",
      RunKind::Pointer { .. } => "ptr",
      RunKind::Blockmap { .. } => "blm",
      RunKind::Tiles(TileStorage::Raw { .. }) => "til",
      RunKind::Tiles(TileStorage::Lz { .. }) => "lzt",
      RunKind::Palettes => "pal",
      RunKind::Blocks { .. } => "blk",
      RunKind::Attributes { .. } => "atr",
    }
  }

  /// Returns a copy of this run moved to `start`.
  #[must_use]
  pub fn relocated(&self, start: u32) -> Self {
    Self {
      start,
      ..self.clone()
    }
  }

  /// Returns a copy of this run with a different variant.
  #[must_use]
  pub fn with_kind(&self, kind: RunKind) -> Self {
    Self {
      kind,
      ..self.clone()
    }
  }

  /// Returns a copy of this run with a different set of sources.
  #[must_use]
  pub fn with_new_sources(&self, sources: impl IntoIterator<Item = u32>) -> Self {
    Self::with_sources(self.start, sources, self.kind)
  }

  pub(crate) fn add_source(&mut self, source: u32) {
    if let Err(i) = self.sources.binary_search(&source) {
      self.sources.insert(i, source);
    }
  }

  pub(crate) fn remove_source(&mut self, source: u32) {
    if let Ok(i) = self.sources.binary_search(&source) {
      self.sources.remove(i);
    }
  }
}
