//! Decoded cells.
//!
//! A cell is a single byte of the image, interpreted through the run that
//! covers it. Multi-byte values are reported on every byte they span, along
//! with the byte's position inside the value, so a viewer can decide where to
//! draw them.

use std::fmt;

use crate::anchor::Anchors;
use crate::gfx;
use crate::int::Width;
use crate::run::Destination;
use crate::run::Run;
use crate::run::RunKind;
use crate::run::TileStorage;
use crate::space::Model;

/// A displayable interpretation of one byte.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Cell {
  /// An address past the end of the image.
  Undefined,
  /// A byte with no known format.
  Byte(u8),
  /// A byte that something points at, but whose format is unknown.
  Anchor {
    /// The anchor's name, if it has one.
    name: Option<String>,
    /// The byte itself.
    value: u8,
  },
  /// One of the four bytes of a pointer.
  Pointer {
    /// The index of this byte within the pointer.
    position: u8,
    /// The pointer's destination.
    destination: Destination,
    /// The name of the destination, if it has one.
    name: Option<String>,
  },
  /// One of the two bytes of a blockmap entry.
  BlockmapEntry {
    /// The index of this byte within the entry.
    position: u8,
    /// The whole entry.
    value: u16,
  },
  /// A byte of packed pixels.
  Pixels {
    /// The tile this byte belongs to.
    tile: u32,
    /// The color index of the even pixel.
    low: u8,
    /// The color index of the odd pixel.
    high: u8,
  },
  /// A byte inside a compressed stream.
  Compressed {
    /// The offset of this byte from the start of the stream.
    offset: u32,
  },
  /// One of the two bytes of a palette color.
  Color {
    /// The index of this byte within the color.
    position: u8,
    /// The palette this color belongs to.
    palette: u32,
    /// The index of this color within its palette.
    index: u32,
    /// The color itself.
    color: gfx::Color,
  },
  /// One of the two bytes of a tile reference inside a block.
  TileRef {
    /// The index of this byte within the reference.
    position: u8,
    /// The block this reference belongs to.
    block: u32,
    /// The index of this reference within its block.
    slot: u32,
    /// The decoded reference.
    entry: gfx::TileRef,
  },
  /// A byte of a block attribute record.
  Attribute {
    /// The block this record belongs to.
    block: u32,
    /// The offset of this byte within the record.
    offset: u32,
    /// The byte itself.
    value: u8,
  },
}

impl Cell {
  /// Returns the block index selected by a blockmap entry.
  pub fn block(&self) -> Option<u16> {
    match self {
      Self::BlockmapEntry { value, .. } => Some(value & 0x3ff),
      _ => None,
    }
  }
}

impl fmt::Display for Cell {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match self {
      Self::Undefined => Ok(()),
      Self::Byte(value) => write!(f, "{:02X}", value),
      Self::Anchor {
        name: Some(name),
        value,
      } => write!(f, "^{} {:02X}", name, value),
      Self::Anchor { name: None, value } => write!(f, "^{:02X}", value),
      Self::Pointer {
        position: 0,
        name: Some(name),
        ..
      } => write!(f, "<{}>", name),
      Self::Pointer {
        position: 0,
        destination,
        ..
      } => write!(f, "<{}>", destination),
      Self::Pointer { .. } => Ok(()),
      Self::BlockmapEntry { position: 0, value } => {
        write!(f, "{}:{}", value >> 10, value & 0x3ff)
      }
      Self::BlockmapEntry { .. } => Ok(()),
      Self::Pixels { low, high, .. } => write!(f, "{:X}{:X}", low, high),
      Self::Compressed { offset: 0 } => write!(f, "lz"),
      Self::Compressed { .. } => write!(f, "..."),
      Self::Color {
        position: 0, color, ..
      } => write!(f, "{}", color),
      Self::Color { .. } => Ok(()),
      Self::TileRef {
        position: 0, entry, ..
      } => write!(f, "{}", entry),
      Self::TileRef { .. } => Ok(()),
      Self::Attribute { value, .. } => write!(f, "{:02X}", value),
    }
  }
}

impl Run {
  /// Decodes the byte at `addr`, which must lie inside this run.
  ///
  /// Reads that fall off the end of the image produce `Cell::Undefined`.
  pub fn decode_cell(
    &self,
    model: &Model,
    addr: u32,
    anchors: &dyn Anchors,
  ) -> Cell {
    let byte = match model.byte(addr) {
      Some(byte) if self.contains(addr) => byte,
      Some(byte) => return Cell::Byte(byte),
      None => return Cell::Undefined,
    };
    let offset = addr - self.start();
    // Reads the little-endian 16-bit entry containing `addr`. Entries are
    // counted from the start of the run, which need not be even.
    let read_u16 = || {
      model
        .read_int(self.start() + (offset & !1), Width::I16)
        .map(|i| i.to_u32() as u16)
    };

    match self.kind() {
      RunKind::NoInfo => Cell::Anchor {
        name: anchors.address_to_name(self.start()).map(String::from),
        value: byte,
      },
      RunKind::Pointer { .. } => {
        let destination = model
          .read_pointer(self.start())
          .unwrap_or(Destination::Null);
        let name = destination
          .address()
          .and_then(|dest| anchors.address_to_name(dest))
          .map(String::from);
        Cell::Pointer {
          position: offset as u8,
          destination,
          name,
        }
      }
      RunKind::Blockmap { .. } => match read_u16() {
        Some(value) => Cell::BlockmapEntry {
          position: (offset % 2) as u8,
          value,
        },
        None => Cell::Undefined,
      },
      RunKind::Tiles(TileStorage::Raw { .. }) => Cell::Pixels {
        tile: offset / gfx::Tile::LEN as u32,
        low: byte & 0xf,
        high: byte >> 4,
      },
      RunKind::Tiles(TileStorage::Lz { .. }) => Cell::Compressed { offset },
      RunKind::Palettes => match read_u16() {
        Some(raw) => Cell::Color {
          position: (offset % 2) as u8,
          palette: offset / gfx::Palette::LEN as u32,
          index: offset % gfx::Palette::LEN as u32 / 2,
          color: gfx::Color::from_bgr555(raw),
        },
        None => Cell::Undefined,
      },
      RunKind::Blocks { .. } => match read_u16() {
        Some(raw) => Cell::TileRef {
          position: (offset % 2) as u8,
          block: offset / gfx::Block::LEN as u32,
          slot: offset % gfx::Block::LEN as u32 / 2,
          entry: gfx::TileRef::decode(raw),
        },
        None => Cell::Undefined,
      },
      RunKind::Attributes { width, .. } => Cell::Attribute {
        block: offset / width.max(1),
        offset: offset % width.max(1),
        value: byte,
      },
    }
  }
}
