//! Tiles, palettes, blocks, and the banks that hold them.
//!
//! Map graphics are stored as *blocksets*. A map uses two at once: a primary
//! blockset shared by many maps, and a secondary one specific to a handful.
//! Each blockset holds four tables (tiles, palettes, blocks, and block
//! attributes), and each table is indexed as if the primary and secondary
//! tables were one contiguous table split at a fixed point. Where that split
//! lies depends on the game; see [`BankCounts`].
//!
//! [`BankCounts`]: struct.BankCounts.html

use thiserror::Error;

use crate::rom::Version;
use crate::space::SpaceError;

mod bank;
mod block;
mod blockset;
mod cache;
mod estimate;
pub mod lz;
mod palette;
mod tile;

pub use bank::BankPair;
pub use block::render_block;
pub use block::render_tile;
pub use block::Block;
pub use block::Canvas;
pub use block::TileRef;
pub use blockset::Blockset;
pub use cache::RenderCache;
pub use estimate::estimate_block_count;
pub use estimate::estimate_tile_count;
pub use lz::LzError;
pub use palette::Color;
pub use palette::Palette;
pub use tile::Tile;

/// The number of tile slots addressable by a block.
pub const TOTAL_TILES: usize = 1024;

/// The number of block slots addressable by a blockmap.
pub const TOTAL_BLOCKS: usize = 1024;

/// The number of palette slots a map can use.
pub const TOTAL_PALETTES: usize = 13;

/// The number of palettes stored in every palette table.
pub const PALETTES_PER_TABLE: usize = 16;

/// Where the primary bank ends and the secondary begins, for each kind of
/// table.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct BankCounts {
  /// Blocks in the primary bank.
  pub primary_blocks: usize,
  /// Tiles in the primary bank.
  pub primary_tiles: usize,
  /// Palettes in the primary bank.
  pub primary_palettes: usize,
  /// The size of one attribute record, in bytes.
  pub attribute_width: usize,
  /// The offset of the attribute pointer inside a blockset header.
  pub attribute_offset: u32,
}

impl BankCounts {
  /// Returns the split used by games of the given `version`.
  ///
  /// ```
  /// # use hexmap::gfx::BankCounts;
  /// # use hexmap::rom::Version;
  /// let counts = BankCounts::for_version(Version::detect("BPRE"));
  /// assert_eq!(counts.primary_tiles, 640);
  /// assert_eq!(counts.primary_palettes, 7);
  /// ```
  pub fn for_version(version: Version) -> Self {
    match version {
      Version::FireRedLeafGreen => Self {
        primary_blocks: 640,
        primary_tiles: 640,
        primary_palettes: 7,
        attribute_width: 4,
        attribute_offset: 20,
      },
      Version::RubySapphireEmerald => Self {
        primary_blocks: 512,
        primary_tiles: 512,
        primary_palettes: 6,
        attribute_width: 2,
        attribute_offset: 16,
      },
    }
  }

  /// Blocks in the secondary bank.
  pub fn secondary_blocks(&self) -> usize {
    TOTAL_BLOCKS - self.primary_blocks
  }

  /// Tiles in the secondary bank.
  pub fn secondary_tiles(&self) -> usize {
    TOTAL_TILES - self.primary_tiles
  }

  /// Palettes in the secondary bank.
  pub fn secondary_palettes(&self) -> usize {
    TOTAL_PALETTES - self.primary_palettes
  }
}

/// An error while reading or writing a blockset.
#[derive(Clone, PartialEq, Eq, Debug, Error)]
pub enum BankError {
  /// A header pointer did not lead into the image.
  #[error("pointer at {at:06X} does not lead into the image")]
  BadPointer {
    /// The address of the pointer.
    at: u32,
  },
  /// A compressed tile table could not be decoded.
  #[error("bad compressed tiles at {at:06X}: {error}")]
  Lz {
    /// The address of the compressed stream.
    at: u32,
    /// What went wrong.
    error: LzError,
  },
  /// More entries were given than the bank can hold.
  #[error("{count} {what} will not fit in a bank of {max}")]
  TooMany {
    /// The kind of entry.
    what: &'static str,
    /// The number of entries given.
    count: usize,
    /// The number of entries the bank holds.
    max: usize,
  },
  /// The image could not grow to hold the new table.
  #[error(transparent)]
  Space(#[from] SpaceError),
}
