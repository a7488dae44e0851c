//! Test fixtures: hand-built cartridge images.

use crate::gfx::lz;
use crate::gfx::BankCounts;
use crate::gfx::BankPair;
use crate::gfx::Block;
use crate::gfx::Color;
use crate::gfx::Palette;
use crate::gfx::Tile;
use crate::gfx::TileRef;
use crate::gfx::PALETTES_PER_TABLE;
use crate::rom::Gba;
use crate::rom::Version;
use crate::rom::GAME_CODE_OFFSET;
use crate::run::Run;
use crate::space::Model;
use crate::space::FREE_BYTE;

/// Builds a cartridge image byte by byte.
///
/// The image starts out as free space, except for a zeroed header carrying a
/// Ruby/Sapphire/Emerald game code.
pub struct RomBuilder {
  bytes: Vec<u8>,
}

impl RomBuilder {
  const HEADER_LEN: usize = 0xc0;

  pub fn new(len: usize) -> Self {
    let mut bytes = vec![FREE_BYTE; len];
    let header = Self::HEADER_LEN.min(len);
    bytes[..header].iter_mut().for_each(|b| *b = 0);
    Self { bytes }.game_code("AXVE")
  }

  pub fn game_code(self, code: &str) -> Self {
    self.fill(GAME_CODE_OFFSET, code.as_bytes())
  }

  pub fn pointer(self, at: u32, dest: u32) -> Self {
    self.fill(at as usize, &Gba::unmap(dest).to_le_bytes())
  }

  pub fn fill(mut self, at: usize, bytes: &[u8]) -> Self {
    self.bytes[at..at + bytes.len()].copy_from_slice(bytes);
    self
  }

  pub fn build(self) -> Model {
    Model::new(self.bytes)
  }
}

fn solid(index: u8) -> Tile {
  Tile([[index; 8]; 8])
}

fn palettes(blue: u8) -> Vec<u8> {
  (0..PALETTES_PER_TABLE)
    .flat_map(|p| {
      let mut palette = Palette::default();
      for (i, color) in palette.0.iter_mut().enumerate() {
        *color = Color::new(i as u8, p as u8, blue);
      }
      palette.encode()
    })
    .collect()
}

fn attributes(values: impl Iterator<Item = u32>, width: usize) -> Vec<u8> {
  values
    .flat_map(|value| value.to_le_bytes()[..width].to_vec())
    .collect()
}

/// A small map with a primary and a secondary blockset.
///
/// - A 4x4 layout at `layout`, whose cell `(x, y)` holds `y * 4 + x`.
/// - A raw primary blockset: tile `i` is solid color `i`, block `i` uses tile
///   descriptor `i` everywhere, attribute `i` is `i`. Palette `p` has
///   color `i` at `Color::new(i, p, 0)`.
/// - A compressed secondary blockset: tile `j` is solid color `8 + j`, and
///   block `j` draws the `j`th secondary tile with the first secondary
///   palette. Attribute `j` is `0x100 + j`; colors have a blue of 1.
///
/// Every header pointer has been registered with the model.
pub struct MapFixture {
  pub model: Model,
  pub layout: u32,
  pub primary: u32,
  pub secondary: u32,
  pub primary_tiles: usize,
  pub primary_blocks: usize,
  pub secondary_tiles: usize,
  pub secondary_blocks: usize,
}

impl MapFixture {
  pub fn new(code: &str) -> Self {
    let (layout, primary, secondary) = (0x200, 0x240, 0x260);
    let (primary_tiles, primary_blocks) = (8, 8);
    let (secondary_tiles, secondary_blocks) = (4, 4);
    let counts = BankCounts::for_version(Version::detect(code));
    let width = counts.attribute_width;
    let attr = counts.attribute_offset;

    let cells = (0..16u16).flat_map(|i| i.to_le_bytes()).collect::<Vec<_>>();
    let primary_tile_bytes = (0..primary_tiles as u8)
      .flat_map(|i| solid(i).encode())
      .collect::<Vec<_>>();
    let secondary_tile_bytes = (0..secondary_tiles as u8)
      .flat_map(|j| solid(8 + j).encode())
      .collect::<Vec<_>>();
    let primary_block_bytes = (0..primary_blocks as u16)
      .flat_map(|i| Block([TileRef::decode(i); 8]).encode())
      .collect::<Vec<_>>();
    let secondary_block_bytes = (0..secondary_blocks as u16)
      .flat_map(|j| {
        let entry = TileRef {
          tile: counts.primary_tiles as u16 + j,
          palette: counts.primary_palettes as u8,
          ..TileRef::default()
        };
        Block([entry; 8]).encode()
      })
      .collect::<Vec<_>>();

    let builder = RomBuilder::new(0x4000)
      .game_code(code)
      // Layout header.
      .fill(layout as usize, &4u32.to_le_bytes())
      .fill(layout as usize + 4, &4u32.to_le_bytes())
      .pointer(layout + 8, 0x300)
      .pointer(layout + 12, 0x400)
      .pointer(layout + 16, primary)
      .pointer(layout + 20, secondary)
      .fill(layout as usize + 24, &[2, 2])
      .fill(0x300, &[0; 8])
      .fill(0x400, &cells)
      // Primary blockset.
      .fill(primary as usize, &[0, 0])
      .pointer(primary + 4, 0x1000)
      .pointer(primary + 8, 0x1100)
      .pointer(primary + 12, 0x1400)
      .pointer(primary + attr, 0x1480)
      .fill(0x1000, &primary_tile_bytes)
      .fill(0x1100, &palettes(0))
      .fill(0x1400, &primary_block_bytes)
      .fill(0x1480, &attributes(0..primary_blocks as u32, width))
      // Secondary blockset.
      .fill(secondary as usize, &[1, 1])
      .pointer(secondary + 4, 0x1800)
      .pointer(secondary + 8, 0x1900)
      .pointer(secondary + 12, 0x1c00)
      .pointer(secondary + attr, 0x1c40)
      .fill(0x1800, &lz::compress(&secondary_tile_bytes))
      .fill(0x1900, &palettes(1))
      .fill(0x1c00, &secondary_block_bytes)
      .fill(
        0x1c40,
        &attributes((0..secondary_blocks as u32).map(|j| 0x100 + j), width),
      );

    let mut model = builder.build();
    let pointers = [8, 12, 16, 20]
      .iter()
      .map(|&offset| layout + offset)
      .chain([4, 8, 12, attr].iter().map(|&offset| primary + offset))
      .chain([4, 8, 12, attr].iter().map(|&offset| secondary + offset))
      .collect::<Vec<_>>();
    for at in pointers {
      model.observe_run_written(Run::pointer(&model, at));
    }

    Self {
      model,
      layout,
      primary,
      secondary,
      primary_tiles,
      primary_blocks,
      secondary_tiles,
      secondary_blocks,
    }
  }

  /// Returns the fixture's bank pair.
  pub fn banks(&self) -> BankPair {
    BankPair::new(&self.model, self.primary, Some(self.secondary))
  }
}
