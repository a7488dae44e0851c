//! Blocks: 16x16 composites of eight tiles.
//!
//! A block is two layers of four tiles each. Each layer covers the block's
//! four 8x8 quadrants in reading order:
//!
//! ```text
//! +---+---+
//! | 0 | 1 |   bottom layer: entries 0..4
//! +---+---+   top layer:    entries 4..8
//! | 2 | 3 |
//! +---+---+
//! ```

use std::fmt;

use crate::gfx::Color;
use crate::gfx::Palette;
use crate::gfx::Tile;

/// A reference to a tile from inside a block.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
pub struct TileRef {
  /// The tile slot, out of 1024.
  pub tile: u16,
  /// Whether to mirror the tile left to right.
  pub hflip: bool,
  /// Whether to mirror the tile top to bottom.
  pub vflip: bool,
  /// The palette slot.
  pub palette: u8,
}

impl TileRef {
  /// Decodes a reference from its packed form.
  pub fn decode(raw: u16) -> Self {
    Self {
      tile: raw & 0x3ff,
      hflip: raw & 0x400 != 0,
      vflip: raw & 0x800 != 0,
      palette: (raw >> 12) as u8,
    }
  }

  /// Packs this reference.
  pub fn encode(self) -> u16 {
    (self.tile & 0x3ff)
      | (self.hflip as u16) << 10
      | (self.vflip as u16) << 11
      | (self.palette as u16 & 0xf) << 12
  }
}

impl fmt::Display for TileRef {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "{:03X}/{:X}", self.tile, self.palette)?;
    if self.hflip {
      write!(f, "h")?;
    }
    if self.vflip {
      write!(f, "v")?;
    }
    Ok(())
  }
}

/// A block: eight tile references, bottom layer first.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
pub struct Block(pub [TileRef; 8]);

impl Block {
  /// The size of a packed block, in bytes.
  pub const LEN: usize = 16;

  /// Decodes a block. Missing bytes read as zero.
  pub fn decode(bytes: &[u8]) -> Self {
    let mut block = Self::default();
    for (entry, pair) in block.0.iter_mut().zip(bytes.chunks_exact(2)) {
      *entry = TileRef::decode(u16::from_le_bytes([pair[0], pair[1]]));
    }
    block
  }

  /// Packs this block.
  pub fn encode(&self) -> [u8; Self::LEN] {
    let mut bytes = [0; Self::LEN];
    for (pair, entry) in bytes.chunks_exact_mut(2).zip(&self.0) {
      pair.copy_from_slice(&entry.encode().to_le_bytes());
    }
    bytes
  }

  /// The four references drawn first.
  pub fn bottom(&self) -> &[TileRef] {
    &self.0[..4]
  }

  /// The four references drawn over the bottom layer.
  pub fn top(&self) -> &[TileRef] {
    &self.0[4..]
  }
}

/// A rectangle of colors.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Canvas {
  width: usize,
  height: usize,
  pixels: Vec<Color>,
}

impl Canvas {
  /// Creates a canvas filled with color zero.
  pub fn new(width: usize, height: usize) -> Self {
    Self {
      width,
      height,
      pixels: vec![Color::default(); width * height],
    }
  }

  /// Returns the width of this canvas, in pixels.
  pub fn width(&self) -> usize {
    self.width
  }

  /// Returns the height of this canvas, in pixels.
  pub fn height(&self) -> usize {
    self.height
  }

  /// Returns the pixels in row-major order.
  pub fn pixels(&self) -> &[Color] {
    &self.pixels
  }

  /// Returns the color at (`x`, `y`), if it is on the canvas.
  pub fn pixel(&self, x: usize, y: usize) -> Option<Color> {
    if x >= self.width || y >= self.height {
      return None;
    }
    self.pixels.get(y * self.width + x).copied()
  }

  /// Copies `other` onto this canvas with its corner at (`x`, `y`).
  ///
  /// Every pixel is copied, whatever its color. Pixels falling off the edge
  /// are dropped.
  pub fn draw(&mut self, other: &Canvas, x: usize, y: usize) {
    for yy in 0..other.height {
      for xx in 0..other.width {
        let (dx, dy) = (x + xx, y + yy);
        if dx < self.width && dy < self.height {
          self.pixels[dy * self.width + dx] = other.pixels[yy * other.width + xx];
        }
      }
    }
  }
}

/// Renders the tile `entry` refers to, as an 8x8 canvas.
///
/// A palette slot outside `palettes`, or a tile slot that is out of range or
/// empty, renders as color zero.
pub fn render_tile(
  entry: TileRef,
  tiles: &[Option<Tile>],
  palettes: &[Palette],
) -> Canvas {
  let mut canvas = Canvas::new(8, 8);
  let palette = match palettes.get(entry.palette as usize) {
    Some(palette) => palette,
    None => return canvas,
  };
  let mut tile = match tiles.get(entry.tile as usize) {
    Some(Some(tile)) => *tile,
    _ => return canvas,
  };
  if entry.hflip {
    tile = tile.hflip();
  }
  if entry.vflip {
    tile = tile.vflip();
  }

  for (y, row) in tile.0.iter().enumerate() {
    for (x, &index) in row.iter().enumerate() {
      canvas.pixels[y * 8 + x] = palette.0[index as usize & 0xf];
    }
  }
  canvas
}

/// Renders `block` as a 16x16 canvas.
///
/// The top layer is drawn over the bottom layer in full.
pub fn render_block(
  block: &Block,
  tiles: &[Option<Tile>],
  palettes: &[Palette],
) -> Canvas {
  let mut canvas = Canvas::new(16, 16);
  for layer in &[block.bottom(), block.top()] {
    for (i, &entry) in layer.iter().enumerate() {
      let tile = render_tile(entry, tiles, palettes);
      canvas.draw(&tile, i % 2 * 8, i / 2 * 8);
    }
  }
  canvas
}
