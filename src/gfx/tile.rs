//! 4bpp tiles.

/// An 8x8 tile of 4-bit color indices, stored row-major.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
pub struct Tile(pub [[u8; 8]; 8]);

impl Tile {
  /// The size of a packed tile, in bytes.
  pub const LEN: usize = 32;

  /// A tile of color index zero.
  pub const EMPTY: Tile = Tile([[0; 8]; 8]);

  /// Unpacks a tile.
  ///
  /// Each byte holds two pixels: the low nibble is the even column and the
  /// high nibble the odd one. Missing bytes read as zero.
  pub fn decode(bytes: &[u8]) -> Self {
    let mut tile = Self::EMPTY;
    for (i, &byte) in bytes.iter().take(Self::LEN).enumerate() {
      let (y, x) = (i / 4, i % 4 * 2);
      tile.0[y][x] = byte & 0xf;
      tile.0[y][x + 1] = byte >> 4;
    }
    tile
  }

  /// Packs this tile.
  pub fn encode(&self) -> [u8; Self::LEN] {
    let mut bytes = [0; Self::LEN];
    for (i, byte) in bytes.iter_mut().enumerate() {
      let (y, x) = (i / 4, i % 4 * 2);
      *byte = (self.0[y][x] & 0xf) | (self.0[y][x + 1] & 0xf) << 4;
    }
    bytes
  }

  /// Returns the color index at (`x`, `y`).
  pub fn pixel(&self, x: usize, y: usize) -> u8 {
    self.0[y][x]
  }

  /// Returns this tile mirrored left to right.
  pub fn hflip(&self) -> Self {
    let mut out = Self::EMPTY;
    for y in 0..8 {
      for x in 0..8 {
        out.0[y][x] = self.0[y][7 - x];
      }
    }
    out
  }

  /// Returns this tile mirrored top to bottom.
  pub fn vflip(&self) -> Self {
    let mut out = Self::EMPTY;
    for y in 0..8 {
      out.0[y] = self.0[7 - y];
    }
    out
  }
}

/// Unpacks every whole tile in `bytes`.
pub fn decode_all(bytes: &[u8]) -> Vec<Tile> {
  bytes.chunks_exact(Tile::LEN).map(Tile::decode).collect()
}

/// Packs `tiles` back to back.
pub fn encode_all<'a>(tiles: impl IntoIterator<Item = &'a Tile>) -> Vec<u8> {
  tiles.into_iter().flat_map(|tile| tile.encode().to_vec()).collect()
}

#[cfg(test)]
mod test {
  use super::*;

  fn sample() -> Tile {
    let mut tile = Tile::EMPTY;
    for y in 0..8 {
      for x in 0..8 {
        tile.0[y][x] = ((x + 3 * y) % 16) as u8;
      }
    }
    tile
  }

  #[test]
  fn nibble_order() {
    let mut bytes = [0; 32];
    bytes[0] = 0x21;
    bytes[31] = 0xf0;
    let tile = Tile::decode(&bytes);
    assert_eq!(tile.pixel(0, 0), 1);
    assert_eq!(tile.pixel(1, 0), 2);
    assert_eq!(tile.pixel(6, 7), 0);
    assert_eq!(tile.pixel(7, 7), 0xf);
    assert_eq!(tile.encode(), bytes);
  }

  #[test]
  fn round_trip() {
    let tile = sample();
    assert_eq!(Tile::decode(&tile.encode()), tile);
    let tiles = [tile, Tile::EMPTY, tile.hflip()];
    assert_eq!(decode_all(&encode_all(&tiles)), tiles.to_vec());
  }

  #[test]
  fn flips() {
    let tile = sample();
    assert_eq!(tile.hflip().pixel(0, 2), tile.pixel(7, 2));
    assert_eq!(tile.vflip().pixel(3, 0), tile.pixel(3, 7));
    assert_eq!(tile.hflip().hflip(), tile);
    assert_eq!(tile.vflip().hflip(), tile.hflip().vflip());
  }

  #[test]
  fn short_input_is_padded() {
    let tile = Tile::decode(&[0x11; 4]);
    assert_eq!(tile.0[0], [1; 8]);
    assert_eq!(tile.0[1], [0; 8]);
  }
}
