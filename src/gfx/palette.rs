//! Colors and palettes.

use std::fmt;

/// A 15-bit color in display order: red in bits 10-14, green in bits 5-9, and
/// blue in bits 0-4.
///
/// The cartridge stores colors the other way around, with red in the low bits;
/// converting between the two swaps the red and blue fields.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
pub struct Color(pub u16);

/// Swaps the red and blue fields of a 5-5-5 color, leaving green and the
/// unused top bit alone.
///
/// This is its own inverse.
pub fn flip_channels(raw: u16) -> u16 {
  let low = raw & 0x1f;
  let high = (raw >> 10) & 0x1f;
  (raw & !0x7c1f) | low << 10 | high
}

impl Color {
  /// Creates a color from 5-bit channels.
  pub fn new(red: u8, green: u8, blue: u8) -> Self {
    let [r, g, b] = [red, green, blue].map(|c| (c & 0x1f) as u16);
    Self(r << 10 | g << 5 | b)
  }

  /// Decodes a color as stored in the cartridge.
  pub fn from_bgr555(raw: u16) -> Self {
    Self(flip_channels(raw))
  }

  /// Encodes this color as stored in the cartridge.
  pub fn to_bgr555(self) -> u16 {
    flip_channels(self.0)
  }

  /// The red channel, out of 31.
  pub fn red(self) -> u8 {
    (self.0 >> 10 & 0x1f) as u8
  }

  /// The green channel, out of 31.
  pub fn green(self) -> u8 {
    (self.0 >> 5 & 0x1f) as u8
  }

  /// The blue channel, out of 31.
  pub fn blue(self) -> u8 {
    (self.0 & 0x1f) as u8
  }

  /// Widens this color to 8 bits per channel.
  pub fn rgb888(self) -> (u8, u8, u8) {
    (self.red() << 3, self.green() << 3, self.blue() << 3)
  }
}

impl fmt::Display for Color {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "{}:{}:{}", self.red(), self.green(), self.blue())
  }
}

/// Sixteen colors. Color zero is the backdrop.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
pub struct Palette(pub [Color; 16]);

impl Palette {
  /// The size of a packed palette, in bytes.
  pub const LEN: usize = 32;

  /// Decodes a palette. Missing bytes read as zero.
  pub fn decode(bytes: &[u8]) -> Self {
    let mut palette = Self::default();
    for (color, pair) in palette.0.iter_mut().zip(bytes.chunks_exact(2)) {
      *color = Color::from_bgr555(u16::from_le_bytes([pair[0], pair[1]]));
    }
    palette
  }

  /// Encodes this palette.
  pub fn encode(&self) -> [u8; Self::LEN] {
    let mut bytes = [0; Self::LEN];
    for (pair, color) in bytes.chunks_exact_mut(2).zip(&self.0) {
      pair.copy_from_slice(&color.to_bgr555().to_le_bytes());
    }
    bytes
  }
}
