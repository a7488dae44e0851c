//! Types and functions for describing GBA cartridge images.
//!
//! The GBA maps its cartridge ROM, unbanked, onto the bus starting at
//! `0x0800_0000`. Pointers stored inside the cartridge use bus addresses, while
//! everything in hexmap works in terms of physical offsets into the image; the
//! `Gba` type converts between the two.
//!
//! The layout of the cartridge header is described on
//! [GBATEK](https://problemkaputt.de/gbatek.htm#gbacartridgeheader).

use std::fmt;

/// The bus mapping of a GBA cartridge.
///
/// ```text
///   bus address                image offset
/// +------------------------+   +------------------------+
/// | $0800_0000..$09ff_ffff | = | $0000_0000..$01ff_ffff |
/// +------------------------+   +------------------------+
/// ```
/// The wait-state mirrors at `$0a00_0000` and `$0c00_0000` are never used for
/// data pointers, so they are treated as unmapped.
pub struct Gba;

impl Gba {
  /// The bus address of the first byte of the cartridge.
  pub const BASE: u32 = 0x0800_0000;

  /// The largest image the bus can address: thirty-two mebibytes.
  pub const MAX_LEN: usize = 0x0200_0000;

  /// Maps the bus address `bus` down to an image offset, if such a mapping
  /// exists.
  pub fn map(bus: u32) -> Option<u32> {
    if bus < Self::BASE || bus >= Self::BASE + Self::MAX_LEN as u32 {
      return None;
    }
    Some(bus - Self::BASE)
  }

  /// Maps an image offset back up to its bus address.
  pub fn unmap(offset: u32) -> u32 {
    Self::BASE + offset
  }
}

/// Offset of the four-character game code within the header.
pub const GAME_CODE_OFFSET: usize = 0xac;

/// Extracts the four-character game code from a cartridge image.
///
/// Returns an empty string for images too short to hold a header. Non-ASCII
/// bytes are replaced with `?`.
pub fn game_code(bytes: &[u8]) -> String {
  match bytes.get(GAME_CODE_OFFSET..GAME_CODE_OFFSET + 4) {
    Some(code) => code
      .iter()
      .map(|&b| if b.is_ascii_graphic() { b as char } else { '?' })
      .collect(),
    None => String::new(),
  }
}

/// The family of cartridge an image belongs to.
///
/// The version decides where shared ("primary") graphics data ends and
/// tileset-specific ("secondary") data begins, so it must be detected exactly.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum Version {
  /// FireRed and LeafGreen.
  FireRedLeafGreen,
  /// Ruby, Sapphire and Emerald.
  RubySapphireEmerald,
}

impl Version {
  /// Picks a version from a game code.
  ///
  /// ```
  /// # use hexmap::rom::Version;
  /// assert_eq!(Version::detect("BPRE"), Version::FireRedLeafGreen);
  /// assert_eq!(Version::detect("BPEE"), Version::RubySapphireEmerald);
  /// ```
  pub fn detect(code: &str) -> Self {
    if code.contains("BPRE") || code.contains("BPGE") {
      Self::FireRedLeafGreen
    } else {
      Self::RubySapphireEmerald
    }
  }
}

impl fmt::Display for Version {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match self {
      Self::FireRedLeafGreen => write!(f, "FireRed/LeafGreen"),
      Self::RubySapphireEmerald => write!(f, "Ruby/Sapphire/Emerald"),
    }
  }
}

#[cfg(test)]
mod test {
  use super::*;

  macro_rules! assert_mapping {
    ($val:literal => None) => {
      assert_eq!(Gba::map($val), None);
    };
    ($val:literal => $expected:literal) => {
      assert_eq!(Gba::map($val), Some($expected));
      assert_eq!(Gba::unmap($expected), $val);
    };
  }

  #[test]
  fn gba_mapping() {
    assert_mapping!(0x0000_0000 => None);
    assert_mapping!(0x07ff_ffff => None);
    assert_mapping!(0x0800_0000 => 0x0000_0000);
    assert_mapping!(0x0835_1234 => 0x0035_1234);
    assert_mapping!(0x09ff_ffff => 0x01ff_ffff);
    assert_mapping!(0x0a00_0000 => None);
    assert_mapping!(0xffff_ffff => None);
  }

  #[test]
  fn game_code_from_header() {
    let mut bytes = vec![0u8; 0xc0];
    bytes[0xac..0xb0].copy_from_slice(b"BPGE");
    assert_eq!(game_code(&bytes), "BPGE");
    assert_eq!(Version::detect(&game_code(&bytes)), Version::FireRedLeafGreen);
    assert_eq!(game_code(&bytes[..0x40]), "");
  }
}
