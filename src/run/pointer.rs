//! Pointer encoding.

use std::fmt;

use crate::rom::Gba;

/// Where a four-byte pointer leads.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum Destination {
  /// The null pointer, stored as four zero bytes.
  Null,
  /// An offset into the cartridge image.
  Address(u32),
  /// A non-null value that does not map into the cartridge.
  Invalid(u32),
}

impl Destination {
  /// Decodes the raw little-endian value of a pointer.
  pub fn from_raw(raw: u32) -> Self {
    if raw == 0 {
      return Self::Null;
    }
    match Gba::map(raw) {
      Some(addr) => Self::Address(addr),
      None => Self::Invalid(raw),
    }
  }

  /// Encodes this destination as the raw value stored in the cartridge.
  pub fn to_raw(self) -> u32 {
    match self {
      Self::Null => 0,
      Self::Address(addr) => Gba::unmap(addr),
      Self::Invalid(raw) => raw,
    }
  }

  /// Returns the destination offset, if this pointer leads anywhere.
  pub fn address(self) -> Option<u32> {
    match self {
      Self::Address(addr) => Some(addr),
      _ => None,
    }
  }
}

impl fmt::Display for Destination {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match self {
      Self::Null => write!(f, "null"),
      Self::Address(addr) => write!(f, "{:06X}", addr),
      Self::Invalid(raw) => write!(f, "?{:08X}", raw),
    }
  }
}
