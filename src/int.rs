//! Little-endian integer fields.
//!
//! Cartridge data is full of little-endian integers of one, two, or four
//! bytes: header fields, pointers, blockmap cells, attribute records. `Int`
//! carries such a value together with its width, so a single `write_int()`
//! can serve all of them.

use std::fmt;

/// A field value of 8, 16, or 32 bits.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum Int {
  /// A byte.
  I8(u8),
  /// A halfword.
  I16(u16),
  /// A word.
  I32(u32),
}

impl Int {
  /// Creates a new `Int` of the given width, dropping any bits of `val` that
  /// do not fit.
  #[inline]
  pub fn new(val: u32, width: Width) -> Self {
    match width {
      Width::I8 => Self::I8(val as u8),
      Width::I16 => Self::I16(val as u16),
      Width::I32 => Self::I32(val),
    }
  }

  /// Decodes a little-endian `Int` of the given width from the front of
  /// `bytes`.
  ///
  /// Returns `None` if `bytes` is too short.
  pub fn read_le(bytes: &[u8], width: Width) -> Option<Self> {
    let bytes = bytes.get(..width.bytes())?;
    let val = bytes
      .iter()
      .rev()
      .fold(0u32, |acc, &byte| (acc << 8) | byte as u32);
    Some(Self::new(val, width))
  }

  /// Returns the width of this field.
  #[inline]
  pub fn width(self) -> Width {
    match self {
      Self::I8(_) => Width::I8,
      Self::I16(_) => Width::I16,
      Self::I32(_) => Width::I32,
    }
  }

  /// Returns the value, zero-extended.
  #[inline]
  pub fn to_u32(self) -> u32 {
    match self {
      Self::I8(n) => n.into(),
      Self::I16(n) => n.into(),
      Self::I32(n) => n,
    }
  }

  /// Returns the value, sign-extended.
  #[inline]
  pub fn to_i32(self) -> i32 {
    match self {
      Self::I8(n) => (n as i8).into(),
      Self::I16(n) => (n as i16).into(),
      Self::I32(n) => n as i32,
    }
  }

  /// Returns the field's bytes, least significant first.
  pub fn le_bytes(self) -> impl Iterator<Item = u8> {
    let len = self.width().bytes();
    self.to_u32().to_le_bytes().to_vec().into_iter().take(len)
  }
}

impl fmt::UpperHex for Int {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    fmt::UpperHex::fmt(&self.to_u32(), f)
  }
}

/// The size of a field.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Width {
  /// One byte.
  I8,
  /// Two bytes.
  I16,
  /// Four bytes.
  I32,
}

impl Width {
  /// Returns the number of bytes a field of this width occupies.
  ///
  /// ```
  /// # use hexmap::int::Width;
  /// assert_eq!(Width::I16.bytes(), 2);
  /// ```
  #[inline]
  pub fn bytes(self) -> usize {
    match self {
      Self::I8 => 1,
      Self::I16 => 2,
      Self::I32 => 4,
    }
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn read_le_widths() {
    let bytes = [0x78, 0x56, 0x34, 0x12];
    assert_eq!(Int::read_le(&bytes, Width::I8), Some(Int::I8(0x78)));
    assert_eq!(Int::read_le(&bytes, Width::I16), Some(Int::I16(0x5678)));
    assert_eq!(Int::read_le(&bytes, Width::I32), Some(Int::I32(0x12345678)));
    assert_eq!(Int::read_le(&bytes[1..], Width::I32), None);
  }

  #[test]
  fn le_bytes_order() {
    let bytes = Int::I32(0x0800_1234).le_bytes().collect::<Vec<_>>();
    assert_eq!(bytes, vec![0x34, 0x12, 0x00, 0x08]);
    assert_eq!(Int::I16(0xbeef).le_bytes().count(), 2);
    assert_eq!(format!("{:04X}", Int::I16(0xbeef)), "BEEF");
  }

  #[test]
  fn sign_extension() {
    assert_eq!(Int::I8(0xff).to_i32(), -1);
    assert_eq!(Int::I16(0x8000).to_i32(), -32768);
    assert_eq!(Int::new(0x1_0002, Width::I16), Int::I16(2));
  }
}
