//! The BIOS LZ77 format.
//!
//! A stream starts with a four-byte header: the magic byte `0x10`, then the
//! decompressed length as a 24-bit little-endian integer. The body is a series
//! of groups, each a flag byte followed by up to eight tokens. Flag bits are
//! read most significant first; a clear bit is a literal byte, and a set bit
//! is a two-byte back-reference:
//!
//! ```text
//!   byte 0          byte 1
//! +-------+-------+---------------+
//! | len-3 | dist-1 (12 bits)      |
//! +-------+-------+---------------+
//! ```

use thiserror::Error;

/// The first byte of every stream.
pub const MAGIC: u8 = 0x10;

/// The longest back-reference a token can express.
const MAX_MATCH: usize = 18;

/// The farthest back a token can reach.
const WINDOW: usize = 4096;

/// An error while decompressing.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Error)]
pub enum LzError {
  /// The stream did not start with the magic byte.
  #[error("expected magic byte 10, got {0:02X}")]
  BadMagic(u8),
  /// The stream ended before producing all of its data.
  #[error("stream ends after {0} bytes")]
  Truncated(usize),
  /// A back-reference reached before the start of the data.
  #[error("back-reference at {offset:#x} reaches {distance} bytes back")]
  BadDistance {
    /// The offset of the token in the stream.
    offset: usize,
    /// How far back it reached.
    distance: usize,
  },
}

/// Reads the decompressed length from a stream's header, without decoding it.
pub fn decompressed_len(data: &[u8]) -> Result<usize, LzError> {
  match data {
    [MAGIC, a, b, c, ..] => Ok(u32::from_le_bytes([*a, *b, *c, 0]) as usize),
    [magic, _, _, _, ..] => Err(LzError::BadMagic(*magic)),
    _ => Err(LzError::Truncated(data.len())),
  }
}

/// Decompresses the stream at the start of `data`.
///
/// Returns the decompressed bytes and the number of bytes of `data` the stream
/// occupied.
pub fn decompress(data: &[u8]) -> Result<(Vec<u8>, usize), LzError> {
  let len = decompressed_len(data)?;
  let mut out = Vec::with_capacity(len.min(data.len().saturating_mul(8)));
  let mut pos = 4;
  let next = |pos: &mut usize| -> Result<u8, LzError> {
    let byte = *data.get(*pos).ok_or(LzError::Truncated(*pos))?;
    *pos += 1;
    Ok(byte)
  };

  while out.len() < len {
    let flags = next(&mut pos)?;
    for bit in (0..8).rev() {
      if out.len() >= len {
        break;
      }
      if flags & (1 << bit) == 0 {
        out.push(next(&mut pos)?);
        continue;
      }

      let offset = pos;
      let hi = next(&mut pos)?;
      let lo = next(&mut pos)?;
      let count = (hi >> 4) as usize + 3;
      let distance = ((hi as usize & 0xf) << 8 | lo as usize) + 1;
      if distance > out.len() {
        return Err(LzError::BadDistance { offset, distance });
      }
      for _ in 0..count.min(len - out.len()) {
        out.push(out[out.len() - distance]);
      }
    }
  }
  Ok((out, pos))
}

/// Finds the longest usable back-reference for `data[i..]`.
///
/// Distance one is never used: the BIOS's VRAM-safe decoder writes sixteen
/// bits at a time and cannot read the byte it has just produced.
fn longest_match(data: &[u8], i: usize) -> Option<(usize, usize)> {
  let max = MAX_MATCH.min(data.len() - i);
  let mut best: Option<(usize, usize)> = None;
  for distance in 2..=WINDOW.min(i) {
    let count = (0..max)
      .take_while(|&n| data[i + n] == data[i + n - distance])
      .count();
    if count >= 3 && best.map_or(true, |(_, c)| count > c) {
      best = Some((distance, count));
      if count == max {
        break;
      }
    }
  }
  best
}

/// Compresses `data` into a stream.
pub fn compress(data: &[u8]) -> Vec<u8> {
  let len = (data.len() as u32).to_le_bytes();
  let mut out = vec![MAGIC, len[0], len[1], len[2]];

  let mut i = 0;
  while i < data.len() {
    let flag_index = out.len();
    out.push(0);
    for bit in (0..8).rev() {
      if i >= data.len() {
        break;
      }
      match longest_match(data, i) {
        Some((distance, count)) => {
          out[flag_index] |= 1 << bit;
          let d = distance - 1;
          out.push(((count - 3) << 4 | d >> 8) as u8);
          out.push(d as u8);
          i += count;
        }
        None => {
          out.push(data[i]);
          i += 1;
        }
      }
    }
  }
  out
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn literals_and_references() {
    // "abcabcabc!" as three literals, one six-byte reference, one literal.
    let stream = [
      0x10, 10, 0, 0, //
      0b0001_0000, b'a', b'b', b'c', 0x30, 0x02, b'!',
    ];
    let (data, used) = decompress(&stream).unwrap();
    assert_eq!(data, b"abcabcabc!");
    assert_eq!(used, stream.len());
  }

  #[test]
  fn bad_streams() {
    assert_eq!(decompress(&[0x11, 0, 0, 0]), Err(LzError::BadMagic(0x11)));
    assert_eq!(decompress(&[0x10, 4, 0]), Err(LzError::Truncated(3)));
    assert_eq!(decompress(&[0x10, 4, 0, 0, 0, 1]), Err(LzError::Truncated(6)));
    assert_eq!(
      decompress(&[0x10, 4, 0, 0, 0x80, 0x00, 0x00]),
      Err(LzError::BadDistance {
        offset: 5,
        distance: 1
      })
    );
  }

  #[test]
  fn compression_round_trips() {
    let mut data = Vec::new();
    for i in 0..600u32 {
      data.push((i % 7) as u8);
      data.push((i * 31 % 251) as u8);
      if i % 5 == 0 {
        data.extend_from_slice(&[0; 20]);
      }
    }
    let stream = compress(&data);
    assert!(stream.len() < data.len());
    let (back, used) = decompress(&stream).unwrap();
    assert_eq!(back, data);
    assert_eq!(used, stream.len());
  }

  #[test]
  fn no_distance_one() {
    let data = [0xaa; 64];
    let stream = compress(&data);
    let mut pos = 4;
    let mut produced = 0;
    while produced < data.len() {
      let flags = stream[pos];
      pos += 1;
      for bit in (0..8).rev() {
        if produced >= data.len() {
          break;
        }
        if flags & (1 << bit) == 0 {
          pos += 1;
          produced += 1;
        } else {
          let hi = stream[pos] as usize;
          let distance = ((hi & 0xf) << 8 | stream[pos + 1] as usize) + 1;
          assert!(distance >= 2);
          produced += (stream[pos] >> 4) as usize + 3;
          pos += 2;
        }
      }
    }
  }
}
