//! Project metadata files.
//!
//! A metadata file is JSON5 naming the interesting places in an image and
//! what lives there:
//!
//! ```text
//! {
//!   anchors: [
//!     { name: "maps.pallet", address: "0x350000", format: "layout" },
//!     { name: "tiles.general", address: "$2d4a94", format: "blockset" },
//!     { name: "scratch", address: "8000100" },
//!   ],
//! }
//! ```
//!
//! Addresses are hex, with an optional `0x` or `$` prefix; bus addresses
//! (`0x08xxxxxx`) are accepted and converted to offsets.

use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::anchor::AnchorTable;
use crate::anchor::BadName;
use crate::error;
use crate::error::Action;
use crate::error::Cause;
use crate::gfx::BankError;
use crate::gfx::Blockset;
use crate::map::Layout;
use crate::run::Run;
use crate::space::Model;

/// A parsed metadata file.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct Metadata {
  /// The named anchors, in file order.
  #[serde(default)]
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub anchors: Vec<Anchor>,
}

/// One named anchor.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Anchor {
  /// The anchor's name.
  pub name: String,
  /// The anchor's offset in the image.
  #[serde(with = "hex_address")]
  pub address: u32,
  /// What lives at the anchor.
  #[serde(default)]
  #[serde(skip_serializing_if = "is_none")]
  pub format: Format,
}

/// The structure an anchor points at.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
  /// Nothing in particular.
  None,
  /// A single pointer.
  Pointer,
  /// A map layout header.
  Layout,
  /// A blockset header.
  Blockset,
}

impl Default for Format {
  fn default() -> Self {
    Self::None
  }
}

fn is_none(format: &Format) -> bool {
  *format == Format::None
}

/// An error while loading or applying metadata.
#[derive(Debug, Error)]
pub enum Error {
  /// The file could not be read.
  #[error("{0}")]
  Io(#[from] io::Error),
  /// The file was not well-formed.
  #[error("{0}")]
  Syntax(#[from] json5::Error),
  /// An anchor had an unusable name.
  #[error(transparent)]
  BadName(#[from] BadName),
  /// An anchor was past the end of the image.
  #[error("anchor `{name}` at {address:06X} is past the end of the image")]
  OutOfRange {
    /// The anchor's name.
    name: String,
    /// The anchor's address.
    address: u32,
  },
  /// An anchor's structure could not be read.
  #[error("anchor `{name}`: {error}")]
  Format {
    /// The anchor's name.
    name: String,
    /// What went wrong.
    error: BankError,
  },
}

/// A metadata error, together with the file it came from.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct LoadError {
  /// The file being loaded.
  pub path: PathBuf,
  /// What went wrong.
  pub error: Error,
}

impl error::Error for LoadError {
  fn cause(&self) -> Cause<'_> {
    Cause::File(&self.path)
  }

  fn action(&self) -> Option<Action> {
    Some(Action::Loading)
  }
}

/// Parses metadata from text.
pub fn parse(text: &str) -> Result<Metadata, Error> {
  Ok(json5::from_str(text)?)
}

/// Reads and parses the metadata file at `path`.
pub fn load(path: &Path) -> Result<Metadata, LoadError> {
  let wrap = |error| LoadError {
    path: path.to_path_buf(),
    error,
  };
  let text = fs::read_to_string(path).map_err(|e| wrap(e.into()))?;
  parse(&text).map_err(wrap)
}

impl Metadata {
  /// Names every anchor in `anchors` and registers its structure with
  /// `model`.
  ///
  /// Stops at the first anchor that cannot be applied; earlier anchors stay
  /// applied.
  pub fn apply(
    &self,
    model: &mut Model,
    anchors: &mut AnchorTable,
  ) -> Result<(), Error> {
    for anchor in &self.anchors {
      let (name, address) = (&anchor.name, anchor.address);
      if address as usize >= model.len() {
        return Err(Error::OutOfRange {
          name: name.clone(),
          address,
        });
      }
      anchors.insert(name, address)?;

      let observed = match anchor.format {
        Format::None => {
          model.observe_anchor(address);
          Ok(())
        }
        Format::Pointer => {
          model.observe_run_written(Run::pointer(model, address));
          Ok(())
        }
        Format::Layout => Layout::new(address).observe(model).map(|_| ()),
        Format::Blockset => Blockset::new(model, address).observe(model),
      };
      observed.map_err(|error| Error::Format {
        name: name.clone(),
        error,
      })?;
      tracing::debug!(name = name.as_str(), address, "applied anchor");
    }
    Ok(())
  }
}

/// Parses an address: hex, optionally prefixed with `0x` or `$`.
pub fn parse_address(text: &str) -> Option<u32> {
  let text = text.trim();
  let digits = text
    .strip_prefix("0x")
    .or_else(|| text.strip_prefix("0X"))
    .or_else(|| text.strip_prefix('$'))
    .unwrap_or(text);
  let value = u32::from_str_radix(digits, 16).ok()?;
  Some(crate::rom::Gba::map(value).unwrap_or(value))
}

mod hex_address {
  use serde::de;
  use serde::Deserialize;
  use serde::Deserializer;
  use serde::Serializer;

  pub fn serialize<S>(address: &u32, ser: S) -> Result<S::Ok, S::Error>
  where
    S: Serializer,
  {
    ser.serialize_str(&format!("0x{:06X}", address))
  }

  pub fn deserialize<'de, D>(de: D) -> Result<u32, D::Error>
  where
    D: Deserializer<'de>,
  {
    let text = String::deserialize(de)?;
    super::parse_address(&text).ok_or_else(|| {
      de::Error::custom(format!("`{}` is not a hex address", text))
    })
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::anchor::Anchors;
  use crate::run::RunKind;
  use crate::testing::MapFixture;

  macro_rules! assert_address {
    ($text:expr, !) => {
      assert_eq!(parse_address($text), None, "{}", $text);
    };
    ($text:expr, $address:expr) => {
      assert_eq!(parse_address($text), Some($address), "{}", $text);
    };
  }

  #[test]
  fn addresses() {
    assert_address!("0x350000", 0x350000);
    assert_address!("$2d4a94", 0x2d4a94);
    assert_address!("100", 0x100);
    assert_address!("08000100", 0x100);
    assert_address!("0x", !);
    assert_address!("zebra", !);
  }

  #[test]
  fn parsing() {
    let meta = parse(
      r#"{
        // Comments and trailing commas are fine.
        anchors: [
          { name: "maps.start", address: "0x200", format: "layout" },
          { name: "scratch", address: "$3000" },
        ],
      }"#,
    )
    .unwrap();
    assert_eq!(meta.anchors.len(), 2);
    assert_eq!(meta.anchors[0].address, 0x200);
    assert_eq!(meta.anchors[0].format, Format::Layout);
    assert_eq!(meta.anchors[1].format, Format::None);

    let bad_name = parse("{ anchors: [ { name: 1 } ] }");
    assert!(matches!(bad_name, Err(Error::Syntax(_))));
    assert!(matches!(
      parse(r#"{ anchors: [ { name: "a", address: "xyz" } ] }"#),
      Err(Error::Syntax(_))
    ));
  }

  #[test]
  fn applying() {
    let fixture = MapFixture::new("BPEE");
    let mut model = fixture.model;
    let mut anchors = AnchorTable::new();
    let meta = parse(
      r#"{ anchors: [
        { name: "layout", address: "0x200", format: "layout" },
        { name: "free", address: "0x3000" },
      ] }"#,
    )
    .unwrap();
    meta.apply(&mut model, &mut anchors).unwrap();

    assert_eq!(anchors.name_to_address(0, "layout"), Some(0x200));
    assert_eq!(anchors.address_to_name(0x3000), Some("free"));
    assert!(model.run_at(0x3000).unwrap().is_no_info());
    assert_eq!(
      model.run_at(0x400).unwrap().kind(),
      RunKind::Blockmap {
        width: 4,
        height: 4
      }
    );
  }

  #[test]
  fn rejected_anchors() {
    let fixture = MapFixture::new("BPEE");
    let mut model = fixture.model;
    let mut anchors = AnchorTable::new();

    let meta = parse(r#"{ anchors: [ { name: "9lives", address: "0" } ] }"#);
    let result = meta.unwrap().apply(&mut model, &mut anchors);
    assert!(matches!(result, Err(Error::BadName(_))));

    let meta =
      parse(r#"{ anchors: [ { name: "far", address: "0xffffff" } ] }"#);
    let result = meta.unwrap().apply(&mut model, &mut anchors);
    assert!(matches!(
      result,
      Err(Error::OutOfRange {
        address: 0xffffff,
        ..
      })
    ));
    assert!(anchors.is_empty());
  }
}
