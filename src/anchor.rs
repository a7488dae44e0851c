//! Anchor names.
//!
//! An anchor is a named location in the image. Names are resolved outside the
//! address space proper, through the [`Anchors`] trait; [`AnchorTable`] is the
//! in-memory implementation used by the command line tool and by metadata
//! files.
//!
//! [`Anchors`]: trait.Anchors.html
//! [`AnchorTable`]: struct.AnchorTable.html

use std::collections::BTreeMap;

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

/// A source of anchor names.
pub trait Anchors {
  /// Resolves `name` to an address.
  ///
  /// `source` is the address of the cell being edited; implementations may
  /// use it to disambiguate names.
  fn name_to_address(&self, source: u32, name: &str) -> Option<u32>;

  /// Returns the name of the anchor at `address`, if it has one.
  fn address_to_name(&self, address: u32) -> Option<&str>;

  /// Attempts to give the anchor at `address` the name `name`, returning
  /// whether it succeeded.
  fn define(&mut self, name: &str, address: u32) -> bool {
    let _ = (name, address);
    false
  }
}

/// An `Anchors` that knows no names.
#[derive(Copy, Clone, Default, Debug)]
pub struct NoAnchors;

impl Anchors for NoAnchors {
  fn name_to_address(&self, _: u32, _: &str) -> Option<u32> {
    None
  }

  fn address_to_name(&self, _: u32) -> Option<&str> {
    None
  }
}

/// An error for rejected anchor names.
#[derive(Clone, PartialEq, Eq, Debug, Error)]
#[error("`{0}` is not a valid anchor name")]
pub struct BadName(pub String);

lazy_static! {
  static ref NAME: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_.]*$").unwrap();
}

/// Returns true if `name` can name an anchor.
///
/// Names start with a letter or underscore and may contain dots, so that
/// related anchors can be grouped as `graphics.maps.bank0`.
pub fn is_valid_name(name: &str) -> bool {
  NAME.is_match(name)
}

/// A two-way table of anchor names.
///
/// Each address has at most one name and each name at most one address.
#[derive(Clone, Default, Debug)]
pub struct AnchorTable {
  by_name: BTreeMap<String, u32>,
  by_address: BTreeMap<u32, String>,
}

impl AnchorTable {
  /// Creates a new, empty `AnchorTable`.
  pub fn new() -> Self {
    Self::default()
  }

  /// Returns the number of names in the table.
  pub fn len(&self) -> usize {
    self.by_name.len()
  }

  /// Returns true if the table holds no names.
  pub fn is_empty(&self) -> bool {
    self.by_name.is_empty()
  }

  /// Names `address` as `name`, replacing any earlier name for either.
  pub fn insert(&mut self, name: &str, address: u32) -> Result<(), BadName> {
    if !is_valid_name(name) {
      return Err(BadName(name.to_string()));
    }
    if let Some(old) = self.by_name.remove(name) {
      self.by_address.remove(&old);
    }
    if let Some(old) = self.by_address.remove(&address) {
      self.by_name.remove(&old);
    }
    self.by_name.insert(name.to_string(), address);
    self.by_address.insert(address, name.to_string());
    Ok(())
  }

  /// Removes the name for `address`, returning it.
  pub fn remove(&mut self, address: u32) -> Option<String> {
    let name = self.by_address.remove(&address)?;
    self.by_name.remove(&name);
    Some(name)
  }

  /// Moves the name at `old` to `new`, after the data there was relocated.
  ///
  /// Returns the name, if there was one to move.
  pub fn moved(&mut self, old: u32, new: u32) -> Option<&str> {
    if old == new {
      return None;
    }
    let name = self.remove(old)?;
    tracing::debug!(name = name.as_str(), from = old, to = new, "anchor moved");
    // The name was valid when it was inserted.
    let _ = self.insert(&name, new);
    self.by_address.get(&new).map(String::as_str)
  }

  /// Returns an iterator over every `(name, address)` pair, sorted by name.
  pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
    self.by_name.iter().map(|(k, v)| (k.as_str(), *v))
  }
}

impl Anchors for AnchorTable {
  fn name_to_address(&self, _: u32, name: &str) -> Option<u32> {
    if let Some(&address) = self.by_name.get(name) {
      return Some(address);
    }
    self
      .by_name
      .iter()
      .find(|(k, _)| k.eq_ignore_ascii_case(name))
      .map(|(_, &v)| v)
  }

  fn address_to_name(&self, address: u32) -> Option<&str> {
    self.by_address.get(&address).map(String::as_str)
  }

  fn define(&mut self, name: &str, address: u32) -> bool {
    self.insert(name, address).is_ok()
  }
}
