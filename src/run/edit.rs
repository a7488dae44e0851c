//! Completing cell edits.
//!
//! These functions take the text a user typed into a cell and apply it to the
//! address space, keeping the run index consistent with the bytes written.

use thiserror::Error;

use crate::anchor::Anchors;
use crate::delta::Delta;
use crate::run::Destination;
use crate::run::Run;
use crate::space::Model;
use crate::space::SpaceError;
use crate::syn;
use crate::syn::Edit;
use crate::syn::Target;

/// An error raised by a rejected edit.
///
/// A rejected edit leaves the image untouched.
#[derive(Clone, PartialEq, Eq, Debug, Error)]
pub enum EditError {
  /// The text did not parse.
  #[error("syntax error: {0}")]
  Syntax(#[from] syn::Error),
  /// A pointer named an anchor that does not exist.
  #[error("unknown anchor `{0}`")]
  UnknownAnchor(String),
  /// A pointer named an address past the end of the image.
  #[error("address {0:06X} is outside the image")]
  OutOfRange(u32),
  /// An anchor was given a name the anchor table rejected.
  #[error("`{0}` is not a valid anchor name")]
  BadName(String),
  /// The text did not describe a pointer.
  #[error("expected a pointer")]
  NotAPointer,
  /// The image could not grow to hold the edit.
  #[error(transparent)]
  Space(#[from] SpaceError),
}

/// Resolves `target` to a destination, as seen from the cell at `source`.
pub fn resolve(
  model: &Model,
  anchors: &dyn Anchors,
  source: u32,
  target: &Target,
) -> Result<Destination, EditError> {
  let address = match target {
    Target::Null => return Ok(Destination::Null),
    Target::Address(address) => *address,
    Target::Name(name) => anchors
      .name_to_address(source, name)
      .ok_or_else(|| EditError::UnknownAnchor(name.clone()))?,
  };
  if address as usize >= model.len() {
    return Err(EditError::OutOfRange(address));
  }
  Ok(Destination::Address(address))
}

/// Writes a pointer at `address` from `text`.
///
/// `text` may be bracketed (`<dest>`) or bare (`dest`). The previous format at
/// `address` is cleared, unlinking any pointer that was there, and the new
/// pointer claims its destination.
pub fn edit_pointer(
  model: &mut Model,
  delta: &mut Delta,
  anchors: &dyn Anchors,
  address: u32,
  text: &str,
) -> Result<Run, EditError> {
  let text = text.trim();
  let target = if text.starts_with('<') {
    match syn::parse(text)? {
      Edit::Pointer(target) => target,
      _ => return Err(EditError::NotAPointer),
    }
  } else {
    Target::from_text(text)
  };

  let destination = resolve(model, anchors, address, &target)?;
  model.write_pointer(delta, address, destination)?;
  model.clear_format(address, 4);
  let run = model.observe_run_written(Run::pointer(model, address));
  tracing::debug!(at = address, to = %destination, "edited pointer");
  Ok(run)
}

/// Applies any cell edit at `address`.
///
/// Returns the run that now covers `address`, if any.
pub fn complete_edit(
  model: &mut Model,
  delta: &mut Delta,
  anchors: &mut dyn Anchors,
  address: u32,
  text: &str,
) -> Result<Option<Run>, EditError> {
  match syn::parse(text.trim())? {
    Edit::Pointer(_) => {
      edit_pointer(model, delta, &*anchors, address, text).map(Some)
    }
    Edit::Anchor(name) => {
      if address as usize >= model.len() {
        return Err(EditError::OutOfRange(address));
      }
      if !anchors.define(&name, address) {
        return Err(EditError::BadName(name));
      }
      Ok(Some(model.observe_anchor(address)))
    }
    Edit::Byte(byte) => {
      model.write(delta, address, byte)?;
      // Changing a pointer's bytes changes its destination; any other
      // format survives a byte edit.
      let is_pointer = model
        .run_covering(address)
        .map_or(false, |run| run.destination().is_some());
      if is_pointer {
        model.clear_format(address, 1);
      }
      Ok(model.run_covering(address).cloned())
    }
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::anchor::AnchorTable;
  use crate::anchor::NoAnchors;
  use crate::run::RunKind;
  use crate::testing::RomBuilder;

  #[test]
  fn short_hex_pointer() {
    let mut model = RomBuilder::new(0x400).build();
    let mut delta = Delta::new();
    let run =
      edit_pointer(&mut model, &mut delta, &NoAnchors, 0x100, "<3f0>").unwrap();
    assert_eq!(run.destination(), Some(Destination::Address(0x3f0)));
    assert_eq!(&model.bytes()[0x100..0x104], &[0xf0, 0x03, 0x00, 0x08]);
    assert_eq!(model.run_at(0x3f0).unwrap().sources(), &[0x100]);
    assert_eq!(delta.len(), 4);
  }

  #[test]
  fn pointer_by_name() {
    let mut model = RomBuilder::new(0x400).build();
    let mut delta = Delta::new();
    let mut anchors = AnchorTable::new();
    anchors.insert("tiles", 0x200).unwrap();

    let run =
      edit_pointer(&mut model, &mut delta, &anchors, 0x100, "tiles").unwrap();
    assert_eq!(run.destination(), Some(Destination::Address(0x200)));

    let err = edit_pointer(&mut model, &mut delta, &anchors, 0x100, "<nope>");
    assert_eq!(err, Err(EditError::UnknownAnchor("nope".into())));
  }

  #[test]
  fn repointing_unlinks_the_old_destination() {
    let mut model = RomBuilder::new(0x400).build();
    let mut delta = Delta::new();
    edit_pointer(&mut model, &mut delta, &NoAnchors, 0x100, "<200>").unwrap();
    assert!(model.run_at(0x200).is_some());

    edit_pointer(&mut model, &mut delta, &NoAnchors, 0x100, "<300>").unwrap();
    assert!(model.run_at(0x200).is_none());
    assert_eq!(model.run_at(0x300).unwrap().sources(), &[0x100]);

    let run =
      edit_pointer(&mut model, &mut delta, &NoAnchors, 0x100, "<>").unwrap();
    assert_eq!(run.destination(), Some(Destination::Null));
    assert!(model.run_at(0x300).is_none());
  }

  #[test]
  fn rejected_edits_write_nothing() {
    let mut model = RomBuilder::new(0x400).build();
    let mut delta = Delta::new();
    let err = edit_pointer(&mut model, &mut delta, &NoAnchors, 0x100, "<500>");
    assert_eq!(err, Err(EditError::OutOfRange(0x500)));
    let err = edit_pointer(&mut model, &mut delta, &NoAnchors, 0x100, "<12");
    assert!(matches!(err, Err(EditError::Syntax(_))));
    assert!(delta.is_empty());
  }

  #[test]
  fn anchors_and_bytes() {
    let mut model = RomBuilder::new(0x400).build();
    let mut delta = Delta::new();
    let mut anchors = AnchorTable::new();

    let run =
      complete_edit(&mut model, &mut delta, &mut anchors, 0x180, "^data")
        .unwrap();
    assert_eq!(run.map(|r| r.kind()), Some(RunKind::NoInfo));
    assert_eq!(anchors.name_to_address(0, "data"), Some(0x180));

    let run = complete_edit(&mut model, &mut delta, &mut anchors, 0x181, "3c")
      .unwrap();
    assert_eq!(run, None);
    assert_eq!(model.byte(0x181), Some(0x3c));

    complete_edit(&mut model, &mut delta, &mut anchors, 0x100, "<180>")
      .unwrap();
    assert_eq!(model.run_at(0x180).unwrap().sources(), &[0x100]);
    complete_edit(&mut model, &mut delta, &mut anchors, 0x101, "00").unwrap();
    assert!(model.run_at(0x100).is_none());
  }
}
