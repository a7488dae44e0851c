//! The edit parser.

use pest::error::ErrorVariant;
use pest::error::InputLocation;
use pest::iterators::Pair;
use pest_derive::Parser;
use thiserror::Error;

#[derive(Parser)]
#[grammar = "syn/grammar.pest"]
struct PegParser;

/// Destination text longer than this is always an anchor name.
const MAX_ADDRESS_DIGITS: usize = 6;

/// The destination named by pointer text.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum Target {
  /// The null pointer.
  Null,
  /// An image offset.
  Address(u32),
  /// An anchor, to be resolved by name.
  Name(String),
}

impl Target {
  /// Interprets the text between a pointer's angle brackets.
  ///
  /// Text made of at most six hex digits is an address, left-padded with
  /// zeros:
  /// ```
  /// # use hexmap::syn::Target;
  /// assert_eq!(Target::from_text("1A2"), Target::Address(0x1a2));
  /// assert_eq!(Target::from_text("maps"), Target::Name("maps".into()));
  /// ```
  pub fn from_text(text: &str) -> Self {
    let text = text.trim();
    if text.is_empty() || text.eq_ignore_ascii_case("null") {
      return Self::Null;
    }

    let is_hex = text.chars().all(|c| c.is_ascii_hexdigit());
    if is_hex && text.len() <= MAX_ADDRESS_DIGITS {
      let padded = format!("{:0>6}", text);
      if let Ok(addr) = u32::from_str_radix(&padded, 16) {
        return Self::Address(addr);
      }
    }
    Self::Name(text.to_string())
  }
}

/// A parsed cell edit.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum Edit {
  /// `<dest>`: write a pointer.
  Pointer(Target),
  /// `^name`: place an anchor.
  Anchor(String),
  /// `XX`: write a byte.
  Byte(u8),
}

/// A syntax error in edit text.
#[derive(Clone, PartialEq, Eq, Debug, Error)]
#[error("{message} at column {column}")]
pub struct Error {
  /// What went wrong.
  pub message: String,
  /// The zero-based column the error was found at.
  pub column: usize,
}

impl Error {
  fn new(message: impl Into<String>, column: usize) -> Self {
    Self {
      message: message.into(),
      column,
    }
  }
}

impl From<pest::error::Error<Rule>> for Error {
  fn from(err: pest::error::Error<Rule>) -> Self {
    let column = match err.location {
      InputLocation::Pos(pos) => pos,
      InputLocation::Span((pos, _)) => pos,
    };
    let message = match err.variant {
      ErrorVariant::ParsingError { positives, .. } if !positives.is_empty() => {
        let expected = positives
          .iter()
          .map(|rule| format!("{:?}", rule))
          .collect::<Vec<_>>();
        format!("expected {}", expected.join(" or "))
      }
      ErrorVariant::ParsingError { .. } => "unexpected input".to_string(),
      ErrorVariant::CustomError { message } => message,
    };
    Self::new(message, column)
  }
}

fn name_of<'i>(pair: Pair<'i, Rule>) -> &'i str {
  pair
    .into_inner()
    .find(|p| p.as_rule() == Rule::Name)
    .map(|p| p.as_str())
    .unwrap_or("")
}

/// Parses the text typed into a cell.
pub fn parse(text: &str) -> Result<Edit, Error> {
  use pest::Parser;
  let edit = PegParser::parse(Rule::Edit, text)?
    .next()
    .and_then(|edit| edit.into_inner().next())
    .ok_or_else(|| Error::new("empty edit", 0))?;

  let column = edit.as_span().start();
  match edit.as_rule() {
    Rule::Pointer => Ok(Edit::Pointer(Target::from_text(name_of(edit)))),
    Rule::Anchor => Ok(Edit::Anchor(name_of(edit).to_string())),
    Rule::Byte => u8::from_str_radix(edit.as_str(), 16)
      .map(Edit::Byte)
      .map_err(|_| Error::new("bad byte", column)),
    _ => Err(Error::new("unexpected input", column)),
  }
}

#[cfg(test)]
mod test {
  use super::*;

  macro_rules! assert_edit {
    ($text:literal => !) => {
      assert!(parse($text).is_err(), "{:?} should not parse", $text);
    };
    ($text:literal => $edit:expr) => {
      assert_eq!(parse($text), Ok($edit), "while parsing {:?}", $text);
    };
  }

  #[test]
  fn pointers() {
    assert_edit!("<123456>" => Edit::Pointer(Target::Address(0x12_3456)));
    assert_edit!("< 3f >" => Edit::Pointer(Target::Address(0x3f)));
    assert_edit!("<>" => Edit::Pointer(Target::Null));
    assert_edit!("<null>" => Edit::Pointer(Target::Null));
    assert_edit!("<graphics.maps>" => {
      Edit::Pointer(Target::Name("graphics.maps".into()))
    });
    assert_edit!("<1234567>" => Edit::Pointer(Target::Name("1234567".into())));
    assert_edit!("<123" => !);
  }

  #[test]
  fn short_addresses_are_padded() {
    assert_eq!(Target::from_text("1"), Target::Address(0x00_0001));
    assert_eq!(Target::from_text("abc"), Target::Address(0x00_0abc));
    assert_eq!(Target::from_text("ABCDEF"), Target::Address(0xab_cdef));
  }

  #[test]
  fn anchors_and_bytes() {
    assert_edit!("^sprites" => Edit::Anchor("sprites".into()));
    assert_edit!("ff" => Edit::Byte(0xff));
    assert_edit!("7" => Edit::Byte(0x07));
    assert_edit!("^" => !);
    assert_edit!("fff" => !);
    assert_edit!("" => !);
  }
}
