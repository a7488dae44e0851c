//! Diagnostics for the command line tool.
//!
//! Library operations return plain error enums. The [`Error`] trait adds the
//! two things a user needs to act on one: where in the image (or which file)
//! it happened, and what hexmap was doing at the time.
//!
//! [`Error`]: trait.Error.html

use std::fmt;
use std::io;
use std::path::Path;

/// An error that can be reported as a diagnostic.
///
/// The `Display` output becomes the first line of the report, so it should
/// fit on one line.
pub trait Error: fmt::Debug + fmt::Display {
  /// Returns where the error happened.
  fn cause(&self) -> Cause<'_>;
  /// Returns what was being done when the error happened, if known.
  fn action(&self) -> Option<Action>;
}

/// Errors collected while running a command, reported together at the end.
#[derive(Debug)]
pub struct Errors<E>(Vec<E>);

impl<E> Errors<E> {
  /// Creates a new, empty `Errors`.
  pub fn new() -> Self {
    Errors(Vec::new())
  }

  /// Returns true if nothing has gone wrong yet.
  pub fn is_ok(&self) -> bool {
    self.0.is_empty()
  }

  /// Returns the number of errors collected.
  pub fn len(&self) -> usize {
    self.0.len()
  }

  /// Records `error`.
  pub fn push(&mut self, error: E) {
    self.0.push(error);
  }

  /// Moves every error out of `errors` and into `self`.
  pub fn extend(&mut self, errors: Errors<E>) {
    self.0.extend(errors.0);
  }
}

impl<E> Default for Errors<E> {
  fn default() -> Self {
    Self::new()
  }
}

impl<E: Error> Errors<E> {
  /// Writes a report of every error to `sink`, returning whether there was
  /// anything to report.
  pub fn dump_to(&self, mut sink: impl io::Write) -> io::Result<bool> {
    if self.0.is_empty() {
      return Ok(false);
    }

    for (i, error) in self.0.iter().enumerate() {
      writeln!(sink, "error: {}", error)?;
      let place = error.cause().to_string();
      if !place.is_empty() {
        match error.action() {
          Some(action) => {
            writeln!(sink, "  while {} {}", action.describe(), place)?
          }
          None => writeln!(sink, "  at {}", place)?,
        }
      }

      if i != self.0.len() - 1 {
        writeln!(sink)?;
      }
    }

    Ok(true)
  }

  /// Reports to `stderr` and exits with `code`, unless there were no errors.
  pub fn dump_and_die(self, code: i32) {
    let dumped = match self.dump_to(io::stderr()) {
      Ok(dumped) => dumped,
      Err(_) => !self.is_ok(),
    };
    if dumped {
      eprintln!();
      eprintln!("error: there were {} errors", self.0.len());
      std::process::exit(code)
    }
  }
}

/// Where an error happened.
#[derive(Copy, Clone, Debug)]
pub enum Cause<'a> {
  /// An offset into the image.
  Address(u32),
  /// Somewhere in a file.
  File(&'a Path),
  /// Nowhere in particular.
  Unknown,
}

impl fmt::Display for Cause<'_> {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match self {
      Self::Address(addr) => write!(f, "{:06X}", addr),
      Self::File(path) => write!(f, "{}", path.display()),
      Self::Unknown => Ok(()),
    }
  }
}

/// An action that hexmap performs, which an error may be associated with.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Action {
  /// Reading an image or metadata file.
  Loading,
  /// Registering runs for a structure.
  Observing,
  /// Writing a pointer, anchor, or byte through its text form.
  Editing,
  /// Resizing a map.
  Resizing,
  /// Rendering a map.
  Rendering,
  /// Writing one of a bank's tables.
  WritingBank,
  /// Writing an image back out.
  Saving,
}

impl Action {
  fn describe(self) -> &'static str {
    match self {
      Self::Loading => "loading",
      Self::Observing => "observing",
      Self::Editing => "editing",
      Self::Resizing => "resizing the map at",
      Self::Rendering => "rendering the map at",
      Self::WritingBank => "writing the bank at",
      Self::Saving => "saving",
    }
  }
}

/// Any error, tagged with where it happened and what was being done.
#[derive(Debug)]
pub struct Located<'a, E> {
  /// The underlying error.
  pub error: E,
  /// Where it happened.
  pub cause: Cause<'a>,
  /// What was being done.
  pub action: Action,
}

impl<'a, E> Located<'a, E> {
  /// Creates a new `Located`.
  pub fn new(error: E, cause: Cause<'a>, action: Action) -> Self {
    Self {
      error,
      cause,
      action,
    }
  }
}

impl<E: fmt::Display> fmt::Display for Located<'_, E> {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    fmt::Display::fmt(&self.error, f)
  }
}

impl<E: fmt::Debug + fmt::Display> Error for Located<'_, E> {
  fn cause(&self) -> Cause<'_> {
    self.cause
  }

  fn action(&self) -> Option<Action> {
    Some(self.action)
  }
}
