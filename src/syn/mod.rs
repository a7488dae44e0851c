//! The syntax of cell edits.
//!
//! Three kinds of text can be typed into a cell:
//! - `<dest>` writes a pointer. `dest` is either up to six hex digits, an
//!   anchor name, `null`, or nothing at all (also null).
//! - `^name` places a named anchor at the cell.
//! - One or two hex digits overwrite the byte.

mod parse;

pub use parse::parse;
pub use parse::Edit;
pub use parse::Error;
pub use parse::Target;
