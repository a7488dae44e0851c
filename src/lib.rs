//! hexmap, a data model for editing Game Boy Advance cartridge images.
//!
//! An image is a flat byte buffer, annotated with an index of *runs*: typed,
//! non-overlapping regions such as pointers, map layouts, and graphics
//! tables. The [`space`] module owns both and keeps them consistent across
//! edits, relocations, and growth of the buffer. Every write goes through a
//! [`delta::Delta`], which records enough to undo it.
//!
//! [`space`]: space/index.html
//! [`delta::Delta`]: delta/struct.Delta.html

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod anchor;
pub mod delta;
pub mod error;
pub mod gfx;
pub mod int;
pub mod map;
pub mod meta;
pub mod rom;
pub mod run;
pub mod space;
pub mod syn;

#[cfg(test)]
mod testing;
