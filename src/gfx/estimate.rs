//! Table length estimation.
//!
//! Tile and block tables do not record their own length. These functions guess
//! it from the layout of the runs that follow the table. They are heuristics:
//! a wrong guess only means a table is read short or long, and they never
//! report fewer than one element.

use crate::gfx::Block;
use crate::gfx::Tile;
use crate::run::Run;
use crate::run::RunKind;
use crate::space::Model;

/// Returns the run after `run`, skipping at least one byte.
fn after(model: &Model, run: &Run) -> Run {
  model.next_run(run.end().max(run.start() + 1))
}

/// Clamps a measured element count to `1..=max`.
fn clamp(measured: u32, max: usize) -> usize {
  (measured as usize).min(max).max(1)
}

/// Estimates how many tiles the raw tile table at `start` holds, up to `max`.
///
/// Scans the runs following the table. Pointers are assumed to be stray
/// values inside the tile data. Anchors are too, unless they sit exactly on a
/// tile boundary, where they probably mark the next structure. Anything else
/// ends the table.
pub fn estimate_tile_count(model: &Model, start: u32, max: usize) -> usize {
  let len = Tile::LEN as u32;
  let limit = (start as u64).saturating_add(max as u64 * len as u64);
  let mut run = model.next_run(start + 1);
  while (run.start() as u64) < limit && !model.is_end(&run) {
    let inside = match run.kind() {
      RunKind::Pointer { .. } => true,
      RunKind::NoInfo => (run.start() - start) % len != 0,
      _ => false,
    };
    if !inside {
      break;
    }
    run = after(model, &run);
  }
  clamp(run.start().saturating_sub(start) / len, max)
}

/// Estimates how many blocks the block table at `start` holds, up to `max`.
///
/// Pointers and anchors before `attributes` are skipped; the table ends at
/// the first run past them. A table repointed after its attributes ends at
/// the very next run.
pub fn estimate_block_count(
  model: &Model,
  start: u32,
  max: usize,
  attributes: u32,
) -> usize {
  let mut run = model.next_run(start + 1);
  while run.start() < attributes && !model.is_end(&run) {
    match run.kind() {
      RunKind::NoInfo | RunKind::Pointer { .. } => run = after(model, &run),
      _ => break,
    }
  }
  clamp(run.start().saturating_sub(start) / Block::LEN as u32, max)
}
