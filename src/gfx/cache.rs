//! Rendered block caching.

use std::collections::HashMap;
use std::rc::Rc;

use crate::gfx::render_block;
use crate::gfx::BankError;
use crate::gfx::BankPair;
use crate::gfx::Canvas;
use crate::space::Model;

/// A cache of rendered blocks, keyed by bank pair.
///
/// The cache knows nothing about the model; whoever owns it must call
/// [`clear()`](#method.clear) after any write that touches graphics.
#[derive(Default, Debug)]
pub struct RenderCache {
  blocks: HashMap<(u32, Option<u32>), Rc<Vec<Canvas>>>,
}

impl RenderCache {
  /// Creates a new, empty `RenderCache`.
  pub fn new() -> Self {
    Self::default()
  }

  /// Returns every block of `banks`, rendered, rendering them first if
  /// needed.
  pub fn blocks(
    &mut self,
    model: &Model,
    banks: &BankPair,
  ) -> Result<Rc<Vec<Canvas>>, BankError> {
    if let Some(blocks) = self.blocks.get(&banks.key()) {
      return Ok(Rc::clone(blocks));
    }

    let tiles = banks.read_tiles(model)?;
    let palettes = banks.read_palettes(model)?;
    let blocks = banks
      .read_blocks(model)?
      .iter()
      .map(|block| render_block(block, &tiles, &palettes))
      .collect::<Vec<_>>();
    tracing::debug!(key = ?banks.key(), blocks = blocks.len(), "rendered blocks");

    let blocks = Rc::new(blocks);
    self.blocks.insert(banks.key(), Rc::clone(&blocks));
    Ok(blocks)
  }

  /// Returns the number of bank pairs cached.
  pub fn len(&self) -> usize {
    self.blocks.len()
  }

  /// Returns true if nothing is cached.
  pub fn is_empty(&self) -> bool {
    self.blocks.is_empty()
  }

  /// Forgets everything.
  pub fn clear(&mut self) {
    self.blocks.clear();
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::gfx::Color;
  use crate::testing::MapFixture;

  #[test]
  fn caches_by_bank_pair() {
    let fixture = MapFixture::new("BPEE");
    let banks = fixture.banks();
    let mut cache = RenderCache::new();

    let blocks = cache.blocks(&fixture.model, &banks).unwrap();
    assert_eq!(blocks.len(), 512 + fixture.secondary_blocks);
    assert_eq!(blocks[2].pixel(0, 0), Some(Color::new(2, 0, 0)));
    let again = cache.blocks(&fixture.model, &banks).unwrap();
    assert!(Rc::ptr_eq(&blocks, &again));
    assert_eq!(cache.len(), 1);

    cache.clear();
    assert!(cache.is_empty());
  }
}
