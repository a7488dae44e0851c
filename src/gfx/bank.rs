//! Primary/secondary bank pairs.
//!
//! A map sees its two blocksets as one set of tables. Slot `i` of a combined
//! table lives in the primary blockset when `i` is below the primary count for
//! that kind of table, and at `i - count` in the secondary blockset otherwise.
//!
//! Palettes are the exception: there are always thirteen palette slots, and
//! slot `i` is palette `i` of whichever blockset owns it. Each palette table
//! still stores sixteen palettes, so the slots the other bank owns are simply
//! unused.
//!
//! Writes go to both blocksets or to neither: if the secondary table cannot be
//! written, the primary one is rolled back.

use crate::delta::Delta;
use crate::gfx::BankCounts;
use crate::gfx::BankError;
use crate::gfx::Block;
use crate::gfx::Blockset;
use crate::gfx::Palette;
use crate::gfx::Tile;
use crate::gfx::TOTAL_BLOCKS;
use crate::gfx::TOTAL_PALETTES;
use crate::gfx::TOTAL_TILES;
use crate::space::Model;

/// A primary blockset and, optionally, a secondary one.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct BankPair {
  primary: Blockset,
  secondary: Option<Blockset>,
  counts: BankCounts,
}

impl BankPair {
  /// Creates a new `BankPair` from the addresses of two blockset headers.
  pub fn new(model: &Model, primary: u32, secondary: Option<u32>) -> Self {
    Self {
      primary: Blockset::new(model, primary),
      secondary: secondary.map(|start| Blockset::new(model, start)),
      counts: BankCounts::for_version(model.version()),
    }
  }

  /// Returns the primary blockset.
  pub fn primary(&self) -> Blockset {
    self.primary
  }

  /// Returns the secondary blockset, if there is one.
  pub fn secondary(&self) -> Option<Blockset> {
    self.secondary
  }

  /// Returns the split between the two banks.
  pub fn counts(&self) -> BankCounts {
    self.counts
  }

  /// Returns a key identifying this pair, for caching.
  pub fn key(&self) -> (u32, Option<u32>) {
    (self.primary.start(), self.secondary.map(|b| b.start()))
  }

  /// Registers runs for both blocksets.
  pub fn observe(&self, model: &mut Model) -> Result<(), BankError> {
    self.primary.observe(model)?;
    if let Some(secondary) = self.secondary {
      secondary.observe(model)?;
    }
    Ok(())
  }

  /// Reads all tile slots.
  ///
  /// Slots neither blockset fills are `None`.
  pub fn read_tiles(&self, model: &Model) -> Result<Vec<Option<Tile>>, BankError> {
    let mut tiles = vec![None; TOTAL_TILES];
    let primary = self.primary.read_tiles(model)?;
    for (slot, tile) in tiles.iter_mut().zip(primary) {
      *slot = Some(tile);
    }
    if let Some(secondary) = &self.secondary {
      let secondary = secondary.read_tiles(model)?;
      let slots = &mut tiles[self.counts.primary_tiles..];
      for (slot, tile) in slots.iter_mut().zip(secondary) {
        *slot = Some(tile);
      }
    }
    Ok(tiles)
  }

  /// Reads all thirteen palette slots.
  ///
  /// Without a secondary blockset, the secondary slots are black.
  pub fn read_palettes(&self, model: &Model) -> Result<Vec<Palette>, BankError> {
    let pp = self.counts.primary_palettes;
    let mut palettes = vec![Palette::default(); TOTAL_PALETTES];
    let primary = self.primary.read_palettes(model)?;
    palettes[..pp].copy_from_slice(&primary[..pp]);
    if let Some(secondary) = &self.secondary {
      let secondary = secondary.read_palettes(model)?;
      palettes[pp..].copy_from_slice(&secondary[pp..TOTAL_PALETTES]);
    }
    Ok(palettes)
  }

  /// Reads the combined block table.
  ///
  /// The primary blocks are padded with empty blocks up to the primary count
  /// when there is a secondary bank to follow them.
  pub fn read_blocks(&self, model: &Model) -> Result<Vec<Block>, BankError> {
    let mut blocks = self.primary.read_blocks(model)?;
    if let Some(secondary) = &self.secondary {
      blocks.resize(self.counts.primary_blocks, Block::default());
      blocks.extend(secondary.read_blocks(model)?);
    }
    blocks.truncate(TOTAL_BLOCKS);
    Ok(blocks)
  }

  /// Reads the combined attribute table, split the same way as blocks.
  pub fn read_attributes(&self, model: &Model) -> Result<Vec<u32>, BankError> {
    let mut attributes = self.primary.read_attributes(model)?;
    if let Some(secondary) = &self.secondary {
      attributes.resize(self.counts.primary_blocks, 0);
      attributes.extend(secondary.read_attributes(model)?);
    }
    attributes.truncate(TOTAL_BLOCKS);
    Ok(attributes)
  }

  /// Writes all tile slots back.
  ///
  /// Each bank's table ends at its first `None` slot.
  pub fn write_tiles(
    &self,
    model: &mut Model,
    delta: &mut Delta,
    tiles: &[Option<Tile>],
  ) -> Result<(), BankError> {
    let split = self.counts.primary_tiles.min(tiles.len());
    let leading = |slots: &[Option<Tile>]| {
      slots
        .iter()
        .take_while(|tile| tile.is_some())
        .flatten()
        .copied()
        .collect::<Vec<_>>()
    };

    let primary = leading(&tiles[..split]);
    let secondary = leading(&tiles[split..]);
    model.atomically(delta, |model, delta| -> Result<(), BankError> {
      self.primary.write_tiles(model, delta, &primary)?;
      if let Some(bank) = &self.secondary {
        bank.write_tiles(model, delta, &secondary)?;
      }
      Ok(())
    })
  }

  /// Writes all thirteen palette slots back.
  ///
  /// Each blockset keeps the palettes it stores outside its own slots, except
  /// that the secondary blockset's copies of the primary slots are zeroed.
  pub fn write_palettes(
    &self,
    model: &mut Model,
    delta: &mut Delta,
    palettes: &[Palette],
  ) -> Result<(), BankError> {
    let pp = self.counts.primary_palettes;
    let slot = |i: usize| palettes.get(i).copied().unwrap_or_default();

    let mut primary = self.primary.read_palettes(model)?;
    for (i, palette) in primary.iter_mut().enumerate().take(pp) {
      *palette = slot(i);
    }
    let secondary = match &self.secondary {
      Some(bank) => {
        let mut table = bank.read_palettes(model)?;
        for (i, palette) in table.iter_mut().enumerate().take(TOTAL_PALETTES) {
          *palette = if i < pp { Palette::default() } else { slot(i) };
        }
        Some((bank, table))
      }
      None => None,
    };

    model.atomically(delta, |model, delta| -> Result<(), BankError> {
      self.primary.write_palettes(model, delta, &primary)?;
      if let Some((bank, table)) = secondary {
        bank.write_palettes(model, delta, &table)?;
      }
      Ok(())
    })
  }

  /// Writes the combined block table back.
  ///
  /// Empty blocks at the end of the primary bank are not written, unless the
  /// primary table already extends over them.
  pub fn write_blocks(
    &self,
    model: &mut Model,
    delta: &mut Delta,
    blocks: &[Block],
  ) -> Result<(), BankError> {
    let split = self.counts.primary_blocks.min(blocks.len());
    let current = self.primary.blocks_len(model)?;
    let primary = trim(&blocks[..split], current, |b| *b == Block::default());
    model.atomically(delta, |model, delta| -> Result<(), BankError> {
      self.primary.write_blocks(model, delta, primary)?;
      if let Some(secondary) = &self.secondary {
        secondary.write_blocks(model, delta, &blocks[split..])?;
      }
      Ok(())
    })
  }

  /// Writes the combined attribute table back, trimmed like blocks.
  pub fn write_attributes(
    &self,
    model: &mut Model,
    delta: &mut Delta,
    attributes: &[u32],
  ) -> Result<(), BankError> {
    let split = self.counts.primary_blocks.min(attributes.len());
    let current = self.primary.blocks_len(model)?;
    let primary = trim(&attributes[..split], current, |&a| a == 0);
    model.atomically(delta, |model, delta| -> Result<(), BankError> {
      self.primary.write_attributes(model, delta, primary)?;
      if let Some(secondary) = &self.secondary {
        secondary.write_attributes(model, delta, &attributes[split..])?;
      }
      Ok(())
    })
  }
}

/// Drops trailing entries for which `is_empty` holds, but never shortens
/// `items` below `keep`.
fn trim<T>(items: &[T], keep: usize, is_empty: impl Fn(&T) -> bool) -> &[T] {
  let used = items
    .iter()
    .rposition(|item| !is_empty(item))
    .map_or(0, |i| i + 1);
  &items[..used.max(keep).min(items.len())]
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::gfx::Color;
  use crate::gfx::TileRef;
  use crate::testing::MapFixture;

  #[test]
  fn combined_tiles() {
    let fixture = MapFixture::new("BPEE");
    let banks = fixture.banks();
    let tiles = banks.read_tiles(&fixture.model).unwrap();
    assert_eq!(tiles.len(), 1024);
    assert_eq!(tiles[1], Some(Tile([[1; 8]; 8])));
    assert_eq!(tiles[fixture.primary_tiles], None);
    assert_eq!(tiles[512], Some(Tile([[8; 8]; 8])));
    assert_eq!(tiles[515], Some(Tile([[11; 8]; 8])));
    assert_eq!(tiles[516], None);
  }

  #[test]
  fn combined_palettes() {
    for &(code, pp) in &[("BPRE", 7), ("AXVE", 6)] {
      let fixture = MapFixture::new(code);
      let palettes = fixture.banks().read_palettes(&fixture.model).unwrap();
      assert_eq!(palettes.len(), 13);
      assert_eq!(palettes[pp - 1].0[2], Color::new(2, pp as u8 - 1, 0));
      assert_eq!(palettes[pp].0[2], Color::new(2, pp as u8, 1));

      let primary_only = BankPair::new(&fixture.model, fixture.primary, None);
      let palettes = primary_only.read_palettes(&fixture.model).unwrap();
      assert_eq!(palettes.len(), 13);
      assert_eq!(palettes[pp], Palette::default());
    }
  }

  #[test]
  fn combined_blocks() {
    let fixture = MapFixture::new("BPRE");
    let banks = fixture.banks();
    let blocks = banks.read_blocks(&fixture.model).unwrap();
    assert_eq!(blocks.len(), 640 + fixture.secondary_blocks);
    assert_eq!(blocks[3].0[5], TileRef::decode(3));
    assert_eq!(blocks[100], Block::default());
    assert_eq!(blocks[641].0[0].tile, 641);

    let attributes = banks.read_attributes(&fixture.model).unwrap();
    assert_eq!(attributes.len(), blocks.len());
    assert_eq!(attributes[5], 5);
    assert_eq!(attributes[642], 0x100 + 2);
  }

  #[test]
  fn writing_blocks_back_keeps_the_split() {
    let fixture = MapFixture::new("BPEE");
    let mut model = fixture.model.clone();
    let banks = fixture.banks();
    banks.observe(&mut model).unwrap();

    let mut blocks = banks.read_blocks(&model).unwrap();
    blocks[513].0[0] = TileRef::decode(0x2005);
    let mut delta = Delta::new();
    banks.write_blocks(&mut model, &mut delta, &blocks).unwrap();

    // Padding between the primary blocks and the split is not written.
    assert_eq!(banks.primary().blocks_len(&model).unwrap(), fixture.primary_blocks);
    assert_eq!(banks.read_blocks(&model).unwrap(), blocks);
  }

  #[test]
  fn writing_palettes_zeroes_foreign_slots() {
    let fixture = MapFixture::new("BPEE");
    let mut model = fixture.model.clone();
    let banks = fixture.banks();
    banks.observe(&mut model).unwrap();

    let mut palettes = banks.read_palettes(&model).unwrap();
    palettes[0].0[0] = Color::new(31, 31, 31);
    palettes[12].0[0] = Color::new(1, 2, 3);
    let mut delta = Delta::new();
    banks.write_palettes(&mut model, &mut delta, &palettes).unwrap();

    assert_eq!(banks.read_palettes(&model).unwrap(), palettes);
    let secondary = banks.secondary().unwrap().read_palettes(&model).unwrap();
    assert_eq!(secondary[0], Palette::default());
    assert_eq!(secondary[14].0[2], Color::new(2, 14, 1));
  }

  #[test]
  fn writing_tiles_stops_at_holes() {
    let fixture = MapFixture::new("BPEE");
    let mut model = fixture.model.clone();
    let banks = fixture.banks();
    banks.observe(&mut model).unwrap();

    let mut tiles = banks.read_tiles(&model).unwrap();
    tiles[fixture.primary_tiles] = Some(Tile([[5; 8]; 8]));
    tiles[516] = Some(Tile::EMPTY);
    let mut delta = Delta::new();
    banks.write_tiles(&mut model, &mut delta, &tiles).unwrap();

    let primary = banks.primary().read_tiles(&model).unwrap();
    assert_eq!(primary.len(), fixture.primary_tiles + 1);
    let secondary = banks.secondary().unwrap().read_tiles(&model).unwrap();
    assert_eq!(secondary.len(), fixture.secondary_tiles + 1);
  }

  #[test]
  fn failed_writes_change_nothing() {
    let fixture = MapFixture::new("BPEE");
    let mut model = fixture.model.clone();
    let banks = fixture.banks();
    banks.observe(&mut model).unwrap();
    let before = model.clone();

    let mut blocks = banks.read_blocks(&model).unwrap();
    blocks[0].0[0] = TileRef::decode(0x2005);
    blocks.resize(1100, Block::default());
    let mut delta = Delta::new();
    assert_eq!(
      banks.write_blocks(&mut model, &mut delta, &blocks),
      Err(BankError::TooMany {
        what: "blocks",
        count: 1100 - 512,
        max: 512,
      })
    );
    assert!(delta.is_empty());
    assert_eq!(model.bytes(), before.bytes());
    assert_eq!(
      model.runs().collect::<Vec<_>>(),
      before.runs().collect::<Vec<_>>()
    );
    assert_eq!(banks.read_blocks(&model).unwrap()[0].0[0], TileRef::decode(0));

    // The primary half fits and moves; the secondary half does not.
    let mut tiles = vec![Some(Tile::EMPTY); 1100];
    tiles[0] = Some(Tile([[7; 8]; 8]));
    assert!(matches!(
      banks.write_tiles(&mut model, &mut delta, &tiles),
      Err(BankError::TooMany { what: "tiles", .. })
    ));
    assert!(delta.is_empty());
    assert_eq!(model.len(), before.len());
    assert_eq!(model.bytes(), before.bytes());
  }

  #[test]
  fn trimming() {
    assert_eq!(trim(&[1, 2, 0, 0], 0, |&x| x == 0), &[1, 2]);
    assert_eq!(trim(&[1, 2, 0, 0], 3, |&x| x == 0), &[1, 2, 0]);
    assert_eq!(trim(&[0, 0], 0, |&x| x == 0), &[] as &[i32]);
    assert_eq!(trim(&[1], 5, |&x| x == 0), &[1]);
  }
}
