//! Blocksets: the four tables behind one bank.
//!
//! A blockset header looks like this:
//!
//! ```text
//! +0   u8    1 if the tile table is compressed
//! +1   u8    1 if this is a secondary blockset
//! +4   ptr   tiles
//! +8   ptr   palettes (always sixteen)
//! +12  ptr   blocks
//! +16  ptr   attributes (Ruby/Sapphire/Emerald)
//! +20  ptr   attributes (FireRed/LeafGreen)
//! ```

use crate::delta::Delta;
use crate::gfx::estimate_block_count;
use crate::gfx::estimate_tile_count;
use crate::gfx::lz;
use crate::gfx::tile;
use crate::gfx::BankCounts;
use crate::gfx::BankError;
use crate::gfx::Block;
use crate::gfx::Palette;
use crate::gfx::Tile;
use crate::gfx::PALETTES_PER_TABLE;
use crate::int::Int;
use crate::int::Width;
use crate::run::Run;
use crate::run::RunKind;
use crate::run::TileStorage;
use crate::space::Model;

/// One of the four tables in a blockset.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
enum Table {
  Tiles,
  Palettes,
  Blocks,
  Attributes,
}

impl Table {
  const ALL: [Table; 4] = [
    Table::Tiles,
    Table::Palettes,
    Table::Blocks,
    Table::Attributes,
  ];

  fn offset(self, counts: BankCounts) -> u32 {
    match self {
      Table::Tiles => 4,
      Table::Palettes => 8,
      Table::Blocks => 12,
      Table::Attributes => counts.attribute_offset,
    }
  }
}

/// A blockset header, and the tables it points to.
///
/// A `Blockset` is only an address; every operation reads through to the
/// model, so it stays valid across relocations of its tables.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct Blockset {
  start: u32,
  counts: BankCounts,
}

impl Blockset {
  /// Creates a new `Blockset` for the header at `start`.
  pub fn new(model: &Model, start: u32) -> Self {
    Self {
      start,
      counts: BankCounts::for_version(model.version()),
    }
  }

  /// Returns the address of the header.
  pub fn start(&self) -> u32 {
    self.start
  }

  /// Returns true if the tiles are LZ-compressed.
  pub fn is_compressed(&self, model: &Model) -> bool {
    model.byte(self.start) == Some(1)
  }

  /// Returns true if this is a secondary blockset.
  pub fn is_secondary(&self, model: &Model) -> bool {
    model.byte(self.start + 1) == Some(1)
  }

  /// Returns the most tiles this blockset's bank can hold.
  pub fn tile_capacity(&self, model: &Model) -> usize {
    if self.is_secondary(model) {
      self.counts.secondary_tiles()
    } else {
      self.counts.primary_tiles
    }
  }

  /// Returns the most blocks this blockset's bank can hold.
  pub fn block_capacity(&self, model: &Model) -> usize {
    if self.is_secondary(model) {
      self.counts.secondary_blocks()
    } else {
      self.counts.primary_blocks
    }
  }

  fn pointer_at(&self, table: Table) -> u32 {
    self.start + table.offset(self.counts)
  }

  /// Follows the header pointer to `table`.
  fn table_start(&self, model: &Model, table: Table) -> Result<u32, BankError> {
    let at = self.pointer_at(table);
    model
      .pointer_target(at)
      .ok_or(BankError::BadPointer { at })
  }

  /// Returns the run describing `table` as it currently stands.
  ///
  /// A run already registered at the table's start is trusted; otherwise the
  /// length is estimated.
  fn current_run(&self, model: &Model, table: Table) -> Result<Run, BankError> {
    let at = self.pointer_at(table);
    let start = self.table_start(model, table)?;
    let known = model.run_at(start).map(Run::kind);

    let kind = match (table, known) {
      (Table::Tiles, Some(kind @ RunKind::Tiles(_))) => kind,
      (Table::Tiles, _) if self.is_compressed(model) => {
        let data = &model.bytes()[start as usize..];
        let (tiles, compressed_len) = lz::decompress(data)
          .map_err(|error| BankError::Lz { at: start, error })?;
        RunKind::Tiles(TileStorage::Lz {
          compressed_len: compressed_len as u32,
          tiles: (tiles.len() / Tile::LEN) as u32,
        })
      }
      (Table::Tiles, _) => {
        let max = self.tile_capacity(model);
        let count = estimate_tile_count(model, start, max);
        if count == max {
          tracing::warn!(at = start, max, "tile estimate hit the bank limit");
        }
        RunKind::Tiles(TileStorage::Raw {
          count: count as u32,
        })
      }
      (Table::Palettes, _) => RunKind::Palettes,
      (Table::Blocks, Some(kind @ RunKind::Blocks { .. })) => kind,
      (Table::Blocks, _) => RunKind::Blocks {
        count: self.block_count(model)? as u32,
      },
      (Table::Attributes, Some(kind @ RunKind::Attributes { .. })) => kind,
      (Table::Attributes, _) => RunKind::Attributes {
        count: self.block_count(model)? as u32,
        width: self.counts.attribute_width as u32,
      },
    };

    let sources = model
      .run_at(start)
      .map(|run| run.sources().to_vec())
      .unwrap_or_default();
    Ok(Run::with_sources(
      start,
      sources.into_iter().chain(Some(at)),
      kind,
    ))
  }

  /// Returns the number of blocks in the block table.
  fn block_count(&self, model: &Model) -> Result<usize, BankError> {
    let start = self.table_start(model, Table::Blocks)?;
    if let Some(RunKind::Blocks { count }) = model.run_at(start).map(Run::kind) {
      return Ok(count as usize);
    }
    let attributes = self.table_start(model, Table::Attributes)?;
    let max = self.block_capacity(model);
    let count = estimate_block_count(model, start, max, attributes);
    if count == max {
      tracing::warn!(at = start, max, "block estimate hit the bank limit");
    }
    Ok(count)
  }

  /// Returns the bytes of `run`, clipped to the image.
  fn bytes<'a>(model: &'a Model, run: &Run) -> &'a [u8] {
    let bytes = model.bytes();
    let start = (run.start() as usize).min(bytes.len());
    let end = (run.end() as usize).min(bytes.len());
    &bytes[start..end]
  }

  /// Registers runs for the header pointers and all four tables.
  pub fn observe(&self, model: &mut Model) -> Result<(), BankError> {
    for &table in &Table::ALL {
      let at = self.pointer_at(table);
      model.observe_run_written(Run::pointer(model, at));
    }
    for &table in &Table::ALL {
      let run = self.current_run(model, table)?;
      model.observe_run_written(run);
    }
    Ok(())
  }

  /// Reads the tile table.
  pub fn read_tiles(&self, model: &Model) -> Result<Vec<Tile>, BankError> {
    let run = self.current_run(model, Table::Tiles)?;
    let mut tiles = match run.kind() {
      RunKind::Tiles(TileStorage::Lz { .. }) => {
        let (data, _) = lz::decompress(Self::bytes(model, &run))
          .map_err(|error| BankError::Lz {
            at: run.start(),
            error,
          })?;
        tile::decode_all(&data)
      }
      _ => tile::decode_all(Self::bytes(model, &run)),
    };
    tiles.truncate(self.tile_capacity(model));
    Ok(tiles)
  }

  /// Reads all sixteen palettes.
  pub fn read_palettes(&self, model: &Model) -> Result<Vec<Palette>, BankError> {
    let run = self.current_run(model, Table::Palettes)?;
    let bytes = Self::bytes(model, &run);
    Ok(
      (0..PALETTES_PER_TABLE)
        .map(|i| Palette::decode(bytes.get(i * Palette::LEN..).unwrap_or(&[])))
        .collect(),
    )
  }

  /// Reads the block table.
  pub fn read_blocks(&self, model: &Model) -> Result<Vec<Block>, BankError> {
    let run = self.current_run(model, Table::Blocks)?;
    Ok(
      Self::bytes(model, &run)
        .chunks_exact(Block::LEN)
        .map(Block::decode)
        .collect(),
    )
  }

  /// Reads the attribute table, one record per block.
  pub fn read_attributes(&self, model: &Model) -> Result<Vec<u32>, BankError> {
    let run = self.current_run(model, Table::Attributes)?;
    let width = self.attribute_width();
    Ok(
      Self::bytes(model, &run)
        .chunks_exact(width.bytes())
        .filter_map(|record| Int::read_le(record, width))
        .map(Int::to_u32)
        .collect(),
    )
  }

  fn attribute_width(&self) -> Width {
    match self.counts.attribute_width {
      4 => Width::I32,
      _ => Width::I16,
    }
  }

  /// Replaces `table` with `bytes`, relocating it if it grew, and registers
  /// it as `kind`.
  fn write_table(
    &self,
    model: &mut Model,
    delta: &mut Delta,
    table: Table,
    bytes: &[u8],
    kind: RunKind,
  ) -> Result<Run, BankError> {
    let old = self.current_run(model, table)?;
    let moved = model.relocate(delta, &old, bytes.len() as u32)?;
    model.write_bytes(delta, moved.start(), bytes)?;
    let run = Run::with_sources(moved.start(), moved.sources().to_vec(), kind);
    tracing::debug!(
      blockset = self.start,
      table = ?table,
      at = run.start(),
      len = bytes.len(),
      "wrote table"
    );
    Ok(model.observe_run_written(run))
  }

  /// Replaces the tile table, compressing it if the blockset is compressed.
  pub fn write_tiles(
    &self,
    model: &mut Model,
    delta: &mut Delta,
    tiles: &[Tile],
  ) -> Result<Run, BankError> {
    let max = self.tile_capacity(model);
    if tiles.len() > max {
      return Err(BankError::TooMany {
        what: "tiles",
        count: tiles.len(),
        max,
      });
    }

    let raw = tile::encode_all(tiles);
    if self.is_compressed(model) {
      let data = lz::compress(&raw);
      let kind = RunKind::Tiles(TileStorage::Lz {
        compressed_len: data.len() as u32,
        tiles: tiles.len() as u32,
      });
      self.write_table(model, delta, Table::Tiles, &data, kind)
    } else {
      let count = tiles.len() as u32;
      let kind = RunKind::Tiles(TileStorage::Raw { count });
      self.write_table(model, delta, Table::Tiles, &raw, kind)
    }
  }

  /// Replaces the palette table. Missing palettes are written as black.
  pub fn write_palettes(
    &self,
    model: &mut Model,
    delta: &mut Delta,
    palettes: &[Palette],
  ) -> Result<Run, BankError> {
    if palettes.len() > PALETTES_PER_TABLE {
      return Err(BankError::TooMany {
        what: "palettes",
        count: palettes.len(),
        max: PALETTES_PER_TABLE,
      });
    }
    let mut bytes = Vec::with_capacity(PALETTES_PER_TABLE * Palette::LEN);
    for i in 0..PALETTES_PER_TABLE {
      let palette = palettes.get(i).copied().unwrap_or_default();
      bytes.extend_from_slice(&palette.encode());
    }
    self.write_table(model, delta, Table::Palettes, &bytes, RunKind::Palettes)
  }

  /// Replaces the block table.
  pub fn write_blocks(
    &self,
    model: &mut Model,
    delta: &mut Delta,
    blocks: &[Block],
  ) -> Result<Run, BankError> {
    let max = self.block_capacity(model);
    if blocks.len() > max {
      return Err(BankError::TooMany {
        what: "blocks",
        count: blocks.len(),
        max,
      });
    }
    let bytes = blocks
      .iter()
      .flat_map(|block| block.encode().to_vec())
      .collect::<Vec<_>>();
    let kind = RunKind::Blocks {
      count: blocks.len() as u32,
    };
    self.write_table(model, delta, Table::Blocks, &bytes, kind)
  }

  /// Replaces the attribute table, one record per block.
  pub fn write_attributes(
    &self,
    model: &mut Model,
    delta: &mut Delta,
    attributes: &[u32],
  ) -> Result<Run, BankError> {
    let max = self.block_capacity(model);
    if attributes.len() > max {
      return Err(BankError::TooMany {
        what: "attributes",
        count: attributes.len(),
        max,
      });
    }
    let width = self.attribute_width();
    let bytes = attributes
      .iter()
      .flat_map(|&value| Int::new(value, width).le_bytes())
      .collect::<Vec<_>>();
    let kind = RunKind::Attributes {
      count: attributes.len() as u32,
      width: width.bytes() as u32,
    };
    self.write_table(model, delta, Table::Attributes, &bytes, kind)
  }

  /// Returns the current number of blocks, as the block table stands.
  pub fn blocks_len(&self, model: &Model) -> Result<usize, BankError> {
    self.block_count(model)
  }
}
