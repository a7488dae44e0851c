//! Map layouts and their blockmaps.
//!
//! A layout header ties a blockmap to the two blocksets it draws from:
//!
//! ```text
//! +0   i32   width, in blocks
//! +4   i32   height, in blocks
//! +8   ptr   border blockmap
//! +12  ptr   blockmap
//! +16  ptr   primary blockset
//! +20  ptr   secondary blockset
//! +24  u8    border width (FireRed/LeafGreen)
//! +25  u8    border height (FireRed/LeafGreen)
//! ```
//!
//! The blockmap's dimensions live only in this header, so a blockmap run finds
//! them by stepping back from the pointer that refers to it.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::delta::Delta;
use crate::gfx::BankError;
use crate::gfx::BankPair;
use crate::gfx::Canvas;
use crate::gfx::RenderCache;
use crate::int::Int;
use crate::int::Width;
use crate::rom::Version;
use crate::run::Destination;
use crate::run::Run;
use crate::run::RunKind;
use crate::space::Model;
use crate::space::SpaceError;

mod grid;

pub use grid::Grid;

/// The largest map the game can load, as a function of its dimensions.
///
/// The map is padded by a margin of border blocks on every side; the padded
/// map has to fit in a fixed buffer.
pub fn is_within_size_limit(width: i64, height: i64) -> bool {
  width >= 0 && height >= 0 && (width + 15) * (height + 14) <= 0x2800
}

/// The smallest width or height a map may be shrunk to.
pub const MIN_DIMENSION: i64 = 4;

/// A side of a map.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum Direction {
  /// The left edge.
  Left,
  /// The right edge.
  Right,
  /// The top edge.
  Up,
  /// The bottom edge.
  Down,
}

impl Direction {
  /// Returns how much the width and height change when this edge moves out
  /// by `amount`.
  pub fn deltas(self, amount: i64) -> (i64, i64) {
    match self {
      Self::Left | Self::Right => (amount, 0),
      Self::Up | Self::Down => (0, amount),
    }
  }

  /// Returns how far existing cells move when this edge moves out by
  /// `amount`.
  pub fn offsets(self, amount: i64) -> (i64, i64) {
    match self {
      Self::Left => (amount, 0),
      Self::Up => (0, amount),
      Self::Right | Self::Down => (0, 0),
    }
  }
}

impl fmt::Display for Direction {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    let name = match self {
      Self::Left => "left",
      Self::Right => "right",
      Self::Up => "up",
      Self::Down => "down",
    };
    f.write_str(name)
  }
}

/// An error for an unrecognized direction name.
#[derive(Clone, PartialEq, Eq, Debug, Error)]
#[error("unknown direction `{0}`")]
pub struct BadDirection(pub String);

impl FromStr for Direction {
  type Err = BadDirection;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "left" | "l" => Ok(Self::Left),
      "right" | "r" => Ok(Self::Right),
      "up" | "u" => Ok(Self::Up),
      "down" | "d" => Ok(Self::Down),
      _ => Err(BadDirection(s.to_string())),
    }
  }
}

/// A rejected resize.
#[derive(Clone, PartialEq, Eq, Debug, Error)]
pub enum ResizeError {
  /// The resize would not change anything.
  #[error("cannot resize by zero")]
  ZeroAmount,
  /// The map would exceed the size limit.
  #[error("a {width}x{height} map is too large")]
  TooLarge {
    /// The width the map would have had.
    width: i64,
    /// The height the map would have had.
    height: i64,
  },
  /// The map would be smaller than the minimum size.
  #[error("a {width}x{height} map is too small")]
  TooSmall {
    /// The width the map would have had.
    width: i64,
    /// The height the map would have had.
    height: i64,
  },
  /// The map is already past the size limit, so its header cannot be
  /// trusted.
  #[error("the current {width}x{height} map is past the size limit")]
  Oversized {
    /// The width the header claims.
    width: u32,
    /// The height the header claims.
    height: u32,
  },
  /// The run was not a blockmap.
  #[error("no blockmap at {0:06X}")]
  NotBlockmap(u32),
  /// No layout header refers to the blockmap.
  #[error("no layout refers to the blockmap at {0:06X}")]
  NoLayout(u32),
  /// The image could not grow to hold the map.
  #[error(transparent)]
  Space(#[from] SpaceError),
}

/// A layout header.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct Layout {
  start: u32,
}

impl Layout {
  /// Offset of the width field.
  pub const WIDTH: u32 = 0;
  /// Offset of the height field.
  pub const HEIGHT: u32 = 4;
  /// Offset of the border pointer.
  pub const BORDER: u32 = 8;
  /// Offset of the blockmap pointer.
  pub const MAP: u32 = 12;
  /// Offset of the primary blockset pointer.
  pub const PRIMARY: u32 = 16;
  /// Offset of the secondary blockset pointer.
  pub const SECONDARY: u32 = 20;
  /// Offset of the border width byte.
  pub const BORDER_WIDTH: u32 = 24;
  /// Offset of the border height byte.
  pub const BORDER_HEIGHT: u32 = 25;

  /// Creates a new `Layout` for the header at `start`.
  pub fn new(start: u32) -> Self {
    Self { start }
  }

  /// Finds the layout that owns `blockmap`, through its first source.
  pub fn owning(blockmap: &Run) -> Option<Self> {
    let source = *blockmap.sources().first()?;
    source.checked_sub(Self::MAP).map(Self::new)
  }

  /// Returns the address of the header.
  pub fn start(&self) -> u32 {
    self.start
  }

  fn read_u32(&self, model: &Model, offset: u32) -> u32 {
    model
      .read_int(self.start + offset, Width::I32)
      .map_or(0, Int::to_u32)
  }

  /// Returns the map's width, in blocks.
  pub fn width(&self, model: &Model) -> u32 {
    self.read_u32(model, Self::WIDTH)
  }

  /// Returns the map's height, in blocks.
  pub fn height(&self, model: &Model) -> u32 {
    self.read_u32(model, Self::HEIGHT)
  }

  /// Returns the size of the border blockmap.
  ///
  /// Only FireRed and LeafGreen store it; the other games always use 2x2.
  pub fn border_size(&self, model: &Model) -> (u32, u32) {
    match model.version() {
      Version::FireRedLeafGreen => {
        let read = |offset| model.byte(self.start + offset).unwrap_or(0);
        let read = |offset| read(offset) as u32;
        (read(Self::BORDER_WIDTH), read(Self::BORDER_HEIGHT))
      }
      Version::RubySapphireEmerald => (2, 2),
    }
  }

  /// Returns the address of the blockmap.
  pub fn blockmap_start(&self, model: &Model) -> Result<u32, BankError> {
    let at = self.start + Self::MAP;
    model.pointer_target(at).ok_or(BankError::BadPointer { at })
  }

  /// Returns the blockmap run, whether or not it has been registered.
  pub fn blockmap(&self, model: &Model) -> Result<Run, BankError> {
    let start = self.blockmap_start(model)?;
    match model.run_at(start) {
      Some(run) if matches!(run.kind(), RunKind::Blockmap { .. }) => {
        Ok(run.clone())
      }
      _ => Ok(Run::blockmap(model, start, Some(self.start + Self::MAP))),
    }
  }

  /// Returns the blocksets this layout draws from.
  ///
  /// The primary blockset is required; a null or invalid secondary pointer
  /// means there is none.
  pub fn bank_pair(&self, model: &Model) -> Result<BankPair, BankError> {
    let at = self.start + Self::PRIMARY;
    let primary = model
      .pointer_target(at)
      .ok_or(BankError::BadPointer { at })?;
    let at = self.start + Self::SECONDARY;
    let secondary = model.pointer_target(at);
    let is_null = model.read_pointer(at) == Some(Destination::Null);
    if secondary.is_none() && !is_null {
      tracing::warn!(layout = self.start, "unreadable secondary blockset");
    }
    Ok(BankPair::new(model, primary, secondary))
  }

  /// Registers runs for the header's pointers, the blockmap, and both
  /// blocksets.
  ///
  /// Returns the blockmap run.
  pub fn observe(&self, model: &mut Model) -> Result<Run, BankError> {
    for &offset in &[Self::BORDER, Self::MAP, Self::PRIMARY, Self::SECONDARY] {
      model.observe_run_written(Run::pointer(model, self.start + offset));
    }
    self.bank_pair(model)?.observe(model)?;
    let run = self.blockmap(model)?;
    Ok(model.observe_run_written(run))
  }
}

/// Grows or shrinks the blockmap `run` by moving one edge.
///
/// A positive `amount` moves the edge outward. New cells copy the nearest
/// surviving cell; cells pushed past the new edges are dropped. The blockmap
/// is relocated if it no longer fits, and the owning layout's header is
/// updated to match.
///
/// Nothing is written if the resize is rejected.
pub fn try_resize(
  model: &mut Model,
  delta: &mut Delta,
  run: &Run,
  direction: Direction,
  amount: i64,
) -> Result<Run, ResizeError> {
  if amount == 0 {
    return Err(ResizeError::ZeroAmount);
  }
  let (width, height) = match run.kind() {
    RunKind::Blockmap { width, height } => (width as i64, height as i64),
    _ => return Err(ResizeError::NotBlockmap(run.start())),
  };
  if !is_within_size_limit(width, height) {
    return Err(ResizeError::Oversized {
      width: width as u32,
      height: height as u32,
    });
  }

  let (dw, dh) = direction.deltas(amount);
  let (new_width, new_height) = (width + dw, height + dh);
  if amount > 0 && !is_within_size_limit(new_width, new_height) {
    return Err(ResizeError::TooLarge {
      width: new_width,
      height: new_height,
    });
  }
  if amount < 0 && (new_width < MIN_DIMENSION || new_height < MIN_DIMENSION) {
    return Err(ResizeError::TooSmall {
      width: new_width,
      height: new_height,
    });
  }
  let layout =
    Layout::owning(run).ok_or_else(|| ResizeError::NoLayout(run.start()))?;

  let grid = Grid::read(model, run.start(), width as usize, height as usize);
  let resized = grid.resized(direction, amount);
  let bytes = resized.encode();

  let header = layout.start();
  let moved = model.atomically(delta, |model, delta| {
    let moved = model.relocate(delta, run, bytes.len() as u32)?;
    model.write_bytes(delta, moved.start(), &bytes)?;
    let width_field = Int::I32(new_width as u32);
    let height_field = Int::I32(new_height as u32);
    model.write_int(delta, header + Layout::WIDTH, width_field)?;
    model.write_int(delta, header + Layout::HEIGHT, height_field)?;
    Ok::<_, SpaceError>(moved)
  })?;

  tracing::info!(
    blockmap = moved.start(),
    width = new_width,
    height = new_height,
    "resized map {} by {}",
    direction,
    amount
  );
  let kind = RunKind::Blockmap {
    width: new_width as u32,
    height: new_height as u32,
  };
  let run = Run::with_sources(moved.start(), moved.sources().to_vec(), kind);
  Ok(model.observe_run_written(run))
}

/// Renders the whole map described by `layout`.
///
/// Cells naming a block past the end of the block table are left as color
/// zero.
pub fn render_map(
  model: &Model,
  layout: Layout,
  cache: &mut RenderCache,
) -> Result<Canvas, BankError> {
  let banks = layout.bank_pair(model)?;
  let blocks = cache.blocks(model, &banks)?;
  let run = layout.blockmap(model)?;
  let grid = match run.kind() {
    RunKind::Blockmap { width, height }
      if is_within_size_limit(width as i64, height as i64) =>
    {
      Grid::read(model, run.start(), width as usize, height as usize)
    }
    kind => {
      tracing::warn!(layout = layout.start(), ?kind, "unusable blockmap");
      Grid::new(0, 0)
    }
  };

  let mut canvas = Canvas::new(grid.width() * 16, grid.height() * 16);
  for y in 0..grid.height() {
    for x in 0..grid.width() {
      let index = grid.get(x, y).unwrap_or(0) & 0x3ff;
      if let Some(block) = blocks.get(index as usize) {
        canvas.draw(block, x * 16, y * 16);
      }
    }
  }
  Ok(canvas)
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::gfx::Color;
  use crate::testing::MapFixture;

  #[test]
  fn size_limit() {
    assert!(is_within_size_limit(4, 4));
    assert!(is_within_size_limit(113, 66));
    assert!(!is_within_size_limit(113, 67));
    assert!(!is_within_size_limit(-1, 4));
  }

  #[test]
  fn directions() {
    assert_eq!("Left".parse(), Ok(Direction::Left));
    assert_eq!("d".parse(), Ok(Direction::Down));
    assert_eq!(
      "sideways".parse::<Direction>(),
      Err(BadDirection("sideways".into()))
    );
    assert_eq!(Direction::Up.to_string(), "up");
  }

  #[test]
  fn grow_right_copies_the_last_column() {
    let fixture = MapFixture::new("BPEE");
    let mut model = fixture.model;
    let layout = Layout::new(fixture.layout);
    let run = layout.observe(&mut model).unwrap();
    assert_eq!(
      run.kind(),
      RunKind::Blockmap {
        width: 4,
        height: 4
      }
    );
    let before = Grid::read(&model, run.start(), 4, 4);

    let mut delta = Delta::new();
    let run =
      try_resize(&mut model, &mut delta, &run, Direction::Right, 2).unwrap();
    assert_eq!(
      run.kind(),
      RunKind::Blockmap {
        width: 6,
        height: 4
      }
    );
    assert_eq!(layout.width(&model), 6);
    assert_eq!(layout.height(&model), 4);
    assert_eq!(
      model.pointer_target(fixture.layout + Layout::MAP),
      Some(run.start())
    );

    let after = Grid::read(&model, run.start(), 6, 4);
    for y in 0..4 {
      for x in 0..4 {
        assert_eq!(after.get(x, y), before.get(x, y));
      }
      assert_eq!(after.get(4, y), before.get(3, y));
      assert_eq!(after.get(5, y), before.get(3, y));
    }
  }

  #[test]
  fn rejected_resizes() {
    let fixture = MapFixture::new("BPEE");
    let mut model = fixture.model;
    let run = Layout::new(fixture.layout).observe(&mut model).unwrap();
    let mut delta = Delta::new();

    let mut resize = |direction, amount| {
      try_resize(&mut model, &mut delta, &run, direction, amount)
    };
    assert_eq!(resize(Direction::Up, 0), Err(ResizeError::ZeroAmount));
    assert_eq!(
      resize(Direction::Left, -1),
      Err(ResizeError::TooSmall {
        width: 3,
        height: 4
      })
    );
    assert_eq!(
      resize(Direction::Down, 600),
      Err(ResizeError::TooLarge {
        width: 4,
        height: 604
      })
    );
    assert!(delta.is_empty());

    let anchor = Run::new(0x300, RunKind::NoInfo);
    assert_eq!(
      try_resize(&mut model, &mut delta, &anchor, Direction::Up, 1),
      Err(ResizeError::NotBlockmap(0x300))
    );
  }

  #[test]
  fn corrupt_headers_are_not_decoded() {
    let fixture = MapFixture::new("BPEE");
    let mut model = fixture.model;
    let mut delta = Delta::new();
    let mut setup = Delta::new();
    let header = fixture.layout;
    for &field in &[Layout::WIDTH, Layout::HEIGHT] {
      let huge = Int::I32(0x1_0000);
      model.write_int(&mut setup, header + field, huge).unwrap();
    }
    let run = Layout::new(header).blockmap(&model).unwrap();
    assert_eq!(
      run.kind(),
      RunKind::Blockmap {
        width: 0x1_0000,
        height: 0x1_0000
      }
    );

    for &amount in &[-1, 1] {
      assert_eq!(
        try_resize(&mut model, &mut delta, &run, Direction::Right, amount),
        Err(ResizeError::Oversized {
          width: 0x1_0000,
          height: 0x1_0000
        })
      );
    }
    assert!(delta.is_empty());
  }

  #[test]
  fn shrink_then_grow_up() {
    let fixture = MapFixture::new("BPRE");
    let mut model = fixture.model;
    let layout = Layout::new(fixture.layout);
    let run = layout.observe(&mut model).unwrap();
    let before = Grid::read(&model, run.start(), 4, 4);

    let mut delta = Delta::new();
    let run =
      try_resize(&mut model, &mut delta, &run, Direction::Up, 3).unwrap();
    assert_eq!(layout.height(&model), 7);
    let after = Grid::read(&model, run.start(), 4, 7);
    for x in 0..4 {
      for y in 0..3 {
        assert_eq!(after.get(x, y), before.get(x, 0));
      }
      assert_eq!(after.get(x, 6), before.get(x, 3));
    }

    let run =
      try_resize(&mut model, &mut delta, &run, Direction::Up, -3).unwrap();
    assert_eq!(Grid::read(&model, run.start(), 4, 4), before);
  }

  #[test]
  fn renders_every_cell() {
    let fixture = MapFixture::new("BPEE");
    let mut cache = RenderCache::new();
    let layout = Layout::new(fixture.layout);
    let canvas = render_map(&fixture.model, layout, &mut cache).unwrap();
    assert_eq!((canvas.width(), canvas.height()), (64, 64));

    // Cell (1, 0) holds block 1, drawn from tile 1 in palette 0.
    assert_eq!(canvas.pixel(16, 0), Some(Color::new(1, 0, 0)));
    // Cell (0, 3) holds block 12, padding between the two blocksets.
    assert_eq!(canvas.pixel(0, 48), Some(Color::default()));
  }
}
