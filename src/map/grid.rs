//! Blockmap cell grids.

use crate::int::Width;
use crate::map::Direction;
use crate::space::Model;

/// A rectangle of 16-bit blockmap cells, stored row by row.
///
/// Each cell packs a block index in its low ten bits and collision and
/// elevation data above that; the grid does not interpret them.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Grid {
  width: usize,
  height: usize,
  cells: Vec<u16>,
}

impl Grid {
  /// Creates a new zero-filled `Grid`.
  pub fn new(width: usize, height: usize) -> Self {
    Self {
      width,
      height,
      cells: vec![0; width * height],
    }
  }

  /// Reads a `width` by `height` grid starting at `start`.
  ///
  /// Cells past the end of the image read as zero.
  pub fn read(model: &Model, start: u32, width: usize, height: usize) -> Self {
    let mut grid = Self::new(width, height);
    for (i, cell) in grid.cells.iter_mut().enumerate() {
      let addr = start as u64 + i as u64 * 2;
      if addr > u32::MAX as u64 {
        break;
      }
      *cell = model
        .read_int(addr as u32, Width::I16)
        .map_or(0, |int| int.to_u32() as u16);
    }
    grid
  }

  /// Returns the width, in cells.
  pub fn width(&self) -> usize {
    self.width
  }

  /// Returns the height, in cells.
  pub fn height(&self) -> usize {
    self.height
  }

  /// Returns every cell, row by row.
  pub fn cells(&self) -> &[u16] {
    &self.cells
  }

  /// Returns the cell at `(x, y)`, if it is inside the grid.
  pub fn get(&self, x: usize, y: usize) -> Option<u16> {
    if x >= self.width || y >= self.height {
      return None;
    }
    Some(self.cells[y * self.width + x])
  }

  /// Sets the cell at `(x, y)`; out-of-range writes are ignored.
  pub fn set(&mut self, x: usize, y: usize, value: u16) {
    if x < self.width && y < self.height {
      self.cells[y * self.width + x] = value;
    }
  }

  fn copy(&mut self, from: (usize, usize), to: (usize, usize)) {
    if let Some(value) = self.get(from.0, from.1) {
      self.set(to.0, to.1, value);
    }
  }

  /// Returns a copy of this grid with one edge moved out by `amount`.
  ///
  /// Surviving cells keep their place relative to the opposite edge. Every
  /// new cell copies its nearest neighbor toward the old contents, so new
  /// rows and columns repeat the old edge. The result is empty along any
  /// axis that would become negative.
  pub fn resized(&self, direction: Direction, amount: i64) -> Self {
    let (dw, dh) = direction.deltas(amount);
    let (dx, dy) = direction.offsets(amount);
    let (width, height) = (self.width as i64, self.height as i64);
    let new_width = (width + dw).max(0);
    let new_height = (height + dh).max(0);

    let mut grid = Self::new(new_width as usize, new_height as usize);
    for y in 0..height {
      let ny = y + dy;
      if ny < 0 || ny >= new_height {
        continue;
      }
      for x in 0..width {
        let nx = x + dx;
        if nx < 0 || nx >= new_width {
          continue;
        }
        let value = self.cells[(y * width + x) as usize];
        grid.set(nx as usize, ny as usize, value);
      }
    }

    let (w, h) = (grid.width, grid.height);
    // Rows, then columns, so corners pick up the already-filled rows.
    for y in (0..dy.max(0) as usize).rev() {
      for x in 0..w {
        grid.copy((x, y + 1), (x, y));
      }
    }
    if dy == 0 {
      for y in self.height.max(1)..h {
        for x in 0..w {
          grid.copy((x, y - 1), (x, y));
        }
      }
    }
    for x in (0..dx.max(0) as usize).rev() {
      for y in 0..h {
        grid.copy((x + 1, y), (x, y));
      }
    }
    if dx == 0 {
      for x in self.width.max(1)..w {
        for y in 0..h {
          grid.copy((x - 1, y), (x, y));
        }
      }
    }
    grid
  }

  /// Encodes the grid as little-endian cells.
  pub fn encode(&self) -> Vec<u8> {
    self.cells.iter().flat_map(|cell| cell.to_le_bytes()).collect()
  }
}

#[cfg(test)]
mod test {
  use super::*;

  fn numbered(width: usize, height: usize) -> Grid {
    let mut grid = Grid::new(width, height);
    for y in 0..height {
      for x in 0..width {
        grid.set(x, y, (y * width + x) as u16);
      }
    }
    grid
  }

  fn clamp(value: i64, len: usize) -> usize {
    value.max(0).min(len as i64 - 1) as usize
  }

  #[test]
  fn every_cell_copies_the_nearest_old_cell() {
    let old = numbered(5, 4);
    let directions =
      [Direction::Left, Direction::Right, Direction::Up, Direction::Down];
    for &direction in &directions {
      for &amount in &[-2, -1, 1, 3] {
        let new = old.resized(direction, amount);
        let (dw, dh) = direction.deltas(amount);
        assert_eq!(new.width() as i64, 5 + dw);
        assert_eq!(new.height() as i64, 4 + dh);

        let (dx, dy) = direction.offsets(amount);
        for y in 0..new.height() {
          for x in 0..new.width() {
            let ox = clamp(x as i64 - dx, old.width());
            let oy = clamp(y as i64 - dy, old.height());
            assert_eq!(
              new.get(x, y),
              old.get(ox, oy),
              "({}, {}) after {} {}",
              x,
              y,
              direction,
              amount
            );
          }
        }
      }
    }
  }

  #[test]
  fn empty_grids_stay_zero() {
    let grid = Grid::new(0, 3).resized(Direction::Right, 2);
    assert_eq!(grid.width(), 2);
    assert!(grid.cells().iter().all(|&cell| cell == 0));

    let grid = Grid::new(2, 0).resized(Direction::Up, 2);
    assert_eq!(grid.height(), 2);
    assert!(grid.cells().iter().all(|&cell| cell == 0));
  }

  #[test]
  fn encoding() {
    let mut grid = Grid::new(2, 1);
    grid.set(1, 0, 0x3201);
    grid.set(5, 5, 0xffff);
    assert_eq!(grid.encode(), vec![0, 0, 0x01, 0x32]);
    assert_eq!(grid.get(2, 0), None);
  }
}
