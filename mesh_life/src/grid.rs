// grid.rs - Grid types for Conway's Game of Life

use crate::error::ConfigError;

/// One cell. Only `DEAD` and `ALIVE` occur in a correct run.
pub type Cell = u8;

pub const DEAD: Cell = 0;
pub const ALIVE: Cell = 1;

/// Square, row-major, contiguous array of cells.
///
/// Used both for the global N x N grid held by the coordinator and for the
/// S x S block every rank owns.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Grid {
    side: usize,
    cells: Vec<Cell>,
}

impl Grid {
    /// All-dead grid.
    pub fn new(side: usize) -> Self {
        Self { side, cells: vec![DEAD; side * side] }
    }

    pub fn from_cells(side: usize, cells: Vec<Cell>) -> Result<Self, ConfigError> {
        let expected = side * side;
        if cells.len() != expected {
            return Err(ConfigError::CellCount { side, expected, actual: cells.len() });
        }
        Ok(Self { side, cells })
    }

    /// Builds a grid from rows of `0`/`1`, mostly handy in tests.
    pub fn from_rows<R: AsRef<[Cell]>>(rows: &[R]) -> Result<Self, ConfigError> {
        let side = rows.len();
        let cells: Vec<Cell> = rows.iter().flat_map(|r| r.as_ref().iter().copied()).collect();
        Self::from_cells(side, cells)
    }

    pub fn side(&self) -> usize {
        self.side
    }

    pub fn get(&self, row: usize, col: usize) -> Cell {
        self.cells[row * self.side + col]
    }

    pub fn set(&mut self, row: usize, col: usize, cell: Cell) {
        self.cells[row * self.side + col] = cell;
    }

    /// Reads with toroidal wrap on both axes.
    pub fn get_wrapped(&self, row: isize, col: isize) -> Cell {
        let n = self.side as isize;
        self.get(row.rem_euclid(n) as usize, col.rem_euclid(n) as usize)
    }

    pub fn toggle(&mut self, row: usize, col: usize) {
        let cell = self.get(row, col);
        self.set(row, col, if cell == ALIVE { DEAD } else { ALIVE });
    }

    pub fn row(&self, row: usize) -> &[Cell] {
        &self.cells[row * self.side..(row + 1) * self.side]
    }

    pub fn column(&self, col: usize) -> Vec<Cell> {
        (0..self.side).map(|row| self.get(row, col)).collect()
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Cell]> {
        self.cells.chunks(self.side.max(1))
    }

    pub fn as_slice(&self) -> &[Cell] {
        &self.cells
    }

    pub fn as_mut_slice(&mut self) -> &mut [Cell] {
        &mut self.cells
    }

    pub fn into_cells(self) -> Vec<Cell> {
        self.cells
    }

    pub fn live_count(&self) -> usize {
        self.cells.iter().filter(|&&c| c != DEAD).count()
    }

    /// True when no cell is alive.
    pub fn is_extinct(&self) -> bool {
        self.cells.iter().all(|&c| c == DEAD)
    }

    pub fn clear(&mut self) {
        self.cells.fill(DEAD);
    }

    /// Copies the `side x side` square whose top-left corner is `origin`.
    pub fn extract(&self, origin: (usize, usize), side: usize) -> Grid {
        let (r0, c0) = origin;
        let mut block = Grid::new(side);
        for row in 0..side {
            let src = (r0 + row) * self.side + c0;
            block.cells[row * side..(row + 1) * side].copy_from_slice(&self.cells[src..src + side]);
        }
        block
    }

    /// Writes `block` into this grid with its top-left corner at `origin`.
    pub fn paste(&mut self, origin: (usize, usize), block: &Grid) {
        let (r0, c0) = origin;
        let side = block.side;
        for row in 0..side {
            let dst = (r0 + row) * self.side + c0;
            self.cells[dst..dst + side].copy_from_slice(block.row(row));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrapped_reads_cross_every_edge() {
        let mut grid = Grid::new(4);
        grid.set(3, 3, ALIVE);
        assert_eq!(grid.get_wrapped(-1, -1), ALIVE);
        assert_eq!(grid.get_wrapped(3, -1), ALIVE);
        assert_eq!(grid.get_wrapped(-1, 3), ALIVE);
        assert_eq!(grid.get_wrapped(7, 7), ALIVE);

        // Edge wraps that land on dead cells.
        assert_eq!(grid.get_wrapped(-1, 0), DEAD);
        assert_eq!(grid.get_wrapped(2, -1), DEAD);
        assert_eq!(grid.get_wrapped(4, 3), DEAD);
        assert_eq!(grid.get_wrapped(3, 4), DEAD);
    }

    #[test]
    fn extract_then_paste_restores_the_square() {
        let cells: Vec<Cell> = (0..36).map(|i| (i % 3 == 0) as Cell).collect();
        let grid = Grid::from_cells(6, cells).unwrap();
        let block = grid.extract((3, 3), 3);
        assert_eq!(block.row(0), &grid.row(3)[3..6]);

        let mut copy = Grid::new(6);
        copy.paste((3, 3), &block);
        assert_eq!(copy.extract((3, 3), 3), block);
        assert_eq!(copy.get(0, 0), DEAD);
    }

    #[test]
    fn wrong_cell_count_is_rejected() {
        assert_eq!(
            Grid::from_cells(3, vec![0; 8]),
            Err(ConfigError::CellCount { side: 3, expected: 9, actual: 8 })
        );
    }

    #[test]
    fn extinction_and_counts() {
        let mut grid = Grid::new(5);
        assert!(grid.is_extinct());
        grid.toggle(2, 2);
        assert!(!grid.is_extinct());
        assert_eq!(grid.live_count(), 1);
        assert_eq!(grid.column(2), vec![0, 0, 1, 0, 0]);
    }
}
