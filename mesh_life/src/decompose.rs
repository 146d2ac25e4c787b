// decompose.rs - Splitting the global grid into per-rank blocks and back

use tracing::debug;

use crate::comm::{Comm, Tag};
use crate::error::{CommError, ConfigError, Result};
use crate::grid::Grid;
use crate::topology::Mesh;

/// Smallest block side that still has an interior.
pub const MIN_BLOCK_SIDE: usize = 3;

/// An N x N grid cut into `mesh.side()^2` blocks of S x S, in row-major block
/// order: rank `r` owns the block at `(r / side, r % side)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Decomposition {
    grid_side: usize,
    mesh: Mesh,
    block_side: usize,
}

impl Decomposition {
    pub fn new(grid_side: usize, processes: usize) -> Result<Self, ConfigError> {
        let mesh = Mesh::new(processes)?;
        if grid_side == 0 {
            return Err(ConfigError::EmptyGrid);
        }
        if grid_side % mesh.side() != 0 {
            return Err(ConfigError::NotDivisible { grid: grid_side, mesh_side: mesh.side() });
        }
        let block_side = grid_side / mesh.side();
        if block_side < MIN_BLOCK_SIDE {
            return Err(ConfigError::BlockTooSmall { block: block_side, min: MIN_BLOCK_SIDE });
        }
        Ok(Self { grid_side, mesh, block_side })
    }

    pub fn grid_side(&self) -> usize {
        self.grid_side
    }

    pub fn block_side(&self) -> usize {
        self.block_side
    }

    pub fn mesh(&self) -> Mesh {
        self.mesh
    }

    pub fn processes(&self) -> usize {
        self.mesh.size()
    }

    /// Global coordinates of the top-left cell of `rank`'s block.
    pub fn block_origin(&self, rank: usize) -> (usize, usize) {
        let (row, col) = self.mesh.coords(rank);
        (row * self.block_side, col * self.block_side)
    }

    /// Cuts `grid` into blocks indexed by rank.
    pub fn split(&self, grid: &Grid) -> Vec<Grid> {
        (0..self.processes())
            .map(|rank| grid.extract(self.block_origin(rank), self.block_side))
            .collect()
    }

    /// Inverse of [`Decomposition::split`].
    pub fn assemble(&self, blocks: &[Grid]) -> Grid {
        let mut grid = Grid::new(self.grid_side);
        for (rank, block) in blocks.iter().enumerate() {
            grid.paste(self.block_origin(rank), block);
        }
        grid
    }

    /// Hands every rank its block of the root's `global` grid. Only the root
    /// reads `global`.
    pub async fn scatter(&self, comm: &mut Comm, global: Option<&Grid>) -> Result<Grid> {
        let parts = if comm.is_root() {
            let global = global.ok_or_else(|| CommError::Protocol("root has no grid to scatter".into()))?;
            if global.side() != self.grid_side {
                return Err(ConfigError::CellCount {
                    side: self.grid_side,
                    expected: self.grid_side * self.grid_side,
                    actual: global.side() * global.side(),
                }
                .into());
            }
            Some(self.split(global).into_iter().map(Grid::into_cells).collect())
        } else {
            None
        };
        let cells = comm.scatter_root(Tag::Scatter, parts).await?;
        debug!(rank = comm.rank(), "block received");
        self.block_from(cells)
    }

    /// Collects every rank's block at the root. Returns `None` elsewhere.
    pub async fn gather(&self, comm: &mut Comm, block: &Grid) -> Result<Option<Grid>> {
        let parts = comm.gather_root(Tag::Gather, block.as_slice().to_vec()).await?;
        let Some(parts) = parts else {
            return Ok(None);
        };
        let blocks = parts
            .into_iter()
            .map(|cells| self.block_from(cells))
            .collect::<Result<Vec<_>>>()?;
        Ok(Some(self.assemble(&blocks)))
    }

    fn block_from(&self, cells: Vec<u8>) -> Result<Grid> {
        Grid::from_cells(self.block_side, cells)
            .map_err(|e| CommError::Protocol(format!("malformed block: {e}")).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comm::world;

    fn numbered(side: usize) -> Grid {
        Grid::from_cells(side, (0..side * side).map(|i| (i % 251) as u8).collect()).unwrap()
    }

    #[test]
    fn validation() {
        assert_eq!(Decomposition::new(12, 5), Err(ConfigError::NotPerfectSquare(5)));
        assert_eq!(
            Decomposition::new(10, 9),
            Err(ConfigError::NotDivisible { grid: 10, mesh_side: 3 })
        );
        assert_eq!(
            Decomposition::new(8, 16),
            Err(ConfigError::BlockTooSmall { block: 2, min: 3 })
        );
        assert_eq!(Decomposition::new(0, 1), Err(ConfigError::EmptyGrid));
        let d = Decomposition::new(12, 16).unwrap();
        assert_eq!(d.block_side(), 3);
        assert_eq!(d.block_origin(6), (3, 6));
    }

    #[test]
    fn blocks_keep_their_cells_in_order() {
        let d = Decomposition::new(9, 9).unwrap();
        let grid = numbered(9);
        let blocks = d.split(&grid);
        assert_eq!(blocks[4].row(0), &grid.row(3)[3..6]);
        assert_eq!(blocks[5].get(2, 2), grid.get(5, 8));
        assert_eq!(d.assemble(&blocks), grid);
    }

    #[tokio::test]
    async fn scatter_and_gather_over_ranks() {
        let d = Decomposition::new(8, 4).unwrap();
        let grid = numbered(8);
        let mut handles = Vec::new();
        for mut comm in world(4) {
            let global = comm.is_root().then(|| grid.clone());
            handles.push(tokio::spawn(async move {
                let block = d.scatter(&mut comm, global.as_ref()).await?;
                assert_eq!(block.get(0, 0), global_cell(&d, comm.rank()));
                d.gather(&mut comm, &block).await
            }));
        }
        let mut gathered = Vec::new();
        for handle in handles {
            gathered.push(handle.await.unwrap().unwrap());
        }
        assert_eq!(gathered[0].as_ref(), Some(&grid));
        assert!(gathered[1..].iter().all(Option::is_none));

        fn global_cell(d: &Decomposition, rank: usize) -> u8 {
            let (r, c) = d.block_origin(rank);
            (r * 8 + c) as u8
        }
    }
}
