// evolve.rs - Survival rule and the split interior/boundary update

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::error::Result;
use crate::grid::{ALIVE, Cell, DEAD, Grid};
use crate::halo::Halo;
use crate::topology::Direction;

/// Next state of one cell given its live-neighbor count.
pub fn rule(cell: Cell, live_neighbors: usize) -> Cell {
    match (cell, live_neighbors) {
        (ALIVE, 2) | (ALIVE, 3) => ALIVE,  // Survival
        (ALIVE, _)              => DEAD,   // Under- or overpopulation
        (DEAD, 3)               => ALIVE,  // Birth
        (other, _)              => other,  // Stays dead
    }
}

/// What one generation's updates observed. Starts empty every generation and
/// only ever accumulates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Diagnostics {
    any_alive: bool,
    changed: bool,
}

impl Diagnostics {
    pub fn new(any_alive: bool, changed: bool) -> Self {
        Self { any_alive, changed }
    }

    pub fn record(&mut self, before: Cell, after: Cell) {
        self.any_alive |= after != DEAD;
        self.changed |= after != before;
    }

    pub fn merge(&mut self, other: Diagnostics) {
        self.any_alive |= other.any_alive;
        self.changed |= other.changed;
    }

    fn merged(mut self, other: Diagnostics) -> Diagnostics {
        self.merge(other);
        self
    }

    /// No cell written this generation is alive.
    pub fn all_dead(&self) -> bool {
        !self.any_alive
    }

    pub fn any_alive(&self) -> bool {
        self.any_alive
    }

    /// Some cell written this generation differs from its previous state.
    pub fn changed(&self) -> bool {
        self.changed
    }
}

fn count_alive(cells: [Cell; 8]) -> usize {
    cells.iter().filter(|&&c| c == ALIVE).count()
}

fn interior_row(active: &Grid, row: usize, out: &mut [Cell], diag: &mut Diagnostics) {
    let side = active.side();
    let (up, mid, down) = (active.row(row - 1), active.row(row), active.row(row + 1));
    for col in 1..side - 1 {
        let neighbors = count_alive([
            up[col - 1],   up[col],   up[col + 1],
            mid[col - 1],             mid[col + 1],
            down[col - 1], down[col], down[col + 1],
        ]);
        let next = rule(mid[col], neighbors);
        out[col] = next;
        diag.record(mid[col], next);
    }
}

/// Updates every cell off the outer ring, reading only `active`.
pub fn evolve_interior(active: &Grid, next: &mut Grid, diag: &mut Diagnostics) {
    let side = active.side();
    if side < 3 {
        return;
    }
    for (row, out) in next.as_mut_slice().chunks_mut(side).enumerate() {
        if row > 0 && row + 1 < side {
            interior_row(active, row, out, diag);
        }
    }
}

/// Same as [`evolve_interior`], with rows spread over `pool`.
pub fn evolve_interior_par(active: &Grid, next: &mut Grid, diag: &mut Diagnostics, pool: &ThreadPool) {
    let side = active.side();
    if side < 3 {
        return;
    }
    let observed = pool.install(|| {
        next.as_mut_slice()
            .par_chunks_mut(side)
            .enumerate()
            .filter(|(row, _)| *row > 0 && row + 1 < side)
            .map(|(row, out)| {
                let mut local = Diagnostics::default();
                interior_row(active, row, out, &mut local);
                local
            })
            .reduce(Diagnostics::default, Diagnostics::merged)
    });
    diag.merge(observed);
}

fn boundary_next(active: &Grid, halo: &Halo, row: usize, col: usize) -> Cell {
    let neighbors = count_alive(Direction::ALL.map(|dir| {
        let (dr, dc) = dir.offset();
        halo.cell(active, row as isize + dr, col as isize + dc)
    }));
    rule(active.get(row, col), neighbors)
}

/// Coordinates of the outer ring, each cell once.
fn ring(side: usize) -> Vec<(usize, usize)> {
    if side == 0 {
        return Vec::new();
    }
    let last = side - 1;
    let mut cells = Vec::with_capacity(4 * side);
    for col in 0..side {
        cells.push((0, col));
        if last > 0 {
            cells.push((last, col));
        }
    }
    for row in 1..last {
        cells.push((row, 0));
        cells.push((row, last));
    }
    cells
}

/// Updates the outer ring, taking off-block neighbors from `halo`.
pub fn evolve_boundary(active: &Grid, halo: &Halo, next: &mut Grid, diag: &mut Diagnostics) {
    for (row, col) in ring(active.side()) {
        let before = active.get(row, col);
        let after = boundary_next(active, halo, row, col);
        next.set(row, col, after);
        diag.record(before, after);
    }
}

/// Same as [`evolve_boundary`], with ring cells computed on `pool`.
pub fn evolve_boundary_par(active: &Grid, halo: &Halo, next: &mut Grid, diag: &mut Diagnostics, pool: &ThreadPool) {
    let cells = ring(active.side());
    let updates: Vec<(usize, usize, Cell)> = pool.install(|| {
        cells
            .par_iter()
            .map(|&(row, col)| (row, col, boundary_next(active, halo, row, col)))
            .collect()
    });
    for (row, col, after) in updates {
        diag.record(active.get(row, col), after);
        next.set(row, col, after);
    }
}

/// Per-rank evolution settings: sequential, or interior rows and ring cells
/// on a pool.
pub struct Evolver {
    pool: Option<ThreadPool>,
}

impl Evolver {
    pub fn sequential() -> Self {
        Self { pool: None }
    }

    /// `threads <= 1` means no pool.
    pub fn with_threads(threads: usize) -> Result<Self> {
        if threads <= 1 {
            return Ok(Self::sequential());
        }
        let pool = ThreadPoolBuilder::new().num_threads(threads).build()?;
        Ok(Self { pool: Some(pool) })
    }

    pub fn interior(&self, active: &Grid, next: &mut Grid, diag: &mut Diagnostics) {
        match &self.pool {
            Some(pool) => evolve_interior_par(active, next, diag, pool),
            None => evolve_interior(active, next, diag),
        }
    }

    pub fn boundary(&self, active: &Grid, halo: &Halo, next: &mut Grid, diag: &mut Diagnostics) {
        match &self.pool {
            Some(pool) => evolve_boundary_par(active, halo, next, diag, pool),
            None => evolve_boundary(active, halo, next, diag),
        }
    }
}

/// One generation of a whole torus held as a single grid, via the split
/// interior/boundary path with the grid as its own halo.
pub fn step_block(active: &Grid) -> (Grid, Diagnostics) {
    let mut next = Grid::new(active.side());
    let mut diag = Diagnostics::default();
    evolve_interior(active, &mut next, &mut diag);
    evolve_boundary(active, &Halo::periodic(active), &mut next, &mut diag);
    (next, diag)
}

/// Sequential reference: one generation of the torus with modular indexing.
pub fn step_torus(grid: &Grid) -> Grid {
    let side = grid.side();
    let mut next = Grid::new(side);
    for row in 0..side {
        for col in 0..side {
            let neighbors = count_alive(Direction::ALL.map(|dir| {
                let (dr, dc) = dir.offset();
                grid.get_wrapped(row as isize + dr, col as isize + dc)
            }));
            next.set(row, col, rule(grid.get(row, col), neighbors));
        }
    }
    next
}
