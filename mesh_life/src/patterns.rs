// patterns.rs - Initial states: named patterns and random fills

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::ConfigError;
use crate::grid::{ALIVE, DEAD, Grid};

pub struct Pattern {
    pub name: &'static str,
    /// Live cells relative to the pattern's top-left corner.
    pub cells: &'static [(usize, usize)],
}

impl Pattern {
    /// Bounding box as `(rows, cols)`.
    pub fn extent(&self) -> (usize, usize) {
        let rows = self.cells.iter().map(|&(r, _)| r + 1).max().unwrap_or(0);
        let cols = self.cells.iter().map(|&(_, c)| c + 1).max().unwrap_or(0);
        (rows, cols)
    }

    /// Lower-case, hyphenated form accepted on the command line.
    pub fn slug(&self) -> String {
        self.name.to_lowercase().replace(' ', "-")
    }
}

pub const PATTERNS: &[Pattern] = &[
    Pattern {
        name: "Glider",
        cells: &[(0, 1), (1, 2), (2, 0), (2, 1), (2, 2)],
    },
    Pattern {
        name: "Blinker",
        cells: &[(0, 0), (0, 1), (0, 2)],
    },
    Pattern {
        name: "Block",
        cells: &[(0, 0), (0, 1), (1, 0), (1, 1)],
    },
    Pattern {
        name: "Toad",
        cells: &[(0, 1), (0, 2), (0, 3), (1, 0), (1, 1), (1, 2)],
    },
    Pattern {
        name: "Beacon",
        cells: &[(0, 0), (0, 1), (1, 0), (1, 1), (2, 2), (2, 3), (3, 2), (3, 3)],
    },
    Pattern {
        name: "Pulsar",
        cells: &[
            // Top section
            (0, 2), (0, 3), (0, 4), (0, 8), (0, 9), (0, 10),
            (2, 0), (2, 5), (2, 7), (2, 12),
            (3, 0), (3, 5), (3, 7), (3, 12),
            (4, 0), (4, 5), (4, 7), (4, 12),
            (5, 2), (5, 3), (5, 4), (5, 8), (5, 9), (5, 10),
            // Bottom section (mirrored)
            (7, 2), (7, 3), (7, 4), (7, 8), (7, 9), (7, 10),
            (8, 0), (8, 5), (8, 7), (8, 12),
            (9, 0), (9, 5), (9, 7), (9, 12),
            (10, 0), (10, 5), (10, 7), (10, 12),
            (12, 2), (12, 3), (12, 4), (12, 8), (12, 9), (12, 10),
        ],
    },
    Pattern {
        name: "R-pentomino",
        cells: &[(1, 1), (1, 2), (0, 2), (2, 1), (2, 0)],
    },
    Pattern {
        name: "Gosper Glider Gun",
        cells: &[
            (4, 0), (4, 1), (5, 0), (5, 1),
            (4, 10), (5, 10), (6, 10), (3, 11), (7, 11), (2, 12), (8, 12),
            (2, 13), (8, 13), (5, 14), (3, 15), (7, 15), (4, 16), (5, 16),
            (6, 16), (5, 17), (2, 20), (3, 20), (4, 20), (2, 21), (3, 21),
            (4, 21), (1, 22), (5, 22), (0, 24), (1, 24), (5, 24), (6, 24),
            (2, 34), (3, 34), (2, 35), (3, 35),
        ],
    },
];

/// Looks a pattern up by name or slug, ignoring case.
pub fn find(name: &str) -> Result<&'static Pattern, ConfigError> {
    let wanted = name.trim().to_lowercase().replace(' ', "-");
    PATTERNS
        .iter()
        .find(|p| p.slug() == wanted)
        .ok_or_else(|| ConfigError::UnknownPattern(name.to_string()))
}

/// Sets the pattern's cells alive with its corner at `origin`, wrapping
/// around the torus.
pub fn place(grid: &mut Grid, pattern: &Pattern, origin: (usize, usize)) {
    let side = grid.side();
    if side == 0 {
        return;
    }
    let (r0, c0) = origin;
    for &(row, col) in pattern.cells {
        grid.set((r0 + row) % side, (c0 + col) % side, ALIVE);
    }
}

/// An otherwise empty grid with `pattern` in the middle.
pub fn apply_pattern(side: usize, pattern: &Pattern) -> Grid {
    let mut grid = Grid::new(side);
    let (rows, cols) = pattern.extent();
    let origin = (side.saturating_sub(rows) / 2, side.saturating_sub(cols) / 2);
    place(&mut grid, pattern, origin);
    grid
}

/// Every cell independently alive with probability `density`.
pub fn random_grid(side: usize, seed: u64, density: f64) -> Grid {
    let mut rng = StdRng::seed_from_u64(seed);
    let density = density.clamp(0.0, 1.0);
    let mut grid = Grid::new(side);
    for cell in grid.as_mut_slice() {
        *cell = if rng.gen_bool(density) { ALIVE } else { DEAD };
    }
    grid
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_accepts_names_and_slugs() {
        assert_eq!(find("glider").unwrap().name, "Glider");
        assert_eq!(find("Gosper Glider Gun").unwrap().name, "Gosper Glider Gun");
        assert_eq!(find("gosper-glider-gun").unwrap().cells.len(), 36);
        assert_eq!(
            find("spaceship").err(),
            Some(ConfigError::UnknownPattern("spaceship".into()))
        );
    }

    #[test]
    fn patterns_are_normalised() {
        for pattern in PATTERNS {
            assert!(pattern.cells.iter().any(|&(r, _)| r == 0), "{}", pattern.name);
            assert!(pattern.cells.iter().any(|&(_, c)| c == 0), "{}", pattern.name);
        }
        assert_eq!(find("pulsar").unwrap().extent(), (13, 13));
    }

    #[test]
    fn placement_wraps() {
        let mut grid = Grid::new(4);
        place(&mut grid, find("blinker").unwrap(), (3, 3));
        assert_eq!(grid.get(3, 3), ALIVE);
        assert_eq!(grid.get(3, 0), ALIVE);
        assert_eq!(grid.get(3, 1), ALIVE);
    }

    #[test]
    fn empty_grid_takes_no_pattern() {
        let mut grid = Grid::new(0);
        place(&mut grid, find("glider").unwrap(), (0, 0));
        assert_eq!(grid.live_count(), 0);
        assert_eq!(apply_pattern(0, find("gosper-glider-gun").unwrap()).side(), 0);
    }

    #[test]
    fn centred_pattern_keeps_its_cell_count() {
        let grid = apply_pattern(20, find("r-pentomino").unwrap());
        assert_eq!(grid.live_count(), 5);
        assert_eq!(grid.get(9, 10), ALIVE);
    }

    #[test]
    fn random_fill_is_reproducible() {
        let a = random_grid(16, 7, 0.5);
        assert_eq!(a, random_grid(16, 7, 0.5));
        assert!(a.as_slice().iter().all(|&c| c == DEAD || c == ALIVE));
        assert!(random_grid(16, 7, 0.0).is_extinct());
        assert_eq!(random_grid(16, 7, 1.0).live_count(), 256);
    }
}
