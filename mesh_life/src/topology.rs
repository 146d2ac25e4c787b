// topology.rs - Periodic 2D process mesh and neighbor discovery

use crate::error::ConfigError;

/// The eight compass directions of a Moore neighborhood, in the order the
/// mesh offsets are listed: clockwise starting at up-left.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    UpLeft,
    Up,
    UpRight,
    Right,
    DownRight,
    Down,
    DownLeft,
    Left,
}

impl Direction {
    pub const ALL: [Direction; 8] = [
        Direction::UpLeft,
        Direction::Up,
        Direction::UpRight,
        Direction::Right,
        Direction::DownRight,
        Direction::Down,
        Direction::DownLeft,
        Direction::Left,
    ];

    /// `(d_row, d_col)` step toward this direction.
    pub const fn offset(self) -> (isize, isize) {
        match self {
            Direction::UpLeft    => (-1, -1),
            Direction::Up        => (-1,  0),
            Direction::UpRight   => (-1,  1),
            Direction::Right     => ( 0,  1),
            Direction::DownRight => ( 1,  1),
            Direction::Down      => ( 1,  0),
            Direction::DownLeft  => ( 1, -1),
            Direction::Left      => ( 0, -1),
        }
    }

    pub const fn opposite(self) -> Direction {
        match self {
            Direction::UpLeft    => Direction::DownRight,
            Direction::Up        => Direction::Down,
            Direction::UpRight   => Direction::DownLeft,
            Direction::Right     => Direction::Left,
            Direction::DownRight => Direction::UpLeft,
            Direction::Down      => Direction::Up,
            Direction::DownLeft  => Direction::UpRight,
            Direction::Left      => Direction::Right,
        }
    }

    /// Corner directions exchange a single cell, edges a full row or column.
    pub const fn is_corner(self) -> bool {
        let (dr, dc) = self.offset();
        dr != 0 && dc != 0
    }

    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Integer square root (Newton iteration).
pub fn isqrt(n: usize) -> usize {
    if n < 2 {
        return n;
    }
    let mut x = n;
    let mut y = x.div_ceil(2);
    while y < x {
        x = y;
        y = (x + n / x) / 2;
    }
    x
}

/// Side length of a square mesh of ranks, validated from the process count.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Mesh {
    side: usize,
}

impl Mesh {
    pub fn new(processes: usize) -> Result<Self, ConfigError> {
        if processes == 0 {
            return Err(ConfigError::NoProcesses);
        }
        let side = isqrt(processes);
        if side * side != processes {
            return Err(ConfigError::NotPerfectSquare(processes));
        }
        Ok(Self { side })
    }

    pub fn side(&self) -> usize {
        self.side
    }

    pub fn size(&self) -> usize {
        self.side * self.side
    }

    pub fn coords(&self, rank: usize) -> (usize, usize) {
        (rank / self.side, rank % self.side)
    }

    /// Rank at `(row, col)` after wrapping both coordinates onto the torus.
    pub fn rank_at(&self, row: isize, col: isize) -> usize {
        let side = self.side as isize;
        (row.rem_euclid(side) * side + col.rem_euclid(side)) as usize
    }

    pub fn topology(&self, rank: usize) -> Topology {
        let (row, col) = self.coords(rank);
        let neighbors = Direction::ALL.map(|dir| {
            let (dr, dc) = dir.offset();
            self.rank_at(row as isize + dr, col as isize + dc)
        });
        Topology { rank, coords: (row, col), neighbors }
    }
}

/// One rank's fixed place in the mesh.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Topology {
    rank: usize,
    coords: (usize, usize),
    neighbors: [usize; 8],
}

impl Topology {
    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn coords(&self) -> (usize, usize) {
        self.coords
    }

    pub fn neighbor(&self, dir: Direction) -> usize {
        self.neighbors[dir.index()]
    }
}
