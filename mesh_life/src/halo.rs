// halo.rs - Boundary exchange between neighboring blocks

use tracing::trace;

use crate::comm::{Comm, RecvRequest, SendRequest, Tag};
use crate::error::CommError;
use crate::grid::{Cell, Grid};
use crate::topology::{Direction, Topology};

/// The cells a block sends toward `toward`: its edge row or column on that
/// side, or its single corner cell.
pub fn outbound(block: &Grid, toward: Direction) -> Vec<Cell> {
    let last = block.side() - 1;
    match toward {
        Direction::Up        => block.row(0).to_vec(),
        Direction::Down      => block.row(last).to_vec(),
        Direction::Left      => block.column(0),
        Direction::Right     => block.column(last),
        Direction::UpLeft    => vec![block.get(0, 0)],
        Direction::UpRight   => vec![block.get(0, last)],
        Direction::DownRight => vec![block.get(last, last)],
        Direction::DownLeft  => vec![block.get(last, 0)],
    }
}

/// The eight borrowed buffers of one generation, indexed by the side of the
/// block they border.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Halo {
    side: usize,
    buffers: [Vec<Cell>; 8],
}

impl Halo {
    /// Checks that edges hold `side` cells and corners hold one.
    pub fn from_buffers(side: usize, buffers: [Vec<Cell>; 8]) -> Result<Self, CommError> {
        for dir in Direction::ALL {
            let expected = if dir.is_corner() { 1 } else { side };
            let got = buffers[dir.index()].len();
            if got != expected {
                return Err(CommError::Protocol(format!(
                    "{dir:?} halo holds {got} cells, expected {expected}"
                )));
            }
        }
        Ok(Self { side, buffers })
    }

    /// Halo of a block that is the whole torus: every neighbor is itself.
    pub fn periodic(block: &Grid) -> Self {
        Self {
            side: block.side(),
            buffers: Direction::ALL.map(|dir| outbound(block, dir.opposite())),
        }
    }

    pub fn buffer(&self, dir: Direction) -> &[Cell] {
        &self.buffers[dir.index()]
    }

    /// State of the cell at block-relative `(row, col)`, which may lie one
    /// step outside the block.
    pub fn cell(&self, block: &Grid, row: isize, col: isize) -> Cell {
        match locate(self.side, row, col) {
            Source::Local(r, c) => block.get(r, c),
            Source::Halo(dir, i) => self.buffers[dir.index()][i],
        }
    }
}

/// Where a neighbor lives relative to a block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Source {
    Local(usize, usize),
    /// Buffer and position inside it.
    Halo(Direction, usize),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Band {
    Before,
    Inside(usize),
    After,
}

fn band(i: isize, side: usize) -> Band {
    if i < 0 {
        Band::Before
    } else if i as usize >= side {
        Band::After
    } else {
        Band::Inside(i as usize)
    }
}

/// Picks the buffer that covers block-relative `(row, col)`. Each coordinate
/// is classified as before, inside or after the block; the pair of bands
/// names exactly one source.
pub fn locate(side: usize, row: isize, col: isize) -> Source {
    use Band::*;
    match (band(row, side), band(col, side)) {
        (Inside(r), Inside(c)) => Source::Local(r, c),
        (Before,    Inside(c)) => Source::Halo(Direction::Up, c),
        (After,     Inside(c)) => Source::Halo(Direction::Down, c),
        (Inside(r), Before)    => Source::Halo(Direction::Left, r),
        (Inside(r), After)     => Source::Halo(Direction::Right, r),
        (Before,    Before)    => Source::Halo(Direction::UpLeft, 0),
        (Before,    After)     => Source::Halo(Direction::UpRight, 0),
        (After,     After)     => Source::Halo(Direction::DownRight, 0),
        (After,     Before)    => Source::Halo(Direction::DownLeft, 0),
    }
}

/// Transfers started for one generation and not yet completed.
#[must_use = "a started exchange must be completed"]
pub struct PendingExchange {
    side: usize,
    sends: Vec<SendRequest>,
    recvs: [RecvRequest; 8],
}

/// Posts all eight receives and starts all eight sends without waiting.
pub fn begin_exchange(comm: &Comm, topo: &Topology, active: &Grid) -> PendingExchange {
    let recvs = Direction::ALL.map(|dir| comm.irecv(topo.neighbor(dir), Tag::Halo(dir)));
    let sends = Direction::ALL
        .iter()
        .map(|&dir| comm.isend(topo.neighbor(dir), Tag::Halo(dir.opposite()), outbound(active, dir)))
        .collect();
    trace!(rank = topo.rank(), "halo exchange started");
    PendingExchange { side: active.side(), sends, recvs }
}

impl PendingExchange {
    /// Waits for every transfer, then for every rank to reach the same point,
    /// so no rank starts the next exchange while a peer still reads this one.
    pub async fn complete(self, comm: &mut Comm) -> Result<Halo, CommError> {
        for send in self.sends {
            send.wait()?;
        }
        let payloads = comm.wait_all(&self.recvs).await?;
        comm.barrier().await;

        let mut payloads = payloads.into_iter();
        let buffers = Direction::ALL.map(|_| payloads.next().unwrap_or_default());
        Halo::from_buffers(self.side, buffers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comm::world;
    use crate::grid::ALIVE;
    use crate::topology::Mesh;

    fn numbered(side: usize) -> Grid {
        let cells = (0..side * side).map(|i| i as Cell).collect();
        Grid::from_cells(side, cells).unwrap()
    }

    #[test]
    fn outbound_slices() {
        let block = numbered(3);
        assert_eq!(outbound(&block, Direction::Up), vec![0, 1, 2]);
        assert_eq!(outbound(&block, Direction::Down), vec![6, 7, 8]);
        assert_eq!(outbound(&block, Direction::Left), vec![0, 3, 6]);
        assert_eq!(outbound(&block, Direction::Right), vec![2, 5, 8]);
        assert_eq!(outbound(&block, Direction::UpLeft), vec![0]);
        assert_eq!(outbound(&block, Direction::UpRight), vec![2]);
        assert_eq!(outbound(&block, Direction::DownRight), vec![8]);
        assert_eq!(outbound(&block, Direction::DownLeft), vec![6]);
    }

    #[test]
    fn locate_table() {
        let s = 4;
        assert_eq!(locate(s, 1, 2), Source::Local(1, 2));
        assert_eq!(locate(s, -1, 0), Source::Halo(Direction::Up, 0));
        assert_eq!(locate(s, -1, 3), Source::Halo(Direction::Up, 3));
        assert_eq!(locate(s, 4, 2), Source::Halo(Direction::Down, 2));
        assert_eq!(locate(s, 0, -1), Source::Halo(Direction::Left, 0));
        assert_eq!(locate(s, 3, 4), Source::Halo(Direction::Right, 3));
        assert_eq!(locate(s, -1, -1), Source::Halo(Direction::UpLeft, 0));
        assert_eq!(locate(s, -1, 4), Source::Halo(Direction::UpRight, 0));
        assert_eq!(locate(s, 4, 4), Source::Halo(Direction::DownRight, 0));
        assert_eq!(locate(s, 4, -1), Source::Halo(Direction::DownLeft, 0));
    }

    #[test]
    fn periodic_halo_matches_wrapped_reads() {
        let block = numbered(5);
        let halo = Halo::periodic(&block);
        for row in -1..=5isize {
            for col in -1..=5isize {
                assert_eq!(halo.cell(&block, row, col), block.get_wrapped(row, col), "({row}, {col})");
            }
        }
    }

    #[test]
    fn short_buffers_are_rejected() {
        let mut buffers = Direction::ALL.map(|d| vec![0; if d.is_corner() { 1 } else { 3 }]);
        assert!(Halo::from_buffers(3, buffers.clone()).is_ok());
        buffers[Direction::Left.index()].pop();
        assert!(Halo::from_buffers(3, buffers).is_err());
    }

    #[tokio::test]
    async fn exchange_on_a_four_rank_torus_matches_the_global_grid() {
        // 6x6 global grid split into four 3x3 blocks.
        let global = numbered(6);
        let mesh = Mesh::new(4).unwrap();
        let mut handles = Vec::new();
        for (rank, mut comm) in world(4).into_iter().enumerate() {
            let topo = mesh.topology(rank);
            let (r, c) = topo.coords();
            let block = global.extract((r * 3, c * 3), 3);
            handles.push(tokio::spawn(async move {
                let pending = begin_exchange(&comm, &topo, &block);
                let halo = pending.complete(&mut comm).await.unwrap();
                (topo, block, halo)
            }));
        }
        for handle in handles {
            let (topo, block, halo) = handle.await.unwrap();
            let (r, c) = topo.coords();
            for row in -1..=3isize {
                for col in -1..=3isize {
                    let expected = global.get_wrapped(r as isize * 3 + row, c as isize * 3 + col);
                    assert_eq!(halo.cell(&block, row, col), expected);
                }
            }
        }
    }

    #[tokio::test]
    async fn single_rank_exchanges_with_itself() {
        let mut comm = world(1).pop().unwrap();
        let topo = Mesh::new(1).unwrap().topology(0);
        let mut block = Grid::new(3);
        block.set(2, 2, ALIVE);
        let halo = begin_exchange(&comm, &topo, &block).complete(&mut comm).await.unwrap();
        assert_eq!(halo, Halo::periodic(&block));
        assert_eq!(halo.buffer(Direction::UpLeft), &[ALIVE]);
    }
}
