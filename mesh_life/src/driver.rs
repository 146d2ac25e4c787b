// driver.rs - Generation loop and the runner that hosts one task per rank

use std::path::PathBuf;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{Instrument, debug, info, info_span};

use crate::comm::{self, Comm, Tag};
use crate::decompose::Decomposition;
use crate::error::{CommError, ConfigError, Result};
use crate::evolve::{Diagnostics, Evolver};
use crate::grid::Grid;
use crate::halo::begin_exchange;
use crate::termination::{self, TerminationPolicy, Verdict};
use crate::text_io;
use crate::topology::Topology;

/// Everything a run needs besides its initial state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunConfig {
    /// N, the side of the global grid.
    pub grid_side: usize,
    /// Number of generation states, the initial one included. A run performs
    /// `generations - 1` updates.
    pub generations: usize,
    /// P, a perfect square.
    pub processes: usize,
    pub termination: TerminationPolicy,
    /// Interior worker threads per rank; 1 means sequential.
    pub threads: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            grid_side: 8,
            generations: 3,
            processes: 4,
            termination: TerminationPolicy::default(),
            threads: 1,
        }
    }
}

/// Initial state of a run.
#[derive(Clone, Debug)]
pub enum Seed {
    /// A global grid held by the coordinator and scattered to every rank.
    Grid(Grid),
    /// A dense grid file each rank reads its own block from.
    GridFile(PathBuf),
}

/// The gathered grid at one generation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    pub generation: usize,
    pub grid: Grid,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    /// Every cell died; detected by the check at `generation`.
    Extinct { generation: usize },
    /// Nothing changed; detected by the check at `generation`.
    Stasis { generation: usize },
}

impl Outcome {
    pub fn is_early(&self) -> bool {
        !matches!(self, Outcome::Completed)
    }
}

/// Wall-clock run time across ranks.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Timing {
    pub max: Duration,
    pub min: Duration,
    pub mean: Duration,
}

#[derive(Clone, Debug)]
pub struct RunReport {
    /// The final global grid.
    pub grid: Grid,
    pub outcome: Outcome,
    /// Updates actually performed.
    pub evolutions: usize,
    pub timing: Timing,
}

enum Start {
    Scatter(Option<Grid>),
    File(PathBuf),
}

/// A validated run configuration, ready to execute.
#[derive(Clone, Debug)]
pub struct Simulation {
    config: RunConfig,
    decomposition: Decomposition,
}

impl Simulation {
    pub fn new(config: RunConfig) -> Result<Self, ConfigError> {
        let decomposition = Decomposition::new(config.grid_side, config.processes)?;
        Ok(Self { config, decomposition })
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn decomposition(&self) -> &Decomposition {
        &self.decomposition
    }

    /// Runs every rank to completion or to a collective early stop. With
    /// `frames`, every generation is gathered and sent there.
    pub async fn run(&self, seed: Seed, frames: Option<mpsc::Sender<Frame>>) -> Result<RunReport> {
        let d = self.decomposition;
        let starts: Vec<Start> = match seed {
            Seed::Grid(grid) => {
                if grid.side() != d.grid_side() {
                    return Err(ConfigError::CellCount {
                        side: d.grid_side(),
                        expected: d.grid_side() * d.grid_side(),
                        actual: grid.side() * grid.side(),
                    }
                    .into());
                }
                let mut starts: Vec<Start> = (0..d.processes()).map(|_| Start::Scatter(None)).collect();
                starts[comm::ROOT] = Start::Scatter(Some(grid));
                starts
            }
            Seed::GridFile(path) => {
                text_io::validate_grid_file(&path, d.grid_side()).await?;
                (0..d.processes()).map(|_| Start::File(path.clone())).collect()
            }
        };

        info!(
            grid = d.grid_side(),
            processes = d.processes(),
            block = d.block_side(),
            generations = self.config.generations,
            "starting run"
        );

        let emit_frames = frames.is_some();
        let mut frames = frames;
        let mut ranks = JoinSet::new();
        for (comm, start) in comm::world(d.processes()).into_iter().zip(starts) {
            let rank = comm.rank();
            let rank_loop = RankLoop {
                comm,
                topo: d.mesh().topology(rank),
                decomposition: d,
                config: self.config.clone(),
                emit_frames,
                frames: if rank == comm::ROOT { frames.take() } else { None },
            };
            ranks.spawn(rank_loop.run(start).instrument(info_span!("rank", rank)));
        }

        let mut report = None;
        while let Some(joined) = ranks.join_next().await {
            match joined {
                Ok(Ok(Some(root))) => report = Some(root),
                Ok(Ok(None)) => {}
                Ok(Err(err)) => {
                    ranks.abort_all();
                    return Err(err);
                }
                Err(err) => {
                    ranks.abort_all();
                    return Err(err.into());
                }
            }
        }
        let report: RunReport =
            report.ok_or_else(|| CommError::Protocol("coordinator returned no report".into()))?;
        info!(outcome = ?report.outcome, evolutions = report.evolutions, timing = ?report.timing, "run finished");
        Ok(report)
    }
}

/// State of one rank for the whole run.
struct RankLoop {
    comm: Comm,
    topo: Topology,
    decomposition: Decomposition,
    config: RunConfig,
    emit_frames: bool,
    frames: Option<mpsc::Sender<Frame>>,
}

impl RankLoop {
    async fn run(mut self, start: Start) -> Result<Option<RunReport>> {
        let d = self.decomposition;
        self.comm.barrier().await;
        let started = Instant::now();

        let evolver = Evolver::with_threads(self.config.threads)?;
        let mut active = match start {
            Start::Scatter(global) => d.scatter(&mut self.comm, global.as_ref()).await?,
            Start::File(path) => text_io::read_block(&path, &d, self.comm.rank()).await?,
        };
        let mut next = Grid::new(d.block_side());
        let mut outcome = Outcome::Completed;
        let mut evolutions = 0;

        for generation in 0..self.config.generations {
            if self.emit_frames {
                if let Some(grid) = d.gather(&mut self.comm, &active).await? {
                    self.emit(Frame { generation, grid }).await;
                }
            }
            if generation + 1 == self.config.generations {
                break;
            }

            let pending = begin_exchange(&self.comm, &self.topo, &active);
            let mut diag = Diagnostics::default();
            evolver.interior(&active, &mut next, &mut diag);
            let halo = pending.complete(&mut self.comm).await?;
            evolver.boundary(&active, &halo, &mut next, &mut diag);
            debug!(generation, ?diag, "generation evolved");

            std::mem::swap(&mut active, &mut next);
            evolutions += 1;

            if self.config.termination.is_due(generation) {
                match termination::check(&mut self.comm, generation, &diag).await? {
                    Verdict::Continue => {}
                    Verdict::Extinct => {
                        outcome = Outcome::Extinct { generation };
                        break;
                    }
                    Verdict::Stasis => {
                        outcome = Outcome::Stasis { generation };
                        break;
                    }
                }
            }
        }

        let gathered = d.gather(&mut self.comm, &active).await?;
        let elapsed = started.elapsed();
        let times = self
            .comm
            .gather_root(Tag::Report, elapsed.as_secs_f64().to_le_bytes().to_vec())
            .await?;

        let (Some(grid), Some(times)) = (gathered, times) else {
            return Ok(None);
        };
        if outcome.is_early() && self.emit_frames {
            self.emit(Frame { generation: evolutions, grid: grid.clone() }).await;
        }
        Ok(Some(RunReport { grid, outcome, evolutions, timing: timing_from(&times)? }))
    }

    async fn emit(&mut self, frame: Frame) {
        if let Some(tx) = &self.frames {
            if tx.send(frame).await.is_err() {
                debug!("frame receiver closed");
                self.frames = None;
            }
        }
    }
}

fn timing_from(parts: &[Vec<u8>]) -> Result<Timing> {
    let mut secs = Vec::with_capacity(parts.len());
    for part in parts {
        let bytes: [u8; 8] = part
            .as_slice()
            .try_into()
            .map_err(|_| CommError::Protocol(format!("timing payload of {} bytes", part.len())))?;
        secs.push(f64::from_le_bytes(bytes));
    }
    let max = secs.iter().copied().fold(0.0, f64::max);
    let min = secs.iter().copied().fold(f64::INFINITY, f64::min);
    let mean = secs.iter().sum::<f64>() / secs.len().max(1) as f64;
    Ok(Timing {
        max: Duration::from_secs_f64(max),
        min: Duration::from_secs_f64(if min.is_finite() { min } else { 0.0 }),
        mean: Duration::from_secs_f64(mean),
    })
}
