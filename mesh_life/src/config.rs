// config.rs - Command line surface for the `mesh_life` binary

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::driver::{RunConfig, Seed};
use crate::error::Result;
use crate::grid::Grid;
use crate::patterns;
use crate::termination::{DEFAULT_CADENCE, TerminationPolicy};
use crate::text_io;

#[derive(Parser, Debug)]
#[command(name = "mesh_life")]
#[command(about = "Conway's Game of Life on a torus, split across a square mesh of ranks", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Evolve a grid and print the result
    Run(RunArgs),
    /// Write a dense grid file that `run --grid-file` can read in parallel
    CreateFile(CreateFileArgs),
}

/// What to print while running.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum Output {
    /// Only the timing summary
    #[value(name = "none")]
    Quiet,
    /// The gathered grid after the last generation
    Final,
    /// The gathered grid at every generation
    Every,
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Side of the global grid
    #[arg(short = 'n', long = "size", default_value_t = 8, value_parser = parse_positive)]
    pub size: usize,

    /// Number of generation states, the initial one included
    #[arg(short, long, default_value_t = 3)]
    pub generations: usize,

    /// Number of ranks; must be a perfect square
    #[arg(short, long, default_value_t = 4)]
    pub processes: usize,

    /// Coordinate file, one `row col` pair of a live cell per line
    #[arg(short, long, conflicts_with_all = ["grid_file", "pattern", "random"])]
    pub input: Option<PathBuf>,

    /// Dense grid file; every rank reads only its own block
    #[arg(long, conflicts_with_all = ["pattern", "random"])]
    pub grid_file: Option<PathBuf>,

    /// Named pattern placed in the middle of an empty grid
    #[arg(long, conflicts_with = "random")]
    pub pattern: Option<String>,

    /// Fill the grid at random
    #[arg(long)]
    pub random: bool,

    /// Seed for `--random`; drawn fresh when absent
    #[arg(long)]
    pub seed: Option<u64>,

    /// Probability of a cell starting alive under `--random`
    #[arg(long, default_value_t = 0.5, value_parser = parse_density)]
    pub density: f64,

    /// What to print
    #[arg(short, long, value_enum, default_value_t = Output::Final)]
    pub output: Output,

    /// Stop early on extinction or stasis
    #[arg(short = 'd', long)]
    pub terminate: bool,

    /// Generations between termination checks
    #[arg(long, default_value_t = DEFAULT_CADENCE, value_parser = parse_positive)]
    pub check_every: usize,

    /// Interior worker threads per rank
    #[arg(short, long, default_value_t = 1, value_parser = parse_positive)]
    pub threads: usize,
}

impl RunArgs {
    pub fn run_config(&self) -> RunConfig {
        RunConfig {
            grid_side: self.size,
            generations: self.generations,
            processes: self.processes,
            termination: TerminationPolicy { enabled: self.terminate, cadence: self.check_every },
            threads: self.threads,
        }
    }

    /// Resolves the initial state. An empty grid unless a source is given.
    pub async fn seed(&self) -> Result<Seed> {
        if let Some(path) = &self.grid_file {
            return Ok(Seed::GridFile(path.clone()));
        }
        let grid = if let Some(path) = &self.input {
            text_io::load_coordinates(path, self.size).await?
        } else if let Some(name) = &self.pattern {
            patterns::apply_pattern(self.size, patterns::find(name)?)
        } else if self.random {
            patterns::random_grid(self.size, self.seed.unwrap_or_else(rand::random), self.density)
        } else {
            Grid::new(self.size)
        };
        Ok(Seed::Grid(grid))
    }
}

#[derive(Args, Debug, Clone)]
pub struct CreateFileArgs {
    /// Where to write the file
    pub path: PathBuf,

    /// Side of the grid
    #[arg(short = 'n', long = "size", default_value_t = 8, value_parser = parse_positive)]
    pub size: usize,

    /// Named pattern instead of a random fill
    #[arg(long)]
    pub pattern: Option<String>,

    #[arg(long)]
    pub seed: Option<u64>,

    #[arg(long, default_value_t = 0.5, value_parser = parse_density)]
    pub density: f64,
}

impl CreateFileArgs {
    pub fn grid(&self) -> Result<Grid> {
        Ok(match &self.pattern {
            Some(name) => patterns::apply_pattern(self.size, patterns::find(name)?),
            None => patterns::random_grid(self.size, self.seed.unwrap_or_else(rand::random), self.density),
        })
    }
}

fn parse_density(s: &str) -> std::result::Result<f64, String> {
    let density: f64 = s.parse().map_err(|e| format!("{e}"))?;
    if (0.0..=1.0).contains(&density) {
        Ok(density)
    } else {
        Err(format!("density {density} is outside [0, 1]"))
    }
}

fn parse_positive(s: &str) -> std::result::Result<usize, String> {
    match s.parse::<usize>() {
        Ok(0) => Err("must be at least 1".into()),
        Ok(n) => Ok(n),
        Err(e) => Err(format!("{e}")),
    }
}
