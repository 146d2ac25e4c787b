//! Conway's Game of Life on a torus, split across a square mesh of ranks.
//!
//! Each rank owns one square block of the global grid, trades edge rows,
//! columns and corner cells with its eight neighbors every generation, and
//! updates its interior while that exchange is still in flight.

pub mod comm;
pub mod config;
pub mod decompose;
pub mod display;
pub mod driver;
pub mod error;
pub mod evolve;
pub mod grid;
pub mod halo;
pub mod patterns;
pub mod termination;
pub mod text_io;
pub mod topology;

pub use driver::{Frame, Outcome, RunConfig, RunReport, Seed, Simulation, Timing};
pub use error::{CommError, ConfigError, Error, Result};
pub use grid::{ALIVE, Cell, DEAD, Grid};
pub use termination::TerminationPolicy;
