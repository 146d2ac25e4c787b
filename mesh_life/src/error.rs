// error.rs - Error types for the distributed Game of Life

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Malformed run configuration. Always fatal, always raised before any
/// generation executes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("process count must be at least 1")]
    NoProcesses,

    #[error("process count {0} is not a perfect square (1, 4, 9, 16, ...)")]
    NotPerfectSquare(usize),

    #[error("grid size must be at least 1")]
    EmptyGrid,

    #[error("grid size {grid} is not divisible by the mesh side {mesh_side}")]
    NotDivisible { grid: usize, mesh_side: usize },

    #[error("block side {block} is smaller than the minimum of {min} cells")]
    BlockTooSmall { block: usize, min: usize },

    #[error("grid of side {side} expects {expected} cells, got {actual}")]
    CellCount { side: usize, expected: usize, actual: usize },

    #[error("grid file {path:?} is {actual} bytes, expected {expected} for a {side}x{side} grid")]
    FileSize { path: PathBuf, side: usize, expected: u64, actual: u64 },

    #[error("grid file {path:?}: unexpected byte {found:?} at row {row}, column {col}")]
    BadToken { path: PathBuf, row: usize, col: usize, found: char },

    #[error("line {line}: {reason}")]
    BadCoordinate { line: usize, reason: String },

    #[error("unknown pattern {0:?}")]
    UnknownPattern(String),
}

/// Failures of the message-passing layer. Transfers are assumed reliable, so
/// any of these ends the whole run.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommError {
    #[error("rank {peer} is no longer reachable")]
    Disconnected { peer: usize },

    #[error("rank {peer} is outside a world of {size} ranks")]
    NoSuchRank { peer: usize, size: usize },

    #[error("protocol violation: {0}")]
    Protocol(String),
}

/// Top-level error.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Comm(#[from] CommError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("failed to build the interior thread pool")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("rank task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
