// text_io.rs - Coordinate lists and dense grid files
//
// Dense grid files hold one row per line, cells written as `0`/`1` and
// separated by single spaces. Every cell therefore takes exactly two bytes,
// which is what lets each rank seek straight to its own block.

use std::io::SeekFrom;
use std::path::Path;

use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::debug;

use crate::decompose::Decomposition;
use crate::error::{ConfigError, Result};
use crate::grid::{ALIVE, DEAD, Grid};

/// Bytes per cell in a dense grid file: the digit and its separator.
pub const RECORD_WIDTH: u64 = 2;

/// Parses `row col` pairs, one per line, marking those cells alive.
pub fn parse_coordinates(text: &str, side: usize) -> Result<Grid, ConfigError> {
    let mut grid = Grid::new(side);
    for (index, line) in text.lines().enumerate() {
        let line_no = index + 1;
        let mut fields = line.split_whitespace();
        let Some(first) = fields.next() else {
            continue;
        };
        let bad = |reason: String| ConfigError::BadCoordinate { line: line_no, reason };
        let second = fields.next().ok_or_else(|| bad("expected `row col`".into()))?;
        let row: usize = first.parse().map_err(|_| bad(format!("bad row {first:?}")))?;
        let col: usize = second.parse().map_err(|_| bad(format!("bad column {second:?}")))?;
        if row >= side || col >= side {
            return Err(bad(format!("({row}, {col}) is outside a {side}x{side} grid")));
        }
        grid.set(row, col, ALIVE);
    }
    Ok(grid)
}

pub async fn load_coordinates(path: &Path, side: usize) -> Result<Grid> {
    let text = tokio::fs::read_to_string(path).await?;
    Ok(parse_coordinates(&text, side)?)
}

/// Dense text form of `grid`.
pub fn encode_grid(grid: &Grid) -> String {
    let mut out = String::with_capacity(grid.side() * grid.side() * RECORD_WIDTH as usize);
    for row in grid.rows() {
        for (col, &cell) in row.iter().enumerate() {
            out.push(if cell == DEAD { '0' } else { '1' });
            out.push(if col + 1 == row.len() { '\n' } else { ' ' });
        }
    }
    out
}

pub async fn write_grid_file(path: &Path, grid: &Grid) -> Result<()> {
    tokio::fs::write(path, encode_grid(grid)).await?;
    debug!(?path, side = grid.side(), "grid file written");
    Ok(())
}

/// Rejects files whose length does not match a `side x side` grid.
pub async fn validate_grid_file(path: &Path, side: usize) -> Result<()> {
    let actual = tokio::fs::metadata(path).await?.len();
    let expected = (side * side) as u64 * RECORD_WIDTH;
    if actual != expected {
        return Err(ConfigError::FileSize { path: path.to_path_buf(), side, expected, actual }.into());
    }
    Ok(())
}

/// Byte offset of the first cell of `rank`'s block.
pub fn block_offset(d: &Decomposition, rank: usize) -> u64 {
    let (block_row, block_col) = d.mesh().coords(rank);
    let s = d.block_side() as u64;
    let n = d.grid_side() as u64;
    block_row as u64 * s * n * RECORD_WIDTH + block_col as u64 * s * RECORD_WIDTH
}

/// Reads only `rank`'s block, one seek per block row.
pub async fn read_block(path: &Path, d: &Decomposition, rank: usize) -> Result<Grid> {
    let side = d.block_side();
    let n = d.grid_side();
    let start = block_offset(d, rank);
    let (row0, col0) = d.block_origin(rank);

    let mut file = File::open(path).await?;
    let mut line = vec![0u8; side * RECORD_WIDTH as usize];
    let mut block = Grid::new(side);
    for i in 0..side {
        file.seek(SeekFrom::Start(start + i as u64 * n as u64 * RECORD_WIDTH)).await?;
        file.read_exact(&mut line).await?;
        for (j, record) in line.chunks_exact(RECORD_WIDTH as usize).enumerate() {
            let (row, col) = (row0 + i, col0 + j);
            let bad = |found: u8| ConfigError::BadToken {
                path: path.to_path_buf(),
                row,
                col,
                found: found as char,
            };
            let cell = match record[0] {
                b'0' => DEAD,
                b'1' => ALIVE,
                other => return Err(bad(other).into()),
            };
            let separator = if col + 1 == n { b'\n' } else { b' ' };
            if record[1] != separator {
                return Err(bad(record[1]).into());
            }
            block.set(i, j, cell);
        }
    }
    debug!(rank, offset = start, "block read from grid file");
    Ok(block)
}
