// display.rs - Console rendering of a gathered grid

use std::fmt::Write;

use crate::grid::{ALIVE, Cell, DEAD, Grid};

pub const BANNER: &str = "///////////////////////////////////////////////////";

/// `-` for dead, `X` for alive, `?` for anything else (a corrupted cell).
pub fn glyph(cell: Cell) -> char {
    match cell {
        DEAD  => '-',
        ALIVE => 'X',
        _     => '?',
    }
}

pub fn render(grid: &Grid) -> String {
    let mut out = String::with_capacity((grid.side() + 1) * grid.side() + BANNER.len() + 3);
    let _ = writeln!(out, "\n{BANNER}\n");
    for row in grid.rows() {
        out.extend(row.iter().map(|&c| glyph(c)));
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glyphs() {
        let grid = Grid::from_rows(&[[0u8, 1], [7, 0]]).unwrap();
        let text = render(&grid);
        assert!(text.starts_with('\n'));
        assert!(text.ends_with("-X\n?-\n"));
    }
}
