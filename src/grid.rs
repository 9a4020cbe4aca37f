//! Grid & agent model: cell/passability lookup and 4-connected
//! Manhattan moves plus Wait.

use std::fs::File;
use std::io::{self, BufRead, BufReader};

use crate::model::Cell;

/// Grid, `rows` x `cols`. `blocks[r][c] == true` means impassable.
/// Solve requests always carry a square `N`x`N` matrix, but nothing
/// here depends on that — `size` is the row count, kept as the
/// square-case convenience accessor the rest of the crate uses.
#[derive(Debug, Clone)]
pub struct Grid {
    pub size: usize,
    cols: usize,
    blocks: Vec<Vec<bool>>,
}

impl Grid {
    /// Build a grid from a passability matrix, `true` meaning blocked, as
    /// carried by the solve request (`blocks: N×N bool matrix`).
    pub fn from_blocks(blocks: Vec<Vec<bool>>) -> Self {
        let size = blocks.len();
        let cols = blocks.first().map_or(0, Vec::len);
        Grid { size, cols, blocks }
    }

    pub fn in_bounds(&self, cell: Cell) -> bool {
        cell.0 < self.size && cell.1 < self.cols
    }

    pub fn is_passable(&self, cell: Cell) -> bool {
        self.in_bounds(cell) && !self.blocks[cell.0][cell.1]
    }

    /// The 5 actions (N, S, E, W, Wait) from `cell`, filtered to in-bounds,
    /// passable destinations.
    pub fn successors(&self, cell: Cell) -> Vec<Cell> {
        let (r, c) = cell;
        let candidates = [
            (r.wrapping_sub(1), c),
            (r + 1, c),
            (r, c.wrapping_sub(1)),
            (r, c + 1),
            (r, c),
        ];

        candidates
            .into_iter()
            .filter(|&cell| self.is_passable(cell))
            .collect()
    }

    /// Manhattan distance, the heuristic used by space-time A*: a
    /// consistent, admissible lower bound on an unconstrained grid.
    pub fn heuristic(&self, from: Cell, to: Cell) -> usize {
        (from.0 as isize - to.0 as isize).unsigned_abs()
            + (from.1 as isize - to.1 as isize).unsigned_abs()
    }

    /// Load a MovingAI-style `.map` text file for CLI convenience. Not part
    /// of the scenario-generation surface (out of scope) — just an
    /// alternate way to hand the façade a `blocks` matrix.
    pub fn from_moving_ai_file(path: &str) -> io::Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let mut lines = reader.lines();

        let _type = lines.next().transpose()?;
        let height = lines
            .next()
            .transpose()?
            .and_then(|l| l.split_whitespace().last().map(str::to_owned))
            .and_then(|s| s.parse::<usize>().ok())
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "missing height"))?;
        let width = lines
            .next()
            .transpose()?
            .and_then(|l| l.split_whitespace().last().map(str::to_owned))
            .and_then(|s| s.parse::<usize>().ok())
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "missing width"))?;
        let _map = lines.next().transpose()?;

        if height != width {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "grid must be square",
            ));
        }

        let mut blocks = Vec::with_capacity(height);
        for line in lines.take(height) {
            let row: Vec<bool> = line?.chars().map(|ch| ch != '.').collect();
            blocks.push(row);
        }

        Ok(Grid::from_blocks(blocks))
    }
}
