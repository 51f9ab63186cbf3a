use crate::model::direction::Direction;
use crate::model::spawn::{INITIAL_TILES, sample_spawn_value};
use core::fmt;
use rand::Rng;
use rand::seq::SliceRandom;

/// Side length of the square grid.
pub const BOARD_SIZE: usize = 4;

/// Total number of cells on the grid.
pub const CELL_COUNT: usize = BOARD_SIZE * BOARD_SIZE;

pub type Row = [u32; BOARD_SIZE];

/// Immutable game grid. Zero marks an empty cell, every other value is a
/// power of two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Board {
    cells: [Row; BOARD_SIZE],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardError {
    WrongLength { expected: usize, found: usize },
    InvalidTile { index: usize, value: u32 },
}

impl Board {
    pub const EMPTY: Board = Board {
        cells: [[0; BOARD_SIZE]; BOARD_SIZE],
    };

    pub const fn from_rows(cells: [Row; BOARD_SIZE]) -> Self {
        Self { cells }
    }

    /// Builds a board from `CELL_COUNT` row-major values.
    pub fn try_from_flat(values: &[u32]) -> Result<Self, BoardError> {
        if values.len() != CELL_COUNT {
            return Err(BoardError::WrongLength {
                expected: CELL_COUNT,
                found: values.len(),
            });
        }

        let mut cells = [[0; BOARD_SIZE]; BOARD_SIZE];
        for (index, &value) in values.iter().enumerate() {
            if value == 1 || (value != 0 && !value.is_power_of_two()) {
                return Err(BoardError::InvalidTile { index, value });
            }
            cells[index / BOARD_SIZE][index % BOARD_SIZE] = value;
        }
        Ok(Self { cells })
    }

    pub fn to_flat(&self) -> Vec<u32> {
        self.cells.iter().flatten().copied().collect()
    }

    pub fn rows(&self) -> &[Row; BOARD_SIZE] {
        &self.cells
    }

    pub fn get(&self, row: usize, col: usize) -> u32 {
        self.cells[row][col]
    }

    /// Returns a copy of the board with one cell replaced.
    pub fn with_tile(mut self, row: usize, col: usize, value: u32) -> Self {
        self.cells[row][col] = value;
        self
    }

    pub fn max_tile(&self) -> u32 {
        self.cells.iter().flatten().copied().max().unwrap_or(0)
    }

    pub fn tile_count(&self) -> usize {
        self.cells.iter().flatten().filter(|&&v| v != 0).count()
    }

    pub fn empty_count(&self) -> usize {
        CELL_COUNT - self.tile_count()
    }

    /// Zero-valued cells in row-major order.
    pub fn empty_cells(&self) -> Vec<(usize, usize)> {
        let mut cells = Vec::with_capacity(CELL_COUNT);
        for (r, row) in self.cells.iter().enumerate() {
            for (c, &value) in row.iter().enumerate() {
                if value == 0 {
                    cells.push((r, c));
                }
            }
        }
        cells
    }

    /// Slides every tile toward `direction`, merging equal neighbours once.
    pub fn apply_move(&self, direction: Direction) -> Board {
        let oriented = self.orient_left(direction);
        let mut merged = [[0; BOARD_SIZE]; BOARD_SIZE];
        for (target, row) in merged.iter_mut().zip(oriented.cells.iter()) {
            *target = merge_row_left(row);
        }
        Board::from_rows(merged).restore_from_left(direction)
    }

    /// True when no move can change the board.
    pub fn is_terminal(&self) -> bool {
        for r in 0..BOARD_SIZE {
            for c in 0..BOARD_SIZE {
                let value = self.cells[r][c];
                if value == 0 {
                    return false;
                }
                if c + 1 < BOARD_SIZE && self.cells[r][c + 1] == value {
                    return false;
                }
                if r + 1 < BOARD_SIZE && self.cells[r + 1][c] == value {
                    return false;
                }
            }
        }
        true
    }

    /// Moves that change the board, in [`Direction::ALL`] order.
    pub fn enumerate_moves(&self) -> Vec<(Direction, Board)> {
        Direction::ALL
            .iter()
            .filter_map(|&direction| {
                let next = self.apply_move(direction);
                (next != *self).then_some((direction, next))
            })
            .collect()
    }

    /// Places a 2 or a 4 on a uniformly chosen empty cell. Full boards are
    /// returned unchanged.
    pub fn spawn_random_tile<R: Rng + ?Sized>(&self, rng: &mut R) -> Board {
        let empty = self.empty_cells();
        let Some(&(row, col)) = empty.choose(rng) else {
            return *self;
        };
        let value = sample_spawn_value(rng);
        self.with_tile(row, col, value)
    }

    /// Empty board with the opening tiles placed.
    pub fn initialize<R: Rng + ?Sized>(rng: &mut R) -> Board {
        let mut board = Board::EMPTY;
        for _ in 0..INITIAL_TILES {
            board = board.spawn_random_tile(rng);
        }
        board
    }

    fn transpose(&self) -> Board {
        let mut cells = [[0; BOARD_SIZE]; BOARD_SIZE];
        for (r, row) in self.cells.iter().enumerate() {
            for (c, &value) in row.iter().enumerate() {
                cells[c][r] = value;
            }
        }
        Board { cells }
    }

    fn mirror(&self) -> Board {
        let mut cells = self.cells;
        for row in cells.iter_mut() {
            row.reverse();
        }
        Board { cells }
    }

    /// Reorients the grid so that `direction` points at the left edge.
    fn orient_left(&self, direction: Direction) -> Board {
        match direction {
            Direction::Left => *self,
            Direction::Right => self.mirror(),
            Direction::Up => self.transpose(),
            Direction::Down => self.transpose().mirror(),
        }
    }

    /// Inverse of [`Board::orient_left`].
    fn restore_from_left(&self, direction: Direction) -> Board {
        match direction {
            Direction::Left => *self,
            Direction::Right => self.mirror(),
            Direction::Up => self.transpose(),
            Direction::Down => self.mirror().transpose(),
        }
    }
}

/// Single left-merge pass over one row. A tile produced by a merge is never
/// merged again in the same pass.
pub fn merge_row_left(row: &Row) -> Row {
    let mut out = [0; BOARD_SIZE];
    let mut write = 0;
    let mut pending: Option<u32> = None;

    for &value in row.iter().filter(|&&v| v != 0) {
        match pending {
            Some(previous) if previous == value => {
                out[write] = previous * 2;
                write += 1;
                pending = None;
            }
            Some(previous) => {
                out[write] = previous;
                write += 1;
                pending = Some(value);
            }
            None => pending = Some(value),
        }
    }
    if let Some(previous) = pending {
        out[write] = previous;
    }
    out
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self.max_tile().max(1).to_string().len();
        for (r, row) in self.cells.iter().enumerate() {
            if r > 0 {
                writeln!(f)?;
            }
            for (c, value) in row.iter().enumerate() {
                if c > 0 {
                    f.write_str(" ")?;
                }
                if *value == 0 {
                    write!(f, "{:>width$}", ".")?;
                } else {
                    write!(f, "{value:>width$}")?;
                }
            }
        }
        Ok(())
    }
}
