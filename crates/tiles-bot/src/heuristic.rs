//! Static board evaluation used at the leaves of the expectimax search.
//!
//! The score is a weighted sum of four sub-scores, each computed on base-2
//! logarithms of tile values so that a 2048 and a 1024 are "one step" apart.

use serde::{Deserialize, Serialize};
use tiles_core::model::board::{BOARD_SIZE, Board};

/// Linear weights applied to the sub-scores of [`HeuristicBreakdown`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeuristicWeights {
    pub empty: f64,
    pub max_tile: f64,
    pub smoothness: f64,
    pub monotonicity: f64,
}

impl HeuristicWeights {
    pub const DEFAULT: HeuristicWeights = HeuristicWeights {
        empty: 2.7,
        max_tile: 1.0,
        smoothness: 0.1,
        monotonicity: 1.0,
    };

    pub fn combine(&self, breakdown: &HeuristicBreakdown) -> f64 {
        self.empty * breakdown.empty
            + self.max_tile * breakdown.max_tile
            + self.smoothness * breakdown.smoothness
            + self.monotonicity * breakdown.monotonicity
    }

    pub fn is_finite(&self) -> bool {
        [self.empty, self.max_tile, self.smoothness, self.monotonicity]
            .iter()
            .all(|w| w.is_finite())
    }
}

impl Default for HeuristicWeights {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Unweighted sub-scores of a single board.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct HeuristicBreakdown {
    /// Number of empty cells.
    pub empty: f64,
    /// log2 of the largest tile, 0 on an empty board.
    pub max_tile: f64,
    /// Negated sum of log2 gaps between each tile and its nearest non-empty
    /// neighbour to the right and below. Never positive.
    pub smoothness: f64,
    /// Sum over rows and columns of the less-penalised ordering direction.
    /// Never positive.
    pub monotonicity: f64,
}

impl HeuristicBreakdown {
    pub fn of(board: &Board) -> Self {
        Self {
            empty: board.empty_count() as f64,
            max_tile: max_tile_score(board),
            smoothness: smoothness(board),
            monotonicity: monotonicity(board),
        }
    }
}

/// Weighted score of `board`; higher is better.
pub fn evaluate(board: &Board, weights: &HeuristicWeights) -> f64 {
    weights.combine(&HeuristicBreakdown::of(board))
}

fn log2_or_zero(value: u32) -> f64 {
    if value == 0 {
        0.0
    } else {
        f64::from(value).log2()
    }
}

fn max_tile_score(board: &Board) -> f64 {
    log2_or_zero(board.max_tile())
}

fn smoothness(board: &Board) -> f64 {
    let rows = board.rows();
    let mut total = 0.0;
    for r in 0..BOARD_SIZE {
        for c in 0..BOARD_SIZE {
            let value = rows[r][c];
            if value == 0 {
                continue;
            }
            let here = log2_or_zero(value);

            // right
            if let Some(next) = (c + 1..BOARD_SIZE).map(|nc| rows[r][nc]).find(|&v| v != 0) {
                total -= (here - log2_or_zero(next)).abs();
            }
            // down
            if let Some(next) = (r + 1..BOARD_SIZE).map(|nr| rows[nr][c]).find(|&v| v != 0) {
                total -= (here - log2_or_zero(next)).abs();
            }
        }
    }
    total
}

fn monotonicity(board: &Board) -> f64 {
    let rows = board.rows();
    let mut row_buckets = MonotonicityBuckets::default();
    let mut col_buckets = MonotonicityBuckets::default();

    for line in 0..BOARD_SIZE {
        for step in 0..BOARD_SIZE - 1 {
            row_buckets.record(rows[line][step], rows[line][step + 1]);
            col_buckets.record(rows[step][line], rows[step + 1][line]);
        }
    }

    row_buckets.best() + col_buckets.best()
}

#[derive(Default)]
struct MonotonicityBuckets {
    decreasing: f64,
    increasing: f64,
}

impl MonotonicityBuckets {
    fn record(&mut self, current: u32, next: u32) {
        let current = log2_or_zero(current);
        let next = log2_or_zero(next);
        if current > next {
            self.decreasing += next - current;
        } else if next > current {
            self.increasing += current - next;
        }
    }

    fn best(&self) -> f64 {
        self.decreasing.max(self.increasing)
    }
}
