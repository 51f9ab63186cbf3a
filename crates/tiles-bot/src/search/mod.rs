mod expectimax;
mod table;

pub use expectimax::Expectimax;
pub use table::{NodeKey, TranspositionTable};

use crate::heuristic::HeuristicWeights;
use serde::{Deserialize, Serialize};
use tiles_core::model::direction::Direction;

/// Search horizon in layers (half-turns) used when no depth is configured.
pub const DEFAULT_MAX_DEPTH: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Player to move.
    Max,
    /// Nature places a tile.
    Chance,
}

/// Expected score of a node and, at maximizing nodes that expanded at least
/// one move, the direction that achieved it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchResult {
    pub score: f64,
    pub direction: Option<Direction>,
}

impl SearchResult {
    pub const fn leaf(score: f64) -> Self {
        Self {
            score,
            direction: None,
        }
    }
}

/// How long transposition entries are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableLifetime {
    /// Keep entries across turns until [`Expectimax::reset`].
    #[default]
    Game,
    /// Clear before every search.
    Search,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub max_depth: u32,
    pub weights: HeuristicWeights,
    pub table_lifetime: TableLifetime,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            weights: HeuristicWeights::DEFAULT,
            table_lifetime: TableLifetime::Game,
        }
    }
}

/// Counters for the most recent [`Expectimax::select_move`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SearchStats {
    /// Nodes expanded (table misses).
    pub nodes: u64,
    pub cache_hits: u64,
    /// Table size after the search.
    pub table_entries: usize,
}
