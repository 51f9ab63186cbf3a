mod expectimax;

pub use expectimax::ExpectimaxPolicy;

use crate::search::SearchStats;
use tiles_core::model::board::Board;
use tiles_core::model::direction::Direction;

/// Decision returned by a policy for one turn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decision {
    pub direction: Option<Direction>,
    pub score: f64,
    pub stats: SearchStats,
}

/// Unified interface for move selection, used by the game driver.
pub trait Policy: Send {
    /// Called once before the first move of every game.
    fn begin_game(&mut self);

    /// Choose the next move; `None` means the board admits no move.
    fn choose_move(&mut self, board: &Board) -> Decision;
}
