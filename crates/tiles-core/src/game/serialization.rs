use super::game_state::GameState;
use crate::model::board::{Board, BoardError};
use serde::{Deserialize, Serialize};

/// Portable record of a game: the seed, the move count and the flat
/// row-major board.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameSnapshot {
    pub seed: u64,
    pub moves_made: u32,
    pub cells: Vec<u32>,
}

impl GameSnapshot {
    pub fn capture(state: &GameState) -> Self {
        GameSnapshot {
            seed: state.seed(),
            moves_made: state.moves_made(),
            cells: state.board().to_flat(),
        }
    }

    pub fn board(&self) -> Result<Board, BoardError> {
        Board::try_from_flat(&self.cells)
    }

    pub fn restore(self) -> Result<GameState, BoardError> {
        let board = self.board()?;
        Ok(GameState::with_board(self.seed, board, self.moves_made))
    }

    pub fn to_json(state: &GameState) -> serde_json::Result<String> {
        let snapshot = Self::capture(state);
        serde_json::to_string_pretty(&snapshot)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
