use crate::model::board::Board;
use crate::model::direction::Direction;
use rand::SeedableRng;
use rand::rngs::StdRng;

/// Odd multiplier that spreads consecutive move counts across the seed space.
const MOVE_SEED_STRIDE: u64 = 0x9E37_79B9_7F4A_7C15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// The board changed and a new tile was placed.
    Moved,
    /// The direction did not change the board; nothing was spawned.
    Unchanged,
    /// The game had already ended.
    GameOver,
}

/// One game in progress. The spawn after move `n` is drawn from an RNG
/// derived from `(seed, n)`, so the seed and the move count are enough to
/// continue a game exactly where it stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameState {
    board: Board,
    moves_made: u32,
    seed: u64,
}

impl GameState {
    pub fn with_seed(seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        Self {
            board: Board::initialize(&mut rng),
            moves_made: 0,
            seed,
        }
    }

    /// Resumes from a known board `moves_made` moves into the game.
    pub fn with_board(seed: u64, board: Board, moves_made: u32) -> Self {
        Self {
            board,
            moves_made,
            seed,
        }
    }

    fn spawn_rng(&self) -> StdRng {
        let step = u64::from(self.moves_made) + 1;
        StdRng::seed_from_u64(self.seed ^ step.wrapping_mul(MOVE_SEED_STRIDE))
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn moves_made(&self) -> u32 {
        self.moves_made
    }

    pub fn max_tile(&self) -> u32 {
        self.board.max_tile()
    }

    pub fn is_over(&self) -> bool {
        self.board.is_terminal()
    }

    /// Applies `direction` and, if the board changed, spawns a tile.
    pub fn play(&mut self, direction: Direction) -> MoveOutcome {
        if self.is_over() {
            return MoveOutcome::GameOver;
        }

        let moved = self.board.apply_move(direction);
        if moved == self.board {
            return MoveOutcome::Unchanged;
        }

        self.board = moved.spawn_random_tile(&mut self.spawn_rng());
        self.moves_made += 1;
        MoveOutcome::Moved
    }
}

#[cfg(test)]
mod tests {
    use super::{GameState, MoveOutcome};
    use crate::model::board::Board;
    use crate::model::direction::Direction;

    #[test]
    fn new_game_has_two_tiles() {
        let state = GameState::with_seed(7);
        assert_eq!(state.board().tile_count(), 2);
        assert_eq!(state.moves_made(), 0);
        assert_eq!(state.seed(), 7);
    }

    #[test]
    fn same_seed_same_opening() {
        let a = GameState::with_seed(2024);
        let b = GameState::with_seed(2024);
        assert_eq!(a.board(), b.board());
    }

    #[test]
    fn noop_move_does_not_spawn() {
        let board = Board::from_rows([[2, 0, 0, 0], [0; 4], [0; 4], [0; 4]]);
        let mut state = GameState::with_board(1, board, 0);
        assert_eq!(state.play(Direction::Left), MoveOutcome::Unchanged);
        assert_eq!(state.board(), &board);
        assert_eq!(state.moves_made(), 0);
    }

    #[test]
    fn effective_move_spawns_and_counts() {
        let board = Board::from_rows([[2, 2, 0, 0], [0; 4], [0; 4], [0; 4]]);
        let mut state = GameState::with_board(1, board, 0);
        assert_eq!(state.play(Direction::Left), MoveOutcome::Moved);
        assert_eq!(state.moves_made(), 1);
        assert_eq!(state.board().get(0, 0), 4);
        assert_eq!(state.board().tile_count(), 2);
    }

    #[test]
    fn resumed_game_continues_the_same_spawns() {
        let mut original = GameState::with_seed(31);
        for _ in 0..6 {
            let (direction, _) = original.board().enumerate_moves()[0];
            original.play(direction);
        }
        let mut resumed =
            GameState::with_board(original.seed(), *original.board(), original.moves_made());

        for turn in 0..20 {
            let Some(&(direction, _)) = original.board().enumerate_moves().first() else {
                break;
            };
            assert_eq!(original.play(direction), resumed.play(direction));
            assert_eq!(original.board(), resumed.board(), "turn {turn}");
        }
        assert_eq!(original, resumed);
    }

    #[test]
    fn terminal_game_refuses_moves() {
        let full = Board::from_rows([[2, 4, 2, 4], [4, 2, 4, 2], [2, 4, 2, 4], [4, 2, 4, 2]]);
        let mut state = GameState::with_board(3, full, 12);
        assert!(state.is_over());
        assert_eq!(state.play(Direction::Up), MoveOutcome::GameOver);
        assert_eq!(state.moves_made(), 12);
    }
}
