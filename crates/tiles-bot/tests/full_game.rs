use tiles_bot::{ExpectimaxPolicy, Policy, SearchConfig};
use tiles_core::game::game_state::{GameState, MoveOutcome};
use tiles_core::model::board::Board;
use tiles_core::model::direction::Direction;

fn play(seed: u64, move_cap: u32) -> (Vec<Direction>, Board) {
    let mut policy = ExpectimaxPolicy::new(SearchConfig::default());
    policy.begin_game();
    let mut state = GameState::with_seed(seed);
    let mut moves = Vec::new();

    while !state.is_over() && state.moves_made() < move_cap {
        let Some(direction) = policy.choose_move(state.board()).direction else {
            break;
        };
        assert_eq!(state.play(direction), MoveOutcome::Moved);
        moves.push(direction);
    }

    (moves, *state.board())
}

#[test]
fn seeded_games_are_reproducible() {
    for seed in [1u64, 42, 2048] {
        let (moves_a, board_a) = play(seed, 120);
        let (moves_b, board_b) = play(seed, 120);
        assert_eq!(moves_a, moves_b, "seed {seed}");
        assert_eq!(board_a, board_b, "seed {seed}");
    }
}

#[test]
fn search_never_picks_a_noop_move() {
    let mut policy = ExpectimaxPolicy::default();
    policy.begin_game();
    let mut state = GameState::with_seed(7);
    for _ in 0..80 {
        if state.is_over() {
            break;
        }
        let before = *state.board();
        let direction = policy
            .choose_move(&before)
            .direction
            .expect("non-terminal board has a move");
        assert_ne!(before.apply_move(direction), before);
        state.play(direction);
    }
}

#[test]
fn searched_game_survives_opening_phase() {
    let (moves, board) = play(9, 300);
    assert_eq!(moves.len(), 300);
    // 300 spawns put at least 604 points on 16 cells.
    assert!(board.max_tile() >= 64);
    assert!(board.to_flat().iter().sum::<u32>() >= 604);
}
