use criterion::{Criterion, black_box, criterion_group, criterion_main};
use tiles_bot::search::Expectimax;
use tiles_core::game::game_state::GameState;
use tiles_core::model::board::Board;

fn midgame_board(seed: u64, moves: usize) -> Board {
    let mut state = GameState::with_seed(seed);
    for turn in 0..moves {
        let options = state.board().enumerate_moves();
        if options.is_empty() {
            break;
        }
        let (direction, _) = options[turn % options.len()];
        state.play(direction);
    }
    *state.board()
}

fn select_move_bench(c: &mut Criterion) {
    let mut group = c.benchmark_group("select_move");
    for (seed, moves) in [(1u64, 0usize), (7u64, 40usize), (11u64, 120usize)] {
        let board = midgame_board(seed, moves);
        for depth in [2u32, 3] {
            group.bench_function(format!("fresh_d{depth}_{seed}_{moves}"), |b| {
                b.iter(|| {
                    let mut engine = Expectimax::new();
                    black_box(engine.select_move(black_box(&board), depth))
                })
            });
        }
    }
    group.finish();
}

criterion_group!(benches, select_move_bench);
criterion_main!(benches);
