use super::table::{NodeKey, TranspositionTable};
use super::{NodeKind, SearchConfig, SearchResult, SearchStats, TableLifetime};
use crate::heuristic::evaluate;
use tiles_core::model::board::Board;
use tiles_core::model::spawn::SPAWN_OUTCOMES;
use tracing::{Level, event};

/// Depth-limited expectimax over alternating player and spawn layers.
///
/// The engine owns its transposition table. Call [`Expectimax::reset`] when a
/// new game starts; within one game, entries are reused across turns unless
/// the config asks for [`TableLifetime::Search`].
#[derive(Debug)]
pub struct Expectimax {
    config: SearchConfig,
    table: TranspositionTable,
    stats: SearchStats,
}

impl Expectimax {
    pub fn new() -> Self {
        Self::with_config(SearchConfig::default())
    }

    pub fn with_config(config: SearchConfig) -> Self {
        Self {
            config,
            table: TranspositionTable::new(),
            stats: SearchStats::default(),
        }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Statistics from the last [`Expectimax::select_move`] call.
    pub fn last_stats(&self) -> SearchStats {
        self.stats
    }

    pub fn table_len(&self) -> usize {
        self.table.len()
    }

    /// Drops every cached result. Must be called between independent games.
    pub fn reset(&mut self) {
        self.table.reset();
        self.stats = SearchStats::default();
    }

    /// Searches with the configured depth.
    pub fn best_move(&mut self, board: &Board) -> SearchResult {
        self.select_move(board, self.config.max_depth)
    }

    /// Scores `board` as a player-to-move node searched `max_depth` layers
    /// deep. The direction is `None` when the board admits no move.
    pub fn select_move(&mut self, board: &Board, max_depth: u32) -> SearchResult {
        if self.config.table_lifetime == TableLifetime::Search {
            self.table.reset();
        }
        self.stats = SearchStats::default();

        let result = self.max_node(board, max_depth);
        self.stats.table_entries = self.table.len();

        if tracing::enabled!(target: "tiles_bot::search", Level::DEBUG) {
            event!(
                target: "tiles_bot::search",
                Level::DEBUG,
                max_depth,
                direction = result.direction.map(|d| d.as_str()).unwrap_or("none"),
                score = result.score,
                nodes = self.stats.nodes,
                cache_hits = self.stats.cache_hits,
                table_entries = self.stats.table_entries as u64,
            );
        }

        result
    }

    fn lookup(&mut self, key: &NodeKey) -> Option<SearchResult> {
        let hit = self.table.get(key);
        if hit.is_some() {
            self.stats.cache_hits += 1;
        }
        hit
    }

    fn leaf_score(&self, board: &Board) -> SearchResult {
        SearchResult::leaf(evaluate(board, &self.config.weights))
    }

    fn max_node(&mut self, board: &Board, remaining: u32) -> SearchResult {
        let key = NodeKey::new(*board, remaining, NodeKind::Max);
        if let Some(hit) = self.lookup(&key) {
            return hit;
        }
        self.stats.nodes += 1;

        let moves = if remaining == 0 {
            Vec::new()
        } else {
            board.enumerate_moves()
        };

        let result = if moves.is_empty() {
            self.leaf_score(board)
        } else {
            let mut best = SearchResult::leaf(f64::NEG_INFINITY);
            for (direction, next) in moves {
                let score = self.chance_node(&next, remaining - 1).score;
                if score > best.score {
                    best = SearchResult {
                        score,
                        direction: Some(direction),
                    };
                }
            }
            best
        };

        self.table.insert(key, result);
        result
    }

    fn chance_node(&mut self, board: &Board, remaining: u32) -> SearchResult {
        let key = NodeKey::new(*board, remaining, NodeKind::Chance);
        if let Some(hit) = self.lookup(&key) {
            return hit;
        }
        self.stats.nodes += 1;

        let empty = if remaining == 0 {
            Vec::new()
        } else {
            board.empty_cells()
        };

        let result = if empty.is_empty() {
            self.leaf_score(board)
        } else {
            let cell_weight = 1.0 / empty.len() as f64;
            let mut expected = 0.0;
            for &(row, col) in &empty {
                for (value, probability) in SPAWN_OUTCOMES {
                    let child = board.with_tile(row, col, value);
                    let score = self.max_node(&child, remaining - 1).score;
                    expected += cell_weight * probability * score;
                }
            }
            SearchResult::leaf(expected)
        };

        self.table.insert(key, result);
        result
    }
}

impl Default for Expectimax {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heuristic::HeuristicWeights;
    use tiles_core::model::direction::Direction;

    fn checkerboard() -> Board {
        Board::from_rows([[2, 4, 2, 4], [4, 2, 4, 2], [2, 4, 2, 4], [4, 2, 4, 2]])
    }

    #[test]
    fn terminal_board_has_no_direction_at_any_depth() {
        let mut engine = Expectimax::new();
        let board = checkerboard();
        let expected = evaluate(&board, &HeuristicWeights::DEFAULT);
        for depth in 0..6 {
            let result = engine.select_move(&board, depth);
            assert_eq!(result.direction, None);
            assert!((result.score - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn zero_depth_returns_static_score() {
        let mut engine = Expectimax::new();
        let board = Board::from_rows([[2, 2, 0, 0], [0; 4], [0; 4], [0; 4]]);
        let result = engine.select_move(&board, 0);
        assert_eq!(result.direction, None);
        assert!((result.score - evaluate(&board, &HeuristicWeights::DEFAULT)).abs() < 1e-9);
    }

    #[test]
    fn depth_one_picks_best_static_successor() {
        let mut engine = Expectimax::new();
        let board = Board::from_rows([[2, 2, 4, 8], [0; 4], [0; 4], [0; 4]]);
        let result = engine.select_move(&board, 1);

        let best = board
            .enumerate_moves()
            .into_iter()
            .map(|(d, b)| (d, evaluate(&b, &HeuristicWeights::DEFAULT)))
            .fold(None, |acc: Option<(Direction, f64)>, (d, s)| match acc {
                Some((_, best)) if best >= s => acc,
                _ => Some((d, s)),
            })
            .unwrap();
        assert_eq!(result.direction, Some(best.0));
        assert!((result.score - best.1).abs() < 1e-9);
    }

    #[test]
    fn chance_layer_averages_spawn_outcomes() {
        // One empty cell: the depth-2 value of a move is the weighted average
        // of the two spawn results scored statically.
        let board = Board::from_rows([
            [2, 4, 8, 16],
            [32, 64, 128, 256],
            [2, 4, 8, 16],
            [32, 64, 128, 0],
        ]);
        let mut engine = Expectimax::new();
        let result = engine.select_move(&board, 2);

        let w = HeuristicWeights::DEFAULT;
        let mut best = f64::NEG_INFINITY;
        for (_, next) in board.enumerate_moves() {
            let cells = next.empty_cells();
            let mut expected = 0.0;
            for &(r, c) in &cells {
                for (value, p) in SPAWN_OUTCOMES {
                    expected += p / cells.len() as f64 * evaluate(&next.with_tile(r, c, value), &w);
                }
            }
            best = best.max(expected);
        }
        assert!(result.direction.is_some());
        assert!((result.score - best).abs() < 1e-9);
    }

    #[test]
    fn repeated_search_hits_the_table() {
        let mut engine = Expectimax::new();
        let board = Board::from_rows([[2, 0, 0, 2], [0, 4, 0, 0], [0; 4], [0, 0, 0, 2]]);
        let first = engine.select_move(&board, 3);
        let first_stats = engine.last_stats();
        assert!(first_stats.nodes > 0);

        let second = engine.select_move(&board, 3);
        let second_stats = engine.last_stats();
        assert_eq!(first, second);
        assert_eq!(second_stats.nodes, 0);
        assert_eq!(second_stats.cache_hits, 1);
    }

    #[test]
    fn reset_forgets_cached_results() {
        let mut engine = Expectimax::new();
        let board = Board::from_rows([[2, 0, 0, 2], [0; 4], [0; 4], [0; 4]]);
        engine.select_move(&board, 2);
        assert!(engine.table_len() > 0);
        engine.reset();
        assert_eq!(engine.table_len(), 0);
        engine.select_move(&board, 2);
        assert!(engine.last_stats().nodes > 0);
    }

    #[test]
    fn search_lifetime_clears_between_calls() {
        let config = SearchConfig {
            table_lifetime: TableLifetime::Search,
            ..SearchConfig::default()
        };
        let mut engine = Expectimax::with_config(config);
        let board = Board::from_rows([[2, 0, 0, 2], [0; 4], [0; 4], [0; 4]]);
        engine.select_move(&board, 2);
        let nodes = engine.last_stats().nodes;
        engine.select_move(&board, 2);
        assert_eq!(engine.last_stats().nodes, nodes);
        assert_eq!(engine.last_stats().table_entries as u64, nodes);
    }

    #[test]
    fn memoised_and_fresh_engines_agree() {
        let boards = [
            Board::from_rows([[2, 0, 0, 2], [0, 4, 0, 0], [0; 4], [0, 0, 0, 2]]),
            Board::from_rows([[4, 2, 0, 0], [2, 0, 0, 0], [0, 0, 0, 0], [0, 0, 2, 0]]),
            Board::from_rows([[8, 4, 2, 0], [4, 2, 0, 0], [2, 0, 0, 0], [0; 4]]),
        ];
        let mut shared = Expectimax::new();
        for board in boards {
            let cached = shared.select_move(&board, 3);
            let fresh = Expectimax::new().select_move(&board, 3);
            assert_eq!(cached.direction, fresh.direction);
            assert!((cached.score - fresh.score).abs() < 1e-9);
        }
    }
}
