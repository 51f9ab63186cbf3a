use super::{Decision, Policy};
use crate::search::{Expectimax, SearchConfig};
use tiles_core::model::board::Board;

/// Adapter that drives an [`Expectimax`] engine through the [`Policy`] trait.
#[derive(Debug)]
pub struct ExpectimaxPolicy {
    engine: Expectimax,
}

impl ExpectimaxPolicy {
    pub fn new(config: SearchConfig) -> Self {
        Self {
            engine: Expectimax::with_config(config),
        }
    }

    pub fn engine(&self) -> &Expectimax {
        &self.engine
    }
}

impl Default for ExpectimaxPolicy {
    fn default() -> Self {
        Self::new(SearchConfig::default())
    }
}

impl Policy for ExpectimaxPolicy {
    fn begin_game(&mut self) {
        self.engine.reset();
    }

    fn choose_move(&mut self, board: &Board) -> Decision {
        let result = self.engine.best_move(board);
        Decision {
            direction: result.direction,
            score: result.score,
            stats: self.engine.last_stats(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tiles_core::model::board::Board;

    #[test]
    fn begin_game_clears_engine_table() {
        let mut policy = ExpectimaxPolicy::default();
        let board = Board::from_rows([[2, 2, 0, 0], [0; 4], [0; 4], [0; 4]]);
        let decision = policy.choose_move(&board);
        assert!(decision.direction.is_some());
        assert!(policy.engine().table_len() > 0);

        policy.begin_game();
        assert_eq!(policy.engine().table_len(), 0);
    }

    #[test]
    fn boxed_policy_reports_stats() {
        let mut policy: Box<dyn Policy> = Box::new(ExpectimaxPolicy::default());
        policy.begin_game();
        let board = Board::from_rows([[2, 0, 0, 0], [0, 0, 2, 0], [0; 4], [0; 4]]);
        let decision = policy.choose_move(&board);
        assert!(decision.direction.is_some());
        assert!(decision.stats.nodes > 0);
    }
}
