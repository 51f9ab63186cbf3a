pub mod heuristic;
pub mod policy;
pub mod search;

pub use heuristic::{HeuristicBreakdown, HeuristicWeights, evaluate};
pub use policy::{Decision, ExpectimaxPolicy, Policy};
pub use search::{
    DEFAULT_MAX_DEPTH, Expectimax, SearchConfig, SearchResult, SearchStats, TableLifetime,
};
