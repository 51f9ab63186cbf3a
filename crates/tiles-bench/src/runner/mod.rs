mod metrics;

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use rand::{RngCore, SeedableRng, rngs::StdRng};
use serde::Serialize;
use thiserror::Error;
use tiles_bot::{ExpectimaxPolicy, Policy};
use tiles_core::game::game_state::{GameState, MoveOutcome};
use tiles_core::model::board::Board;
use tracing::{Level, event};

use crate::analytics::{AnalyticsCollector, AnalyticsError};
use crate::config::{BenchmarkConfig, ResolvedOutputs};

pub use metrics::{DecisionMetrics, DecisionSummary};

/// Primary entry point for running a batch of self-play games.
pub struct GameRunner {
    config: BenchmarkConfig,
    outputs: ResolvedOutputs,
    logging_enabled: bool,
    print_boards: bool,
}

/// Summary details returned after a run.
pub struct RunSummary {
    pub games_played: usize,
    pub rows_written: usize,
    pub highest_tile: u32,
    pub jsonl_path: PathBuf,
    pub summary_path: PathBuf,
    pub plot_path: Option<PathBuf>,
}

impl GameRunner {
    /// Build a runner from a validated configuration.
    pub fn new(config: BenchmarkConfig, outputs: ResolvedOutputs) -> Self {
        Self {
            logging_enabled: config.logging.enable_structured,
            config,
            outputs,
            print_boards: false,
        }
    }

    /// Print every board to stdout while games are played.
    pub fn with_board_printing(mut self, enabled: bool) -> Self {
        self.print_boards = enabled;
        self
    }

    /// Play every configured game, streaming one JSONL row per game to disk.
    pub fn run(&self) -> Result<RunSummary, RunnerError> {
        ensure_parent(self.outputs.jsonl.parent())?;
        ensure_parent(self.outputs.summary_md.parent())?;
        if !self.outputs.plots_dir.as_os_str().is_empty() {
            fs::create_dir_all(&self.outputs.plots_dir)?;
        }

        let mut writer = BufWriter::new(File::create(&self.outputs.jsonl)?);
        let mut rng = StdRng::seed_from_u64(self.config.games.seed.unwrap_or(0));
        let mut analytics = AnalyticsCollector::new(&self.config);
        let mut policy = ExpectimaxPolicy::new(self.config.search);
        let mut rows_written = 0usize;

        for game_index in 0..self.config.games.count {
            let game_seed = rng.next_u64();
            let outcome = self.play_game(game_index, game_seed, &mut policy)?;
            analytics.record_game(&outcome);
            write_game_row(&mut writer, &self.config, &outcome)?;
            rows_written += 1;
        }

        writer.flush()?;

        let summary = analytics.finalize();
        summary.write_markdown(&self.outputs.summary_md)?;
        let plot_path = match summary.render_plot(&self.outputs.plots_dir) {
            Ok(path) => Some(path),
            Err(err) => {
                eprintln!("WARN: {}", err);
                None
            }
        };

        Ok(RunSummary {
            games_played: self.config.games.count,
            rows_written,
            highest_tile: summary.highest_tile,
            jsonl_path: self.outputs.jsonl.clone(),
            summary_path: self.outputs.summary_md.clone(),
            plot_path,
        })
    }

    fn play_game(
        &self,
        game_index: usize,
        game_seed: u64,
        policy: &mut dyn Policy,
    ) -> Result<GameOutcome, RunnerError> {
        policy.begin_game();
        let mut state = GameState::with_seed(game_seed);
        let mut metrics = DecisionMetrics::default();
        let move_limit = self.config.games.move_limit;

        if self.print_boards {
            println!("Game {} initial board:", game_index + 1);
            println!("{}", state.board());
            println!("{}", "-".repeat(20));
        }

        let termination = loop {
            if state.is_over() {
                break Termination::Terminal;
            }
            if state.moves_made() >= move_limit {
                break Termination::MoveLimit;
            }

            let start = Instant::now();
            let decision = policy.choose_move(state.board());
            let elapsed_ms = metrics.record(start.elapsed(), &decision.stats);

            let Some(direction) = decision.direction else {
                break Termination::NoMove;
            };

            match state.play(direction) {
                MoveOutcome::Moved => {}
                MoveOutcome::GameOver => break Termination::Terminal,
                MoveOutcome::Unchanged => {
                    return Err(RunnerError::game(format!(
                        "policy chose no-op move {direction} in game {game_index} on\n{}",
                        state.board()
                    )));
                }
            }

            if self.logging_enabled
                && self.config.logging.turn_details
                && tracing::enabled!(Level::INFO)
            {
                event!(
                    target: "tiles_bench::turn",
                    Level::INFO,
                    run_id = %self.config.run_id,
                    game_index = game_index as u32,
                    move_index = state.moves_made(),
                    direction = direction.as_str(),
                    score = decision.score,
                    nodes = decision.stats.nodes,
                    cache_hits = decision.stats.cache_hits,
                    max_tile = state.max_tile(),
                    elapsed_ms
                );
            }

            if self.print_boards {
                println!("Move {}: {}", state.moves_made(), direction);
                println!("{}", state.board());
                println!("{}", "-".repeat(20));
            }
        };

        let final_board = *state.board();
        let metrics = metrics.finalize();

        if self.logging_enabled && tracing::enabled!(Level::INFO) {
            event!(
                target: "tiles_bench::game",
                Level::INFO,
                run_id = %self.config.run_id,
                game_index = game_index as u32,
                game_seed,
                moves = state.moves_made(),
                max_tile = final_board.max_tile(),
                termination = termination.as_str(),
                avg_ms_per_move = metrics.avg_ms_per_decision
            );
        }

        if self.print_boards {
            println!("Final board:");
            println!("{final_board}");
            println!("Max tile reached: {}", final_board.max_tile());
            println!("{}", "=".repeat(30));
        }

        Ok(GameOutcome {
            game_index,
            game_seed,
            moves: state.moves_made(),
            final_board,
            termination,
            metrics,
        })
    }
}

fn ensure_parent(path: Option<&Path>) -> Result<(), RunnerError> {
    if let Some(dir) = path.filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    Ok(())
}

fn write_game_row(
    writer: &mut BufWriter<File>,
    config: &BenchmarkConfig,
    outcome: &GameOutcome,
) -> Result<(), RunnerError> {
    let row = GameLogRow {
        run_id: config.run_id.clone(),
        game_id: format!("G{:05}", outcome.game_index),
        game_index: outcome.game_index,
        game_seed: outcome.game_seed,
        max_depth: config.search.max_depth,
        moves: outcome.moves,
        max_tile: outcome.max_tile(),
        tile_sum: outcome.final_board.to_flat().iter().sum(),
        final_board: outcome.final_board.to_flat(),
        termination: outcome.termination,
        speed_ms_move: outcome.metrics.avg_ms_per_decision,
        decisions: outcome.metrics.decisions,
        search_nodes: outcome.metrics.nodes,
        cache_hits: outcome.metrics.cache_hits,
    };

    serde_json::to_writer(&mut *writer, &row)?;
    writer.write_all(b"\n")?;
    Ok(())
}

/// Why a game stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// No move changes the board.
    Terminal,
    /// The configured move cap was reached.
    MoveLimit,
    /// The policy returned no direction on a live board.
    NoMove,
}

impl Termination {
    pub const fn as_str(self) -> &'static str {
        match self {
            Termination::Terminal => "terminal",
            Termination::MoveLimit => "move_limit",
            Termination::NoMove => "no_move",
        }
    }
}

pub struct GameOutcome {
    pub game_index: usize,
    pub game_seed: u64,
    pub moves: u32,
    pub final_board: Board,
    pub termination: Termination,
    pub metrics: DecisionSummary,
}

impl GameOutcome {
    pub fn max_tile(&self) -> u32 {
        self.final_board.max_tile()
    }
}

#[derive(Serialize)]
struct GameLogRow {
    run_id: String,
    game_id: String,
    game_index: usize,
    game_seed: u64,
    max_depth: u32,
    moves: u32,
    max_tile: u32,
    tile_sum: u32,
    final_board: Vec<u32>,
    termination: Termination,
    speed_ms_move: f64,
    decisions: u32,
    search_nodes: u64,
    cache_hits: u64,
}

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
    #[error("failed to serialize log row: {source}")]
    Serialize {
        #[from]
        source: serde_json::Error,
    },
    #[error("game execution failed: {message}")]
    Game { message: String },
    #[error("analytics error: {0}")]
    Analytics(#[from] AnalyticsError),
}

impl RunnerError {
    fn game(message: String) -> Self {
        RunnerError::Game { message }
    }
}
