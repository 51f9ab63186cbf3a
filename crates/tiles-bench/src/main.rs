use std::path::PathBuf;

use clap::Parser;

use tiles_bench::config::{BenchmarkConfig, ResolvedOutputs};
use tiles_bench::logging::init_logging;
use tiles_bench::runner::GameRunner;
use tiles_bench::telemetry::summarise_run;

/// Self-play driver for the expectimax tile-merging player.
#[derive(Debug, Parser)]
#[command(
    name = "tiles-bench",
    author,
    version,
    about = "Deterministic expectimax self-play harness"
)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "bench/bench.yaml")]
    config: PathBuf,

    /// Override the run identifier (substitutes {run_id} templates).
    #[arg(long, value_name = "RUN_ID")]
    run_id: Option<String>,

    /// Override the number of games to play.
    #[arg(long, value_name = "GAMES")]
    games: Option<usize>,

    /// Override the RNG seed that derives per-game seeds.
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,

    /// Override the search depth.
    #[arg(long, value_name = "DEPTH")]
    depth: Option<u32>,

    /// Override the per-game move cap.
    #[arg(long, value_name = "MOVES")]
    move_limit: Option<u32>,

    /// Print every board as the games are played.
    #[arg(long)]
    print_boards: bool,

    /// Emit one telemetry event per move regardless of config.
    #[arg(long)]
    log_turns: bool,

    /// Exit after validating the configuration (no games are played).
    #[arg(long)]
    validate_only: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = BenchmarkConfig::from_path(&cli.config)?;

    if let Some(run_id) = cli.run_id {
        config.run_id = run_id;
    }

    if let Some(games) = cli.games {
        config.games.count = games;
    }

    if let Some(seed) = cli.seed {
        config.games.seed = Some(seed);
    }

    if let Some(depth) = cli.depth {
        config.search.max_depth = depth;
    }

    if let Some(move_limit) = cli.move_limit {
        config.games.move_limit = move_limit;
    }

    if cli.log_turns {
        config.logging.turn_details = true;
    }

    config.validate()?;

    let outputs: ResolvedOutputs = config.resolved_outputs();
    let run_id = config.run_id.clone();
    let games = config.games.count;
    let depth = config.search.max_depth;

    println!(
        "Loaded configuration '{run_id}' ({games} game{}, depth {depth})",
        if games == 1 { "" } else { "s" }
    );

    if cli.validate_only {
        println!("Validation-only mode: no games played.");
        return Ok(());
    }

    let logging_guard = init_logging(&config.logging, &outputs)?;
    let runner = GameRunner::new(config, outputs).with_board_printing(cli.print_boards);

    let summary = runner.run()?;

    // Dropping the guard flushes queued events into the telemetry log.
    let telemetry_path = logging_guard.map(|guard| guard.telemetry_path.clone());
    let telemetry_outputs = match telemetry_path.as_ref() {
        Some(path) => summarise_run(path, &summary.summary_path)?,
        None => None,
    };

    println!(
        "Run complete for '{run_id}': {} games → {} rows at {}",
        summary.games_played,
        summary.rows_written,
        summary.jsonl_path.display()
    );
    println!(
        "Highest Tile Reached After {} Games: {}",
        summary.games_played, summary.highest_tile
    );
    println!("Summary: {}", summary.summary_path.display());
    if let Some(plot_path) = summary.plot_path.as_ref() {
        println!("Max tile histogram: {}", plot_path.display());
    }
    if let Some(telemetry_path) = telemetry_path.as_ref() {
        println!("Telemetry log: {}", telemetry_path.display());
    }
    if let Some(outputs) = telemetry_outputs.as_ref() {
        println!("Telemetry summary (JSON): {}", outputs.json_path.display());
        println!(
            "Telemetry summary (Markdown): {}",
            outputs.markdown_path.display()
        );
        let turns = &outputs.summary.turns;
        match turns.avg_nodes {
            Some(avg_nodes) => println!(
                "  Turns: {} events, avg {:.1} nodes searched",
                turns.count, avg_nodes
            ),
            None => println!("  Turns: {} events captured", turns.count),
        }
    }

    Ok(())
}
