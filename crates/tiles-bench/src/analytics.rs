use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use plotters::prelude::*;
use serde::Serialize;
use statrs::distribution::{ContinuousCDF, Normal};
use statrs::statistics::{self, Data, Median};
use thiserror::Error;

use crate::config::BenchmarkConfig;
use crate::runner::{GameOutcome, Termination};

const CONFIDENCE_LEVEL: f64 = 0.95;
const HISTOGRAM_FILE: &str = "max_tile_histogram.png";

#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to render plot: {0}")]
    Plot(String),
}

pub struct AnalyticsCollector {
    run_id: String,
    milestones: Vec<u32>,
    latency_budget_ms: u64,
    max_tiles: Vec<u32>,
    moves: Vec<u32>,
    terminations: BTreeMap<Termination, usize>,
    total_ms: f64,
    decisions: u64,
    nodes: u64,
    cache_hits: u64,
}

impl AnalyticsCollector {
    pub fn new(config: &BenchmarkConfig) -> Self {
        Self {
            run_id: config.run_id.clone(),
            milestones: config.metrics.milestones.clone(),
            latency_budget_ms: config.metrics.latency_budget_ms,
            max_tiles: Vec::with_capacity(config.games.count),
            moves: Vec::with_capacity(config.games.count),
            terminations: BTreeMap::new(),
            total_ms: 0.0,
            decisions: 0,
            nodes: 0,
            cache_hits: 0,
        }
    }

    pub fn record_game(&mut self, outcome: &GameOutcome) {
        self.max_tiles.push(outcome.max_tile());
        self.moves.push(outcome.moves);
        *self.terminations.entry(outcome.termination).or_default() += 1;
        self.total_ms += outcome.metrics.total_ms;
        self.decisions += u64::from(outcome.metrics.decisions);
        self.nodes += outcome.metrics.nodes;
        self.cache_hits += outcome.metrics.cache_hits;
    }

    pub fn finalize(self) -> AnalyticsSummary {
        let games = self.max_tiles.len();
        let values: Vec<f64> = self.max_tiles.iter().map(|&tile| f64::from(tile)).collect();
        let max_tile = MaxTileStats::of(&values);

        let milestones = self
            .milestones
            .iter()
            .map(|&tile| {
                let reached = self.max_tiles.iter().filter(|&&max| max >= tile).count();
                MilestoneReport {
                    tile,
                    reached,
                    rate: ratio(reached as f64, games as f64),
                }
            })
            .collect();

        let mut distribution = BTreeMap::new();
        for &tile in &self.max_tiles {
            *distribution.entry(tile).or_insert(0usize) += 1;
        }

        let avg_ms_per_move = ratio(self.total_ms, self.decisions as f64);
        let total_moves: u64 = self.moves.iter().map(|&m| u64::from(m)).sum();

        AnalyticsSummary {
            run_id: self.run_id,
            games,
            highest_tile: self.max_tiles.iter().copied().max().unwrap_or(0),
            max_tiles: self.max_tiles,
            max_tile,
            milestones,
            distribution,
            terminations: self
                .terminations
                .into_iter()
                .map(|(termination, count)| (termination.as_str().to_string(), count))
                .collect(),
            mean_moves: ratio(total_moves as f64, games as f64),
            avg_ms_per_move,
            avg_nodes_per_move: ratio(self.nodes as f64, self.decisions as f64),
            cache_hit_rate: ratio(
                self.cache_hits as f64,
                (self.nodes + self.cache_hits) as f64,
            ),
            latency_budget_ms: self.latency_budget_ms,
            over_budget: avg_ms_per_move > self.latency_budget_ms as f64,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MaxTileStats {
    pub mean: f64,
    pub std_dev: f64,
    pub median: f64,
    pub ci: (f64, f64),
}

impl MaxTileStats {
    fn of(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self {
                mean: 0.0,
                std_dev: 0.0,
                median: 0.0,
                ci: (0.0, 0.0),
            };
        }

        let mean = statistics::Statistics::mean(values.iter());
        let median = Data::new(values.to_vec()).median();
        if values.len() < 2 {
            return Self {
                mean,
                std_dev: 0.0,
                median,
                ci: (mean, mean),
            };
        }

        let std_dev = statistics::Statistics::std_dev(values.iter());
        let z = Normal::new(0.0, 1.0)
            .map(|normal| normal.inverse_cdf(0.5 + CONFIDENCE_LEVEL / 2.0))
            .unwrap_or(1.96);
        let margin = z * std_dev / (values.len() as f64).sqrt();
        Self {
            mean,
            std_dev,
            median,
            ci: (mean - margin, mean + margin),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MilestoneReport {
    pub tile: u32,
    pub reached: usize,
    pub rate: f64,
}

#[derive(Debug, Serialize)]
pub struct AnalyticsSummary {
    pub run_id: String,
    pub games: usize,
    pub highest_tile: u32,
    pub max_tiles: Vec<u32>,
    pub max_tile: MaxTileStats,
    pub milestones: Vec<MilestoneReport>,
    pub distribution: BTreeMap<u32, usize>,
    pub terminations: BTreeMap<String, usize>,
    pub mean_moves: f64,
    pub avg_ms_per_move: f64,
    pub avg_nodes_per_move: f64,
    pub cache_hit_rate: f64,
    pub latency_budget_ms: u64,
    pub over_budget: bool,
}

impl AnalyticsSummary {
    pub fn write_markdown(&self, path: impl AsRef<Path>) -> Result<(), AnalyticsError> {
        fs::write(path.as_ref(), self.to_markdown()).map_err(|e| AnalyticsError::Io {
            context: "writing summary markdown",
            source: e,
        })
    }

    fn to_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("# Run Summary: {}\n\n", self.run_id));

        out.push_str("## Max tile per game\n\n");
        for (idx, tile) in self.max_tiles.iter().enumerate() {
            out.push_str(&format!("Game {}: Max Tile = {}\n", idx + 1, tile));
        }
        out.push_str(&format!(
            "\nHighest Tile Reached After {} Games: {}\n\n",
            self.games, self.highest_tile
        ));

        out.push_str("## Statistics\n\n");
        out.push_str("| Games | Mean max tile | Std dev | Median | 95% CI | Mean moves |\n");
        out.push_str("|-------|---------------|---------|--------|--------|------------|\n");
        out.push_str(&format!(
            "| {} | {:.1} | {:.1} | {:.1} | [{:.1}, {:.1}] | {:.1} |\n\n",
            self.games,
            self.max_tile.mean,
            self.max_tile.std_dev,
            self.max_tile.median,
            self.max_tile.ci.0,
            self.max_tile.ci.1,
            self.mean_moves,
        ));

        if !self.milestones.is_empty() {
            out.push_str("## Milestones\n\n");
            out.push_str("| Tile | Games reached | Reach % |\n");
            out.push_str("|------|---------------|---------|\n");
            for milestone in &self.milestones {
                out.push_str(&format!(
                    "| {} | {} | {:.1}% |\n",
                    milestone.tile,
                    milestone.reached,
                    milestone.rate * 100.0
                ));
            }
            out.push('\n');
        }

        out.push_str("## Max tile distribution\n\n");
        out.push_str("| Max tile | Games |\n");
        out.push_str("|----------|-------|\n");
        for (tile, count) in &self.distribution {
            out.push_str(&format!("| {tile} | {count} |\n"));
        }
        out.push('\n');

        out.push_str("## Terminations\n\n");
        for (label, count) in &self.terminations {
            out.push_str(&format!("- {label}: {count}\n"));
        }
        out.push('\n');

        out.push_str("## Search cost\n\n");
        out.push_str(&format!(
            "- Avg ms/move: {:.3} (budget {} ms, over budget: {})\n",
            self.avg_ms_per_move,
            self.latency_budget_ms,
            if self.over_budget { "Yes" } else { "No" }
        ));
        out.push_str(&format!(
            "- Avg nodes/move: {:.1}\n- Cache hit rate: {:.1}%\n",
            self.avg_nodes_per_move,
            self.cache_hit_rate * 100.0
        ));
        out
    }

    /// Draw a bar chart of how many games ended on each max tile.
    pub fn render_plot(&self, dir: impl AsRef<Path>) -> Result<PathBuf, AnalyticsError> {
        let dir = dir.as_ref();
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir).map_err(|e| AnalyticsError::Io {
                context: "creating plots directory",
                source: e,
            })?;
        }
        if self.distribution.is_empty() {
            return Err(AnalyticsError::Plot("no games to plot".into()));
        }

        let output_path = dir.join(HISTOGRAM_FILE);
        let bars: Vec<(u32, usize)> = self.distribution.iter().map(|(&t, &c)| (t, c)).collect();
        let caption = format!("Max tile over {} games", self.games);

        let prev_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(|_| {}));

        let plot_attempt = std::panic::catch_unwind(move || {
            let root = BitMapBackend::new(&output_path, (800, 480)).into_drawing_area();
            root.fill(&WHITE)
                .map_err(|e| AnalyticsError::Plot(e.to_string()))?;

            let y_max = bars.iter().map(|&(_, count)| count).max().unwrap_or(1) + 1;

            let mut chart = ChartBuilder::on(&root)
                .margin(20)
                .caption(caption, ("sans-serif", 22))
                .set_label_area_size(LabelAreaPosition::Left, 50)
                .set_label_area_size(LabelAreaPosition::Bottom, 60)
                .build_cartesian_2d(0..bars.len(), 0..y_max)
                .map_err(|e| AnalyticsError::Plot(e.to_string()))?;

            chart
                .configure_mesh()
                .disable_mesh()
                .y_desc("Games")
                .x_desc("Max tile")
                .x_label_formatter(&|idx| {
                    bars.get(*idx)
                        .map(|(tile, _)| tile.to_string())
                        .unwrap_or_default()
                })
                .draw()
                .map_err(|e| AnalyticsError::Plot(e.to_string()))?;

            chart
                .draw_series(bars.iter().enumerate().map(|(idx, &(_, count))| {
                    Rectangle::new([(idx, 0), (idx + 1, count)], BLUE.filled())
                }))
                .map_err(|e| AnalyticsError::Plot(e.to_string()))?;

            drop(chart);

            root.present()
                .map_err(|e| AnalyticsError::Plot(e.to_string()))?;

            drop(root);

            Ok(output_path)
        });

        std::panic::set_hook(prev_hook);

        match plot_attempt {
            Ok(result) => result,
            Err(_) => Err(AnalyticsError::Plot(
                "plotters panicked while rendering (missing font support?)".into(),
            )),
        }
    }
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}
