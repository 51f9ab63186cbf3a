use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tiles_core::model::direction::Direction;

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse telemetry JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Default, Serialize)]
pub struct TelemetrySummary {
    pub turns: TurnTelemetrySummary,
    pub games: GameTelemetrySummary,
}

#[derive(Debug, Default, Serialize)]
pub struct TurnTelemetrySummary {
    pub count: usize,
    pub avg_score: Option<f64>,
    pub avg_nodes: Option<f64>,
    pub avg_cache_hits: Option<f64>,
    pub avg_elapsed_ms: Option<f64>,
    pub direction_counts: BTreeMap<String, usize>,
}

#[derive(Debug, Default, Serialize)]
pub struct GameTelemetrySummary {
    pub count: usize,
    pub avg_max_tile: Option<f64>,
    pub avg_moves: Option<f64>,
    pub termination_counts: BTreeMap<String, usize>,
}

#[derive(Debug)]
struct Average {
    sum: f64,
    count: usize,
}

impl Average {
    fn new() -> Self {
        Self { sum: 0.0, count: 0 }
    }

    fn add(&mut self, value: Option<f64>) {
        if let Some(value) = value.filter(|v| v.is_finite()) {
            self.sum += value;
            self.count += 1;
        }
    }

    fn mean(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.sum / self.count as f64)
        }
    }
}

fn label(fields: &serde_json::Map<String, Value>, key: &str) -> String {
    fields
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or("<unset>")
        .to_string()
}

/// Aggregate the per-turn and per-game events written by the runner.
pub fn summarise_telemetry(path: &Path) -> Result<TelemetrySummary, TelemetryError> {
    if !path.exists() {
        return Ok(TelemetrySummary::default());
    }

    let file = File::open(path).map_err(|source| TelemetryError::Io {
        context: "opening telemetry log",
        source,
    })?;
    let reader = BufReader::new(file);

    let mut turns = TurnTelemetrySummary::default();
    let mut score_avg = Average::new();
    let mut nodes_avg = Average::new();
    let mut hits_avg = Average::new();
    let mut elapsed_avg = Average::new();

    let mut games = GameTelemetrySummary::default();
    let mut max_tile_avg = Average::new();
    let mut moves_avg = Average::new();

    for line in reader.lines() {
        let line = line.map_err(|source| TelemetryError::Io {
            context: "reading telemetry line",
            source,
        })?;
        if line.trim().is_empty() {
            continue;
        }

        let payload: Value = serde_json::from_str(&line)?;
        let target = payload
            .get("target")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let fields = payload
            .get("fields")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        match target {
            "tiles_bench::turn" => {
                turns.count += 1;
                score_avg.add(fields.get("score").and_then(Value::as_f64));
                nodes_avg.add(fields.get("nodes").and_then(Value::as_f64));
                hits_avg.add(fields.get("cache_hits").and_then(Value::as_f64));
                elapsed_avg.add(fields.get("elapsed_ms").and_then(Value::as_f64));
                let direction = fields
                    .get("direction")
                    .and_then(Value::as_str)
                    .and_then(|raw| raw.parse::<Direction>().ok())
                    .map_or("<unset>", Direction::as_str);
                *turns
                    .direction_counts
                    .entry(direction.to_string())
                    .or_insert(0) += 1;
            }
            "tiles_bench::game" => {
                games.count += 1;
                max_tile_avg.add(fields.get("max_tile").and_then(Value::as_f64));
                moves_avg.add(fields.get("moves").and_then(Value::as_f64));
                *games
                    .termination_counts
                    .entry(label(&fields, "termination"))
                    .or_insert(0) += 1;
            }
            _ => {}
        }
    }

    turns.avg_score = score_avg.mean();
    turns.avg_nodes = nodes_avg.mean();
    turns.avg_cache_hits = hits_avg.mean();
    turns.avg_elapsed_ms = elapsed_avg.mean();
    games.avg_max_tile = max_tile_avg.mean();
    games.avg_moves = moves_avg.mean();

    Ok(TelemetrySummary { turns, games })
}

pub fn write_summary_outputs(
    telemetry_path: &Path,
    output_dir: &Path,
) -> Result<Option<TelemetryOutputs>, TelemetryError> {
    if !telemetry_path.exists() {
        return Ok(None);
    }

    let summary = summarise_telemetry(telemetry_path)?;
    let json_path = output_dir.join("telemetry_summary.json");
    let md_path = output_dir.join("telemetry_summary.md");

    std::fs::write(&json_path, serde_json::to_vec_pretty(&summary)?).map_err(|source| {
        TelemetryError::Io {
            context: "writing telemetry summary json",
            source,
        }
    })?;

    let markdown = render_markdown(&summary, telemetry_path);
    std::fs::write(&md_path, markdown).map_err(|source| TelemetryError::Io {
        context: "writing telemetry summary markdown",
        source,
    })?;

    Ok(Some(TelemetryOutputs {
        summary,
        json_path,
        markdown_path: md_path,
    }))
}

/// Summarise a finished run's telemetry log into files next to it and append
/// the highlights to the run summary. The log writer must already be flushed.
pub fn summarise_run(
    telemetry_path: &Path,
    summary_path: &Path,
) -> Result<Option<TelemetryOutputs>, TelemetryError> {
    let output_dir = telemetry_path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let outputs = write_summary_outputs(telemetry_path, output_dir)?;
    if let Some(outputs) = outputs.as_ref() {
        append_highlights_to_markdown(summary_path, outputs)?;
    }
    Ok(outputs)
}

pub fn append_highlights_to_markdown(
    summary_path: &Path,
    outputs: &TelemetryOutputs,
) -> Result<(), TelemetryError> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(summary_path)
        .map_err(|source| TelemetryError::Io {
            context: "opening summary markdown for telemetry append",
            source,
        })?;

    let turns = &outputs.summary.turns;
    let mut section = String::new();
    section.push_str("\n## Telemetry Highlights\n");
    section.push_str(&format!("- Turn events captured: {}\n", turns.count));
    if let Some(value) = turns.avg_score {
        section.push_str(&format!("- Avg chosen score: {:.2}\n", value));
    }
    if let Some(value) = turns.avg_nodes {
        section.push_str(&format!("- Avg nodes per turn: {:.1}\n", value));
    }
    if !turns.direction_counts.is_empty() {
        section.push_str("- Directions:\n");
        for (label, count) in &turns.direction_counts {
            section.push_str(&format!("  - {}: {}\n", label, count));
        }
    }

    write!(file, "{section}").map_err(|source| TelemetryError::Io {
        context: "writing telemetry highlights",
        source,
    })?;

    Ok(())
}

fn render_markdown(summary: &TelemetrySummary, telemetry_path: &Path) -> String {
    let mut output = String::new();
    output.push_str("# Telemetry Summary\n\n");
    output.push_str(&format!("- Source: `{}`\n", telemetry_path.display()));
    output.push('\n');

    let turns = &summary.turns;
    output.push_str("## Turns\n");
    output.push_str(&format!("- Events: {}\n", turns.count));
    if let Some(value) = turns.avg_score {
        output.push_str(&format!("- Avg chosen score: {:.2}\n", value));
    }
    if let Some(value) = turns.avg_nodes {
        output.push_str(&format!("- Avg nodes: {:.1}\n", value));
    }
    if let Some(value) = turns.avg_cache_hits {
        output.push_str(&format!("- Avg cache hits: {:.1}\n", value));
    }
    if let Some(value) = turns.avg_elapsed_ms {
        output.push_str(&format!("- Avg ms per turn: {:.3}\n", value));
    }
    if !turns.direction_counts.is_empty() {
        output.push_str("- Directions:\n");
        for (label, count) in &turns.direction_counts {
            output.push_str(&format!("  - {}: {}\n", label, count));
        }
    }
    output.push('\n');

    let games = &summary.games;
    output.push_str("## Games\n");
    output.push_str(&format!("- Events: {}\n", games.count));
    if let Some(value) = games.avg_max_tile {
        output.push_str(&format!("- Avg max tile: {:.1}\n", value));
    }
    if let Some(value) = games.avg_moves {
        output.push_str(&format!("- Avg moves: {:.1}\n", value));
    }
    if games.termination_counts.is_empty() {
        output.push_str("- Terminations: <none>\n");
    } else {
        output.push_str("- Terminations:\n");
        for (label, count) in &games.termination_counts {
            output.push_str(&format!("  - {}: {}\n", label, count));
        }
    }
    output
}

#[derive(Debug)]
pub struct TelemetryOutputs {
    pub summary: TelemetrySummary,
    pub json_path: PathBuf,
    pub markdown_path: PathBuf,
}
