use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tiles_bot::SearchConfig;
use tracing::Level;

const DEFAULT_GAME_COUNT: usize = 20;
const DEFAULT_MOVE_LIMIT: u32 = 1_000;
const DEFAULT_LATENCY_BUDGET_MS: u64 = 250;
const MAX_SEARCH_DEPTH: u32 = 7;
const RUN_ID_ALLOWED: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789._-";

/// Root benchmark configuration loaded from YAML.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct BenchmarkConfig {
    pub run_id: String,
    #[serde(default)]
    pub games: GamesConfig,
    #[serde(default)]
    pub search: SearchConfig,
    pub outputs: OutputsConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl BenchmarkConfig {
    /// Load configuration from a YAML file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let path_buf = path.to_path_buf();
        let file = File::open(path).map_err(|source| ConfigError::Read {
            source,
            path: path_buf.clone(),
        })?;
        let reader = BufReader::new(file);
        let mut cfg: BenchmarkConfig =
            serde_yaml::from_reader(reader).map_err(|source| ConfigError::Parse {
                source,
                path: path_buf.clone(),
            })?;
        cfg.validate().map_err(|source| ConfigError::Invalid {
            path: path_buf,
            source,
        })?;
        Ok(cfg)
    }

    /// Validate the configuration without performing I/O.
    pub fn validate(&mut self) -> Result<(), ValidationError> {
        validate_run_id(&self.run_id)?;
        self.games.validate()?;
        validate_search(&self.search)?;
        self.outputs.validate(&self.run_id)?;
        self.metrics.validate()?;
        self.logging.validate()?;
        Ok(())
    }

    /// Resolve output templates (e.g., `{run_id}` placeholders) into concrete paths.
    pub fn resolved_outputs(&self) -> ResolvedOutputs {
        ResolvedOutputs {
            jsonl: resolve_template(&self.run_id, &self.outputs.jsonl),
            summary_md: resolve_template(&self.run_id, &self.outputs.summary_md),
            plots_dir: resolve_template(&self.run_id, &self.outputs.plots_dir),
        }
    }
}

/// Game sampling configuration block.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct GamesConfig {
    pub seed: Option<u64>,
    #[serde(default = "default_game_count")]
    pub count: usize,
    #[serde(default = "default_move_limit")]
    pub move_limit: u32,
}

impl Default for GamesConfig {
    fn default() -> Self {
        Self {
            seed: None,
            count: DEFAULT_GAME_COUNT,
            move_limit: DEFAULT_MOVE_LIMIT,
        }
    }
}

impl GamesConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.count == 0 {
            return Err(ValidationError::InvalidField {
                field: "games.count".to_string(),
                message: "number of games must be greater than zero".to_string(),
            });
        }

        if self.move_limit == 0 {
            return Err(ValidationError::InvalidField {
                field: "games.move_limit".to_string(),
                message: "move limit must be at least 1".to_string(),
            });
        }

        Ok(())
    }
}

fn default_game_count() -> usize {
    DEFAULT_GAME_COUNT
}

fn default_move_limit() -> u32 {
    DEFAULT_MOVE_LIMIT
}

fn validate_search(search: &SearchConfig) -> Result<(), ValidationError> {
    if search.max_depth == 0 || search.max_depth > MAX_SEARCH_DEPTH {
        return Err(ValidationError::InvalidField {
            field: "search.max_depth".to_string(),
            message: format!("depth must be between 1 and {MAX_SEARCH_DEPTH}"),
        });
    }

    if !search.weights.is_finite() {
        return Err(ValidationError::InvalidField {
            field: "search.weights".to_string(),
            message: "weights must be finite numbers".to_string(),
        });
    }

    Ok(())
}

/// Output artifact configuration.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct OutputsConfig {
    pub jsonl: String,
    pub summary_md: String,
    pub plots_dir: String,
}

impl OutputsConfig {
    fn validate(&self, run_id: &str) -> Result<(), ValidationError> {
        for (label, value) in [
            ("outputs.jsonl", &self.jsonl),
            ("outputs.summary_md", &self.summary_md),
            ("outputs.plots_dir", &self.plots_dir),
        ] {
            if value.trim().is_empty() {
                return Err(ValidationError::InvalidField {
                    field: label.to_string(),
                    message: "path must not be empty".to_string(),
                });
            }

            let resolved = resolve_template(run_id, value);
            if resolved.components().count() == 0 {
                return Err(ValidationError::InvalidField {
                    field: label.to_string(),
                    message: "resolved path is invalid".to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Metrics configuration block.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct MetricsConfig {
    #[serde(default = "default_latency_budget_ms")]
    pub latency_budget_ms: u64,
    /// Tile values whose reach rate is reported in the summary.
    #[serde(default = "default_milestones")]
    pub milestones: Vec<u32>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            latency_budget_ms: DEFAULT_LATENCY_BUDGET_MS,
            milestones: default_milestones(),
        }
    }
}

impl MetricsConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.latency_budget_ms == 0 {
            return Err(ValidationError::InvalidField {
                field: "metrics.latency_budget_ms".to_string(),
                message: "latency budget must be greater than zero".to_string(),
            });
        }

        if let Some(bad) = self
            .milestones
            .iter()
            .find(|&&tile| tile < 4 || !tile.is_power_of_two())
        {
            return Err(ValidationError::InvalidField {
                field: "metrics.milestones".to_string(),
                message: format!("milestone {bad} is not a reachable tile value"),
            });
        }

        Ok(())
    }
}

fn default_latency_budget_ms() -> u64 {
    DEFAULT_LATENCY_BUDGET_MS
}

fn default_milestones() -> Vec<u32> {
    vec![512, 1024, 2048]
}

/// Logging configuration defaults to disabled structured logs.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LoggingConfig {
    #[serde(default)]
    pub enable_structured: bool,
    #[serde(default = "default_tracing_level")]
    pub tracing_level: String,
    /// Emit one telemetry event per move instead of one per game.
    #[serde(default)]
    pub turn_details: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enable_structured: false,
            tracing_level: default_tracing_level(),
            turn_details: false,
        }
    }
}

impl LoggingConfig {
    fn validate(&mut self) -> Result<(), ValidationError> {
        if self.tracing_level.trim().is_empty() {
            self.tracing_level = default_tracing_level();
        }
        if self.level().is_none() {
            return Err(ValidationError::InvalidField {
                field: "logging.tracing_level".to_string(),
                message: format!(
                    "unknown level '{}' (expected trace, debug, info, warn or error)",
                    self.tracing_level
                ),
            });
        }
        Ok(())
    }

    pub fn level(&self) -> Option<Level> {
        match self.tracing_level.trim().to_ascii_lowercase().as_str() {
            "trace" => Some(Level::TRACE),
            "debug" => Some(Level::DEBUG),
            "info" => Some(Level::INFO),
            "warn" | "warning" => Some(Level::WARN),
            "error" => Some(Level::ERROR),
            _ => None,
        }
    }
}

fn default_tracing_level() -> String {
    "info".to_string()
}

fn validate_run_id(run_id: &str) -> Result<(), ValidationError> {
    if run_id.trim().is_empty() {
        return Err(ValidationError::InvalidField {
            field: "run_id".to_string(),
            message: "run_id must not be empty".to_string(),
        });
    }

    if !run_id.chars().all(|c| RUN_ID_ALLOWED.contains(c)) {
        return Err(ValidationError::InvalidField {
            field: "run_id".to_string(),
            message: "run_id may only contain alphanumeric characters, '.', '_' or '-'".to_string(),
        });
    }

    Ok(())
}

fn resolve_template(run_id: &str, template: &str) -> PathBuf {
    let replaced = template.replace("{run_id}", run_id);
    PathBuf::from(replaced)
}

/// Fully resolved output paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOutputs {
    pub jsonl: PathBuf,
    pub summary_md: PathBuf,
    pub plots_dir: PathBuf,
}

/// Errors surfaced when loading configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
    #[error("failed to parse config {path:?}: {source}")]
    Parse {
        #[source]
        source: serde_yaml::Error,
        path: PathBuf,
    },
    #[error("invalid configuration in {path:?}: {source}")]
    Invalid {
        path: PathBuf,
        source: ValidationError,
    },
}

/// Validation failures captured with contextual metadata.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field}: {message}")]
    InvalidField { field: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use tiles_bot::TableLifetime;

    const BASIC_YAML: &str = r#"
run_id: "depth3_smoke"
games:
  seed: 123
  count: 4
search:
  max_depth: 3
  weights:
    smoothness: 0.2
outputs:
  jsonl: "bench/out/{run_id}/games.jsonl"
  summary_md: "bench/out/{run_id}/summary.md"
  plots_dir: "bench/out/{run_id}/plots"
logging:
  enable_structured: true
  tracing_level: "debug"
"#;

    #[test]
    fn loads_and_validates_basic_config() {
        let mut cfg: BenchmarkConfig = serde_yaml::from_str(BASIC_YAML).expect("parse yaml");
        cfg.validate().expect("validate");

        assert_eq!(cfg.games.move_limit, DEFAULT_MOVE_LIMIT);
        assert_eq!(cfg.metrics.latency_budget_ms, DEFAULT_LATENCY_BUDGET_MS);
        assert_eq!(cfg.metrics.milestones, vec![512, 1024, 2048]);
        assert!(cfg.logging.enable_structured);
        assert_eq!(cfg.logging.level(), Some(Level::DEBUG));

        let outputs = cfg.resolved_outputs();
        assert_eq!(
            outputs.jsonl,
            PathBuf::from("bench/out/depth3_smoke/games.jsonl")
        );
    }

    #[test]
    fn partial_weights_keep_defaults() {
        let cfg: BenchmarkConfig = serde_yaml::from_str(BASIC_YAML).expect("parse");
        assert_eq!(cfg.search.weights.smoothness, 0.2);
        assert_eq!(cfg.search.weights.empty, 2.7);
        assert_eq!(cfg.search.weights.monotonicity, 1.0);
        assert_eq!(cfg.search.table_lifetime, TableLifetime::Game);
    }

    #[test]
    fn search_block_is_optional() {
        let yaml = BASIC_YAML.replace(
            "search:\n  max_depth: 3\n  weights:\n    smoothness: 0.2\n",
            "",
        );
        let mut cfg: BenchmarkConfig = serde_yaml::from_str(&yaml).expect("parse");
        cfg.validate().expect("valid");
        assert_eq!(cfg.search, SearchConfig::default());
    }

    #[test]
    fn rejects_zero_depth() {
        let yaml = BASIC_YAML.replace("max_depth: 3", "max_depth: 0");
        let mut cfg: BenchmarkConfig = serde_yaml::from_str(&yaml).expect("parse");
        let err = cfg.validate().expect_err("should fail");
        assert!(matches!(
            err,
            ValidationError::InvalidField { field, .. } if field == "search.max_depth"
        ));
    }

    #[test]
    fn rejects_zero_games() {
        let yaml = BASIC_YAML.replace("count: 4", "count: 0");
        let mut cfg: BenchmarkConfig = serde_yaml::from_str(&yaml).expect("parse");
        let err = cfg.validate().expect_err("zero games should fail");
        assert!(matches!(
            err,
            ValidationError::InvalidField { field, .. } if field == "games.count"
        ));
    }

    #[test]
    fn rejects_invalid_milestone() {
        let yaml = format!("{BASIC_YAML}metrics:\n  milestones: [512, 1000]\n");
        let mut cfg: BenchmarkConfig = serde_yaml::from_str(&yaml).expect("parse");
        let err = cfg.validate().expect_err("1000 is not a tile");
        assert!(matches!(
            err,
            ValidationError::InvalidField { field, .. } if field == "metrics.milestones"
        ));
    }

    #[test]
    fn rejects_unknown_tracing_level() {
        let yaml = BASIC_YAML.replace("tracing_level: \"debug\"", "tracing_level: \"verbose\"");
        let mut cfg: BenchmarkConfig = serde_yaml::from_str(&yaml).expect("parse");
        let err = cfg.validate().expect_err("verbose is not a level");
        assert!(matches!(
            err,
            ValidationError::InvalidField { field, .. } if field == "logging.tracing_level"
        ));
    }

    #[test]
    fn blank_tracing_level_falls_back_to_info() {
        let yaml = BASIC_YAML.replace("tracing_level: \"debug\"", "tracing_level: \"  \"");
        let mut cfg: BenchmarkConfig = serde_yaml::from_str(&yaml).expect("parse");
        cfg.validate().expect("valid");
        assert_eq!(cfg.logging.level(), Some(Level::INFO));
    }

    #[test]
    fn rejects_invalid_run_id() {
        let yaml = BASIC_YAML.replace("depth3_smoke", "depth 3 smoke");
        let mut cfg: BenchmarkConfig = serde_yaml::from_str(&yaml).expect("parse");
        let err = cfg.validate().expect_err("invalid run id");
        assert!(matches!(
            err,
            ValidationError::InvalidField { field, .. } if field == "run_id"
        ));
    }

    #[test]
    fn outputs_resolve_template_multiple_occurrences() {
        let yaml = BASIC_YAML.replace(
            "bench/out/{run_id}/plots",
            "bench/out/{run_id}/{run_id}/plots",
        );
        let mut cfg: BenchmarkConfig = serde_yaml::from_str(&yaml).expect("parse");
        cfg.validate().expect("valid");
        let outputs = cfg.resolved_outputs();
        assert_eq!(
            outputs.plots_dir,
            PathBuf::from("bench/out/depth3_smoke/depth3_smoke/plots")
        );
    }
}
