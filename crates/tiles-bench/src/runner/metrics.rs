use std::time::Duration;

use tiles_bot::SearchStats;

/// Accumulates wall-clock time and search effort across one game's decisions.
#[derive(Default)]
pub struct DecisionMetrics {
    total: Duration,
    decisions: u32,
    nodes: u64,
    cache_hits: u64,
}

impl DecisionMetrics {
    /// Record one decision, returning its duration in milliseconds.
    pub fn record(&mut self, duration: Duration, stats: &SearchStats) -> f64 {
        self.total += duration;
        self.decisions += 1;
        self.nodes += stats.nodes;
        self.cache_hits += stats.cache_hits;
        duration.as_secs_f64() * 1000.0
    }

    pub fn finalize(self) -> DecisionSummary {
        let total_ms = self.total.as_secs_f64() * 1000.0;
        let avg_ms = if self.decisions == 0 {
            0.0
        } else {
            total_ms / f64::from(self.decisions)
        };

        DecisionSummary {
            decisions: self.decisions,
            avg_ms_per_decision: avg_ms,
            total_ms,
            nodes: self.nodes,
            cache_hits: self.cache_hits,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DecisionSummary {
    pub decisions: u32,
    pub avg_ms_per_decision: f64,
    pub total_ms: f64,
    pub nodes: u64,
    pub cache_hits: u64,
}
