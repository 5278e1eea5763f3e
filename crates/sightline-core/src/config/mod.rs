//! Search engine tuning configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default join budget for the row-population worker pool
pub const DEFAULT_JOIN_TIMEOUT_SECS: u64 = 20;

/// Default upper bound on concurrent population workers
pub const DEFAULT_MAX_WORKERS: usize = 16;

/// Row count under which population runs sequentially
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 8;

/// Tuning knobs for a search engine instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Seconds to wait for the population fan-out before failing the search
    pub join_timeout_secs: u64,
    /// Worker pool ceiling; the effective pool size is min(this, row count)
    pub max_workers: usize,
    /// Row sets at or below this size are populated on the calling task
    pub parallel_threshold: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            join_timeout_secs: DEFAULT_JOIN_TIMEOUT_SECS,
            max_workers: DEFAULT_MAX_WORKERS,
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
        }
    }
}

impl SearchConfig {
    /// Set the join timeout in seconds
    pub fn join_timeout_secs(mut self, secs: u64) -> Self {
        self.join_timeout_secs = secs;
        self
    }

    /// Set the worker pool ceiling
    pub fn max_workers(mut self, max: usize) -> Self {
        self.max_workers = max;
        self
    }

    /// Set the sequential-population threshold
    pub fn parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold;
        self
    }

    /// Join budget as a [`Duration`]
    pub fn join_timeout(&self) -> Duration {
        Duration::from_secs(self.join_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = SearchConfig::default();
        assert_eq!(config.join_timeout_secs, 20);
        assert_eq!(config.max_workers, 16);
        assert_eq!(config.parallel_threshold, 8);
        assert_eq!(config.join_timeout(), Duration::from_secs(20));
    }

    #[test]
    fn test_builder_overrides() {
        let config = SearchConfig::default()
            .join_timeout_secs(5)
            .max_workers(4)
            .parallel_threshold(0);
        assert_eq!(config.join_timeout_secs, 5);
        assert_eq!(config.max_workers, 4);
        assert_eq!(config.parallel_threshold, 0);
    }

    #[test]
    fn test_toml_round_trip() {
        let config = SearchConfig::default().max_workers(4);
        let text = toml::to_string(&config).expect("serialize config");
        let parsed: SearchConfig = toml::from_str(&text).expect("parse config");
        assert_eq!(parsed.max_workers, 4);
        assert_eq!(parsed.join_timeout_secs, config.join_timeout_secs);
    }
}
