//! Configuration (design component G).
//!
//! Core fields (`pollRateMS`, `maxHistoryLength`, `globalMetrics`,
//! `detailMetrics`, `printGlobalToConsole`, `printDetailToConsole`) plus the
//! ambient `output_dir` the binary needs to lay out the CSV tree. Metric
//! names are validated against [`crate::estats::resolve_family`] at
//! construction time so an unknown name surfaces as a configuration error
//! before the polling loop ever starts, not on the first tick.

use std::path::PathBuf;

use crate::error::{CollectorError, Result};
use crate::estats;

#[derive(Debug, Clone)]
pub struct Config {
    /// Milliseconds between ticks.
    pub poll_rate_ms: u64,
    /// Upper bound on samples retained per metric history before the
    /// oldest is evicted.
    pub max_history_length: usize,
    /// Metric names summarized across all connections each tick.
    pub global_metrics: Vec<String>,
    /// Metric names summarized per connection each tick.
    pub detail_metrics: Vec<String>,
    /// Render the global summary table to the terminal each tick.
    pub print_global_to_console: bool,
    /// Render the per-connection detail tables to the terminal each tick.
    pub print_detail_to_console: bool,
    /// Base directory for the long-form CSVs and `LiveData/`.
    pub output_dir: PathBuf,
}

impl Config {
    /// Validate that every configured metric name resolves to a known
    /// family, returning the first unresolved name as a configuration
    /// error (§4.H).
    pub fn validate(&self) -> Result<()> {
        for name in self.global_metrics.iter().chain(self.detail_metrics.iter()) {
            if estats::resolve_family(name).is_none() {
                return Err(CollectorError::UnknownMetric(name.clone()));
            }
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            poll_rate_ms: 1000,
            max_history_length: 10,
            global_metrics: Vec::new(),
            detail_metrics: Vec::new(),
            print_global_to_console: false,
            print_detail_to_console: false,
            output_dir: PathBuf::from("."),
        }
    }
}
