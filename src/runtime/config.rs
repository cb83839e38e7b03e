//! # Runtime Configuration
//!
//! [`RuntimeConfig`] controls the size of the worker pool, the actor table ceiling and
//! the scheduling policies. Every field has a default, so a TOML file only needs to
//! mention what it changes:
//!
//! ```toml
//! workers = 4
//! max_actors = 1024
//! pin_threads = false
//! sweep = "handoff"
//! batch_policy = "first_non_complete"
//! ```

use crate::framework::error::RuntimeError;
use crate::framework::message::ProcessResult;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// How a worker walks the actor table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepStrategy {
    /// Snapshot the table under a read lock, drain with no table lock held, then erase
    /// every poisoned actor in one write-locked pass at the end of the sweep.
    #[default]
    Deferred,
    /// Hold the read lock while walking the table, hand it off around each actor's
    /// batch, and step up to a write lock to erase each poisoned slot on the spot.
    Handoff,
}

/// Which result a batch reports when several messages in it did not return `Complete`.
///
/// A `Poisoned` result always ends the batch immediately, whatever the policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchPolicy {
    #[default]
    LastNonComplete,
    FirstNonComplete,
}

impl BatchPolicy {
    /// Folds one message result into the batch outcome so far.
    pub fn fold(self, outcome: ProcessResult, next: ProcessResult) -> ProcessResult {
        if next == ProcessResult::Complete {
            return outcome;
        }
        match self {
            BatchPolicy::LastNonComplete => next,
            BatchPolicy::FirstNonComplete if outcome == ProcessResult::Complete => next,
            BatchPolicy::FirstNonComplete => outcome,
        }
    }
}

/// Settings for a [`WorkerPool`](crate::runtime::WorkerPool).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Number of worker threads.
    pub workers: usize,
    /// Table ceiling; registering past it fails.
    pub max_actors: usize,
    /// Pin worker N to logical CPU N (best effort).
    pub pin_threads: bool,
    /// Worker threads are named `{thread_prefix}{index}`.
    pub thread_prefix: String,
    pub sweep: SweepStrategy,
    pub batch_policy: BatchPolicy,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            workers: num_cpus::get().saturating_sub(1).max(1),
            max_actors: 4096,
            pin_threads: true,
            thread_prefix: "worker".to_string(),
            sweep: SweepStrategy::default(),
            batch_policy: BatchPolicy::default(),
        }
    }
}

impl RuntimeConfig {
    /// Parses a TOML document; missing keys keep their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, RuntimeError> {
        let config: Self = toml::from_str(text).map_err(|e| RuntimeError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RuntimeError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| RuntimeError::Config(format!("{}: {}", path.display(), e)))?;
        let config = Self::from_toml_str(&text)?;
        info!(path = %path.display(), workers = config.workers, "Loaded runtime config");
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), RuntimeError> {
        if self.workers == 0 {
            return Err(RuntimeError::Config("workers must be at least 1".into()));
        }
        if self.max_actors == 0 {
            return Err(RuntimeError::Config("max_actors must be at least 1".into()));
        }
        Ok(())
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_max_actors(mut self, max_actors: usize) -> Self {
        self.max_actors = max_actors;
        self
    }

    pub fn with_pin_threads(mut self, pin_threads: bool) -> Self {
        self.pin_threads = pin_threads;
        self
    }

    pub fn with_thread_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_prefix = prefix.into();
        self
    }

    pub fn with_sweep(mut self, sweep: SweepStrategy) -> Self {
        self.sweep = sweep;
        self
    }

    pub fn with_batch_policy(mut self, batch_policy: BatchPolicy) -> Self {
        self.batch_policy = batch_policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_gives_defaults() {
        let config = RuntimeConfig::from_toml_str("").unwrap();
        assert_eq!(config, RuntimeConfig::default());
        assert!(config.workers >= 1);
    }

    #[test]
    fn partial_document_overrides_named_keys() {
        let config = RuntimeConfig::from_toml_str(
            r#"
            workers = 3
            sweep = "handoff"
            batch_policy = "first_non_complete"
            "#,
        )
        .unwrap();

        assert_eq!(config.workers, 3);
        assert_eq!(config.sweep, SweepStrategy::Handoff);
        assert_eq!(config.batch_policy, BatchPolicy::FirstNonComplete);
        assert_eq!(config.max_actors, 4096);
    }

    #[test]
    fn zero_workers_is_rejected() {
        let err = RuntimeConfig::from_toml_str("workers = 0").unwrap_err();
        assert!(matches!(err, RuntimeError::Config(_)));
    }

    #[test]
    fn unknown_sweep_is_rejected() {
        assert!(RuntimeConfig::from_toml_str(r#"sweep = "sideways""#).is_err());
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let err = RuntimeConfig::load("/nonexistent/actor-pool.toml").unwrap_err();
        assert!(matches!(err, RuntimeError::Config(_)));
    }

    #[test]
    fn batch_policies_differ_only_on_repeats() {
        use ProcessResult::*;

        let last = BatchPolicy::LastNonComplete;
        let first = BatchPolicy::FirstNonComplete;

        assert_eq!(last.fold(Complete, Complete), Complete);
        assert_eq!(first.fold(Complete, Error), Error);
        assert_eq!(last.fold(Error, Skipped), Skipped);
        assert_eq!(first.fold(Error, Skipped), Error);
        assert_eq!(last.fold(Error, Complete), Error);
    }
}
