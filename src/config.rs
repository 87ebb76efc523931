//! Configuration for the aggregate-operation engine.

use crate::error::{AggregateError, Result};
use crate::exec::{CooperativeExecutor, Executor, SequentialExecutor};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Execution-path configuration.
    pub execution: ExecutionConfig,

    /// Synthetic workload configuration (benchmarks and parity checks).
    pub workload: WorkloadConfig,
}

impl Config {
    /// Parses a JSON configuration. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(AggregateError::FileNotFound(path.to_path_buf()));
        }
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    /// Serializes the configuration as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Checks value ranges.
    pub fn validate(&self) -> Result<()> {
        self.execution.validate()?;
        self.workload.validate()
    }

    /// Builds the executor selected by [`ExecutionConfig::backend`].
    pub fn executor(&self) -> Result<Box<dyn Executor>> {
        self.execution.executor()
    }
}

/// Which execution path runs the batches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// One invocation after another on the calling thread.
    Sequential,
    /// Lane groups of OS threads.
    #[default]
    Cooperative,
    /// wgpu compute shader (requires the `gpu` feature).
    Gpu,
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Backend::Sequential => write!(f, "sequential"),
            Backend::Cooperative => write!(f, "cooperative"),
            Backend::Gpu => write!(f, "gpu"),
        }
    }
}

impl std::str::FromStr for Backend {
    type Err = AggregateError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "sequential" => Ok(Backend::Sequential),
            "cooperative" => Ok(Backend::Cooperative),
            "gpu" => Ok(Backend::Gpu),
            other => Err(AggregateError::Config(format!("unknown backend '{other}'"))),
        }
    }
}

/// Execution-path configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Execution path.
    /// Default: cooperative.
    pub backend: Backend,

    /// Threads per lane group (cooperative path).
    /// Default: 4.
    pub lanes: usize,

    /// Concurrent lane groups per batch (cooperative path).
    /// Default: 0 (one per rayon worker thread).
    pub groups: usize,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Cooperative,
            lanes: 4,
            groups: 0,
        }
    }
}

impl ExecutionConfig {
    /// Checks value ranges.
    pub fn validate(&self) -> Result<()> {
        if self.lanes == 0 {
            return Err(AggregateError::Config("execution.lanes must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Number of lane groups, resolving 0 to the rayon pool size.
    pub fn effective_groups(&self) -> usize {
        if self.groups == 0 {
            rayon::current_num_threads().max(1)
        } else {
            self.groups
        }
    }

    /// Builds the executor for [`ExecutionConfig::backend`].
    pub fn executor(&self) -> Result<Box<dyn Executor>> {
        self.validate()?;
        match self.backend {
            Backend::Sequential => Ok(Box::new(SequentialExecutor::new())),
            Backend::Cooperative => Ok(Box::new(CooperativeExecutor::try_new(
                self.lanes,
                self.effective_groups(),
            )?)),
            #[cfg(feature = "gpu")]
            Backend::Gpu => Ok(Box::new(crate::exec::GpuExecutor::new()?)),
            #[cfg(not(feature = "gpu"))]
            Backend::Gpu => Err(AggregateError::Config(
                "the gpu backend requires building with the `gpu` feature".to_string(),
            )),
        }
    }
}

/// Synthetic workload configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkloadConfig {
    /// Number of `syn0` rows.
    /// Default: 10,000.
    pub vocab_size: usize,

    /// Columns per row.
    /// Default: 100.
    pub vector_length: usize,

    /// Descriptors per batch.
    /// Default: 1,024.
    pub batch_size: usize,

    /// Batches per run.
    /// Default: 10.
    pub iterations: usize,

    /// Hierarchical-softmax rounds per descriptor (Huffman path length).
    /// Default: 8.
    pub hs_depth: usize,

    /// Negative-sampling rounds per descriptor. 0 disables negative sampling.
    /// Default: 5.
    pub negative_rounds: usize,

    /// Context rows per CBOW descriptor.
    /// Default: 4.
    pub context_window: usize,

    /// Fraction of descriptors that are CBOW rather than SkipGram.
    /// Default: 0.5.
    pub cbow_fraction: f64,

    /// Learning rate.
    /// Default: 0.025.
    pub alpha: f32,

    /// Sigmoid table entries.
    /// Default: 1,000.
    pub exp_table_size: usize,

    /// Negative table entries.
    /// Default: 100,000.
    pub neg_table_size: usize,

    /// Random seed for reproducibility.
    /// Default: 42.
    pub seed: u64,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            vocab_size: 10_000,
            vector_length: 100,
            batch_size: 1_024,
            iterations: 10,
            hs_depth: 8,
            negative_rounds: 5,
            context_window: 4,
            cbow_fraction: 0.5,
            alpha: 0.025,
            exp_table_size: crate::tables::DEFAULT_EXP_TABLE_SIZE,
            neg_table_size: 100_000,
            seed: 42,
        }
    }
}

impl WorkloadConfig {
    /// Checks value ranges.
    pub fn validate(&self) -> Result<()> {
        if self.vocab_size < 2 {
            return Err(AggregateError::Config("workload.vocab_size must be at least 2".to_string()));
        }
        if self.vector_length == 0 {
            return Err(AggregateError::Config("workload.vector_length must be at least 1".to_string()));
        }
        if self.exp_table_size == 0 || self.neg_table_size == 0 {
            return Err(AggregateError::Config("workload table sizes must be at least 1".to_string()));
        }
        if !(0.0..=1.0).contains(&self.cbow_fraction) {
            return Err(AggregateError::Config(format!(
                "workload.cbow_fraction must be within [0, 1], got {}",
                self.cbow_fraction
            )));
        }
        Ok(())
    }
}
