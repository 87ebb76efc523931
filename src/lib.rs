//! # aggregate-ops - fused word2vec training kernels
//!
//! Execution engine for the inner update math of SkipGram and CBOW training
//! with hierarchical softmax (HS) and negative sampling (NS).
//!
//! ## Overview
//!
//! One *aggregate* is a self-contained training invocation: the embedding
//! side (a center word's `syn0` row, or the averaged CBOW context) is trained
//! against a sequence of rounds, each a dot product, a sigmoid-table lookup
//! and two vector updates. The accumulated gradient `neu1e` is written back
//! to `syn0` once at the end.
//!
//! ## Key Features
//!
//! - **Sequential path**: unrolled, auto-vectorized loops on one thread
//! - **Cooperative path**: one invocation split across a group of lanes
//!   synchronized by barriers; many groups train concurrently (Hogwild)
//! - **GPU path** (feature `gpu`): one wgpu workgroup per invocation
//! - **Deterministic negative sampling** from word2vec's 64-bit LCG
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use aggregate_ops::{Aggregate, Executor, ExpTable, HsPath, NegTable, NegativeRounds,
//!     SequentialExecutor, SkipGram, Tables, Weights};
//!
//! let mut weights = Weights::new(&mut syn0, &mut syn1, &mut syn1_neg, vector_length)?;
//! let tables = Tables::new(ExpTable::new(&exp_table)?, NegTable::new(&neg_table)?);
//!
//! let op: Aggregate = SkipGram::new(word, 0.025)
//!     .with_path(HsPath::new(points, codes))
//!     .with_negative(NegativeRounds::new(5, target, next_random))
//!     .into();
//!
//! SequentialExecutor::new().execute(&mut weights, &tables, &op)?;
//! ```
//!
//! ## Architecture
//!
//! - [`tables`] and [`weights`] - borrowed views over the caller's buffers
//! - [`kernels`] - dot/axpy, gradient rules, HS/NS steps, negative sampler
//! - [`aggregate`] - descriptors and the sequential orchestrators
//! - [`lanes`] - the cooperative-parallel path
//! - [`exec`] - the [`Executor`] trait and its implementations
//! - [`accel`] - wgpu compute shader (feature `gpu`)
//! - [`synthetic`] - seeded workloads for benchmarks and tests

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod accel;
pub mod aggregate;
pub mod config;
pub mod error;
pub mod exec;
pub mod kernels;
pub mod lanes;
pub mod synthetic;
pub mod tables;
pub mod weights;

// Re-export commonly used types
pub use aggregate::{Aggregate, Cbow, HsPath, NegativeRounds, Scratch, SkipGram};
pub use config::{Backend, Config, ExecutionConfig, WorkloadConfig};
pub use error::{AggregateError, Result};
pub use exec::{CooperativeExecutor, Executor, SequentialExecutor};
pub use kernels::{HierarchicSoftmax, NegativeSampler, NegativeSampling};
pub use synthetic::{BatchGenerator, Workload};
pub use tables::{ExpTable, NegTable, Tables, MAX_EXP};
pub use weights::{Layout, Weights};

#[cfg(feature = "gpu")]
pub use exec::GpuExecutor;

// GPU acceleration (requires "gpu" feature)
pub use accel::GpuAccelerator;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_stub_matches_feature() {
        if !cfg!(feature = "gpu") {
            assert!(!GpuAccelerator::is_available());
        }
    }
}
