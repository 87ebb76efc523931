use super::Executor;
use crate::aggregate::{validate_batch, Aggregate};
use crate::error::{AggregateError, Result};
use crate::lanes::{self, LaneGroup, SharedWeights};
use crate::tables::Tables;
use crate::weights::Weights;
use log::debug;
use rayon::prelude::*;

/// Runs a batch on lane groups.
///
/// The batch is cut into `groups` contiguous chunks which rayon distributes;
/// each chunk runs in order on its own group of `lanes` threads. With
/// `groups > 1` chunks train concurrently and may lose each other's updates
/// to shared rows (Hogwild).
#[derive(Debug, Clone, Copy)]
pub struct CooperativeExecutor {
    lanes: usize,
    groups: usize,
}

impl CooperativeExecutor {
    /// Creates an executor with `lanes` threads per group and at most
    /// `groups` concurrent groups. Zero values are raised to one.
    pub fn new(lanes: usize, groups: usize) -> Self {
        Self {
            lanes: lanes.max(1),
            groups: groups.max(1),
        }
    }

    /// Creates an executor, rejecting zero lanes or groups.
    pub fn try_new(lanes: usize, groups: usize) -> Result<Self> {
        if lanes == 0 {
            return Err(AggregateError::Config("lanes must be at least 1".to_string()));
        }
        if groups == 0 {
            return Err(AggregateError::Config("groups must be at least 1".to_string()));
        }
        Ok(Self { lanes, groups })
    }

    /// Threads per lane group.
    pub fn lanes(&self) -> usize {
        self.lanes
    }

    /// Maximum number of concurrent lane groups.
    pub fn groups(&self) -> usize {
        self.groups
    }
}

impl Executor for CooperativeExecutor {
    fn name(&self) -> &'static str {
        "cooperative"
    }

    fn execute_batch(&self, weights: &mut Weights<'_>, tables: &Tables<'_>, batch: &[Aggregate]) -> Result<()> {
        // A lane that panics would leave its group blocked on the barrier.
        validate_batch(batch, &weights.layout(), tables)?;
        if batch.is_empty() {
            return Ok(());
        }

        let chunk_len = batch.len().div_ceil(self.groups);
        debug!(
            "Cooperative batch: {} invocations in {} chunks of {} lanes",
            batch.len(),
            batch.len().div_ceil(chunk_len),
            self.lanes
        );

        let shared = SharedWeights::new(weights);
        let group = LaneGroup::new(self.lanes);
        batch
            .par_chunks(chunk_len)
            .for_each(|chunk| lanes::run_batch(&group, &shared, tables, chunk));
        Ok(())
    }
}
