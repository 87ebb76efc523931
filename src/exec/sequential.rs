use super::Executor;
use crate::aggregate::{validate_batch, Aggregate, Scratch};
use crate::error::Result;
use crate::tables::Tables;
use crate::weights::Weights;
use log::debug;

/// Runs a batch in order on the calling thread.
///
/// Deterministic: the same inputs always produce bit-identical matrices.
/// Descriptors are validated in debug builds only; in release builds a bad
/// row index panics on the slice bounds check instead of returning an error.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequentialExecutor;

impl SequentialExecutor {
    /// Creates the executor.
    pub fn new() -> Self {
        Self
    }
}

impl Executor for SequentialExecutor {
    fn name(&self) -> &'static str {
        "sequential"
    }

    fn execute_batch(&self, weights: &mut Weights<'_>, tables: &Tables<'_>, batch: &[Aggregate]) -> Result<()> {
        let layout = weights.layout();
        if cfg!(debug_assertions) {
            validate_batch(batch, &layout, tables)?;
        }
        debug!("Sequential batch: {} invocations, vector_length {}", batch.len(), layout.vector_length);

        let mut scratch = Scratch::new(layout.vector_length);
        for op in batch {
            op.run(weights, tables, &mut scratch);
        }
        Ok(())
    }
}
