//! Executors: uniform dispatch of aggregate batches to an execution path.
//!
//! - [`SequentialExecutor`]: one invocation after another on the calling thread
//! - [`CooperativeExecutor`]: rayon-distributed lane groups
//! - `GpuExecutor`: one wgpu workgroup per invocation (feature `gpu`)
//!
//! All three produce the same updates up to floating-point summation order.

mod cooperative;
#[cfg(feature = "gpu")]
mod gpu;
mod sequential;

pub use cooperative::CooperativeExecutor;
#[cfg(feature = "gpu")]
pub use gpu::GpuExecutor;
pub use sequential::SequentialExecutor;

use crate::aggregate::Aggregate;
use crate::error::Result;
use crate::tables::Tables;
use crate::weights::Weights;

/// Runs batches of aggregate descriptors against a set of matrices.
pub trait Executor: Send + Sync {
    /// Short name for logs and reports.
    fn name(&self) -> &'static str;

    /// Runs every descriptor of `batch` against `weights`.
    fn execute_batch(&self, weights: &mut Weights<'_>, tables: &Tables<'_>, batch: &[Aggregate]) -> Result<()>;

    /// Runs a single descriptor.
    fn execute(&self, weights: &mut Weights<'_>, tables: &Tables<'_>, op: &Aggregate) -> Result<()> {
        self.execute_batch(weights, tables, std::slice::from_ref(op))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{HsPath, SkipGram};
    use crate::tables::ExpTable;

    #[test]
    fn test_execute_single() {
        let syn0 = vec![1.0f32, 0.0, 0.0, 0.0];
        let syn1 = vec![0.0f32, 1.0, 0.0, 0.0];
        let syn1_neg: Vec<f32> = Vec::new();
        let exp_values = vec![0.5f32; 1000];
        let tables = Tables::hierarchic(ExpTable::new(&exp_values).unwrap());
        let op: Aggregate = SkipGram::new(0, 0.1).with_path(HsPath::new(vec![0], vec![1])).into();

        let executors: Vec<Box<dyn Executor>> =
            vec![Box::new(SequentialExecutor::new()), Box::new(CooperativeExecutor::new(3, 1))];
        for executor in executors {
            let (mut s0, mut s1, mut sn) = (syn0.clone(), syn1.clone(), syn1_neg.clone());
            {
                let mut weights = Weights::new(&mut s0, &mut s1, &mut sn, 4).unwrap();
                executor.execute(&mut weights, &tables, &op).unwrap();
            }
            assert!((s0[1] - (-0.05)).abs() < 1e-7, "{}", executor.name());
            assert!((s1[0] - (-0.05)).abs() < 1e-7, "{}", executor.name());
        }
    }
}
