use super::Executor;
use crate::accel::GpuAccelerator;
use crate::aggregate::{validate_batch, Aggregate};
use crate::error::Result;
use crate::tables::Tables;
use crate::weights::Weights;

/// Runs a batch as one wgpu dispatch, one workgroup per invocation.
///
/// Like groups on the CPU, workgroups are not coordinated with each other;
/// invocations sharing a row may lose updates.
pub struct GpuExecutor {
    accelerator: GpuAccelerator,
}

impl GpuExecutor {
    /// Acquires an adapter and compiles the shader.
    pub fn new() -> Result<Self> {
        Ok(Self {
            accelerator: GpuAccelerator::new()?,
        })
    }

    /// Wraps an existing accelerator.
    pub fn with_accelerator(accelerator: GpuAccelerator) -> Self {
        Self { accelerator }
    }
}

impl Executor for GpuExecutor {
    fn name(&self) -> &'static str {
        "gpu"
    }

    fn execute_batch(&self, weights: &mut Weights<'_>, tables: &Tables<'_>, batch: &[Aggregate]) -> Result<()> {
        // Out-of-range rows would read or write past the storage buffers.
        validate_batch(batch, &weights.layout(), tables)?;
        self.accelerator.run_batch(weights, tables, batch)?;
        Ok(())
    }
}
