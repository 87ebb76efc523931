//! Hardware acceleration for aggregate batches.
//!
//! # Architecture
//!
//! - GPU backend uses wgpu (Metal on macOS, Vulkan on Linux/Windows)
//! - One compute workgroup per invocation; workgroup memory replaces the
//!   shared scratch of the CPU lane groups
//! - Without the `gpu` feature a stub reports the accelerator as unavailable
//!
//! # Performance
//!
//! Matrices are uploaded and read back on every batch, so the GPU only wins
//! on large batches. For small workloads the cooperative CPU path (in
//! [`crate::lanes`]) is faster.
//!
//! # Usage
//!
//! ```rust,ignore
//! use aggregate_ops::accel::GpuAccelerator;
//!
//! if GpuAccelerator::is_available() {
//!     let gpu = GpuAccelerator::new()?;
//!     gpu.run_batch(&mut weights, &tables, &batch)?;
//! }
//! ```

#[cfg(feature = "gpu")]
mod shaders;

#[cfg(feature = "gpu")]
pub mod gpu;

#[cfg(feature = "gpu")]
pub use gpu::{GpuAccelerator, GpuError};

#[cfg(feature = "gpu")]
pub use shaders::{LANES, MAX_VECTOR_LENGTH};

// Re-export a CPU-only stub when GPU feature is disabled
#[cfg(not(feature = "gpu"))]
mod stub {
    /// Stub accelerator when GPU feature is disabled
    pub struct GpuAccelerator;

    impl GpuAccelerator {
        /// Check if GPU acceleration is available.
        /// Always returns false when the `gpu` feature is disabled.
        pub fn is_available() -> bool {
            false
        }
    }
}

#[cfg(not(feature = "gpu"))]
pub use stub::GpuAccelerator;
