//! Sequential aggregate kernels.
//!
//! - [`dot`] and [`axpy`]: generic vector building blocks
//! - [`HierarchicSoftmax`]: one step along a Huffman tree node
//! - [`NegativeSampling`]: one step against a positive or negative target
//! - [`NegativeSampler`]: deterministic selection of negative-sampling targets
//!
//! The lane-cooperative counterparts live in [`crate::lanes`].

pub mod gradient;
mod hierarchic_softmax;
mod negative_sampling;
pub mod sampler;
pub mod simd;

pub use hierarchic_softmax::HierarchicSoftmax;
pub use negative_sampling::NegativeSampling;
pub use sampler::{NegativeSampler, NextRandom, Target};

/// `Σ x[i] * y[i]`.
#[inline]
pub fn dot(x: &[f32], y: &[f32]) -> f32 {
    simd::dot_f32(x, y)
}

/// `y[i] += alpha * x[i]` in place.
#[inline]
pub fn axpy(alpha: f32, x: &[f32], y: &mut [f32]) {
    simd::axpy_f32(alpha, x, y)
}
