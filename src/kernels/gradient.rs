//! Scalar gradient rules shared by every execution path.
//!
//! The sequential kernels, the lane-cooperative kernels and the WGSL shader
//! all derive `g` from a dot product with exactly these rules; only the
//! summation order of the dot product itself differs between paths.

use crate::tables::{ExpTable, MAX_EXP};

/// Hierarchical-softmax gradient for one tree node.
///
/// Returns `None` when the round must be skipped: `dot` outside
/// `[-MAX_EXP, MAX_EXP)`, a bucket past the end of the table, or a NaN dot.
#[inline]
pub fn hierarchic_gradient(dot: f32, code: u8, alpha: f32, exp_table: &ExpTable<'_>) -> Option<f32> {
    if dot.is_nan() || dot < -MAX_EXP || dot >= MAX_EXP {
        return None;
    }
    let f = exp_table.get(exp_table.bucket(dot)?);
    Some((1.0 - code as f32 - f) * alpha)
}

/// Negative-sampling gradient for one target.
///
/// Saturated dot products use the limit of the sigmoid instead of the table.
/// Only the in-range case can be skipped, when its bucket falls past the end
/// of the table. A NaN dot is skipped as well.
#[inline]
pub fn negative_gradient(dot: f32, code: u8, alpha: f32, exp_table: &ExpTable<'_>) -> Option<f32> {
    let label = code as f32;
    if dot.is_nan() {
        None
    } else if dot > MAX_EXP {
        Some((label - 1.0) * alpha)
    } else if dot < -MAX_EXP {
        Some(label * alpha)
    } else {
        let f = exp_table.get(exp_table.bucket(dot)?);
        Some((label - f) * alpha)
    }
}
