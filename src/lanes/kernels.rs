//! Lane-cooperative forms of the vector kernels and of one training round.

use super::atomic::AtomicF32;
use super::group::Lane;
use super::shared::{RoundKind, SharedScratch};
use crate::kernels::gradient::{hierarchic_gradient, negative_gradient};
use crate::tables::ExpTable;

/// Cooperative `Σ x[i] * y[i]`; every lane returns the same value.
///
/// The leader zeroes `acc`, each lane folds its strided partial sum in with
/// one atomic add, and the result is read after the barrier. The caller must
/// pass at least one more barrier before `acc` is reused.
pub fn dot(lane: &Lane<'_>, x: &[AtomicF32], y: &[AtomicF32], acc: &AtomicF32) -> f32 {
    lane.publish(|| acc.store(0.0));

    let partial: f32 = lane.indices(x.len()).map(|i| x[i].load() * y[i].load()).sum();
    acc.fetch_add(partial);
    lane.sync();

    acc.load()
}

/// Cooperative `y[i] += alpha * x[i]`.
pub fn axpy(lane: &Lane<'_>, alpha: f32, x: &[AtomicF32], y: &[AtomicF32]) {
    lane.parallel(x.len(), |i| y[i].add(alpha * x[i].load()));
}

/// Runs the round the leader has published in `scratch.round`.
///
/// `target` is the published row. The leader derives `g` from the dot product
/// and publishes it; a skipped round leaves every buffer untouched.
pub fn round(
    lane: &Lane<'_>,
    embedding: &[AtomicF32],
    target: &[AtomicF32],
    alpha: f32,
    exp_table: &ExpTable<'_>,
    scratch: &SharedScratch,
) {
    let state = &scratch.round;
    let dot = dot(lane, embedding, target, &scratch.dot);

    lane.publish(|| {
        let g = match state.kind() {
            RoundKind::Hierarchic => hierarchic_gradient(dot, state.code(), alpha, exp_table),
            RoundKind::Negative => negative_gradient(dot, state.code(), alpha, exp_table),
            RoundKind::Done => None,
        };
        state.set_gradient(g);
    });

    if let Some(g) = state.gradient() {
        axpy(lane, g, target, &scratch.neu1e);
        axpy(lane, g, embedding, target);
    }
}
