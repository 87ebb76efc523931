//! Memory shared by the lanes of a group.

use super::atomic::{self, AtomicF32};
use crate::weights::{Layout, Weights};
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};

/// Atomic views over the caller's matrices.
///
/// Built from an exclusive [`Weights`] borrow, so nothing outside the lanes
/// can touch the matrices while the view exists.
pub struct SharedWeights<'a> {
    syn0: &'a [AtomicF32],
    syn1: &'a [AtomicF32],
    syn1_neg: &'a [AtomicF32],
    layout: Layout,
}

impl<'a> SharedWeights<'a> {
    /// Reinterprets the matrices of `weights` for the duration of the borrow.
    pub fn new(weights: &'a mut Weights<'_>) -> Self {
        let layout = weights.layout();
        Self {
            syn0: AtomicF32::from_mut_slice(&mut *weights.syn0),
            syn1: AtomicF32::from_mut_slice(&mut *weights.syn1),
            syn1_neg: AtomicF32::from_mut_slice(&mut *weights.syn1_neg),
            layout,
        }
    }

    /// Matrix dimensions.
    #[inline]
    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// Row of `syn0`.
    #[inline]
    pub fn syn0_row(&self, row: usize) -> &'a [AtomicF32] {
        &self.syn0[self.layout.row_range(row)]
    }

    /// Row of `syn1`.
    #[inline]
    pub fn syn1_row(&self, row: usize) -> &'a [AtomicF32] {
        &self.syn1[self.layout.row_range(row)]
    }

    /// Row of `syn1_neg`.
    #[inline]
    pub fn syn1_neg_row(&self, row: usize) -> &'a [AtomicF32] {
        &self.syn1_neg[self.layout.row_range(row)]
    }
}

/// Kind of the round published by the leader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RoundKind {
    /// No rounds left in this invocation.
    Done = 0,
    /// Hierarchical softmax against a `syn1` row.
    Hierarchic = 1,
    /// Negative sampling against a `syn1_neg` row.
    Negative = 2,
}

impl RoundKind {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => RoundKind::Hierarchic,
            2 => RoundKind::Negative,
            _ => RoundKind::Done,
        }
    }
}

/// Per-round state written by the leader and read by every lane.
#[derive(Debug, Default)]
pub struct RoundState {
    kind: AtomicU8,
    row: AtomicUsize,
    code: AtomicU8,
    g: AtomicF32,
    skip: AtomicBool,
}

impl RoundState {
    /// Publishes the next round's target.
    pub fn set_target(&self, kind: RoundKind, row: usize, code: u8) {
        self.kind.store(kind as u8, Ordering::Relaxed);
        self.row.store(row, Ordering::Relaxed);
        self.code.store(code, Ordering::Relaxed);
    }

    /// Publishes the round's gradient, or a skip.
    pub fn set_gradient(&self, g: Option<f32>) {
        self.g.store(g.unwrap_or(0.0));
        self.skip.store(g.is_none(), Ordering::Relaxed);
    }

    /// Kind of the published round.
    pub fn kind(&self) -> RoundKind {
        RoundKind::from_u8(self.kind.load(Ordering::Relaxed))
    }

    /// Target row of the published round.
    pub fn row(&self) -> usize {
        self.row.load(Ordering::Relaxed)
    }

    /// Label of the published round.
    pub fn code(&self) -> u8 {
        self.code.load(Ordering::Relaxed)
    }

    /// Published gradient, `None` if the round is skipped.
    pub fn gradient(&self) -> Option<f32> {
        if self.skip.load(Ordering::Relaxed) {
            None
        } else {
            Some(self.g.load())
        }
    }
}

/// Working memory of one lane group, reused by every invocation it runs.
pub struct SharedScratch {
    /// Averaged context (CBOW only).
    pub neu1: Vec<AtomicF32>,
    /// Accumulated gradient for the embedding side.
    pub neu1e: Vec<AtomicF32>,
    /// Dot-product accumulator.
    pub dot: AtomicF32,
    /// Current round.
    pub round: RoundState,
}

impl SharedScratch {
    /// Allocates zeroed scratch for vectors of `vector_length`.
    pub fn new(vector_length: usize) -> Self {
        Self {
            neu1: atomic::zeroed(vector_length),
            neu1e: atomic::zeroed(vector_length),
            dot: AtomicF32::default(),
            round: RoundState::default(),
        }
    }
}
