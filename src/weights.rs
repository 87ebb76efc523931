//! Mutable views over the caller's embedding matrices.
//!
//! The engine never allocates or owns these matrices; it borrows them for the
//! duration of a batch and mutates rows in place.

use crate::error::{AggregateError, Result};

/// Matrix geometry shared by `syn0`, `syn1` and `syn1_neg`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    /// Row length of every matrix.
    pub vector_length: usize,
    /// Number of rows in `syn0`.
    pub vocab_size: usize,
    /// Number of rows in `syn1` (0 when hierarchical softmax is unused).
    pub syn1_rows: usize,
    /// Number of rows in `syn1_neg` (0 when negative sampling is unused).
    pub syn1_neg_rows: usize,
}

impl Layout {
    /// Element range of row `row` within a flat matrix.
    #[inline]
    pub fn row_range(&self, row: usize) -> std::ops::Range<usize> {
        let start = row * self.vector_length;
        start..start + self.vector_length
    }
}

/// The three embedding matrices of a SkipGram/CBOW model.
///
/// `syn1` and `syn1_neg` may be empty when their objective is not trained;
/// otherwise they must have the same shape as `syn0`.
#[derive(Debug)]
pub struct Weights<'a> {
    pub(crate) syn0: &'a mut [f32],
    pub(crate) syn1: &'a mut [f32],
    pub(crate) syn1_neg: &'a mut [f32],
    layout: Layout,
}

impl<'a> Weights<'a> {
    /// Wraps caller-owned matrices after checking their shapes.
    pub fn new(
        syn0: &'a mut [f32],
        syn1: &'a mut [f32],
        syn1_neg: &'a mut [f32],
        vector_length: usize,
    ) -> Result<Self> {
        if vector_length == 0 {
            return Err(AggregateError::shape("syn0", "vector length must be positive"));
        }
        if syn0.is_empty() || syn0.len() % vector_length != 0 {
            return Err(AggregateError::shape(
                "syn0",
                format!(
                    "length {} is not a non-zero multiple of vector length {}",
                    syn0.len(),
                    vector_length
                ),
            ));
        }
        for (name, matrix) in [("syn1", &*syn1), ("syn1_neg", &*syn1_neg)] {
            if !matrix.is_empty() && matrix.len() != syn0.len() {
                return Err(AggregateError::shape(
                    name,
                    format!("length {} does not match syn0 length {}", matrix.len(), syn0.len()),
                ));
            }
        }

        let layout = Layout {
            vector_length,
            vocab_size: syn0.len() / vector_length,
            syn1_rows: syn1.len() / vector_length,
            syn1_neg_rows: syn1_neg.len() / vector_length,
        };

        Ok(Self {
            syn0,
            syn1,
            syn1_neg,
            layout,
        })
    }

    /// Matrix geometry.
    #[inline]
    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// Row `row` of `syn0`.
    pub fn syn0_row(&self, row: usize) -> &[f32] {
        &self.syn0[self.layout.row_range(row)]
    }

    /// Row `row` of `syn1`.
    pub fn syn1_row(&self, row: usize) -> &[f32] {
        &self.syn1[self.layout.row_range(row)]
    }

    /// Row `row` of `syn1_neg`.
    pub fn syn1_neg_row(&self, row: usize) -> &[f32] {
        &self.syn1_neg[self.layout.row_range(row)]
    }
}
