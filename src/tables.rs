//! Borrowed views over the caller's lookup tables.
//!
//! Both tables are built once by the training system and shared read-only
//! by every invocation.

use crate::error::{AggregateError, Result};

/// Saturation bound of the sigmoid lookup table. Dot products outside
/// `[-MAX_EXP, MAX_EXP)` are never looked up.
pub const MAX_EXP: f32 = 6.0;

/// Table size used by the reference word2vec implementation.
pub const DEFAULT_EXP_TABLE_SIZE: usize = 1000;

/// Precomputed sigmoid approximation indexed by a dot-product bucket.
#[derive(Debug, Clone, Copy)]
pub struct ExpTable<'a> {
    values: &'a [f32],
}

impl<'a> ExpTable<'a> {
    /// Wraps a caller-owned table. The table must not be empty.
    pub fn new(values: &'a [f32]) -> Result<Self> {
        if values.is_empty() {
            return Err(AggregateError::EmptyTable("exp table"));
        }
        Ok(Self { values })
    }

    /// Number of buckets.
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Always false; construction rejects empty tables.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Raw table contents.
    #[inline]
    pub fn as_slice(&self) -> &'a [f32] {
        self.values
    }

    /// Maps a dot product to its bucket, or `None` when the bucket falls past
    /// the end of the table.
    ///
    /// Callers must have already checked `dot >= -MAX_EXP`; the bucket is the
    /// truncation of `(dot + MAX_EXP) * (len / MAX_EXP / 2)`.
    #[inline]
    pub fn bucket(&self, dot: f32) -> Option<usize> {
        let scale = self.values.len() as f32 / MAX_EXP / 2.0;
        let idx = ((dot + MAX_EXP) * scale) as usize;
        (idx < self.values.len()).then_some(idx)
    }

    /// Sigmoid value for a bucket returned by [`ExpTable::bucket`].
    #[inline]
    pub fn get(&self, bucket: usize) -> f32 {
        self.values[bucket]
    }
}

/// Flat table mapping a hashed random draw to a vocabulary index.
///
/// Entries are signed so a table may carry sentinel values; anything outside
/// `(0, vocab_size)` triggers the uniform fallback draw.
#[derive(Debug, Clone, Copy)]
pub struct NegTable<'a> {
    entries: &'a [i32],
}

impl<'a> NegTable<'a> {
    /// Wraps a caller-owned table. The table must not be empty.
    pub fn new(entries: &'a [i32]) -> Result<Self> {
        if entries.is_empty() {
            return Err(AggregateError::EmptyTable("negative table"));
        }
        Ok(Self { entries })
    }

    /// Number of entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false; construction rejects empty tables.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Raw table contents.
    #[inline]
    pub fn as_slice(&self) -> &'a [i32] {
        self.entries
    }

    /// Entry at `slot`.
    #[inline]
    pub fn get(&self, slot: usize) -> i32 {
        self.entries[slot]
    }
}

/// Read-only tables shared by every invocation of a batch.
#[derive(Debug, Clone, Copy)]
pub struct Tables<'a> {
    /// Sigmoid lookup table.
    pub exp: ExpTable<'a>,
    /// Negative-sampling table; only required when a descriptor has negative rounds.
    pub neg: Option<NegTable<'a>>,
}

impl<'a> Tables<'a> {
    /// Tables for hierarchical softmax only.
    pub fn hierarchic(exp: ExpTable<'a>) -> Self {
        Self { exp, neg: None }
    }

    /// Tables for both objectives.
    pub fn new(exp: ExpTable<'a>, neg: NegTable<'a>) -> Self {
        Self { exp, neg: Some(neg) }
    }
}

/// Builds the standard word2vec sigmoid table:
/// `table[i] = σ((2i/len - 1) * MAX_EXP)`.
pub fn sigmoid_table(len: usize) -> Vec<f32> {
    (0..len)
        .map(|i| {
            let x = (i as f32 / len as f32 * 2.0 - 1.0) * MAX_EXP;
            let e = (x as f64).exp() as f32;
            e / (e + 1.0)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_tables_rejected() {
        assert!(matches!(ExpTable::new(&[]), Err(AggregateError::EmptyTable(_))));
        assert!(matches!(NegTable::new(&[]), Err(AggregateError::EmptyTable(_))));
    }

    #[test]
    fn test_bucket_range() {
        let values = sigmoid_table(DEFAULT_EXP_TABLE_SIZE);
        let table = ExpTable::new(&values).unwrap();

        assert_eq!(table.bucket(-MAX_EXP), Some(0));
        assert_eq!(table.bucket(0.0), Some(500));
        assert_eq!(table.bucket(5.99), Some(999));
        // The upper bound lands one past the end.
        assert_eq!(table.bucket(MAX_EXP), None);
    }

    #[test]
    fn test_sigmoid_table_shape() {
        let values = sigmoid_table(1000);
        assert_eq!(values.len(), 1000);
        assert!((values[500] - 0.5).abs() < 1e-6);
        assert!(values[0] < 0.01);
        assert!(values[999] > 0.99);
        assert!(values.windows(2).all(|w| w[0] <= w[1]));
    }
}
