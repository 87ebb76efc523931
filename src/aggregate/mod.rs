//! Aggregate descriptors and the sequential orchestrators.
//!
//! An [`Aggregate`] describes one self-contained training invocation: a
//! SkipGram step for one center word, or a CBOW step for one context window.
//! Descriptors carry only per-invocation scalars and index lists; the
//! matrices travel separately in [`Weights`](crate::Weights) and the lookup
//! tables in [`Tables`](crate::Tables), so one set of buffers can serve a
//! whole batch of descriptors.
//!
//! Row indices are trusted on the hot path. [`Aggregate::validate`] checks
//! them up front; the sequential executor only calls it in debug builds.

mod cbow;
mod scratch;
mod skipgram;

pub use cbow::Cbow;
pub use scratch::Scratch;
pub use skipgram::SkipGram;

use crate::error::{AggregateError, Result};
use crate::kernels::NegativeSampler;
use crate::tables::Tables;
use crate::weights::{Layout, Weights};
use serde::{Deserialize, Serialize};

/// Hierarchical-softmax rounds: the Huffman path of the predicted word.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HsPath {
    /// `syn1` row of each inner tree node on the path.
    pub nodes: Vec<usize>,
    /// Huffman bit of each node (0 or 1).
    pub codes: Vec<u8>,
}

impl HsPath {
    /// Creates a path from parallel node and code lists.
    pub fn new(nodes: Vec<usize>, codes: Vec<u8>) -> Self {
        Self { nodes, codes }
    }

    /// Number of rounds.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True if there are no hierarchical-softmax rounds.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// `(node, code)` pairs in round order.
    #[inline]
    pub fn rounds(&self) -> impl Iterator<Item = (usize, u8)> + '_ {
        self.nodes.iter().copied().zip(self.codes.iter().copied())
    }

    fn validate(&self, layout: &Layout) -> Result<()> {
        if self.nodes.len() != self.codes.len() {
            return Err(AggregateError::CodeLengthMismatch {
                nodes: self.nodes.len(),
                codes: self.codes.len(),
            });
        }
        if let Some(&code) = self.codes.iter().find(|&&c| c > 1) {
            return Err(AggregateError::InvalidCode(code));
        }
        check_rows("syn1 row", &self.nodes, layout.syn1_rows)
    }
}

/// Negative-sampling rounds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NegativeRounds {
    /// Number of drawn negatives; 0 disables negative sampling entirely.
    pub rounds: usize,
    /// `syn1_neg` row of the true target.
    pub starter: usize,
    /// Initial `next_random` state.
    pub seed: u64,
}

impl NegativeRounds {
    /// Creates negative-sampling parameters.
    pub fn new(rounds: usize, starter: usize, seed: u64) -> Self {
        Self { rounds, starter, seed }
    }

    /// Sampler for these rounds, or `None` when negative sampling is off.
    pub fn sampler<'t>(&self, tables: &Tables<'t>, vocab_size: usize) -> Option<NegativeSampler<'t>> {
        if self.rounds == 0 {
            return None;
        }
        let table = tables.neg?;
        Some(NegativeSampler::new(
            table,
            vocab_size,
            self.starter,
            self.rounds,
            self.seed,
        ))
    }

    fn validate(&self, layout: &Layout, tables: &Tables<'_>) -> Result<()> {
        if self.rounds == 0 {
            return Ok(());
        }
        if tables.neg.is_none() {
            return Err(AggregateError::MissingNegTable);
        }
        if layout.vocab_size < 2 {
            return Err(AggregateError::VocabTooSmall(layout.vocab_size));
        }
        check_rows("syn1_neg row", &[self.starter], layout.syn1_neg_rows)
    }
}

/// One training invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Aggregate {
    /// Center word against its context.
    SkipGram(SkipGram),
    /// Averaged context window against the center word.
    Cbow(Cbow),
}

impl Aggregate {
    /// Checks every row index and table requirement of this descriptor.
    pub fn validate(&self, layout: &Layout, tables: &Tables<'_>) -> Result<()> {
        match self {
            Aggregate::SkipGram(op) => op.validate(layout, tables),
            Aggregate::Cbow(op) => op.validate(layout, tables),
        }
    }

    /// Runs this descriptor on the sequential path.
    pub fn run(&self, weights: &mut Weights<'_>, tables: &Tables<'_>, scratch: &mut Scratch) {
        match self {
            Aggregate::SkipGram(op) => op.run(weights, tables, scratch),
            Aggregate::Cbow(op) => op.run(weights, tables, scratch),
        }
    }

    /// Hierarchical-softmax rounds of this descriptor.
    pub fn path(&self) -> &HsPath {
        match self {
            Aggregate::SkipGram(op) => &op.path,
            Aggregate::Cbow(op) => &op.path,
        }
    }

    /// Negative-sampling rounds of this descriptor.
    pub fn negative(&self) -> &NegativeRounds {
        match self {
            Aggregate::SkipGram(op) => &op.negative,
            Aggregate::Cbow(op) => &op.negative,
        }
    }

    /// Learning rate of this descriptor.
    pub fn alpha(&self) -> f32 {
        match self {
            Aggregate::SkipGram(op) => op.alpha,
            Aggregate::Cbow(op) => op.alpha,
        }
    }
}

impl From<SkipGram> for Aggregate {
    fn from(op: SkipGram) -> Self {
        Aggregate::SkipGram(op)
    }
}

impl From<Cbow> for Aggregate {
    fn from(op: Cbow) -> Self {
        Aggregate::Cbow(op)
    }
}

/// Validates a whole batch, stopping at the first bad descriptor.
pub fn validate_batch(batch: &[Aggregate], layout: &Layout, tables: &Tables<'_>) -> Result<()> {
    batch.iter().try_for_each(|op| op.validate(layout, tables))
}

fn check_rows(what: &'static str, rows: &[usize], max: usize) -> Result<()> {
    match rows.iter().find(|&&row| row >= max) {
        Some(&index) => Err(AggregateError::IndexOutOfBounds { what, index, max }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::{ExpTable, NegTable};

    fn layout() -> Layout {
        Layout {
            vector_length: 4,
            vocab_size: 10,
            syn1_rows: 10,
            syn1_neg_rows: 10,
        }
    }

    #[test]
    fn test_validate_ok() {
        let exp_values = vec![0.5f32; 100];
        let neg_entries = vec![1, 2, 3];
        let tables = Tables::new(
            ExpTable::new(&exp_values).unwrap(),
            NegTable::new(&neg_entries).unwrap(),
        );

        let op: Aggregate = SkipGram::new(3, 0.025)
            .with_path(HsPath::new(vec![0, 4], vec![1, 0]))
            .with_negative(NegativeRounds::new(5, 7, 1))
            .into();
        assert!(op.validate(&layout(), &tables).is_ok());
    }

    #[test]
    fn test_validate_errors() {
        let exp_values = vec![0.5f32; 100];
        let tables = Tables::hierarchic(ExpTable::new(&exp_values).unwrap());

        let op: Aggregate = SkipGram::new(10, 0.025).into();
        assert!(matches!(
            op.validate(&layout(), &tables),
            Err(AggregateError::IndexOutOfBounds { what: "syn0 row", index: 10, max: 10 })
        ));

        let op: Aggregate = Cbow::new(vec![1, 2], 0.025)
            .with_path(HsPath::new(vec![0, 1], vec![1]))
            .into();
        assert!(matches!(
            op.validate(&layout(), &tables),
            Err(AggregateError::CodeLengthMismatch { nodes: 2, codes: 1 })
        ));

        let op: Aggregate = Cbow::new(vec![1], 0.025)
            .with_path(HsPath::new(vec![0], vec![2]))
            .into();
        assert!(matches!(op.validate(&layout(), &tables), Err(AggregateError::InvalidCode(2))));

        let op: Aggregate = SkipGram::new(1, 0.025)
            .with_negative(NegativeRounds::new(3, 2, 0))
            .into();
        assert!(matches!(op.validate(&layout(), &tables), Err(AggregateError::MissingNegTable)));
    }

    #[test]
    fn test_validate_vocab_too_small() {
        let exp_values = vec![0.5f32; 100];
        let neg_entries = vec![0];
        let tables = Tables::new(
            ExpTable::new(&exp_values).unwrap(),
            NegTable::new(&neg_entries).unwrap(),
        );
        let tiny = Layout {
            vector_length: 4,
            vocab_size: 1,
            syn1_rows: 1,
            syn1_neg_rows: 1,
        };

        let op: Aggregate = SkipGram::new(0, 0.025)
            .with_negative(NegativeRounds::new(1, 0, 0))
            .into();
        assert!(matches!(op.validate(&tiny, &tables), Err(AggregateError::VocabTooSmall(1))));
    }

    #[test]
    fn test_serde_tagged() {
        let op: Aggregate = Cbow::new(vec![1, 2, 3], 0.05)
            .with_negative(NegativeRounds::new(2, 4, 99))
            .into();
        let json = serde_json::to_string(&op).unwrap();
        assert!(json.contains("\"kind\":\"cbow\""));

        let back: Aggregate = serde_json::from_str(&json).unwrap();
        assert_eq!(back, op);
    }
}
