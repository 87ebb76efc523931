//! SkipGram orchestrator.

use super::{check_rows, HsPath, NegativeRounds, Scratch};
use crate::error::Result;
use crate::kernels::simd::add_vectors_f32;
use crate::kernels::{HierarchicSoftmax, NegativeSampling};
use crate::tables::Tables;
use crate::weights::{Layout, Weights};
use serde::{Deserialize, Serialize};

/// One SkipGram step: the center word's `syn0` row against the rounds
/// derived from one context word.
///
/// Gradients from every round accumulate in `neu1e`, which is added to the
/// center row exactly once at the end. That single write is the only point
/// where this invocation touches `syn0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkipGram {
    /// `syn0` row of the center word.
    pub word: usize,
    /// Hierarchical-softmax rounds.
    #[serde(default)]
    pub path: HsPath,
    /// Negative-sampling rounds.
    #[serde(default)]
    pub negative: NegativeRounds,
    /// Learning rate.
    pub alpha: f32,
}

impl SkipGram {
    /// Creates a step with no rounds.
    pub fn new(word: usize, alpha: f32) -> Self {
        Self {
            word,
            path: HsPath::default(),
            negative: NegativeRounds::default(),
            alpha,
        }
    }

    /// Sets the hierarchical-softmax rounds.
    pub fn with_path(mut self, path: HsPath) -> Self {
        self.path = path;
        self
    }

    /// Sets the negative-sampling rounds.
    pub fn with_negative(mut self, negative: NegativeRounds) -> Self {
        self.negative = negative;
        self
    }

    pub(crate) fn validate(&self, layout: &Layout, tables: &Tables<'_>) -> Result<()> {
        check_rows("syn0 row", &[self.word], layout.vocab_size)?;
        self.path.validate(layout)?;
        self.negative.validate(layout, tables)
    }

    /// Runs the step on the sequential path.
    pub fn run(&self, weights: &mut Weights<'_>, tables: &Tables<'_>, scratch: &mut Scratch) {
        let layout = weights.layout();
        debug_assert_eq!(scratch.vector_length(), layout.vector_length);
        let (_, neu1e) = scratch.reset();

        let word_range = layout.row_range(self.word);
        let embedding = &weights.syn0[word_range.clone()];

        for (node, code) in self.path.rounds() {
            let row = &mut weights.syn1[layout.row_range(node)];
            HierarchicSoftmax { code, alpha: self.alpha }.apply(embedding, row, &tables.exp, neu1e);
        }

        if let Some(sampler) = self.negative.sampler(tables, layout.vocab_size) {
            for target in sampler {
                let row = &mut weights.syn1_neg[layout.row_range(target.row)];
                NegativeSampling {
                    code: target.code,
                    alpha: self.alpha,
                }
                .apply(embedding, row, &tables.exp, neu1e);
            }
        }

        add_vectors_f32(&mut weights.syn0[word_range], neu1e);
    }
}
