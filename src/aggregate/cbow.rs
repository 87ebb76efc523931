//! CBOW orchestrator.

use super::{check_rows, HsPath, NegativeRounds, Scratch};
use crate::error::Result;
use crate::kernels::simd::{add_vectors_f32, div_f32};
use crate::kernels::{HierarchicSoftmax, NegativeSampling};
use crate::tables::Tables;
use crate::weights::{Layout, Weights};
use serde::{Deserialize, Serialize};

/// One CBOW step: the averaged context window against the rounds derived
/// from the center word.
///
/// An empty context leaves `neu1` at zero; the rounds still train their
/// `syn1`/`syn1_neg` rows against it, and nothing is scattered back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cbow {
    /// `syn0` rows of the context words. Duplicates are summed and updated
    /// once per occurrence.
    pub context: Vec<usize>,
    /// Hierarchical-softmax rounds.
    #[serde(default)]
    pub path: HsPath,
    /// Negative-sampling rounds.
    #[serde(default)]
    pub negative: NegativeRounds,
    /// Learning rate.
    pub alpha: f32,
}

impl Cbow {
    /// Creates a step with no rounds.
    pub fn new(context: Vec<usize>, alpha: f32) -> Self {
        Self {
            context,
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
        check_rows("syn0 row", &self.context, layout.vocab_size)?;
        self.path.validate(layout)?;
        self.negative.validate(layout, tables)
    }

    /// Runs the step on the sequential path.
    pub fn run(&self, weights: &mut Weights<'_>, tables: &Tables<'_>, scratch: &mut Scratch) {
        let layout = weights.layout();
        debug_assert_eq!(scratch.vector_length(), layout.vector_length);
        let (neu1, neu1e) = scratch.reset();

        for &word in &self.context {
            add_vectors_f32(neu1, &weights.syn0[layout.row_range(word)]);
        }
        if !self.context.is_empty() {
            div_f32(neu1, self.context.len() as f32);
        }
        let neu1: &[f32] = neu1;

        for (node, code) in self.path.rounds() {
            let row = &mut weights.syn1[layout.row_range(node)];
            HierarchicSoftmax { code, alpha: self.alpha }.apply(neu1, row, &tables.exp, neu1e);
        }

        if let Some(sampler) = self.negative.sampler(tables, layout.vocab_size) {
            for target in sampler {
                let row = &mut weights.syn1_neg[layout.row_range(target.row)];
                NegativeSampling {
                    code: target.code,
                    alpha: self.alpha,
                }
                .apply(neu1, row, &tables.exp, neu1e);
            }
        }

        for &word in &self.context {
            add_vectors_f32(&mut weights.syn0[layout.row_range(word)], neu1e);
        }
    }
}
