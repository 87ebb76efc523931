//! Seeded synthetic workloads for benchmarks and parity checks.
//!
//! Real training feeds the kernels from a vocabulary, a Huffman tree and a
//! corpus; none of that is needed to exercise them. A [`Workload`] holds
//! randomly initialized matrices and tables of the right shape, and a
//! [`BatchGenerator`] produces in-range descriptors. Both are fully
//! determined by [`WorkloadConfig::seed`].

use crate::aggregate::{Aggregate, Cbow, HsPath, NegativeRounds, SkipGram};
use crate::config::WorkloadConfig;
use crate::error::{AggregateError, Result};
use crate::tables::{sigmoid_table, ExpTable, NegTable, Tables};
use crate::weights::Weights;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};

/// Unigram exponent of the word2vec negative table.
const UNIGRAM_POWER: f64 = 0.75;

/// Standard deviation of the initial matrix entries.
const INIT_STD_DEV: f32 = 0.1;

/// Matrices and tables of one synthetic run.
#[derive(Debug, Clone, PartialEq)]
pub struct Workload {
    /// Row-major `vocab_size x vector_length` input embeddings.
    pub syn0: Vec<f32>,
    /// Hierarchical-softmax node vectors, same shape as `syn0`.
    pub syn1: Vec<f32>,
    /// Negative-sampling output vectors, same shape as `syn0`.
    pub syn1_neg: Vec<f32>,
    /// Sigmoid lookup table.
    pub exp_table: Vec<f32>,
    /// Negative table over a Zipf-distributed vocabulary.
    pub neg_table: Vec<i32>,
    /// Columns per row.
    pub vector_length: usize,
}

impl Workload {
    /// Generates matrices and tables from `config`.
    pub fn generate(config: &WorkloadConfig) -> Result<Self> {
        config.validate()?;
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        let normal = Normal::new(0.0f32, INIT_STD_DEV).map_err(|e| AggregateError::Config(e.to_string()))?;

        let len = config.vocab_size * config.vector_length;
        let mut matrix = || -> Vec<f32> { (0..len).map(|_| normal.sample(&mut rng)).collect() };
        let syn0 = matrix();
        let syn1 = matrix();
        let syn1_neg = matrix();

        Ok(Self {
            syn0,
            syn1,
            syn1_neg,
            exp_table: sigmoid_table(config.exp_table_size),
            neg_table: unigram_table(config.vocab_size, config.neg_table_size),
            vector_length: config.vector_length,
        })
    }

    /// Borrows the matrices as [`Weights`] and the tables as [`Tables`].
    pub fn split(&mut self) -> Result<(Weights<'_>, Tables<'_>)> {
        let weights = Weights::new(&mut self.syn0, &mut self.syn1, &mut self.syn1_neg, self.vector_length)?;
        let tables = Tables::new(ExpTable::new(&self.exp_table)?, NegTable::new(&self.neg_table)?);
        Ok((weights, tables))
    }

    /// Largest absolute element-wise difference per matrix:
    /// `(syn0, syn1, syn1_neg)`.
    pub fn max_divergence(&self, other: &Workload) -> (f32, f32, f32) {
        fn max_abs(a: &[f32], b: &[f32]) -> f32 {
            a.iter().zip(b).map(|(x, y)| (x - y).abs()).fold(0.0, f32::max)
        }
        (
            max_abs(&self.syn0, &other.syn0),
            max_abs(&self.syn1, &other.syn1),
            max_abs(&self.syn1_neg, &other.syn1_neg),
        )
    }
}

/// word2vec's negative table for word counts `1 / (rank + 1)`.
///
/// Word `i` fills a share of the table proportional to `count(i)^0.75`.
pub fn unigram_table(vocab_size: usize, table_size: usize) -> Vec<i32> {
    let weight = |i: usize| (1.0 / (i as f64 + 1.0)).powf(UNIGRAM_POWER);
    let total: f64 = (0..vocab_size).map(weight).sum();

    let mut table = Vec::with_capacity(table_size);
    let mut word = 0usize;
    let mut cumulative = weight(0) / total;
    for slot in 0..table_size {
        table.push(word as i32);
        if slot as f64 / table_size as f64 > cumulative && word + 1 < vocab_size {
            word += 1;
            cumulative += weight(word) / total;
        }
    }
    table
}

/// Produces batches of random, in-range descriptors.
pub struct BatchGenerator {
    config: WorkloadConfig,
    rng: ChaCha8Rng,
}

impl BatchGenerator {
    /// Create a new generator with config.
    pub fn new(config: WorkloadConfig) -> Self {
        // Offset the seed so descriptors do not replay the matrix stream.
        let rng = ChaCha8Rng::seed_from_u64(config.seed ^ 0x9E37_79B9_7F4A_7C15);
        Self { config, rng }
    }

    /// Generates the next `batch_size` descriptors.
    pub fn next_batch(&mut self) -> Vec<Aggregate> {
        (0..self.config.batch_size).map(|_| self.next_op()).collect()
    }

    fn next_op(&mut self) -> Aggregate {
        let vocab = self.config.vocab_size;
        let alpha = self.config.alpha;

        let nodes: Vec<usize> = (0..self.config.hs_depth).map(|_| self.rng.gen_range(0..vocab)).collect();
        let codes: Vec<u8> = (0..self.config.hs_depth).map(|_| self.rng.gen_range(0..=1)).collect();
        let path = HsPath::new(nodes, codes);
        let negative = NegativeRounds::new(self.config.negative_rounds, self.rng.gen_range(0..vocab), self.rng.gen());

        if self.rng.gen_bool(self.config.cbow_fraction) {
            let context = (0..self.config.context_window).map(|_| self.rng.gen_range(0..vocab)).collect();
            Cbow::new(context, alpha).with_path(path).with_negative(negative).into()
        } else {
            SkipGram::new(self.rng.gen_range(0..vocab), alpha)
                .with_path(path)
                .with_negative(negative)
                .into()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::validate_batch;

    fn small_config() -> WorkloadConfig {
        WorkloadConfig {
            vocab_size: 50,
            vector_length: 8,
            batch_size: 20,
            neg_table_size: 1_000,
            ..Default::default()
        }
    }

    #[test]
    fn test_generate_shapes() {
        let mut workload = Workload::generate(&small_config()).unwrap();
        assert_eq!(workload.syn0.len(), 400);
        assert_eq!(workload.neg_table.len(), 1_000);

        let (weights, tables) = workload.split().unwrap();
        assert_eq!(weights.layout().vocab_size, 50);
        assert!(tables.neg.is_some());
    }

    #[test]
    fn test_seeded() {
        let config = small_config();
        assert_eq!(Workload::generate(&config).unwrap(), Workload::generate(&config).unwrap());
        assert_eq!(
            BatchGenerator::new(config.clone()).next_batch(),
            BatchGenerator::new(config).next_batch()
        );
    }

    #[test]
    fn test_batches_are_valid() {
        let config = small_config();
        let mut workload = Workload::generate(&config).unwrap();
        let batch = BatchGenerator::new(config).next_batch();
        assert_eq!(batch.len(), 20);

        let (weights, tables) = workload.split().unwrap();
        assert!(validate_batch(&batch, &weights.layout(), &tables).is_ok());
    }

    #[test]
    fn test_unigram_table_is_skewed() {
        let table = unigram_table(100, 10_000);
        assert_eq!(table.len(), 10_000);
        assert!(table.iter().all(|&w| (0..100).contains(&w)));
        assert!(table.windows(2).all(|pair| pair[0] <= pair[1]));

        let first = table.iter().filter(|&&w| w == 0).count();
        let tenth = table.iter().filter(|&&w| w == 9).count();
        assert!(first > tenth);
    }

    #[test]
    fn test_rejects_tiny_vocab() {
        let config = WorkloadConfig {
            vocab_size: 1,
            ..small_config()
        };
        assert!(Workload::generate(&config).is_err());
    }
}
