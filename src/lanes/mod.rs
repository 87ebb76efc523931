//! Cooperative-parallel execution.
//!
//! One invocation runs on a [`LaneGroup`]: `lanes` OS threads that split every
//! vector loop by stride and meet at a barrier between phases. The leader
//! (lane 0) owns the negative sampler and publishes each round's target and
//! gradient; the other lanes only read what was published.
//!
//! Lanes update the caller's matrices through [`AtomicF32`] views with
//! `Relaxed` ordering. Inside a group every element has exactly one writer per
//! phase. Different groups of the same batch are not coordinated at all and
//! may overwrite each other's updates to a shared row (Hogwild).

pub mod atomic;
mod group;
pub mod kernels;
mod shared;

pub use atomic::AtomicF32;
pub use group::{Lane, LaneGroup};
pub use shared::{RoundKind, RoundState, SharedScratch, SharedWeights};

use crate::aggregate::{Aggregate, Cbow, HsPath, NegativeRounds, SkipGram};
use crate::tables::Tables;

/// Runs `batch` in order on one lane group.
///
/// Descriptors must have been validated; an out-of-range row panics inside a
/// lane and leaves the other lanes blocked.
pub fn run_batch(group: &LaneGroup, weights: &SharedWeights<'_>, tables: &Tables<'_>, batch: &[Aggregate]) {
    let scratch = SharedScratch::new(weights.layout().vector_length);

    group.run(|lane| {
        for op in batch {
            match op {
                Aggregate::SkipGram(op) => skipgram(lane, op, weights, tables, &scratch),
                Aggregate::Cbow(op) => cbow(lane, op, weights, tables, &scratch),
            }
        }
    });
}

/// Cooperative SkipGram step.
pub fn skipgram(
    lane: &Lane<'_>,
    op: &SkipGram,
    weights: &SharedWeights<'_>,
    tables: &Tables<'_>,
    scratch: &SharedScratch,
) {
    let embedding = weights.syn0_row(op.word);

    lane.parallel(scratch.neu1e.len(), |i| scratch.neu1e[i].store(0.0));
    run_rounds(lane, embedding, &op.path, &op.negative, op.alpha, weights, tables, scratch);
    lane.parallel(embedding.len(), |i| embedding[i].add(scratch.neu1e[i].load()));
}

/// Cooperative CBOW step.
pub fn cbow(lane: &Lane<'_>, op: &Cbow, weights: &SharedWeights<'_>, tables: &Tables<'_>, scratch: &SharedScratch) {
    let neu1 = &scratch.neu1;
    let neu1e = &scratch.neu1e;
    let count = op.context.len();

    // Each element is summed in context order, as on the sequential path.
    lane.parallel(neu1.len(), |i| {
        let mut sum = 0.0f32;
        for &word in &op.context {
            sum += weights.syn0_row(word)[i].load();
        }
        if count > 0 {
            sum /= count as f32;
        }
        neu1[i].store(sum);
        neu1e[i].store(0.0);
    });

    run_rounds(lane, neu1, &op.path, &op.negative, op.alpha, weights, tables, scratch);

    lane.parallel(neu1e.len(), |i| {
        let delta = neu1e[i].load();
        for &word in &op.context {
            weights.syn0_row(word)[i].add(delta);
        }
    });
}

/// Hierarchical-softmax rounds followed by negative-sampling rounds.
///
/// The leader walks the rounds and publishes one target per iteration; a
/// published [`RoundKind::Done`] ends the loop on every lane at once.
#[allow(clippy::too_many_arguments)]
fn run_rounds(
    lane: &Lane<'_>,
    embedding: &[AtomicF32],
    path: &HsPath,
    negative: &NegativeRounds,
    alpha: f32,
    weights: &SharedWeights<'_>,
    tables: &Tables<'_>,
    scratch: &SharedScratch,
) {
    let mut rounds = lane.is_leader().then(|| {
        let hierarchic = path.rounds().map(|(node, code)| (RoundKind::Hierarchic, node, code));
        let sampled = negative
            .sampler(tables, weights.layout().vocab_size)
            .into_iter()
            .flatten()
            .map(|target| (RoundKind::Negative, target.row, target.code));
        hierarchic.chain(sampled)
    });

    loop {
        lane.publish(|| {
            let (kind, row, code) = rounds
                .as_mut()
                .and_then(Iterator::next)
                .unwrap_or((RoundKind::Done, 0, 0));
            scratch.round.set_target(kind, row, code);
        });

        let target = match scratch.round.kind() {
            RoundKind::Done => break,
            RoundKind::Hierarchic => weights.syn1_row(scratch.round.row()),
            RoundKind::Negative => weights.syn1_neg_row(scratch.round.row()),
        };
        kernels::round(lane, embedding, target, alpha, &tables.exp, scratch);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::Scratch;
    use crate::tables::{sigmoid_table, ExpTable, NegTable};
    use crate::weights::Weights;

    struct Fixture {
        syn0: Vec<f32>,
        syn1: Vec<f32>,
        syn1_neg: Vec<f32>,
    }

    impl Fixture {
        fn new(vocab: usize, vl: usize) -> Self {
            let value = |i: usize, salt: usize| (((i * 31 + salt * 17) % 23) as f32 - 11.0) * 0.02;
            Self {
                syn0: (0..vocab * vl).map(|i| value(i, 1)).collect(),
                syn1: (0..vocab * vl).map(|i| value(i, 2)).collect(),
                syn1_neg: (0..vocab * vl).map(|i| value(i, 3)).collect(),
            }
        }
    }

    fn batch() -> Vec<Aggregate> {
        vec![
            SkipGram::new(3, 0.05)
                .with_path(HsPath::new(vec![0, 2, 5], vec![1, 0, 1]))
                .with_negative(NegativeRounds::new(3, 4, 42))
                .into(),
            Cbow::new(vec![1, 2, 6, 2], 0.05)
                .with_path(HsPath::new(vec![1, 4], vec![0, 1]))
                .with_negative(NegativeRounds::new(2, 5, 7))
                .into(),
            Cbow::new(Vec::new(), 0.05).with_negative(NegativeRounds::new(1, 2, 3)).into(),
        ]
    }

    fn assert_close(a: &[f32], b: &[f32]) {
        for (x, y) in a.iter().zip(b) {
            assert!((x - y).abs() < 1e-5, "{x} vs {y}");
        }
    }

    #[test]
    fn test_matches_sequential() {
        let (vocab, vl) = (8, 5);
        let exp_values = sigmoid_table(1000);
        let neg_entries: Vec<i32> = (0..64).map(|i| i % 8).collect();
        let tables = Tables::new(
            ExpTable::new(&exp_values).unwrap(),
            NegTable::new(&neg_entries).unwrap(),
        );
        let batch = batch();

        let mut expected = Fixture::new(vocab, vl);
        {
            let mut weights = Weights::new(&mut expected.syn0, &mut expected.syn1, &mut expected.syn1_neg, vl).unwrap();
            let mut scratch = Scratch::new(vl);
            for op in &batch {
                op.run(&mut weights, &tables, &mut scratch);
            }
        }

        for lanes in [1, 2, 3, 8] {
            let mut actual = Fixture::new(vocab, vl);
            {
                let mut weights = Weights::new(&mut actual.syn0, &mut actual.syn1, &mut actual.syn1_neg, vl).unwrap();
                let shared = SharedWeights::new(&mut weights);
                run_batch(&LaneGroup::new(lanes), &shared, &tables, &batch);
            }
            assert_close(&actual.syn0, &expected.syn0);
            assert_close(&actual.syn1, &expected.syn1);
            assert_close(&actual.syn1_neg, &expected.syn1_neg);
        }
    }
}
