//! Negative-sampling round selection.
//!
//! A [`NegativeSampler`] yields the targets of one invocation's
//! negative-sampling rounds: first the true pair, then `rounds` drawn
//! negatives. Draws come from a 64-bit linear congruential generator, so the
//! sequence is fully determined by the seed.

use crate::tables::NegTable;
use log::trace;

/// LCG multiplier (the java.util.Random / word2vec constant).
pub const LCG_MULTIPLIER: u64 = 25_214_903_917;

/// LCG increment.
pub const LCG_INCREMENT: u64 = 11;

/// Maximum number of draws per requested negative round.
///
/// Candidates that collide with the true target are redrawn without using up
/// a round; this budget bounds the redraws on degenerate tables.
pub const NEGATIVE_DRAW_BUDGET: usize = 32;

/// The `next_random` state of word2vec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NextRandom(pub u64);

impl NextRandom {
    /// Advances the state and returns the new value.
    #[inline]
    pub fn advance(&mut self) -> u64 {
        self.0 = self.0.wrapping_mul(LCG_MULTIPLIER).wrapping_add(LCG_INCREMENT);
        self.0
    }
}

/// One negative-sampling round: a `syn1_neg` row and its label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target {
    /// Row of `syn1_neg`.
    pub row: usize,
    /// 1 for the true pair, 0 for a drawn negative.
    pub code: u8,
}

/// Maps one LCG value to a vocabulary row.
///
/// The table slot is `(state >> 16) % table.len()`. Entries outside
/// `(0, vocab_size)` fall back to `state % (vocab_size - 1) + 1`.
/// `vocab_size` must be at least 2.
#[inline]
pub fn draw_target(state: u64, table: &NegTable<'_>, vocab_size: usize) -> usize {
    let slot = ((state >> 16) % table.len() as u64) as usize;
    let entry = table.get(slot);
    if entry <= 0 || entry as usize >= vocab_size {
        (state % (vocab_size as u64 - 1) + 1) as usize
    } else {
        entry as usize
    }
}

/// Iterator over the negative-sampling targets of one invocation.
#[derive(Debug, Clone)]
pub struct NegativeSampler<'t> {
    table: NegTable<'t>,
    vocab_size: usize,
    starter: usize,
    state: NextRandom,
    positive_pending: bool,
    remaining: usize,
    draws_left: usize,
}

impl<'t> NegativeSampler<'t> {
    /// Creates a sampler for `rounds` negatives around the true target `starter`.
    ///
    /// With `rounds == 0` the sampler is empty; the positive round only runs
    /// together with at least one negative round.
    pub fn new(table: NegTable<'t>, vocab_size: usize, starter: usize, rounds: usize, seed: u64) -> Self {
        debug_assert!(rounds == 0 || vocab_size >= 2);
        Self {
            table,
            vocab_size,
            starter,
            state: NextRandom(seed),
            positive_pending: rounds > 0,
            remaining: rounds,
            draws_left: rounds.saturating_mul(NEGATIVE_DRAW_BUDGET),
        }
    }

    /// Current random state.
    pub fn state(&self) -> NextRandom {
        self.state
    }
}

impl Iterator for NegativeSampler<'_> {
    type Item = Target;

    fn next(&mut self) -> Option<Target> {
        if self.positive_pending {
            self.positive_pending = false;
            return Some(Target {
                row: self.starter,
                code: 1,
            });
        }

        while self.remaining > 0 {
            if self.draws_left == 0 {
                trace!(
                    "Draw budget exhausted with {} negative rounds left (starter {})",
                    self.remaining,
                    self.starter
                );
                self.remaining = 0;
                return None;
            }
            self.draws_left -= 1;

            let row = draw_target(self.state.advance(), &self.table, self.vocab_size);
            if row == self.starter {
                continue;
            }

            self.remaining -= 1;
            return Some(Target { row, code: 0 });
        }

        None
    }
}
