//! One negative-sampling gradient step against one `syn1_neg` row.

use super::gradient::negative_gradient;
use super::simd::{axpy_f32, dot_f32};
use crate::tables::ExpTable;

/// Gradient step against one negative-sampling target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NegativeSampling {
    /// 1 for the true pair, 0 for a drawn negative.
    pub code: u8,
    /// Learning rate.
    pub alpha: f32,
}

impl NegativeSampling {
    /// Applies the step and returns the gradient used, or `None` when the
    /// in-range bucket fell past the end of the table.
    #[inline]
    pub fn apply(
        &self,
        embedding: &[f32],
        target: &mut [f32],
        exp_table: &ExpTable<'_>,
        neu1e: &mut [f32],
    ) -> Option<f32> {
        let dot = dot_f32(embedding, target);
        let g = negative_gradient(dot, self.code, self.alpha, exp_table)?;

        axpy_f32(g, target, neu1e);
        axpy_f32(g, embedding, target);
        Some(g)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::sigmoid_table;

    #[test]
    fn test_matches_reference() {
        let values = sigmoid_table(1000);
        let exp = ExpTable::new(&values).unwrap();

        let syn0 = [0.2f32, -0.4, 0.6, 0.1];
        let target_before = [0.5f32, 0.5, -0.1, 0.3];
        let mut target = target_before;
        let mut neu1e = [0.0f32; 4];

        NegativeSampling { code: 1, alpha: 0.05 }
            .apply(&syn0, &mut target, &exp, &mut neu1e)
            .unwrap();

        let dot: f32 = syn0.iter().zip(&target_before).map(|(a, b)| a * b).sum();
        let idx = ((dot + 6.0) * (1000.0 / 6.0 / 2.0)) as usize;
        let g = (1.0 - values[idx]) * 0.05;

        for i in 0..4 {
            assert!((neu1e[i] - g * target_before[i]).abs() < 1e-6);
            assert!((target[i] - (target_before[i] + g * syn0[i])).abs() < 1e-6);
        }
    }

    #[test]
    fn test_saturated_negative_still_updates() {
        let values = sigmoid_table(1000);
        let exp = ExpTable::new(&values).unwrap();

        // dot = 8 > MAX_EXP: a drawn negative gets g = (0 - 1) * alpha.
        let syn0 = [2.0f32, 2.0];
        let mut target = [2.0f32, 2.0];
        let mut neu1e = [0.0f32; 2];

        let g = NegativeSampling { code: 0, alpha: 0.1 }
            .apply(&syn0, &mut target, &exp, &mut neu1e)
            .unwrap();

        assert!((g - (-0.1)).abs() < 1e-7);
        assert!((neu1e[0] - (-0.2)).abs() < 1e-6);
        assert!((target[0] - 1.8).abs() < 1e-6);
    }

    #[test]
    fn test_saturated_positive_is_zero_gradient() {
        let values = sigmoid_table(1000);
        let exp = ExpTable::new(&values).unwrap();

        let syn0 = [2.0f32, 2.0];
        let mut target = [2.0f32, 2.0];
        let mut neu1e = [0.0f32; 2];

        let g = NegativeSampling { code: 1, alpha: 0.1 }
            .apply(&syn0, &mut target, &exp, &mut neu1e)
            .unwrap();

        assert_eq!(g, 0.0);
        assert_eq!(target, [2.0, 2.0]);
    }
}
