//! One hierarchical-softmax gradient step along one Huffman tree node.

use super::gradient::hierarchic_gradient;
use super::simd::{axpy_f32, dot_f32};
use crate::tables::ExpTable;

/// Gradient step against one `syn1` row.
///
/// Not used on its own by the training system, only as a round of
/// [`SkipGram`](crate::aggregate::SkipGram) or [`Cbow`](crate::aggregate::Cbow).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HierarchicSoftmax {
    /// Huffman bit of the node (0 or 1).
    pub code: u8,
    /// Learning rate.
    pub alpha: f32,
}

impl HierarchicSoftmax {
    /// Applies the step and returns the gradient used, or `None` if the
    /// dot product fell outside the sigmoid table and nothing was updated.
    ///
    /// Accumulates `g * node` into `neu1e`, then moves `node` by
    /// `g * embedding`. The embedding row itself is never written here.
    #[inline]
    pub fn apply(
        &self,
        embedding: &[f32],
        node: &mut [f32],
        exp_table: &ExpTable<'_>,
        neu1e: &mut [f32],
    ) -> Option<f32> {
        let dot = dot_f32(embedding, node);
        let g = hierarchic_gradient(dot, self.code, self.alpha, exp_table)?;

        axpy_f32(g, node, neu1e);
        axpy_f32(g, embedding, node);
        Some(g)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A table where every bucket maps to 0.5, so any in-range dot gives f = 0.5.
    fn flat_table() -> Vec<f32> {
        vec![0.5; 1000]
    }

    #[test]
    fn test_orthogonal_rows() {
        let values = flat_table();
        let exp = ExpTable::new(&values).unwrap();

        let syn0 = [1.0f32, 0.0, 0.0, 0.0];
        let mut syn1 = [0.0f32, 1.0, 0.0, 0.0];
        let mut neu1e = [0.0f32; 4];

        let g = HierarchicSoftmax { code: 1, alpha: 0.1 }
            .apply(&syn0, &mut syn1, &exp, &mut neu1e)
            .unwrap();

        assert!((g - (-0.05)).abs() < 1e-7);
        assert!((neu1e[1] - (-0.05)).abs() < 1e-7);
        assert_eq!(neu1e[0], 0.0);
        assert!((syn1[0] - (-0.05)).abs() < 1e-7);
        assert_eq!(syn1[1], 1.0);
    }

    #[test]
    fn test_matches_reference() {
        let values = crate::tables::sigmoid_table(1000);
        let exp = ExpTable::new(&values).unwrap();

        let syn0 = [0.3f32, -0.2, 0.5, 0.1, 0.7];
        let syn1_before = [0.4f32, 0.9, -0.3, 0.2, 0.05];
        let mut syn1 = syn1_before;
        let mut neu1e = [0.01f32; 5];
        let alpha = 0.025;
        let code = 0;

        HierarchicSoftmax { code, alpha }
            .apply(&syn0, &mut syn1, &exp, &mut neu1e)
            .unwrap();

        let dot: f32 = syn0.iter().zip(&syn1_before).map(|(a, b)| a * b).sum();
        let idx = ((dot + 6.0) * (1000.0 / 6.0 / 2.0)) as usize;
        let g = (1.0 - code as f32 - values[idx]) * alpha;

        for i in 0..5 {
            assert!((neu1e[i] - (0.01 + g * syn1_before[i])).abs() < 1e-6);
            assert!((syn1[i] - (syn1_before[i] + g * syn0[i])).abs() < 1e-6);
        }
    }

    #[test]
    fn test_saturated_dot_is_noop() {
        let values = flat_table();
        let exp = ExpTable::new(&values).unwrap();

        let syn0 = [3.0f32, 3.0];
        let mut syn1 = [1.0f32, 1.0];
        let mut neu1e = [0.0f32; 2];

        let g = HierarchicSoftmax { code: 0, alpha: 0.1 }.apply(&syn0, &mut syn1, &exp, &mut neu1e);

        assert!(g.is_none());
        assert_eq!(syn1, [1.0, 1.0]);
        assert_eq!(neu1e, [0.0, 0.0]);
    }
}
