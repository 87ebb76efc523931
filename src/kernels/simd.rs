//! Vectorization-friendly f32 primitives for the sequential path.
//!
//! Loops are unrolled 8-wide (one AVX register of f32) with a scalar
//! remainder, which LLVM reliably turns into packed instructions. None of
//! the loops carry a dependency across iterations other than the dot
//! product's running sum.

/// Compute the dot product of two f32 slices.
///
/// For `len < 8` the sum is accumulated strictly in index order.
#[inline]
pub fn dot_f32(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());

    let chunks = a.len() / 8;
    let remainder = a.len() % 8;
    let mut sum = 0.0f32;

    for i in 0..chunks {
        let base = i * 8;
        sum += a[base] * b[base]
            + a[base + 1] * b[base + 1]
            + a[base + 2] * b[base + 2]
            + a[base + 3] * b[base + 3]
            + a[base + 4] * b[base + 4]
            + a[base + 5] * b[base + 5]
            + a[base + 6] * b[base + 6]
            + a[base + 7] * b[base + 7];
    }

    let base = chunks * 8;
    for i in 0..remainder {
        sum += a[base + i] * b[base + i];
    }

    sum
}

/// In-place `y[i] = alpha * x[i] + y[i]`.
#[inline]
pub fn axpy_f32(alpha: f32, x: &[f32], y: &mut [f32]) {
    debug_assert_eq!(x.len(), y.len());

    let chunks = y.len() / 8;
    let remainder = y.len() % 8;

    for i in 0..chunks {
        let base = i * 8;
        y[base] += alpha * x[base];
        y[base + 1] += alpha * x[base + 1];
        y[base + 2] += alpha * x[base + 2];
        y[base + 3] += alpha * x[base + 3];
        y[base + 4] += alpha * x[base + 4];
        y[base + 5] += alpha * x[base + 5];
        y[base + 6] += alpha * x[base + 6];
        y[base + 7] += alpha * x[base + 7];
    }

    let base = chunks * 8;
    for i in 0..remainder {
        y[base + i] += alpha * x[base + i];
    }
}

/// Add src vector to dst vector (dst += src).
#[inline]
pub fn add_vectors_f32(dst: &mut [f32], src: &[f32]) {
    debug_assert_eq!(dst.len(), src.len());

    let chunks = dst.len() / 8;
    let remainder = dst.len() % 8;

    for i in 0..chunks {
        let base = i * 8;
        dst[base] += src[base];
        dst[base + 1] += src[base + 1];
        dst[base + 2] += src[base + 2];
        dst[base + 3] += src[base + 3];
        dst[base + 4] += src[base + 4];
        dst[base + 5] += src[base + 5];
        dst[base + 6] += src[base + 6];
        dst[base + 7] += src[base + 7];
    }

    let base = chunks * 8;
    for i in 0..remainder {
        dst[base + i] += src[base + i];
    }
}

/// Divide every element by `divisor`.
///
/// Division rather than multiplication by the reciprocal, so the result is
/// bit-identical to the lane-cooperative average.
#[inline]
pub fn div_f32(vec: &mut [f32], divisor: f32) {
    for v in vec.iter_mut() {
        *v /= divisor;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dot_product() {
        let a = vec![1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
        let b = vec![1.0f32, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0];
        let dot = dot_f32(&a, &b);
        let expected: f32 = (1..=8).sum::<i32>() as f32;
        assert!((dot - expected).abs() < 1e-5);
    }

    #[test]
    fn test_dot_short_vectors_exact() {
        let a = [0.5f32, -1.25, 2.0];
        let b = [4.0f32, 2.0, 0.25];
        // 2.0 - 2.5 + 0.5
        assert_eq!(dot_f32(&a, &b), 0.0);

        let a = [1.5f32, 2.0, -3.0, 0.125];
        let b = [2.0f32, 0.5, 1.0, 8.0];
        assert_eq!(dot_f32(&a, &b), 3.0 + 1.0 - 3.0 + 1.0);
    }

    #[test]
    fn test_dot_with_remainder() {
        let a: Vec<f32> = (0..11).map(|i| i as f32).collect();
        let b = vec![2.0f32; 11];
        assert!((dot_f32(&a, &b) - 110.0).abs() < 1e-4);
    }

    #[test]
    fn test_dot_empty() {
        assert_eq!(dot_f32(&[], &[]), 0.0);
    }

    #[test]
    fn test_axpy() {
        let x: Vec<f32> = (0..10).map(|i| i as f32).collect();
        let mut y = vec![1.0f32; 10];
        let before = y.clone();
        axpy_f32(0.5, &x, &mut y);
        for i in 0..10 {
            assert_eq!(y[i], 0.5 * x[i] + before[i]);
        }
    }

    #[test]
    fn test_add_vectors() {
        let mut dst = vec![1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0];
        let src = vec![1.0f32; 9];
        add_vectors_f32(&mut dst, &src);
        assert!((dst[0] - 2.0).abs() < 1e-5);
        assert!((dst[8] - 10.0).abs() < 1e-5);
    }

    #[test]
    fn test_div() {
        let mut v = vec![3.0f32, 6.0, 9.0];
        div_f32(&mut v, 3.0);
        assert_eq!(v, vec![1.0, 2.0, 3.0]);
    }
}
