//! Working vectors of the sequential orchestrators.

/// Per-invocation working memory (`neu1`, `neu1e`).
///
/// One `Scratch` is reused across the invocations of a batch; every
/// invocation starts from [`Scratch::reset`], so nothing leaks between them.
/// The buffers are released when the scratch is dropped, on every exit path.
#[derive(Debug, Clone)]
pub struct Scratch {
    neu1: Vec<f32>,
    neu1e: Vec<f32>,
}

impl Scratch {
    /// Allocates zeroed working vectors of `vector_length` elements.
    pub fn new(vector_length: usize) -> Self {
        Self {
            neu1: vec![0.0; vector_length],
            neu1e: vec![0.0; vector_length],
        }
    }

    /// Vector length the scratch was sized for.
    #[inline]
    pub fn vector_length(&self) -> usize {
        self.neu1e.len()
    }

    /// Zeroes both vectors and hands them out as `(neu1, neu1e)`.
    #[inline]
    pub fn reset(&mut self) -> (&mut [f32], &mut [f32]) {
        self.neu1.fill(0.0);
        self.neu1e.fill(0.0);
        (&mut self.neu1, &mut self.neu1e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_zeroes() {
        let mut scratch = Scratch::new(3);
        {
            let (neu1, neu1e) = scratch.reset();
            neu1[0] = 1.0;
            neu1e[2] = 2.0;
        }
        let (neu1, neu1e) = scratch.reset();
        assert_eq!(neu1, &[0.0; 3]);
        assert_eq!(neu1e, &[0.0; 3]);
    }
}
