//! Relaxed atomic `f32` cells shared between lanes.

use std::sync::atomic::{AtomicU32, Ordering};

/// An `f32` stored as its bit pattern in an [`AtomicU32`].
///
/// Every access is `Relaxed`; ordering between lanes comes from the group
/// barrier, never from the cells themselves.
#[derive(Debug, Default)]
#[repr(transparent)]
pub struct AtomicF32 {
    bits: AtomicU32,
}

// `from_mut_slice` reinterprets `[f32]` in place.
const _: () = assert!(std::mem::size_of::<AtomicF32>() == std::mem::size_of::<f32>());
const _: () = assert!(std::mem::align_of::<AtomicF32>() == std::mem::align_of::<f32>());

impl AtomicF32 {
    /// Creates a cell holding `value`.
    pub fn new(value: f32) -> Self {
        Self {
            bits: AtomicU32::new(value.to_bits()),
        }
    }

    /// Reads the value.
    #[inline]
    pub fn load(&self) -> f32 {
        f32::from_bits(self.bits.load(Ordering::Relaxed))
    }

    /// Overwrites the value.
    #[inline]
    pub fn store(&self, value: f32) {
        self.bits.store(value.to_bits(), Ordering::Relaxed);
    }

    /// Adds `x` with a compare-and-swap loop and returns the previous value.
    ///
    /// Concurrent adds to the same cell are never lost, but the order in
    /// which they land is unspecified.
    #[inline]
    pub fn fetch_add(&self, x: f32) -> f32 {
        let mut current = self.bits.load(Ordering::Relaxed);
        loop {
            let next = (f32::from_bits(current) + x).to_bits();
            match self
                .bits
                .compare_exchange_weak(current, next, Ordering::Relaxed, Ordering::Relaxed)
            {
                Ok(previous) => return f32::from_bits(previous),
                Err(actual) => current = actual,
            }
        }
    }

    /// Adds `x` as a plain load followed by a store.
    ///
    /// This is the Hogwild update: a concurrent writer to the same cell can
    /// lose its update. Within a lane group each cell has exactly one writer
    /// per phase, so the loss only happens across groups.
    #[inline]
    pub fn add(&self, x: f32) {
        self.store(self.load() + x);
    }

    /// Views an exclusively borrowed `f32` slice as atomic cells.
    pub fn from_mut_slice(slice: &mut [f32]) -> &[AtomicF32] {
        // SAFETY: `AtomicF32` is `repr(transparent)` over `AtomicU32`, which
        // has the size and alignment of `f32` (checked above) and accepts every
        // bit pattern. The exclusive borrow guarantees no non-atomic access
        // happens while the returned view is alive.
        unsafe { std::slice::from_raw_parts(slice.as_mut_ptr().cast::<AtomicF32>(), slice.len()) }
    }
}

/// Allocates `len` zeroed cells.
pub fn zeroed(len: usize) -> Vec<AtomicF32> {
    (0..len).map(|_| AtomicF32::default()).collect()
}

/// Copies the current values out of a cell slice.
pub fn snapshot(cells: &[AtomicF32]) -> Vec<f32> {
    cells.iter().map(AtomicF32::load).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_load_store() {
        let cell = AtomicF32::new(1.5);
        assert_eq!(cell.load(), 1.5);
        cell.store(-0.25);
        assert_eq!(cell.load(), -0.25);
        cell.add(0.5);
        assert_eq!(cell.load(), 0.25);
    }

    #[test]
    fn test_fetch_add_concurrent() {
        let cell = Arc::new(AtomicF32::new(0.0));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let cell = Arc::clone(&cell);
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        cell.fetch_add(1.0);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        // Integers below 2^24 are exact in f32, so no add may go missing.
        assert_eq!(cell.load(), 4000.0);
    }

    #[test]
    fn test_from_mut_slice_writes_through() {
        let mut values = vec![1.0f32, 2.0, 3.0];
        {
            let cells = AtomicF32::from_mut_slice(&mut values);
            cells[1].add(0.5);
            assert_eq!(snapshot(cells), vec![1.0, 2.5, 3.0]);
        }
        assert_eq!(values, vec![1.0, 2.5, 3.0]);
    }

    #[test]
    fn test_zeroed() {
        assert_eq!(snapshot(&zeroed(3)), vec![0.0; 3]);
    }
}
