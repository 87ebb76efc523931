//! Lane groups and the publish/parallel phase machine.

use std::sync::Barrier;

/// One lane of a cooperative group.
///
/// Lanes only communicate through shared cells and only between phases:
/// every [`Lane::publish`] and [`Lane::parallel`] ends at the group barrier,
/// so a write made in one phase is visible to every lane in the next.
pub struct Lane<'g> {
    id: usize,
    count: usize,
    barrier: &'g Barrier,
}

impl<'g> Lane<'g> {
    /// Lane index within the group, `0..count`.
    #[inline]
    pub fn id(&self) -> usize {
        self.id
    }

    /// Number of lanes in the group.
    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }

    /// Lane 0 publishes shared state for the group.
    #[inline]
    pub fn is_leader(&self) -> bool {
        self.id == 0
    }

    /// Indices `id, id + count, ...` below `len` owned by this lane.
    #[inline]
    pub fn indices(&self, len: usize) -> impl Iterator<Item = usize> {
        (self.id..len).step_by(self.count)
    }

    /// Waits for every lane of the group.
    #[inline]
    pub fn sync(&self) {
        self.barrier.wait();
    }

    /// Runs `f` on the leader only, then waits for every lane.
    #[inline]
    pub fn publish(&self, f: impl FnOnce()) {
        if self.is_leader() {
            f();
        }
        self.sync();
    }

    /// Runs `f` for each strided index of this lane, then waits for every lane.
    #[inline]
    pub fn parallel(&self, len: usize, mut f: impl FnMut(usize)) {
        for i in self.indices(len) {
            f(i);
        }
        self.sync();
    }
}

/// A fixed-size group of lanes.
#[derive(Debug, Clone, Copy)]
pub struct LaneGroup {
    lanes: usize,
}

impl LaneGroup {
    /// Creates a group of `lanes` lanes (at least one).
    pub fn new(lanes: usize) -> Self {
        Self { lanes: lanes.max(1) }
    }

    /// Number of lanes.
    pub fn lanes(&self) -> usize {
        self.lanes
    }

    /// Runs `body` once on every lane and returns when all lanes have finished.
    ///
    /// Each lane is a scoped OS thread. A single lane runs on the calling
    /// thread, since its barrier never blocks.
    ///
    /// `body` must reach the same sequence of barriers on every lane; a lane
    /// that panics or takes a different branch leaves its siblings blocked.
    pub fn run<F>(&self, body: F)
    where
        F: Fn(&Lane<'_>) + Sync,
    {
        let barrier = Barrier::new(self.lanes);
        if self.lanes == 1 {
            body(&Lane {
                id: 0,
                count: 1,
                barrier: &barrier,
            });
            return;
        }

        std::thread::scope(|scope| {
            for id in 0..self.lanes {
                let barrier = &barrier;
                let body = &body;
                let count = self.lanes;
                scope.spawn(move || body(&Lane { id, count, barrier }));
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lanes::atomic::{snapshot, zeroed, AtomicF32};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_indices_partition() {
        let barrier = Barrier::new(1);
        let lanes: Vec<Lane<'_>> = (0..3)
            .map(|id| Lane {
                id,
                count: 3,
                barrier: &barrier,
            })
            .collect();

        let mut seen: Vec<usize> = lanes.iter().flat_map(|lane| lane.indices(10)).collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..10).collect::<Vec<_>>());
        assert_eq!(lanes[1].indices(10).collect::<Vec<_>>(), vec![1, 4, 7]);
    }

    #[test]
    fn test_every_lane_runs() {
        let ran = AtomicUsize::new(0);
        LaneGroup::new(4).run(|_| {
            ran.fetch_add(1, Ordering::Relaxed);
        });
        assert_eq!(ran.load(Ordering::Relaxed), 4);
    }

    #[test]
    fn test_publish_visible_after_barrier() {
        let cell = AtomicF32::new(0.0);
        let out = zeroed(5);
        LaneGroup::new(5).run(|lane| {
            lane.publish(|| cell.store(7.0));
            out[lane.id()].store(cell.load());
        });
        assert_eq!(snapshot(&out), vec![7.0; 5]);
    }

    #[test]
    fn test_parallel_covers_all_indices() {
        let cells = zeroed(17);
        LaneGroup::new(3).run(|lane| {
            lane.parallel(cells.len(), |i| cells[i].add(i as f32));
        });
        let expected: Vec<f32> = (0..17).map(|i| i as f32).collect();
        assert_eq!(snapshot(&cells), expected);
    }

    #[test]
    fn test_zero_lanes_clamped() {
        assert_eq!(LaneGroup::new(0).lanes(), 1);
    }
}
