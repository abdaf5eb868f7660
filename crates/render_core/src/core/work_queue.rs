//! Frame-scoped parallel execution with deterministic lane assignment
//!
//! Provides the fork/join primitive the collector runs its parallel stages
//! on. Work is split into contiguous index ranges, each range is pinned to a
//! lane, and the calling thread always executes lane 0 itself. Joining the
//! scope is the barrier between pipeline stages.
//!
//! Lane assignment depends only on input length, threshold, and lane count,
//! never on thread timing, so per-lane outputs merge into the same order
//! every frame.

use std::ops::Range;
use std::thread;

/// A unit of work bound to a single lane for one parallel section
pub type LaneJob<'env> = Box<dyn FnOnce() + Send + 'env>;

/// Fork/join executor with a fixed number of worker lanes.
///
/// Threads are spawned per parallel section through [`std::thread::scope`],
/// which lets jobs borrow frame-local data without `'static` bounds and
/// joins every worker before the section returns.
#[derive(Debug, Clone)]
pub struct WorkQueue {
    /// Number of helper threads; the caller adds one more lane
    worker_count: usize,
}

impl WorkQueue {
    /// Create a work queue with the given number of helper threads.
    ///
    /// `worker_count` of zero is valid: every section then runs inline on
    /// the calling thread, which keeps single-threaded runs fully
    /// deterministic and easy to debug.
    pub fn new(worker_count: usize) -> Self {
        Self { worker_count }
    }

    /// Total number of lanes (helper threads plus the calling thread)
    pub fn num_lanes(&self) -> usize {
        self.worker_count + 1
    }

    /// Split `len` items into contiguous ranges, one per lane at most.
    ///
    /// `threshold` is the minimum number of items that justifies occupying
    /// a lane; short inputs collapse into fewer ranges so tiny workloads
    /// stay on the calling thread. Ranges cover `0..len` exactly, in order.
    pub fn partition(&self, len: usize, threshold: usize) -> Vec<Range<usize>> {
        if len == 0 {
            return Vec::new();
        }
        let threshold = threshold.max(1);
        let parts = len.div_ceil(threshold).min(self.num_lanes()).max(1);
        let chunk = len.div_ceil(parts);

        let mut ranges = Vec::with_capacity(parts);
        let mut start = 0;
        while start < len {
            let end = (start + chunk).min(len);
            ranges.push(start..end);
            start = end;
        }
        ranges
    }

    /// Run one job per lane and wait for all of them.
    ///
    /// Job `0` executes on the calling thread while the rest run on scoped
    /// worker threads; the function returns only after every job finished.
    /// Callers pass at most [`num_lanes`](Self::num_lanes) jobs.
    pub fn run_lanes<'env>(&self, jobs: Vec<LaneJob<'env>>) {
        debug_assert!(jobs.len() <= self.num_lanes());

        let mut jobs = jobs.into_iter();
        let first = match jobs.next() {
            Some(job) => job,
            None => return,
        };
        if jobs.len() == 0 {
            first();
            return;
        }

        thread::scope(|scope| {
            for job in jobs {
                scope.spawn(job);
            }
            first();
        });
    }

    /// Parallel iteration over a slice in lane-sized contiguous chunks.
    ///
    /// `func` receives the lane index and one item; every item is visited
    /// exactly once. The chunk-to-lane mapping follows [`Self::partition`].
    pub fn for_each<T, F>(&self, items: &[T], threshold: usize, func: F)
    where
        T: Sync,
        F: Fn(usize, &T) + Send + Sync,
    {
        let ranges = self.partition(items.len(), threshold);
        let (first, rest) = match ranges.split_first() {
            Some(split) => split,
            None => return,
        };

        if rest.is_empty() {
            for item in &items[first.clone()] {
                func(0, item);
            }
            return;
        }

        let func = &func;
        thread::scope(|scope| {
            for (offset, range) in rest.iter().enumerate() {
                let lane = offset + 1;
                let slice = &items[range.clone()];
                scope.spawn(move || {
                    for item in slice {
                        func(lane, item);
                    }
                });
            }
            for item in &items[first.clone()] {
                func(0, item);
            }
        });
    }
}
