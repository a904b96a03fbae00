//! Execution context threaded through `Radon` construction and every call.
//!
//! The context decides how the independent cells of a projector call are
//! scheduled: on the calling thread, on the global rayon pool, or on a
//! dedicated pool owned by the context. There is no process-wide default
//! beyond what `ExecutionContext::default()` hands back.

use crate::compute::thresholds::ParallelThresholds;
use crate::error::{RadonError, Result};
use log::{debug, warn};
use rayon::prelude::*;
use std::fmt;
use std::sync::Arc;

/// How cell computations are scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    /// Everything runs on the calling thread.
    Sequential,
    /// Cells and slices are spread over rayon workers above the thresholds.
    #[default]
    Parallel,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sequential => write!(f, "sequential"),
            Self::Parallel => write!(f, "parallel"),
        }
    }
}

/// Execution context for projector calls.
///
/// Cheap to clone: a dedicated thread pool is shared behind an `Arc`.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    backend: Backend,
    thresholds: ParallelThresholds,
    pool: Option<Arc<rayon::ThreadPool>>,
}

impl ExecutionContext {
    /// A context that runs everything on the calling thread.
    pub fn sequential() -> Self {
        Self {
            backend: Backend::Sequential,
            thresholds: ParallelThresholds::for_threads(1),
            pool: None,
        }
    }

    /// A parallel context on the global rayon pool.
    pub fn parallel() -> Self {
        Self {
            backend: Backend::Parallel,
            thresholds: ParallelThresholds::default(),
            pool: None,
        }
    }

    /// Start building a customised context.
    pub fn builder() -> ExecutionContextBuilder {
        ExecutionContextBuilder::new()
    }

    /// The scheduling backend.
    pub fn backend(&self) -> Backend {
        self.backend
    }

    /// Thresholds used to decide between sequential and parallel paths.
    pub fn thresholds(&self) -> &ParallelThresholds {
        &self.thresholds
    }

    /// Number of worker threads available to this context.
    pub fn num_threads(&self) -> usize {
        match (self.backend, &self.pool) {
            (Backend::Sequential, _) => 1,
            (Backend::Parallel, Some(pool)) => pool.current_num_threads(),
            (Backend::Parallel, None) => rayon::current_num_threads(),
        }
    }

    /// Whether this context owns a dedicated thread pool.
    pub fn has_dedicated_pool(&self) -> bool {
        self.pool.is_some()
    }

    /// Whether a slice with `cells` output cells runs in parallel.
    pub fn parallel_cells(&self, cells: usize) -> bool {
        self.backend == Backend::Parallel && self.thresholds.should_parallelize_cells(cells)
    }

    /// Whether `slices` independent slices are dispatched in parallel.
    pub fn parallel_slices(&self, slices: usize) -> bool {
        self.backend == Backend::Parallel && self.thresholds.should_parallelize_slices(slices)
    }

    /// Runs `op` inside the dedicated pool, or directly when there is none.
    pub fn install<R, F>(&self, op: F) -> R
    where
        R: Send,
        F: FnOnce() -> R + Send,
    {
        match &self.pool {
            Some(pool) => pool.install(op),
            None => op(),
        }
    }

    /// Evaluates `cell` for every index in `0..len`, in order.
    ///
    /// Each index is computed independently; the parallel path is taken
    /// when the cell count reaches the context's threshold.
    pub fn map_cells<T, F>(&self, len: usize, cell: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize) -> T + Send + Sync,
    {
        if self.parallel_cells(len) {
            (0..len).into_par_iter().map(cell).collect()
        } else {
            (0..len).map(cell).collect()
        }
    }

    /// Applies `op` to every slice, keeping slice order.
    ///
    /// Stops at the first error; no partial output is returned.
    pub fn map_slices<S, T, F>(&self, slices: &[S], op: F) -> Result<Vec<T>>
    where
        S: Sync,
        T: Send,
        F: Fn(usize, &S) -> Result<T> + Send + Sync,
    {
        if self.parallel_slices(slices.len()) {
            slices
                .par_iter()
                .enumerate()
                .map(|(i, s)| op(i, s))
                .collect()
        } else {
            slices.iter().enumerate().map(|(i, s)| op(i, s)).collect()
        }
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        if cfg!(feature = "parallel") {
            Self::parallel()
        } else {
            Self::sequential()
        }
    }
}

/// Builder for [`ExecutionContext`].
#[derive(Debug, Clone, Default)]
pub struct ExecutionContextBuilder {
    backend: Backend,
    num_threads: Option<usize>,
    cell_threshold: Option<usize>,
    slice_threshold: Option<usize>,
}

impl ExecutionContextBuilder {
    /// Create a builder for a parallel context on the global pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the scheduling backend.
    pub fn backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    /// Request a dedicated pool with `num_threads` workers.
    pub fn num_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = Some(num_threads);
        self
    }

    /// Override the per-slice cell threshold for parallel execution.
    pub fn min_parallel_cells(mut self, cells: usize) -> Self {
        self.cell_threshold = Some(cells);
        self
    }

    /// Override the slice-count threshold for parallel dispatch.
    pub fn min_parallel_slices(mut self, slices: usize) -> Self {
        self.slice_threshold = Some(slices);
        self
    }

    /// Build the context.
    ///
    /// Fails with a resource error when a dedicated pool is requested with
    /// zero threads or cannot be spawned.
    pub fn build(self) -> Result<ExecutionContext> {
        let pool = match (self.backend, self.num_threads) {
            (Backend::Parallel, Some(0)) => {
                return Err(RadonError::resource(
                    "a dedicated thread pool needs at least one thread",
                ))
            }
            (Backend::Parallel, Some(requested)) => {
                let limit = num_cpus::get().saturating_mul(4).max(1);
                let threads = if requested > limit {
                    warn!(
                        "requested {requested} threads, clamping to {limit} ({} logical CPUs)",
                        num_cpus::get()
                    );
                    limit
                } else {
                    requested
                };
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .thread_name(|i| format!("radon-worker-{i}"))
                    .build()?;
                Some(Arc::new(pool))
            }
            _ => None,
        };

        let mut thresholds = match (self.backend, &pool) {
            (Backend::Sequential, _) => ParallelThresholds::for_threads(1),
            (Backend::Parallel, Some(pool)) => {
                ParallelThresholds::for_threads(pool.current_num_threads())
            }
            (Backend::Parallel, None) => ParallelThresholds::default(),
        };
        if let Some(cells) = self.cell_threshold {
            thresholds.cell_threshold = cells;
        }
        if let Some(slices) = self.slice_threshold {
            thresholds.slice_threshold = slices;
        }

        debug!(
            "execution context: backend={}, threads={}, cell_threshold={}, slice_threshold={}",
            self.backend, thresholds.num_threads, thresholds.cell_threshold, thresholds.slice_threshold
        );

        Ok(ExecutionContext {
            backend: self.backend,
            thresholds,
            pool,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequential_context() {
        let ctx = ExecutionContext::sequential();
        assert_eq!(ctx.backend(), Backend::Sequential);
        assert_eq!(ctx.num_threads(), 1);
        assert!(!ctx.parallel_cells(usize::MAX));
        assert!(!ctx.parallel_slices(usize::MAX));
    }

    #[test]
    fn test_builder_dedicated_pool() {
        let ctx = ExecutionContext::builder()
            .num_threads(2)
            .min_parallel_cells(16)
            .build()
            .unwrap();
        assert!(ctx.has_dedicated_pool());
        assert_eq!(ctx.num_threads(), 2);
        assert!(ctx.parallel_cells(16));
        assert!(!ctx.parallel_cells(15));

        let inside = ctx.install(rayon::current_num_threads);
        assert_eq!(inside, 2);
    }

    #[test]
    fn test_builder_rejects_zero_threads() {
        let err = ExecutionContext::builder().num_threads(0).build().unwrap_err();
        assert!(matches!(err, RadonError::Resource { .. }));
    }

    #[test]
    fn test_map_cells_preserves_order() {
        let ctx = ExecutionContext::builder()
            .num_threads(2)
            .min_parallel_cells(1)
            .build()
            .unwrap();
        let values = ctx.install(|| ctx.map_cells(100, |i| i * 2));
        assert_eq!(values, (0..100).map(|i| i * 2).collect::<Vec<_>>());
    }

    #[test]
    fn test_map_slices_propagates_errors() {
        let ctx = ExecutionContext::sequential();
        let slices = vec![1, 2, 3];
        let result: Result<Vec<i32>> = ctx.map_slices(&slices, |_, &s| {
            if s == 2 {
                Err(RadonError::geometry("bad slice"))
            } else {
                Ok(s)
            }
        });
        assert!(result.is_err());

        let ok = ctx.map_slices(&slices, |i, &s| Ok(s + i as i32)).unwrap();
        assert_eq!(ok, vec![1, 3, 5]);
    }
}
