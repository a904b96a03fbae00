//! Thresholds for activating data-parallel execution.
//!
//! Projection cost is roughly proportional to the number of output cells
//! times the work per cell. Small calls run faster on one thread, so the
//! parallel path only kicks in above a cell count that scales with the
//! number of worker threads (more threads means more scheduling overhead).

/// Configuration for parallel execution thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParallelThresholds {
    /// Minimum number of output cells (sinogram bins or pixels) per slice
    pub cell_threshold: usize,

    /// Minimum number of slices before slices are dispatched in parallel
    pub slice_threshold: usize,

    /// Number of worker threads the thresholds were scaled for
    pub num_threads: usize,
}

impl ParallelThresholds {
    /// Thresholds scaled for the given number of worker threads.
    pub fn for_threads(num_threads: usize) -> Self {
        let num_threads = num_threads.max(1);

        // Single-threaded baselines: a 64x64 slice, or a pair of slices.
        let base_cells = 4_096;
        let base_slices = 2;

        let thread_scaling = (num_threads as f64).sqrt();

        Self {
            cell_threshold: (base_cells as f64 * thread_scaling) as usize,
            slice_threshold: base_slices,
            num_threads,
        }
    }

    /// Whether a slice with `cells` output cells should run in parallel.
    pub fn should_parallelize_cells(&self, cells: usize) -> bool {
        self.num_threads > 1 && cells >= self.cell_threshold
    }

    /// Whether `slices` independent slices should be dispatched in parallel.
    pub fn should_parallelize_slices(&self, slices: usize) -> bool {
        self.num_threads > 1 && slices >= self.slice_threshold
    }
}

impl Default for ParallelThresholds {
    fn default() -> Self {
        Self::for_threads(rayon::current_num_threads())
    }
}
