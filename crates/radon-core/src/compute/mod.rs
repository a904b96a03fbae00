//! Execution context and parallel scheduling.

pub mod context;
pub mod thresholds;

pub use context::{Backend, ExecutionContext, ExecutionContextBuilder};
pub use thresholds::ParallelThresholds;
