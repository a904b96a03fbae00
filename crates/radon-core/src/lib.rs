//! Core types and kernels for the Radon transform.
//!
//! This crate provides the discrete Radon transform (forward projection,
//! image → sinogram) and its adjoint (back projection, sinogram → image)
//! for square images and an arbitrary set of projection angles. The two
//! kernels share one sampling rule, so the back projector is the exact
//! transpose of the forward projector and can serve as its gradient.
//!
//! # Key Concepts
//!
//! - **Geometry**: image side length and the derived detector and ray
//!   sampling grid, fixed once per resolution
//! - **Angle set**: projection angles in radians, supplied per call
//! - **Stack**: images or sinograms with up to two leading (batch,
//!   channel) dimensions
//! - **Execution context**: sequential or rayon-parallel scheduling,
//!   optionally on a dedicated thread pool
//!
//! # Modules
//!
//! - [`batch`]: `Stack` container and the batch/channel dispatcher
//! - [`compute`]: execution contexts and parallel thresholds
//! - [`error`]: error types
//! - [`geometry`]: scanning geometry and angle sets
//! - [`numerical`]: adjoint validation
//! - [`projector`]: forward and back projection kernels
//! - [`radon`]: the `Radon` entry point
//! - [`types`]: scalar trait and type aliases

pub mod batch;
pub mod compute;
pub mod error;
pub mod geometry;
pub mod numerical;
pub mod projector;
pub mod radon;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod utils;

// Re-export commonly used items at the crate root
pub use batch::{Dispatcher, Stack};
pub use compute::{Backend, ExecutionContext, ExecutionContextBuilder, ParallelThresholds};
pub use error::{RadonError, Result};
pub use geometry::{AngleSet, Geometry, GeometryConfig};
pub use radon::Radon;
pub use types::Scalar;

/// Prelude module for convenient imports.
///
/// # Example
/// ```
/// use radon_core::prelude::*;
///
/// let radon = Radon::new(16, ExecutionContext::sequential()).unwrap();
/// assert_eq!(radon.num_detectors(), 16);
/// ```
pub mod prelude {
    pub use crate::batch::{Dispatcher, Stack};
    pub use crate::compute::{Backend, ExecutionContext, ExecutionContextBuilder};
    pub use crate::error::{RadonError, Result};
    pub use crate::geometry::{AngleSet, Geometry, GeometryConfig};
    pub use crate::numerical::{AdjointCheckConfig, AdjointValidator};
    pub use crate::projector::{BackProjector, ForwardProjector, Projector};
    pub use crate::radon::Radon;
    pub use crate::types::{constants, DMatrix, Image, Scalar, Sinogram};
}
