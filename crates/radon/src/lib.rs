//! Differentiable Radon transform and back-projection.
//!
//! This crate re-exports the workspace crates behind a single dependency:
//!
//! - [`radon_core`]: geometry, projectors, batch dispatch and execution
//!   contexts
//! - `radon_autodiff` (feature `autodiff`): graph operators whose gradients
//!   are the adjoint projector
//!
//! # Example
//!
//! ```
//! use radon::prelude::*;
//!
//! let radon = Radon::new(64, ExecutionContext::default()).unwrap();
//! let angles = AngleSet::linspace(0.0, std::f64::consts::TAU, 10).unwrap();
//!
//! let images = Stack::zeros(&[2, 3, 64, 64]).unwrap();
//! let sinograms = radon.forward(&images, &angles).unwrap();
//! assert_eq!(sinograms.shape(), vec![2, 3, 10, 64]);
//! ```

pub use radon_core;

#[cfg(feature = "autodiff")]
pub use radon_autodiff;

pub use nalgebra;

pub use radon_core::{
    AngleSet, Backend, Dispatcher, ExecutionContext, ExecutionContextBuilder, Geometry,
    GeometryConfig, Radon, RadonError, Result, Scalar, Stack,
};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use radon_core::prelude::*;

    #[cfg(feature = "autodiff")]
    pub use radon_autodiff::{
        backward, check_gradients, grad, AutodiffError, DifferentiableFunction, Graph, NodeId,
        RadonBackprojectionOp, RadonForwardOp, RadonGraph, Tensor,
    };
}
