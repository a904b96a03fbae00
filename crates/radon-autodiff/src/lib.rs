//! Automatic differentiation through the Radon transform.
//!
//! This crate provides a minimal reverse-mode engine that hosts the Radon
//! operator pair from `radon-core`. Each projector is registered as a graph
//! operator whose gradient rule is the other projector, so any scalar loss
//! built from projections, element-wise arithmetic and reductions can be
//! differentiated with respect to its image or sinogram inputs.
//!
//! # Architecture
//!
//! 1. **Graph**: nodes, lazy evaluation and topological ordering
//! 2. **Operations**: element-wise ops, reductions and the Radon operators
//! 3. **Backward**: the reverse sweep and finite-difference checks
//!
//! # Example
//!
//! ```
//! use radon_autodiff::prelude::*;
//! use radon_core::{AngleSet, ExecutionContext, Radon, Stack};
//! use std::sync::Arc;
//!
//! let radon = Arc::new(Radon::new(16, ExecutionContext::sequential()).unwrap());
//! let angles = AngleSet::linspace(0.0, std::f64::consts::TAU, 10).unwrap();
//!
//! let graph = Graph::new();
//! let x = graph.variable(Stack::zeros(&[1, 16, 16]).unwrap());
//! let y = graph.radon_forward(x.id, &radon, &angles);
//! let z = graph.radon_backprojection(y, &radon, &angles);
//! let loss = graph.apply_op(Box::new(Mean), &[z]);
//!
//! let grads = backward(&graph, loss, None).unwrap();
//! assert_eq!(grads[&x.id].shape(), vec![1, 16, 16]);
//! ```

pub mod backward;
pub mod error;
pub mod function;
pub mod graph;
pub mod ops;
pub mod radon_ops;

// Re-export key types
pub use backward::{backward, check_gradients, grad, GradientMap};
pub use error::{AutodiffError, Result};
pub use function::DifferentiableFunction;
pub use graph::{scalar, scalar_value, Graph, Node, NodeId, Tensor, Variable};
pub use ops::{Add, Mean, Multiply, Op, Scale, Square, Sub, Sum};
pub use radon_ops::{RadonBackprojectionOp, RadonForwardOp, RadonGraph};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::backward::{backward, check_gradients, grad, GradientMap};
    pub use crate::error::{AutodiffError, Result};
    pub use crate::function::DifferentiableFunction;
    pub use crate::graph::{scalar, scalar_value, Graph, NodeId, Tensor, Variable};
    pub use crate::ops::{Add, Mean, Multiply, Op, Scale, Square, Sub, Sum};
    pub use crate::radon_ops::{RadonBackprojectionOp, RadonForwardOp, RadonGraph};
}
