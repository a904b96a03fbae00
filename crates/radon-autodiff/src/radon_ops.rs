//! Graph operators for the Radon transform and its adjoint.
//!
//! The forward projector and the back projector are each other's adjoint,
//! so each one's gradient rule is a single call to the other:
//!
//! - `y = forward(x)`: `dL/dx = backprojection(dL/dy)`
//! - `x = backprojection(y)`: `dL/dy = forward(dL/dx)`
//!
//! The angle set is part of the operator, not a graph input, so no
//! gradient is ever produced for it.

use crate::error::Result;
use crate::graph::{Graph, NodeId, Tensor};
use crate::ops::{check_arity, Op};
use log::trace;
use radon_core::{AngleSet, Radon};
use std::sync::Arc;

/// Forward projection as a graph operator.
#[derive(Debug, Clone)]
pub struct RadonForwardOp {
    radon: Arc<Radon>,
    angles: AngleSet<f64>,
}

impl RadonForwardOp {
    /// Creates the operator for a fixed projector and angle set.
    pub fn new(radon: Arc<Radon>, angles: AngleSet<f64>) -> Self {
        Self { radon, angles }
    }

    /// The projection angles.
    pub fn angles(&self) -> &AngleSet<f64> {
        &self.angles
    }
}

impl Op for RadonForwardOp {
    fn forward(&self, inputs: &[Tensor]) -> Result<Tensor> {
        check_arity(self.name(), inputs, 1)?;
        Ok(self.radon.forward(&inputs[0], &self.angles)?)
    }

    fn backward(&self, grad_output: &Tensor, _inputs: &[Tensor], _output: &Tensor) -> Result<Vec<Tensor>> {
        trace!(
            "RadonForward backward: {} angles, grad shape {:?}",
            self.angles.len(),
            grad_output.shape()
        );
        Ok(vec![self.radon.backprojection(grad_output, &self.angles)?])
    }

    fn name(&self) -> &str {
        "RadonForward"
    }
}

/// Back projection as a graph operator.
#[derive(Debug, Clone)]
pub struct RadonBackprojectionOp {
    radon: Arc<Radon>,
    angles: AngleSet<f64>,
}

impl RadonBackprojectionOp {
    /// Creates the operator for a fixed projector and angle set.
    pub fn new(radon: Arc<Radon>, angles: AngleSet<f64>) -> Self {
        Self { radon, angles }
    }

    /// The projection angles.
    pub fn angles(&self) -> &AngleSet<f64> {
        &self.angles
    }
}

impl Op for RadonBackprojectionOp {
    fn forward(&self, inputs: &[Tensor]) -> Result<Tensor> {
        check_arity(self.name(), inputs, 1)?;
        Ok(self.radon.backprojection(&inputs[0], &self.angles)?)
    }

    fn backward(&self, grad_output: &Tensor, _inputs: &[Tensor], _output: &Tensor) -> Result<Vec<Tensor>> {
        trace!(
            "RadonBackprojection backward: {} angles, grad shape {:?}",
            self.angles.len(),
            grad_output.shape()
        );
        Ok(vec![self.radon.forward(grad_output, &self.angles)?])
    }

    fn name(&self) -> &str {
        "RadonBackprojection"
    }
}

/// Extension trait for Graph to add the Radon operator pair.
pub trait RadonGraph {
    /// Forward projection of the images at `x`.
    fn radon_forward(&self, x: NodeId, radon: &Arc<Radon>, angles: &AngleSet<f64>) -> NodeId;

    /// Back projection of the sinograms at `y`.
    fn radon_backprojection(&self, y: NodeId, radon: &Arc<Radon>, angles: &AngleSet<f64>)
        -> NodeId;
}

impl RadonGraph for Graph {
    fn radon_forward(&self, x: NodeId, radon: &Arc<Radon>, angles: &AngleSet<f64>) -> NodeId {
        self.apply_op(
            Box::new(RadonForwardOp::new(Arc::clone(radon), angles.clone())),
            &[x],
        )
    }

    fn radon_backprojection(
        &self,
        y: NodeId,
        radon: &Arc<Radon>,
        angles: &AngleSet<f64>,
    ) -> NodeId {
        self.apply_op(
            Box::new(RadonBackprojectionOp::new(Arc::clone(radon), angles.clone())),
            &[y],
        )
    }
}
