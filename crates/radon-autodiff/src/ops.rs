//! Operations for the computation graph.
//!
//! Element-wise arithmetic and the reductions needed to turn projector
//! outputs into scalar losses. Shape mismatches surface as errors from
//! the underlying [`Tensor`] operations.

use crate::error::{AutodiffError, Result};
use crate::graph::{scalar, scalar_value, Tensor};
use std::fmt::Debug;

/// Trait for operations in the computation graph.
pub trait Op: Debug {
    /// Performs the forward computation.
    fn forward(&self, inputs: &[Tensor]) -> Result<Tensor>;

    /// Computes the gradient with respect to each input.
    ///
    /// # Arguments
    /// * `grad_output` - The gradient flowing from the output
    /// * `inputs` - The input values used in the forward pass
    /// * `output` - The output value from the forward pass
    ///
    /// # Returns
    /// A vector of gradients, one for each input
    fn backward(&self, grad_output: &Tensor, inputs: &[Tensor], output: &Tensor)
        -> Result<Vec<Tensor>>;

    /// Returns the name of this operation.
    fn name(&self) -> &str;
}

/// Fails unless `inputs` holds exactly `expected` tensors.
pub(crate) fn check_arity(op: &str, inputs: &[Tensor], expected: usize) -> Result<()> {
    if inputs.len() == expected {
        Ok(())
    } else {
        Err(AutodiffError::invalid_input(
            op,
            format!("expected {expected} inputs, got {}", inputs.len()),
        ))
    }
}

fn upstream_scalar(op: &str, grad_output: &Tensor) -> Result<f64> {
    scalar_value(grad_output).ok_or_else(|| {
        AutodiffError::invalid_input(
            op,
            format!("expected a scalar gradient, got shape {:?}", grad_output.shape()),
        )
    })
}

/// Element-wise addition operation.
#[derive(Debug, Clone)]
pub struct Add;

impl Op for Add {
    fn forward(&self, inputs: &[Tensor]) -> Result<Tensor> {
        check_arity(self.name(), inputs, 2)?;
        Ok(inputs[0].zip_map(&inputs[1], |a, b| a + b)?)
    }

    fn backward(&self, grad_output: &Tensor, _inputs: &[Tensor], _output: &Tensor) -> Result<Vec<Tensor>> {
        Ok(vec![grad_output.clone(), grad_output.clone()])
    }

    fn name(&self) -> &str {
        "Add"
    }
}

/// Element-wise subtraction operation.
#[derive(Debug, Clone)]
pub struct Sub;

impl Op for Sub {
    fn forward(&self, inputs: &[Tensor]) -> Result<Tensor> {
        check_arity(self.name(), inputs, 2)?;
        Ok(inputs[0].zip_map(&inputs[1], |a, b| a - b)?)
    }

    fn backward(&self, grad_output: &Tensor, _inputs: &[Tensor], _output: &Tensor) -> Result<Vec<Tensor>> {
        Ok(vec![grad_output.clone(), grad_output.map(|g| -g)])
    }

    fn name(&self) -> &str {
        "Sub"
    }
}

/// Multiplication by a constant factor.
#[derive(Debug, Clone)]
pub struct Scale {
    /// The constant factor
    pub factor: f64,
}

impl Scale {
    /// Creates a scaling operation.
    pub fn new(factor: f64) -> Self {
        Self { factor }
    }
}

impl Op for Scale {
    fn forward(&self, inputs: &[Tensor]) -> Result<Tensor> {
        check_arity(self.name(), inputs, 1)?;
        Ok(inputs[0].map(|x| x * self.factor))
    }

    fn backward(&self, grad_output: &Tensor, _inputs: &[Tensor], _output: &Tensor) -> Result<Vec<Tensor>> {
        Ok(vec![grad_output.map(|g| g * self.factor)])
    }

    fn name(&self) -> &str {
        "Scale"
    }
}

/// Element-wise multiplication operation.
#[derive(Debug, Clone)]
pub struct Multiply;

impl Op for Multiply {
    fn forward(&self, inputs: &[Tensor]) -> Result<Tensor> {
        check_arity(self.name(), inputs, 2)?;
        Ok(inputs[0].zip_map(&inputs[1], |a, b| a * b)?)
    }

    fn backward(&self, grad_output: &Tensor, inputs: &[Tensor], _output: &Tensor) -> Result<Vec<Tensor>> {
        check_arity(self.name(), inputs, 2)?;
        // d/dx (x * y) = y
        // d/dy (x * y) = x
        Ok(vec![
            grad_output.zip_map(&inputs[1], |g, y| g * y)?,
            grad_output.zip_map(&inputs[0], |g, x| g * x)?,
        ])
    }

    fn name(&self) -> &str {
        "Multiply"
    }
}

/// Element-wise square.
#[derive(Debug, Clone)]
pub struct Square;

impl Op for Square {
    fn forward(&self, inputs: &[Tensor]) -> Result<Tensor> {
        check_arity(self.name(), inputs, 1)?;
        Ok(inputs[0].map(|x| x * x))
    }

    fn backward(&self, grad_output: &Tensor, inputs: &[Tensor], _output: &Tensor) -> Result<Vec<Tensor>> {
        check_arity(self.name(), inputs, 1)?;
        Ok(vec![grad_output.zip_map(&inputs[0], |g, x| 2.0 * x * g)?])
    }

    fn name(&self) -> &str {
        "Square"
    }
}

/// Sum of all elements, as a scalar.
#[derive(Debug, Clone)]
pub struct Sum;

impl Op for Sum {
    fn forward(&self, inputs: &[Tensor]) -> Result<Tensor> {
        check_arity(self.name(), inputs, 1)?;
        Ok(scalar(inputs[0].sum()))
    }

    fn backward(&self, grad_output: &Tensor, inputs: &[Tensor], _output: &Tensor) -> Result<Vec<Tensor>> {
        check_arity(self.name(), inputs, 1)?;
        let g = upstream_scalar(self.name(), grad_output)?;
        Ok(vec![inputs[0].full_like(g)])
    }

    fn name(&self) -> &str {
        "Sum"
    }
}

/// Mean of all elements, as a scalar.
#[derive(Debug, Clone)]
pub struct Mean;

impl Op for Mean {
    fn forward(&self, inputs: &[Tensor]) -> Result<Tensor> {
        check_arity(self.name(), inputs, 1)?;
        let n = inputs[0].num_elements();
        if n == 0 {
            return Err(AutodiffError::invalid_input(self.name(), "mean of an empty tensor"));
        }
        Ok(scalar(inputs[0].sum() / n as f64))
    }

    fn backward(&self, grad_output: &Tensor, inputs: &[Tensor], _output: &Tensor) -> Result<Vec<Tensor>> {
        check_arity(self.name(), inputs, 1)?;
        let g = upstream_scalar(self.name(), grad_output)?;
        let n = inputs[0].num_elements() as f64;
        Ok(vec![inputs[0].full_like(g / n)])
    }

    fn name(&self) -> &str {
        "Mean"
    }
}
