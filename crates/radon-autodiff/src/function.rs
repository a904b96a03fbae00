//! Differentiable scalar functions built on a graph.

use crate::backward::{backward, GradientMap};
use crate::error::{AutodiffError, Result};
use crate::graph::{scalar_value, Graph, NodeId, Tensor};
use std::collections::HashMap;

/// A scalar function of one or more tensor inputs.
///
/// Inputs are added with [`DifferentiableFunction::add_input`], the loss is
/// built on [`DifferentiableFunction::graph`] and registered with
/// [`DifferentiableFunction::set_output`].
#[derive(Debug)]
pub struct DifferentiableFunction {
    /// The computation graph
    pub graph: Graph,
    inputs: Vec<NodeId>,
    output: Option<NodeId>,
}

impl DifferentiableFunction {
    /// Creates a function over `graph`.
    pub fn new(graph: Graph) -> Self {
        Self {
            graph,
            inputs: Vec::new(),
            output: None,
        }
    }

    /// Adds a differentiable input with its initial value.
    pub fn add_input(&mut self, value: Tensor) -> NodeId {
        let id = self.graph.variable(value).id;
        self.inputs.push(id);
        id
    }

    /// Adds a named differentiable input.
    pub fn add_named_input(&mut self, value: Tensor, name: impl Into<String>) -> NodeId {
        let id = self.graph.named_variable(value, name).id;
        self.inputs.push(id);
        id
    }

    /// The inputs in the order they were added.
    pub fn inputs(&self) -> &[NodeId] {
        &self.inputs
    }

    /// Sets the scalar output node.
    pub fn set_output(&mut self, output: NodeId) {
        self.output = Some(output);
    }

    fn output(&self) -> Result<NodeId> {
        self.output
            .ok_or_else(|| AutodiffError::invalid_input("DifferentiableFunction", "no output set"))
    }

    fn bind(&self, values: &HashMap<NodeId, Tensor>) -> Result<()> {
        for (&id, value) in values {
            if !self.inputs.contains(&id) {
                return Err(AutodiffError::invalid_input(
                    "DifferentiableFunction",
                    format!("{id} is not an input"),
                ));
            }
            self.graph.set_value(id, value.clone())?;
        }
        Ok(())
    }

    /// Evaluates the function, replacing the given input values first.
    pub fn value(&self, values: &HashMap<NodeId, Tensor>) -> Result<f64> {
        self.bind(values)?;
        let output = self.output()?;
        let result = self.graph.forward(output)?;
        scalar_value(&result).ok_or_else(|| {
            AutodiffError::invalid_input(
                "DifferentiableFunction",
                format!("output must be a scalar, got shape {:?}", result.shape()),
            )
        })
    }

    /// Evaluates the function and its gradient with respect to every input.
    ///
    /// Inputs the output does not depend on get a zero gradient.
    pub fn value_and_grad(&self, values: &HashMap<NodeId, Tensor>) -> Result<(f64, GradientMap)> {
        let value = self.value(values)?;
        let mut all_grads = backward(&self.graph, self.output()?, None)?;

        let mut grads = GradientMap::with_capacity(self.inputs.len());
        for &id in &self.inputs {
            let grad = match all_grads.remove(&id) {
                Some(grad) => grad,
                None => self
                    .graph
                    .get_value(id)
                    .ok_or(AutodiffError::MissingValue { node: id })?
                    .full_like(0.0),
            };
            grads.insert(id, grad);
        }
        Ok((value, grads))
    }
}
