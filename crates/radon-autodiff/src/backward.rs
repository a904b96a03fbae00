//! Backward pass implementation for automatic differentiation.
//!
//! This module implements the backpropagation algorithm to compute
//! gradients through the computation graph.

use crate::error::{AutodiffError, Result};
use crate::graph::{scalar_value, Graph, NodeId, Tensor};
use log::debug;
use std::collections::HashMap;

/// Type alias for gradient storage.
pub type GradientMap = HashMap<NodeId, Tensor>;

/// Performs backward pass (backpropagation) through the graph.
///
/// # Arguments
/// * `graph` - The computation graph
/// * `output_node` - The node to compute gradients from
/// * `grad_output` - The initial gradient (defaults to ones)
///
/// # Returns
/// A map from node IDs to their gradients. Only nodes that require a
/// gradient appear in it.
pub fn backward(graph: &Graph, output_node: NodeId, grad_output: Option<Tensor>) -> Result<GradientMap> {
    let output_value = graph.forward(output_node)?;
    let initial_grad = grad_output.unwrap_or_else(|| output_value.full_like(1.0));

    let mut gradients = GradientMap::new();
    gradients.insert(output_node, initial_grad);

    let order = graph.topological_order();
    debug!("backward from {output_node} over {} nodes", order.len());

    for &node_id in order.iter().rev() {
        let Some(node_grad) = gradients.get(&node_id).cloned() else {
            continue;
        };
        let Some(node_rc) = graph.get_node(node_id) else {
            continue;
        };
        let node = node_rc.borrow();

        let op = match &node.op {
            Some(op) if node.requires_grad => op,
            _ => continue,
        };

        let input_values = node
            .inputs
            .iter()
            .map(|&input| {
                graph
                    .get_value(input)
                    .ok_or(AutodiffError::MissingValue { node: input })
            })
            .collect::<Result<Vec<_>>>()?;
        let output = node
            .value
            .as_ref()
            .ok_or(AutodiffError::MissingValue { node: node_id })?;

        let input_grads = op.backward(&node_grad, &input_values, output)?;
        if input_grads.len() != node.inputs.len() {
            return Err(AutodiffError::invalid_input(
                op.name(),
                format!(
                    "backward returned {} gradients for {} inputs",
                    input_grads.len(),
                    node.inputs.len()
                ),
            ));
        }

        for (&input_id, grad) in node.inputs.iter().zip(input_grads) {
            if !graph.requires_grad(input_id) {
                continue;
            }
            let accumulated = match gradients.remove(&input_id) {
                Some(existing) => existing.zip_map(&grad, |a, b| a + b)?,
                None => grad,
            };
            gradients.insert(input_id, accumulated);
        }
    }

    Ok(gradients)
}

/// Computes the gradient of a scalar output with respect to specified inputs.
///
/// Inputs that do not influence the output get no entry.
pub fn grad(graph: &Graph, output_node: NodeId, input_nodes: &[NodeId]) -> Result<GradientMap> {
    let mut all_grads = backward(graph, output_node, None)?;
    Ok(input_nodes
        .iter()
        .filter_map(|&id| all_grads.remove(&id).map(|g| (id, g)))
        .collect())
}

/// Checks gradients using central finite differences.
///
/// Each element of `input_node` is perturbed by `±epsilon` and the scalar
/// output re-evaluated. The error of one element is
/// `|numerical - analytical| / max(1, |numerical|, |analytical|)`: relative
/// for large gradients, absolute for small ones.
///
/// # Returns
/// The maximum error over all elements
pub fn check_gradients(graph: &Graph, output_node: NodeId, input_node: NodeId, epsilon: f64) -> Result<f64> {
    let saved = graph
        .get_value(input_node)
        .ok_or(AutodiffError::MissingValue { node: input_node })?;
    let analytical = grad(graph, output_node, &[input_node])?
        .remove(&input_node)
        .unwrap_or_else(|| saved.full_like(0.0))
        .to_vec();

    let shape = saved.shape();
    let data = saved.to_vec();
    let max_error = analytical
        .iter()
        .enumerate()
        .try_fold(0.0_f64, |max_error, (i, &analytical_elem)| {
            let f_plus =
                evaluate_perturbed(graph, output_node, input_node, &shape, &data, i, epsilon)?;
            let f_minus =
                evaluate_perturbed(graph, output_node, input_node, &shape, &data, i, -epsilon)?;

            let numerical = (f_plus - f_minus) / (2.0 * epsilon);
            let denom = numerical.abs().max(analytical_elem.abs()).max(1.0);
            Ok(max_error.max((numerical - analytical_elem).abs() / denom))
        });

    // Restore the input even when an evaluation failed.
    graph.set_value(input_node, saved)?;
    max_error
}

fn evaluate_perturbed(
    graph: &Graph,
    output_node: NodeId,
    input_node: NodeId,
    shape: &[usize],
    data: &[f64],
    index: usize,
    delta: f64,
) -> Result<f64> {
    let mut perturbed = data.to_vec();
    perturbed[index] += delta;
    graph.set_value(input_node, Tensor::from_shape_vec(shape, perturbed)?)?;
    let value = graph.forward(output_node)?;
    scalar_value(&value).ok_or_else(|| {
        AutodiffError::invalid_input(
            "check_gradients",
            format!("output must be a scalar, got shape {:?}", value.shape()),
        )
    })
}
