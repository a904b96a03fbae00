//! Computation graph for automatic differentiation.
//!
//! Nodes hold [`Tensor`] values: images, sinograms or scalars, all stored as
//! a [`Stack`] so that batched inputs flow through the graph unchanged. A
//! scalar is a stack of shape `(1, 1)`.

use crate::error::{AutodiffError, Result};
use crate::ops::Op;
use log::trace;
use nalgebra::DMatrix;
use radon_core::Stack;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::Rc;

/// Unique identifier for nodes in the computation graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node{}", self.0)
    }
}

/// Values carried by graph nodes.
pub type Tensor = Stack<f64>;

/// A `(1, 1)` tensor holding `value`.
pub fn scalar(value: f64) -> Tensor {
    Stack::from_matrix(DMatrix::from_element(1, 1, value))
}

/// The value of a single-element tensor.
pub fn scalar_value(tensor: &Tensor) -> Option<f64> {
    if tensor.num_elements() == 1 {
        tensor.slice(0).map(|m| m[(0, 0)])
    } else {
        None
    }
}

/// A variable in the computation graph.
#[derive(Debug, Clone)]
pub struct Variable {
    /// Unique identifier for this variable
    pub id: NodeId,
    /// Name of the variable (optional)
    pub name: Option<String>,
    /// Whether this variable requires gradient computation
    pub requires_grad: bool,
}

impl Variable {
    /// Creates a new variable with the given ID.
    pub fn new(id: NodeId) -> Self {
        Self {
            id,
            name: None,
            requires_grad: true,
        }
    }

    /// Sets the name of the variable.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets whether the variable requires gradient.
    pub fn with_requires_grad(mut self, requires_grad: bool) -> Self {
        self.requires_grad = requires_grad;
        self
    }
}

/// A node in the computation graph.
#[derive(Debug)]
pub struct Node {
    /// Unique identifier
    pub id: NodeId,
    /// The value computed at this node
    pub value: Option<Tensor>,
    /// The operation that produced this node
    pub op: Option<Box<dyn Op>>,
    /// Input nodes to this operation
    pub inputs: Vec<NodeId>,
    /// Whether this node requires gradient
    pub requires_grad: bool,
    /// Optional name for debugging
    pub name: Option<String>,
}

impl Node {
    /// Creates a new input node with a value.
    pub fn input(id: NodeId, value: Tensor) -> Self {
        Self {
            id,
            value: Some(value),
            op: None,
            inputs: Vec::new(),
            requires_grad: false,
            name: None,
        }
    }

    /// Creates a new node from an operation.
    pub fn from_op(id: NodeId, op: Box<dyn Op>, inputs: Vec<NodeId>, requires_grad: bool) -> Self {
        Self {
            id,
            value: None,
            op: Some(op),
            inputs,
            requires_grad,
            name: None,
        }
    }

    /// Checks if this node is a leaf (has no operation).
    pub fn is_leaf(&self) -> bool {
        self.op.is_none()
    }
}

/// The computation graph structure.
///
/// Values of operation nodes are computed lazily by [`Graph::forward`] and
/// cached until a leaf value changes.
#[derive(Debug)]
pub struct Graph {
    /// All nodes in the graph, indexed by their ID
    nodes: RefCell<HashMap<NodeId, Rc<RefCell<Node>>>>,
    /// Counter for generating unique node IDs
    next_id: RefCell<usize>,
    /// Whether to track gradients
    track_gradients: bool,
}

impl Graph {
    /// Creates a new empty computation graph.
    pub fn new() -> Self {
        Self {
            nodes: RefCell::new(HashMap::new()),
            next_id: RefCell::new(0),
            track_gradients: true,
        }
    }

    /// Creates a new graph with gradient tracking disabled.
    pub fn no_grad() -> Self {
        Self {
            track_gradients: false,
            ..Self::new()
        }
    }

    fn new_node_id(&self) -> NodeId {
        let mut id = self.next_id.borrow_mut();
        let node_id = NodeId(*id);
        *id += 1;
        node_id
    }

    fn insert(&self, node: Node) -> NodeId {
        let id = node.id;
        self.nodes.borrow_mut().insert(id, Rc::new(RefCell::new(node)));
        id
    }

    /// Creates a new variable (input node) in the graph.
    pub fn variable(&self, value: Tensor) -> Variable {
        let mut node = Node::input(self.new_node_id(), value);
        node.requires_grad = self.track_gradients;
        let id = self.insert(node);
        Variable::new(id).with_requires_grad(self.track_gradients)
    }

    /// Creates a new variable with a name.
    pub fn named_variable(&self, value: Tensor, name: impl Into<String>) -> Variable {
        let name = name.into();
        let mut node = Node::input(self.new_node_id(), value);
        node.name = Some(name.clone());
        node.requires_grad = self.track_gradients;
        let id = self.insert(node);
        Variable::new(id)
            .with_name(name)
            .with_requires_grad(self.track_gradients)
    }

    /// Creates a constant (non-differentiable) node in the graph.
    pub fn constant(&self, value: Tensor) -> NodeId {
        self.insert(Node::input(self.new_node_id(), value))
    }

    /// Creates a new node from an operation.
    ///
    /// The node requires a gradient when any of its inputs does.
    pub fn apply_op(&self, op: Box<dyn Op>, inputs: &[NodeId]) -> NodeId {
        let requires_grad = self.track_gradients
            && inputs.iter().any(|&input| self.requires_grad(input));
        trace!("graph: {} on {:?}", op.name(), inputs);
        self.insert(Node::from_op(
            self.new_node_id(),
            op,
            inputs.to_vec(),
            requires_grad,
        ))
    }

    /// Gets a node by its ID.
    pub fn get_node(&self, id: NodeId) -> Option<Rc<RefCell<Node>>> {
        self.nodes.borrow().get(&id).cloned()
    }

    fn node(&self, id: NodeId) -> Result<Rc<RefCell<Node>>> {
        self.get_node(id)
            .ok_or(AutodiffError::UnknownNode { node: id })
    }

    /// Whether the node takes part in gradient computation.
    pub fn requires_grad(&self, id: NodeId) -> bool {
        self.get_node(id)
            .is_some_and(|node| node.borrow().requires_grad)
    }

    /// Gets the cached value of a node.
    pub fn get_value(&self, id: NodeId) -> Option<Tensor> {
        self.get_node(id)
            .and_then(|node| node.borrow().value.clone())
    }

    /// Replaces the value of a leaf node.
    ///
    /// Cached values of operation nodes are dropped, so the next
    /// [`Graph::forward`] recomputes them from the new input.
    pub fn set_value(&self, id: NodeId, value: Tensor) -> Result<()> {
        let node = self.node(id)?;
        if !node.borrow().is_leaf() {
            return Err(AutodiffError::invalid_input(
                "set_value",
                format!("{id} is computed by an operation"),
            ));
        }
        node.borrow_mut().value = Some(value);
        self.clear_values();
        Ok(())
    }

    /// Computes (or returns the cached) value of `target`.
    pub fn forward(&self, target: NodeId) -> Result<Tensor> {
        let node_rc = self.node(target)?;

        let inputs = {
            let node = node_rc.borrow();
            if let Some(value) = &node.value {
                return Ok(value.clone());
            }
            if node.is_leaf() {
                return Err(AutodiffError::MissingValue { node: target });
            }
            node.inputs.clone()
        };

        let input_values = inputs
            .iter()
            .map(|&input| self.forward(input))
            .collect::<Result<Vec<_>>>()?;

        let result = {
            let node = node_rc.borrow();
            match &node.op {
                Some(op) => op.forward(&input_values)?,
                None => return Err(AutodiffError::MissingValue { node: target }),
            }
        };

        node_rc.borrow_mut().value = Some(result.clone());
        Ok(result)
    }

    /// Clears the cached values of all operation nodes.
    pub fn clear_values(&self) {
        for node in self.nodes.borrow().values() {
            let mut node = node.borrow_mut();
            if !node.is_leaf() {
                node.value = None;
            }
        }
    }

    /// All nodes in topological order (inputs before the nodes using them).
    pub fn topological_order(&self) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self.nodes.borrow().keys().copied().collect();
        ids.sort_unstable();

        let mut visited = HashSet::new();
        let mut order = Vec::with_capacity(ids.len());
        for id in ids {
            self.visit_topological(id, &mut visited, &mut order);
        }
        order
    }

    fn visit_topological(
        &self,
        node_id: NodeId,
        visited: &mut HashSet<NodeId>,
        order: &mut Vec<NodeId>,
    ) {
        if !visited.insert(node_id) {
            return;
        }
        if let Some(node) = self.get_node(node_id) {
            for &input in &node.borrow().inputs {
                self.visit_topological(input, visited, order);
            }
        }
        order.push(node_id);
    }

    /// Returns the number of nodes in the graph.
    pub fn num_nodes(&self) -> usize {
        self.nodes.borrow().len()
    }

    /// Enables gradient tracking for nodes created from now on.
    pub fn enable_grad(&mut self) {
        self.track_gradients = true;
    }

    /// Disables gradient tracking for nodes created from now on.
    pub fn disable_grad(&mut self) {
        self.track_gradients = false;
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::{Add, Scale};

    fn filled(rows: usize, cols: usize, value: f64) -> Tensor {
        Stack::from_matrix(DMatrix::from_element(rows, cols, value))
    }

    #[test]
    fn test_graph_creation() {
        let graph = Graph::new();
        assert_eq!(graph.num_nodes(), 0);
        assert!(graph.track_gradients);
    }

    #[test]
    fn test_variable_creation() {
        let graph = Graph::new();
        let x = graph.variable(filled(2, 2, 1.0));

        assert_eq!(graph.num_nodes(), 1);
        assert_eq!(x.id.0, 0);
        assert!(x.requires_grad);

        let value = graph.get_value(x.id).unwrap();
        assert_eq!(value.shape(), vec![2, 2]);
    }

    #[test]
    fn test_named_variable() {
        let graph = Graph::new();
        let x = graph.named_variable(filled(3, 1, 2.0), "input");
        assert_eq!(x.name.as_deref(), Some("input"));
    }

    #[test]
    fn test_constants_do_not_require_grad() {
        let graph = Graph::new();
        let c = graph.constant(filled(2, 2, 1.0));
        let y = graph.apply_op(Box::new(Scale::new(2.0)), &[c]);
        assert!(!graph.requires_grad(c));
        assert!(!graph.requires_grad(y));
    }

    #[test]
    fn test_no_grad_graph() {
        let graph = Graph::no_grad();
        let x = graph.variable(filled(1, 1, 1.0));
        assert!(!x.requires_grad);
        assert!(!graph.requires_grad(x.id));
    }

    #[test]
    fn test_topological_order() {
        let graph = Graph::new();
        let x = graph.variable(filled(1, 1, 1.0));
        let y = graph.variable(filled(1, 1, 2.0));
        let z = graph.apply_op(Box::new(Add), &[x.id, y.id]);
        let w = graph.apply_op(Box::new(Add), &[z, x.id]);

        let order = graph.topological_order();
        let pos = |id| order.iter().position(|&n| n == id).unwrap();
        assert_eq!(order.len(), 4);
        assert!(pos(x.id) < pos(z) && pos(y.id) < pos(z) && pos(z) < pos(w));
    }

    #[test]
    fn test_forward_and_cache_invalidation() {
        let graph = Graph::new();
        let x = graph.variable(filled(2, 2, 3.0));
        let y = graph.apply_op(Box::new(Scale::new(2.0)), &[x.id]);

        assert_eq!(graph.forward(y).unwrap().sum(), 24.0);
        graph.set_value(x.id, filled(2, 2, 1.0)).unwrap();
        assert!(graph.get_value(y).is_none());
        assert_eq!(graph.forward(y).unwrap().sum(), 8.0);
    }

    #[test]
    fn test_errors() {
        let graph = Graph::new();
        let x = graph.variable(filled(1, 1, 1.0));
        let y = graph.apply_op(Box::new(Scale::new(2.0)), &[x.id]);

        assert!(matches!(
            graph.forward(NodeId(42)),
            Err(AutodiffError::UnknownNode { .. })
        ));
        assert!(matches!(
            graph.set_value(y, filled(1, 1, 0.0)),
            Err(AutodiffError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_scalar_helpers() {
        assert_eq!(scalar_value(&scalar(2.5)), Some(2.5));
        assert_eq!(scalar_value(&filled(2, 1, 1.0)), None);
    }
}
