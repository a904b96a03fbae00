//! Error types for graph evaluation and differentiation.

use crate::graph::NodeId;
use radon_core::RadonError;
use thiserror::Error;

/// Errors raised while evaluating or differentiating a graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AutodiffError {
    /// A projector or tensor operation failed.
    #[error(transparent)]
    Radon(#[from] RadonError),

    /// A node has no value and cannot compute one.
    #[error("No value for {node}")]
    MissingValue {
        /// The node without a value
        node: NodeId,
    },

    /// A node id that does not belong to the graph.
    #[error("Unknown node: {node}")]
    UnknownNode {
        /// The missing node
        node: NodeId,
    },

    /// An operation received inputs it cannot handle.
    #[error("Invalid input to {op}: {reason}")]
    InvalidInput {
        /// Name of the operation
        op: String,
        /// Description of the problem
        reason: String,
    },
}

impl AutodiffError {
    /// Create an invalid input error.
    pub fn invalid_input(op: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            op: op.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for autodiff operations.
pub type Result<T> = std::result::Result<T, AutodiffError>;
