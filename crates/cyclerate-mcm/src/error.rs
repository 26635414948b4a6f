//! Error types for the cycle mean and cycle ratio engine.

use thiserror::Error;

/// Result type alias for cycle analysis operations.
pub type McmResult<T> = Result<T, McmError>;

/// Errors raised when an algorithm precondition does not hold, or when an
/// iteration guard trips on malformed input.
#[derive(Debug, Error)]
pub enum McmError {
    /// The graph has no nodes.
    #[error("graph has no nodes")]
    EmptyGraph,

    /// A node violates the chosen algorithm's outgoing-edge precondition.
    #[error("node {node} has no outgoing edges")]
    NoOutgoingEdge {
        /// The offending node.
        node: usize,
    },

    /// The integer-only algorithm was handed a non-integral weight.
    #[error("edge {edge} carries non-integral weight {weight}")]
    NonIntegralWeight {
        /// The offending edge.
        edge: usize,
        /// The weight that failed the integrality check.
        weight: f64,
    },

    /// An iteration guard tripped, typically on NaN weights.
    #[error("{algorithm} exceeded its iteration bound of {bound}")]
    IterationBoundExceeded {
        /// Name of the algorithm whose guard tripped.
        algorithm: &'static str,
        /// The bound that was exceeded.
        bound: usize,
    },
}
