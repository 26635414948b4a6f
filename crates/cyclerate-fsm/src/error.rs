//! Error types for the automaton engine.

use thiserror::Error;

/// Result type alias for automaton operations.
pub type FsmResult<T> = Result<T, FsmError>;

/// Errors that can occur during automaton operations.
///
/// Structural misuse, such as passing an id the automaton does not own,
/// is a programming error and panics instead of returning a variant here.
#[derive(Debug, Error)]
pub enum FsmError {
    /// An operation needed an initial state but none is marked.
    #[error("automaton has no initial state")]
    NoInitialState,

    /// No state carries the requested label.
    #[error("no state carries the requested label")]
    StateLabelNotFound,
}
