//! Label-parametrized finite-state automata for performance analysis.
//!
//! The automaton owns its states and edges in id-keyed arenas; callers hold
//! plain [`StateId`]/[`EdgeId`] handles that stay valid across unrelated
//! mutation. On top of the data model sit an iterative depth-first traversal
//! engine with pluggable visitors and the classical transformations built on
//! the automaton structure:
//!
//! - reachability and simple-cycle detection ([`dfs`])
//! - determinization by subset construction over edge labels
//! - minimization by partition refinement
//! - synchronous product composition
//!
//! Transformations never mutate their input; each returns a freshly built
//! automaton so the original stays available for comparison or re-analysis.
//! All iteration runs in ascending id order, making every derived
//! construction reproducible across runs.

pub mod automaton;
pub mod dfs;
pub mod error;

mod determinize;
mod minimize;
mod product;

pub use automaton::{Automaton, Edge, EdgeId, State, StateId};
pub use dfs::{CycleFinder, DepthFirstSearch, DfsVisitor, ReachableStates};
pub use error::{FsmError, FsmResult};
