//! Cycle-mean and cycle-ratio analysis over weighted directed graphs.
//!
//! The crate answers one family of questions: over all directed cycles of a
//! graph, what is the extremal mean weight per edge, or the extremal ratio
//! of weight to transit time? Four algorithms cover the trade-offs between
//! speed, exactness, and the shape of the answer:
//!
//! - [`maximum_cycle_mean_karp`] runs Karp's dynamic program, exact and
//!   predictable, and can name a node on a critical cycle.
//! - [`maximum_cycle_mean_dasdan_gupta`] refines Karp with early
//!   termination for integer weights and is exact when it converges early.
//! - [`maximum_cycle_mean_howard`] iterates policies and reports per-node
//!   cycle times alongside the mean.
//! - The Young-Tarjan-Orlin sweep in [`yto`] handles means and ratios in
//!   both directions and reconstructs a full critical cycle.
//!
//! Graphs come from [`McmGraph`] directly or are flattened out of a
//! [`cyclerate_fsm::Automaton`] with [`McmGraph::from_automaton`]; the
//! [`rewards`] module wraps the latter for delay-and-reward labels. Edges
//! with a weight of negative infinity are treated as absent, so callers can
//! mask edges without rebuilding the graph.

/// Tolerance used when comparing candidate cycle means and ratios for
/// tightness.
pub const MCM_EPSILON: f64 = 1e-10;

pub mod dasdan_gupta;
pub mod error;
pub mod graph;
pub mod howard;
pub mod karp;
pub mod rewards;
pub mod yto;

mod heap;

pub use dasdan_gupta::maximum_cycle_mean_dasdan_gupta;
pub use error::{McmError, McmResult};
pub use graph::{McmEdge, McmGraph, McmMapping, SubgraphMapping};
pub use howard::{
    graph_to_matrix, howard, maximum_cycle_mean_howard,
    maximum_cycle_mean_howard_and_critical_node, maximum_cycle_mean_howard_general,
    HowardOptions, HowardResult, DEFAULT_MAX_POLICY_ITERATIONS,
};
pub use karp::{
    maximum_cycle_mean_karp, maximum_cycle_mean_karp_and_critical_node,
    maximum_cycle_mean_karp_general,
};
pub use rewards::{
    maximum_cycle_ratio, maximum_cycle_ratio_and_critical_cycle, minimum_cycle_ratio,
    RewardLabel,
};
pub use yto::{
    maximum_cycle_mean_and_critical_cycle_yto, maximum_cycle_mean_yto,
    maximum_cycle_ratio_and_critical_cycle_yto, maximum_cycle_ratio_yto,
    minimum_cycle_mean_and_critical_cycle_yto, minimum_cycle_mean_yto,
    minimum_cycle_ratio_and_critical_cycle_yto, minimum_cycle_ratio_yto,
};
