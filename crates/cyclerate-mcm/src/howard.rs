//! Howard's policy iteration for maximum cycle means in the max-plus sense.
//!
//! The graph is taken as a sparse max-plus matrix of `(source, target)` arcs
//! with weights. A policy picks one outgoing arc per node, which makes the
//! policy graph functional: following it from any node reaches exactly one
//! cycle. Each round evaluates the current policy exactly, computing a cycle
//! time `chi` and bias `v` per node, then switches any node with a strictly
//! improving arc, preferring a better cycle time and falling back to a
//! better bias among equal cycle times. No improving switch means the policy
//! is globally optimal.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{McmError, McmResult};
use crate::graph::McmGraph;
use crate::MCM_EPSILON;

/// Default bound on policy improvement rounds.
pub const DEFAULT_MAX_POLICY_ITERATIONS: usize = 1_000;

/// Tuning knobs for [`howard`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HowardOptions {
    /// Upper bound on improvement rounds before giving up. Policy iteration
    /// converges in few rounds on well-formed input; the bound exists to
    /// turn NaN-induced stagnation into an error.
    pub max_iterations: usize,
}

impl Default for HowardOptions {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_POLICY_ITERATIONS,
        }
    }
}

/// Outcome of policy iteration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HowardResult {
    /// Cycle time per node: the mean of the policy cycle the node reaches.
    pub chi: Vec<f64>,
    /// Bias per node, relative to the entry point of its policy cycle.
    pub v: Vec<f64>,
    /// Chosen arc per node, as an index into the input arc list.
    pub policy: Vec<usize>,
    /// Number of improvement rounds performed.
    pub iterations: usize,
    /// Number of distinct cycles in the final policy.
    pub components: usize,
}

impl HowardResult {
    /// Largest cycle time over all recurrent classes of the final policy.
    ///
    /// A disconnected policy has one cycle per recurrent class, each with
    /// its own mean; the maximum over them is the maximum cycle mean.
    pub fn maximum_cycle_mean(&self) -> f64 {
        self.chi.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }
}

/// Flattens a graph into the sparse `(source, target)` arc form consumed by
/// [`howard`], in edge-id order.
pub fn graph_to_matrix(graph: &McmGraph) -> (Vec<(usize, usize)>, Vec<f64>) {
    let mut ij = Vec::with_capacity(graph.edge_count());
    let mut weights = Vec::with_capacity(graph.edge_count());
    for edge in graph.edges() {
        ij.push((edge.source, edge.target));
        weights.push(edge.weight);
    }
    (ij, weights)
}

/// Maximum cycle mean by Howard's policy iteration.
///
/// Requires a nonempty graph in which every node has an outgoing edge.
pub fn maximum_cycle_mean_howard(graph: &McmGraph) -> McmResult<f64> {
    graph.ensure_nonempty()?;
    graph.ensure_all_outgoing()?;
    let (ij, weights) = graph_to_matrix(graph);
    let result = howard(&ij, &weights, graph.node_count(), HowardOptions::default())?;
    Ok(result.maximum_cycle_mean())
}

/// Maximum cycle mean plus a node on a critical cycle, when one exists.
pub fn maximum_cycle_mean_howard_and_critical_node(
    graph: &McmGraph,
) -> McmResult<(f64, Option<usize>)> {
    graph.ensure_nonempty()?;
    graph.ensure_all_outgoing()?;
    let (ij, weights) = graph_to_matrix(graph);
    let result = howard(&ij, &weights, graph.node_count(), HowardOptions::default())?;
    let node = critical_node_of(&result, &ij);
    Ok((result.maximum_cycle_mean(), node))
}

/// Maximum cycle mean for arbitrary graphs, including nodes without
/// outgoing edges, by running policy iteration per strongly connected
/// component. Acyclic graphs yield negative infinity.
pub fn maximum_cycle_mean_howard_general(graph: &McmGraph) -> McmResult<f64> {
    graph.ensure_nonempty()?;
    let mut best = f64::NEG_INFINITY;
    for component in graph.strongly_connected_components() {
        let (sub, _) = graph.induced_subgraph(&component);
        if sub.edge_count() == 0 {
            continue;
        }
        let mcm = maximum_cycle_mean_howard(&sub)?;
        if mcm > best {
            best = mcm;
        }
    }
    debug!(mcm = best, "howard_general_complete");
    Ok(best)
}

/// Runs policy iteration on a sparse max-plus matrix.
///
/// `ij` lists the arcs as `(source, target)` pairs over `0..node_count`,
/// `weights` their weights; arcs of weight negative infinity are treated as
/// absent. Nodes whose arcs are all absent keep a cycle time of negative
/// infinity and a bias of zero.
///
/// # Panics
///
/// Panics if `ij` and `weights` disagree in length or reference a node out
/// of range.
pub fn howard(
    ij: &[(usize, usize)],
    weights: &[f64],
    node_count: usize,
    options: HowardOptions,
) -> McmResult<HowardResult> {
    assert_eq!(
        ij.len(),
        weights.len(),
        "arc list and weight list must have the same length"
    );
    if node_count == 0 {
        return Err(McmError::EmptyGraph);
    }

    let mut out: Vec<Vec<usize>> = vec![Vec::new(); node_count];
    for (arc, &(source, target)) in ij.iter().enumerate() {
        assert!(
            source < node_count && target < node_count,
            "arc ({source}, {target}) references a node out of range"
        );
        out[source].push(arc);
    }

    // initial policy: heaviest usable arc per node, any arc as a last resort
    let mut policy: Vec<usize> = Vec::with_capacity(node_count);
    for node in 0..node_count {
        let mut best: Option<usize> = None;
        for &arc in &out[node] {
            if weights[arc] == f64::NEG_INFINITY {
                continue;
            }
            match best {
                None => best = Some(arc),
                Some(current) if weights[arc] > weights[current] => best = Some(arc),
                _ => {}
            }
        }
        let chosen = match best.or_else(|| out[node].first().copied()) {
            Some(arc) => arc,
            None => return Err(McmError::NoOutgoingEdge { node }),
        };
        policy.push(chosen);
    }

    let mut chi = vec![0.0f64; node_count];
    let mut v = vec![0.0f64; node_count];
    let mut resolved = vec![false; node_count];
    let mut position_on_walk = vec![usize::MAX; node_count];
    let mut iterations = 0usize;
    let mut components = 0usize;

    loop {
        iterations += 1;
        if iterations > options.max_iterations {
            warn!(bound = options.max_iterations, "howard_iteration_bound_exceeded");
            return Err(McmError::IterationBoundExceeded {
                algorithm: "howard policy iteration",
                bound: options.max_iterations,
            });
        }

        // ---- value determination for the current policy ----
        resolved.fill(false);
        components = 0;
        for start in 0..node_count {
            if resolved[start] {
                continue;
            }
            // follow the policy until a resolved node or this walk repeats
            let mut walk: Vec<usize> = Vec::new();
            let mut cursor = start;
            while !resolved[cursor] && position_on_walk[cursor] == usize::MAX {
                position_on_walk[cursor] = walk.len();
                walk.push(cursor);
                cursor = ij[policy[cursor]].1;
            }

            if resolved[cursor] {
                back_propagate(
                    &walk,
                    cursor,
                    &policy,
                    weights,
                    ij,
                    &mut chi,
                    &mut v,
                    &mut resolved,
                );
            } else {
                let cycle_start = position_on_walk[cursor];
                let cycle = &walk[cycle_start..];
                let mut total = 0.0f64;
                for &node in cycle {
                    total += weights[policy[node]];
                }
                let mean = total / cycle.len() as f64;
                components += 1;

                chi[cursor] = mean;
                v[cursor] = 0.0;
                resolved[cursor] = true;
                for t in (cycle_start + 1..walk.len()).rev() {
                    let node = walk[t];
                    let next = if t + 1 < walk.len() { walk[t + 1] } else { cursor };
                    chi[node] = mean;
                    v[node] = if mean == f64::NEG_INFINITY {
                        0.0
                    } else {
                        weights[policy[node]] - mean + v[next]
                    };
                    resolved[node] = true;
                }
                back_propagate(
                    &walk[..cycle_start],
                    cursor,
                    &policy,
                    weights,
                    ij,
                    &mut chi,
                    &mut v,
                    &mut resolved,
                );
            }

            for &node in &walk {
                position_on_walk[node] = usize::MAX;
            }
        }

        // ---- policy improvement ----
        let mut improved = false;
        for node in 0..node_count {
            let mut best_arc = policy[node];
            let mut best_chi = chi[node];
            for &arc in &out[node] {
                if weights[arc] == f64::NEG_INFINITY {
                    continue;
                }
                let target_chi = chi[ij[arc].1];
                if target_chi > best_chi + MCM_EPSILON {
                    best_chi = target_chi;
                    best_arc = arc;
                }
            }
            if best_arc != policy[node] {
                policy[node] = best_arc;
                improved = true;
            }
        }

        if !improved {
            // all cycle times tight; look for a better bias instead
            for node in 0..node_count {
                if chi[node] == f64::NEG_INFINITY {
                    continue;
                }
                let mut best_arc = policy[node];
                let mut best_value = v[node];
                for &arc in &out[node] {
                    if weights[arc] == f64::NEG_INFINITY {
                        continue;
                    }
                    let target = ij[arc].1;
                    if !chi_equal(chi[target], chi[node]) {
                        continue;
                    }
                    let value = weights[arc] + v[target] - chi[node];
                    if value > best_value + MCM_EPSILON {
                        best_value = value;
                        best_arc = arc;
                    }
                }
                if best_arc != policy[node] {
                    policy[node] = best_arc;
                    improved = true;
                }
            }
        }

        if !improved {
            break;
        }
    }

    debug!(
        nodes = node_count,
        arcs = ij.len(),
        iterations,
        components,
        "howard_converged"
    );
    Ok(HowardResult {
        chi,
        v,
        policy,
        iterations,
        components,
    })
}

/// Resolves a transient walk backwards from its already-resolved endpoint.
#[allow(clippy::too_many_arguments)]
fn back_propagate(
    walk: &[usize],
    terminal: usize,
    policy: &[usize],
    weights: &[f64],
    ij: &[(usize, usize)],
    chi: &mut [f64],
    v: &mut [f64],
    resolved: &mut [bool],
) {
    debug_assert!(walk
        .iter()
        .zip(walk.iter().skip(1).chain([&terminal]))
        .all(|(&node, &next)| ij[policy[node]].1 == next));
    for t in (0..walk.len()).rev() {
        let node = walk[t];
        let next = if t + 1 < walk.len() { walk[t + 1] } else { terminal };
        let arc_weight = weights[policy[node]];
        if arc_weight == f64::NEG_INFINITY || chi[next] == f64::NEG_INFINITY {
            // the walk has no usable continuation; the node is dead
            chi[node] = f64::NEG_INFINITY;
            v[node] = 0.0;
        } else {
            chi[node] = chi[next];
            v[node] = arc_weight - chi[next] + v[next];
        }
        resolved[node] = true;
    }
}

/// Whether two cycle times are equal within tolerance, treating negative
/// infinity as equal only to itself.
fn chi_equal(a: f64, b: f64) -> bool {
    if a == f64::NEG_INFINITY || b == f64::NEG_INFINITY {
        return a == b;
    }
    (a - b).abs() <= MCM_EPSILON
}

/// A node on a recurrent cycle attaining the maximum cycle time: follow the
/// policy from an argmax node until the walk must have entered its cycle.
fn critical_node_of(result: &HowardResult, ij: &[(usize, usize)]) -> Option<usize> {
    let best = result.maximum_cycle_mean();
    if best == f64::NEG_INFINITY {
        return None;
    }
    let start = result.chi.iter().position(|&value| value == best)?;
    let mut cursor = start;
    for _ in 0..result.chi.len() {
        cursor = ij[result.policy[cursor]].1;
    }
    Some(cursor)
}
