//! Dasdan-Gupta's maximum cycle mean algorithm for integer weights.
//!
//! Runs the same value iteration as Karp's dynamic program but checks, after
//! each level, whether the value vector differs from an earlier level by a
//! uniform constant. Integer weights make that comparison exact, and once it
//! holds the iteration is periodic: the constant divided by the level gap is
//! the maximum cycle mean. Graphs with a single dominant cycle converge in
//! far fewer levels than the full Karp table.

use tracing::debug;

use crate::error::{McmError, McmResult};
use crate::graph::McmGraph;

/// Maximum cycle mean by Dasdan-Gupta value iteration.
///
/// Requires a nonempty graph in which every node has an outgoing edge and
/// every finite weight is integral; the result is exact, with no
/// floating-point drift. Returns negative infinity when no cycle has finite
/// weight.
pub fn maximum_cycle_mean_dasdan_gupta(graph: &McmGraph) -> McmResult<f64> {
    graph.ensure_nonempty()?;
    graph.ensure_all_outgoing()?;
    for edge in graph.edges() {
        if edge.weight == f64::NEG_INFINITY {
            continue;
        }
        // NaN and positive infinity also fail this check
        if edge.weight.fract() != 0.0 {
            return Err(McmError::NonIntegralWeight {
                edge: edge.id,
                weight: edge.weight,
            });
        }
    }

    let n = graph.node_count();
    let mut levels: Vec<Vec<f64>> = Vec::with_capacity(n + 1);
    levels.push(vec![0.0; n]);

    for k in 1..=n {
        let mut current = vec![f64::NEG_INFINITY; n];
        for edge in graph.edges() {
            if edge.weight == f64::NEG_INFINITY {
                continue;
            }
            let from = levels[k - 1][edge.source];
            if from == f64::NEG_INFINITY {
                continue;
            }
            let candidate = from + edge.weight;
            if candidate > current[edge.target] {
                current[edge.target] = candidate;
            }
        }

        for earlier in 0..k {
            if let Some(mcm) = uniform_difference(&levels[earlier], &current, k - earlier) {
                debug!(levels = k, mcm, "dasdan_gupta_converged");
                return Ok(mcm);
            }
        }
        levels.push(current);
    }

    // no periodicity surfaced; fall back to the Karp extraction formula
    let mut best = f64::NEG_INFINITY;
    for v in 0..n {
        if levels[n][v] == f64::NEG_INFINITY {
            continue;
        }
        let mut tightest = f64::INFINITY;
        for k in 0..n {
            if levels[k][v] == f64::NEG_INFINITY {
                continue;
            }
            let mean = (levels[n][v] - levels[k][v]) / (n - k) as f64;
            if mean < tightest {
                tightest = mean;
            }
        }
        if tightest != f64::INFINITY && tightest > best {
            best = tightest;
        }
    }
    debug!(levels = n, mcm = best, "dasdan_gupta_complete");
    Ok(best)
}

/// The per-node difference `current - earlier` divided by the level gap,
/// when that difference is the same finite constant at every node and both
/// levels agree on which nodes are unreachable.
fn uniform_difference(earlier: &[f64], current: &[f64], gap: usize) -> Option<f64> {
    let mut difference: Option<f64> = None;
    for (&a, &b) in earlier.iter().zip(current) {
        match (a == f64::NEG_INFINITY, b == f64::NEG_INFINITY) {
            (true, true) => continue,
            (false, false) => {
                let d = b - a;
                match difference {
                    None => difference = Some(d),
                    Some(seen) if seen == d => {}
                    Some(_) => return None,
                }
            }
            _ => return None,
        }
    }
    difference.map(|d| d / gap as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::karp::maximum_cycle_mean_karp;

    fn four_cycle() -> McmGraph {
        let mut graph = McmGraph::with_nodes(4);
        graph.add_edge(0, 1, 1.0, 1.0);
        graph.add_edge(1, 2, 2.0, 1.0);
        graph.add_edge(2, 3, 3.0, 1.0);
        graph.add_edge(3, 0, 4.0, 1.0);
        graph
    }

    #[test]
    fn four_cycle_has_mean_two_and_a_half() {
        let mcm = maximum_cycle_mean_dasdan_gupta(&four_cycle()).unwrap();
        assert_eq!(mcm, 2.5);
    }

    #[test]
    fn self_loop_converges_at_the_first_level() {
        let mut graph = McmGraph::with_nodes(1);
        graph.add_edge(0, 0, 7.0, 1.0);
        assert_eq!(maximum_cycle_mean_dasdan_gupta(&graph).unwrap(), 7.0);
    }

    #[test]
    fn non_integral_weights_are_rejected() {
        let mut graph = McmGraph::with_nodes(1);
        graph.add_edge(0, 0, 2.5, 1.0);
        match maximum_cycle_mean_dasdan_gupta(&graph) {
            Err(McmError::NonIntegralWeight { edge, weight }) => {
                assert_eq!(edge, 0);
                assert_eq!(weight, 2.5);
            }
            other => panic!("expected NonIntegralWeight, got {other:?}"),
        }
    }

    #[test]
    fn nan_weights_are_rejected() {
        let mut graph = McmGraph::with_nodes(1);
        graph.add_edge(0, 0, f64::NAN, 1.0);
        assert!(matches!(
            maximum_cycle_mean_dasdan_gupta(&graph),
            Err(McmError::NonIntegralWeight { .. })
        ));
    }

    #[test]
    fn agrees_exactly_with_karp_on_mixed_cycles() {
        // self-loop of mean 5 next to a 2-cycle of mean 6
        let mut graph = McmGraph::with_nodes(3);
        graph.add_edge(0, 0, 5.0, 1.0);
        graph.add_edge(1, 2, 8.0, 1.0);
        graph.add_edge(2, 1, 4.0, 1.0);

        let dg = maximum_cycle_mean_dasdan_gupta(&graph).unwrap();
        let karp = maximum_cycle_mean_karp(&graph).unwrap();
        assert_eq!(dg, karp);
        assert_eq!(dg, 6.0);
    }

    #[test]
    fn sentinel_edges_are_effectively_absent() {
        let mut graph = McmGraph::with_nodes(2);
        graph.add_edge(0, 1, 2.0, 1.0);
        graph.add_edge(1, 0, 4.0, 1.0);
        graph.add_edge(0, 1, f64::NEG_INFINITY, 1.0);
        assert_eq!(maximum_cycle_mean_dasdan_gupta(&graph).unwrap(), 3.0);
    }

    #[test]
    fn negative_weights_are_handled_exactly() {
        let mut graph = McmGraph::with_nodes(2);
        graph.add_edge(0, 1, -3.0, 1.0);
        graph.add_edge(1, 0, -5.0, 1.0);
        assert_eq!(maximum_cycle_mean_dasdan_gupta(&graph).unwrap(), -4.0);
    }
}
