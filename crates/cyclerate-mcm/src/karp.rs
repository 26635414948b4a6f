//! Karp's maximum cycle mean algorithm.
//!
//! The classic O(V*E) dynamic program: `d[k][v]` is the maximum weight of a
//! walk of exactly `k` edges ending at `v`, and the maximum cycle mean is
//! `max over v of min over k < n of (d[n][v] - d[k][v]) / (n - k)`.

use tracing::debug;

use crate::error::McmResult;
use crate::graph::McmGraph;

/// Maximum cycle mean by Karp's dynamic program.
///
/// Requires a nonempty graph in which every node has an outgoing edge.
/// Returns negative infinity when no cycle has finite weight.
pub fn maximum_cycle_mean_karp(graph: &McmGraph) -> McmResult<f64> {
    let (mcm, _) = karp_core(graph)?;
    Ok(mcm)
}

/// Maximum cycle mean plus a node on a critical cycle, when one exists.
pub fn maximum_cycle_mean_karp_and_critical_node(
    graph: &McmGraph,
) -> McmResult<(f64, Option<usize>)> {
    karp_core(graph)
}

/// Maximum cycle mean for arbitrary graphs, including nodes without
/// outgoing edges, by running Karp per strongly connected component and
/// taking the largest result. Acyclic graphs yield negative infinity.
pub fn maximum_cycle_mean_karp_general(graph: &McmGraph) -> McmResult<f64> {
    graph.ensure_nonempty()?;
    let mut best = f64::NEG_INFINITY;
    for component in graph.strongly_connected_components() {
        let (sub, _) = graph.induced_subgraph(&component);
        if sub.edge_count() == 0 {
            continue;
        }
        let mcm = maximum_cycle_mean_karp(&sub)?;
        if mcm > best {
            best = mcm;
        }
    }
    debug!(mcm = best, "karp_general_complete");
    Ok(best)
}

fn karp_core(graph: &McmGraph) -> McmResult<(f64, Option<usize>)> {
    graph.ensure_nonempty()?;
    graph.ensure_all_outgoing()?;

    let n = graph.node_count();
    let mut d = vec![vec![f64::NEG_INFINITY; n]; n + 1];
    d[0].fill(0.0);

    for k in 1..=n {
        for edge in graph.edges() {
            if edge.weight == f64::NEG_INFINITY {
                continue;
            }
            let from = d[k - 1][edge.source];
            if from == f64::NEG_INFINITY {
                continue;
            }
            let candidate = from + edge.weight;
            if candidate > d[k][edge.target] {
                d[k][edge.target] = candidate;
            }
        }
    }

    let mut best = f64::NEG_INFINITY;
    let mut best_node = None;
    for v in 0..n {
        if d[n][v] == f64::NEG_INFINITY {
            continue;
        }
        let mut tightest = f64::INFINITY;
        for k in 0..n {
            if d[k][v] == f64::NEG_INFINITY {
                continue;
            }
            // ties go to the first minimizing k
            let mean = (d[n][v] - d[k][v]) / (n - k) as f64;
            if mean < tightest {
                tightest = mean;
            }
        }
        if tightest != f64::INFINITY && tightest > best {
            best = tightest;
            best_node = Some(v);
        }
    }

    debug!(nodes = n, edges = graph.edge_count(), mcm = best, "karp_complete");
    Ok((best, best_node))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::McmError;

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
        let mcm = maximum_cycle_mean_karp(&four_cycle()).unwrap();
        assert!((mcm - 2.5).abs() < 1e-9);
    }

    #[test]
    fn heavier_of_two_cycles_wins() {
        // self-loop of mean 5 next to a 2-cycle of mean 6
        let mut graph = McmGraph::with_nodes(3);
        graph.add_edge(0, 0, 5.0, 1.0);
        graph.add_edge(1, 2, 8.0, 1.0);
        graph.add_edge(2, 1, 4.0, 1.0);

        let (mcm, node) = maximum_cycle_mean_karp_and_critical_node(&graph).unwrap();
        assert!((mcm - 6.0).abs() < 1e-9);
        let node = node.unwrap();
        assert!(node == 1 || node == 2);
    }

    #[test]
    fn missing_outgoing_edge_is_rejected() {
        let mut graph = McmGraph::with_nodes(2);
        graph.add_edge(0, 1, 1.0, 1.0);
        assert!(matches!(
            maximum_cycle_mean_karp(&graph),
            Err(McmError::NoOutgoingEdge { node: 1 })
        ));
    }

    #[test]
    fn empty_graph_is_rejected() {
        let graph = McmGraph::new();
        assert!(matches!(
            maximum_cycle_mean_karp(&graph),
            Err(McmError::EmptyGraph)
        ));
    }

    #[test]
    fn negative_infinity_edges_are_effectively_absent() {
        let mut graph = McmGraph::with_nodes(2);
        graph.add_edge(0, 1, 1.0, 1.0);
        graph.add_edge(1, 0, 3.0, 1.0);
        // a heavier but absent shortcut must not contribute
        graph.add_edge(1, 0, f64::NEG_INFINITY, 1.0);

        let mcm = maximum_cycle_mean_karp(&graph).unwrap();
        assert!((mcm - 2.0).abs() < 1e-9);
    }

    #[test]
    fn sentinel_only_nodes_yield_negative_infinity() {
        let mut graph = McmGraph::with_nodes(1);
        graph.add_edge(0, 0, f64::NEG_INFINITY, 1.0);
        let (mcm, node) = maximum_cycle_mean_karp_and_critical_node(&graph).unwrap();
        assert_eq!(mcm, f64::NEG_INFINITY);
        assert!(node.is_none());
    }

    #[test]
    fn general_variant_tolerates_sink_nodes() {
        let mut graph = McmGraph::with_nodes(3);
        graph.add_edge(0, 1, 2.0, 1.0);
        graph.add_edge(1, 0, 4.0, 1.0);
        graph.add_edge(1, 2, 100.0, 1.0);
        // node 2 is a sink; the plain variant rejects this graph
        assert!(maximum_cycle_mean_karp(&graph).is_err());

        let mcm = maximum_cycle_mean_karp_general(&graph).unwrap();
        assert!((mcm - 3.0).abs() < 1e-9);
    }

    #[test]
    fn acyclic_graph_has_no_cycle_mean_in_the_general_variant() {
        let mut graph = McmGraph::with_nodes(2);
        graph.add_edge(0, 1, 7.0, 1.0);
        let mcm = maximum_cycle_mean_karp_general(&graph).unwrap();
        assert_eq!(mcm, f64::NEG_INFINITY);
    }

    #[test]
    fn critical_node_lies_on_the_heaviest_cycle() {
        let (mcm, node) = maximum_cycle_mean_karp_and_critical_node(&four_cycle()).unwrap();
        assert!((mcm - 2.5).abs() < 1e-9);
        assert!(node.is_some());
    }
}
