//! Dense weighted multigraph consumed by the cycle mean/ratio algorithms.
//!
//! Nodes are plain indices `0..n`, edges carry a weight for the mean and a
//! delay for the ratio denominator. A graph is built fresh for each
//! analysis, either directly or by flattening an automaton, and never
//! aliases the structure it was built from.

use std::collections::HashMap;

use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use tracing::debug;

use cyclerate_fsm::{Automaton, EdgeId, StateId};

use crate::error::{McmError, McmResult};

// ============================================================================
// Graph
// ============================================================================

/// Edge of an [`McmGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct McmEdge {
    /// Identifier of this edge, dense in `0..edge_count`.
    pub id: usize,
    /// Node the edge leaves.
    pub source: usize,
    /// Node the edge enters.
    pub target: usize,
    /// Weight driving the cycle mean. Negative infinity marks the edge as
    /// effectively absent for maximization.
    pub weight: f64,
    /// Delay driving the cycle ratio denominator.
    pub delay: f64,
}

/// Directed weighted multigraph with dense integer node ids.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct McmGraph {
    /// Number of nodes; node ids are `0..node_count`.
    node_count: usize,
    /// All edges, indexed by id.
    edges: Vec<McmEdge>,
    /// Outgoing edge ids per node, in insertion order.
    out_edges: Vec<Vec<usize>>,
}

impl McmGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a graph with `nodes` nodes and no edges.
    pub fn with_nodes(nodes: usize) -> Self {
        Self {
            node_count: nodes,
            edges: Vec::new(),
            out_edges: vec![Vec::new(); nodes],
        }
    }

    /// Adds a node and returns its id.
    pub fn add_node(&mut self) -> usize {
        let id = self.node_count;
        self.node_count += 1;
        self.out_edges.push(Vec::new());
        id
    }

    /// Adds an edge and returns its id.
    ///
    /// # Panics
    ///
    /// Panics if either endpoint is not a node of this graph.
    pub fn add_edge(&mut self, source: usize, target: usize, weight: f64, delay: f64) -> usize {
        assert!(
            source < self.node_count,
            "edge source {source} is not a node of this graph"
        );
        assert!(
            target < self.node_count,
            "edge target {target} is not a node of this graph"
        );
        let id = self.edges.len();
        self.edges.push(McmEdge {
            id,
            source,
            target,
            weight,
            delay,
        });
        self.out_edges[source].push(id);
        id
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.node_count
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// All edges, indexed by id.
    pub fn edges(&self) -> &[McmEdge] {
        &self.edges
    }

    /// The edge with the given id.
    ///
    /// # Panics
    ///
    /// Panics if the id is out of range.
    pub fn edge(&self, id: usize) -> &McmEdge {
        &self.edges[id]
    }

    /// Edges leaving the given node, in insertion order.
    pub fn out_edges(&self, node: usize) -> impl Iterator<Item = &McmEdge> + '_ {
        self.out_edges[node].iter().map(move |&id| &self.edges[id])
    }

    /// Number of edges leaving the given node.
    pub fn out_degree(&self, node: usize) -> usize {
        self.out_edges[node].len()
    }

    // ------------------------------------------------------------------
    // Algorithm preconditions
    // ------------------------------------------------------------------

    /// Errors unless the graph has at least one node.
    pub fn ensure_nonempty(&self) -> McmResult<()> {
        if self.node_count == 0 {
            return Err(McmError::EmptyGraph);
        }
        Ok(())
    }

    /// Errors unless every node has at least one outgoing edge.
    ///
    /// Sentinel edges of weight negative infinity satisfy this check; the
    /// algorithms treat them as absent in all arithmetic.
    pub fn ensure_all_outgoing(&self) -> McmResult<()> {
        for node in 0..self.node_count {
            if self.out_edges[node].is_empty() {
                return Err(McmError::NoOutgoingEdge { node });
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Structure
    // ------------------------------------------------------------------

    /// Strongly connected components, each sorted ascending, in reverse
    /// topological order of the component DAG.
    pub fn strongly_connected_components(&self) -> Vec<Vec<usize>> {
        const UNVISITED: usize = usize::MAX;
        let n = self.node_count;
        let mut index = vec![UNVISITED; n];
        let mut low = vec![0usize; n];
        let mut on_stack = vec![false; n];
        let mut stack: Vec<usize> = Vec::new();
        let mut next_index = 0usize;
        let mut components: Vec<Vec<usize>> = Vec::new();

        // explicit (node, out-edge cursor) frames keep the walk iterative
        let mut frames: Vec<(usize, usize)> = Vec::new();
        for root in 0..n {
            if index[root] != UNVISITED {
                continue;
            }
            index[root] = next_index;
            low[root] = next_index;
            next_index += 1;
            stack.push(root);
            on_stack[root] = true;
            frames.push((root, 0));

            while let Some(frame) = frames.last_mut() {
                let node = frame.0;
                if frame.1 < self.out_edges[node].len() {
                    let edge = self.out_edges[node][frame.1];
                    frame.1 += 1;
                    let next = self.edges[edge].target;
                    if index[next] == UNVISITED {
                        index[next] = next_index;
                        low[next] = next_index;
                        next_index += 1;
                        stack.push(next);
                        on_stack[next] = true;
                        frames.push((next, 0));
                    } else if on_stack[next] {
                        low[node] = low[node].min(index[next]);
                    }
                } else {
                    frames.pop();
                    if let Some(parent) = frames.last() {
                        low[parent.0] = low[parent.0].min(low[node]);
                    }
                    if low[node] == index[node] {
                        let mut component = Vec::new();
                        while let Some(member) = stack.pop() {
                            on_stack[member] = false;
                            component.push(member);
                            if member == node {
                                break;
                            }
                        }
                        component.sort_unstable();
                        components.push(component);
                    }
                }
            }
        }
        components
    }

    /// The subgraph induced by `nodes`: kept nodes are renumbered densely
    /// and only edges with both endpoints kept survive.
    pub fn induced_subgraph(&self, nodes: &[usize]) -> (McmGraph, SubgraphMapping) {
        let mut dense_of: HashMap<usize, usize> = HashMap::new();
        let mut sub = McmGraph::with_nodes(nodes.len());
        for (dense, &node) in nodes.iter().enumerate() {
            dense_of.insert(node, dense);
        }

        let mut parent_edge = Vec::new();
        for edge in &self.edges {
            if let (Some(&source), Some(&target)) =
                (dense_of.get(&edge.source), dense_of.get(&edge.target))
            {
                sub.add_edge(source, target, edge.weight, edge.delay);
                parent_edge.push(edge.id);
            }
        }

        let mapping = SubgraphMapping {
            parent_node: nodes.to_vec(),
            parent_edge,
        };
        (sub, mapping)
    }

    // ------------------------------------------------------------------
    // Conversion and export
    // ------------------------------------------------------------------

    /// Flattens an automaton into a graph, extracting `(weight, delay)` from
    /// each edge label with the caller-supplied function.
    ///
    /// States map to dense node ids in ascending state-id order; the
    /// returned mapping records the bijection and the automaton edge behind
    /// every graph edge.
    pub fn from_automaton<SL, EL, F>(fsm: &Automaton<SL, EL>, mut extract: F) -> (Self, McmMapping)
    where
        F: FnMut(&EL) -> (f64, f64),
    {
        let mut graph = McmGraph::new();
        let mut node_of_state: HashMap<StateId, usize> = HashMap::new();
        let mut state_of_node: Vec<StateId> = Vec::new();

        for state in fsm.states() {
            let node = graph.add_node();
            node_of_state.insert(state.id(), node);
            state_of_node.push(state.id());
        }

        let mut automaton_edge: Vec<EdgeId> = Vec::new();
        for edge in fsm.edges() {
            let (weight, delay) = extract(edge.label());
            graph.add_edge(
                node_of_state[&edge.source()],
                node_of_state[&edge.target()],
                weight,
                delay,
            );
            automaton_edge.push(edge.id());
        }

        debug!(
            nodes = graph.node_count,
            edges = graph.edges.len(),
            "automaton_flattened"
        );
        let mapping = McmMapping {
            node_of_state,
            state_of_node,
            automaton_edge,
        };
        (graph, mapping)
    }

    /// Converts the graph to a petgraph `DiGraph` whose node weights are the
    /// dense ids and whose edge weights are `(weight, delay)` pairs.
    pub fn to_petgraph(&self) -> DiGraph<usize, (f64, f64)> {
        let mut graph = DiGraph::new();
        let indices: Vec<NodeIndex> = (0..self.node_count).map(|id| graph.add_node(id)).collect();
        for edge in &self.edges {
            graph.add_edge(indices[edge.source], indices[edge.target], (edge.weight, edge.delay));
        }
        graph
    }
}

// ============================================================================
// Mappings
// ============================================================================

/// Bijection between automaton states and dense node ids, plus the automaton
/// edge behind every graph edge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McmMapping {
    /// Dense node id per automaton state.
    node_of_state: HashMap<StateId, usize>,
    /// Automaton state per dense node id.
    state_of_node: Vec<StateId>,
    /// Automaton edge per graph edge id.
    automaton_edge: Vec<EdgeId>,
}

impl McmMapping {
    /// The dense node id of an automaton state, if the state was converted.
    pub fn node_of(&self, state: StateId) -> Option<usize> {
        self.node_of_state.get(&state).copied()
    }

    /// The automaton state behind a dense node id.
    pub fn state_of(&self, node: usize) -> Option<StateId> {
        self.state_of_node.get(node).copied()
    }

    /// The automaton edge behind a graph edge id.
    pub fn automaton_edge(&self, edge: usize) -> Option<EdgeId> {
        self.automaton_edge.get(edge).copied()
    }
}

/// Maps an induced subgraph's dense ids back to its parent graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubgraphMapping {
    /// Parent node per subgraph node id.
    pub parent_node: Vec<usize>,
    /// Parent edge per subgraph edge id.
    pub parent_edge: Vec<usize>,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn two_sccs() -> McmGraph {
        // 0 <-> 1 feeding 2 <-> 3
        let mut graph = McmGraph::with_nodes(4);
        graph.add_edge(0, 1, 1.0, 1.0);
        graph.add_edge(1, 0, 1.0, 1.0);
        graph.add_edge(1, 2, 1.0, 1.0);
        graph.add_edge(2, 3, 1.0, 1.0);
        graph.add_edge(3, 2, 1.0, 1.0);
        graph
    }

    #[test]
    fn preconditions_report_the_offending_node() {
        let graph = McmGraph::with_nodes(0);
        assert!(matches!(graph.ensure_nonempty(), Err(McmError::EmptyGraph)));

        let mut graph = McmGraph::with_nodes(2);
        graph.add_edge(0, 1, 1.0, 1.0);
        match graph.ensure_all_outgoing() {
            Err(McmError::NoOutgoingEdge { node }) => assert_eq!(node, 1),
            other => panic!("expected NoOutgoingEdge, got {other:?}"),
        }
    }

    #[test]
    fn tarjan_finds_both_components() {
        let graph = two_sccs();
        let components = graph.strongly_connected_components();
        assert_eq!(components.len(), 2);
        assert!(components.contains(&vec![0, 1]));
        assert!(components.contains(&vec![2, 3]));
    }

    #[test]
    fn tarjan_orders_components_reverse_topologically() {
        let graph = two_sccs();
        let components = graph.strongly_connected_components();
        // the downstream component closes first
        assert_eq!(components[0], vec![2, 3]);
    }

    #[test]
    fn singleton_without_self_loop_is_its_own_component() {
        let mut graph = McmGraph::with_nodes(2);
        graph.add_edge(0, 1, 1.0, 1.0);
        let components = graph.strongly_connected_components();
        assert_eq!(components.len(), 2);
    }

    #[test]
    fn induced_subgraph_keeps_internal_edges_only() {
        let graph = two_sccs();
        let (sub, mapping) = graph.induced_subgraph(&[2, 3]);
        assert_eq!(sub.node_count(), 2);
        assert_eq!(sub.edge_count(), 2);
        assert_eq!(mapping.parent_node, vec![2, 3]);
        assert_eq!(mapping.parent_edge, vec![3, 4]);
    }

    #[test]
    fn automaton_flattening_is_a_bijection() {
        let mut fsm = Automaton::new();
        let a = fsm.add_state("a");
        let b = fsm.add_state("b");
        let ab = fsm.add_edge(a, 2.0_f64, b);
        fsm.add_edge(b, 3.0_f64, a);

        let (graph, mapping) = McmGraph::from_automaton(&fsm, |&weight| (weight, 1.0));
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 2);
        assert_eq!(graph.edge(0).weight, 2.0);

        let node_a = mapping.node_of(a).unwrap();
        assert_eq!(mapping.state_of(node_a), Some(a));
        assert_eq!(mapping.automaton_edge(0), Some(ab));
    }

    #[test]
    fn petgraph_export_preserves_shape() {
        let graph = two_sccs();
        let exported = graph.to_petgraph();
        assert_eq!(exported.node_count(), 4);
        assert_eq!(exported.edge_count(), 5);
    }
}
