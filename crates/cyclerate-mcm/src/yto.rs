//! Young-Tarjan-Orlin parametric search for extremal cycle means and
//! cycle ratios.
//!
//! The sweep maintains a spanning tree of maximum-weight paths rooted at an
//! auxiliary super-source with a zero-cost arc to every node, so arbitrary
//! graphs are accepted; no outgoing-edge precondition applies. Every
//! non-tree arc is keyed by the candidate ratio lambda at which it would tie
//! with the tree path to its head. Repeatedly taking the largest key either
//! closes a cycle through the tree, in which case that key is the maximum
//! ratio and the cycle is critical, or splices the arc into the tree and
//! re-keys the arcs whose endpoints moved. Keys only decrease, so the first
//! cycle found is extremal.
//!
//! Means are ratios with a transit time of one per arc; minimization runs
//! the same sweep on negated costs. An arc with a nonpositive transit
//! denominator but a positive cost numerator improves on the tree path at
//! every lambda: it is keyed positive infinity and handled ahead of all
//! finite keys, spliced like any other arc unless it would close a cycle, in
//! which case the cycle's total transit is nonpositive, its ratio is not
//! finite, and the arc is dropped. Arcs with nonpositive numerator and
//! denominator can never tie and are excluded.

use std::cmp::Ordering;

use tracing::{debug, warn};

use crate::error::{McmError, McmResult};
use crate::graph::{McmEdge, McmGraph};
use crate::heap::ArcHeap;

// ============================================================================
// Public surface
// ============================================================================

/// Maximum cycle mean. Acyclic graphs yield negative infinity.
pub fn maximum_cycle_mean_yto(graph: &McmGraph) -> McmResult<f64> {
    Ok(extremal_cycle(graph, false, false)?.0)
}

/// Maximum cycle mean plus the edges of a critical cycle, in cycle order.
pub fn maximum_cycle_mean_and_critical_cycle_yto(
    graph: &McmGraph,
) -> McmResult<(f64, Vec<McmEdge>)> {
    extremal_cycle(graph, false, false)
}

/// Minimum cycle mean. Acyclic graphs yield positive infinity.
pub fn minimum_cycle_mean_yto(graph: &McmGraph) -> McmResult<f64> {
    Ok(extremal_cycle(graph, true, false)?.0)
}

/// Minimum cycle mean plus the edges of a critical cycle, in cycle order.
pub fn minimum_cycle_mean_and_critical_cycle_yto(
    graph: &McmGraph,
) -> McmResult<(f64, Vec<McmEdge>)> {
    extremal_cycle(graph, true, false)
}

/// Maximum ratio of weight to delay over any cycle with positive total
/// delay. Graphs without such a cycle yield negative infinity.
pub fn maximum_cycle_ratio_yto(graph: &McmGraph) -> McmResult<f64> {
    Ok(extremal_cycle(graph, false, true)?.0)
}

/// Maximum cycle ratio plus the edges of a critical cycle, in cycle order.
pub fn maximum_cycle_ratio_and_critical_cycle_yto(
    graph: &McmGraph,
) -> McmResult<(f64, Vec<McmEdge>)> {
    extremal_cycle(graph, false, true)
}

/// Minimum ratio of weight to delay over any cycle with positive total
/// delay. Graphs without such a cycle yield positive infinity.
pub fn minimum_cycle_ratio_yto(graph: &McmGraph) -> McmResult<f64> {
    Ok(extremal_cycle(graph, true, true)?.0)
}

/// Minimum cycle ratio plus the edges of a critical cycle, in cycle order.
pub fn minimum_cycle_ratio_and_critical_cycle_yto(
    graph: &McmGraph,
) -> McmResult<(f64, Vec<McmEdge>)> {
    extremal_cycle(graph, true, true)
}

fn extremal_cycle(
    graph: &McmGraph,
    minimize: bool,
    ratio: bool,
) -> McmResult<(f64, Vec<McmEdge>)> {
    graph.ensure_nonempty()?;
    let cost = |edge: &McmEdge| {
        if edge.weight == f64::NEG_INFINITY {
            f64::NEG_INFINITY
        } else if minimize {
            -edge.weight
        } else {
            edge.weight
        }
    };
    let transit = |edge: &McmEdge| if ratio { edge.delay } else { 1.0 };

    let outcome = Sweep::build(graph, cost, transit).run()?;
    Ok(match outcome {
        Some((lambda, cycle)) => {
            let lambda = if minimize { -lambda } else { lambda };
            debug!(lambda, cycle_len = cycle.len(), minimize, ratio, "yto_cycle_found");
            let edges = cycle.iter().map(|&id| *graph.edge(id)).collect();
            (lambda, edges)
        }
        None => {
            debug!(minimize, ratio, "yto_no_cycle");
            let lambda = if minimize { f64::INFINITY } else { f64::NEG_INFINITY };
            (lambda, Vec::new())
        }
    })
}

// ============================================================================
// Sweep state
// ============================================================================

/// An arc of the working graph; super-source arcs carry no graph edge.
#[derive(Debug, Clone, Copy)]
struct Arc {
    tail: usize,
    head: usize,
    cost: f64,
    transit: f64,
    graph_edge: Option<usize>,
    in_tree: bool,
}

/// Dynamic tree over the working graph plus the keyed arc selection.
struct Sweep {
    arcs: Vec<Arc>,
    /// Outgoing arc ids per node, including the super-source.
    out_arcs: Vec<Vec<usize>>,
    /// Incoming real-arc ids per node; super-source arcs never re-enter.
    in_arcs: Vec<Vec<usize>>,
    /// Tree parent arc per node; `None` only at the super-source.
    parent_arc: Vec<Option<usize>>,
    /// Tree children per node.
    children: Vec<Vec<usize>>,
    /// Cost of the tree path from the super-source, per node.
    path_cost: Vec<f64>,
    /// Transit time of the tree path from the super-source, per node.
    path_transit: Vec<f64>,
    /// The heap entry per node: its best keyed incoming arc.
    best_in: Vec<Option<usize>>,
    heap: ArcHeap,
    /// Visit stamps for subtree membership during a splice.
    mark: Vec<u64>,
    stamp: u64,
}

impl Sweep {
    fn build(
        graph: &McmGraph,
        cost_of: impl Fn(&McmEdge) -> f64,
        transit_of: impl Fn(&McmEdge) -> f64,
    ) -> Self {
        let n = graph.node_count();
        let super_source = n;
        let mut arcs: Vec<Arc> = Vec::with_capacity(graph.edge_count() + n);
        let mut out_arcs: Vec<Vec<usize>> = vec![Vec::new(); n + 1];
        let mut in_arcs: Vec<Vec<usize>> = vec![Vec::new(); n + 1];

        for edge in graph.edges() {
            let cost = cost_of(edge);
            if cost == f64::NEG_INFINITY {
                continue;
            }
            let arc = arcs.len();
            arcs.push(Arc {
                tail: edge.source,
                head: edge.target,
                cost,
                transit: transit_of(edge),
                graph_edge: Some(edge.id),
                in_tree: false,
            });
            out_arcs[edge.source].push(arc);
            in_arcs[edge.target].push(arc);
        }

        // the super-source arcs form the initial spanning tree
        let mut parent_arc: Vec<Option<usize>> = vec![None; n + 1];
        let mut children: Vec<Vec<usize>> = vec![Vec::new(); n + 1];
        for node in 0..n {
            let arc = arcs.len();
            arcs.push(Arc {
                tail: super_source,
                head: node,
                cost: 0.0,
                transit: 0.0,
                graph_edge: None,
                in_tree: true,
            });
            out_arcs[super_source].push(arc);
            parent_arc[node] = Some(arc);
            children[super_source].push(node);
        }

        let heap = ArcHeap::with_capacity(arcs.len());
        let mut sweep = Sweep {
            arcs,
            out_arcs,
            in_arcs,
            parent_arc,
            children,
            path_cost: vec![0.0; n + 1],
            path_transit: vec![0.0; n + 1],
            best_in: vec![None; n],
            heap,
            mark: vec![0; n + 1],
            stamp: 0,
        };
        for node in 0..n {
            sweep.refresh_best_in(node);
        }
        sweep
    }

    /// The candidate lambda at which `arc` ties with the tree path to its
    /// head. Positive infinity when the arc improves on the tree path at
    /// every lambda, negative infinity when it can never tie.
    fn key_of(&self, arc: usize) -> f64 {
        let a = &self.arcs[arc];
        let numerator = self.path_cost[a.tail] + a.cost - self.path_cost[a.head];
        let denominator = self.path_transit[a.tail] + a.transit - self.path_transit[a.head];
        if denominator > 0.0 {
            numerator / denominator
        } else if numerator > 0.0 {
            f64::INFINITY
        } else {
            f64::NEG_INFINITY
        }
    }

    /// Reselects the best keyed incoming arc of `node` and syncs the heap.
    fn refresh_best_in(&mut self, node: usize) {
        if let Some(old) = self.best_in[node] {
            if self.heap.contains(old) {
                self.heap.remove(old);
            }
        }
        let mut best: Option<(usize, f64)> = None;
        for position in 0..self.in_arcs[node].len() {
            let arc = self.in_arcs[node][position];
            if self.arcs[arc].in_tree {
                continue;
            }
            let key = self.key_of(arc);
            if key == f64::NEG_INFINITY {
                continue;
            }
            let replace = match best {
                None => true,
                Some((_, best_key)) => key.total_cmp(&best_key) == Ordering::Greater,
            };
            if replace {
                best = Some((arc, key));
            }
        }
        match best {
            Some((arc, key)) => {
                self.best_in[node] = Some(arc);
                self.heap.push(arc, key);
            }
            None => self.best_in[node] = None,
        }
    }

    /// Whether the tree path from `arc`'s head reaches its tail, so that
    /// splicing the arc in would close a cycle.
    fn closes_cycle(&self, arc: usize) -> bool {
        let head = self.arcs[arc].head;
        let mut cursor = self.arcs[arc].tail;
        loop {
            if cursor == head {
                return true;
            }
            match self.parent_arc[cursor] {
                Some(parent) => cursor = self.arcs[parent].tail,
                None => return false,
            }
        }
    }

    /// The graph edges of the cycle closed by `arc`, in cycle order
    /// starting from the arc's head.
    fn extract_cycle(&self, arc: usize) -> Vec<usize> {
        let head = self.arcs[arc].head;
        let mut path = Vec::new();
        let mut cursor = self.arcs[arc].tail;
        while cursor != head {
            match self.parent_arc[cursor] {
                Some(parent) => {
                    path.push(parent);
                    cursor = self.arcs[parent].tail;
                }
                None => break,
            }
        }
        path.reverse();
        path.push(arc);
        path.iter()
            .filter_map(|&id| self.arcs[id].graph_edge)
            .collect()
    }

    /// Splices `enter` into the tree, shifting the moved subtree's path
    /// sums and re-keying every arc with exactly one endpoint moved.
    fn splice(&mut self, enter: usize) {
        self.stamp += 1;
        let head = self.arcs[enter].head;
        let tail = self.arcs[enter].tail;

        if let Some(old) = self.parent_arc[head] {
            self.arcs[old].in_tree = false;
            let old_tail = self.arcs[old].tail;
            if let Some(position) = self.children[old_tail].iter().position(|&child| child == head)
            {
                self.children[old_tail].swap_remove(position);
            }
        }
        self.arcs[enter].in_tree = true;
        self.parent_arc[head] = Some(enter);
        self.children[tail].push(head);

        let delta_cost = self.path_cost[tail] + self.arcs[enter].cost - self.path_cost[head];
        let delta_transit =
            self.path_transit[tail] + self.arcs[enter].transit - self.path_transit[head];

        let mut subtree = vec![head];
        let mut index = 0;
        while index < subtree.len() {
            let node = subtree[index];
            index += 1;
            for position in 0..self.children[node].len() {
                subtree.push(self.children[node][position]);
            }
        }
        for &node in &subtree {
            self.path_cost[node] += delta_cost;
            self.path_transit[node] += delta_transit;
            self.mark[node] = self.stamp;
        }

        // moved nodes and the heads of arcs leaving the subtree
        for index in 0..subtree.len() {
            let node = subtree[index];
            self.refresh_best_in(node);
            for position in 0..self.out_arcs[node].len() {
                let arc = self.out_arcs[node][position];
                let other = self.arcs[arc].head;
                if self.mark[other] != self.stamp {
                    self.mark[other] = self.stamp;
                    self.refresh_best_in(other);
                }
            }
        }
    }

    /// Permanently drops `arc` from the keyed selection and reselects the
    /// best incoming arc of its head.
    fn discard(&mut self, arc: usize) {
        let head = self.arcs[arc].head;
        if let Some(position) = self.in_arcs[head].iter().position(|&id| id == arc) {
            self.in_arcs[head].swap_remove(position);
        }
        self.refresh_best_in(head);
    }

    /// Pops arcs until one closes a cycle, splicing the rest into the tree.
    fn run(mut self) -> McmResult<Option<(f64, Vec<usize>)>> {
        let bound = (self.best_in.len() + 1).saturating_mul(self.arcs.len() + 1);
        let mut splices = 0usize;
        loop {
            let (arc, key) = match self.heap.pop() {
                Some(top) => top,
                None => return Ok(None),
            };
            if self.closes_cycle(arc) {
                if key == f64::INFINITY {
                    // the cycle this arc closes has nonpositive total
                    // transit and no finite ratio; drop the arc and sweep on
                    self.discard(arc);
                    continue;
                }
                return Ok(Some((key, self.extract_cycle(arc))));
            }
            splices += 1;
            if splices > bound {
                warn!(bound, "yto_splice_bound_exceeded");
                return Err(McmError::IterationBoundExceeded {
                    algorithm: "young-tarjan-orlin",
                    bound,
                });
            }
            self.splice(arc);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
