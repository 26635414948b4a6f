//! Arena-owned automaton data model: states, labeled edges, and id-based
//! handles that stay valid across mutation.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{FsmError, FsmResult};

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for a state within one automaton.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct StateId(pub u64);

/// Unique identifier for an edge within one automaton.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct EdgeId(pub u64);

// ============================================================================
// States and edges
// ============================================================================

/// A state of the automaton, carrying a caller-chosen label.
#[derive(Debug, Clone)]
pub struct State<SL> {
    /// Identifier of this state.
    id: StateId,
    /// Caller-chosen label attached to this state.
    label: SL,
    /// Edges leaving this state, in ascending id order.
    outgoing: BTreeSet<EdgeId>,
}

impl<SL> State<SL> {
    /// Identifier of this state.
    pub fn id(&self) -> StateId {
        self.id
    }

    /// Label attached to this state.
    pub fn label(&self) -> &SL {
        &self.label
    }

    /// Edges leaving this state, in ascending id order.
    pub fn outgoing_edges(&self) -> &BTreeSet<EdgeId> {
        &self.outgoing
    }

    /// Number of edges leaving this state.
    pub fn out_degree(&self) -> usize {
        self.outgoing.len()
    }
}

/// A directed, labeled edge between two states of the same automaton.
#[derive(Debug, Clone)]
pub struct Edge<EL> {
    /// Identifier of this edge.
    id: EdgeId,
    /// State the edge leaves.
    source: StateId,
    /// State the edge enters.
    target: StateId,
    /// Caller-chosen label attached to this edge.
    label: EL,
}

impl<EL> Edge<EL> {
    /// Identifier of this edge.
    pub fn id(&self) -> EdgeId {
        self.id
    }

    /// State the edge leaves.
    pub fn source(&self) -> StateId {
        self.source
    }

    /// State the edge enters.
    pub fn target(&self) -> StateId {
        self.target
    }

    /// Label attached to this edge.
    pub fn label(&self) -> &EL {
        &self.label
    }
}

// ============================================================================
// Automaton
// ============================================================================

/// A finite-state automaton owning its states and edges in id-keyed arenas.
///
/// Ids are handed out by per-automaton counters and never reused, so a handle
/// obtained before an unrelated removal stays valid. All iteration runs in
/// ascending id order, which makes every derived construction deterministic.
#[derive(Debug, Clone)]
pub struct Automaton<SL, EL> {
    /// All states, keyed by id.
    states: BTreeMap<StateId, State<SL>>,
    /// All edges, keyed by id.
    edges: BTreeMap<EdgeId, Edge<EL>>,
    /// States marked as initial.
    initial: BTreeSet<StateId>,
    /// States marked as final.
    finals: BTreeSet<StateId>,
    /// Label-to-state index, dropped once labels stop being unique.
    label_index: Option<BTreeMap<SL, StateId>>,
    /// Next state id to hand out.
    next_state_id: u64,
    /// Next edge id to hand out.
    next_edge_id: u64,
}

impl<SL, EL> Default for Automaton<SL, EL> {
    fn default() -> Self {
        Self::new()
    }
}

impl<SL, EL> Automaton<SL, EL> {
    /// Creates an empty automaton.
    pub fn new() -> Self {
        Self {
            states: BTreeMap::new(),
            edges: BTreeMap::new(),
            initial: BTreeSet::new(),
            finals: BTreeSet::new(),
            label_index: Some(BTreeMap::new()),
            next_state_id: 0,
            next_edge_id: 0,
        }
    }

    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// Adds a state with the given label and returns its id.
    pub fn add_state(&mut self, label: SL) -> StateId
    where
        SL: Ord + Clone,
    {
        let id = StateId(self.next_state_id);
        self.next_state_id += 1;
        if let Some(index) = self.label_index.as_mut() {
            if index.insert(label.clone(), id).is_some() {
                // duplicate label: lookups fall back to a linear scan
                warn!(state = id.0, "state_label_index_invalidated");
                self.label_index = None;
            }
        }
        self.states.insert(
            id,
            State {
                id,
                label,
                outgoing: BTreeSet::new(),
            },
        );
        id
    }

    /// Adds an edge and returns its id.
    ///
    /// # Panics
    ///
    /// Panics if either endpoint is not owned by this automaton.
    pub fn add_edge(&mut self, source: StateId, label: EL, target: StateId) -> EdgeId {
        assert!(
            self.states.contains_key(&source),
            "edge source {source:?} is not owned by this automaton"
        );
        assert!(
            self.states.contains_key(&target),
            "edge target {target:?} is not owned by this automaton"
        );
        let id = EdgeId(self.next_edge_id);
        self.next_edge_id += 1;
        self.edges.insert(
            id,
            Edge {
                id,
                source,
                target,
                label,
            },
        );
        if let Some(state) = self.states.get_mut(&source) {
            state.outgoing.insert(id);
        }
        id
    }

    /// Removes an edge.
    ///
    /// # Panics
    ///
    /// Panics if the edge is not owned by this automaton.
    pub fn remove_edge(&mut self, id: EdgeId) {
        assert!(
            self.edges.contains_key(&id),
            "edge {id:?} is not owned by this automaton"
        );
        if let Some(edge) = self.edges.remove(&id) {
            if let Some(state) = self.states.get_mut(&edge.source) {
                state.outgoing.remove(&id);
            }
        }
    }

    /// Removes a state together with every edge touching it.
    ///
    /// # Panics
    ///
    /// Panics if the state is not owned by this automaton.
    pub fn remove_state(&mut self, id: StateId)
    where
        SL: Ord,
    {
        assert!(
            self.states.contains_key(&id),
            "state {id:?} is not owned by this automaton"
        );
        let touching: Vec<EdgeId> = self
            .edges
            .values()
            .filter(|edge| edge.source == id || edge.target == id)
            .map(|edge| edge.id)
            .collect();
        for edge in touching {
            self.remove_edge(edge);
        }
        if let Some(state) = self.states.remove(&id) {
            if let Some(index) = self.label_index.as_mut() {
                index.remove(&state.label);
            }
        }
        self.initial.remove(&id);
        self.finals.remove(&id);
    }

    // ------------------------------------------------------------------
    // Initial and final states
    // ------------------------------------------------------------------

    /// Marks the given state as the sole initial state.
    pub fn set_initial_state(&mut self, id: StateId) {
        assert!(
            self.states.contains_key(&id),
            "state {id:?} is not owned by this automaton"
        );
        self.initial.clear();
        self.initial.insert(id);
    }

    /// Marks an additional state as initial.
    pub fn add_initial_state(&mut self, id: StateId) {
        assert!(
            self.states.contains_key(&id),
            "state {id:?} is not owned by this automaton"
        );
        self.initial.insert(id);
    }

    /// Marks a state as final.
    pub fn add_final_state(&mut self, id: StateId) {
        assert!(
            self.states.contains_key(&id),
            "state {id:?} is not owned by this automaton"
        );
        self.finals.insert(id);
    }

    /// States marked as initial.
    pub fn initial_states(&self) -> &BTreeSet<StateId> {
        &self.initial
    }

    /// States marked as final.
    pub fn final_states(&self) -> &BTreeSet<StateId> {
        &self.finals
    }

    /// The lowest-id initial state, or an error if none is marked.
    pub fn initial_state(&self) -> FsmResult<StateId> {
        self.initial
            .iter()
            .next()
            .copied()
            .ok_or(FsmError::NoInitialState)
    }

    // ------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------

    /// The state with the given id.
    ///
    /// # Panics
    ///
    /// Panics if the state is not owned by this automaton.
    pub fn state(&self, id: StateId) -> &State<SL> {
        match self.states.get(&id) {
            Some(state) => state,
            None => panic!("state {id:?} is not owned by this automaton"),
        }
    }

    /// The state with the given id, if it exists.
    pub fn get_state(&self, id: StateId) -> Option<&State<SL>> {
        self.states.get(&id)
    }

    /// The edge with the given id.
    ///
    /// # Panics
    ///
    /// Panics if the edge is not owned by this automaton.
    pub fn edge(&self, id: EdgeId) -> &Edge<EL> {
        match self.edges.get(&id) {
            Some(edge) => edge,
            None => panic!("edge {id:?} is not owned by this automaton"),
        }
    }

    /// The edge with the given id, if it exists.
    pub fn get_edge(&self, id: EdgeId) -> Option<&Edge<EL>> {
        self.edges.get(&id)
    }

    /// All states in ascending id order.
    pub fn states(&self) -> impl Iterator<Item = &State<SL>> {
        self.states.values()
    }

    /// All edges in ascending id order.
    pub fn edges(&self) -> impl Iterator<Item = &Edge<EL>> {
        self.edges.values()
    }

    /// All state ids in ascending order.
    pub fn state_ids(&self) -> impl Iterator<Item = StateId> + '_ {
        self.states.keys().copied()
    }

    /// Number of states.
    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    // ------------------------------------------------------------------
    // Label lookup
    // ------------------------------------------------------------------

    /// The lowest-id state carrying the given label, if any.
    pub fn find_state_labeled(&self, label: &SL) -> Option<StateId>
    where
        SL: Ord,
    {
        match &self.label_index {
            Some(index) => index.get(label).copied(),
            None => self
                .states
                .values()
                .find(|state| &state.label == label)
                .map(|state| state.id),
        }
    }

    /// The lowest-id state carrying the given label, or an error.
    pub fn state_labeled(&self, label: &SL) -> FsmResult<StateId>
    where
        SL: Ord,
    {
        self.find_state_labeled(label)
            .ok_or(FsmError::StateLabelNotFound)
    }

    /// Whether any state carries the given label.
    pub fn has_state_labeled(&self, label: &SL) -> bool
    where
        SL: Ord,
    {
        self.find_state_labeled(label).is_some()
    }

    /// Rebuilds the label index after edits, restoring O(log n) lookups.
    ///
    /// Returns `false` and leaves lookups on the linear-scan path when two
    /// states still share a label.
    pub fn rebuild_label_index(&mut self) -> bool
    where
        SL: Ord + Clone,
    {
        let mut index = BTreeMap::new();
        for state in self.states.values() {
            if index.insert(state.label.clone(), state.id).is_some() {
                warn!(state = state.id.0, "state_label_index_rebuild_failed");
                self.label_index = None;
                return false;
            }
        }
        self.label_index = Some(index);
        true
    }

    // ------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------

    /// Targets of all edges leaving `from` whose label equals `label`.
    pub fn next_states_of_edge_label(&self, from: StateId, label: &EL) -> BTreeSet<StateId>
    where
        EL: PartialEq,
    {
        let mut targets = BTreeSet::new();
        for &edge_id in self.state(from).outgoing_edges() {
            let edge = self.edge(edge_id);
            if &edge.label == label {
                targets.insert(edge.target);
            }
        }
        targets
    }

    /// Target of the lowest-id edge leaving `from` with the given label.
    pub fn next_state_of_edge_label(&self, from: StateId, label: &EL) -> Option<StateId>
    where
        EL: PartialEq,
    {
        for &edge_id in self.state(from).outgoing_edges() {
            let edge = self.edge(edge_id);
            if &edge.label == label {
                return Some(edge.target);
            }
        }
        None
    }

    /// The lowest-id edge from `source` to `target`, if any.
    pub fn edge_between(&self, source: StateId, target: StateId) -> Option<EdgeId> {
        for &edge_id in self.state(source).outgoing_edges() {
            if self.edge(edge_id).target == target {
                return Some(edge_id);
            }
        }
        None
    }

    /// Distinct labels on edges leaving `from`.
    pub fn outgoing_edge_labels(&self, from: StateId) -> BTreeSet<EL>
    where
        EL: Ord + Clone,
    {
        let mut labels = BTreeSet::new();
        for &edge_id in self.state(from).outgoing_edges() {
            labels.insert(self.edge(edge_id).label.clone());
        }
        labels
    }

    // ------------------------------------------------------------------
    // Export
    // ------------------------------------------------------------------

    /// Converts the automaton to a petgraph `StableDiGraph` for analysis
    /// or visualization, along with the state-to-index mapping.
    pub fn to_petgraph(&self) -> (StableDiGraph<SL, EL>, HashMap<StateId, NodeIndex>)
    where
        SL: Clone,
        EL: Clone,
    {
        let mut graph = StableDiGraph::new();
        let mut index_of: HashMap<StateId, NodeIndex> = HashMap::new();

        for state in self.states.values() {
            let index = graph.add_node(state.label.clone());
            index_of.insert(state.id, index);
        }
        for edge in self.edges.values() {
            if let (Some(&source), Some(&target)) =
                (index_of.get(&edge.source), index_of.get(&edge.target))
            {
                graph.add_edge(source, target, edge.label.clone());
            }
        }

        (graph, index_of)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> Automaton<&'static str, char> {
        let mut fsm = Automaton::new();
        let a = fsm.add_state("a");
        let b = fsm.add_state("b");
        let c = fsm.add_state("c");
        fsm.add_edge(a, 'x', b);
        fsm.add_edge(b, 'y', c);
        fsm.add_edge(c, 'z', a);
        fsm.set_initial_state(a);
        fsm
    }

    #[test]
    fn ids_are_sequential_and_never_reused() {
        let mut fsm = triangle();
        let b = fsm.state_labeled(&"b").unwrap();
        fsm.remove_state(b);
        let d = fsm.add_state("d");
        assert_eq!(d, StateId(3));
        assert_eq!(fsm.state_count(), 3);
    }

    #[test]
    fn remove_state_drops_touching_edges() {
        let mut fsm = triangle();
        let b = fsm.state_labeled(&"b").unwrap();
        fsm.remove_state(b);
        assert_eq!(fsm.edge_count(), 1);
        let a = fsm.state_labeled(&"a").unwrap();
        assert_eq!(fsm.state(a).out_degree(), 0);
    }

    #[test]
    fn label_lookup_survives_duplicate_labels() {
        let mut fsm = triangle();
        let dup = fsm.add_state("a");
        let found = fsm.find_state_labeled(&"a").unwrap();
        assert_eq!(found, StateId(0));
        assert_ne!(found, dup);
    }

    #[test]
    fn label_index_can_be_rebuilt_once_labels_are_unique_again() {
        let mut fsm = triangle();
        let dup = fsm.add_state("a");
        assert!(!fsm.rebuild_label_index());

        fsm.remove_state(dup);
        assert!(fsm.rebuild_label_index());
        assert_eq!(fsm.find_state_labeled(&"a"), Some(StateId(0)));
    }

    #[test]
    fn initial_state_requires_a_marked_state() {
        let fsm: Automaton<&str, char> = Automaton::new();
        assert!(matches!(
            fsm.initial_state(),
            Err(FsmError::NoInitialState)
        ));
    }

    #[test]
    fn next_states_follow_matching_labels_only() {
        let mut fsm = Automaton::new();
        let a = fsm.add_state("a");
        let b = fsm.add_state("b");
        let c = fsm.add_state("c");
        fsm.add_edge(a, 'x', b);
        fsm.add_edge(a, 'x', c);
        fsm.add_edge(a, 'y', c);

        let targets = fsm.next_states_of_edge_label(a, &'x');
        assert_eq!(targets.len(), 2);
        assert_eq!(fsm.next_state_of_edge_label(a, &'y'), Some(c));
        assert_eq!(fsm.next_state_of_edge_label(b, &'x'), None);
    }

    #[test]
    fn edge_between_returns_lowest_id_edge() {
        let mut fsm = Automaton::new();
        let a = fsm.add_state("a");
        let b = fsm.add_state("b");
        let first = fsm.add_edge(a, 'x', b);
        fsm.add_edge(a, 'y', b);
        assert_eq!(fsm.edge_between(a, b), Some(first));
        assert_eq!(fsm.edge_between(b, a), None);
    }

    #[test]
    fn petgraph_export_preserves_shape() {
        let fsm = triangle();
        let (graph, index_of) = fsm.to_petgraph();
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 3);
        assert_eq!(index_of.len(), 3);
    }

    #[test]
    #[should_panic(expected = "not owned by this automaton")]
    fn foreign_state_id_panics() {
        let fsm = triangle();
        fsm.state(StateId(99));
    }

    #[test]
    fn ids_serialize_as_bare_numbers() {
        assert_eq!(serde_json::to_string(&StateId(7)).unwrap(), "7");
        assert_eq!(serde_json::to_string(&EdgeId(0)).unwrap(), "0");
        let id: StateId = serde_json::from_str("42").unwrap();
        assert_eq!(id, StateId(42));
    }
}
