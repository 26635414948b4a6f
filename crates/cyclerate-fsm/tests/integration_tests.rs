//! Integration tests for the automaton engine: traversal, determinization,
//! minimization, and product composition working together.

use std::collections::HashMap;

use cyclerate_fsm::{Automaton, StateId};

// ============================================================================
// Test Automaton Builders
// ============================================================================

/// Builds automata from human-readable state names.
#[derive(Default)]
struct AutomatonBuilder {
    fsm: Automaton<&'static str, char>,
    states: HashMap<&'static str, StateId>,
}

impl AutomatonBuilder {
    fn new() -> Self {
        Self::default()
    }

    fn state(&mut self, label: &'static str) -> StateId {
        if let Some(&id) = self.states.get(label) {
            return id;
        }
        let id = self.fsm.add_state(label);
        self.states.insert(label, id);
        id
    }

    fn edge(&mut self, from: &'static str, label: char, to: &'static str) {
        let source = self.state(from);
        let target = self.state(to);
        self.fsm.add_edge(source, label, target);
    }

    fn initial(&mut self, label: &'static str) {
        let id = self.state(label);
        self.fsm.add_initial_state(id);
    }

    fn accepting(&mut self, label: &'static str) {
        let id = self.state(label);
        self.fsm.add_final_state(id);
    }

    fn build(self) -> Automaton<&'static str, char> {
        self.fsm
    }
}

// ============================================================================
// Pre-built automata
// ============================================================================

/// Nondeterministic request handler: two 'A' transitions from the idle state.
fn nondeterministic_requester() -> Automaton<&'static str, char> {
    let mut builder = AutomatonBuilder::new();
    builder.edge("idle", 'A', "fast");
    builder.edge("idle", 'A', "slow");
    builder.edge("fast", 'D', "idle");
    builder.edge("slow", 'D', "idle");
    builder.initial("idle");
    builder.accepting("idle");
    builder.build()
}

/// Pipeline whose two middle stages are transition-equivalent.
fn redundant_pipeline() -> Automaton<&'static str, char> {
    let mut builder = AutomatonBuilder::new();
    builder.edge("in", 'p', "mid1");
    builder.edge("in", 'q', "mid2");
    builder.edge("mid1", 'r', "out");
    builder.edge("mid2", 'r', "out");
    builder.edge("out", 'r', "out");
    builder.initial("in");
    builder.build()
}

// ============================================================================
// Traversal tests
// ============================================================================

#[test]
fn reachability_includes_initial_states_and_nothing_disconnected() {
    let mut builder = AutomatonBuilder::new();
    builder.edge("a", 'x', "b");
    builder.edge("b", 'x', "c");
    builder.edge("island", 'x', "island");
    builder.initial("a");
    let fsm = builder.build();

    let reached = fsm.reachable_states();
    assert_eq!(reached.len(), 3);
    for initial in fsm.initial_states() {
        assert!(reached.contains(initial));
    }
}

#[test]
fn reachability_unions_over_multiple_initial_states() {
    let mut builder = AutomatonBuilder::new();
    builder.edge("a", 'x', "b");
    builder.edge("c", 'x', "d");
    builder.initial("a");
    builder.initial("c");
    let fsm = builder.build();

    assert_eq!(fsm.reachable_states().len(), 4);
}

#[test]
fn cycle_detection_is_negative_on_an_acyclic_pipeline() {
    let fsm = nondeterministic_requester();
    assert!(fsm.has_directed_cycle());

    let mut builder = AutomatonBuilder::new();
    builder.edge("a", 'x', "b");
    builder.edge("b", 'y', "c");
    builder.initial("a");
    assert!(!builder.build().has_directed_cycle());
}

// ============================================================================
// Transformation tests
// ============================================================================

#[test]
fn determinization_merges_equal_label_branches() {
    let fsm = nondeterministic_requester();
    let det = fsm.determinize_edge_labels().unwrap();

    // {idle}, {fast, slow}
    assert_eq!(det.state_count(), 2);
    let initial = det.initial_state().unwrap();
    let merged = det.next_state_of_edge_label(initial, &'A').unwrap();
    assert_eq!(det.next_state_of_edge_label(merged, &'D'), Some(initial));
}

#[test]
fn determinization_is_idempotent_on_its_output() {
    let det = nondeterministic_requester().determinize_edge_labels().unwrap();
    let again = det.determinize_edge_labels().unwrap();

    assert_eq!(det.state_count(), again.state_count());
    assert_eq!(det.edge_count(), again.edge_count());

    // lockstep product visits exactly one pair per state when isomorphic
    let lockstep = det
        .product(&again, |a, b| (a == b).then_some(*a))
        .unwrap();
    assert_eq!(lockstep.state_count(), det.state_count());
    assert_eq!(lockstep.edge_count(), det.edge_count());
}

#[test]
fn minimization_never_increases_counts_and_is_a_fixed_point() {
    let fsm = redundant_pipeline();
    let min = fsm.minimize_edge_labels(true).unwrap();
    assert!(min.state_count() <= fsm.state_count());
    assert!(min.edge_count() <= fsm.edge_count());

    let again = min.minimize_edge_labels(true).unwrap();
    assert_eq!(min.state_count(), again.state_count());
    assert_eq!(min.edge_count(), again.edge_count());
}

#[test]
fn determinize_then_minimize_collapses_the_requester() {
    let fsm = nondeterministic_requester();
    let det = fsm.determinize_edge_labels().unwrap();
    let min = det.minimize_edge_labels(true).unwrap();

    // idle and the merged busy state remain distinguishable by finality of
    // structure: both keep one 'A'/'D' alternation
    assert_eq!(min.state_count(), 2);
    assert_eq!(min.edge_count(), 2);
    assert!(min.has_directed_cycle());
}

#[test]
fn final_states_survive_the_whole_pipeline() {
    let fsm = nondeterministic_requester();
    let det = fsm.determinize_edge_labels().unwrap();
    assert_eq!(det.final_states().len(), 1);

    let min = det.minimize_edge_labels(false).unwrap();
    assert_eq!(min.final_states().len(), 1);
    let initial = min.initial_state().unwrap();
    assert!(min.final_states().contains(&initial));
}

#[test]
fn product_against_itself_keeps_deterministic_shape() {
    let det = nondeterministic_requester().determinize_edge_labels().unwrap();
    let squared = det
        .product(&det, |a, b| (a == b).then_some(*a))
        .unwrap();
    assert_eq!(squared.state_count(), det.state_count());
    assert_eq!(squared.edge_count(), det.edge_count());
}
