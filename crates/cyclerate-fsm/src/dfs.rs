//! Iterative depth-first traversal with caller-supplied visitors.
//!
//! The engine keeps an explicit frame stack, so deep or cyclic automata
//! never overflow the call stack. Visitors observe state entry and exit,
//! tree transitions, and every simple cycle closed by a back edge, and can
//! stop the traversal early by returning [`ControlFlow::Break`].

use std::collections::btree_set;
use std::collections::{BTreeSet, HashSet};
use std::ops::ControlFlow;

use tracing::debug;

use crate::automaton::{Automaton, Edge, EdgeId, StateId};

// ============================================================================
// Visitor protocol
// ============================================================================

/// Hooks invoked by [`DepthFirstSearch`] as the traversal unfolds.
///
/// Every hook returns a [`ControlFlow`]; `Break` aborts the whole traversal,
/// including any queued entry points.
pub trait DfsVisitor<EL> {
    /// Called when a state is first reached on the current search path.
    fn on_enter_state(&mut self, _state: StateId) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }

    /// Called when a state's outgoing edges are exhausted.
    fn on_leave_state(&mut self, _state: StateId) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }

    /// Called for each tree edge, just before its target is entered.
    fn on_transition(&mut self, _edge: &Edge<EL>) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }

    /// Called when `back_edge` closes a simple cycle.
    ///
    /// `stack` is the current search path; the cycle is its suffix starting
    /// at the back edge's target.
    fn on_simple_cycle(&mut self, _stack: &[StateId], _back_edge: &Edge<EL>) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }
}

// ============================================================================
// Engine
// ============================================================================

/// Iterative depth-first search over an [`Automaton`].
#[derive(Debug)]
pub struct DepthFirstSearch<'a, SL, EL> {
    fsm: &'a Automaton<SL, EL>,
}

/// One explicit stack frame: a state and its remaining outgoing edges.
struct Frame<'a> {
    state: StateId,
    edges: btree_set::Iter<'a, EdgeId>,
}

impl<'a, SL, EL> DepthFirstSearch<'a, SL, EL> {
    /// Creates an engine over the given automaton.
    pub fn new(fsm: &'a Automaton<SL, EL>) -> Self {
        Self { fsm }
    }

    /// Runs the search from every initial state.
    ///
    /// With `full_dfs` set, a state becomes visitable again as soon as it
    /// leaves the search path, so every simple path is explored. Without it,
    /// each state is entered at most once.
    pub fn run(&self, visitor: &mut impl DfsVisitor<EL>, full_dfs: bool) {
        let starts: Vec<StateId> = self.fsm.initial_states().iter().copied().collect();
        self.run_from(starts, visitor, full_dfs);
    }

    /// Runs the search from a single state.
    pub fn run_from_state(
        &self,
        start: StateId,
        visitor: &mut impl DfsVisitor<EL>,
        full_dfs: bool,
    ) {
        self.run_from([start], visitor, full_dfs);
    }

    /// Runs the search from each given entry point in turn, sharing the
    /// visited set across entries.
    pub fn run_from(
        &self,
        starts: impl IntoIterator<Item = StateId>,
        visitor: &mut impl DfsVisitor<EL>,
        full_dfs: bool,
    ) {
        let mut visited: HashSet<StateId> = HashSet::new();
        for start in starts {
            if visited.contains(&start) {
                continue;
            }
            if self
                .search(start, &mut visited, visitor, full_dfs)
                .is_break()
            {
                return;
            }
        }
    }

    fn search(
        &self,
        start: StateId,
        visited: &mut HashSet<StateId>,
        visitor: &mut impl DfsVisitor<EL>,
        full_dfs: bool,
    ) -> ControlFlow<()> {
        let fsm = self.fsm;
        let mut frames: Vec<Frame<'a>> = Vec::new();
        let mut trail: Vec<StateId> = Vec::new();
        let mut on_stack: HashSet<StateId> = HashSet::new();

        visited.insert(start);
        visitor.on_enter_state(start)?;
        frames.push(Frame {
            state: start,
            edges: fsm.state(start).outgoing_edges().iter(),
        });
        trail.push(start);
        on_stack.insert(start);

        while let Some(frame) = frames.last_mut() {
            match frame.edges.next() {
                None => {
                    let state = frame.state;
                    visitor.on_leave_state(state)?;
                    on_stack.remove(&state);
                    trail.pop();
                    frames.pop();
                    if full_dfs {
                        // the state may be revisited along a different path
                        visited.remove(&state);
                    }
                }
                Some(&edge_id) => {
                    let edge = fsm.edge(edge_id);
                    let target = edge.target();
                    if on_stack.contains(&target) {
                        visitor.on_simple_cycle(&trail, edge)?;
                    } else if !visited.contains(&target) {
                        visitor.on_transition(edge)?;
                        visited.insert(target);
                        visitor.on_enter_state(target)?;
                        frames.push(Frame {
                            state: target,
                            edges: fsm.state(target).outgoing_edges().iter(),
                        });
                        trail.push(target);
                        on_stack.insert(target);
                    }
                }
            }
        }
        ControlFlow::Continue(())
    }
}

// ============================================================================
// Stock visitors
// ============================================================================

/// Collects every state entered during a traversal.
#[derive(Debug, Default)]
pub struct ReachableStates {
    states: BTreeSet<StateId>,
}

impl ReachableStates {
    /// Creates an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// States entered so far.
    pub fn states(&self) -> &BTreeSet<StateId> {
        &self.states
    }

    /// Consumes the collector and returns the entered states.
    pub fn into_states(self) -> BTreeSet<StateId> {
        self.states
    }
}

impl<EL> DfsVisitor<EL> for ReachableStates {
    fn on_enter_state(&mut self, state: StateId) -> ControlFlow<()> {
        self.states.insert(state);
        ControlFlow::Continue(())
    }
}

/// Stops at the first back edge and records the simple cycle it closes.
#[derive(Debug, Default)]
pub struct CycleFinder {
    cycle: Option<Vec<StateId>>,
}

impl CycleFinder {
    /// Creates a finder with no cycle recorded.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a cycle has been recorded.
    pub fn has_cycle(&self) -> bool {
        self.cycle.is_some()
    }

    /// Consumes the finder and returns the recorded cycle, if any, as the
    /// states along it in path order.
    pub fn into_cycle(self) -> Option<Vec<StateId>> {
        self.cycle
    }
}

impl<EL> DfsVisitor<EL> for CycleFinder {
    fn on_simple_cycle(&mut self, stack: &[StateId], back_edge: &Edge<EL>) -> ControlFlow<()> {
        let start = stack
            .iter()
            .position(|&state| state == back_edge.target())
            .unwrap_or(0);
        self.cycle = Some(stack[start..].to_vec());
        ControlFlow::Break(())
    }
}

// ============================================================================
// Automaton traversal helpers
// ============================================================================

impl<SL, EL> Automaton<SL, EL> {
    /// States reachable from the initial states.
    pub fn reachable_states(&self) -> BTreeSet<StateId> {
        let starts: Vec<StateId> = self.initial_states().iter().copied().collect();
        self.reachable_states_from(starts)
    }

    /// States reachable from the given entry points.
    pub fn reachable_states_from(
        &self,
        starts: impl IntoIterator<Item = StateId>,
    ) -> BTreeSet<StateId> {
        let mut collector = ReachableStates::new();
        DepthFirstSearch::new(self).run_from(starts, &mut collector, false);
        debug!(reached = collector.states().len(), "reachability_complete");
        collector.into_states()
    }

    /// Whether any directed cycle exists, searching from every state.
    pub fn has_directed_cycle(&self) -> bool {
        self.find_simple_cycle().is_some()
    }

    /// The first simple cycle found, as the states along it, searching from
    /// every state in ascending id order.
    pub fn find_simple_cycle(&self) -> Option<Vec<StateId>> {
        let mut finder = CycleFinder::new();
        let starts: Vec<StateId> = self.state_ids().collect();
        DepthFirstSearch::new(self).run_from(starts, &mut finder, false);
        finder.into_cycle()
    }
}

// ============================================================================
// Tests
// ============================================================================
