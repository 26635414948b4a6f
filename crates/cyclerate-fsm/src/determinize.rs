//! Subset-construction determinization over edge labels.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use tracing::debug;

use crate::automaton::{Automaton, StateId};
use crate::error::FsmResult;

impl<SL, EL> Automaton<SL, EL>
where
    SL: Ord + Clone,
    EL: Ord + Clone,
{
    /// Builds the deterministic automaton over this automaton's edge labels.
    ///
    /// Each result state stands for a set of original states, labeled after
    /// the set's lowest-id member. A result state is final when any original
    /// state in its set is final. Construction starts from the singleton set
    /// holding the lowest-id initial state, so only reachable subsets are
    /// materialized.
    pub fn determinize_edge_labels(&self) -> FsmResult<Automaton<SL, EL>> {
        let initial = self.initial_state()?;
        debug!(
            states = self.state_count(),
            edges = self.edge_count(),
            "determinize_start"
        );

        let mut result = Automaton::new();
        let mut state_of_subset: BTreeMap<BTreeSet<StateId>, StateId> = BTreeMap::new();
        let mut queue: VecDeque<(BTreeSet<StateId>, StateId)> = VecDeque::new();

        let seed: BTreeSet<StateId> = [initial].into_iter().collect();
        let seed_state = self.subset_state(&mut result, &seed);
        result.set_initial_state(seed_state);
        state_of_subset.insert(seed.clone(), seed_state);
        queue.push_back((seed, seed_state));

        while let Some((subset, source)) = queue.pop_front() {
            let mut labels: BTreeSet<EL> = BTreeSet::new();
            for &member in &subset {
                labels.extend(self.outgoing_edge_labels(member));
            }

            for label in &labels {
                let mut next: BTreeSet<StateId> = BTreeSet::new();
                for &member in &subset {
                    next.extend(self.next_states_of_edge_label(member, label));
                }
                if next.is_empty() {
                    continue;
                }
                let target = match state_of_subset.get(&next) {
                    Some(&existing) => existing,
                    None => {
                        let created = self.subset_state(&mut result, &next);
                        state_of_subset.insert(next.clone(), created);
                        queue.push_back((next, created));
                        created
                    }
                };
                result.add_edge(source, label.clone(), target);
            }
        }

        debug!(
            states = result.state_count(),
            edges = result.edge_count(),
            "determinize_complete"
        );
        Ok(result)
    }

    /// Adds a result state for `subset`, labeled after its lowest-id member
    /// and final when any member is final.
    fn subset_state(&self, result: &mut Automaton<SL, EL>, subset: &BTreeSet<StateId>) -> StateId {
        let representative = match subset.iter().next() {
            Some(&state) => state,
            None => panic!("state subset must not be empty"),
        };
        let id = result.add_state(self.state(representative).label().clone());
        if subset.iter().any(|state| self.final_states().contains(state)) {
            result.add_final_state(id);
        }
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FsmError;

    #[test]
    fn parallel_edges_with_equal_labels_collapse_to_one_subset_state() {
        let mut fsm = Automaton::new();
        let a = fsm.add_state("a");
        let b = fsm.add_state("b");
        let c = fsm.add_state("c");
        fsm.add_edge(a, 'x', b);
        fsm.add_edge(a, 'x', c);
        fsm.set_initial_state(a);

        let det = fsm.determinize_edge_labels().unwrap();
        assert_eq!(det.state_count(), 2);
        assert_eq!(det.edge_count(), 1);

        let initial = det.initial_state().unwrap();
        let merged = det.next_state_of_edge_label(initial, &'x').unwrap();
        // the subset {b, c} is labeled after its lowest-id member
        assert_eq!(det.state(merged).label(), &"b");
    }

    #[test]
    fn result_has_one_edge_per_label_per_state() {
        let mut fsm = Automaton::new();
        let a = fsm.add_state("a");
        let b = fsm.add_state("b");
        let c = fsm.add_state("c");
        fsm.add_edge(a, 'x', b);
        fsm.add_edge(a, 'x', c);
        fsm.add_edge(a, 'y', c);
        fsm.set_initial_state(a);

        let det = fsm.determinize_edge_labels().unwrap();
        let initial = det.initial_state().unwrap();
        for state in det.states() {
            let labels = det.outgoing_edge_labels(state.id());
            assert_eq!(labels.len(), state.out_degree());
        }
        assert_eq!(det.state(initial).out_degree(), 2);
    }

    #[test]
    fn subset_holding_a_final_member_is_final() {
        let mut fsm = Automaton::new();
        let a = fsm.add_state("a");
        let b = fsm.add_state("b");
        let c = fsm.add_state("c");
        fsm.add_edge(a, 'x', b);
        fsm.add_edge(a, 'x', c);
        fsm.set_initial_state(a);
        fsm.add_final_state(c);

        let det = fsm.determinize_edge_labels().unwrap();
        let initial = det.initial_state().unwrap();
        let merged = det.next_state_of_edge_label(initial, &'x').unwrap();
        assert!(det.final_states().contains(&merged));
        assert!(!det.final_states().contains(&initial));
    }

    #[test]
    fn unreachable_states_are_not_materialized() {
        let mut fsm = Automaton::new();
        let a = fsm.add_state("a");
        let b = fsm.add_state("b");
        let orphan = fsm.add_state("orphan");
        fsm.add_edge(a, 'x', b);
        fsm.add_edge(orphan, 'x', b);
        fsm.set_initial_state(a);

        let det = fsm.determinize_edge_labels().unwrap();
        assert_eq!(det.state_count(), 2);
    }

    #[test]
    fn determinizing_a_cyclic_automaton_terminates() {
        let mut fsm = Automaton::new();
        let a = fsm.add_state("a");
        let b = fsm.add_state("b");
        fsm.add_edge(a, 'x', b);
        fsm.add_edge(b, 'x', a);
        fsm.add_edge(b, 'x', b);
        fsm.set_initial_state(a);

        let det = fsm.determinize_edge_labels().unwrap();
        // subsets {a}, {b}, {a, b} at most
        assert!(det.state_count() <= 3);
        let initial = det.initial_state().unwrap();
        assert!(det.next_state_of_edge_label(initial, &'x').is_some());
    }

    #[test]
    fn missing_initial_state_is_an_error() {
        let mut fsm: Automaton<&str, char> = Automaton::new();
        fsm.add_state("a");
        assert!(matches!(
            fsm.determinize_edge_labels(),
            Err(FsmError::NoInitialState)
        ));
    }
}
