//! Partition-refinement minimization.

use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use crate::automaton::{Automaton, StateId};
use crate::error::FsmResult;

impl<SL, EL> Automaton<SL, EL>
where
    SL: Ord + Clone,
    EL: Ord + Clone,
{
    /// Builds the quotient automaton of transition-equivalent states.
    ///
    /// Starting from a single class holding every state, classes split until
    /// stable. Unless `ignore_state_labels` is set, states with distinct
    /// labels are separated first. Afterwards a member stays with its class
    /// representative only if, for every edge label on either state, both
    /// reach the same set of classes. Classes only ever split, so the
    /// refinement reaches a fixed point.
    ///
    /// The result has one state per class, labeled after the class's
    /// lowest-id member and final when any member is final, and one edge per
    /// distinct (class, label, destination class) triple observed from the
    /// class representatives. The initial state is the class holding the
    /// lowest-id original initial state.
    pub fn minimize_edge_labels(&self, ignore_state_labels: bool) -> FsmResult<Automaton<SL, EL>> {
        let initial = self.initial_state()?;
        debug!(
            states = self.state_count(),
            edges = self.edge_count(),
            ignore_state_labels,
            "minimize_start"
        );

        // class ids are fresh on every split so stale ids never collide
        let mut next_class = 0usize;
        let mut class_of: HashMap<StateId, usize> = HashMap::new();

        let all: BTreeSet<StateId> = self.state_ids().collect();
        for &state in &all {
            class_of.insert(state, next_class);
        }
        let mut classes: Vec<BTreeSet<StateId>> = vec![all];
        next_class += 1;

        if !ignore_state_labels {
            loop {
                let mut changed = false;
                let mut refined: Vec<BTreeSet<StateId>> = Vec::with_capacity(classes.len());
                for class in &classes {
                    let mut members = class.iter().copied();
                    let representative = match members.next() {
                        Some(state) => state,
                        None => continue,
                    };
                    let mut same = BTreeSet::from([representative]);
                    let mut rest = BTreeSet::new();
                    for other in members {
                        if self.state(other).label() == self.state(representative).label() {
                            same.insert(other);
                        } else {
                            rest.insert(other);
                        }
                    }
                    changed |= !rest.is_empty();
                    next_class =
                        Self::commit_split(&mut refined, &mut class_of, next_class, same, rest);
                }
                classes = refined;
                if !changed {
                    break;
                }
            }
        }

        loop {
            let mut changed = false;
            let mut refined: Vec<BTreeSet<StateId>> = Vec::with_capacity(classes.len());
            for class in &classes {
                let mut members = class.iter().copied();
                let representative = match members.next() {
                    Some(state) => state,
                    None => continue,
                };
                let mut same = BTreeSet::from([representative]);
                let mut rest = BTreeSet::new();
                for other in members {
                    if self.edges_equivalent(representative, other, &class_of) {
                        same.insert(other);
                    } else {
                        rest.insert(other);
                    }
                }
                changed |= !rest.is_empty();
                next_class =
                    Self::commit_split(&mut refined, &mut class_of, next_class, same, rest);
            }
            classes = refined;
            if !changed {
                break;
            }
        }

        let result = self.build_quotient(&classes, &class_of, initial);
        debug!(
            states = result.state_count(),
            edges = result.edge_count(),
            "minimize_complete"
        );
        Ok(result)
    }

    /// Records a split, assigning fresh class ids to both halves.
    fn commit_split(
        refined: &mut Vec<BTreeSet<StateId>>,
        class_of: &mut HashMap<StateId, usize>,
        mut next_class: usize,
        same: BTreeSet<StateId>,
        rest: BTreeSet<StateId>,
    ) -> usize {
        for &member in &same {
            class_of.insert(member, next_class);
        }
        refined.push(same);
        next_class += 1;
        if !rest.is_empty() {
            for &member in &rest {
                class_of.insert(member, next_class);
            }
            refined.push(rest);
            next_class += 1;
        }
        next_class
    }

    /// Whether two states reach the same classes for every edge label on
    /// either of them.
    fn edges_equivalent(
        &self,
        s1: StateId,
        s2: StateId,
        class_of: &HashMap<StateId, usize>,
    ) -> bool {
        let mut labels = self.outgoing_edge_labels(s1);
        labels.extend(self.outgoing_edge_labels(s2));
        for label in &labels {
            let classes1: BTreeSet<usize> = self
                .next_states_of_edge_label(s1, label)
                .iter()
                .map(|state| class_of[state])
                .collect();
            let classes2: BTreeSet<usize> = self
                .next_states_of_edge_label(s2, label)
                .iter()
                .map(|state| class_of[state])
                .collect();
            if classes1 != classes2 {
                return false;
            }
        }
        true
    }

    /// Builds the quotient automaton from a stable partition.
    fn build_quotient(
        &self,
        classes: &[BTreeSet<StateId>],
        class_of: &HashMap<StateId, usize>,
        initial: StateId,
    ) -> Automaton<SL, EL> {
        let mut result = Automaton::new();
        let mut state_of_class: HashMap<usize, StateId> = HashMap::new();

        for class in classes {
            let representative = match class.iter().next() {
                Some(&state) => state,
                None => continue,
            };
            let id = result.add_state(self.state(representative).label().clone());
            if class.iter().any(|state| self.final_states().contains(state)) {
                result.add_final_state(id);
            }
            state_of_class.insert(class_of[&representative], id);
        }

        let mut seen: BTreeSet<(usize, EL, usize)> = BTreeSet::new();
        for class in classes {
            let representative = match class.iter().next() {
                Some(&state) => state,
                None => continue,
            };
            let source_class = class_of[&representative];
            for &edge_id in self.state(representative).outgoing_edges() {
                let edge = self.edge(edge_id);
                let target_class = class_of[&edge.target()];
                if seen.insert((source_class, edge.label().clone(), target_class)) {
                    result.add_edge(
                        state_of_class[&source_class],
                        edge.label().clone(),
                        state_of_class[&target_class],
                    );
                }
            }
        }

        result.set_initial_state(state_of_class[&class_of[&initial]]);
        result
    }
}
