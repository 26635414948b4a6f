//! Synchronous product composition of two automata.

use std::collections::{BTreeMap, VecDeque};

use tracing::debug;

use crate::automaton::{Automaton, StateId};
use crate::error::FsmResult;

impl<SLA, ELA> Automaton<SLA, ELA>
where
    SLA: Ord + Clone,
{
    /// Builds the synchronous product of two automata.
    ///
    /// `matcher` decides, per pair of edges, whether the two automata step
    /// together and what label the combined transition carries. Pair states
    /// are created eagerly but only for pairs reachable from the initial
    /// pair, so the result stays finite and fully materialized. A pair state
    /// is final when both halves are final.
    pub fn product<SLB, ELB, EL, F>(
        &self,
        other: &Automaton<SLB, ELB>,
        mut matcher: F,
    ) -> FsmResult<Automaton<(SLA, SLB), EL>>
    where
        SLB: Ord + Clone,
        F: FnMut(&ELA, &ELB) -> Option<EL>,
    {
        let initial_a = self.initial_state()?;
        let initial_b = other.initial_state()?;
        debug!(
            left_states = self.state_count(),
            right_states = other.state_count(),
            "product_start"
        );

        let mut result: Automaton<(SLA, SLB), EL> = Automaton::new();
        let mut state_of_pair: BTreeMap<(StateId, StateId), StateId> = BTreeMap::new();
        let mut queue: VecDeque<(StateId, StateId)> = VecDeque::new();

        let seed = (initial_a, initial_b);
        let seed_state = pair_state(self, other, &mut result, seed);
        result.set_initial_state(seed_state);
        state_of_pair.insert(seed, seed_state);
        queue.push_back(seed);

        while let Some(pair) = queue.pop_front() {
            let source = state_of_pair[&pair];
            let (sa, sb) = pair;
            for &edge_a_id in self.state(sa).outgoing_edges() {
                let edge_a = self.edge(edge_a_id);
                for &edge_b_id in other.state(sb).outgoing_edges() {
                    let edge_b = other.edge(edge_b_id);
                    let Some(label) = matcher(edge_a.label(), edge_b.label()) else {
                        continue;
                    };
                    let next = (edge_a.target(), edge_b.target());
                    let target = match state_of_pair.get(&next) {
                        Some(&existing) => existing,
                        None => {
                            let created = pair_state(self, other, &mut result, next);
                            state_of_pair.insert(next, created);
                            queue.push_back(next);
                            created
                        }
                    };
                    result.add_edge(source, label, target);
                }
            }
        }

        debug!(
            states = result.state_count(),
            edges = result.edge_count(),
            "product_complete"
        );
        Ok(result)
    }
}

/// Adds a product state for `pair`, final when both halves are final.
fn pair_state<SLA, ELA, SLB, ELB, EL>(
    left: &Automaton<SLA, ELA>,
    right: &Automaton<SLB, ELB>,
    result: &mut Automaton<(SLA, SLB), EL>,
    pair: (StateId, StateId),
) -> StateId
where
    SLA: Ord + Clone,
    SLB: Ord + Clone,
{
    let label = (
        left.state(pair.0).label().clone(),
        right.state(pair.1).label().clone(),
    );
    let id = result.add_state(label);
    if left.final_states().contains(&pair.0) && right.final_states().contains(&pair.1) {
        result.add_final_state(id);
    }
    id
}
