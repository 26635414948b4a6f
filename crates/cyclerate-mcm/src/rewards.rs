//! Throughput analysis of reward-labelled automata.
//!
//! An automaton whose edges carry a [`RewardLabel`] models a system that
//! spends time and earns progress on every transition. The worst sustained
//! cost of such a system is the maximum over its cycles of total delay per
//! total reward, which this module computes by flattening the automaton
//! into an [`McmGraph`] and running the parametric cycle-ratio search.

use serde::{Deserialize, Serialize};

use cyclerate_fsm::{Automaton, EdgeId};

use crate::error::McmResult;
use crate::graph::{McmGraph, McmMapping};
use crate::yto;

/// Edge annotation pairing a traversal delay with the reward it earns.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RewardLabel {
    /// Time spent traversing the edge.
    pub delay: f64,
    /// Progress credited for traversing the edge.
    pub reward: f64,
}

impl RewardLabel {
    /// A label with the given delay and reward.
    pub fn new(delay: f64, reward: f64) -> Self {
        RewardLabel { delay, reward }
    }
}

/// Maximum over all cycles of the automaton of cycle delay per cycle
/// reward. Cycles whose total reward is not positive are ignored; an
/// automaton without any rewarded cycle yields negative infinity.
pub fn maximum_cycle_ratio<SL>(fsm: &Automaton<SL, RewardLabel>) -> McmResult<f64> {
    let (graph, _) = flatten(fsm);
    yto::maximum_cycle_ratio_yto(&graph)
}

/// Maximum cycle ratio plus the automaton edges of a critical cycle, in
/// cycle order.
pub fn maximum_cycle_ratio_and_critical_cycle<SL>(
    fsm: &Automaton<SL, RewardLabel>,
) -> McmResult<(f64, Vec<EdgeId>)> {
    let (graph, mapping) = flatten(fsm);
    let (ratio, cycle) = yto::maximum_cycle_ratio_and_critical_cycle_yto(&graph)?;
    let edges = cycle
        .iter()
        .filter_map(|edge| mapping.automaton_edge(edge.id))
        .collect();
    Ok((ratio, edges))
}

/// Minimum over all cycles of the automaton of cycle delay per cycle
/// reward. An automaton without any rewarded cycle yields positive
/// infinity.
pub fn minimum_cycle_ratio<SL>(fsm: &Automaton<SL, RewardLabel>) -> McmResult<f64> {
    let (graph, _) = flatten(fsm);
    yto::minimum_cycle_ratio_yto(&graph)
}

fn flatten<SL>(fsm: &Automaton<SL, RewardLabel>) -> (McmGraph, McmMapping) {
    McmGraph::from_automaton(fsm, |label| (label.delay, label.reward))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn two_loop_automaton() -> Automaton<&'static str, RewardLabel> {
        let mut fsm = Automaton::default();
        let s1 = fsm.add_state("s1");
        let s2 = fsm.add_state("s2");
        let s3 = fsm.add_state("s3");
        fsm.add_edge(s1, RewardLabel::new(3.0, 1.0), s2);
        fsm.add_edge(s1, RewardLabel::new(3.0, 1.0), s3);
        fsm.add_edge(s2, RewardLabel::new(1.0, 1.0), s1);
        fsm.add_edge(s3, RewardLabel::new(7.0, 1.0), s1);
        fsm.set_initial_state(s1);
        fsm
    }

    #[test]
    fn slowest_loop_dominates_the_ratio() {
        let fsm = two_loop_automaton();
        let ratio = maximum_cycle_ratio(&fsm).unwrap();
        assert!((ratio - 5.0).abs() < 1e-9);
    }

    #[test]
    fn critical_cycle_names_automaton_edges() {
        let fsm = two_loop_automaton();
        let (ratio, cycle) = maximum_cycle_ratio_and_critical_cycle(&fsm).unwrap();
        assert!((ratio - 5.0).abs() < 1e-9);

        let mut ids: Vec<u64> = cycle.iter().map(|edge| edge.0).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![1, 3]);

        let total_delay: f64 = cycle.iter().map(|&id| fsm.edge(id).label().delay).sum();
        let total_reward: f64 = cycle.iter().map(|&id| fsm.edge(id).label().reward).sum();
        assert!((total_delay / total_reward - ratio).abs() < 1e-9);
    }

    #[test]
    fn fastest_loop_sets_the_minimum() {
        let fsm = two_loop_automaton();
        let ratio = minimum_cycle_ratio(&fsm).unwrap();
        assert!((ratio - 2.0).abs() < 1e-9);
    }

    #[test]
    fn rewardless_automaton_has_no_ratio() {
        let mut fsm: Automaton<&str, RewardLabel> = Automaton::default();
        let a = fsm.add_state("a");
        let b = fsm.add_state("b");
        fsm.add_edge(a, RewardLabel::new(2.0, 0.0), b);
        fsm.add_edge(b, RewardLabel::new(2.0, 0.0), a);

        assert_eq!(maximum_cycle_ratio(&fsm).unwrap(), f64::NEG_INFINITY);
        assert_eq!(minimum_cycle_ratio(&fsm).unwrap(), f64::INFINITY);
    }

    #[test]
    fn zero_reward_edge_inside_a_rewarded_cycle_still_counts() {
        // the slow loop earns its whole reward on the return edge
        let mut fsm: Automaton<&str, RewardLabel> = Automaton::default();
        let a = fsm.add_state("a");
        let b = fsm.add_state("b");
        fsm.add_edge(a, RewardLabel::new(4.0, 1.0), a);
        fsm.add_edge(a, RewardLabel::new(6.0, 0.0), b);
        fsm.add_edge(b, RewardLabel::new(4.0, 1.0), a);

        let (ratio, cycle) = maximum_cycle_ratio_and_critical_cycle(&fsm).unwrap();
        assert!((ratio - 10.0).abs() < 1e-9);
        let mut ids: Vec<u64> = cycle.iter().map(|edge| edge.0).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![1, 2]);
    }
}
