//! Throughput analysis of a small request pipeline.
//!
//! Models a fetch-decode service as a reward-labelled automaton, flattens it
//! into a weighted graph, and compares every cycle-mean algorithm on it
//! before extracting the critical cycle that bounds sustained throughput.
//!
//! Run with:
//! ```bash
//! cargo run --example throughput -p cyclerate-mcm
//! ```

use cyclerate_fsm::Automaton;
use cyclerate_mcm::{
    maximum_cycle_mean_dasdan_gupta, maximum_cycle_mean_howard, maximum_cycle_mean_karp,
    maximum_cycle_mean_yto, maximum_cycle_ratio_and_critical_cycle, McmGraph, RewardLabel,
};

// =============================================================================
// Pipeline model
// =============================================================================

/// A service loop with a retry path: the retry cycle is the slow one.
fn pipeline() -> Automaton<&'static str, RewardLabel> {
    let mut fsm = Automaton::default();
    let idle = fsm.add_state("idle");
    let fetch = fsm.add_state("fetch");
    let decode = fsm.add_state("decode");

    fsm.add_edge(idle, RewardLabel::new(2.0, 1.0), fetch);
    fsm.add_edge(fetch, RewardLabel::new(3.0, 1.0), decode);
    fsm.add_edge(decode, RewardLabel::new(1.0, 1.0), idle);
    fsm.add_edge(decode, RewardLabel::new(5.0, 1.0), fetch);
    fsm.set_initial_state(idle);
    fsm
}

// =============================================================================
// Main
// =============================================================================

fn main() -> anyhow::Result<()> {
    let fsm = pipeline();
    println!(
        "Pipeline automaton: {} states, {} transitions",
        fsm.state_count(),
        fsm.edge_count()
    );

    // Flatten delays into edge weights, rewards into transit times.
    let (graph, _) = McmGraph::from_automaton(&fsm, |label| (label.delay, label.reward));

    println!("\nMaximum cycle mean (delay per transition):");
    println!("  karp          {:.4}", maximum_cycle_mean_karp(&graph)?);
    println!(
        "  dasdan-gupta  {:.4}",
        maximum_cycle_mean_dasdan_gupta(&graph)?
    );
    println!("  howard        {:.4}", maximum_cycle_mean_howard(&graph)?);
    println!("  yto           {:.4}", maximum_cycle_mean_yto(&graph)?);

    let (ratio, cycle) = maximum_cycle_ratio_and_critical_cycle(&fsm)?;
    println!("\nWorst delay per unit of reward: {:.4}", ratio);
    println!("Critical cycle:");
    for id in &cycle {
        let edge = fsm.edge(*id);
        let label = edge.label();
        println!(
            "  {} -> {}  (delay {}, reward {})",
            fsm.state(edge.source()).label(),
            fsm.state(edge.target()).label(),
            label.delay,
            label.reward
        );
    }

    Ok(())
}
