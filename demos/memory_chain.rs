//! # Memory chain
//!
//! A latched cascade: stage 0 follows a whole-second pulse, each later stage
//! is driven by the previous stage's mean occupancy. Prints how long each
//! stage stays active and the first step it switches on.

use bfip_core::gates::topologies::{chain_stage, memory_chain, standard_grid};
use bfip_core::{ActivationRule, GateEvaluator, Result};
use tracing_subscriber::EnvFilter;

const STAGES: usize = 4;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let evaluator =
        GateEvaluator::new().with_rule(ActivationRule::dynamic_model().with_information_threshold(0.5));
    let run = memory_chain(STAGES, evaluator)?.run(&standard_grid())?;

    println!("{:<8} {:>7} {:>10} {:>10}", "stage", "active", "first on", "mean θ̄");
    for i in 0..STAGES {
        let name = chain_stage(i);
        let Some(series) = run.node(&name) else {
            continue;
        };
        let first = series
            .steps
            .iter()
            .position(|s| s.active)
            .map_or("-".to_string(), |k| format!("{:.1}", run.times[k]));
        let occupancy = series.occupancy();
        let mean = occupancy.iter().sum::<f64>() / occupancy.len() as f64;
        println!("{:<8} {:>7} {:>10} {:>10.4}", name, series.active_count(), first, mean);
    }
    Ok(())
}
