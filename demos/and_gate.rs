//! # AND gate
//!
//! Two offset square pulses drive gates `a` and `b`; gate `c` is driven high
//! only in steps where both are active. Prints the state trace every ten steps
//! over the standard 240-unit grid.
//!
//! Two-sample windows carry at most ln 2 nats of information, so the demo
//! lowers the information threshold to 0.5 and raises the occupancy
//! threshold to 0.2 to separate the drive levels.

use bfip_core::gates::topologies::{and_gate, standard_grid};
use bfip_core::{ActivationRule, GateEvaluator, Result};
use tracing_subscriber::EnvFilter;

fn mark(active: bool) -> char {
    if active {
        '#'
    } else {
        '.'
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let evaluator = GateEvaluator::new().with_rule(
        ActivationRule::dynamic_model()
            .with_occupancy_threshold(0.2)
            .with_information_threshold(0.5),
    );
    let network = and_gate(evaluator)?;
    let run = network.run(&standard_grid())?;

    let a = run.states("a")?;
    let b = run.states("b")?;
    let c = run.states("c")?;
    println!("{:>7}  a b c", "t");
    for k in (0..run.times.len()).step_by(10) {
        println!("{:>7.1}  {} {} {}", run.times[k], mark(a[k]), mark(b[k]), mark(c[k]));
    }

    let agree = (0..c.len()).filter(|&k| c[k] == (a[k] && b[k])).count();
    println!();
    println!("c matches a ∧ b in {agree} of {} steps", c.len());
    Ok(())
}
