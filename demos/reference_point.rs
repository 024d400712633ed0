//! # Reference binding site
//!
//! Integrates the reference site at ligand amplitude 0.5 and at half that
//! amplitude, reduces both trajectories to the three classifier inputs and
//! prints the verdict. Then sweeps the amplitude to show where the active
//! phase begins.
//!
//! Run with `RUST_LOG=bfip_core=debug` to see solver summaries.

use bfip_core::numeric::linspace;
use bfip_core::{
    ActivationLatch, ActivationRule, DynamicsIntegrator, InformationEstimator, KineticParameters, PhaseMetrics,
    Result, ThermoParameters,
};
use tracing_subscriber::EnvFilter;

fn metrics(amplitude: f64, grid: &[f64]) -> Result<PhaseMetrics> {
    let thermo = ThermoParameters::reference();
    let integrator = DynamicsIntegrator::new();
    let base = integrator.integrate_thermo(&KineticParameters::new(1e5, amplitude), &thermo, grid)?;
    let twin = integrator.integrate_thermo(&KineticParameters::new(1e5, 0.5 * amplitude), &thermo, grid)?;
    let mean = base.mean_occupancy().unwrap_or(0.0);
    let mutual_information = InformationEstimator::dynamic_model()
        .estimate(base.occupancy(), twin.occupancy())
        .ok();
    Ok(PhaseMetrics {
        occupancy: mean,
        mutual_information,
        free_energy: thermo.free_energy(mean),
    })
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let grid = linspace(0.0, 120.0, 300);
    let rule = ActivationRule::dynamic_model();
    let temperature = ThermoParameters::reference().temperature;

    // ── Reference point ──────────────────────────────────────────────────────

    let reference = metrics(0.5, &grid)?;
    let mut latch = ActivationLatch::new(rule, temperature)?;
    let state = latch.step(reference);
    println!("reference site, amplitude 0.5");
    println!("  mean occupancy  {:.4}", reference.occupancy);
    match reference.mutual_information {
        Some(mi) => println!("  information     {:.4} nats", mi),
        None => println!("  information     indeterminate"),
    }
    println!("  free energy     {:.3} kJ/mol", reference.free_energy);
    println!("  phase           {}", if state.active { "ACTIVE" } else { "inactive" });

    // ── Amplitude sweep ──────────────────────────────────────────────────────

    println!();
    println!("{:>9}  {:>8}  {:>8}  {:>9}  phase", "amplitude", "θ̄", "MI", "ΔG");
    for amplitude in [0.01, 0.05, 0.1, 0.2, 0.35, 0.5, 0.75, 1.0] {
        let m = metrics(amplitude, &grid)?;
        let active = rule.is_active(&m, temperature);
        println!(
            "{:>9.2}  {:>8.4}  {:>8}  {:>9.3}  {}",
            amplitude,
            m.occupancy,
            m.mutual_information.map_or("-".to_string(), |mi| format!("{:.3}", mi)),
            m.free_energy,
            if active { "ACTIVE" } else { "inactive" }
        );
    }
    Ok(())
}
