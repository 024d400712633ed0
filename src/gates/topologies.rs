/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Preset gate networks.
//!
//! Every preset takes the evaluator its gates share, so thresholds, window
//! and tolerances stay under the caller's control. Presets that use a
//! 0.9-amplitude twin set it on the evaluator they are given.

use super::control::ControlSignal;
use super::evaluator::{GateEvaluator, GateReading, TwinTrajectory, WindowAnchor};
use super::network::{AmplitudeSource, GateNetwork, GateNode, NodeRef, Retention};
use crate::error::{Error, Result};
use crate::numeric::linspace;
use crate::thermo::ThermoParameters;

/// Span of the preset grids.
pub const STANDARD_DURATION: f64 = 240.0;

/// Samples of the preset grids.
pub const STANDARD_SAMPLES: usize = 480;

/// Twin amplitude factor of the cascade presets.
pub const CASCADE_TWIN_FACTOR: f64 = 0.9;

/// linspace(0, 240, 480).
pub fn standard_grid() -> Vec<f64> {
    linspace(0.0, STANDARD_DURATION, STANDARD_SAMPLES)
}

fn cascade(evaluator: GateEvaluator) -> GateEvaluator {
    evaluator.with_twin(TwinTrajectory::scaled(CASCADE_TWIN_FACTOR))
}

fn control(signal: ControlSignal) -> AmplitudeSource {
    AmplitudeSource::Control(signal)
}

/// AND: `a` and `b` follow offset square pulses; `c` is driven to 0.85 only
/// when both are active in the same step, otherwise 0.45.
pub fn and_gate(evaluator: GateEvaluator) -> Result<GateNetwork> {
    let pulse = ControlSignal::Pulse {
        high: 0.75,
        low: 0.45,
        period: 80.0,
        duty: 0.5,
        offset: 0.0,
    };
    GateNetwork::new(evaluator)
        .with_node(GateNode::gate("a", control(pulse)))?
        .with_node(GateNode::gate(
            "b",
            control(ControlSignal::Pulse {
                high: 0.75,
                low: 0.45,
                period: 80.0,
                duty: 0.5,
                offset: 20.0,
            }),
        ))?
        .with_node(GateNode::gate(
            "c",
            AmplitudeSource::Conjunction {
                inputs: vec![NodeRef::current("a"), NodeRef::current("b")],
                high: 0.85,
                low: 0.45,
            },
        ))
}

/// NOT: `b` is driven at 1.4 − amplitude(`a`).
pub fn not_gate(evaluator: GateEvaluator) -> Result<GateNetwork> {
    GateNetwork::new(evaluator)
        .with_node(GateNode::gate(
            "a",
            control(ControlSignal::SquareWave {
                base: 0.45,
                high: 0.72,
                period: 60.0,
            }),
        ))?
        .with_node(GateNode::gate(
            "b",
            AmplitudeSource::Affine {
                node: NodeRef::current("a"),
                scale: -1.0,
                offset: 1.4,
            },
        ))
}

/// Name of register bit `index`.
pub fn register_bit(index: usize) -> String {
    format!("bit{index}")
}

/// `bits`-wide register on a watch/write/lock control; bit g is driven at
/// control + 0.03·g.
pub fn register(bits: usize, evaluator: GateEvaluator) -> Result<GateNetwork> {
    if bits == 0 || bits > 8 {
        return Err(Error::invalid("bits", format!("must be in 1..=8, got {bits}")));
    }
    let mut network = GateNetwork::new(evaluator);
    network.add(GateNode::input(
        "control",
        control(ControlSignal::WatchWriteLock {
            watch: 0.45,
            write: 0.70,
            lock: 0.85,
            period: 80.0,
        }),
    ))?;
    for g in 0..bits {
        network.add(GateNode::gate(
            register_bit(g),
            AmplitudeSource::Affine {
                node: NodeRef::current("control"),
                scale: 1.0,
                offset: 0.03 * g as f64,
            },
        ))?;
    }
    Ok(network)
}

/// Name of chain stage `index`.
pub fn chain_stage(index: usize) -> String {
    format!("stage{index}")
}

/// Latched cascade: stage 0 follows a whole-second pulse, every later stage
/// is driven by the previous stage's mean occupancy in the same step.
pub fn memory_chain(stages: usize, evaluator: GateEvaluator) -> Result<GateNetwork> {
    if stages == 0 {
        return Err(Error::invalid("stages", "must be at least 1"));
    }
    let mut network = GateNetwork::new(cascade(evaluator));
    network.add(
        GateNode::gate(
            chain_stage(0),
            control(ControlSignal::WholeSecondPulse {
                high: 0.65,
                low: 0.20,
                repeat: 80,
                width: 40,
                shift: 0.0,
            }),
        )
        .latched(),
    )?;
    for i in 1..stages {
        network.add(GateNode::gate(chain_stage(i), AmplitudeSource::Occupancy(NodeRef::current(chain_stage(i - 1)))).latched())?;
    }
    Ok(network)
}

/// Three weak staggered pulses averaged into one gate, `sum`.
pub fn fan_in(evaluator: GateEvaluator) -> Result<GateNetwork> {
    let mut network = GateNetwork::new(cascade(evaluator));
    let mut sources = Vec::new();
    for (i, shift) in [0.0, 20.0, 40.0].into_iter().enumerate() {
        let name = format!("source{i}");
        network.add(GateNode::input(
            name.clone(),
            control(ControlSignal::WholeSecondPulse {
                high: 0.26,
                low: 0.18,
                repeat: 80,
                width: 40,
                shift,
            }),
        ))?;
        sources.push(NodeRef::current(name));
    }
    network.add(GateNode::gate("sum", AmplitudeSource::MeanAmplitude(sources)))?;
    Ok(network)
}

/// Two pulses in antiphase compared by `compare` with a 0.07 difference threshold.
pub fn comparator(evaluator: GateEvaluator) -> Result<GateNetwork> {
    let pulse = |shift| ControlSignal::WholeSecondPulse {
        high: 0.65,
        low: 0.25,
        repeat: 80,
        width: 40,
        shift,
    };
    GateNetwork::new(evaluator)
        .with_node(GateNode::input("a", control(pulse(0.0))))?
        .with_node(GateNode::input("b", control(pulse(40.0))))?
        .with_node(GateNode::comparator("compare", NodeRef::current("a"), NodeRef::current("b"), 0.07))
}

/// Proton-site thermodynamics of the dual-ion switch.
pub fn proton_thermo() -> Result<ThermoParameters> {
    ThermoParameters::new(-46.8421, -0.1021, 300.0)
}

/// Calcium-site thermodynamics of the dual-ion switch.
pub fn calcium_thermo() -> Result<ThermoParameters> {
    ThermoParameters::new(-46.0, -0.110, 300.0)
}

/// Two ion sites sharing one pulse drive; read the 2-bit code with
/// `run.packed_codes(&["proton", "calcium"])`.
///
/// Every window spans the first interval of `grid`.
pub fn dual_ion(grid: &[f64], evaluator: GateEvaluator) -> Result<GateNetwork> {
    let (start, window) = match grid {
        [first, second, ..] if second > first => (*first, second - first),
        _ => {
            return Err(Error::InvalidTimeGrid(
                "dual-ion windows need two ascending grid points".into(),
            ))
        }
    };
    let site = evaluator
        .with_window(window, evaluator.samples)
        .with_anchor(WindowAnchor::Fixed(start));
    let follow = || AmplitudeSource::Affine {
        node: NodeRef::current("drive"),
        scale: 1.0,
        offset: 0.0,
    };
    GateNetwork::new(evaluator)
        .with_node(GateNode::input(
            "drive",
            control(ControlSignal::Pulse {
                high: 0.30,
                low: 0.10,
                period: 60.0,
                duty: 0.5,
                offset: 0.0,
            }),
        ))?
        .with_node(GateNode::gate("proton", follow()).with_evaluator(site.with_thermo(proton_thermo()?)))?
        .with_node(GateNode::gate("calcium", follow()).with_evaluator(site.with_thermo(calcium_thermo()?)))
}

/// One latched gate, `register`, pulsed at 0.65 until t = 60 and silent afterwards.
pub fn phase_lock_register(evaluator: GateEvaluator) -> Result<GateNetwork> {
    GateNetwork::new(evaluator).with_node(
        GateNode::gate("register", control(ControlSignal::StepOff { level: 0.65, until: 60.0 })).latched(),
    )
}

/// Training pulses into one gate, `learner`, with Hill retention.
pub fn feedback_learning(evaluator: GateEvaluator) -> Result<GateNetwork> {
    GateNetwork::new(cascade(evaluator)).with_node(
        GateNode::gate(
            "learner",
            control(ControlSignal::WholeSecondPulse {
                high: 0.65,
                low: 0.25,
                repeat: 40,
                width: 20,
                shift: 0.0,
            }),
        )
        .with_retention(Retention::default()),
    )
}

/// One gate, `bootstrap`, whose sinusoidal drive rises with its own recent information.
pub fn information_bootstrap(evaluator: GateEvaluator) -> Result<GateNetwork> {
    GateNetwork::new(cascade(evaluator)).with_node(GateNode::gate(
        "bootstrap",
        AmplitudeSource::InformationBootstrap {
            carrier: ControlSignal::Sinusoid {
                base: 0.20,
                amplitude: 0.45,
                frequency: 1.0 / 60.0,
            },
            gain: 0.2,
            clip: (0.5, 2.5),
        },
    ))
}

/// Static ladder: gate g of `gates` is evaluated once over the whole `grid` at
/// an amplitude stepping evenly from `low` to `high`.
pub fn amplitude_ladder(
    gates: usize,
    low: f64,
    high: f64,
    grid: &[f64],
    evaluator: &GateEvaluator,
) -> Result<Vec<GateReading>> {
    let span = (gates.max(2) - 1) as f64;
    (0..gates)
        .map(|g| evaluator.evaluate_over(grid, low + g as f64 * (high - low) / span))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_validate() {
        let e = GateEvaluator::new();
        and_gate(e).unwrap().validate().unwrap();
        not_gate(e).unwrap().validate().unwrap();
        register(3, e).unwrap().validate().unwrap();
        memory_chain(3, e).unwrap().validate().unwrap();
        fan_in(e).unwrap().validate().unwrap();
        comparator(e).unwrap().validate().unwrap();
        dual_ion(&linspace(0.0, 120.0, 300), e).unwrap().validate().unwrap();
        phase_lock_register(e).unwrap().validate().unwrap();
        feedback_learning(e).unwrap().validate().unwrap();
        information_bootstrap(e).unwrap().validate().unwrap();
    }

    #[test]
    fn test_preset_arguments() {
        let e = GateEvaluator::new();
        assert!(register(0, e).is_err());
        assert!(register(9, e).is_err());
        assert!(memory_chain(0, e).is_err());
        assert!(matches!(dual_ion(&[0.0], e), Err(Error::InvalidTimeGrid(_))));
    }

    #[test]
    fn test_cascade_presets_use_close_twin() {
        let network = memory_chain(2, GateEvaluator::new()).unwrap();
        match network.evaluator().twin {
            TwinTrajectory::Perturbed { fraction } => assert!((fraction - 0.1).abs() < 1e-12),
            other => panic!("unexpected twin {:?}", other),
        }
        assert!(network.nodes().iter().all(|n| n.latched));
    }

    #[test]
    fn test_standard_grid() {
        let grid = standard_grid();
        assert_eq!(grid.len(), 480);
        assert_eq!(grid[479], 240.0);
    }
}
