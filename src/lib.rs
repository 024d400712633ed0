//! # bfip-core
//!
//! Binding, free energy and information: a boolean phase read off continuous
//! binding dynamics.
//!
//! ---
//!
//! ## Three signals, one phase
//!
//! **Occupancy**: the fraction θ of a receptor-like site that is bound,
//! integrated from binding/unbinding kinetics under a time-varying ligand.
//!
//! **Free energy**: ΔG = ΔH − T·ΔS·θ. The binding has to be favourable by more
//! than one bit's worth of thermal energy, R·T·ln 2.
//!
//! **Information**: mutual information between the trajectory and a perturbed
//! twin. A trajectory that carries nothing about its input is not a signal.
//!
//! A window is *active* when all three pass. Once active it stays active while
//! occupancy and free energy hold, so the phase latches. Repeating the test on
//! successive windows and wiring nodes together gives gates, registers and
//! memory chains.
//!
//! ---
//!
//! ## The pipeline
//!
//! ```text
//! KineticParameters ─┐
//!                    ├─▶ DynamicsIntegrator ─▶ Trajectory ─┬─▶ mean θ ──┐
//! ThermoParameters ──┘         (Rosenbrock)                ├─▶ ΔG(θ̄) ───┼─▶ ActivationLatch ─▶ bool
//!                                                twin ─────┴─▶ MI ──────┘
//!                                                                 ↓
//!                                                  GateNetwork ─▶ GateRun ─▶ packed codes
//! ```
//!
//! ## Module overview
//!
//! | Module | Key types | What it does |
//! |--------|-----------|--------------|
//! | [`kinetics`] | [`KineticParameters`], [`IonProfile`] | Equilibrium occupancy, rate law, feedback ligand, pH modulation |
//! | [`thermo`] | [`ThermoParameters`] | Free energy, composite potential, dissociation constant |
//! | [`information`] | [`InformationEstimator`], [`LogBase`] | Histogram and discrete MI, correlation proxy |
//! | [`solver`] | [`Rosenbrock`], [`Tolerances`], [`OdeSystem`] | Adaptive stiff integrator |
//! | [`dynamics`] | [`DynamicsIntegrator`], [`Trajectory`] | Driver, thermo-derived and feedback modes |
//! | [`phase`] | [`ActivationRule`], [`ActivationLatch`] | Three-condition classifier with latching |
//! | [`gates`] | [`GateEvaluator`], [`GateNetwork`] | Gate evaluation, wiring and preset topologies |
//! | [`signal`] | [`ProcessingMode`], [`SignalGateReport`] | Continuous-signal gates, offline or causal |
//! | [`stress`] | [`StressParameters`], [`StressOutcome`] | Two-state stress-memory model |
//! | `record` | `GateRunRecord` | Serialisable run record (requires `serde` feature) |
//! | `ffi` | | Python bindings (requires `python-ffi` feature) |
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use bfip_core::{numeric::linspace, ActivationLatch, ActivationRule, DynamicsIntegrator};
//! use bfip_core::{InformationEstimator, KineticParameters, PhaseMetrics, ThermoParameters};
//!
//! # fn main() -> bfip_core::Result<()> {
//! let grid = linspace(0.0, 120.0, 300);
//! let thermo = ThermoParameters::reference();
//! let integrator = DynamicsIntegrator::new();
//! let base = integrator.integrate_thermo(&KineticParameters::new(1e5, 0.5), &thermo, &grid)?;
//! let twin = integrator.integrate_thermo(&KineticParameters::new(1e5, 0.25), &thermo, &grid)?;
//!
//! let mean = base.mean_occupancy().unwrap_or(0.0);
//! let mi = InformationEstimator::dynamic_model().estimate(base.occupancy(), twin.occupancy())?;
//! let mut latch = ActivationLatch::new(ActivationRule::dynamic_model(), thermo.temperature)?;
//! let state = latch.step(PhaseMetrics::new(mean, mi, thermo.free_energy(mean)));
//! assert!(state.active);
//! # Ok(())
//! # }
//! ```
//!
//! ## Features
//!
//! - `serde`: `Serialize`/`Deserialize` on every parameter and result type,
//!   plus the `record` module.
//! - `python-ffi`: pyo3 extension module `bfip_core`.
//!
//! ## License
//!
//! Business Source License 1.1. Free for evaluation and non-production use.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod error;
pub mod numeric;

pub mod kinetics;     // rate law, equilibrium, feedback ligand
pub mod thermo;       // ΔG, Ψ, Kd
pub mod information;  // MI estimators
pub mod solver;       // Rosenbrock ROS2
pub mod dynamics;     // integration modes
pub mod phase;        // active-phase classifier + latch
pub mod gates;        // evaluator, networks, presets
pub mod signal;       // continuous-signal gate family
pub mod stress;       // stress-memory model

#[cfg(feature = "serde")]
pub mod record;       // GateRunRecord

#[cfg(feature = "python-ffi")]
pub mod ffi;

pub use dynamics::{DynamicsIntegrator, Trajectory};
pub use error::{Error, Result};
pub use gates::{GateEvaluator, GateNetwork, GateReading, GateRun};
pub use information::{InformationEstimator, LogBase};
pub use kinetics::{IonProfile, KineticParameters, LigandTransform};
pub use phase::{ActivationLatch, ActivationPhase, ActivationRule, FreeEnergyBound, LatchRelease, PhaseMetrics};
pub use signal::{ProcessingMode, SignalGateReport};
pub use solver::{OdeSystem, Rosenbrock, Tolerances};
pub use stress::{StressOutcome, StressParameters};
pub use thermo::{EnergyUnit, ThermoParameters};
