/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Two-state stress-memory model.
//!
//! State (θ, M): receptor occupancy and a bounded memory variable driven by
//! oxygen stress. The oxygen level follows a fixed schedule:
//!
//! ```text
//! O₂(t) = 0.95                                t < 100
//!         0.05 + 0.03·sin(0.04·(t − 100))     t < 300
//!         0.2 + 0.1·cos(0.01·t)               otherwise
//! ```
//!
//! and the right-hand side is
//!
//! ```text
//! L_eff = c·(1 − 0.7·(1 − O₂))
//! k_off' = k_off·(1 + 0.3·PCO₂/50 + 0.1·(7.4 − pH)² + 0.02·(T − 310.15))
//! dθ/dt = k_on·L_eff·(1 − θ) − k_off'·θ          θ clipped to [0, 1] here only
//! dM/dt = −0.1·(1 − O₂)·θ + 0.1·sin(0.05·t) + perturbation
//! ```
//!
//! M is clamped to [−200, 1000] by the integrator.

use crate::dynamics::DynamicsIntegrator;
use crate::error::{ensure_finite, ensure_non_negative, ensure_positive, Error, Result};
use crate::solver::OdeSystem;
use crate::thermo::free_energy;

/// Clamp range of the memory variable.
pub const MEMORY_BOUNDS: (f64, f64) = (-200.0, 1000.0);

/// Body temperature in kelvin, the neutral point of the off-rate correction.
pub const BODY_TEMPERATURE: f64 = 310.15;

/// Oxygen level at time `t`.
pub fn oxygen_level(t: f64) -> f64 {
    if t < 100.0 {
        0.95
    } else if t < 300.0 {
        0.05 + 0.03 * (0.04 * (t - 100.0)).sin()
    } else {
        0.2 + 0.1 * (0.01 * t).cos()
    }
}

/// Rate and thermodynamic constants of one binding species (ΔH in J/mol,
/// ΔS in J/(mol·K)).
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StressIon {
    /// k_on.
    pub on_rate: f64,
    /// k_off before environmental correction.
    pub off_rate: f64,
    /// ΔH in J/mol.
    pub enthalpy: f64,
    /// ΔS in J/(mol·K).
    pub entropy: f64,
}

impl StressIon {
    /// Sickle-haemoglobin cushion site.
    pub fn hbs_cushion() -> Self {
        Self {
            on_rate: 8e4,
            off_rate: 3e3,
            enthalpy: -6000.0,
            entropy: 10.0,
        }
    }

    /// Ca²⁺.
    pub fn calcium() -> Self {
        Self {
            on_rate: 1e4,
            off_rate: 30.0,
            enthalpy: -3000.0,
            entropy: 7.0,
        }
    }

    /// Fe²⁺.
    pub fn ferrous() -> Self {
        Self {
            on_rate: 5e4,
            off_rate: 500.0,
            enthalpy: -5000.0,
            entropy: 8.0,
        }
    }

    fn validate(&self) -> Result<()> {
        ensure_non_negative("on_rate", self.on_rate)?;
        ensure_non_negative("off_rate", self.off_rate)?;
        ensure_finite("enthalpy", self.enthalpy)?;
        ensure_finite("entropy", self.entropy)
    }
}

/// Environment and initial state of one stress simulation.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StressParameters {
    /// Binding species.
    pub ion: StressIon,
    /// Ligand concentration c.
    pub concentration: f64,
    /// pH.
    pub ph: f64,
    /// Partial CO₂ pressure.
    pub pco2: f64,
    /// Temperature in kelvin.
    pub temperature: f64,
    /// Constant drive of the memory variable.
    pub perturbation: f64,
    /// Initial occupancy.
    pub initial_occupancy: f64,
    /// Initial memory.
    pub initial_memory: f64,
}

impl Default for StressParameters {
    fn default() -> Self {
        Self {
            ion: StressIon::hbs_cushion(),
            concentration: 0.5,
            ph: 7.4,
            pco2: 50.0,
            temperature: BODY_TEMPERATURE,
            perturbation: -0.3,
            initial_occupancy: 0.4,
            initial_memory: 1000.0,
        }
    }
}

impl StressParameters {
    /// Default environment around `ion` at concentration `concentration`.
    pub fn new(ion: StressIon, concentration: f64) -> Self {
        Self {
            ion,
            concentration,
            ..Self::default()
        }
    }

    /// Replace pH.
    pub fn with_ph(mut self, ph: f64) -> Self {
        self.ph = ph;
        self
    }

    /// Replace PCO₂.
    pub fn with_pco2(mut self, pco2: f64) -> Self {
        self.pco2 = pco2;
        self
    }

    /// Replace the temperature.
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    /// Replace the memory perturbation.
    pub fn with_perturbation(mut self, perturbation: f64) -> Self {
        self.perturbation = perturbation;
        self
    }

    /// Replace the initial state.
    pub fn with_initial_state(mut self, occupancy: f64, memory: f64) -> Self {
        self.initial_occupancy = occupancy;
        self.initial_memory = memory;
        self
    }

    /// Check every field.
    pub fn validate(&self) -> Result<()> {
        self.ion.validate()?;
        ensure_non_negative("concentration", self.concentration)?;
        ensure_finite("ph", self.ph)?;
        ensure_non_negative("pco2", self.pco2)?;
        ensure_positive("temperature", self.temperature)?;
        ensure_finite("perturbation", self.perturbation)?;
        ensure_finite("initial_occupancy", self.initial_occupancy)?;
        ensure_finite("initial_memory", self.initial_memory)?;
        if self.effective_off_rate() < 0.0 {
            return Err(Error::invalid(
                "temperature",
                "environmental correction drives the off-rate negative",
            ));
        }
        Ok(())
    }

    /// k_off after the CO₂, pH and temperature corrections.
    pub fn effective_off_rate(&self) -> f64 {
        let correction = 1.0
            + 0.3 * self.pco2 / 50.0
            + 0.1 * (7.4 - self.ph).powi(2)
            + 0.02 * (self.temperature - BODY_TEMPERATURE);
        self.ion.off_rate * correction
    }

    /// ΔG = ΔH − T·ΔS·θ in J/mol.
    pub fn free_energy(&self, theta: f64) -> f64 {
        free_energy(theta, self.ion.enthalpy, self.ion.entropy, self.temperature)
    }
}

/// The (θ, M) system.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StressModel {
    params: StressParameters,
    off_rate: f64,
    bounds: [(f64, f64); 2],
}

impl StressModel {
    /// Validated model.
    pub fn new(params: StressParameters) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            params,
            off_rate: params.effective_off_rate(),
            bounds: [(f64::NEG_INFINITY, f64::INFINITY), MEMORY_BOUNDS],
        })
    }
}

impl OdeSystem for StressModel {
    fn dimension(&self) -> usize {
        2
    }

    fn derivative(&self, t: f64, state: &[f64], out: &mut [f64]) {
        let theta = state[0].clamp(0.0, 1.0);
        let oxygen = oxygen_level(t);
        let ligand = self.params.concentration * (1.0 - 0.7 * (1.0 - oxygen));
        out[0] = self.params.ion.on_rate * ligand * (1.0 - theta) - self.off_rate * theta;
        out[1] = -0.1 * (1.0 - oxygen) * theta + 0.1 * (0.05 * t).sin() + self.params.perturbation;
    }

    fn bounds(&self) -> Option<&[(f64, f64)]> {
        Some(&self.bounds)
    }
}

/// Classification of a final (θ, M) state.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StressOutcome {
    /// Final occupancy.
    pub occupancy: f64,
    /// Final memory.
    pub memory: f64,
    /// ΔG at the final occupancy, J/mol.
    pub free_energy: f64,
    /// θ > 0.3, 10 < M < 900 and ΔG < −3000.
    pub bound: bool,
    /// θ > 0.85 and M < 20.
    pub ruptured: bool,
}

impl StressOutcome {
    /// Classify a state.
    pub fn classify(occupancy: f64, memory: f64, free_energy: f64) -> Self {
        Self {
            occupancy,
            memory,
            free_energy,
            bound: occupancy > 0.3 && memory > 10.0 && memory < 900.0 && free_energy < -3000.0,
            ruptured: occupancy > 0.85 && memory < 20.0,
        }
    }
}

/// Sampled (θ, M) series.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StressTrajectory {
    /// Sample times.
    pub times: Vec<f64>,
    /// θ at each time.
    pub occupancy: Vec<f64>,
    /// M at each time.
    pub memory: Vec<f64>,
    /// Parameters that produced it.
    pub params: StressParameters,
}

impl StressTrajectory {
    /// Classification of the last sample.
    pub fn outcome(&self) -> Option<StressOutcome> {
        let theta = *self.occupancy.last()?;
        let memory = *self.memory.last()?;
        Some(StressOutcome::classify(theta, memory, self.params.free_energy(theta)))
    }
}

/// Integrate the stress model over `grid`.
pub fn simulate_stress(
    params: &StressParameters,
    grid: &[f64],
    integrator: &DynamicsIntegrator,
) -> Result<StressTrajectory> {
    let model = StressModel::new(*params)?;
    let solution = integrator.integrate(&model, &[params.initial_occupancy, params.initial_memory], grid)?;
    Ok(StressTrajectory {
        times: solution.times().to_vec(),
        occupancy: solution.component(0),
        memory: solution.component(1),
        params: *params,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numeric::linspace;

    fn grid() -> Vec<f64> {
        linspace(0.0, 800.0, 400)
    }

    #[test]
    fn test_oxygen_schedule() {
        assert_eq!(oxygen_level(0.0), 0.95);
        assert!((oxygen_level(100.0) - 0.05).abs() < 1e-15);
        assert!((oxygen_level(300.0) - (0.2 + 0.1 * 3f64.cos())).abs() < 1e-15);
    }

    #[test]
    fn test_effective_off_rate() {
        let p = StressParameters::default();
        assert!((p.effective_off_rate() - 3900.0).abs() < 1e-9);
        let acid = p.with_ph(6.4);
        assert!((acid.effective_off_rate() - 4200.0).abs() < 1e-9);
    }

    #[test]
    fn test_cushion_ends_bound() {
        let traj = simulate_stress(&StressParameters::default(), &grid(), &DynamicsIntegrator::new()).unwrap();
        let outcome = traj.outcome().unwrap();
        assert!((outcome.occupancy - 0.8151).abs() < 2e-3, "got {}", outcome.occupancy);
        assert!((outcome.memory - 716.1).abs() < 3.0, "got {}", outcome.memory);
        assert!(outcome.bound);
        assert!(!outcome.ruptured);
    }

    #[test]
    fn test_strong_perturbation_ruptures() {
        let params = StressParameters::new(StressIon::ferrous(), 0.5).with_perturbation(-1.5);
        let traj = simulate_stress(&params, &grid(), &DynamicsIntegrator::new()).unwrap();
        assert!(traj.memory.iter().all(|&m| m >= MEMORY_BOUNDS.0 && m <= MEMORY_BOUNDS.1));
        let outcome = traj.outcome().unwrap();
        assert!((outcome.memory - MEMORY_BOUNDS.0).abs() < 1e-9, "got {}", outcome.memory);
        assert!(outcome.ruptured);
        assert!(!outcome.bound);
    }

    #[test]
    fn test_low_concentration_stays_unbound() {
        let params = StressParameters::new(StressIon::hbs_cushion(), 0.01);
        let outcome = simulate_stress(&params, &grid(), &DynamicsIntegrator::new())
            .unwrap()
            .outcome()
            .unwrap();
        assert!(outcome.occupancy < 0.3);
        assert!(!outcome.bound);
    }

    #[test]
    fn test_invalid_environment() {
        let cold = StressParameters::default().with_temperature(230.0);
        assert!(StressModel::new(cold).is_err());
        assert!(StressModel::new(StressParameters::new(StressIon::calcium(), -1.0)).is_err());
    }
}
