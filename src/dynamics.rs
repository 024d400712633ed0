/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Occupancy trajectories and the integration modes that produce them.
//!
//! | Mode | Ligand | Rate law |
//! |------|--------|----------|
//! | driven | ramp precomputed on the grid, interpolated | k_on·L·(1−θ) − k_off·θ |
//! | thermo-derived | A·sin(ωt) + A | k_on·Lⁿ·(1−θ) − k_on·Kd·θ, Kd from ΔH − T·ΔS |
//! | feedback | base·(1 + A·sin(2πt/P)·θ(1−θ)), transformed | k_on·c·(1−θ) − k_off·θ |
//!
//! No mode clips occupancy. Every call integrates afresh; a perturbed twin is
//! a second call.

use crate::error::{ensure_finite, ensure_positive, Error, Result};
use crate::kinetics::{occupancy_rate, FeedbackLigand, KineticParameters, LigandTransform};
use crate::numeric::{interpolate, linspace, mean};
use crate::solver::{validate_grid, OdeSystem, Rosenbrock, Solution, Tolerances};
use crate::thermo::ThermoParameters;

/// Angular frequency of the thermo-derived ligand drive.
pub const DEFAULT_ANGULAR_FREQUENCY: f64 = 0.1;

/// Ceiling on the thermo-derived off-rate k_on·Kd.
///
/// A clamped Kd times k_on can still overflow to infinity, and ∞·θ at θ = 0 is
/// NaN. Below the cap the iteration matrix 1 + γ·h·k_off stays finite for any
/// step the solver takes.
pub const MAX_OFF_RATE: f64 = 1e200;

// ─── Trajectory ──────────────────────────────────────────────────────────────

/// Occupancy sampled on a time grid. Immutable once produced.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Trajectory {
    times: Vec<f64>,
    occupancy: Vec<f64>,
}

impl Trajectory {
    /// Wrap externally produced samples. Lengths must agree and the grid must
    /// be valid.
    pub fn from_samples(times: Vec<f64>, occupancy: Vec<f64>) -> Result<Self> {
        if times.len() != occupancy.len() {
            return Err(Error::ShapeMismatch(format!(
                "{} times against {} occupancy samples",
                times.len(),
                occupancy.len()
            )));
        }
        validate_grid(&times)?;
        Ok(Self { times, occupancy })
    }

    fn from_solution(solution: &Solution) -> Self {
        Self {
            times: solution.times().to_vec(),
            occupancy: solution.component(0),
        }
    }

    /// Sample times.
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// Occupancy at each sample time.
    pub fn occupancy(&self) -> &[f64] {
        &self.occupancy
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.times.len()
    }

    /// True when there are no samples.
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Mean occupancy over the samples.
    pub fn mean_occupancy(&self) -> Option<f64> {
        mean(&self.occupancy)
    }

    /// Occupancy at the last sample.
    pub fn final_occupancy(&self) -> Option<f64> {
        self.occupancy.last().copied()
    }

    /// `(time, occupancy)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.times.iter().copied().zip(self.occupancy.iter().copied())
    }
}

// ─── Ligand drivers ──────────────────────────────────────────────────────────

/// L(t) = A·sin(ωt) + A, floored at zero.
///
/// For A ≥ 0 the floor never engages; it keeps a negative amplitude from
/// producing a negative ligand level.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SinusoidalLigand {
    /// A.
    pub amplitude: f64,
    /// ω.
    pub angular_frequency: f64,
}

impl SinusoidalLigand {
    /// Ligand level at `t`.
    #[inline]
    pub fn at(&self, t: f64) -> f64 {
        (self.amplitude * (self.angular_frequency * t).sin() + self.amplitude).max(0.0)
    }
}

/// Ligand profile tabulated on a grid and linearly interpolated, with linear
/// extrapolation outside it.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RampDriver {
    times: Vec<f64>,
    ligand: Vec<f64>,
}

impl RampDriver {
    /// `linspace(start, end, grid.len()) · amplitude` laid over `grid`.
    pub fn linear(grid: &[f64], start: f64, end: f64, amplitude: f64) -> Result<Self> {
        ensure_finite("ligand_start", start)?;
        ensure_finite("ligand_end", end)?;
        ensure_finite("amplitude", amplitude)?;
        let ligand = linspace(start, end, grid.len())
            .into_iter()
            .map(|l| l * amplitude)
            .collect();
        Self::from_samples(grid.to_vec(), ligand)
    }

    /// Arbitrary tabulated profile.
    pub fn from_samples(times: Vec<f64>, ligand: Vec<f64>) -> Result<Self> {
        if times.len() != ligand.len() {
            return Err(Error::ShapeMismatch(format!(
                "{} times against {} ligand samples",
                times.len(),
                ligand.len()
            )));
        }
        validate_grid(&times)?;
        if let Some(l) = ligand.iter().find(|l| !l.is_finite()) {
            return Err(Error::invalid("ligand", format!("non-finite sample {l}")));
        }
        Ok(Self { times, ligand })
    }

    /// Interpolated ligand level at `t`.
    pub fn at(&self, t: f64) -> f64 {
        interpolate(&self.times, &self.ligand, t)
    }
}

// ─── Systems ─────────────────────────────────────────────────────────────────

struct DrivenBinding<'a> {
    driver: &'a RampDriver,
    on_rate: f64,
    off_rate: f64,
}

impl OdeSystem for DrivenBinding<'_> {
    fn dimension(&self) -> usize {
        1
    }

    fn derivative(&self, t: f64, state: &[f64], out: &mut [f64]) {
        out[0] = occupancy_rate(state[0], self.driver.at(t), self.on_rate, self.off_rate);
    }
}

/// Hill-form binding with a constant Kd and a sinusoidal ligand.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ThermoBinding {
    /// k_on.
    pub on_rate: f64,
    /// Kd; the off-rate is [`ThermoBinding::off_rate`].
    pub dissociation_constant: f64,
    /// Exponent n applied to the ligand level.
    pub hill_coefficient: f64,
    /// Ligand drive.
    pub ligand: SinusoidalLigand,
}

impl ThermoBinding {
    /// k_on·Kd, capped at [`MAX_OFF_RATE`].
    pub fn off_rate(&self) -> f64 {
        (self.on_rate * self.dissociation_constant).min(MAX_OFF_RATE)
    }
}

impl OdeSystem for ThermoBinding {
    fn dimension(&self) -> usize {
        1
    }

    fn derivative(&self, t: f64, state: &[f64], out: &mut [f64]) {
        let theta = state[0];
        let ln = self.ligand.at(t).powf(self.hill_coefficient);
        out[0] = self.on_rate * ln * (1.0 - theta) - self.off_rate() * theta;
    }
}

/// Binding driven by an occupancy-modulated ligand.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FeedbackBinding {
    /// Ligand signal, evaluated at the current occupancy.
    pub ligand: FeedbackLigand,
    /// Reading-to-concentration mapping.
    pub transform: LigandTransform,
    /// k_on.
    pub on_rate: f64,
    /// k_off.
    pub off_rate: f64,
}

impl OdeSystem for FeedbackBinding {
    fn dimension(&self) -> usize {
        1
    }

    fn derivative(&self, t: f64, state: &[f64], out: &mut [f64]) {
        let theta = state[0];
        let concentration = self.transform.apply(self.ligand.at(t, theta));
        out[0] = occupancy_rate(theta, concentration, self.on_rate, self.off_rate);
    }
}

// ─── DynamicsIntegrator ──────────────────────────────────────────────────────

/// Entry point for all integration modes.
///
/// Holds only configuration, so one instance may be shared by concurrent
/// callers.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DynamicsIntegrator {
    /// Solver error control.
    pub tolerances: Tolerances,
    /// ω of the thermo-derived ligand drive.
    pub angular_frequency: f64,
}

impl Default for DynamicsIntegrator {
    fn default() -> Self {
        Self {
            tolerances: Tolerances::default(),
            angular_frequency: DEFAULT_ANGULAR_FREQUENCY,
        }
    }
}

impl DynamicsIntegrator {
    /// Integrator with default tolerances and ω = 0.1.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the solver tolerances.
    pub fn with_tolerances(mut self, tolerances: Tolerances) -> Self {
        self.tolerances = tolerances;
        self
    }

    /// Replace ω of the thermo-derived drive.
    pub fn with_angular_frequency(mut self, angular_frequency: f64) -> Self {
        self.angular_frequency = angular_frequency;
        self
    }

    /// Integrate any system on `grid`.
    pub fn integrate<S: OdeSystem + ?Sized>(&self, system: &S, initial: &[f64], grid: &[f64]) -> Result<Solution> {
        Rosenbrock::new(self.tolerances).solve(system, initial, grid)
    }

    /// Driver mode: ligand ramps linearly from `ligand_start` to `ligand_end`
    /// (scaled by `kinetics.amplitude`) across the grid.
    ///
    /// The off-rate is the explicit one, or k_on·Kd.
    pub fn integrate_driven(
        &self,
        kinetics: &KineticParameters,
        ligand_start: f64,
        ligand_end: f64,
        grid: &[f64],
        initial_occupancy: f64,
    ) -> Result<Trajectory> {
        kinetics.validate()?;
        validate_grid(grid)?;
        let driver = RampDriver::linear(grid, ligand_start, ligand_end, kinetics.amplitude)?;
        self.integrate_with_driver(kinetics, &driver, grid, initial_occupancy)
    }

    /// Driver mode over an arbitrary tabulated ligand profile.
    pub fn integrate_with_driver(
        &self,
        kinetics: &KineticParameters,
        driver: &RampDriver,
        grid: &[f64],
        initial_occupancy: f64,
    ) -> Result<Trajectory> {
        kinetics.validate()?;
        ensure_finite("initial_occupancy", initial_occupancy)?;
        let system = DrivenBinding {
            driver,
            on_rate: kinetics.on_rate,
            off_rate: kinetics.resolved_off_rate()?,
        };
        let solution = self.integrate(&system, &[initial_occupancy], grid)?;
        Ok(Trajectory::from_solution(&solution))
    }

    /// Thermo-derived mode starting from an empty site.
    pub fn integrate_thermo(
        &self,
        kinetics: &KineticParameters,
        thermo: &ThermoParameters,
        grid: &[f64],
    ) -> Result<Trajectory> {
        self.integrate_thermo_from(kinetics, thermo, grid, 0.0)
    }

    /// Thermo-derived mode from a given initial occupancy.
    ///
    /// Kd is `kinetics.dissociation_constant` when supplied, otherwise
    /// exp((ΔH − T·ΔS)/(R·T)) (exponent clamped).
    pub fn integrate_thermo_from(
        &self,
        kinetics: &KineticParameters,
        thermo: &ThermoParameters,
        grid: &[f64],
        initial_occupancy: f64,
    ) -> Result<Trajectory> {
        let system = self.thermo_system(kinetics, thermo)?;
        ensure_finite("initial_occupancy", initial_occupancy)?;
        let solution = self.integrate(&system, &[initial_occupancy], grid)?;
        Ok(Trajectory::from_solution(&solution))
    }

    /// The validated thermo-derived system for these parameters.
    pub fn thermo_system(&self, kinetics: &KineticParameters, thermo: &ThermoParameters) -> Result<ThermoBinding> {
        kinetics.validate()?;
        thermo.validate()?;
        ensure_finite("angular_frequency", self.angular_frequency)?;
        Ok(ThermoBinding {
            on_rate: kinetics.on_rate,
            dissociation_constant: kinetics
                .dissociation_constant
                .unwrap_or_else(|| thermo.dissociation_constant()),
            hill_coefficient: kinetics.hill_coefficient,
            ligand: SinusoidalLigand {
                amplitude: kinetics.amplitude,
                angular_frequency: self.angular_frequency,
            },
        })
    }

    /// Feedback mode: the ligand depends on the occupancy it drives.
    pub fn integrate_feedback(
        &self,
        kinetics: &KineticParameters,
        ligand: FeedbackLigand,
        transform: LigandTransform,
        grid: &[f64],
        initial_occupancy: f64,
    ) -> Result<Trajectory> {
        kinetics.validate()?;
        ligand.validate()?;
        ensure_finite("initial_occupancy", initial_occupancy)?;
        let off_rate = kinetics.resolved_off_rate()?;
        ensure_positive("off_rate", off_rate)?;
        let system = FeedbackBinding {
            ligand,
            transform,
            on_rate: kinetics.on_rate,
            off_rate,
        };
        let solution = self.integrate(&system, &[initial_occupancy], grid)?;
        Ok(Trajectory::from_solution(&solution))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinetics::time_varying_ligand;

    fn relaxation(theta_eq: f64, rate: f64, t: f64) -> f64 {
        theta_eq * (1.0 - (-rate * t).exp())
    }

    #[test]
    fn test_constant_drive_relaxes_to_equilibrium() {
        let grid = linspace(0.0, 2.0, 21);
        let kinetics = KineticParameters::new(3.0, 1.0).with_off_rate(1.0);
        // L = 2 everywhere: θ* = 6/7, relaxation rate 7.
        let traj = DynamicsIntegrator::new()
            .integrate_driven(&kinetics, 2.0, 2.0, &grid, 0.0)
            .unwrap();
        for (t, theta) in traj.iter() {
            let exact = relaxation(6.0 / 7.0, 7.0, t);
            assert!((theta - exact).abs() < 1e-4, "t={} got {} want {}", t, theta, exact);
        }
    }

    #[test]
    fn test_zero_on_rate_keeps_initial_occupancy() {
        let grid = linspace(0.0, 120.0, 300);
        let kinetics = KineticParameters::new(0.0, 0.8);
        let traj = DynamicsIntegrator::new()
            .integrate_thermo_from(&kinetics, &ThermoParameters::reference(), &grid, 0.3)
            .unwrap();
        assert!(traj.occupancy().iter().all(|&v| v == 0.3));

        let driven = KineticParameters::new(0.0, 0.8).with_dissociation_constant(0.5);
        let traj = DynamicsIntegrator::new()
            .integrate_driven(&driven, 0.0, 5.0, &grid, 0.4)
            .unwrap();
        assert!(traj.occupancy().iter().all(|&v| v == 0.4));
    }

    #[test]
    fn test_thermo_window_from_empty_site() {
        let kinetics = KineticParameters::new(1e5, 0.5);
        let traj = DynamicsIntegrator::new()
            .integrate_thermo(&kinetics, &ThermoParameters::reference(), &[0.0, 1.0])
            .unwrap();
        assert_eq!(traj.occupancy()[0], 0.0);
        let end = traj.final_occupancy().unwrap();
        assert!((end - 0.3563).abs() < 2e-3, "got {}", end);
    }

    #[test]
    fn test_off_rate_is_capped_for_extreme_kd() {
        let thermo = ThermoParameters::new(5e6, 0.0, 310.0).unwrap();
        let system = DynamicsIntegrator::new()
            .thermo_system(&KineticParameters::new(1e5, 0.5), &thermo)
            .unwrap();
        assert!(system.dissociation_constant.is_finite());
        assert_eq!(system.off_rate(), MAX_OFF_RATE);

        let mut out = [0.0];
        system.derivative(0.0, &[0.0], &mut out);
        assert!(out[0].is_finite() && out[0] > 0.0, "got {}", out[0]);
    }

    #[test]
    fn test_thermo_mode_tracks_quasi_equilibrium() {
        // k_on = 1e5 keeps θ on L/(L + Kd).
        let kinetics = KineticParameters::new(1e5, 0.85);
        let thermo = ThermoParameters::reference();
        let traj = DynamicsIntegrator::new()
            .integrate_thermo(&kinetics, &thermo, &[0.0, 10.0])
            .unwrap();
        let lig = 0.85 * (1.0f64).sin() + 0.85;
        let expected = lig / (lig + thermo.dissociation_constant());
        let end = traj.final_occupancy().unwrap();
        assert!((end - expected).abs() < 1e-3, "got {} want {}", end, expected);
    }

    #[test]
    fn test_feedback_mode_without_oscillation_matches_constant_drive() {
        let grid = linspace(0.0, 5.0, 11);
        let kinetics = KineticParameters::new(2.0, 1.0).with_off_rate(1.0);
        let ligand = time_varying_ligand(0.5, 0.0, 100.0);
        let traj = DynamicsIntegrator::new()
            .integrate_feedback(&kinetics, ligand, LigandTransform::Identity, &grid, 0.5)
            .unwrap();
        // θ* = 1/2, so starting at 0.5 nothing moves.
        for &theta in traj.occupancy() {
            assert!((theta - 0.5).abs() < 1e-9, "got {}", theta);
        }
    }

    #[test]
    fn test_feedback_mode_applies_transform() {
        let grid = linspace(0.0, 1.0, 5);
        let kinetics = KineticParameters::new(1e4, 1.0).with_off_rate(10.0);
        let integrator = DynamicsIntegrator::new();
        // pL = 3 is a concentration of 1e-3, so k_on·c equals k_off.
        let p_scale = integrator
            .integrate_feedback(&kinetics, time_varying_ligand(3.0, 0.0, 100.0), LigandTransform::NegLog10, &grid, 0.2)
            .unwrap();
        let direct = integrator
            .integrate_feedback(&kinetics, time_varying_ligand(1e-3, 0.0, 100.0), LigandTransform::Identity, &grid, 0.2)
            .unwrap();
        for (a, b) in p_scale.occupancy().iter().zip(direct.occupancy()) {
            assert!((a - b).abs() < 1e-6, "{} vs {}", a, b);
        }
        let end = p_scale.final_occupancy().unwrap();
        assert!((end - 0.5).abs() < 1e-4, "got {}", end);
    }

    #[test]
    fn test_ramp_driver_extrapolates() {
        let driver = RampDriver::linear(&[0.0, 1.0, 2.0], 0.0, 4.0, 0.5).unwrap();
        assert_eq!(driver.at(1.0), 1.0);
        assert_eq!(driver.at(3.0), 3.0);
        assert_eq!(driver.at(-1.0), -1.0);
    }

    #[test]
    fn test_invalid_parameters_fail_before_integration() {
        let integrator = DynamicsIntegrator::new();
        let thermo = ThermoParameters::reference();
        let bad_rate = KineticParameters::new(-1.0, 0.5);
        assert!(integrator.integrate_thermo(&bad_rate, &thermo, &[0.0, 1.0]).is_err());
        let bad_t = thermo.with_temperature(0.0);
        assert!(integrator
            .integrate_thermo(&KineticParameters::new(1e5, 0.5), &bad_t, &[0.0, 1.0])
            .is_err());
        let no_off = KineticParameters::new(1.0, 0.5);
        assert!(integrator.integrate_driven(&no_off, 0.0, 1.0, &[0.0, 1.0], 0.0).is_err());
    }

    #[test]
    fn test_trajectory_from_samples_validates() {
        assert!(Trajectory::from_samples(vec![0.0, 1.0], vec![0.1]).is_err());
        let traj = Trajectory::from_samples(vec![0.0, 1.0], vec![0.2, 0.4]).unwrap();
        assert!((traj.mean_occupancy().unwrap() - 0.3).abs() < 1e-12);
        assert_eq!(traj.len(), 2);
    }
}
