/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Single-window gate evaluation.
//!
//! At time t the evaluator integrates the thermo-derived binding model over
//! [t, t + window] from an empty site, once at the driving amplitude and once
//! for a twin, and reduces the pair to mean occupancy, mutual information and
//! ΔG at the mean occupancy.

use crate::dynamics::{DynamicsIntegrator, Trajectory, DEFAULT_ANGULAR_FREQUENCY};
use crate::error::{ensure_finite, ensure_positive, Error, Result};
use crate::information::InformationEstimator;
use crate::kinetics::KineticParameters;
use crate::numeric::{linspace, mean};
use crate::phase::{ActivationRule, PhaseMetrics};
use crate::solver::Tolerances;
use crate::thermo::ThermoParameters;

/// k_on of every gate in the catalogue.
pub const DEFAULT_GATE_ON_RATE: f64 = 1e5;

/// Length of the evaluation window.
pub const DEFAULT_WINDOW: f64 = 1.0;

/// Samples per evaluation window (the window end points).
pub const DEFAULT_WINDOW_SAMPLES: usize = 2;

/// Amplitude reduction of the default twin.
pub const DEFAULT_PERTURBATION: f64 = 0.5;

/// Where the twin trajectory comes from.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TwinTrajectory {
    /// Same thermodynamics at amplitude·(1 − fraction).
    Perturbed {
        /// Relative amplitude reduction.
        fraction: f64,
    },
    /// Same amplitude under another thermodynamic parameter set.
    AlternateThermo(ThermoParameters),
}

impl TwinTrajectory {
    /// Twin at amplitude·`factor`.
    pub fn scaled(factor: f64) -> Self {
        TwinTrajectory::Perturbed { fraction: 1.0 - factor }
    }
}

/// Start of each evaluation window.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum WindowAnchor {
    /// The window starts at the evaluation time.
    #[default]
    EvaluationTime,
    /// Every window starts at the same instant, whatever the evaluation time.
    Fixed(f64),
}

/// Reduction of one window pair.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GateReading {
    /// Evaluation time.
    pub time: f64,
    /// Driving amplitude.
    pub amplitude: f64,
    /// Mean occupancy of the baseline window.
    pub mean_occupancy: f64,
    /// Information between baseline and twin, `None` when indeterminate.
    pub mutual_information: Option<f64>,
    /// ΔG at the mean occupancy.
    pub free_energy: f64,
    /// Memoryless classification.
    pub active: bool,
}

impl GateReading {
    /// Scalars for a classifier.
    pub fn metrics(&self) -> PhaseMetrics {
        PhaseMetrics {
            occupancy: self.mean_occupancy,
            mutual_information: self.mutual_information,
            free_energy: self.free_energy,
        }
    }
}

/// Reduction of two parallel windows compared against each other.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ComparatorReading {
    /// Evaluation time.
    pub time: f64,
    /// Mean occupancy of the first window.
    pub first_occupancy: f64,
    /// Mean occupancy of the second window.
    pub second_occupancy: f64,
    /// Information between the two windows, `None` when indeterminate.
    pub mutual_information: Option<f64>,
    /// ΔG at the average of the two means.
    pub free_energy: f64,
    /// Memoryless classification with the difference threshold.
    pub active: bool,
}

impl ComparatorReading {
    /// |θ̄_first − θ̄_second|.
    pub fn difference(&self) -> f64 {
        (self.first_occupancy - self.second_occupancy).abs()
    }

    /// Scalars for a classifier; the occupancy statistic is the difference.
    pub fn metrics(&self) -> PhaseMetrics {
        PhaseMetrics {
            occupancy: self.difference(),
            mutual_information: self.mutual_information,
            free_energy: self.free_energy,
        }
    }
}

/// Integrates and reduces one gate window.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GateEvaluator {
    /// k_on.
    pub on_rate: f64,
    /// Thermodynamics of the baseline.
    pub thermo: ThermoParameters,
    /// Hill exponent of the ligand term.
    pub hill_coefficient: f64,
    /// Window length.
    pub window: f64,
    /// Samples per window, end points included.
    pub samples: usize,
    /// Window placement.
    pub anchor: WindowAnchor,
    /// Twin construction.
    pub twin: TwinTrajectory,
    /// Information estimator for baseline against twin.
    pub estimator: InformationEstimator,
    /// Thresholds.
    pub rule: ActivationRule,
    /// Integration setup.
    pub integrator: DynamicsIntegrator,
}

impl Default for GateEvaluator {
    fn default() -> Self {
        Self {
            on_rate: DEFAULT_GATE_ON_RATE,
            thermo: ThermoParameters::reference(),
            hill_coefficient: 1.0,
            window: DEFAULT_WINDOW,
            samples: DEFAULT_WINDOW_SAMPLES,
            anchor: WindowAnchor::default(),
            twin: TwinTrajectory::Perturbed {
                fraction: DEFAULT_PERTURBATION,
            },
            estimator: InformationEstimator::dynamic_model(),
            rule: ActivationRule::dynamic_model(),
            integrator: DynamicsIntegrator {
                tolerances: Tolerances {
                    relative: 1e-4,
                    absolute: 1e-7,
                    ..Tolerances::default()
                },
                angular_frequency: DEFAULT_ANGULAR_FREQUENCY,
            },
        }
    }
}

impl GateEvaluator {
    /// Reference thermodynamics, k_on = 1e5, one-second windows, twin at half amplitude.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the thermodynamic parameters.
    pub fn with_thermo(mut self, thermo: ThermoParameters) -> Self {
        self.thermo = thermo;
        self
    }

    /// Replace the Hill exponent.
    pub fn with_hill_coefficient(mut self, hill_coefficient: f64) -> Self {
        self.hill_coefficient = hill_coefficient;
        self
    }

    /// Replace the twin construction.
    pub fn with_twin(mut self, twin: TwinTrajectory) -> Self {
        self.twin = twin;
        self
    }

    /// Replace the window length and sample count.
    pub fn with_window(mut self, window: f64, samples: usize) -> Self {
        self.window = window;
        self.samples = samples;
        self
    }

    /// Replace the window placement.
    pub fn with_anchor(mut self, anchor: WindowAnchor) -> Self {
        self.anchor = anchor;
        self
    }

    /// Replace the information estimator.
    pub fn with_estimator(mut self, estimator: InformationEstimator) -> Self {
        self.estimator = estimator;
        self
    }

    /// Replace the activation thresholds.
    pub fn with_rule(mut self, rule: ActivationRule) -> Self {
        self.rule = rule;
        self
    }

    /// Replace the solver tolerances.
    pub fn with_tolerances(mut self, tolerances: Tolerances) -> Self {
        self.integrator.tolerances = tolerances;
        self
    }

    /// Check every field before any integration.
    pub fn validate(&self) -> Result<()> {
        ensure_finite("on_rate", self.on_rate)?;
        if self.on_rate < 0.0 {
            return Err(Error::invalid("on_rate", format!("must be >= 0, got {}", self.on_rate)));
        }
        self.thermo.validate()?;
        ensure_positive("hill_coefficient", self.hill_coefficient)?;
        ensure_positive("window", self.window)?;
        if self.samples < 2 {
            return Err(Error::invalid("samples", format!("must be >= 2, got {}", self.samples)));
        }
        match self.anchor {
            WindowAnchor::Fixed(start) => ensure_finite("anchor", start)?,
            WindowAnchor::EvaluationTime => {}
        }
        match self.twin {
            TwinTrajectory::Perturbed { fraction } => ensure_finite("fraction", fraction)?,
            TwinTrajectory::AlternateThermo(ref thermo) => thermo.validate()?,
        }
        self.rule.validate()?;
        self.integrator.tolerances.validate()
    }

    /// Evaluation grid for time `t`.
    pub fn window_grid(&self, t: f64) -> Vec<f64> {
        let start = match self.anchor {
            WindowAnchor::EvaluationTime => t,
            WindowAnchor::Fixed(start) => start,
        };
        linspace(start, start + self.window, self.samples)
    }

    /// Evaluate at time `t` with driving amplitude `amplitude`.
    pub fn evaluate(&self, t: f64, amplitude: f64) -> Result<GateReading> {
        self.validate()?;
        ensure_finite("time", t)?;
        let grid = self.window_grid(t);
        self.reduce(t, amplitude, &grid)
    }

    /// Evaluate one amplitude over a caller-supplied grid instead of a window.
    pub fn evaluate_over(&self, grid: &[f64], amplitude: f64) -> Result<GateReading> {
        self.validate()?;
        let t = grid.first().copied().unwrap_or(0.0);
        self.reduce(t, amplitude, grid)
    }

    /// Compare two amplitudes driven in parallel windows at time `t`.
    ///
    /// The occupancy condition becomes |θ̄_A − θ̄_B| > `difference_threshold`.
    pub fn compare(
        &self,
        t: f64,
        first_amplitude: f64,
        second_amplitude: f64,
        difference_threshold: f64,
    ) -> Result<ComparatorReading> {
        self.validate()?;
        ensure_finite("time", t)?;
        ensure_finite("difference_threshold", difference_threshold)?;
        let grid = self.window_grid(t);
        let first = self.baseline(first_amplitude, &grid)?;
        let second = self.baseline(second_amplitude, &grid)?;
        let first_occupancy = window_mean(&first)?;
        let second_occupancy = window_mean(&second)?;
        let mutual_information = self.information(first.occupancy(), second.occupancy())?;
        let free_energy = self.thermo.free_energy(0.5 * (first_occupancy + second_occupancy));
        let mut reading = ComparatorReading {
            time: t,
            first_occupancy,
            second_occupancy,
            mutual_information,
            free_energy,
            active: false,
        };
        let rule = self.rule.with_occupancy_threshold(difference_threshold);
        reading.active = rule.is_active(&reading.metrics(), self.thermo.temperature);
        Ok(reading)
    }

    fn reduce(&self, t: f64, amplitude: f64, grid: &[f64]) -> Result<GateReading> {
        let baseline = self.baseline(amplitude, grid)?;
        let twin = self.twin_trajectory(amplitude, grid)?;
        let mean_occupancy = window_mean(&baseline)?;
        let mutual_information = self.information(baseline.occupancy(), twin.occupancy())?;
        let free_energy = self.thermo.free_energy(mean_occupancy);
        let mut reading = GateReading {
            time: t,
            amplitude,
            mean_occupancy,
            mutual_information,
            free_energy,
            active: false,
        };
        reading.active = self.rule.is_active(&reading.metrics(), self.thermo.temperature);
        Ok(reading)
    }

    fn kinetics(&self, amplitude: f64) -> KineticParameters {
        KineticParameters::new(self.on_rate, amplitude).with_hill_coefficient(self.hill_coefficient)
    }

    fn baseline(&self, amplitude: f64, grid: &[f64]) -> Result<Trajectory> {
        self.integrator
            .integrate_thermo(&self.kinetics(amplitude), &self.thermo, grid)
    }

    fn twin_trajectory(&self, amplitude: f64, grid: &[f64]) -> Result<Trajectory> {
        match self.twin {
            TwinTrajectory::Perturbed { fraction } => self
                .integrator
                .integrate_thermo(&self.kinetics(amplitude * (1.0 - fraction)), &self.thermo, grid),
            TwinTrajectory::AlternateThermo(ref thermo) => {
                self.integrator.integrate_thermo(&self.kinetics(amplitude), thermo, grid)
            }
        }
    }

    fn information(&self, a: &[f64], b: &[f64]) -> Result<Option<f64>> {
        match self.estimator.estimate(a, b) {
            Ok(value) => Ok(Some(value)),
            Err(Error::IndeterminateInformation(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

fn window_mean(trajectory: &Trajectory) -> Result<f64> {
    mean(trajectory.occupancy()).ok_or_else(|| Error::InvalidTimeGrid("empty evaluation window".into()))
}
