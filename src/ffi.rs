//! Python FFI bindings via PyO3.
//!
//! Exposes the scalar models, the thermo-derived integration mode and the
//! active-phase classifier. Gate networks and the continuous-signal family are
//! available from the Rust API only.
//!
//! # Building the Python extension
//!
//! ```bash
//! pip install maturin
//! maturin develop --features python-ffi
//! ```
//!
//! # Usage
//!
//! ```python
//! from bfip_core import ActivationLatch, integrate_thermo, mutual_information, free_energy
//!
//! times = [i * 120.0 / 299 for i in range(300)]
//! theta = integrate_thermo(1e5, 0.5, -46.84, -0.102, 300.0, times)
//! twin = integrate_thermo(1e5, 0.25, -46.84, -0.102, 300.0, times)
//! mean = sum(theta) / len(theta)
//!
//! latch = ActivationLatch()
//! print(latch.step(mean, mutual_information(theta, twin), free_energy(mean, -46.84, -0.102, 300.0)))
//! ```

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use crate::dynamics::DynamicsIntegrator;
use crate::error::Error;
use crate::information::{self, LogBase, DEFAULT_BINS};
use crate::kinetics::{self, KineticParameters};
use crate::phase::{self, ActivationLatch as RustActivationLatch, ActivationRule, FreeEnergyBound, PhaseMetrics};
use crate::thermo::{self, EnergyUnit, ThermoParameters};

fn to_py_err(e: Error) -> PyErr {
    PyValueError::new_err(e.to_string())
}

// ── Scalar models ────────────────────────────────────────────────────────────

/// Equilibrium occupancy Lⁿ / (Kdⁿ + Lⁿ).
#[pyfunction]
#[pyo3(signature = (ligand, hill_coefficient, dissociation_constant))]
pub fn equilibrium_occupancy(ligand: f64, hill_coefficient: f64, dissociation_constant: f64) -> PyResult<f64> {
    kinetics::try_equilibrium_occupancy(ligand, hill_coefficient, dissociation_constant).map_err(to_py_err)
}

/// Free energy ΔH − T·ΔS·θ.
#[pyfunction]
pub fn free_energy(theta: f64, enthalpy: f64, entropy: f64, temperature: f64) -> f64 {
    thermo::free_energy(theta, enthalpy, entropy, temperature)
}

/// Composite potential ΔG − T·I.
#[pyfunction]
pub fn composite_potential(free_energy: f64, temperature: f64, information: f64) -> f64 {
    thermo::composite_potential(free_energy, temperature, information)
}

/// Joint-histogram mutual information between two equal-length samples.
///
/// Args:
///     a, b:  samples
///     bins:  bins per axis (default 30)
///     bits:  report in bits instead of nats
///
/// Raises ValueError for empty, constant or unequal-length samples.
#[pyfunction]
#[pyo3(signature = (a, b, bins=DEFAULT_BINS, bits=false))]
pub fn mutual_information(a: Vec<f64>, b: Vec<f64>, bins: usize, bits: bool) -> PyResult<f64> {
    let base = if bits { LogBase::Two } else { LogBase::Natural };
    information::mutual_information_continuous(&a, &b, bins, base).map_err(to_py_err)
}

// ── Integration ──────────────────────────────────────────────────────────────

/// Thermo-derived occupancy trajectory from an empty site.
///
/// Args:
///     on_rate:          k_on
///     amplitude:        ligand amplitude A in A·sin(0.1t) + A
///     enthalpy:         ΔH in kJ/mol
///     entropy:          ΔS in kJ/(mol·K)
///     temperature:      T in kelvin
///     times:            ascending sample times
///     hill_coefficient: ligand exponent (default 1)
///
/// Returns:
///     Occupancy at each sample time.
#[pyfunction]
#[pyo3(signature = (on_rate, amplitude, enthalpy, entropy, temperature, times, hill_coefficient=1.0))]
pub fn integrate_thermo(
    on_rate: f64,
    amplitude: f64,
    enthalpy: f64,
    entropy: f64,
    temperature: f64,
    times: Vec<f64>,
    hill_coefficient: f64,
) -> PyResult<Vec<f64>> {
    let thermo = ThermoParameters::new(enthalpy, entropy, temperature).map_err(to_py_err)?;
    let kinetics = KineticParameters::new(on_rate, amplitude).with_hill_coefficient(hill_coefficient);
    DynamicsIntegrator::new()
        .integrate_thermo(&kinetics, &thermo, &times)
        .map(|trajectory| trajectory.occupancy().to_vec())
        .map_err(to_py_err)
}

// ── Classifier ───────────────────────────────────────────────────────────────

/// Memoryless three-condition test with ΔG in kJ/mol.
#[pyfunction]
#[pyo3(signature = (mean_occupancy, mutual_information, free_energy, temperature, occupancy_threshold=0.10, information_threshold=2.2, multiplier=1.0))]
#[allow(clippy::too_many_arguments)]
pub fn classify(
    mean_occupancy: f64,
    mutual_information: f64,
    free_energy: f64,
    temperature: f64,
    occupancy_threshold: f64,
    information_threshold: f64,
    multiplier: f64,
) -> bool {
    phase::classify(
        mean_occupancy,
        mutual_information,
        free_energy,
        temperature,
        occupancy_threshold,
        information_threshold,
        multiplier,
    )
}

/// Latching active-phase classifier.
///
/// Enters the active phase when occupancy, information and free energy all
/// pass; stays active while occupancy and free energy pass.
///
/// ```python
/// latch = ActivationLatch(information_threshold=0.5)
/// latch.step(0.3, 0.69, -40.0)   # True
/// latch.step(0.3, None, -40.0)   # True, information no longer needed
/// latch.step(0.05, None, -40.0)  # False
/// ```
#[pyclass(name = "ActivationLatch")]
pub struct PyActivationLatch {
    inner: RustActivationLatch,
}

#[pymethods]
impl PyActivationLatch {
    /// Create an inactive latch.
    ///
    /// Args:
    ///     occupancy_threshold:   θ̄ must exceed this (default 0.10)
    ///     information_threshold: MI must exceed this, in nats (default 2.2)
    ///     multiplier:            ΔG must be below −multiplier·R·T·ln2 in kJ/mol (default 1)
    ///     temperature:           T in kelvin (default 300)
    #[new]
    #[pyo3(signature = (occupancy_threshold=0.10, information_threshold=2.2, multiplier=1.0, temperature=300.0))]
    pub fn new(
        occupancy_threshold: f64,
        information_threshold: f64,
        multiplier: f64,
        temperature: f64,
    ) -> PyResult<Self> {
        let rule = ActivationRule::dynamic_model()
            .with_occupancy_threshold(occupancy_threshold)
            .with_information_threshold(information_threshold)
            .with_free_energy_bound(FreeEnergyBound::RtLn2 {
                multiplier,
                unit: EnergyUnit::Kilojoules,
            });
        let inner = RustActivationLatch::new(rule, temperature).map_err(to_py_err)?;
        Ok(Self { inner })
    }

    /// Advance one step; `mutual_information=None` always fails that condition.
    ///
    /// Returns:
    ///     True when active after this step.
    #[pyo3(signature = (occupancy, mutual_information, free_energy))]
    pub fn step(&mut self, occupancy: f64, mutual_information: Option<f64>, free_energy: f64) -> bool {
        self.inner
            .step(PhaseMetrics {
                occupancy,
                mutual_information,
                free_energy,
            })
            .active
    }

    /// True while latched.
    #[getter]
    pub fn active(&self) -> bool {
        self.inner.phase().is_active()
    }

    /// Return to inactive.
    pub fn reset(&mut self) {
        self.inner.reset();
    }

    /// Python repr string.
    pub fn __repr__(&self) -> String {
        format!("ActivationLatch(active={})", self.active())
    }
}

// ── Module entry point ────────────────────────────────────────────────────────

/// BFIP Python bindings: binding dynamics, free energy, information and the
/// active-phase classifier.
#[pymodule]
pub fn bfip_core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(equilibrium_occupancy, m)?)?;
    m.add_function(wrap_pyfunction!(free_energy, m)?)?;
    m.add_function(wrap_pyfunction!(composite_potential, m)?)?;
    m.add_function(wrap_pyfunction!(mutual_information, m)?)?;
    m.add_function(wrap_pyfunction!(integrate_thermo, m)?)?;
    m.add_function(wrap_pyfunction!(classify, m)?)?;
    m.add_class::<PyActivationLatch>()?;
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;
    m.add("GAS_CONSTANT", thermo::GAS_CONSTANT)?;
    Ok(())
}
