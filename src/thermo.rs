/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Thermodynamic favorability of the bound state.
//!
//! - [`free_energy`]: ΔG = ΔH − T·ΔS·θ, evaluated at an occupancy (usually the
//!   mean occupancy of a trajectory).
//! - [`composite_potential`]: Ψ = ΔG − T·I, combining free energy with an
//!   information value.
//! - [`dissociation_constant`]: Kd = exp(ΔG/(R·T)) with the exponent clamped so
//!   the result is always finite.
//!
//! Units follow the caller. The reference parameter set ([`ThermoParameters::reference`])
//! is expressed in kJ/mol and kJ/(mol·K) while [`GAS_CONSTANT`] is in J/(mol·K);
//! the classifier's RT·ln2 bound converts with [`EnergyUnit`].

use tracing::warn;

use crate::error::{ensure_finite, ensure_positive, Result};

/// Gas constant R in J/(mol·K).
pub const GAS_CONSTANT: f64 = 8.314;

/// Largest magnitude allowed for ΔG/(R·T) before exponentiation.
///
/// `exp(700)` ≈ 1e304, still representable as a finite `f64`.
pub const MAX_DISSOCIATION_EXPONENT: f64 = 700.0;

// ─── Units ───────────────────────────────────────────────────────────────────

/// Energy unit in which ΔH (and therefore ΔG) is expressed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EnergyUnit {
    /// J/mol.
    Joules,
    /// kJ/mol. R·T is divided by 1000.
    Kilojoules,
}

impl EnergyUnit {
    /// R·T expressed in this unit.
    pub fn rt(self, temperature: f64) -> f64 {
        match self {
            EnergyUnit::Joules => GAS_CONSTANT * temperature,
            EnergyUnit::Kilojoules => GAS_CONSTANT * temperature / 1000.0,
        }
    }

    /// R·T·ln 2 expressed in this unit: the free energy of one bit at `temperature`.
    pub fn rt_ln2(self, temperature: f64) -> f64 {
        self.rt(temperature) * core::f64::consts::LN_2
    }
}

// ─── Pure functions ──────────────────────────────────────────────────────────

/// Free energy at occupancy `theta`: ΔH − T·ΔS·θ.
///
/// Linear in ΔH and in T·ΔS·θ; at θ = 0 it is exactly ΔH.
pub fn free_energy(theta: f64, enthalpy: f64, entropy: f64, temperature: f64) -> f64 {
    enthalpy - temperature * entropy * theta
}

/// Composite potential Ψ = ΔG − T·I.
pub fn composite_potential(free_energy: f64, temperature: f64, information: f64) -> f64 {
    free_energy - temperature * information
}

/// Dissociation constant exp(ΔG/(R·T)), with `R` = [`GAS_CONSTANT`].
///
/// The exponent is clamped to ±[`MAX_DISSOCIATION_EXPONENT`]: an extreme ΔG
/// yields a very large (or very small) but finite Kd, never infinity.
pub fn dissociation_constant(free_energy: f64, temperature: f64) -> f64 {
    let exponent = free_energy / (GAS_CONSTANT * temperature);
    let clamped = exponent.clamp(-MAX_DISSOCIATION_EXPONENT, MAX_DISSOCIATION_EXPONENT);
    if clamped != exponent {
        warn!(exponent, clamped, "dissociation constant exponent clamped");
    }
    clamped.exp()
}

// ─── ThermoParameters ────────────────────────────────────────────────────────

/// Enthalpy, entropy and absolute temperature of one binding site.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ThermoParameters {
    /// ΔH, energy per mole.
    pub enthalpy: f64,
    /// ΔS, energy per mole per kelvin (same energy unit as `enthalpy`).
    pub entropy: f64,
    /// Absolute temperature in kelvin. Must be > 0.
    pub temperature: f64,
}

impl ThermoParameters {
    /// Construct and validate.
    pub fn new(enthalpy: f64, entropy: f64, temperature: f64) -> Result<Self> {
        let params = Self {
            enthalpy,
            entropy,
            temperature,
        };
        params.validate()?;
        Ok(params)
    }

    /// The reference binding site used throughout the gate catalogue:
    /// ΔH = −46.84 kJ/mol, ΔS = −0.102 kJ/(mol·K), T = 300 K.
    pub fn reference() -> Self {
        Self {
            enthalpy: -46.84,
            entropy: -0.102,
            temperature: 300.0,
        }
    }

    /// Check that ΔH and ΔS are finite and T is finite and positive.
    pub fn validate(&self) -> Result<()> {
        ensure_finite("enthalpy", self.enthalpy)?;
        ensure_finite("entropy", self.entropy)?;
        ensure_positive("temperature", self.temperature)
    }

    /// Same site at a different temperature.
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    /// ΔG = ΔH − T·ΔS·θ at occupancy `theta`.
    pub fn free_energy(&self, theta: f64) -> f64 {
        free_energy(theta, self.enthalpy, self.entropy, self.temperature)
    }

    /// Occupancy-independent ΔH − T·ΔS, used to derive a constant Kd for an
    /// integration run.
    pub fn binding_free_energy(&self) -> f64 {
        self.enthalpy - self.temperature * self.entropy
    }

    /// Kd derived from [`binding_free_energy`](Self::binding_free_energy).
    pub fn dissociation_constant(&self) -> f64 {
        dissociation_constant(self.binding_free_energy(), self.temperature)
    }
}

impl Default for ThermoParameters {
    fn default() -> Self {
        Self::reference()
    }
}
