/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Binding kinetics: the saturating Hill curve, the occupancy rate law and
//! the ligand drivers that feed the integrator.
//!
//! - [`equilibrium_occupancy`]: θ = Lⁿ / (Kdⁿ + Lⁿ).
//! - [`occupancy_rate`]: dθ/dt = k_on·L·(1−θ) − k_off·θ.
//! - [`FeedbackLigand`]: base·(1 + A·sin(2πt/P)·θ(1−θ)), an occupancy-modulated
//!   ligand signal built by [`time_varying_ligand`].
//! - [`KineticParameters`]: validated rate constants for one binding site.
//! - [`equilibrium_profile`] / [`steepest_binding_point`]: static scans of the
//!   Hill curve over a ligand grid.

use core::f64::consts::PI;

use crate::error::{ensure_finite, ensure_non_negative, ensure_positive, Error, Result};
use crate::numeric::gradient_at;
use crate::thermo::ThermoParameters;

/// Period used by the feedback ligand when none is given.
pub const DEFAULT_FEEDBACK_PERIOD: f64 = 100.0;

/// Physiological pH around which rate constants are modulated.
pub const NEUTRAL_PH: f64 = 7.4;

// ─── Pure rate laws ──────────────────────────────────────────────────────────

/// Equilibrium occupancy Lⁿ / (Kdⁿ + Lⁿ).
///
/// Monotonically non-decreasing in `ligand` and bounded in [0, 1) for
/// L ≥ 0, n > 0, Kd > 0. With Kd = 0 and L = 0 the ratio is 0/0 and the
/// result is NaN; use [`try_equilibrium_occupancy`] to reject such inputs.
pub fn equilibrium_occupancy(ligand: f64, hill_coefficient: f64, dissociation_constant: f64) -> f64 {
    let ln = ligand.powf(hill_coefficient);
    ln / (dissociation_constant.powf(hill_coefficient) + ln)
}

/// Checked [`equilibrium_occupancy`].
pub fn try_equilibrium_occupancy(
    ligand: f64,
    hill_coefficient: f64,
    dissociation_constant: f64,
) -> Result<f64> {
    ensure_non_negative("ligand", ligand)?;
    ensure_positive("hill_coefficient", hill_coefficient)?;
    ensure_positive("dissociation_constant", dissociation_constant)?;
    Ok(equilibrium_occupancy(ligand, hill_coefficient, dissociation_constant))
}

/// Instantaneous occupancy rate k_on·L·(1−θ) − k_off·θ.
#[inline]
pub fn occupancy_rate(theta: f64, ligand: f64, on_rate: f64, off_rate: f64) -> f64 {
    on_rate * ligand * (1.0 - theta) - off_rate * theta
}

/// Rate constants scaled by the distance from neutral pH:
/// k_on·(1 − 0.1·Δ²) and k_off·(1 + 0.1·Δ²) with Δ = pH − 7.4.
pub fn ph_modulated_rates(on_rate: f64, off_rate: f64, ph: f64) -> (f64, f64) {
    let shift = 0.1 * (ph - NEUTRAL_PH).powi(2);
    (on_rate * (1.0 - shift), off_rate * (1.0 + shift))
}

// ─── Feedback ligand ─────────────────────────────────────────────────────────

/// Ligand signal whose oscillation is gated by the current occupancy.
///
/// `at(t, θ) = base·(1 + amplitude·sin(2πt/period)·θ(1−θ))`. The θ(1−θ) factor
/// vanishes at empty and saturated sites, so the oscillation only reaches a
/// partially occupied site.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FeedbackLigand {
    /// Baseline ligand level.
    pub base: f64,
    /// Relative oscillation depth.
    pub amplitude: f64,
    /// Oscillation period in time units. Must be > 0.
    pub period: f64,
}

impl FeedbackLigand {
    /// Effective ligand at time `t` for occupancy `theta`.
    #[inline]
    pub fn at(&self, t: f64, theta: f64) -> f64 {
        let feedback = theta * (1.0 - theta);
        self.base * (1.0 + self.amplitude * (2.0 * PI * t / self.period).sin() * feedback)
    }

    /// Check that every field is finite and the period is positive.
    pub fn validate(&self) -> Result<()> {
        ensure_finite("base", self.base)?;
        ensure_finite("amplitude", self.amplitude)?;
        ensure_positive("period", self.period)
    }
}

/// Build the occupancy-modulated ligand signal.
pub fn time_varying_ligand(base: f64, amplitude: f64, period: f64) -> FeedbackLigand {
    FeedbackLigand {
        base,
        amplitude,
        period,
    }
}

/// Mapping from a raw ligand reading to the concentration seen by the rate law.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LigandTransform {
    /// Use the reading unchanged.
    #[default]
    Identity,
    /// Partial pressure in mmHg converted to a fraction of one atmosphere (L/760).
    IronScaled,
    /// Reading is a p-value (pH, pCa): concentration 10^(−L).
    NegLog10,
}

impl LigandTransform {
    /// Apply the transform.
    #[inline]
    pub fn apply(self, ligand: f64) -> f64 {
        match self {
            LigandTransform::Identity => ligand,
            LigandTransform::IronScaled => ligand / 760.0,
            LigandTransform::NegLog10 => 10f64.powf(-ligand),
        }
    }
}

// ─── KineticParameters ───────────────────────────────────────────────────────

/// Rate constants and drive amplitude of one binding site.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct KineticParameters {
    /// k_on. Zero disables binding.
    pub on_rate: f64,
    /// k_off. When absent it is derived as k_on·Kd.
    pub off_rate: Option<f64>,
    /// Hill coefficient n. Must be > 0.
    pub hill_coefficient: f64,
    /// Amplitude of the ligand drive.
    pub amplitude: f64,
    /// Kd. When absent it is derived from thermodynamics.
    pub dissociation_constant: Option<f64>,
}

impl KineticParameters {
    /// Site with the given on-rate and drive amplitude, Hill coefficient 1 and
    /// both off-rate and Kd left to be derived.
    pub fn new(on_rate: f64, amplitude: f64) -> Self {
        Self {
            on_rate,
            off_rate: None,
            hill_coefficient: 1.0,
            amplitude,
            dissociation_constant: None,
        }
    }

    /// Set an explicit off-rate.
    pub fn with_off_rate(mut self, off_rate: f64) -> Self {
        self.off_rate = Some(off_rate);
        self
    }

    /// Set the Hill coefficient.
    pub fn with_hill_coefficient(mut self, hill_coefficient: f64) -> Self {
        self.hill_coefficient = hill_coefficient;
        self
    }

    /// Set an explicit dissociation constant.
    pub fn with_dissociation_constant(mut self, dissociation_constant: f64) -> Self {
        self.dissociation_constant = Some(dissociation_constant);
        self
    }

    /// Same site driven at a different amplitude.
    pub fn with_amplitude(mut self, amplitude: f64) -> Self {
        self.amplitude = amplitude;
        self
    }

    /// Validate every supplied field.
    ///
    /// `on_rate` may be zero; a supplied `off_rate` or Kd must be strictly
    /// positive.
    pub fn validate(&self) -> Result<()> {
        ensure_non_negative("on_rate", self.on_rate)?;
        if let Some(off_rate) = self.off_rate {
            ensure_positive("off_rate", off_rate)?;
        }
        ensure_positive("hill_coefficient", self.hill_coefficient)?;
        ensure_finite("amplitude", self.amplitude)?;
        if let Some(kd) = self.dissociation_constant {
            ensure_positive("dissociation_constant", kd)?;
        }
        Ok(())
    }

    /// The explicit off-rate, or k_on·Kd when only Kd is known.
    pub fn resolved_off_rate(&self) -> Result<f64> {
        match (self.off_rate, self.dissociation_constant) {
            (Some(off_rate), _) => Ok(off_rate),
            (None, Some(kd)) => Ok(self.on_rate * kd),
            (None, None) => Err(Error::invalid(
                "off_rate",
                "neither an off-rate nor a dissociation constant was supplied",
            )),
        }
    }
}

// ─── Ion presets ─────────────────────────────────────────────────────────────

/// Kinetic and thermodynamic constants of a metal or proton binding site.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IonProfile {
    /// Hill coefficient.
    pub hill_coefficient: f64,
    /// Dissociation constant.
    pub dissociation_constant: f64,
    /// k_on at neutral pH.
    pub on_rate: f64,
    /// k_off at neutral pH.
    pub off_rate: f64,
    /// ΔH in kJ/mol.
    pub enthalpy: f64,
    /// ΔS in kJ/(mol·K).
    pub entropy: f64,
    /// How a raw ligand reading maps to concentration.
    pub transform: LigandTransform,
}

impl IonProfile {
    /// Fe²⁺ (ligand given as partial pressure in mmHg).
    pub fn ferrous() -> Self {
        Self {
            hill_coefficient: 2.0,
            dissociation_constant: 26.0,
            on_rate: 2e6,
            off_rate: 5e3,
            enthalpy: -65.0,
            entropy: -0.2,
            transform: LigandTransform::IronScaled,
        }
    }

    /// Ca²⁺ (ligand given as pCa).
    pub fn calcium() -> Self {
        Self {
            hill_coefficient: 2.0,
            dissociation_constant: 3e-6,
            on_rate: 2e7,
            off_rate: 5e2,
            enthalpy: -30.0,
            entropy: -0.1,
            transform: LigandTransform::NegLog10,
        }
    }

    /// H⁺ (ligand given as pH).
    pub fn proton() -> Self {
        Self {
            hill_coefficient: 1.5,
            dissociation_constant: 1e-7,
            on_rate: 1e8,
            off_rate: 1e4,
            enthalpy: -20.0,
            entropy: -0.05,
            transform: LigandTransform::NegLog10,
        }
    }

    /// Kinetic parameters of this ion at the given pH and drive amplitude.
    pub fn kinetics_at_ph(&self, ph: f64, amplitude: f64) -> KineticParameters {
        let (on_rate, off_rate) = ph_modulated_rates(self.on_rate, self.off_rate, ph);
        KineticParameters {
            on_rate,
            off_rate: Some(off_rate),
            hill_coefficient: self.hill_coefficient,
            amplitude,
            dissociation_constant: Some(self.dissociation_constant),
        }
    }

    /// Thermodynamic parameters of this ion at `temperature`.
    pub fn thermo(&self, temperature: f64) -> ThermoParameters {
        ThermoParameters {
            enthalpy: self.enthalpy,
            entropy: self.entropy,
            temperature,
        }
    }
}

// ─── Static scans ────────────────────────────────────────────────────────────

/// One point of a static equilibrium scan.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProfilePoint {
    /// Ligand level.
    pub ligand: f64,
    /// Equilibrium occupancy at that level.
    pub occupancy: f64,
    /// ΔG at that occupancy.
    pub free_energy: f64,
}

/// Equilibrium occupancy and free energy for every ligand level.
pub fn equilibrium_profile(
    ligands: &[f64],
    hill_coefficient: f64,
    dissociation_constant: f64,
    thermo: &ThermoParameters,
) -> Result<Vec<ProfilePoint>> {
    thermo.validate()?;
    ligands
        .iter()
        .map(|&ligand| {
            let occupancy = try_equilibrium_occupancy(ligand, hill_coefficient, dissociation_constant)?;
            Ok(ProfilePoint {
                ligand,
                occupancy,
                free_energy: thermo.free_energy(occupancy),
            })
        })
        .collect()
}

/// The ligand level where dθ/dL is largest on a strictly increasing grid,
/// with the occupancy and free energy there.
///
/// Ties resolve to the lowest ligand level.
pub fn steepest_binding_point(
    ligands: &[f64],
    hill_coefficient: f64,
    dissociation_constant: f64,
    thermo: &ThermoParameters,
) -> Result<ProfilePoint> {
    let profile = equilibrium_profile(ligands, hill_coefficient, dissociation_constant, thermo)?;
    let occupancy: Vec<f64> = profile.iter().map(|p| p.occupancy).collect();
    let slope = gradient_at(&occupancy, ligands)?;
    let mut best = 0;
    for (i, &s) in slope.iter().enumerate() {
        if s > slope[best] {
            best = i;
        }
    }
    Ok(profile[best])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numeric::linspace;

    #[test]
    fn test_equilibrium_occupancy_half_saturation_at_kd() {
        let theta = equilibrium_occupancy(2.0, 1.7, 2.0);
        assert!((theta - 0.5).abs() < 1e-12, "got {}", theta);
    }

    #[test]
    fn test_equilibrium_occupancy_monotone_and_bounded() {
        for &n in &[0.5, 1.0, 2.5] {
            let mut prev = -1.0;
            for ligand in linspace(0.0, 50.0, 200) {
                let theta = equilibrium_occupancy(ligand, n, 3.0);
                assert!((0.0..1.0).contains(&theta), "n={} L={} θ={}", n, ligand, theta);
                assert!(theta >= prev, "not monotone at L={}", ligand);
                prev = theta;
            }
        }
    }

    #[test]
    fn test_equilibrium_occupancy_degenerate_is_nan() {
        assert!(equilibrium_occupancy(0.0, 1.0, 0.0).is_nan());
        assert!(try_equilibrium_occupancy(0.0, 1.0, 0.0).is_err());
    }

    #[test]
    fn test_occupancy_rate() {
        // At equilibrium for L = 2, k_on = 3, k_off = 6: θ* = 6/(6+6) = 0.5.
        assert!(occupancy_rate(0.5, 2.0, 3.0, 6.0).abs() < 1e-12);
        assert_eq!(occupancy_rate(0.0, 2.0, 3.0, 6.0), 6.0);
    }

    #[test]
    fn test_feedback_ligand_vanishes_at_empty_and_full_sites() {
        let lig = time_varying_ligand(6.0, 1.0, DEFAULT_FEEDBACK_PERIOD);
        assert_eq!(lig.at(25.0, 0.0), 6.0);
        assert_eq!(lig.at(25.0, 1.0), 6.0);
        // sin(π/2) = 1 and θ(1−θ) = 0.25 at θ = 0.5.
        assert!((lig.at(25.0, 0.5) - 7.5).abs() < 1e-12);
    }

    #[test]
    fn test_ligand_transforms() {
        assert_eq!(LigandTransform::Identity.apply(3.0), 3.0);
        assert!((LigandTransform::IronScaled.apply(76.0) - 0.1).abs() < 1e-15);
        assert!((LigandTransform::NegLog10.apply(3.0) - 1e-3).abs() < 1e-15);
    }

    #[test]
    fn test_ph_modulation_is_symmetric_and_neutral_at_7_4() {
        assert_eq!(ph_modulated_rates(1e5, 10.0, NEUTRAL_PH), (1e5, 10.0));
        let (on_lo, off_lo) = ph_modulated_rates(1e5, 10.0, 6.4);
        let (on_hi, off_hi) = ph_modulated_rates(1e5, 10.0, 8.4);
        assert!((on_lo - 0.9e5).abs() < 1e-6 && (on_hi - on_lo).abs() < 1e-6);
        assert!((off_lo - 11.0).abs() < 1e-12 && (off_hi - off_lo).abs() < 1e-12);
    }

    #[test]
    fn test_kinetic_validation() {
        assert!(KineticParameters::new(0.0, 0.5).validate().is_ok());
        assert!(KineticParameters::new(-1.0, 0.5).validate().is_err());
        assert!(KineticParameters::new(1e5, 0.5).with_hill_coefficient(0.0).validate().is_err());
        assert!(KineticParameters::new(1e5, 0.5).with_off_rate(0.0).validate().is_err());
        assert!(KineticParameters::new(1e5, f64::INFINITY).validate().is_err());
    }

    #[test]
    fn test_off_rate_derived_from_kd() {
        let k = KineticParameters::new(1e5, 0.5).with_dissociation_constant(0.2);
        assert_eq!(k.resolved_off_rate().unwrap(), 2e4);
        assert!(KineticParameters::new(1e5, 0.5).resolved_off_rate().is_err());
    }

    #[test]
    fn test_steepest_binding_point_location() {
        // For n = 1 the slope is largest at L = 0; for n = 2 it peaks at Kd/√3.
        let ligands = linspace(0.0, 50.0, 501);
        let thermo = ThermoParameters::reference();
        let p1 = steepest_binding_point(&ligands, 1.0, 10.0, &thermo).unwrap();
        assert_eq!(p1.ligand, 0.0);
        let p2 = steepest_binding_point(&ligands, 2.0, 10.0, &thermo).unwrap();
        assert!((p2.ligand - 10.0 / 3f64.sqrt()).abs() < 0.2, "got {}", p2.ligand);
        assert!((p2.free_energy - thermo.free_energy(p2.occupancy)).abs() < 1e-12);
    }

    #[test]
    fn test_ion_profile_kinetics() {
        let fe = IonProfile::ferrous().kinetics_at_ph(NEUTRAL_PH, 1.0);
        assert!(fe.validate().is_ok());
        assert_eq!(fe.off_rate, Some(5e3));
        assert_eq!(IonProfile::calcium().transform, LigandTransform::NegLog10);
    }
}
