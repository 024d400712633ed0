/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Active-phase classification.
//!
//! - [`ActivationRule`]: the three thresholds (occupancy, information, free
//!   energy) and the latch release policy.
//! - [`ActivationPhase`]: two-state classifier with latching hysteresis.
//! - [`ActivationLatch`]: state-machine object owning the previous phase.
//! - [`classify`] / [`classify_with_memory`]: plain-scalar entry points.
//!
//! # Transitions
//!
//! ```text
//!              all three conditions
//!   INACTIVE ────────────────────────▶ ACTIVE ──┐ occupancy ∧ free energy
//!      ▲                                  │     │ (information not needed)
//!      └──────────────────────────────────┘ ◀───┘
//!                 otherwise
//! ```
//!
//! All comparisons are strict: a value equal to its threshold fails that
//! condition.

use tracing::debug;

use crate::error::{ensure_finite, ensure_positive, Result};
use crate::thermo::EnergyUnit;

/// Occupancy threshold of the dynamic-model call sites.
pub const DEFAULT_OCCUPANCY_THRESHOLD: f64 = 0.10;

/// Information threshold of the dynamic-model call sites, in nats.
pub const DEFAULT_INFORMATION_THRESHOLD: f64 = 2.2;

/// Occupancy threshold of the continuous-signal call sites.
pub const SIGNAL_OCCUPANCY_THRESHOLD: f64 = 0.15;

/// Correlation-proxy threshold of the continuous-signal call sites.
pub const SIGNAL_INFORMATION_THRESHOLD: f64 = 0.005;

// ─── Rule ────────────────────────────────────────────────────────────────────

/// Upper bound that ΔG must stay strictly below.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FreeEnergyBound {
    /// ΔG < −multiplier·R·T·ln 2, with R·T expressed in `unit`.
    RtLn2 {
        /// Number of bits of free energy required.
        multiplier: f64,
        /// Unit of ΔG (and therefore of R·T).
        unit: EnergyUnit,
    },
    /// ΔG < the given value.
    Absolute(f64),
    /// No free-energy condition.
    Disabled,
}

impl FreeEnergyBound {
    /// The limit at `temperature`, `None` when disabled.
    pub fn limit(&self, temperature: f64) -> Option<f64> {
        match *self {
            FreeEnergyBound::RtLn2 { multiplier, unit } => Some(-multiplier * unit.rt_ln2(temperature)),
            FreeEnergyBound::Absolute(limit) => Some(limit),
            FreeEnergyBound::Disabled => None,
        }
    }

    /// Whether `free_energy` satisfies the bound.
    pub fn admits(&self, free_energy: f64, temperature: f64) -> bool {
        match self.limit(temperature) {
            Some(limit) => free_energy < limit,
            None => true,
        }
    }
}

/// What keeps an active latch closed once the information condition drops out.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LatchRelease {
    /// Stay active while occupancy and free energy both hold; release as soon
    /// as either fails.
    #[default]
    AnyConditionFails,
    /// Stay active while either occupancy or free energy holds; release only
    /// when both fail in the same step.
    BothConditionsFail,
}

/// Thresholds of the active-phase test.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ActivationRule {
    /// The occupancy statistic must exceed this.
    pub occupancy_threshold: f64,
    /// Mutual information must exceed this (units of the estimator in use).
    pub information_threshold: f64,
    /// ΔG must stay below this bound.
    pub free_energy_bound: FreeEnergyBound,
    /// Hysteresis of the latching variant.
    pub latch_release: LatchRelease,
}

impl ActivationRule {
    /// θ̄ > 0.10, MI > 2.2 nats, ΔG < −R·T·ln2 in kJ/mol.
    pub fn dynamic_model() -> Self {
        Self {
            occupancy_threshold: DEFAULT_OCCUPANCY_THRESHOLD,
            information_threshold: DEFAULT_INFORMATION_THRESHOLD,
            free_energy_bound: FreeEnergyBound::RtLn2 {
                multiplier: 1.0,
                unit: EnergyUnit::Kilojoules,
            },
            latch_release: LatchRelease::default(),
        }
    }

    /// θ̄ > 0.15 and correlation proxy > 0.005, no free-energy condition.
    pub fn continuous_signal() -> Self {
        Self {
            occupancy_threshold: SIGNAL_OCCUPANCY_THRESHOLD,
            information_threshold: SIGNAL_INFORMATION_THRESHOLD,
            free_energy_bound: FreeEnergyBound::Disabled,
            latch_release: LatchRelease::default(),
        }
    }

    /// Replace the occupancy threshold.
    pub fn with_occupancy_threshold(mut self, threshold: f64) -> Self {
        self.occupancy_threshold = threshold;
        self
    }

    /// Replace the information threshold.
    pub fn with_information_threshold(mut self, threshold: f64) -> Self {
        self.information_threshold = threshold;
        self
    }

    /// Replace the free-energy bound.
    pub fn with_free_energy_bound(mut self, bound: FreeEnergyBound) -> Self {
        self.free_energy_bound = bound;
        self
    }

    /// Replace the latch release policy.
    pub fn with_latch_release(mut self, release: LatchRelease) -> Self {
        self.latch_release = release;
        self
    }

    /// Thresholds must be finite; an RT·ln2 multiplier must be finite too.
    pub fn validate(&self) -> Result<()> {
        ensure_finite("occupancy_threshold", self.occupancy_threshold)?;
        ensure_finite("information_threshold", self.information_threshold)?;
        match self.free_energy_bound {
            FreeEnergyBound::RtLn2 { multiplier, .. } => ensure_finite("multiplier", multiplier),
            FreeEnergyBound::Absolute(limit) => ensure_finite("free_energy_limit", limit),
            FreeEnergyBound::Disabled => Ok(()),
        }
    }

    /// Evaluate each condition separately.
    pub fn conditions(&self, metrics: &PhaseMetrics, temperature: f64) -> Conditions {
        Conditions {
            occupancy: metrics.occupancy > self.occupancy_threshold,
            information: metrics
                .mutual_information
                .is_some_and(|mi| mi > self.information_threshold),
            free_energy: self.free_energy_bound.admits(metrics.free_energy, temperature),
        }
    }

    /// Memoryless test: all three conditions hold.
    pub fn is_active(&self, metrics: &PhaseMetrics, temperature: f64) -> bool {
        self.conditions(metrics, temperature).all()
    }
}

impl Default for ActivationRule {
    fn default() -> Self {
        Self::dynamic_model()
    }
}

// ─── Metrics ─────────────────────────────────────────────────────────────────

/// The three scalars the classifier combines.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PhaseMetrics {
    /// Occupancy statistic compared against the occupancy threshold: the mean
    /// occupancy, or for comparators |θ̄_A − θ̄_B|.
    pub occupancy: f64,
    /// Mutual information, `None` when it was indeterminate (always fails).
    pub mutual_information: Option<f64>,
    /// ΔG at the evaluated occupancy.
    pub free_energy: f64,
}

impl PhaseMetrics {
    /// Metrics with a known information value.
    pub fn new(occupancy: f64, mutual_information: f64, free_energy: f64) -> Self {
        Self {
            occupancy,
            mutual_information: Some(mutual_information),
            free_energy,
        }
    }
}

/// Outcome of each individual condition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Conditions {
    /// Occupancy statistic above threshold.
    pub occupancy: bool,
    /// Information above threshold.
    pub information: bool,
    /// Free energy below bound.
    pub free_energy: bool,
}

impl Conditions {
    /// All three hold.
    pub fn all(&self) -> bool {
        self.occupancy && self.information && self.free_energy
    }
}

// ─── ActivationPhase ─────────────────────────────────────────────────────────

/// Two-state activation phase.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ActivationPhase {
    /// At least one entry condition fails.
    #[default]
    Inactive,
    /// Occupancy, information and free energy are (or were, while latched) favourable.
    Active,
}

impl ActivationPhase {
    /// Next phase given the previous one.
    ///
    /// - `metrics`: current occupancy statistic, information and ΔG.
    /// - `temperature`: absolute temperature for the free-energy bound.
    /// - `prev`: phase from the previous step (enables latching).
    /// - `rule`: thresholds and release policy.
    pub fn classify(
        metrics: &PhaseMetrics,
        temperature: f64,
        prev: ActivationPhase,
        rule: &ActivationRule,
    ) -> ActivationPhase {
        let c = rule.conditions(metrics, temperature);
        if c.all() {
            return ActivationPhase::Active;
        }
        let held = match rule.latch_release {
            LatchRelease::AnyConditionFails => c.occupancy && c.free_energy,
            LatchRelease::BothConditionsFail => c.occupancy || c.free_energy,
        };
        match prev {
            ActivationPhase::Active if held => ActivationPhase::Active,
            _ => ActivationPhase::Inactive,
        }
    }

    /// True for [`ActivationPhase::Active`].
    pub fn is_active(self) -> bool {
        self == ActivationPhase::Active
    }
}

impl From<bool> for ActivationPhase {
    fn from(active: bool) -> Self {
        if active {
            ActivationPhase::Active
        } else {
            ActivationPhase::Inactive
        }
    }
}

// ─── Scalar entry points ─────────────────────────────────────────────────────

/// Memoryless active-phase test with ΔH/ΔS in kJ/mol.
///
/// θ̄ > `occupancy_threshold` ∧ MI > `information_threshold` ∧
/// ΔG < −`rtln2_multiplier`·R·T/1000·ln 2.
pub fn classify(
    mean_occupancy: f64,
    mutual_information: f64,
    free_energy: f64,
    temperature: f64,
    occupancy_threshold: f64,
    information_threshold: f64,
    rtln2_multiplier: f64,
) -> bool {
    scalar_rule(occupancy_threshold, information_threshold, rtln2_multiplier).is_active(
        &PhaseMetrics::new(mean_occupancy, mutual_information, free_energy),
        temperature,
    )
}

/// Latching variant of [`classify`]: an active state survives a failed
/// information condition while occupancy and free energy still hold, and
/// `release` decides whether one or both of those must fail to drop it.
#[allow(clippy::too_many_arguments)]
pub fn classify_with_memory(
    previous: bool,
    mean_occupancy: f64,
    mutual_information: f64,
    free_energy: f64,
    temperature: f64,
    occupancy_threshold: f64,
    information_threshold: f64,
    rtln2_multiplier: f64,
    release: LatchRelease,
) -> bool {
    let rule = scalar_rule(occupancy_threshold, information_threshold, rtln2_multiplier).with_latch_release(release);
    ActivationPhase::classify(
        &PhaseMetrics::new(mean_occupancy, mutual_information, free_energy),
        temperature,
        previous.into(),
        &rule,
    )
    .is_active()
}

fn scalar_rule(occupancy_threshold: f64, information_threshold: f64, multiplier: f64) -> ActivationRule {
    ActivationRule {
        occupancy_threshold,
        information_threshold,
        free_energy_bound: FreeEnergyBound::RtLn2 {
            multiplier,
            unit: EnergyUnit::Kilojoules,
        },
        latch_release: LatchRelease::AnyConditionFails,
    }
}

// ─── Latch ───────────────────────────────────────────────────────────────────

/// Result of one evaluation.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ActivationState {
    /// Phase after this evaluation.
    pub active: bool,
    /// Scalars that produced it.
    pub metrics: PhaseMetrics,
    /// Phase before this evaluation, for stateful classifiers.
    pub previous: Option<bool>,
}

/// Explicit two-state machine carrying the previous phase between steps.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ActivationLatch {
    rule: ActivationRule,
    temperature: f64,
    phase: ActivationPhase,
}

impl ActivationLatch {
    /// Inactive latch evaluating `rule` at `temperature`.
    pub fn new(rule: ActivationRule, temperature: f64) -> Result<Self> {
        rule.validate()?;
        ensure_positive("temperature", temperature)?;
        Ok(Self {
            rule,
            temperature,
            phase: ActivationPhase::Inactive,
        })
    }

    /// Feed one step of metrics and advance.
    pub fn step(&mut self, metrics: PhaseMetrics) -> ActivationState {
        let previous = self.phase;
        self.phase = ActivationPhase::classify(&metrics, self.temperature, previous, &self.rule);
        if self.phase != previous {
            debug!(from = ?previous, to = ?self.phase, occupancy = metrics.occupancy, "activation latch transition");
        }
        ActivationState {
            active: self.phase.is_active(),
            metrics,
            previous: Some(previous.is_active()),
        }
    }

    /// Current phase.
    pub fn phase(&self) -> ActivationPhase {
        self.phase
    }

    /// Rule in use.
    pub fn rule(&self) -> &ActivationRule {
        &self.rule
    }

    /// Return to inactive.
    pub fn reset(&mut self) {
        self.phase = ActivationPhase::Inactive;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T0: f64 = 300.0;

    fn favourable(mi: f64) -> PhaseMetrics {
        PhaseMetrics::new(0.29, mi, -37.84)
    }

    #[test]
    fn test_classify_reference_point() {
        assert!(classify(0.2942, 2.7395, -37.84, T0, 0.10, 2.2, 1.0));
    }

    #[test]
    fn test_classify_is_strict_at_every_boundary() {
        let bound = -EnergyUnit::Kilojoules.rt_ln2(T0);
        assert!(!classify(0.10, 3.0, -40.0, T0, 0.10, 2.2, 1.0));
        assert!(!classify(0.5, 2.2, -40.0, T0, 0.10, 2.2, 1.0));
        assert!(!classify(0.5, 3.0, bound, T0, 0.10, 2.2, 1.0));
        assert!(classify(0.5, 3.0, bound - 1e-9, T0, 0.10, 2.2, 1.0));
    }

    #[test]
    fn test_classify_is_pure() {
        let a = classify(0.3, 2.5, -10.0, T0, 0.10, 2.2, 1.0);
        let b = classify(0.3, 2.5, -10.0, T0, 0.10, 2.2, 1.0);
        assert_eq!(a, b);
    }

    #[test]
    fn test_multiplier_scales_free_energy_bound() {
        // −1.73 kJ/mol is one bit at 300 K but not two.
        assert!(classify(0.3, 3.0, -1.8, T0, 0.10, 2.2, 1.0));
        assert!(!classify(0.3, 3.0, -1.8, T0, 0.10, 2.2, 2.0));
    }

    #[test]
    fn test_memory_requires_all_three_to_enter() {
        let release = LatchRelease::default();
        assert!(!classify_with_memory(false, 0.3, 1.0, -10.0, T0, 0.10, 2.2, 1.0, release));
        assert!(classify_with_memory(false, 0.3, 3.0, -10.0, T0, 0.10, 2.2, 1.0, release));
        assert!(classify_with_memory(true, 0.3, 1.0, -10.0, T0, 0.10, 2.2, 1.0, release));
    }

    #[test]
    fn test_memory_release_policy_is_selectable() {
        // Occupancy fails, free energy still holds.
        let any = LatchRelease::AnyConditionFails;
        let both = LatchRelease::BothConditionsFail;
        assert!(!classify_with_memory(true, 0.05, 0.0, -10.0, T0, 0.10, 2.2, 1.0, any));
        assert!(classify_with_memory(true, 0.05, 0.0, -10.0, T0, 0.10, 2.2, 1.0, both));
        assert!(!classify_with_memory(true, 0.05, 0.0, 10.0, T0, 0.10, 2.2, 1.0, both));
        assert!(!classify_with_memory(false, 0.05, 3.0, -10.0, T0, 0.10, 2.2, 1.0, both));
    }

    #[test]
    fn test_latch_holds_while_information_sweeps() {
        let mut latch = ActivationLatch::new(ActivationRule::dynamic_model(), T0).unwrap();
        assert!(latch.step(favourable(3.0)).active);
        for mi in [0.0, 1.0, 2.2, 3.0, 0.5, 2.19, 5.0] {
            let state = latch.step(favourable(mi));
            assert!(state.active, "dropped out at MI = {}", mi);
            assert_eq!(state.previous, Some(true));
        }
        let unknown = PhaseMetrics {
            mutual_information: None,
            ..favourable(0.0)
        };
        assert!(latch.step(unknown).active);
    }

    #[test]
    fn test_latch_release_policies() {
        let one_fails = PhaseMetrics::new(0.05, 0.0, -37.84);
        let both_fail = PhaseMetrics::new(0.05, 0.0, 10.0);

        let mut strict = ActivationLatch::new(ActivationRule::dynamic_model(), T0).unwrap();
        strict.step(favourable(3.0));
        assert!(!strict.step(one_fails).active);

        let rule = ActivationRule::dynamic_model().with_latch_release(LatchRelease::BothConditionsFail);
        let mut loose = ActivationLatch::new(rule, T0).unwrap();
        loose.step(favourable(3.0));
        assert!(loose.step(one_fails).active);
        assert!(!loose.step(both_fail).active);
        assert_eq!(loose.phase(), ActivationPhase::Inactive);
    }

    #[test]
    fn test_inactive_latch_ignores_relaxed_conditions() {
        let mut latch = ActivationLatch::new(ActivationRule::dynamic_model(), T0).unwrap();
        assert!(!latch.step(favourable(1.0)).active);
        latch.step(favourable(3.0));
        latch.reset();
        assert!(!latch.step(favourable(1.0)).active);
    }

    #[test]
    fn test_continuous_signal_rule_ignores_free_energy() {
        let rule = ActivationRule::continuous_signal();
        assert!(rule.is_active(&PhaseMetrics::new(0.2, 0.01, 1e9), T0));
        assert!(!rule.is_active(&PhaseMetrics::new(0.15, 0.01, -1.0), T0));
        assert!(!rule.is_active(&PhaseMetrics::new(0.2, 0.005, -1.0), T0));
    }

    #[test]
    fn test_absolute_bound() {
        let bound = FreeEnergyBound::Absolute(-3000.0);
        assert!(bound.admits(-3000.5, 310.15));
        assert!(!bound.admits(-3000.0, 310.15));
        assert_eq!(FreeEnergyBound::Disabled.limit(300.0), None);
    }

    #[test]
    fn test_latch_rejects_bad_configuration() {
        assert!(ActivationLatch::new(ActivationRule::dynamic_model(), 0.0).is_err());
        let rule = ActivationRule::dynamic_model().with_information_threshold(f64::NAN);
        assert!(ActivationLatch::new(rule, T0).is_err());
    }
}
