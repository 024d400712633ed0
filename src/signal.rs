/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Continuous-signal gates.
//!
//! These gates act on a sampled input signal instead of an integrated
//! binding trajectory. Each produces a gate signal O; the gated signal I·O is
//! reduced to a running occupancy θ̄, a free-energy series −dθ̄ and a
//! correlation proxy between I and O, then classified under
//! [`ActivationRule::continuous_signal`].
//!
//! # Processing modes
//!
//! | Mode | Smoothing | ΔG series | Correlation |
//! |---|---|---|---|
//! | [`ProcessingMode::Offline`] | symmetric Gaussian, reflected edges | central differences | "same"-mode over the whole signal |
//! | [`ProcessingMode::Online`] | one-sided Gaussian over past samples | backward differences | zero-lag covariance of the prefix |
//!
//! In online mode output index k never depends on input after index k.

use core::f64::consts::TAU;

use tracing::debug;

use crate::error::{ensure_finite, ensure_positive, Error, Result};
use crate::information::correlation_proxy;
use crate::numeric::{gradient, mean};
use crate::phase::{ActivationRule, PhaseMetrics};

/// Temperature at which a configured free-energy bound is evaluated.
pub const SIGNAL_TEMPERATURE: f64 = 300.0;

/// Batch or strictly causal processing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ProcessingMode {
    /// The whole signal is known up front.
    #[default]
    Offline,
    /// Samples arrive one at a time.
    Online,
}

// ─── Reductions ──────────────────────────────────────────────────────────────

/// Cumulative sum divided by the total length.
pub fn running_occupancy(signal: &[f64]) -> Vec<f64> {
    let n = signal.len() as f64;
    signal
        .iter()
        .scan(0.0, |total, v| {
            *total += v;
            Some(*total / n)
        })
        .collect()
}

/// Negative gradient of the running occupancy.
pub fn free_energy_gradient(occupancy: &[f64], mode: ProcessingMode) -> Vec<f64> {
    match mode {
        ProcessingMode::Offline => gradient(occupancy).into_iter().map(|g| -g).collect(),
        ProcessingMode::Online => {
            let mut out = Vec::with_capacity(occupancy.len());
            for i in 0..occupancy.len() {
                out.push(if i == 0 { 0.0 } else { occupancy[i - 1] - occupancy[i] });
            }
            out
        }
    }
}

/// Correlation between input and gate signals.
pub fn signal_correlation(input: &[f64], gate: &[f64], mode: ProcessingMode) -> Result<Vec<f64>> {
    match mode {
        ProcessingMode::Offline => correlation_proxy(input, gate),
        ProcessingMode::Online => {
            if input.len() != gate.len() {
                return Err(Error::ShapeMismatch(format!(
                    "input has {} samples, gate has {}",
                    input.len(),
                    gate.len()
                )));
            }
            let (mut sa, mut sb, mut sab) = (0.0, 0.0, 0.0);
            Ok(input
                .iter()
                .zip(gate)
                .enumerate()
                .map(|(i, (a, b))| {
                    sa += a;
                    sb += b;
                    sab += a * b;
                    let n = (i + 1) as f64;
                    (sab - sa * sb / n) / n
                })
                .collect())
        }
    }
}

fn gaussian_weights(sigma: f64) -> (usize, Vec<f64>) {
    let radius = (4.0 * sigma + 0.5) as usize;
    let weights = (0..=radius)
        .map(|j| (-0.5 * (j as f64 / sigma).powi(2)).exp())
        .collect();
    (radius, weights)
}

fn reflect(index: isize, len: isize) -> usize {
    let mut i = index;
    while i < 0 || i >= len {
        if i < 0 {
            i = -i - 1;
        }
        if i >= len {
            i = 2 * len - i - 1;
        }
    }
    i as usize
}

/// Gaussian smoothing with standard deviation `sigma` samples and radius
/// ⌊4σ + 0.5⌋.
///
/// Offline reflects the signal at both ends (d c b a | a b c d | d c b a).
/// Online uses only the current and past samples, renormalised near the start.
pub fn gaussian_smooth(values: &[f64], sigma: f64, mode: ProcessingMode) -> Result<Vec<f64>> {
    ensure_positive("sigma", sigma)?;
    if values.is_empty() {
        return Ok(Vec::new());
    }
    let (radius, half) = gaussian_weights(sigma);
    let n = values.len();
    match mode {
        ProcessingMode::Offline => {
            let norm = half[0] + 2.0 * half[1..].iter().sum::<f64>();
            let (r, len) = (radius as isize, n as isize);
            Ok((0..len)
                .map(|i| {
                    (-r..=r)
                        .map(|j| half[j.unsigned_abs()] * values[reflect(i + j, len)])
                        .sum::<f64>()
                        / norm
                })
                .collect())
        }
        ProcessingMode::Online => Ok((0..n)
            .map(|i| {
                let reach = radius.min(i);
                let (num, den) = (0..=reach).fold((0.0, 0.0), |(num, den), j| {
                    (num + half[j] * values[i - j], den + half[j])
                });
                num / den
            })
            .collect()),
    }
}

/// sin(2π·frequency·t)², the pulse train used to exercise these gates.
pub fn pulse_train(times: &[f64], frequency: f64) -> Vec<f64> {
    times.iter().map(|t| (TAU * frequency * t).sin().powi(2)).collect()
}

fn check_lengths(times: &[f64], input: &[f64]) -> Result<()> {
    if times.len() == input.len() {
        Ok(())
    } else {
        Err(Error::ShapeMismatch(format!(
            "{} times against {} input samples",
            times.len(),
            input.len()
        )))
    }
}

// ─── Predictive gate ─────────────────────────────────────────────────────────

/// Memory-based predictor.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PredictiveGateConfig {
    /// Samples of history inspected.
    pub memory_window: usize,
    /// Samples ahead at which the gate fires.
    pub horizon: usize,
    /// Fires when the history sum exceeds this fraction of the window.
    pub fill_fraction: f64,
    /// Smoothing width in samples.
    pub sigma: f64,
    /// Smoothing mode.
    pub mode: ProcessingMode,
}

impl Default for PredictiveGateConfig {
    fn default() -> Self {
        Self {
            memory_window: 50,
            horizon: 25,
            fill_fraction: 0.25,
            sigma: 5.0,
            mode: ProcessingMode::Offline,
        }
    }
}

impl PredictiveGateConfig {
    /// Replace the processing mode.
    pub fn with_mode(mut self, mode: ProcessingMode) -> Self {
        self.mode = mode;
        self
    }
}

/// For every i in [window, len − horizon): when Σ input[i − window .. i]
/// exceeds fill_fraction·window, gate[i + horizon] = 1. The result is smoothed.
pub fn predictive_gate(input: &[f64], config: &PredictiveGateConfig) -> Result<Vec<f64>> {
    ensure_finite("fill_fraction", config.fill_fraction)?;
    if config.memory_window == 0 {
        return Err(Error::invalid("memory_window", "must be at least 1"));
    }
    let n = input.len();
    let mut gate = vec![0.0; n];
    let threshold = config.fill_fraction * config.memory_window as f64;
    for i in config.memory_window..n.saturating_sub(config.horizon) {
        let past: f64 = input[i - config.memory_window..i].iter().sum();
        if past > threshold {
            gate[i + config.horizon] = 1.0;
        }
    }
    gaussian_smooth(&gate, config.sigma, config.mode)
}

// ─── Triadic gate ────────────────────────────────────────────────────────────

/// Oscillator gate whose frequency follows its correlation with the input.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TriadicGateConfig {
    /// Samples of history inspected.
    pub memory_window: usize,
    /// Oscillator segment length, also the write offset.
    pub horizon: usize,
    /// Samples between updates.
    pub stride: usize,
    /// Initial oscillator frequency.
    pub start_frequency: f64,
    /// Frequency increase after a correlated update.
    pub frequency_step_up: f64,
    /// Frequency decrease after an uncorrelated update.
    pub frequency_step_down: f64,
    /// Frequency clip range.
    pub frequency_range: (f64, f64),
    /// Phase advance per update.
    pub phase_step: f64,
    /// Correlation above which an update counts as correlated.
    pub information_threshold: f64,
    /// Writes when the history sum exceeds this fraction of the window.
    pub fill_fraction: f64,
    /// Smoothing width in samples.
    pub sigma: f64,
    /// Smoothing mode.
    pub mode: ProcessingMode,
}

impl Default for TriadicGateConfig {
    fn default() -> Self {
        Self {
            memory_window: 50,
            horizon: 25,
            stride: 10,
            start_frequency: 1.0,
            frequency_step_up: 0.05,
            frequency_step_down: 0.025,
            frequency_range: (0.5, 3.0),
            phase_step: 0.05,
            information_threshold: 0.005,
            fill_fraction: 0.25,
            sigma: 4.0,
            mode: ProcessingMode::Offline,
        }
    }
}

impl TriadicGateConfig {
    /// Replace the processing mode.
    pub fn with_mode(mut self, mode: ProcessingMode) -> Self {
        self.mode = mode;
        self
    }
}

/// Output of [`triadic_gate`].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TriadicOutput {
    /// Smoothed gate clipped to [0, 1].
    pub gate: Vec<f64>,
    /// Correlation between history and oscillator at every update.
    pub information: Vec<f64>,
    /// Oscillator frequency after the last update.
    pub final_frequency: f64,
}

/// Every `stride` samples the oscillator (sin(2πf·t + φ) + 1)/2 over the next
/// `horizon` times is added to the gate `horizon` samples ahead when the
/// history is full enough; f then moves up or down with the correlation
/// between history and oscillator.
pub fn triadic_gate(times: &[f64], input: &[f64], config: &TriadicGateConfig) -> Result<TriadicOutput> {
    check_lengths(times, input)?;
    if config.memory_window < config.horizon || config.horizon == 0 || config.stride == 0 {
        return Err(Error::invalid(
            "triadic_gate",
            "needs 0 < horizon <= memory_window and stride > 0",
        ));
    }
    let (lo, hi) = config.frequency_range;
    if !(lo <= hi) {
        return Err(Error::invalid("frequency_range", format!("empty range {:?}", config.frequency_range)));
    }

    let n = times.len();
    let (w, h) = (config.memory_window, config.horizon);
    let mut gate = vec![0.0; n];
    let mut frequency = config.start_frequency;
    let mut phase = 0.0;
    let mut information = Vec::new();

    for i in (w..n.saturating_sub(h)).step_by(config.stride) {
        let oscillator: Vec<f64> = times[i..i + h]
            .iter()
            .map(|t| ((TAU * frequency * t + phase).sin() + 1.0) / 2.0)
            .collect();
        let memory = &input[i - w..i];
        if memory.iter().sum::<f64>() > config.fill_fraction * w as f64 {
            let end = (i + 2 * h).min(n);
            for (slot, value) in gate[i + h..end].iter_mut().zip(&oscillator) {
                *slot += value;
            }
        }

        let memory_mean = mean(memory).unwrap_or(0.0);
        let oscillator_mean = mean(&oscillator).unwrap_or(0.0);
        let value = memory
            .iter()
            .zip(&oscillator)
            .map(|(m, o)| (m - memory_mean) * (o - oscillator_mean))
            .sum::<f64>()
            / w as f64;
        information.push(value);

        frequency += if value > config.information_threshold {
            config.frequency_step_up
        } else {
            -config.frequency_step_down
        };
        frequency = frequency.clamp(lo, hi);
        phase += config.phase_step;
    }
    debug!(updates = information.len(), frequency, "triadic gate settled");

    let gate = gaussian_smooth(&gate, config.sigma, config.mode)?
        .into_iter()
        .map(|g| g.clamp(0.0, 1.0))
        .collect();
    Ok(TriadicOutput {
        gate,
        information,
        final_frequency: frequency,
    })
}

// ─── Phase-lock gate ─────────────────────────────────────────────────────────

/// Oscillator gate that shifts its phase once the input history is strong.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PhaseLockGateConfig {
    /// Samples of history inspected.
    pub memory_window: usize,
    /// Oscillator frequency.
    pub frequency: f64,
    /// History mean above which the gate passes the oscillator.
    pub open_threshold: f64,
    /// History mean above which an unlocked gate locks.
    pub lock_threshold: f64,
    /// Phase jump on locking.
    pub lock_kick: f64,
    /// Phase advance per sample while locked.
    pub locked_drift: f64,
    /// Phase retreat per sample while unlocked.
    pub unlocked_drift: f64,
    /// Smoothing width in samples.
    pub sigma: f64,
    /// Smoothing mode.
    pub mode: ProcessingMode,
}

impl Default for PhaseLockGateConfig {
    fn default() -> Self {
        Self {
            memory_window: 100,
            frequency: 1.5,
            open_threshold: 0.2,
            lock_threshold: 0.25,
            lock_kick: 0.1,
            locked_drift: 0.02,
            unlocked_drift: 0.01,
            sigma: 2.0,
            mode: ProcessingMode::Offline,
        }
    }
}

impl PhaseLockGateConfig {
    /// Replace the processing mode.
    pub fn with_mode(mut self, mode: ProcessingMode) -> Self {
        self.mode = mode;
        self
    }
}

/// gate[i] = (sin(2πf·t[i] + φ) + 1)/2 while the history mean exceeds the open
/// threshold; φ stays within [0, 2π].
pub fn phase_lock_gate(times: &[f64], input: &[f64], config: &PhaseLockGateConfig) -> Result<Vec<f64>> {
    check_lengths(times, input)?;
    if config.memory_window == 0 {
        return Err(Error::invalid("memory_window", "must be at least 1"));
    }
    ensure_finite("frequency", config.frequency)?;
    let n = times.len();
    let mut gate = vec![0.0; n];
    let mut phase: f64 = 0.0;
    let mut locked = false;
    for i in config.memory_window..n {
        let history = mean(&input[i - config.memory_window..i]).unwrap_or(0.0);
        if history > config.open_threshold {
            gate[i] = ((TAU * config.frequency * times[i] + phase).sin() + 1.0) / 2.0;
        }
        if !locked && history > config.lock_threshold {
            locked = true;
            phase += config.lock_kick;
        } else if locked {
            phase += config.locked_drift;
        } else {
            phase -= config.unlocked_drift;
        }
        phase = phase.clamp(0.0, TAU);
    }
    gaussian_smooth(&gate, config.sigma, config.mode)
}

// ─── Evaluation ──────────────────────────────────────────────────────────────

/// Series produced by [`evaluate_signal_gate`].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SignalGateReport {
    /// Input·gate.
    pub gated: Vec<f64>,
    /// Running occupancy of the gated signal.
    pub occupancy: Vec<f64>,
    /// Negative gradient of the running occupancy.
    pub free_energy: Vec<f64>,
    /// Correlation between input and gate.
    pub information: Vec<f64>,
    /// Classification at every sample.
    pub active: Vec<bool>,
}

impl SignalGateReport {
    /// Whether any sample was classified active.
    pub fn triggered(&self) -> bool {
        self.active.iter().any(|&a| a)
    }

    /// Index of the first active sample.
    pub fn first_activation(&self) -> Option<usize> {
        self.active.iter().position(|&a| a)
    }
}

/// Reduce an input and its gate signal and classify every sample under `rule`.
pub fn evaluate_signal_gate(
    input: &[f64],
    gate: &[f64],
    rule: &ActivationRule,
    mode: ProcessingMode,
) -> Result<SignalGateReport> {
    rule.validate()?;
    let information = signal_correlation(input, gate, mode)?;
    let gated: Vec<f64> = input.iter().zip(gate).map(|(i, o)| i * o).collect();
    let occupancy = running_occupancy(&gated);
    let free_energy = free_energy_gradient(&occupancy, mode);
    let active = occupancy
        .iter()
        .zip(&information)
        .zip(&free_energy)
        .map(|((&theta, &mi), &dg)| rule.is_active(&PhaseMetrics::new(theta, mi, dg), SIGNAL_TEMPERATURE))
        .collect();
    Ok(SignalGateReport {
        gated,
        occupancy,
        free_energy,
        information,
        active,
    })
}
