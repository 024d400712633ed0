/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Mutual-information estimators.
//!
//! Two families of call sites use two different conventions, and neither is
//! the "correct" one:
//!
//! | Estimator | Units | Typical threshold |
//! |-----------|-------|-------------------|
//! | [`mutual_information_continuous`] over a joint histogram | nats ([`LogBase::Natural`]) | 2.2 |
//! | [`mutual_information_discrete`] over probability tables | bits ([`LogBase::Two`]) | 0.05 |
//! | [`correlation_proxy`] (centred cross-correlation) | signal units² | 0.005 |
//!
//! The base and the estimator are therefore always explicit. A threshold is
//! only meaningful together with the [`InformationEstimator`] it was tuned for.

use ndarray::{Array2, ArrayView1, ArrayView2};
use tracing::debug;

use crate::error::{ensure_positive, Error, Result};

/// Bin count used by the dynamic-model call sites.
pub const DEFAULT_BINS: usize = 30;

/// Clipping floor used by [`mutual_information_discrete`].
pub const DEFAULT_EPS: f64 = 1e-12;

// ─── Log base ────────────────────────────────────────────────────────────────

/// Logarithm base of a mutual-information value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LogBase {
    /// Natural log, result in nats.
    #[default]
    Natural,
    /// Base-2 log, result in bits.
    Two,
}

impl LogBase {
    /// Logarithm of `x` in this base.
    #[inline]
    pub fn log(self, x: f64) -> f64 {
        match self {
            LogBase::Natural => x.ln(),
            LogBase::Two => x.log2(),
        }
    }
}

// ─── Histogram estimator ─────────────────────────────────────────────────────

fn axis_range(sample: &[f64]) -> (f64, f64) {
    let lo = sample.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = sample.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if lo == hi {
        (lo - 0.5, hi + 0.5)
    } else {
        (lo, hi)
    }
}

#[inline]
fn bin_index(x: f64, lo: f64, hi: f64, bins: usize) -> usize {
    let raw = ((x - lo) / (hi - lo) * bins as f64).floor();
    if raw <= 0.0 {
        0
    } else {
        (raw as usize).min(bins - 1)
    }
}

fn check_pair(a: &[f64], b: &[f64]) -> Result<()> {
    if a.len() != b.len() {
        return Err(Error::ShapeMismatch(format!(
            "samples have {} and {} elements",
            a.len(),
            b.len()
        )));
    }
    if a.iter().chain(b).any(|v| !v.is_finite()) {
        return Err(Error::invalid("sample", "contains a non-finite value"));
    }
    Ok(())
}

/// Counts of the 2-D histogram of `(a[i], b[i])` with `bins` equal-width
/// bins spanning each sample's own [min, max].
///
/// A constant axis spans [x − 0.5, x + 0.5]. The maximum of each axis falls
/// into the last bin.
pub fn joint_histogram(a: &[f64], b: &[f64], bins: usize) -> Result<Array2<f64>> {
    check_pair(a, b)?;
    if bins == 0 {
        return Err(Error::invalid("bins", "must be at least 1"));
    }
    let mut counts = Array2::<f64>::zeros((bins, bins));
    if a.is_empty() {
        return Ok(counts);
    }
    let (ax_lo, ax_hi) = axis_range(a);
    let (bx_lo, bx_hi) = axis_range(b);
    for (&x, &y) in a.iter().zip(b) {
        let i = bin_index(x, ax_lo, ax_hi, bins);
        let j = bin_index(y, bx_lo, bx_hi, bins);
        counts[[i, j]] += 1.0;
    }
    Ok(counts)
}

fn has_variance(sample: &[f64]) -> bool {
    sample.iter().any(|&v| v != sample[0])
}

/// Mutual information between two equal-length samples via a joint histogram.
///
/// Only cells with non-zero joint probability contribute. Symmetric in its
/// arguments up to floating-point summation order.
///
/// # Errors
///
/// - [`Error::ShapeMismatch`] when the lengths differ.
/// - [`Error::IndeterminateInformation`] for empty samples or a sample with
///   zero variance.
pub fn mutual_information_continuous(a: &[f64], b: &[f64], bins: usize, base: LogBase) -> Result<f64> {
    check_pair(a, b)?;
    if a.is_empty() {
        return Err(Error::IndeterminateInformation("empty samples".into()));
    }
    if !has_variance(a) || !has_variance(b) {
        debug!(len = a.len(), "zero-variance sample, information indeterminate");
        return Err(Error::IndeterminateInformation("zero-variance sample".into()));
    }

    let counts = joint_histogram(a, b, bins)?;
    let total: f64 = counts.sum();
    if total <= 0.0 {
        return Err(Error::IndeterminateInformation("zero total histogram mass".into()));
    }
    let joint = counts / total;
    let px = joint.sum_axis(ndarray::Axis(1));
    let py = joint.sum_axis(ndarray::Axis(0));

    let mut mi = 0.0;
    for ((i, j), &p) in joint.indexed_iter() {
        if p > 0.0 {
            mi += p * base.log(p / (px[i] * py[j]));
        }
    }
    Ok(mi)
}

// ─── Probability-table estimator ─────────────────────────────────────────────

/// Mutual information of a joint probability table against its marginals.
///
/// All three inputs are clipped to at least `eps` before the log-ratio is
/// taken, and the result is floored at zero.
///
/// # Errors
///
/// - [`Error::ShapeMismatch`] when the marginals do not match the table.
/// - [`Error::InvalidParameter`] for negative or non-finite entries, or a
///   non-positive `eps`.
/// - [`Error::IndeterminateInformation`] for an empty or all-zero table.
pub fn mutual_information_discrete(
    joint: ArrayView2<'_, f64>,
    marginal_x: ArrayView1<'_, f64>,
    marginal_y: ArrayView1<'_, f64>,
    eps: f64,
    base: LogBase,
) -> Result<f64> {
    ensure_positive("eps", eps)?;
    let (rows, cols) = joint.dim();
    if marginal_x.len() != rows || marginal_y.len() != cols {
        return Err(Error::ShapeMismatch(format!(
            "joint table is {rows}x{cols}, marginals have {} and {} entries",
            marginal_x.len(),
            marginal_y.len()
        )));
    }
    let valid = |v: &f64| v.is_finite() && *v >= 0.0;
    if !joint.iter().all(valid) || !marginal_x.iter().all(valid) || !marginal_y.iter().all(valid) {
        return Err(Error::invalid(
            "distribution",
            "probabilities must be finite and non-negative",
        ));
    }
    if joint.is_empty() || joint.sum() <= 0.0 {
        return Err(Error::IndeterminateInformation(
            "joint distribution has zero mass".into(),
        ));
    }

    let mut mi = 0.0;
    for ((i, j), &p) in joint.indexed_iter() {
        let p = p.max(eps);
        let ratio = p / (marginal_x[i].max(eps) * marginal_y[j].max(eps));
        mi += p * base.log(ratio);
    }
    Ok(mi.max(0.0))
}

// ─── Correlation proxy ───────────────────────────────────────────────────────

fn centred(sample: &[f64]) -> Vec<f64> {
    let m = sample.iter().sum::<f64>() / sample.len() as f64;
    sample.iter().map(|v| v - m).collect()
}

/// Centred cross-correlation of two equal-length signals, divided by their
/// length, with output aligned to the input ("same" mode).
///
/// `out[i] = Σₙ â[n + i − N/2]·b̂[n] / N` where `â`, `b̂` are the centred
/// signals; the zero-lag term sits at `i = N/2`. A constant signal yields
/// all zeros.
pub fn correlation_proxy(a: &[f64], b: &[f64]) -> Result<Vec<f64>> {
    check_pair(a, b)?;
    let n = a.len();
    if n == 0 {
        return Ok(Vec::new());
    }
    let (ca, cb) = (centred(a), centred(b));
    let half = (n / 2) as isize;
    let out = (0..n as isize)
        .map(|i| {
            let lag = i - half;
            let sum: f64 = (0..n as isize)
                .filter_map(|k| {
                    let idx = k + lag;
                    (0..n as isize)
                        .contains(&idx)
                        .then(|| ca[idx as usize] * cb[k as usize])
                })
                .sum();
            sum / n as f64
        })
        .collect();
    Ok(out)
}

/// Zero-lag centred covariance Σ(â·b̂)/N, the scalar form of [`correlation_proxy`].
pub fn lag_zero_covariance(a: &[f64], b: &[f64]) -> Result<f64> {
    check_pair(a, b)?;
    if a.is_empty() {
        return Err(Error::IndeterminateInformation("empty samples".into()));
    }
    let (ca, cb) = (centred(a), centred(b));
    Ok(ca.iter().zip(&cb).map(|(x, y)| x * y).sum::<f64>() / a.len() as f64)
}

// ─── Estimator selection ─────────────────────────────────────────────────────

/// Which estimator reduces a pair of trajectories to one information value.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum InformationEstimator {
    /// Joint-histogram mutual information.
    Histogram {
        /// Bins per axis.
        bins: usize,
        /// Log base of the result.
        base: LogBase,
    },
    /// Zero-lag centred covariance ([`lag_zero_covariance`]).
    CorrelationProxy,
}

impl InformationEstimator {
    /// 30-bin histogram in nats, as used with the 2.2 threshold.
    pub fn dynamic_model() -> Self {
        InformationEstimator::Histogram {
            bins: DEFAULT_BINS,
            base: LogBase::Natural,
        }
    }

    /// Reduce two equal-length trajectories to one value.
    ///
    /// Both estimators report [`Error::IndeterminateInformation`] when either
    /// trajectory is constant.
    pub fn estimate(&self, a: &[f64], b: &[f64]) -> Result<f64> {
        match *self {
            InformationEstimator::Histogram { bins, base } => {
                mutual_information_continuous(a, b, bins, base)
            }
            InformationEstimator::CorrelationProxy => {
                check_pair(a, b)?;
                if a.is_empty() || !has_variance(a) || !has_variance(b) {
                    return Err(Error::IndeterminateInformation(
                        "zero-variance sample".into(),
                    ));
                }
                lag_zero_covariance(a, b)
            }
        }
    }
}

impl Default for InformationEstimator {
    fn default() -> Self {
        Self::dynamic_model()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numeric::linspace;
    use ndarray::{array, Array1};

    #[test]
    fn test_identical_uniform_samples_reach_log_bins() {
        let a = linspace(0.0, 1.0, 300);
        let mi = mutual_information_continuous(&a, &a, 30, LogBase::Natural).unwrap();
        assert!((mi - 30f64.ln()).abs() < 0.02, "got {}", mi);
        let bits = mutual_information_continuous(&a, &a, 30, LogBase::Two).unwrap();
        assert!((bits - mi / core::f64::consts::LN_2).abs() < 1e-9);
    }

    #[test]
    fn test_continuous_mi_is_symmetric() {
        let a: Vec<f64> = (0..200).map(|i| (i as f64 * 0.37).sin()).collect();
        let b: Vec<f64> = (0..200).map(|i| (i as f64 * 0.11).cos() + 0.1 * (i as f64).sqrt()).collect();
        let ab = mutual_information_continuous(&a, &b, 30, LogBase::Natural).unwrap();
        let ba = mutual_information_continuous(&b, &a, 30, LogBase::Natural).unwrap();
        assert!((ab - ba).abs() < 1e-12, "{} vs {}", ab, ba);
        assert!(ab > 0.0);
    }

    #[test]
    fn test_two_point_samples_carry_one_bit() {
        let mi = mutual_information_continuous(&[0.0, 0.36], &[0.0, 0.22], 30, LogBase::Two).unwrap();
        assert!((mi - 1.0).abs() < 1e-12, "got {}", mi);
    }

    #[test]
    fn test_degenerate_samples_are_indeterminate() {
        let flat = [0.3; 10];
        let ramp = linspace(0.0, 1.0, 10);
        assert!(matches!(
            mutual_information_continuous(&flat, &ramp, 30, LogBase::Natural),
            Err(Error::IndeterminateInformation(_))
        ));
        assert!(matches!(
            mutual_information_continuous(&[], &[], 30, LogBase::Natural),
            Err(Error::IndeterminateInformation(_))
        ));
        assert!(matches!(
            mutual_information_continuous(&ramp, &ramp[..5], 30, LogBase::Natural),
            Err(Error::ShapeMismatch(_))
        ));
        assert!(mutual_information_continuous(&ramp, &ramp, 0, LogBase::Natural).is_err());
    }

    #[test]
    fn test_joint_histogram_places_maximum_in_last_bin() {
        let counts = joint_histogram(&[0.0, 0.5, 1.0], &[1.0, 1.0, 1.0], 4).unwrap();
        assert_eq!(counts.sum(), 3.0);
        assert_eq!(counts[[0, 2]], 1.0);
        assert_eq!(counts[[2, 2]], 1.0);
        assert_eq!(counts[[3, 2]], 1.0);
    }

    #[test]
    fn test_discrete_mi_of_independent_table_is_zero() {
        let px = array![0.2, 0.3, 0.5];
        let py = array![0.6, 0.4];
        let joint = Array2::from_shape_fn((3, 2), |(i, j)| px[i] * py[j]);
        let mi = mutual_information_discrete(joint.view(), px.view(), py.view(), DEFAULT_EPS, LogBase::Two)
            .unwrap();
        assert!(mi.abs() < 1e-12, "got {}", mi);
    }

    #[test]
    fn test_discrete_mi_floors_negative_estimate_at_zero() {
        // Independent table with an empty row; the marginals carry rounding
        // noise, so the raw sum is about -2e-9 before flooring.
        let joint = array![[0.25, 0.25], [0.25, 0.25], [0.0, 0.0]];
        let px = array![0.5 + 1e-9, 0.5 + 1e-9, 0.0];
        let py = array![0.5, 0.5];
        for base in [LogBase::Natural, LogBase::Two] {
            let mi = mutual_information_discrete(joint.view(), px.view(), py.view(), DEFAULT_EPS, base).unwrap();
            assert_eq!(mi, 0.0);
        }
    }

    #[test]
    fn test_discrete_mi_of_diagonal_table() {
        let p: Array1<f64> = array![0.25, 0.25, 0.25, 0.25];
        let joint = Array2::from_diag(&p);
        let mi = mutual_information_discrete(joint.view(), p.view(), p.view(), DEFAULT_EPS, LogBase::Two)
            .unwrap();
        // Off-diagonal cells are clipped to eps and contribute about -4e-10.
        assert!((mi - 2.0).abs() < 1e-9, "got {}", mi);
    }

    #[test]
    fn test_discrete_mi_rejects_bad_tables() {
        let p = array![0.5, 0.5];
        let joint = array![[0.5, 0.0], [0.0, 0.5]];
        let short = array![1.0];
        assert!(matches!(
            mutual_information_discrete(joint.view(), short.view(), p.view(), DEFAULT_EPS, LogBase::Two),
            Err(Error::ShapeMismatch(_))
        ));
        let negative = array![[0.5, -0.1], [0.0, 0.6]];
        assert!(mutual_information_discrete(negative.view(), p.view(), p.view(), DEFAULT_EPS, LogBase::Two)
            .is_err());
        let zero = Array2::<f64>::zeros((2, 2));
        assert!(matches!(
            mutual_information_discrete(zero.view(), p.view(), p.view(), DEFAULT_EPS, LogBase::Two),
            Err(Error::IndeterminateInformation(_))
        ));
    }

    #[test]
    fn test_correlation_proxy_same_mode() {
        // Centred [1, 2, 3] is [-1, 0, 1]; autocorrelation lags -1, 0, +1.
        let out = correlation_proxy(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]).unwrap();
        let expected = [0.0, 2.0 / 3.0, 0.0];
        for (o, e) in out.iter().zip(expected) {
            assert!((o - e).abs() < 1e-12, "got {:?}", out);
        }
    }

    #[test]
    fn test_correlation_proxy_centre_is_covariance_for_even_lengths() {
        let a = [1.0, 4.0, 2.0, 8.0];
        let b = [0.5, 1.0, 3.0, 2.0];
        let out = correlation_proxy(&a, &b).unwrap();
        let cov = lag_zero_covariance(&a, &b).unwrap();
        assert!((out[2] - cov).abs() < 1e-12, "{:?} vs {}", out, cov);
    }

    #[test]
    fn test_estimator_proxy_flags_constant_signal() {
        let est = InformationEstimator::CorrelationProxy;
        assert!(est.estimate(&[1.0, 1.0], &[0.0, 1.0]).is_err());
        let v = est.estimate(&[0.0, 1.0], &[0.0, 2.0]).unwrap();
        assert!((v - 0.5).abs() < 1e-12, "got {}", v);
    }
}
