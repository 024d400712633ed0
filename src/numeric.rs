//! Small numeric helpers shared by the integrator, the information
//! estimators and the continuous-signal gates.

use crate::error::{Error, Result};

/// `n` evenly spaced samples over `[start, end]`, both ends included.
///
/// `n = 1` yields `[start]`; `n = 0` yields an empty vector.
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            let mut out: Vec<f64> = (0..n).map(|i| start + step * i as f64).collect();
            out[n - 1] = end;
            out
        }
    }
}

/// Arithmetic mean, `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Gradient with unit spacing: central differences inside, one-sided
/// differences at the two ends. A single sample has gradient zero.
pub fn gradient(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    match n {
        0 => Vec::new(),
        1 => vec![0.0],
        _ => {
            let mut out = Vec::with_capacity(n);
            out.push(values[1] - values[0]);
            for i in 1..n - 1 {
                out.push((values[i + 1] - values[i - 1]) / 2.0);
            }
            out.push(values[n - 1] - values[n - 2]);
            out
        }
    }
}

/// Gradient of `values` sampled at strictly increasing `coords`.
///
/// Interior points use the second-order non-uniform central difference,
/// end points first-order one-sided differences.
pub fn gradient_at(values: &[f64], coords: &[f64]) -> Result<Vec<f64>> {
    if values.len() != coords.len() {
        return Err(Error::ShapeMismatch(format!(
            "{} values against {} coordinates",
            values.len(),
            coords.len()
        )));
    }
    let n = values.len();
    if n < 2 {
        return Err(Error::invalid("coords", "at least two samples are required"));
    }
    if coords.windows(2).any(|w| !(w[1] > w[0])) {
        return Err(Error::invalid("coords", "must be strictly increasing"));
    }

    let mut out = Vec::with_capacity(n);
    out.push((values[1] - values[0]) / (coords[1] - coords[0]));
    for i in 1..n - 1 {
        let hs = coords[i] - coords[i - 1];
        let hd = coords[i + 1] - coords[i];
        let numerator =
            hs * hs * values[i + 1] + (hd * hd - hs * hs) * values[i] - hd * hd * values[i - 1];
        out.push(numerator / (hs * hd * (hd + hs)));
    }
    out.push((values[n - 1] - values[n - 2]) / (coords[n - 1] - coords[n - 2]));
    Ok(out)
}

/// Piecewise-linear interpolation of `(xs, ys)` at `x`, extrapolating
/// linearly from the first or last segment outside the sampled range.
///
/// `xs` must be non-decreasing with at least one sample; repeated abscissae
/// take the later ordinate.
pub(crate) fn interpolate(xs: &[f64], ys: &[f64], x: f64) -> f64 {
    let n = xs.len();
    if n == 1 {
        return ys[0];
    }
    // Index of the segment [xs[i], xs[i+1]] used for x.
    let i = xs.partition_point(|&xi| xi <= x).saturating_sub(1).min(n - 2);
    let (x0, x1) = (xs[i], xs[i + 1]);
    let (y0, y1) = (ys[i], ys[i + 1]);
    if x1 == x0 {
        return y1;
    }
    y0 + (y1 - y0) * (x - x0) / (x1 - x0)
}
