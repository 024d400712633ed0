/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Stiff-capable adaptive ODE integration.
//!
//! The binding systems in this crate are stiff: with k_on = 1e5 the occupancy
//! relaxes on a 1e-5 time scale while the ligand drive varies on a scale of
//! seconds. [`Rosenbrock`] is the two-stage, second-order, L-stable ROS2
//! method with an embedded first-order error estimate:
//!
//! ```text
//! (I − γhA)·k1 = F(z)
//! (I − γhA)·k2 = F(z + h·k1) − 2·k1
//! z' = z + 1.5h·k1 + 0.5h·k2          γ = 1 + 1/√2
//! err = 0.5h·(k1 + k2)
//! ```
//!
//! Time is carried as an extra state component (z = (y, t), F = (f, 1)) so the
//! Jacobian A includes ∂f/∂t of the time-varying drive. A is built by forward
//! finite differences and both stages share one LU decomposition.
//!
//! Steps land exactly on every grid point. Bounded state variables are
//! clamped after each accepted step, and only when the system declares
//! [`OdeSystem::bounds`].

use core::f64::consts::FRAC_1_SQRT_2;

use nalgebra::{DMatrix, DVector};
use tracing::debug;

use crate::error::{ensure_positive, Error, Result};

const GAMMA: f64 = 1.0 + FRAC_1_SQRT_2;
const SAFETY: f64 = 0.9;
const MIN_FACTOR: f64 = 0.2;
const MAX_FACTOR: f64 = 5.0;

// ─── System trait ────────────────────────────────────────────────────────────

/// A first-order system y' = f(t, y).
pub trait OdeSystem {
    /// Number of state components.
    fn dimension(&self) -> usize;

    /// Write f(t, state) into `out` (same length as `state`).
    fn derivative(&self, t: f64, state: &[f64], out: &mut [f64]);

    /// Optional per-component `(min, max)` clamp applied after accepted steps.
    fn bounds(&self) -> Option<&[(f64, f64)]> {
        None
    }
}

// ─── Tolerances ──────────────────────────────────────────────────────────────

/// Error control of the adaptive integrator.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tolerances {
    /// Relative tolerance.
    pub relative: f64,
    /// Absolute tolerance.
    pub absolute: f64,
    /// Upper bound on attempted steps per solve.
    pub max_steps: usize,
}

impl Tolerances {
    /// Tight tolerances for mapping activation boundaries (rtol 1e-9, atol 1e-12).
    pub fn precise() -> Self {
        Self {
            relative: 1e-9,
            absolute: 1e-12,
            max_steps: 20_000_000,
        }
    }

    /// Both tolerances must be finite and positive, and at least one step allowed.
    pub fn validate(&self) -> Result<()> {
        ensure_positive("relative_tolerance", self.relative)?;
        ensure_positive("absolute_tolerance", self.absolute)?;
        if self.max_steps == 0 {
            return Err(Error::invalid("max_steps", "must be at least 1"));
        }
        Ok(())
    }
}

impl Default for Tolerances {
    /// rtol 1e-5, atol 1e-8.
    fn default() -> Self {
        Self {
            relative: 1e-5,
            absolute: 1e-8,
            max_steps: 2_000_000,
        }
    }
}

// ─── Solution ────────────────────────────────────────────────────────────────

/// Counters of one solve.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SolverStats {
    /// Accepted steps.
    pub accepted: usize,
    /// Rejected steps.
    pub rejected: usize,
    /// Right-hand-side evaluations.
    pub evaluations: usize,
}

/// States sampled at the requested grid.
#[derive(Clone, Debug, PartialEq)]
pub struct Solution {
    times: Vec<f64>,
    states: Vec<Vec<f64>>,
    stats: SolverStats,
}

impl Solution {
    /// Grid times, identical to the requested grid.
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// `states()[i]` is the state at `times()[i]`.
    pub fn states(&self) -> &[Vec<f64>] {
        &self.states
    }

    /// Series of one component over the grid.
    pub fn component(&self, index: usize) -> Vec<f64> {
        self.states.iter().map(|s| s[index]).collect()
    }

    /// State at the last grid point.
    pub fn final_state(&self) -> Option<&[f64]> {
        self.states.last().map(Vec::as_slice)
    }

    /// Solver counters.
    pub fn stats(&self) -> SolverStats {
        self.stats
    }
}

/// Check that a time grid is non-empty, finite and non-decreasing.
pub fn validate_grid(grid: &[f64]) -> Result<()> {
    if grid.is_empty() {
        return Err(Error::InvalidTimeGrid("grid is empty".into()));
    }
    if let Some(t) = grid.iter().find(|t| !t.is_finite()) {
        return Err(Error::InvalidTimeGrid(format!("non-finite time {t}")));
    }
    if let Some(w) = grid.windows(2).find(|w| w[1] < w[0]) {
        return Err(Error::InvalidTimeGrid(format!(
            "grid is not ascending: {} follows {}",
            w[1], w[0]
        )));
    }
    Ok(())
}

// ─── Integrator ──────────────────────────────────────────────────────────────

/// Adaptive ROS2 integrator.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rosenbrock {
    /// Error control.
    pub tolerances: Tolerances,
}

/// Scratch buffers reused across steps of one solve.
struct Workspace {
    n: usize,
    f0: Vec<f64>,
    probe: Vec<f64>,
    fprobe: Vec<f64>,
    jacobian: DMatrix<f64>,
}

impl Workspace {
    fn new(n: usize) -> Self {
        Self {
            n,
            f0: vec![0.0; n],
            probe: vec![0.0; n],
            fprobe: vec![0.0; n],
            jacobian: DMatrix::zeros(n + 1, n + 1),
        }
    }

    /// f(t, y) into `f0` and the augmented Jacobian [[∂f/∂y, ∂f/∂t], [0, 0]].
    fn linearise<S: OdeSystem + ?Sized>(&mut self, system: &S, t: f64, y: &[f64], stats: &mut SolverStats) {
        let n = self.n;
        let sqrt_eps = f64::EPSILON.sqrt();
        system.derivative(t, y, &mut self.f0);
        stats.evaluations += 1;

        for j in 0..n {
            let delta = sqrt_eps * y[j].abs().max(1.0);
            self.probe.copy_from_slice(y);
            self.probe[j] += delta;
            system.derivative(t, &self.probe, &mut self.fprobe);
            stats.evaluations += 1;
            for i in 0..n {
                self.jacobian[(i, j)] = (self.fprobe[i] - self.f0[i]) / delta;
            }
        }

        let dt = sqrt_eps * t.abs().max(1.0);
        system.derivative(t + dt, y, &mut self.fprobe);
        stats.evaluations += 1;
        for i in 0..n {
            self.jacobian[(i, n)] = (self.fprobe[i] - self.f0[i]) / dt;
        }
    }
}

impl Rosenbrock {
    /// Integrator with the given error control.
    pub fn new(tolerances: Tolerances) -> Self {
        Self { tolerances }
    }

    /// Integrate `system` from `initial` at `grid[0]` and sample it at every
    /// grid point.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidTimeGrid`] / [`Error::InvalidParameter`] for malformed input.
    /// - [`Error::IntegrationFailed`] when the step budget is exhausted, the
    ///   step size underflows or an iteration matrix is singular.
    pub fn solve<S: OdeSystem + ?Sized>(&self, system: &S, initial: &[f64], grid: &[f64]) -> Result<Solution> {
        self.tolerances.validate()?;
        validate_grid(grid)?;
        let n = system.dimension();
        if n == 0 {
            return Err(Error::invalid("dimension", "system has no state"));
        }
        if initial.len() != n {
            return Err(Error::ShapeMismatch(format!(
                "system has {n} components, initial state has {}",
                initial.len()
            )));
        }
        if initial.iter().any(|v| !v.is_finite()) {
            return Err(Error::invalid("initial", "initial state must be finite"));
        }

        let mut stats = SolverStats::default();
        let mut work = Workspace::new(n);
        let mut t = grid[0];
        let mut y = initial.to_vec();
        let mut times = Vec::with_capacity(grid.len());
        let mut states = Vec::with_capacity(grid.len());
        times.push(t);
        states.push(y.clone());

        let span = grid[grid.len() - 1] - grid[0];
        let mut h = 0.0;
        let mut stale = true;
        if span > 0.0 {
            work.linearise(system, t, &y, &mut stats);
            stale = false;
            h = initial_step(&y, &work.f0).min(span);
        }

        let mut attempts = 0usize;
        for &target in &grid[1..] {
            while t < target {
                if attempts >= self.tolerances.max_steps {
                    return Err(Error::IntegrationFailed {
                        t,
                        reason: format!("step budget of {} exhausted", self.tolerances.max_steps),
                    });
                }
                attempts += 1;

                if stale {
                    work.linearise(system, t, &y, &mut stats);
                    stale = false;
                }
                let remaining = target - t;
                let last = h >= remaining;
                let h_try = if last { remaining } else { h };

                let (y_new, error_norm) = self.attempt(system, &mut work, t, &y, h_try, &mut stats)?;

                if error_norm <= 1.0 {
                    stats.accepted += 1;
                    t = if last { target } else { t + h_try };
                    y = y_new;
                    if let Some(bounds) = system.bounds() {
                        for (yi, &(lo, hi)) in y.iter_mut().zip(bounds) {
                            *yi = yi.clamp(lo, hi);
                        }
                    }
                    stale = true;
                    let factor = if error_norm == 0.0 {
                        MAX_FACTOR
                    } else {
                        (SAFETY / error_norm.sqrt()).clamp(MIN_FACTOR, MAX_FACTOR)
                    };
                    // A step shortened to land on the grid does not shrink the proposal.
                    h = if last { h.max(h_try * factor) } else { h_try * factor };
                } else {
                    stats.rejected += 1;
                    let factor = if error_norm.is_finite() {
                        (SAFETY / error_norm.sqrt()).clamp(MIN_FACTOR, 1.0)
                    } else {
                        MIN_FACTOR
                    };
                    h = h_try * factor;
                    if h <= 1e-14 * t.abs().max(1.0) {
                        return Err(Error::IntegrationFailed {
                            t,
                            reason: format!("step size underflow (h = {h:e})"),
                        });
                    }
                }
            }
            times.push(target);
            states.push(y.clone());
        }

        debug!(
            accepted = stats.accepted,
            rejected = stats.rejected,
            evaluations = stats.evaluations,
            points = grid.len(),
            "rosenbrock solve finished"
        );
        Ok(Solution { times, states, stats })
    }

    /// One ROS2 step of size `h` from `(t, y)`; returns the candidate state
    /// and its scaled RMS error (infinite when the candidate is not finite).
    fn attempt<S: OdeSystem + ?Sized>(
        &self,
        system: &S,
        work: &mut Workspace,
        t: f64,
        y: &[f64],
        h: f64,
        stats: &mut SolverStats,
    ) -> Result<(Vec<f64>, f64)> {
        let n = work.n;
        let m = n + 1;
        let matrix = DMatrix::<f64>::identity(m, m) - &work.jacobian * (GAMMA * h);
        let lu = matrix.lu();
        let singular = || Error::IntegrationFailed {
            t,
            reason: "singular iteration matrix".into(),
        };

        let mut rhs = DVector::<f64>::zeros(m);
        for i in 0..n {
            rhs[i] = work.f0[i];
        }
        rhs[n] = 1.0;
        let k1 = lu.solve(&rhs).ok_or_else(singular)?;

        for i in 0..n {
            work.probe[i] = y[i] + h * k1[i];
        }
        system.derivative(t + h * k1[n], &work.probe, &mut work.fprobe);
        stats.evaluations += 1;
        for i in 0..n {
            rhs[i] = work.fprobe[i] - 2.0 * k1[i];
        }
        rhs[n] = 1.0 - 2.0 * k1[n];
        let k2 = lu.solve(&rhs).ok_or_else(singular)?;

        let mut y_new = Vec::with_capacity(n);
        let mut sum_sq = 0.0;
        for i in 0..n {
            let yi = y[i] + h * (1.5 * k1[i] + 0.5 * k2[i]);
            let err = 0.5 * h * (k1[i] + k2[i]);
            let scale = self.tolerances.absolute + self.tolerances.relative * y[i].abs().max(yi.abs());
            sum_sq += (err / scale).powi(2);
            y_new.push(yi);
        }
        let norm = (sum_sq / n as f64).sqrt();
        if !norm.is_finite() || y_new.iter().any(|v| !v.is_finite()) {
            return Ok((y_new, f64::INFINITY));
        }
        Ok((y_new, norm))
    }
}

fn initial_step(y: &[f64], f: &[f64]) -> f64 {
    let y_max = y.iter().fold(0.0f64, |acc, v| acc.max(v.abs()));
    let f_max = f.iter().fold(0.0f64, |acc, v| acc.max(v.abs()));
    if y_max < 1e-5 || f_max < 1e-5 {
        1e-6
    } else {
        0.01 * y_max / f_max
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numeric::linspace;

    struct Decay {
        rate: f64,
    }

    impl OdeSystem for Decay {
        fn dimension(&self) -> usize {
            1
        }
        fn derivative(&self, _t: f64, y: &[f64], out: &mut [f64]) {
            out[0] = -self.rate * y[0];
        }
    }

    /// y' = −k(y − cos t): stiff relaxation onto a moving target.
    struct Tracking {
        rate: f64,
    }

    impl OdeSystem for Tracking {
        fn dimension(&self) -> usize {
            1
        }
        fn derivative(&self, t: f64, y: &[f64], out: &mut [f64]) {
            out[0] = -self.rate * (y[0] - t.cos());
        }
    }

    struct Clamped {
        bounds: [(f64, f64); 2],
    }

    impl OdeSystem for Clamped {
        fn dimension(&self) -> usize {
            2
        }
        fn derivative(&self, _t: f64, _y: &[f64], out: &mut [f64]) {
            out[0] = 1.0;
            out[1] = -10.0;
        }
        fn bounds(&self) -> Option<&[(f64, f64)]> {
            Some(&self.bounds)
        }
    }

    #[test]
    fn test_exponential_decay() {
        let grid = linspace(0.0, 5.0, 11);
        let sol = Rosenbrock::default().solve(&Decay { rate: 0.7 }, &[2.0], &grid).unwrap();
        for (t, s) in sol.times().iter().zip(sol.states()) {
            let exact = 2.0 * (-0.7 * t).exp();
            assert!((s[0] - exact).abs() < 1e-4, "t={} got {} want {}", t, s[0], exact);
        }
        assert_eq!(sol.times(), grid.as_slice());
    }

    #[test]
    fn test_precise_tolerances_tighten_error() {
        let grid = [0.0, 1.0];
        let sol = Rosenbrock::new(Tolerances::precise())
            .solve(&Decay { rate: 1.0 }, &[1.0], &grid)
            .unwrap();
        let end = sol.final_state().unwrap()[0];
        assert!((end - (-1.0f64).exp()).abs() < 1e-7, "got {}", end);
    }

    #[test]
    fn test_stiff_tracking_stays_cheap() {
        let grid = linspace(0.0, 10.0, 50);
        let sol = Rosenbrock::default().solve(&Tracking { rate: 1e5 }, &[1.0], &grid).unwrap();
        let end = sol.final_state().unwrap()[0];
        assert!((end - 10f64.cos()).abs() < 1e-3, "got {}", end);
        assert!(sol.stats().accepted < 20_000, "took {} steps", sol.stats().accepted);
    }

    #[test]
    fn test_bounds_are_applied() {
        let system = Clamped {
            bounds: [(f64::NEG_INFINITY, f64::INFINITY), (-2.0, 5.0)],
        };
        let sol = Rosenbrock::default().solve(&system, &[0.0, 0.0], &[0.0, 1.0]).unwrap();
        let end = sol.final_state().unwrap();
        assert!((end[0] - 1.0).abs() < 1e-9);
        assert_eq!(end[1], -2.0);
    }

    #[test]
    fn test_single_point_grid_returns_initial_state() {
        let sol = Rosenbrock::default().solve(&Decay { rate: 1.0 }, &[0.4], &[3.0]).unwrap();
        assert_eq!(sol.states(), &[vec![0.4]]);
        assert_eq!(sol.stats().accepted, 0);
    }

    #[test]
    fn test_repeated_grid_points_are_sampled_twice() {
        let sol = Rosenbrock::default().solve(&Decay { rate: 1.0 }, &[1.0], &[0.0, 0.5, 0.5]).unwrap();
        assert_eq!(sol.states()[1], sol.states()[2]);
    }

    #[test]
    fn test_malformed_inputs_fail_fast() {
        let solver = Rosenbrock::default();
        let decay = Decay { rate: 1.0 };
        assert!(matches!(solver.solve(&decay, &[1.0], &[]), Err(Error::InvalidTimeGrid(_))));
        assert!(matches!(solver.solve(&decay, &[1.0], &[1.0, 0.0]), Err(Error::InvalidTimeGrid(_))));
        assert!(matches!(solver.solve(&decay, &[1.0, 2.0], &[0.0, 1.0]), Err(Error::ShapeMismatch(_))));
        let tight = Rosenbrock::new(Tolerances {
            max_steps: 3,
            ..Tolerances::default()
        });
        assert!(matches!(
            tight.solve(&decay, &[1.0], &[0.0, 100.0]),
            Err(Error::IntegrationFailed { .. })
        ));
    }
}
