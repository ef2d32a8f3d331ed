//! Piecewise-linear trends with changepoints
//!
//! A trend is `intercept + slope * t + sum_j delta_j * max(t - s_j, 0)` where the
//! `s_j` are changepoint locations on the scaled time axis. Logistic growth passes
//! the same shape through [`sigmoid`] and scales it by a capacity, see
//! [`fit_logistic_trend`].

use crate::matrix::{cholesky_solve, Matrix};
use crate::regression::RidgeRegression;
use crate::{MathError, Result};
use serde::{Deserialize, Serialize};

/// Smallest ratio admitted by [`logit`] before clamping
pub const LOGIT_EPSILON: f64 = 1e-3;

const MAX_LOGISTIC_ITERATIONS: usize = 100;
const LOGISTIC_TOLERANCE: f64 = 1e-12;
const MAX_DAMPING: f64 = 1e12;

/// Place changepoints uniformly over the first `changepoint_range` share of `t`.
///
/// `t` must be sorted ascending. The first observation is never a changepoint.
pub fn changepoint_locations(
    t: &[f64],
    n_changepoints: usize,
    changepoint_range: f64,
) -> Result<Vec<f64>> {
    if !(0.0..=1.0).contains(&changepoint_range) {
        return Err(MathError::InvalidInput(format!(
            "Changepoint range must be within [0, 1], got {}",
            changepoint_range
        )));
    }

    let hist_size = (t.len() as f64 * changepoint_range).floor() as usize;
    let n = n_changepoints.min(hist_size.saturating_sub(1));
    if n == 0 {
        return Ok(Vec::new());
    }

    let last = (hist_size - 1) as f64;
    let mut locations = Vec::with_capacity(n);
    for i in 1..=n {
        let idx = (i as f64 * last / n as f64).round() as usize;
        locations.push(t[idx]);
    }
    Ok(locations)
}

/// Design matrix `[1, t, (t - s_1)+, ..., (t - s_k)+]`
pub fn piecewise_design(t: &[f64], changepoints: &[f64]) -> Matrix {
    let cols = 2 + changepoints.len();
    let mut m = Matrix::zeros(t.len(), cols);
    for (r, &ti) in t.iter().enumerate() {
        m.set(r, 0, 1.0);
        m.set(r, 1, ti);
        for (j, &s) in changepoints.iter().enumerate() {
            if ti > s {
                m.set(r, 2 + j, ti - s);
            }
        }
    }
    m
}

/// A fitted piecewise-linear trend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PiecewiseLinear {
    /// Value at `t = 0`
    pub intercept: f64,
    /// Initial growth rate
    pub slope: f64,
    /// Changepoint locations on the scaled time axis
    pub changepoints: Vec<f64>,
    /// Rate adjustments applied after each changepoint
    pub deltas: Vec<f64>,
}

impl PiecewiseLinear {
    /// Build a trend from coefficients laid out as in [`piecewise_design`]
    pub fn from_coefficients(changepoints: Vec<f64>, coefficients: &[f64]) -> Result<Self> {
        if coefficients.len() != changepoints.len() + 2 {
            return Err(MathError::DimensionMismatch {
                expected: changepoints.len() + 2,
                actual: coefficients.len(),
            });
        }
        Ok(Self {
            intercept: coefficients[0],
            slope: coefficients[1],
            changepoints,
            deltas: coefficients[2..].to_vec(),
        })
    }

    /// Evaluate the trend at `t`
    pub fn value(&self, t: f64) -> f64 {
        let bends: f64 = self
            .changepoints
            .iter()
            .zip(&self.deltas)
            .filter(|(s, _)| t > **s)
            .map(|(s, d)| d * (t - s))
            .sum();
        self.intercept + self.slope * t + bends
    }

    /// Growth rate in effect at `t`
    pub fn rate_at(&self, t: f64) -> f64 {
        self.slope
            + self
                .changepoints
                .iter()
                .zip(&self.deltas)
                .filter(|(s, _)| t > **s)
                .map(|(_, d)| d)
                .sum::<f64>()
    }

    /// Mean absolute rate change, the scale used when simulating future changes
    pub fn mean_abs_delta(&self) -> f64 {
        if self.deltas.is_empty() {
            return 0.0;
        }
        self.deltas.iter().map(|d| d.abs()).sum::<f64>() / self.deltas.len() as f64
    }
}

/// Log-odds of a ratio, clamped to `[LOGIT_EPSILON, 1 - LOGIT_EPSILON]`
pub fn logit(ratio: f64) -> f64 {
    let p = ratio.clamp(LOGIT_EPSILON, 1.0 - LOGIT_EPSILON);
    (p / (1.0 - p)).ln()
}

/// Logistic function
pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Fit `cap * sigmoid(X b)` to `y` by penalized least squares on the original scale.
///
/// The objective is `||y - cap * sigmoid(X b)||^2 + sum_j penalty_j * b_j^2`. The
/// starting point is a ridge fit on `logit(y / cap)` restricted to rows whose ratio
/// lies inside the clamping band, so observations at or above the capacity do not
/// drag the start. Levenberg-Marquardt steps then refine it against every row.
pub fn fit_logistic_trend(
    design: &Matrix,
    y: &[f64],
    cap: &[f64],
    penalties: &[f64],
) -> Result<Vec<f64>> {
    let n = design.rows();
    for len in [y.len(), cap.len()] {
        if len != n {
            return Err(MathError::DimensionMismatch {
                expected: n,
                actual: len,
            });
        }
    }
    if let Some(bad) = cap.iter().find(|c| !c.is_finite() || **c <= 0.0) {
        return Err(MathError::InvalidInput(format!(
            "Capacity must be finite and positive, got {}",
            bad
        )));
    }

    let ridge = RidgeRegression::new(penalties.to_vec())?;
    let ratio: Vec<f64> = y.iter().zip(cap).map(|(v, c)| v / c).collect();
    let inside: Vec<usize> = (0..n)
        .filter(|&i| ratio[i] > LOGIT_EPSILON && ratio[i] < 1.0 - LOGIT_EPSILON)
        .collect();
    let mut beta = if inside.len() >= 2 {
        let rows: Vec<Vec<f64>> = inside.iter().map(|&i| design.row(i).to_vec()).collect();
        let target: Vec<f64> = inside.iter().map(|&i| logit(ratio[i])).collect();
        ridge.fit(&Matrix::from_rows(&rows)?, &target)?
    } else {
        let target: Vec<f64> = ratio.iter().map(|r| logit(*r)).collect();
        ridge.fit(design, &target)?
    };

    let objective = |b: &[f64]| -> Result<f64> {
        let eta = design.mul_vec(b)?;
        let sse: f64 = eta
            .iter()
            .zip(y.iter().zip(cap))
            .map(|(e, (v, c))| (v - c * sigmoid(*e)).powi(2))
            .sum();
        let prior: f64 = b.iter().zip(penalties).map(|(b, p)| p * b * b).sum();
        Ok(sse + prior)
    };

    let mut current = objective(&beta)?;
    let mut damping = 1e-3;
    for _ in 0..MAX_LOGISTIC_ITERATIONS {
        let eta = design.mul_vec(&beta)?;
        let mut jacobian = Matrix::zeros(n, design.cols());
        let mut residuals = Vec::with_capacity(n);
        for (i, e) in eta.iter().enumerate() {
            let s = sigmoid(*e);
            let slope = cap[i] * s * (1.0 - s);
            for (j, x) in design.row(i).iter().enumerate() {
                jacobian.set(i, j, slope * x);
            }
            residuals.push(y[i] - cap[i] * s);
        }

        // negative half-gradient of the penalized objective
        let mut gradient = jacobian.transpose_mul_vec(&residuals)?;
        for (g, (b, p)) in gradient.iter_mut().zip(beta.iter().zip(penalties)) {
            *g -= p * b;
        }
        let normal = jacobian.gram();

        let mut gain = None;
        while damping < MAX_DAMPING {
            let mut system = normal.clone();
            for (j, p) in penalties.iter().enumerate() {
                system.set(j, j, system.get(j, j) + p + damping);
            }
            let step = match cholesky_solve(&system, &gradient) {
                Ok(step) => step,
                Err(_) => {
                    damping *= 10.0;
                    continue;
                }
            };
            let candidate: Vec<f64> = beta.iter().zip(&step).map(|(b, d)| b + d).collect();
            let value = objective(&candidate)?;
            if value.is_finite() && value <= current {
                gain = Some(current - value);
                beta = candidate;
                current = value;
                damping = (damping / 10.0).max(1e-12);
                break;
            }
            damping *= 10.0;
        }

        match gain {
            Some(g) if g > LOGISTIC_TOLERANCE * current.max(1.0) => {}
            _ => break,
        }
    }

    if beta.iter().any(|b| !b.is_finite()) {
        return Err(MathError::CalculationError(
            "Logistic trend produced non-finite coefficients".to_string(),
        ));
    }
    Ok(beta)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_changepoint_locations() {
        let t: Vec<f64> = (0..101).map(|i| i as f64 / 100.0).collect();
        let cps = changepoint_locations(&t, 4, 0.8).unwrap();
        assert_eq!(cps.len(), 4);
        assert_relative_eq!(cps[0], 0.20);
        assert_relative_eq!(cps[3], 0.79);
        assert!(cps.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_changepoints_limited_by_history() {
        let t = vec![0.0, 0.5, 1.0];
        // floor(3 * 0.8) = 2 rows in range, so at most one changepoint
        let cps = changepoint_locations(&t, 25, 0.8).unwrap();
        assert_eq!(cps, vec![0.5]);

        let none = changepoint_locations(&[0.0, 1.0], 25, 0.8).unwrap();
        assert!(none.is_empty());

        assert!(changepoint_locations(&t, 2, 1.5).is_err());
    }

    #[test]
    fn test_piecewise_value_matches_design() {
        let trend = PiecewiseLinear::from_coefficients(vec![0.5], &[1.0, 2.0, -4.0]).unwrap();
        assert_relative_eq!(trend.value(0.25), 1.5);
        // after the changepoint the rate is 2 - 4 = -2
        assert_relative_eq!(trend.value(1.0), 1.0 + 2.0 - 2.0);
        assert_relative_eq!(trend.rate_at(0.75), -2.0);
        assert_relative_eq!(trend.mean_abs_delta(), 4.0);

        let design = piecewise_design(&[0.25, 1.0], &[0.5]);
        assert_eq!(design.row(1), &[1.0, 1.0, 0.5]);
    }

    fn logistic_series(n: usize, a: f64, b: f64) -> (Matrix, Vec<f64>) {
        let t: Vec<f64> = (0..n).map(|i| i as f64 / (n - 1) as f64).collect();
        let design = piecewise_design(&t, &[]);
        let y = t.iter().map(|ti| sigmoid(a + b * ti)).collect();
        (design, y)
    }

    #[test]
    fn test_logistic_fit_recovers_curve() {
        let (design, y) = logistic_series(50, 1.5, -3.0);
        let cap = vec![1.0; 50];
        let beta = fit_logistic_trend(&design, &y, &cap, &[0.0, 0.0]).unwrap();
        assert_relative_eq!(beta[0], 1.5, epsilon = 1e-6);
        assert_relative_eq!(beta[1], -3.0, epsilon = 1e-6);
    }

    #[test]
    fn test_logistic_fit_with_rows_above_capacity() {
        let (design, truth) = logistic_series(50, 4.0, -6.0);
        let cap = vec![1.0; 50];
        let mut y = truth.clone();
        for v in y.iter_mut().take(10) {
            *v = 1.3;
        }

        let beta = fit_logistic_trend(&design, &y, &cap, &[0.0, 0.0]).unwrap();
        let fitted: Vec<f64> = design
            .mul_vec(&beta)
            .unwrap()
            .into_iter()
            .map(sigmoid)
            .collect();

        for (f, expected) in fitted.iter().zip(&truth).skip(10) {
            assert!((f - expected).abs() < 0.05, "{} vs {}", f, expected);
        }
        assert!(fitted.iter().all(|f| *f > 0.0 && *f < 1.0));

        // a plain regression in logit space is pulled far off by the clamped rows
        let clamped: Vec<f64> = y.iter().map(|v| logit(*v)).collect();
        let naive = RidgeRegression::new(vec![0.0, 0.0])
            .unwrap()
            .fit(&design, &clamped)
            .unwrap();
        let naive_last = sigmoid(naive[0] + naive[1]);
        let fitted_last = fitted[49];
        assert!((fitted_last - truth[49]).abs() < (naive_last - truth[49]).abs());
    }

    #[test]
    fn test_logistic_fit_rejects_bad_capacity() {
        let (design, y) = logistic_series(5, 0.0, 1.0);
        assert!(fit_logistic_trend(&design, &y, &[1.0, 1.0, 0.0, 1.0, 1.0], &[0.0, 0.0]).is_err());
        assert!(fit_logistic_trend(&design, &y, &[1.0; 3], &[0.0, 0.0]).is_err());
    }

    #[test]
    fn test_logit_roundtrip() {
        assert_relative_eq!(sigmoid(logit(0.3)), 0.3, epsilon = 1e-12);
        assert_relative_eq!(sigmoid(logit(2.0)), 1.0 - LOGIT_EPSILON, epsilon = 1e-12);
    }
}
