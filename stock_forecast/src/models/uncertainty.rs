//! Uncertainty intervals from simulated trend paths and observation noise
//!
//! Each simulated path adds future rate changes to the fitted trend. The number
//! of changes past the end of the history follows a Poisson law with the
//! historical changepoint frequency, and their magnitudes follow a Laplace law
//! whose scale is the mean absolute historical change. Gaussian noise with the
//! residual scale is added on top, and bounds are empirical quantiles of the
//! simulated values.

use super::additive::combine;
use crate::config::SeasonalityMode;
use crate::error::{ForecastError, Result};
use crate::settings::EngineSettings;
use forecast_math::trend::{sigmoid, PiecewiseLinear};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal, Poisson};
use statrs::distribution::{ContinuousCDF, Normal as StandardNormal};
use statrs::statistics::{Data, OrderStatistics};

/// Scaled inputs of a prediction
pub(crate) struct PathInputs<'a> {
    /// Scaled time of every row
    pub t: &'a [f64],
    /// Fitted trend, in logit space under logistic growth
    pub trend: &'a PiecewiseLinear,
    /// Scaled capacity per row under logistic growth
    pub capacity: Option<&'a [f64]>,
    /// Sum of all seasonal and holiday terms per row
    pub components: &'a [f64],
    pub mode: SeasonalityMode,
    /// Residual standard deviation
    pub sigma: f64,
}

#[derive(Debug, Clone, Copy)]
struct RateChange {
    location: f64,
    delta: f64,
}

/// Lower and upper bound for every row, in the scaled units of `point`
pub(crate) fn intervals(
    inputs: &PathInputs<'_>,
    point: &[f64],
    settings: &EngineSettings,
) -> Result<Vec<(f64, f64)>> {
    let lower_q = (1.0 - settings.interval_width) / 2.0;
    let upper_q = 1.0 - lower_q;

    if settings.uncertainty_samples == 0 {
        return gaussian_intervals(point, inputs.sigma, upper_q);
    }

    let mut rng = StdRng::seed_from_u64(settings.seed);
    let paths = simulate_rate_changes(inputs, settings.uncertainty_samples, &mut rng)?;
    let noise = Normal::new(0.0, inputs.sigma).map_err(|e| {
        ForecastError::ForecastingError(format!("Invalid noise scale {}: {}", inputs.sigma, e))
    })?;

    let mut bounds = Vec::with_capacity(inputs.t.len());
    for (i, &t) in inputs.t.iter().enumerate() {
        let base = inputs.trend.value(t);
        let mut draws = Vec::with_capacity(paths.len());
        for changes in &paths {
            let eta = base
                + changes
                    .iter()
                    .filter(|c| t > c.location)
                    .map(|c| c.delta * (t - c.location))
                    .sum::<f64>();
            let trend = match inputs.capacity {
                Some(cap) => cap[i] * sigmoid(eta),
                None => eta,
            };
            draws.push(combine(trend, inputs.components[i], inputs.mode) + noise.sample(&mut rng));
        }
        let mut data = Data::new(draws);
        // Bounds always bracket the point estimate
        bounds.push((
            data.quantile(lower_q).min(point[i]),
            data.quantile(upper_q).max(point[i]),
        ));
    }
    Ok(bounds)
}

/// Future rate changes for every simulated path
fn simulate_rate_changes(
    inputs: &PathInputs<'_>,
    samples: usize,
    rng: &mut StdRng,
) -> Result<Vec<Vec<RateChange>>> {
    let t_max = inputs.t.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let frequency = inputs.trend.changepoints.len() as f64;
    let scale = inputs.trend.mean_abs_delta();
    if t_max <= 1.0 || frequency == 0.0 || scale == 0.0 {
        return Ok(vec![Vec::new(); samples]);
    }

    let count = Poisson::new(frequency * (t_max - 1.0))
        .map_err(|e| ForecastError::ForecastingError(format!("Invalid change rate: {}", e)))?;
    let mut paths = Vec::with_capacity(samples);
    for _ in 0..samples {
        let n: f64 = count.sample(rng);
        let mut changes = Vec::with_capacity(n as usize);
        for _ in 0..n as usize {
            changes.push(RateChange {
                location: 1.0 + rng.gen::<f64>() * (t_max - 1.0),
                delta: laplace(rng, scale),
            });
        }
        paths.push(changes);
    }
    Ok(paths)
}

/// Draw from a zero-centered Laplace distribution by inverting its CDF
fn laplace(rng: &mut StdRng, scale: f64) -> f64 {
    let u: f64 = rng.gen::<f64>() - 0.5;
    let u = u.clamp(-0.5 + f64::EPSILON, 0.5 - f64::EPSILON);
    -scale * u.signum() * (1.0 - 2.0 * u.abs()).ln()
}

/// Symmetric bounds from the residual scale alone
fn gaussian_intervals(point: &[f64], sigma: f64, upper_q: f64) -> Result<Vec<(f64, f64)>> {
    let z = StandardNormal::new(0.0, 1.0)
        .map_err(|e| ForecastError::ForecastingError(e.to_string()))?
        .inverse_cdf(upper_q);
    Ok(point
        .iter()
        .map(|p| (p - z * sigma, p + z * sigma))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trend() -> PiecewiseLinear {
        PiecewiseLinear {
            intercept: 1.0,
            slope: 0.5,
            changepoints: vec![0.25, 0.5, 0.75],
            deltas: vec![0.1, -0.2, 0.1],
        }
    }

    #[test]
    fn test_gaussian_intervals_are_symmetric() {
        let bounds = gaussian_intervals(&[1.0, 2.0], 0.1, 0.9).unwrap();
        let (lower, upper) = bounds[0];
        assert!((1.0 - lower - (upper - 1.0)).abs() < 1e-12);
        // z(0.9) is about 1.2816
        assert!((upper - 1.0 - 0.12816).abs() < 1e-4);
    }

    #[test]
    fn test_sampled_intervals_are_deterministic_and_widen() {
        let trend = trend();
        let t = [0.5, 1.0, 1.5];
        let point: Vec<f64> = t.iter().map(|x| trend.value(*x)).collect();
        let components = [0.0; 3];
        let inputs = PathInputs {
            t: &t,
            trend: &trend,
            capacity: None,
            components: &components,
            mode: SeasonalityMode::Additive,
            sigma: 0.01,
        };
        let settings = EngineSettings {
            uncertainty_samples: 500,
            seed: 7,
            ..EngineSettings::default()
        };

        let first = intervals(&inputs, &point, &settings).unwrap();
        let second = intervals(&inputs, &point, &settings).unwrap();
        assert_eq!(first, second);

        for (lower, upper) in &first {
            assert!(lower <= upper);
        }
        let width = |(l, u): (f64, f64)| u - l;
        assert!(width(first[2]) > width(first[0]));
    }

    #[test]
    fn test_laplace_is_finite() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..1000 {
            assert!(laplace(&mut rng, 0.3).is_finite());
        }
    }
}
