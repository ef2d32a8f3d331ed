//! Additive regression model
//!
//! The fitted value is `trend + components` in additive mode and
//! `trend * (1 + components)` in multiplicative mode. The trend is piecewise
//! linear with changepoints, or a logistic curve bounded by a capacity column.
//! Components are Fourier seasonalities and holiday indicators.
//!
//! Training proceeds in two penalized least-squares passes: the trend is fitted
//! on the scaled series, then the components are fitted on what the trend
//! leaves unexplained. Penalties derive from the prior scales in
//! [`EngineSettings`].

use super::holidays::{HolidayFeatures, HOLIDAYS_COMPONENT};
use super::uncertainty::{self, PathInputs};
use super::{ForecastModel, ModelSpec, Timeline, TrainedForecastModel};
use crate::config::{GrowthKind, SeasonalityMode};
use crate::data::PreparedSeries;
use crate::error::{ForecastError, Result};
use crate::forecast::{Forecast, ForecastComponent, ForecastRow};
use crate::settings::EngineSettings;
use chrono::NaiveDate;
use forecast_math::statistics::{abs_max, std_dev};
use forecast_math::trend::{
    changepoint_locations, fit_logistic_trend, piecewise_design, sigmoid, PiecewiseLinear,
};
use forecast_math::{MathError, Matrix, RidgeRegression};
use std::iter;
use tracing::{debug, info};

/// Observation noise assumed when converting prior scales to penalties
const NOISE_SCALE: f64 = 0.05;
/// Prior scale of the initial growth rate
const SLOPE_PRIOR_SCALE: f64 = 5.0;
/// Trend values closer to zero than this cannot carry multiplicative terms
const MIN_MULTIPLICATIVE_TREND: f64 = 1e-10;

/// Combine a trend value with the summed components
pub(crate) fn combine(trend: f64, components: f64, mode: SeasonalityMode) -> f64 {
    match mode {
        SeasonalityMode::Additive => trend + components,
        SeasonalityMode::Multiplicative => trend * (1.0 + components),
    }
}

fn fit_error(e: MathError) -> ForecastError {
    ForecastError::FitError(format!("Optimization did not converge: {}", e))
}

/// Map dates onto `[0, 1]` over the training span
fn scaled_time(dates: &[NaiveDate], start: NaiveDate, span_days: f64) -> Vec<f64> {
    dates
        .iter()
        .map(|d| (*d - start).num_days() as f64 / span_days)
        .collect()
}

fn trend_value(trend: &PiecewiseLinear, t: f64, capacity: Option<f64>) -> f64 {
    let eta = trend.value(t);
    match capacity {
        Some(cap) => cap * sigmoid(eta),
        None => eta,
    }
}

/// Contiguous column range of one component in the component design
#[derive(Debug, Clone, PartialEq)]
struct ComponentBlock {
    name: String,
    period: Option<f64>,
    start: usize,
    end: usize,
}

fn component_design(
    spec: &ModelSpec,
    holidays: &HolidayFeatures,
    dates: &[NaiveDate],
) -> Result<(Matrix, Vec<ComponentBlock>)> {
    let mut design = Matrix::zeros(dates.len(), 0);
    let mut blocks = Vec::with_capacity(spec.seasonalities().len() + 1);

    for seasonality in spec.seasonalities() {
        let start = design.cols();
        design = design.hstack(&seasonality.features(dates)?)?;
        blocks.push(ComponentBlock {
            name: seasonality.name().to_string(),
            period: Some(seasonality.period()),
            start,
            end: design.cols(),
        });
    }

    if !holidays.is_empty() {
        let start = design.cols();
        design = design.hstack(&holidays.features(dates)?)?;
        blocks.push(ComponentBlock {
            name: HOLIDAYS_COMPONENT.to_string(),
            period: None,
            start,
            end: design.cols(),
        });
    }

    Ok((design, blocks))
}

/// Untrained additive regression model
#[derive(Debug, Clone)]
pub struct AdditiveModel {
    name: String,
    spec: ModelSpec,
    settings: EngineSettings,
}

impl AdditiveModel {
    /// Create a new model from its configuration and engine settings
    pub fn new(spec: ModelSpec, settings: EngineSettings) -> Result<Self> {
        settings.validate()?;
        let name = format!(
            "Additive regression ({} growth, {} seasonality)",
            spec.growth(),
            spec.seasonality_mode()
        );
        Ok(Self {
            name,
            spec,
            settings,
        })
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    fn component_penalties(&self, blocks: &[ComponentBlock]) -> Result<Vec<f64>> {
        let mut penalties = Vec::new();
        for block in blocks {
            let prior = if block.period.is_some() {
                self.settings.seasonality_prior_scale
            } else {
                self.settings.holidays_prior_scale
            };
            let penalty = RidgeRegression::prior_penalty(NOISE_SCALE, prior)?;
            penalties.extend(iter::repeat(penalty).take(block.end - block.start));
        }
        Ok(penalties)
    }
}

impl ForecastModel for AdditiveModel {
    type Trained = TrainedAdditiveModel;

    fn train(&self, data: &PreparedSeries) -> Result<Self::Trained> {
        let timestamps = data.timestamps();
        let n = timestamps.len();
        if n < 2 {
            return Err(ForecastError::FitError(format!(
                "Need at least 2 distinct timestamps, got {}",
                n
            )));
        }

        let y_scale = match abs_max(data.values())? {
            s if s > 0.0 => s,
            _ => 1.0,
        };
        let y: Vec<f64> = data.values().iter().map(|v| v / y_scale).collect();

        let capacity: Option<Vec<f64>> = match self.spec.growth() {
            GrowthKind::Logistic => {
                let cap = data.capacity().ok_or_else(|| {
                    ForecastError::FitError(
                        "Logistic growth needs a capacity on every row".to_string(),
                    )
                })?;
                Some(cap.iter().map(|c| c / y_scale).collect())
            }
            GrowthKind::Linear => None,
        };

        let start = timestamps[0];
        let span_days = (timestamps[n - 1] - start).num_days() as f64;
        let t = scaled_time(timestamps, start, span_days);

        // Trend pass
        let changepoints = changepoint_locations(
            &t,
            self.settings.n_changepoints,
            self.settings.changepoint_range,
        )
        .map_err(fit_error)?;
        let trend_design = piecewise_design(&t, &changepoints);
        let delta_penalty =
            RidgeRegression::prior_penalty(NOISE_SCALE, self.settings.changepoint_prior_scale)?;
        let mut penalties = vec![0.0, RidgeRegression::prior_penalty(NOISE_SCALE, SLOPE_PRIOR_SCALE)?];
        penalties.extend(iter::repeat(delta_penalty).take(changepoints.len()));
        let coefficients = match &capacity {
            Some(cap) => fit_logistic_trend(&trend_design, &y, cap, &penalties),
            None => RidgeRegression::new(penalties)?.fit(&trend_design, &y),
        }
        .map_err(fit_error)?;
        let trend = PiecewiseLinear::from_coefficients(changepoints, &coefficients)?;
        let trend_fit: Vec<f64> = t
            .iter()
            .enumerate()
            .map(|(i, &ti)| trend_value(&trend, ti, capacity.as_ref().map(|c| c[i])))
            .collect();

        // Component pass
        let mode = self.spec.seasonality_mode();
        let residual_target: Vec<f64> = match mode {
            SeasonalityMode::Additive => y.iter().zip(&trend_fit).map(|(v, tr)| v - tr).collect(),
            SeasonalityMode::Multiplicative => {
                if trend_fit.iter().any(|tr| tr.abs() < MIN_MULTIPLICATIVE_TREND) {
                    return Err(ForecastError::FitError(
                        "Trend reaches zero, multiplicative components are undefined".to_string(),
                    ));
                }
                y.iter()
                    .zip(&trend_fit)
                    .map(|(v, tr)| v / tr - 1.0)
                    .collect()
            }
        };
        let holidays = HolidayFeatures::new(self.spec.holidays());
        let (design, blocks) = component_design(&self.spec, &holidays, timestamps)?;
        let beta = RidgeRegression::new(self.component_penalties(&blocks)?)?
            .fit(&design, &residual_target)
            .map_err(fit_error)?;

        let components = design.mul_vec(&beta)?;
        let residuals: Vec<f64> = y
            .iter()
            .zip(trend_fit.iter().zip(&components))
            .map(|(v, (tr, c))| v - combine(*tr, *c, mode))
            .collect();
        let sigma = std_dev(&residuals)?;
        if !sigma.is_finite() {
            return Err(ForecastError::FitError(
                "Fitted values are not finite".to_string(),
            ));
        }

        info!(
            model = %self.name,
            observations = n,
            changepoints = trend.changepoints.len(),
            components = blocks.len(),
            holidays = holidays.width(),
            residual_scale = sigma * y_scale,
            "Model trained"
        );

        Ok(TrainedAdditiveModel {
            name: self.name.clone(),
            spec: self.spec.clone(),
            settings: self.settings.clone(),
            history: timestamps.to_vec(),
            start,
            span_days,
            y_scale,
            trend,
            holidays,
            beta,
            sigma,
        })
    }

    fn spec(&self) -> &ModelSpec {
        &self.spec
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Additive regression model with fitted parameters
#[derive(Debug, Clone)]
pub struct TrainedAdditiveModel {
    name: String,
    spec: ModelSpec,
    settings: EngineSettings,
    history: Vec<NaiveDate>,
    start: NaiveDate,
    span_days: f64,
    y_scale: f64,
    trend: PiecewiseLinear,
    holidays: HolidayFeatures,
    beta: Vec<f64>,
    sigma: f64,
}

impl TrainedAdditiveModel {
    pub fn spec(&self) -> &ModelSpec {
        &self.spec
    }

    /// Fitted trend on the scaled axes
    pub fn trend(&self) -> &PiecewiseLinear {
        &self.trend
    }

    /// Residual standard deviation in price units
    pub fn residual_scale(&self) -> f64 {
        self.sigma * self.y_scale
    }
}

impl TrainedForecastModel for TrainedAdditiveModel {
    fn history_timestamps(&self) -> &[NaiveDate] {
        &self.history
    }

    fn predict(&self, timeline: &Timeline) -> Result<Forecast> {
        if timeline.is_empty() {
            return Err(ForecastError::ForecastingError(
                "Cannot predict over an empty timeline".to_string(),
            ));
        }
        let dates = timeline.timestamps();

        let raw_capacity = match self.spec.growth() {
            GrowthKind::Logistic => Some(timeline.capacity().ok_or_else(|| {
                ForecastError::ForecastingError(
                    "Logistic growth needs a capacity on every timeline row".to_string(),
                )
            })?),
            GrowthKind::Linear => None,
        };
        let capacity: Option<Vec<f64>> =
            raw_capacity.map(|cap| cap.iter().map(|c| c / self.y_scale).collect());

        let t = scaled_time(dates, self.start, self.span_days);
        let trend: Vec<f64> = t
            .iter()
            .enumerate()
            .map(|(i, &ti)| trend_value(&self.trend, ti, capacity.as_ref().map(|c| c[i])))
            .collect();

        let mode = self.spec.seasonality_mode();
        let (design, blocks) = component_design(&self.spec, &self.holidays, dates)?;
        let mut total = vec![0.0; dates.len()];
        let mut components = Vec::with_capacity(blocks.len());
        for block in &blocks {
            let values = design
                .columns(block.start, block.end)?
                .mul_vec(&self.beta[block.start..block.end])?;
            for (acc, v) in total.iter_mut().zip(&values) {
                *acc += v;
            }
            // Multiplicative terms stay relative to the trend
            let values = match mode {
                SeasonalityMode::Additive => values.iter().map(|v| v * self.y_scale).collect(),
                SeasonalityMode::Multiplicative => values,
            };
            components.push(ForecastComponent::new(&block.name, block.period, mode, values));
        }

        let point: Vec<f64> = trend
            .iter()
            .zip(&total)
            .map(|(tr, c)| combine(*tr, *c, mode))
            .collect();
        let inputs = PathInputs {
            t: &t,
            trend: &self.trend,
            capacity: capacity.as_deref(),
            components: &total,
            mode,
            sigma: self.sigma,
        };
        let bounds = uncertainty::intervals(&inputs, &point, &self.settings)?;

        let rows: Vec<ForecastRow> = dates
            .iter()
            .enumerate()
            .map(|(i, date)| ForecastRow {
                timestamp: *date,
                estimate: point[i] * self.y_scale,
                lower: bounds[i].0 * self.y_scale,
                upper: bounds[i].1 * self.y_scale,
                trend: trend[i] * self.y_scale,
                capacity: raw_capacity.map(|cap| cap[i]),
            })
            .collect();

        debug!(
            model = %self.name,
            rows = rows.len(),
            future_rows = rows.len().saturating_sub(timeline.history_len()),
            "Prediction complete"
        );

        Forecast::new(rows, components, timeline.history_len())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
