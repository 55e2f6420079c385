//! Calibration problem definition and implementation

use argmin::core::{CostFunction, Error};
use hospisim_core::{Observable, SimulationEngine};

use crate::error::CalibrationError;
use crate::types::{CalibrationParameter, LossConfig, ObservedDataPoint};

/// Fits the tunables of any [`SimulationEngine`] to observed daily values.
///
/// Every cost evaluation clones the template engine, resets it (which also
/// reseeds it, so all candidates see the same random draws), applies the
/// candidate parameters and runs it up to the last observed date.
/// Construction rejects observations outside the engine's date range and
/// bounds the engine would refuse, so every candidate can be simulated.
///
/// ```rust,ignore
/// use hospisim_calibration::{CalibrationProblem, types::*};
///
/// let engine = DailyGenerator::new(config, 42, start, end)?;
/// let observed = vec![
///     ObservedDataPoint::new(start, "admissions", 452.0),
///     ObservedDataPoint::new(start + Duration::days(7), "admissions", 498.0),
/// ];
/// let params = vec![CalibrationParameter::new("base_rate", 300.0, 600.0)];
/// let problem = CalibrationProblem::new(engine, observed, params, LossConfig::SumSquaredError)?;
/// ```
pub struct CalibrationProblem<E: SimulationEngine> {
    /// Template engine (will be cloned for each evaluation)
    template_engine: E,

    observed_data: Vec<ObservedDataPoint>,

    /// Day offset of each observation from the engine start
    step_indices: Vec<usize>,

    calibration_params: Vec<CalibrationParameter>,

    loss_config: LossConfig,

    /// Days to simulate per evaluation
    num_steps: u32,
}

impl<E: SimulationEngine> CalibrationProblem<E> {
    pub fn new(
        template_engine: E,
        observed_data: Vec<ObservedDataPoint>,
        calibration_params: Vec<CalibrationParameter>,
        loss_config: LossConfig,
    ) -> Result<Self, CalibrationError> {
        if observed_data.is_empty() {
            return Err(CalibrationError::NoObservations);
        }
        if calibration_params.is_empty() {
            return Err(CalibrationError::NoParameters);
        }

        let available = template_engine.parameters();
        for param in &calibration_params {
            if !available.contains_key(&param.id) {
                return Err(CalibrationError::UnknownParameter {
                    id: param.id.clone(),
                    available: available.keys().cloned().collect::<Vec<_>>().join(", "),
                });
            }
            // the engine must accept every value in the range
            let mut scratch = template_engine.clone();
            let accepted = param.min_bound <= param.max_bound
                && scratch.set_parameter(&param.id, param.min_bound).is_ok()
                && scratch.set_parameter(&param.id, param.max_bound).is_ok();
            if !accepted {
                return Err(CalibrationError::InvalidBounds {
                    id: param.id.clone(),
                    min: param.min_bound,
                    max: param.max_bound,
                });
            }
            if let Some(guess) = param.initial_guess {
                if !param.is_within_bounds(guess) {
                    tracing::warn!(
                        parameter = %param.id,
                        guess,
                        min = param.min_bound,
                        max = param.max_bound,
                        "initial guess outside bounds, clamping"
                    );
                }
            }
        }

        let series = template_engine.series();
        let start = template_engine.start_date();
        let end = template_engine.end_date();
        let mut step_indices = Vec::with_capacity(observed_data.len());
        for obs in &observed_data {
            if !series.iter().any(|s| *s == obs.series) {
                return Err(CalibrationError::UnknownSeries {
                    series: obs.series.clone(),
                    available: series.join(", "),
                });
            }
            let offset = (obs.date - start).num_days();
            if offset < 0 {
                return Err(CalibrationError::ObservationBeforeStart {
                    date: obs.date,
                    start,
                });
            }
            if obs.date > end {
                return Err(CalibrationError::ObservationAfterEnd {
                    date: obs.date,
                    end,
                });
            }
            step_indices.push(offset as usize);
        }

        let num_steps = step_indices.iter().max().map(|m| *m as u32 + 1).unwrap_or(1);
        tracing::debug!(
            observations = observed_data.len(),
            parameters = calibration_params.len(),
            num_steps,
            loss = %loss_config,
            "built calibration problem"
        );

        Ok(Self {
            template_engine,
            observed_data,
            step_indices,
            calibration_params,
            loss_config,
            num_steps,
        })
    }

    pub fn num_parameters(&self) -> usize {
        self.calibration_params.len()
    }

    pub fn num_observations(&self) -> usize {
        self.observed_data.len()
    }

    pub fn parameter_names(&self) -> Vec<String> {
        self.calibration_params
            .iter()
            .map(|p| p.id.clone())
            .collect()
    }

    /// Initial guesses, clamped into their bounds
    pub fn initial_parameters(&self) -> Vec<f64> {
        self.calibration_params
            .iter()
            .map(|p| p.clamp(p.initial_value()))
            .collect()
    }

    /// Get parameter bounds as (min, max) tuples
    pub fn get_parameter_bounds(&self) -> Vec<(f64, f64)> {
        self.calibration_params
            .iter()
            .map(|p| (p.min_bound, p.max_bound))
            .collect()
    }

    /// Runs the engine with `params` and returns its records.
    pub fn simulate(&self, params: &[f64]) -> Result<Vec<E::Record>, CalibrationError> {
        let mut engine = self.template_engine.clone();
        engine.reset();
        for (value, param) in params.iter().zip(&self.calibration_params) {
            engine.set_parameter(&param.id, param.clamp(*value))?;
        }
        Ok(engine.run(self.num_steps)?)
    }

    /// Calculate loss between simulated records and observed data
    fn calculate_loss(&self, records: &[E::Record]) -> f64 {
        let residuals = self
            .observed_data
            .iter()
            .zip(&self.step_indices)
            .filter_map(|(obs, &idx)| {
                records
                    .get(idx)
                    .and_then(|r| r.observe(&obs.series))
                    .map(|predicted| (obs, obs.value - predicted))
            });

        match self.loss_config {
            LossConfig::SumSquaredError => residuals.map(|(_, e)| e * e).sum(),
            LossConfig::WeightedSSE => residuals
                .map(|(obs, e)| {
                    let weighted = e * obs.weight;
                    weighted * weighted
                })
                .sum(),
            LossConfig::RootMeanSquaredError => {
                let (sum, count) = residuals.fold((0.0, 0usize), |(s, n), (_, e)| (s + e * e, n + 1));
                if count > 0 {
                    (sum / count as f64).sqrt()
                } else {
                    0.0
                }
            }
            LossConfig::MeanAbsoluteError => {
                let (sum, count) = residuals.fold((0.0, 0usize), |(s, n), (_, e)| (s + e.abs(), n + 1));
                if count > 0 {
                    sum / count as f64
                } else {
                    0.0
                }
            }
        }
    }
}

impl<E: SimulationEngine> CostFunction for CalibrationProblem<E> {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, params: &Self::Param) -> Result<Self::Output, Error> {
        if params.len() != self.calibration_params.len() {
            return Err(Error::msg(format!(
                "Expected {} parameters, got {}",
                self.calibration_params.len(),
                params.len()
            )));
        }
        let records = self
            .simulate(params)
            .map_err(|e| Error::msg(format!("Simulation failed: {}", e)))?;
        Ok(self.calculate_loss(&records))
    }
}
