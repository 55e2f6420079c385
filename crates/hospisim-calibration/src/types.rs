//! Type definitions for calibration

use std::collections::BTreeMap;
use std::io::Read;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::CalibrationError;

/// An observed value of one series on one date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservedDataPoint {
    pub date: NaiveDate,

    /// Name of the observable series, e.g. `admissions` or `beds_medicine_occupied`
    pub series: String,

    pub value: f64,

    /// Weight for this observation (default 1.0)
    /// Only used by [`LossConfig::WeightedSSE`]
    #[serde(default = "default_weight")]
    pub weight: f64,
}

fn default_weight() -> f64 {
    1.0
}

impl ObservedDataPoint {
    /// Create a new observed data point with default weight of 1.0
    pub fn new(date: NaiveDate, series: impl Into<String>, value: f64) -> Self {
        Self {
            date,
            series: series.into(),
            value,
            weight: 1.0,
        }
    }

    /// Create a new observed data point with a custom weight
    pub fn with_weight(date: NaiveDate, series: impl Into<String>, value: f64, weight: f64) -> Self {
        Self {
            date,
            series: series.into(),
            value,
            weight,
        }
    }
}

/// Reads observations from CSV with columns `date,series,value[,weight]`.
pub fn read_observations<R: Read>(reader: R) -> Result<Vec<ObservedDataPoint>, CalibrationError> {
    let mut csv = csv::Reader::from_reader(reader);
    let mut points = Vec::new();
    for row in csv.deserialize() {
        points.push(row?);
    }
    Ok(points)
}

/// Parameter to be calibrated with its bounds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationParameter {
    /// Tunable name, as reported by the engine's `parameters()`
    pub id: String,

    pub min_bound: f64,

    pub max_bound: f64,

    /// Optional initial guess (if None, will use midpoint of bounds)
    pub initial_guess: Option<f64>,
}

impl CalibrationParameter {
    pub fn new(id: impl Into<String>, min_bound: f64, max_bound: f64) -> Self {
        Self {
            id: id.into(),
            min_bound,
            max_bound,
            initial_guess: None,
        }
    }

    pub fn with_initial_guess(
        id: impl Into<String>,
        min_bound: f64,
        max_bound: f64,
        initial_guess: f64,
    ) -> Self {
        Self {
            id: id.into(),
            min_bound,
            max_bound,
            initial_guess: Some(initial_guess),
        }
    }

    /// Midpoint of the bounds when no guess was given
    pub fn initial_value(&self) -> f64 {
        self.initial_guess
            .unwrap_or((self.min_bound + self.max_bound) / 2.0)
    }

    pub fn is_within_bounds(&self, value: f64) -> bool {
        value >= self.min_bound && value <= self.max_bound
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min_bound, self.max_bound)
    }
}

/// Distance between observed points and the simulated series.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossConfig {
    #[default]
    SumSquaredError,

    RootMeanSquaredError,

    MeanAbsoluteError,

    /// Squared errors scaled by each observation's weight
    WeightedSSE,
}

impl std::fmt::Display for LossConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LossConfig::SumSquaredError => f.write_str("sse"),
            LossConfig::RootMeanSquaredError => f.write_str("rmse"),
            LossConfig::MeanAbsoluteError => f.write_str("mae"),
            LossConfig::WeightedSSE => f.write_str("wsse"),
        }
    }
}

impl std::str::FromStr for LossConfig {
    type Err = CalibrationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sse" | "sum_squared_error" => Ok(LossConfig::SumSquaredError),
            "rmse" | "root_mean_squared_error" => Ok(LossConfig::RootMeanSquaredError),
            "mae" | "mean_absolute_error" => Ok(LossConfig::MeanAbsoluteError),
            "wsse" | "weighted_sse" => Ok(LossConfig::WeightedSSE),
            other => Err(CalibrationError::UnknownLoss(other.to_string())),
        }
    }
}

/// Best point found by a solver run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationResult {
    /// Best parameter values found
    pub best_parameters: Vec<f64>,

    /// Parameter names (in same order as best_parameters)
    pub parameter_names: Vec<String>,

    /// Final loss value achieved
    pub final_loss: f64,

    pub iterations: usize,

    pub converged: bool,

    pub termination_reason: String,
}

impl CalibrationResult {
    pub fn parameters_map(&self) -> BTreeMap<String, f64> {
        self.parameter_names
            .iter()
            .zip(self.best_parameters.iter())
            .map(|(name, value)| (name.clone(), *value))
            .collect()
    }
}
