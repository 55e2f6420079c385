//! Python bindings for hospisim-calibration.

use std::collections::HashMap;
use std::sync::Arc;

use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyDict;

use hospisim_calibration::{
    CalibrationParameter, CalibrationProblem, CalibrationResult, LossConfig, NelderMeadConfig,
    ObservedDataPoint, OptimizationConfig, ParticleSwarmConfig,
};
use hospisim_daily::DailyGenerator;

use crate::config::PyHospitalConfig;
use crate::simulation::parse_date;

/// Observed value of one series on one date
#[pyclass(name = "ObservedDataPoint")]
#[derive(Clone)]
pub struct PyObservedDataPoint {
    pub inner: ObservedDataPoint,
}

#[pymethods]
impl PyObservedDataPoint {
    /// Args:
    ///     date: ISO date of the observation
    ///     series: Observable series, e.g. "admissions" or "beds_medicine_occupied"
    ///     value: Observed value
    ///     weight: Optional weight for this observation (default: 1.0)
    #[new]
    #[pyo3(signature = (date, series, value, weight=None))]
    fn new(date: &str, series: String, value: f64, weight: Option<f64>) -> PyResult<Self> {
        let date = parse_date(date)?;
        Ok(Self {
            inner: match weight {
                Some(w) => ObservedDataPoint::with_weight(date, series, value, w),
                None => ObservedDataPoint::new(date, series, value),
            },
        })
    }

    fn __repr__(&self) -> String {
        format!(
            "ObservedDataPoint(date={}, series={}, value={})",
            self.inner.date, self.inner.series, self.inner.value
        )
    }
}

/// Generator tunable to fit, with bounds
#[pyclass(name = "CalibrationParameter")]
#[derive(Clone)]
pub struct PyCalibrationParameter {
    pub inner: CalibrationParameter,
}

#[pymethods]
impl PyCalibrationParameter {
    #[new]
    #[pyo3(signature = (id, min_bound, max_bound, initial_guess=None))]
    fn new(id: String, min_bound: f64, max_bound: f64, initial_guess: Option<f64>) -> Self {
        Self {
            inner: match initial_guess {
                Some(guess) => {
                    CalibrationParameter::with_initial_guess(id, min_bound, max_bound, guess)
                }
                None => CalibrationParameter::new(id, min_bound, max_bound),
            },
        }
    }

    fn __repr__(&self) -> String {
        format!(
            "CalibrationParameter(id={}, bounds=[{}, {}])",
            self.inner.id, self.inner.min_bound, self.inner.max_bound
        )
    }
}

#[pyclass(name = "CalibrationResult")]
pub struct PyCalibrationResult {
    pub inner: CalibrationResult,
}

#[pymethods]
impl PyCalibrationResult {
    #[getter]
    fn best_parameters(&self) -> HashMap<String, f64> {
        self.inner.parameters_map().into_iter().collect()
    }

    #[getter]
    fn final_loss(&self) -> f64 {
        self.inner.final_loss
    }

    #[getter]
    fn iterations(&self) -> usize {
        self.inner.iterations
    }

    #[getter]
    fn converged(&self) -> bool {
        self.inner.converged
    }

    #[getter]
    fn termination_reason(&self) -> String {
        self.inner.termination_reason.clone()
    }

    fn __repr__(&self) -> String {
        format!(
            "CalibrationResult(loss={:.6}, iterations={}, converged={})",
            self.inner.final_loss, self.inner.iterations, self.inner.converged
        )
    }

    fn to_dict<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyDict>> {
        let dict = PyDict::new(py);
        dict.set_item("best_parameters", self.best_parameters())?;
        dict.set_item("final_loss", self.inner.final_loss)?;
        dict.set_item("iterations", self.inner.iterations)?;
        dict.set_item("converged", self.inner.converged)?;
        dict.set_item("termination_reason", &self.inner.termination_reason)?;
        Ok(dict)
    }
}

/// Fit daily generator tunables to observed series
///
/// Args:
///     observed_data: List of ObservedDataPoint
///     parameters: List of CalibrationParameter
///     start: First simulated day; observations must not precede it
///     config: HospitalConfig, the built-in tables when omitted
///     seed: Random seed (default: 42)
///     loss: "sse", "wsse", "rmse" or "mae"
///     algorithm: "nelder_mead" or "particle_swarm"
///     max_iterations: Iteration cap of the solver
#[pyfunction]
#[pyo3(signature = (
    observed_data,
    parameters,
    start,
    config=None,
    seed=42,
    loss="sse",
    algorithm="nelder_mead",
    max_iterations=200
))]
#[allow(clippy::too_many_arguments)]
fn calibrate(
    py: Python<'_>,
    observed_data: Vec<PyObservedDataPoint>,
    parameters: Vec<PyCalibrationParameter>,
    start: &str,
    config: Option<PyHospitalConfig>,
    seed: u64,
    loss: &str,
    algorithm: &str,
    max_iterations: u64,
) -> PyResult<PyCalibrationResult> {
    let start = parse_date(start)?;
    let loss: LossConfig = loss
        .parse()
        .map_err(|e: hospisim_calibration::CalibrationError| PyValueError::new_err(e.to_string()))?;
    let optimization = match algorithm {
        "nelder_mead" => OptimizationConfig::NelderMead(
            NelderMeadConfig::new().with_max_iterations(max_iterations),
        ),
        "particle_swarm" => OptimizationConfig::ParticleSwarm(
            ParticleSwarmConfig::new().with_max_iterations(max_iterations),
        ),
        other => {
            return Err(PyValueError::new_err(format!(
                "unknown algorithm '{}', expected nelder_mead or particle_swarm",
                other
            )))
        }
    };

    let observed: Vec<ObservedDataPoint> = observed_data.into_iter().map(|d| d.inner).collect();
    let parameters: Vec<CalibrationParameter> = parameters.into_iter().map(|p| p.inner).collect();
    let end = observed.iter().map(|o| o.date).max().unwrap_or(start);
    let config = Arc::new(config.map(|c| c.inner).unwrap_or_default());

    let engine = DailyGenerator::new(config, seed, start, end.max(start))
        .map_err(|e| PyValueError::new_err(e.to_string()))?;
    let problem = CalibrationProblem::new(engine, observed, parameters, loss)
        .map_err(|e| PyValueError::new_err(e.to_string()))?;

    let result = py
        .allow_threads(|| hospisim_calibration::optimize(problem, optimization))
        .map_err(|e| PyRuntimeError::new_err(e.to_string()))?;
    Ok(PyCalibrationResult { inner: result })
}

pub fn register(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyObservedDataPoint>()?;
    m.add_class::<PyCalibrationParameter>()?;
    m.add_class::<PyCalibrationResult>()?;
    m.add_function(wrap_pyfunction!(calibrate, m)?)?;
    Ok(())
}
