//! Python wrapper of the hospital configuration.

use pyo3::exceptions::{PyIOError, PyValueError};
use pyo3::prelude::*;

use hospisim_core::{ConfigError, HospitalConfig};

pub(crate) fn config_error(e: ConfigError) -> PyErr {
    match e {
        ConfigError::Io(_) => PyIOError::new_err(e.to_string()),
        _ => PyValueError::new_err(e.to_string()),
    }
}

/// Wrapper for hospisim_core::HospitalConfig
///
/// A fresh instance carries the built-in calibrated tables.
#[pyclass(name = "HospitalConfig")]
#[derive(Clone)]
pub struct PyHospitalConfig {
    pub inner: HospitalConfig,
}

#[pymethods]
impl PyHospitalConfig {
    #[new]
    fn new() -> Self {
        Self {
            inner: HospitalConfig::default(),
        }
    }

    fn __repr__(&self) -> String {
        format!(
            "HospitalConfig(name='{}', reference_year={}, events={})",
            self.inner.name,
            self.inner.reference_year,
            self.inner.events.len()
        )
    }

    #[getter]
    fn name(&self) -> String {
        self.inner.name.clone()
    }

    #[getter]
    fn reference_year(&self) -> i32 {
        self.inner.reference_year
    }

    /// Baseline daily admissions for `year`
    fn base_rate(&self, year: i32) -> f64 {
        self.inner.base_rate(year)
    }

    /// Raises ValueError when a table is inconsistent
    fn validate(&self) -> PyResult<()> {
        self.inner.validate().map_err(config_error)
    }

    #[staticmethod]
    fn from_json(json_str: String) -> PyResult<Self> {
        let inner = HospitalConfig::from_json(&json_str).map_err(config_error)?;
        Ok(Self { inner })
    }

    #[staticmethod]
    fn from_json_file(path: String) -> PyResult<Self> {
        let inner = HospitalConfig::from_json_file(path).map_err(config_error)?;
        Ok(Self { inner })
    }

    fn to_json(&self) -> PyResult<String> {
        self.inner.to_json().map_err(config_error)
    }

    fn to_json_file(&self, path: String) -> PyResult<()> {
        self.inner.to_json_file(path).map_err(config_error)
    }
}
