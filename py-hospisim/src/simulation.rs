//! Python bindings for the generators.

use std::sync::Arc;

use chrono::NaiveDate;
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyDict;

use hospisim_core::export::{write_establishment, write_patients, write_rows};
use hospisim_core::{DailyRecord, ExportError, PatientRecord, ResourceRecord, SimulationError};
use hospisim_daily::DailyGenerator;
use hospisim_patients::PatientGenerator;
use hospisim_resources::ResourceGenerator;
use hospisim_rollup::Rollup;

use crate::config::PyHospitalConfig;

pub(crate) fn parse_date(value: &str) -> PyResult<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| PyValueError::new_err(format!("invalid date '{}': {}", value, e)))
}

fn to_csv<F>(write: F) -> PyResult<String>
where
    F: FnOnce(&mut Vec<u8>) -> Result<(), ExportError>,
{
    let mut buffer = Vec::new();
    write(&mut buffer).map_err(|e| PyRuntimeError::new_err(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| PyRuntimeError::new_err(e.to_string()))
}

/// Generated tables of one run
#[pyclass(name = "Dataset")]
pub struct PyDataset {
    days: Vec<DailyRecord>,
    patients: Vec<PatientRecord>,
    resources: Vec<ResourceRecord>,
    rollup: Rollup,
}

#[pymethods]
impl PyDataset {
    fn __repr__(&self) -> String {
        format!(
            "Dataset(days={}, patients={}, resource_rows={})",
            self.days.len(),
            self.patients.len(),
            self.resources.len()
        )
    }

    fn num_days(&self) -> usize {
        self.days.len()
    }

    fn num_patients(&self) -> usize {
        self.patients.len()
    }

    /// Daily admissions in date order
    fn admissions(&self) -> Vec<u32> {
        self.days.iter().map(|d| d.admissions).collect()
    }

    /// Headline daily series as a list of dicts
    fn establishment<'py>(&self, py: Python<'py>) -> PyResult<Vec<Bound<'py, PyDict>>> {
        self.days
            .iter()
            .map(|d| {
                let dict = PyDict::new(py);
                dict.set_item("date", d.date.to_string())?;
                dict.set_item("season", d.season.as_str())?;
                dict.set_item("event", &d.event)?;
                dict.set_item("admissions", d.admissions)?;
                dict.set_item("beds_occupied", d.total_beds_occupied())?;
                dict.set_item("exams_total", d.exams.total)?;
                dict.set_item("severe_cases", d.severe_cases)?;
                dict.set_item("deaths", d.deaths)?;
                dict.set_item("blood_stock", d.blood_stock)?;
                dict.set_item("blood_stock_critical", d.blood_stock_critical)?;
                Ok(dict)
            })
            .collect()
    }

    /// Daily rollup of the patient log as a list of dicts
    fn daily_stats<'py>(&self, py: Python<'py>) -> PyResult<Vec<Bound<'py, PyDict>>> {
        self.rollup
            .daily
            .iter()
            .map(|s| {
                let dict = PyDict::new(py);
                dict.set_item("date", s.date.to_string())?;
                dict.set_item("admissions", s.admissions)?;
                dict.set_item("mean_stay", s.mean_stay)?;
                dict.set_item("total_cost", s.total_cost)?;
                dict.set_item("mean_cost", s.mean_cost)?;
                dict.set_item("mean_age", s.mean_age)?;
                dict.set_item("severe_cases", s.severe_cases)?;
                Ok(dict)
            })
            .collect()
    }

    fn establishment_csv(&self) -> PyResult<String> {
        to_csv(|w| write_establishment(w, &self.days))
    }

    fn admissions_csv(&self) -> PyResult<String> {
        to_csv(|w| write_patients(w, &self.patients))
    }

    fn resources_csv(&self) -> PyResult<String> {
        to_csv(|w| write_rows(w, &self.resources))
    }

    fn weekly_stats_csv(&self) -> PyResult<String> {
        to_csv(|w| write_rows(w, &self.rollup.weekly))
    }

    fn monthly_stats_csv(&self) -> PyResult<String> {
        to_csv(|w| write_rows(w, &self.rollup.monthly))
    }
}

/// Generate the full dataset over `start..=end` (ISO dates)
///
/// Args:
///     config: HospitalConfig, the built-in tables when omitted
///     start: First day, e.g. "2024-01-01"
///     end: Last day, inclusive
///     seed: Random seed (default: 42)
#[pyfunction]
#[pyo3(signature = (start, end, config=None, seed=42))]
fn generate(
    py: Python<'_>,
    start: &str,
    end: &str,
    config: Option<PyHospitalConfig>,
    seed: u64,
) -> PyResult<PyDataset> {
    let start = parse_date(start)?;
    let end = parse_date(end)?;
    let config = Arc::new(config.map(|c| c.inner).unwrap_or_default());

    py.allow_threads(|| -> Result<PyDataset, SimulationError> {
        let mut daily = DailyGenerator::new(config.clone(), seed, start, end)?;
        let days = daily.generate();
        let patients =
            PatientGenerator::with_calendar(config.clone(), Arc::clone(daily.calendar()), seed)?
                .generate(&days)?;
        let resources = ResourceGenerator::new(config, seed).generate(start, end)?;
        let rollup = Rollup::from_patients(&patients);
        Ok(PyDataset {
            days,
            patients,
            resources,
            rollup,
        })
    })
    .map_err(|e| PyValueError::new_err(e.to_string()))
}

pub fn register(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyDataset>()?;
    m.add_function(wrap_pyfunction!(generate, m)?)?;
    Ok(())
}
