use pyo3::prelude::*;

mod calibration;
mod config;
mod simulation;

/// Hospital configuration tables.
fn core_module(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<config::PyHospitalConfig>()?;
    Ok(())
}

/// Establishment series, patient log, resources and rollups.
fn simulation_module(m: &Bound<'_, PyModule>) -> PyResult<()> {
    simulation::register(m)
}

/// Fitting generator tunables to observed series.
fn calibration_module(m: &Bound<'_, PyModule>) -> PyResult<()> {
    calibration::register(m)
}

/// Synthetic hospital activity generator.
#[pymodule]
fn hospisim_rs(m: &Bound<'_, PyModule>) -> PyResult<()> {
    let core_mod = PyModule::new(m.py(), "core")?;
    core_module(&core_mod)?;
    m.add_submodule(&core_mod)?;

    let simulation_mod = PyModule::new(m.py(), "simulation")?;
    simulation_module(&simulation_mod)?;
    m.add_submodule(&simulation_mod)?;

    let calibration_mod = PyModule::new(m.py(), "calibration")?;
    calibration_module(&calibration_mod)?;
    m.add_submodule(&calibration_mod)?;

    Ok(())
}
