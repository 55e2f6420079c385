pub mod coefficients;
pub mod config;
pub mod error;
pub mod events;
pub mod export;
pub mod sampling;
pub mod types;

use std::collections::BTreeMap;

use chrono::NaiveDate;

pub use coefficients::{FluTempering, Season, SeasonFactors, SeasonalCoefficients};
pub use config::{
    AdmissionPolicy, HospitalConfig, ResourceConfig, ServiceClass, ServiceConfig, StaffGroup,
};
pub use error::{ConfigError, ExportError, SimulationError};
pub use events::{Event, EventCalendar, EventCategory};
pub use sampling::{stream_rng, Interval, Stream, Weighted, WeightedTable};
pub use types::*;

/// A record that exposes named numeric series for fitting.
pub trait Observable {
    fn date(&self) -> NaiveDate;

    /// Value of `series` in this record, or `None` when the record has no
    /// such series.
    fn observe(&self, series: &str) -> Option<f64>;
}

/// Common interface of the day-stepped generators.
///
/// Calibration drives generators exclusively through this trait: it clones a
/// base engine, resets it, applies candidate parameters and runs it forward.
pub trait SimulationEngine: Clone {
    type Record: Observable;

    /// Advances one day and returns that day's record.
    fn step(&mut self) -> Result<Self::Record, SimulationError>;

    /// Runs `num_steps` days from the current position.
    fn run(&mut self, num_steps: u32) -> Result<Vec<Self::Record>, SimulationError> {
        let mut records = Vec::with_capacity(num_steps as usize);
        self.run_into_buffer(num_steps, &mut records)?;
        Ok(records)
    }

    /// Like [`SimulationEngine::run`] but appends into a caller-owned buffer.
    fn run_into_buffer(
        &mut self,
        num_steps: u32,
        buffer: &mut Vec<Self::Record>,
    ) -> Result<(), SimulationError> {
        buffer.reserve(num_steps as usize);
        for _ in 0..num_steps {
            buffer.push(self.step()?);
        }
        Ok(())
    }

    /// Rewinds to the first day and reseeds the random streams.
    fn reset(&mut self);

    fn set_parameter(&mut self, parameter_id: &str, value: f64) -> Result<(), SimulationError>;

    fn parameters(&self) -> BTreeMap<String, f64>;

    /// Number of days generated since the last reset.
    fn current_step(&self) -> u32;

    fn start_date(&self) -> NaiveDate;

    /// Last day the engine can generate; stepping past it fails.
    fn end_date(&self) -> NaiveDate;

    /// Names accepted by [`Observable::observe`] on this engine's records.
    fn series(&self) -> Vec<String>;
}
