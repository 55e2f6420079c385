use chrono::NaiveDate;
use hospisim_core::SimulationError;

#[derive(Debug, thiserror::Error)]
pub enum CalibrationError {
    #[error("no observed data provided")]
    NoObservations,
    #[error("no calibration parameters provided")]
    NoParameters,
    #[error("unknown series '{series}' (available series: {available})")]
    UnknownSeries { series: String, available: String },
    #[error("unknown parameter '{id}' (available parameters: {available})")]
    UnknownParameter { id: String, available: String },
    #[error("parameter '{id}' has bounds [{min}, {max}] that are empty or outside its domain")]
    InvalidBounds { id: String, min: f64, max: f64 },
    #[error("observation on {date} precedes the simulation start {start}")]
    ObservationBeforeStart { date: NaiveDate, start: NaiveDate },
    #[error("observation on {date} falls after the simulation end {end}")]
    ObservationAfterEnd { date: NaiveDate, end: NaiveDate },
    #[error("unknown loss function '{0}'")]
    UnknownLoss(String),
    #[error("failed to read observations: {0}")]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Simulation(#[from] SimulationError),
    #[error("optimization failed: {0}")]
    Solver(String),
}
