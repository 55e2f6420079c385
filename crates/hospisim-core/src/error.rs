//! Error types shared by every generator crate.

use chrono::NaiveDate;

/// Problems found while loading or validating a [`crate::HospitalConfig`].
///
/// All of these are fatal: generation never starts with an invalid
/// configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("table '{table}' must have {expected} entries, found {found}")]
    TableLength {
        table: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("'{field}' must be strictly positive and finite (got {value})")]
    NotPositive { field: String, value: f64 },
    #[error("'{field}' must lie in [{min}, {max}] (got {value})")]
    OutOfRange {
        field: String,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("interval '{field}' is empty: lower bound {lower} exceeds upper bound {upper}")]
    EmptyInterval {
        field: String,
        lower: f64,
        upper: f64,
    },
    #[error("weights for '{table}' must be non-negative and sum to a positive value")]
    InvalidWeights { table: String },
    #[error("duplicate identifier '{id}' in {table}")]
    DuplicateId { table: &'static str, id: String },
    #[error("{owner} references unknown {kind} '{id}'")]
    UnknownReference {
        owner: String,
        kind: &'static str,
        id: String,
    },
    #[error("event '{name}' ends ({end}) before it starts ({start})")]
    InvertedEvent {
        name: String,
        start: NaiveDate,
        end: NaiveDate,
    },
    #[error("events '{first}' and '{second}' overlap; the calendar allows one active event per day")]
    OverlappingEvents { first: String, second: String },
}

/// Errors raised while driving a generator.
#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("invalid date range: {start} is after {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },
    #[error("unknown parameter '{0}'")]
    UnknownParameter(String),
    #[error("invalid value {value} for parameter '{name}'")]
    InvalidParameter { name: String, value: f64 },
    #[error("simulation exhausted at {0}")]
    Exhausted(NaiveDate),
}

/// Errors raised while writing output tables.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("failed to write table: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to write table: {0}")]
    Io(#[from] std::io::Error),
}
