use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Per-service occupancy and staffing derived from the static capacity tables.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResourceRecord {
    pub date: NaiveDate,
    pub service: String,
    pub beds_total: u32,
    pub beds_occupied: u32,
    pub beds_available: u32,
    pub occupancy_rate: f64,
    pub staff_total: u32,
    pub staff_available: u32,
    pub staff_busy: u32,
}
