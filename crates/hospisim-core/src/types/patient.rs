use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::coefficients::Season;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sex {
    F,
    M,
}

impl Sex {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sex::F => "F",
            Sex::M => "M",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdmissionType {
    Emergency,
    Scheduled,
    Transfer,
}

impl AdmissionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdmissionType::Emergency => "emergency",
            AdmissionType::Scheduled => "scheduled",
            AdmissionType::Transfer => "transfer",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArrivalMode {
    WalkIn,
    Ambulance,
    MobileIcu,
    Transfer,
    Consultation,
    Planned,
}

impl ArrivalMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArrivalMode::WalkIn => "walk_in",
            ArrivalMode::Ambulance => "ambulance",
            ArrivalMode::MobileIcu => "mobile_icu",
            ArrivalMode::Transfer => "transfer",
            ArrivalMode::Consultation => "consultation",
            ArrivalMode::Planned => "planned",
        }
    }
}

/// One admitted patient.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PatientRecord {
    pub id: String,
    pub admitted_at: NaiveDateTime,
    pub discharged_at: NaiveDateTime,
    pub age: u8,
    pub sex: Sex,
    pub service: String,
    pub admission_type: AdmissionType,
    /// 1 (mild) to 5 (critical)
    pub severity: u8,
    pub stay_days: u32,
    pub cost: f64,
    pub arrival_mode: ArrivalMode,
    /// Only set when the stay lasts at least one night
    pub bed_category: Option<String>,
    pub reason: String,
    pub season: Season,
    pub event: String,
    pub exam_count: u32,
    pub exam_types: Vec<String>,
}

impl PatientRecord {
    pub fn admission_date(&self) -> NaiveDate {
        self.admitted_at.date()
    }

    pub fn discharge_date(&self) -> NaiveDate {
        self.discharged_at.date()
    }

    pub fn took_bed(&self) -> bool {
        self.bed_category.is_some()
    }

    pub fn is_severe(&self) -> bool {
        self.severity >= 4
    }
}
