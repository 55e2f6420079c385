use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::coefficients::Season;
use crate::events::EventCategory;
use crate::Observable;

/// Occupancy of one bed category on one day
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BedOccupancy {
    pub category: String,
    pub capacity: u32,
    pub occupied: u32,
    pub free: u32,
    /// Target rate after clamping; may exceed 1.0 for saturating categories
    pub occupancy_rate: f64,
}

/// Presence of one staff category on one day
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StaffPresence {
    pub category: String,
    pub authorized: u32,
    pub present: u32,
    pub utilization: f64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquipmentCount {
    pub equipment: String,
    pub count: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModalityCount {
    pub modality: String,
    pub count: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamCounts {
    pub modalities: Vec<ModalityCount>,
    pub other: u32,
    pub total: u32,
}

impl ExamCounts {
    pub fn count(&self, modality: &str) -> Option<u32> {
        if modality == "other" {
            return Some(self.other);
        }
        self.modalities
            .iter()
            .find(|m| m.modality == modality)
            .map(|m| m.count)
    }
}

/// Establishment-wide snapshot of one simulated day.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DailyRecord {
    pub date: NaiveDate,
    pub season: Season,
    pub event: String,
    pub event_category: EventCategory,
    pub admissions: u32,
    pub beds: Vec<BedOccupancy>,
    pub staff: Vec<StaffPresence>,
    pub equipment: Vec<EquipmentCount>,
    pub exams: ExamCounts,
    pub severe_cases: u32,
    pub deaths: u32,
    pub blood_stock: f64,
    pub blood_stock_critical: bool,
}

impl DailyRecord {
    pub fn bed(&self, category: &str) -> Option<&BedOccupancy> {
        self.beds.iter().find(|b| b.category == category)
    }

    pub fn staff_category(&self, category: &str) -> Option<&StaffPresence> {
        self.staff.iter().find(|s| s.category == category)
    }

    pub fn equipment_count(&self, equipment: &str) -> Option<u32> {
        self.equipment
            .iter()
            .find(|e| e.equipment == equipment)
            .map(|e| e.count)
    }

    pub fn total_beds_occupied(&self) -> u32 {
        self.beds.iter().map(|b| b.occupied).sum()
    }

    pub fn has_event(&self) -> bool {
        self.event_category != EventCategory::Normal
    }
}

impl Observable for DailyRecord {
    fn date(&self) -> NaiveDate {
        self.date
    }

    fn observe(&self, series: &str) -> Option<f64> {
        match series {
            "admissions" => Some(self.admissions as f64),
            "deaths" => Some(self.deaths as f64),
            "severe_cases" => Some(self.severe_cases as f64),
            "blood_stock" => Some(self.blood_stock),
            "exams_total" => Some(self.exams.total as f64),
            _ => {
                if let Some(category) = series
                    .strip_prefix("beds_")
                    .and_then(|s| s.strip_suffix("_occupied"))
                {
                    return self.bed(category).map(|b| b.occupied as f64);
                }
                if let Some(category) = series
                    .strip_prefix("staff_")
                    .and_then(|s| s.strip_suffix("_present"))
                {
                    return self.staff_category(category).map(|s| s.present as f64);
                }
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> DailyRecord {
        DailyRecord {
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            season: Season::Winter,
            event: "normal".to_string(),
            event_category: EventCategory::Normal,
            admissions: 420,
            beds: vec![BedOccupancy {
                category: "step_down".to_string(),
                capacity: 70,
                occupied: 60,
                free: 10,
                occupancy_rate: 0.86,
            }],
            staff: vec![StaffPresence {
                category: "nursing".to_string(),
                authorized: 4716,
                present: 4300,
                utilization: 0.9,
            }],
            equipment: Vec::new(),
            exams: ExamCounts {
                modalities: vec![ModalityCount {
                    modality: "ct".to_string(),
                    count: 180,
                }],
                other: 100,
                total: 700,
            },
            severe_cases: 21,
            deaths: 0,
            blood_stock: 512.5,
            blood_stock_critical: false,
        }
    }

    #[test]
    fn test_observable_series() {
        let r = record();
        assert_eq!(r.observe("admissions"), Some(420.0));
        assert_eq!(r.observe("blood_stock"), Some(512.5));
        assert_eq!(r.observe("exams_total"), Some(700.0));
        assert_eq!(r.observe("beds_step_down_occupied"), Some(60.0));
        assert_eq!(r.observe("staff_nursing_present"), Some(4300.0));
        assert_eq!(r.observe("beds_unknown_occupied"), None);
        assert_eq!(r.observe("temperature"), None);
    }

    #[test]
    fn test_exam_lookup() {
        let r = record();
        assert_eq!(r.exams.count("ct"), Some(180));
        assert_eq!(r.exams.count("other"), Some(100));
        assert_eq!(r.exams.count("pet"), None);
    }
}
