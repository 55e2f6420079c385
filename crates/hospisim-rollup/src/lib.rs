//! Deterministic aggregates of the patient log.
//!
//! Every table is a group-by over [`PatientRecord`]s keyed by admission
//! date, so rows come out in ascending calendar order.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use hospisim_core::PatientRecord;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub admissions: u32,
    pub mean_stay: f64,
    pub total_cost: f64,
    pub mean_cost: f64,
    pub mean_age: f64,
    pub severe_cases: u32,
    /// 1 = Monday
    pub weekday: u32,
    pub month: u32,
    pub iso_week: u32,
    pub year: i32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ServiceDailySummary {
    pub date: NaiveDate,
    pub service: String,
    pub admissions: u32,
    pub mean_stay: f64,
    pub total_cost: f64,
    pub severe_cases: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct WeeklySummary {
    /// ISO year-week, e.g. `2024-W09`
    pub week: String,
    pub admissions: u32,
    pub mean_stay: f64,
    pub total_cost: f64,
    pub mean_age: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MonthlySummary {
    /// `YYYY-MM`
    pub month: String,
    pub admissions: u32,
    pub mean_stay: f64,
    pub total_cost: f64,
    pub mean_age: f64,
}

/// All rollup tables of one patient log.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Rollup {
    pub daily: Vec<DailySummary>,
    pub service_daily: Vec<ServiceDailySummary>,
    pub weekly: Vec<WeeklySummary>,
    pub monthly: Vec<MonthlySummary>,
}

impl Rollup {
    pub fn from_patients(patients: &[PatientRecord]) -> Self {
        let rollup = Self {
            daily: daily(patients),
            service_daily: service_daily(patients),
            weekly: weekly(patients),
            monthly: monthly(patients),
        };
        tracing::debug!(
            patients = patients.len(),
            days = rollup.daily.len(),
            weeks = rollup.weekly.len(),
            months = rollup.monthly.len(),
            "aggregated patient log"
        );
        rollup
    }
}

#[derive(Default)]
struct Totals {
    admissions: u32,
    stay_days: u64,
    cost: f64,
    age: u64,
    severe: u32,
}

impl Totals {
    fn add(&mut self, patient: &PatientRecord) {
        self.admissions += 1;
        self.stay_days += u64::from(patient.stay_days);
        self.cost += patient.cost;
        self.age += u64::from(patient.age);
        if patient.is_severe() {
            self.severe += 1;
        }
    }

    fn mean(&self, sum: f64) -> f64 {
        if self.admissions == 0 {
            0.0
        } else {
            round2(sum / self.admissions as f64)
        }
    }

    fn mean_stay(&self) -> f64 {
        self.mean(self.stay_days as f64)
    }

    fn mean_age(&self) -> f64 {
        self.mean(self.age as f64)
    }

    fn mean_cost(&self) -> f64 {
        self.mean(self.cost)
    }

    fn total_cost(&self) -> f64 {
        round2(self.cost)
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn group_by<K, F>(patients: &[PatientRecord], key: F) -> BTreeMap<K, Totals>
where
    K: Ord,
    F: Fn(&PatientRecord) -> K,
{
    let mut groups: BTreeMap<K, Totals> = BTreeMap::new();
    for patient in patients {
        groups.entry(key(patient)).or_default().add(patient);
    }
    groups
}

pub fn daily(patients: &[PatientRecord]) -> Vec<DailySummary> {
    group_by(patients, PatientRecord::admission_date)
        .into_iter()
        .map(|(date, totals)| DailySummary {
            date,
            admissions: totals.admissions,
            mean_stay: totals.mean_stay(),
            total_cost: totals.total_cost(),
            mean_cost: totals.mean_cost(),
            mean_age: totals.mean_age(),
            severe_cases: totals.severe,
            weekday: date.weekday().number_from_monday(),
            month: date.month(),
            iso_week: date.iso_week().week(),
            year: date.year(),
        })
        .collect()
}

pub fn service_daily(patients: &[PatientRecord]) -> Vec<ServiceDailySummary> {
    group_by(patients, |p| (p.admission_date(), p.service.clone()))
        .into_iter()
        .map(|((date, service), totals)| ServiceDailySummary {
            date,
            service,
            admissions: totals.admissions,
            mean_stay: totals.mean_stay(),
            total_cost: totals.total_cost(),
            severe_cases: totals.severe,
        })
        .collect()
}

pub fn weekly(patients: &[PatientRecord]) -> Vec<WeeklySummary> {
    group_by(patients, |p| {
        let week = p.admission_date().iso_week();
        (week.year(), week.week())
    })
    .into_iter()
    .map(|((year, week), totals)| WeeklySummary {
        week: format!("{}-W{:02}", year, week),
        admissions: totals.admissions,
        mean_stay: totals.mean_stay(),
        total_cost: totals.total_cost(),
        mean_age: totals.mean_age(),
    })
    .collect()
}

pub fn monthly(patients: &[PatientRecord]) -> Vec<MonthlySummary> {
    group_by(patients, |p| {
        let date = p.admission_date();
        (date.year(), date.month())
    })
    .into_iter()
    .map(|((year, month), totals)| MonthlySummary {
        month: format!("{}-{:02}", year, month),
        admissions: totals.admissions,
        mean_stay: totals.mean_stay(),
        total_cost: totals.total_cost(),
        mean_age: totals.mean_age(),
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use hospisim_core::{AdmissionType, ArrivalMode, Season, Sex};

    fn patient(
        id: u32,
        date: NaiveDate,
        service: &str,
        age: u8,
        severity: u8,
        stay: u32,
        cost: f64,
    ) -> PatientRecord {
        let admitted_at = date.and_hms_opt(10, 30, 0).unwrap();
        PatientRecord {
            id: format!("P{}", id),
            admitted_at,
            discharged_at: admitted_at + chrono::Duration::days(i64::from(stay)),
            age,
            sex: Sex::F,
            service: service.to_string(),
            admission_type: AdmissionType::Emergency,
            severity,
            stay_days: stay,
            cost,
            arrival_mode: ArrivalMode::WalkIn,
            bed_category: None,
            reason: "Malaise".to_string(),
            season: Season::of(date),
            event: "normal".to_string(),
            exam_count: 0,
            exam_types: Vec::new(),
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample() -> Vec<PatientRecord> {
        vec![
            patient(1, date(2024, 12, 31), "surgery", 70, 4, 6, 4200.0),
            patient(2, date(2024, 12, 30), "medicine", 40, 2, 2, 1000.0),
            patient(3, date(2024, 12, 30), "medicine", 60, 5, 4, 9000.5),
            patient(4, date(2025, 1, 2), "emergency", 30, 1, 0, 600.25),
        ]
    }

    #[test]
    fn test_empty_log_gives_empty_tables() {
        assert_eq!(Rollup::from_patients(&[]), Rollup::default());
    }

    #[test]
    fn test_daily_rows_are_sorted_and_aggregated() {
        let rows = daily(&sample());
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].date, date(2024, 12, 30));
        assert_eq!(rows[0].admissions, 2);
        assert_eq!(rows[0].mean_stay, 3.0);
        assert_eq!(rows[0].total_cost, 10000.5);
        assert_eq!(rows[0].mean_cost, 5000.25);
        assert_eq!(rows[0].mean_age, 50.0);
        assert_eq!(rows[0].severe_cases, 1);
        assert_eq!(rows[0].weekday, 1);
        assert_eq!(rows[0].iso_week, 1);
        assert_eq!(rows[0].year, 2024);
        assert_eq!(rows[2].date, date(2025, 1, 2));
    }

    #[test]
    fn test_service_rows_split_by_service() {
        let rows = service_daily(&sample());
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].service, "medicine");
        assert_eq!(rows[0].admissions, 2);
        assert_eq!(rows[1].service, "surgery");
        assert_eq!(rows[1].severe_cases, 1);
    }

    #[test]
    fn test_weeks_follow_iso_calendar() {
        // 2024-12-30 through 2025-01-05 is ISO week 2025-W01
        let rows = weekly(&sample());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].week, "2025-W01");
        assert_eq!(rows[0].admissions, 4);
        assert_eq!(rows[0].mean_stay, 3.0);
        assert_eq!(rows[0].mean_age, 50.0);
    }

    #[test]
    fn test_months_split_at_year_boundary() {
        let rows = monthly(&sample());
        let keys: Vec<&str> = rows.iter().map(|r| r.month.as_str()).collect();
        assert_eq!(keys, ["2024-12", "2025-01"]);
        assert_eq!(rows[0].admissions, 3);
        assert_eq!(rows[1].total_cost, 600.25);
    }

    #[test]
    fn test_totals_match_generated_log() {
        use hospisim_core::HospitalConfig;
        use hospisim_daily::DailyGenerator;
        use hospisim_patients::PatientGenerator;
        use std::sync::Arc;

        let config = Arc::new(HospitalConfig::default());
        let days = DailyGenerator::new(config.clone(), 3, date(2024, 1, 1), date(2024, 2, 29))
            .unwrap()
            .generate();
        let patients = PatientGenerator::new(config, 3).unwrap().generate(&days).unwrap();
        let rollup = Rollup::from_patients(&patients);

        assert_eq!(rollup.daily.len(), days.len());
        for (summary, day) in rollup.daily.iter().zip(&days) {
            assert_eq!(summary.date, day.date);
            assert_eq!(summary.admissions, day.admissions);
        }
        let monthly_total: u32 = rollup.monthly.iter().map(|m| m.admissions).sum();
        assert_eq!(monthly_total as usize, patients.len());
        let service_total: u32 = rollup.service_daily.iter().map(|s| s.admissions).sum();
        assert_eq!(service_total as usize, patients.len());
    }
}
