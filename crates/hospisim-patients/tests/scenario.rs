use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use hospisim_core::HospitalConfig;
use hospisim_daily::DailyGenerator;
use hospisim_patients::PatientGenerator;

fn two_years() -> (Arc<HospitalConfig>, NaiveDate, NaiveDate) {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let end = start + chrono::Duration::days(729);
    (Arc::new(HospitalConfig::default()), start, end)
}

#[test]
fn two_year_default_scenario() {
    let (config, start, end) = two_years();
    let mut daily = DailyGenerator::new(Arc::clone(&config), 42, start, end).unwrap();
    let days = daily.generate();
    assert_eq!(days.len(), 730);

    let expected: f64 = days.iter().map(|d| daily.base_rate(d.date.year())).sum();
    let realized: f64 = days.iter().map(|d| d.admissions as f64).sum();
    let deviation = (realized - expected).abs() / expected;
    assert!(
        deviation < 0.15,
        "realized {} vs baseline {} ({:.1}%)",
        realized,
        expected,
        deviation * 100.0
    );

    let patients = PatientGenerator::new(Arc::clone(&config), 42)
        .unwrap()
        .generate(&days)
        .unwrap();
    assert_eq!(patients.len() as f64, realized);

    for p in &patients {
        assert!(p.discharged_at >= p.admitted_at, "{} discharged early", p.id);
        let exams: BTreeSet<&String> = p.exam_types.iter().collect();
        assert_eq!(exams.len(), p.exam_types.len(), "{} repeats an exam", p.id);
    }

    let mut cursor = 0;
    for day in &days {
        let batch = &patients[cursor..cursor + day.admissions as usize];
        assert!(batch.iter().all(|p| p.admission_date() == day.date));
        assert!(batch.iter().all(|p| p.event == day.event));
        cursor += day.admissions as usize;
    }
}

#[test]
fn fixed_seed_reproduces_both_tables() {
    let (config, start, _) = two_years();
    let end = start + chrono::Duration::days(89);
    let run = || {
        let days = DailyGenerator::new(Arc::clone(&config), 42, start, end)
            .unwrap()
            .generate();
        let patients = PatientGenerator::new(Arc::clone(&config), 42)
            .unwrap()
            .generate(&days)
            .unwrap();
        (days, patients)
    };
    let (days_a, patients_a) = run();
    let (days_b, patients_b) = run();
    assert_eq!(days_a, days_b);
    assert_eq!(patients_a, patients_b);
}
