//! Patient admission log.
//!
//! One [`PatientRecord`] is emitted per admission counted in the
//! establishment series. Days are independent once their admission counts
//! are known, so they are generated in parallel; each day draws from its own
//! random stream and patient ids are assigned up front from a prefix sum,
//! which keeps the output identical to a sequential run.

use std::sync::Arc;

use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime};
use rand::seq::SliceRandom;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

use hospisim_core::config::{AdmissionPolicy, PatientConfig, ServiceConfig, MAX_AGE};
use hospisim_core::sampling::{exponential, gaussian};
use hospisim_core::{
    stream_rng, AdmissionType, ArrivalMode, DailyRecord, Event, EventCalendar, HospitalConfig,
    PatientRecord, Sex, SimulationError, Stream, WeightedTable,
};

const MINUTES_PER_DAY: u32 = 24 * 60;

#[derive(Clone)]
pub struct PatientGenerator {
    config: Arc<HospitalConfig>,
    calendar: Arc<EventCalendar>,
    seed: u64,
    services: WeightedTable<usize>,
    age_bands: WeightedTable<u8>,
    sex: WeightedTable<Sex>,
    hours: WeightedTable<u32>,
    emergency_arrivals: WeightedTable<ArrivalMode>,
    scheduled_arrivals: WeightedTable<ArrivalMode>,
}

impl PatientGenerator {
    pub fn new(config: Arc<HospitalConfig>, seed: u64) -> Result<Self, SimulationError> {
        let calendar = Arc::new(config.calendar()?);
        Self::with_calendar(config, calendar, seed)
    }

    /// Shares an already built calendar with the establishment generator.
    pub fn with_calendar(
        config: Arc<HospitalConfig>,
        calendar: Arc<EventCalendar>,
        seed: u64,
    ) -> Result<Self, SimulationError> {
        let p = &config.patients;
        let services = WeightedTable::new(
            "patients.services",
            p.services.iter().enumerate().map(|(i, s)| (i, s.weight)).collect(),
        )?;
        let age_bands = WeightedTable::from_weighted("patients.age_bands", &p.age_bands)?;
        let sex = WeightedTable::from_weighted("patients.sex", &p.sex)?;
        let hours = WeightedTable::new(
            "patients.hourly_profile",
            p.hourly_profile
                .iter()
                .enumerate()
                .map(|(h, w)| (h as u32, *w))
                .collect(),
        )?;
        let emergency_arrivals =
            WeightedTable::from_weighted("patients.emergency_arrivals", &p.emergency_arrivals)?;
        let scheduled_arrivals =
            WeightedTable::from_weighted("patients.scheduled_arrivals", &p.scheduled_arrivals)?;

        Ok(Self {
            config,
            calendar,
            seed,
            services,
            age_bands,
            sex,
            hours,
            emergency_arrivals,
            scheduled_arrivals,
        })
    }

    /// Service table in effect on `event`, with affected services boosted.
    pub fn service_table(&self, event: &Event) -> Result<WeightedTable<usize>, SimulationError> {
        if event.is_normal() {
            return Ok(self.services.clone());
        }
        let p = &self.config.patients;
        let table = self.services.reweighted("patients.services", |idx| {
            if event.affects(&p.services[*idx].id) {
                p.event_boost
            } else {
                p.event_reduction
            }
        })?;
        Ok(table)
    }

    /// Patient log for a whole establishment series, in date order.
    pub fn generate(&self, days: &[DailyRecord]) -> Result<Vec<PatientRecord>, SimulationError> {
        let first_id = self.config.patients.first_id;
        let offsets: Vec<u64> = days
            .iter()
            .scan(first_id, |next, day| {
                let id = *next;
                *next += day.admissions as u64;
                Some(id)
            })
            .collect();

        let batches: Vec<Vec<PatientRecord>> = days
            .par_iter()
            .zip(offsets.par_iter())
            .map(|(day, first)| self.generate_day(day, *first))
            .collect::<Result<_, _>>()?;

        let patients: Vec<PatientRecord> = batches.into_iter().flatten().collect();
        tracing::info!(
            days = days.len(),
            patients = patients.len(),
            "generated admission log"
        );
        Ok(patients)
    }

    /// Patients admitted on `day`, numbered from `first_id`.
    pub fn generate_day(
        &self,
        day: &DailyRecord,
        first_id: u64,
    ) -> Result<Vec<PatientRecord>, SimulationError> {
        let event = self.calendar.active_event(day.date);
        let services = self.service_table(event)?;
        let mut rng = stream_rng(self.seed, Stream::Patients(day.date));

        let patients = (0..day.admissions as u64)
            .map(|i| {
                let service = &self.config.patients.services[*services.sample(&mut rng)];
                self.patient(&mut rng, day, event, service, first_id + i)
            })
            .collect::<Vec<_>>();
        tracing::trace!(date = %day.date, patients = patients.len(), "generated day");
        Ok(patients)
    }

    fn patient(
        &self,
        rng: &mut ChaCha8Rng,
        day: &DailyRecord,
        event: &Event,
        service: &ServiceConfig,
        id: u64,
    ) -> PatientRecord {
        let p = &self.config.patients;
        let age = self.draw_age(rng, service);
        let sex = *self.sex.sample(rng);
        let admission_type = draw_admission_type(rng, p, &service.admission);
        let severity = draw_severity(rng, p, age, event);
        let stay_days = draw_stay(rng, p, service, admission_type, severity, age);

        let hour = *self.hours.sample(rng);
        let admission_minute = hour * 60 + rng.gen_range(0..60);
        let admitted_at = at_minute(day.date, admission_minute);
        let discharge_minute = if stay_days == 0 {
            rng.gen_range(admission_minute..MINUTES_PER_DAY)
        } else {
            rng.gen_range(0..MINUTES_PER_DAY)
        };
        let discharge_date = day
            .date
            .checked_add_days(Days::new(stay_days as u64))
            .unwrap_or(NaiveDate::MAX);
        let discharged_at = at_minute(discharge_date, discharge_minute);

        let tier = &p.cost.tiers[(severity - 1) as usize];
        let cost = tier.draw(rng) * (1.0 + p.cost.per_stay_day * stay_days as f64)
            * service.cost_multiplier;
        let cost = (cost * 100.0).round() / 100.0;

        let arrival_mode = match admission_type {
            AdmissionType::Emergency => *self.emergency_arrivals.sample(rng),
            AdmissionType::Transfer => ArrivalMode::Transfer,
            AdmissionType::Scheduled => *self.scheduled_arrivals.sample(rng),
        };

        let bed_category = if stay_days > 0 {
            service.bed_categories.choose(rng).cloned()
        } else {
            None
        };

        let reason = draw_reason(rng, p, service, event);
        let (exam_count, exam_types) = draw_exams(rng, p, severity);

        PatientRecord {
            id: format!("P{}", id),
            admitted_at,
            discharged_at,
            age,
            sex,
            service: service.id.clone(),
            admission_type,
            severity,
            stay_days,
            cost,
            arrival_mode,
            bed_category,
            reason,
            season: day.season,
            event: event.name.clone(),
            exam_count,
            exam_types,
        }
    }

    fn draw_age(&self, rng: &mut ChaCha8Rng, service: &ServiceConfig) -> u8 {
        if let Some(range) = service.age_range {
            return rng.gen_range(range.min..=range.max);
        }
        let jitter = self.config.patients.age_jitter as i32;
        let band = *self.age_bands.sample(rng) as i32;
        (band + rng.gen_range(-jitter..=jitter)).clamp(0, MAX_AGE as i32) as u8
    }
}

fn at_minute(date: NaiveDate, minute_of_day: u32) -> NaiveDateTime {
    let time = NaiveTime::from_hms_opt(minute_of_day / 60, minute_of_day % 60, 0).unwrap_or_default();
    date.and_time(time)
}

fn draw_admission_type(
    rng: &mut ChaCha8Rng,
    p: &PatientConfig,
    policy: &AdmissionPolicy,
) -> AdmissionType {
    match policy {
        AdmissionPolicy::EmergencyOnly => return AdmissionType::Emergency,
        AdmissionPolicy::MostlyScheduled { scheduled_share } => {
            if rng.gen::<f64>() < *scheduled_share {
                return AdmissionType::Scheduled;
            }
        }
        AdmissionPolicy::Standard => {}
    }
    if rng.gen::<f64>() < p.transfer_share {
        AdmissionType::Transfer
    } else if rng.gen::<f64>() < p.emergency_share {
        AdmissionType::Emergency
    } else {
        AdmissionType::Scheduled
    }
}

fn draw_severity(rng: &mut ChaCha8Rng, p: &PatientConfig, age: u8, event: &Event) -> u8 {
    let s = &p.severity;
    let mut score = s.base;
    if age > s.elderly_age {
        score += s.elderly_bump;
    }
    if !event.is_normal() {
        score += s.event_bump;
    }
    let tier = gaussian(rng, score, s.noise_sd).trunc() as i32;
    tier.clamp(1, s.max_tier as i32) as u8
}

fn draw_stay(
    rng: &mut ChaCha8Rng,
    p: &PatientConfig,
    service: &ServiceConfig,
    admission_type: AdmissionType,
    severity: u8,
    age: u8,
) -> u32 {
    let stay = &p.stay;
    let mean = if service.rapid_turnaround && admission_type == AdmissionType::Emergency {
        stay.rapid_mean_days
    } else {
        stay.days_per_severity * severity as f64 + stay.days_per_age_year * age as f64
    };
    (exponential(rng, mean).floor() as u32).min(stay.max_days)
}

fn draw_reason(
    rng: &mut ChaCha8Rng,
    p: &PatientConfig,
    service: &ServiceConfig,
    event: &Event,
) -> String {
    if !event.reasons.is_empty() && rng.gen::<f64>() < p.event_reason_share {
        if let Some(reason) = event.reasons.choose(rng) {
            return reason.clone();
        }
    }
    let pool = if service.reasons.is_empty() {
        &p.reasons
    } else {
        &service.reasons
    };
    pool.choose(rng).cloned().unwrap_or_default()
}

fn draw_exams(rng: &mut ChaCha8Rng, p: &PatientConfig, severity: u8) -> (u32, Vec<String>) {
    let [lo, hi] = p.exams.counts_by_severity[(severity - 1) as usize];
    let count = rng.gen_range(lo..=hi);
    let distinct = (count as usize).min(p.exams.max_types);
    let types = p
        .exams
        .types
        .choose_multiple(rng, distinct)
        .cloned()
        .collect();
    (count, types)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hospisim_core::{EventCategory, ExamCounts, Season};
    use std::collections::{BTreeMap, BTreeSet};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn day(date: NaiveDate, admissions: u32, calendar: &EventCalendar) -> DailyRecord {
        let event = calendar.active_event(date);
        DailyRecord {
            date,
            season: Season::of(date),
            event: event.name.clone(),
            event_category: event.category,
            admissions,
            beds: Vec::new(),
            staff: Vec::new(),
            equipment: Vec::new(),
            exams: ExamCounts::default(),
            severe_cases: 0,
            deaths: 0,
            blood_stock: 500.0,
            blood_stock_critical: false,
        }
    }

    fn setup() -> (PatientGenerator, EventCalendar) {
        let config = Arc::new(HospitalConfig::default());
        let calendar = config.calendar().unwrap();
        (PatientGenerator::new(config, 42).unwrap(), calendar)
    }

    fn shares(patients: &[PatientRecord]) -> BTreeMap<String, f64> {
        let mut counts: BTreeMap<String, f64> = BTreeMap::new();
        for p in patients {
            *counts.entry(p.service.clone()).or_default() += 1.0;
        }
        counts.values_mut().for_each(|c| *c /= patients.len() as f64);
        counts
    }

    #[test]
    fn test_one_patient_per_admission() {
        let (generator, calendar) = setup();
        let days: Vec<DailyRecord> = (0..10)
            .map(|i| day(date(2024, 5, 1) + chrono::Duration::days(i), 300 + i as u32, &calendar))
            .collect();
        let patients = generator.generate(&days).unwrap();
        assert_eq!(patients.len() as u32, days.iter().map(|d| d.admissions).sum::<u32>());
        for d in &days {
            let n = patients.iter().filter(|p| p.admission_date() == d.date).count();
            assert_eq!(n as u32, d.admissions);
        }
        assert_eq!(patients[0].id, "P100001");
        let ids: BTreeSet<&str> = patients.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids.len(), patients.len());
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let (generator, calendar) = setup();
        let days: Vec<DailyRecord> = (0..20)
            .map(|i| day(date(2024, 1, 15) + chrono::Duration::days(i), 150, &calendar))
            .collect();
        let parallel = generator.generate(&days).unwrap();
        let mut sequential = Vec::new();
        let mut next_id = 100_001;
        for d in &days {
            sequential.extend(generator.generate_day(d, next_id).unwrap());
            next_id += d.admissions as u64;
        }
        assert_eq!(parallel, sequential);
    }

    #[test]
    fn test_patient_rules_hold() {
        let (generator, calendar) = setup();
        let days: Vec<DailyRecord> = (0..30)
            .map(|i| day(date(2024, 1, 10) + chrono::Duration::days(i), 400, &calendar))
            .collect();
        let patients = generator.generate(&days).unwrap();
        for p in &patients {
            assert!(p.discharged_at >= p.admitted_at, "{:?}", p);
            assert!((1..=5).contains(&p.severity));
            assert!(p.stay_days <= 90);
            assert!(p.age <= 99);
            assert_eq!(p.discharge_date(), p.admission_date() + chrono::Duration::days(p.stay_days as i64));
            if p.service == "pediatrics" {
                assert!(p.age <= 17);
            }
            if p.service == "emergency" {
                assert_eq!(p.admission_type, AdmissionType::Emergency);
            }
            if p.stay_days == 0 {
                assert!(p.bed_category.is_none());
            } else {
                assert!(p.bed_category.is_some());
            }
            match p.admission_type {
                AdmissionType::Transfer => assert_eq!(p.arrival_mode, ArrivalMode::Transfer),
                AdmissionType::Emergency => assert!(matches!(
                    p.arrival_mode,
                    ArrivalMode::WalkIn | ArrivalMode::Ambulance | ArrivalMode::MobileIcu
                )),
                AdmissionType::Scheduled => assert!(matches!(
                    p.arrival_mode,
                    ArrivalMode::Consultation | ArrivalMode::Planned
                )),
            }
            let distinct: BTreeSet<&String> = p.exam_types.iter().collect();
            assert_eq!(distinct.len(), p.exam_types.len());
            assert_eq!(p.exam_types.len(), (p.exam_count as usize).min(4));
            assert!(p.cost > 0.0);
            assert_eq!((p.cost * 100.0).round() / 100.0, p.cost);
        }
    }

    #[test]
    fn test_service_mix_follows_weights() {
        let (generator, calendar) = setup();
        let normal = day(date(2024, 6, 4), 40_000, &calendar);
        assert_eq!(normal.event_category, EventCategory::Normal);
        let patients = generator.generate(&[normal]).unwrap();
        let observed = shares(&patients);
        for service in &generator.config.patients.services {
            let share = observed.get(&service.id).copied().unwrap_or(0.0);
            assert!(
                (share - service.weight).abs() < 0.01,
                "{} share {} vs {}",
                service.id,
                share,
                service.weight
            );
        }
    }

    #[test]
    fn test_event_boosts_affected_services() {
        let (generator, calendar) = setup();
        let normal = generator.generate(&[day(date(2024, 6, 4), 20_000, &calendar)]).unwrap();
        let heat = generator.generate(&[day(date(2024, 7, 20), 20_000, &calendar)]).unwrap();
        assert_eq!(heat[0].event, "Heatwave July 2024");
        let before = shares(&normal);
        let during = shares(&heat);
        assert!(during["cardiology"] > before["cardiology"]);
        assert!(during["surgery"] < before["surgery"]);

        let event = calendar.find("Heatwave July 2024").unwrap();
        let table = generator.service_table(event).unwrap();
        let total: f64 = table.probabilities().iter().sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_event_reasons_dominate() {
        let (generator, calendar) = setup();
        let patients = generator.generate(&[day(date(2024, 11, 1), 5_000, &calendar)]).unwrap();
        let bronchiolitis = patients.iter().filter(|p| p.reason == "Bronchiolitis").count();
        assert!(bronchiolitis as f64 / patients.len() as f64 > 0.45);
    }

    fn mean_severity<'a>(patients: impl Iterator<Item = &'a PatientRecord>) -> f64 {
        let (sum, n) = patients.fold((0.0, 0.0), |(s, n), p| (s + p.severity as f64, n + 1.0));
        sum / n
    }

    fn mean_stay<'a>(patients: impl Iterator<Item = &'a PatientRecord>) -> f64 {
        let (sum, n) = patients.fold((0.0, 0.0), |(s, n), p| (s + p.stay_days as f64, n + 1.0));
        sum / n
    }

    #[test]
    fn test_elderly_patients_are_more_severe() {
        let (generator, calendar) = setup();
        let patients = generator.generate(&[day(date(2024, 6, 4), 20_000, &calendar)]).unwrap();
        let elderly = mean_severity(patients.iter().filter(|p| p.age > 70));
        let younger = mean_severity(patients.iter().filter(|p| p.age <= 70));
        assert!(elderly - younger > 0.6, "elderly {} vs younger {}", elderly, younger);
    }

    #[test]
    fn test_event_days_are_more_severe() {
        let (generator, calendar) = setup();
        let normal = generator.generate(&[day(date(2024, 6, 4), 20_000, &calendar)]).unwrap();
        let heat = generator.generate(&[day(date(2024, 7, 20), 20_000, &calendar)]).unwrap();
        assert_eq!(normal[0].event, Event::NORMAL_NAME);
        assert_eq!(heat[0].event, "Heatwave July 2024");
        // same age group on both days
        let before = mean_severity(normal.iter().filter(|p| p.age <= 70));
        let during = mean_severity(heat.iter().filter(|p| p.age <= 70));
        assert!(during - before > 0.25, "event {} vs normal {}", during, before);
    }

    #[test]
    fn test_rapid_turnaround_emergencies_leave_quickly() {
        let (generator, calendar) = setup();
        let patients = generator.generate(&[day(date(2024, 6, 4), 20_000, &calendar)]).unwrap();
        let rapid: Vec<&PatientRecord> = patients
            .iter()
            .filter(|p| p.service == "emergency" && p.admission_type == AdmissionType::Emergency)
            .collect();
        assert!(!rapid.is_empty());
        let rapid_mean = mean_stay(rapid.iter().copied());
        let same_day = rapid.iter().filter(|p| p.stay_days == 0).count() as f64 / rapid.len() as f64;
        let other_emergencies = mean_stay(
            patients
                .iter()
                .filter(|p| p.service != "emergency" && p.admission_type == AdmissionType::Emergency),
        );
        let others = mean_stay(patients.iter().filter(|p| p.service != "emergency"));
        assert!(rapid_mean < 0.5, "rapid mean stay {}", rapid_mean);
        assert!(same_day > 0.75, "same-day share {}", same_day);
        assert!(other_emergencies > 2.0, "other emergencies {}", other_emergencies);
        assert!(others > 4.0 * rapid_mean, "others {} vs rapid {}", others, rapid_mean);
    }

    #[test]
    fn test_same_seed_same_log() {
        let (generator, calendar) = setup();
        let days = vec![day(date(2025, 3, 15), 800, &calendar)];
        assert_eq!(generator.generate(&days).unwrap(), generator.generate(&days).unwrap());
        let other = PatientGenerator::new(Arc::new(HospitalConfig::default()), 7).unwrap();
        assert_ne!(generator.generate(&days).unwrap(), other.generate(&days).unwrap());
    }

    #[test]
    fn test_zero_admissions_yield_no_patients() {
        let (generator, calendar) = setup();
        assert!(generator.generate(&[]).unwrap().is_empty());
        assert!(generator
            .generate(&[day(date(2024, 1, 1), 0, &calendar)])
            .unwrap()
            .is_empty());
    }
}
