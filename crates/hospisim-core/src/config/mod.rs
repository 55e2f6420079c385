//! Immutable calibration configuration.
//!
//! A [`HospitalConfig`] is built once (from JSON or [`Default`]), validated,
//! and then shared read-only by every generator. Generators that need to
//! tune a value keep their own copy instead of mutating the configuration.

mod defaults;

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::coefficients::{check_table, SeasonalCoefficients, MONTHS, WEEKDAYS};
use crate::error::ConfigError;
use crate::events::{Event, EventCalendar};
use crate::sampling::{Interval, Weighted, WeightedTable};
use crate::types::{ArrivalMode, Sex};

pub const HOURS_PER_DAY: usize = 24;

/// Oldest age a patient may be drawn with.
pub const MAX_AGE: u8 = 99;

/// Clamp family of a bed category or service.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceClass {
    /// Saturating services whose occupancy may exceed 100%
    Emergency,
    /// Critical care keeps a tight band to preserve surge margin
    CriticalCare,
    General,
}

/// Daily admission baseline and smoothing.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AdmissionsConfig {
    /// Expected admissions per day in `reference_year` under neutral coefficients
    pub base_rate: f64,
    /// Compound yearly growth of the baseline
    pub annual_growth: f64,
    /// Weight of today's expectation against yesterday's realised admissions
    pub smoothing_alpha: f64,
    /// Standard deviation of the multiplicative daily noise
    pub noise_sd: f64,
    /// Hard minimum of daily admissions
    pub floor: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BedCategory {
    pub id: String,
    /// Beds in `reference_year`
    pub capacity: u32,
    pub base_rate: f64,
    pub class: ServiceClass,
    pub bounds: Interval,
    pub noise_sd: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BedsConfig {
    pub annual_growth: f64,
    pub categories: Vec<BedCategory>,
}

/// Feedback of season and admission pressure into occupancy targets.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TensionConfig {
    /// Blend applied as `(1 - b) + b * season_factor`
    pub season_blend: f64,
    /// Blend applied as `(1 - b) + b * admissions / baseline`
    pub admission_blend: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaffGroup {
    Medical,
    NonMedical,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StaffCategory {
    pub id: String,
    /// Authorized strength in `reference_year`
    pub authorized: u32,
    pub group: StaffGroup,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StaffConfig {
    pub medical_growth: f64,
    pub non_medical_growth: f64,
    pub weekday_presence: Interval,
    pub weekend_presence: Interval,
    /// Share of an event's excess demand that staffing follows
    pub event_damping: f64,
    pub utilization: Interval,
    pub categories: Vec<StaffCategory>,
}

impl StaffConfig {
    pub fn growth(&self, group: StaffGroup) -> f64 {
        match group {
            StaffGroup::Medical => self.medical_growth,
            StaffGroup::NonMedical => self.non_medical_growth,
        }
    }
}

/// Step schedule of an equipment count, keyed by year only.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EquipmentSchedule {
    pub id: String,
    pub base: u32,
    /// Units added per completed period
    #[serde(default)]
    pub step: u32,
    #[serde(default)]
    pub from_year: i32,
    #[serde(default = "default_every_years")]
    pub every_years: u32,
}

fn default_every_years() -> u32 {
    1
}

impl EquipmentSchedule {
    /// Count in service during `year`; non-decreasing in `year`.
    pub fn count(&self, year: i32) -> u32 {
        let elapsed = (year - self.from_year).max(0) as u32;
        self.base + self.step * (elapsed / self.every_years.max(1))
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModalityShare {
    pub id: String,
    pub share: Interval,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExamConfig {
    /// Exams per admission
    pub ratio: Interval,
    /// Extra exam ratio while any event is active
    pub event_boost: f64,
    /// Named modalities; the remainder is reported as "other"
    pub modalities: Vec<ModalityShare>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MortalityConfig {
    pub normal_severe_share: f64,
    pub event_severe_share: f64,
    pub severe_mortality: Interval,
}

/// Conserved blood-bag stock.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BloodStockConfig {
    pub initial: f64,
    pub min: f64,
    pub max: f64,
    pub critical_threshold: f64,
    pub consumption_per_severe_case: f64,
    pub replenishment: Interval,
}

/// How a service assigns the admission type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AdmissionPolicy {
    EmergencyOnly,
    MostlyScheduled { scheduled_share: f64 },
    Standard,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgeRange {
    pub min: u8,
    pub max: u8,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub id: String,
    pub weight: f64,
    pub admission: AdmissionPolicy,
    /// Short-stay service: emergency admissions use the rapid stay mean
    #[serde(default)]
    pub rapid_turnaround: bool,
    pub cost_multiplier: f64,
    pub bed_categories: Vec<String>,
    #[serde(default)]
    pub age_range: Option<AgeRange>,
    #[serde(default)]
    pub reasons: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SeverityConfig {
    pub base: f64,
    pub elderly_age: u8,
    pub elderly_bump: f64,
    pub event_bump: f64,
    pub noise_sd: f64,
    pub max_tier: u8,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StayConfig {
    pub rapid_mean_days: f64,
    pub days_per_severity: f64,
    pub days_per_age_year: f64,
    pub max_days: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CostConfig {
    /// One range per severity tier, tier 1 first
    pub tiers: Vec<Interval>,
    /// Relative cost increase per day of stay
    pub per_stay_day: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PatientExamConfig {
    pub types: Vec<String>,
    pub max_types: usize,
    /// Inclusive exam-count range per severity tier, tier 1 first
    pub counts_by_severity: Vec<[u32; 2]>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PatientConfig {
    pub services: Vec<ServiceConfig>,
    /// Weight multiplier of services affected by the active event
    pub event_boost: f64,
    /// Weight multiplier of the other services during an event
    pub event_reduction: f64,
    pub age_bands: Vec<Weighted<u8>>,
    pub age_jitter: u8,
    pub sex: Vec<Weighted<Sex>>,
    /// Share of standard-policy admissions that are transfers
    pub transfer_share: f64,
    /// Emergency share of the remaining standard-policy admissions
    pub emergency_share: f64,
    pub severity: SeverityConfig,
    pub stay: StayConfig,
    pub cost: CostConfig,
    /// Relative arrivals per hour of day, midnight first
    pub hourly_profile: Vec<f64>,
    pub emergency_arrivals: Vec<Weighted<ArrivalMode>>,
    pub scheduled_arrivals: Vec<Weighted<ArrivalMode>>,
    pub exams: PatientExamConfig,
    pub reasons: Vec<String>,
    /// Probability that an event day admission carries one of the event's reasons
    pub event_reason_share: f64,
    /// Numeric part of the first patient id
    #[serde(default = "default_first_id")]
    pub first_id: u64,
}

fn default_first_id() -> u64 {
    100_001
}

impl PatientConfig {
    pub fn service(&self, id: &str) -> Option<&ServiceConfig> {
        self.services.iter().find(|s| s.id == id)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResourceService {
    pub id: String,
    pub beds: u32,
    /// Staff per bed
    pub staff_ratio: f64,
    pub occupancy_base: f64,
    pub occupancy_variance: f64,
    pub class: ServiceClass,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClassBounds {
    pub emergency: Interval,
    pub critical_care: Interval,
    pub general: Interval,
}

impl ClassBounds {
    pub fn for_class(&self, class: ServiceClass) -> Interval {
        match class {
            ServiceClass::Emergency => self.emergency,
            ServiceClass::CriticalCare => self.critical_care,
            ServiceClass::General => self.general,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResourceConfig {
    pub services: Vec<ResourceService>,
    /// Monday first
    pub weekday: Vec<f64>,
    /// January first
    pub monthly: Vec<f64>,
    pub class_bounds: ClassBounds,
    pub weekday_presence: f64,
    pub weekend_presence: f64,
    /// Months (1-12) with reduced presence
    pub vacation_months: Vec<u32>,
    pub vacation_factor: f64,
    pub presence_jitter: Interval,
    /// Share of the staffing ratio mobilised per occupied bed
    pub busy_staff_factor: f64,
}

/// Complete calibration input of the generators.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HospitalConfig {
    pub name: String,
    /// Year in which capacities, strengths and the baseline rate are expressed
    pub reference_year: i32,
    pub coefficients: SeasonalCoefficients,
    pub events: Vec<Event>,
    pub admissions: AdmissionsConfig,
    pub beds: BedsConfig,
    pub tension: TensionConfig,
    pub staff: StaffConfig,
    pub equipment: Vec<EquipmentSchedule>,
    pub exams: ExamConfig,
    pub mortality: MortalityConfig,
    pub blood: BloodStockConfig,
    pub patients: PatientConfig,
    pub resources: ResourceConfig,
}

impl HospitalConfig {
    /// Load and validate a configuration from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let file = std::fs::File::open(path.as_ref())?;
        let config: HospitalConfig = serde_json::from_reader(std::io::BufReader::new(file))?;
        config.validate()?;
        tracing::debug!(
            path = %path.as_ref().display(),
            events = config.events.len(),
            "loaded hospital configuration"
        );
        Ok(config)
    }

    /// Parse and validate a configuration from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: HospitalConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }

    /// Event calendar built from `events`.
    pub fn calendar(&self) -> Result<EventCalendar, ConfigError> {
        EventCalendar::new(self.events.clone())
    }

    /// Expected daily admissions for `year` under neutral coefficients.
    pub fn base_rate(&self, year: i32) -> f64 {
        grown(
            self.admissions.base_rate,
            self.admissions.annual_growth,
            year - self.reference_year,
        )
    }

    pub fn bed_capacity(&self, category: &BedCategory, year: i32) -> u32 {
        grown(
            category.capacity as f64,
            self.beds.annual_growth,
            year - self.reference_year,
        ) as u32
    }

    pub fn authorized_staff(&self, category: &StaffCategory, year: i32) -> u32 {
        grown(
            category.authorized as f64,
            self.staff.growth(category.group),
            year - self.reference_year,
        ) as u32
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.coefficients.validate()?;
        self.validate_admissions()?;
        self.validate_beds()?;
        self.validate_staff()?;
        self.validate_equipment()?;
        self.validate_exams()?;
        self.validate_blood()?;
        self.validate_patients()?;
        self.validate_events()?;
        self.validate_resources()?;
        Ok(())
    }

    fn validate_admissions(&self) -> Result<(), ConfigError> {
        let a = &self.admissions;
        positive("admissions.base_rate", a.base_rate)?;
        growth_rate("admissions.annual_growth", a.annual_growth)?;
        unit_interval("admissions.smoothing_alpha", a.smoothing_alpha)?;
        in_range("admissions.noise_sd", a.noise_sd, 0.0, 1.0)?;
        unit_interval("tension.season_blend", self.tension.season_blend)?;
        unit_interval("tension.admission_blend", self.tension.admission_blend)?;
        Ok(())
    }

    fn validate_beds(&self) -> Result<(), ConfigError> {
        growth_rate("beds.annual_growth", self.beds.annual_growth)?;
        unique_ids("beds.categories", self.beds.categories.iter().map(|c| &c.id))?;
        for category in &self.beds.categories {
            let field = format!("beds.{}", category.id);
            positive(&format!("{}.base_rate", field), category.base_rate)?;
            category.bounds.validate(&format!("{}.bounds", field))?;
            in_range(&format!("{}.bounds.min", field), category.bounds.min, 0.0, 2.0)?;
            in_range(&format!("{}.bounds.max", field), category.bounds.max, 0.0, 2.0)?;
            in_range(&format!("{}.noise_sd", field), category.noise_sd, 0.0, 1.0)?;
        }
        Ok(())
    }

    fn validate_staff(&self) -> Result<(), ConfigError> {
        let s = &self.staff;
        growth_rate("staff.medical_growth", s.medical_growth)?;
        growth_rate("staff.non_medical_growth", s.non_medical_growth)?;
        for (field, interval) in [
            ("staff.weekday_presence", s.weekday_presence),
            ("staff.weekend_presence", s.weekend_presence),
            ("staff.utilization", s.utilization),
        ] {
            interval.validate(field)?;
            in_range(&format!("{}.min", field), interval.min, 0.0, 1.0)?;
            in_range(&format!("{}.max", field), interval.max, 0.0, 1.0)?;
        }
        unit_interval("staff.event_damping", s.event_damping)?;
        unique_ids("staff.categories", s.categories.iter().map(|c| &c.id))?;
        Ok(())
    }

    fn validate_equipment(&self) -> Result<(), ConfigError> {
        unique_ids("equipment", self.equipment.iter().map(|e| &e.id))?;
        for schedule in &self.equipment {
            if schedule.every_years == 0 {
                return Err(ConfigError::OutOfRange {
                    field: format!("equipment.{}.every_years", schedule.id),
                    value: 0.0,
                    min: 1.0,
                    max: f64::INFINITY,
                });
            }
        }
        Ok(())
    }

    fn validate_exams(&self) -> Result<(), ConfigError> {
        let e = &self.exams;
        e.ratio.validate("exams.ratio")?;
        positive("exams.ratio.max", e.ratio.max)?;
        in_range("exams.ratio.min", e.ratio.min, 0.0, f64::MAX)?;
        positive("exams.event_boost", e.event_boost)?;
        unique_ids("exams.modalities", e.modalities.iter().map(|m| &m.id))?;
        for modality in &e.modalities {
            let field = format!("exams.modalities.{}.share", modality.id);
            modality.share.validate(&field)?;
            in_range(&format!("{}.min", field), modality.share.min, 0.0, 1.0)?;
            in_range(&format!("{}.max", field), modality.share.max, 0.0, 1.0)?;
        }

        let m = &self.mortality;
        unit_interval("mortality.normal_severe_share", m.normal_severe_share)?;
        unit_interval("mortality.event_severe_share", m.event_severe_share)?;
        m.severe_mortality.validate("mortality.severe_mortality")?;
        in_range("mortality.severe_mortality.min", m.severe_mortality.min, 0.0, 1.0)?;
        in_range("mortality.severe_mortality.max", m.severe_mortality.max, 0.0, 1.0)?;
        Ok(())
    }

    fn validate_blood(&self) -> Result<(), ConfigError> {
        let b = &self.blood;
        Interval::new(b.min, b.max).validate("blood.min..max")?;
        in_range("blood.min", b.min, 0.0, f64::MAX)?;
        in_range("blood.initial", b.initial, b.min, b.max)?;
        in_range("blood.critical_threshold", b.critical_threshold, b.min, b.max)?;
        in_range(
            "blood.consumption_per_severe_case",
            b.consumption_per_severe_case,
            0.0,
            f64::MAX,
        )?;
        b.replenishment.validate("blood.replenishment")?;
        in_range("blood.replenishment.min", b.replenishment.min, 0.0, f64::MAX)?;
        Ok(())
    }

    fn validate_patients(&self) -> Result<(), ConfigError> {
        let p = &self.patients;
        unique_ids("patients.services", p.services.iter().map(|s| &s.id))?;
        WeightedTable::new(
            "patients.services",
            p.services.iter().map(|s| (s.id.clone(), s.weight)).collect(),
        )?;
        let bed_ids: BTreeSet<&str> = self.beds.categories.iter().map(|c| c.id.as_str()).collect();
        for service in &p.services {
            let owner = format!("service '{}'", service.id);
            positive(&format!("{}.cost_multiplier", owner), service.cost_multiplier)?;
            for bed in &service.bed_categories {
                if !bed_ids.contains(bed.as_str()) {
                    return Err(ConfigError::UnknownReference {
                        owner,
                        kind: "bed category",
                        id: bed.clone(),
                    });
                }
            }
            if let Some(range) = service.age_range {
                if range.min > range.max {
                    return Err(ConfigError::EmptyInterval {
                        field: format!("{}.age_range", owner),
                        lower: range.min as f64,
                        upper: range.max as f64,
                    });
                }
                if range.max > MAX_AGE {
                    return Err(ConfigError::OutOfRange {
                        field: format!("{}.age_range.max", owner),
                        value: range.max as f64,
                        min: 0.0,
                        max: MAX_AGE as f64,
                    });
                }
            }
            if let AdmissionPolicy::MostlyScheduled { scheduled_share } = service.admission {
                unit_interval(&format!("{}.scheduled_share", owner), scheduled_share)?;
            }
        }

        positive("patients.event_boost", p.event_boost)?;
        positive("patients.event_reduction", p.event_reduction)?;
        WeightedTable::from_weighted("patients.age_bands", &p.age_bands)?;
        WeightedTable::from_weighted("patients.sex", &p.sex)?;
        unit_interval("patients.transfer_share", p.transfer_share)?;
        unit_interval("patients.emergency_share", p.emergency_share)?;
        unit_interval("patients.event_reason_share", p.event_reason_share)?;

        let sev = &p.severity;
        if sev.max_tier == 0 {
            return Err(ConfigError::NotPositive {
                field: "patients.severity.max_tier".to_string(),
                value: 0.0,
            });
        }
        in_range("patients.severity.noise_sd", sev.noise_sd, 0.0, f64::MAX)?;

        let stay = &p.stay;
        positive("patients.stay.rapid_mean_days", stay.rapid_mean_days)?;
        positive("patients.stay.days_per_severity", stay.days_per_severity)?;
        in_range("patients.stay.days_per_age_year", stay.days_per_age_year, 0.0, f64::MAX)?;

        let tiers = sev.max_tier as usize;
        if p.cost.tiers.len() != tiers {
            return Err(ConfigError::TableLength {
                table: "patients.cost.tiers",
                expected: tiers,
                found: p.cost.tiers.len(),
            });
        }
        for (i, tier) in p.cost.tiers.iter().enumerate() {
            tier.validate(&format!("patients.cost.tiers[{}]", i))?;
            in_range(&format!("patients.cost.tiers[{}].min", i), tier.min, 0.0, f64::MAX)?;
        }
        in_range("patients.cost.per_stay_day", p.cost.per_stay_day, 0.0, f64::MAX)?;

        if p.hourly_profile.len() != HOURS_PER_DAY {
            return Err(ConfigError::TableLength {
                table: "patients.hourly_profile",
                expected: HOURS_PER_DAY,
                found: p.hourly_profile.len(),
            });
        }
        WeightedTable::new(
            "patients.hourly_profile",
            p.hourly_profile.iter().enumerate().map(|(h, w)| (h, *w)).collect(),
        )?;
        WeightedTable::from_weighted("patients.emergency_arrivals", &p.emergency_arrivals)?;
        WeightedTable::from_weighted("patients.scheduled_arrivals", &p.scheduled_arrivals)?;

        if p.exams.counts_by_severity.len() != tiers {
            return Err(ConfigError::TableLength {
                table: "patients.exams.counts_by_severity",
                expected: tiers,
                found: p.exams.counts_by_severity.len(),
            });
        }
        for (i, [lo, hi]) in p.exams.counts_by_severity.iter().enumerate() {
            if lo > hi {
                return Err(ConfigError::EmptyInterval {
                    field: format!("patients.exams.counts_by_severity[{}]", i),
                    lower: *lo as f64,
                    upper: *hi as f64,
                });
            }
        }
        unique_ids("patients.exams.types", p.exams.types.iter())?;
        if p.exams.max_types > p.exams.types.len() {
            return Err(ConfigError::OutOfRange {
                field: "patients.exams.max_types".to_string(),
                value: p.exams.max_types as f64,
                min: 0.0,
                max: p.exams.types.len() as f64,
            });
        }
        if p.reasons.is_empty() {
            return Err(ConfigError::TableLength {
                table: "patients.reasons",
                expected: 1,
                found: 0,
            });
        }
        Ok(())
    }

    fn validate_events(&self) -> Result<(), ConfigError> {
        let services: BTreeSet<&str> = self
            .patients
            .services
            .iter()
            .map(|s| s.id.as_str())
            .collect();
        for event in &self.events {
            positive(&format!("event '{}'.magnitude", event.name), event.magnitude)?;
            if let Some(share) = event.severe_share {
                unit_interval(&format!("event '{}'.severe_share", event.name), share)?;
            }
            for service in &event.affected {
                if !services.contains(service.as_str()) {
                    return Err(ConfigError::UnknownReference {
                        owner: format!("event '{}'", event.name),
                        kind: "service",
                        id: service.clone(),
                    });
                }
            }
        }
        self.calendar().map(|_| ())
    }

    fn validate_resources(&self) -> Result<(), ConfigError> {
        let r = &self.resources;
        check_table("resources.weekday", &r.weekday, WEEKDAYS)?;
        check_table("resources.monthly", &r.monthly, MONTHS)?;
        unique_ids("resources.services", r.services.iter().map(|s| &s.id))?;
        for service in &r.services {
            let field = format!("resources.{}", service.id);
            positive(&format!("{}.occupancy_base", field), service.occupancy_base)?;
            in_range(&format!("{}.staff_ratio", field), service.staff_ratio, 0.0, f64::MAX)?;
            in_range(
                &format!("{}.occupancy_variance", field),
                service.occupancy_variance,
                0.0,
                1.0,
            )?;
        }
        r.class_bounds.emergency.validate("resources.class_bounds.emergency")?;
        r.class_bounds
            .critical_care
            .validate("resources.class_bounds.critical_care")?;
        r.class_bounds.general.validate("resources.class_bounds.general")?;
        unit_interval("resources.weekday_presence", r.weekday_presence)?;
        unit_interval("resources.weekend_presence", r.weekend_presence)?;
        unit_interval("resources.vacation_factor", r.vacation_factor)?;
        for month in &r.vacation_months {
            in_range("resources.vacation_months", *month as f64, 1.0, 12.0)?;
        }
        r.presence_jitter.validate("resources.presence_jitter")?;
        positive("resources.presence_jitter.min", r.presence_jitter.min)?;
        unit_interval("resources.busy_staff_factor", r.busy_staff_factor)?;
        Ok(())
    }
}

/// `value * (1 + rate)^years`
fn grown(value: f64, rate: f64, years: i32) -> f64 {
    value * (1.0 + rate).powi(years)
}

pub(crate) fn positive(field: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NotPositive {
            field: field.to_string(),
            value,
        })
    }
}

pub(crate) fn in_range(field: &str, value: f64, min: f64, max: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= min && value <= max {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field: field.to_string(),
            value,
            min,
            max,
        })
    }
}

pub(crate) fn unit_interval(field: &str, value: f64) -> Result<(), ConfigError> {
    in_range(field, value, 0.0, 1.0)
}

fn growth_rate(field: &str, value: f64) -> Result<(), ConfigError> {
    in_range(field, value, -0.5, 1.0)
}

fn unique_ids<'a, I>(table: &'static str, ids: I) -> Result<(), ConfigError>
where
    I: Iterator<Item = &'a String>,
{
    let mut seen = BTreeSet::new();
    for id in ids {
        if !seen.insert(id.as_str()) {
            return Err(ConfigError::DuplicateId {
                table,
                id: id.clone(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        HospitalConfig::default().validate().unwrap();
    }

    #[test]
    fn test_json_roundtrip_preserves_validity() {
        let config = HospitalConfig::default();
        let json = config.to_json().unwrap();
        let parsed = HospitalConfig::from_json(&json).unwrap();
        assert_eq!(parsed.events.len(), config.events.len());
        assert_eq!(parsed.patients.services.len(), config.patients.services.len());
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hospital.json");
        HospitalConfig::default().to_json_file(&path).unwrap();
        let loaded = HospitalConfig::from_json_file(&path).unwrap();
        assert_eq!(loaded.name, HospitalConfig::default().name);
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let result = HospitalConfig::from_json_file("/nonexistent/hospital.json");
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_malformed_json_is_fatal() {
        assert!(matches!(
            HospitalConfig::from_json("{\"name\": 3}"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_base_rate_must_be_positive() {
        let mut config = HospitalConfig::default();
        config.admissions.base_rate = 0.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NotPositive { .. })
        ));
    }

    #[test]
    fn test_event_with_unknown_service_is_rejected() {
        let mut config = HospitalConfig::default();
        config.events[0].affected.insert("radiology".to_string());
        assert!(matches!(
            config.validate(),
            Err(ConfigError::UnknownReference { kind: "service", .. })
        ));
    }

    #[test]
    fn test_age_range_must_stay_within_patient_ages() {
        let mut config = HospitalConfig::default();
        let pediatrics = config
            .patients
            .services
            .iter_mut()
            .find(|s| s.id == "pediatrics")
            .unwrap();
        pediatrics.age_range = Some(AgeRange { min: 0, max: 120 });
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfRange { ref field, .. }) if field == "service 'pediatrics'.age_range.max"
        ));

        let pediatrics = config
            .patients
            .services
            .iter_mut()
            .find(|s| s.id == "pediatrics")
            .unwrap();
        pediatrics.age_range = Some(AgeRange { min: 0, max: MAX_AGE });
        config.validate().unwrap();
    }

    #[test]
    fn test_overlapping_default_events_are_rejected() {
        let mut config = HospitalConfig::default();
        let mut copy = config.events[0].clone();
        copy.name = "copy".to_string();
        copy.start = copy.start + chrono::Duration::days(1);
        config.events.push(copy);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OverlappingEvents { .. })
        ));
    }

    #[test]
    fn test_growth_is_compounded_from_reference_year() {
        let config = HospitalConfig::default();
        let y = config.reference_year;
        assert!((config.base_rate(y) - config.admissions.base_rate).abs() < 1e-9);
        let expected = config.admissions.base_rate * (1.0 + config.admissions.annual_growth).powi(2);
        assert!((config.base_rate(y + 2) - expected).abs() < 1e-9);
        assert!(config.base_rate(y - 1) < config.base_rate(y));
    }

    #[test]
    fn test_equipment_schedule_is_monotonic() {
        let config = HospitalConfig::default();
        for schedule in &config.equipment {
            let mut previous = 0;
            for year in 2015..2035 {
                let count = schedule.count(year);
                assert!(count >= previous, "{} decreased in {}", schedule.id, year);
                previous = count;
            }
        }
    }

    #[test]
    fn test_staff_strength_grows_by_group() {
        let config = HospitalConfig::default();
        let y = config.reference_year;
        for category in &config.staff.categories {
            assert!(config.authorized_staff(category, y + 3) >= config.authorized_staff(category, y));
        }
    }
}
