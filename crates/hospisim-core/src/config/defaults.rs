use chrono::NaiveDate;

use super::*;
use crate::coefficients::{FluTempering, SeasonFactors};
use crate::events::EventCategory;

const MONTHLY: [f64; MONTHS] = [
    1.0186, 1.0250, 1.0027, 0.9346, 0.9640, 1.0421, 0.9658, 0.8694, 1.0345, 1.0707, 1.0386,
    1.0380,
];

const WEEKDAY: [f64; WEEKDAYS] = [1.0934, 1.0013, 0.9946, 1.0040, 1.0182, 0.9694, 0.9194];

// Weekly influenza-like-illness coefficients, 1.0 = annual mean.
const EPI_WEEK: [f64; crate::coefficients::EPI_WEEKS] = [
    2.178, 2.123, 2.482, 3.103, 3.594, 3.682, 3.173, 2.514, 1.890, 1.549, 1.325, 1.170, 1.017,
    0.828, 0.545, 0.389, 0.272, 0.188, 0.161, 0.142, 0.122, 0.122, 0.136, 0.126, 0.126, 0.114,
    0.111, 0.097, 0.094, 0.083, 0.105, 0.079, 0.088, 0.106, 0.110, 0.134, 0.215, 0.324, 0.405,
    0.427, 0.450, 0.460, 0.446, 0.440, 0.522, 0.623, 1.031, 1.640, 2.371, 2.831, 3.056, 2.383,
];

const SERVICES: [&str; 8] = [
    "medicine",
    "surgery",
    "emergency",
    "intensive_care",
    "cardiology",
    "neurology",
    "pediatrics",
    "infectious_diseases",
];

const CRITICAL_CARE: Interval = Interval::new(0.60, 0.98);
const EMERGENCY: Interval = Interval::new(0.70, 1.15);
const GENERAL: Interval = Interval::new(0.30, 0.98);

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap_or(NaiveDate::MIN)
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn event(
    name: &str,
    start: NaiveDate,
    end: NaiveDate,
    category: EventCategory,
    magnitude: f64,
    affected: &[&str],
    reasons: &[&str],
) -> Event {
    Event {
        name: name.to_string(),
        start,
        end,
        category,
        magnitude,
        affected: affected.iter().map(|s| s.to_string()).collect(),
        severe_share: None,
        reasons: strings(reasons),
    }
}

fn default_events() -> Vec<Event> {
    use EventCategory::*;
    let mut major_incident = event(
        "Major incident",
        ymd(2025, 3, 15),
        ymd(2025, 3, 15),
        MassCasualty,
        1.85,
        &["emergency", "intensive_care"],
        &["Polytrauma", "Burn", "Trauma"],
    );
    major_incident.severe_share = Some(0.15);

    vec![
        event(
            "Flu peak winter 2024",
            ymd(2024, 1, 22),
            ymd(2024, 2, 11),
            Epidemic,
            1.42,
            &["emergency", "infectious_diseases", "pediatrics", "intensive_care"],
            &["Influenza", "Pneumonia"],
        ),
        event(
            "Gastroenteritis March",
            ymd(2024, 3, 10),
            ymd(2024, 3, 20),
            Epidemic,
            1.18,
            &["emergency", "pediatrics", "infectious_diseases"],
            &["Gastroenteritis", "Dehydration"],
        ),
        event(
            "Heatwave July 2024",
            ymd(2024, 7, 18),
            ymd(2024, 7, 25),
            Heatwave,
            1.28,
            &["emergency", "cardiology", "neurology"],
            &["Dehydration", "Heat stroke", "Malaise"],
        ),
        event(
            "Bronchiolitis autumn 2024",
            ymd(2024, 10, 28),
            ymd(2024, 11, 17),
            Epidemic,
            1.32,
            &["emergency", "pediatrics"],
            &["Bronchiolitis"],
        ),
        event(
            "Triple epidemic winter",
            ymd(2024, 12, 16),
            ymd(2025, 1, 12),
            Epidemic,
            1.55,
            &["emergency", "infectious_diseases", "pediatrics", "intensive_care"],
            &["Influenza", "COVID-19", "Bronchiolitis", "Pneumonia"],
        ),
        event(
            "Gastroenteritis winter",
            ymd(2025, 2, 8),
            ymd(2025, 2, 18),
            Epidemic,
            1.22,
            &["emergency", "pediatrics", "infectious_diseases"],
            &["Gastroenteritis", "Dehydration"],
        ),
        major_incident,
        event(
            "Industrial action",
            ymd(2025, 4, 22),
            ymd(2025, 4, 24),
            Strike,
            0.72,
            &SERVICES,
            &[],
        ),
        event(
            "Extended heatwave August",
            ymd(2025, 8, 2),
            ymd(2025, 8, 14),
            Heatwave,
            1.35,
            &["emergency", "cardiology", "neurology", "intensive_care"],
            &["Dehydration", "Heat stroke", "Malaise"],
        ),
        event(
            "Early autumn flu",
            ymd(2025, 11, 10),
            ymd(2025, 11, 30),
            Epidemic,
            1.38,
            &["emergency", "infectious_diseases", "pediatrics"],
            &["Influenza", "Pneumonia"],
        ),
        event(
            "Holiday epidemic 2025",
            ymd(2025, 12, 15),
            ymd(2025, 12, 31),
            Epidemic,
            1.48,
            &["emergency", "infectious_diseases", "pediatrics", "intensive_care"],
            &["Influenza", "COVID-19", "Pneumonia"],
        ),
    ]
}

fn bed(id: &str, capacity: u32, base_rate: f64, class: ServiceClass) -> BedCategory {
    let bounds = match class {
        ServiceClass::CriticalCare => CRITICAL_CARE,
        ServiceClass::Emergency => EMERGENCY,
        ServiceClass::General => GENERAL,
    };
    BedCategory {
        id: id.to_string(),
        capacity,
        base_rate,
        class,
        bounds,
        noise_sd: 0.04,
    }
}

fn staff(id: &str, authorized: u32, group: StaffGroup) -> StaffCategory {
    StaffCategory {
        id: id.to_string(),
        authorized,
        group,
    }
}

fn equipment(id: &str, base: u32, step: u32, from_year: i32, every_years: u32) -> EquipmentSchedule {
    EquipmentSchedule {
        id: id.to_string(),
        base,
        step,
        from_year,
        every_years,
    }
}

fn service(
    id: &str,
    weight: f64,
    admission: AdmissionPolicy,
    cost_multiplier: f64,
    beds: &[&str],
    reasons: &[&str],
) -> ServiceConfig {
    ServiceConfig {
        id: id.to_string(),
        weight,
        admission,
        rapid_turnaround: false,
        cost_multiplier,
        bed_categories: strings(beds),
        age_range: None,
        reasons: strings(reasons),
    }
}

fn default_services() -> Vec<ServiceConfig> {
    use AdmissionPolicy::*;
    let mut emergency = service(
        "emergency",
        0.18,
        EmergencyOnly,
        1.0,
        &["medicine", "surgery"],
        &[
            "Trauma",
            "Chest pain",
            "Abdominal pain",
            "Malaise",
            "Fall",
            "Accident",
            "Poisoning",
            "Burn",
            "Wound",
            "Fever",
        ],
    );
    emergency.rapid_turnaround = true;

    let mut pediatrics = service(
        "pediatrics",
        0.06,
        Standard,
        1.0,
        &["medicine"],
        &[
            "Bronchiolitis",
            "Gastroenteritis",
            "Otitis",
            "Fever",
            "Asthma",
            "Fracture",
            "Dehydration",
        ],
    );
    pediatrics.age_range = Some(AgeRange { min: 0, max: 17 });

    vec![
        service(
            "medicine",
            0.25,
            Standard,
            1.0,
            &["medicine"],
            &[
                "Dyspnea",
                "Infection",
                "Chronic follow-up",
                "Decompensated diabetes",
                "Malaise",
                "Diagnostic workup",
            ],
        ),
        service(
            "surgery",
            0.20,
            MostlyScheduled {
                scheduled_share: 0.7,
            },
            1.8,
            &["surgery"],
            &["Scheduled surgery", "Fracture", "Appendicitis", "Hernia", "Trauma"],
        ),
        emergency,
        service(
            "intensive_care",
            0.05,
            Standard,
            3.0,
            &["intensive_care", "step_down"],
            &[
                "Septic shock",
                "Respiratory distress",
                "Coma",
                "Polytrauma",
                "Cardiac arrest",
                "Multiple organ failure",
            ],
        ),
        service(
            "cardiology",
            0.10,
            Standard,
            1.0,
            &["medicine", "step_down"],
            &[
                "Myocardial infarction",
                "Heart failure",
                "Arrhythmia",
                "Angina",
                "Hypertension",
                "Pulmonary embolism",
            ],
        ),
        service(
            "neurology",
            0.08,
            Standard,
            1.0,
            &["medicine", "step_down"],
            &[
                "Stroke",
                "Epilepsy",
                "Severe migraine",
                "Multiple sclerosis",
                "Parkinson's disease",
                "Head injury",
            ],
        ),
        pediatrics,
        service(
            "infectious_diseases",
            0.08,
            Standard,
            1.0,
            &["medicine"],
            &[
                "Severe influenza",
                "COVID-19",
                "Pneumonia",
                "Sepsis",
                "Urinary tract infection",
                "Gastroenteritis",
                "Tuberculosis",
            ],
        ),
    ]
}

fn resource(
    id: &str,
    beds: u32,
    staff_ratio: f64,
    occupancy_base: f64,
    occupancy_variance: f64,
    class: ServiceClass,
) -> ResourceService {
    ResourceService {
        id: id.to_string(),
        beds,
        staff_ratio,
        occupancy_base,
        occupancy_variance,
        class,
    }
}

impl Default for HospitalConfig {
    fn default() -> Self {
        use ArrivalMode::*;
        use ServiceClass::*;
        use StaffGroup::*;

        Self {
            name: "Synthetic university hospital".to_string(),
            reference_year: 2023,
            coefficients: SeasonalCoefficients {
                monthly: MONTHLY.to_vec(),
                weekday: WEEKDAY.to_vec(),
                epi_week: EPI_WEEK.to_vec(),
                seasons: SeasonFactors {
                    winter: 1.15,
                    spring: 1.00,
                    summer: 0.85,
                    autumn: 1.05,
                },
                flu: FluTempering {
                    k_up: 0.06,
                    k_down: 0.03,
                },
            },
            events: default_events(),
            admissions: AdmissionsConfig {
                base_rate: 450.0,
                annual_growth: 0.02,
                smoothing_alpha: 0.7,
                noise_sd: 0.08,
                floor: 50,
            },
            beds: BedsConfig {
                annual_growth: 0.01,
                categories: vec![
                    bed("medicine", 742, 0.67, General),
                    bed("surgery", 385, 0.85, General),
                    bed("intensive_care", 104, 0.85, CriticalCare),
                    bed("step_down", 70, 0.82, CriticalCare),
                    bed("continuing_care", 49, 0.78, General),
                    bed("obstetrics", 48, 0.68, General),
                    bed("emergency", 50, 0.95, Emergency),
                ],
            },
            tension: TensionConfig {
                season_blend: 0.5,
                admission_blend: 0.2,
            },
            staff: StaffConfig {
                medical_growth: 0.025,
                non_medical_growth: 0.015,
                weekday_presence: Interval::new(0.88, 0.96),
                weekend_presence: Interval::new(0.65, 0.75),
                event_damping: 0.3,
                utilization: Interval::new(0.80, 0.98),
                categories: vec![
                    staff("physicians", 479, Medical),
                    staff("surgeons", 120, Medical),
                    staff("anesthetists", 122, Medical),
                    staff("obstetricians", 13, Medical),
                    staff("administrative", 745, NonMedical),
                    staff("nursing", 4716, NonMedical),
                    staff("social_educational", 87, NonMedical),
                    staff("medical_technical", 598, NonMedical),
                    staff("technical_workers", 953, NonMedical),
                ],
            },
            equipment: vec![
                equipment("ct_scanners", 7, 1, 2022, 1),
                equipment("mri", 6, 1, 2023, 1),
                equipment("pet_scanners", 3, 0, 0, 1),
                equipment("vascular_rooms", 7, 0, 0, 1),
                equipment("operating_rooms", 53, 1, 2021, 2),
            ],
            exams: ExamConfig {
                ratio: Interval::new(1.5, 2.0),
                event_boost: 1.1,
                modalities: vec![
                    ModalityShare {
                        id: "ct".to_string(),
                        share: Interval::new(0.23, 0.27),
                    },
                    ModalityShare {
                        id: "mri".to_string(),
                        share: Interval::new(0.13, 0.17),
                    },
                    ModalityShare {
                        id: "xray".to_string(),
                        share: Interval::new(0.38, 0.42),
                    },
                ],
            },
            mortality: MortalityConfig {
                normal_severe_share: 0.05,
                event_severe_share: 0.07,
                severe_mortality: Interval::new(0.025, 0.045),
            },
            blood: BloodStockConfig {
                initial: 500.0,
                min: 300.0,
                max: 700.0,
                critical_threshold: 400.0,
                consumption_per_severe_case: 0.3,
                replenishment: Interval::new(15.0, 25.0),
            },
            patients: PatientConfig {
                services: default_services(),
                event_boost: 2.0,
                event_reduction: 0.5,
                age_bands: [5u8, 15, 25, 35, 45, 55, 65, 75, 85]
                    .into_iter()
                    .zip([0.05, 0.05, 0.10, 0.12, 0.15, 0.18, 0.18, 0.12, 0.05])
                    .map(|(age, w)| Weighted::new(age, w))
                    .collect(),
                age_jitter: 4,
                sex: vec![Weighted::new(Sex::F, 0.52), Weighted::new(Sex::M, 0.48)],
                transfer_share: 0.3,
                emergency_share: 0.6,
                severity: SeverityConfig {
                    base: 2.0,
                    elderly_age: 70,
                    elderly_bump: 1.0,
                    event_bump: 0.5,
                    noise_sd: 0.8,
                    max_tier: 5,
                },
                stay: StayConfig {
                    rapid_mean_days: 0.5,
                    days_per_severity: 1.5,
                    days_per_age_year: 0.03,
                    max_days: 90,
                },
                cost: CostConfig {
                    tiers: vec![
                        Interval::new(500.0, 1_500.0),
                        Interval::new(1_500.0, 4_000.0),
                        Interval::new(4_000.0, 10_000.0),
                        Interval::new(10_000.0, 20_000.0),
                        Interval::new(20_000.0, 30_000.0),
                    ],
                    per_stay_day: 0.1,
                },
                hourly_profile: vec![
                    0.02, 0.01, 0.01, 0.01, 0.01, 0.02, 0.03, 0.04, 0.06, 0.07, 0.08, 0.07, 0.05,
                    0.04, 0.04, 0.05, 0.05, 0.06, 0.07, 0.08, 0.07, 0.05, 0.04, 0.03,
                ],
                emergency_arrivals: vec![
                    Weighted::new(WalkIn, 0.50),
                    Weighted::new(Ambulance, 0.35),
                    Weighted::new(MobileIcu, 0.15),
                ],
                scheduled_arrivals: vec![
                    Weighted::new(Consultation, 0.25),
                    Weighted::new(Planned, 0.75),
                ],
                exams: PatientExamConfig {
                    types: strings(&["xray", "ct", "mri", "ultrasound", "lab", "ecg"]),
                    max_types: 4,
                    counts_by_severity: vec![[0, 1], [0, 2], [1, 3], [2, 5], [2, 5]],
                },
                reasons: strings(&[
                    "Chest pain",
                    "Dyspnea",
                    "Trauma",
                    "Infection",
                    "Scheduled surgery",
                    "Diagnostic workup",
                    "Chronic follow-up",
                    "Stroke",
                    "Malaise",
                    "Abdominal pain",
                    "Fracture",
                    "Influenza",
                    "COVID-19",
                    "Pneumonia",
                    "Heart failure",
                    "Decompensated diabetes",
                ]),
                event_reason_share: 0.5,
                first_id: default_first_id(),
            },
            resources: ResourceConfig {
                services: vec![
                    resource("medicine", 732, 0.8, 0.85, 0.08, General),
                    resource("surgery", 390, 1.0, 0.82, 0.10, General),
                    resource("emergency", 50, 2.5, 0.95, 0.05, Emergency),
                    resource("intensive_care", 104, 3.0, 0.85, 0.08, CriticalCare),
                    resource("step_down", 120, 2.0, 0.83, 0.10, CriticalCare),
                    resource("continuing_care", 112, 1.5, 0.80, 0.12, CriticalCare),
                    resource("rehabilitation", 75, 0.6, 0.92, 0.05, General),
                    resource("obstetrics", 46, 1.2, 0.75, 0.15, General),
                ],
                weekday: vec![1.08, 1.02, 1.00, 0.98, 0.95, 0.90, 0.92],
                monthly: vec![
                    1.12, 1.08, 1.02, 0.98, 0.95, 0.90, 0.85, 0.82, 0.95, 1.00, 1.05, 1.10,
                ],
                class_bounds: ClassBounds {
                    emergency: Interval::new(0.80, 1.10),
                    critical_care: Interval::new(0.60, 0.98),
                    general: Interval::new(0.50, 0.98),
                },
                weekday_presence: 0.90,
                weekend_presence: 0.70,
                vacation_months: vec![7, 8],
                vacation_factor: 0.85,
                presence_jitter: Interval::new(0.95, 1.02),
                busy_staff_factor: 0.8,
            },
        }
    }
}
