//! Day-by-day establishment generator.
//!
//! Each step combines the year's baseline rate with the calendar tables and
//! the active event, smooths the result against the previous day's realised
//! admissions, and derives beds, staffing, equipment, exams, deaths and the
//! blood stock from it.

mod tunables;

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{Datelike, NaiveDate, Weekday};
use rand_chacha::ChaCha8Rng;

use hospisim_core::sampling::gaussian;
use hospisim_core::{
    stream_rng, BedOccupancy, DailyRecord, EquipmentCount, Event, EventCalendar, ExamCounts,
    HospitalConfig, ModalityCount, Season, SimulationEngine, SimulationError, StaffPresence,
    Stream,
};

pub use tunables::Tunables;

#[derive(Clone)]
pub struct DailyGenerator {
    config: Arc<HospitalConfig>,
    calendar: Arc<EventCalendar>,
    tunables: Tunables,
    seed: u64,
    start: NaiveDate,
    end: NaiveDate,
    // carried state
    cursor: NaiveDate,
    // set once the cursor has no successor date
    exhausted: bool,
    steps: u32,
    prev_admissions: f64,
    blood_stock: f64,
    rng: ChaCha8Rng,
}

impl DailyGenerator {
    /// Generator over the inclusive range `start..=end`.
    pub fn new(
        config: Arc<HospitalConfig>,
        seed: u64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Self, SimulationError> {
        if start > end {
            return Err(SimulationError::InvalidDateRange { start, end });
        }
        config.validate()?;
        let calendar = Arc::new(config.calendar()?);
        let tunables = Tunables::from_config(&config);

        let mut generator = Self {
            blood_stock: config.blood.initial,
            config,
            calendar,
            tunables,
            seed,
            start,
            end,
            cursor: start,
            exhausted: false,
            steps: 0,
            prev_admissions: 0.0,
            rng: stream_rng(seed, Stream::Establishment),
        };
        generator.reset();
        tracing::debug!(
            %start,
            %end,
            seed,
            events = generator.calendar.len(),
            "created daily generator"
        );
        Ok(generator)
    }

    pub fn config(&self) -> &Arc<HospitalConfig> {
        &self.config
    }

    pub fn calendar(&self) -> &Arc<EventCalendar> {
        &self.calendar
    }

    pub fn tunables(&self) -> &Tunables {
        &self.tunables
    }

    /// Number of days in the configured range.
    pub fn len_days(&self) -> u32 {
        ((self.end - self.start).num_days() + 1) as u32
    }

    pub fn is_finished(&self) -> bool {
        self.exhausted || self.cursor > self.end
    }

    /// Expected daily admissions for `year` under neutral coefficients.
    pub fn base_rate(&self, year: i32) -> f64 {
        let years = year - self.config.reference_year;
        self.tunables.base_rate * (1.0 + self.tunables.annual_growth).powi(years)
    }

    /// Expected admissions on `date` before smoothing and noise.
    pub fn expected_admissions(&self, date: NaiveDate, event: &Event) -> f64 {
        let c = &self.config.coefficients;
        let branch = if event.is_epidemic() {
            event.magnitude
        } else {
            c.flu_factor_with(date, &self.tunables.flu) * event.magnitude
        };
        self.base_rate(date.year()) * c.seasonal_factor(date) * c.weekly_factor(date) * branch
    }

    /// Generates every remaining day of the range.
    pub fn generate(&mut self) -> Vec<DailyRecord> {
        let records: Vec<DailyRecord> = self.by_ref().collect();
        let admissions: u64 = records.iter().map(|r| r.admissions as u64).sum();
        tracing::info!(
            days = records.len(),
            admissions,
            "generated establishment series"
        );
        records
    }

    fn next_record(&mut self) -> Result<DailyRecord, SimulationError> {
        if self.is_finished() {
            return Err(SimulationError::Exhausted(self.cursor));
        }
        let date = self.cursor;
        let calendar = Arc::clone(&self.calendar);
        let event = calendar.active_event(date);
        let season = Season::of(date);
        let year = date.year();
        let base = self.base_rate(year);

        let admissions = self.draw_admissions(date, event);
        let tension = admissions as f64 / base;
        let beds = self.draw_beds(date, year, event, tension);
        let staff = self.draw_staff(date, year, event);
        let equipment = self
            .config
            .equipment
            .iter()
            .map(|e| EquipmentCount {
                equipment: e.id.clone(),
                count: e.count(year),
            })
            .collect();
        let exams = self.draw_exams(admissions, event);
        let (severe_cases, deaths) = self.draw_severity(admissions, event);
        let blood_stock = self.update_blood_stock(severe_cases);

        let record = DailyRecord {
            date,
            season,
            event: event.name.clone(),
            event_category: event.category,
            admissions,
            beds,
            staff,
            equipment,
            exams,
            severe_cases,
            deaths,
            blood_stock,
            blood_stock_critical: blood_stock < self.config.blood.critical_threshold,
        };

        self.steps += 1;
        match date.succ_opt() {
            Some(next) => self.cursor = next,
            None => self.exhausted = true,
        }
        Ok(record)
    }

    fn draw_admissions(&mut self, date: NaiveDate, event: &Event) -> u32 {
        let expected = self.expected_admissions(date, event);
        let alpha = self.tunables.smoothing_alpha;
        let smoothed = alpha * expected + (1.0 - alpha) * self.prev_admissions;
        let noise = gaussian(&mut self.rng, 1.0, self.tunables.noise_sd);
        let realized = (smoothed * noise).floor().max(0.0) as u32;
        let admissions = realized.max(self.config.admissions.floor);
        self.prev_admissions = admissions as f64;
        admissions
    }

    fn draw_beds(
        &mut self,
        date: NaiveDate,
        year: i32,
        event: &Event,
        tension: f64,
    ) -> Vec<BedOccupancy> {
        let season_factor = self.config.coefficients.season_factor(date);
        let b_s = self.tunables.tension_season_blend;
        let b_a = self.tunables.tension_admission_blend;
        let pressure = (1.0 - b_s + b_s * season_factor) * (1.0 - b_a + b_a * tension);

        let config = Arc::clone(&self.config);
        config
            .beds
            .categories
            .iter()
            .map(|category| {
                let capacity = config.bed_capacity(category, year);
                let target = category.base_rate * event.magnitude * pressure;
                let rate = category
                    .bounds
                    .clamp(target + gaussian(&mut self.rng, 0.0, category.noise_sd));
                let occupied = (capacity as f64 * rate).floor() as u32;
                BedOccupancy {
                    category: category.id.clone(),
                    capacity,
                    occupied,
                    free: capacity.saturating_sub(occupied),
                    occupancy_rate: rate,
                }
            })
            .collect()
    }

    fn draw_staff(&mut self, date: NaiveDate, year: i32, event: &Event) -> Vec<StaffPresence> {
        let weekend = matches!(date.weekday(), Weekday::Sat | Weekday::Sun);
        let surge = 1.0 + (event.magnitude - 1.0) * self.tunables.staff_event_damping;

        let config = Arc::clone(&self.config);
        let staff = &config.staff;
        let presence_range = if weekend {
            staff.weekend_presence
        } else {
            staff.weekday_presence
        };
        staff
            .categories
            .iter()
            .map(|category| {
                let authorized = config.authorized_staff(category, year);
                let presence = (presence_range.draw(&mut self.rng) * surge).clamp(0.0, 1.0);
                let utilization = staff.utilization.draw(&mut self.rng);
                StaffPresence {
                    category: category.id.clone(),
                    authorized,
                    present: (authorized as f64 * presence).floor() as u32,
                    utilization,
                }
            })
            .collect()
    }

    fn draw_exams(&mut self, admissions: u32, event: &Event) -> ExamCounts {
        let exams = &self.config.exams;
        let mut ratio = exams.ratio.draw(&mut self.rng);
        if !event.is_normal() {
            ratio *= exams.event_boost;
        }
        let total = (admissions as f64 * ratio).floor() as u32;

        let mut shares: Vec<f64> = exams
            .modalities
            .iter()
            .map(|m| m.share.draw(&mut self.rng))
            .collect();
        let sum: f64 = shares.iter().sum();
        if sum > 1.0 {
            shares.iter_mut().for_each(|s| *s /= sum);
        }

        let modalities: Vec<ModalityCount> = exams
            .modalities
            .iter()
            .zip(shares)
            .map(|(m, share)| ModalityCount {
                modality: m.id.clone(),
                count: (total as f64 * share).floor() as u32,
            })
            .collect();
        let named: u32 = modalities.iter().map(|m| m.count).sum();
        ExamCounts {
            modalities,
            other: total.saturating_sub(named),
            total,
        }
    }

    fn draw_severity(&mut self, admissions: u32, event: &Event) -> (u32, u32) {
        let mortality = &self.config.mortality;
        let share = event.severe_share.unwrap_or(if event.is_normal() {
            mortality.normal_severe_share
        } else {
            mortality.event_severe_share
        });
        let severe = (admissions as f64 * share).floor() as u32;
        let deaths = (severe as f64 * mortality.severe_mortality.draw(&mut self.rng)).floor() as u32;
        (severe, deaths)
    }

    fn update_blood_stock(&mut self, severe_cases: u32) -> f64 {
        let blood = &self.config.blood;
        let consumed = blood.consumption_per_severe_case * severe_cases as f64;
        let replenished = blood.replenishment.draw(&mut self.rng);
        self.blood_stock = (self.blood_stock - consumed + replenished).clamp(blood.min, blood.max);
        self.blood_stock
    }
}

impl Iterator for DailyGenerator {
    type Item = DailyRecord;

    fn next(&mut self) -> Option<DailyRecord> {
        self.next_record().ok()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = if self.is_finished() {
            0
        } else {
            ((self.end - self.cursor).num_days() + 1) as usize
        };
        (remaining, Some(remaining))
    }
}

impl SimulationEngine for DailyGenerator {
    type Record = DailyRecord;

    fn step(&mut self) -> Result<DailyRecord, SimulationError> {
        self.next_record()
    }

    fn reset(&mut self) {
        self.cursor = self.start;
        self.exhausted = false;
        self.steps = 0;
        self.prev_admissions = self.base_rate(self.start.year());
        self.blood_stock = self.config.blood.initial;
        self.rng = stream_rng(self.seed, Stream::Establishment);
    }

    fn set_parameter(&mut self, parameter_id: &str, value: f64) -> Result<(), SimulationError> {
        self.tunables.set(parameter_id, value)?;
        if self.steps == 0 {
            // the recurrence starts from the first year's baseline
            self.prev_admissions = self.base_rate(self.start.year());
        }
        Ok(())
    }

    fn parameters(&self) -> BTreeMap<String, f64> {
        self.tunables.as_map()
    }

    fn current_step(&self) -> u32 {
        self.steps
    }

    fn start_date(&self) -> NaiveDate {
        self.start
    }

    fn end_date(&self) -> NaiveDate {
        self.end
    }

    fn series(&self) -> Vec<String> {
        let mut series: Vec<String> = [
            "admissions",
            "deaths",
            "severe_cases",
            "blood_stock",
            "exams_total",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        series.extend(
            self.config
                .beds
                .categories
                .iter()
                .map(|c| format!("beds_{}_occupied", c.id)),
        );
        series.extend(
            self.config
                .staff
                .categories
                .iter()
                .map(|c| format!("staff_{}_present", c.id)),
        );
        series
    }
}
