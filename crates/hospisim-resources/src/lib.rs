//! Resource calibration generator.
//!
//! Derives per-service bed occupancy and staffing directly from the static
//! capacity and occupancy tables, independently of the patient log.

use std::sync::Arc;

use chrono::{Datelike, NaiveDate, Weekday};
use rand_chacha::ChaCha8Rng;

use hospisim_core::config::ResourceService;
use hospisim_core::sampling::gaussian;
use hospisim_core::{stream_rng, HospitalConfig, ResourceRecord, SimulationError, Stream};

pub struct ResourceGenerator {
    config: Arc<HospitalConfig>,
    rng: ChaCha8Rng,
}

impl ResourceGenerator {
    pub fn new(config: Arc<HospitalConfig>, seed: u64) -> Self {
        Self {
            config,
            rng: stream_rng(seed, Stream::Resources),
        }
    }

    /// One record per (date, service) over `start..=end`, dates ascending and
    /// services in table order.
    pub fn generate(
        &mut self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<ResourceRecord>, SimulationError> {
        if start > end {
            return Err(SimulationError::InvalidDateRange { start, end });
        }
        let days = (end - start).num_days() as usize + 1;
        let mut records = Vec::with_capacity(days * self.config.resources.services.len());
        for date in start.iter_days().take(days) {
            self.generate_day(date, &mut records);
        }
        tracing::info!(
            days,
            services = self.config.resources.services.len(),
            records = records.len(),
            "generated resource table"
        );
        Ok(records)
    }

    fn generate_day(&mut self, date: NaiveDate, out: &mut Vec<ResourceRecord>) {
        let config = Arc::clone(&self.config);
        let r = &config.resources;
        let weekday = r.weekday[date.weekday().num_days_from_monday() as usize];
        let monthly = r.monthly[date.month0() as usize];

        let weekend = matches!(date.weekday(), Weekday::Sat | Weekday::Sun);
        let mut presence = if weekend {
            r.weekend_presence
        } else {
            r.weekday_presence
        };
        if r.vacation_months.contains(&date.month()) {
            presence *= r.vacation_factor;
        }

        for service in &r.services {
            out.push(self.service_record(date, service, weekday * monthly, presence));
        }
    }

    fn service_record(
        &mut self,
        date: NaiveDate,
        service: &ResourceService,
        calendar_factor: f64,
        presence: f64,
    ) -> ResourceRecord {
        let r = &self.config.resources;
        let noise = gaussian(&mut self.rng, 0.0, service.occupancy_variance / 2.0);
        let rate = r
            .class_bounds
            .for_class(service.class)
            .clamp(service.occupancy_base * calendar_factor + noise);
        let beds_occupied = (service.beds as f64 * rate).floor() as u32;

        let staff_total = (service.beds as f64 * service.staff_ratio).floor() as u32;
        let presence = (presence * r.presence_jitter.draw(&mut self.rng)).min(1.0);
        let staff_available = (staff_total as f64 * presence).floor() as u32;
        let busy = (beds_occupied as f64 * service.staff_ratio * r.busy_staff_factor).floor() as u32;

        ResourceRecord {
            date,
            service: service.id.clone(),
            beds_total: service.beds,
            beds_occupied,
            beds_available: service.beds.saturating_sub(beds_occupied),
            occupancy_rate: rate,
            staff_total,
            staff_available,
            staff_busy: busy.min(staff_available),
        }
    }
}
