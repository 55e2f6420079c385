use std::collections::BTreeMap;

use hospisim_core::{FluTempering, HospitalConfig, SimulationError};

/// Feedback constants the generator may adjust without touching the
/// shared configuration.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tunables {
    pub base_rate: f64,
    pub annual_growth: f64,
    pub smoothing_alpha: f64,
    pub noise_sd: f64,
    pub flu: FluTempering,
    pub staff_event_damping: f64,
    pub tension_season_blend: f64,
    pub tension_admission_blend: f64,
}

impl Tunables {
    pub const NAMES: [&'static str; 9] = [
        "base_rate",
        "annual_growth",
        "smoothing_alpha",
        "noise_sd",
        "flu_k_up",
        "flu_k_down",
        "staff_event_damping",
        "tension_season_blend",
        "tension_admission_blend",
    ];

    pub fn from_config(config: &HospitalConfig) -> Self {
        Self {
            base_rate: config.admissions.base_rate,
            annual_growth: config.admissions.annual_growth,
            smoothing_alpha: config.admissions.smoothing_alpha,
            noise_sd: config.admissions.noise_sd,
            flu: config.coefficients.flu,
            staff_event_damping: config.staff.event_damping,
            tension_season_blend: config.tension.season_blend,
            tension_admission_blend: config.tension.admission_blend,
        }
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        let value = match name {
            "base_rate" => self.base_rate,
            "annual_growth" => self.annual_growth,
            "smoothing_alpha" => self.smoothing_alpha,
            "noise_sd" => self.noise_sd,
            "flu_k_up" => self.flu.k_up,
            "flu_k_down" => self.flu.k_down,
            "staff_event_damping" => self.staff_event_damping,
            "tension_season_blend" => self.tension_season_blend,
            "tension_admission_blend" => self.tension_admission_blend,
            _ => return None,
        };
        Some(value)
    }

    pub fn set(&mut self, name: &str, value: f64) -> Result<(), SimulationError> {
        let invalid = || SimulationError::InvalidParameter {
            name: name.to_string(),
            value,
        };
        if !value.is_finite() {
            return Err(invalid());
        }
        let unit = (0.0..=1.0).contains(&value);
        let slot = match name {
            "base_rate" if value > 0.0 => &mut self.base_rate,
            "annual_growth" if value > -1.0 => &mut self.annual_growth,
            "smoothing_alpha" if unit => &mut self.smoothing_alpha,
            "noise_sd" if value >= 0.0 => &mut self.noise_sd,
            "flu_k_up" if unit => &mut self.flu.k_up,
            "flu_k_down" if unit => &mut self.flu.k_down,
            "staff_event_damping" if unit => &mut self.staff_event_damping,
            "tension_season_blend" if unit => &mut self.tension_season_blend,
            "tension_admission_blend" if unit => &mut self.tension_admission_blend,
            _ if Self::NAMES.contains(&name) => return Err(invalid()),
            _ => return Err(SimulationError::UnknownParameter(name.to_string())),
        };
        *slot = value;
        Ok(())
    }

    pub fn as_map(&self) -> BTreeMap<String, f64> {
        Self::NAMES
            .iter()
            .filter_map(|name| self.get(name).map(|v| (name.to_string(), v)))
            .collect()
    }
}
