//! Calendar multiplier tables.
//!
//! Every table maps a calendar feature of a date to a positive scalar that is
//! applied multiplicatively to a baseline rate. A value of `1.0` means
//! "average day".

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const MONTHS: usize = 12;
pub const WEEKDAYS: usize = 7;
pub const EPI_WEEKS: usize = 52;

/// Meteorological season of a date (northern hemisphere).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Autumn,
}

impl Season {
    pub fn of(date: NaiveDate) -> Self {
        match date.month() {
            12 | 1 | 2 => Season::Winter,
            3..=5 => Season::Spring,
            6..=8 => Season::Summer,
            _ => Season::Autumn,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Season::Winter => "winter",
            Season::Spring => "spring",
            Season::Summer => "summer",
            Season::Autumn => "autumn",
        }
    }
}

impl std::fmt::Display for Season {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Multiplier applied per categorical season.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SeasonFactors {
    pub winter: f64,
    pub spring: f64,
    pub summer: f64,
    pub autumn: f64,
}

impl SeasonFactors {
    pub fn factor(&self, season: Season) -> f64 {
        match season {
            Season::Winter => self.winter,
            Season::Spring => self.spring,
            Season::Summer => self.summer,
            Season::Autumn => self.autumn,
        }
    }
}

/// Compression applied to the raw weekly flu coefficient.
///
/// Only a fraction of visits is attributable to the seasonal pathogen, so the
/// raw swing (roughly 0.08 to 3.7) is scaled down before it touches total
/// admission volume.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FluTempering {
    /// Share of the excess above 1.0 that reaches admissions
    pub k_up: f64,
    /// Share of the deficit below 1.0 that reaches admissions
    pub k_down: f64,
}

impl FluTempering {
    pub fn temper(&self, raw: f64) -> f64 {
        if raw > 1.0 {
            1.0 + (raw - 1.0) * self.k_up
        } else {
            1.0 - (1.0 - raw) * self.k_down
        }
    }
}

/// Immutable month, weekday and epidemiological-week multiplier tables.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SeasonalCoefficients {
    /// January first
    pub monthly: Vec<f64>,
    /// Monday first
    pub weekday: Vec<f64>,
    /// ISO weeks 1 to 52; week 53 reuses week 52
    pub epi_week: Vec<f64>,
    pub seasons: SeasonFactors,
    pub flu: FluTempering,
}

impl SeasonalCoefficients {
    pub fn seasonal_factor(&self, date: NaiveDate) -> f64 {
        self.monthly[date.month0() as usize]
    }

    pub fn weekly_factor(&self, date: NaiveDate) -> f64 {
        self.weekday[date.weekday().num_days_from_monday() as usize]
    }

    /// Raw, untempered flu coefficient for the ISO week of `date`.
    pub fn raw_flu_coefficient(&self, date: NaiveDate) -> f64 {
        let week = date.iso_week().week().min(EPI_WEEKS as u32);
        self.epi_week[(week - 1) as usize]
    }

    /// Tempered flu factor using the configured constants.
    pub fn flu_factor(&self, date: NaiveDate) -> f64 {
        self.flu_factor_with(date, &self.flu)
    }

    /// Tempered flu factor using caller-supplied constants.
    pub fn flu_factor_with(&self, date: NaiveDate, tempering: &FluTempering) -> f64 {
        tempering.temper(self.raw_flu_coefficient(date))
    }

    pub fn season(&self, date: NaiveDate) -> Season {
        Season::of(date)
    }

    pub fn season_factor(&self, date: NaiveDate) -> f64 {
        self.seasons.factor(Season::of(date))
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        check_table("coefficients.monthly", &self.monthly, MONTHS)?;
        check_table("coefficients.weekday", &self.weekday, WEEKDAYS)?;
        check_table("coefficients.epi_week", &self.epi_week, EPI_WEEKS)?;

        let seasons = [
            ("coefficients.seasons.winter", self.seasons.winter),
            ("coefficients.seasons.spring", self.seasons.spring),
            ("coefficients.seasons.summer", self.seasons.summer),
            ("coefficients.seasons.autumn", self.seasons.autumn),
        ];
        for (field, value) in seasons {
            crate::config::positive(field, value)?;
        }
        crate::config::unit_interval("coefficients.flu.k_up", self.flu.k_up)?;
        crate::config::unit_interval("coefficients.flu.k_down", self.flu.k_down)?;
        Ok(())
    }
}

/// Checks length and positivity of a multiplier table.
pub(crate) fn check_table(
    table: &'static str,
    values: &[f64],
    expected: usize,
) -> Result<(), ConfigError> {
    if values.len() != expected {
        return Err(ConfigError::TableLength {
            table,
            expected,
            found: values.len(),
        });
    }
    for (i, value) in values.iter().enumerate() {
        crate::config::positive(&format!("{}[{}]", table, i), *value)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HospitalConfig;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_season_boundaries() {
        assert_eq!(Season::of(date(2024, 2, 29)), Season::Winter);
        assert_eq!(Season::of(date(2024, 3, 1)), Season::Spring);
        assert_eq!(Season::of(date(2024, 8, 31)), Season::Summer);
        assert_eq!(Season::of(date(2024, 11, 30)), Season::Autumn);
        assert_eq!(Season::of(date(2024, 12, 1)), Season::Winter);
    }

    #[test]
    fn test_tempering_compresses_both_sides() {
        let flu = FluTempering {
            k_up: 0.06,
            k_down: 0.03,
        };
        assert!((flu.temper(1.0) - 1.0).abs() < 1e-12);
        assert!((flu.temper(3.0) - 1.12).abs() < 1e-12);
        assert!((flu.temper(0.0) - 0.97).abs() < 1e-12);
    }

    #[test]
    fn test_weekday_and_month_lookup() {
        let config = HospitalConfig::default();
        let c = &config.coefficients;
        // 2024-01-01 is a Monday
        assert_eq!(c.weekly_factor(date(2024, 1, 1)), c.weekday[0]);
        assert_eq!(c.weekly_factor(date(2024, 1, 7)), c.weekday[6]);
        assert_eq!(c.seasonal_factor(date(2024, 8, 15)), c.monthly[7]);
    }

    #[test]
    fn test_week_53_maps_to_52() {
        let config = HospitalConfig::default();
        let c = &config.coefficients;
        // 2020-12-31 falls in ISO week 53
        assert_eq!(date(2020, 12, 31).iso_week().week(), 53);
        assert_eq!(c.raw_flu_coefficient(date(2020, 12, 31)), c.epi_week[51]);
    }

    #[test]
    fn test_flu_factor_stays_close_to_one() {
        let config = HospitalConfig::default();
        let c = &config.coefficients;
        let mut day = date(2024, 1, 1);
        while day <= date(2024, 12, 31) {
            let f = c.flu_factor(day);
            assert!(f > 0.95 && f < 1.2, "flu factor {} on {}", f, day);
            day = day.succ_opt().unwrap();
        }
    }

    #[test]
    fn test_table_length_is_checked() {
        let mut config = HospitalConfig::default();
        config.coefficients.weekday.pop();
        assert!(matches!(
            config.coefficients.validate(),
            Err(ConfigError::TableLength { expected: 7, .. })
        ));
    }
}
