//! Random draws shared by the generators.
//!
//! Every generator derives its RNG from one seed through [`stream_rng`], so a
//! fixed seed and date range always reproduce the same tables.

use chrono::{Datelike, NaiveDate};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Exp1, StandardNormal};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Independent random streams carved out of the run seed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stream {
    Establishment,
    Resources,
    Patients(NaiveDate),
}

impl Stream {
    fn id(&self) -> u64 {
        match self {
            Stream::Establishment => 0,
            Stream::Resources => 1,
            Stream::Patients(date) => 2 + date.num_days_from_ce().max(0) as u64,
        }
    }
}

/// RNG for one stream of a seeded run.
pub fn stream_rng(seed: u64, stream: Stream) -> ChaCha8Rng {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    rng.set_stream(stream.id());
    rng
}

/// `mean + sd * z` with `z` standard normal.
pub fn gaussian<R: Rng>(rng: &mut R, mean: f64, sd: f64) -> f64 {
    let z: f64 = StandardNormal.sample(rng);
    mean + sd * z
}

/// Exponential draw with the given mean.
pub fn exponential<R: Rng>(rng: &mut R, mean: f64) -> f64 {
    let e: f64 = Exp1.sample(rng);
    e * mean
}

/// Closed interval used both for uniform draws and clamps.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub min: f64,
    pub max: f64,
}

impl Interval {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    pub fn width(&self) -> f64 {
        self.max - self.min
    }

    /// Uniform draw in `[min, max)`; a degenerate interval returns `min`.
    pub fn draw<R: Rng>(&self, rng: &mut R) -> f64 {
        self.min + self.width() * rng.gen::<f64>()
    }

    pub(crate) fn validate(&self, field: &str) -> Result<(), ConfigError> {
        if !self.min.is_finite() || !self.max.is_finite() || self.min > self.max {
            return Err(ConfigError::EmptyInterval {
                field: field.to_string(),
                lower: self.min,
                upper: self.max,
            });
        }
        Ok(())
    }
}

/// A value paired with its sampling weight.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Weighted<T> {
    pub value: T,
    pub weight: f64,
}

impl<T> Weighted<T> {
    pub fn new(value: T, weight: f64) -> Self {
        Self { value, weight }
    }
}

/// Categorical distribution backed by a cumulative-weight table.
///
/// Weights are renormalised to sum to one on construction; a draw consumes a
/// single uniform variate.
#[derive(Clone, Debug)]
pub struct WeightedTable<T> {
    items: Vec<T>,
    probabilities: Vec<f64>,
    cumulative: Vec<f64>,
}

impl<T: Clone> WeightedTable<T> {
    pub fn new(name: &str, entries: Vec<(T, f64)>) -> Result<Self, ConfigError> {
        let invalid = || ConfigError::InvalidWeights {
            table: name.to_string(),
        };
        if entries.is_empty() {
            return Err(invalid());
        }
        if entries.iter().any(|(_, w)| !w.is_finite() || *w < 0.0) {
            return Err(invalid());
        }
        let total: f64 = entries.iter().map(|(_, w)| w).sum();
        if total <= 0.0 {
            return Err(invalid());
        }

        let mut items = Vec::with_capacity(entries.len());
        let mut probabilities = Vec::with_capacity(entries.len());
        let mut cumulative = Vec::with_capacity(entries.len());
        let mut running = 0.0;
        for (item, weight) in entries {
            let p = weight / total;
            running += p;
            items.push(item);
            probabilities.push(p);
            cumulative.push(running);
        }
        // guard the last bucket against rounding
        if let Some(last) = cumulative.last_mut() {
            *last = 1.0;
        }

        Ok(Self {
            items,
            probabilities,
            cumulative,
        })
    }

    pub fn from_weighted(name: &str, entries: &[Weighted<T>]) -> Result<Self, ConfigError> {
        Self::new(
            name,
            entries
                .iter()
                .map(|w| (w.value.clone(), w.weight))
                .collect(),
        )
    }

    /// New table whose weights are multiplied by `factor(item)` and renormalised.
    pub fn reweighted<F>(&self, name: &str, factor: F) -> Result<Self, ConfigError>
    where
        F: Fn(&T) -> f64,
    {
        Self::new(
            name,
            self.items
                .iter()
                .zip(&self.probabilities)
                .map(|(item, p)| (item.clone(), p * factor(item)))
                .collect(),
        )
    }

    pub fn sample<R: Rng>(&self, rng: &mut R) -> &T {
        let u: f64 = rng.gen();
        let idx = self
            .cumulative
            .partition_point(|c| *c <= u)
            .min(self.items.len() - 1);
        &self.items[idx]
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn probabilities(&self) -> &[f64] {
        &self.probabilities
    }

    pub fn probability_of(&self, item: &T) -> f64
    where
        T: PartialEq,
    {
        self.items
            .iter()
            .zip(&self.probabilities)
            .filter(|(candidate, _)| *candidate == item)
            .map(|(_, p)| p)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_is_normalised() {
        let table = WeightedTable::new("t", vec![("a", 2.0), ("b", 6.0)]).unwrap();
        assert!((table.probabilities()[0] - 0.25).abs() < 1e-12);
        assert!((table.probabilities()[1] - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_weights_rejected() {
        assert!(WeightedTable::<&str>::new("t", vec![]).is_err());
        assert!(WeightedTable::new("t", vec![("a", 0.0)]).is_err());
        assert!(WeightedTable::new("t", vec![("a", -1.0), ("b", 2.0)]).is_err());
        assert!(WeightedTable::new("t", vec![("a", f64::NAN)]).is_err());
    }

    #[test]
    fn test_zero_weight_never_drawn() {
        let table = WeightedTable::new("t", vec![("a", 1.0), ("b", 0.0), ("c", 1.0)]).unwrap();
        let mut rng = stream_rng(7, Stream::Establishment);
        for _ in 0..5_000 {
            assert_ne!(*table.sample(&mut rng), "b");
        }
    }

    #[test]
    fn test_sample_frequencies_follow_weights() {
        let table = WeightedTable::new("t", vec![("a", 0.2), ("b", 0.8)]).unwrap();
        let mut rng = stream_rng(42, Stream::Establishment);
        let n = 20_000;
        let hits = (0..n).filter(|_| *table.sample(&mut rng) == "a").count();
        let share = hits as f64 / n as f64;
        assert!((share - 0.2).abs() < 0.02, "share {}", share);
    }

    #[test]
    fn test_reweighting_renormalises() {
        let table = WeightedTable::new("t", vec![("a", 0.5), ("b", 0.5)]).unwrap();
        let boosted = table
            .reweighted("t", |item| if *item == "a" { 2.0 } else { 0.5 })
            .unwrap();
        assert!((boosted.probability_of(&"a") - 0.8).abs() < 1e-12);
        let total: f64 = boosted.probabilities().iter().sum();
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_streams_are_independent_and_reproducible() {
        let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let a: Vec<u32> = (0..4)
            .map(|_| stream_rng(42, Stream::Patients(day)).gen())
            .collect();
        assert!(a.windows(2).all(|w| w[0] == w[1]));

        let mut est = stream_rng(42, Stream::Establishment);
        let mut pat = stream_rng(42, Stream::Patients(day));
        let x: u64 = est.gen();
        let y: u64 = pat.gen();
        assert_ne!(x, y);
    }

    #[test]
    fn test_interval_draw_stays_inside() {
        let interval = Interval::new(0.88, 0.96);
        let mut rng = stream_rng(1, Stream::Resources);
        for _ in 0..1_000 {
            assert!(interval.contains(interval.draw(&mut rng)));
        }
        let point = Interval::new(3.0, 3.0);
        assert_eq!(point.draw(&mut rng), 3.0);
    }
}
