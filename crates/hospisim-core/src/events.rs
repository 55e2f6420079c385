//! Exceptional-event calendar.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Kind of exceptional event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    /// Sentinel for days without an event
    Normal,
    Epidemic,
    Heatwave,
    Strike,
    MassCasualty,
}

impl EventCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventCategory::Normal => "normal",
            EventCategory::Epidemic => "epidemic",
            EventCategory::Heatwave => "heatwave",
            EventCategory::Strike => "strike",
            EventCategory::MassCasualty => "mass_casualty",
        }
    }
}

impl std::fmt::Display for EventCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named, time-bounded override of the baseline rates.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Event {
    pub name: String,
    pub start: NaiveDate,
    /// Inclusive
    pub end: NaiveDate,
    pub category: EventCategory,
    /// Multiplier applied to expected admissions and occupancy targets
    pub magnitude: f64,
    /// Services whose admission weight is boosted while the event is active
    #[serde(default)]
    pub affected: BTreeSet<String>,
    /// Share of admissions that are severe cases; overrides the mortality defaults
    #[serde(default)]
    pub severe_share: Option<f64>,
    /// Admission reasons that dominate while the event is active
    #[serde(default)]
    pub reasons: Vec<String>,
}

impl Event {
    pub const NORMAL_NAME: &'static str = "normal";

    /// The sentinel returned on days without an event.
    pub fn normal() -> Self {
        Self {
            name: Self::NORMAL_NAME.to_string(),
            start: NaiveDate::MIN,
            end: NaiveDate::MAX,
            category: EventCategory::Normal,
            magnitude: 1.0,
            affected: BTreeSet::new(),
            severe_share: None,
            reasons: Vec::new(),
        }
    }

    pub fn is_normal(&self) -> bool {
        self.category == EventCategory::Normal
    }

    pub fn is_epidemic(&self) -> bool {
        self.category == EventCategory::Epidemic
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn affects(&self, service: &str) -> bool {
        self.affected.contains(service)
    }

    pub fn duration_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

/// Sorted, non-overlapping set of events.
///
/// Lookups binary-search the start dates; a date outside every event resolves
/// to the [`Event::normal`] sentinel.
#[derive(Clone, Debug)]
pub struct EventCalendar {
    events: Vec<Event>,
    normal: Event,
}

impl EventCalendar {
    /// Builds a calendar, rejecting inverted or overlapping events.
    pub fn new(mut events: Vec<Event>) -> Result<Self, ConfigError> {
        for event in &events {
            if event.end < event.start {
                return Err(ConfigError::InvertedEvent {
                    name: event.name.clone(),
                    start: event.start,
                    end: event.end,
                });
            }
        }
        events.sort_by_key(|e| e.start);
        for pair in events.windows(2) {
            if pair[1].start <= pair[0].end {
                return Err(ConfigError::OverlappingEvents {
                    first: pair[0].name.clone(),
                    second: pair[1].name.clone(),
                });
            }
        }
        Ok(Self {
            events,
            normal: Event::normal(),
        })
    }

    /// Active event on `date`, or the normal sentinel.
    pub fn active_event(&self, date: NaiveDate) -> &Event {
        let idx = self.events.partition_point(|e| e.start <= date);
        match idx.checked_sub(1).map(|i| &self.events[i]) {
            Some(event) if event.contains(date) => event,
            _ => &self.normal,
        }
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn find(&self, name: &str) -> Option<&Event> {
        self.events.iter().find(|e| e.name == name)
    }
}
