use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// A houseplant being tracked.
///
/// `hour` is display-only. It is always recomputed from
/// `date_time_notification` and is never read back as input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlantRecord {
    /// Stable identifier, used as the key of the persisted map.
    pub id: String,
    pub name: String,
    pub about: String,
    pub water_tips: String,
    pub photo: String,
    /// Where the plant lives (e.g. `living_room`). Never empty.
    pub environments: Vec<String>,
    pub frequency: Frequency,
    /// `HH:mm` of `date_time_notification`.
    #[serde(default)]
    pub hour: String,
    /// Reference time the next watering reminder is computed from.
    #[serde(rename = "dateTimeNotification")]
    pub date_time_notification: DateTime<FixedOffset>,
}

impl PlantRecord {
    /// Zero-padded 24-hour `HH:mm` of the reference time, in the offset it carries.
    pub fn derived_hour(&self) -> String {
        self.date_time_notification.format("%H:%M").to_string()
    }

    /// Returns the record with `hour` rewritten from `date_time_notification`.
    pub fn with_derived_hour(mut self) -> Self {
        self.hour = self.derived_hour();
        self
    }

    /// Reference time as whole epoch seconds. Sub-second precision is dropped.
    pub fn epoch_seconds(&self) -> i64 {
        self.date_time_notification.timestamp()
    }

    /// Checks the constraints a record must meet before it can be saved.
    pub fn validate(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("plant id must not be empty".to_string());
        }
        if self.frequency.times == 0 {
            return Err(format!(
                "plant {} must be watered at least once per period",
                self.id
            ));
        }
        if self.environments.is_empty() {
            return Err(format!("plant {} needs at least one environment", self.id));
        }
        Ok(())
    }
}

/// How often a plant needs water: `times` per `repeat_every`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frequency {
    pub times: u32,
    pub repeat_every: Cadence,
}

/// The period a [`Frequency`] is expressed over.
///
/// Only `week` spreads waterings across the period. Every other value,
/// including ones this crate does not know, recurs daily.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Cadence {
    Week,
    Day,
    /// Any other value found in stored data, kept verbatim.
    Other(String),
}

impl Cadence {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Week => "week",
            Self::Day => "day",
            Self::Other(s) => s,
        }
    }

    pub fn is_weekly(&self) -> bool {
        matches!(self, Self::Week)
    }
}

impl From<String> for Cadence {
    fn from(s: String) -> Self {
        match s.as_str() {
            "week" => Self::Week,
            "day" => Self::Day,
            _ => Self::Other(s),
        }
    }
}

impl From<&str> for Cadence {
    fn from(s: &str) -> Self {
        Self::from(s.to_string())
    }
}

impl From<Cadence> for String {
    fn from(c: Cadence) -> Self {
        match c {
            Cadence::Other(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for Cadence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
