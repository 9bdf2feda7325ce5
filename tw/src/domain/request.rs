//! TripRequest domain type
//!
//! The immutable description of a trip submitted for planning. Built once per
//! search by the presentation layer and handed to the session controller.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

/// Fewest travellers a request may carry
pub const MIN_ADULTS: u8 = 1;

/// Most travellers a request may carry
pub const MAX_ADULTS: u8 = 8;

/// Budget tier understood by the planning service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BudgetLevel {
    Low,
    #[default]
    Mid,
    High,
}

impl BudgetLevel {
    /// Wire name of this tier
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Mid => "mid",
            Self::High => "high",
        }
    }
}

impl fmt::Display for BudgetLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for BudgetLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "mid" | "medium" => Ok(Self::Mid),
            "high" => Ok(Self::High),
            other => Err(format!("Unknown budget level '{}'. Expected: low, mid, high", other)),
        }
    }
}

/// Reasons a request is rejected before submission
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("Origin is required")]
    MissingOrigin,

    #[error("Destination is required")]
    MissingDestination,

    #[error("End date must not be before start date")]
    DateOrder,

    #[error("Adults must be between 1 and 8, got {0}")]
    Adults(u8),

    #[error("Duplicate interest: {0}")]
    DuplicateInterest(String),
}

fn default_adults() -> u8 {
    2
}

fn default_trip_type() -> String {
    "custom".to_string()
}

/// Parameters of one planning search
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripRequest {
    /// Departure city or airport code
    pub origin: String,

    /// Destination city or airport code
    pub destination: String,

    /// First day of the trip
    pub start_date: NaiveDate,

    /// Last day of the trip (inclusive)
    pub end_date: NaiveDate,

    /// Number of adult travellers
    #[serde(default = "default_adults")]
    pub adults: u8,

    /// Budget tier
    #[serde(default)]
    pub budget_level: BudgetLevel,

    /// Free-form trip type tag (honeymoon, family, ...)
    #[serde(default = "default_trip_type")]
    pub trip_type: String,

    /// Interest tags, in the order the user entered them
    #[serde(default, rename = "hobbies")]
    pub interests: Vec<String>,

    /// Additional constraints as key/value text
    #[serde(default)]
    pub constraints: BTreeMap<String, String>,
}

impl TripRequest {
    /// Create a request with service defaults for every optional field
    pub fn new(
        origin: impl Into<String>,
        destination: impl Into<String>,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Self {
        let origin = origin.into();
        let destination = destination.into();
        debug!(%origin, %destination, %start_date, %end_date, "TripRequest::new: called");
        Self {
            origin,
            destination,
            start_date,
            end_date,
            adults: default_adults(),
            budget_level: BudgetLevel::default(),
            trip_type: default_trip_type(),
            interests: Vec::new(),
            constraints: BTreeMap::new(),
        }
    }

    pub fn with_adults(mut self, adults: u8) -> Self {
        self.adults = adults;
        self
    }

    pub fn with_budget(mut self, budget_level: BudgetLevel) -> Self {
        self.budget_level = budget_level;
        self
    }

    pub fn with_trip_type(mut self, trip_type: impl Into<String>) -> Self {
        self.trip_type = trip_type.into();
        self
    }

    /// Append an interest tag; repeats of an existing tag are ignored
    pub fn with_interest(mut self, interest: impl Into<String>) -> Self {
        let interest = interest.into();
        if !self.has_interest(&interest) {
            self.interests.push(interest);
        }
        self
    }

    pub fn with_constraint(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.constraints.insert(key.into(), value.into());
        self
    }

    /// Case-insensitive membership test; display order plays no part
    pub fn has_interest(&self, interest: &str) -> bool {
        self.interests.iter().any(|i| i.eq_ignore_ascii_case(interest))
    }

    /// Inclusive number of days covered by the trip
    pub fn trip_days(&self) -> i64 {
        (self.end_date - self.start_date).num_days() + 1
    }

    /// Check the static field rules the form layer applies before submission
    pub fn validate(&self) -> Result<(), RequestError> {
        debug!(origin = %self.origin, destination = %self.destination, "validate: called");
        if self.origin.trim().is_empty() {
            return Err(RequestError::MissingOrigin);
        }
        if self.destination.trim().is_empty() {
            return Err(RequestError::MissingDestination);
        }
        if self.end_date < self.start_date {
            return Err(RequestError::DateOrder);
        }
        if !(MIN_ADULTS..=MAX_ADULTS).contains(&self.adults) {
            return Err(RequestError::Adults(self.adults));
        }
        for (idx, interest) in self.interests.iter().enumerate() {
            if self.interests[..idx].iter().any(|i| i.eq_ignore_ascii_case(interest)) {
                debug!(%interest, "validate: duplicate interest");
                return Err(RequestError::DuplicateInterest(interest.clone()));
            }
        }
        Ok(())
    }
}
