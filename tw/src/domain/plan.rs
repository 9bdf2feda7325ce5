//! Itinerary domain types
//!
//! TripPlan and its nested records as returned by the planning service.
//! Presentational fields are optional on the wire and stay `Option` here:
//! a missing price is not a zero price.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// One flight option
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flight {
    /// Human-readable one-line description
    pub summary: String,

    #[serde(default)]
    pub airline: Option<String>,

    #[serde(default)]
    pub flight_number: Option<String>,

    #[serde(default)]
    pub depart_time: Option<String>,

    #[serde(default)]
    pub arrive_time: Option<String>,

    /// Number of stops (0 = direct)
    #[serde(default)]
    pub stops: Option<u32>,

    /// Estimated fare for the whole party
    #[serde(default)]
    pub est_price: Option<f64>,

    #[serde(default)]
    pub currency: Option<String>,

    #[serde(default)]
    pub booking_links: Vec<String>,

    #[serde(default)]
    pub source_url: Option<String>,
}

/// One accommodation option
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stay {
    pub name: String,

    /// Neighbourhood or district
    #[serde(default)]
    pub area: String,

    #[serde(default)]
    pub est_price_per_night: Option<f64>,

    #[serde(default)]
    pub currency: Option<String>,

    /// Guest rating as reported by the source
    #[serde(default)]
    pub score: Option<f64>,

    #[serde(default)]
    pub highlights: Vec<String>,

    #[serde(default)]
    pub booking_links: Vec<String>,

    #[serde(default)]
    pub source_url: Option<String>,
}

/// A single scheduled activity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub title: String,

    #[serde(default)]
    pub location: String,

    #[serde(default)]
    pub duration_hours: Option<f64>,

    #[serde(default)]
    pub est_price: Option<f64>,

    #[serde(default)]
    pub currency: Option<String>,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub source_url: Option<String>,
}

/// Part of the day an activity is scheduled in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeSlot {
    Morning,
    Afternoon,
    Evening,
}

impl TimeSlot {
    /// Slots in the order they occur during a day
    pub const ALL: [TimeSlot; 3] = [TimeSlot::Morning, TimeSlot::Afternoon, TimeSlot::Evening];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Morning => "Morning",
            Self::Afternoon => "Afternoon",
            Self::Evening => "Evening",
        }
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Read a day slot sent either as one activity or as a list of them
///
/// The service emits `[]` or `[activity]`; only the first entry is kept.
fn deserialize_slot<'de, D>(deserializer: D) -> Result<Option<Activity>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Slot {
        One(Activity),
        Many(Vec<Activity>),
    }

    Ok(match Option::<Slot>::deserialize(deserializer)? {
        Some(Slot::One(activity)) => Some(activity),
        Some(Slot::Many(activities)) => activities.into_iter().next(),
        None => None,
    })
}

/// Activities for one calendar day of the trip
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DayPlan {
    /// Calendar date as sent by the service (usually YYYY-MM-DD)
    pub date: String,

    #[serde(default, deserialize_with = "deserialize_slot")]
    pub morning: Option<Activity>,

    #[serde(default, deserialize_with = "deserialize_slot")]
    pub afternoon: Option<Activity>,

    #[serde(default, deserialize_with = "deserialize_slot")]
    pub evening: Option<Activity>,

    #[serde(default)]
    pub notes: Vec<String>,
}

impl DayPlan {
    pub fn slot(&self, slot: TimeSlot) -> Option<&Activity> {
        match slot {
            TimeSlot::Morning => self.morning.as_ref(),
            TimeSlot::Afternoon => self.afternoon.as_ref(),
            TimeSlot::Evening => self.evening.as_ref(),
        }
    }

    /// Filled slots in time order
    pub fn scheduled(&self) -> impl Iterator<Item = (TimeSlot, &Activity)> {
        TimeSlot::ALL
            .into_iter()
            .filter_map(move |slot| self.slot(slot).map(|activity| (slot, activity)))
    }

    pub fn is_empty(&self) -> bool {
        self.scheduled().next().is_none() && self.notes.is_empty()
    }
}

/// The completed itinerary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TripPlan {
    #[serde(default)]
    pub flights: Vec<Flight>,

    #[serde(default)]
    pub stays: Vec<Stay>,

    /// One entry per day of the trip
    #[serde(default)]
    pub activities: Vec<DayPlan>,
}

impl TripPlan {
    pub fn is_empty(&self) -> bool {
        self.flights.is_empty() && self.stays.is_empty() && self.activities.is_empty()
    }
}

/// A pipeline milestone reported by the planning service
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingLog {
    /// Pipeline phase name; opaque to the client
    pub stage: String,

    #[serde(default)]
    pub raw_count: Option<u32>,

    #[serde(default)]
    pub refined_count: Option<u32>,

    #[serde(default)]
    pub error: Option<String>,

    #[serde(default)]
    pub message: Option<String>,
}

impl ProcessingLog {
    pub fn stage(stage: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            ..Default::default()
        }
    }

    pub fn with_counts(mut self, raw: u32, refined: u32) -> Self {
        self.raw_count = Some(raw);
        self.refined_count = Some(refined);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl fmt::Display for ProcessingLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.stage)?;
        match (self.raw_count, self.refined_count) {
            (Some(raw), Some(refined)) => write!(f, ": {} raw -> {} refined", raw, refined)?,
            (Some(raw), None) => write!(f, ": {} found", raw)?,
            (None, Some(refined)) => write!(f, ": {} refined", refined)?,
            (None, None) => {}
        }
        if let Some(message) = &self.message {
            write!(f, " ({})", message)?;
        }
        if let Some(error) = &self.error {
            write!(f, " [error: {}]", error)?;
        }
        Ok(())
    }
}

fn default_success() -> bool {
    true
}

/// Body of a successful `POST /plan-trip`, also embedded in the stream's result message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripResponse {
    pub plan: TripPlan,

    #[serde(default)]
    pub logs: Vec<ProcessingLog>,

    #[serde(default = "default_success")]
    pub success: bool,

    #[serde(default)]
    pub message: Option<String>,
}
