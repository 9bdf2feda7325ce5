//! ProgressEvent - the uniform event sequence every transport produces

use crate::domain::{ProcessingLog, TripPlan};

/// One unit of information from a planning exchange
///
/// A well-formed exchange emits zero or more `Progress` events followed by
/// exactly one terminal event (`Success` or `Failure`).
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// Intermediate pipeline milestone
    Progress(ProcessingLog),

    /// Completed itinerary, with the logs the service reported alongside it
    Success {
        plan: TripPlan,
        service_logs: Vec<ProcessingLog>,
    },

    /// Human-readable failure message
    Failure(String),
}

impl ProgressEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ProgressEvent::Progress(_))
    }

    /// Short name for logging
    pub fn kind(&self) -> &'static str {
        match self {
            ProgressEvent::Progress(_) => "progress",
            ProgressEvent::Success { .. } => "success",
            ProgressEvent::Failure(_) => "failure",
        }
    }
}
