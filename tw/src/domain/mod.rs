//! Domain types for TripWeaver
//!
//! Core domain types: TripRequest (what the user asked for) and TripPlan
//! (what the planning service produced), plus the ProcessingLog milestones
//! reported while a plan is being built.

mod plan;
mod request;
mod saved;

pub use plan::{Activity, DayPlan, Flight, ProcessingLog, Stay, TimeSlot, TripPlan, TripResponse};
pub use request::{BudgetLevel, MAX_ADULTS, MIN_ADULTS, RequestError, TripRequest};
pub use saved::SavedPlan;
