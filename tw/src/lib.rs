//! TripWeaver - trip planning client
//!
//! TripWeaver submits a trip request to a remote planning service, follows
//! the service's progress while it works, and turns the finished itinerary
//! into a paginated PDF.
//!
//! # Core Concepts
//!
//! - **One search at a time**: starting a new search cancels the previous one
//! - **Snapshots, not mutation**: every transition produces a new SessionState
//! - **Failures are data**: transport errors surface as a `Failed` state
//! - **Two transports, one event stream**: server-push and request/response
//!   exchanges both yield ordered ProgressEvents
//!
//! # Modules
//!
//! - [`domain`] - Trip requests, plans and processing logs
//! - [`transport`] - Streaming and fallback transports behind one trait
//! - [`session`] - State machine and SessionController
//! - [`report`] - Paginated itinerary layout and PDF rendering
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod cli;
pub mod config;
pub mod domain;
pub mod report;
pub mod session;
pub mod transport;

// Re-export commonly used types
pub use config::Config;
pub use domain::{
    Activity, BudgetLevel, DayPlan, Flight, ProcessingLog, RequestError, SavedPlan, Stay, TimeSlot, TripPlan,
    TripRequest, TripResponse,
};
pub use report::{GeneratedReport, Report, ReportError, ReportOptions, generate, layout, render, write_report};
pub use session::{Action, SessionController, SessionState, reduce};
pub use transport::{
    FallbackTransport, PlanTransport, ProgressEvent, StreamingTransport, TransportAdapter, TransportError,
    create_transport,
};
