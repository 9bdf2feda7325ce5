//! Session management
//!
//! A pure state machine (`reduce`) plus the SessionController that owns the
//! current snapshot, drives one transport exchange at a time and publishes
//! every transition to subscribers.

mod controller;
mod state;

pub use controller::{DEFAULT_CHANNEL_CAPACITY, SessionController};
pub use state::{Action, SessionState, reduce};
