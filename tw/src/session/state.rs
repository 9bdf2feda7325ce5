//! Session state machine
//!
//! `reduce` folds one Action into a SessionState and returns a fresh
//! snapshot. It performs no I/O and never mutates its input, so a snapshot
//! captured by an observer stays valid after later transitions.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::domain::{ProcessingLog, TripPlan, TripRequest};
use crate::transport::ProgressEvent;

/// Client-visible snapshot of one planning session
#[derive(Debug, Clone, Default, PartialEq)]
pub enum SessionState {
    /// Nothing submitted, or results cleared
    #[default]
    Idle,

    /// A search is in flight
    Searching {
        request: Arc<TripRequest>,
        /// Progress milestones so far, in arrival order
        logs: Vec<ProcessingLog>,
    },

    /// The last search produced a plan
    Succeeded {
        plan: Arc<TripPlan>,
        /// Progress milestones observed during the search
        logs: Vec<ProcessingLog>,
        /// Processing logs the service attached to its result
        service_logs: Vec<ProcessingLog>,
        request: Arc<TripRequest>,
    },

    /// The last search failed
    Failed { message: String, request: Arc<TripRequest> },
}

impl SessionState {
    pub fn is_loading(&self) -> bool {
        matches!(self, SessionState::Searching { .. })
    }

    /// The plan, present only after a successful search
    pub fn trip_plan(&self) -> Option<&Arc<TripPlan>> {
        match self {
            SessionState::Succeeded { plan, .. } => Some(plan),
            _ => None,
        }
    }

    /// The failure message, present only after a failed search
    pub fn error(&self) -> Option<&str> {
        match self {
            SessionState::Failed { message, .. } => Some(message),
            _ => None,
        }
    }

    /// The request that produced this state; cleared only by ClearResults
    pub fn last_search(&self) -> Option<&Arc<TripRequest>> {
        match self {
            SessionState::Idle => None,
            SessionState::Searching { request, .. }
            | SessionState::Succeeded { request, .. }
            | SessionState::Failed { request, .. } => Some(request),
        }
    }

    /// Progress trail; empty outside Searching and Succeeded
    pub fn logs(&self) -> &[ProcessingLog] {
        match self {
            SessionState::Searching { logs, .. } | SessionState::Succeeded { logs, .. } => logs,
            SessionState::Idle | SessionState::Failed { .. } => &[],
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Searching { .. } => "searching",
            SessionState::Succeeded { .. } => "succeeded",
            SessionState::Failed { .. } => "failed",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Inputs to the state machine
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    SearchStart(Arc<TripRequest>),
    SearchProgress(ProcessingLog),
    SearchSuccess {
        plan: TripPlan,
        service_logs: Vec<ProcessingLog>,
    },
    SearchError(String),
    ClearResults,
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::SearchStart(_) => "search_start",
            Action::SearchProgress(_) => "search_progress",
            Action::SearchSuccess { .. } => "search_success",
            Action::SearchError(_) => "search_error",
            Action::ClearResults => "clear_results",
        }
    }
}

impl From<ProgressEvent> for Action {
    fn from(event: ProgressEvent) -> Self {
        match event {
            ProgressEvent::Progress(log) => Action::SearchProgress(log),
            ProgressEvent::Success { plan, service_logs } => Action::SearchSuccess { plan, service_logs },
            ProgressEvent::Failure(message) => Action::SearchError(message),
        }
    }
}

/// Apply one action
///
/// Progress, success and error only apply while Searching; anywhere else
/// they leave the state as it was.
pub fn reduce(state: &SessionState, action: Action) -> SessionState {
    debug!(from = state.name(), action = action.name(), "reduce: called");
    match (state, action) {
        (_, Action::SearchStart(request)) => SessionState::Searching {
            request,
            logs: Vec::new(),
        },

        (_, Action::ClearResults) => SessionState::Idle,

        (SessionState::Searching { request, logs }, Action::SearchProgress(log)) => {
            let mut logs = logs.clone();
            logs.push(log);
            SessionState::Searching {
                request: Arc::clone(request),
                logs,
            }
        }

        (SessionState::Searching { request, logs }, Action::SearchSuccess { plan, service_logs }) => {
            SessionState::Succeeded {
                plan: Arc::new(plan),
                logs: logs.clone(),
                service_logs,
                request: Arc::clone(request),
            }
        }

        // The partial log trail of a failed run is dropped
        (SessionState::Searching { request, .. }, Action::SearchError(message)) => SessionState::Failed {
            message,
            request: Arc::clone(request),
        },

        (
            SessionState::Idle | SessionState::Succeeded { .. } | SessionState::Failed { .. },
            action @ (Action::SearchProgress(_) | Action::SearchSuccess { .. } | Action::SearchError(_)),
        ) => {
            debug!(state = state.name(), action = action.name(), "reduce: ignoring action outside a search");
            state.clone()
        }
    }
}
