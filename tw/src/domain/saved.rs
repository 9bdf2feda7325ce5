//! On-disk form of a finished plan

use serde::{Deserialize, Serialize};

use super::{TripPlan, TripRequest};

/// A plan saved by `tw plan --save`, read back by `tw export`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedPlan {
    pub plan: TripPlan,

    /// Absent when the plan came from somewhere other than a search
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<TripRequest>,
}
