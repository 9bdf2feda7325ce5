//! Wire contract with the planning service
//!
//! Schema checks for pushed stream messages, the flattened query used to
//! open the stream, and the error body of failed requests. Anything that
//! does not match a known shape is reported as unrecognized here so the
//! strategies can drop it without coercing types.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::domain::{ProcessingLog, TripRequest, TripResponse};

/// Stage name carrying the final result
pub const RESULT_STAGE: &str = "result";

/// Stage name the service sends after the result; carries nothing
pub const COMPLETE_STAGE: &str = "complete";

pub const PLAN_PATH: &str = "/plan-trip";
pub const STREAM_PATH: &str = "/plan-trip/stream";
pub const HEALTH_PATH: &str = "/health";

/// A pushed message that passed schema checks
#[derive(Debug, Clone, PartialEq)]
pub enum StreamMessage {
    Progress(ProcessingLog),
    Result(Box<TripResponse>),
    Complete,
}

/// Why a pushed message was not recognized
#[derive(Debug, Error)]
pub enum WireError {
    #[error("not JSON: {0}")]
    NotJson(#[from] serde_json::Error),

    #[error("expected a JSON object")]
    NotAnObject,

    #[error("missing or non-string stage")]
    MissingStage,

    #[error("result stage without a result payload")]
    MissingResult,

    #[error("result payload does not match the plan schema: {0}")]
    BadResult(serde_json::Error),

    #[error("progress fields have the wrong types: {0}")]
    BadProgress(serde_json::Error),
}

/// Classify one `data:` payload from the stream
pub fn parse_stream_message(data: &str) -> Result<StreamMessage, WireError> {
    debug!(len = data.len(), "parse_stream_message: called");
    let value: Value = serde_json::from_str(data)?;
    let Value::Object(mut fields) = value else {
        return Err(WireError::NotAnObject);
    };

    let stage = match fields.get("stage") {
        Some(Value::String(stage)) => stage.clone(),
        _ => return Err(WireError::MissingStage),
    };

    match stage.as_str() {
        RESULT_STAGE => {
            let result = match fields.remove("result") {
                Some(Value::Null) | None => return Err(WireError::MissingResult),
                Some(result) => result,
            };
            let response: TripResponse = serde_json::from_value(result).map_err(WireError::BadResult)?;
            debug!(
                flights = response.plan.flights.len(),
                stays = response.plan.stays.len(),
                days = response.plan.activities.len(),
                "parse_stream_message: result"
            );
            Ok(StreamMessage::Result(Box::new(response)))
        }
        COMPLETE_STAGE => {
            debug!("parse_stream_message: complete");
            Ok(StreamMessage::Complete)
        }
        _ => {
            // Unknown extra fields (timings, flags) are ignored
            let log: ProcessingLog =
                serde_json::from_value(Value::Object(fields)).map_err(WireError::BadProgress)?;
            debug!(stage = %log.stage, "parse_stream_message: progress");
            Ok(StreamMessage::Progress(log))
        }
    }
}

/// Flatten a request into the stream endpoint's query parameters
///
/// The stream is opened with a GET, so list and mapping fields travel as
/// JSON text and are decoded by the service.
pub fn stream_query(request: &TripRequest) -> Result<Vec<(&'static str, String)>, serde_json::Error> {
    debug!(origin = %request.origin, destination = %request.destination, "stream_query: called");
    Ok(vec![
        ("origin", request.origin.clone()),
        ("destination", request.destination.clone()),
        ("start_date", request.start_date.format("%Y-%m-%d").to_string()),
        ("end_date", request.end_date.format("%Y-%m-%d").to_string()),
        ("adults", request.adults.to_string()),
        ("budget_level", request.budget_level.as_str().to_string()),
        ("trip_type", request.trip_type.clone()),
        ("hobbies", serde_json::to_string(&request.interests)?),
        ("constraints", serde_json::to_string(&request.constraints)?),
    ])
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    detail: Option<Value>,
}

/// Extract the `detail` string from a failed response body
///
/// Validation errors carry a list in `detail`; only a plain string counts.
pub fn error_detail(body: &str) -> Option<String> {
    let body: ErrorBody = serde_json::from_str(body).ok()?;
    match body.detail {
        Some(Value::String(detail)) if !detail.trim().is_empty() => Some(detail),
        _ => None,
    }
}
