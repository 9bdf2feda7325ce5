//! Transport error types

use thiserror::Error;

/// Shown when the service rejects a request without saying why
pub const GENERIC_REQUEST_FAILURE: &str = "Failed to plan trip. Please try again.";

/// Shown when the connection itself fails
pub const GENERIC_CONNECTION_FAILURE: &str = "Lost connection to the planning service. Please try again.";

/// Errors that can occur while talking to the planning service
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("API error {status}: {}", .detail.as_deref().unwrap_or("no detail"))]
    Api { status: u16, detail: Option<String> },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("Stream ended before a result arrived")]
    StreamEnded,

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Exchange cancelled")]
    Cancelled,
}

impl TransportError {
    /// True when the exchange was abandoned on purpose and nothing should be reported
    pub fn is_cancelled(&self) -> bool {
        matches!(self, TransportError::Cancelled)
    }

    /// Message suitable for showing to the user
    ///
    /// Prefers the detail string the service supplied; otherwise falls back to
    /// a generic message for the failure class.
    pub fn user_message(&self) -> String {
        match self {
            TransportError::Api {
                detail: Some(detail), ..
            } if !detail.trim().is_empty() => detail.clone(),
            TransportError::Api { .. } | TransportError::InvalidResponse(_) | TransportError::Json(_) => {
                GENERIC_REQUEST_FAILURE.to_string()
            }
            TransportError::Network(_) | TransportError::Stream(_) | TransportError::StreamEnded => {
                GENERIC_CONNECTION_FAILURE.to_string()
            }
            TransportError::Cancelled => "Search cancelled".to_string(),
        }
    }
}
