//! Fallback strategy
//!
//! One blocking `POST /plan-trip` exchange. No intermediate progress is
//! possible in this mode: the exchange yields exactly one success or
//! one error.

use async_trait::async_trait;
use reqwest::Client;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::client::send_event;
use super::wire;
use super::{PlanTransport, ProgressEvent, TransportError};
use crate::domain::{TripRequest, TripResponse};

/// Single request/response transport
pub struct FallbackTransport {
    base_url: String,
    http: Client,
}

impl FallbackTransport {
    pub fn new(http: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        debug!(%base_url, "FallbackTransport::new: called");
        Self { base_url, http }
    }

    /// Send the request and decode the response
    async fn request_plan(&self, request: &TripRequest) -> Result<TripResponse, TransportError> {
        let url = format!("{}{}", self.base_url, wire::PLAN_PATH);
        debug!(%url, "request_plan: called");

        let response = self
            .http
            .post(url)
            .header("content-type", "application/json")
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let detail = wire::error_detail(&text);
            warn!(status = status.as_u16(), ?detail, "request_plan: API error");
            return Err(TransportError::Api {
                status: status.as_u16(),
                detail,
            });
        }

        let text = response.text().await?;
        let body: TripResponse = serde_json::from_str(&text).map_err(|e| {
            debug!(error = %e, "request_plan: response does not match schema");
            TransportError::InvalidResponse(e.to_string())
        })?;
        if !body.success {
            debug!(message = ?body.message, "request_plan: service flagged success=false on a 2xx");
        }
        Ok(body)
    }
}

/// `GET /health`, shared by both strategies
pub(crate) async fn probe_health(http: &Client, base_url: &str) -> Result<bool, TransportError> {
    let url = format!("{}{}", base_url, wire::HEALTH_PATH);
    debug!(%url, "probe_health: called");
    let response = http.get(url).send().await?;
    Ok(response.status().is_success())
}

#[async_trait]
impl PlanTransport for FallbackTransport {
    fn name(&self) -> &'static str {
        "fallback"
    }

    async fn exchange(
        &self,
        request: &TripRequest,
        events: mpsc::Sender<ProgressEvent>,
        cancel: CancellationToken,
    ) -> Result<(), TransportError> {
        debug!(origin = %request.origin, destination = %request.destination, "exchange: called");

        // Dropping the in-flight request future aborts the HTTP exchange
        let response = tokio::select! {
            _ = cancel.cancelled() => {
                debug!("exchange: cancelled, abandoning request");
                return Err(TransportError::Cancelled);
            }
            response = self.request_plan(request) => response?,
        };

        info!(
            flights = response.plan.flights.len(),
            stays = response.plan.stays.len(),
            days = response.plan.activities.len(),
            "exchange: plan received"
        );
        if cancel.is_cancelled() {
            return Err(TransportError::Cancelled);
        }
        send_event(
            &events,
            ProgressEvent::Success {
                plan: response.plan,
                service_logs: response.logs,
            },
        )
        .await
    }

    async fn health(&self) -> Result<bool, TransportError> {
        probe_health(&self.http, &self.base_url).await
    }
}
