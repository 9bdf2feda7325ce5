//! Streaming strategy
//!
//! Opens a server-sent event channel on `GET /plan-trip/stream` and maps
//! each pushed message to a ProgressEvent. Individual malformed messages
//! are dropped; only a transport-level error ends the exchange early.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use reqwest_eventsource::{Error as EventSourceError, Event, EventSource};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::client::send_event;
use super::wire::{self, StreamMessage};
use super::{PlanTransport, ProgressEvent, TransportError};
use crate::domain::TripRequest;

/// Server-push transport
pub struct StreamingTransport {
    base_url: String,
    http: Client,
}

impl StreamingTransport {
    pub fn new(http: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        debug!(%base_url, "StreamingTransport::new: called");
        Self { base_url, http }
    }

    /// Build the event source for a request
    fn open(&self, request: &TripRequest) -> Result<EventSource, TransportError> {
        let url = format!("{}{}", self.base_url, wire::STREAM_PATH);
        let query = wire::stream_query(request)?;
        debug!(%url, params = query.len(), "open: called");

        let builder = self
            .http
            .get(url)
            .header("accept", "text/event-stream")
            .query(&query);

        EventSource::new(builder).map_err(|e| TransportError::Stream(e.to_string()))
    }

    /// Pump messages until a result, a transport error or cancellation
    ///
    /// Never closes the source itself; `exchange` does that on every path.
    async fn pump(
        &self,
        es: &mut EventSource,
        events: &mpsc::Sender<ProgressEvent>,
        cancel: &CancellationToken,
    ) -> Result<(), TransportError> {
        loop {
            let next = tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("pump: cancelled");
                    return Err(TransportError::Cancelled);
                }
                next = es.next() => next,
            };

            match next {
                Some(Ok(Event::Open)) => {
                    debug!("pump: Event::Open");
                }
                Some(Ok(Event::Message(msg))) => match wire::parse_stream_message(&msg.data) {
                    Ok(StreamMessage::Progress(log)) => {
                        debug!(stage = %log.stage, "pump: progress");
                        send_event(events, ProgressEvent::Progress(log)).await?;
                    }
                    Ok(StreamMessage::Result(response)) => {
                        let response = *response;
                        info!(
                            flights = response.plan.flights.len(),
                            stays = response.plan.stays.len(),
                            days = response.plan.activities.len(),
                            "pump: result received"
                        );
                        send_event(
                            events,
                            ProgressEvent::Success {
                                plan: response.plan,
                                service_logs: response.logs,
                            },
                        )
                        .await?;
                        return Ok(());
                    }
                    Ok(StreamMessage::Complete) => {
                        debug!("pump: complete marker, ignoring");
                    }
                    Err(e) => {
                        debug!(error = %e, event = %msg.event, "pump: dropping unrecognized message");
                    }
                },
                Some(Err(EventSourceError::StreamEnded)) | None => {
                    debug!("pump: stream ended without a result");
                    return Err(TransportError::StreamEnded);
                }
                Some(Err(EventSourceError::InvalidStatusCode(status, response))) => {
                    let text = response.text().await.unwrap_or_default();
                    let detail = wire::error_detail(&text);
                    warn!(%status, ?detail, "pump: stream rejected");
                    return Err(TransportError::Api {
                        status: status.as_u16(),
                        detail,
                    });
                }
                Some(Err(e)) => {
                    warn!(error = %e, "pump: transport error");
                    return Err(TransportError::Stream(e.to_string()));
                }
            }
        }
    }
}

#[async_trait]
impl PlanTransport for StreamingTransport {
    fn name(&self) -> &'static str {
        "stream"
    }

    async fn exchange(
        &self,
        request: &TripRequest,
        events: mpsc::Sender<ProgressEvent>,
        cancel: CancellationToken,
    ) -> Result<(), TransportError> {
        debug!(origin = %request.origin, destination = %request.destination, "exchange: called");
        let mut es = self.open(request)?;

        let result = self.pump(&mut es, &events, &cancel).await;

        // Stops the built-in reconnect as well as the current connection
        es.close();
        debug!(ok = result.is_ok(), "exchange: event source closed");
        result
    }

    async fn health(&self) -> Result<bool, TransportError> {
        super::fallback::probe_health(&self.http, &self.base_url).await
    }
}
