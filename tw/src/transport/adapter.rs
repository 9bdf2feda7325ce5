//! TransportAdapter - picks a strategy per search and normalizes failures
//!
//! Callers only ever see ProgressEvents: a strategy error becomes a single
//! `Failure` event, except for cancellation, which produces nothing.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::client::send_event;
use super::{PlanTransport, ProgressEvent, TransportError};
use crate::domain::TripRequest;

/// Wraps the streaming and fallback strategies
pub struct TransportAdapter {
    streaming: Arc<dyn PlanTransport>,
    fallback: Arc<dyn PlanTransport>,
    push_available: bool,
}

impl TransportAdapter {
    pub fn new(streaming: Arc<dyn PlanTransport>, fallback: Arc<dyn PlanTransport>, push_available: bool) -> Self {
        debug!(
            streaming = streaming.name(),
            fallback = fallback.name(),
            push_available,
            "TransportAdapter::new: called"
        );
        Self {
            streaming,
            fallback,
            push_available,
        }
    }

    /// Capability check: can this runtime hold a server-push channel open?
    pub fn supports_streaming(&self) -> bool {
        self.push_available
    }

    fn select(&self) -> &Arc<dyn PlanTransport> {
        if self.supports_streaming() {
            &self.streaming
        } else {
            &self.fallback
        }
    }
}

#[async_trait]
impl PlanTransport for TransportAdapter {
    fn name(&self) -> &'static str {
        self.select().name()
    }

    async fn exchange(
        &self,
        request: &TripRequest,
        events: mpsc::Sender<ProgressEvent>,
        cancel: CancellationToken,
    ) -> Result<(), TransportError> {
        let strategy = self.select();
        info!(strategy = strategy.name(), "exchange: starting");

        match strategy.exchange(request, events.clone(), cancel.clone()).await {
            Ok(()) => {
                debug!("exchange: strategy finished");
                Ok(())
            }
            Err(e) if e.is_cancelled() || cancel.is_cancelled() => {
                debug!(error = %e, "exchange: cancelled, nothing to report");
                Err(TransportError::Cancelled)
            }
            Err(e) => {
                warn!(error = %e, "exchange: strategy failed");
                send_event(&events, ProgressEvent::Failure(e.user_message())).await
            }
        }
    }

    async fn health(&self) -> Result<bool, TransportError> {
        self.select().health().await
    }
}
