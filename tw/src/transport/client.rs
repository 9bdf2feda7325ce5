//! PlanTransport trait definition

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{ProgressEvent, TransportError};
use crate::domain::TripRequest;

/// One way of running a planning exchange against the remote service
///
/// Each call to `exchange` owns exactly one network resource for its whole
/// lifetime and must release it before returning, whether the exchange
/// finished, failed or was cancelled through `cancel`.
#[async_trait]
pub trait PlanTransport: Send + Sync {
    /// Strategy name for logging
    fn name(&self) -> &'static str;

    /// Run one exchange, sending events to `events` in arrival order
    ///
    /// Returns once a terminal event was sent, the exchange failed, or
    /// `cancel` fired. A cancelled exchange sends nothing further.
    async fn exchange(
        &self,
        request: &TripRequest,
        events: mpsc::Sender<ProgressEvent>,
        cancel: CancellationToken,
    ) -> Result<(), TransportError>;

    /// Liveness probe against `GET /health`
    async fn health(&self) -> Result<bool, TransportError>;
}

/// Forward one event to the consumer
///
/// A closed receiver means nobody is listening to this exchange any more,
/// which is treated the same as cancellation.
pub(crate) async fn send_event(
    events: &mpsc::Sender<ProgressEvent>,
    event: ProgressEvent,
) -> Result<(), TransportError> {
    debug!(kind = event.kind(), "send_event: called");
    events.send(event).await.map_err(|_| TransportError::Cancelled)
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::Arc;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;
    use tracing::debug;

    /// What one scripted exchange does
    #[derive(Clone, Default)]
    pub struct Script {
        /// Events sent in order
        pub events: Vec<ProgressEvent>,
        /// Wait for this before sending anything
        pub gate: Option<Arc<Notify>>,
        /// Keep going after cancellation (simulates a transport that cannot stop in time)
        pub ignore_cancel: bool,
        /// After the events, block until cancelled
        pub hang: bool,
        /// Returned after the events
        pub error: Option<String>,
    }

    impl Script {
        pub fn events(events: Vec<ProgressEvent>) -> Self {
            Self {
                events,
                ..Default::default()
            }
        }
    }

    /// Mock transport for unit tests; each exchange consumes the next script
    pub struct MockTransport {
        scripts: Vec<Script>,
        call_count: AtomicUsize,
        cancelled: Arc<Mutex<Vec<usize>>>,
    }

    impl MockTransport {
        pub fn new(scripts: Vec<Script>) -> Self {
            debug!(script_count = %scripts.len(), "MockTransport::new: called");
            Self {
                scripts,
                call_count: AtomicUsize::new(0),
                cancelled: Arc::new(Mutex::new(Vec::new())),
            }
        }

        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }

        /// Indexes of exchanges that observed cancellation
        pub fn cancelled(&self) -> Vec<usize> {
            self.cancelled.lock().map(|c| c.clone()).unwrap_or_default()
        }

        fn mark_cancelled(&self, idx: usize) {
            if let Ok(mut c) = self.cancelled.lock() {
                c.push(idx);
            }
        }
    }

    #[async_trait]
    impl PlanTransport for MockTransport {
        fn name(&self) -> &'static str {
            "mock"
        }

        async fn exchange(
            &self,
            _request: &TripRequest,
            events: mpsc::Sender<ProgressEvent>,
            cancel: CancellationToken,
        ) -> Result<(), TransportError> {
            let idx = self.call_count.fetch_add(1, Ordering::SeqCst);
            debug!(%idx, "MockTransport::exchange: called");
            let script = self.scripts.get(idx).cloned().unwrap_or_default();

            if let Some(gate) = &script.gate {
                if script.ignore_cancel {
                    gate.notified().await;
                } else {
                    tokio::select! {
                        _ = cancel.cancelled() => {
                            self.mark_cancelled(idx);
                            return Err(TransportError::Cancelled);
                        }
                        _ = gate.notified() => {}
                    }
                }
            }

            for event in script.events {
                if cancel.is_cancelled() && !script.ignore_cancel {
                    self.mark_cancelled(idx);
                    return Err(TransportError::Cancelled);
                }
                // Sends to an abandoned consumer may fail
                let _ = events.send(event).await;
            }

            if script.hang {
                cancel.cancelled().await;
                self.mark_cancelled(idx);
                return Err(TransportError::Cancelled);
            }

            match script.error {
                Some(message) => Err(TransportError::Stream(message)),
                None => Ok(()),
            }
        }

        async fn health(&self) -> Result<bool, TransportError> {
            Ok(true)
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::domain::{ProcessingLog, TripPlan};
        use chrono::NaiveDate;

        fn request() -> TripRequest {
            let day = NaiveDate::from_ymd_opt(2025, 11, 10).unwrap();
            TripRequest::new("NBO", "Dubai", day, day)
        }

        #[tokio::test]
        async fn test_mock_transport_replays_script() {
            let transport = MockTransport::new(vec![Script::events(vec![
                ProgressEvent::Progress(ProcessingLog::stage("Destination Research")),
                ProgressEvent::Success {
                    plan: TripPlan::default(),
                    service_logs: vec![],
                },
            ])]);
            let (tx, mut rx) = mpsc::channel(8);

            transport
                .exchange(&request(), tx, CancellationToken::new())
                .await
                .unwrap();

            assert_eq!(rx.recv().await.unwrap().kind(), "progress");
            assert_eq!(rx.recv().await.unwrap().kind(), "success");
            assert!(rx.recv().await.is_none());
            assert_eq!(transport.call_count(), 1);
        }

        #[tokio::test]
        async fn test_mock_transport_hang_until_cancelled() {
            let transport = MockTransport::new(vec![Script {
                hang: true,
                ..Default::default()
            }]);
            let (tx, _rx) = mpsc::channel(8);
            let cancel = CancellationToken::new();
            cancel.cancel();

            let result = transport.exchange(&request(), tx, cancel).await;
            assert!(matches!(result, Err(TransportError::Cancelled)));
            assert_eq!(transport.cancelled(), vec![0]);
        }
    }
}
