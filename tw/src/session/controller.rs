//! SessionController - owns the session state and drives searches
//!
//! One controller manages at most one in-flight exchange. Every exchange
//! is tagged with a generation number; bumping the generation (new search
//! or clear) cancels the old exchange and makes any event it still
//! delivers stale, so it is discarded before reaching the reducer.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::state::{Action, SessionState, reduce};
use crate::domain::TripRequest;
use crate::transport::{GENERIC_CONNECTION_FAILURE, PlanTransport, ProgressEvent};

/// Default broadcast capacity (snapshots)
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Buffer between a transport and the reducer
const EVENT_BUFFER: usize = 64;

struct Inner {
    state: Arc<SessionState>,
    generation: u64,
    cancel: Option<CancellationToken>,
}

/// State shared between the controller and its spawned exchanges
struct Shared {
    inner: Mutex<Inner>,
    event_tx: broadcast::Sender<Arc<SessionState>>,
}

impl Shared {
    fn snapshot(&self) -> Arc<SessionState> {
        Arc::clone(&self.lock().state)
    }

    /// Apply an event if it belongs to the current exchange
    ///
    /// Returns false when the event was stale and discarded.
    fn apply_event(&self, generation: u64, event: ProgressEvent) -> bool {
        let mut inner = self.lock();
        if inner.generation != generation {
            debug!(
                event_generation = generation,
                current = inner.generation,
                kind = event.kind(),
                "apply_event: discarding stale event"
            );
            return false;
        }
        self.apply_locked(&mut inner, Action::from(event));
        true
    }

    /// Release the cancellation handle once an exchange is over
    fn finish(&self, generation: u64) {
        let mut inner = self.lock();
        if inner.generation == generation {
            inner.cancel = None;
        }
    }

    fn apply_locked(&self, inner: &mut Inner, action: Action) {
        let next = Arc::new(reduce(&inner.state, action));
        debug!(generation = inner.generation, state = next.name(), "apply_locked: transitioned");
        inner.state = Arc::clone(&next);
        // No subscribers is fine
        let _ = self.event_tx.send(next);
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // State is replaced wholesale under the lock, so a poisoned guard still holds a valid snapshot
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Stateful orchestration of one planning session
///
/// Constructed once and shared by reference (or `Arc`) with whatever
/// needs to read or drive the session. Exchanges run on spawned tasks, so
/// searches must be started from within a Tokio runtime.
pub struct SessionController {
    transport: Arc<dyn PlanTransport>,
    shared: Arc<Shared>,
}

impl SessionController {
    pub fn new(transport: Arc<dyn PlanTransport>) -> Self {
        Self::with_capacity(transport, DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(transport: Arc<dyn PlanTransport>, capacity: usize) -> Self {
        debug!(transport = transport.name(), capacity, "SessionController::new: called");
        let (event_tx, _) = broadcast::channel(capacity);
        Self {
            transport,
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner {
                    state: Arc::new(SessionState::Idle),
                    generation: 0,
                    cancel: None,
                }),
                event_tx,
            }),
        }
    }

    /// Current snapshot
    pub fn snapshot(&self) -> Arc<SessionState> {
        self.shared.snapshot()
    }

    /// Receive every snapshot published after this call, in order
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<SessionState>> {
        debug!("SessionController::subscribe: new subscriber");
        self.shared.event_tx.subscribe()
    }

    /// Start a search for `request`
    ///
    /// The `Searching` transition is applied before this returns and the
    /// exchange runs on its own task until a terminal event, whether or
    /// not the returned future is polled. The future resolves with the
    /// snapshot after that terminal event (or the current snapshot if a
    /// later search or a clear superseded it). Any search still in flight
    /// is cancelled first.
    pub fn start_search(&self, request: TripRequest) -> impl Future<Output = Arc<SessionState>> + Send + 'static {
        let request = Arc::new(request);
        info!(origin = %request.origin, destination = %request.destination, "start_search: called");

        let (generation, cancel) = {
            let mut inner = self.shared.lock();
            if let Some(previous) = inner.cancel.take() {
                debug!(generation = inner.generation, "start_search: cancelling previous exchange");
                previous.cancel();
            }
            inner.generation += 1;
            let cancel = CancellationToken::new();
            inner.cancel = Some(cancel.clone());
            self.shared.apply_locked(&mut inner, Action::SearchStart(Arc::clone(&request)));
            (inner.generation, cancel)
        };

        let shared = Arc::clone(&self.shared);
        let handle = tokio::spawn(drive(
            Arc::clone(&shared),
            Arc::clone(&self.transport),
            generation,
            request,
            cancel,
        ));

        async move {
            match handle.await {
                Ok(state) => state,
                Err(e) => {
                    warn!(generation, error = %e, "start_search: exchange task ended abnormally");
                    shared.snapshot()
                }
            }
        }
    }

    /// Drop any results and return to Idle, cancelling an in-flight search
    pub fn clear_results(&self) {
        let mut inner = self.shared.lock();
        debug!(generation = inner.generation, "clear_results: called");
        if let Some(cancel) = inner.cancel.take() {
            debug!("clear_results: cancelling in-flight exchange");
            cancel.cancel();
        }
        inner.generation += 1;
        self.shared.apply_locked(&mut inner, Action::ClearResults);
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        if let Some(cancel) = self.shared.lock().cancel.take() {
            cancel.cancel();
        }
    }
}

/// Run one exchange and feed its events to the reducer
async fn drive(
    shared: Arc<Shared>,
    transport: Arc<dyn PlanTransport>,
    generation: u64,
    request: Arc<TripRequest>,
    cancel: CancellationToken,
) -> Arc<SessionState> {
    let (tx, mut rx) = mpsc::channel(EVENT_BUFFER);

    let exchange = transport.exchange(&request, tx, cancel.clone());

    let consume = async {
        let mut terminal = false;
        while let Some(event) = rx.recv().await {
            let is_terminal = event.is_terminal();
            if !shared.apply_event(generation, event) {
                debug!(generation, "drive: exchange superseded, stop consuming");
                return false;
            }
            if is_terminal {
                terminal = true;
                break;
            }
        }
        // Dropping the receiver makes further sends from this exchange fail
        drop(rx);
        terminal
    };

    let (result, terminal) = tokio::join!(exchange, consume);

    match result {
        Err(e) if !e.is_cancelled() && !terminal => {
            warn!(generation, error = %e, "drive: transport failed without a terminal event");
            shared.apply_event(generation, ProgressEvent::Failure(e.user_message()));
        }
        Ok(()) if !terminal && !cancel.is_cancelled() => {
            warn!(generation, "drive: transport finished without a terminal event");
            shared.apply_event(generation, ProgressEvent::Failure(GENERIC_CONNECTION_FAILURE.to_string()));
        }
        _ => {}
    }

    shared.finish(generation);
    shared.snapshot()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ProcessingLog, TripPlan};
    use crate::transport::client::mock::{MockTransport, Script};
    use chrono::NaiveDate;
    use std::time::Duration;
    use tokio::sync::Notify;

    fn request(destination: &str) -> TripRequest {
        TripRequest::new(
            "NBO",
            destination,
            NaiveDate::from_ymd_opt(2025, 11, 10).unwrap(),
            NaiveDate::from_ymd_opt(2025, 11, 16).unwrap(),
        )
    }

    fn plan(summary: &str) -> TripPlan {
        serde_json::from_value(serde_json::json!({ "flights": [{ "summary": summary }] })).unwrap()
    }

    fn progress(stage: &str) -> ProgressEvent {
        ProgressEvent::Progress(ProcessingLog::stage(stage))
    }

    fn success(summary: &str) -> ProgressEvent {
        ProgressEvent::Success {
            plan: plan(summary),
            service_logs: vec![],
        }
    }

    async fn wait_for_calls(transport: &MockTransport, calls: usize) {
        for _ in 0..100 {
            if transport.call_count() >= calls {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("transport never reached {} calls", calls);
    }

    #[tokio::test]
    async fn test_searching_is_visible_before_any_event() {
        let transport = Arc::new(MockTransport::new(vec![Script::events(vec![success("a")])]));
        let controller = SessionController::new(transport.clone());

        let search = controller.start_search(request("Dubai"));
        assert!(controller.snapshot().is_loading());

        let final_state = search.await;
        assert!(final_state.trip_plan().is_some());
    }

    #[tokio::test]
    async fn test_stream_sequence_reaches_succeeded() {
        let transport = Arc::new(MockTransport::new(vec![Script::events(vec![
            progress("Destination Research"),
            progress("Flights Found"),
            success("KQ 310"),
        ])]));
        let controller = SessionController::new(transport);
        let mut rx = controller.subscribe();

        let state = controller.start_search(request("Dubai")).await;

        assert!(!state.is_loading());
        assert_eq!(state.trip_plan().unwrap().flights[0].summary, "KQ 310");
        let stages: Vec<_> = state.logs().iter().map(|l| l.stage.clone()).collect();
        assert_eq!(stages, vec!["Destination Research", "Flights Found"]);
        assert_eq!(state.last_search().unwrap().destination, "Dubai");

        // searching, progress, progress, succeeded: one notification per action
        let mut seen = Vec::new();
        while let Ok(snapshot) = rx.try_recv() {
            seen.push(snapshot.name());
        }
        assert_eq!(seen, vec!["searching", "searching", "searching", "succeeded"]);
    }

    #[tokio::test]
    async fn test_failure_resets_logs() {
        let transport = Arc::new(MockTransport::new(vec![Script::events(vec![
            progress("Destination Research"),
            progress("Flights Found"),
            ProgressEvent::Failure("Planner unavailable".to_string()),
        ])]));
        let controller = SessionController::new(transport);

        let state = controller.start_search(request("Dubai")).await;

        assert_eq!(state.error(), Some("Planner unavailable"));
        assert!(state.logs().is_empty());
        assert!(state.last_search().is_some());
    }

    #[tokio::test]
    async fn test_transport_error_surfaces_as_failed() {
        let transport = Arc::new(MockTransport::new(vec![Script {
            error: Some("socket closed".to_string()),
            ..Default::default()
        }]));
        let controller = SessionController::new(transport);

        let state = controller.start_search(request("Dubai")).await;

        assert_eq!(state.error(), Some(GENERIC_CONNECTION_FAILURE));
    }

    #[tokio::test]
    async fn test_exchange_without_terminal_event_fails() {
        let transport = Arc::new(MockTransport::new(vec![Script::events(vec![progress("Destination Research")])]));
        let controller = SessionController::new(transport);

        let state = controller.start_search(request("Dubai")).await;

        assert_eq!(state.error(), Some(GENERIC_CONNECTION_FAILURE));
    }

    #[tokio::test]
    async fn test_new_search_cancels_previous_and_ignores_late_events() {
        let gate = Arc::new(Notify::new());
        let transport = Arc::new(MockTransport::new(vec![
            Script {
                events: vec![progress("Stale Stage"), success("stale plan")],
                gate: Some(gate.clone()),
                ignore_cancel: true,
                ..Default::default()
            },
            Script::events(vec![progress("Destination Research"), success("fresh plan")]),
        ]));
        let controller = Arc::new(SessionController::new(transport.clone()));

        let first = {
            let controller = Arc::clone(&controller);
            tokio::spawn(async move { controller.start_search(request("Dubai")).await })
        };
        wait_for_calls(&transport, 1).await;

        let second = controller.start_search(request("Zanzibar")).await;
        assert_eq!(second.trip_plan().unwrap().flights[0].summary, "fresh plan");

        // The superseded exchange now delivers its events
        gate.notify_one();
        let first_result = first.await.unwrap();

        let current = controller.snapshot();
        assert_eq!(current.trip_plan().unwrap().flights[0].summary, "fresh plan");
        assert_eq!(current.last_search().unwrap().destination, "Zanzibar");
        assert_eq!(current.logs().len(), 1);
        assert_eq!(first_result, current);
    }

    #[tokio::test]
    async fn test_new_search_cancels_hanging_exchange() {
        let transport = Arc::new(MockTransport::new(vec![
            Script {
                events: vec![progress("Destination Research")],
                hang: true,
                ..Default::default()
            },
            Script::events(vec![success("second")]),
        ]));
        let controller = Arc::new(SessionController::new(transport.clone()));

        let first = {
            let controller = Arc::clone(&controller);
            tokio::spawn(async move { controller.start_search(request("Dubai")).await })
        };
        wait_for_calls(&transport, 1).await;

        let second = controller.start_search(request("Cairo")).await;
        first.await.unwrap();

        assert_eq!(transport.cancelled(), vec![0]);
        assert_eq!(second.trip_plan().unwrap().flights[0].summary, "second");
    }

    #[tokio::test]
    async fn test_clear_results_cancels_in_flight_search() {
        let transport = Arc::new(MockTransport::new(vec![Script {
            hang: true,
            ..Default::default()
        }]));
        let controller = Arc::new(SessionController::new(transport.clone()));

        let search = {
            let controller = Arc::clone(&controller);
            tokio::spawn(async move { controller.start_search(request("Dubai")).await })
        };
        wait_for_calls(&transport, 1).await;

        controller.clear_results();
        let state = search.await.unwrap();

        assert_eq!(*state, SessionState::Idle);
        assert!(controller.snapshot().last_search().is_none());
        assert_eq!(transport.cancelled(), vec![0]);
    }

    #[tokio::test]
    async fn test_dropped_search_future_still_completes() {
        let transport = Arc::new(MockTransport::new(vec![Script::events(vec![
            progress("Destination Research"),
            success("KQ 310"),
        ])]));
        let controller = SessionController::new(transport.clone());
        let mut rx = controller.subscribe();

        drop(controller.start_search(request("Dubai")));

        let settled = tokio::time::timeout(Duration::from_secs(1), async {
            loop {
                match rx.recv().await {
                    Ok(state) if !state.is_loading() => break state,
                    Ok(_) => continue,
                    Err(e) => panic!("update channel failed: {}", e),
                }
            }
        })
        .await
        .expect("search never left Searching");

        assert_eq!(settled.trip_plan().unwrap().flights[0].summary, "KQ 310");
        assert_eq!(controller.snapshot(), settled);
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn test_dropped_search_future_can_still_be_cleared() {
        let transport = Arc::new(MockTransport::new(vec![Script {
            hang: true,
            ..Default::default()
        }]));
        let controller = SessionController::new(transport.clone());

        drop(controller.start_search(request("Dubai")));
        wait_for_calls(&transport, 1).await;
        controller.clear_results();

        for _ in 0..100 {
            if !transport.cancelled().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(*controller.snapshot(), SessionState::Idle);
        assert_eq!(transport.cancelled(), vec![0]);
    }

    #[tokio::test]
    async fn test_clear_results_after_success() {
        let transport = Arc::new(MockTransport::new(vec![Script::events(vec![success("a")])]));
        let controller = SessionController::new(transport);

        controller.start_search(request("Dubai")).await;
        let before = controller.snapshot();
        controller.clear_results();

        assert_eq!(*controller.snapshot(), SessionState::Idle);
        // A snapshot captured earlier is untouched
        assert!(before.trip_plan().is_some());
    }
}
