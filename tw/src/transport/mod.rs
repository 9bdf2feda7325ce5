//! Transport module for TripWeaver
//!
//! Talks to the remote planning service and normalizes both supported
//! strategies (server-push stream, single request/response) into one
//! ordered, terminating sequence of ProgressEvents.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tracing::debug;

mod adapter;
pub mod client;
mod error;
mod event;
mod fallback;
mod stream;
pub mod wire;

pub use adapter::TransportAdapter;
pub use client::PlanTransport;
pub use error::{GENERIC_CONNECTION_FAILURE, GENERIC_REQUEST_FAILURE, TransportError};
pub use event::ProgressEvent;
pub use fallback::FallbackTransport;
pub use stream::StreamingTransport;

use crate::config::Config;

/// Create the transport described by the config
///
/// Only a connect timeout is applied: a planning run can legitimately take
/// minutes and the stream stays open until it ends or is cancelled.
pub fn create_transport(config: &Config) -> Result<Arc<dyn PlanTransport>, TransportError> {
    debug!(
        base_url = %config.service.base_url,
        streaming = config.transport.streaming,
        "create_transport: called"
    );
    let http = Client::builder()
        .connect_timeout(Duration::from_millis(config.service.connect_timeout_ms))
        .build()?;

    let streaming = Arc::new(StreamingTransport::new(http.clone(), &config.service.base_url));
    let fallback = Arc::new(FallbackTransport::new(http, &config.service.base_url));

    Ok(Arc::new(TransportAdapter::new(
        streaming,
        fallback,
        config.transport.streaming,
    )))
}
