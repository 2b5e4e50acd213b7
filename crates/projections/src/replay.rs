//! Replay driver for rebuilding read models from history.

use events::EventEnvelope;
use futures_core::Stream;
use futures_util::{StreamExt, pin_mut};

use crate::registry::HandlerRegistry;

/// Outcome of a replay run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayReport {
    /// Envelopes drawn from the stream.
    pub events: u64,
    /// Envelopes for which at least one handler failed.
    pub failed_events: u64,
    /// Total handler errors across all envelopes.
    pub handler_errors: u64,
}

/// Drives a stream of historical envelopes through the registry, one at a
/// time, in stream order.
///
/// Read models are derived state: after wiping them, replaying the full
/// event history through the same handlers reconstructs every row. Handler
/// failures are counted, not fatal, so one poisoned event cannot stall a
/// rebuild; the caller decides what a non-zero failure count means.
#[tracing::instrument(skip(registry, stream))]
pub async fn replay<S>(registry: &HandlerRegistry, stream: S) -> ReplayReport
where
    S: Stream<Item = EventEnvelope>,
{
    let mut report = ReplayReport::default();

    pin_mut!(stream);
    while let Some(envelope) = stream.next().await {
        report.events += 1;
        let errors = registry.dispatch(&envelope).await;
        if !errors.is_empty() {
            report.failed_events += 1;
            report.handler_errors += errors.len() as u64;
        }
        metrics::counter!("projection_events_replayed").increment(1);
    }

    tracing::info!(
        events = report.events,
        failed_events = report.failed_events,
        "replay complete"
    );

    report
}
