//! Event handler registry and fan-out dispatch.

use std::collections::HashMap;
use std::sync::Arc;

use events::EventEnvelope;
use tracing::Instrument;

use crate::ProjectionError;
use crate::handler::EventHandler;

/// Maps event type strings to ordered lists of handlers and dispatches
/// envelopes to them.
///
/// Dispatch is fan-out with isolation: every handler registered for an
/// event type runs, in registration order, even when an earlier one fails.
/// One projection's failure (a cache outage, say) must not block an
/// independent projection of the same event from running.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Vec<Arc<dyn EventHandler>>>,
}

impl HandlerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler for one event type, appended after any handlers
    /// already registered for that type.
    pub fn register(&mut self, event_type: impl Into<String>, handler: Arc<dyn EventHandler>) {
        self.handlers.entry(event_type.into()).or_default().push(handler);
    }

    /// Registers one handler under every event type it serves.
    pub fn register_all(&mut self, event_types: &[&str], handler: Arc<dyn EventHandler>) {
        for event_type in event_types {
            self.register(*event_type, handler.clone());
        }
    }

    /// Returns the handlers registered for an event type.
    ///
    /// An unknown event type yields an empty slice, not an error: events
    /// nobody projects are simply skipped.
    pub fn handlers_for(&self, event_type: &str) -> &[Arc<dyn EventHandler>] {
        self.handlers
            .get(event_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Number of distinct event types with at least one handler.
    pub fn event_type_count(&self) -> usize {
        self.handlers.len()
    }

    /// Dispatches one envelope to every handler registered for its type.
    ///
    /// Returns the accumulated handler errors in registration order; an
    /// empty vector means full success. Nothing is rolled back on failure;
    /// redelivery and dead-lettering are the caller's policy.
    #[tracing::instrument(
        skip(self, envelope),
        fields(
            event_type = %envelope.event_type,
            aggregate_id = %envelope.aggregate_id,
            tenant_id = %envelope.tenant_id,
        )
    )]
    pub async fn dispatch(&self, envelope: &EventEnvelope) -> Vec<ProjectionError> {
        let mut failures = Vec::new();

        for handler in self.handlers_for(&envelope.event_type) {
            let span = tracing::info_span!("handle_event", handler = handler.name());
            match handler.handle(envelope).instrument(span).await {
                Ok(()) => {
                    metrics::counter!("projection_events_handled").increment(1);
                }
                Err(err) => {
                    tracing::error!(
                        handler = handler.name(),
                        error = %err,
                        "projection handler failed"
                    );
                    metrics::counter!("projection_handler_failures").increment(1);
                    failures.push(err);
                }
            }
        }

        failures
    }
}
