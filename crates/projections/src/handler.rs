//! The handler seam every projection implements.

use async_trait::async_trait;
use events::EventEnvelope;

use crate::Result;

/// A projection handler: consumes one envelope and updates its read model.
///
/// Handlers run under the dispatching caller's task and must not spawn
/// background work that outlives the call; cancellation is delivered by
/// dropping the future. Each invocation runs inside its own tracing span
/// opened by the registry.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Name used in spans, logs, and error reports.
    fn name(&self) -> &'static str;

    /// Applies the event to this handler's read model.
    async fn handle(&self, envelope: &EventEnvelope) -> Result<()>;
}
