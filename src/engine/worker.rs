use crate::engine::StatsAggregator;
use crate::http::{RequestTemplate, Transport};
use crate::types::RequestOutcome;
use std::sync::Arc;
use tokio::sync::OwnedSemaphorePermit;

/// One request attempt. Consumed by `run`.
///
/// Completion is signalled by dropping the worker: the admission permit (if any)
/// goes back to the gate and the enclosing tracked task finishes. Both happen on
/// every exit path, including a panicking transport.
pub struct Worker<T> {
    id: u64,
    transport: Arc<T>,
    template: Arc<RequestTemplate>,
    stats: Arc<StatsAggregator>,
    _permit: Option<OwnedSemaphorePermit>,
}

impl<T: Transport> Worker<T> {
    pub fn new(
        id: u64,
        transport: Arc<T>,
        template: Arc<RequestTemplate>,
        stats: Arc<StatsAggregator>,
        permit: Option<OwnedSemaphorePermit>,
    ) -> Self {
        Self {
            id,
            transport,
            template,
            stats,
            _permit: permit,
        }
    }

    pub async fn run(self) {
        let outcome = self.transport.execute(&self.template).await;

        if let RequestOutcome::Failure { kind, detail } = &outcome {
            tracing::error!(
                request = self.id,
                kind = kind.as_str(),
                error = %detail,
                "request failed"
            );
        }

        self.stats.record(&outcome);
    }
}
