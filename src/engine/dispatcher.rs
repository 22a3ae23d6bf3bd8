use crate::engine::StatsAggregator;
use crate::engine::worker::Worker;
use crate::http::{RequestTemplate, Transport};
use crate::types::{DispatchMode, LoadConfig};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

const TICK: Duration = Duration::from_secs(1);

/// Launches workers according to the configured `DispatchMode`.
///
/// Every worker is spawned on the shared `TaskTracker`, so the caller can close
/// the tracker and await it to drain whatever is still in flight.
pub struct Dispatcher<T> {
    mode: DispatchMode,
    concurrency: u32,
    total_requests: u64,
    transport: Arc<T>,
    template: Arc<RequestTemplate>,
    stats: Arc<StatsAggregator>,
    tracker: TaskTracker,
    cancel_token: CancellationToken,
}

impl<T: Transport> Dispatcher<T> {
    pub fn new(
        config: &LoadConfig,
        transport: Arc<T>,
        template: Arc<RequestTemplate>,
        stats: Arc<StatsAggregator>,
        tracker: TaskTracker,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            mode: config.mode,
            concurrency: config.concurrency.max(1),
            total_requests: config.total_requests,
            transport,
            template,
            stats,
            tracker,
            cancel_token,
        }
    }

    /// Returns the number of requests launched. Stops when the request budget is
    /// spent or the cancel token fires, whichever comes first.
    pub async fn run(self) -> u64 {
        if self.total_requests == 0 {
            tracing::warn!("Running in unbounded mode, only a signal will stop the run");
        }
        tracing::info!(
            mode = %self.mode,
            concurrency = self.concurrency,
            requests = self.total_requests,
            "Dispatcher started"
        );

        let launched = match self.mode {
            DispatchMode::MaxInFlight => self.run_max_in_flight().await,
            DispatchMode::RateStrict => self.run_rate_strict().await,
        };

        if self.cancel_token.is_cancelled() {
            tracing::info!(launched, "Dispatcher cancelled");
        } else {
            tracing::info!(launched, "All requests launched");
        }
        launched
    }

    async fn run_max_in_flight(&self) -> u64 {
        let gate = Arc::new(Semaphore::new(self.concurrency as usize));
        let mut launched = 0u64;

        while self.has_remaining(launched) {
            let permit = tokio::select! {
                biased;

                _ = self.cancel_token.cancelled() => break,

                permit = gate.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            self.spawn_worker(launched, Some(permit));
            launched += 1;
        }

        launched
    }

    async fn run_rate_strict(&self) -> u64 {
        let mut ticker = interval_at(Instant::now() + TICK, TICK);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Burst);
        let mut launched = 0u64;

        while self.has_remaining(launched) {
            tokio::select! {
                biased;

                _ = self.cancel_token.cancelled() => break,

                _ = ticker.tick() => {}
            }

            // The whole batch goes out even if it overshoots the request budget.
            for _ in 0..self.concurrency {
                self.spawn_worker(launched, None);
                launched += 1;
            }
        }

        launched
    }

    fn has_remaining(&self, launched: u64) -> bool {
        self.total_requests == 0 || launched < self.total_requests
    }

    fn spawn_worker(&self, id: u64, permit: Option<OwnedSemaphorePermit>) {
        let worker = Worker::new(
            id,
            self.transport.clone(),
            self.template.clone(),
            self.stats.clone(),
            permit,
        );
        self.tracker.spawn(worker.run());
    }
}
